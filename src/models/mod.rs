pub mod gbm;
pub mod model;
pub mod term_function;
