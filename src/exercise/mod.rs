//! American and Bermudan exercise by Least-Squares Monte Carlo

pub mod basis;
pub mod lsmc;
pub mod spec;
