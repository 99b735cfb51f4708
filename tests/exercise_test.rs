// tests/exercise_test.rs
//! LSMC exercise values against binomial-tree references
use fast_lsmc::analytics::bs_analytic;
use fast_lsmc::curves::DiscountCurve;
use fast_lsmc::exercise::lsmc::{ExerciseEngine, LsmcConfig, RegressionOutcome};
use fast_lsmc::exercise::spec::ExerciseSpec;
use fast_lsmc::mc::mc_engine::{McConfig, MonteCarloEngine};
use fast_lsmc::mc::paths::{PathEnsemble, TimeGrid};
use fast_lsmc::mc::payoffs::ExercisePayoff;
use fast_lsmc::models::gbm::CorrelatedLognormalModel;
use fast_lsmc::models::model::PathModel;
use fast_lsmc::{price_european_paths, PricingError};
use nalgebra::DMatrix;

const S0: f64 = 100.0;
const K: f64 = 100.0;
const R: f64 = 0.05;
const SIGMA: f64 = 0.2;
const T: f64 = 1.0;

/// Cox-Ross-Rubinstein put; early exercise allowed on steps where `exercisable(i)`
fn crr_put(steps: usize, exercisable: impl Fn(usize) -> bool) -> f64 {
    let dt = T / steps as f64;
    let u = (SIGMA * dt.sqrt()).exp();
    let d = 1.0 / u;
    let p = ((R * dt).exp() - d) / (u - d);
    let disc = (-R * dt).exp();
    let level = |i: usize, j: usize| S0 * u.powi(j as i32) * d.powi((i - j) as i32);

    let mut values: Vec<f64> = (0..=steps).map(|j| (K - level(steps, j)).max(0.0)).collect();
    for i in (0..steps).rev() {
        for j in 0..=i {
            let cont = disc * (p * values[j + 1] + (1.0 - p) * values[j]);
            values[j] = if exercisable(i) {
                cont.max(K - level(i, j))
            } else {
                cont
            };
        }
    }
    values[0]
}

fn model() -> CorrelatedLognormalModel {
    let curve = DiscountCurve::flat(R).expect("valid curve");
    CorrelatedLognormalModel::single_asset(curve, 0.0, SIGMA).expect("valid model")
}

#[test]
fn test_bermudan_put_matches_binomial() {
    let engine = MonteCarloEngine::new(model());
    let grid = TimeGrid::uniform(T, 256).expect("valid grid");
    let cfg = McConfig {
        paths: 40_000,
        seed: 7,
        ..Default::default()
    };
    let put = ExercisePayoff::Put { asset: 0, k: K };
    let spec = ExerciseSpec::bermudan_every(&grid, 16, put).expect("valid spec");

    let (lsmc, se) = engine
        .price_exercisable(&spec, &[S0], &grid, &cfg, &LsmcConfig::default())
        .expect("Valid configuration");

    let bermudan = crr_put(256, |i| i % 16 == 0);
    let american = crr_put(1024, |_| true);
    let european = bs_analytic::bs_put_price(S0, K, R, 0.0, SIGMA, T);

    println!("\nLSMC Bermudan: {} ± {}", lsmc, se);
    println!("CRR Bermudan: {}", bermudan);
    println!("CRR American: {}", american);
    println!("European: {}", european);

    assert!(european < bermudan && bermudan <= american + 1e-3);
    assert!(
        (lsmc - bermudan).abs() < 3.0 * se + 0.05,
        "LSMC {} vs binomial {}",
        lsmc,
        bermudan
    );
    assert!(lsmc > european - 3.0 * se);
    assert!(lsmc < american + 3.0 * se + 0.05);
}

#[test]
fn test_american_put_report() {
    let m = model();
    let grid = TimeGrid::uniform(T, 50).expect("valid grid");
    let paths = m
        .simulate_paths(&[S0], &grid, 20_000, true, 17)
        .expect("paths");
    let spec = ExerciseSpec::american(&grid, ExercisePayoff::Put { asset: 0, k: K })
        .expect("valid spec");
    let config = LsmcConfig::default();
    let report = ExerciseEngine::new(&m, &config)
        .run(&spec, &paths)
        .expect("lsmc");

    assert_eq!(report.dates.len(), 50);
    assert!(report.dates.windows(2).all(|w| w[0].time < w[1].time));
    assert_eq!(report.dates[49].outcome, RegressionOutcome::Terminal);
    assert!(report.dates[..49]
        .iter()
        .all(|d| d.outcome == RegressionOutcome::Fitted { coefficients: 3 }));
    assert!(report
        .dates
        .iter()
        .all(|d| d.exercised_paths <= d.itm_paths));

    let american = crr_put(1000, |_| true);
    println!("\nLSMC American: {} ± {}, CRR {}", report.price, report.std_error, american);
    assert!((report.price - american).abs() < 3.0 * report.std_error + 0.08);
}

#[test]
fn test_lsmc_is_deterministic_across_thread_pools() {
    let m = model();
    let grid = TimeGrid::uniform(T, 32).expect("valid grid");
    let paths = m
        .simulate_paths(&[S0], &grid, 9_999, true, 1)
        .expect("paths");
    let spec = ExerciseSpec::bermudan_every(&grid, 4, ExercisePayoff::Put { asset: 0, k: K })
        .expect("valid spec");
    let config = LsmcConfig::default();
    let engine = ExerciseEngine::new(&m, &config);

    let first = engine.run(&spec, &paths).expect("lsmc");
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(1)
        .build()
        .expect("thread pool");
    let single = pool.install(|| engine.run(&spec, &paths).expect("lsmc"));
    assert_eq!(first, single);
}

#[test]
fn test_two_asset_basket_put() {
    let curve = DiscountCurve::flat(R).expect("valid curve");
    let corr = DMatrix::from_row_slice(2, 2, &[1.0, 0.5, 0.5, 1.0]);
    let m = CorrelatedLognormalModel::new(
        curve,
        vec![0.0.into()],
        vec![0.2.into(), 0.3.into()],
        Some(corr),
    )
    .expect("valid model");
    let grid = TimeGrid::uniform(T, 48).expect("valid grid");
    let paths: PathEnsemble = m
        .simulate_paths(&[100.0, 100.0], &grid, 30_000, true, 3)
        .expect("paths");
    let weights = vec![0.5, 0.5];

    let spec = ExerciseSpec::bermudan_every(
        &grid,
        4,
        ExercisePayoff::BasketPut {
            weights: weights.clone(),
            k: 100.0,
        },
    )
    .expect("valid spec");
    let config = LsmcConfig::default();
    let report = ExerciseEngine::new(&m, &config)
        .run(&spec, &paths)
        .expect("lsmc");

    let european_basket_put = |ens: &PathEnsemble| -> Vec<f64> {
        (0..ens.path_count())
            .map(|p| (100.0 - 0.5 * ens.terminal(p, 0) - 0.5 * ens.terminal(p, 1)).max(0.0))
            .collect()
    };
    let (european, _) =
        price_european_paths(&european_basket_put, &m, &paths, None).expect("price");

    println!("\nBasket put: Bermudan {} ± {}, European {}", report.price, report.std_error, european);
    assert!(report.price > european - 3.0 * report.std_error);
    assert!(report
        .dates
        .iter()
        .any(|d| d.outcome == RegressionOutcome::Fitted { coefficients: 6 }));
}

#[test]
fn test_cross_fitted_bermudan_put() {
    let m = model();
    let grid = TimeGrid::uniform(T, 256).expect("valid grid");
    let paths = m
        .simulate_paths(&[S0], &grid, 40_000, true, 7)
        .expect("paths");
    let spec = ExerciseSpec::bermudan_every(&grid, 16, ExercisePayoff::Put { asset: 0, k: K })
        .expect("valid spec");

    let plain_config = LsmcConfig::default();
    let cross_config = LsmcConfig {
        cross_fit: Some(7),
        ..Default::default()
    };
    let plain = ExerciseEngine::new(&m, &plain_config)
        .run(&spec, &paths)
        .expect("lsmc");
    let cross = ExerciseEngine::new(&m, &cross_config)
        .run(&spec, &paths)
        .expect("lsmc");
    let bermudan = crr_put(256, |i| i % 16 == 0);

    println!("\nPlain LSMC: {} ± {}", plain.price, plain.std_error);
    println!("Cross-fitted LSMC: {} ± {}", cross.price, cross.std_error);
    println!("CRR Bermudan: {}", bermudan);

    assert!(cross.dates[..cross.dates.len() - 1]
        .iter()
        .all(|d| d.outcome == RegressionOutcome::CrossFitted { coefficients: 3 }));
    assert!((cross.price - bermudan).abs() < 3.0 * cross.std_error + 0.05);
    assert!((cross.price - plain.price).abs() < 3.0 * cross.std_error);

    // same split seed, same result on any thread pool
    let again = ExerciseEngine::new(&m, &cross_config)
        .run(&spec, &paths)
        .expect("lsmc");
    assert_eq!(cross, again);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(1)
        .build()
        .expect("thread pool");
    let single = pool.install(|| {
        ExerciseEngine::new(&m, &cross_config)
            .run(&spec, &paths)
            .expect("lsmc")
    });
    assert_eq!(cross, single);
}

#[test]
fn test_schedule_errors() {
    let grid = TimeGrid::uniform(T, 10).expect("valid grid");
    let put = ExercisePayoff::Put { asset: 0, k: K };
    assert_eq!(
        ExerciseSpec::new(Vec::new(), put.clone()).err(),
        Some(PricingError::EmptyExerciseSchedule)
    );
    assert_eq!(
        ExerciseSpec::from_times(&grid, &[0.0], put).err(),
        Some(PricingError::EmptyExerciseSchedule)
    );
}
