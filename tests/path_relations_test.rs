// tests/path_relations_test.rs
//! Ordering relations between payoffs priced on shared simulated paths
use fast_lsmc::curves::DiscountCurve;
use fast_lsmc::mc::mc_engine::{McConfig, MonteCarloEngine};
use fast_lsmc::mc::paths::{PathEnsemble, TimeGrid};
use fast_lsmc::mc::payoffs::Payoff;
use fast_lsmc::models::gbm::CorrelatedLognormalModel;
use fast_lsmc::models::model::PathModel;

fn setup() -> (MonteCarloEngine<CorrelatedLognormalModel>, PathEnsemble) {
    let curve = DiscountCurve::flat(0.05).expect("valid curve");
    let model = CorrelatedLognormalModel::single_asset(curve, 0.0, 0.2).expect("valid model");
    let grid = TimeGrid::uniform(1.0, 64).expect("valid grid");
    let paths = model
        .simulate_paths(&[100.0], &grid, 20_000, true, 2024)
        .expect("paths");
    (MonteCarloEngine::new(model), paths)
}

fn price(engine: &MonteCarloEngine<CorrelatedLognormalModel>, payoff: &Payoff, paths: &PathEnsemble) -> f64 {
    engine.price_paths(payoff, paths, None).expect("price").0
}

#[test]
fn test_barrier_monotonicity() {
    let (engine, paths) = setup();
    let vanilla = price(&engine, &Payoff::EuropeanCall { asset: 0, k: 100.0 }, &paths);
    let out_130 = price(
        &engine,
        &Payoff::UpAndOutCall {
            asset: 0,
            k: 100.0,
            barrier: 130.0,
        },
        &paths,
    );
    let out_140 = price(
        &engine,
        &Payoff::UpAndOutCall {
            asset: 0,
            k: 100.0,
            barrier: 140.0,
        },
        &paths,
    );

    println!("\nUp-and-out 130: {}, 140: {}, vanilla: {}", out_130, out_140, vanilla);
    assert!(out_130 <= out_140);
    assert!(out_140 <= vanilla);
    assert!(out_130 > 0.0);
}

#[test]
fn test_in_out_parity() {
    let (engine, paths) = setup();
    let vanilla = price(&engine, &Payoff::EuropeanCall { asset: 0, k: 100.0 }, &paths);
    let knock_in = price(
        &engine,
        &Payoff::UpAndInCall {
            asset: 0,
            k: 100.0,
            barrier: 120.0,
        },
        &paths,
    );
    let knock_out = price(
        &engine,
        &Payoff::UpAndOutCall {
            asset: 0,
            k: 100.0,
            barrier: 120.0,
        },
        &paths,
    );
    assert!((knock_in + knock_out - vanilla).abs() < 1e-9);
}

#[test]
fn test_asian_below_vanilla() {
    let (engine, paths) = setup();
    let vanilla = price(&engine, &Payoff::EuropeanCall { asset: 0, k: 100.0 }, &paths);
    let asian = price(&engine, &Payoff::asian_call(0, 100.0), &paths);
    println!("\nAsian: {}, vanilla: {}", asian, vanilla);
    assert!(asian < vanilla);
}

#[test]
fn test_digital_decomposition() {
    // asset-or-nothing minus K cash-or-nothing is the vanilla call
    let (engine, paths) = setup();
    let k = 105.0;
    let vanilla = price(&engine, &Payoff::EuropeanCall { asset: 0, k }, &paths);
    let asset = price(&engine, &Payoff::AssetOrNothingCall { asset: 0, k }, &paths);
    let cash = price(
        &engine,
        &Payoff::CashOrNothingCall {
            asset: 0,
            k,
            cash: k,
        },
        &paths,
    );
    assert!((asset - cash - vanilla).abs() < 1e-9);
}

#[test]
fn test_call_increases_with_spot() {
    let curve = DiscountCurve::flat(0.05).expect("valid curve");
    let engine = MonteCarloEngine::new(
        CorrelatedLognormalModel::single_asset(curve, 0.0, 0.2).expect("valid model"),
    );
    let grid = TimeGrid::uniform(1.0, 16).expect("valid grid");
    let cfg = McConfig {
        paths: 10_000,
        seed: 99,
        ..Default::default()
    };
    let call = Payoff::EuropeanCall { asset: 0, k: 100.0 };

    let prices: Vec<f64> = [80.0, 90.0, 100.0, 110.0, 120.0]
        .iter()
        .map(|&s0| {
            engine
                .price(&call, &[s0], &grid, &cfg, None)
                .expect("Valid configuration")
                .0
        })
        .collect();
    println!("\nCall prices by spot: {:?}", prices);
    assert!(prices.windows(2).all(|w| w[0] < w[1]));
}
