// scripts/benchmark.rs
use fast_lsmc::analytics::bs_analytic;
use fast_lsmc::curves::DiscountCurve;
use fast_lsmc::exercise::lsmc::{ExerciseEngine, LsmcConfig};
use fast_lsmc::exercise::spec::ExerciseSpec;
use fast_lsmc::math_utils::Timer;
use fast_lsmc::mc::mc_engine::{ControlVariate, McConfig, MonteCarloEngine};
use fast_lsmc::mc::paths::TimeGrid;
use fast_lsmc::mc::payoffs::{ExercisePayoff, Payoff};
use fast_lsmc::models::gbm::CorrelatedLognormalModel;
use fast_lsmc::models::model::PathModel;
use fast_lsmc::PricingResult;
use std::env;
use std::fs::File;
use std::io::{self, Write};
use tracing_subscriber::EnvFilter;

const S0: f64 = 100.0;
const K: f64 = 100.0;
const R: f64 = 0.05;
const SIGMA: f64 = 0.2;
const T: f64 = 1.0;

#[derive(Debug)]
struct SystemInfo {
    os: String,
    cpu_model: String,
    cpu_cores: usize,
    rayon_threads: usize,
    rustc_flags: String,
}

impl SystemInfo {
    fn gather() -> Self {
        Self {
            os: env::consts::OS.to_string(),
            cpu_model: Self::get_cpu_model(),
            cpu_cores: num_cpus::get(),
            rayon_threads: rayon::current_num_threads(),
            rustc_flags: env::var("RUSTFLAGS").unwrap_or_else(|_| "default".to_string()),
        }
    }

    fn get_cpu_model() -> String {
        #[cfg(target_os = "linux")]
        {
            std::fs::read_to_string("/proc/cpuinfo")
                .ok()
                .and_then(|content| {
                    content
                        .lines()
                        .find(|line| line.starts_with("model name"))
                        .and_then(|line| line.split(':').nth(1))
                        .map(|s| s.trim().to_string())
                })
                .unwrap_or_else(|| "Unknown CPU".to_string())
        }
        #[cfg(not(target_os = "linux"))]
        {
            "Unknown CPU".to_string()
        }
    }
}

#[derive(Debug)]
struct BenchmarkResult {
    name: String,
    paths: usize,
    time_ms: f64,
    throughput_paths_per_sec: f64,
    value: f64,
    std_error: f64,
    reference: Option<f64>,
}

fn model() -> PricingResult<CorrelatedLognormalModel> {
    CorrelatedLognormalModel::single_asset(DiscountCurve::flat(R)?, 0.0, SIGMA)
}

fn run_european_benchmarks() -> PricingResult<Vec<BenchmarkResult>> {
    let mut results = Vec::new();
    let engine = MonteCarloEngine::new(model()?);
    let grid = TimeGrid::uniform(T, 64)?;
    let call = Payoff::EuropeanCall { asset: 0, k: K };
    let analytic = bs_analytic::bs_call_price(S0, K, R, 0.0, SIGMA, T);

    for &paths in &[10_000, 100_000, 1_000_000] {
        println!("Running European benchmarks with {} paths...", paths);
        let cfg = McConfig {
            paths,
            seed: 42,
            antithetic: true,
        };

        let mut timer = Timer::new();
        timer.start();
        let (price, se) = engine.price(&call, &[S0], &grid, &cfg, None)?;
        let time_ms = timer.elapsed_ms();
        results.push(BenchmarkResult {
            name: format!("European Call ({}k paths)", paths / 1000),
            paths,
            time_ms,
            throughput_paths_per_sec: paths as f64 / (time_ms / 1000.0),
            value: price,
            std_error: se,
            reference: Some(analytic),
        });

        let asian = Payoff::asian_call(0, K);
        timer.start();
        let (price, se) = engine.price(
            &asian,
            &[S0],
            &grid,
            &cfg,
            Some(ControlVariate::new(&call, analytic)),
        )?;
        let time_ms = timer.elapsed_ms();
        results.push(BenchmarkResult {
            name: format!("Asian Call + CV ({}k paths)", paths / 1000),
            paths,
            time_ms,
            throughput_paths_per_sec: paths as f64 / (time_ms / 1000.0),
            value: price,
            std_error: se,
            reference: None,
        });
    }
    Ok(results)
}

fn run_lsmc_benchmarks() -> PricingResult<Vec<BenchmarkResult>> {
    let mut results = Vec::new();
    let model = model()?;
    let grid = TimeGrid::uniform(T, 256)?;
    let config = LsmcConfig::default();
    let put = ExercisePayoff::Put { asset: 0, k: K };

    for (every, label) in [(16, "Bermudan (16 dates)"), (1, "American (256 dates)")] {
        let spec = ExerciseSpec::bermudan_every(&grid, every, put.clone())?;
        let paths = 100_000;
        println!("Benchmarking LSMC {}...", label);

        let mut timer = Timer::new();
        timer.start();
        let ensemble = model.simulate_paths(&[S0], &grid, paths, true, 7)?;
        let report = ExerciseEngine::new(&model, &config).run(&spec, &ensemble)?;
        let time_ms = timer.elapsed_ms();
        results.push(BenchmarkResult {
            name: format!("LSMC {} Put", label),
            paths,
            time_ms,
            throughput_paths_per_sec: paths as f64 / (time_ms / 1000.0),
            value: report.price,
            std_error: report.std_error,
            reference: None,
        });
    }
    Ok(results)
}

fn write_results_to_csv(
    results: &[BenchmarkResult],
    system_info: &SystemInfo,
    filename: &str,
) -> io::Result<()> {
    let mut file = File::create(filename)?;
    writeln!(file, "# System Information")?;
    writeln!(file, "# OS: {}", system_info.os)?;
    writeln!(file, "# CPU: {}", system_info.cpu_model)?;
    writeln!(file, "# CPU Cores: {}", system_info.cpu_cores)?;
    writeln!(file, "# Rayon Threads: {}", system_info.rayon_threads)?;
    writeln!(file, "# RUSTFLAGS: {}", system_info.rustc_flags)?;
    writeln!(
        file,
        "# Benchmark Date: {}",
        chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    )?;
    writeln!(
        file,
        "name,paths,time_ms,throughput_paths_per_sec,value,std_error,reference"
    )?;
    for r in results {
        writeln!(
            file,
            "{},{},{:.3},{:.0},{:.6},{:.6},{}",
            r.name,
            r.paths,
            r.time_ms,
            r.throughput_paths_per_sec,
            r.value,
            r.std_error,
            r.reference.map_or_else(String::new, |v| format!("{:.6}", v))
        )?;
    }
    Ok(())
}

fn print_results(results: &[BenchmarkResult]) {
    println!(
        "\n{:<36} {:>10} {:>12} {:>14} {:>12} {:>10}",
        "Benchmark", "Paths", "Time (ms)", "Paths/sec", "Value", "SE"
    );
    println!("{}", "-".repeat(100));
    for r in results {
        println!(
            "{:<36} {:>10} {:>12.2} {:>14.0} {:>12.6} {:>10.6}",
            r.name, r.paths, r.time_ms, r.throughput_paths_per_sec, r.value, r.std_error
        );
        if let Some(reference) = r.reference {
            println!("{:<36} reference {:.6}", "", reference);
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let system_info = SystemInfo::gather();
    println!("=== fast-lsmc benchmark ===");
    println!("{:#?}", system_info);

    let mut results = run_european_benchmarks()?;
    results.extend(run_lsmc_benchmarks()?);
    print_results(&results);

    let filename = env::args()
        .nth(1)
        .unwrap_or_else(|| "benchmark_results.csv".to_string());
    write_results_to_csv(&results, &system_info, &filename)?;
    println!("\nResults written to {}", filename);
    Ok(())
}
