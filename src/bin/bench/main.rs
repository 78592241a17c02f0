// FSS Benchmark Runner
// Monte Carlo (N=30) comparison of operations policies, ChaCha-derived seeds
//
// Usage:
//   cargo run --release --bin bench                     # Run all scenarios (30 runs each)
//   cargo run --release --bin bench -- --runs 5         # Quick mode (5 runs each)
//   cargo run --release --bin bench -- PAIR             # Filter by name
//   cargo run --release --bin bench -- --seed 42        # Custom base seed

mod monte_carlo;
mod report;
mod scenarios;

use report::*;
use scenarios::*;
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use tracing_subscriber::EnvFilter;

// ─── CLI Parsing ────────────────────────────────────────────────────────────

struct CliArgs {
    runs: usize,
    seed: u64,
    filter: Option<String>,
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut cli = CliArgs {
        runs: 30,
        seed: 0,
        filter: None,
    };

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--runs" => {
                i += 1;
                if i < args.len() {
                    cli.runs = args[i].parse().unwrap_or(30);
                }
            }
            "--seed" => {
                i += 1;
                if i < args.len() {
                    cli.seed = args[i].parse().unwrap_or(0);
                }
            }
            arg if !arg.starts_with('-') => {
                cli.filter = Some(arg.to_string());
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
            }
        }
        i += 1;
    }

    cli
}

// ─── Main ───────────────────────────────────────────────────────────────────

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("error")))
        .with_writer(std::io::stderr)
        .init();

    let cli = parse_args();
    let all_scenarios = scenarios();

    let to_run: Vec<&Scenario> = match &cli.filter {
        Some(f) => {
            let f_lower = f.to_lowercase();
            all_scenarios.iter()
                .filter(|s| s.name.to_lowercase().contains(&f_lower)
                          || s.label.to_lowercase().contains(&f_lower))
                .collect()
        }
        None => all_scenarios.iter().collect(),
    };

    if to_run.is_empty() {
        eprintln!("No scenarios match filter: {:?}", cli.filter);
        std::process::exit(1);
    }

    let seeds = monte_carlo::seeds(cli.seed, cli.runs);

    println!("\n  FSS Benchmark Runner");
    println!("  PRNG: ChaCha8Rng | Runs/variant: {} | Base seed: {}", cli.runs, cli.seed);
    println!("  Running {} scenario(s)...\n", to_run.len());
    println!("  {:<22} {:<20} {:>18} {:>18} {:>6} {:>7}",
        "Scenario", "Variant", "Final cash", "Profit", "Fail", "Time");
    println!("  {}", "-".repeat(96));

    let suite_start = Instant::now();
    let mut mc_reports = Vec::new();
    let mut comparisons = Vec::new();
    let mut aborted = 0;

    for scenario in &to_run {
        let mut per_variant = Vec::new();
        for variant in scenario.variants {
            let report = monte_carlo::run_monte_carlo(scenario, variant, &seeds);

            println!("  {:<22} {:<20} {:>9.1}±{:<8.1} {:>9.1}±{:<8.1} {:>6} {:>5.0}ms",
                scenario.name,
                report.variant,
                report.final_cash.mean, report.final_cash.margin(),
                report.profit.mean, report.profit.margin(),
                report.failures,
                report.elapsed_ms.mean,
            );

            aborted += report.failures;
            per_variant.push(report);
        }
        comparisons.extend(monte_carlo::compare(&per_variant));
        mc_reports.extend(per_variant);
    }

    let suite_elapsed = suite_start.elapsed();
    println!("  {}", "-".repeat(96));

    if !comparisons.is_empty() {
        println!("\n  {:<22} {:<20} {:>18} {:>10}", "Scenario", "vs baseline", "Profit delta", "Wins");
        for cmp in &comparisons {
            let marker = if cmp.profit_delta.significantly_positive() { " *" } else { "" };
            println!("  {:<22} {:<20} {:>9.1}±{:<8.1} {:>5}/{:<4}{}",
                cmp.scenario_name,
                format!("{} - {}", cmp.variant, cmp.baseline),
                cmp.profit_delta.mean, cmp.profit_delta.margin(),
                cmp.wins, cmp.profit_delta.n,
                marker,
            );
        }
        println!("  (* 95% interval above zero)");
    }
    println!("  Reports: {}  Aborted runs: {}  Suite time: {:.1}s\n",
        mc_reports.len(), aborted, suite_elapsed.as_secs_f64());

    // ─── Write JSON Report ──────────────────────────────────────────────

    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();

    let report = BenchReport {
        timestamp: format!("{}", ts),
        version: env!("CARGO_PKG_VERSION"),
        prng: "ChaCha8Rng",
        base_seed: cli.seed,
        n_runs_per_scenario: cli.runs,
        scenarios: mc_reports,
        comparisons,
    };

    let dir = std::path::Path::new("benchmark-results");
    if let Err(e) = std::fs::create_dir_all(dir) {
        eprintln!("  Failed to create {}: {}", dir.display(), e);
        std::process::exit(1);
    }
    let path = dir.join("fss-bench.json");
    let written = serde_json::to_string_pretty(&report)
        .map_err(|e| e.to_string())
        .and_then(|json| std::fs::write(&path, json).map_err(|e| e.to_string()));
    match written {
        Ok(()) => println!("  Results saved to: {}\n", path.display()),
        Err(e) => {
            eprintln!("  Failed to write {}: {}", path.display(), e);
            std::process::exit(1);
        }
    }

    if aborted > 0 {
        std::process::exit(1);
    }
}
