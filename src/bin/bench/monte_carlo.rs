// Monte Carlo Infrastructure: N runs per scenario variant with statistical aggregation
// Seeds are drawn from one ChaCha8 stream so every variant sees the same event decks

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use fss_engine::adapter::cash_to_f64;
use fss_engine::{Cash, ScenarioConfig, Simulation};

use crate::report::*;
use crate::scenarios::{Scenario, Variant};

use std::time::Instant;

/// Run seeds for one bench invocation.
pub fn seeds(base_seed: u64, n_runs: usize) -> Vec<u64> {
    let mut rng = ChaCha8Rng::seed_from_u64(base_seed);
    (0..n_runs).map(|_| rng.gen()).collect()
}

/// Run a single scenario variant with a specific seed.
pub fn run_single(scenario: &Scenario, variant: &Variant, seed: u64) -> BenchResult {
    let start = Instant::now();
    let config = ScenarioConfig {
        turns: scenario.turns,
        federates: scenario.federates,
        initial_cash: Cash::from_units(scenario.initial_cash),
        seed,
        designs: scenario.designs.iter().map(|d| d.to_string()).collect(),
        operations: variant.operations,
        federation_operations: variant.federation_operations,
        storage_penalty: variant.storage_penalty,
    };

    let mut result = BenchResult {
        scenario: scenario.name.to_string(),
        variant: variant.label.to_string(),
        seed,
        error: None,
        initial_cash: Vec::new(),
        final_cash: Vec::new(),
        total_final_cash: 0.0,
        total_profit: 0.0,
        roi: 0.0,
        elapsed_ms: 0,
    };
    match Simulation::new(config).run() {
        Ok(run) => {
            result.initial_cash = run.federates.iter().map(|f| cash_to_f64(f.initial_cash)).collect();
            result.final_cash = run.federates.iter().map(|f| cash_to_f64(f.final_cash)).collect();
            result.total_final_cash = result.final_cash.iter().sum();
            result.total_profit = run.federates.iter().map(|f| cash_to_f64(f.profit())).sum();
            let invested: f64 = result.initial_cash.iter().sum();
            if invested > 0.0 {
                result.roi = result.total_profit / invested;
            }
        }
        Err(e) => {
            tracing::warn!(scenario = scenario.name, variant = variant.label, seed, error = %e, "run aborted");
            result.error = Some(e.to_string());
        }
    }
    result.elapsed_ms = start.elapsed().as_millis();
    result
}

/// Run Monte Carlo: one run of `variant` per seed, aggregate stats.
pub fn run_monte_carlo(scenario: &Scenario, variant: &Variant, seeds: &[u64]) -> MonteCarloReport {
    let results: Vec<BenchResult> = seeds.iter().map(|&seed| run_single(scenario, variant, seed)).collect();
    aggregate(scenario, variant, results)
}

/// Every variant after the first, paired against the first (the baseline).
pub fn compare(reports: &[MonteCarloReport]) -> Vec<Comparison> {
    match reports.split_first() {
        Some((baseline, rest)) => rest.iter().map(|v| Comparison::paired(baseline, v)).collect(),
        None => Vec::new(),
    }
}

/// Aggregate individual runs into a MonteCarloReport. Aborted runs are counted, not averaged.
fn aggregate(scenario: &Scenario, variant: &Variant, results: Vec<BenchResult>) -> MonteCarloReport {
    let completed: Vec<&BenchResult> = results.iter().filter(|r| r.completed()).collect();
    let failures = results.len() - completed.len();

    let final_cash = Stats::from_samples(completed.iter().map(|r| r.total_final_cash));
    let profit = Stats::from_samples(completed.iter().map(|r| r.total_profit));
    let roi = Stats::from_samples(completed.iter().map(|r| r.roi));
    let elapsed_ms = Stats::from_samples(results.iter().map(|r| r.elapsed_ms as f64));

    MonteCarloReport {
        scenario_name: scenario.name.to_string(),
        label: scenario.label.to_string(),
        variant: variant.label.to_string(),
        n_runs: results.len(),
        failures,
        final_cash,
        profit,
        roi,
        elapsed_ms,
        individual_runs: results,
    }
}
