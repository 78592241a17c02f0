// Benchmark Report Types
// Per-seed cash outcomes, their Monte Carlo summaries, and paired policy comparisons

use serde::Serialize;

/// Two-sided 95% normal quantile.
const Z_95: f64 = 1.96;

// ─── Summary statistics ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize)]
pub struct Stats {
    pub n: usize,
    pub mean: f64,
    pub std_dev: f64,
    pub ci_lower: f64,
    pub ci_upper: f64,
    pub min: f64,
    pub max: f64,
}

impl Stats {
    /// Sample statistics (Bessel-corrected); all zero when `samples` is empty.
    pub fn from_samples<I: IntoIterator<Item = f64>>(samples: I) -> Self {
        let samples: Vec<f64> = samples.into_iter().collect();
        let Some(first) = samples.first().copied() else {
            return Self::default();
        };
        let n = samples.len() as f64;
        let mean = samples.iter().sum::<f64>() / n;
        let std_dev = if samples.len() > 1 {
            (samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0)).sqrt()
        } else {
            0.0
        };
        let half = Z_95 * std_dev / n.sqrt();
        let (min, max) = samples.iter().fold((first, first), |(lo, hi), &x| (lo.min(x), hi.max(x)));
        Self {
            n: samples.len(),
            mean,
            std_dev,
            ci_lower: mean - half,
            ci_upper: mean + half,
            min,
            max,
        }
    }

    pub fn margin(&self) -> f64 {
        (self.ci_upper - self.ci_lower) / 2.0
    }

    /// Whole confidence interval above zero.
    pub fn significantly_positive(&self) -> bool {
        self.n > 1 && self.ci_lower > 0.0
    }
}

// ─── One run ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct BenchResult {
    pub scenario: String,
    pub variant: String,
    pub seed: u64,
    /// Set when the run aborted; the cash fields are then empty or zero
    pub error: Option<String>,
    pub initial_cash: Vec<f64>,
    pub final_cash: Vec<f64>,
    pub total_final_cash: f64,
    pub total_profit: f64,
    /// Total profit over total initial cash
    pub roi: f64,
    pub elapsed_ms: u128,
}

impl BenchResult {
    pub fn completed(&self) -> bool {
        self.error.is_none()
    }
}

// ─── One variant of one scenario ────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct MonteCarloReport {
    pub scenario_name: String,
    pub label: String,
    pub variant: String,
    pub n_runs: usize,
    pub failures: usize,
    pub final_cash: Stats,
    pub profit: Stats,
    pub roi: Stats,
    pub elapsed_ms: Stats,
    pub individual_runs: Vec<BenchResult>,
}

// ─── Paired comparison against the scenario's baseline variant ─────────────

/// Per-seed profit difference `variant - baseline`, over seeds where both completed.
#[derive(Debug, Clone, Serialize)]
pub struct Comparison {
    pub scenario_name: String,
    pub baseline: String,
    pub variant: String,
    pub profit_delta: Stats,
    /// Seeds on which the variant did at least as well
    pub wins: usize,
}

impl Comparison {
    pub fn paired(baseline: &MonteCarloReport, variant: &MonteCarloReport) -> Self {
        let pairs: Vec<(f64, f64)> = baseline
            .individual_runs
            .iter()
            .zip(&variant.individual_runs)
            .filter(|(b, v)| b.seed == v.seed && b.completed() && v.completed())
            .map(|(b, v)| (b.total_profit, v.total_profit))
            .collect();
        Self {
            scenario_name: variant.scenario_name.clone(),
            baseline: baseline.variant.clone(),
            variant: variant.variant.clone(),
            profit_delta: Stats::from_samples(pairs.iter().map(|(b, v)| v - b)),
            wins: pairs.iter().filter(|(b, v)| v >= b).count(),
        }
    }
}

// ─── Report file ────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct BenchReport {
    pub timestamp: String,
    pub version: &'static str,
    pub prng: &'static str,
    pub base_seed: u64,
    pub n_runs_per_scenario: usize,
    pub scenarios: Vec<MonteCarloReport>,
    pub comparisons: Vec<Comparison>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(seed: u64, profit: f64, error: Option<&str>) -> BenchResult {
        BenchResult {
            scenario: "S".into(),
            variant: "V".into(),
            seed,
            error: error.map(String::from),
            initial_cash: vec![1000.0],
            final_cash: vec![1000.0 + profit],
            total_final_cash: 1000.0 + profit,
            total_profit: profit,
            roi: profit / 1000.0,
            elapsed_ms: 1,
        }
    }

    fn report(variant: &str, runs: Vec<BenchResult>) -> MonteCarloReport {
        MonteCarloReport {
            scenario_name: "S".into(),
            label: "s".into(),
            variant: variant.into(),
            n_runs: runs.len(),
            failures: 0,
            final_cash: Stats::default(),
            profit: Stats::default(),
            roi: Stats::default(),
            elapsed_ms: Stats::default(),
            individual_runs: runs,
        }
    }

    #[test]
    fn stats_of_known_samples() {
        let s = Stats::from_samples([2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert_eq!(s.n, 8);
        assert!((s.mean - 5.0).abs() < 1e-12);
        assert!((s.std_dev - (32.0f64 / 7.0).sqrt()).abs() < 1e-12);
        assert_eq!((s.min, s.max), (2.0, 9.0));
        assert!((s.margin() - 1.96 * s.std_dev / 8f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn empty_and_single_samples() {
        assert_eq!(Stats::from_samples(Vec::new()).n, 0);
        let one = Stats::from_samples([3.0]);
        assert_eq!((one.mean, one.std_dev, one.margin()), (3.0, 0.0, 0.0));
        assert!(!one.significantly_positive());
    }

    #[test]
    fn comparison_pairs_completed_seeds_only() {
        let baseline = report("simple", vec![run(1, 100.0, None), run(2, 50.0, None), run(3, 0.0, None)]);
        let variant = report("dynamic", vec![run(1, 150.0, None), run(2, 40.0, None), run(3, 0.0, Some("abort"))]);
        let cmp = Comparison::paired(&baseline, &variant);
        assert_eq!(cmp.profit_delta.n, 2);
        assert!((cmp.profit_delta.mean - 20.0).abs() < 1e-12);
        assert_eq!(cmp.wins, 1);
    }
}
