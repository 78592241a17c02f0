//! FSS scenario runner
//!
//! Runs one scenario and prints `initial:final` cash per federate.
//!
//! ```text
//! fss -d 24 -i 1200 -s 0 -o dynamic 1.SmallSat@LEO1,VIS,pSGL 1.GroundSta@SUR1,pSGL
//! fss -o dynamic --storage-penalty opportunity 1.MediumSat@LEO1,SAR,VIS,pSGL,pSGL 1.GroundSta@SUR1,pSGL
//! ```

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use fss_engine::adapter::cash_from_f64;
use fss_engine::{OperationsError, OperationsKind, ScenarioConfig, Simulation, SimulationError, StoragePenalty};
use tracing::{error, info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// File the full model of a fatally infeasible plan is written to.
const LP_DEBUG_FILE: &str = "lp_debug.txt";

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Ops {
    Simple,
    Dynamic,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FederationOps {
    None,
    Dynamic,
    Fixed,
    DynamicFixed,
}

/// `opportunity` or a fixed per-step weight such as `-0.1`.
fn parse_storage_penalty(arg: &str) -> Result<StoragePenalty, String> {
    match arg {
        "opportunity" => Ok(StoragePenalty::OpportunityCost),
        weight => weight
            .parse::<f64>()
            .map(StoragePenalty::Fixed)
            .map_err(|_| format!("expected `opportunity` or a number, got `{weight}`")),
    }
}

impl From<Ops> for OperationsKind {
    fn from(ops: Ops) -> Self {
        match ops {
            Ops::Simple => OperationsKind::Simple,
            Ops::Dynamic => OperationsKind::Dynamic,
        }
    }
}

impl From<FederationOps> for Option<OperationsKind> {
    fn from(ops: FederationOps) -> Self {
        match ops {
            FederationOps::None => None,
            FederationOps::Dynamic => Some(OperationsKind::DynamicFederation),
            FederationOps::Fixed => Some(OperationsKind::FixedCostFederation),
            FederationOps::DynamicFixed => Some(OperationsKind::DynamicFixedCostFederation),
        }
    }
}

/// Federated satellite systems simulation
#[derive(Parser, Debug)]
#[command(name = "fss")]
#[command(about = "Run one federated satellite systems scenario", long_about = None)]
struct Args {
    /// Initial designs, `[<federate>.]<Type>@<Location>,<subsystem>,...`
    designs: Vec<String>,

    /// Number of turns
    #[arg(short = 'd', long)]
    turns: Option<u32>,

    /// Number of federates
    #[arg(short = 'p', long)]
    federates: Option<usize>,

    /// Initial cash per federate; 0 grants the cost of the initial designs
    #[arg(short, long)]
    initial_cash: Option<f64>,

    /// Seed for the event deck and disturbance rolls
    #[arg(short, long)]
    seed: Option<u64>,

    /// Per-federate operations
    #[arg(short = 'o', long, value_enum)]
    ops: Option<Ops>,

    /// Federation operations; replaces the per-federate ones
    #[arg(short = 'f', long, value_enum)]
    fops: Option<FederationOps>,

    /// Scheduler storage penalty: `opportunity` or a fixed weight
    #[arg(long, value_parser = parse_storage_penalty, allow_hyphen_values = true)]
    storage_penalty: Option<StoragePenalty>,

    /// Scenario file (JSON); command-line values override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the full result as JSON
    #[arg(long)]
    json: bool,

    /// Debug logging (RUST_LOG takes precedence)
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn scenario(&self) -> Result<ScenarioConfig, String> {
        let mut cfg = match &self.config {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|e| format!("{}: {e}", path.display()))?;
                serde_json::from_str(&text).map_err(|e| format!("{}: {e}", path.display()))?
            }
            None => ScenarioConfig::default(),
        };
        if !self.designs.is_empty() {
            cfg.designs = self.designs.clone();
        }
        if let Some(turns) = self.turns {
            cfg.turns = turns;
        }
        if let Some(federates) = self.federates {
            cfg.federates = federates;
        }
        if let Some(cash) = self.initial_cash {
            cfg.initial_cash = cash_from_f64(cash);
        }
        if let Some(seed) = self.seed {
            cfg.seed = seed;
        }
        if let Some(ops) = self.ops {
            cfg.operations = ops.into();
        }
        if let Some(fops) = self.fops {
            cfg.federation_operations = fops.into();
        }
        if let Some(penalty) = self.storage_penalty {
            cfg.storage_penalty = Some(penalty);
        }
        Ok(cfg)
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("warning: tracing subscriber already installed");
    }
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    let cfg = match args.scenario() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(2);
        }
    };
    info!(designs = cfg.designs.len(), seed = cfg.seed, "scenario loaded");

    match Simulation::new(cfg).run() {
        Ok(result) if args.json => match serde_json::to_string_pretty(&result) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("Error: {e}");
                std::process::exit(1);
            }
        },
        Ok(result) => println!("{result}"),
        Err(SimulationError::Operations(OperationsError::PlanInfeasible { federate, dump })) => {
            error!(%federate, "infeasible plan, writing {LP_DEBUG_FILE}");
            if let Err(e) = std::fs::write(LP_DEBUG_FILE, dump) {
                eprintln!("Error: could not write {LP_DEBUG_FILE}: {e}");
            }
            eprintln!("Error: no feasible plan for federate {federate}; model written to {LP_DEBUG_FILE}");
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}
