// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Federated Satellite Systems Simulation ("FSS") - Simulation Core

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::audit::{self, AuditError};
use crate::context::Context;
use crate::federate::FederateError;
use crate::game::{DesignSpec, Game, ScenarioError};
use crate::ledger::Cash;
use crate::lp::{SimplexSolver, Solver};
use crate::operations::{Operations, OperationsError, OperationsKind, StoragePenalty, Target};
use crate::types::{FederateId, FederationId};

// ─── Errors ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SimulationError {
    #[error(transparent)]
    Scenario(#[from] ScenarioError),

    #[error(transparent)]
    Operations(#[from] OperationsError),

    #[error("audit failed after turn {turn}: {source}")]
    Audit { turn: u32, source: AuditError },

    #[error(transparent)]
    Federate(#[from] FederateError),

    #[error("unknown federation {0}")]
    UnknownFederation(FederationId),
}

// ─── Configuration ──────────────────────────────────────────────────────────

/// One run: who flies what, for how long, under which policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    pub turns: u32,
    pub federates: usize,
    /// Zero grants each federate exactly the cost of its initial designs
    pub initial_cash: Cash,
    pub seed: u64,
    /// `[<federate>.]<Type>@<Location>,<subsystem>,...`
    pub designs: Vec<String>,
    /// Per-federate policy
    pub operations: OperationsKind,
    /// Federation-wide policy; replaces the per-federate ones when set
    pub federation_operations: Option<OperationsKind>,
    /// Overrides the storage penalty of every scheduler preset
    pub storage_penalty: Option<StoragePenalty>,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            turns: 24,
            federates: 1,
            initial_cash: Cash::from_units(1200),
            seed: 0,
            designs: Vec::new(),
            operations: OperationsKind::Dynamic,
            federation_operations: None,
            storage_penalty: None,
        }
    }
}

// ─── Results ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FederateResult {
    pub id: FederateId,
    pub name: String,
    pub initial_cash: Cash,
    pub final_cash: Cash,
}

impl FederateResult {
    pub fn profit(&self) -> Cash {
        self.final_cash - self.initial_cash
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub seed: u64,
    pub turns: u32,
    pub federates: Vec<FederateResult>,
}

/// `initial:final` per federate, comma-separated.
impl fmt::Display for RunResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, r) in self.federates.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}:{}", r.initial_cash, r.final_cash)?;
        }
        Ok(())
    }
}

// ─── Simulation ─────────────────────────────────────────────────────────────

/// Drives one scenario from setup to liquidation.
#[derive(Debug, Clone)]
pub struct Simulation {
    game: Game,
    config: ScenarioConfig,
    solver: Arc<dyn Solver>,
}

impl Simulation {
    pub fn new(config: ScenarioConfig) -> Self {
        Self { game: Game::default(), config, solver: Arc::new(SimplexSolver) }
    }

    pub fn with_game(mut self, game: Game) -> Self {
        self.game = game;
        self
    }

    pub fn with_solver(mut self, solver: Arc<dyn Solver>) -> Self {
        self.solver = solver;
        self
    }

    pub fn config(&self) -> &ScenarioConfig {
        &self.config
    }

    fn designs(&self) -> Result<Vec<DesignSpec>, ScenarioError> {
        let count = self.config.federates;
        self.config
            .designs
            .iter()
            .map(|text| {
                let design = self.game.parse_design(text)?;
                if design.federate > count {
                    return Err(ScenarioError::UnknownFederate { index: design.federate, count });
                }
                Ok(design)
            })
            .collect()
    }

    /// Build the context: federates joined, designs deployed, clock at zero.
    pub fn setup(&self) -> Result<(Context, FederationId, Vec<FederateId>), SimulationError> {
        let cfg = &self.config;
        let designs = self.designs()?;
        let mut ctx = self.game.context(cfg.seed);
        ctx.set_max_time(cfg.turns);

        let mut by_federate: BTreeMap<usize, Vec<&DesignSpec>> = BTreeMap::new();
        for design in &designs {
            by_federate.entry(design.federate).or_default().push(design);
        }

        let fss = ctx.add_federation("FSS");
        let mut federates = Vec::with_capacity(cfg.federates);
        for index in 1..=cfg.federates {
            let own = by_federate.get(&index).map(Vec::as_slice).unwrap_or_default();
            let cash = if cfg.initial_cash.is_zero() {
                own.iter()
                    .map(|d| self.game.outlay(d, &ctx.locations))
                    .sum::<Result<Cash, _>>()?
            } else {
                cfg.initial_cash
            };
            let id = ctx
                .join(fss, format!("F{index}"), cash)
                .ok_or(SimulationError::UnknownFederation(fss))?;
            federates.push(id);
        }
        ctx.init();

        for index in 1..=cfg.federates {
            for design in by_federate.get(&index).into_iter().flatten() {
                let system = self.game.deploy(&mut ctx, federates[index - 1], design)?;
                debug!(federate = %federates[index - 1], %system, design = %design.system, "deployed");
            }
        }
        Ok((ctx, fss, federates))
    }

    /// A fresh controller of `kind`, with the configured storage penalty if any.
    fn operations(&self, kind: OperationsKind) -> Operations {
        match (kind.scheduler_config(), self.config.storage_penalty) {
            (Some(mut preset), Some(penalty)) => {
                preset.storage_penalty = penalty;
                Operations::with_config(kind, preset, self.solver.clone())
            }
            _ => Operations::with_solver(kind, self.solver.clone()),
        }
    }

    pub fn run(&self) -> Result<RunResult, SimulationError> {
        let cfg = &self.config;
        let (mut ctx, fss, federates) = self.setup()?;
        info!(seed = cfg.seed, turns = cfg.turns, federates = federates.len(), "run started");

        let mut controllers: Vec<(Target, Operations)> = match cfg.federation_operations {
            Some(kind) => vec![(Target::Federation(fss), self.operations(kind))],
            None => federates
                .iter()
                .map(|&f| (Target::Federate(f), self.operations(cfg.operations)))
                .collect(),
        };

        for turn in 0..cfg.turns {
            for (target, ops) in &mut controllers {
                ops.execute(&mut ctx, *target)?;
            }
            ctx.tick();
            ctx.tock()?;
            let report = audit::verify(&ctx).map_err(|source| SimulationError::Audit { turn, source })?;
            debug!(turn, contracts = report.contracts, data = report.data_units, "turn committed");
        }

        let mut results = Vec::with_capacity(federates.len());
        for federate in federates {
            ctx.liquidate(federate)?;
            let fed = ctx
                .federate(federate)
                .ok_or(FederateError::UnknownFederate(federate))?;
            info!(%federate, initial = %fed.initial_cash, final_cash = %fed.cash, "run finished");
            results.push(FederateResult {
                id: fed.id,
                name: fed.name.clone(),
                initial_cash: fed.initial_cash,
                final_cash: fed.cash,
            });
        }
        Ok(RunResult { seed: cfg.seed, turns: cfg.turns, federates: results })
    }
}
