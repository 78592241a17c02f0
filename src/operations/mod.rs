// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Federated Satellite Systems Simulation ("FSS") - Operations

//! Per-turn decision policies.
//!
//! | Kind | Plans for | Controls | Fees | Infeasible plan |
//! |---|---|---|---|---|
//! | `Simple` | each federate, greedily | own systems | none | n/a |
//! | `Dynamic` | each federate | own systems | none | fatal |
//! | `DynamicFederation` | the whole federation at once | every member | none | skipped |
//! | `FixedCostFederation` | each federate in stored order, this turn only | own spacecraft | downlink/crosslink | skipped |
//! | `DynamicFixedCostFederation` | as above, three-turn horizon | own spacecraft | downlink/crosslink | skipped |
//!
//! Federation-wide planners run federates in their stored order; earlier
//! federates consume shared link capacity first.

mod execute;
mod scheduler;
mod simple;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, warn};

pub use scheduler::{Boundary, Scheduler, SchedulerConfig, StoragePenalty, ON_ORBIT_PENALTY};
use scheduler::Scope;

use crate::context::Context;
use crate::federate::FederateError;
use crate::lp::{SimplexSolver, Solver};
use crate::types::{FederateId, FederationId};

// ─── Errors ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OperationsError {
    /// The dump is the full model as LP text.
    #[error("no feasible plan for federate {federate}")]
    PlanInfeasible { federate: FederateId, dump: String },

    #[error(transparent)]
    Federate(#[from] FederateError),
}

/// Log a refused step and carry on. Only an unknown federate is fatal.
pub(crate) fn tolerate<T>(result: Result<T, FederateError>, step: &str) -> Result<Option<T>, FederateError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err @ FederateError::UnknownFederate(_)) => Err(err),
        Err(err) => {
            warn!(step, %err, "step refused");
            Ok(None)
        }
    }
}

// ─── Strategy family ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OperationsKind {
    Simple,
    Dynamic,
    DynamicFederation,
    FixedCostFederation,
    DynamicFixedCostFederation,
}

impl OperationsKind {
    pub fn is_federation(self) -> bool {
        matches!(
            self,
            Self::DynamicFederation | Self::FixedCostFederation | Self::DynamicFixedCostFederation
        )
    }

    /// Scheduler preset; `None` for the greedy baseline.
    pub fn scheduler_config(self) -> Option<SchedulerConfig> {
        match self {
            Self::Simple => None,
            Self::Dynamic | Self::DynamicFederation => Some(SchedulerConfig::dynamic()),
            Self::FixedCostFederation => Some(SchedulerConfig::fixed_cost()),
            Self::DynamicFixedCostFederation => Some(SchedulerConfig::dynamic_fixed_cost()),
        }
    }
}

/// Whose turn an [`Operations`] is asked to play.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Federate(FederateId),
    Federation(FederationId),
}

/// A decision policy with its per-run state.
#[derive(Debug, Clone)]
pub enum Operations {
    Simple,
    Dynamic(Scheduler),
    DynamicFederation(Scheduler),
    FixedCostFederation(Scheduler),
    DynamicFixedCostFederation(Scheduler),
}

impl Operations {
    pub fn new(kind: OperationsKind) -> Self {
        Self::with_solver(kind, Arc::new(SimplexSolver))
    }

    pub fn with_solver(kind: OperationsKind, solver: Arc<dyn Solver>) -> Self {
        let Some(config) = kind.scheduler_config() else {
            return Self::Simple;
        };
        Self::with_config(kind, config, solver)
    }

    /// Scheduler-backed policy with a custom configuration. `Simple` ignores it.
    pub fn with_config(kind: OperationsKind, config: SchedulerConfig, solver: Arc<dyn Solver>) -> Self {
        let scheduler = Scheduler::with_solver(config, solver);
        match kind {
            OperationsKind::Simple => Self::Simple,
            OperationsKind::Dynamic => Self::Dynamic(scheduler),
            OperationsKind::DynamicFederation => Self::DynamicFederation(scheduler),
            OperationsKind::FixedCostFederation => Self::FixedCostFederation(scheduler),
            OperationsKind::DynamicFixedCostFederation => Self::DynamicFixedCostFederation(scheduler),
        }
    }

    pub fn kind(&self) -> OperationsKind {
        match self {
            Self::Simple => OperationsKind::Simple,
            Self::Dynamic(_) => OperationsKind::Dynamic,
            Self::DynamicFederation(_) => OperationsKind::DynamicFederation,
            Self::FixedCostFederation(_) => OperationsKind::FixedCostFederation,
            Self::DynamicFixedCostFederation(_) => OperationsKind::DynamicFixedCostFederation,
        }
    }

    /// The scheduler behind this policy; `None` for the greedy baseline.
    pub fn scheduler(&self) -> Option<&Scheduler> {
        match self {
            Self::Simple => None,
            Self::Dynamic(s)
            | Self::DynamicFederation(s)
            | Self::FixedCostFederation(s)
            | Self::DynamicFixedCostFederation(s) => Some(s),
        }
    }

    /// Play one turn for `target`.
    pub fn execute(&mut self, ctx: &mut Context, target: Target) -> Result<(), OperationsError> {
        let federates = federates(ctx, target);
        match self {
            Self::Simple => {
                for federate in federates {
                    simple::execute(ctx, federate)?;
                }
            }
            Self::Dynamic(scheduler) => {
                for federate in federates {
                    prepare(ctx, federate)?;
                    let Some(plan) = scheduler.plan(ctx, &Scope::federate(federate)).map_err(|unsolved| {
                        error!(%federate, error = %unsolved.error, "no feasible plan");
                        OperationsError::PlanInfeasible { federate, dump: unsolved.dump }
                    })?
                    else {
                        continue;
                    };
                    execute::execute(ctx, &plan, &scheduler.config)?;
                }
            }
            Self::DynamicFederation(scheduler) => {
                let members = members(ctx, target);
                for &federate in &members {
                    prepare(ctx, federate)?;
                }
                match scheduler.plan(ctx, &Scope::central(members)) {
                    Ok(Some(plan)) => execute::execute(ctx, &plan, &scheduler.config)?,
                    Ok(None) => {}
                    Err(unsolved) => warn!(error = %unsolved.error, "no feasible federation plan, skipping turn"),
                }
            }
            Self::FixedCostFederation(scheduler) | Self::DynamicFixedCostFederation(scheduler) => {
                let members = members(ctx, target);
                for federate in federates {
                    prepare(ctx, federate)?;
                    match scheduler.plan(ctx, &Scope::priced(federate, members.clone())) {
                        Ok(Some(plan)) => execute::execute(ctx, &plan, &scheduler.config)?,
                        Ok(None) => {}
                        Err(unsolved) => {
                            warn!(%federate, error = %unsolved.error, "no feasible plan, skipping federate");
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

/// Housekeeping every scheduler does before planning.
fn prepare(ctx: &mut Context, federate: FederateId) -> Result<(), FederateError> {
    ctx.decommission_inoperable(federate)?;
    ctx.auto_default(federate)
}

fn federates(ctx: &Context, target: Target) -> Vec<FederateId> {
    match target {
        Target::Federate(federate) => vec![federate],
        Target::Federation(fss) => ctx.federation(fss).map(|f| f.federate_ids()).unwrap_or_default(),
    }
}

/// Every federate sharing infrastructure with `target`.
fn members(ctx: &Context, target: Target) -> Vec<FederateId> {
    match target {
        Target::Federation(_) => federates(ctx, target),
        Target::Federate(federate) => ctx
            .federation_of(federate)
            .and_then(|fss| ctx.federation(fss))
            .map_or_else(|| vec![federate], |f| f.federate_ids()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::Game;
    use crate::ledger::Cash;
    use crate::lp::{Assignment, LinearProgram, SolveError};

    #[derive(Debug)]
    struct Refuse;

    impl Solver for Refuse {
        fn solve(&self, _: &LinearProgram) -> Result<Assignment, SolveError> {
            Err(SolveError::Infeasible)
        }
    }

    fn context() -> (Context, FederationId, Vec<FederateId>) {
        let game = Game::default();
        let mut ctx = game.context(0);
        ctx.set_max_time(24);
        let fss = ctx.add_federation("FSS");
        let feds: Vec<_> = (1..=2)
            .map(|i| ctx.join(fss, format!("F{i}"), Cash::from_units(1200)).expect("test: join"))
            .collect();
        ctx.init();
        for spec in ["1.SmallSat@LEO1,VIS,pSGL", "2.GroundSta@SUR1,pSGL"] {
            let design = game.parse_design(spec).expect("test: parse");
            game.deploy(&mut ctx, feds[design.federate - 1], &design).expect("test: deploy");
        }
        (ctx, fss, feds)
    }

    #[test]
    fn kinds_map_to_presets() {
        assert_eq!(OperationsKind::Simple.scheduler_config(), None);
        assert_eq!(
            OperationsKind::FixedCostFederation.scheduler_config().map(|c| c.horizon),
            Some(1)
        );
        assert!(OperationsKind::DynamicFederation.is_federation());
        assert!(!OperationsKind::Dynamic.is_federation());
        for kind in [
            OperationsKind::Simple,
            OperationsKind::Dynamic,
            OperationsKind::DynamicFederation,
            OperationsKind::FixedCostFederation,
            OperationsKind::DynamicFixedCostFederation,
        ] {
            assert_eq!(Operations::new(kind).kind(), kind);
        }
    }

    #[test]
    fn federate_infeasibility_is_fatal() {
        let (mut ctx, _, feds) = context();
        let mut ops = Operations::with_solver(OperationsKind::Dynamic, Arc::new(Refuse));
        let err = ops.execute(&mut ctx, Target::Federate(feds[0]));
        assert!(
            matches!(&err, Err(OperationsError::PlanInfeasible { federate, dump })
                if *federate == feds[0] && dump.starts_with("Maximize")),
            "expected PlanInfeasible, got {err:?}"
        );
    }

    #[test]
    fn federation_infeasibility_is_skipped() {
        let (mut ctx, fss, feds) = context();
        let cash: Vec<Cash> = feds
            .iter()
            .map(|f| ctx.federate(*f).expect("test: federate").cash)
            .collect();
        for kind in [
            OperationsKind::DynamicFederation,
            OperationsKind::FixedCostFederation,
            OperationsKind::DynamicFixedCostFederation,
        ] {
            let mut ops = Operations::with_solver(kind, Arc::new(Refuse));
            ops.execute(&mut ctx, Target::Federation(fss)).expect("test: skipped");
        }
        for (f, before) in feds.iter().zip(cash) {
            assert_eq!(ctx.federate(*f).expect("test: federate").cash, before);
        }
    }

    #[test]
    fn federation_target_covers_every_member() {
        let (ctx, fss, feds) = context();
        assert_eq!(federates(&ctx, Target::Federation(fss)), feds);
        assert_eq!(members(&ctx, Target::Federate(feds[1])), feds);
        assert_eq!(federates(&ctx, Target::Federate(feds[1])), vec![feds[1]]);
    }
}
