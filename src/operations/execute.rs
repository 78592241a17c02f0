// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Federated Satellite Systems Simulation ("FSS") - Plan Execution

//! Applies the step-0 slice of a solved plan through the context's lifecycle
//! operations. A step the context refuses is logged and skipped; the item is
//! replanned next turn.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, warn};

use super::scheduler::{Edge, ItemKind, Plan, SchedulerConfig};
use super::tolerate;
use crate::context::Context;
use crate::federate::FederateError;
use crate::settlement::SettlementError;
use crate::types::{ContractId, EventId};

/// Execution phases of the current turn, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum Step {
    /// Contracts the plan writes off aboard; frees capacity first
    DefaultOnOrbit,
    DeliverContract,
    DeliverDemand,
    /// Capture demands that stay aboard this turn
    SenseForStorage,
    /// Move the demands captured above toward their storer
    StoreSensed,
    MoveContract,
}

impl Plan {
    /// Node whose sensor captures item `j` now.
    fn sensed_by(&self, j: usize) -> Option<usize> {
        self.model
            .sense
            .iter()
            .find(|((_, item), v)| *item == j && self.solution.is_set(**v))
            .map(|((i, _), _)| *i)
    }

    fn holds(&self, i: usize, j: usize) -> bool {
        self.model.hold.get(&(0, i, j)).is_some_and(|v| self.solution.is_set(*v))
    }

    /// Node at which item `j` is resolved now.
    fn resolves(&self, j: usize) -> Option<usize> {
        self.model
            .resolve
            .iter()
            .find(|((t, _, item), v)| *t == 0 && *item == j && self.solution.is_set(**v))
            .map(|((_, i, _), _)| *i)
    }

    fn resolves_on_ground(&self, j: usize) -> bool {
        self.resolves(j).is_some_and(|i| self.input.nodes[i].station)
    }

    fn resolves_on_orbit(&self, j: usize) -> bool {
        self.resolves(j).is_some_and(|i| !self.input.nodes[i].station)
    }

    /// Planned step-0 transmissions of item `j` out of node `i`, strongest first.
    fn hops(&self, i: usize, j: usize) -> Vec<Edge> {
        let mut hops: Vec<(Edge, f64)> = self
            .model
            .send
            .iter()
            .filter(|(e, v)| e.t == 0 && e.from == i && e.item == j && self.solution.is_set(**v))
            .map(|(e, v)| (*e, self.solution.value(*v)))
            .collect();
        hops.sort_by(|a, b| b.1.total_cmp(&a.1));
        hops.into_iter().map(|(e, _)| e).collect()
    }

    /// First step of item `j`; `None` if the plan leaves it alone.
    fn step(&self, j: usize) -> Option<Step> {
        let contract = self.input.items[j].is_contract();
        match (contract, self.resolves_on_orbit(j), self.resolves_on_ground(j)) {
            (true, true, _) => Some(Step::DefaultOnOrbit),
            (true, _, true) => Some(Step::DeliverContract),
            (false, _, true) => Some(Step::DeliverDemand),
            (false, ..) if self.sensed_by(j).is_some() => Some(Step::SenseForStorage),
            (true, ..) => Some(Step::MoveContract),
            (false, ..) => None,
        }
    }

    /// Every `(step, item)` of the current turn in execution order.
    pub(crate) fn schedule(&self) -> Vec<(Step, usize)> {
        let mut order: Vec<(Step, usize)> = Vec::new();
        for j in 0..self.input.items.len() {
            match self.step(j) {
                Some(Step::SenseForStorage) => {
                    order.push((Step::SenseForStorage, j));
                    order.push((Step::StoreSensed, j));
                }
                Some(step) => order.push((step, j)),
                None => {}
            }
        }
        order.sort();
        order
    }
}

/// Execute the current-turn decisions of `plan`.
///
/// Steps run in [`Step`] order. Demands kept aboard are all sensed before
/// any of them is transported.
pub(crate) fn execute(ctx: &mut Context, plan: &Plan, config: &SchedulerConfig) -> Result<(), FederateError> {
    let mut sensed: BTreeMap<usize, (ContractId, usize)> = BTreeMap::new();
    for (step, j) in plan.schedule() {
        match (step, plan.input.items[j].kind) {
            (Step::SenseForStorage, ItemKind::Demand(demand)) => {
                if let Some(found) = claim_and_sense(ctx, plan, j, demand)? {
                    sensed.insert(j, found);
                }
            }
            (Step::StoreSensed, _) => {
                if let Some((contract, node)) = sensed.remove(&j) {
                    forward(ctx, plan, config, j, contract, node, &mut BTreeSet::new())?;
                }
            }
            (_, ItemKind::Demand(demand)) => {
                let Some((contract, node)) = claim_and_sense(ctx, plan, j, demand)? else {
                    continue;
                };
                forward(ctx, plan, config, j, contract, node, &mut BTreeSet::new())?;
            }
            (_, ItemKind::Contract(contract)) => {
                let Some(holder) = plan.input.items[j].holder else {
                    continue;
                };
                forward(ctx, plan, config, j, contract, holder, &mut BTreeSet::new())?;
            }
        }
    }
    Ok(())
}

/// Contract a planned demand and capture it with the planned sensor.
fn claim_and_sense(
    ctx: &mut Context,
    plan: &Plan,
    j: usize,
    demand: EventId,
) -> Result<Option<(ContractId, usize)>, FederateError> {
    let Some(i) = plan.sensed_by(j) else {
        return Ok(None);
    };
    let node = &plan.input.nodes[i];
    let claimant = plan.input.planner.unwrap_or(node.owner);

    let sensable = match (ctx.calendar.demand(demand), ctx.system(node.id), ctx.system_location(node.id)) {
        (Some(d), Some(sys), Some(loc)) => sys.can_sense(d, loc),
        _ => false,
    };
    if !sensable {
        debug!(%demand, system = %node.id, "demand no longer sensable");
        return Ok(None);
    }
    let Some(contract) = ctx.contract(claimant, demand) else {
        return Ok(None);
    };
    if tolerate(ctx.sense(claimant, contract, node.id), "sense")?.is_none() {
        tolerate(ctx.default_contract(claimant, contract), "default")?;
        return Ok(None);
    }
    Ok(Some((contract, i)))
}

/// Follow the planned hops of `contract` out of node `i`.
fn forward(
    ctx: &mut Context,
    plan: &Plan,
    config: &SchedulerConfig,
    j: usize,
    contract: ContractId,
    i: usize,
    visited: &mut BTreeSet<usize>,
) -> Result<(), FederateError> {
    if !visited.insert(i) {
        return Ok(());
    }
    let here = plan.input.nodes[i].id;
    if ctx.locate_data(contract) != Some(here) {
        return Ok(());
    }
    let Some(owner) = ctx.contract_owner(contract) else {
        return Ok(());
    };

    if plan.resolves(j) == Some(i) && !plan.input.nodes[i].station {
        if config.default_on_orbit {
            tolerate(ctx.default_contract(owner, contract), "default")?;
        }
        return Ok(());
    }

    for edge in plan.hops(i, j) {
        let protocol = &plan.input.protocols[edge.protocol].1;
        let next = &plan.input.nodes[edge.to];
        if tolerate(ctx.transport(contract, Some(protocol), here, next.id), "transport")?.is_none() {
            continue;
        }
        settle_hop(ctx, plan, config, &edge)?;
        if next.station {
            tolerate(ctx.resolve_contract(owner, contract), "resolve")?;
        } else if plan.holds(edge.to, j) {
            tolerate(ctx.store(next.id, contract), "store")?;
        } else {
            forward(ctx, plan, config, j, contract, edge.to, visited)?;
        }
        return Ok(());
    }

    if ctx.system(here).is_some_and(|s| s.in_transit(contract)) {
        tolerate(ctx.store(here, contract), "store")?;
    }
    Ok(())
}

/// Pay for a hop that used a foreign system.
fn settle_hop(ctx: &mut Context, plan: &Plan, config: &SchedulerConfig, edge: &Edge) -> Result<(), FederateError> {
    let Some(payer) = plan.input.planner else {
        return Ok(());
    };
    let Some((service, payee)) = plan.input.payee(edge.from, edge.to) else {
        return Ok(());
    };
    match config.fees.quote(service, payer, payee) {
        Ok(settlement) => ctx.settle(&settlement),
        Err(SettlementError::ZeroFee) => Ok(()),
        Err(err) => {
            warn!(%err, "hop not settled");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::scheduler::{ItemView, Scheduler, Scope};
    use super::*;
    use crate::contract::Contract;
    use crate::event::Demand;
    use crate::game::Game;
    use crate::ledger::Cash;
    use crate::lp::{SimplexSolver, Solver};
    use crate::types::{FederateId, Phenomena, SystemId};

    fn context(designs: &[&str]) -> (Context, Vec<FederateId>, Vec<SystemId>) {
        let game = Game::default();
        let mut ctx = game.context(0);
        ctx.set_max_time(24);
        let fss = ctx.add_federation("FSS");
        let feds: Vec<_> = (1..=2)
            .map(|i| ctx.join(fss, format!("F{i}"), Cash::from_units(1200)).expect("test: join"))
            .collect();
        ctx.init();
        let systems = designs
            .iter()
            .map(|spec| {
                let design = game.parse_design(spec).expect("test: parse");
                game.deploy(&mut ctx, feds[design.federate - 1], &design).expect("test: deploy")
            })
            .collect();
        (ctx, feds, systems)
    }

    /// A VIS1 contract in sector 1, captured by `sat`.
    fn sensed(ctx: &mut Context, fed: FederateId, sat: SystemId) -> ContractId {
        let id = ctx.ids.contract();
        let spec = Game::default().demand_spec("VIS1").expect("test: VIS1");
        ctx.federate_mut(fed)
            .expect("test: federate")
            .contracts
            .push(Contract::new(id, Demand { id: EventId(999), sector: 1, spec }));
        ctx.sense(fed, id, sat).expect("test: sense");
        id
    }

    fn cash(ctx: &Context, fed: FederateId) -> Cash {
        ctx.federate(fed).expect("test: federate").cash
    }

    #[test]
    fn held_contract_is_downlinked_and_paid() {
        let (mut ctx, feds, systems) = context(&["SmallSat@LEO1,VIS,pSGL", "GroundSta@SUR1,pSGL"]);
        let c = sensed(&mut ctx, feds[0], systems[0]);
        let before = cash(&ctx, feds[0]);

        let config = SchedulerConfig::dynamic();
        let mut scheduler = Scheduler::new(config.clone());
        let plan = scheduler
            .plan(&ctx, &Scope::federate(feds[0]))
            .expect("test: solvable")
            .expect("test: plannable");
        execute(&mut ctx, &plan, &config).expect("test: execute");

        assert_eq!(ctx.contract_owner(c), None);
        assert_eq!(cash(&ctx, feds[0]), before + Cash::from_units(600));
    }

    #[test]
    fn stranded_contract_defaults_on_orbit() {
        let (mut ctx, feds, systems) = context(&["SmallSat@LEO1,VIS,pISL"]);
        let c = sensed(&mut ctx, feds[0], systems[0]);
        let before = cash(&ctx, feds[0]);

        let config = SchedulerConfig::dynamic();
        let mut scheduler = Scheduler::new(config.clone());
        let plan = scheduler
            .plan(&ctx, &Scope::federate(feds[0]))
            .expect("test: solvable")
            .expect("test: plannable");
        execute(&mut ctx, &plan, &config).expect("test: execute");

        assert_eq!(ctx.contract_owner(c), None);
        assert_eq!(cash(&ctx, feds[0]), before + Cash::from_units(-50));
    }

    #[test]
    fn foreign_downlink_is_settled() {
        let (mut ctx, feds, systems) = context(&["1.SmallSat@LEO1,VIS,pSGL", "2.GroundSta@SUR1,pSGL"]);
        let c = sensed(&mut ctx, feds[0], systems[0]);
        let (payer, payee) = (cash(&ctx, feds[0]), cash(&ctx, feds[1]));

        let config = SchedulerConfig::fixed_cost();
        let mut scheduler = Scheduler::new(config.clone());
        let plan = scheduler
            .plan(&ctx, &Scope::priced(feds[0], feds.clone()))
            .expect("test: solvable")
            .expect("test: plannable");
        execute(&mut ctx, &plan, &config).expect("test: execute");

        assert_eq!(ctx.contract_owner(c), None);
        assert_eq!(cash(&ctx, feds[0]), payer + Cash::from_units(600 - 50));
        assert_eq!(cash(&ctx, feds[1]), payee + Cash::from_units(50));
    }

    #[test]
    fn stored_demands_are_all_sensed_before_any_moves() {
        // both spacecraft reach SUR3 next turn, not now
        let (ctx, feds, systems) = context(&[
            "SmallSat@LEO1,VIS,pSGL",
            "SmallSat@LEO1,VIS,pSGL",
            "GroundSta@SUR3,pSGL",
        ]);
        let config = SchedulerConfig::dynamic();
        let scheduler = Scheduler::new(config.clone());
        let mut input = Scheduler::new(config)
            .snapshot(&ctx, &Scope::federate(feds[0]))
            .expect("test: plannable");
        input.items.clear();
        for (n, sat) in systems[..2].iter().enumerate() {
            let node = input.node_of(*sat).expect("test: sat");
            input.items.push(ItemView {
                kind: ItemKind::Demand(EventId(1001 + n as u64)),
                phenomena: Phenomena::Vis,
                size: 1,
                values: vec![500.0; input.steps as usize],
                default_value: -50.0,
                owner_cash: 1200.0,
                holder: None,
                sensors: vec![node],
            });
        }
        let model = scheduler.build(&input, &ctx.locations);
        let solution = SimplexSolver.solve(&model.lp).expect("test: solvable");
        let plan = Plan { input, model, solution };

        let steps: Vec<Step> = plan.schedule().into_iter().map(|(step, _)| step).collect();
        assert_eq!(
            steps,
            vec![Step::SenseForStorage, Step::SenseForStorage, Step::StoreSensed, Step::StoreSensed]
        );
    }
}
