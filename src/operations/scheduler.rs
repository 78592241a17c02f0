// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Federated Satellite Systems Simulation ("FSS") - Receding-Horizon Scheduler

//! Time-expanded flow model over a short planning horizon.
//!
//! Every turn the scheduler snapshots the systems and items it can see into
//! a [`ModelInput`], builds one linear program over steps `0..H` and solves
//! it. Only the step-0 slice is executed (see `execute`); the rest of the
//! horizon exists to price waiting, relaying and late delivery.
//!
//! Variables, all in `[0, 1]`:
//!
//! ```text
//! S[i][j]          spacecraft i senses demand j now
//! E[t][i][j]       storer i holds item j at the end of step t
//! X[t][i][k][p][j] i transmits item j to system k over protocol p at step t
//! R[t][i][j]       item j is resolved at system i at step t
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use crate::adapter::cash_to_f64;
use crate::context::Context;
use crate::event::EventSpec;
use crate::location::{Location, Locations};
use crate::lp::{Assignment, LinearProgram, Relation, Row, SimplexSolver, SolveError, Solver, VariableId};
use crate::settlement::{FeeSchedule, Service};
use crate::system::System;
use crate::types::{ContractId, EventId, FederateId, LinkKind, Phenomena, Protocol, SystemId};

/// Objective weight that keeps items from being written off aboard a spacecraft.
pub const ON_ORBIT_PENALTY: f64 = 1e6;

// ─── Configuration ──────────────────────────────────────────────────────────

/// Objective weight of holding an item aboard.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum StoragePenalty {
    /// Charged at every step of the horizon
    Fixed(f64),
    /// Expected value of a fresh demand the storer could have sensed instead,
    /// charged on the current step only.
    OpportunityCost,
}

/// Where the plan must have emptied every storer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Boundary {
    /// Last step of every horizon.
    HorizonEnd,
    /// Last turn of the run only.
    SimulationEnd,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Planning horizon in turns
    pub horizon: u32,
    pub storage_penalty: StoragePenalty,
    /// Weight of an own inter-satellite hop; small and negative to prevent cycles
    pub isl_penalty: f64,
    pub sgl_penalty: f64,
    pub fees: FeeSchedule,
    /// Bound fees and defaults minus earnings by the planner's cash
    pub solvency_row: bool,
    pub boundary: Boundary,
    /// Execute a planned on-orbit resolution as a contract default
    pub default_on_orbit: bool,
    /// Assume foreign receivers have full capacity after the current turn
    pub foreign_future_capacity: bool,
}

impl SchedulerConfig {
    /// Six-turn horizon, own systems only.
    pub fn dynamic() -> Self {
        Self {
            horizon: 6,
            storage_penalty: StoragePenalty::Fixed(-0.1),
            isl_penalty: -0.1,
            sgl_penalty: -0.1,
            fees: FeeSchedule::free(),
            solvency_row: false,
            boundary: Boundary::HorizonEnd,
            default_on_orbit: true,
            foreign_future_capacity: true,
        }
    }

    /// Current turn only, priced foreign links.
    pub fn fixed_cost() -> Self {
        Self {
            horizon: 1,
            storage_penalty: StoragePenalty::Fixed(-10.0),
            isl_penalty: -10.0,
            sgl_penalty: 0.0,
            fees: FeeSchedule::default(),
            solvency_row: true,
            boundary: Boundary::SimulationEnd,
            default_on_orbit: false,
            foreign_future_capacity: false,
        }
    }

    /// Three-turn horizon, priced foreign links.
    pub fn dynamic_fixed_cost() -> Self {
        Self {
            horizon: 3,
            storage_penalty: StoragePenalty::Fixed(-50.0),
            isl_penalty: -1.0,
            sgl_penalty: 0.0,
            fees: FeeSchedule::default(),
            solvency_row: true,
            boundary: Boundary::SimulationEnd,
            default_on_orbit: false,
            foreign_future_capacity: false,
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::dynamic()
    }
}

// ─── Scope ──────────────────────────────────────────────────────────────────

/// Who plans, whose systems are visible and whose spacecraft take orders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Scope {
    /// Fee payer and claimant; `None` for a central federation planner
    pub planner: Option<FederateId>,
    /// Federates whose commissioned systems are nodes
    pub members: Vec<FederateId>,
    /// Federates whose spacecraft sense and store, and whose contracts are planned
    pub controlled: Vec<FederateId>,
}

impl Scope {
    pub fn federate(federate: FederateId) -> Self {
        Self { planner: Some(federate), members: vec![federate], controlled: vec![federate] }
    }

    pub fn central(members: Vec<FederateId>) -> Self {
        Self { planner: None, controlled: members.clone(), members }
    }

    pub fn priced(federate: FederateId, members: Vec<FederateId>) -> Self {
        Self { planner: Some(federate), members, controlled: vec![federate] }
    }

    fn controls(&self, federate: FederateId) -> bool {
        self.controlled.contains(&federate)
    }
}

// ─── Snapshot ───────────────────────────────────────────────────────────────

const LANES: [Option<Phenomena>; 3] = [Some(Phenomena::Sar), Some(Phenomena::Vis), None];

fn lane_name(lane: Option<Phenomena>) -> String {
    lane.map_or_else(|| "all".to_string(), |p| p.to_string())
}

/// A bound per phenomena lane and in aggregate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Limits {
    sar: u32,
    vis: u32,
    all: u32,
}

impl Limits {
    fn of(f: impl Fn(Option<Phenomena>) -> u32) -> Self {
        Self {
            sar: f(Some(Phenomena::Sar)),
            vis: f(Some(Phenomena::Vis)),
            all: f(None),
        }
    }

    fn get(&self, lane: Option<Phenomena>) -> u32 {
        match lane {
            Some(Phenomena::Sar) => self.sar,
            Some(Phenomena::Vis) => self.vis,
            None => self.all,
        }
    }
}

/// Transceiver budget of one system for one (link, protocol).
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Port {
    pub link: LinkKind,
    pub protocol: Protocol,
    pub max_tx: u32,
    pub used_tx: u32,
    pub max_rx: u32,
    pub used_rx: u32,
}

#[derive(Debug, Clone)]
pub(crate) struct NodeView {
    pub id: SystemId,
    pub owner: FederateId,
    pub station: bool,
    /// Controlled spacecraft: may sense and hold items between steps
    pub storer: bool,
    /// Location at each horizon step
    pub path: Vec<Location>,
    pub ports: Vec<Port>,
    pub free: Limits,
    pub sensing: Limits,
    pub storage_penalty: f64,
}

impl NodeView {
    fn port(&self, link: LinkKind, protocol: &Protocol) -> Option<&Port> {
        self.ports.iter().find(|p| p.link == link && p.protocol == *protocol)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ItemKind {
    Demand(EventId),
    Contract(ContractId),
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Demand(id) => write!(f, "{id}"),
            Self::Contract(id) => write!(f, "{id}"),
        }
    }
}

/// A live demand or a planned contract.
#[derive(Debug, Clone)]
pub(crate) struct ItemView {
    pub kind: ItemKind,
    pub phenomena: Phenomena,
    pub size: u32,
    /// Value if delivered at each horizon step
    pub values: Vec<f64>,
    pub default_value: f64,
    /// Cash of whoever would pay the default
    pub owner_cash: f64,
    /// Node currently holding the data
    pub holder: Option<usize>,
    /// Storers able to sense the demand now
    pub sensors: Vec<usize>,
}

impl ItemView {
    pub fn is_contract(&self) -> bool {
        matches!(self.kind, ItemKind::Contract(_))
    }

    /// Objective weight of resolving at `node` during step `t`.
    fn resolve_weight(&self, node: &NodeView, t: usize) -> f64 {
        if node.station {
            return self.values.get(t).copied().unwrap_or(self.default_value);
        }
        match self.kind {
            ItemKind::Demand(_) => -ON_ORBIT_PENALTY,
            ItemKind::Contract(_) if self.owner_cash + self.default_value > 0.0 => self.default_value,
            ItemKind::Contract(_) => -ON_ORBIT_PENALTY,
        }
    }

    /// Cash effect of resolving at `node` now.
    fn resolve_cash(&self, node: &NodeView) -> f64 {
        if node.station {
            self.values.first().copied().unwrap_or(self.default_value)
        } else {
            self.default_value
        }
    }
}

/// Everything the model needs, read from the context in one pass.
#[derive(Debug, Clone)]
pub(crate) struct ModelInput {
    pub time: u32,
    pub steps: u32,
    /// Turn at which the run ends
    pub end: u32,
    pub planner: Option<FederateId>,
    pub planner_cash: f64,
    pub nodes: Vec<NodeView>,
    pub items: Vec<ItemView>,
    pub protocols: Vec<(LinkKind, Protocol)>,
}

impl ModelInput {
    pub fn node_of(&self, system: SystemId) -> Option<usize> {
        self.nodes.iter().position(|n| n.id == system)
    }

    fn is_foreign(&self, owner: FederateId) -> bool {
        self.planner.is_some_and(|p| p != owner)
    }

    /// Who the planner pays for a hop from `from` to `to`, if anyone.
    ///
    /// Downlinks pay a foreign station's owner. Crosslinks pay the foreign
    /// receiver's owner, else the foreign sender's owner.
    pub fn payee(&self, from: usize, to: usize) -> Option<(Service, FederateId)> {
        let (src, dst) = (&self.nodes[from], &self.nodes[to]);
        if dst.station {
            return self.is_foreign(dst.owner).then_some((Service::Downlink, dst.owner));
        }
        if self.is_foreign(dst.owner) {
            Some((Service::Crosslink, dst.owner))
        } else if self.is_foreign(src.owner) {
            Some((Service::Crosslink, src.owner))
        } else {
            None
        }
    }
}

// ─── Model ──────────────────────────────────────────────────────────────────

/// A transmission decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct Edge {
    pub t: u32,
    pub from: usize,
    pub to: usize,
    pub protocol: usize,
    pub item: usize,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Model {
    pub lp: LinearProgram,
    /// `(node, item)`
    pub sense: BTreeMap<(usize, usize), VariableId>,
    /// `(t, node, item)`
    pub hold: BTreeMap<(u32, usize, usize), VariableId>,
    pub send: BTreeMap<Edge, VariableId>,
    /// `(t, node, item)`
    pub resolve: BTreeMap<(u32, usize, usize), VariableId>,
}

/// A solved model, ready to execute.
#[derive(Debug, Clone)]
pub(crate) struct Plan {
    pub input: ModelInput,
    pub model: Model,
    pub solution: Assignment,
}

/// A model the solver could not satisfy.
#[derive(Debug, Clone)]
pub(crate) struct Unsolved {
    pub error: SolveError,
    pub dump: String,
}

// ─── Scheduler ──────────────────────────────────────────────────────────────

/// Receding-horizon LP planner with its solver and memoized storage penalties.
#[derive(Debug, Clone)]
pub struct Scheduler {
    pub config: SchedulerConfig,
    solver: Arc<dyn Solver>,
    opportunity: BTreeMap<SystemId, f64>,
}

impl Scheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self::with_solver(config, Arc::new(SimplexSolver))
    }

    pub fn with_solver(config: SchedulerConfig, solver: Arc<dyn Solver>) -> Self {
        Self { config, solver, opportunity: BTreeMap::new() }
    }

    /// Mean step-0 value over the whole deck of the demands `system` could sense, negated.
    fn opportunity_cost(&mut self, deck: &[EventSpec], system: &System) -> f64 {
        *self.opportunity.entry(system.id).or_insert_with(|| {
            if deck.is_empty() {
                return 0.0;
            }
            let total: f64 = deck
                .iter()
                .filter_map(|e| match e {
                    EventSpec::Demand(d) if system.could_sense(d.phenomena, d.size) => {
                        Some(cash_to_f64(d.value_at(0)))
                    }
                    _ => None,
                })
                .sum();
            -total / deck.len() as f64
        })
    }

    /// Read the planning problem for `scope` out of the context.
    /// `None` when the run has no turns left to plan.
    pub(crate) fn snapshot(&mut self, ctx: &Context, scope: &Scope) -> Option<ModelInput> {
        let time = ctx.time();
        let end = if ctx.max_time() > time { ctx.max_time() } else { u32::MAX };
        let steps = end.min(time.saturating_add(self.config.horizon)) - time;
        if steps == 0 {
            return None;
        }

        let planned: Vec<ContractId> = ctx
            .federates()
            .filter(|f| scope.controls(f.id))
            .flat_map(|f| f.contracts.iter().map(|c| c.id))
            .collect();

        let mut nodes = Vec::new();
        let mut systems: Vec<&System> = Vec::new();
        for federate in ctx.federates().filter(|f| scope.members.contains(&f.id)) {
            for system in federate.commissioned() {
                let Some(node) = self.node(ctx, scope, federate.id, system, steps, &planned) else {
                    continue;
                };
                nodes.push(node);
                systems.push(system);
            }
        }

        let mut items = Vec::new();
        let planner_cash = scope
            .planner
            .and_then(|p| ctx.federate(p))
            .map_or(0.0, |f| cash_to_f64(f.cash));
        for demand in ctx.calendar.demands() {
            let sensors = nodes
                .iter()
                .zip(&systems)
                .enumerate()
                .filter(|(_, (n, s))| n.storer && s.can_sense(demand, &n.path[0]))
                .map(|(i, _)| i)
                .collect();
            items.push(ItemView {
                kind: ItemKind::Demand(demand.id),
                phenomena: demand.phenomena(),
                size: demand.size(),
                values: (0..steps).map(|t| cash_to_f64(demand.value_at(t))).collect(),
                default_value: cash_to_f64(demand.default_value()),
                owner_cash: planner_cash,
                holder: None,
                sensors,
            });
        }
        for federate in ctx.federates().filter(|f| scope.controls(f.id)) {
            for contract in &federate.contracts {
                let holder = ctx
                    .locate_data(contract.id)
                    .and_then(|s| nodes.iter().position(|n| n.id == s));
                items.push(ItemView {
                    kind: ItemKind::Contract(contract.id),
                    phenomena: contract.phenomena(),
                    size: contract.size(),
                    values: (0..steps).map(|t| cash_to_f64(contract.value_in(t))).collect(),
                    default_value: cash_to_f64(contract.default_value()),
                    owner_cash: cash_to_f64(federate.cash),
                    holder,
                    sensors: Vec::new(),
                });
            }
        }

        let mut protocols: Vec<(LinkKind, Protocol)> = nodes
            .iter()
            .flat_map(|n| n.ports.iter().map(|p| (p.link, p.protocol.clone())))
            .collect();
        protocols.sort();
        protocols.dedup();

        Some(ModelInput {
            time,
            steps,
            end,
            planner: scope.planner,
            planner_cash,
            nodes,
            items,
            protocols,
        })
    }

    fn node(
        &mut self,
        ctx: &Context,
        scope: &Scope,
        owner: FederateId,
        system: &System,
        steps: u32,
        planned: &[ContractId],
    ) -> Option<NodeView> {
        let here = system.location()?;
        let path = (0..steps)
            .map(|t| {
                let id = ctx.locations.propagate(here, t).ok()?;
                ctx.locations.get(id).ok().cloned()
            })
            .collect::<Option<Vec<_>>>()?;

        let mut ports = Vec::new();
        for link in [LinkKind::SpaceGround, LinkKind::InterSatellite] {
            for protocol in system.protocols(link) {
                let (max_tx, used_tx) = system.transmit_budget(link, &protocol);
                let (max_rx, used_rx) = system.receive_budget(link, &protocol);
                ports.push(Port { link, protocol, max_tx, used_tx, max_rx, used_rx });
            }
        }

        // data of contracts outside this plan still occupies room
        let reserved = |lane: Option<Phenomena>| -> u32 {
            system
                .subsystems
                .iter()
                .filter(|s| s.transceiver().is_none())
                .flat_map(|s| s.contents())
                .filter(|d| !planned.contains(&d.contract))
                .filter(|d| lane.map_or(true, |p| d.phenomena == p))
                .map(|d| d.size)
                .sum()
        };
        let storer = system.is_spacecraft() && scope.controls(owner);
        let storage_penalty = match self.config.storage_penalty {
            StoragePenalty::Fixed(weight) => weight,
            StoragePenalty::OpportunityCost => self.opportunity_cost(ctx.calendar.deck(), system),
        };
        Some(NodeView {
            id: system.id,
            owner,
            station: system.is_ground_station(),
            storer,
            path,
            ports,
            free: Limits::of(|lane| system.capacity(lane).saturating_sub(reserved(lane))),
            sensing: if storer { Limits::of(|lane| system.sensing_room(lane)) } else { Limits::default() },
            storage_penalty,
        })
    }

    /// Build the time-expanded model.
    pub(crate) fn build(&self, input: &ModelInput, locations: &Locations) -> Model {
        let cfg = &self.config;
        let nodes = &input.nodes;
        let items = &input.items;
        let mut m = Model::default();

        // sensing
        for (j, item) in items.iter().enumerate() {
            for &i in &item.sensors {
                let v = m.lp.add_variable(format!("S_{}_{}", nodes[i].id, item.kind), 0.0, 1.0);
                m.sense.insert((i, j), v);
            }
        }
        for (i, node) in nodes.iter().enumerate().filter(|(_, n)| n.storer) {
            for lane in LANES {
                let row: Row = m
                    .sense
                    .iter()
                    .filter(|((n, j), _)| *n == i && lane.map_or(true, |p| items[*j].phenomena == p))
                    .map(|((_, j), v)| (*v, f64::from(items[*j].size)))
                    .collect();
                if !row.is_empty() {
                    m.lp.add_constraint(
                        format!("{}_sense_{}", node.id, lane_name(lane)),
                        row,
                        Relation::Le,
                        f64::from(node.sensing.get(lane)),
                    );
                }
            }
        }
        for (j, item) in items.iter().enumerate() {
            let row: Row = m
                .sense
                .iter()
                .filter(|((_, k), _)| *k == j)
                .map(|(_, v)| (*v, 1.0))
                .collect();
            if !row.is_empty() {
                m.lp.add_constraint(format!("{}_sensed_once", item.kind), row, Relation::Le, 1.0);
            }
        }

        for t in 0..input.steps {
            let step = t as usize;

            // holding
            for (i, node) in nodes.iter().enumerate().filter(|(_, n)| n.storer) {
                // a forgone demand is forgone now; later steps hold for free
                let weight = match cfg.storage_penalty {
                    StoragePenalty::OpportunityCost if t > 0 => 0.0,
                    _ => node.storage_penalty,
                };
                for (j, item) in items.iter().enumerate() {
                    let v = m.lp.add_variable(format!("E_{t}_{}_{}", node.id, item.kind), 0.0, 1.0);
                    m.lp.add_objective(v, weight);
                    m.hold.insert((t, i, j), v);
                }
                for lane in LANES {
                    let row: Row = items
                        .iter()
                        .enumerate()
                        .filter(|(_, item)| lane.map_or(true, |p| item.phenomena == p))
                        .filter_map(|(j, item)| m.hold.get(&(t, i, j)).map(|v| (*v, f64::from(item.size))))
                        .collect();
                    if !row.is_empty() {
                        m.lp.add_constraint(
                            format!("{}_store_{}_{t}", node.id, lane_name(lane)),
                            row,
                            Relation::Le,
                            f64::from(node.free.get(lane)),
                        );
                    }
                }
                let last = match cfg.boundary {
                    Boundary::HorizonEnd => t + 1 >= input.steps,
                    Boundary::SimulationEnd => input.time + t + 1 >= input.end,
                };
                if last {
                    for (j, item) in items.iter().enumerate() {
                        if let Some(&v) = m.hold.get(&(t, i, j)) {
                            m.lp.add_constraint(
                                format!("{}_boundary_{}", node.id, item.kind),
                                Row::new().with(v, 1.0),
                                Relation::Eq,
                                0.0,
                            );
                        }
                    }
                }
            }

            // transmissions
            let mut tx: BTreeMap<(usize, usize), Row> = BTreeMap::new();
            let mut rx: BTreeMap<(usize, usize), Row> = BTreeMap::new();
            let mut flow: BTreeMap<(usize, usize), Row> = BTreeMap::new();
            for (from, src) in nodes.iter().enumerate().filter(|(_, n)| !n.station) {
                for (to, dst) in nodes.iter().enumerate().filter(|(k, _)| *k != from) {
                    let link = if dst.station { LinkKind::SpaceGround } else { LinkKind::InterSatellite };
                    if !locations.visible(link, &src.path[step], &dst.path[step]) {
                        continue;
                    }
                    let weight = match input.payee(from, to) {
                        Some((service, _)) if !cfg.fees.fee(service).is_zero() => {
                            -cash_to_f64(cfg.fees.fee(service))
                        }
                        _ if dst.station => cfg.sgl_penalty,
                        _ => cfg.isl_penalty,
                    };
                    for (p, (plink, protocol)) in input.protocols.iter().enumerate() {
                        if *plink != link {
                            continue;
                        }
                        let (Some(out), Some(inp)) = (src.port(link, protocol), dst.port(link, protocol)) else {
                            continue;
                        };
                        for (j, item) in items.iter().enumerate() {
                            if item.size > out.max_tx.min(inp.max_rx) {
                                continue;
                            }
                            let v = m.lp.add_variable(
                                format!("X_{t}_{}_{}_{}_{}", src.id, dst.id, protocol, item.kind),
                                0.0,
                                1.0,
                            );
                            m.lp.add_objective(v, weight);
                            let size = f64::from(item.size);
                            tx.entry((from, p)).or_default().add(v, size);
                            rx.entry((to, p)).or_default().add(v, size);
                            flow.entry((from, j)).or_default().add(v, -1.0);
                            flow.entry((to, j)).or_default().add(v, 1.0);
                            m.send.insert(Edge { t, from, to, protocol: p, item: j }, v);
                        }
                    }
                }
            }
            for ((i, p), row) in tx {
                let (link, protocol) = &input.protocols[p];
                let Some(port) = nodes[i].port(*link, protocol) else { continue };
                let budget = if t == 0 { port.max_tx.saturating_sub(port.used_tx) } else { port.max_tx };
                m.lp.add_constraint(
                    format!("{}_tx_{}_{}_{t}", nodes[i].id, link, protocol),
                    row,
                    Relation::Le,
                    f64::from(budget),
                );
            }
            for ((i, p), row) in rx {
                let (link, protocol) = &input.protocols[p];
                let Some(port) = nodes[i].port(*link, protocol) else { continue };
                let budget = if t == 0 {
                    port.max_rx.saturating_sub(port.used_rx)
                } else if !cfg.foreign_future_capacity && input.is_foreign(nodes[i].owner) {
                    0
                } else {
                    port.max_rx
                };
                m.lp.add_constraint(
                    format!("{}_rx_{}_{}_{t}", nodes[i].id, link, protocol),
                    row,
                    Relation::Le,
                    f64::from(budget),
                );
            }

            // resolution
            for (i, node) in nodes.iter().enumerate() {
                for (j, item) in items.iter().enumerate() {
                    let v = m.lp.add_variable(format!("R_{t}_{}_{}", node.id, item.kind), 0.0, 1.0);
                    m.lp.add_objective(v, item.resolve_weight(node, step));
                    m.resolve.insert((t, i, j), v);
                }
            }

            // conservation
            for (i, node) in nodes.iter().enumerate() {
                for (j, item) in items.iter().enumerate() {
                    let mut row = flow.remove(&(i, j)).unwrap_or_default();
                    if let Some(&r) = m.resolve.get(&(t, i, j)) {
                        row.add(r, -1.0);
                    }
                    let mut rhs = 0.0;
                    if !node.station {
                        let inflow = if t == 0 {
                            m.sense.get(&(i, j))
                        } else {
                            m.hold.get(&(t - 1, i, j))
                        };
                        if let Some(&v) = inflow {
                            row.add(v, 1.0);
                        }
                        if let Some(&v) = m.hold.get(&(t, i, j)) {
                            row.add(v, -1.0);
                        }
                        if t == 0 && item.holder == Some(i) {
                            rhs = -1.0;
                        }
                    }
                    m.lp.add_constraint(format!("{}_flow_{}_{t}", node.id, item.kind), row, Relation::Eq, rhs);
                }
            }
        }

        if cfg.solvency_row && input.planner.is_some() {
            let mut row = Row::new();
            for (edge, &v) in m.send.iter().filter(|(e, _)| e.t == 0) {
                if let Some((service, _)) = input.payee(edge.from, edge.to) {
                    row.add(v, cash_to_f64(cfg.fees.fee(service)));
                }
            }
            for (&(t, i, j), &v) in &m.resolve {
                if t == 0 {
                    row.add(v, -items[j].resolve_cash(&nodes[i]));
                }
            }
            m.lp.add_constraint("solvency", row, Relation::Le, input.planner_cash);
        }

        trace!(
            variables = m.lp.num_variables(),
            constraints = m.lp.num_constraints(),
            nodes = nodes.len(),
            items = items.len(),
            steps = input.steps,
            "model built"
        );
        m
    }

    /// Snapshot, build and solve. `Ok(None)` when there is nothing to plan with.
    pub(crate) fn plan(&mut self, ctx: &Context, scope: &Scope) -> Result<Option<Plan>, Unsolved> {
        let Some(input) = self.snapshot(ctx, scope).filter(|i| !i.nodes.is_empty()) else {
            return Ok(None);
        };
        let model = self.build(&input, &ctx.locations);
        match self.solver.solve(&model.lp) {
            Ok(solution) => {
                let fractional = solution.fractional();
                if fractional > 0 {
                    warn!(time = input.time, fractional, "fractional plan; nonzero values count as taken");
                }
                Ok(Some(Plan { input, model, solution }))
            }
            Err(error) => {
                let dump = model.lp.dump();
                trace!(%dump, "unsolved model");
                Err(Unsolved { error, dump })
            }
        }
    }
}
