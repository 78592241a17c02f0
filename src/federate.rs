// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Federated Satellite Systems Simulation ("FSS") - Federate Ownership & Contract Lifecycle

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::context::Context;
use crate::contract::Contract;
use crate::federation;
use crate::ledger::Cash;
use crate::location::LocationError;
use crate::subsystem::CapacityError;
use crate::system::{self, Route, System};
use crate::types::{ContractId, Data, EventId, FederateId, LocationId, Protocol, SystemId};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Refused federate operation. No state has changed when one is returned.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FederateError {
    #[error("unknown federate {0}")]
    UnknownFederate(FederateId),

    #[error("unknown system {0}")]
    UnknownSystem(SystemId),

    #[error("unknown contract {0}")]
    UnknownContract(ContractId),

    #[error("insufficient funds: needed {needed}, available {available}")]
    InsufficientFunds { needed: Cash, available: Cash },

    #[error("design too large: contents {size} exceed bus size {max}")]
    OversizedDesign { size: u32, max: u32 },

    #[error("system {system} cannot be placed at {location}")]
    InvalidPlacement { system: SystemId, location: String },

    #[error("system {0} is already commissioned")]
    AlreadyCommissioned(SystemId),

    #[error("sensing window closed for contract {0}")]
    SensingWindowClosed(ContractId),

    #[error("contract {0} has not reached the ground")]
    NotCompleted(ContractId),

    #[error(transparent)]
    Location(#[from] LocationError),

    #[error(transparent)]
    Capacity(#[from] CapacityError),
}

// ---------------------------------------------------------------------------
// Federate
// ---------------------------------------------------------------------------

/// An operator owning systems, contracts and a cash balance.
#[derive(Debug, Serialize, Deserialize)]
pub struct Federate {
    pub id: FederateId,
    pub name: String,
    pub initial_cash: Cash,
    pub cash: Cash,
    pub systems: Vec<System>,
    pub contracts: Vec<Contract>,
    #[serde(skip)]
    liquidating: bool,
}

impl Federate {
    pub fn new(id: FederateId, name: impl Into<String>, initial_cash: Cash) -> Self {
        Self {
            id,
            name: name.into(),
            initial_cash,
            cash: initial_cash,
            systems: Vec::new(),
            contracts: Vec::new(),
            liquidating: false,
        }
    }

    pub fn system(&self, id: SystemId) -> Option<&System> {
        self.systems.iter().find(|s| s.id == id)
    }

    pub fn system_mut(&mut self, id: SystemId) -> Option<&mut System> {
        self.systems.iter_mut().find(|s| s.id == id)
    }

    pub fn contract(&self, id: ContractId) -> Option<&Contract> {
        self.contracts.iter().find(|c| c.id == id)
    }

    /// The contract claiming dealt demand `demand`, if this federate holds it.
    pub fn contract_for(&self, demand: EventId) -> Option<&Contract> {
        self.contracts.iter().find(|c| c.demand.id == demand)
    }

    pub fn owns_system(&self, id: SystemId) -> bool {
        self.system(id).is_some()
    }

    /// Systems currently in service.
    pub fn commissioned(&self) -> impl Iterator<Item = &System> {
        self.systems.iter().filter(|s| s.is_commissioned())
    }

    /// Buy `system` and keep it uncommissioned.
    pub fn design(&mut self, system: System) -> Result<SystemId, FederateError> {
        let size = system.contents_size();
        if size > system.max_size {
            return Err(FederateError::OversizedDesign { size, max: system.max_size });
        }
        let cost = system.design_cost();
        if cost > self.cash {
            return Err(FederateError::InsufficientFunds { needed: cost, available: self.cash });
        }
        self.cash -= cost;
        let id = system.id;
        debug!(federate = %self.id, system = %id, name = %system.name, %cost, "designed");
        self.systems.push(system);
        Ok(id)
    }

    pub fn init(&mut self) {
        self.cash = self.initial_cash;
        self.liquidating = false;
        self.contracts.clear();
        for system in &mut self.systems {
            system.init();
        }
    }

    pub fn tick(&mut self, locations: &crate::location::Locations) {
        for system in &mut self.systems {
            system.tick(locations);
        }
        for contract in &mut self.contracts {
            contract.tick();
        }
    }

    /// Commit pending state. Returns data flushed from transit buffers.
    pub fn tock(&mut self) -> Vec<Data> {
        for contract in &mut self.contracts {
            contract.tock();
        }
        self.systems.iter_mut().flat_map(System::tock).collect()
    }
}

// ---------------------------------------------------------------------------
// Lifecycle operations
// ---------------------------------------------------------------------------

// These live on the context: commissioning checks every system on a
// location, and custody of a contract's data may sit with another federate.
impl Context {
    /// Place a designed system into service.
    pub fn commission(
        &mut self,
        federate: FederateId,
        system: SystemId,
        location: LocationId,
    ) -> Result<(), FederateError> {
        let loc = self.locations.get(location)?.clone();
        let occupied = self.systems().any(|(_, s)| s.location() == Some(location));
        let fed = self
            .federate_mut(federate)
            .ok_or(FederateError::UnknownFederate(federate))?;
        let sys = fed.system(system).ok_or(FederateError::UnknownSystem(system))?;
        if sys.is_commissioned() {
            return Err(FederateError::AlreadyCommissioned(system));
        }
        if !sys.can_occupy(&loc, occupied) {
            return Err(FederateError::InvalidPlacement { system, location: loc.name });
        }
        let cost = sys.commission_cost(&loc);
        if cost > fed.cash {
            return Err(FederateError::InsufficientFunds { needed: cost, available: fed.cash });
        }
        fed.cash -= cost;
        if let Some(sys) = fed.system_mut(system) {
            sys.set_location(Some(location));
        }
        debug!(%federate, %system, location = %loc.name, %cost, "commissioned");
        Ok(())
    }

    /// Remove a system, credit its residual value and default every
    /// contract whose data went down with it.
    pub fn decommission(&mut self, federate: FederateId, system: SystemId) -> Result<Cash, FederateError> {
        let loc = self.system_location(system).cloned();
        let fed = self
            .federate_mut(federate)
            .ok_or(FederateError::UnknownFederate(federate))?;
        let idx = fed
            .systems
            .iter()
            .position(|s| s.id == system)
            .ok_or(FederateError::UnknownSystem(system))?;
        let removed = fed.systems.remove(idx);
        let value = removed.decommission_value(loc.as_ref());
        fed.cash += value;
        debug!(%federate, %system, name = %removed.name, %value, "decommissioned");

        for contract in removed.contracts_aboard() {
            if let Some(owner) = self.contract_owner(contract) {
                self.default_contract(owner, contract)?;
            }
        }
        Ok(value)
    }

    /// Decommission every system, then default every remaining contract.
    /// Returns the net cash change.
    pub fn liquidate(&mut self, federate: FederateId) -> Result<Cash, FederateError> {
        let fed = self
            .federate_mut(federate)
            .ok_or(FederateError::UnknownFederate(federate))?;
        let start = fed.cash;
        fed.liquidating = true;

        while let Some(system) = self
            .federate(federate)
            .and_then(|f| f.systems.first().map(|s| s.id))
        {
            self.decommission(federate, system)?;
        }
        while let Some(contract) = self
            .federate(federate)
            .and_then(|f| f.contracts.first().map(|c| c.id))
        {
            self.default_contract(federate, contract)?;
        }

        let fed = self
            .federate_mut(federate)
            .ok_or(FederateError::UnknownFederate(federate))?;
        fed.liquidating = false;
        Ok(fed.cash - start)
    }

    /// Claim a live demand. `None` if another claim got there first.
    pub fn contract(&mut self, federate: FederateId, demand: EventId) -> Option<ContractId> {
        let idx = self.federate_index(federate)?;
        let demand = self.calendar.claim(demand)?;
        let id = self.ids.contract();
        debug!(%federate, contract = %id, demand = %demand.spec.name, sector = demand.sector, "contracted");
        let (f, g) = idx;
        self.federations[f].federates[g].contracts.push(Contract::new(id, demand));
        Some(id)
    }

    /// Capture a contract's data with one of the federate's spacecraft.
    pub fn sense(
        &mut self,
        federate: FederateId,
        contract: ContractId,
        system: SystemId,
    ) -> Result<(), FederateError> {
        let loc = self
            .system_location(system)
            .cloned()
            .ok_or(CapacityError::NotCommissioned(system))?;
        let fed = self
            .federate_mut(federate)
            .ok_or(FederateError::UnknownFederate(federate))?;
        let c = fed
            .contracts
            .iter()
            .find(|c| c.id == contract)
            .ok_or(FederateError::UnknownContract(contract))?;
        if c.elapsed() > 0 {
            return Err(FederateError::SensingWindowClosed(contract));
        }
        let demand = c.demand.clone();
        let sys = fed
            .systems
            .iter_mut()
            .find(|s| s.id == system)
            .ok_or(FederateError::UnknownSystem(system))?;
        sys.sense(contract, &demand, &loc)?;
        debug!(%federate, %contract, %system, "sensed");
        Ok(())
    }

    /// Whether data for `contract` could move from `origin` to `destination` now.
    pub fn can_transport(
        &self,
        contract: ContractId,
        protocol: Option<&Protocol>,
        origin: SystemId,
        destination: SystemId,
    ) -> bool {
        match (self.system(origin), self.system(destination)) {
            (Some(o), Some(d)) => system::route(o, d, contract, protocol, &self.locations).is_ok(),
            _ => false,
        }
    }

    /// Transmit data for `contract` from `origin` and receive it at `destination`.
    pub fn transport(
        &mut self,
        contract: ContractId,
        protocol: Option<&Protocol>,
        origin: SystemId,
        destination: SystemId,
    ) -> Result<Route, FederateError> {
        let Context { locations, federations, .. } = self;
        let (o, d) = federation::systems_pair_mut(federations, origin, destination).ok_or(
            if origin == destination {
                FederateError::Capacity(CapacityError::SelfLink(origin))
            } else {
                FederateError::UnknownSystem(destination)
            },
        )?;
        let route = system::transmit(o, d, contract, protocol, locations)?;
        debug!(%contract, %origin, %destination, link = %route.link, protocol = %route.protocol, "transported");
        Ok(route)
    }

    /// Move data out of a transit buffer into storage aboard `system`.
    pub fn store(&mut self, system: SystemId, contract: ContractId) -> Result<(), FederateError> {
        let sys = self
            .system_mut(system)
            .ok_or(FederateError::UnknownSystem(system))?;
        sys.store(contract)?;
        debug!(%contract, %system, "stored");
        Ok(())
    }

    /// Get paid for a contract whose data reached the ground.
    pub fn resolve_contract(&mut self, federate: FederateId, contract: ContractId) -> Result<Cash, FederateError> {
        let location = self.data_location(contract).cloned();
        let fed = self
            .federate(federate)
            .ok_or(FederateError::UnknownFederate(federate))?;
        let c = fed
            .contract(contract)
            .ok_or(FederateError::UnknownContract(contract))?;
        if !c.is_completed(location.as_ref()) {
            return Err(FederateError::NotCompleted(contract));
        }
        self.delete_data(contract);
        let fed = self
            .federate_mut(federate)
            .ok_or(FederateError::UnknownFederate(federate))?;
        let idx = fed
            .contracts
            .iter()
            .position(|c| c.id == contract)
            .ok_or(FederateError::UnknownContract(contract))?;
        let c = fed.contracts.remove(idx);
        let value = c.value();
        fed.cash += value;
        debug!(%federate, %contract, demand = %c.demand.spec.name, %value, "resolved");
        Ok(value)
    }

    /// Give up on a contract: pay the default value and drop its data.
    /// Liquidates the federate if this leaves it with negative cash.
    pub fn default_contract(&mut self, federate: FederateId, contract: ContractId) -> Result<Cash, FederateError> {
        let fed = self
            .federate(federate)
            .ok_or(FederateError::UnknownFederate(federate))?;
        if fed.contract(contract).is_none() {
            return Err(FederateError::UnknownContract(contract));
        }
        self.delete_data(contract);
        let fed = self
            .federate_mut(federate)
            .ok_or(FederateError::UnknownFederate(federate))?;
        let idx = fed
            .contracts
            .iter()
            .position(|c| c.id == contract)
            .ok_or(FederateError::UnknownContract(contract))?;
        let c = fed.contracts.remove(idx);
        let penalty = c.default_value();
        fed.cash += penalty;
        debug!(%federate, %contract, demand = %c.demand.spec.name, %penalty, "defaulted");

        if fed.cash.is_negative() && !fed.liquidating {
            warn!(%federate, cash = %fed.cash, "bankrupt, liquidating");
            self.liquidate(federate)?;
        }
        Ok(penalty)
    }

    /// Drop any data held for `contract`, wherever it is.
    pub fn delete_data(&mut self, contract: ContractId) -> Option<Data> {
        let system = self.locate_data(contract)?;
        self.system_mut(system)?.remove_data(contract)
    }

    /// Default every contract that has lost its data or run out of time.
    pub fn auto_default(&mut self, federate: FederateId) -> Result<(), FederateError> {
        let failed: Vec<ContractId> = match self.federate(federate) {
            Some(fed) => fed
                .contracts
                .iter()
                .filter(|c| c.is_defaulted(self.data_location(c.id)))
                .map(|c| c.id)
                .collect(),
            None => return Err(FederateError::UnknownFederate(federate)),
        };
        for contract in failed {
            if self.federate(federate).and_then(|f| f.contract(contract)).is_some() {
                self.default_contract(federate, contract)?;
            }
        }
        Ok(())
    }

    /// Decommission the federate's spacecraft that can no longer do anything.
    pub fn decommission_inoperable(&mut self, federate: FederateId) -> Result<(), FederateError> {
        let inoperable: Vec<SystemId> = self
            .federate(federate)
            .ok_or(FederateError::UnknownFederate(federate))?
            .systems
            .iter()
            .filter(|s| !s.is_operational())
            .map(|s| s.id)
            .collect();
        for system in inoperable {
            if self.federate(federate).is_some_and(|f| f.owns_system(system)) {
                self.decommission(federate, system)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::Game;

    fn context() -> (Context, FederateId) {
        let game = Game::default();
        let mut ctx = game.context(0);
        let fss = ctx.add_federation("FSS");
        let fed = ctx.join(fss, "F1", Cash::from_units(1200)).expect("test: join");
        ctx.init();
        (ctx, fed)
    }

    fn build(ctx: &mut Context, fed: FederateId, spec: &str) -> SystemId {
        let game = Game::default();
        let design = game.parse_design(spec).expect("test: design parses");
        let system = game.instantiate(&design, &mut ctx.ids).expect("test: instantiate");
        let id = ctx
            .federate_mut(fed)
            .expect("test: federate")
            .design(system)
            .expect("test: design affordable");
        let loc = ctx.locations.by_name(&design.location).expect("test: location").id;
        ctx.commission(fed, id, loc).expect("test: commission");
        id
    }

    #[test]
    fn design_debits_and_refuses_overspend() {
        let (mut ctx, fed) = context();
        let game = Game::default();
        let design = game.parse_design("LargeSat@LEO1,SAR,SAR,VIS,VIS,oISL,oSGL").expect("test: parse");
        let big = game.instantiate(&design, &mut ctx.ids).expect("test: instantiate");
        let err = ctx.federate_mut(fed).expect("test").design(big);
        assert!(
            matches!(err, Err(FederateError::InsufficientFunds { .. })),
            "expected InsufficientFunds, got {err:?}"
        );
        assert_eq!(ctx.federate(fed).expect("test").cash, Cash::from_units(1200));

        build(&mut ctx, fed, "SmallSat@LEO1,VIS,pSGL");
        assert_eq!(ctx.federate(fed).expect("test").cash, Cash::from_units(700));
    }

    #[test]
    fn oversized_design_is_refused() {
        let (mut ctx, fed) = context();
        let game = Game::default();
        let design = game.parse_design("SmallSat@LEO1,VIS,pSGL,DAT").expect("test: parse");
        let sat = game.instantiate(&design, &mut ctx.ids).expect("test: instantiate");
        let err = ctx.federate_mut(fed).expect("test").design(sat);
        assert!(matches!(err, Err(FederateError::OversizedDesign { size: 3, max: 2 })));
    }

    #[test]
    fn ground_station_needs_empty_surface() {
        let (mut ctx, fed) = context();
        build(&mut ctx, fed, "GroundSta@SUR1,pSGL");
        let game = Game::default();
        let design = game.parse_design("GroundSta@SUR1,pSGL").expect("test: parse");
        let second = game.instantiate(&design, &mut ctx.ids).expect("test: instantiate");
        let id = ctx.federate_mut(fed).expect("test").design(second).expect("test: design");
        let sur1 = ctx.locations.by_name("SUR1").expect("test").id;
        let leo1 = ctx.locations.by_name("LEO1").expect("test").id;
        assert!(matches!(
            ctx.commission(fed, id, sur1),
            Err(FederateError::InvalidPlacement { .. })
        ));
        assert!(matches!(
            ctx.commission(fed, id, leo1),
            Err(FederateError::InvalidPlacement { .. })
        ));
        assert!(!ctx.system(id).expect("test").is_commissioned());
    }

    #[test]
    fn decommission_defaults_contracts_aboard() {
        let (mut ctx, fed) = context();
        let sat = build(&mut ctx, fed, "SmallSat@LEO1,VIS,pSGL");
        let contract = ctx.ids.contract();
        ctx.federate_mut(fed).expect("test").contracts.push(Contract::new(
            contract,
            crate::event::Demand {
                id: EventId(99),
                sector: 1,
                spec: Game::default().demand_spec("VIS1").expect("test: VIS1"),
            },
        ));
        ctx.sense(fed, contract, sat).expect("test: sense");

        let value = ctx.decommission(fed, sat).expect("test: decommission");
        assert_eq!(value, Cash::from_units(250));
        let f = ctx.federate(fed).expect("test");
        assert!(f.contracts.is_empty());
        // 700 + 250 salvage - 50 default
        assert_eq!(f.cash, Cash::from_units(900));
    }

    #[test]
    fn resolve_requires_ground_delivery() {
        let (mut ctx, fed) = context();
        let sat = build(&mut ctx, fed, "SmallSat@LEO1,VIS,pSGL");
        let sta = build(&mut ctx, fed, "GroundSta@SUR1,pSGL");
        let contract = ctx.ids.contract();
        ctx.federate_mut(fed).expect("test").contracts.push(Contract::new(
            contract,
            crate::event::Demand {
                id: EventId(7),
                sector: 1,
                spec: Game::default().demand_spec("VIS1").expect("test: VIS1"),
            },
        ));
        ctx.sense(fed, contract, sat).expect("test: sense");
        assert!(matches!(
            ctx.resolve_contract(fed, contract),
            Err(FederateError::NotCompleted(_))
        ));

        ctx.transport(contract, None, sat, sta).expect("test: downlink");
        let value = ctx.resolve_contract(fed, contract).expect("test: resolve");
        assert_eq!(value, Cash::from_units(600));
        assert!(ctx.locate_data(contract).is_none());
    }

    #[test]
    fn bankruptcy_liquidates_everything() {
        let (mut ctx, fed) = context();
        let sat = build(&mut ctx, fed, "SmallSat@LEO1,VIS,pSGL");
        let _sta = build(&mut ctx, fed, "GroundSta@SUR1,pSGL");
        // 1200 - 500 - 550 = 150 left
        let spec = Game::default().demand_spec("SAR3").expect("test: SAR3");
        let mut contracts = Vec::new();
        for i in 0..2 {
            let id = ctx.ids.contract();
            ctx.federate_mut(fed).expect("test").contracts.push(Contract::new(
                id,
                crate::event::Demand { id: EventId(100 + i), sector: 1, spec: spec.clone() },
            ));
            contracts.push(id);
        }
        ctx.federate_mut(fed).expect("test").cash = Cash::from_units(100);

        // -150 drives cash to -50: liquidation salvages 250 + 275 and defaults the other (-150)
        ctx.default_contract(fed, contracts[0]).expect("test: default");
        let f = ctx.federate(fed).expect("test");
        assert!(f.systems.is_empty());
        assert!(f.contracts.is_empty());
        assert_eq!(f.cash, Cash::from_units(100 - 150 + 250 + 275 - 150));
        assert!(ctx.system(sat).is_none());
    }
}
