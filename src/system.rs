// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Federated Satellite Systems Simulation ("FSS") - System Kernel

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::event::Demand;
use crate::ledger::Cash;
use crate::location::{Location, Locations};
use crate::subsystem::{CapacityError, Subsystem, SubsystemKind};
use crate::types::{ContractId, Data, LinkKind, LocationId, Phenomena, Protocol, SystemId};

/// Fraction of design cost recovered when decommissioning from service.
const SALVAGE_FACTOR: Decimal = dec!(0.5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SystemKind {
    Spacecraft,
    GroundStation,
}

/// A spacecraft or ground station and the subsystems mounted on it.
///
/// Commissioned while `location` is set. Spacecraft move between turns via
/// [`tick`](Self::tick) / [`tock`](Self::tock); ground stations never move.
#[derive(Debug, Serialize, Deserialize)]
pub struct System {
    pub id: SystemId,
    pub name: String,
    pub kind: SystemKind,
    /// Base (bus) cost, excluding subsystems
    pub cost: Cash,
    pub max_size: u32,
    pub subsystems: Vec<Subsystem>,
    location: Option<LocationId>,
    next_location: Option<LocationId>,
}

impl System {
    pub fn new(
        id: SystemId,
        name: impl Into<String>,
        kind: SystemKind,
        cost: Cash,
        max_size: u32,
        subsystems: Vec<Subsystem>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            cost,
            max_size,
            subsystems,
            location: None,
            next_location: None,
        }
    }

    pub fn location(&self) -> Option<LocationId> {
        self.location
    }

    pub fn is_commissioned(&self) -> bool {
        self.location.is_some()
    }

    pub(crate) fn set_location(&mut self, location: Option<LocationId>) {
        self.location = location;
        self.next_location = location;
    }

    pub fn is_spacecraft(&self) -> bool {
        self.kind == SystemKind::Spacecraft
    }

    pub fn is_ground_station(&self) -> bool {
        self.kind == SystemKind::GroundStation
    }

    // ─── Costs ──────────────────────────────────────────────────────────────

    /// Total subsystem size mounted on the bus.
    pub fn contents_size(&self) -> u32 {
        self.subsystems.iter().map(|s| s.size).sum()
    }

    /// Base cost plus every mounted subsystem.
    pub fn design_cost(&self) -> Cash {
        self.cost + self.subsystems.iter().map(|s| s.cost).sum::<Cash>()
    }

    /// Launch cost into `location`; ground stations and LEO are free.
    pub fn commission_cost(&self, location: &Location) -> Cash {
        match (self.kind, location.altitude()) {
            (SystemKind::Spacecraft, Some(altitude)) => self.cost.scale(altitude.commission_factor()),
            _ => Cash::zero(),
        }
    }

    /// Residual value recovered by decommissioning from `location`.
    pub fn decommission_value(&self, location: Option<&Location>) -> Cash {
        match self.kind {
            SystemKind::Spacecraft if location.map_or(true, Location::is_surface) => self.design_cost(),
            _ => self.design_cost().scale(SALVAGE_FACTOR),
        }
    }

    /// Placement rule: stations need an unoccupied surface, spacecraft any orbit.
    pub fn can_occupy(&self, location: &Location, occupied: bool) -> bool {
        match self.kind {
            SystemKind::GroundStation => location.is_surface() && !occupied,
            SystemKind::Spacecraft => location.is_orbit(),
        }
    }

    // ─── Capability ─────────────────────────────────────────────────────────

    fn count_links(&self, link: LinkKind) -> usize {
        self.subsystems.iter().filter(|s| s.is_link(link, None)).count()
    }

    /// Spacecraft need an ISL, or an SGL and a sensor, to be useful.
    pub fn is_operational(&self) -> bool {
        match self.kind {
            SystemKind::GroundStation => true,
            SystemKind::Spacecraft => {
                self.count_links(LinkKind::InterSatellite) > 0
                    || (self.count_links(LinkKind::SpaceGround) > 0
                        && self.subsystems.iter().any(Subsystem::is_sensor))
            }
        }
    }

    pub fn has_defense(&self) -> bool {
        self.subsystems.iter().any(Subsystem::is_defense)
    }

    pub fn has_link(&self, link: LinkKind) -> bool {
        self.count_links(link) > 0
    }

    /// Protocols spoken by this system's transceivers of `link`.
    pub fn protocols(&self, link: LinkKind) -> BTreeSet<Protocol> {
        self.subsystems
            .iter()
            .filter_map(Subsystem::transceiver)
            .filter(|t| t.link == link)
            .map(|t| t.protocol.clone())
            .collect()
    }

    /// `(max, used)` per-turn transmit budget summed over matching transceivers.
    pub fn transmit_budget(&self, link: LinkKind, protocol: &Protocol) -> (u32, u32) {
        self.subsystems
            .iter()
            .filter_map(Subsystem::transceiver)
            .filter(|t| t.link == link && t.protocol == *protocol)
            .fold((0, 0), |(m, u), t| (m + t.max_transmitted, u + t.transmitted()))
    }

    /// `(max, used)` per-turn receive budget summed over matching transceivers.
    pub fn receive_budget(&self, link: LinkKind, protocol: &Protocol) -> (u32, u32) {
        self.subsystems
            .iter()
            .filter_map(Subsystem::transceiver)
            .filter(|t| t.link == link && t.protocol == *protocol)
            .fold((0, 0), |(m, u), t| (m + t.max_received, u + t.received()))
    }

    /// Storage ceiling for `phenomena` data, or for all data when `None`.
    pub fn capacity(&self, phenomena: Option<Phenomena>) -> u32 {
        self.subsystems
            .iter()
            .filter(|s| match (&s.kind, phenomena) {
                (SubsystemKind::Storage(_), _) => true,
                (SubsystemKind::Sensor(_), None) => true,
                (SubsystemKind::Sensor(sensor), Some(p)) => sensor.phenomena == p,
                _ => false,
            })
            .map(Subsystem::capacity)
            .sum()
    }

    /// Units of `phenomena` (all when `None`) the sensors can still capture this turn.
    pub fn sensing_room(&self, phenomena: Option<Phenomena>) -> u32 {
        self.subsystems
            .iter()
            .filter_map(|s| s.sensor().map(|sensor| (s, sensor)))
            .filter(|(_, sensor)| phenomena.map_or(true, |p| sensor.phenomena == p))
            .map(|(s, sensor)| s.free().min(sensor.max_sensed.saturating_sub(sensor.sensed())))
            .sum()
    }

    // ─── Inventory ──────────────────────────────────────────────────────────

    /// Index of the subsystem holding data for `contract`.
    pub fn locate(&self, contract: ContractId) -> Option<usize> {
        self.subsystems.iter().position(|s| s.holds(contract))
    }

    pub fn holds(&self, contract: ContractId) -> bool {
        self.locate(contract).is_some()
    }

    pub fn data(&self, contract: ContractId) -> Option<&Data> {
        self.subsystems
            .iter()
            .flat_map(|s| s.contents().iter())
            .find(|d| d.contract == contract)
    }

    /// Every contract with data aboard.
    pub fn contracts_aboard(&self) -> Vec<ContractId> {
        self.subsystems
            .iter()
            .flat_map(|s| s.contents().iter().map(|d| d.contract))
            .collect()
    }

    /// Whether data for `contract` sits in a transit buffer.
    pub fn in_transit(&self, contract: ContractId) -> bool {
        self.locate(contract)
            .is_some_and(|i| self.subsystems[i].transceiver().is_some())
    }

    /// Drop data for `contract`, wherever it sits aboard.
    pub(crate) fn remove_data(&mut self, contract: ContractId) -> Option<Data> {
        let idx = self.locate(contract)?;
        self.subsystems[idx].take(contract)
    }

    /// Sensor able to capture `demand` right now, ignoring geometry.
    fn sensor_for(&self, demand: &Demand) -> Option<usize> {
        self.subsystems
            .iter()
            .position(|s| s.can_sense(demand.phenomena(), demand.size()))
    }

    /// Whether any sensor aboard could ever capture `size` units of `phenomena`.
    pub fn could_sense(&self, phenomena: Phenomena, size: u32) -> bool {
        self.subsystems
            .iter()
            .filter_map(Subsystem::sensor)
            .any(|s| s.phenomena == phenomena && s.capacity >= size)
    }

    /// LEO/MEO spacecraft in the demand's sector with a fitting sensor.
    pub fn can_sense(&self, demand: &Demand, location: &Location) -> bool {
        self.is_spacecraft()
            && self.location == Some(location.id)
            && location.altitude().is_some_and(|a| a.can_sense())
            && location.sector == demand.sector
            && self.sensor_for(demand).is_some()
    }

    /// Capture data for `contract` from `demand` at the current location.
    pub(crate) fn sense(
        &mut self,
        contract: ContractId,
        demand: &Demand,
        location: &Location,
    ) -> Result<(), CapacityError> {
        if !self.can_sense(demand, location) {
            return Err(CapacityError::NoSensor(demand.phenomena()));
        }
        let idx = self
            .sensor_for(demand)
            .ok_or(CapacityError::NoSensor(demand.phenomena()))?;
        self.subsystems[idx].sense(Data {
            contract,
            phenomena: demand.phenomena(),
            size: demand.size(),
        })
    }

    /// Atomically move data between two subsystems of this system.
    pub fn transfer(&mut self, contract: ContractId, to: usize) -> Result<(), CapacityError> {
        let from = self.locate(contract).ok_or(CapacityError::DataNotHeld(contract))?;
        if from == to {
            return Ok(());
        }
        let dest = self
            .subsystems
            .get(to)
            .ok_or(CapacityError::DataNotHeld(contract))?;
        let data = self.subsystems[from]
            .contents()
            .iter()
            .find(|d| d.contract == contract)
            .ok_or(CapacityError::DataNotHeld(contract))?;
        dest.accepts(data)?;
        let data = self.subsystems[from]
            .take(contract)
            .ok_or(CapacityError::DataNotHeld(contract))?;
        self.subsystems[to].put(data);
        Ok(())
    }

    /// Move data out of a transit buffer into storage, else a matching sensor.
    pub fn store(&mut self, contract: ContractId) -> Result<(), CapacityError> {
        let data = self.data(contract).ok_or(CapacityError::DataNotHeld(contract))?;
        let needed = data.size;
        let target = self
            .subsystems
            .iter()
            .enumerate()
            .filter(|(_, s)| s.accepts(data).is_ok())
            .min_by_key(|(_, s)| s.is_sensor())
            .map(|(i, _)| i);
        match target {
            Some(i) => self.transfer(contract, i),
            None => Err(CapacityError::InsufficientCapacity { needed, available: 0 }),
        }
    }

    // ─── Entity protocol ────────────────────────────────────────────────────

    pub fn init(&mut self) {
        for s in &mut self.subsystems {
            s.init();
        }
        self.next_location = self.location;
    }

    /// Compute the position for next turn.
    pub fn tick(&mut self, locations: &Locations) {
        for s in &mut self.subsystems {
            s.tick();
        }
        self.next_location = match (self.kind, self.location) {
            (SystemKind::Spacecraft, Some(id)) => locations.propagate(id, 1).ok().or(Some(id)),
            (_, location) => location,
        };
    }

    /// Commit the move and reset subsystems. Returns data flushed from transit buffers.
    pub fn tock(&mut self) -> Vec<Data> {
        self.location = self.next_location;
        self.subsystems.iter_mut().flat_map(Subsystem::tock).collect()
    }
}

// ─── Transmission ───────────────────────────────────────────────────────────

/// A checked transmission: which subsystems take part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub link: LinkKind,
    pub protocol: Protocol,
    holder: usize,
    transmitter: usize,
    receiver: usize,
}

/// Check that `origin` can send data for `contract` to `dest`.
///
/// The link family follows the destination: ground stations are reached over
/// space-ground links, spacecraft over inter-satellite links.
pub fn route(
    origin: &System,
    dest: &System,
    contract: ContractId,
    protocol: Option<&Protocol>,
    locations: &Locations,
) -> Result<Route, CapacityError> {
    if origin.id == dest.id {
        return Err(CapacityError::SelfLink(origin.id));
    }
    let from = origin
        .location
        .and_then(|id| locations.get(id).ok())
        .ok_or(CapacityError::NotCommissioned(origin.id))?;
    let to = dest
        .location
        .and_then(|id| locations.get(id).ok())
        .ok_or(CapacityError::NotCommissioned(dest.id))?;
    let holder = origin.locate(contract).ok_or(CapacityError::DataNotHeld(contract))?;
    let size = origin
        .data(contract)
        .map(|d| d.size)
        .ok_or(CapacityError::DataNotHeld(contract))?;
    let link = match dest.kind {
        SystemKind::GroundStation => LinkKind::SpaceGround,
        SystemKind::Spacecraft => LinkKind::InterSatellite,
    };
    if !locations.visible(link, from, to) {
        return Err(CapacityError::NotVisible { from: origin.id, to: dest.id });
    }

    let mut any_transmitter = false;
    for (transmitter, tx) in origin.subsystems.iter().enumerate() {
        let Some(t) = tx.transceiver() else { continue };
        if !tx.is_link(link, protocol) || !t.can_transmit(size) {
            continue;
        }
        any_transmitter = true;
        let receiver = dest.subsystems.iter().position(|rx| {
            rx.is_link(link, Some(&t.protocol))
                && rx.transceiver().is_some_and(|r| r.can_receive(size))
        });
        if let Some(receiver) = receiver {
            return Ok(Route {
                link,
                protocol: t.protocol.clone(),
                holder,
                transmitter,
                receiver,
            });
        }
    }
    let protocol = protocol.cloned();
    Err(if any_transmitter {
        CapacityError::NoReceiver { link, protocol }
    } else {
        CapacityError::NoTransmitter { link, protocol }
    })
}

/// Transmit data for `contract` from `origin` into a receiver on `dest`.
/// All-or-nothing: any refusal leaves both systems untouched.
pub fn transmit(
    origin: &mut System,
    dest: &mut System,
    contract: ContractId,
    protocol: Option<&Protocol>,
    locations: &Locations,
) -> Result<Route, CapacityError> {
    let route = route(origin, dest, contract, protocol, locations)?;
    let data = origin.subsystems[route.holder]
        .take(contract)
        .ok_or(CapacityError::DataNotHeld(contract))?;
    origin.subsystems[route.transmitter].record_transmit(data.size);
    dest.subsystems[route.receiver].record_receive(data);
    Ok(route)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::DemandSpec;
    use crate::location::Altitude;
    use crate::subsystem::{Sensor, Storage, Transceiver};
    use crate::types::EventId;

    fn locs() -> Locations {
        Locations::standard(6, &Altitude::ALL)
    }

    fn link(link: LinkKind, protocol: &str) -> Subsystem {
        Subsystem::new(
            protocol,
            Cash::from_units(50),
            1,
            SubsystemKind::Transceiver(Transceiver::new(link, Protocol::from(protocol), 1, 1)),
        )
    }

    fn vis() -> Subsystem {
        Subsystem::new("VIS", Cash::from_units(250), 1, SubsystemKind::Sensor(Sensor::new(Phenomena::Vis, 1, 1)))
    }

    fn small_sat(id: u32, subsystems: Vec<Subsystem>) -> System {
        System::new(SystemId(id), "SmallSat", SystemKind::Spacecraft, Cash::from_units(200), 2, subsystems)
    }

    fn station(id: u32) -> System {
        System::new(
            SystemId(id),
            "GroundSta",
            SystemKind::GroundStation,
            Cash::from_units(500),
            4,
            vec![link(LinkKind::SpaceGround, "prop")],
        )
    }

    fn place(system: &mut System, locs: &Locations, name: &str) -> Location {
        let loc = locs.by_name(name).expect("test: location").clone();
        system.set_location(Some(loc.id));
        loc
    }

    fn demand(sector: u32) -> Demand {
        Demand {
            id: EventId(1),
            sector,
            spec: DemandSpec {
                name: "VIS1".into(),
                phenomena: Phenomena::Vis,
                size: 1,
                value_schedule: vec![(1, Cash::from_units(600))],
                default_value: Cash::from_units(-50),
            },
        }
    }

    #[test]
    fn costs_follow_altitude_and_service_state() {
        let locs = locs();
        let sat = small_sat(1, vec![vis(), link(LinkKind::SpaceGround, "prop")]);
        assert_eq!(sat.design_cost(), Cash::from_units(500));
        assert_eq!(sat.commission_cost(locs.by_name("LEO1").expect("test")), Cash::zero());
        assert_eq!(sat.commission_cost(locs.by_name("MEO1").expect("test")), Cash::from_units(100));
        assert_eq!(sat.commission_cost(locs.by_name("GEO1").expect("test")), Cash::from_units(200));
        assert_eq!(sat.decommission_value(None), Cash::from_units(500));
        assert_eq!(sat.decommission_value(locs.by_name("LEO1").ok()), Cash::from_units(250));
        assert_eq!(station(2).decommission_value(None), Cash::from_units(275));
    }

    #[test]
    fn operational_needs_isl_or_sgl_and_sensor() {
        assert!(small_sat(1, vec![vis(), link(LinkKind::SpaceGround, "prop")]).is_operational());
        assert!(small_sat(1, vec![link(LinkKind::InterSatellite, "prop")]).is_operational());
        assert!(!small_sat(1, vec![link(LinkKind::SpaceGround, "prop")]).is_operational());
        assert!(!small_sat(1, vec![vis()]).is_operational());
    }

    #[test]
    fn senses_only_in_sector_from_low_orbit() {
        let locs = locs();
        let mut sat = small_sat(1, vec![vis(), link(LinkKind::SpaceGround, "prop")]);
        let leo1 = place(&mut sat, &locs, "LEO1");
        assert!(!sat.can_sense(&demand(2), &leo1));
        assert!(sat.can_sense(&demand(1), &leo1));

        let mut geo = small_sat(2, vec![vis(), link(LinkKind::SpaceGround, "prop")]);
        let geo1 = place(&mut geo, &locs, "GEO1");
        assert!(!geo.can_sense(&demand(1), &geo1));

        sat.sense(ContractId(1), &demand(1), &leo1).expect("test: sense");
        assert!(sat.holds(ContractId(1)));
        assert!(!sat.can_sense(&demand(1), &leo1));
    }

    #[test]
    fn sgl_requires_same_sector() {
        let locs = locs();
        let mut sat = small_sat(1, vec![vis(), link(LinkKind::SpaceGround, "prop")]);
        let leo1 = place(&mut sat, &locs, "LEO1");
        let mut sta = station(2);
        place(&mut sta, &locs, "SUR2");
        sat.sense(ContractId(1), &demand(1), &leo1).expect("test: sense");

        let err = transmit(&mut sat, &mut sta, ContractId(1), None, &locs);
        assert!(matches!(err, Err(CapacityError::NotVisible { .. })), "got {err:?}");
        assert!(sat.holds(ContractId(1)));

        place(&mut sta, &locs, "SUR1");
        let route = transmit(&mut sat, &mut sta, ContractId(1), None, &locs).expect("test: downlink");
        assert_eq!(route.protocol, Protocol::from("prop"));
        assert!(!sat.holds(ContractId(1)));
        assert!(sta.holds(ContractId(1)));
    }

    #[test]
    fn protocol_mismatch_is_refused() {
        let locs = locs();
        let mut sat = small_sat(1, vec![vis(), link(LinkKind::SpaceGround, "open")]);
        let leo1 = place(&mut sat, &locs, "LEO1");
        let mut sta = station(2);
        place(&mut sta, &locs, "SUR1");
        sat.sense(ContractId(1), &demand(1), &leo1).expect("test: sense");

        let err = transmit(&mut sat, &mut sta, ContractId(1), None, &locs);
        assert!(matches!(err, Err(CapacityError::NoReceiver { .. })), "got {err:?}");
        assert!(sat.holds(ContractId(1)));
    }

    #[test]
    fn throughput_exhaustion_is_atomic() {
        let locs = locs();
        let mut a = small_sat(1, vec![link(LinkKind::InterSatellite, "prop"), Subsystem::new(
            "DAT",
            Cash::from_units(50),
            1,
            SubsystemKind::Storage(Storage { capacity: 2 }),
        )]);
        place(&mut a, &locs, "LEO1");
        let mut b = small_sat(2, vec![link(LinkKind::InterSatellite, "prop")]);
        place(&mut b, &locs, "MEO2");
        for id in [1, 2] {
            a.subsystems[1].put(Data { contract: ContractId(id), phenomena: Phenomena::Sar, size: 1 });
        }

        transmit(&mut a, &mut b, ContractId(1), None, &locs).expect("test: first crosslink");
        let err = transmit(&mut a, &mut b, ContractId(2), None, &locs);
        assert!(matches!(err, Err(CapacityError::NoTransmitter { .. })), "got {err:?}");
        assert!(a.holds(ContractId(2)));
        assert!(!b.holds(ContractId(2)));
    }

    #[test]
    fn store_moves_out_of_transit() {
        let locs = locs();
        let mut a = small_sat(1, vec![vis(), link(LinkKind::InterSatellite, "prop")]);
        let leo1 = place(&mut a, &locs, "LEO1");
        let mut b = small_sat(2, vec![vis(), link(LinkKind::InterSatellite, "prop")]);
        place(&mut b, &locs, "LEO2");
        a.sense(ContractId(1), &demand(1), &leo1).expect("test: sense");
        transmit(&mut a, &mut b, ContractId(1), None, &locs).expect("test: crosslink");
        assert!(b.in_transit(ContractId(1)));

        b.store(ContractId(1)).expect("test: store");
        assert!(!b.in_transit(ContractId(1)));
        assert!(b.tock().is_empty());
        assert!(b.holds(ContractId(1)));
    }

    #[test]
    fn store_spends_one_transfer_per_turn() {
        let mut b = small_sat(2, vec![link(LinkKind::InterSatellite, "prop"), Subsystem::new(
            "DAT",
            Cash::from_units(50),
            1,
            SubsystemKind::Storage(Storage { capacity: 2 }),
        )]);
        for id in [1, 2] {
            b.subsystems[0].record_receive(Data { contract: ContractId(id), phenomena: Phenomena::Sar, size: 1 });
        }

        b.store(ContractId(1)).expect("test: first store");
        assert!(b.store(ContractId(2)).is_err());
        assert!(b.in_transit(ContractId(2)));
        assert_eq!(b.subsystems[1].transferred(), 1);
    }

    #[test]
    fn spacecraft_moves_on_tock_only() {
        let locs = locs();
        let mut sat = small_sat(1, vec![vis(), link(LinkKind::SpaceGround, "prop")]);
        let leo1 = place(&mut sat, &locs, "LEO1");
        sat.tick(&locs);
        assert_eq!(sat.location(), Some(leo1.id));
        sat.tock();
        assert_eq!(sat.location(), Some(locs.by_name("LEO3").expect("test").id));
    }
}
