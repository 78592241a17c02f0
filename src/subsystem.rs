// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Federated Satellite Systems Simulation ("FSS") - Subsystem Kernel

use serde::{Deserialize, Serialize};

use crate::ledger::Cash;
use crate::types::{ContractId, Data, LinkKind, Phenomena, Protocol, SystemId};

// ─── Errors ─────────────────────────────────────────────────────────────────

/// Refused inventory or link operation. Raised before any state changes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CapacityError {
    #[error("insufficient capacity: needed {needed}, available {available}")]
    InsufficientCapacity { needed: u32, available: u32 },

    #[error("sensor observes {expected}, data is {found}")]
    PhenomenaMismatch { expected: Phenomena, found: Phenomena },

    #[error("subsystem `{0}` holds no inventory")]
    NotAnInventory(String),

    #[error("sensing budget exhausted")]
    SensingExhausted,

    #[error("transfer budget exhausted: {used} of {max} moved in this turn")]
    TransferExhausted { used: u32, max: u32 },

    #[error("no sensor able to capture {0} data")]
    NoSensor(Phenomena),

    #[error("data for contract {0} not held")]
    DataNotHeld(ContractId),

    #[error("no {link} transmitter with budget for protocol {protocol:?}")]
    NoTransmitter { link: LinkKind, protocol: Option<Protocol> },

    #[error("no {link} receiver with budget for protocol {protocol:?}")]
    NoReceiver { link: LinkKind, protocol: Option<Protocol> },

    #[error("{from} cannot see {to}")]
    NotVisible { from: SystemId, to: SystemId },

    #[error("system {0} is not commissioned")]
    NotCommissioned(SystemId),

    #[error("system {0} cannot transmit to itself")]
    SelfLink(SystemId),
}

// ─── Variants ───────────────────────────────────────────────────────────────

/// Phenomena-typed capture buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sensor {
    pub phenomena: Phenomena,
    pub capacity: u32,
    pub max_sensed: u32,
    sensed: u32,
}

impl Sensor {
    pub fn new(phenomena: Phenomena, capacity: u32, max_sensed: u32) -> Self {
        Self { phenomena, capacity, max_sensed, sensed: 0 }
    }

    /// Units sensed so far this turn.
    pub fn sensed(&self) -> u32 {
        self.sensed
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Storage {
    pub capacity: u32,
}

/// Link endpoint. Received data waits in its buffer until stored, resolved,
/// or flushed at tock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transceiver {
    pub link: LinkKind,
    pub protocol: Protocol,
    pub max_transmitted: u32,
    pub max_received: u32,
    transmitted: u32,
    received: u32,
}

impl Transceiver {
    pub fn new(link: LinkKind, protocol: Protocol, max_transmitted: u32, max_received: u32) -> Self {
        Self { link, protocol, max_transmitted, max_received, transmitted: 0, received: 0 }
    }

    pub fn transmitted(&self) -> u32 {
        self.transmitted
    }

    pub fn received(&self) -> u32 {
        self.received
    }

    pub fn can_transmit(&self, size: u32) -> bool {
        self.transmitted + size <= self.max_transmitted
    }

    pub fn can_receive(&self, size: u32) -> bool {
        self.received + size <= self.max_received
    }

    fn matches(&self, link: LinkKind, protocol: Option<&Protocol>) -> bool {
        self.link == link && protocol.map_or(true, |p| *p == self.protocol)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubsystemKind {
    Sensor(Sensor),
    Storage(Storage),
    Transceiver(Transceiver),
    /// Shields the host spacecraft from disturbances.
    Defense,
}

// ─── Subsystem ──────────────────────────────────────────────────────────────

/// Units any subsystem may take in by intra-system transfer per turn.
pub const MAX_TRANSFERRED: u32 = 1;

/// A component mounted on exactly one system.
#[derive(Debug, Serialize, Deserialize)]
pub struct Subsystem {
    pub name: String,
    pub cost: Cash,
    pub size: u32,
    pub kind: SubsystemKind,
    pub max_transferred: u32,
    transferred: u32,
    contents: Vec<Data>,
}

impl Subsystem {
    pub fn new(name: impl Into<String>, cost: Cash, size: u32, kind: SubsystemKind) -> Self {
        Self {
            name: name.into(),
            cost,
            size,
            kind,
            max_transferred: MAX_TRANSFERRED,
            transferred: 0,
            contents: Vec::new(),
        }
    }

    /// Units moved in by transfer so far this turn.
    pub fn transferred(&self) -> u32 {
        self.transferred
    }

    pub fn contents(&self) -> &[Data] {
        &self.contents
    }

    /// Inventory ceiling; a transceiver's buffer is bounded by what it may
    /// receive in one turn.
    pub fn capacity(&self) -> u32 {
        match &self.kind {
            SubsystemKind::Sensor(s) => s.capacity,
            SubsystemKind::Storage(s) => s.capacity,
            SubsystemKind::Transceiver(t) => t.max_received,
            SubsystemKind::Defense => 0,
        }
    }

    pub fn used(&self) -> u32 {
        self.contents.iter().map(|d| d.size).sum()
    }

    pub fn free(&self) -> u32 {
        self.capacity().saturating_sub(self.used())
    }

    pub fn holds(&self, contract: ContractId) -> bool {
        self.contents.iter().any(|d| d.contract == contract)
    }

    pub fn is_sensor(&self) -> bool {
        matches!(self.kind, SubsystemKind::Sensor(_))
    }

    pub fn is_defense(&self) -> bool {
        matches!(self.kind, SubsystemKind::Defense)
    }

    pub fn sensor(&self) -> Option<&Sensor> {
        match &self.kind {
            SubsystemKind::Sensor(s) => Some(s),
            _ => None,
        }
    }

    pub fn transceiver(&self) -> Option<&Transceiver> {
        match &self.kind {
            SubsystemKind::Transceiver(t) => Some(t),
            _ => None,
        }
    }

    /// Whether this is a transceiver of `link` speaking `protocol` (any when `None`).
    pub fn is_link(&self, link: LinkKind, protocol: Option<&Protocol>) -> bool {
        self.transceiver().is_some_and(|t| t.matches(link, protocol))
    }

    /// Whether `data` may be moved in by an intra-system transfer.
    pub fn accepts(&self, data: &Data) -> Result<(), CapacityError> {
        match &self.kind {
            SubsystemKind::Sensor(s) if s.phenomena != data.phenomena => {
                return Err(CapacityError::PhenomenaMismatch {
                    expected: s.phenomena,
                    found: data.phenomena,
                });
            }
            SubsystemKind::Sensor(_) | SubsystemKind::Storage(_) => {}
            SubsystemKind::Transceiver(_) | SubsystemKind::Defense => {
                return Err(CapacityError::NotAnInventory(self.name.clone()));
            }
        }
        if data.size > self.free() {
            return Err(CapacityError::InsufficientCapacity {
                needed: data.size,
                available: self.free(),
            });
        }
        if self.transferred + data.size > self.max_transferred {
            return Err(CapacityError::TransferExhausted {
                used: self.transferred,
                max: self.max_transferred,
            });
        }
        Ok(())
    }

    /// Whether this sensor can capture `size` units of `phenomena` now.
    pub fn can_sense(&self, phenomena: Phenomena, size: u32) -> bool {
        match &self.kind {
            SubsystemKind::Sensor(s) => {
                s.phenomena == phenomena
                    && self.used() + size <= s.capacity
                    && s.sensed + size <= s.max_sensed
            }
            _ => false,
        }
    }

    /// Capture new data into this sensor.
    pub(crate) fn sense(&mut self, data: Data) -> Result<(), CapacityError> {
        if !self.can_sense(data.phenomena, data.size) {
            return Err(match self.sensor() {
                None => CapacityError::NoSensor(data.phenomena),
                Some(s) if s.phenomena != data.phenomena => CapacityError::PhenomenaMismatch {
                    expected: s.phenomena,
                    found: data.phenomena,
                },
                Some(s) if s.sensed + data.size > s.max_sensed => CapacityError::SensingExhausted,
                Some(_) => CapacityError::InsufficientCapacity {
                    needed: data.size,
                    available: self.free(),
                },
            });
        }
        if let SubsystemKind::Sensor(s) = &mut self.kind {
            s.sensed += data.size;
        }
        self.contents.push(data);
        Ok(())
    }

    /// Remove a data unit. The caller takes custody.
    pub(crate) fn take(&mut self, contract: ContractId) -> Option<Data> {
        let idx = self.contents.iter().position(|d| d.contract == contract)?;
        Some(self.contents.remove(idx))
    }

    /// Place a data unit after [`accepts`](Self::accepts) succeeded.
    pub(crate) fn put(&mut self, data: Data) {
        self.transferred += data.size;
        self.contents.push(data);
    }

    /// Debit the transmit budget. Caller has checked `can_transmit`.
    pub(crate) fn record_transmit(&mut self, size: u32) {
        if let SubsystemKind::Transceiver(t) = &mut self.kind {
            t.transmitted += size;
        }
    }

    /// Accept a transmitted unit into the buffer. Caller has checked `can_receive`.
    pub(crate) fn record_receive(&mut self, data: Data) {
        if let SubsystemKind::Transceiver(t) = &mut self.kind {
            t.received += data.size;
        }
        self.contents.push(data);
    }

    pub fn init(&mut self) {
        self.contents.clear();
        self.reset_counters();
    }

    /// No pending state: a subsystem's next state depends only on the commit.
    pub fn tick(&mut self) {}

    /// Reset per-turn counters. Transit buffers are flushed and returned.
    pub fn tock(&mut self) -> Vec<Data> {
        self.reset_counters();
        match self.kind {
            SubsystemKind::Transceiver(_) => std::mem::take(&mut self.contents),
            _ => Vec::new(),
        }
    }

    fn reset_counters(&mut self) {
        self.transferred = 0;
        match &mut self.kind {
            SubsystemKind::Sensor(s) => s.sensed = 0,
            SubsystemKind::Transceiver(t) => {
                t.transmitted = 0;
                t.received = 0;
            }
            SubsystemKind::Storage(_) | SubsystemKind::Defense => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vis_sensor() -> Subsystem {
        Subsystem::new("VIS", Cash::from_units(250), 1, SubsystemKind::Sensor(Sensor::new(Phenomena::Vis, 1, 1)))
    }

    fn storage(capacity: u32) -> Subsystem {
        Subsystem::new("DAT", Cash::from_units(50), 1, SubsystemKind::Storage(Storage { capacity }))
    }

    fn data(id: u64, phenomena: Phenomena) -> Data {
        Data { contract: ContractId(id), phenomena, size: 1 }
    }

    #[test]
    fn sense_respects_capacity_and_budget() {
        let mut sensor = vis_sensor();
        sensor.sense(data(1, Phenomena::Vis)).expect("test: first sense");
        let err = sensor.sense(data(2, Phenomena::Vis));
        assert!(
            matches!(err, Err(CapacityError::SensingExhausted)),
            "expected SensingExhausted, got {err:?}"
        );
        assert_eq!(sensor.contents().len(), 1);
    }

    #[test]
    fn sensor_rejects_other_phenomena() {
        let mut sensor = vis_sensor();
        let err = sensor.sense(data(1, Phenomena::Sar));
        assert!(matches!(err, Err(CapacityError::PhenomenaMismatch { .. })));
        assert!(sensor.contents().is_empty());
    }

    #[test]
    fn storage_accepts_until_full() {
        let mut dat = storage(1);
        let first = data(1, Phenomena::Sar);
        dat.accepts(&first).expect("test: room for one");
        dat.put(first);
        let err = dat.accepts(&data(2, Phenomena::Vis));
        assert!(matches!(
            err,
            Err(CapacityError::InsufficientCapacity { needed: 1, available: 0 })
        ));
    }

    #[test]
    fn one_transfer_in_per_turn() {
        let mut dat = storage(2);
        dat.put(data(1, Phenomena::Sar));
        let err = dat.accepts(&data(2, Phenomena::Vis));
        assert!(
            matches!(err, Err(CapacityError::TransferExhausted { used: 1, max: 1 })),
            "expected TransferExhausted, got {err:?}"
        );
        assert_eq!(dat.contents().len(), 1);

        assert!(dat.tock().is_empty());
        assert_eq!(dat.transferred(), 0);
        dat.accepts(&data(2, Phenomena::Vis)).expect("test: budget restored");
    }

    #[test]
    fn sensing_spends_no_transfer_budget() {
        let mut sensor = vis_sensor();
        sensor.sense(data(1, Phenomena::Vis)).expect("test: sense");
        assert_eq!(sensor.transferred(), 0);
    }

    #[test]
    fn defense_holds_nothing() {
        let def = Subsystem::new("DEF", Cash::from_units(100), 1, SubsystemKind::Defense);
        assert!(matches!(def.accepts(&data(1, Phenomena::Vis)), Err(CapacityError::NotAnInventory(_))));
        assert_eq!(def.capacity(), 0);
    }

    #[test]
    fn tock_resets_budgets_and_flushes_buffers() {
        let mut sgl = Subsystem::new(
            "pSGL",
            Cash::from_units(50),
            1,
            SubsystemKind::Transceiver(Transceiver::new(LinkKind::SpaceGround, Protocol::from("prop"), 1, 1)),
        );
        sgl.record_transmit(1);
        sgl.record_receive(data(9, Phenomena::Vis));
        let t = sgl.transceiver().expect("test: transceiver");
        assert!(!t.can_transmit(1));
        assert!(!t.can_receive(1));

        let flushed = sgl.tock();
        assert_eq!(flushed.len(), 1);
        assert!(sgl.contents().is_empty());
        let t = sgl.transceiver().expect("test: transceiver");
        assert!(t.can_transmit(1) && t.can_receive(1));
    }

    #[test]
    fn tock_keeps_stored_data() {
        let mut sensor = vis_sensor();
        sensor.sense(data(1, Phenomena::Vis)).expect("test: sense");
        assert!(sensor.tock().is_empty());
        assert!(sensor.holds(ContractId(1)));
        assert_eq!(sensor.sensor().map(Sensor::sensed), Some(0));
    }
}
