// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Federated Satellite Systems Simulation ("FSS") - Shared Types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ─── Typed identifiers ──────────────────────────────────────────────────────

macro_rules! typed_id {
    ($(#[$meta:meta])* $name:ident, $inner:ty, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub $inner);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

typed_id!(
    /// Index of a federation within its context.
    FederationId, u32, "FSS"
);
typed_id!(
    /// Stable federate identifier, unique across all federations.
    FederateId, u32, "F"
);
typed_id!(
    /// Stable system identifier, assigned at instantiation.
    SystemId, u32, "S"
);
typed_id!(
    /// Stable contract identifier. Also identifies the contract's data unit.
    ContractId, u64, "C"
);
typed_id!(
    /// Identifier of one dealt event instance.
    EventId, u64, "E"
);
typed_id!(
    /// Index into the location registry.
    LocationId, u32, "L"
);

/// Allocates fresh identifiers for a context.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdAllocator {
    next_federate: u32,
    next_system: u32,
    next_contract: u64,
    next_event: u64,
}

impl IdAllocator {
    pub fn federate(&mut self) -> FederateId {
        self.next_federate += 1;
        FederateId(self.next_federate)
    }

    pub fn system(&mut self) -> SystemId {
        self.next_system += 1;
        SystemId(self.next_system)
    }

    pub fn contract(&mut self) -> ContractId {
        self.next_contract += 1;
        ContractId(self.next_contract)
    }

    pub fn event(&mut self) -> EventId {
        self.next_event += 1;
        EventId(self.next_event)
    }
}

// ─── Phenomena ──────────────────────────────────────────────────────────────

/// What a sensor observes and what a demand asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phenomena {
    /// Synthetic aperture radar
    Sar,
    /// Visible-band imagery
    Vis,
}

impl Phenomena {
    pub const ALL: [Phenomena; 2] = [Phenomena::Sar, Phenomena::Vis];
}

impl fmt::Display for Phenomena {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sar => write!(f, "sar"),
            Self::Vis => write!(f, "vis"),
        }
    }
}

/// Unrecognised phenomena tag.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown phenomena `{0}`")]
pub struct UnknownPhenomena(pub String);

impl FromStr for Phenomena {
    type Err = UnknownPhenomena;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sar" => Ok(Self::Sar),
            "vis" => Ok(Self::Vis),
            _ => Err(UnknownPhenomena(s.to_string())),
        }
    }
}

// ─── Links ──────────────────────────────────────────────────────────────────

/// Transceiver family. Determines the visibility rule between endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LinkKind {
    /// Orbit to surface, same sector
    SpaceGround,
    /// Orbit to orbit, sector distance at most one
    InterSatellite,
}

impl fmt::Display for LinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SpaceGround => write!(f, "SGL"),
            Self::InterSatellite => write!(f, "ISL"),
        }
    }
}

/// Protocol tag; two transceivers interoperate only when tags are identical.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Protocol(pub String);

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Protocol {
    fn from(s: &str) -> Self {
        Protocol(s.to_string())
    }
}

// ─── Data ───────────────────────────────────────────────────────────────────

/// One captured data unit. Moved between inventories, never copied.
///
/// Each contract owns at most one data unit, so the contract id doubles as
/// the data identity.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Data {
    pub contract: ContractId,
    pub phenomena: Phenomena,
    pub size: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocator_never_repeats() {
        let mut ids = IdAllocator::default();
        let a = ids.system();
        let b = ids.system();
        assert_ne!(a, b);
        assert_eq!(ids.contract(), ContractId(1));
        assert_eq!(ids.contract(), ContractId(2));
    }

    #[test]
    fn phenomena_parses_case_insensitively() {
        assert_eq!("VIS".parse::<Phenomena>(), Ok(Phenomena::Vis));
        assert_eq!("sar".parse::<Phenomena>(), Ok(Phenomena::Sar));
        assert!("ir".parse::<Phenomena>().is_err());
    }
}
