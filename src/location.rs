// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Federated Satellite Systems Simulation ("FSS") - Location Model

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{LinkKind, LocationId};

/// Orbital altitude band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Altitude {
    Leo,
    Meo,
    Geo,
}

impl Altitude {
    pub const ALL: [Altitude; 3] = [Altitude::Leo, Altitude::Meo, Altitude::Geo];

    /// Sectors advanced per turn.
    pub fn sectors_per_turn(self) -> u32 {
        match self {
            Self::Leo => 2,
            Self::Meo => 1,
            Self::Geo => 0,
        }
    }

    /// Fraction of a spacecraft's base cost charged to launch into this band.
    pub fn commission_factor(self) -> Decimal {
        match self {
            Self::Leo => Decimal::ZERO,
            Self::Meo => dec!(0.5),
            Self::Geo => Decimal::ONE,
        }
    }

    /// Only low and medium orbits are close enough to sense.
    pub fn can_sense(self) -> bool {
        !matches!(self, Self::Geo)
    }

    fn prefix(self) -> &'static str {
        match self {
            Self::Leo => "LEO",
            Self::Meo => "MEO",
            Self::Geo => "GEO",
        }
    }
}

/// Where a location sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LocationKind {
    Surface,
    Orbit(Altitude),
}

/// One sector-indexed position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub id: LocationId,
    pub name: String,
    /// 1-based sector index
    pub sector: u32,
    pub kind: LocationKind,
}

impl Location {
    pub fn is_surface(&self) -> bool {
        matches!(self.kind, LocationKind::Surface)
    }

    pub fn is_orbit(&self) -> bool {
        !self.is_surface()
    }

    pub fn altitude(&self) -> Option<Altitude> {
        match self.kind {
            LocationKind::Orbit(a) => Some(a),
            LocationKind::Surface => None,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LocationError {
    #[error("unknown location `{0}`")]
    UnknownName(String),
    #[error("unknown location id {0}")]
    UnknownId(LocationId),
}

// ─── Registry ───────────────────────────────────────────────────────────────

/// All locations of one context, indexed by [`LocationId`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Locations {
    num_sectors: u32,
    all: Vec<Location>,
}

impl Locations {
    /// Build `SUR{n}` plus one orbit per altitude per sector, n = 1..=num_sectors.
    pub fn standard(num_sectors: u32, altitudes: &[Altitude]) -> Self {
        let mut all = Vec::new();
        let mut push = |name: String, sector: u32, kind: LocationKind| {
            let id = LocationId(all.len() as u32);
            all.push(Location { id, name, sector, kind });
        };
        for sector in 1..=num_sectors {
            push(format!("SUR{sector}"), sector, LocationKind::Surface);
            for &alt in altitudes {
                push(format!("{}{sector}", alt.prefix()), sector, LocationKind::Orbit(alt));
            }
        }
        Self { num_sectors, all }
    }

    pub fn num_sectors(&self) -> u32 {
        self.num_sectors
    }

    pub fn get(&self, id: LocationId) -> Result<&Location, LocationError> {
        self.all.get(id.0 as usize).ok_or(LocationError::UnknownId(id))
    }

    pub fn by_name(&self, name: &str) -> Result<&Location, LocationError> {
        self.all
            .iter()
            .find(|l| l.name == name)
            .ok_or_else(|| LocationError::UnknownName(name.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Location> {
        self.all.iter()
    }

    /// Position after `turns` turns. Surfaces never move.
    pub fn propagate(&self, id: LocationId, turns: u32) -> Result<LocationId, LocationError> {
        let here = self.get(id)?;
        let altitude = match here.kind {
            LocationKind::Surface => return Ok(id),
            LocationKind::Orbit(a) => a,
        };
        let steps = altitude.sectors_per_turn() * turns;
        let sector = (here.sector + steps - 1) % self.num_sectors + 1;
        self.all
            .iter()
            .find(|l| l.kind == here.kind && l.sector == sector)
            .map(|l| l.id)
            .ok_or(LocationError::UnknownId(id))
    }

    /// Modular distance between two sectors.
    pub fn sector_distance(&self, a: u32, b: u32) -> u32 {
        let d = a.abs_diff(b) % self.num_sectors;
        d.min(self.num_sectors - d)
    }

    /// Whether a link of `kind` can carry data from `from` to `to`.
    pub fn visible(&self, kind: LinkKind, from: &Location, to: &Location) -> bool {
        match kind {
            LinkKind::SpaceGround => {
                from.is_orbit() && to.is_surface() && from.sector == to.sector
            }
            LinkKind::InterSatellite => {
                from.is_orbit()
                    && to.is_orbit()
                    && self.sector_distance(from.sector, to.sector) <= 1
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> Locations {
        Locations::standard(6, &Altitude::ALL)
    }

    fn id(locs: &Locations, name: &str) -> LocationId {
        locs.by_name(name).expect("test: location exists").id
    }

    #[test]
    fn standard_layout() {
        let locs = registry();
        assert_eq!(locs.iter().count(), 24);
        assert!(locs.by_name("SUR6").expect("test: SUR6").is_surface());
        assert_eq!(
            locs.by_name("MEO3").expect("test: MEO3").altitude(),
            Some(Altitude::Meo)
        );
        assert!(matches!(locs.by_name("HEO1"), Err(LocationError::UnknownName(_))));
    }

    #[test]
    fn leo_wraps_two_sectors_per_turn() {
        let locs = registry();
        let leo5 = id(&locs, "LEO5");
        assert_eq!(locs.propagate(leo5, 1).expect("test: propagate"), id(&locs, "LEO1"));
        assert_eq!(locs.propagate(leo5, 3).expect("test: propagate"), id(&locs, "LEO5"));
    }

    #[test]
    fn geo_and_surface_are_fixed() {
        let locs = registry();
        let geo2 = id(&locs, "GEO2");
        let sur4 = id(&locs, "SUR4");
        assert_eq!(locs.propagate(geo2, 7).expect("test: propagate"), geo2);
        assert_eq!(locs.propagate(sur4, 7).expect("test: propagate"), sur4);
    }

    #[test]
    fn sector_distance_is_modular() {
        let locs = registry();
        assert_eq!(locs.sector_distance(1, 6), 1);
        assert_eq!(locs.sector_distance(2, 5), 3);
        assert_eq!(locs.sector_distance(3, 3), 0);
    }

    #[test]
    fn visibility_rules() {
        let locs = registry();
        let get = |n: &str| locs.by_name(n).expect("test: location").clone();
        assert!(locs.visible(LinkKind::SpaceGround, &get("LEO1"), &get("SUR1")));
        assert!(!locs.visible(LinkKind::SpaceGround, &get("LEO1"), &get("SUR2")));
        assert!(!locs.visible(LinkKind::SpaceGround, &get("SUR1"), &get("SUR1")));
        assert!(locs.visible(LinkKind::InterSatellite, &get("LEO6"), &get("MEO1")));
        assert!(!locs.visible(LinkKind::InterSatellite, &get("LEO1"), &get("GEO3")));
        assert!(!locs.visible(LinkKind::InterSatellite, &get("LEO1"), &get("SUR1")));
    }
}
