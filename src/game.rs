// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Federated Satellite Systems Simulation ("FSS") - Game Catalog & Design Strings

use serde::{Deserialize, Serialize};

use crate::context::Context;
use crate::event::{DemandSpec, DisturbanceSpec, EventSpec};
use crate::federate::FederateError;
use crate::ledger::Cash;
use crate::location::{Altitude, LocationError, Locations};
use crate::subsystem::{Sensor, Storage, Subsystem, SubsystemKind, Transceiver};
use crate::system::{System, SystemKind};
use crate::types::{FederateId, IdAllocator, LinkKind, Phenomena, Protocol, SystemId};

// ─── Errors ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScenarioError {
    #[error("malformed design `{0}`: expected [<federate>.]<Type>@<Location>[,<subsystem>...]")]
    MalformedDesign(String),

    #[error("unknown system type `{0}`")]
    UnknownSystemType(String),

    #[error("unknown subsystem type `{0}`")]
    UnknownSubsystemType(String),

    #[error("design names federate {index}, scenario has {count}")]
    UnknownFederate { index: usize, count: usize },

    #[error(transparent)]
    Location(#[from] LocationError),

    #[error(transparent)]
    Federate(#[from] FederateError),
}

// ─── Catalog entries ────────────────────────────────────────────────────────

/// Bus template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemType {
    pub name: String,
    pub kind: SystemKind,
    pub cost: Cash,
    pub max_size: u32,
}

/// Mountable component template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubsystemType {
    pub name: String,
    pub cost: Cash,
    pub size: u32,
    pub kind: SubsystemKind,
}

/// Parsed `[<federate>.]<Type>@<Location>,<subsystem>,...` string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesignSpec {
    /// 1-based federate index; defaults to 1
    pub federate: usize,
    pub system: String,
    pub location: String,
    pub subsystems: Vec<String>,
}

/// Everything needed to set up a context: geometry, event deck and
/// the system/subsystem catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Game {
    pub num_sectors: u32,
    pub altitudes: Vec<Altitude>,
    /// `(copies, template)` in definition order
    pub events: Vec<(u32, EventSpec)>,
    pub system_types: Vec<SystemType>,
    pub subsystem_types: Vec<SubsystemType>,
}

impl Default for Game {
    fn default() -> Self {
        Self::standard()
    }
}

fn demand(name: &str, phenomena: Phenomena, schedule: [(u32, i64); 2], default_value: i64) -> EventSpec {
    EventSpec::Demand(DemandSpec {
        name: name.into(),
        phenomena,
        size: 1,
        value_schedule: schedule.iter().map(|&(d, v)| (d, Cash::from_units(v))).collect(),
        default_value: Cash::from_units(default_value),
    })
}

fn bus(name: &str, kind: SystemKind, cost: i64, max_size: u32) -> SystemType {
    SystemType { name: name.into(), kind, cost: Cash::from_units(cost), max_size }
}

fn part(name: &str, cost: i64, kind: SubsystemKind) -> SubsystemType {
    SubsystemType { name: name.into(), cost: Cash::from_units(cost), size: 1, kind }
}

fn link(link: LinkKind, protocol: &str) -> SubsystemKind {
    SubsystemKind::Transceiver(Transceiver::new(link, Protocol::from(protocol), 1, 1))
}

impl Game {
    /// Six sectors, three altitudes, 81 demands and 5 debris fields.
    pub fn standard() -> Self {
        use Phenomena::{Sar, Vis};
        Self {
            num_sectors: 6,
            altitudes: Altitude::ALL.to_vec(),
            events: vec![
                (8, demand("SAR1", Sar, [(1, 500), (4, 400)], -50)),
                (12, demand("SAR2", Sar, [(2, 450), (5, 350)], -100)),
                (23, demand("SAR3", Sar, [(3, 400), (6, 300)], -150)),
                (8, demand("VIS1", Vis, [(1, 600), (4, 500)], -50)),
                (17, demand("VIS2", Vis, [(2, 500), (5, 400)], -100)),
                (8, demand("VIS3", Vis, [(3, 450), (6, 350)], -150)),
                (
                    5,
                    EventSpec::Disturbance(DisturbanceSpec {
                        name: "Debris".into(),
                        hit_chance: 1.0 / 6.0,
                        max_hits: 1,
                    }),
                ),
            ],
            system_types: vec![
                bus("SmallSat", SystemKind::Spacecraft, 200, 2),
                bus("MediumSat", SystemKind::Spacecraft, 300, 4),
                bus("LargeSat", SystemKind::Spacecraft, 400, 6),
                bus("GroundSta", SystemKind::GroundStation, 500, 4),
            ],
            subsystem_types: vec![
                part("pSGL", 50, link(LinkKind::SpaceGround, "prop")),
                part("oSGL", 100, link(LinkKind::SpaceGround, "open")),
                part("pISL", 50, link(LinkKind::InterSatellite, "prop")),
                part("oISL", 100, link(LinkKind::InterSatellite, "open")),
                part("SAR", 200, SubsystemKind::Sensor(Sensor::new(Sar, 1, 1))),
                part("VIS", 250, SubsystemKind::Sensor(Sensor::new(Vis, 1, 1))),
                part("DAT", 50, SubsystemKind::Storage(Storage { capacity: 1 })),
                part("DEF", 100, SubsystemKind::Defense),
            ],
        }
    }

    pub fn locations(&self) -> Locations {
        Locations::standard(self.num_sectors, &self.altitudes)
    }

    /// Deck with every copy expanded, in definition order.
    pub fn deck(&self) -> Vec<EventSpec> {
        self.events
            .iter()
            .flat_map(|(n, spec)| std::iter::repeat(spec).take(*n as usize).cloned())
            .collect()
    }

    /// Fresh context for one run. Call [`Context::init`] after adding federates.
    pub fn context(&self, seed: u64) -> Context {
        Context::new(self.locations(), self.deck(), seed)
    }

    pub fn demand_spec(&self, name: &str) -> Option<DemandSpec> {
        self.events.iter().find_map(|(_, spec)| match spec {
            EventSpec::Demand(d) if d.name == name => Some(d.clone()),
            _ => None,
        })
    }

    pub fn system_type(&self, name: &str) -> Option<&SystemType> {
        self.system_types.iter().find(|t| t.name == name)
    }

    pub fn subsystem_type(&self, name: &str) -> Option<&SubsystemType> {
        self.subsystem_types.iter().find(|t| t.name == name)
    }

    // ─── Design strings ─────────────────────────────────────────────────────

    /// Parse `[<federate>.]<Type>@<Location>[,<subsystem>...]`.
    ///
    /// Type names are checked against the catalog; the location name is
    /// resolved later against a context.
    pub fn parse_design(&self, text: &str) -> Result<DesignSpec, ScenarioError> {
        let malformed = || ScenarioError::MalformedDesign(text.to_string());
        let mut parts = text.trim().split(',').map(str::trim);
        let head = parts.next().filter(|h| !h.is_empty()).ok_or_else(malformed)?;
        let (placement, location) = head.split_once('@').ok_or_else(malformed)?;
        let (federate, system) = match placement.split_once('.') {
            Some((index, system)) => (index.parse::<usize>().map_err(|_| malformed())?, system),
            None => (1, placement),
        };
        if federate == 0 || system.is_empty() || location.is_empty() {
            return Err(malformed());
        }
        if self.system_type(system).is_none() {
            return Err(ScenarioError::UnknownSystemType(system.to_string()));
        }
        let subsystems = parts
            .filter(|s| !s.is_empty())
            .map(|s| match self.subsystem_type(s) {
                Some(_) => Ok(s.to_string()),
                None => Err(ScenarioError::UnknownSubsystemType(s.to_string())),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(DesignSpec {
            federate,
            system: system.to_string(),
            location: location.to_string(),
            subsystems,
        })
    }

    /// Build an uncommissioned system from a parsed design.
    pub fn instantiate(&self, design: &DesignSpec, ids: &mut IdAllocator) -> Result<System, ScenarioError> {
        let bus = self
            .system_type(&design.system)
            .ok_or_else(|| ScenarioError::UnknownSystemType(design.system.clone()))?;
        let subsystems = design
            .subsystems
            .iter()
            .map(|name| {
                self.subsystem_type(name)
                    .map(|t| Subsystem::new(t.name.clone(), t.cost, t.size, t.kind.clone()))
                    .ok_or_else(|| ScenarioError::UnknownSubsystemType(name.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(System::new(ids.system(), bus.name.clone(), bus.kind, bus.cost, bus.max_size, subsystems))
    }

    /// Design plus commission cost of a design at its named location.
    pub fn outlay(&self, design: &DesignSpec, locations: &Locations) -> Result<Cash, ScenarioError> {
        let system = self.instantiate(design, &mut IdAllocator::default())?;
        let location = locations.by_name(&design.location)?;
        Ok(system.design_cost() + system.commission_cost(location))
    }

    /// Buy a design for `federate` and place it at its named location.
    pub fn deploy(
        &self,
        ctx: &mut Context,
        federate: FederateId,
        design: &DesignSpec,
    ) -> Result<SystemId, ScenarioError> {
        let location = ctx.locations.by_name(&design.location)?.id;
        let system = self.instantiate(design, &mut ctx.ids)?;
        let id = ctx
            .federate_mut(federate)
            .ok_or(FederateError::UnknownFederate(federate))?
            .design(system)?;
        ctx.commission(federate, id, location)?;
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_deck_counts() {
        let game = Game::standard();
        let deck = game.deck();
        assert_eq!(deck.len(), 81);
        let debris = deck
            .iter()
            .filter(|e| matches!(e, EventSpec::Disturbance(_)))
            .count();
        assert_eq!(debris, 5);
        assert_eq!(game.locations().iter().count(), 24);
    }

    #[test]
    fn parse_full_design() {
        let game = Game::default();
        let d = game.parse_design("2.MediumSat@MEO3,SAR,DAT,pISL,oSGL").expect("test: parse");
        assert_eq!(d.federate, 2);
        assert_eq!(d.system, "MediumSat");
        assert_eq!(d.location, "MEO3");
        assert_eq!(d.subsystems, vec!["SAR", "DAT", "pISL", "oSGL"]);
    }

    #[test]
    fn federate_index_defaults_to_one() {
        let d = Game::default().parse_design("GroundSta@SUR1,pSGL").expect("test: parse");
        assert_eq!(d.federate, 1);
    }

    #[test]
    fn parse_rejects_bad_input() {
        let game = Game::default();
        assert!(matches!(game.parse_design(""), Err(ScenarioError::MalformedDesign(_))));
        assert!(matches!(game.parse_design("SmallSat"), Err(ScenarioError::MalformedDesign(_))));
        assert!(matches!(game.parse_design("0.SmallSat@LEO1"), Err(ScenarioError::MalformedDesign(_))));
        assert!(matches!(game.parse_design("x.SmallSat@LEO1"), Err(ScenarioError::MalformedDesign(_))));
        assert!(matches!(
            game.parse_design("HugeSat@LEO1,VIS"),
            Err(ScenarioError::UnknownSystemType(_))
        ));
        let err = game.parse_design("SmallSat@LEO1,IR");
        assert!(
            matches!(err, Err(ScenarioError::UnknownSubsystemType(ref s)) if s == "IR"),
            "expected UnknownSubsystemType, got {err:?}"
        );
    }

    #[test]
    fn instantiate_builds_priced_system() {
        let game = Game::default();
        let mut ids = IdAllocator::default();
        let d = game.parse_design("SmallSat@LEO1,VIS,pSGL").expect("test: parse");
        let sys = game.instantiate(&d, &mut ids).expect("test: instantiate");
        assert_eq!(sys.design_cost(), Cash::from_units(500));
        assert_eq!(sys.subsystems.len(), 2);
        assert!(sys.is_operational());
        assert!(!sys.is_commissioned());
    }

    #[test]
    fn outlay_includes_launch() {
        let game = Game::default();
        let locs = game.locations();
        let d = game.parse_design("SmallSat@MEO1,VIS,pSGL").expect("test: parse");
        assert_eq!(game.outlay(&d, &locs).expect("test: outlay"), Cash::from_units(600));
        let d = game.parse_design("SmallSat@MARS1,VIS,pSGL").expect("test: parse");
        assert!(matches!(game.outlay(&d, &locs), Err(ScenarioError::Location(_))));
    }

    #[test]
    fn deploy_designs_and_commissions() {
        let game = Game::default();
        let mut ctx = game.context(0);
        let fss = ctx.add_federation("FSS");
        let fed = ctx.join(fss, "F1", Cash::from_units(1200)).expect("test: join");
        ctx.init();
        let d = game.parse_design("SmallSat@LEO1,VIS,pSGL").expect("test: parse");
        let id = game.deploy(&mut ctx, fed, &d).expect("test: deploy");
        assert!(ctx.system(id).is_some_and(System::is_commissioned));
        assert_eq!(ctx.federate(fed).map(|f| f.cash), Some(Cash::from_units(700)));
    }
}
