// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Federated Satellite Systems Simulation ("FSS") - Contract Lifecycle

use serde::{Deserialize, Serialize};

use crate::event::Demand;
use crate::ledger::Cash;
use crate::location::Location;
use crate::types::{ContractId, Phenomena};

/// A federate's claim on one demand, tracked until resolved or defaulted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    pub id: ContractId,
    pub demand: Demand,
    elapsed: u32,
    next_elapsed: u32,
}

impl Contract {
    pub fn new(id: ContractId, demand: Demand) -> Self {
        Self { id, demand, elapsed: 0, next_elapsed: 0 }
    }

    /// Turns since the demand was claimed.
    pub fn elapsed(&self) -> u32 {
        self.elapsed
    }

    /// Payment if delivered now.
    pub fn value(&self) -> Cash {
        self.demand.value_at(self.elapsed)
    }

    /// Payment if delivered `turns` from now.
    pub fn value_in(&self, turns: u32) -> Cash {
        self.demand.value_at(self.elapsed + turns)
    }

    pub fn default_value(&self) -> Cash {
        self.demand.default_value()
    }

    pub fn phenomena(&self) -> Phenomena {
        self.demand.phenomena()
    }

    pub fn size(&self) -> u32 {
        self.demand.size()
    }

    /// Past the last deadline of the schedule.
    pub fn is_expired(&self) -> bool {
        self.elapsed > self.demand.spec.last_deadline()
    }

    /// Data lost, or too late to earn anything but the default.
    pub fn is_defaulted(&self, data_location: Option<&Location>) -> bool {
        data_location.is_none() || self.is_expired()
    }

    /// Data has reached a ground system.
    pub fn is_completed(&self, data_location: Option<&Location>) -> bool {
        data_location.is_some_and(Location::is_surface)
    }

    pub fn init(&mut self) {
        self.elapsed = 0;
        self.next_elapsed = 0;
    }

    pub fn tick(&mut self) {
        self.next_elapsed = self.elapsed + 1;
    }

    pub fn tock(&mut self) {
        self.elapsed = self.next_elapsed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::DemandSpec;
    use crate::location::{Altitude, Locations};
    use crate::types::EventId;

    fn contract() -> Contract {
        Contract::new(
            ContractId(1),
            Demand {
                id: EventId(1),
                sector: 1,
                spec: DemandSpec {
                    name: "SAR2".into(),
                    phenomena: Phenomena::Sar,
                    size: 1,
                    value_schedule: vec![(2, Cash::from_units(450)), (5, Cash::from_units(350))],
                    default_value: Cash::from_units(-100),
                },
            },
        )
    }

    fn advance(c: &mut Contract, turns: u32) {
        for _ in 0..turns {
            c.tick();
            c.tock();
        }
    }

    #[test]
    fn tick_does_not_commit() {
        let mut c = contract();
        c.tick();
        assert_eq!(c.elapsed(), 0);
        c.tock();
        assert_eq!(c.elapsed(), 1);
    }

    #[test]
    fn value_decays_along_schedule() {
        let mut c = contract();
        assert_eq!(c.value(), Cash::from_units(450));
        assert_eq!(c.value_in(3), Cash::from_units(350));
        advance(&mut c, 5);
        assert_eq!(c.value(), Cash::from_units(350));
        assert!(!c.is_expired());
        advance(&mut c, 1);
        assert_eq!(c.value(), Cash::from_units(-100));
        assert!(c.is_expired());
    }

    #[test]
    fn default_and_completion_follow_data() {
        let locs = Locations::standard(6, &Altitude::ALL);
        let leo = locs.by_name("LEO1").expect("test: LEO1");
        let sur = locs.by_name("SUR1").expect("test: SUR1");
        let c = contract();
        assert!(c.is_defaulted(None));
        assert!(!c.is_defaulted(Some(leo)));
        assert!(!c.is_completed(Some(leo)));
        assert!(c.is_completed(Some(sur)));
    }
}
