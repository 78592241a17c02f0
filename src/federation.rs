// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Federated Satellite Systems Simulation ("FSS") - Federation

use serde::{Deserialize, Serialize};

use crate::federate::Federate;
use crate::location::Locations;
use crate::system::System;
use crate::types::{Data, FederateId, FederationId, SystemId};

/// Federates that can see, and pay to use, each other's commissioned systems.
#[derive(Debug, Serialize, Deserialize)]
pub struct Federation {
    pub id: FederationId,
    pub name: String,
    /// Stored order is the planning order of federation-wide schedulers.
    pub federates: Vec<Federate>,
}

impl Federation {
    pub fn new(id: FederationId, name: impl Into<String>) -> Self {
        Self { id, name: name.into(), federates: Vec::new() }
    }

    pub fn join(&mut self, federate: Federate) {
        self.federates.push(federate);
    }

    pub fn federate(&self, id: FederateId) -> Option<&Federate> {
        self.federates.iter().find(|f| f.id == id)
    }

    pub fn federate_ids(&self) -> Vec<FederateId> {
        self.federates.iter().map(|f| f.id).collect()
    }

    /// Every system with its owner.
    pub fn systems(&self) -> impl Iterator<Item = (FederateId, &System)> {
        self.federates
            .iter()
            .flat_map(|f| f.systems.iter().map(move |s| (f.id, s)))
    }

    pub fn owner_of(&self, system: SystemId) -> Option<FederateId> {
        self.federates
            .iter()
            .find(|f| f.owns_system(system))
            .map(|f| f.id)
    }

    pub fn init(&mut self) {
        for federate in &mut self.federates {
            federate.init();
        }
    }

    pub fn tick(&mut self, locations: &Locations) {
        for federate in &mut self.federates {
            federate.tick(locations);
        }
    }

    /// Commit every member. Returns data flushed from transit buffers.
    pub fn tock(&mut self) -> Vec<Data> {
        self.federates.iter_mut().flat_map(Federate::tock).collect()
    }
}

/// Two distinct systems borrowed mutably at once, wherever they are owned.
pub fn systems_pair_mut(
    federations: &mut [Federation],
    a: SystemId,
    b: SystemId,
) -> Option<(&mut System, &mut System)> {
    if a == b {
        return None;
    }
    let mut first = None;
    let mut second = None;
    for system in federations
        .iter_mut()
        .flat_map(|f| f.federates.iter_mut())
        .flat_map(|f| f.systems.iter_mut())
    {
        if system.id == a {
            first = Some(system);
        } else if system.id == b {
            second = Some(system);
        }
    }
    Some((first?, second?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::Cash;
    use crate::system::SystemKind;

    fn federation() -> Federation {
        let mut fss = Federation::new(FederationId(0), "FSS");
        for (fid, sid) in [(1, 10), (2, 20)] {
            let mut fed = Federate::new(FederateId(fid), format!("F{fid}"), Cash::from_units(1000));
            fed.systems.push(System::new(
                SystemId(sid),
                "GroundSta",
                SystemKind::GroundStation,
                Cash::from_units(500),
                4,
                Vec::new(),
            ));
            fss.join(fed);
        }
        fss
    }

    #[test]
    fn ownership_lookup() {
        let fss = federation();
        assert_eq!(fss.owner_of(SystemId(20)), Some(FederateId(2)));
        assert_eq!(fss.owner_of(SystemId(30)), None);
        assert_eq!(fss.systems().count(), 2);
        assert_eq!(fss.federate_ids(), vec![FederateId(1), FederateId(2)]);
    }

    #[test]
    fn pair_spans_federates() {
        let mut feds = vec![federation()];
        let (a, b) = systems_pair_mut(&mut feds, SystemId(20), SystemId(10)).expect("test: both exist");
        assert_eq!((a.id, b.id), (SystemId(20), SystemId(10)));
        assert!(systems_pair_mut(&mut feds, SystemId(10), SystemId(10)).is_none());
        assert!(systems_pair_mut(&mut feds, SystemId(10), SystemId(99)).is_none());
    }
}
