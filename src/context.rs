// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Federated Satellite Systems Simulation ("FSS") - Simulation Context

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, warn};

use crate::event::{Event, EventCalendar, EventSpec};
use crate::federate::{Federate, FederateError};
use crate::federation::Federation;
use crate::ledger::Cash;
use crate::location::{Location, Locations};
use crate::system::System;
use crate::types::{ContractId, FederateId, FederationId, IdAllocator, SystemId};

/// Per-run state: locations, event calendar, federations and RNG streams.
///
/// The shuffle stream only orders the calendar; the roll stream only decides
/// disturbance hits. Both derive from the run seed at [`init`](Self::init).
#[derive(Debug)]
pub struct Context {
    pub locations: Locations,
    pub calendar: EventCalendar,
    pub federations: Vec<Federation>,
    pub ids: IdAllocator,
    seed: u64,
    time: u32,
    max_time: u32,
    shuffle_rng: ChaCha8Rng,
    roll_rng: ChaCha8Rng,
}

impl Context {
    pub fn new(locations: Locations, deck: Vec<EventSpec>, seed: u64) -> Self {
        Self {
            locations,
            calendar: EventCalendar::new(deck),
            federations: Vec::new(),
            ids: IdAllocator::default(),
            seed,
            time: 0,
            max_time: 0,
            shuffle_rng: ChaCha8Rng::seed_from_u64(seed),
            roll_rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Current turn, starting at zero.
    pub fn time(&self) -> u32 {
        self.time
    }

    /// Turn count of the run; planners never look past it.
    pub fn max_time(&self) -> u32 {
        self.max_time
    }

    pub fn set_max_time(&mut self, max_time: u32) {
        self.max_time = max_time;
    }

    pub fn add_federation(&mut self, name: impl Into<String>) -> FederationId {
        let id = FederationId(self.federations.len() as u32);
        self.federations.push(Federation::new(id, name));
        id
    }

    /// Create a federate in `federation` with `initial_cash`.
    pub fn join(
        &mut self,
        federation: FederationId,
        name: impl Into<String>,
        initial_cash: Cash,
    ) -> Option<FederateId> {
        let id = self.ids.federate();
        let fss = self.federations.get_mut(federation.0 as usize)?;
        fss.join(Federate::new(id, name, initial_cash));
        Some(id)
    }

    /// Liquidate a federate and remove it from its federation.
    pub fn quit(&mut self, federate: FederateId) -> Result<Federate, FederateError> {
        self.liquidate(federate)?;
        let (f, g) = self
            .federate_index(federate)
            .ok_or(FederateError::UnknownFederate(federate))?;
        Ok(self.federations[f].federates.remove(g))
    }

    // ─── Lookups ────────────────────────────────────────────────────────────

    pub fn federation(&self, id: FederationId) -> Option<&Federation> {
        self.federations.get(id.0 as usize)
    }

    pub fn federates(&self) -> impl Iterator<Item = &Federate> {
        self.federations.iter().flat_map(|f| f.federates.iter())
    }

    pub fn federate_ids(&self) -> Vec<FederateId> {
        self.federates().map(|f| f.id).collect()
    }

    pub(crate) fn federate_index(&self, id: FederateId) -> Option<(usize, usize)> {
        self.federations.iter().enumerate().find_map(|(i, fss)| {
            fss.federates.iter().position(|f| f.id == id).map(|j| (i, j))
        })
    }

    pub fn federate(&self, id: FederateId) -> Option<&Federate> {
        self.federates().find(|f| f.id == id)
    }

    pub fn federate_mut(&mut self, id: FederateId) -> Option<&mut Federate> {
        self.federations
            .iter_mut()
            .flat_map(|f| f.federates.iter_mut())
            .find(|f| f.id == id)
    }

    pub fn federation_of(&self, federate: FederateId) -> Option<FederationId> {
        self.federate_index(federate).map(|(i, _)| self.federations[i].id)
    }

    /// Every system with its owner.
    pub fn systems(&self) -> impl Iterator<Item = (FederateId, &System)> {
        self.federations.iter().flat_map(Federation::systems)
    }

    pub fn system(&self, id: SystemId) -> Option<&System> {
        self.systems().map(|(_, s)| s).find(|s| s.id == id)
    }

    pub fn system_mut(&mut self, id: SystemId) -> Option<&mut System> {
        self.federations
            .iter_mut()
            .flat_map(|f| f.federates.iter_mut())
            .flat_map(|f| f.systems.iter_mut())
            .find(|s| s.id == id)
    }

    pub fn owner_of(&self, system: SystemId) -> Option<FederateId> {
        self.systems().find(|(_, s)| s.id == system).map(|(f, _)| f)
    }

    pub fn system_location(&self, system: SystemId) -> Option<&Location> {
        let id = self.system(system)?.location()?;
        self.locations.get(id).ok()
    }

    /// Federate holding `contract`.
    pub fn contract_owner(&self, contract: ContractId) -> Option<FederateId> {
        self.federates()
            .find(|f| f.contract(contract).is_some())
            .map(|f| f.id)
    }

    /// System whose inventory holds data for `contract`.
    pub fn locate_data(&self, contract: ContractId) -> Option<SystemId> {
        self.systems()
            .find(|(_, s)| s.holds(contract))
            .map(|(_, s)| s.id)
    }

    pub fn data_location(&self, contract: ContractId) -> Option<&Location> {
        self.system_location(self.locate_data(contract)?)
    }

    // ─── Entity protocol ────────────────────────────────────────────────────

    /// Reset RNG streams, deck and members. The first turn deals no events.
    pub fn init(&mut self) {
        let mut master = ChaCha8Rng::seed_from_u64(self.seed);
        self.shuffle_rng = ChaCha8Rng::seed_from_u64(master.gen());
        self.roll_rng = ChaCha8Rng::seed_from_u64(master.gen());
        self.calendar.init(&mut self.shuffle_rng);
        self.time = 0;
        for fss in &mut self.federations {
            fss.init();
        }
        info!(seed = self.seed, federates = self.federates().count(), "context initialized");
    }

    pub fn tick(&mut self) {
        let Context { locations, federations, .. } = self;
        for fss in federations.iter_mut() {
            fss.tick(locations);
        }
    }

    /// Commit the turn: members, defaults, new events, disturbances.
    pub fn tock(&mut self) -> Result<(), FederateError> {
        for fss in &mut self.federations {
            for lost in fss.tock() {
                debug!(contract = %lost.contract, "data dropped from transit buffer");
            }
        }
        self.auto_default_all()?;

        let num_sectors = self.locations.num_sectors();
        let Context { calendar, ids, shuffle_rng, .. } = self;
        calendar.deal(num_sectors, ids, shuffle_rng);
        for event in self.calendar.current() {
            if let Event::Demand(d) = event {
                debug!(sector = d.sector, demand = %d.spec.name, "dealt");
            }
        }

        self.resolve_disturbances()?;
        self.time += 1;
        Ok(())
    }

    fn auto_default_all(&mut self) -> Result<(), FederateError> {
        for federate in self.federate_ids() {
            self.auto_default(federate)?;
        }
        Ok(())
    }

    /// Roll for subsystem hits on unprotected spacecraft under a disturbance.
    fn resolve_disturbances(&mut self) -> Result<(), FederateError> {
        let disturbances: Vec<_> = self
            .calendar
            .current()
            .iter()
            .filter_map(|e| match e {
                Event::Disturbance(d) => Some(d.clone()),
                Event::Demand(_) => None,
            })
            .collect();
        if disturbances.is_empty() {
            return Ok(());
        }

        let Context { locations, federations, roll_rng, .. } = self;
        for disturbance in &disturbances {
            let spacecraft = federations
                .iter_mut()
                .flat_map(|f| f.federates.iter_mut())
                .flat_map(|f| f.systems.iter_mut())
                .filter(|s| s.is_spacecraft())
                .filter(|s| {
                    s.location()
                        .and_then(|id| locations.get(id).ok())
                        .is_some_and(|l| l.sector == disturbance.sector)
                });
            for sc in spacecraft {
                if sc.has_defense() {
                    debug!(system = %sc.id, event = %disturbance.spec.name, "protected");
                    continue;
                }
                let mut order: Vec<usize> = (0..sc.subsystems.len()).collect();
                order.shuffle(&mut *roll_rng);
                let mut hits = Vec::new();
                for idx in order {
                    if (hits.len() as u32) < disturbance.spec.max_hits
                        && roll_rng.gen::<f64>() < disturbance.spec.hit_chance
                    {
                        hits.push(idx);
                    }
                }
                hits.sort_unstable_by(|a, b| b.cmp(a));
                for idx in hits {
                    let destroyed = sc.subsystems.remove(idx);
                    warn!(
                        system = %sc.id,
                        subsystem = %destroyed.name,
                        lost = destroyed.contents().len(),
                        event = %disturbance.spec.name,
                        "subsystem destroyed"
                    );
                }
            }
        }
        self.auto_default_all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::DisturbanceSpec;
    use crate::game::Game;
    use crate::location::Altitude;

    fn debris_context(seed: u64) -> (Context, FederateId, SystemId, SystemId) {
        let deck = vec![EventSpec::Disturbance(DisturbanceSpec {
            name: "Debris".into(),
            hit_chance: 1.0,
            max_hits: 1,
        })];
        let mut ctx = Context::new(Locations::standard(1, &Altitude::ALL), deck, seed);
        let fss = ctx.add_federation("FSS");
        let fed = ctx.join(fss, "F1", Cash::from_units(5000)).expect("test: join");
        ctx.init();

        let game = Game::default();
        let mut ids = Vec::new();
        for spec in ["SmallSat@LEO1,VIS,pSGL", "SmallSat@MEO1,DEF,pISL"] {
            let design = game.parse_design(spec).expect("test: parse");
            let sys = game.instantiate(&design, &mut ctx.ids).expect("test: instantiate");
            let id = ctx.federate_mut(fed).expect("test").design(sys).expect("test: design");
            let loc = ctx.locations.by_name(&design.location).expect("test").id;
            ctx.commission(fed, id, loc).expect("test: commission");
            ids.push(id);
        }
        (ctx, fed, ids[0], ids[1])
    }

    #[test]
    fn same_seed_same_stream() {
        let game = Game::default();
        let mut a = game.context(11);
        let mut b = game.context(11);
        a.init();
        b.init();
        for _ in 0..20 {
            a.tock().expect("test: tock");
            b.tock().expect("test: tock");
            assert_eq!(a.calendar.current(), b.calendar.current());
        }
    }

    #[test]
    fn first_turn_is_quiet_then_one_event_per_sector() {
        let game = Game::default();
        let mut ctx = game.context(3);
        ctx.init();
        assert!(ctx.calendar.current().is_empty());
        ctx.tick();
        ctx.tock().expect("test: tock");
        assert_eq!(ctx.calendar.current().len(), 6);
        assert_eq!(ctx.time(), 1);
    }

    #[test]
    fn defense_protects_and_hits_land_otherwise() {
        let (mut ctx, fed, exposed, shielded) = debris_context(5);
        ctx.tick();
        ctx.tock().expect("test: tock");
        let f = ctx.federate(fed).expect("test");
        let exposed_left = f.system(exposed).map(|s| s.subsystems.len());
        let shielded_left = f.system(shielded).map(|s| s.subsystems.len());
        assert_eq!(exposed_left, Some(1));
        assert_eq!(shielded_left, Some(2));
    }

    #[test]
    fn tock_moves_spacecraft() {
        let (mut ctx, _fed, exposed, shielded) = debris_context(1);
        let before = ctx.system(shielded).and_then(System::location);
        ctx.tick();
        ctx.tock().expect("test: tock");
        // one sector: every orbit maps onto itself
        assert_eq!(ctx.system(shielded).and_then(System::location), before);
        assert!(ctx.system(exposed).is_some());
    }
}
