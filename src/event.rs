// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Federated Satellite Systems Simulation ("FSS") - Events & Calendar

use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::ledger::Cash;
use crate::types::{EventId, IdAllocator, Phenomena};

// ─── Event templates ────────────────────────────────────────────────────────

/// A data-collection task type with a decaying value schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemandSpec {
    pub name: String,
    pub phenomena: Phenomena,
    pub size: u32,
    /// `(deadline, value)` pairs in ascending deadline order
    pub value_schedule: Vec<(u32, Cash)>,
    pub default_value: Cash,
}

impl DemandSpec {
    /// Value of delivering at `elapsed` turns after sensing: first entry
    /// whose deadline has not passed, else the default value.
    pub fn value_at(&self, elapsed: u32) -> Cash {
        self.value_schedule
            .iter()
            .find(|(deadline, _)| elapsed <= *deadline)
            .map(|(_, value)| *value)
            .unwrap_or(self.default_value)
    }

    /// Last deadline of the schedule; later deliveries are defaults.
    pub fn last_deadline(&self) -> u32 {
        self.value_schedule.iter().map(|(d, _)| *d).max().unwrap_or(0)
    }
}

/// A hazard that may destroy subsystems of unprotected spacecraft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisturbanceSpec {
    pub name: String,
    pub hit_chance: f64,
    pub max_hits: u32,
}

/// Calendar deck entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventSpec {
    Demand(DemandSpec),
    Disturbance(DisturbanceSpec),
}

// ─── Dealt events ───────────────────────────────────────────────────────────

/// A demand dealt into a sector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Demand {
    pub id: EventId,
    pub sector: u32,
    pub spec: DemandSpec,
}

impl Demand {
    pub fn value_at(&self, elapsed: u32) -> Cash {
        self.spec.value_at(elapsed)
    }

    pub fn phenomena(&self) -> Phenomena {
        self.spec.phenomena
    }

    pub fn size(&self) -> u32 {
        self.spec.size
    }

    pub fn default_value(&self) -> Cash {
        self.spec.default_value
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Disturbance {
    pub id: EventId,
    pub sector: u32,
    pub spec: DisturbanceSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    Demand(Demand),
    Disturbance(Disturbance),
}

impl Event {
    pub fn id(&self) -> EventId {
        match self {
            Self::Demand(d) => d.id,
            Self::Disturbance(d) => d.id,
        }
    }

    pub fn sector(&self) -> u32 {
        match self {
            Self::Demand(d) => d.sector,
            Self::Disturbance(d) => d.sector,
        }
    }

    fn into_spec(self) -> EventSpec {
        match self {
            Self::Demand(d) => EventSpec::Demand(d.spec),
            Self::Disturbance(d) => EventSpec::Disturbance(d.spec),
        }
    }
}

// ─── Calendar ───────────────────────────────────────────────────────────────

/// Current/future/past partitions of the event deck.
///
/// Events are dealt without replacement, one per sector per turn; the past
/// pile is reshuffled into the future pile as soon as the future pile runs
/// dry. A claimed demand leaves the deck for good, so only unclaimed events
/// retire to the past pile. Once every card is claimed nothing more is dealt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventCalendar {
    deck: Vec<EventSpec>,
    future: Vec<EventSpec>,
    current: Vec<Event>,
    claimed: Vec<EventId>,
    past: Vec<EventSpec>,
}

impl EventCalendar {
    pub fn new(deck: Vec<EventSpec>) -> Self {
        Self {
            deck,
            future: Vec::new(),
            current: Vec::new(),
            claimed: Vec::new(),
            past: Vec::new(),
        }
    }

    /// Every event type in the deck, in definition order.
    pub fn deck(&self) -> &[EventSpec] {
        &self.deck
    }

    pub fn init(&mut self, rng: &mut ChaCha8Rng) {
        self.future = self.deck.clone();
        self.future.shuffle(rng);
        self.current.clear();
        self.claimed.clear();
        self.past.clear();
    }

    /// Events dealt this turn, claimed or not.
    pub fn current(&self) -> &[Event] {
        &self.current
    }

    /// Live, unclaimed demands.
    pub fn demands(&self) -> impl Iterator<Item = &Demand> {
        self.current.iter().filter_map(|e| match e {
            Event::Demand(d) if !self.claimed.contains(&d.id) => Some(d),
            _ => None,
        })
    }

    pub fn demand(&self, id: EventId) -> Option<&Demand> {
        self.demands().find(|d| d.id == id)
    }

    /// Take a live demand. `None` when it is already claimed or not dealt.
    pub fn claim(&mut self, id: EventId) -> Option<Demand> {
        let demand = self.demand(id)?.clone();
        self.claimed.push(id);
        Some(demand)
    }

    /// Retire the current events and deal one new event into each sector.
    pub fn deal(&mut self, num_sectors: u32, ids: &mut IdAllocator, rng: &mut ChaCha8Rng) {
        let claimed = std::mem::take(&mut self.claimed);
        for event in self.current.drain(..) {
            if !claimed.contains(&event.id()) {
                self.past.push(event.into_spec());
            }
        }
        for sector in 1..=num_sectors {
            if self.future.is_empty() {
                // Refill skipped last time because the past pile was empty then.
                self.refill(rng);
            }
            let Some(spec) = self.future.pop() else {
                break;
            };
            let id = ids.event();
            self.current.push(match spec {
                EventSpec::Demand(spec) => Event::Demand(Demand { id, sector, spec }),
                EventSpec::Disturbance(spec) => {
                    Event::Disturbance(Disturbance { id, sector, spec })
                }
            });
            if self.future.is_empty() {
                self.refill(rng);
            }
        }
    }

    fn refill(&mut self, rng: &mut ChaCha8Rng) {
        self.past.shuffle(rng);
        self.future.append(&mut self.past);
    }
}
