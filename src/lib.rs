// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Federated Satellite Systems Simulation ("FSS")

//! Turn-based simulation of satellite operators that sense time-valued
//! demands and relay the data to the ground before it loses its value.
//!
//! Kernel: [`location`], [`subsystem`], [`system`], [`contract`],
//! [`federate`], [`federation`] and [`context`], all driven through the
//! init/tick/tock protocol. Decisions: [`operations`], whose schedulers build
//! time-expanded flow models with [`lp`]. [`simulation`] ties a scenario
//! together and [`audit`] checks the custody invariants after every turn.

pub mod types;
pub mod ledger;
pub mod adapter;
pub mod location;
pub mod event;
pub mod subsystem;
pub mod system;
pub mod contract;
pub mod federate;
pub mod federation;
pub mod settlement;
pub mod context;
pub mod audit;
pub mod game;
pub mod lp;
pub mod operations;
pub mod simulation;

pub use context::Context;
pub use federate::{Federate, FederateError};
pub use game::{DesignSpec, Game, ScenarioError};
pub use ledger::Cash;
pub use operations::{Operations, OperationsError, OperationsKind, SchedulerConfig, StoragePenalty, Target};
pub use simulation::{FederateResult, RunResult, ScenarioConfig, Simulation, SimulationError};
pub use types::*;
