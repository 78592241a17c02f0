// Copyright (c) 2026 Hypermesh Foundation. All rights reserved.
// Licensed under the Business Source License 1.1.
// See the LICENSE file in the repository root for full license text.

//! Custody audit
//!
//! Verifies the inventory invariants of a committed turn:
//!
//! ```text
//! Σ size(inventory) ≤ capacity          for every subsystem
//! |holders(data)| = 1                    for every live contract
//! |contracts(demand)| ≤ 1                for every dealt demand
//! ```
//!
//! Run after every tock. A violation means the kernel moved or copied data
//! outside sense/transfer/transmit/resolve/default, and aborts the run.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::context::Context;
use crate::types::{ContractId, EventId, SystemId};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuditError {
    #[error("subsystem {subsystem} on {system} holds {used} over capacity {capacity}")]
    CapacityExceeded { system: SystemId, subsystem: String, used: u32, capacity: u32 },

    #[error("data for contract {contract} held in {holders} places")]
    DuplicateCustody { contract: ContractId, holders: usize },

    #[error("data for {contract} on {system} belongs to no live contract")]
    OrphanData { contract: ContractId, system: SystemId },

    #[error("contract {0} survived the turn without data")]
    LostCustody(ContractId),

    #[error("demand {demand} claimed by {contracts} contracts")]
    DuplicateClaim { demand: EventId, contracts: usize },
}

// ---------------------------------------------------------------------------
// Audit
// ---------------------------------------------------------------------------

/// Tallies of one clean audit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditReport {
    pub data_units: usize,
    pub contracts: usize,
}

/// Check every custody invariant over a committed context.
pub fn verify(ctx: &Context) -> Result<AuditReport, AuditError> {
    let mut holders: BTreeMap<ContractId, usize> = BTreeMap::new();
    for (_, system) in ctx.systems() {
        for sub in &system.subsystems {
            if sub.used() > sub.capacity() {
                return Err(AuditError::CapacityExceeded {
                    system: system.id,
                    subsystem: sub.name.clone(),
                    used: sub.used(),
                    capacity: sub.capacity(),
                });
            }
            for data in sub.contents() {
                if ctx.contract_owner(data.contract).is_none() {
                    return Err(AuditError::OrphanData { contract: data.contract, system: system.id });
                }
                *holders.entry(data.contract).or_default() += 1;
            }
        }
    }
    if let Some((&contract, &n)) = holders.iter().find(|(_, n)| **n > 1) {
        return Err(AuditError::DuplicateCustody { contract, holders: n });
    }

    let mut claims: BTreeMap<EventId, usize> = BTreeMap::new();
    let mut contracts = 0;
    for federate in ctx.federates() {
        for contract in &federate.contracts {
            if !holders.contains_key(&contract.id) {
                return Err(AuditError::LostCustody(contract.id));
            }
            *claims.entry(contract.demand.id).or_default() += 1;
            contracts += 1;
        }
    }
    if let Some((&demand, &n)) = claims.iter().find(|(_, n)| **n > 1) {
        return Err(AuditError::DuplicateClaim { demand, contracts: n });
    }

    Ok(AuditReport { data_units: holders.len(), contracts })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
