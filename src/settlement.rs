// Copyright (c) 2026 Hypermesh Foundation. All rights reserved.
// Licensed under the Business Source License 1.1.
// See the LICENSE file in the repository root for full license text.

//! Cross-federate settlement -- fixed per-use fees for foreign links.
//!
//! No value creation occurs here. A federate routing its data through another
//! federate's ground station or inter-satellite link pays that owner a fixed
//! fee per hop; the payer is debited and the payee credited by the same
//! amount, immediately after the hop succeeds.

use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::context::Context;
use crate::federate::FederateError;
use crate::ledger::Cash;
use crate::types::FederateId;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from settlement.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SettlementError {
    #[error("zero fee -- nothing to settle")]
    ZeroFee,

    #[error("federate {0} cannot pay itself")]
    SelfDealing(FederateId),
}

// ---------------------------------------------------------------------------
// Fee schedule
// ---------------------------------------------------------------------------

/// Which foreign service was used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Service {
    /// Space-to-ground hop into a foreign ground station
    Downlink,
    /// Inter-satellite hop with a foreign endpoint
    Crosslink,
}

/// Fixed fee per foreign hop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeSchedule {
    /// Fee for delivering into another federate's ground station (default 50).
    pub downlink: Cash,
    /// Fee for an inter-satellite hop touching another federate's spacecraft (default 20).
    pub crosslink: Cash,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            downlink: Cash(dec!(50)),
            crosslink: Cash(dec!(20)),
        }
    }
}

impl FeeSchedule {
    /// Schedule that never charges.
    pub fn free() -> Self {
        Self { downlink: Cash::zero(), crosslink: Cash::zero() }
    }

    pub fn fee(&self, service: Service) -> Cash {
        match service {
            Service::Downlink => self.downlink,
            Service::Crosslink => self.crosslink,
        }
    }

    /// Price one hop from `payer` through `payee`'s infrastructure.
    pub fn quote(
        &self,
        service: Service,
        payer: FederateId,
        payee: FederateId,
    ) -> Result<Settlement, SettlementError> {
        if payer == payee {
            return Err(SettlementError::SelfDealing(payer));
        }
        let amount = self.fee(service);
        if amount.is_zero() {
            return Err(SettlementError::ZeroFee);
        }
        Ok(Settlement { payer, payee, service, amount })
    }
}

/// One transfer of cash between federates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settlement {
    pub payer: FederateId,
    pub payee: FederateId,
    pub service: Service,
    pub amount: Cash,
}

impl Context {
    /// Move a settled fee between two federates' ledgers.
    pub fn settle(&mut self, settlement: &Settlement) -> Result<(), FederateError> {
        if self.federate(settlement.payee).is_none() {
            return Err(FederateError::UnknownFederate(settlement.payee));
        }
        let payer = self
            .federate_mut(settlement.payer)
            .ok_or(FederateError::UnknownFederate(settlement.payer))?;
        payer.cash -= settlement.amount;
        if payer.cash.is_negative() {
            warn!(federate = %settlement.payer, cash = %payer.cash, "fee overdrew cash");
        }
        if let Some(payee) = self.federate_mut(settlement.payee) {
            payee.cash += settlement.amount;
        }
        debug!(
            payer = %settlement.payer,
            payee = %settlement.payee,
            service = ?settlement.service,
            amount = %settlement.amount,
            "settled"
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
