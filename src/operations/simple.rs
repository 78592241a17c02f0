// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Federated Satellite Systems Simulation ("FSS") - Greedy Baseline Operations

use tracing::debug;

use super::tolerate;
use crate::context::Context;
use crate::federate::FederateError;
use crate::types::{EventId, FederateId, SystemId};

/// One greedy turn for `federate`: drop dead spacecraft and failed contracts,
/// sense whatever is in reach, downlink whatever can reach an own station,
/// then sense again with the room that freed up.
pub(crate) fn execute(ctx: &mut Context, federate: FederateId) -> Result<(), FederateError> {
    ctx.decommission_inoperable(federate)?;
    ctx.auto_default(federate)?;
    contract_and_sense(ctx, federate)?;
    downlink(ctx, federate)?;
    contract_and_sense(ctx, federate)
}

fn own(ctx: &Context, federate: FederateId, spacecraft: bool) -> Vec<SystemId> {
    ctx.federate(federate)
        .map(|f| {
            f.commissioned()
                .filter(|s| s.is_spacecraft() == spacecraft)
                .map(|s| s.id)
                .collect()
        })
        .unwrap_or_default()
}

fn contract_and_sense(ctx: &mut Context, federate: FederateId) -> Result<(), FederateError> {
    let demands: Vec<EventId> = ctx.calendar.demands().map(|d| d.id).collect();
    let spacecraft = own(ctx, federate, true);
    for demand in demands {
        let sensor = spacecraft.iter().copied().find(|&sat| {
            match (ctx.calendar.demand(demand), ctx.system(sat), ctx.system_location(sat)) {
                (Some(d), Some(sys), Some(loc)) => sys.can_sense(d, loc),
                _ => false,
            }
        });
        let Some(sat) = sensor else {
            continue;
        };
        let Some(contract) = ctx.contract(federate, demand) else {
            continue;
        };
        if tolerate(ctx.sense(federate, contract, sat), "sense")?.is_none() {
            tolerate(ctx.default_contract(federate, contract), "default")?;
        }
    }
    Ok(())
}

fn downlink(ctx: &mut Context, federate: FederateId) -> Result<(), FederateError> {
    let stations = own(ctx, federate, false);
    for sat in own(ctx, federate, true) {
        let aboard = ctx.system(sat).map(|s| s.contracts_aboard()).unwrap_or_default();
        for contract in aboard {
            let Some(owner) = ctx.contract_owner(contract) else {
                continue;
            };
            let Some(&station) = stations
                .iter()
                .find(|&&g| ctx.can_transport(contract, None, sat, g))
            else {
                continue;
            };
            if tolerate(ctx.transport(contract, None, sat, station), "downlink")?.is_some() {
                tolerate(ctx.resolve_contract(owner, contract), "resolve")?;
            } else {
                debug!(%contract, %sat, "downlink refused");
            }
        }
    }
    Ok(())
}
