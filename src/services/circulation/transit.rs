//! Validate and receive: moving a request onto the item and the item
//! between libraries

use super::{CirculationContext, Decision, Plan};
use crate::models::{CirculationAction, LoanId, LoanState};

/// Put a pending request on the item: at desk when the pickup library is the
/// transaction library, in transit for pickup otherwise.
///
/// Only defined while no other loan holds the item.
pub fn decide_validate(
    ctx: &CirculationContext,
    loan_id: LoanId,
    transaction_location_id: i32,
) -> Decision {
    let Some(loan) = ctx.queue.get(loan_id) else {
        return Decision::inactive_loan(loan_id, ctx.item.id);
    };
    if loan.state != LoanState::Pending {
        return Decision::invalid(format!(
            "loan {} is {}, only pending requests can be validated",
            loan.id, loan.state
        ));
    }
    if let Some(holding) = ctx.queue.without(loan_id).holding() {
        return Decision::invalid(format!(
            "item {} is already held by loan {} ({})",
            ctx.item.id, holding.id, holding.state
        ));
    }

    let Some(cmp) = ctx.compare(transaction_location_id, loan.pickup_location_id) else {
        return Decision::unresolved(transaction_location_id);
    };
    let (case, to) = if cmp.transaction_eq_pickup {
        ("VALIDATE_AT_DESK", LoanState::ItemAtDesk)
    } else {
        ("VALIDATE_IN_TRANSIT", LoanState::ItemInTransitForPickup)
    };
    Decision::Applied(Plan::new(case).transition(
        CirculationAction::Validate,
        loan.id,
        to,
        Some(transaction_location_id),
    ))
}

/// Close a transit: at desk when travelling for pickup, returned when
/// travelling home
pub fn decide_receive(
    ctx: &CirculationContext,
    loan_id: LoanId,
    transaction_location_id: Option<i32>,
) -> Decision {
    let Some(loan) = ctx.queue.get(loan_id) else {
        return Decision::inactive_loan(loan_id, ctx.item.id);
    };
    match loan.state {
        LoanState::ItemInTransitForPickup => Decision::Applied(
            Plan::new("RECEIVE_FOR_PICKUP").transition(
                CirculationAction::Receive,
                loan.id,
                LoanState::ItemAtDesk,
                Some(transaction_location_id.unwrap_or(loan.pickup_location_id)),
            ),
        ),
        LoanState::ItemInTransitToHouse => Decision::Applied(
            Plan::new("RECEIVE_AT_HOME").transition(
                CirculationAction::Receive,
                loan.id,
                LoanState::ItemReturned,
                Some(transaction_location_id.unwrap_or(ctx.item.location_id)),
            ),
        ),
        state => Decision::invalid(format!(
            "loan {} is {}, only loans in transit can be received",
            loan.id, state
        )),
    }
}
