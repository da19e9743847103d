//! Cancel-request decision table and the plain cancel used by cascades

use super::{CirculationContext, CirculationRequest, Decision, Plan};
use crate::models::{CirculationAction, LoanId, LoanState};

/// Patron- or librarian-initiated cancellation.
///
/// The outcome depends on the cancelled loan's state and on the rest of the
/// queue (the loan itself left out):
/// - pending: plain cancel
/// - at desk, no queue: plain cancel at home, otherwise the loan travels home
/// - at desk, queue: cancel and validate the head from this loan's pickup
///   location. Only the two pickup libraries are compared here, unlike the
///   three-way routing of a checkin of an item in transit home.
/// - in transit for pickup, no queue: the loan travels home
/// - in transit, queue: cancel and validate the head from where the item was
///   last handed over
/// - in transit home, no queue: plain cancel
/// - on loan: refused, a checked-out loan is closed by checkin
pub fn decide_cancel_request(ctx: &CirculationContext, loan_id: LoanId) -> Decision {
    let Some(loan) = ctx.queue.get(loan_id) else {
        return Decision::inactive_loan(loan_id, ctx.item.id);
    };
    if loan.state == LoanState::ItemOnLoan {
        return Decision::denied(format!(
            "loan {} is checked out and cannot be cancelled",
            loan.id
        ));
    }
    if !ctx.permitted {
        return Decision::not_permitted(CirculationAction::CancelRequest);
    }

    let rest = ctx.queue.without(loan_id);
    let cancel = |case| {
        Plan::new(case).transition(
            CirculationAction::CancelRequest,
            loan.id,
            LoanState::Cancelled,
            None,
        )
    };
    let send_home = |case| {
        Plan::new(case).transition(
            CirculationAction::CancelRequest,
            loan.id,
            LoanState::ItemInTransitToHouse,
            None,
        )
    };

    match (loan.state, rest.first_pending()) {
        (LoanState::Created | LoanState::Pending, _) => {
            Decision::Applied(cancel("CANCEL_REQUEST_PENDING"))
        }
        (LoanState::ItemAtDesk, None) => {
            let (Some(item_library), Some(pickup_library)) =
                (ctx.item_library(), ctx.library_of(loan.pickup_location_id))
            else {
                return Decision::unresolved(loan.pickup_location_id);
            };
            if item_library == pickup_library {
                Decision::Applied(cancel("CANCEL_REQUEST_AT_DESK"))
            } else {
                Decision::Applied(send_home("CANCEL_REQUEST_AT_DESK_AWAY"))
            }
        }
        (LoanState::ItemAtDesk, Some(first)) => {
            let (Some(desk_library), Some(head_library)) = (
                ctx.library_of(loan.pickup_location_id),
                ctx.library_of(first.pickup_location_id),
            ) else {
                return Decision::unresolved(first.pickup_location_id);
            };
            // The validate step repeats this comparison and picks at desk or
            // in transit for the head accordingly
            let case = if desk_library == head_library {
                "CANCEL_REQUEST_AT_DESK_SAME_PICKUP"
            } else {
                "CANCEL_REQUEST_AT_DESK_OTHER_PICKUP"
            };
            Decision::Applied(cancel(case).cascade(CirculationRequest::Validate {
                loan_id: first.id,
                transaction_location_id: loan.pickup_location_id,
            }))
        }
        (LoanState::ItemInTransitForPickup, None) => {
            Decision::Applied(send_home("CANCEL_REQUEST_IN_TRANSIT"))
        }
        (LoanState::ItemInTransitForPickup | LoanState::ItemInTransitToHouse, Some(first)) => {
            Decision::Applied(cancel("CANCEL_REQUEST_IN_TRANSIT_QUEUE").cascade(
                CirculationRequest::Validate {
                    loan_id: first.id,
                    transaction_location_id: loan.transaction_location_id,
                },
            ))
        }
        (LoanState::ItemInTransitToHouse, None) => {
            Decision::Applied(cancel("CANCEL_REQUEST_TO_HOUSE"))
        }
        (state, _) => Decision::invalid(format!("loan {} is {}", loan.id, state)),
    }
}

/// Cancel a loan if it is still active; cascades use it to drop a loan that
/// a previous step may already have closed
pub fn decide_cancel(ctx: &CirculationContext, loan_id: LoanId) -> Decision {
    let Some(loan) = ctx.queue.get(loan_id) else {
        return Decision::noop(format!("loan {} is no longer active", loan_id));
    };
    if loan.state == LoanState::ItemOnLoan {
        return Decision::invalid(format!("loan {} is on loan and must be checked in", loan.id));
    }
    Decision::Applied(Plan::new("CANCEL").transition(
        CirculationAction::Cancel,
        loan.id,
        LoanState::Cancelled,
        None,
    ))
}
