//! Place-request decision

use super::{CirculationContext, Decision, Plan};
use crate::models::{CirculationAction, CreateLoan, ItemStatus, LoanState, RequestParams};

/// Queue a pending request for a patron.
///
/// The request is never validated here, even on a free item: putting it on
/// the desk is a separate validate action.
pub fn decide_request(ctx: &CirculationContext, params: &RequestParams) -> Decision {
    let Some(pickup) = params.pickup_location_id else {
        return Decision::invalid("a request needs a pickup location");
    };
    if ctx.library_of(pickup).is_none() {
        return Decision::unresolved(pickup);
    }

    let mut reasons = Vec::new();
    if !ctx.permitted {
        reasons.push(format!(
            "{} is not permitted by circulation policy",
            CirculationAction::Request
        ));
    }
    if ctx.item.status == ItemStatus::Missing {
        reasons.push(format!("item {} is missing", ctx.item.id));
    }
    if let Some(existing) = ctx.queue.patron_loan(params.patron_id) {
        reasons.push(format!(
            "patron {} already has loan {} ({}) on item {}",
            params.patron_id, existing.id, existing.state, ctx.item.id
        ));
    }
    if !ctx.is_pickup(pickup) {
        reasons.push(format!("location {} is not a pickup location", pickup));
    }
    if !reasons.is_empty() {
        return Decision::Denied(reasons);
    }

    Decision::Applied(Plan::new("REQUEST").create(
        CirculationAction::Request,
        CreateLoan {
            item_id: ctx.item.id,
            patron_id: params.patron_id,
            state: LoanState::Pending,
            pickup_location_id: pickup,
            transaction_location_id: params.transaction_location_id,
            end_date: None,
        },
    ))
}
