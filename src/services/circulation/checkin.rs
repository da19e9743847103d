//! Checkin decision table
//!
//! | Case        | Item holds                      | Outcome                                   |
//! |-------------|---------------------------------|-------------------------------------------|
//! | CHECKIN_1_1 | nothing, empty queue            | on shelf at home, in transit elsewhere    |
//! | CHECKIN_1_2 | nothing, pending queue          | validate the oldest pending loan          |
//! | CHECKIN_2   | at-desk loan                    | stay, or leave for the pickup library     |
//! | CHECKIN_3   | on-loan loan                    | return it, then serve the queue           |
//! | CHECKIN_4   | loan in transit for pickup      | receive it at its pickup library          |
//! | CHECKIN_5_1 | loan in transit home, no queue  | receive it at home                        |
//! | CHECKIN_5_2 | loan in transit home, queue     | route by the oldest pending pickup        |

use super::{CirculationContext, CirculationRequest, Decision, Plan};
use crate::{
    models::{CheckinParams, CirculationAction, ItemStatus, Loan, LoanState},
    services::queue::HoldingState,
};

pub fn decide_checkin(ctx: &CirculationContext, params: &CheckinParams) -> Decision {
    if !ctx.permitted {
        return Decision::not_permitted(CirculationAction::Checkin);
    }

    let transaction = params.transaction_location_id;
    let (Some(item_library), Some(transaction_library)) =
        (ctx.item_library(), ctx.library_of(transaction))
    else {
        return Decision::unresolved(transaction);
    };
    let item_eq_transaction = item_library == transaction_library;

    let Some(holding) = ctx.queue.holding() else {
        return match ctx.queue.first_pending() {
            None => checkin_1_1(ctx, item_eq_transaction),
            Some(first) => checkin_1_2(first, transaction),
        };
    };

    match (ctx.queue.holding_state(), ctx.queue.first_pending()) {
        (HoldingState::AtDesk, _) => checkin_2(ctx, holding, transaction),
        (HoldingState::OnLoan, first) => {
            checkin_3(holding, first, transaction, item_eq_transaction)
        }
        (HoldingState::InTransitForPickup, _) => checkin_4(ctx, holding, transaction),
        (HoldingState::InTransitToHouse, None) => {
            checkin_5_1(holding, transaction, item_eq_transaction)
        }
        (HoldingState::InTransitToHouse, Some(first)) => {
            checkin_5_2(ctx, holding, first, transaction)
        }
        (HoldingState::None, _) => Decision::invalid(format!(
            "loan {} is {} but not a holding loan",
            holding.id, holding.state
        )),
    }
}

/// No loan at all: only the item status can change
fn checkin_1_1(ctx: &CirculationContext, item_eq_transaction: bool) -> Decision {
    let target = if item_eq_transaction {
        ItemStatus::OnShelf
    } else {
        ItemStatus::InTransit
    };
    if ctx.item.status == target {
        return Decision::noop(format!("item {} is already {}", ctx.item.id, target));
    }
    Decision::Applied(Plan::new("CHECKIN_1_1").with_status(target))
}

fn checkin_1_2(first: &Loan, transaction: i32) -> Decision {
    Decision::Applied(
        Plan::new("CHECKIN_1_2")
            .with_status(ItemStatus::OnShelf)
            .cascade(CirculationRequest::Validate {
                loan_id: first.id,
                transaction_location_id: transaction,
            }),
    )
}

fn checkin_2(ctx: &CirculationContext, desk: &Loan, transaction: i32) -> Decision {
    let Some(cmp) = ctx.compare(transaction, desk.pickup_location_id) else {
        return Decision::unresolved(desk.pickup_location_id);
    };
    if cmp.transaction_eq_pickup {
        return Decision::noop(format!(
            "item {} is already waiting at its pickup desk",
            ctx.item.id
        ));
    }
    Decision::Applied(Plan::new("CHECKIN_2").transition(
        CirculationAction::Checkin,
        desk.id,
        LoanState::ItemInTransitForPickup,
        Some(transaction),
    ))
}

/// Ordinary return. Away from home the loan stays active, in transit to
/// house; when requests wait it is cancelled so the oldest one can claim the
/// item from here.
///
/// The validate step compares the head's pickup library with this checkin
/// library, so a head picked up here lands at desk directly and the
/// transit-then-receive hop never materialises.
fn checkin_3(
    on_loan: &Loan,
    first_pending: Option<&Loan>,
    transaction: i32,
    item_eq_transaction: bool,
) -> Decision {
    let returned_state = if item_eq_transaction {
        LoanState::ItemReturned
    } else {
        LoanState::ItemInTransitToHouse
    };
    let plan = Plan::new("CHECKIN_3").transition(
        CirculationAction::Checkin,
        on_loan.id,
        returned_state,
        Some(transaction),
    );

    let Some(first) = first_pending else {
        return Decision::Applied(plan);
    };
    Decision::Applied(
        plan.cascade(CirculationRequest::Cancel { loan_id: on_loan.id })
            .cascade(CirculationRequest::Validate {
                loan_id: first.id,
                transaction_location_id: transaction,
            }),
    )
}

fn checkin_4(ctx: &CirculationContext, transit: &Loan, transaction: i32) -> Decision {
    let Some(cmp) = ctx.compare(transaction, transit.pickup_location_id) else {
        return Decision::unresolved(transit.pickup_location_id);
    };
    if !cmp.transaction_eq_pickup {
        return Decision::noop(format!(
            "item {} is still on its way to pickup",
            ctx.item.id
        ));
    }
    Decision::Applied(Plan::new("CHECKIN_4").transition(
        CirculationAction::Receive,
        transit.id,
        LoanState::ItemAtDesk,
        Some(transaction),
    ))
}

fn checkin_5_1(transit: &Loan, transaction: i32, item_eq_transaction: bool) -> Decision {
    if !item_eq_transaction {
        return Decision::noop("item is still on its way home");
    }
    Decision::Applied(Plan::new("CHECKIN_5_1").transition(
        CirculationAction::Receive,
        transit.id,
        LoanState::ItemReturned,
        Some(transaction),
    ))
}

/// Routing is decided by the oldest pending loan's pickup library
fn checkin_5_2(
    ctx: &CirculationContext,
    transit: &Loan,
    first: &Loan,
    transaction: i32,
) -> Decision {
    let Some(cmp) = ctx.compare(transaction, first.pickup_location_id) else {
        return Decision::unresolved(first.pickup_location_id);
    };
    let validate_first = CirculationRequest::Validate {
        loan_id: first.id,
        transaction_location_id: transaction,
    };

    match (cmp.transaction_eq_pickup, cmp.item_eq_pickup) {
        // Home, and home is where the head picks up
        (true, true) => Decision::Applied(
            Plan::new("CHECKIN_5_2")
                .transition(
                    CirculationAction::Receive,
                    transit.id,
                    LoanState::ItemReturned,
                    Some(transaction),
                )
                .cascade(validate_first),
        ),
        // Arrived at the head's pickup library before reaching home
        (true, false) => Decision::Applied(
            Plan::new("CHECKIN_5_2")
                .transition(
                    CirculationAction::Cancel,
                    transit.id,
                    LoanState::Cancelled,
                    Some(transaction),
                )
                .cascade(validate_first),
        ),
        (false, true) => Decision::noop("item is still on its way home to its pickup library"),
        (false, false) => Decision::Applied(
            Plan::new("CHECKIN_5_2")
                .transition(
                    CirculationAction::Cancel,
                    transit.id,
                    LoanState::Cancelled,
                    Some(transaction),
                )
                .cascade(validate_first),
        ),
    }
}
