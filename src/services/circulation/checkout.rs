//! Checkout decision
//!
//! Prior steps run inside the same plan, before the checkout itself:
//! a requested loan in transit for its own patron is received first; a loan
//! in transit home is cancelled and the item treated as free; without an
//! explicit loan any holding loan other than an at-desk one is cancelled.

use super::{CirculationContext, Decision, LoanMutation, Plan};
use crate::{
    models::{CheckoutParams, CirculationAction, CreateLoan, ItemStatus, Loan, LoanState},
    services::due_date,
};

pub fn decide_checkout(ctx: &CirculationContext, params: &CheckoutParams) -> Decision {
    let patron = params.patron_id;
    let transaction = params.transaction_location_id;

    let mut reasons = Vec::new();
    if !ctx.permitted {
        reasons.push(format!(
            "{} is not permitted by circulation policy",
            CirculationAction::Checkout
        ));
    }
    if ctx.item.status == ItemStatus::Missing {
        reasons.push(format!("item {} is missing", ctx.item.id));
    }
    if !reasons.is_empty() {
        return Decision::Denied(reasons);
    }
    if ctx.library_of(transaction).is_none() {
        return Decision::unresolved(transaction);
    }

    let mut plan = Plan::new("CHECKOUT");
    let mut target: Option<&Loan> = None;
    let mut cancelled = None;
    let mut from_transit_to_house = false;

    if let Some(loan_id) = params.loan_id {
        let Some(loan) = ctx.queue.get(loan_id) else {
            return Decision::inactive_loan(loan_id, ctx.item.id);
        };
        match loan.state {
            LoanState::ItemInTransitForPickup if loan.patron_id == patron => {
                plan = plan.transition(
                    CirculationAction::Receive,
                    loan.id,
                    LoanState::ItemAtDesk,
                    Some(transaction),
                );
                target = Some(loan);
            }
            LoanState::ItemInTransitToHouse => {
                plan = plan.transition(
                    CirculationAction::Cancel,
                    loan.id,
                    LoanState::Cancelled,
                    Some(transaction),
                );
                cancelled = Some(loan.id);
                from_transit_to_house = true;
            }
            LoanState::ItemOnLoan => {
                return Decision::invalid(format!("loan {} is already on loan", loan.id));
            }
            _ => target = Some(loan),
        }
    } else if let Some(holding) = ctx.queue.holding() {
        if holding.state.is_in_transit() {
            plan = plan.transition(
                CirculationAction::Cancel,
                holding.id,
                LoanState::Cancelled,
                Some(transaction),
            );
            cancelled = Some(holding.id);
        }
    }

    let remaining = match cancelled {
        Some(id) => ctx.queue.without(id),
        None => ctx.queue.clone(),
    };

    // Without an explicit loan, the patron's own at-desk loan or queue head
    // is the one being fulfilled
    let target = target.or_else(|| {
        remaining
            .holding()
            .filter(|l| l.state == LoanState::ItemAtDesk && l.patron_id == patron)
            .or_else(|| remaining.first_pending().filter(|l| l.patron_id == patron))
            .and_then(|l| ctx.queue.get(l.id))
    });

    let mut reasons = Vec::new();
    if let Some(loan) = target.filter(|l| l.patron_id != patron) {
        reasons.push(format!("loan {} belongs to another patron", loan.id));
    }
    if let Some(holding) = remaining.holding() {
        if target.map(|l| l.id) != Some(holding.id) {
            reasons.push(match holding.state {
                LoanState::ItemOnLoan => format!("item {} is already on loan", ctx.item.id),
                LoanState::ItemAtDesk => format!(
                    "item {} is waiting at desk for another patron",
                    ctx.item.id
                ),
                _ => format!("item {} is held by loan {}", ctx.item.id, holding.id),
            });
        }
    }
    if ctx.item.status == ItemStatus::OnShelf && !from_transit_to_house {
        if let Some(first) = remaining.first_pending().filter(|l| l.patron_id != patron) {
            reasons.push(format!(
                "item {} is reserved for patron {}",
                ctx.item.id, first.patron_id
            ));
        }
    }
    if !reasons.is_empty() {
        return Decision::Denied(reasons);
    }

    let end_date = due_date::checkout_due_date(
        params.end_date,
        ctx.now,
        ctx.settings.default_loan_duration_days,
        ctx.schedule_for(transaction),
        ctx.settings.open_day_horizon_days,
    );

    let plan = match target {
        Some(loan) => {
            plan.case = "CHECKOUT_REQUESTED";
            plan.push(LoanMutation::Transition {
                action: CirculationAction::Checkout,
                loan_id: loan.id,
                to: LoanState::ItemOnLoan,
                transaction_location_id: Some(transaction),
                end_date: Some(end_date),
            })
        }
        None => plan.create(
            CirculationAction::Checkout,
            CreateLoan {
                item_id: ctx.item.id,
                patron_id: patron,
                state: LoanState::ItemOnLoan,
                pickup_location_id: transaction,
                transaction_location_id: transaction,
                end_date: Some(end_date),
            },
        ),
    };
    Decision::Applied(plan)
}
