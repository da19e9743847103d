//! Loan extension

use super::{CirculationContext, Decision, LoanMutation, Plan};
use crate::{
    models::{CirculationAction, LoanId, LoanState},
    services::due_date,
};

/// Push back the due date of the item's current checkout.
///
/// Refused while someone is waiting for the item or once the loan has been
/// extended `max_extensions` times.
pub fn decide_extend(ctx: &CirculationContext, loan_id: Option<LoanId>) -> Decision {
    let on_loan = match loan_id {
        Some(id) => ctx.queue.get(id),
        None => ctx.queue.holding(),
    }
    .filter(|l| l.state == LoanState::ItemOnLoan);
    let Some(loan) = on_loan else {
        return Decision::denied(format!("item {} has no active loan to extend", ctx.item.id));
    };

    let mut reasons = Vec::new();
    if !ctx.permitted {
        reasons.push(format!(
            "{} is not permitted by circulation policy",
            CirculationAction::Extend
        ));
    }
    if ctx.queue.has_pending() {
        reasons.push(format!("item {} is requested by another patron", ctx.item.id));
    }
    if i64::from(loan.extension_count) >= i64::from(ctx.settings.max_extensions) {
        reasons.push(format!(
            "loan {} has reached the maximum of {} extensions",
            loan.id, ctx.settings.max_extensions
        ));
    }
    if !reasons.is_empty() {
        return Decision::Denied(reasons);
    }

    let end_date = due_date::extended_due_date(
        loan.end_date,
        ctx.now,
        ctx.settings.extension_duration_days,
        ctx.schedule_for(loan.transaction_location_id),
        ctx.settings.open_day_horizon_days,
    );
    Decision::Applied(Plan::new("EXTEND").push(LoanMutation::Extend {
        loan_id: loan.id,
        end_date,
    }))
}
