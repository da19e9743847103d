//! Circulation decision tables
//!
//! `decide` is a pure, total function of one item's loan states, the library
//! comparison and the action parameters. It never touches a store: the
//! orchestrator reads the aggregate, calls `decide`, applies the returned
//! `Plan` and commits it, then feeds the plan's cascades back in.
//!
//! Every table dispatches on the item's holding state. The case names used
//! in logs (`CHECKIN_1_1` ... `CHECKIN_5_2`) are the rows of the checkin table.

pub mod cancel;
pub mod checkin;
pub mod checkout;
pub mod extend;
pub mod request;
pub mod transit;

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use uuid::Uuid;

use super::comparator::{Comparison, LocationMap};
use super::queue::RequestQueue;
use crate::{
    config::CirculationConfig,
    error::AppError,
    models::{
        ActionLogEntry, CheckinParams, CheckoutParams, CirculationAction, CreateLoan, Item,
        ItemStatus, LibrarySchedule, Loan, LoanId, LoanState, RequestParams,
    },
};

// ---------------------------------------------------------------------------
// CirculationRequest
// ---------------------------------------------------------------------------

/// One action to decide, either requested by a caller or cascaded by a
/// previous step
#[derive(Debug, Clone, PartialEq)]
pub enum CirculationRequest {
    Checkout(CheckoutParams),
    Checkin(CheckinParams),
    Request(RequestParams),
    CancelRequest {
        loan_id: LoanId,
    },
    Extend {
        loan_id: Option<LoanId>,
    },
    Validate {
        loan_id: LoanId,
        transaction_location_id: i32,
    },
    Receive {
        loan_id: LoanId,
        transaction_location_id: Option<i32>,
    },
    /// Cancel a loan if it is still active when the step runs
    Cancel {
        loan_id: LoanId,
    },
}

impl CirculationRequest {
    pub fn action(&self) -> CirculationAction {
        match self {
            CirculationRequest::Checkout(_) => CirculationAction::Checkout,
            CirculationRequest::Checkin(_) => CirculationAction::Checkin,
            CirculationRequest::Request(_) => CirculationAction::Request,
            CirculationRequest::CancelRequest { .. } => CirculationAction::CancelRequest,
            CirculationRequest::Extend { .. } => CirculationAction::Extend,
            CirculationRequest::Validate { .. } => CirculationAction::Validate,
            CirculationRequest::Receive { .. } => CirculationAction::Receive,
            CirculationRequest::Cancel { .. } => CirculationAction::Cancel,
        }
    }

    /// Loan targeted by the action, when it names one
    pub fn loan_id(&self) -> Option<LoanId> {
        match self {
            CirculationRequest::Checkout(p) => p.loan_id,
            CirculationRequest::Checkin(_) | CirculationRequest::Request(_) => None,
            CirculationRequest::Extend { loan_id } => *loan_id,
            CirculationRequest::CancelRequest { loan_id }
            | CirculationRequest::Validate { loan_id, .. }
            | CirculationRequest::Receive { loan_id, .. }
            | CirculationRequest::Cancel { loan_id } => Some(*loan_id),
        }
    }

    /// Patron the action is performed for, when the parameters carry one
    pub fn patron_id(&self) -> Option<i32> {
        match self {
            CirculationRequest::Checkout(p) => Some(p.patron_id),
            CirculationRequest::Request(p) => Some(p.patron_id),
            _ => None,
        }
    }

    pub fn transaction_location_id(&self) -> Option<i32> {
        match self {
            CirculationRequest::Checkout(p) => Some(p.transaction_location_id),
            CirculationRequest::Checkin(p) => Some(p.transaction_location_id),
            CirculationRequest::Request(p) => Some(p.transaction_location_id),
            CirculationRequest::Validate {
                transaction_location_id,
                ..
            } => Some(*transaction_location_id),
            CirculationRequest::Receive {
                transaction_location_id,
                ..
            } => *transaction_location_id,
            _ => None,
        }
    }

    /// Locations the decision needs resolved, besides the item's and its
    /// loans'
    pub fn location_ids(&self) -> Vec<i32> {
        let mut ids: Vec<i32> = self.transaction_location_id().into_iter().collect();
        if let CirculationRequest::Request(p) = self {
            ids.extend(p.pickup_location_id);
        }
        ids
    }
}

impl std::fmt::Display for CirculationRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.loan_id() {
            Some(loan_id) => write!(f, "{} of loan {}", self.action(), loan_id),
            None => write!(f, "{}", self.action()),
        }
    }
}

// ---------------------------------------------------------------------------
// Plan
// ---------------------------------------------------------------------------

/// A change to one loan of the item
#[derive(Debug, Clone, PartialEq)]
pub enum LoanMutation {
    Create {
        action: CirculationAction,
        loan: CreateLoan,
    },
    Transition {
        action: CirculationAction,
        loan_id: LoanId,
        to: LoanState,
        transaction_location_id: Option<i32>,
        end_date: Option<DateTime<Utc>>,
    },
    Extend {
        loan_id: LoanId,
        end_date: DateTime<Utc>,
    },
}

/// What an applied decision does: loan mutations committed together with
/// the item status, then cascaded requests run as separate steps
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    /// Decision table row, for logs
    pub case: &'static str,
    /// Status to show when no holding loan remains; `None` lets it derive
    pub item_status: Option<ItemStatus>,
    pub mutations: Vec<LoanMutation>,
    pub cascades: Vec<CirculationRequest>,
}

impl Plan {
    pub fn new(case: &'static str) -> Self {
        Self {
            case,
            item_status: None,
            mutations: Vec::new(),
            cascades: Vec::new(),
        }
    }

    pub fn with_status(mut self, status: ItemStatus) -> Self {
        self.item_status = Some(status);
        self
    }

    pub fn transition(
        mut self,
        action: CirculationAction,
        loan_id: LoanId,
        to: LoanState,
        transaction_location_id: Option<i32>,
    ) -> Self {
        self.mutations.push(LoanMutation::Transition {
            action,
            loan_id,
            to,
            transaction_location_id,
            end_date: None,
        });
        self
    }

    pub fn create(mut self, action: CirculationAction, loan: CreateLoan) -> Self {
        self.mutations.push(LoanMutation::Create { action, loan });
        self
    }

    pub fn push(mut self, mutation: LoanMutation) -> Self {
        self.mutations.push(mutation);
        self
    }

    pub fn cascade(mut self, request: CirculationRequest) -> Self {
        self.cascades.push(request);
        self
    }

    /// Apply the mutations to the context's loans.
    ///
    /// Fails when a mutation targets an unknown or terminal loan, or when the
    /// result would leave more than one holding loan on the item.
    pub fn apply(
        &self,
        ctx: &CirculationContext,
        action: CirculationAction,
    ) -> Result<AppliedPlan, String> {
        let mut loans: IndexMap<LoanId, Loan> =
            ctx.queue.loans().map(|l| (l.id, l.clone())).collect();
        let mut changed: Vec<LoanId> = Vec::new();
        let mut log = Vec::new();

        for mutation in &self.mutations {
            let (logged_action, loan_id) = match mutation {
                LoanMutation::Create { action, loan } => {
                    let created = Loan {
                        id: Uuid::new_v4(),
                        item_id: loan.item_id,
                        patron_id: loan.patron_id,
                        state: loan.state,
                        pickup_location_id: loan.pickup_location_id,
                        transaction_location_id: loan.transaction_location_id,
                        creation_date: ctx.now,
                        transaction_date: Some(ctx.now),
                        end_date: loan.end_date,
                        extension_count: 0,
                    };
                    let id = created.id;
                    loans.insert(id, created);
                    (*action, id)
                }
                LoanMutation::Transition {
                    action,
                    loan_id,
                    to,
                    transaction_location_id,
                    end_date,
                } => {
                    let loan = active_loan(&mut loans, *loan_id)?;
                    loan.state = *to;
                    loan.transaction_date = Some(ctx.now);
                    if let Some(location_id) = transaction_location_id {
                        loan.transaction_location_id = *location_id;
                    }
                    if end_date.is_some() {
                        loan.end_date = *end_date;
                    }
                    (*action, *loan_id)
                }
                LoanMutation::Extend { loan_id, end_date } => {
                    let loan = active_loan(&mut loans, *loan_id)?;
                    loan.end_date = Some(*end_date);
                    loan.extension_count += 1;
                    (CirculationAction::Extend, *loan_id)
                }
            };

            if let Some(loan) = loans.get(&loan_id) {
                log.push(ActionLogEntry {
                    action: logged_action,
                    loan: loan.clone(),
                });
            }
            if !changed.contains(&loan_id) {
                changed.push(loan_id);
            }
        }

        let holding: Vec<&Loan> = loans.values().filter(|l| l.state.is_holding()).collect();
        if holding.len() > 1 {
            return Err(format!(
                "{} would leave item {} with {} holding loans",
                self.case,
                ctx.item.id,
                holding.len()
            ));
        }

        let status = resulting_status(
            holding.first().map(|l| l.state),
            self.item_status,
            ctx,
            action,
        );

        Ok(AppliedPlan {
            status,
            loans: changed
                .iter()
                .filter_map(|id| loans.get(id).cloned())
                .collect(),
            log,
        })
    }
}

fn active_loan(loans: &mut IndexMap<LoanId, Loan>, loan_id: LoanId) -> Result<&mut Loan, String> {
    let loan = loans
        .get_mut(&loan_id)
        .ok_or_else(|| format!("loan {} is not active on this item", loan_id))?;
    if loan.state.is_terminal() {
        return Err(format!("loan {} is already {}", loan_id, loan.state));
    }
    Ok(loan)
}

/// Item status after a step.
///
/// A holding loan decides it. Otherwise the plan's informational status
/// wins; an item that had no holding loan keeps a sticky `InTransit` or
/// `Missing`; everything else is back on shelf.
fn resulting_status(
    holding: Option<LoanState>,
    informational: Option<ItemStatus>,
    ctx: &CirculationContext,
    action: CirculationAction,
) -> ItemStatus {
    if let Some(status) = holding.and_then(ItemStatus::for_holding) {
        return status;
    }
    if let Some(status) = informational {
        return status;
    }
    let previous = ctx.item.status;
    let had_holding = ctx.queue.holding().is_some();
    match previous {
        ItemStatus::Missing if action != CirculationAction::Checkin => ItemStatus::Missing,
        ItemStatus::InTransit if !had_holding => ItemStatus::InTransit,
        _ => ItemStatus::OnShelf,
    }
}

/// Result of applying a plan, ready to commit
#[derive(Debug, Clone)]
pub struct AppliedPlan {
    pub status: ItemStatus,
    /// Created and updated loans in their final state
    pub loans: Vec<Loan>,
    pub log: Vec<ActionLogEntry>,
}

impl AppliedPlan {
    /// Whether committing would change nothing
    pub fn is_empty(&self, current: ItemStatus) -> bool {
        self.loans.is_empty() && self.status == current
    }
}

// ---------------------------------------------------------------------------
// Decision
// ---------------------------------------------------------------------------

/// Outcome of a decision table
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Applied(Plan),
    /// Legitimate no-op; stops any further cascade
    NoOp(String),
    /// Refused by the policy gate or a guard
    Denied(Vec<String>),
    /// Action undefined for the current loan states
    Invalid(String),
}

impl Decision {
    pub fn noop(reason: impl Into<String>) -> Self {
        Decision::NoOp(reason.into())
    }

    pub fn denied(reason: impl Into<String>) -> Self {
        Decision::Denied(vec![reason.into()])
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        Decision::Invalid(reason.into())
    }

    pub(crate) fn not_permitted(action: CirculationAction) -> Self {
        Decision::denied(format!("{} is not permitted by circulation policy", action))
    }

    pub(crate) fn unresolved(location_id: i32) -> Self {
        Decision::invalid(format!("location {} was not resolved", location_id))
    }

    pub(crate) fn inactive_loan(loan_id: LoanId, item_id: i32) -> Self {
        Decision::invalid(format!("loan {} is not active on item {}", loan_id, item_id))
    }

    /// The plan, or the error a caller sees for a rejected action
    pub fn into_plan(self) -> Result<Plan, AppError> {
        match self {
            Decision::Applied(plan) => Ok(plan),
            Decision::NoOp(reason) => Err(AppError::NoActionPerformed(reason)),
            Decision::Denied(reasons) => Err(AppError::ActionDenied(reasons)),
            Decision::Invalid(reason) => Err(AppError::InvalidTransition(reason)),
        }
    }
}

// ---------------------------------------------------------------------------
// CirculationContext
// ---------------------------------------------------------------------------

/// Everything a decision reads, taken from one aggregate read
#[derive(Debug, Clone)]
pub struct CirculationContext {
    pub item: Item,
    pub queue: RequestQueue,
    /// Item, transaction, pickup and loan locations, resolved
    pub locations: LocationMap,
    /// Schedules of the resolved libraries that keep one
    pub schedules: HashMap<i32, LibrarySchedule>,
    pub settings: CirculationConfig,
    pub now: DateTime<Utc>,
    /// Answer of the policy gate; always true for cascaded steps
    pub permitted: bool,
}

impl CirculationContext {
    pub fn library_of(&self, location_id: i32) -> Option<i32> {
        self.locations.get(&location_id).map(|l| l.library_id)
    }

    pub fn item_library(&self) -> Option<i32> {
        self.library_of(self.item.location_id)
    }

    /// Compare the item's library with a transaction and a pickup library
    pub fn compare(&self, transaction_location_id: i32, pickup_location_id: i32) -> Option<Comparison> {
        Some(Comparison::of(
            self.item_library()?,
            self.library_of(transaction_location_id)?,
            self.library_of(pickup_location_id)?,
        ))
    }

    pub fn is_pickup(&self, location_id: i32) -> bool {
        self.locations
            .get(&location_id)
            .map_or(false, |l| l.is_pickup)
    }

    /// Schedule of the library owning a location
    pub fn schedule_for(&self, location_id: i32) -> Option<&LibrarySchedule> {
        self.library_of(location_id)
            .and_then(|library_id| self.schedules.get(&library_id))
    }
}

/// Decide one circulation action
pub fn decide(request: &CirculationRequest, ctx: &CirculationContext) -> Decision {
    let decision = if ctx.queue.holding_count() > 1 {
        Decision::invalid(format!(
            "item {} carries {} holding loans",
            ctx.item.id,
            ctx.queue.holding_count()
        ))
    } else {
        match request {
            CirculationRequest::Checkout(params) => checkout::decide_checkout(ctx, params),
            CirculationRequest::Checkin(params) => checkin::decide_checkin(ctx, params),
            CirculationRequest::Request(params) => request::decide_request(ctx, params),
            CirculationRequest::CancelRequest { loan_id } => {
                cancel::decide_cancel_request(ctx, *loan_id)
            }
            CirculationRequest::Cancel { loan_id } => cancel::decide_cancel(ctx, *loan_id),
            CirculationRequest::Extend { loan_id } => extend::decide_extend(ctx, *loan_id),
            CirculationRequest::Validate {
                loan_id,
                transaction_location_id,
            } => transit::decide_validate(ctx, *loan_id, *transaction_location_id),
            CirculationRequest::Receive {
                loan_id,
                transaction_location_id,
            } => transit::decide_receive(ctx, *loan_id, *transaction_location_id),
        }
    };

    match &decision {
        Decision::Applied(plan) => {
            tracing::debug!("{} on item {}: {}", request, ctx.item.id, plan.case)
        }
        other => tracing::debug!("{} on item {}: {:?}", request, ctx.item.id, other),
    }
    decision
}
