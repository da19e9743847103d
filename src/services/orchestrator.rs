//! Circulation service: drives the decision tables against the repository
//!
//! Each step reads the item aggregate, decides, applies and commits the plan
//! against the version it read. Cascaded requests are queued and run as
//! separate steps afterwards; their failures are logged and reported without
//! undoing what the primary step committed.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;

use super::{
    circulation::{self, CirculationContext, CirculationRequest},
    comparator::LibraryComparator,
    policy::PolicyGate,
    queue::RequestQueue,
};
use crate::{
    config::CirculationConfig,
    error::{AppError, AppResult},
    models::{
        ActionLogEntry, AggregateCommit, CheckinParams, CheckoutParams, CirculationAction, Item,
        ItemAggregate, LoanId, RequestParams,
    },
    repository::Repository,
};

/// A cascaded step that could not be carried out
#[derive(Debug, Clone, Serialize)]
pub struct CascadeFailure {
    pub step: String,
    pub error: String,
}

/// Result of one circulation call
#[derive(Debug, Clone, Serialize)]
pub struct CirculationReport {
    /// Item as last committed
    pub item: Item,
    /// Applied actions, primary step first
    pub actions: Vec<ActionLogEntry>,
    pub cascade_failures: Vec<CascadeFailure>,
}

/// What one committed (or unchanged) step left behind
struct StepOutcome {
    item: Item,
    log: Vec<ActionLogEntry>,
    cascades: Vec<CirculationRequest>,
}

#[derive(Clone)]
pub struct CirculationService {
    repository: Repository,
    comparator: LibraryComparator,
    policy: Arc<dyn PolicyGate>,
    settings: CirculationConfig,
}

impl CirculationService {
    pub fn new(
        repository: Repository,
        policy: Arc<dyn PolicyGate>,
        settings: CirculationConfig,
    ) -> Self {
        Self {
            comparator: LibraryComparator::new(repository.locations.clone()),
            repository,
            policy,
            settings,
        }
    }

    /// Check an item out to a patron
    pub async fn checkout(
        &self,
        item_id: i32,
        params: CheckoutParams,
    ) -> AppResult<CirculationReport> {
        if let Some(loan_id) = params.loan_id {
            self.ensure_loan_on_item(item_id, loan_id).await?;
        }
        self.run(item_id, CirculationRequest::Checkout(params)).await
    }

    /// Check an item in at a transaction location
    pub async fn checkin(&self, item_id: i32, params: CheckinParams) -> AppResult<CirculationReport> {
        self.run(item_id, CirculationRequest::Checkin(params)).await
    }

    /// Place a request; without a pickup location the transaction library's
    /// pickup point is used
    pub async fn request(
        &self,
        item_id: i32,
        mut params: RequestParams,
    ) -> AppResult<CirculationReport> {
        if params.pickup_location_id.is_none() {
            params.pickup_location_id = Some(
                self.comparator
                    .default_pickup(params.transaction_location_id)
                    .await?,
            );
        }
        self.run(item_id, CirculationRequest::Request(params)).await
    }

    /// Cancel a patron's request
    pub async fn cancel_request(
        &self,
        item_id: i32,
        loan_id: LoanId,
    ) -> AppResult<CirculationReport> {
        self.ensure_loan_on_item(item_id, loan_id).await?;
        self.run(item_id, CirculationRequest::CancelRequest { loan_id })
            .await
    }

    /// Extend a loan; without a loan id the item's current checkout is used
    pub async fn extend(
        &self,
        item_id: i32,
        loan_id: Option<LoanId>,
    ) -> AppResult<CirculationReport> {
        if let Some(loan_id) = loan_id {
            self.ensure_loan_on_item(item_id, loan_id).await?;
        }
        self.run(item_id, CirculationRequest::Extend { loan_id })
            .await
    }

    /// Validate a pending request from a transaction location
    pub async fn validate_request(
        &self,
        item_id: i32,
        loan_id: LoanId,
        transaction_location_id: i32,
    ) -> AppResult<CirculationReport> {
        self.ensure_loan_on_item(item_id, loan_id).await?;
        self.run(
            item_id,
            CirculationRequest::Validate {
                loan_id,
                transaction_location_id,
            },
        )
        .await
    }

    /// Receive an item in transit
    pub async fn receive(
        &self,
        item_id: i32,
        loan_id: LoanId,
        transaction_location_id: Option<i32>,
    ) -> AppResult<CirculationReport> {
        self.ensure_loan_on_item(item_id, loan_id).await?;
        self.run(
            item_id,
            CirculationRequest::Receive {
                loan_id,
                transaction_location_id,
            },
        )
        .await
    }

    async fn ensure_loan_on_item(&self, item_id: i32, loan_id: LoanId) -> AppResult<()> {
        let loan = self.repository.store.get_loan(loan_id).await?;
        if loan.item_id != item_id {
            return Err(AppError::Validation(format!(
                "Loan {} belongs to item {}, not {}",
                loan_id, loan.item_id, item_id
            )));
        }
        Ok(())
    }

    /// Run a primary step, then drain its cascades
    async fn run(&self, item_id: i32, request: CirculationRequest) -> AppResult<CirculationReport> {
        let primary = self.step(item_id, &request, true).await?;

        let mut report = CirculationReport {
            item: primary.item,
            actions: primary.log,
            cascade_failures: Vec::new(),
        };
        let mut pending: VecDeque<CirculationRequest> = primary.cascades.into();
        let mut steps = 0;

        while let Some(next) = pending.pop_front() {
            if steps >= self.settings.max_cascade_steps {
                tracing::error!(
                    "Cascade of {} on item {} stopped after {} steps, {} left",
                    request,
                    item_id,
                    steps,
                    pending.len() + 1
                );
                report.cascade_failures.push(CascadeFailure {
                    step: next.to_string(),
                    error: format!("cascade limit of {} steps reached", steps),
                });
                break;
            }
            steps += 1;

            match self.step(item_id, &next, false).await {
                Ok(outcome) => {
                    report.item = outcome.item;
                    report.actions.extend(outcome.log);
                    pending.extend(outcome.cascades);
                }
                Err(AppError::NoActionPerformed(reason)) => {
                    tracing::debug!("Cascaded {} on item {}: {}", next, item_id, reason);
                }
                Err(e) => {
                    tracing::warn!("Cascaded {} on item {} failed: {}", next, item_id, e);
                    report.cascade_failures.push(CascadeFailure {
                        step: next.to_string(),
                        error: e.to_string(),
                    });
                }
            }
        }

        Ok(report)
    }

    /// Decide and commit one request against a fresh read of the item
    async fn step(
        &self,
        item_id: i32,
        request: &CirculationRequest,
        primary: bool,
    ) -> AppResult<StepOutcome> {
        let aggregate = self.repository.store.load(item_id).await?;
        let expected_version = aggregate.version();
        let ctx = self.context(aggregate, request, primary).await?;

        let plan = circulation::decide(request, &ctx).into_plan()?;
        let applied = plan
            .apply(&ctx, request.action())
            .map_err(AppError::InvalidTransition)?;

        if applied.is_empty(ctx.item.status) {
            tracing::debug!("{} on item {} ({}) changed nothing", request, item_id, plan.case);
            return Ok(StepOutcome {
                item: ctx.item,
                log: Vec::new(),
                cascades: plan.cascades,
            });
        }

        let status = applied.status;
        let committed = self
            .repository
            .store
            .commit(AggregateCommit {
                item_id,
                expected_version,
                status,
                loans: applied.loans,
            })
            .await?;
        tracing::info!(
            "{} on item {} ({}): {} loan change(s), item {}",
            request,
            item_id,
            plan.case,
            applied.log.len(),
            status
        );

        if let Err(e) = self.repository.indexer.reindex_item(item_id).await {
            tracing::warn!("Failed to reindex item {}: {}", item_id, e);
        }

        Ok(StepOutcome {
            item: committed.item,
            log: applied.log,
            cascades: plan.cascades,
        })
    }

    async fn context(
        &self,
        aggregate: ItemAggregate,
        request: &CirculationRequest,
        primary: bool,
    ) -> AppResult<CirculationContext> {
        let ItemAggregate { item, loans } = aggregate;

        let mut location_ids = vec![item.location_id];
        for loan in &loans {
            location_ids.push(loan.pickup_location_id);
            location_ids.push(loan.transaction_location_id);
        }
        location_ids.extend(request.location_ids());
        let locations = self.comparator.resolve_all(location_ids).await?;

        let libraries: HashSet<i32> = locations.values().map(|l| l.library_id).collect();
        let mut schedules = HashMap::new();
        for library_id in libraries {
            if let Some(schedule) = self.repository.calendar.schedule(library_id).await? {
                schedules.insert(library_id, schedule);
            }
        }

        let queue = RequestQueue::new(loans);
        let permitted = if primary {
            let patron_id = request.patron_id().or_else(|| {
                let loan = match request.loan_id() {
                    Some(loan_id) => queue.get(loan_id),
                    None if request.action() == CirculationAction::Extend => queue.holding(),
                    None => None,
                };
                loan.map(|l| l.patron_id)
            });
            let location_id = request
                .transaction_location_id()
                .unwrap_or(item.location_id);
            let library_id = locations
                .get(&location_id)
                .map(|l| l.library_id)
                .ok_or_else(|| {
                    AppError::Configuration(format!("Location {} cannot be resolved", location_id))
                })?;
            self.policy
                .can(request.action(), &item, patron_id, library_id)
                .await?
        } else {
            true
        };

        Ok(CirculationContext {
            item,
            queue,
            locations,
            schedules,
            settings: self.settings.clone(),
            now: Utc::now(),
            permitted,
        })
    }
}
