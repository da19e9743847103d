//! In-memory repository, used by tests and single-process embedders

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{CirculationStore, LibraryCalendar, LocationResolver, Reindexer};
use crate::{
    error::{AppError, AppResult},
    models::{
        AggregateCommit, Item, ItemAggregate, Library, LibrarySchedule, Loan, LoanId, LoanState,
        Location,
    },
};

#[derive(Default)]
struct MemoryState {
    items: HashMap<i32, Item>,
    loans: HashMap<LoanId, Loan>,
    locations: HashMap<i32, Location>,
    libraries: HashMap<i32, Library>,
    schedules: HashMap<i32, LibrarySchedule>,
    reindexed: Vec<i32>,
}

impl MemoryState {
    fn item_loans(&self, item_id: i32, states: &[LoanState]) -> Vec<Loan> {
        let mut loans: Vec<Loan> = self
            .loans
            .values()
            .filter(|l| l.item_id == item_id && states.contains(&l.state))
            .cloned()
            .collect();
        loans.sort_by(|a, b| {
            a.creation_date
                .cmp(&b.creation_date)
                .then_with(|| a.id.cmp(&b.id))
        });
        loans
    }

    fn aggregate(&self, item_id: i32) -> AppResult<ItemAggregate> {
        let item = self
            .items
            .get(&item_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Item with id {} not found", item_id)))?;
        Ok(ItemAggregate {
            loans: self.item_loans(item_id, &LoanState::ACTIVE),
            item,
        })
    }
}

/// Shared in-memory store; clones see the same data
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_library(&self, library: Library) {
        self.state.write().await.libraries.insert(library.id, library);
    }

    pub async fn add_location(&self, location: Location) {
        self.state.write().await.locations.insert(location.id, location);
    }

    pub async fn add_item(&self, item: Item) {
        self.state.write().await.items.insert(item.id, item);
    }

    /// Insert a loan as-is, bypassing circulation
    pub async fn add_loan(&self, loan: Loan) {
        self.state.write().await.loans.insert(loan.id, loan);
    }

    pub async fn set_schedule(&self, schedule: LibrarySchedule) {
        self.state
            .write()
            .await
            .schedules
            .insert(schedule.library_id, schedule);
    }

    pub async fn item(&self, item_id: i32) -> Option<Item> {
        self.state.read().await.items.get(&item_id).cloned()
    }

    /// Every loan ever attached to the item, terminal ones included
    pub async fn loan_history(&self, item_id: i32) -> Vec<Loan> {
        let mut all = LoanState::ACTIVE.to_vec();
        all.extend([LoanState::ItemReturned, LoanState::Cancelled]);
        self.state.read().await.item_loans(item_id, &all)
    }

    /// Bump the item version as a concurrent writer would
    pub async fn touch(&self, item_id: i32) -> AppResult<()> {
        let mut state = self.state.write().await;
        let item = state
            .items
            .get_mut(&item_id)
            .ok_or_else(|| AppError::NotFound(format!("Item with id {} not found", item_id)))?;
        item.version += 1;
        Ok(())
    }

    /// Item ids passed to `reindex_item`, in call order
    pub async fn reindexed(&self) -> Vec<i32> {
        self.state.read().await.reindexed.clone()
    }
}

#[async_trait]
impl CirculationStore for MemoryStore {
    async fn load(&self, item_id: i32) -> AppResult<ItemAggregate> {
        self.state.read().await.aggregate(item_id)
    }

    async fn get_loan(&self, loan_id: LoanId) -> AppResult<Loan> {
        self.state
            .read()
            .await
            .loans
            .get(&loan_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", loan_id)))
    }

    async fn list_loans(&self, item_id: i32, states: &[LoanState]) -> AppResult<Vec<Loan>> {
        Ok(self.state.read().await.item_loans(item_id, states))
    }

    async fn commit(&self, commit: AggregateCommit) -> AppResult<ItemAggregate> {
        let mut state = self.state.write().await;

        let item = state.items.get_mut(&commit.item_id).ok_or_else(|| {
            AppError::NotFound(format!("Item with id {} not found", commit.item_id))
        })?;
        if item.version != commit.expected_version {
            return Err(AppError::ConcurrencyConflict(format!(
                "item {} is at version {}, expected {}",
                commit.item_id, item.version, commit.expected_version
            )));
        }
        if let Some(loan) = commit.loans.iter().find(|l| l.item_id != commit.item_id) {
            return Err(AppError::Internal(format!(
                "loan {} belongs to item {}, not {}",
                loan.id, loan.item_id, commit.item_id
            )));
        }

        item.status = commit.status;
        item.version += 1;
        for loan in commit.loans {
            state.loans.insert(loan.id, loan);
        }

        state.aggregate(commit.item_id)
    }
}

#[async_trait]
impl LocationResolver for MemoryStore {
    async fn location(&self, location_id: i32) -> AppResult<Option<Location>> {
        Ok(self.state.read().await.locations.get(&location_id).cloned())
    }

    async fn library(&self, library_id: i32) -> AppResult<Option<Library>> {
        Ok(self.state.read().await.libraries.get(&library_id).cloned())
    }
}

#[async_trait]
impl LibraryCalendar for MemoryStore {
    async fn schedule(&self, library_id: i32) -> AppResult<Option<LibrarySchedule>> {
        Ok(self.state.read().await.schedules.get(&library_id).cloned())
    }
}

#[async_trait]
impl Reindexer for MemoryStore {
    async fn reindex_item(&self, item_id: i32) -> AppResult<()> {
        tracing::debug!("Reindexing item {}", item_id);
        self.state.write().await.reindexed.push(item_id);
        Ok(())
    }
}
