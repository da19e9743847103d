//! Repository layer: the stores and resolvers circulation reads and writes
//!
//! Persistence technology is left to the embedder; the engine only talks to
//! these traits. `memory` provides a complete in-process implementation.

pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    error::AppResult,
    models::{
        AggregateCommit, ItemAggregate, Library, LibrarySchedule, Loan, LoanId, LoanState,
        Location,
    },
};

pub use memory::MemoryStore;

/// Item and loan storage with optimistic versioning on the item aggregate
#[async_trait]
pub trait CirculationStore: Send + Sync {
    /// Read an item with all its non-terminal loans, oldest loan first
    async fn load(&self, item_id: i32) -> AppResult<ItemAggregate>;

    async fn get_loan(&self, loan_id: LoanId) -> AppResult<Loan>;

    /// Loans of an item in the given states, ordered by creation date
    async fn list_loans(&self, item_id: i32, states: &[LoanState]) -> AppResult<Vec<Loan>>;

    /// Write item status and loans as one unit.
    ///
    /// Fails with `AppError::ConcurrencyConflict` when the item version is no
    /// longer `commit.expected_version`; nothing is written in that case.
    async fn commit(&self, commit: AggregateCommit) -> AppResult<ItemAggregate>;
}

/// Location to library resolution
#[async_trait]
pub trait LocationResolver: Send + Sync {
    async fn location(&self, location_id: i32) -> AppResult<Option<Location>>;

    async fn library(&self, library_id: i32) -> AppResult<Option<Library>>;
}

/// Library opening days, used to move due dates off closed days
#[async_trait]
pub trait LibraryCalendar: Send + Sync {
    /// `None` means the library keeps no schedule and is always open
    async fn schedule(&self, library_id: i32) -> AppResult<Option<LibrarySchedule>>;
}

/// Search index refresh, called after every committed step
#[async_trait]
pub trait Reindexer: Send + Sync {
    async fn reindex_item(&self, item_id: i32) -> AppResult<()>;
}

/// Main repository struct holding the external collaborators
#[derive(Clone)]
pub struct Repository {
    pub store: Arc<dyn CirculationStore>,
    pub locations: Arc<dyn LocationResolver>,
    pub calendar: Arc<dyn LibraryCalendar>,
    pub indexer: Arc<dyn Reindexer>,
}

impl Repository {
    pub fn new(
        store: Arc<dyn CirculationStore>,
        locations: Arc<dyn LocationResolver>,
        calendar: Arc<dyn LibraryCalendar>,
        indexer: Arc<dyn Reindexer>,
    ) -> Self {
        Self {
            store,
            locations,
            calendar,
            indexer,
        }
    }

    /// Repository whose every collaborator is the given in-memory store
    pub fn in_memory(store: &MemoryStore) -> Self {
        Self::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(store.clone()),
        )
    }

    /// Replace the reindexer
    pub fn with_indexer(mut self, indexer: Arc<dyn Reindexer>) -> Self {
        self.indexer = indexer;
        self
    }

    /// Replace the circulation store
    pub fn with_store(mut self, store: Arc<dyn CirculationStore>) -> Self {
        self.store = store;
        self
    }
}
