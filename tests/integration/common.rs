//! Shared fixture: three libraries and one item owned by library 1
//!
//! | Location | Library | Pickup point |
//! |----------|---------|--------------|
//! | 10       | 1       | no           |
//! | 11       | 1       | yes          |
//! | 20       | 2       | yes          |
//! | 30       | 3       | yes          |

use std::sync::Arc;

use chrono::{Duration, Utc};
use uuid::Uuid;

use elidune_circulation::{
    config::CirculationConfig,
    models::{Item, ItemStatus, Library, Loan, LoanState, Location},
    repository::{MemoryStore, Repository},
    services::{AllowAll, CirculationService, PolicyGate},
};

pub const ITEM: i32 = 1;
pub const HOME: i32 = 10;
pub const HOME_DESK: i32 = 11;
pub const BRANCH: i32 = 20;
pub const REMOTE: i32 = 30;

pub async fn seeded_store() -> MemoryStore {
    let store = MemoryStore::new();
    for (library_id, pickup) in [(1, HOME_DESK), (2, BRANCH), (3, REMOTE)] {
        store
            .add_library(Library {
                id: library_id,
                name: format!("Library {}", library_id),
                pickup_location_id: Some(pickup),
            })
            .await;
    }
    for (id, library_id) in [(HOME, 1), (HOME_DESK, 1), (BRANCH, 2), (REMOTE, 3)] {
        store
            .add_location(Location {
                id,
                library_id,
                name: format!("Location {}", id),
                is_pickup: id != HOME,
            })
            .await;
    }
    store
        .add_item(Item::new(ITEM, HOME).with_barcode("ELI-0001"))
        .await;
    store
}

pub struct Fixture {
    pub store: MemoryStore,
    pub service: CirculationService,
}

pub async fn fixture() -> Fixture {
    let store = seeded_store().await;
    let service = service_for(Repository::in_memory(&store), Arc::new(AllowAll));
    Fixture { store, service }
}

pub fn service_for(repository: Repository, policy: Arc<dyn PolicyGate>) -> CirculationService {
    CirculationService::new(repository, policy, CirculationConfig::default())
}

impl Fixture {
    /// Insert a loan directly, `age` minutes old, with the item status it
    /// implies
    pub async fn seed(&self, patron_id: i32, state: LoanState, pickup: i32, age: i64) -> Loan {
        let loan = Loan {
            id: Uuid::new_v4(),
            item_id: ITEM,
            patron_id,
            state,
            pickup_location_id: pickup,
            transaction_location_id: pickup,
            creation_date: Utc::now() - Duration::minutes(age),
            transaction_date: None,
            end_date: (state == LoanState::ItemOnLoan).then(|| Utc::now() + Duration::days(7)),
            extension_count: 0,
        };
        self.store.add_loan(loan.clone()).await;
        if let Some(status) = ItemStatus::for_holding(state) {
            self.set_status(status).await;
        }
        loan
    }

    pub async fn set_status(&self, status: ItemStatus) {
        let item = self.store.item(ITEM).await.unwrap();
        self.store.add_item(item.with_status(status)).await;
    }

    pub async fn item(&self) -> Item {
        self.store.item(ITEM).await.unwrap()
    }

    pub async fn loan(&self, loan: &Loan) -> Loan {
        self.store
            .loan_history(ITEM)
            .await
            .into_iter()
            .find(|l| l.id == loan.id)
            .unwrap()
    }

    /// Loans of the item by patron, terminal ones included
    pub async fn loans_of(&self, patron_id: i32) -> Vec<Loan> {
        self.store
            .loan_history(ITEM)
            .await
            .into_iter()
            .filter(|l| l.patron_id == patron_id)
            .collect()
    }

    /// At most one holding loan, and the item status agrees with it
    pub async fn assert_consistent(&self) {
        let history = self.store.loan_history(ITEM).await;
        let holding: Vec<&Loan> = history.iter().filter(|l| l.state.is_holding()).collect();
        assert!(
            holding.len() <= 1,
            "item carries {} holding loans: {:?}",
            holding.len(),
            holding
        );
        if let Some(loan) = holding.first() {
            assert_eq!(
                Some(self.item().await.status),
                ItemStatus::for_holding(loan.state)
            );
        }
    }
}
