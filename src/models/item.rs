//! Item (lendable physical copy) model and its circulation aggregate

use serde::{Deserialize, Serialize};

use super::enums::ItemStatus;
use super::loan::Loan;

/// Lendable item as seen by circulation.
///
/// `status` is derived: it is recomputed after every action and never set
/// directly by callers. `version` is bumped on every committed action and is
/// the optimistic concurrency token for the whole item aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: i32,
    pub barcode: Option<String>,
    /// Owning location; its library is the item's home library
    pub location_id: i32,
    pub circulation_category: Option<String>,
    #[serde(default)]
    pub status: ItemStatus,
    #[serde(default)]
    pub version: i64,
}

impl Item {
    pub fn new(id: i32, location_id: i32) -> Self {
        Self {
            id,
            barcode: None,
            location_id,
            circulation_category: None,
            status: ItemStatus::OnShelf,
            version: 0,
        }
    }

    pub fn with_barcode(mut self, barcode: impl Into<String>) -> Self {
        self.barcode = Some(barcode.into());
        self
    }

    pub fn with_status(mut self, status: ItemStatus) -> Self {
        self.status = status;
        self
    }
}

/// An item together with every non-terminal loan attached to it, read as one
/// unit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemAggregate {
    pub item: Item,
    pub loans: Vec<Loan>,
}

impl ItemAggregate {
    pub fn version(&self) -> i64 {
        self.item.version
    }
}

/// Changes produced by one circulation step, written atomically against
/// `expected_version`
#[derive(Debug, Clone)]
pub struct AggregateCommit {
    pub item_id: i32,
    pub expected_version: i64,
    pub status: ItemStatus,
    /// Loans created or updated by the step, in their final state
    pub loans: Vec<Loan>,
}
