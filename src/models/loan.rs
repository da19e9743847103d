//! Loan model and action parameters

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{CirculationAction, LoanState};

pub type LoanId = Uuid;

/// One request/checkout episode between a patron and an item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Loan {
    pub id: LoanId,
    pub item_id: i32,
    pub patron_id: i32,
    pub state: LoanState,
    /// Where the patron collects the item
    pub pickup_location_id: i32,
    /// Where the last physical hand-off happened
    pub transaction_location_id: i32,
    /// FIFO key of the request queue
    pub creation_date: DateTime<Utc>,
    pub transaction_date: Option<DateTime<Utc>>,
    /// Due date, set on checkout and moved by extensions
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub extension_count: i16,
}

impl Loan {
    pub fn is_active(&self) -> bool {
        !self.state.is_terminal()
    }
}

/// Data for a loan created by a circulation step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateLoan {
    pub item_id: i32,
    pub patron_id: i32,
    pub state: LoanState,
    pub pickup_location_id: i32,
    pub transaction_location_id: i32,
    pub end_date: Option<DateTime<Utc>>,
}

/// Checkout request
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CheckoutParams {
    pub patron_id: i32,
    pub transaction_location_id: i32,
    /// Loan the checkout fulfils (an at-desk or in-transit request)
    pub loan_id: Option<LoanId>,
    /// Requested due date; defaults to the configured loan duration
    pub end_date: Option<DateTime<Utc>>,
}

/// Checkin request
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CheckinParams {
    pub transaction_location_id: i32,
}

/// Place-request request
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RequestParams {
    pub patron_id: i32,
    /// Location where the request is recorded
    pub transaction_location_id: i32,
    /// Defaults to the transaction library's pickup point
    pub pickup_location_id: Option<i32>,
}

/// One entry of the ordered audit log returned by every circulation call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionLogEntry {
    pub action: CirculationAction,
    pub loan: Loan,
}
