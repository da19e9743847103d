//! Data models for Elidune circulation

pub mod enums;
pub mod item;
pub mod loan;
pub mod location;
pub mod schedule;

// Re-export commonly used types
pub use enums::{CirculationAction, ItemStatus, LoanState};
pub use item::{AggregateCommit, Item, ItemAggregate};
pub use loan::{
    ActionLogEntry, CheckinParams, CheckoutParams, CreateLoan, Loan, LoanId, RequestParams,
};
pub use location::{Library, Location};
pub use schedule::{LibrarySchedule, ScheduleClosure, ScheduleSlot};
