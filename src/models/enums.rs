//! Shared circulation enums (loan states, item statuses, actions)

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// LoanState
// ---------------------------------------------------------------------------

/// Loan lifecycle state.
///
/// `CREATED → {PENDING, ITEM_AT_DESK, ITEM_ON_LOAN} →
/// {ITEM_IN_TRANSIT_FOR_PICKUP, ITEM_IN_TRANSIT_TO_HOUSE} →
/// {ITEM_RETURNED, CANCELLED}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(i16)]
pub enum LoanState {
    Created = 0,
    Pending = 1,
    ItemAtDesk = 2,
    ItemOnLoan = 3,
    ItemInTransitForPickup = 4,
    ItemInTransitToHouse = 5,
    ItemReturned = 6,
    Cancelled = 7,
}

impl LoanState {
    /// States an item can carry at most one of at a time
    pub const HOLDING: [LoanState; 4] = [
        LoanState::ItemAtDesk,
        LoanState::ItemOnLoan,
        LoanState::ItemInTransitForPickup,
        LoanState::ItemInTransitToHouse,
    ];

    /// Every state a loan can still leave
    pub const ACTIVE: [LoanState; 6] = [
        LoanState::Created,
        LoanState::Pending,
        LoanState::ItemAtDesk,
        LoanState::ItemOnLoan,
        LoanState::ItemInTransitForPickup,
        LoanState::ItemInTransitToHouse,
    ];

    pub fn is_terminal(self) -> bool {
        matches!(self, LoanState::ItemReturned | LoanState::Cancelled)
    }

    pub fn is_holding(self) -> bool {
        Self::HOLDING.contains(&self)
    }

    pub fn is_in_transit(self) -> bool {
        matches!(
            self,
            LoanState::ItemInTransitForPickup | LoanState::ItemInTransitToHouse
        )
    }
}

impl From<i16> for LoanState {
    fn from(v: i16) -> Self {
        match v {
            1 => LoanState::Pending,
            2 => LoanState::ItemAtDesk,
            3 => LoanState::ItemOnLoan,
            4 => LoanState::ItemInTransitForPickup,
            5 => LoanState::ItemInTransitToHouse,
            6 => LoanState::ItemReturned,
            7 => LoanState::Cancelled,
            _ => LoanState::Created,
        }
    }
}

impl From<LoanState> for i16 {
    fn from(s: LoanState) -> Self {
        s as i16
    }
}

impl std::fmt::Display for LoanState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            LoanState::Created => "CREATED",
            LoanState::Pending => "PENDING",
            LoanState::ItemAtDesk => "ITEM_AT_DESK",
            LoanState::ItemOnLoan => "ITEM_ON_LOAN",
            LoanState::ItemInTransitForPickup => "ITEM_IN_TRANSIT_FOR_PICKUP",
            LoanState::ItemInTransitToHouse => "ITEM_IN_TRANSIT_TO_HOUSE",
            LoanState::ItemReturned => "ITEM_RETURNED",
            LoanState::Cancelled => "CANCELLED",
        };
        write!(f, "{}", label)
    }
}

// ---------------------------------------------------------------------------
// ItemStatus
// ---------------------------------------------------------------------------

/// Circulation status of an item, recomputed after every action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(i16)]
pub enum ItemStatus {
    OnShelf = 0,
    AtDesk = 1,
    OnLoan = 2,
    InTransit = 3,
    Missing = 4,
}

impl ItemStatus {
    /// Status mirrored by a holding loan, `None` for queue and terminal states
    pub fn for_holding(state: LoanState) -> Option<Self> {
        match state {
            LoanState::ItemAtDesk => Some(ItemStatus::AtDesk),
            LoanState::ItemOnLoan => Some(ItemStatus::OnLoan),
            LoanState::ItemInTransitForPickup | LoanState::ItemInTransitToHouse => {
                Some(ItemStatus::InTransit)
            }
            _ => None,
        }
    }
}

impl Default for ItemStatus {
    fn default() -> Self {
        ItemStatus::OnShelf
    }
}

impl From<i16> for ItemStatus {
    fn from(v: i16) -> Self {
        match v {
            1 => ItemStatus::AtDesk,
            2 => ItemStatus::OnLoan,
            3 => ItemStatus::InTransit,
            4 => ItemStatus::Missing,
            _ => ItemStatus::OnShelf,
        }
    }
}

impl From<ItemStatus> for i16 {
    fn from(s: ItemStatus) -> Self {
        s as i16
    }
}

impl std::fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ItemStatus::OnShelf => "on_shelf",
            ItemStatus::AtDesk => "at_desk",
            ItemStatus::OnLoan => "on_loan",
            ItemStatus::InTransit => "in_transit",
            ItemStatus::Missing => "missing",
        };
        write!(f, "{}", label)
    }
}

// ---------------------------------------------------------------------------
// CirculationAction
// ---------------------------------------------------------------------------

/// Circulation action kinds, as recorded in the action log and passed to the
/// policy gate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CirculationAction {
    Checkout,
    Checkin,
    Request,
    CancelRequest,
    Cancel,
    Extend,
    Validate,
    Receive,
}

impl std::fmt::Display for CirculationAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            CirculationAction::Checkout => "checkout",
            CirculationAction::Checkin => "checkin",
            CirculationAction::Request => "request",
            CirculationAction::CancelRequest => "cancel_request",
            CirculationAction::Cancel => "cancel",
            CirculationAction::Extend => "extend",
            CirculationAction::Validate => "validate",
            CirculationAction::Receive => "receive",
        };
        write!(f, "{}", label)
    }
}
