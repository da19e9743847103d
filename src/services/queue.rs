//! Request queue view: the non-terminal loans of one item, oldest first

use indexmap::IndexMap;

use crate::models::{Loan, LoanId, LoanState};

/// Holding loan of an item, the dispatch key of every decision table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoldingState {
    None,
    AtDesk,
    OnLoan,
    InTransitForPickup,
    InTransitToHouse,
}

impl HoldingState {
    pub fn of(state: Option<LoanState>) -> Self {
        match state {
            Some(LoanState::ItemAtDesk) => HoldingState::AtDesk,
            Some(LoanState::ItemOnLoan) => HoldingState::OnLoan,
            Some(LoanState::ItemInTransitForPickup) => HoldingState::InTransitForPickup,
            Some(LoanState::ItemInTransitToHouse) => HoldingState::InTransitToHouse,
            _ => HoldingState::None,
        }
    }
}

/// Snapshot of an item's active loans in creation order.
///
/// Built from a single aggregate read, so every decision taken from it sees
/// one consistent state-set.
#[derive(Debug, Clone, Default)]
pub struct RequestQueue {
    loans: IndexMap<LoanId, Loan>,
}

impl RequestQueue {
    pub fn new(loans: impl IntoIterator<Item = Loan>) -> Self {
        let mut loans: IndexMap<LoanId, Loan> = loans
            .into_iter()
            .filter(Loan::is_active)
            .map(|l| (l.id, l))
            .collect();
        loans.sort_by(|_, a, _, b| {
            a.creation_date
                .cmp(&b.creation_date)
                .then_with(|| a.id.cmp(&b.id))
        });
        Self { loans }
    }

    pub fn get(&self, loan_id: LoanId) -> Option<&Loan> {
        self.loans.get(&loan_id)
    }

    pub fn loans(&self) -> impl Iterator<Item = &Loan> {
        self.loans.values()
    }

    /// Loans in `state`, oldest first
    pub fn in_state(&self, state: LoanState) -> impl Iterator<Item = &Loan> {
        self.loans.values().filter(move |l| l.state == state)
    }

    pub fn holding(&self) -> Option<&Loan> {
        self.loans.values().find(|l| l.state.is_holding())
    }

    pub fn holding_count(&self) -> usize {
        self.loans.values().filter(|l| l.state.is_holding()).count()
    }

    pub fn holding_state(&self) -> HoldingState {
        HoldingState::of(self.holding().map(|l| l.state))
    }

    pub fn pending(&self) -> impl Iterator<Item = &Loan> {
        self.in_state(LoanState::Pending)
    }

    pub fn first_pending(&self) -> Option<&Loan> {
        self.pending().next()
    }

    pub fn has_pending(&self) -> bool {
        self.first_pending().is_some()
    }

    /// The patron's active loan on this item, if any
    pub fn patron_loan(&self, patron_id: i32) -> Option<&Loan> {
        self.loans.values().find(|l| l.patron_id == patron_id)
    }

    /// The same view with one loan left out
    pub fn without(&self, loan_id: LoanId) -> Self {
        let mut loans = self.loans.clone();
        loans.shift_remove(&loan_id);
        Self { loans }
    }
}
