//! Circulation policy gate
//!
//! Whether an action type is permitted at all for an item, patron and library
//! is decided outside the engine; circulation only consumes the answer.

use async_trait::async_trait;

use crate::{
    error::AppResult,
    models::{CirculationAction, Item},
};

#[async_trait]
pub trait PolicyGate: Send + Sync {
    /// `patron_id` is `None` for actions not performed on behalf of a patron
    /// (a plain checkin)
    async fn can(
        &self,
        action: CirculationAction,
        item: &Item,
        patron_id: Option<i32>,
        library_id: i32,
    ) -> AppResult<bool>;
}

/// Gate that permits everything
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

#[async_trait]
impl PolicyGate for AllowAll {
    async fn can(
        &self,
        _action: CirculationAction,
        _item: &Item,
        _patron_id: Option<i32>,
        _library_id: i32,
    ) -> AppResult<bool> {
        Ok(true)
    }
}
