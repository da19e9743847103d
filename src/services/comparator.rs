//! Location/library comparator
//!
//! Routing decisions compare libraries, never raw locations: two desks of the
//! same library are the same place for circulation.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use crate::{
    error::{AppError, AppResult},
    models::Location,
    repository::LocationResolver,
};

/// The three library identities every routing decision is taken from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Comparison {
    pub item_eq_transaction: bool,
    pub transaction_eq_pickup: bool,
    pub item_eq_pickup: bool,
}

impl Comparison {
    pub fn of(item_library: i32, transaction_library: i32, pickup_library: i32) -> Self {
        Self {
            item_eq_transaction: item_library == transaction_library,
            transaction_eq_pickup: transaction_library == pickup_library,
            item_eq_pickup: item_library == pickup_library,
        }
    }
}

/// Resolved locations, keyed by location id
pub type LocationMap = HashMap<i32, Location>;

#[derive(Clone)]
pub struct LibraryComparator {
    locations: Arc<dyn LocationResolver>,
}

impl LibraryComparator {
    pub fn new(locations: Arc<dyn LocationResolver>) -> Self {
        Self { locations }
    }

    /// Resolve a location; an unknown one is a configuration error
    pub async fn location(&self, location_id: i32) -> AppResult<Location> {
        self.locations.location(location_id).await?.ok_or_else(|| {
            AppError::Configuration(format!("Location {} cannot be resolved", location_id))
        })
    }

    pub async fn library_of(&self, location_id: i32) -> AppResult<i32> {
        Ok(self.location(location_id).await?.library_id)
    }

    /// Pickup point of the library owning the transaction location
    pub async fn default_pickup(&self, transaction_location_id: i32) -> AppResult<i32> {
        let library_id = self.library_of(transaction_location_id).await?;
        let library = self.locations.library(library_id).await?.ok_or_else(|| {
            AppError::Configuration(format!("Library {} cannot be resolved", library_id))
        })?;
        library.pickup_location_id.ok_or_else(|| {
            AppError::Configuration(format!("Library {} has no pickup location", library.id))
        })
    }

    /// Resolve every given location once
    pub async fn resolve_all(
        &self,
        location_ids: impl IntoIterator<Item = i32>,
    ) -> AppResult<LocationMap> {
        let mut resolved = LocationMap::new();
        for id in location_ids {
            if !resolved.contains_key(&id) {
                let location = self.location(id).await?;
                resolved.insert(id, location);
            }
        }
        Ok(resolved)
    }
}
