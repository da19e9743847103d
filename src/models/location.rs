//! Locations and the libraries they belong to

use serde::{Deserialize, Serialize};

/// Physical location (shelf, desk, branch room); belongs to one library
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub id: i32,
    pub library_id: i32,
    pub name: String,
    /// Whether patrons may collect requested items here
    #[serde(default)]
    pub is_pickup: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Library {
    pub id: i32,
    pub name: String,
    /// Pickup point used when a request does not name one
    pub pickup_location_id: Option<i32>,
}
