//! Circulation services

pub mod circulation;
pub mod comparator;
pub mod due_date;
pub mod orchestrator;
pub mod policy;
pub mod queue;

use std::sync::Arc;

use validator::Validate;

use crate::{config::AppConfig, error::AppResult, repository::Repository};

pub use orchestrator::{CascadeFailure, CirculationReport, CirculationService};
pub use policy::{AllowAll, PolicyGate};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub circulation: CirculationService,
}

impl Services {
    /// Create all services with the given repository and policy gate
    pub fn new(
        repository: Repository,
        policy: Arc<dyn PolicyGate>,
        config: &AppConfig,
    ) -> AppResult<Self> {
        config.validate()?;
        Ok(Self {
            circulation: CirculationService::new(repository, policy, config.circulation.clone()),
        })
    }
}
