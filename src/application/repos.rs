//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::entities::{SiblingTenant, TenantRecord};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }

    pub fn unavailable(err: impl std::fmt::Display) -> Self {
        Self::Unavailable(err.to_string())
    }
}

/// Read access to the tenant table.
#[async_trait]
pub trait TenantsRepo: Send + Sync {
    /// Look up the tenant bound to `domain`. `Ok(None)` means no row matched.
    async fn find_by_domain(&self, domain: &str) -> Result<Option<TenantRecord>, RepoError>;

    /// Every tenant except `exclude_id`, in the order the store returns them.
    async fn list_siblings(&self, exclude_id: i32) -> Result<Vec<SiblingTenant>, RepoError>;
}
