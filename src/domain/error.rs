use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("tenant `{domain}` has invalid {field}: {reason}")]
    InvalidTenant {
        domain: String,
        field: &'static str,
        reason: String,
    },
}

impl DomainError {
    pub fn invalid_tenant(
        domain: impl Into<String>,
        field: &'static str,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidTenant {
            domain: domain.into(),
            field,
            reason: reason.into(),
        }
    }
}
