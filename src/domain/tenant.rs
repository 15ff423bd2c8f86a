//! Resolved tenant configuration handed to the renderer.

use super::{
    entities::{SiblingTenant, TenantRecord},
    error::DomainError,
};

/// Everything the shell page needs to know about one imageboard.
///
/// Built once per host by the site cache and shared read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantConfig {
    pub id: u32,
    pub api_base: String,
    pub image_base: String,
    pub title: String,
    pub description: String,
    pub is_adult_content: bool,
    pub style_sheet: String,
    pub logo_path: String,
    /// Path prefix for the client router. Empty for root-domain tenants.
    pub base_path: String,
    /// Empty when the tenant has no invite link configured.
    pub discord_invite_url: String,
    pub sibling_tenants: Vec<SiblingTenant>,
}

impl TenantConfig {
    /// Combine the primary row for `domain` with its sibling listing.
    pub fn assemble(
        domain: &str,
        record: TenantRecord,
        sibling_tenants: Vec<SiblingTenant>,
    ) -> Result<Self, DomainError> {
        let id = u32::try_from(record.id)
            .ok()
            .filter(|id| *id > 0)
            .ok_or_else(|| {
                DomainError::invalid_tenant(domain, "id", format!("`{}` is not positive", record.id))
            })?;

        Ok(Self {
            id,
            api_base: record.api_base,
            image_base: record.image_base,
            title: record.title,
            description: record.description,
            is_adult_content: record.adult,
            style_sheet: record.style_sheet,
            logo_path: record.logo_path,
            base_path: String::new(),
            discord_invite_url: record.discord_invite_url,
            sibling_tenants,
        })
    }

    pub fn has_discord(&self) -> bool {
        !self.discord_invite_url.is_empty()
    }
}
