//! Tenant rows as they come out of the store.

/// One row of the `imageboards` table, matched by domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantRecord {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub adult: bool,
    pub api_base: String,
    pub image_base: String,
    pub style_sheet: String,
    pub logo_path: String,
    pub discord_invite_url: String,
}

/// Another tenant in the network, listed in the cross-site menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiblingTenant {
    pub title: String,
    pub address: String,
}

impl SiblingTenant {
    pub fn new(title: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            address: address.into(),
        }
    }
}
