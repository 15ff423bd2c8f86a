//! Assembles the view model for the single-page shell.

use serde::Serialize;
use time::OffsetDateTime;

use crate::domain::tenant::TenantConfig;
use crate::presentation::views::{ShellView, SiteLinkView};

/// Static pieces of the shell that do not depend on the tenant.
#[derive(Debug, Clone, Default)]
pub struct ShellAssets {
    pub prim_js: String,
    pub prim_css: String,
    /// Raw markup appended to `<head>`.
    pub head_include: String,
    /// Raw `<li>` entries placed ahead of the sibling links in the nav menu.
    pub navmenu_include: String,
}

#[derive(Debug, Clone)]
pub struct ShellService {
    assets: ShellAssets,
}

impl ShellService {
    pub fn new(assets: ShellAssets) -> Self {
        Self { assets }
    }

    /// Build the view for a render happening now.
    pub fn view(&self, site: &TenantConfig, csrf_token: &str) -> ShellView {
        self.view_at(site, csrf_token, OffsetDateTime::now_utc().unix_timestamp())
    }

    pub fn view_at(&self, site: &TenantConfig, csrf_token: &str, unix_timestamp: i64) -> ShellView {
        ShellView {
            ib_id: site.id,
            base_path: site.base_path.clone(),
            title: site.title.clone(),
            description: site.description.clone(),
            adult: site.is_adult_content,
            style_sheet: site.style_sheet.clone(),
            logo_path: site.logo_path.clone(),
            prim_js: self.assets.prim_js.clone(),
            prim_css: self.assets.prim_css.clone(),
            head_include: self.assets.head_include.clone(),
            navmenu_include: self.assets.navmenu_include.clone(),
            discord_link: discord_link_with_nonce(site, unix_timestamp),
            client_config: client_config_json(site, csrf_token),
            sites: site
                .sibling_tenants
                .iter()
                .map(|sibling| SiteLinkView {
                    title: sibling.title.clone(),
                    href: format!("//{}/", sibling.address),
                })
                .collect(),
        }
    }
}

/// Invite link with a per-render cache breaker, or empty when none is configured.
///
/// The nonce is the tenant id immediately followed by the Unix timestamp.
pub fn discord_link_with_nonce(site: &TenantConfig, unix_timestamp: i64) -> String {
    if !site.has_discord() {
        return String::new();
    }
    format!("{}?{}{}", site.discord_invite_url, site.id, unix_timestamp)
}

#[derive(Serialize)]
struct ClientConfig<'a> {
    ib_id: u32,
    title: &'a str,
    img_srv: String,
    api_srv: String,
    csrf_token: &'a str,
}

/// Bootstrap object for the client, safe to embed inside a `<script>` element.
fn client_config_json(site: &TenantConfig, csrf_token: &str) -> String {
    let config = ClientConfig {
        ib_id: site.id,
        title: &site.title,
        img_srv: format!("//{}", site.image_base),
        api_srv: format!("//{}", site.api_base),
        csrf_token,
    };

    // Serializing plain strings and integers cannot fail.
    let json = serde_json::to_string(&config).unwrap_or_else(|_| "{}".to_string());
    escape_script_json(&json)
}

fn escape_script_json(json: &str) -> String {
    let mut escaped = String::with_capacity(json.len());
    for ch in json.chars() {
        match ch {
            '<' => escaped.push_str("\\u003c"),
            '>' => escaped.push_str("\\u003e"),
            '&' => escaped.push_str("\\u0026"),
            other => escaped.push(other),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::SiblingTenant;

    fn tenant(discord: &str) -> TenantConfig {
        TenantConfig {
            id: 7,
            api_base: "api.test.board".into(),
            image_base: "img.test.board".into(),
            title: "Test Board".into(),
            description: "a test board".into(),
            is_adult_content: false,
            style_sheet: "style.css".into(),
            logo_path: "logo.png".into(),
            base_path: String::new(),
            discord_invite_url: discord.into(),
            sibling_tenants: vec![SiblingTenant::new("Other", "other.board")],
        }
    }

    #[test]
    fn discord_nonce_changes_with_timestamp() {
        let site = tenant("https://discord.gg/x");

        let first = discord_link_with_nonce(&site, 1_700_000_000);
        let second = discord_link_with_nonce(&site, 1_700_000_060);

        assert_ne!(first, second);
        assert_eq!(first, "https://discord.gg/x?71700000000");
        assert!(first.starts_with("https://discord.gg/x?7"));
        assert!(second.starts_with("https://discord.gg/x?7"));
    }

    #[test]
    fn discord_link_is_empty_without_invite() {
        let site = tenant("");
        assert_eq!(discord_link_with_nonce(&site, 1), "");
        assert_eq!(discord_link_with_nonce(&site, 2), "");
    }

    #[test]
    fn view_is_recomputed_per_render() {
        let service = ShellService::new(ShellAssets {
            prim_js: "prim.js".into(),
            prim_css: "prim.css".into(),
            ..Default::default()
        });
        let site = tenant("https://discord.gg/x");

        let earlier = service.view_at(&site, "token", 10);
        let later = service.view_at(&site, "token", 20);

        assert_ne!(earlier.discord_link, later.discord_link);
        assert_eq!(site.discord_invite_url, "https://discord.gg/x");
        assert_eq!(earlier.sites[0].href, "//other.board/");
    }

    #[test]
    fn client_config_cannot_close_script_element() {
        let mut site = tenant("");
        site.title = "</script><b>&".into();

        let json = client_config_json(&site, "tok");

        assert!(!json.contains('<'));
        assert!(!json.contains('>'));
        assert!(json.contains("\\u003c/script\\u003e"));
        assert!(json.contains("\"img_srv\":\"//img.test.board\""));
        assert!(json.contains("\"csrf_token\":\"tok\""));
    }
}
