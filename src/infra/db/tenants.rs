use async_trait::async_trait;

use crate::{
    application::repos::{RepoError, TenantsRepo},
    domain::entities::{SiblingTenant, TenantRecord},
};

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct TenantRow {
    ib_id: i32,
    ib_title: String,
    ib_description: String,
    ib_nsfw: bool,
    ib_api: String,
    ib_img: String,
    ib_style: String,
    ib_logo: String,
    ib_discord: String,
}

impl From<TenantRow> for TenantRecord {
    fn from(row: TenantRow) -> Self {
        Self {
            id: row.ib_id,
            title: row.ib_title,
            description: row.ib_description,
            adult: row.ib_nsfw,
            api_base: row.ib_api,
            image_base: row.ib_img,
            style_sheet: row.ib_style,
            logo_path: row.ib_logo,
            discord_invite_url: row.ib_discord,
        }
    }
}

#[derive(sqlx::FromRow)]
struct SiblingRow {
    ib_title: String,
    ib_domain: String,
}

impl From<SiblingRow> for SiblingTenant {
    fn from(row: SiblingRow) -> Self {
        Self::new(row.ib_title, row.ib_domain)
    }
}

#[async_trait]
impl TenantsRepo for PostgresRepositories {
    async fn find_by_domain(&self, domain: &str) -> Result<Option<TenantRecord>, RepoError> {
        let row = sqlx::query_as::<_, TenantRow>(
            r#"
            SELECT ib_id, ib_title, ib_description, ib_nsfw, ib_api, ib_img,
                   ib_style, ib_logo, ib_discord
            FROM imageboards
            WHERE ib_domain = $1
            "#,
        )
        .bind(domain)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(TenantRecord::from))
    }

    async fn list_siblings(&self, exclude_id: i32) -> Result<Vec<SiblingTenant>, RepoError> {
        let rows = sqlx::query_as::<_, SiblingRow>(
            r#"
            SELECT ib_title, ib_domain
            FROM imageboards
            WHERE ib_id != $1
            "#,
        )
        .bind(exclude_id)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(SiblingTenant::from).collect())
    }
}
