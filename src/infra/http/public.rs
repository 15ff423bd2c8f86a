use std::sync::Arc;

use axum::{
    Extension, Router,
    extract::{Path, State},
    middleware,
    response::Response,
    routing::get,
};

use crate::{
    application::shell::ShellService,
    cache::SiteCache,
    infra::{assets::AssetStore, db::PostgresRepositories},
    presentation::views::{render_not_found_response, render_shell_response},
};

use super::{
    csrf::{CsrfToken, csrf_cookie},
    db_health_response,
    middleware::{ResolvedSite, log_responses, resolve_site, set_request_context},
};

#[derive(Clone)]
pub struct HttpState {
    pub cache: Arc<SiteCache>,
    pub shell: Arc<ShellService>,
    pub db: Arc<PostgresRepositories>,
    pub assets: AssetStore,
}

/// Client routes the single-page app understands. Each one gets the same shell;
/// other methods on them fall through to the not-found shell.
const CLIENT_ROUTES: &[&str] = &[
    "/",
    "/page/{id}",
    "/thread/{id}/{page}",
    "/directory",
    "/image/{id}",
    "/tags/{page}",
    "/tags",
    "/tag/{id}/{page}",
    "/account",
    "/trending",
    "/favorites/{page}",
    "/favorites",
    "/error",
];

pub fn build_router(state: HttpState) -> Router {
    let tenant_routes = CLIENT_ROUTES
        .iter()
        .fold(Router::new(), |router, path| {
            router.route(path, get(shell_page).fallback(not_found_page))
        })
        .fallback(not_found_page)
        .layer(middleware::from_fn_with_state(
            state.cache.clone(),
            resolve_site,
        ))
        .layer(middleware::from_fn(csrf_cookie));

    let static_routes = Router::new()
        .route("/_health/db", get(public_health))
        .route("/assets/{*path}", get(serve_asset));

    static_routes
        .with_state(state.clone())
        .merge(tenant_routes.with_state(state))
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

async fn shell_page(
    State(state): State<HttpState>,
    Extension(resolved): Extension<ResolvedSite>,
    Extension(csrf): Extension<CsrfToken>,
) -> Response {
    render_shell_response(state.shell.view(&resolved.site, csrf.masked()))
}

async fn not_found_page(
    State(state): State<HttpState>,
    Extension(resolved): Extension<ResolvedSite>,
    Extension(csrf): Extension<CsrfToken>,
) -> Response {
    render_not_found_response(state.shell.view(&resolved.site, csrf.masked()))
}

async fn public_health(State(state): State<HttpState>) -> Response {
    db_health_response(state.db.health_check().await)
}

async fn serve_asset(State(state): State<HttpState>, Path(path): Path<String>) -> Response {
    state.assets.serve(&path).await
}
