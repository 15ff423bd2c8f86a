use std::{sync::Arc, time::Instant};

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{error, warn};
use uuid::Uuid;

use crate::{
    application::error::{ErrorReport, HttpError},
    cache::SiteCache,
    domain::{host::normalize_host, tenant::TenantConfig},
};

#[derive(Clone)]
pub struct RequestContext {
    pub request_id: String,
}

/// Tenant bound to the current request by [`resolve_site`].
#[derive(Debug, Clone)]
pub struct ResolvedSite {
    pub host: String,
    pub site: Arc<TenantConfig>,
}

pub async fn set_request_context(mut request: Request<Body>, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let ctx = RequestContext {
        request_id: request_id.clone(),
    };
    request.extensions_mut().insert(ctx.clone());

    let mut response = next.run(request).await;
    response.extensions_mut().insert(ctx);
    response
}

/// Resolve the tenant for the request's host or stop the pipeline.
pub async fn resolve_site(
    State(cache): State<Arc<SiteCache>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let host = request_host(&request).map(|raw| normalize_host(raw).to_string());
    let Some(host) = host.filter(|host| !host.is_empty()) else {
        return HttpError::new(
            "infra::http::resolve_site",
            StatusCode::NOT_FOUND,
            "Site not found",
            "request carried no host",
        )
        .into_response();
    };

    match cache.resolve(&host).await {
        Ok(site) => {
            request
                .extensions_mut()
                .insert(ResolvedSite { host, site });
            next.run(request).await
        }
        Err(err) => HttpError::from(err).into_response(),
    }
}

fn request_host(request: &Request<Body>) -> Option<&str> {
    request
        .headers()
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .or_else(|| request.uri().authority().map(|authority| authority.as_str()))
}

pub async fn log_responses(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let host = request
        .headers()
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("")
        .to_string();

    let request_id = request
        .extensions()
        .get::<RequestContext>()
        .map(|ctx| ctx.request_id.clone())
        .unwrap_or_default();

    let mut response = next.run(request).await;
    let status = response.status();

    if status.is_client_error() || status.is_server_error() {
        let elapsed_ms = start.elapsed().as_millis();
        let report = response.extensions_mut().remove::<ErrorReport>();
        let (source, messages) = match report {
            Some(report) => (report.source, report.messages),
            None => ("unknown", Vec::new()),
        };
        let detail = messages
            .first()
            .cloned()
            .unwrap_or_else(|| "no diagnostic available".to_string());

        if status.is_server_error() {
            error!(
                target = "boardfront::http::response",
                status = status.as_u16(),
                method = %method,
                host = host,
                path = %uri.path(),
                query = uri.query().unwrap_or(""),
                elapsed_ms = elapsed_ms,
                source = source,
                detail = %detail,
                chain = ?messages,
                request_id = request_id,
                "request failed",
            );
        } else {
            warn!(
                target = "boardfront::http::response",
                status = status.as_u16(),
                method = %method,
                host = host,
                path = %uri.path(),
                query = uri.query().unwrap_or(""),
                elapsed_ms = elapsed_ms,
                source = source,
                detail = %detail,
                chain = ?messages,
                request_id = request_id,
                "client request error",
            );
        }
    }

    response
}
