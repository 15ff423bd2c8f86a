//! Static files served from the configured assets directory, plus the include
//! snippets spliced into every shell page.

use std::{
    io::ErrorKind,
    path::{Component, Path as FsPath, PathBuf},
    sync::Arc,
};

use axum::{
    body::Body,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use mime_guess::Mime;
use tracing::warn;

use crate::application::{error::ErrorReport, shell::ShellAssets};
use crate::config::AssetSettings;

use super::error::InfraError;

const SOURCE: &str = "infra::assets::serve";
const HEAD_INCLUDE: &str = "includes/head.html";
const NAVMENU_INCLUDE: &str = "includes/navmenu.html";

/// Read-only view over the assets directory.
#[derive(Debug, Clone)]
pub struct AssetStore {
    root: Arc<PathBuf>,
}

impl AssetStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Arc::new(root.into()),
        }
    }

    /// Serve `path` relative to the assets root.
    pub async fn serve(&self, path: &str) -> Response {
        let Some(relative) = sanitize(path) else {
            return rejected_response(StatusCode::NOT_FOUND);
        };

        let full = self.root.join(&relative);
        match tokio::fs::read(&full).await {
            Ok(contents) => build_response(
                Bytes::from(contents),
                mime_guess::from_path(&relative).first_or_octet_stream(),
            ),
            Err(err) if matches!(err.kind(), ErrorKind::NotFound | ErrorKind::IsADirectory) => {
                not_found_response()
            }
            Err(err) => {
                warn!(target: SOURCE, path = %full.display(), error = %err, "failed to read asset");
                let mut response = StatusCode::INTERNAL_SERVER_ERROR.into_response();
                ErrorReport::from_error(SOURCE, StatusCode::INTERNAL_SERVER_ERROR, &err)
                    .attach(&mut response);
                response
            }
        }
    }
}

/// Turn a captured request path into a relative file path, or `None` when it
/// could escape the root or names a directory.
fn sanitize(path: &str) -> Option<PathBuf> {
    let candidate = path.trim_start_matches('/');
    if candidate.is_empty() || candidate.ends_with('/') || candidate.contains('\\') {
        return None;
    }

    let mut relative = PathBuf::new();
    for component in FsPath::new(candidate).components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }

    (!relative.as_os_str().is_empty()).then_some(relative)
}

fn not_found_response() -> Response {
    let mut response = StatusCode::NOT_FOUND.into_response();
    ErrorReport::from_message(SOURCE, StatusCode::NOT_FOUND, "Static asset not found")
        .attach(&mut response);
    response
}

fn rejected_response(status: StatusCode) -> Response {
    let mut response = status.into_response();
    ErrorReport::from_message(SOURCE, status, "Static asset request rejected")
        .attach(&mut response);
    response
}

fn build_response(bytes: Bytes, mime: Mime) -> Response {
    let len = bytes.len();
    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = StatusCode::OK;

    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(mime.as_ref()) {
        headers.insert(header::CONTENT_TYPE, value);
    }
    if let Ok(value) = HeaderValue::from_str(&len.to_string()) {
        headers.insert(header::CONTENT_LENGTH, value);
    }
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=3600"),
    );

    response
}

/// Load the shell's static pieces. Include snippets are optional.
pub async fn load_shell_assets(settings: &AssetSettings) -> Result<ShellAssets, InfraError> {
    let head_include = read_include(&settings.directory.join(HEAD_INCLUDE)).await?;
    let navmenu_include = read_include(&settings.directory.join(NAVMENU_INCLUDE)).await?;

    Ok(ShellAssets {
        prim_js: settings.prim_js.clone(),
        prim_css: settings.prim_css.clone(),
        head_include,
        navmenu_include,
    })
}

async fn read_include(path: &FsPath) -> Result<String, InfraError> {
    match tokio::fs::read_to_string(path).await {
        Ok(contents) => Ok(contents),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(String::new()),
        Err(err) => Err(InfraError::asset(path, err)),
    }
}
