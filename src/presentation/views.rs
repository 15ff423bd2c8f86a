use crate::application::error::{ErrorReport, HttpError};
use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl TemplateRenderError {
    pub fn new(source: &'static str, public_message: &'static str, error: AskamaError) -> Self {
        Self {
            source,
            public_message,
            error,
        }
    }
}

impl From<TemplateRenderError> for HttpError {
    fn from(err: TemplateRenderError) -> Self {
        let TemplateRenderError {
            source,
            public_message,
            error,
        } = err;

        HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            public_message,
            &error,
        )
    }
}

pub fn render_template<T: Template>(template: T) -> Result<Html<String>, HttpError> {
    template.render().map(Html).map_err(|err| {
        TemplateRenderError::new(
            "presentation::views::render_template",
            "Template rendering failed",
            err,
        )
        .into()
    })
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(template) {
        Ok(html) => (status, html).into_response(),
        Err(err) => err.into_response(),
    }
}

/// Render the shell for a recognized client route.
pub fn render_shell_response(view: ShellView) -> Response {
    render_template_response(ShellTemplate { view }, StatusCode::OK)
}

/// Render the same shell with a 404 status so the client can show its own error page.
pub fn render_not_found_response(view: ShellView) -> Response {
    let mut response = render_template_response(ShellTemplate { view }, StatusCode::NOT_FOUND);
    ErrorReport::from_message(
        "presentation::views::render_not_found_response",
        StatusCode::NOT_FOUND,
        "No client route matched",
    )
    .attach(&mut response);
    response
}

#[derive(Debug, Clone)]
pub struct SiteLinkView {
    pub title: String,
    pub href: String,
}

#[derive(Debug, Clone)]
pub struct ShellView {
    pub ib_id: u32,
    pub base_path: String,
    pub title: String,
    pub description: String,
    pub adult: bool,
    pub style_sheet: String,
    pub logo_path: String,
    pub prim_js: String,
    pub prim_css: String,
    pub head_include: String,
    pub navmenu_include: String,
    /// Invite link with its cache-breaking nonce; empty hides the link.
    pub discord_link: String,
    /// Pre-escaped JSON for the client bootstrap script.
    pub client_config: String,
    pub sites: Vec<SiteLinkView>,
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct ShellTemplate {
    pub view: ShellView,
}
