//! Double-submit CSRF cookies for the single-page client.
//!
//! Each visitor holds a long-lived random token in an HttpOnly cookie. Every
//! response also carries `XSRF-TOKEN`, a freshly masked copy of that token the
//! client echoes back on writes. Masking with a new pad per response keeps the
//! readable cookie from being a constant.

use axum::{
    body::Body,
    http::{HeaderValue, Request, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use subtle::ConstantTimeEq;
use uuid::Uuid;

pub const CSRF_COOKIE: &str = "csrf_token";
pub const XSRF_COOKIE: &str = "XSRF-TOKEN";

const TOKEN_LEN: usize = 32;
const MAX_AGE_DAYS: i64 = 365;

/// Masked token for the current request, readable by the renderer.
#[derive(Debug, Clone)]
pub struct CsrfToken {
    masked: String,
}

impl CsrfToken {
    pub fn masked(&self) -> &str {
        &self.masked
    }
}

/// Issue or reuse the visitor's token, mask it, and expose it to handlers.
pub async fn csrf_cookie(jar: CookieJar, mut request: Request<Body>, next: Next) -> Response {
    let existing = jar
        .get(CSRF_COOKIE)
        .and_then(|cookie| decode_token(cookie.value()));

    let (token, jar) = match existing {
        Some(token) => (token, jar),
        None => {
            let token = generate_token();
            let cookie = Cookie::build((CSRF_COOKIE, URL_SAFE_NO_PAD.encode(token)))
                .path("/")
                .http_only(true)
                .max_age(time::Duration::days(MAX_AGE_DAYS));
            (token, jar.add(cookie))
        }
    };

    let masked = mask(&token);
    request.extensions_mut().insert(CsrfToken {
        masked: masked.clone(),
    });
    let jar = jar.add(Cookie::build((XSRF_COOKIE, masked)).path("/"));

    let mut response = next.run(request).await;
    response
        .headers_mut()
        .append(header::VARY, HeaderValue::from_static("Cookie"));
    (jar, response).into_response()
}

fn decode_token(value: &str) -> Option<[u8; TOKEN_LEN]> {
    let bytes = URL_SAFE_NO_PAD.decode(value).ok()?;
    <[u8; TOKEN_LEN]>::try_from(bytes.as_slice()).ok()
}

fn generate_token() -> [u8; TOKEN_LEN] {
    let mut token = [0u8; TOKEN_LEN];
    token[..16].copy_from_slice(Uuid::new_v4().as_bytes());
    token[16..].copy_from_slice(Uuid::new_v4().as_bytes());
    token
}

/// `base64url(pad || token ^ pad)` with a fresh pad.
pub fn mask(token: &[u8; TOKEN_LEN]) -> String {
    let pad = generate_token();
    let mut out = Vec::with_capacity(TOKEN_LEN * 2);
    out.extend_from_slice(&pad);
    out.extend(token.iter().zip(pad.iter()).map(|(t, p)| t ^ p));
    URL_SAFE_NO_PAD.encode(out)
}

/// Check a masked value sent back by the client against the raw cookie token.
pub fn verify_masked(token: &[u8], masked: &str) -> bool {
    if token.len() != TOKEN_LEN {
        return false;
    }
    let Ok(bytes) = URL_SAFE_NO_PAD.decode(masked) else {
        return false;
    };
    if bytes.len() != TOKEN_LEN * 2 {
        return false;
    }

    let (pad, xored) = bytes.split_at(TOKEN_LEN);
    let unmasked: Vec<u8> = xored.iter().zip(pad).map(|(x, p)| x ^ p).collect();
    unmasked.ct_eq(token).into()
}
