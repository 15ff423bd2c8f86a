//! Request host normalization.

/// Strip any `:port` suffix from a raw `Host` value.
///
/// Everything from the first colon onward is dropped, so `board.example:8080`
/// and `board.example` share a cache key.
pub fn normalize_host(raw: &str) -> &str {
    raw.split(':').next().unwrap_or_default()
}
