//! Upload payloads
//!
//! Browsers submit `FileReader.readAsDataURL` output, so the body may start
//! with `data:image/<type>;base64,`. That header is dropped; everything else
//! is forwarded to the store untouched (no decoding, no size or format check).

use std::sync::LazyLock;

use regex::Regex;

static DATA_URL_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^data:image/[A-Za-z0-9_]+;base64,").expect("valid data-URL pattern"));

/// Base64 image text ready to be stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload(String);

impl ImagePayload {
    /// Build a payload from the raw request body, stripping one leading
    /// data-URL header if present
    pub fn from_body(body: &str) -> Self {
        let stripped = DATA_URL_PREFIX.replace(body, "");
        Self(stripped.into_owned())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Base64 text as submitted
    pub fn as_base64(&self) -> &str {
        &self.0
    }

    pub fn into_base64(self) -> String {
        self.0
    }
}
