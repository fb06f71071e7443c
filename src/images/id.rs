//! Image identifiers
//!
//! An identifier is 32 lowercase ASCII letters drawn uniformly at random.
//! There is no uniqueness check: a collision overwrites the earlier blob.

use std::fmt;

use rand::Rng;

/// Number of letters in a freshly generated identifier
pub const ID_LEN: usize = 32;

/// Key naming one stored image
///
/// Identifiers received on retrieval are never validated, so an `ImageId`
/// may hold any string. Only [`ImageId::generate`] guarantees the
/// 32-letter shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageId(String);

impl ImageId {
    /// Generate a fresh random identifier
    pub fn generate() -> Self {
        let mut rng = rand::rng();
        let id = (0..ID_LEN)
            .map(|_| char::from(rng.random_range(b'a'..=b'z')))
            .collect();
        Self(id)
    }

    /// Build an identifier from a request path with its leading slash removed
    ///
    /// Dot segments (`.`, `..` and their `%2e` spellings) are resolved the
    /// way a URL parser resolves them against `/`, so the identifier can
    /// never climb out of the store's directory. Everything else is kept
    /// verbatim.
    pub fn from_path(raw: &str) -> Self {
        Self(resolve_dot_segments(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// File name of the blob in the store
    pub fn file_name(&self) -> String {
        format!("{}.jpeg", self.0)
    }

    /// Quoted form used as the ETag
    pub fn etag(&self) -> String {
        format!("\"{}\"", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DotSegment {
    Current,
    Parent,
}

fn dot_segment(segment: &str) -> Option<DotSegment> {
    let lower = segment.to_ascii_lowercase();
    match lower.as_str() {
        "." | "%2e" => Some(DotSegment::Current),
        ".." | ".%2e" | "%2e." | "%2e%2e" => Some(DotSegment::Parent),
        _ => None,
    }
}

/// Remove `.` and `..` segments; a trailing dot segment leaves a trailing slash
fn resolve_dot_segments(path: &str) -> String {
    let segments: Vec<&str> = path.split('/').collect();
    let last = segments.len() - 1;
    let mut resolved: Vec<&str> = Vec::with_capacity(segments.len());

    for (i, segment) in segments.into_iter().enumerate() {
        match dot_segment(segment) {
            Some(kind) => {
                if kind == DotSegment::Parent {
                    resolved.pop();
                }
                if i == last {
                    resolved.push("");
                }
            }
            None => resolved.push(segment),
        }
    }

    resolved.join("/")
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ImageId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
