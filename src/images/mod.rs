//! Image identifiers and upload payloads
//!
//! Provides:
//! - Random 32-letter image identifiers (the storage key)
//! - Data-URL prefix stripping for browser-submitted payloads

mod id;
mod payload;

pub use id::{ImageId, ID_LEN};
pub use payload::ImagePayload;
