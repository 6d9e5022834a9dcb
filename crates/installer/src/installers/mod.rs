//! Built-in installer strategies
//!
//! Suggested registration priorities below; lower is asked first.

pub mod fallback;
pub mod manifest;

pub use fallback::FallbackInstaller;
pub use manifest::{ManifestInstaller, MANIFEST_FILE};

pub const MANIFEST_PRIORITY: i32 = 20;
pub const FALLBACK_PRIORITY: i32 = 100;
