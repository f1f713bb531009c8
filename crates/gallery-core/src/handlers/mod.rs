//! Request handlers
//!
//! The application routes plus the static file fallback.

pub mod gallery;
pub mod static_files;

pub use gallery::Gallery;
pub use static_files::{StaticFileConfig, StaticFiles};
