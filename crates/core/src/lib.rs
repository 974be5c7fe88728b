//! mfg-core
//!
//! Core library for assembling manufacturing images: flat, position-addressed
//! flash blobs built from a bootloader, up to two application images and raw
//! user blobs, stamped with an integrity hash and a build manifest.
//!
//! All substantive logic lives here so it is fully testable and reusable
//! from multiple frontends; the `mfg-image` CLI is a thin wrapper.

pub mod config;
pub mod error;
pub mod flash;
pub mod layout;
pub mod model;
pub mod services;
pub mod units;

pub use error::{MfgError, MfgResult};

/// Returns the library version as encoded at compile time.
///
/// Useful for tests and for frontends to report consistent version info.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
