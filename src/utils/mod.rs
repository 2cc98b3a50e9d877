//! Utils Module - Shared Helpers
//!
//! Constants, caching, the known-malicious set and telemetry.

pub mod cache;
pub mod constants;
pub mod malicious;
pub mod telemetry;

pub use cache::*;
pub use constants::*;
pub use malicious::*;
pub use telemetry::*;
