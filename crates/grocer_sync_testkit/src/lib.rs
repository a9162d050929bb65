//! # Grocer Sync Testkit
//!
//! Test utilities for the Grocer sync engine.
//!
//! This crate provides:
//! - Sample cart, order and profile data
//! - Builders for server states and conflict scenarios
//! - Temporary state files for file-backed stores
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust,ignore
//! use grocer_sync_testkit::prelude::*;
//!
//! #[test]
//! fn pulls_newer_cart() {
//!     let server = ServerStateBuilder::new().cart(sample_cart(), "200").build();
//!     // ... run a pass against `server`
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use fixtures::*;
pub use generators::*;
