//! # Scull Testkit
//!
//! Test utilities for scull.
//!
//! This crate provides:
//! - Test fixtures and device helpers
//! - Property-based test generators using proptest
//! - Stress testing utilities
//!
//! ## Usage
//!
//! ```rust
//! use scull_testkit::prelude::*;
//!
//! let dev = TestDevice::tiny();
//! dev.fill(0, b"ABCDEF");
//! assert_eq!(dev.contents_from(0), b"ABCDEF");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::stress::*;
}

pub use fixtures::*;
pub use generators::*;
pub use stress::*;
