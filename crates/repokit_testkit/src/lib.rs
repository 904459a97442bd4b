//! # repokit testkit
//!
//! Test utilities for repokit.
//!
//! This crate provides:
//! - Sample entities with single, composite and missing keys
//! - A [`Harness`] wiring a repository to recording collaborators
//! - Recording contexts (sync-only and native async), factories and
//!   interceptors sharing one ordered call log
//! - Fault injection and a blocking gate for failure and concurrency tests
//! - A capturing logger provider
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust,ignore
//! use repokit_testkit::prelude::*;
//!
//! #[test]
//! fn add_then_find() {
//!     let harness = Harness::<Customer>::new();
//!     let mut customer = Customer::new(1, "Ada");
//!     harness.repository.add(&mut customer).unwrap();
//!     assert!(harness.repository.find(&customer.key()).unwrap().is_some());
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod logging;
pub mod recording;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::logging::*;
    pub use crate::recording::*;
}

pub use fixtures::*;
pub use generators::*;
pub use logging::*;
pub use recording::*;
