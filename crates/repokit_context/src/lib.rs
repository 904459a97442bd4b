//! # repokit context
//!
//! Storage-facing layer of repokit.
//!
//! This crate defines what a storage backend must provide to be driven by
//! the repository core, and nothing about how operations are orchestrated.
//!
//! ## Design Principles
//!
//! - A [`StorageContext`] is one scoped backend session; it tracks changes
//!   and persists them on `save_changes`
//! - Native asynchronous support is optional: [`AsyncAdapter`] decides once,
//!   at wrap time, whether to delegate to [`AsyncStorageContext`] or to run
//!   the synchronous surface on the calling task
//! - Primary keys are discovered by [`Conventions`], not hard-coded, and
//!   represented as a variable-length [`Key`]
//! - Query options are opaque host-language closures; no query language
//!
//! ## Available Backends
//!
//! - [`InMemoryDatabase`] / [`InMemoryContext`] - for tests and ephemeral data

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod adapter;
mod context;
mod conventions;
mod entity;
mod envelope;
mod error;
mod factory;
mod memory;
mod query;

pub use adapter::AsyncAdapter;
pub use context::{AsyncStorageContext, StorageContext};
pub use conventions::{Conventions, KeyRule, KeySchema};
pub use entity::{Entity, Key, KeyValue};
pub use envelope::ResultEnvelope;
pub use error::{ContextError, ContextResult};
pub use factory::{ContextFactory, FnContextFactory};
pub use memory::{InMemoryContext, InMemoryContextFactory, InMemoryDatabase};
pub use query::{Comparator, Filter, Paging, QueryOptions};

pub use tokio_util::sync::CancellationToken;
