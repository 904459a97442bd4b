//! # repokit core
//!
//! Storage-agnostic repository operation core.
//!
//! This crate provides:
//! - [`Repository`], the single choke point for every mutation and query
//!   of one entity type, in blocking and `async` forms
//! - lazy storage context acquisition with guaranteed release of owned
//!   contexts and borrowing of shared (unit of work) contexts
//! - ordered, type-keyed [`Interceptor`]s around add, update and delete
//! - uniform error handling: failures are logged once through the
//!   configured [`LoggerProvider`] and returned unchanged
//! - optional read-through caching of `find` by key
//!
//! Storage backends implement the traits re-exported from
//! `repokit_context`.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod cache;
mod error;
mod interceptor;
mod logging;
mod options;
mod repository;
mod stats;

#[cfg(test)]
mod test_support;

pub use cache::{CacheProvider, CachedValue, InMemoryCacheProvider};
pub use error::{RepositoryError, RepositoryResult};
pub use interceptor::{
    AuditInterceptor, Auditable, InterceptionPoint, Interceptor, InterceptorChain,
    InterceptorRegistry,
};
pub use logging::{
    LogLevel, Logger, LoggerProvider, NullLogger, NullLoggerProvider, TracingLogger,
    TracingLoggerProvider,
};
pub use options::{ContextSource, RepositoryOptions, RepositoryOptionsBuilder};
pub use repository::{ContextState, Repository};
pub use stats::{RepositoryStats, StatsSnapshot};

pub use repokit_context::{
    AsyncAdapter, AsyncStorageContext, CancellationToken, Comparator, ContextError,
    ContextFactory, ContextResult, Conventions, Entity, Filter, FnContextFactory,
    InMemoryContext, InMemoryContextFactory, InMemoryDatabase, Key, KeyRule, KeySchema,
    KeyValue, Paging, QueryOptions, ResultEnvelope, StorageContext,
};

/// Re-exported for implementing [`Interceptor`] and [`AsyncStorageContext`]
/// with async overrides.
pub use async_trait::async_trait;
