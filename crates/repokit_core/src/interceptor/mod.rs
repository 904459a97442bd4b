//! Mutation interceptors.
//!
//! Interceptors observe, and may modify, entities around every add, update
//! and delete. They are registered by type on the options
//! ([`InterceptorRegistry`]), instantiated lazily, and run in registration
//! order by an [`InterceptorChain`] owned by each repository.
//!
//! # Ordering
//!
//! For interceptors `I1` then `I2`, an add runs:
//!
//! ```text
//! I1.add_executing → I2.add_executing → backend add + save
//!     → I1.add_executed → I2.add_executed
//! ```
//!
//! An interceptor returning `Err` aborts the rest of the chain and the
//! operation; the error reaches the caller unchanged.

mod audit;
mod chain;
mod registry;

pub use audit::{AuditInterceptor, Auditable};
pub use chain::InterceptorChain;
pub use registry::InterceptorRegistry;

use crate::error::RepositoryResult;
use async_trait::async_trait;
use repokit_context::Entity;
use std::fmt;
use tokio_util::sync::CancellationToken;

/// The point in a mutation's lifecycle at which interceptors run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InterceptionPoint {
    /// Before an entity is added.
    AddExecuting,
    /// After an entity was added and saved.
    AddExecuted,
    /// Before an entity is updated.
    UpdateExecuting,
    /// After an entity was updated and saved.
    UpdateExecuted,
    /// Before an entity is deleted.
    DeleteExecuting,
    /// After an entity was deleted and saved.
    DeleteExecuted,
}

impl fmt::Display for InterceptionPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::AddExecuting => "add_executing",
            Self::AddExecuted => "add_executed",
            Self::UpdateExecuting => "update_executing",
            Self::UpdateExecuted => "update_executed",
            Self::DeleteExecuting => "delete_executing",
            Self::DeleteExecuted => "delete_executed",
        };
        f.write_str(name)
    }
}

/// An observer invoked around mutations of `T`.
///
/// Every hook defaults to a no-op. The async hooks default to their
/// synchronous counterparts, so an interceptor only needs async overrides
/// when it does real asynchronous work.
#[async_trait]
pub trait Interceptor<T: Entity>: Send + Sync {
    /// Runs before `entity` is added.
    fn add_executing(&self, _entity: &mut T) -> RepositoryResult<()> {
        Ok(())
    }

    /// Runs after `entity` was added and saved.
    fn add_executed(&self, _entity: &mut T) -> RepositoryResult<()> {
        Ok(())
    }

    /// Runs before `entity` is updated.
    fn update_executing(&self, _entity: &mut T) -> RepositoryResult<()> {
        Ok(())
    }

    /// Runs after `entity` was updated and saved.
    fn update_executed(&self, _entity: &mut T) -> RepositoryResult<()> {
        Ok(())
    }

    /// Runs before `entity` is deleted.
    fn delete_executing(&self, _entity: &mut T) -> RepositoryResult<()> {
        Ok(())
    }

    /// Runs after `entity` was deleted and saved.
    fn delete_executed(&self, _entity: &mut T) -> RepositoryResult<()> {
        Ok(())
    }

    /// Async twin of [`add_executing`](Interceptor::add_executing).
    async fn add_executing_async(
        &self,
        entity: &mut T,
        _cancel: &CancellationToken,
    ) -> RepositoryResult<()> {
        self.add_executing(entity)
    }

    /// Async twin of [`add_executed`](Interceptor::add_executed).
    async fn add_executed_async(
        &self,
        entity: &mut T,
        _cancel: &CancellationToken,
    ) -> RepositoryResult<()> {
        self.add_executed(entity)
    }

    /// Async twin of [`update_executing`](Interceptor::update_executing).
    async fn update_executing_async(
        &self,
        entity: &mut T,
        _cancel: &CancellationToken,
    ) -> RepositoryResult<()> {
        self.update_executing(entity)
    }

    /// Async twin of [`update_executed`](Interceptor::update_executed).
    async fn update_executed_async(
        &self,
        entity: &mut T,
        _cancel: &CancellationToken,
    ) -> RepositoryResult<()> {
        self.update_executed(entity)
    }

    /// Async twin of [`delete_executing`](Interceptor::delete_executing).
    async fn delete_executing_async(
        &self,
        entity: &mut T,
        _cancel: &CancellationToken,
    ) -> RepositoryResult<()> {
        self.delete_executing(entity)
    }

    /// Async twin of [`delete_executed`](Interceptor::delete_executed).
    async fn delete_executed_async(
        &self,
        entity: &mut T,
        _cancel: &CancellationToken,
    ) -> RepositoryResult<()> {
        self.delete_executed(entity)
    }
}

/// Dispatches one hook of `interceptor`.
pub(crate) fn invoke<T: Entity>(
    interceptor: &dyn Interceptor<T>,
    point: InterceptionPoint,
    entity: &mut T,
) -> RepositoryResult<()> {
    match point {
        InterceptionPoint::AddExecuting => interceptor.add_executing(entity),
        InterceptionPoint::AddExecuted => interceptor.add_executed(entity),
        InterceptionPoint::UpdateExecuting => interceptor.update_executing(entity),
        InterceptionPoint::UpdateExecuted => interceptor.update_executed(entity),
        InterceptionPoint::DeleteExecuting => interceptor.delete_executing(entity),
        InterceptionPoint::DeleteExecuted => interceptor.delete_executed(entity),
    }
}

/// Dispatches one async hook of `interceptor`.
pub(crate) async fn invoke_async<T: Entity>(
    interceptor: &dyn Interceptor<T>,
    point: InterceptionPoint,
    entity: &mut T,
    cancel: &CancellationToken,
) -> RepositoryResult<()> {
    match point {
        InterceptionPoint::AddExecuting => interceptor.add_executing_async(entity, cancel).await,
        InterceptionPoint::AddExecuted => interceptor.add_executed_async(entity, cancel).await,
        InterceptionPoint::UpdateExecuting => {
            interceptor.update_executing_async(entity, cancel).await
        }
        InterceptionPoint::UpdateExecuted => interceptor.update_executed_async(entity, cancel).await,
        InterceptionPoint::DeleteExecuting => {
            interceptor.delete_executing_async(entity, cancel).await
        }
        InterceptionPoint::DeleteExecuted => interceptor.delete_executed_async(entity, cancel).await,
    }
}
