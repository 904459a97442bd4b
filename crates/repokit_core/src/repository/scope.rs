//! Context acquisition and release.

use super::Repository;
use crate::error::RepositoryResult;
use crate::logging::{log_with, LogLevel};
use crate::options::ContextSource;
use repokit_context::{AsyncAdapter, Entity};
use std::thread::{self, ThreadId};

/// Whether a repository currently holds a storage context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    /// No operation is running.
    NoContext,
    /// An operation holds a context.
    ContextActive,
}

/// Who disposes a leased context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Ownership {
    /// Created by the factory; disposed when the operation ends.
    Owned,
    /// Supplied by a unit of work; never disposed here.
    Borrowed,
}

pub(super) struct ContextLease<T: Entity> {
    adapter: AsyncAdapter<T>,
    ownership: Ownership,
    /// Thread of the outermost operation.
    owner: ThreadId,
}

/// The context held by one top-level operation.
///
/// Dropping the outermost scope releases the lease, on every path
/// including errors, panics and dropped futures.
pub(super) struct Scope<'r, T: Entity> {
    repository: &'r Repository<T>,
    adapter: AsyncAdapter<T>,
    outermost: bool,
}

impl<T: Entity> Scope<'_, T> {
    pub(super) fn adapter(&self) -> &AsyncAdapter<T> {
        &self.adapter
    }
}

impl<T: Entity> Drop for Scope<'_, T> {
    fn drop(&mut self) {
        if self.outermost {
            self.repository.release();
        }
    }
}

impl<T: Entity> Repository<T> {
    /// Returns whether an operation currently holds a context.
    #[must_use]
    pub fn context_state(&self) -> ContextState {
        if self.active.lock().is_some() {
            ContextState::ContextActive
        } else {
            ContextState::NoContext
        }
    }

    /// Opens the scope of a top-level operation.
    ///
    /// A lease held by an operation on the same thread means this call is
    /// nested inside it, for example a query issued by an interceptor. The
    /// lease is joined without taking ownership.
    ///
    /// A lease held from another thread means the repository is being used
    /// from two flows of control at once. That is recorded and logged at
    /// warn, and the lease is joined the same way. Async tasks interleaved
    /// on one thread cannot be told apart from nesting.
    pub(super) fn enter(&self, operation: &'static str) -> RepositoryResult<Scope<'_, T>> {
        let mut active = self.active.lock();
        if let Some(lease) = active.as_ref() {
            if lease.owner == thread::current().id() {
                self.stats.record_nested();
                log_with(self.logger.as_ref(), LogLevel::Trace, || {
                    format!("{operation} joined the active context")
                });
            } else {
                self.stats.record_overlap();
                log_with(self.logger.as_ref(), LogLevel::Warn, || {
                    format!("{operation} started while another operation holds the context")
                });
            }
            return Ok(Scope {
                repository: self,
                adapter: lease.adapter.clone(),
                outermost: false,
            });
        }

        let lease = self.lease()?;
        let adapter = lease.adapter.clone();
        *active = Some(lease);
        Ok(Scope {
            repository: self,
            adapter,
            outermost: true,
        })
    }

    fn lease(&self) -> RepositoryResult<ContextLease<T>> {
        match self.options.source() {
            ContextSource::Factory(factory) => {
                let adapter = factory.create()?;
                self.stats.record_context_created();
                log_with(self.logger.as_ref(), LogLevel::Trace, || {
                    "storage context created".to_string()
                });
                Ok(ContextLease {
                    adapter,
                    ownership: Ownership::Owned,
                    owner: thread::current().id(),
                })
            }
            ContextSource::Shared(adapter) => Ok(ContextLease {
                adapter: adapter.clone(),
                ownership: Ownership::Borrowed,
                owner: thread::current().id(),
            }),
        }
    }

    fn release(&self) {
        let Some(lease) = self.active.lock().take() else {
            return;
        };
        match lease.ownership {
            Ownership::Owned => {
                lease.adapter.dispose();
                self.stats.record_context_released();
                log_with(self.logger.as_ref(), LogLevel::Trace, || {
                    "storage context disposed".to_string()
                });
            }
            Ownership::Borrowed => {}
        }
    }
}
