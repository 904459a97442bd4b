//! Timestamp auditing.

use super::Interceptor;
use crate::error::RepositoryResult;
use async_trait::async_trait;
use repokit_context::Entity;
use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;

/// An entity carrying audit timestamps.
pub trait Auditable {
    /// Records when the entity was first stored.
    fn set_created_at(&mut self, at: SystemTime);

    /// Records when the entity was last changed.
    fn set_modified_at(&mut self, at: SystemTime);
}

type Clock = Arc<dyn Fn() -> SystemTime + Send + Sync>;

/// Stamps [`Auditable`] entities before they are added or updated.
///
/// On add both timestamps are set to the same instant; on update only the
/// modification time changes.
#[derive(Clone)]
pub struct AuditInterceptor {
    clock: Clock,
}

impl AuditInterceptor {
    /// Creates an interceptor reading the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(SystemTime::now)
    }

    /// Creates an interceptor reading a custom clock.
    #[must_use]
    pub fn with_clock<F>(clock: F) -> Self
    where
        F: Fn() -> SystemTime + Send + Sync + 'static,
    {
        Self {
            clock: Arc::new(clock),
        }
    }

    fn now(&self) -> SystemTime {
        (self.clock)()
    }
}

impl Default for AuditInterceptor {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for AuditInterceptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuditInterceptor").finish_non_exhaustive()
    }
}

#[async_trait]
impl<T> Interceptor<T> for AuditInterceptor
where
    T: Entity + Auditable,
{
    fn add_executing(&self, entity: &mut T) -> RepositoryResult<()> {
        let now = self.now();
        entity.set_created_at(now);
        entity.set_modified_at(now);
        Ok(())
    }

    fn update_executing(&self, entity: &mut T) -> RepositoryResult<()> {
        entity.set_modified_at(self.now());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::Widget;
    use std::time::Duration;

    fn fixed(secs: u64) -> AuditInterceptor {
        AuditInterceptor::with_clock(move || SystemTime::UNIX_EPOCH + Duration::from_secs(secs))
    }

    #[test]
    fn add_sets_both_timestamps() {
        let mut widget = Widget::new(1, "w");
        fixed(10).add_executing(&mut widget).unwrap();
        let at = SystemTime::UNIX_EPOCH + Duration::from_secs(10);
        assert_eq!(widget.created_at, Some(at));
        assert_eq!(widget.modified_at, Some(at));
    }

    #[test]
    fn update_only_touches_modified() {
        let mut widget = Widget::new(1, "w");
        fixed(20).update_executing(&mut widget).unwrap();
        assert_eq!(widget.created_at, None);
        assert!(widget.modified_at.is_some());
    }

    #[test]
    fn delete_is_untouched() {
        let mut widget = Widget::new(1, "w");
        Interceptor::<Widget>::delete_executing(&fixed(5), &mut widget).unwrap();
        assert_eq!(widget.modified_at, None);
    }
}
