//! Ordered execution of resolved interceptors.

use super::{invoke, invoke_async, InterceptionPoint, Interceptor, InterceptorRegistry};
use crate::error::RepositoryResult;
use repokit_context::Entity;
use std::fmt;
use std::sync::{Arc, OnceLock};
use tokio_util::sync::CancellationToken;

/// The interceptors of one repository, resolved once.
///
/// Resolution happens on first use and is cached for the lifetime of the
/// chain; later changes to the registry the chain was built from are not
/// observed. A disabled chain never resolves and runs nothing.
pub struct InterceptorChain<T: Entity> {
    registry: InterceptorRegistry<T>,
    resolved: OnceLock<Vec<Arc<dyn Interceptor<T>>>>,
    enabled: bool,
}

impl<T: Entity> InterceptorChain<T> {
    /// Creates a chain over a snapshot of `registry`.
    #[must_use]
    pub fn new(registry: InterceptorRegistry<T>, enabled: bool) -> Self {
        Self {
            registry,
            resolved: OnceLock::new(),
            enabled,
        }
    }

    /// Returns true if interceptors run.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Returns true once the interceptor set has been resolved.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.resolved.get().is_some()
    }

    /// Returns the live interceptors, resolving them on first call.
    #[must_use]
    pub fn interceptors(&self) -> &[Arc<dyn Interceptor<T>>] {
        if !self.enabled {
            return &[];
        }
        self.resolved.get_or_init(|| self.registry.resolve())
    }

    /// Invokes `action` once per interceptor, in registration order.
    ///
    /// The first error stops the chain and is returned unchanged.
    pub fn intercept<F>(&self, mut action: F) -> RepositoryResult<()>
    where
        F: FnMut(&dyn Interceptor<T>) -> RepositoryResult<()>,
    {
        for interceptor in self.interceptors() {
            action(interceptor.as_ref())?;
        }
        Ok(())
    }

    /// Runs the hook for `point` on every interceptor.
    pub fn run(&self, point: InterceptionPoint, entity: &mut T) -> RepositoryResult<()> {
        self.intercept(|interceptor| invoke(interceptor, point, &mut *entity))
    }

    /// Runs the async hook for `point` on every interceptor.
    pub async fn run_async(
        &self,
        point: InterceptionPoint,
        entity: &mut T,
        cancel: &CancellationToken,
    ) -> RepositoryResult<()> {
        for interceptor in self.interceptors() {
            invoke_async(interceptor.as_ref(), point, entity, cancel).await?;
        }
        Ok(())
    }
}

impl<T: Entity> fmt::Debug for InterceptorChain<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterceptorChain")
            .field("registry", &self.registry)
            .field("enabled", &self.enabled)
            .field("resolved", &self.is_resolved())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RepositoryError;
    use crate::test_support::Widget;
    use parking_lot::Mutex;

    type Journal = Arc<Mutex<Vec<String>>>;

    struct Named {
        name: &'static str,
        journal: Journal,
    }

    impl Interceptor<Widget> for Named {
        fn add_executing(&self, entity: &mut Widget) -> RepositoryResult<()> {
            self.journal.lock().push(format!("{}:before", self.name));
            entity.label.push_str(self.name);
            Ok(())
        }

        fn add_executed(&self, _entity: &mut Widget) -> RepositoryResult<()> {
            self.journal.lock().push(format!("{}:after", self.name));
            Ok(())
        }
    }

    struct Second(Named);
    impl Interceptor<Widget> for Second {
        fn add_executing(&self, entity: &mut Widget) -> RepositoryResult<()> {
            self.0.add_executing(entity)
        }
    }

    struct Rejecting;
    impl Interceptor<Widget> for Rejecting {
        fn add_executing(&self, _entity: &mut Widget) -> RepositoryResult<()> {
            Err(RepositoryError::interceptor("Rejecting", "no"))
        }
    }

    fn registry(journal: &Journal) -> InterceptorRegistry<Widget> {
        let mut registry = InterceptorRegistry::new();
        registry.register_instance(Named {
            name: "a",
            journal: Arc::clone(journal),
        });
        registry.register_instance(Second(Named {
            name: "b",
            journal: Arc::clone(journal),
        }));
        registry
    }

    #[test]
    fn runs_in_registration_order() {
        let journal = Journal::default();
        let chain = InterceptorChain::new(registry(&journal), true);
        let mut widget = Widget::new(1, "");

        chain.run(InterceptionPoint::AddExecuting, &mut widget).unwrap();
        chain.run(InterceptionPoint::AddExecuted, &mut widget).unwrap();

        assert_eq!(widget.label, "ab");
        assert_eq!(*journal.lock(), vec!["a:before", "b:before", "a:after"]);
    }

    #[test]
    fn error_aborts_remaining_interceptors() {
        let journal = Journal::default();
        let mut registry = InterceptorRegistry::new();
        registry.register_instance(Rejecting);
        registry.register_instance(Named {
            name: "late",
            journal: Arc::clone(&journal),
        });
        let chain = InterceptorChain::new(registry, true);

        let err = chain
            .run(InterceptionPoint::AddExecuting, &mut Widget::new(1, ""))
            .unwrap_err();
        assert_eq!(err, RepositoryError::interceptor("Rejecting", "no"));
        assert!(journal.lock().is_empty());
    }

    #[test]
    fn resolved_once_ignores_later_registrations() {
        let journal = Journal::default();
        let mut source = registry(&journal);
        let chain = InterceptorChain::new(source.clone(), true);
        assert!(!chain.is_resolved());
        assert_eq!(chain.interceptors().len(), 2);

        source.register_instance(Rejecting);
        assert_eq!(chain.interceptors().len(), 2);
    }

    #[test]
    fn disabled_chain_never_resolves() {
        let journal = Journal::default();
        let chain = InterceptorChain::new(registry(&journal), false);
        let mut widget = Widget::new(1, "");
        chain.run(InterceptionPoint::AddExecuting, &mut widget).unwrap();
        assert!(!chain.is_resolved());
        assert_eq!(widget.label, "");
    }

    #[tokio::test]
    async fn async_hooks_default_to_sync_hooks() {
        let journal = Journal::default();
        let chain = InterceptorChain::new(registry(&journal), true);
        let mut widget = Widget::new(1, "");
        chain
            .run_async(
                InterceptionPoint::AddExecuting,
                &mut widget,
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(widget.label, "ab");
    }
}
