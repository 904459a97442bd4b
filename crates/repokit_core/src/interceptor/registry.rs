//! Type-keyed interceptor registrations.

use super::Interceptor;
use repokit_context::Entity;
use std::any::{type_name, TypeId};
use std::fmt;
use std::sync::{Arc, OnceLock};

type InterceptorFactory<T> = Box<dyn Fn() -> Option<Arc<dyn Interceptor<T>>> + Send + Sync>;

struct Registration<T: Entity> {
    type_id: TypeId,
    name: &'static str,
    factory: InterceptorFactory<T>,
    instance: OnceLock<Option<Arc<dyn Interceptor<T>>>>,
}

impl<T: Entity> Registration<T> {
    fn instance(&self) -> Option<Arc<dyn Interceptor<T>>> {
        self.instance.get_or_init(|| (self.factory)()).clone()
    }
}

/// Interceptor factories keyed by interceptor type.
///
/// - Registering a second interceptor of the same type replaces the first
///   in place; its position in the order is kept.
/// - Each factory runs at most once, on first resolution. A factory
///   returning `None` contributes no interceptor.
/// - Clones share registrations, so every clone sees the same live
///   instance of a given type.
pub struct InterceptorRegistry<T: Entity> {
    registrations: Vec<Arc<Registration<T>>>,
}

impl<T: Entity> InterceptorRegistry<T> {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            registrations: Vec::new(),
        }
    }

    /// Registers a deferred interceptor factory for type `I`.
    pub fn register<I, F>(&mut self, factory: F)
    where
        I: Interceptor<T> + 'static,
        F: Fn() -> Option<I> + Send + Sync + 'static,
    {
        let factory: InterceptorFactory<T> = Box::new(move || {
            factory().map(|interceptor| Arc::new(interceptor) as Arc<dyn Interceptor<T>>)
        });
        self.insert(Registration {
            type_id: TypeId::of::<I>(),
            name: type_name::<I>(),
            factory,
            instance: OnceLock::new(),
        });
    }

    /// Registers an already-built interceptor of type `I`.
    pub fn register_instance<I>(&mut self, interceptor: I)
    where
        I: Interceptor<T> + 'static,
    {
        let shared: Arc<dyn Interceptor<T>> = Arc::new(interceptor);
        self.insert(Registration {
            type_id: TypeId::of::<I>(),
            name: type_name::<I>(),
            factory: Box::new(move || Some(Arc::clone(&shared))),
            instance: OnceLock::new(),
        });
    }

    /// Removes the registration for type `I`, returning true if one existed.
    pub fn unregister<I>(&mut self) -> bool
    where
        I: Interceptor<T> + 'static,
    {
        let before = self.registrations.len();
        self.registrations
            .retain(|registration| registration.type_id != TypeId::of::<I>());
        self.registrations.len() != before
    }

    /// Returns true if an interceptor of type `I` is registered.
    #[must_use]
    pub fn contains<I>(&self) -> bool
    where
        I: Interceptor<T> + 'static,
    {
        self.registrations
            .iter()
            .any(|registration| registration.type_id == TypeId::of::<I>())
    }

    /// Number of registrations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    /// Registered interceptor type names, in order.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.registrations
            .iter()
            .map(|registration| registration.name)
            .collect()
    }

    /// Instantiates every registration (at most once each) and returns the
    /// live interceptors in registration order.
    #[must_use]
    pub fn resolve(&self) -> Vec<Arc<dyn Interceptor<T>>> {
        self.registrations
            .iter()
            .filter_map(|registration| registration.instance())
            .collect()
    }

    fn insert(&mut self, registration: Registration<T>) {
        let registration = Arc::new(registration);
        match self
            .registrations
            .iter_mut()
            .find(|existing| existing.type_id == registration.type_id)
        {
            Some(existing) => *existing = registration,
            None => self.registrations.push(registration),
        }
    }
}

impl<T: Entity> Default for InterceptorRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Entity> Clone for InterceptorRegistry<T> {
    fn clone(&self) -> Self {
        Self {
            registrations: self.registrations.clone(),
        }
    }
}

impl<T: Entity> fmt::Debug for InterceptorRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterceptorRegistry")
            .field("interceptors", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::Widget;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Tagger(&'static str);
    impl Interceptor<Widget> for Tagger {}

    struct Other;
    impl Interceptor<Widget> for Other {}

    #[test]
    fn same_type_replaces_in_place() {
        let mut registry = InterceptorRegistry::<Widget>::new();
        registry.register_instance(Tagger("first"));
        registry.register_instance(Other);
        registry.register_instance(Tagger("second"));

        assert_eq!(registry.len(), 2);
        let names = registry.names();
        assert!(names[0].ends_with("Tagger"));
        assert!(names[1].ends_with("Other"));
    }

    #[test]
    fn factories_run_once_and_lazily() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let mut registry = InterceptorRegistry::<Widget>::new();
        registry.register(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Some(Other)
        });
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let first = registry.resolve();
        let second = registry.clone().resolve();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&first[0], &second[0]));
    }

    #[test]
    fn none_results_are_filtered() {
        let mut registry = InterceptorRegistry::<Widget>::new();
        registry.register(|| None::<Other>);
        registry.register_instance(Tagger("kept"));
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.resolve().len(), 1);
    }

    #[test]
    fn unregister_and_contains() {
        let mut registry = InterceptorRegistry::<Widget>::new();
        registry.register_instance(Other);
        assert!(registry.contains::<Other>());
        assert!(!registry.contains::<Tagger>());
        assert!(registry.unregister::<Other>());
        assert!(!registry.unregister::<Other>());
        assert!(registry.is_empty());
    }
}
