//! Repository configuration.

use crate::cache::CacheProvider;
use crate::error::{RepositoryError, RepositoryResult};
use crate::interceptor::{Interceptor, InterceptorRegistry};
use crate::logging::LoggerProvider;
use repokit_context::{AsyncAdapter, ContextFactory, Conventions, Entity, InMemoryDatabase};
use std::fmt;
use std::sync::Arc;

/// Where a repository gets its storage context from.
pub enum ContextSource<T: Entity> {
    /// A fresh context is created per top-level operation and disposed
    /// when that operation completes.
    Factory(Arc<dyn ContextFactory<T>>),
    /// A context owned by an external unit of work. It is used by every
    /// operation and never disposed by the repository.
    Shared(AsyncAdapter<T>),
}

impl<T: Entity> ContextSource<T> {
    /// Returns true for a shared context.
    #[must_use]
    pub fn is_shared(&self) -> bool {
        matches!(self, Self::Shared(_))
    }
}

impl<T: Entity> Clone for ContextSource<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Factory(factory) => Self::Factory(Arc::clone(factory)),
            Self::Shared(adapter) => Self::Shared(adapter.clone()),
        }
    }
}

impl<T: Entity> fmt::Debug for ContextSource<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Factory(_) => f.write_str("Factory"),
            Self::Shared(adapter) => f.debug_tuple("Shared").field(adapter).finish(),
        }
    }
}

/// Immutable configuration of a [`Repository`](crate::Repository).
///
/// Built once by [`RepositoryOptionsBuilder`]. The `with_*` methods on a
/// built value return modified copies and never change the original.
pub struct RepositoryOptions<T: Entity> {
    source: ContextSource<T>,
    logger_provider: Arc<dyn LoggerProvider>,
    cache: Option<Arc<dyn CacheProvider>>,
    conventions: Conventions,
    interceptors: InterceptorRegistry<T>,
    interceptors_enabled: bool,
}

impl<T: Entity> RepositoryOptions<T> {
    /// Starts building options.
    #[must_use]
    pub fn builder() -> RepositoryOptionsBuilder<T> {
        RepositoryOptionsBuilder::new()
    }

    /// Returns the context source.
    #[must_use]
    pub fn source(&self) -> &ContextSource<T> {
        &self.source
    }

    /// Returns the logger provider.
    #[must_use]
    pub fn logger_provider(&self) -> &Arc<dyn LoggerProvider> {
        &self.logger_provider
    }

    /// Returns the cache provider, if configured.
    #[must_use]
    pub fn cache_provider(&self) -> Option<&Arc<dyn CacheProvider>> {
        self.cache.as_ref()
    }

    /// Returns the key discovery conventions.
    #[must_use]
    pub fn conventions(&self) -> &Conventions {
        &self.conventions
    }

    /// Returns the interceptor registrations.
    #[must_use]
    pub fn interceptors(&self) -> &InterceptorRegistry<T> {
        &self.interceptors
    }

    /// Returns true if interceptors run.
    #[must_use]
    pub fn interceptors_enabled(&self) -> bool {
        self.interceptors_enabled
    }

    /// Returns a copy using a context factory.
    #[must_use]
    pub fn with_context_factory<F>(&self, factory: F) -> Self
    where
        F: ContextFactory<T> + 'static,
    {
        let mut options = self.clone();
        options.source = ContextSource::Factory(Arc::new(factory));
        options
    }

    /// Returns a copy using a shared context.
    #[must_use]
    pub fn with_shared_context(&self, context: AsyncAdapter<T>) -> Self {
        let mut options = self.clone();
        options.source = ContextSource::Shared(context);
        options
    }

    /// Returns a copy with a different logger provider.
    #[must_use]
    pub fn with_logger_provider(&self, provider: Arc<dyn LoggerProvider>) -> Self {
        let mut options = self.clone();
        options.logger_provider = provider;
        options
    }

    /// Returns a copy with a cache provider.
    #[must_use]
    pub fn with_cache_provider(&self, cache: Arc<dyn CacheProvider>) -> Self {
        let mut options = self.clone();
        options.cache = Some(cache);
        options
    }

    /// Returns a copy with different conventions.
    #[must_use]
    pub fn with_conventions(&self, conventions: Conventions) -> Self {
        let mut options = self.clone();
        options.conventions = conventions;
        options
    }

    /// Returns a copy with one more interceptor registered.
    #[must_use]
    pub fn with_interceptor<I>(&self, interceptor: I) -> Self
    where
        I: Interceptor<T> + 'static,
    {
        let mut options = self.clone();
        options.interceptors.register_instance(interceptor);
        options
    }

    /// Returns a copy with interceptors switched on or off.
    #[must_use]
    pub fn with_interceptors_enabled(&self, enabled: bool) -> Self {
        let mut options = self.clone();
        options.interceptors_enabled = enabled;
        options
    }
}

impl<T: Entity> Clone for RepositoryOptions<T> {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
            logger_provider: Arc::clone(&self.logger_provider),
            cache: self.cache.clone(),
            conventions: self.conventions.clone(),
            interceptors: self.interceptors.clone(),
            interceptors_enabled: self.interceptors_enabled,
        }
    }
}

impl<T: Entity> fmt::Debug for RepositoryOptions<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepositoryOptions")
            .field("source", &self.source)
            .field("cache", &self.cache.is_some())
            .field("conventions", &self.conventions)
            .field("interceptors", &self.interceptors)
            .field("interceptors_enabled", &self.interceptors_enabled)
            .finish_non_exhaustive()
    }
}

/// Builder for [`RepositoryOptions`].
///
/// # Example
///
/// ```rust
/// use repokit_core::{InMemoryDatabase, RepositoryOptions, TracingLoggerProvider};
/// # use repokit_core::{Entity, KeyValue};
/// # #[derive(Clone)] struct Note { id: i64 }
/// # impl Entity for Note {
/// #     fn entity_name() -> &'static str { "Note" }
/// #     fn fields() -> &'static [&'static str] { &["id"] }
/// #     fn key_value(&self, f: &str) -> Option<KeyValue> { (f == "id").then(|| KeyValue::Int(self.id)) }
/// # }
/// use std::sync::Arc;
///
/// let db = InMemoryDatabase::<Note>::new().unwrap();
/// let options = RepositoryOptions::builder()
///     .with_in_memory_database(&db)
///     .with_logger_provider(Arc::new(TracingLoggerProvider))
///     .build()
///     .unwrap();
/// assert!(!options.source().is_shared());
/// ```
pub struct RepositoryOptionsBuilder<T: Entity> {
    factory: Option<Arc<dyn ContextFactory<T>>>,
    shared: Option<AsyncAdapter<T>>,
    logger_provider: Option<Arc<dyn LoggerProvider>>,
    cache: Option<Arc<dyn CacheProvider>>,
    conventions: Conventions,
    interceptors: InterceptorRegistry<T>,
    interceptors_enabled: bool,
}

impl<T: Entity> RepositoryOptionsBuilder<T> {
    /// Creates an empty builder. Interceptors are enabled by default.
    #[must_use]
    pub fn new() -> Self {
        Self {
            factory: None,
            shared: None,
            logger_provider: None,
            cache: None,
            conventions: Conventions::new(),
            interceptors: InterceptorRegistry::new(),
            interceptors_enabled: true,
        }
    }

    /// Sets the context factory.
    #[must_use]
    pub fn with_context_factory<F>(mut self, factory: F) -> Self
    where
        F: ContextFactory<T> + 'static,
    {
        self.factory = Some(Arc::new(factory));
        self
    }

    /// Uses a factory over an in-memory database.
    #[must_use]
    pub fn with_in_memory_database(self, database: &InMemoryDatabase<T>) -> Self {
        self.with_context_factory(database.factory())
    }

    /// Sets a shared context owned by the caller.
    #[must_use]
    pub fn with_shared_context(mut self, context: AsyncAdapter<T>) -> Self {
        self.shared = Some(context);
        self
    }

    /// Sets the logger provider.
    #[must_use]
    pub fn with_logger_provider(mut self, provider: Arc<dyn LoggerProvider>) -> Self {
        self.logger_provider = Some(provider);
        self
    }

    /// Sets the cache provider.
    #[must_use]
    pub fn with_cache_provider(mut self, cache: Arc<dyn CacheProvider>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Sets the key discovery conventions.
    #[must_use]
    pub fn with_conventions(mut self, conventions: Conventions) -> Self {
        self.conventions = conventions;
        self
    }

    /// Registers an interceptor instance. A later registration of the same
    /// type replaces this one.
    #[must_use]
    pub fn with_interceptor<I>(mut self, interceptor: I) -> Self
    where
        I: Interceptor<T> + 'static,
    {
        self.interceptors.register_instance(interceptor);
        self
    }

    /// Registers a deferred interceptor factory, run at most once.
    #[must_use]
    pub fn with_interceptor_factory<I, F>(mut self, factory: F) -> Self
    where
        I: Interceptor<T> + 'static,
        F: Fn() -> Option<I> + Send + Sync + 'static,
    {
        self.interceptors.register(factory);
        self
    }

    /// Switches interceptors on or off.
    #[must_use]
    pub fn with_interceptors_enabled(mut self, enabled: bool) -> Self {
        self.interceptors_enabled = enabled;
        self
    }

    /// Validates and freezes the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Configuration`] unless exactly one of a
    /// context factory or a shared context is set, or if no logger provider
    /// is set.
    pub fn build(self) -> RepositoryResult<RepositoryOptions<T>> {
        let source = match (self.factory, self.shared) {
            (Some(factory), None) => ContextSource::Factory(factory),
            (None, Some(shared)) => ContextSource::Shared(shared),
            (Some(_), Some(_)) => {
                return Err(RepositoryError::configuration(
                    "both a context factory and a shared context are configured",
                ))
            }
            (None, None) => {
                return Err(RepositoryError::configuration(
                    "no context factory or shared context configured",
                ))
            }
        };
        let logger_provider = self
            .logger_provider
            .ok_or_else(|| RepositoryError::configuration("no logger provider configured"))?;

        Ok(RepositoryOptions {
            source,
            logger_provider,
            cache: self.cache,
            conventions: self.conventions,
            interceptors: self.interceptors,
            interceptors_enabled: self.interceptors_enabled,
        })
    }
}

impl<T: Entity> Default for RepositoryOptionsBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}
