//! Query options passed to storage contexts.
//!
//! Query options are deliberately opaque host-language closures: a filter
//! predicate, ordered comparators and an optional page. Backends that can
//! translate them natively may do so; the in-memory backend evaluates them
//! directly.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// A filter predicate over entities.
pub type Filter<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

/// A comparator used for sorting.
pub type Comparator<T> = Arc<dyn Fn(&T, &T) -> Ordering + Send + Sync>;

/// A page request. `index` is zero-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paging {
    /// Zero-based page index.
    pub index: usize,
    /// Maximum number of rows per page.
    pub size: usize,
}

impl Paging {
    /// Creates a page request.
    #[must_use]
    pub const fn new(index: usize, size: usize) -> Self {
        Self { index, size }
    }

    /// Number of rows skipped before this page.
    #[must_use]
    pub const fn offset(&self) -> usize {
        self.index.saturating_mul(self.size)
    }
}

/// Options controlling which entities a query returns.
///
/// An empty `QueryOptions` matches every entity, unsorted and unpaged.
pub struct QueryOptions<T> {
    filter: Option<Filter<T>>,
    sorting: Vec<Comparator<T>>,
    paging: Option<Paging>,
}

impl<T> QueryOptions<T> {
    /// Creates options matching every entity.
    #[must_use]
    pub fn new() -> Self {
        Self {
            filter: None,
            sorting: Vec::new(),
            paging: None,
        }
    }

    /// Sets the filter predicate, replacing any previous one.
    #[must_use]
    pub fn with_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Arc::new(filter));
        self
    }

    /// Appends a sort comparator. Earlier comparators take precedence.
    #[must_use]
    pub fn with_sort<F>(mut self, compare: F) -> Self
    where
        F: Fn(&T, &T) -> Ordering + Send + Sync + 'static,
    {
        self.sorting.push(Arc::new(compare));
        self
    }

    /// Requests a single page of results.
    #[must_use]
    pub fn with_paging(mut self, index: usize, size: usize) -> Self {
        self.paging = Some(Paging::new(index, size));
        self
    }

    /// Returns the same options without paging.
    #[must_use]
    pub fn without_paging(&self) -> Self {
        Self {
            filter: self.filter.clone(),
            sorting: self.sorting.clone(),
            paging: None,
        }
    }

    /// Returns the page request, if any.
    #[must_use]
    pub fn paging(&self) -> Option<Paging> {
        self.paging
    }

    /// Returns true if a page was requested.
    #[must_use]
    pub fn is_paged(&self) -> bool {
        self.paging.is_some()
    }

    /// Returns true if an entity passes the filter.
    #[must_use]
    pub fn matches(&self, entity: &T) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(entity))
    }

    /// Compares two entities using the configured comparators.
    #[must_use]
    pub fn compare(&self, a: &T, b: &T) -> Ordering {
        self.sorting
            .iter()
            .map(|compare| compare(a, b))
            .find(|ordering| *ordering != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    }

    /// Returns true if any comparator is configured.
    #[must_use]
    pub fn is_sorted(&self) -> bool {
        !self.sorting.is_empty()
    }

    /// Applies filter, sort and paging to a materialized set.
    ///
    /// Returns the selected rows and the number of rows that matched the
    /// filter before paging.
    pub fn apply<I>(&self, rows: I) -> (Vec<T>, usize)
    where
        I: IntoIterator<Item = T>,
    {
        let mut matched: Vec<T> = rows.into_iter().filter(|row| self.matches(row)).collect();
        if self.is_sorted() {
            matched.sort_by(|a, b| self.compare(a, b));
        }
        let total = matched.len();
        let selected = match self.paging {
            Some(page) => matched
                .into_iter()
                .skip(page.offset())
                .take(page.size)
                .collect(),
            None => matched,
        };
        (selected, total)
    }
}

impl<T> Default for QueryOptions<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for QueryOptions<T> {
    fn clone(&self) -> Self {
        Self {
            filter: self.filter.clone(),
            sorting: self.sorting.clone(),
            paging: self.paging,
        }
    }
}

impl<T> fmt::Debug for QueryOptions<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryOptions")
            .field("filtered", &self.filter.is_some())
            .field("sort_keys", &self.sorting.len())
            .field("paging", &self.paging)
            .finish()
    }
}
