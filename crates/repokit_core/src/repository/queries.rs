//! Queries. Interceptors never run here.

use super::Repository;
use crate::error::RepositoryResult;
use repokit_context::{Entity, KeyValue, QueryOptions, ResultEnvelope};
use std::collections::HashMap;
use std::hash::Hash;
use tokio_util::sync::CancellationToken;

/// Builds a map from `rows`. A later row replaces an earlier one with the
/// same key.
fn dictionary<T, K, V, KF, VF>(rows: Vec<T>, mut key_of: KF, mut value_of: VF) -> HashMap<K, V>
where
    K: Eq + Hash,
    KF: FnMut(&T) -> K,
    VF: FnMut(T) -> V,
{
    rows.into_iter()
        .map(|row| (key_of(&row), value_of(row)))
        .collect()
}

/// Groups `rows` by key, keeping groups in order of first appearance and
/// rows in their original order within a group.
fn groups<T, K, V, KF, VF>(rows: Vec<T>, mut key_of: KF, mut value_of: VF) -> Vec<(K, Vec<V>)>
where
    K: Eq + Hash + Clone,
    KF: FnMut(&T) -> K,
    VF: FnMut(T) -> V,
{
    let mut index: HashMap<K, usize> = HashMap::new();
    let mut grouped: Vec<(K, Vec<V>)> = Vec::new();
    for row in rows {
        let key = key_of(&row);
        let slot = *index.entry(key.clone()).or_insert_with(|| {
            grouped.push((key, Vec::new()));
            grouped.len() - 1
        });
        grouped[slot].1.push(value_of(row));
    }
    grouped
}

impl<T: Entity> Repository<T> {
    /// Key lookup shared by `find` and `find_projected`: validates the key,
    /// tries the cache, then the context.
    fn lookup(&self, operation: &'static str, keys: &[KeyValue]) -> RepositoryResult<Option<T>> {
        let key = self.key_from(keys)?;
        self.execute_cached(
            operation,
            || self.cached(&key).map(Some),
            |context| {
                let found = context.find(&key)?;
                if let Some(entity) = &found {
                    self.remember(&key, entity);
                }
                Ok(found)
            },
        )
    }

    async fn lookup_async(
        &self,
        operation: &'static str,
        keys: &[KeyValue],
        cancel: &CancellationToken,
    ) -> RepositoryResult<Option<T>> {
        let key = self.key_from(keys)?;
        let key = &key;
        self.execute_cached_async(
            operation,
            cancel,
            || self.cached(key).map(Some),
            |context| async move {
                let found = context.find_async(key, cancel).await?;
                if let Some(entity) = &found {
                    self.remember(key, entity);
                }
                Ok(found)
            },
        )
        .await
    }

    // === Find ===

    /// Finds an entity by primary key.
    ///
    /// `keys` holds one value per key field, in key order.
    ///
    /// # Errors
    ///
    /// [`RepositoryError::ArgumentNull`](crate::RepositoryError::ArgumentNull)
    /// for an empty key, [`RepositoryError::KeyArity`](crate::RepositoryError::KeyArity)
    /// for a key of the wrong length.
    pub fn find(&self, keys: &[KeyValue]) -> RepositoryResult<Option<T>> {
        self.lookup("find", keys)
    }

    /// Finds an entity by primary key and projects it.
    pub fn find_projected<R, F>(&self, keys: &[KeyValue], selector: F) -> RepositoryResult<Option<R>>
    where
        F: FnOnce(T) -> R,
    {
        Ok(self.lookup("find_projected", keys)?.map(selector))
    }

    /// Returns the first entity selected by `options`.
    pub fn find_where(&self, options: &QueryOptions<T>) -> RepositoryResult<Option<T>> {
        self.execute("find_where", |context| {
            Ok(context.find_first(options)?.into_result())
        })
    }

    /// Returns the first entity selected by `options`, projected.
    pub fn find_where_projected<R, F>(
        &self,
        options: &QueryOptions<T>,
        selector: F,
    ) -> RepositoryResult<Option<R>>
    where
        F: FnOnce(T) -> R,
    {
        self.execute("find_where_projected", |context| {
            Ok(context.find_first(options)?.into_result().map(selector))
        })
    }

    /// Async twin of [`find`](Repository::find).
    pub async fn find_async(
        &self,
        keys: &[KeyValue],
        cancel: &CancellationToken,
    ) -> RepositoryResult<Option<T>> {
        self.lookup_async("find_async", keys, cancel).await
    }

    /// Async twin of [`find_projected`](Repository::find_projected).
    pub async fn find_projected_async<R, F>(
        &self,
        keys: &[KeyValue],
        selector: F,
        cancel: &CancellationToken,
    ) -> RepositoryResult<Option<R>>
    where
        F: FnOnce(T) -> R,
    {
        Ok(self
            .lookup_async("find_projected_async", keys, cancel)
            .await?
            .map(selector))
    }

    /// Async twin of [`find_where`](Repository::find_where).
    pub async fn find_where_async(
        &self,
        options: &QueryOptions<T>,
        cancel: &CancellationToken,
    ) -> RepositoryResult<Option<T>> {
        self.execute_async("find_where_async", cancel, |context| async move {
            Ok(context.find_first_async(options, cancel).await?.into_result())
        })
        .await
    }

    /// Async twin of [`find_where_projected`](Repository::find_where_projected).
    pub async fn find_where_projected_async<R, F>(
        &self,
        options: &QueryOptions<T>,
        selector: F,
        cancel: &CancellationToken,
    ) -> RepositoryResult<Option<R>>
    where
        F: FnOnce(T) -> R,
    {
        self.execute_async("find_where_projected_async", cancel, |context| async move {
            Ok(context
                .find_first_async(options, cancel)
                .await?
                .into_result()
                .map(selector))
        })
        .await
    }

    // === FindAll ===

    /// Returns every entity.
    pub fn find_all(&self) -> RepositoryResult<Vec<T>> {
        self.execute("find_all", |context| {
            Ok(context.find_all(&QueryOptions::new())?.into_result())
        })
    }

    /// Returns the entities selected by `options`.
    pub fn find_all_where(&self, options: &QueryOptions<T>) -> RepositoryResult<Vec<T>> {
        self.execute("find_all_where", |context| {
            Ok(context.find_all(options)?.into_result())
        })
    }

    /// Returns the entities selected by `options` together with the number
    /// of matches before paging.
    pub fn find_all_with(&self, options: &QueryOptions<T>) -> RepositoryResult<ResultEnvelope<Vec<T>>> {
        self.execute("find_all_with", |context| Ok(context.find_all(options)?))
    }

    /// Projects the entities selected by `options`, keeping the total.
    pub fn find_all_projected<R, F>(
        &self,
        options: &QueryOptions<T>,
        selector: F,
    ) -> RepositoryResult<ResultEnvelope<Vec<R>>>
    where
        F: FnMut(T) -> R,
    {
        self.execute("find_all_projected", |context| {
            Ok(context
                .find_all(options)?
                .map(|rows| rows.into_iter().map(selector).collect()))
        })
    }

    /// Async twin of [`find_all`](Repository::find_all).
    pub async fn find_all_async(&self, cancel: &CancellationToken) -> RepositoryResult<Vec<T>> {
        self.execute_async("find_all_async", cancel, |context| async move {
            Ok(context
                .find_all_async(&QueryOptions::new(), cancel)
                .await?
                .into_result())
        })
        .await
    }

    /// Async twin of [`find_all_where`](Repository::find_all_where).
    pub async fn find_all_where_async(
        &self,
        options: &QueryOptions<T>,
        cancel: &CancellationToken,
    ) -> RepositoryResult<Vec<T>> {
        self.execute_async("find_all_where_async", cancel, |context| async move {
            Ok(context.find_all_async(options, cancel).await?.into_result())
        })
        .await
    }

    /// Async twin of [`find_all_with`](Repository::find_all_with).
    pub async fn find_all_with_async(
        &self,
        options: &QueryOptions<T>,
        cancel: &CancellationToken,
    ) -> RepositoryResult<ResultEnvelope<Vec<T>>> {
        self.execute_async("find_all_with_async", cancel, |context| async move {
            Ok(context.find_all_async(options, cancel).await?)
        })
        .await
    }

    /// Async twin of [`find_all_projected`](Repository::find_all_projected).
    pub async fn find_all_projected_async<R, F>(
        &self,
        options: &QueryOptions<T>,
        selector: F,
        cancel: &CancellationToken,
    ) -> RepositoryResult<ResultEnvelope<Vec<R>>>
    where
        F: FnMut(T) -> R,
    {
        self.execute_async("find_all_projected_async", cancel, |context| async move {
            Ok(context
                .find_all_async(options, cancel)
                .await?
                .map(|rows| rows.into_iter().map(selector).collect()))
        })
        .await
    }

    // === Count / Exists ===

    /// Counts every entity.
    pub fn count(&self) -> RepositoryResult<usize> {
        self.execute("count", |context| {
            Ok(context.count(&QueryOptions::new())?.into_result())
        })
    }

    /// Counts the entities matching the filter of `options`. Paging is
    /// ignored.
    pub fn count_where(&self, options: &QueryOptions<T>) -> RepositoryResult<usize> {
        self.execute("count_where", |context| {
            Ok(context.count(options)?.into_result())
        })
    }

    /// Envelope form of [`count_where`](Repository::count_where).
    pub fn count_with(&self, options: &QueryOptions<T>) -> RepositoryResult<ResultEnvelope<usize>> {
        self.execute("count_with", |context| Ok(context.count(options)?))
    }

    /// Returns true if any entity matches the filter of `options`.
    pub fn exists(&self, options: &QueryOptions<T>) -> RepositoryResult<bool> {
        self.execute("exists", |context| {
            Ok(context.exists(options)?.into_result())
        })
    }

    /// Returns true if an entity with the given key exists.
    pub fn exists_key(&self, keys: &[KeyValue]) -> RepositoryResult<bool> {
        let key = self.key_from(keys)?;
        self.execute("exists_key", |context| Ok(context.find(&key)?.is_some()))
    }

    /// Envelope form of [`exists`](Repository::exists).
    pub fn exists_with(&self, options: &QueryOptions<T>) -> RepositoryResult<ResultEnvelope<bool>> {
        self.execute("exists_with", |context| Ok(context.exists(options)?))
    }

    /// Async twin of [`count`](Repository::count).
    pub async fn count_async(&self, cancel: &CancellationToken) -> RepositoryResult<usize> {
        self.execute_async("count_async", cancel, |context| async move {
            Ok(context
                .count_async(&QueryOptions::new(), cancel)
                .await?
                .into_result())
        })
        .await
    }

    /// Async twin of [`count_where`](Repository::count_where).
    pub async fn count_where_async(
        &self,
        options: &QueryOptions<T>,
        cancel: &CancellationToken,
    ) -> RepositoryResult<usize> {
        self.execute_async("count_where_async", cancel, |context| async move {
            Ok(context.count_async(options, cancel).await?.into_result())
        })
        .await
    }

    /// Async twin of [`count_with`](Repository::count_with).
    pub async fn count_with_async(
        &self,
        options: &QueryOptions<T>,
        cancel: &CancellationToken,
    ) -> RepositoryResult<ResultEnvelope<usize>> {
        self.execute_async("count_with_async", cancel, |context| async move {
            Ok(context.count_async(options, cancel).await?)
        })
        .await
    }

    /// Async twin of [`exists`](Repository::exists).
    pub async fn exists_async(
        &self,
        options: &QueryOptions<T>,
        cancel: &CancellationToken,
    ) -> RepositoryResult<bool> {
        self.execute_async("exists_async", cancel, |context| async move {
            Ok(context.exists_async(options, cancel).await?.into_result())
        })
        .await
    }

    /// Async twin of [`exists_key`](Repository::exists_key).
    pub async fn exists_key_async(
        &self,
        keys: &[KeyValue],
        cancel: &CancellationToken,
    ) -> RepositoryResult<bool> {
        let key = self.key_from(keys)?;
        self.execute_async("exists_key_async", cancel, |context| async move {
            Ok(context.find_async(&key, cancel).await?.is_some())
        })
        .await
    }

    /// Async twin of [`exists_with`](Repository::exists_with).
    pub async fn exists_with_async(
        &self,
        options: &QueryOptions<T>,
        cancel: &CancellationToken,
    ) -> RepositoryResult<ResultEnvelope<bool>> {
        self.execute_async("exists_with_async", cancel, |context| async move {
            Ok(context.exists_async(options, cancel).await?)
        })
        .await
    }

    // === Dictionaries and groups ===

    /// Maps the entities selected by `options` by a derived key. A later
    /// entity replaces an earlier one with the same key.
    pub fn to_dictionary<K, KF>(&self, options: &QueryOptions<T>, key_of: KF) -> RepositoryResult<HashMap<K, T>>
    where
        K: Eq + Hash,
        KF: FnMut(&T) -> K,
    {
        self.execute("to_dictionary", |context| {
            let rows = context.find_all(options)?.into_result();
            Ok(dictionary(rows, key_of, |row| row))
        })
    }

    /// Like [`to_dictionary`](Repository::to_dictionary) with projected
    /// values.
    pub fn to_dictionary_projected<K, V, KF, VF>(
        &self,
        options: &QueryOptions<T>,
        key_of: KF,
        value_of: VF,
    ) -> RepositoryResult<HashMap<K, V>>
    where
        K: Eq + Hash,
        KF: FnMut(&T) -> K,
        VF: FnMut(T) -> V,
    {
        self.execute("to_dictionary_projected", |context| {
            let rows = context.find_all(options)?.into_result();
            Ok(dictionary(rows, key_of, value_of))
        })
    }

    /// Groups the entities selected by `options` by a derived key.
    ///
    /// Groups appear in order of their first entity; entities keep their
    /// query order within a group.
    pub fn group_by<K, KF>(&self, options: &QueryOptions<T>, key_of: KF) -> RepositoryResult<Vec<(K, Vec<T>)>>
    where
        K: Eq + Hash + Clone,
        KF: FnMut(&T) -> K,
    {
        self.execute("group_by", |context| {
            let rows = context.find_all(options)?.into_result();
            Ok(groups(rows, key_of, |row| row))
        })
    }

    /// Like [`group_by`](Repository::group_by) with projected values.
    pub fn group_by_projected<K, V, KF, VF>(
        &self,
        options: &QueryOptions<T>,
        key_of: KF,
        value_of: VF,
    ) -> RepositoryResult<Vec<(K, Vec<V>)>>
    where
        K: Eq + Hash + Clone,
        KF: FnMut(&T) -> K,
        VF: FnMut(T) -> V,
    {
        self.execute("group_by_projected", |context| {
            let rows = context.find_all(options)?.into_result();
            Ok(groups(rows, key_of, value_of))
        })
    }

    /// Async twin of [`to_dictionary`](Repository::to_dictionary).
    pub async fn to_dictionary_async<K, KF>(
        &self,
        options: &QueryOptions<T>,
        key_of: KF,
        cancel: &CancellationToken,
    ) -> RepositoryResult<HashMap<K, T>>
    where
        K: Eq + Hash,
        KF: FnMut(&T) -> K,
    {
        self.execute_async("to_dictionary_async", cancel, |context| async move {
            let rows = context.find_all_async(options, cancel).await?.into_result();
            Ok(dictionary(rows, key_of, |row| row))
        })
        .await
    }

    /// Async twin of [`to_dictionary_projected`](Repository::to_dictionary_projected).
    pub async fn to_dictionary_projected_async<K, V, KF, VF>(
        &self,
        options: &QueryOptions<T>,
        key_of: KF,
        value_of: VF,
        cancel: &CancellationToken,
    ) -> RepositoryResult<HashMap<K, V>>
    where
        K: Eq + Hash,
        KF: FnMut(&T) -> K,
        VF: FnMut(T) -> V,
    {
        self.execute_async("to_dictionary_projected_async", cancel, |context| async move {
            let rows = context.find_all_async(options, cancel).await?.into_result();
            Ok(dictionary(rows, key_of, value_of))
        })
        .await
    }

    /// Async twin of [`group_by`](Repository::group_by).
    pub async fn group_by_async<K, KF>(
        &self,
        options: &QueryOptions<T>,
        key_of: KF,
        cancel: &CancellationToken,
    ) -> RepositoryResult<Vec<(K, Vec<T>)>>
    where
        K: Eq + Hash + Clone,
        KF: FnMut(&T) -> K,
    {
        self.execute_async("group_by_async", cancel, |context| async move {
            let rows = context.find_all_async(options, cancel).await?.into_result();
            Ok(groups(rows, key_of, |row| row))
        })
        .await
    }

    /// Async twin of [`group_by_projected`](Repository::group_by_projected).
    pub async fn group_by_projected_async<K, V, KF, VF>(
        &self,
        options: &QueryOptions<T>,
        key_of: KF,
        value_of: VF,
        cancel: &CancellationToken,
    ) -> RepositoryResult<Vec<(K, Vec<V>)>>
    where
        K: Eq + Hash + Clone,
        KF: FnMut(&T) -> K,
        VF: FnMut(T) -> V,
    {
        self.execute_async("group_by_projected_async", cancel, |context| async move {
            let rows = context.find_all_async(options, cancel).await?.into_result();
            Ok(groups(rows, key_of, value_of))
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_keep_first_appearance_order() {
        let grouped = groups(vec![3, 1, 4, 1, 5, 9, 2, 6], |n| n % 3, |n| n);
        assert_eq!(
            grouped,
            vec![(0, vec![3, 9, 6]), (1, vec![1, 4, 1]), (2, vec![5, 2])]
        );
    }

    #[test]
    fn dictionary_last_row_wins() {
        let map = dictionary(vec![("a", 1), ("b", 2), ("a", 3)], |row| row.0, |row| row.1);
        assert_eq!(map.len(), 2);
        assert_eq!(map["a"], 3);
    }
}
