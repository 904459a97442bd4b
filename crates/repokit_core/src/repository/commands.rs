//! Mutations: add, update and delete.

use super::Repository;
use crate::error::RepositoryResult;
use crate::interceptor::InterceptionPoint;
use repokit_context::{AsyncAdapter, ContextResult, Entity, KeyValue, QueryOptions};
use std::slice;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mutation {
    Add,
    Update,
    Delete,
}

impl Mutation {
    fn executing(self) -> InterceptionPoint {
        match self {
            Self::Add => InterceptionPoint::AddExecuting,
            Self::Update => InterceptionPoint::UpdateExecuting,
            Self::Delete => InterceptionPoint::DeleteExecuting,
        }
    }

    fn executed(self) -> InterceptionPoint {
        match self {
            Self::Add => InterceptionPoint::AddExecuted,
            Self::Update => InterceptionPoint::UpdateExecuted,
            Self::Delete => InterceptionPoint::DeleteExecuted,
        }
    }

    fn track<T: Entity>(self, context: &AsyncAdapter<T>, entity: &T) -> ContextResult<()> {
        match self {
            Self::Add => context.add(entity),
            Self::Update => context.update(entity),
            Self::Delete => context.remove(entity),
        }
    }

    async fn track_async<T: Entity>(
        self,
        context: &AsyncAdapter<T>,
        entity: &T,
        cancel: &CancellationToken,
    ) -> ContextResult<()> {
        match self {
            Self::Add => context.add_async(entity, cancel).await,
            Self::Update => context.update_async(entity, cancel).await,
            Self::Delete => context.remove_async(entity, cancel).await,
        }
    }
}

impl<T: Entity> Repository<T> {
    /// Runs `executing` hooks and tracks each entity, saves once, then
    /// runs `executed` hooks.
    fn mutate(
        &self,
        context: &AsyncAdapter<T>,
        mutation: Mutation,
        entities: &mut [T],
    ) -> RepositoryResult<usize> {
        for entity in entities.iter_mut() {
            self.chain.run(mutation.executing(), entity)?;
            mutation.track(context, &*entity)?;
        }
        let affected = context.save_changes()?;
        self.forget(entities);
        for entity in entities.iter_mut() {
            self.chain.run(mutation.executed(), entity)?;
        }
        Ok(affected)
    }

    async fn mutate_async(
        &self,
        context: &AsyncAdapter<T>,
        mutation: Mutation,
        entities: &mut [T],
        cancel: &CancellationToken,
    ) -> RepositoryResult<usize> {
        for entity in entities.iter_mut() {
            self.chain
                .run_async(mutation.executing(), entity, cancel)
                .await?;
            mutation.track_async(context, &*entity, cancel).await?;
        }
        let affected = context.save_changes_async(cancel).await?;
        self.forget(entities);
        for entity in entities.iter_mut() {
            self.chain
                .run_async(mutation.executed(), entity, cancel)
                .await?;
        }
        Ok(affected)
    }

    // === Add ===

    /// Adds an entity and saves.
    ///
    /// Interceptors may modify `entity`; the stored row reflects their
    /// `add_executing` changes.
    pub fn add(&self, entity: &mut T) -> RepositoryResult<()> {
        self.execute("add", |context| {
            self.mutate(context, Mutation::Add, slice::from_mut(entity))
                .map(|_| ())
        })
    }

    /// Adds several entities and saves them together.
    pub fn add_range(&self, entities: &mut [T]) -> RepositoryResult<()> {
        self.execute("add_range", |context| {
            self.mutate(context, Mutation::Add, entities).map(|_| ())
        })
    }

    /// Async twin of [`add`](Repository::add).
    pub async fn add_async(&self, entity: &mut T, cancel: &CancellationToken) -> RepositoryResult<()> {
        self.execute_async("add_async", cancel, |context| async move {
            self.mutate_async(&context, Mutation::Add, slice::from_mut(entity), cancel)
                .await
                .map(|_| ())
        })
        .await
    }

    /// Async twin of [`add_range`](Repository::add_range).
    pub async fn add_range_async(
        &self,
        entities: &mut [T],
        cancel: &CancellationToken,
    ) -> RepositoryResult<()> {
        self.execute_async("add_range_async", cancel, |context| async move {
            self.mutate_async(&context, Mutation::Add, entities, cancel)
                .await
                .map(|_| ())
        })
        .await
    }

    // === Update ===

    /// Updates an entity and saves.
    pub fn update(&self, entity: &mut T) -> RepositoryResult<()> {
        self.execute("update", |context| {
            self.mutate(context, Mutation::Update, slice::from_mut(entity))
                .map(|_| ())
        })
    }

    /// Updates several entities and saves them together.
    pub fn update_range(&self, entities: &mut [T]) -> RepositoryResult<()> {
        self.execute("update_range", |context| {
            self.mutate(context, Mutation::Update, entities).map(|_| ())
        })
    }

    /// Applies `change` to every entity selected by `options`, then updates
    /// them as one range. Returns the number of entities updated.
    pub fn update_where<F>(&self, options: &QueryOptions<T>, mut change: F) -> RepositoryResult<usize>
    where
        F: FnMut(&mut T),
    {
        self.execute("update_where", |context| {
            let mut rows = context.find_all(options)?.into_result();
            rows.iter_mut().for_each(&mut change);
            self.mutate(context, Mutation::Update, &mut rows)?;
            Ok(rows.len())
        })
    }

    /// Async twin of [`update`](Repository::update).
    pub async fn update_async(
        &self,
        entity: &mut T,
        cancel: &CancellationToken,
    ) -> RepositoryResult<()> {
        self.execute_async("update_async", cancel, |context| async move {
            self.mutate_async(&context, Mutation::Update, slice::from_mut(entity), cancel)
                .await
                .map(|_| ())
        })
        .await
    }

    /// Async twin of [`update_range`](Repository::update_range).
    pub async fn update_range_async(
        &self,
        entities: &mut [T],
        cancel: &CancellationToken,
    ) -> RepositoryResult<()> {
        self.execute_async("update_range_async", cancel, |context| async move {
            self.mutate_async(&context, Mutation::Update, entities, cancel)
                .await
                .map(|_| ())
        })
        .await
    }

    /// Async twin of [`update_where`](Repository::update_where).
    pub async fn update_where_async<F>(
        &self,
        options: &QueryOptions<T>,
        mut change: F,
        cancel: &CancellationToken,
    ) -> RepositoryResult<usize>
    where
        F: FnMut(&mut T),
    {
        self.execute_async("update_where_async", cancel, |context| async move {
            let mut rows = context.find_all_async(options, cancel).await?.into_result();
            rows.iter_mut().for_each(&mut change);
            self.mutate_async(&context, Mutation::Update, &mut rows, cancel)
                .await?;
            Ok(rows.len())
        })
        .await
    }

    // === Delete ===

    /// Deletes an entity and saves.
    pub fn delete(&self, entity: &mut T) -> RepositoryResult<()> {
        self.execute("delete", |context| {
            self.mutate(context, Mutation::Delete, slice::from_mut(entity))
                .map(|_| ())
        })
    }

    /// Deletes several entities and saves.
    pub fn delete_range(&self, entities: &mut [T]) -> RepositoryResult<()> {
        self.execute("delete_range", |context| {
            self.mutate(context, Mutation::Delete, entities).map(|_| ())
        })
    }

    /// Deletes the entity with the given key, if present.
    ///
    /// Returns true if an entity was deleted.
    ///
    /// # Errors
    ///
    /// Fails with an argument error if `keys` is empty or does not match
    /// the key arity of `T`.
    pub fn delete_by_key(&self, keys: &[KeyValue]) -> RepositoryResult<bool> {
        let key = self.key_from(keys)?;
        self.execute("delete_by_key", |context| match context.find(&key)? {
            Some(mut entity) => {
                self.mutate(context, Mutation::Delete, slice::from_mut(&mut entity))?;
                Ok(true)
            }
            None => Ok(false),
        })
    }

    /// Deletes every entity selected by `options`.
    ///
    /// The matching set is materialized with `find_all` first and then
    /// deleted as a range, so each deleted entity passes through the
    /// delete interceptors. Returns the number of entities deleted.
    pub fn delete_where(&self, options: &QueryOptions<T>) -> RepositoryResult<usize> {
        self.execute("delete_where", |context| {
            let mut rows = context.find_all(options)?.into_result();
            self.mutate(context, Mutation::Delete, &mut rows)?;
            Ok(rows.len())
        })
    }

    /// Async twin of [`delete`](Repository::delete).
    pub async fn delete_async(
        &self,
        entity: &mut T,
        cancel: &CancellationToken,
    ) -> RepositoryResult<()> {
        self.execute_async("delete_async", cancel, |context| async move {
            self.mutate_async(&context, Mutation::Delete, slice::from_mut(entity), cancel)
                .await
                .map(|_| ())
        })
        .await
    }

    /// Async twin of [`delete_range`](Repository::delete_range).
    pub async fn delete_range_async(
        &self,
        entities: &mut [T],
        cancel: &CancellationToken,
    ) -> RepositoryResult<()> {
        self.execute_async("delete_range_async", cancel, |context| async move {
            self.mutate_async(&context, Mutation::Delete, entities, cancel)
                .await
                .map(|_| ())
        })
        .await
    }

    /// Async twin of [`delete_by_key`](Repository::delete_by_key).
    pub async fn delete_by_key_async(
        &self,
        keys: &[KeyValue],
        cancel: &CancellationToken,
    ) -> RepositoryResult<bool> {
        let key = self.key_from(keys)?;
        self.execute_async("delete_by_key_async", cancel, |context| async move {
            match context.find_async(&key, cancel).await? {
                Some(mut entity) => {
                    self.mutate_async(
                        &context,
                        Mutation::Delete,
                        slice::from_mut(&mut entity),
                        cancel,
                    )
                    .await?;
                    Ok(true)
                }
                None => Ok(false),
            }
        })
        .await
    }

    /// Async twin of [`delete_where`](Repository::delete_where).
    pub async fn delete_where_async(
        &self,
        options: &QueryOptions<T>,
        cancel: &CancellationToken,
    ) -> RepositoryResult<usize> {
        self.execute_async("delete_where_async", cancel, |context| async move {
            let mut rows = context.find_all_async(options, cancel).await?.into_result();
            self.mutate_async(&context, Mutation::Delete, &mut rows, cancel)
                .await?;
            Ok(rows.len())
        })
        .await
    }
}
