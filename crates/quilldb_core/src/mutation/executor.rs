//! The update pipeline and the batched `modify` executor.
//!
//! An update runs `updating` hooks over the requested descriptor, applies
//! the merged descriptor to the stored record, runs `writing` hooks over the
//! result and stages the write. `modify` runs that pipeline for every
//! matching record, in chunks separated by scheduler yields; all chunks stage
//! into the one enclosing transaction. An async mutator may suspend while
//! its operation still holds its place in that transaction.

use crate::error::{CoreError, CoreResult, HookResult};
use crate::hooks::HookEvent;
use crate::mutation::Modifications;
use crate::read::{Match, RecordFilter};
use crate::scope::TableScope;
use quilldb_codec::{Key, Record};
use quilldb_storage::{IndexQuery, WriteMode};
use std::future::Future;
use std::pin::Pin;
use tracing::trace;

/// A `modify` callback editing the reading view of a record in place.
pub(crate) type Mutator = Box<dyn FnMut(&mut Record) -> HookResult<()> + Send>;

/// A `modify` callback deriving a descriptor from the reading view.
pub(crate) type Describer = Box<dyn FnMut(&Record) -> HookResult<Option<Modifications>> + Send>;

/// Future returned by an [`AsyncMutator`].
pub(crate) type MutatorFuture = Pin<Box<dyn Future<Output = HookResult<Record>> + Send>>;

/// A `modify` callback that may suspend; resolves to the edited record.
pub(crate) type AsyncMutator = Box<dyn FnMut(Record) -> MutatorFuture + Send>;

/// What `modify` does to each matching record.
pub(crate) enum Mutation {
    /// Apply a fixed descriptor.
    Changes(Modifications),
    /// Run a callback; the descriptor is whatever it changed.
    Apply(Mutator),
    /// Run a callback that returns its own descriptor, or none to skip.
    Describe(Describer),
    /// Await a callback; the descriptor is whatever it changed.
    Await(AsyncMutator),
}

impl Mutation {
    async fn describe(&mut self, table: &str, found: &Match) -> CoreResult<Modifications> {
        match self {
            Mutation::Changes(changes) => Ok(changes.clone()),
            Mutation::Apply(mutator) => {
                let mut edited = found.view.clone();
                mutator(&mut edited).map_err(|err| CoreError::mutator(table, err))?;
                Ok(Modifications::diff(&found.view, &edited))
            }
            Mutation::Describe(describer) => describer(&found.view)
                .map(Option::unwrap_or_default)
                .map_err(|err| CoreError::mutator(table, err)),
            Mutation::Await(mutator) => {
                let edited = mutator(found.view.clone())
                    .await
                    .map_err(|err| CoreError::mutator(table, err))?;
                Ok(Modifications::diff(&found.view, &edited))
            }
        }
    }
}

impl TableScope {
    /// Updates one record. Returns 0 if no record has the key, else 1.
    pub(crate) fn update_one(&self, key: &Key, requested: &Modifications) -> CoreResult<usize> {
        match self.raw(key)? {
            Some(raw) => {
                self.apply_update(key.clone(), raw, requested)?;
                Ok(1)
            }
            None => Ok(0),
        }
    }

    /// Runs the update pipeline over a loaded record and returns the key it
    /// is stored under afterwards.
    ///
    /// If the changes move the inline primary key, the record is deleted
    /// under the old key and inserted under the new one.
    pub(crate) fn apply_update(
        &self,
        key: Key,
        raw: Record,
        requested: &Modifications,
    ) -> CoreResult<Key> {
        let changes = self.hooks.dispatch_updating(requested, &key, &raw)?;
        if changes.is_empty() && !self.hooks.has(HookEvent::Writing) {
            return Ok(key);
        }

        let mut next = raw;
        changes.apply_to(&mut next);
        let next = self.hooks.dispatch_writing(next)?;

        let moved = self
            .schema
            .primary_key
            .path
            .as_ref()
            .and_then(|path| path.extract(&next))
            .filter(|new_key| *new_key != key);
        let stored = match moved {
            Some(new_key) => {
                self.store.delete(self.txn, &self.table, &key)?;
                self.store
                    .put(self.txn, &self.table, Some(new_key), next, WriteMode::Insert)?
            }
            None => self
                .store
                .put(self.txn, &self.table, Some(key), next, WriteMode::Upsert)?,
        };
        Ok(stored)
    }

    /// Applies `mutation` to every match. Returns the number of matches.
    pub(crate) async fn modify_matches(
        &self,
        query: &IndexQuery,
        filters: &[RecordFilter],
        limit: Option<usize>,
        mut mutation: Mutation,
    ) -> CoreResult<usize> {
        let keys = self.store.scan(self.txn, &self.table, query)?;
        let mut modified = 0;
        for (i, key) in keys.into_iter().enumerate() {
            if limit.is_some_and(|max| modified >= max) {
                break;
            }
            if self.at_boundary(i) {
                self.pause(i).await;
            }
            let Some(found) = self.load_match(key, filters)? else {
                continue;
            };
            modified += 1;
            let requested = mutation.describe(&self.table, &found).await?;
            self.apply_update(found.key, found.raw, &requested)?;
        }
        trace!(table = %self.table, modified, "modify finished");
        Ok(modified)
    }

    /// Deletes every match. Returns the number of deleted records.
    pub(crate) async fn delete_matches(
        &self,
        query: &IndexQuery,
        filters: &[RecordFilter],
        limit: Option<usize>,
    ) -> CoreResult<usize> {
        let deleted = self
            .walk(query, filters, limit, |found| {
                self.remove_loaded(&found.key, &found.raw).map(drop)
            })
            .await?;
        trace!(table = %self.table, deleted, "delete finished");
        Ok(deleted)
    }
}
