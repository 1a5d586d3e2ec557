//! Storage abstraction for Grant Tagger.
//!
//! The [`Store`] trait covers the three logical collections the pipeline
//! reads and writes: the tag vocabulary, synonym groups, and grants.
//! Backends: SQLite in the app crate, [`memory::InMemoryStore`] here.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{Grant, GrantFilter, SynonymGroup, TagSet};

/// Failure while inserting grants.
#[derive(Debug, thiserror::Error)]
pub enum InsertError {
    #[error("grant_name '{0}' already exists")]
    DuplicateName(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Abstract storage backend.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`list_tags`](Store::list_tags) | Full current vocabulary |
/// | [`insert_tags`](Store::insert_tags) | Add tags, ignoring ones already present |
/// | [`list_synonym_groups`](Store::list_synonym_groups) | All synonym groups |
/// | [`create_synonym_group`](Store::create_synonym_group) | New group, returns its id |
/// | [`add_to_synonym_group`](Store::add_to_synonym_group) | Add one tag to a group by id |
/// | [`existing_grant_names`](Store::existing_grant_names) | Which of the names are taken |
/// | [`insert_grants`](Store::insert_grants) | Persist a batch atomically |
/// | [`list_grants`](Store::list_grants) | Grants matching a [`GrantFilter`] |
#[async_trait]
pub trait Store: Send + Sync {
    async fn list_tags(&self) -> Result<TagSet>;

    /// Insert tags that are not yet present. Returns the ones actually added.
    ///
    /// Concurrent inserts of the same tag must not fail.
    async fn insert_tags(&self, tags: &TagSet) -> Result<TagSet>;

    async fn list_synonym_groups(&self) -> Result<Vec<SynonymGroup>>;

    async fn create_synonym_group(&self, tags: &TagSet) -> Result<i64>;

    /// Add `tag` to the group with `group_id`.
    ///
    /// Returns `false` when the group no longer exists or already holds the tag.
    async fn add_to_synonym_group(&self, group_id: i64, tag: &str) -> Result<bool>;

    async fn existing_grant_names(&self, names: &[String]) -> Result<Vec<String>>;

    /// Insert all grants or none of them.
    async fn insert_grants(&self, grants: &[Grant]) -> Result<(), InsertError>;

    /// Grants in insertion order.
    async fn list_grants(&self, filter: &GrantFilter) -> Result<Vec<Grant>>;
}
