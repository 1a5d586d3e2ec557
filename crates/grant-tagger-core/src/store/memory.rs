//! In-memory [`Store`] implementation for tests and embedding.
//!
//! Uses plain collections behind `std::sync::RwLock`.

use std::collections::HashSet;
use std::sync::RwLock;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::models::{Grant, GrantFilter, SynonymGroup, TagSet};
use crate::vocabulary;

use super::{InsertError, Store};

#[derive(Default)]
struct Groups {
    next_id: i64,
    groups: Vec<SynonymGroup>,
}

/// In-memory store.
#[derive(Default)]
pub struct InMemoryStore {
    tags: RwLock<TagSet>,
    groups: RwLock<Groups>,
    grants: RwLock<Vec<Grant>>,
}

fn poisoned<T>(_: T) -> anyhow::Error {
    anyhow!("in-memory store lock poisoned")
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store preloaded with `tags` and no synonym groups.
    pub fn with_tags<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let store = Self::new();
        if let Ok(mut vocab) = store.tags.write() {
            vocab.extend(tags.into_iter().map(Into::into));
        }
        store
    }

    /// Store preloaded with the seed vocabulary and default synonym groups.
    pub fn seeded() -> Self {
        let store = Self::with_tags(vocabulary::SEED_TAGS.iter().copied());
        if let Ok(mut groups) = store.groups.write() {
            for tags in vocabulary::seed_synonym_groups() {
                groups.next_id += 1;
                let id = groups.next_id;
                groups.groups.push(SynonymGroup { id, tags });
            }
        }
        store
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn list_tags(&self) -> Result<TagSet> {
        Ok(self.tags.read().map_err(poisoned)?.clone())
    }

    async fn insert_tags(&self, tags: &TagSet) -> Result<TagSet> {
        let mut vocab = self.tags.write().map_err(poisoned)?;
        let added: TagSet = tags
            .iter()
            .filter(|t| vocab.insert((*t).clone()))
            .cloned()
            .collect();
        Ok(added)
    }

    async fn list_synonym_groups(&self) -> Result<Vec<SynonymGroup>> {
        Ok(self.groups.read().map_err(poisoned)?.groups.clone())
    }

    async fn create_synonym_group(&self, tags: &TagSet) -> Result<i64> {
        let mut groups = self.groups.write().map_err(poisoned)?;
        groups.next_id += 1;
        let id = groups.next_id;
        groups.groups.push(SynonymGroup {
            id,
            tags: tags.clone(),
        });
        Ok(id)
    }

    async fn add_to_synonym_group(&self, group_id: i64, tag: &str) -> Result<bool> {
        let mut groups = self.groups.write().map_err(poisoned)?;
        Ok(groups
            .groups
            .iter_mut()
            .find(|g| g.id == group_id)
            .map(|g| g.tags.insert(tag.to_string()))
            .unwrap_or(false))
    }

    async fn existing_grant_names(&self, names: &[String]) -> Result<Vec<String>> {
        let grants = self.grants.read().map_err(poisoned)?;
        let taken: HashSet<&str> = grants.iter().map(|g| g.name.as_str()).collect();
        Ok(names
            .iter()
            .filter(|n| taken.contains(n.as_str()))
            .cloned()
            .collect())
    }

    async fn insert_grants(&self, new: &[Grant]) -> Result<(), InsertError> {
        let mut grants = self.grants.write().map_err(poisoned)?;
        let mut taken: HashSet<String> = grants.iter().map(|g| g.name.clone()).collect();
        for grant in new {
            if !taken.insert(grant.name.clone()) {
                return Err(InsertError::DuplicateName(grant.name.clone()));
            }
        }
        grants.extend(new.iter().cloned());
        Ok(())
    }

    async fn list_grants(&self, filter: &GrantFilter) -> Result<Vec<Grant>> {
        let grants = self.grants.read().map_err(poisoned)?;
        Ok(grants.iter().filter(|g| filter.matches(g)).cloned().collect())
    }
}
