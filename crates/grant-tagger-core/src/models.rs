//! Core data models shared by the tagging pipeline and the stores.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A set of normalized tags. Ordered so that output is stable.
pub type TagSet = BTreeSet<String>;

/// A validated grant submission that has not been tagged yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewGrant {
    pub name: String,
    pub description: String,
    pub website_urls: Vec<String>,
    pub document_urls: Vec<String>,
}

impl NewGrant {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            website_urls: Vec::new(),
            document_urls: Vec::new(),
        }
    }

    /// True when any external source URL was supplied. Sources make the
    /// LLM path mandatory because only the model can read them.
    pub fn has_sources(&self) -> bool {
        !self.website_urls.is_empty() || !self.document_urls.is_empty()
    }

    /// Attach the resolved tags, producing the record that gets persisted.
    pub fn into_grant(self, tags: TagSet) -> Grant {
        Grant {
            name: self.name,
            description: self.description,
            website_urls: self.website_urls,
            document_urls: self.document_urls,
            tags,
        }
    }
}

/// A persisted grant. Tags are assigned once at creation and never change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grant {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub website_urls: Vec<String>,
    #[serde(default)]
    pub document_urls: Vec<String>,
    pub tags: TagSet,
}

/// A group of tags treated as interchangeable during retrieval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SynonymGroup {
    /// Stable identifier assigned by the store.
    pub id: i64,
    pub tags: TagSet,
}

impl SynonymGroup {
    pub fn contains(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }
}

/// Which grants a listing returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrantFilter {
    /// Every stored grant.
    All,
    /// Grants carrying at least one of these tags.
    AnyOf(TagSet),
}

impl GrantFilter {
    /// Builds a filter from a tag set; an empty set means no filter.
    pub fn any_of(tags: TagSet) -> Self {
        if tags.is_empty() {
            GrantFilter::All
        } else {
            GrantFilter::AnyOf(tags)
        }
    }

    pub fn matches(&self, grant: &Grant) -> bool {
        match self {
            GrantFilter::All => true,
            GrantFilter::AnyOf(wanted) => grant.tags.iter().any(|t| wanted.contains(t)),
        }
    }
}
