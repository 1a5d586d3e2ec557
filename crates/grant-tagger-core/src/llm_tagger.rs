//! Model-backed tagger with vocabulary discovery.
//!
//! One classification call per grant. When source URLs are supplied the
//! model may also propose up to [`MAX_NEW_TAGS`] tags outside the
//! vocabulary; those are persisted and offered to the [`SynonymPlacer`].

use tracing::{debug, error, info, warn};

use crate::completion::CompletionProvider;
use crate::error::{Result, TaggerError};
use crate::models::TagSet;
use crate::prompt::{classification_prompt, parse_tag_response, MAX_NEW_TAGS};
use crate::store::Store;
use crate::synonyms::SynonymPlacer;
use crate::tags::{heuristic_tags, normalize_tag};

pub struct LlmTagger<'a> {
    store: &'a dyn Store,
    provider: &'a dyn CompletionProvider,
}

impl<'a> LlmTagger<'a> {
    pub fn new(store: &'a dyn Store, provider: &'a dyn CompletionProvider) -> Self {
        Self { store, provider }
    }

    /// Classify `description` against `vocabulary`.
    ///
    /// Transport and parse failures surface as [`TaggerError::Upstream`];
    /// the caller decides whether a heuristic fallback is acceptable. An
    /// empty model answer is replaced by [`heuristic_tags`].
    pub async fn tag(
        &self,
        description: &str,
        vocabulary: &TagSet,
        website_urls: &[String],
        document_urls: &[String],
    ) -> Result<TagSet> {
        let has_sources = !website_urls.is_empty() || !document_urls.is_empty();
        let prompt = classification_prompt(description, vocabulary, website_urls, document_urls);

        let raw = self.provider.complete(&prompt).await.map_err(|e| {
            error!(
                model = self.provider.model_name(),
                error = %format!("{:#}", e),
                "tag classification request failed"
            );
            TaggerError::Upstream(format!("{:#}", e))
        })?;
        debug!(model = self.provider.model_name(), raw = %raw, "classification response");

        let response = parse_tag_response(&raw).map_err(|e| {
            error!(model = self.provider.model_name(), error = %e, raw = %raw, "unusable classification response");
            TaggerError::Upstream(e.to_string())
        })?;

        let mut tags: TagSet = response
            .existing_tags()
            .iter()
            .map(|t| normalize_tag(t))
            .filter(|t| vocabulary.contains(t))
            .collect();

        if has_sources && !response.new_tags().is_empty() {
            let added = self.discover(response.new_tags(), vocabulary).await?;
            tags.extend(added);
        }

        if tags.is_empty() {
            let fallback = heuristic_tags(description, vocabulary);
            if has_sources {
                warn!(
                    fallback = fallback.len(),
                    "model returned no usable tags despite sources; using heuristic tags"
                );
            } else {
                info!(fallback = fallback.len(), "model returned no usable tags; using heuristic tags");
            }
            return Ok(fallback);
        }

        Ok(tags)
    }

    /// Persist genuinely new tags and try to group each one.
    async fn discover(&self, proposed: &[String], vocabulary: &TagSet) -> Result<TagSet> {
        let mut candidates = TagSet::new();
        for tag in proposed.iter().map(|t| normalize_tag(t)) {
            if tag.is_empty() || vocabulary.contains(&tag) {
                continue;
            }
            candidates.insert(tag);
            if candidates.len() == MAX_NEW_TAGS {
                break;
            }
        }
        if candidates.is_empty() {
            return Ok(candidates);
        }

        let added = self.store.insert_tags(&candidates).await.map_err(|e| {
            error!(error = %format!("{:#}", e), "failed to persist discovered tags");
            TaggerError::Store(e)
        })?;
        if added.len() < candidates.len() {
            debug!(
                proposed = candidates.len(),
                added = added.len(),
                "some discovered tags were inserted concurrently"
            );
        }
        info!(tags = ?candidates, "discovered new vocabulary tags");

        let mut groups = match self.store.list_synonym_groups().await {
            Ok(groups) => groups,
            Err(e) => {
                warn!(error = %format!("{:#}", e), "could not load synonym groups; new tags left ungrouped");
                Vec::new()
            }
        };
        let placer = SynonymPlacer::new(self.store, Some(self.provider));
        for tag in &candidates {
            if groups.iter().any(|g| g.contains(tag)) {
                continue;
            }
            placer.place(tag, &mut groups).await;
        }

        Ok(candidates)
    }
}
