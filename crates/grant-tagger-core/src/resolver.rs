//! Tag resolution: picks the tagger for a grant and applies fallback rules.
//!
//! | sources | LLM configured | behavior |
//! |---------|----------------|----------|
//! | no  | no  | heuristic tagger |
//! | no  | yes | LLM tagger, heuristic on any failure |
//! | yes | no  | [`TaggerError::Configuration`] |
//! | yes | yes | LLM tagger, failures propagate |

use std::sync::Arc;

use tracing::{debug, warn};

use crate::completion::CompletionProvider;
use crate::error::{Result, TaggerError};
use crate::llm_tagger::LlmTagger;
use crate::models::{NewGrant, TagSet};
use crate::store::Store;
use crate::tags::heuristic_tags;

/// Orchestrates tagging for incoming grants.
///
/// Built from explicit handles; the provider is `None` when no credential
/// is configured.
#[derive(Clone)]
pub struct TagResolver {
    store: Arc<dyn Store>,
    provider: Option<Arc<dyn CompletionProvider>>,
}

impl TagResolver {
    pub fn new(store: Arc<dyn Store>, provider: Option<Arc<dyn CompletionProvider>>) -> Self {
        Self { store, provider }
    }

    pub fn llm_configured(&self) -> bool {
        self.provider.is_some()
    }

    /// Fail early when `grant` cannot be tagged with the current configuration.
    pub fn check(&self, grant: &NewGrant) -> Result<()> {
        if grant.has_sources() && self.provider.is_none() {
            return Err(TaggerError::Configuration(format!(
                "Grant '{}' has website_urls or document_urls, which require an LLM, \
                 but no LLM API key is configured.",
                grant.name
            )));
        }
        Ok(())
    }

    /// Resolve the final tag set for `grant`.
    pub async fn resolve(&self, grant: &NewGrant) -> Result<TagSet> {
        self.check(grant)?;
        let vocabulary = self.store.list_tags().await?;

        let provider = match &self.provider {
            Some(p) => p.as_ref(),
            None => {
                debug!(grant = %grant.name, "no LLM configured; heuristic tagging");
                return Ok(heuristic_tags(&grant.description, &vocabulary));
            }
        };

        let tagger = LlmTagger::new(self.store.as_ref(), provider);
        let result = tagger
            .tag(
                &grant.description,
                &vocabulary,
                &grant.website_urls,
                &grant.document_urls,
            )
            .await;

        match result {
            Ok(tags) => Ok(tags),
            Err(e) if grant.has_sources() => Err(e),
            Err(e) => {
                warn!(grant = %grant.name, error = %e, "LLM tagging failed, using heuristic fallback");
                Ok(heuristic_tags(&grant.description, &vocabulary))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::InMemoryStore;
    use anyhow::bail;
    use async_trait::async_trait;

    struct Fixed(std::result::Result<&'static str, &'static str>);

    #[async_trait]
    impl CompletionProvider for Fixed {
        fn model_name(&self) -> &str {
            "fixed"
        }
        async fn complete(&self, _prompt: &str) -> anyhow::Result<String> {
            match self.0 {
                Ok(text) => Ok(text.to_string()),
                Err(msg) => bail!("{}", msg),
            }
        }
    }

    fn resolver(provider: Option<Fixed>) -> TagResolver {
        let store: Arc<dyn Store> = Arc::new(InMemoryStore::seeded());
        TagResolver::new(
            store,
            provider.map(|p| Arc::new(p) as Arc<dyn CompletionProvider>),
        )
    }

    fn soil_grant() -> NewGrant {
        NewGrant::new(
            "Soil Health Grant",
            "Funds for soil health and nutrient management on farms",
        )
    }

    fn with_document(mut grant: NewGrant) -> NewGrant {
        grant
            .document_urls
            .push("https://example.org/rfa.pdf".to_string());
        grant
    }

    #[tokio::test]
    async fn test_no_sources_no_llm_is_heuristic() {
        let r = resolver(None);
        let vocab = InMemoryStore::seeded().list_tags().await.unwrap();
        let grant = soil_grant();
        let tags = r.resolve(&grant).await.unwrap();
        assert_eq!(tags, heuristic_tags(&grant.description, &vocab));
        assert!(tags.contains("soil-health"));
        assert!(tags.contains("nutrient-management"));
        assert!(!tags.contains("grant"));
    }

    #[tokio::test]
    async fn test_sources_without_llm_is_configuration_error() {
        let err = resolver(None)
            .resolve(&with_document(soil_grant()))
            .await
            .unwrap_err();
        assert!(matches!(err, TaggerError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_llm_failure_without_sources_falls_back() {
        let r = resolver(Some(Fixed(Err("503 Service Unavailable"))));
        let tags = r.resolve(&soil_grant()).await.unwrap();
        assert!(tags.contains("soil-health"));
    }

    #[tokio::test]
    async fn test_llm_failure_with_sources_propagates() {
        let r = resolver(Some(Fixed(Err("503 Service Unavailable"))));
        let err = r.resolve(&with_document(soil_grant())).await.unwrap_err();
        assert!(matches!(err, TaggerError::Upstream(_)));
    }

    #[tokio::test]
    async fn test_llm_answer_used_when_valid() {
        let r = resolver(Some(Fixed(Ok(
            r#"{"existing_tags": ["conservation"], "new_tags": []}"#,
        ))));
        let tags = r.resolve(&soil_grant()).await.unwrap();
        assert_eq!(tags, TagSet::from(["conservation".to_string()]));
    }
}
