//! Grant submission and retrieval.
//!
//! [`GrantService`] is the single entry point used by both the HTTP server
//! and the CLI: it validates raw JSON payloads, resolves tags through the
//! [`TagResolver`], persists grants, and answers tag-filtered listings.

use std::collections::HashSet;
use std::sync::Arc;

use reqwest::Url;
use serde_json::Value;
use tracing::{error, info};

use grant_tagger_core::completion::CompletionProvider;
use grant_tagger_core::models::{Grant, GrantFilter, NewGrant, TagSet};
use grant_tagger_core::store::Store;
use grant_tagger_core::tags::{expand_with_synonyms, normalize_tags};
use grant_tagger_core::{Result, TagResolver, TaggerError};

/// Validate one payload item. `Err` carries the reason without the index.
fn validate_item(raw: &Value) -> std::result::Result<NewGrant, String> {
    let obj = raw
        .as_object()
        .ok_or_else(|| "Each grant must be an object.".to_string())?;

    let name = required_text(obj.get("grant_name"), "grant_name")?;
    let description = required_text(obj.get("grant_description"), "grant_description")?;
    let website_urls = url_list(obj.get("website_urls"), "website_urls", false)?;
    let document_urls = url_list(obj.get("document_urls"), "document_urls", true)?;

    Ok(NewGrant {
        name,
        description,
        website_urls,
        document_urls,
    })
}

fn required_text(value: Option<&Value>, field: &str) -> std::result::Result<String, String> {
    match value.and_then(Value::as_str).map(str::trim) {
        Some(text) if !text.is_empty() => Ok(text.to_string()),
        _ => Err(format!("{} must be a non-empty string.", field)),
    }
}

fn url_list(
    value: Option<&Value>,
    field: &str,
    require_pdf: bool,
) -> std::result::Result<Vec<String>, String> {
    let items = match value {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(_) => return Err(format!("{} must be a list of URL strings.", field)),
    };

    let mut urls = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let text = item
            .as_str()
            .map(str::trim)
            .ok_or_else(|| format!("{}[{}] must be a string.", field, i))?;
        validate_url(text, require_pdf).map_err(|reason| format!("{}[{}] {}", field, i, reason))?;
        urls.push(text.to_string());
    }
    Ok(urls)
}

fn validate_url(text: &str, require_pdf: bool) -> std::result::Result<(), String> {
    let url = Url::parse(text).map_err(|_| format!("is not a valid URL: '{}'.", text))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(format!("must use http or https: '{}'.", text));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(format!("must include a host: '{}'.", text));
    }
    if require_pdf && !url.path().to_ascii_lowercase().ends_with(".pdf") {
        return Err(format!("must point to a .pdf document: '{}'.", text));
    }
    Ok(())
}

/// Normalize a payload into validated grants.
///
/// Accepts one object or an array of objects.
pub fn validate_payload(payload: &Value) -> Result<Vec<NewGrant>> {
    let items: Vec<&Value> = match payload {
        Value::Object(_) => vec![payload],
        Value::Array(items) => items.iter().collect(),
        _ => {
            return Err(TaggerError::Validation(
                "Payload must be an object or an array of objects.".to_string(),
            ))
        }
    };
    if items.is_empty() {
        return Err(TaggerError::Validation(
            "No valid grants found in payload.".to_string(),
        ));
    }

    items
        .into_iter()
        .enumerate()
        .map(|(idx, raw)| {
            validate_item(raw).map_err(|reason| {
                TaggerError::Validation(format!("Invalid grant at index {}: {}", idx, reason))
            })
        })
        .collect()
}

/// Grant operations shared by the HTTP server and the CLI.
#[derive(Clone)]
pub struct GrantService {
    store: Arc<dyn Store>,
    resolver: TagResolver,
}

impl GrantService {
    pub fn new(store: Arc<dyn Store>, provider: Option<Arc<dyn CompletionProvider>>) -> Self {
        let resolver = TagResolver::new(store.clone(), provider);
        Self { store, resolver }
    }

    pub fn llm_configured(&self) -> bool {
        self.resolver.llm_configured()
    }

    /// Validate, tag, and persist a payload. All grants are stored or none.
    pub async fn submit(&self, payload: &Value) -> Result<Vec<Grant>> {
        let pending = validate_payload(payload)?;
        self.submit_grants(pending).await
    }

    pub async fn submit_grants(&self, pending: Vec<NewGrant>) -> Result<Vec<Grant>> {
        // Configuration problems surface before any model call or write.
        for grant in &pending {
            self.resolver.check(grant)?;
        }
        self.check_names(&pending).await?;

        let mut tagged = Vec::with_capacity(pending.len());
        for grant in pending {
            let tags = self.resolver.resolve(&grant).await.inspect_err(|e| {
                error!(grant = %grant.name, error = %e, "tag resolution failed");
            })?;
            tagged.push(grant.into_grant(tags));
        }

        self.store.insert_grants(&tagged).await.map_err(|e| {
            error!(error = %e, "failed to persist grants");
            TaggerError::from(e)
        })?;

        info!(count = tagged.len(), "grants stored");
        Ok(tagged)
    }

    async fn check_names(&self, pending: &[NewGrant]) -> Result<()> {
        let mut seen = HashSet::new();
        for grant in pending {
            if !seen.insert(grant.name.as_str()) {
                return Err(TaggerError::Conflict(format!(
                    "grant_name '{}' appears more than once in the payload.",
                    grant.name
                )));
            }
        }

        let names: Vec<String> = pending.iter().map(|g| g.name.clone()).collect();
        let taken = self.store.existing_grant_names(&names).await?;
        match taken.first() {
            Some(name) => Err(TaggerError::Conflict(format!(
                "grant_name '{}' already exists.",
                name
            ))),
            None => Ok(()),
        }
    }

    /// Selected tags, optionally widened by their synonym groups.
    async fn expand(&self, selected: &TagSet, include_synonyms: bool) -> Result<TagSet> {
        if !include_synonyms || selected.is_empty() {
            return Ok(selected.clone());
        }
        let groups = self.store.list_synonym_groups().await?;
        Ok(expand_with_synonyms(selected, &groups))
    }

    /// Grants carrying any of `selected` (all grants when empty).
    pub async fn list<S: AsRef<str>>(
        &self,
        selected: &[S],
        include_synonyms: bool,
    ) -> Result<Vec<Grant>> {
        let selected = normalize_tags(selected);
        let tags = self.expand(&selected, include_synonyms).await?;
        Ok(self.store.list_grants(&GrantFilter::any_of(tags)).await?)
    }

    /// Expanded selection restricted to the vocabulary, sorted.
    pub async fn effective_tags<S: AsRef<str>>(
        &self,
        selected: &[S],
        include_synonyms: bool,
    ) -> Result<Vec<String>> {
        let selected = normalize_tags(selected);
        let expanded = self.expand(&selected, include_synonyms).await?;
        let vocabulary = self.store.list_tags().await?;
        Ok(expanded.intersection(&vocabulary).cloned().collect())
    }

    pub async fn vocabulary(&self) -> Result<Vec<String>> {
        Ok(self.store.list_tags().await?.into_iter().collect())
    }

    pub async fn synonym_groups(&self) -> Result<Vec<grant_tagger_core::SynonymGroup>> {
        Ok(self.store.list_synonym_groups().await?)
    }

    /// Create a synonym group from vocabulary tags not yet grouped.
    pub async fn create_synonym_group<S: AsRef<str>>(&self, tags: &[S]) -> Result<i64> {
        let tags = normalize_tags(tags);
        if tags.len() < 2 {
            return Err(TaggerError::Validation(
                "A synonym group needs at least two distinct tags.".to_string(),
            ));
        }

        let vocabulary = self.store.list_tags().await?;
        if let Some(unknown) = tags.iter().find(|t| !vocabulary.contains(*t)) {
            return Err(TaggerError::Validation(format!(
                "Tag '{}' is not in the vocabulary.",
                unknown
            )));
        }

        let groups = self.store.list_synonym_groups().await?;
        if let Some((tag, group)) = tags
            .iter()
            .find_map(|t| groups.iter().find(|g| g.contains(t)).map(|g| (t, g)))
        {
            return Err(TaggerError::Conflict(format!(
                "Tag '{}' already belongs to synonym group {}.",
                tag, group.id
            )));
        }

        let id = self.store.create_synonym_group(&tags).await?;
        info!(group_id = id, tags = ?tags, "synonym group created");
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;
    use async_trait::async_trait;
    use grant_tagger_core::store::memory::InMemoryStore;
    use serde_json::json;

    struct Reply(&'static str);

    #[async_trait]
    impl CompletionProvider for Reply {
        fn model_name(&self) -> &str {
            "reply"
        }
        async fn complete(&self, _prompt: &str) -> anyhow::Result<String> {
            if self.0.is_empty() {
                bail!("upstream unavailable");
            }
            Ok(self.0.to_string())
        }
    }

    fn service(provider: Option<Reply>) -> (Arc<InMemoryStore>, GrantService) {
        let store = Arc::new(InMemoryStore::seeded());
        let provider = provider.map(|p| Arc::new(p) as Arc<dyn CompletionProvider>);
        let svc = GrantService::new(store.clone(), provider);
        (store, svc)
    }

    fn soil() -> Value {
        json!({
            "grant_name": "Soil Health Grant",
            "grant_description": "Funds for soil health and nutrient management on farms"
        })
    }

    #[test]
    fn test_validate_single_and_list() {
        assert_eq!(validate_payload(&soil()).unwrap().len(), 1);
        let list = json!([soil(), {"grant_name": "B", "grant_description": "d"}]);
        assert_eq!(validate_payload(&list).unwrap().len(), 2);
    }

    #[test]
    fn test_validate_trims_fields() {
        let grants =
            validate_payload(&json!({"grant_name": "  A  ", "grant_description": " d "})).unwrap();
        assert_eq!(grants[0].name, "A");
        assert_eq!(grants[0].description, "d");
    }

    #[test]
    fn test_validate_errors_name_index_and_field() {
        let err = validate_payload(&json!([soil(), {"grant_name": "x"}])).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid grant at index 1: grant_description must be a non-empty string."
        );

        let err = validate_payload(&json!({"grant_name": "", "grant_description": "d"})).unwrap_err();
        assert!(err.to_string().contains("grant_name"));

        assert!(matches!(
            validate_payload(&json!("text")),
            Err(TaggerError::Validation(_))
        ));
        assert!(validate_payload(&json!([]))
            .unwrap_err()
            .to_string()
            .contains("No valid grants"));
        assert!(validate_payload(&json!([1])).is_err());
    }

    #[test]
    fn test_validate_urls() {
        let ok = json!({
            "grant_name": "A", "grant_description": "d",
            "website_urls": ["https://example.org/grants"],
            "document_urls": ["http://example.org/files/RFA.PDF"],
        });
        let g = &validate_payload(&ok).unwrap()[0];
        assert_eq!(g.website_urls.len(), 1);
        assert_eq!(g.document_urls.len(), 1);

        let null_lists = json!({"grant_name": "A", "grant_description": "d", "website_urls": null});
        assert!(validate_payload(&null_lists).unwrap()[0].website_urls.is_empty());

        for (field, bad) in [
            ("website_urls", json!("https://example.org")),
            ("website_urls", json!(["ftp://example.org/file"])),
            ("website_urls", json!(["not a url"])),
            ("website_urls", json!([42])),
            ("document_urls", json!(["https://example.org/page.html"])),
        ] {
            let mut payload = json!({"grant_name": "A", "grant_description": "d"});
            payload[field] = bad.clone();
            let err = validate_payload(&payload).unwrap_err().to_string();
            assert!(err.starts_with("Invalid grant at index 0:"), "{}", err);
            assert!(err.contains(field), "{} for {}", err, bad);
        }
    }

    #[tokio::test]
    async fn test_submit_without_llm_uses_heuristic() {
        let (store, svc) = service(None);
        let grants = svc.submit(&soil()).await.unwrap();
        let vocab = store.list_tags().await.unwrap();
        let expected = grant_tagger_core::tags::heuristic_tags(
            "Funds for soil health and nutrient management on farms",
            &vocab,
        );
        assert_eq!(grants[0].tags, expected);
        assert!(grants[0].tags.contains("soil-health"));
        assert!(grants[0].tags.contains("nutrient-management"));
        assert!(!grants[0].tags.contains("grant"));

        let stored = svc.list::<&str>(&[], false).await.unwrap();
        assert_eq!(stored, grants);
    }

    #[tokio::test]
    async fn test_documents_without_llm_store_nothing() {
        let (_store, svc) = service(None);
        let payload = json!([
            {"grant_name": "Plain", "grant_description": "water"},
            {"grant_name": "Docs", "grant_description": "d",
             "document_urls": ["https://example.org/rfa.pdf"]}
        ]);
        let err = svc.submit(&payload).await.unwrap_err();
        assert!(matches!(err, TaggerError::Configuration(_)));
        assert!(svc.list::<&str>(&[], false).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_name_conflicts() {
        let (_store, svc) = service(None);
        svc.submit(&soil()).await.unwrap();
        let err = svc.submit(&soil()).await.unwrap_err();
        assert!(matches!(err, TaggerError::Conflict(_)));
        assert_eq!(svc.list::<&str>(&[], false).await.unwrap().len(), 1);

        let (_store, svc) = service(None);
        let err = svc.submit(&json!([soil(), soil()])).await.unwrap_err();
        assert!(matches!(err, TaggerError::Conflict(_)));
        assert!(svc.list::<&str>(&[], false).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upstream_failure_with_sources_stores_nothing() {
        let (_store, svc) = service(Some(Reply("")));
        let payload = json!({"grant_name": "Docs", "grant_description": "d",
                             "website_urls": ["https://example.org"]});
        let err = svc.submit(&payload).await.unwrap_err();
        assert!(matches!(err, TaggerError::Upstream(_)));
        assert!(svc.list::<&str>(&[], false).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upstream_failure_without_sources_falls_back() {
        let (_store, svc) = service(Some(Reply("")));
        let grants = svc.submit(&soil()).await.unwrap();
        assert!(grants[0].tags.contains("soil-health"));
    }

    #[tokio::test]
    async fn test_list_filters_any_and_expands_synonyms() {
        let (_store, svc) = service(None);
        svc.submit(&json!([
            {"grant_name": "Farmers", "grant_description": "Support for every farmer"},
            {"grant_name": "Ag", "grant_description": "Agriculture research"},
            {"grant_name": "Boats", "grant_description": "Seafood processing"}
        ]))
        .await
        .unwrap();

        let names = |grants: Vec<Grant>| grants.into_iter().map(|g| g.name).collect::<Vec<_>>();

        assert_eq!(names(svc.list(&["agriculture"], false).await.unwrap()), vec!["Ag"]);
        assert_eq!(
            names(svc.list(&["agriculture"], true).await.unwrap()),
            vec!["Farmers", "Ag"]
        );
        assert_eq!(
            names(svc.list(&["farmer", "seafood"], false).await.unwrap()),
            vec!["Farmers", "Boats"]
        );
        assert_eq!(svc.list(&[" ", ""], false).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_effective_tags() {
        let (_store, svc) = service(None);
        assert_eq!(
            svc.effective_tags(&["agriculture", "martian"], true).await.unwrap(),
            vec!["agriculture", "farmer"]
        );
        assert_eq!(
            svc.effective_tags(&["Agriculture", "martian"], false).await.unwrap(),
            vec!["agriculture"]
        );
    }

    #[tokio::test]
    async fn test_create_synonym_group_rules() {
        let (_store, svc) = service(None);
        assert!(matches!(
            svc.create_synonym_group(&["youth"]).await,
            Err(TaggerError::Validation(_))
        ));
        assert!(matches!(
            svc.create_synonym_group(&["youth", "zebra"]).await,
            Err(TaggerError::Validation(_))
        ));
        assert!(matches!(
            svc.create_synonym_group(&["youth", "farmer"]).await,
            Err(TaggerError::Conflict(_))
        ));
        let id = svc
            .create_synonym_group(&["youth", "school"])
            .await
            .unwrap();
        let groups = svc.synonym_groups().await.unwrap();
        assert!(groups.iter().any(|g| g.id == id && g.contains("youth")));
    }
}
