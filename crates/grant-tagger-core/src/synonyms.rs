//! Best-effort placement of newly discovered tags into synonym groups.

use tracing::{debug, info, warn};

use crate::completion::CompletionProvider;
use crate::models::SynonymGroup;
use crate::prompt::{parse_group_choice, placement_prompt, GroupChoice};
use crate::store::Store;

/// Assigns new tags to existing synonym groups by asking the model.
///
/// Placement never fails from the caller's point of view: a missing
/// provider, a transport error, an unparseable reply, or `-1` all leave
/// the tag ungrouped.
pub struct SynonymPlacer<'a> {
    store: &'a dyn Store,
    provider: Option<&'a dyn CompletionProvider>,
}

impl<'a> SynonymPlacer<'a> {
    pub fn new(store: &'a dyn Store, provider: Option<&'a dyn CompletionProvider>) -> Self {
        Self { store, provider }
    }

    /// Try to place `new_tag` into one of `groups`.
    ///
    /// On success the chosen group is updated both in the store (by id) and
    /// in `groups`, so later placements in the same batch see it. Returns
    /// the id of the group the tag joined.
    pub async fn place(&self, new_tag: &str, groups: &mut [SynonymGroup]) -> Option<i64> {
        let provider = match self.provider {
            Some(p) => p,
            None => {
                debug!(tag = new_tag, "no completion provider; tag left ungrouped");
                return None;
            }
        };
        if groups.is_empty() {
            return None;
        }

        let prompt = placement_prompt(new_tag, groups);
        let raw = match provider.complete(&prompt).await {
            Ok(text) => text,
            Err(e) => {
                warn!(tag = new_tag, error = %format!("{:#}", e), "synonym placement request failed");
                return None;
            }
        };

        let index = match parse_group_choice(&raw, groups.len()) {
            Ok(GroupChoice::Group(i)) => i,
            Ok(GroupChoice::NoMatch) => {
                debug!(tag = new_tag, "model found no matching synonym group");
                return None;
            }
            Err(e) => {
                warn!(tag = new_tag, error = %e, raw = %raw, "unusable synonym placement response");
                return None;
            }
        };

        let group = &mut groups[index];
        match self.store.add_to_synonym_group(group.id, new_tag).await {
            Ok(true) => {
                group.tags.insert(new_tag.to_string());
                info!(tag = new_tag, group_id = group.id, "tag added to synonym group");
                Some(group.id)
            }
            Ok(false) => {
                warn!(tag = new_tag, group_id = group.id, "synonym group unchanged");
                None
            }
            Err(e) => {
                warn!(tag = new_tag, group_id = group.id, error = %format!("{:#}", e), "failed to update synonym group");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::InMemoryStore;
    use anyhow::{bail, Result};
    use async_trait::async_trait;

    struct Reply(&'static str);

    #[async_trait]
    impl CompletionProvider for Reply {
        fn model_name(&self) -> &str {
            "reply"
        }
        async fn complete(&self, _prompt: &str) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    struct Broken;

    #[async_trait]
    impl CompletionProvider for Broken {
        fn model_name(&self) -> &str {
            "broken"
        }
        async fn complete(&self, _prompt: &str) -> Result<String> {
            bail!("connection reset")
        }
    }

    async fn store_with_group() -> (InMemoryStore, Vec<SynonymGroup>) {
        let store = InMemoryStore::new();
        store
            .create_synonym_group(&["water".to_string(), "irrigation".to_string()].into())
            .await
            .unwrap();
        store
            .create_synonym_group(&["agriculture".to_string(), "farmer".to_string()].into())
            .await
            .unwrap();
        let groups = store.list_synonym_groups().await.unwrap();
        (store, groups)
    }

    #[tokio::test]
    async fn test_place_into_chosen_group() {
        let (store, mut groups) = store_with_group().await;
        let provider = Reply("1");
        let placer = SynonymPlacer::new(&store, Some(&provider));

        let id = placer.place("rancher", &mut groups).await;
        assert_eq!(id, Some(groups[1].id));
        assert!(groups[1].contains("rancher"));

        let stored = store.list_synonym_groups().await.unwrap();
        assert!(stored[1].contains("rancher"));
        assert!(!stored[0].contains("rancher"));
    }

    #[tokio::test]
    async fn test_no_match_leaves_groups_alone() {
        let (store, mut groups) = store_with_group().await;
        let provider = Reply("-1");
        let placer = SynonymPlacer::new(&store, Some(&provider));
        assert_eq!(placer.place("broadband", &mut groups).await, None);
        assert_eq!(store.list_synonym_groups().await.unwrap(), groups);
    }

    #[tokio::test]
    async fn test_failures_never_raise() {
        let (store, mut groups) = store_with_group().await;
        let before = groups.clone();

        let broken = Broken;
        assert_eq!(
            SynonymPlacer::new(&store, Some(&broken))
                .place("x", &mut groups)
                .await,
            None
        );
        let garbage = Reply("the second one");
        assert_eq!(
            SynonymPlacer::new(&store, Some(&garbage))
                .place("x", &mut groups)
                .await,
            None
        );
        let out_of_range = Reply("9");
        assert_eq!(
            SynonymPlacer::new(&store, Some(&out_of_range))
                .place("x", &mut groups)
                .await,
            None
        );
        assert_eq!(
            SynonymPlacer::new(&store, None).place("x", &mut groups).await,
            None
        );
        assert_eq!(groups, before);
    }
}
