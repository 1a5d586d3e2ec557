//! Prompt construction and strict decoding of model responses.
//!
//! Model output is never handled as a loose JSON value. Every response is
//! decoded into a typed result ([`TagResponse`], [`GroupChoice`]) or a
//! [`ResponseParseError`].

use serde::Deserialize;

use crate::models::{SynonymGroup, TagSet};

/// Upper bound on new tags accepted from a single classification.
pub const MAX_NEW_TAGS: usize = 3;

/// Decoded classification response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum TagResponse {
    /// `{"existing_tags": [...], "new_tags": [...]}`
    Classified {
        existing_tags: Vec<String>,
        new_tags: Vec<String>,
    },
    /// A bare array of tags: `["agriculture", "water"]`.
    Flat(Vec<String>),
}

impl TagResponse {
    pub fn existing_tags(&self) -> &[String] {
        match self {
            TagResponse::Classified { existing_tags, .. } => existing_tags,
            TagResponse::Flat(tags) => tags,
        }
    }

    pub fn new_tags(&self) -> &[String] {
        match self {
            TagResponse::Classified { new_tags, .. } => new_tags,
            TagResponse::Flat(_) => &[],
        }
    }
}

/// Decoded synonym placement response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupChoice {
    /// 0-based index into the groups listed in the prompt.
    Group(usize),
    NoMatch,
}

#[derive(Debug, thiserror::Error)]
pub enum ResponseParseError {
    #[error("model returned an empty response")]
    Empty,

    #[error("model response is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("model response does not match the expected schema: {0}")]
    Schema(String),

    #[error("model chose group {index} but only {count} groups exist")]
    IndexOutOfRange { index: i64, count: usize },
}

/// Remove Markdown code fences and a leading `json` language tag.
///
/// ```rust
/// use grant_tagger_core::prompt::strip_code_fences;
///
/// assert_eq!(strip_code_fences("```json\n[\"water\"]\n```"), "[\"water\"]");
/// assert_eq!(strip_code_fences("json [1]"), "[1]");
/// ```
pub fn strip_code_fences(raw: &str) -> &str {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```") {
        text = match rest.rfind("```") {
            Some(end) => &rest[..end],
            None => rest,
        };
    }
    let text = text.trim_start();
    match text.get(..4) {
        Some(lang) if lang.eq_ignore_ascii_case("json") => text[4..].trim(),
        _ => text.trim(),
    }
}

/// Decode a classification response.
pub fn parse_tag_response(raw: &str) -> Result<TagResponse, ResponseParseError> {
    let text = strip_code_fences(raw);
    if text.is_empty() {
        return Err(ResponseParseError::Empty);
    }
    let value: serde_json::Value = serde_json::from_str(text)?;
    serde_json::from_value(value).map_err(|_| {
        ResponseParseError::Schema(
            "expected {\"existing_tags\": [string], \"new_tags\": [string]} or [string]"
                .to_string(),
        )
    })
}

/// Decode a synonym placement response against `group_count` groups.
///
/// Accepts a bare integer or `{"index": n}`.
pub fn parse_group_choice(
    raw: &str,
    group_count: usize,
) -> Result<GroupChoice, ResponseParseError> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum IndexReply {
        Bare(i64),
        Wrapped { index: i64 },
    }

    let text = strip_code_fences(raw);
    if text.is_empty() {
        return Err(ResponseParseError::Empty);
    }
    let value: serde_json::Value = serde_json::from_str(text)?;
    let index = match serde_json::from_value(value) {
        Ok(IndexReply::Bare(i)) | Ok(IndexReply::Wrapped { index: i }) => i,
        Err(_) => {
            return Err(ResponseParseError::Schema(
                "expected an integer group index".to_string(),
            ))
        }
    };

    if index == -1 {
        return Ok(GroupChoice::NoMatch);
    }
    match usize::try_from(index) {
        Ok(i) if i < group_count => Ok(GroupChoice::Group(i)),
        _ => Err(ResponseParseError::IndexOutOfRange {
            index,
            count: group_count,
        }),
    }
}

/// Build the classification prompt.
///
/// New-tag discovery is only requested when source URLs are present.
pub fn classification_prompt(
    description: &str,
    vocabulary: &TagSet,
    website_urls: &[String],
    document_urls: &[String],
) -> String {
    let has_sources = !website_urls.is_empty() || !document_urls.is_empty();
    let vocab_list = vocabulary
        .iter()
        .map(|t| format!("\"{}\"", t))
        .collect::<Vec<_>>()
        .join(", ");

    let mut prompt = String::new();
    prompt.push_str("You are a grant tagging classifier.\n");
    prompt.push_str(
        "Choose ALL tags that apply to the grant below from this vocabulary. \
         Existing tags MUST be copied exactly from the list:\n",
    );
    prompt.push_str(&format!("[{}]\n\n", vocab_list));

    if has_sources {
        prompt.push_str(
            "Read the source material linked below. If it describes important \
             attributes that no vocabulary tag covers, propose up to ",
        );
        prompt.push_str(&format!(
            "{} new tags (lowercase, hyphen-separated) in \"new_tags\".\n",
            MAX_NEW_TAGS
        ));
        if !website_urls.is_empty() {
            prompt.push_str("Websites:\n");
            for url in website_urls {
                prompt.push_str(&format!("- {}\n", url));
            }
        }
        if !document_urls.is_empty() {
            prompt.push_str("PDF documents:\n");
            for url in document_urls {
                prompt.push_str(&format!("- {}\n", url));
            }
        }
        prompt.push('\n');
    } else {
        prompt.push_str("Do not invent tags; \"new_tags\" must be an empty array.\n\n");
    }

    prompt.push_str(
        "Return ONLY a JSON object of the form \
         {\"existing_tags\": [\"...\"], \"new_tags\": [\"...\"]} with no other text.\n\n",
    );
    prompt.push_str("Grant description:\n");
    prompt.push_str(description);
    prompt
}

/// Build the prompt asking which synonym group a new tag belongs to.
pub fn placement_prompt(new_tag: &str, groups: &[SynonymGroup]) -> String {
    let mut prompt = String::new();
    prompt.push_str("You maintain groups of synonymous tags used to expand searches.\n");
    prompt.push_str("Existing groups (0-based index: members):\n");
    for (i, group) in groups.iter().enumerate() {
        let members = group.tags.iter().cloned().collect::<Vec<_>>().join(", ");
        prompt.push_str(&format!("{}: {}\n", i, members));
    }
    prompt.push_str(&format!("\nNew tag: \"{}\"\n\n", new_tag));
    prompt.push_str(
        "If the new tag means the same thing as the members of exactly one group, \
         return that group's index. Otherwise return -1. \
         Return ONLY the integer, with no other text.",
    );
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_fences_plain() {
        assert_eq!(strip_code_fences("  [\"a\"]  "), "[\"a\"]");
    }

    #[test]
    fn test_strip_fences_json_block() {
        let raw = "```json\n{\"existing_tags\": [], \"new_tags\": []}\n```";
        assert_eq!(
            strip_code_fences(raw),
            "{\"existing_tags\": [], \"new_tags\": []}"
        );
    }

    #[test]
    fn test_strip_fences_uppercase_lang_and_no_close() {
        assert_eq!(strip_code_fences("```JSON\n[1, 2]"), "[1, 2]");
    }

    #[test]
    fn test_parse_classified() {
        let raw = "```json\n{\"existing_tags\": [\"water\"], \"new_tags\": [\"hydro_power\"]}\n```";
        let resp = parse_tag_response(raw).unwrap();
        assert_eq!(resp.existing_tags(), ["water".to_string()]);
        assert_eq!(resp.new_tags(), ["hydro_power".to_string()]);
    }

    #[test]
    fn test_parse_flat_array() {
        let resp = parse_tag_response("[\"agriculture\", \"education\"]").unwrap();
        assert_eq!(
            resp,
            TagResponse::Flat(vec!["agriculture".to_string(), "education".to_string()])
        );
        assert!(resp.new_tags().is_empty());
    }

    #[test]
    fn test_parse_rejects_wrong_shapes() {
        assert!(matches!(
            parse_tag_response("{\"tags\": [\"water\"]}"),
            Err(ResponseParseError::Schema(_))
        ));
        assert!(matches!(
            parse_tag_response("[\"water\", 3]"),
            Err(ResponseParseError::Schema(_))
        ));
        assert!(matches!(
            parse_tag_response("{\"existing_tags\": [\"water\"]}"),
            Err(ResponseParseError::Schema(_))
        ));
        assert!(matches!(
            parse_tag_response("Sure! Here are the tags: water"),
            Err(ResponseParseError::Json(_))
        ));
        assert!(matches!(
            parse_tag_response("```\n```"),
            Err(ResponseParseError::Empty)
        ));
    }

    #[test]
    fn test_parse_group_choice() {
        assert_eq!(parse_group_choice("2", 3).unwrap(), GroupChoice::Group(2));
        assert_eq!(parse_group_choice(" -1 ", 3).unwrap(), GroupChoice::NoMatch);
        assert_eq!(
            parse_group_choice("```json\n{\"index\": 0}\n```", 1).unwrap(),
            GroupChoice::Group(0)
        );
        assert!(matches!(
            parse_group_choice("3", 3),
            Err(ResponseParseError::IndexOutOfRange { index: 3, count: 3 })
        ));
        assert!(matches!(
            parse_group_choice("-4", 3),
            Err(ResponseParseError::IndexOutOfRange { .. })
        ));
        assert!(parse_group_choice("\"first\"", 3).is_err());
        assert!(parse_group_choice("group one", 3).is_err());
    }

    #[test]
    fn test_classification_prompt_without_sources() {
        let vocab: TagSet = ["water".to_string(), "soil".to_string()].into();
        let prompt = classification_prompt("Irrigation upgrades", &vocab, &[], &[]);
        assert!(prompt.contains("\"soil\", \"water\""));
        assert!(prompt.contains("Irrigation upgrades"));
        assert!(prompt.contains("must be an empty array"));
        assert!(!prompt.contains("PDF documents"));
    }

    #[test]
    fn test_classification_prompt_with_sources() {
        let vocab: TagSet = ["water".to_string()].into();
        let docs = vec!["https://example.org/rfa.pdf".to_string()];
        let prompt = classification_prompt("desc", &vocab, &[], &docs);
        assert!(prompt.contains("up to 3 new tags"));
        assert!(prompt.contains("- https://example.org/rfa.pdf"));
        assert!(!prompt.contains("Websites:"));
    }

    #[test]
    fn test_placement_prompt_lists_groups() {
        let groups = vec![SynonymGroup {
            id: 7,
            tags: ["agriculture".to_string(), "farmer".to_string()].into(),
        }];
        let prompt = placement_prompt("rancher", &groups);
        assert!(prompt.contains("0: agriculture, farmer"));
        assert!(prompt.contains("\"rancher\""));
    }
}
