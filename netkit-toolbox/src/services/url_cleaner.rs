//! Removes known tracking parameters from URLs.

use std::collections::{BTreeMap, HashMap};

use log::debug;
use serde::Deserialize;
use url::Url;

use crate::error::{ToolboxError, ToolboxResult};
use crate::types::{CleanUrlResponse, RemovedParam};

/// Bundled rule table.
const BUILTIN_RULES: &str = include_str!("tracking_params.json");

pub const NOTHING_REMOVED: &str = "No known tracking parameters found to remove.";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum MatchType {
    #[default]
    Exact,
    Prefix,
}

#[derive(Debug, Clone, Deserialize)]
struct TrackingRule {
    key: String,
    #[serde(default)]
    match_type: Option<MatchType>,
    company: String,
    #[serde(rename = "type")]
    param_type: String,
    description: String,
}

/// Tracking parameter definitions split by match type.
#[derive(Debug, Clone, Default)]
pub struct TrackingRules {
    exact: HashMap<String, TrackingRule>,
    prefix: Vec<TrackingRule>,
}

impl TrackingRules {
    /// The rule table shipped with the crate.
    pub fn builtin() -> ToolboxResult<Self> {
        Self::from_json(BUILTIN_RULES)
    }

    /// Keys are lowercased; a missing `match_type` means exact.
    pub fn from_json(json: &str) -> ToolboxResult<Self> {
        let rules: Vec<TrackingRule> = serde_json::from_str(json).map_err(|e| {
            ToolboxError::ValidationError(format!("Invalid tracking parameter rules: {e}"))
        })?;

        let mut table = Self::default();
        for mut rule in rules {
            rule.key = rule.key.to_lowercase();
            match rule.match_type.unwrap_or_default() {
                MatchType::Exact => {
                    table.exact.insert(rule.key.clone(), rule);
                }
                MatchType::Prefix => table.prefix.push(rule),
            }
        }
        debug!(
            "[URL] Loaded tracking rules: exact={}, prefix={}",
            table.exact.len(),
            table.prefix.len()
        );
        Ok(table)
    }

    /// Exact rules win over prefix rules; the first matching prefix wins.
    fn find(&self, parameter: &str) -> Option<&TrackingRule> {
        let lowered = parameter.to_lowercase();
        self.exact.get(&lowered).or_else(|| {
            self.prefix
                .iter()
                .find(|rule| lowered.starts_with(rule.key.as_str()))
        })
    }

    /// Strip every parameter matched by a rule.
    ///
    /// Kept parameters are re-emitted sorted by key with their values in the
    /// original order.
    pub fn clean(&self, raw_url: &str) -> ToolboxResult<CleanUrlResponse> {
        let mut url = Url::parse(raw_url.trim())
            .map_err(|e| ToolboxError::ValidationError(format!("Invalid URL: {e}")))?;

        let mut removed_params = Vec::new();
        if url.query().is_some() {
            let mut kept: BTreeMap<String, Vec<String>> = BTreeMap::new();
            for (key, value) in url.query_pairs() {
                match self.find(&key) {
                    Some(rule) => removed_params.push(RemovedParam {
                        parameter: key.into_owned(),
                        value: value.into_owned(),
                        company: rule.company.clone(),
                        param_type: rule.param_type.clone(),
                        description: rule.description.clone(),
                        matched_rule: rule.key.clone(),
                    }),
                    None => kept
                        .entry(key.into_owned())
                        .or_default()
                        .push(value.into_owned()),
                }
            }

            if kept.is_empty() {
                url.set_query(None);
            } else {
                url.query_pairs_mut().clear().extend_pairs(
                    kept.iter()
                        .flat_map(|(k, values)| values.iter().map(move |v| (k, v))),
                );
            }
        }

        Ok(CleanUrlResponse {
            original_url: raw_url.to_string(),
            cleaned_url: url.to_string(),
            message: removed_params
                .is_empty()
                .then(|| NOTHING_REMOVED.to_string()),
            removed_params,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    fn rules() -> TrackingRules {
        TrackingRules::builtin().unwrap()
    }

    #[test]
    fn test_builtin_rules_load() {
        let rules = rules();
        assert!(rules.exact.contains_key("fbclid"));
        assert!(rules.prefix.iter().any(|r| r.key == "utm_"));
    }

    #[test]
    fn test_removes_utm_and_click_ids() {
        let result = rules()
            .clean("https://example.com/page?utm_source=google&id=42&fbclid=abc")
            .unwrap();
        assert_eq!(result.cleaned_url, "https://example.com/page?id=42");
        assert!(result.message.is_none());

        let removed: Vec<_> = result
            .removed_params
            .iter()
            .map(|p| (p.parameter.as_str(), p.matched_rule.as_str()))
            .collect();
        assert_eq!(removed, [("utm_source", "utm_"), ("fbclid", "fbclid")]);
        assert_eq!(result.removed_params[1].company, "Meta");
        assert_eq!(result.removed_params[1].param_type, "Click ID");
    }

    #[test]
    fn test_match_is_case_insensitive_but_reports_original_key() {
        let result = rules().clean("https://example.com/?UTM_Medium=email").unwrap();
        assert_eq!(result.cleaned_url, "https://example.com/");
        assert_eq!(result.removed_params[0].parameter, "UTM_Medium");
        assert_eq!(result.removed_params[0].value, "email");
    }

    #[test]
    fn test_kept_keys_sorted_values_in_order() {
        let result = rules()
            .clean("https://example.com/?z=1&a=2&z=0&gclid=x")
            .unwrap();
        assert_eq!(result.cleaned_url, "https://example.com/?a=2&z=1&z=0");
    }

    #[test]
    fn test_one_removed_entry_per_value() {
        let result = rules()
            .clean("https://example.com/?utm_term=a&utm_term=b")
            .unwrap();
        assert_eq!(result.removed_params.len(), 2);
        assert_eq!(result.removed_params[1].value, "b");
    }

    #[test]
    fn test_nothing_to_remove() {
        let result = rules().clean("https://example.com/search?q=rust").unwrap();
        assert_eq!(result.cleaned_url, "https://example.com/search?q=rust");
        assert_eq!(result.message.as_deref(), Some(NOTHING_REMOVED));
        assert!(result.removed_params.is_empty());
    }

    #[test]
    fn test_without_query() {
        let result = rules().clean("https://example.com").unwrap();
        assert_eq!(result.cleaned_url, "https://example.com/");
        assert_eq!(result.original_url, "https://example.com");
    }

    #[test]
    fn test_fragment_preserved() {
        let result = rules()
            .clean("https://example.com/a?utm_campaign=x#section")
            .unwrap();
        assert_eq!(result.cleaned_url, "https://example.com/a#section");
    }

    #[test]
    fn test_invalid_url() {
        assert!(matches!(
            rules().clean("not a url"),
            Err(ToolboxError::ValidationError(_))
        ));
    }

    #[test]
    fn test_exact_rule_wins_over_prefix() {
        let json = r#"[
            {"key": "ref_", "match_type": "prefix", "company": "Generic", "type": "Referral", "description": "prefix"},
            {"key": "REF_SRC", "company": "Specific", "type": "Referral", "description": "exact"}
        ]"#;
        let table = TrackingRules::from_json(json).unwrap();
        let result = table.clean("https://example.com/?ref_src=a&ref_x=b").unwrap();
        assert_eq!(result.removed_params[0].company, "Specific");
        assert_eq!(result.removed_params[0].matched_rule, "ref_src");
        assert_eq!(result.removed_params[1].company, "Generic");
        assert_eq!(result.removed_params[1].matched_rule, "ref_");
    }

    #[test]
    fn test_malformed_rules_rejected() {
        assert!(TrackingRules::from_json("{").is_err());
    }
}
