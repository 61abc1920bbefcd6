//! UTM 链接生成

use std::collections::BTreeMap;

use log::debug;
use url::Url;

use crate::error::{ToolboxError, ToolboxResult};
use crate::types::{
    GeneratedUtmLink, UtmGeneratorRequest, UtmGeneratorResponse, UtmOptions, UtmParameterSet,
};

pub const MISSING_REQUIRED: &str =
    "utm_source, utm_medium, and utm_campaign are required for each generated link.";

/// Merged parameters of one link, already formatted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct UtmValues {
    source: String,
    medium: String,
    campaign: String,
    term: String,
    content: String,
}

fn format_value(value: &str, options: &UtmOptions) -> String {
    let mut formatted = if options.force_lowercase {
        value.to_lowercase()
    } else {
        value.to_string()
    };
    if let Some(replacement) = options.space_replacement.as_deref() {
        if !replacement.is_empty() {
            formatted = formatted.replace(' ', replacement);
        }
    }
    formatted
}

/// Non-empty per-link values override the common ones.
fn pick(own: Option<&String>, common: Option<&String>) -> String {
    own.filter(|v| !v.is_empty())
        .or(common)
        .cloned()
        .unwrap_or_default()
}

fn merge(request: &UtmGeneratorRequest, set: &UtmParameterSet) -> ToolboxResult<UtmValues> {
    let common = &request.common_params;
    let values = UtmValues {
        source: set.utm_source.clone(),
        medium: set.utm_medium.clone(),
        campaign: pick(set.utm_campaign.as_ref(), Some(&common.utm_campaign)),
        term: pick(set.utm_term.as_ref(), common.utm_term.as_ref()),
        content: pick(set.utm_content.as_ref(), common.utm_content.as_ref()),
    };
    if values.source.is_empty() || values.medium.is_empty() || values.campaign.is_empty() {
        return Err(ToolboxError::ValidationError(MISSING_REQUIRED.to_string()));
    }
    Ok(values)
}

/// Existing query parameters are kept; the query is re-emitted sorted by key.
fn build_link(base: &Url, values: &UtmValues) -> String {
    let mut query: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (key, value) in base.query_pairs() {
        query
            .entry(key.into_owned())
            .or_default()
            .push(value.into_owned());
    }

    let utm = [
        ("utm_source", &values.source),
        ("utm_medium", &values.medium),
        ("utm_campaign", &values.campaign),
        ("utm_term", &values.term),
        ("utm_content", &values.content),
    ];
    for (key, value) in utm {
        if !value.is_empty() {
            query.insert(key.to_string(), vec![value.clone()]);
        }
    }

    let mut url = base.clone();
    url.query_pairs_mut().clear().extend_pairs(
        query
            .iter()
            .flat_map(|(k, values)| values.iter().map(move |v| (k, v))),
    );
    url.to_string()
}

fn non_empty(value: String) -> Option<String> {
    (!value.is_empty()).then_some(value)
}

/// Generate one tagged link per variable set.
///
/// The first set that lacks source, medium or campaign after merging fails
/// the whole request.
pub fn generate_utm(request: &UtmGeneratorRequest) -> ToolboxResult<UtmGeneratorResponse> {
    let base = Url::parse(request.base_url.trim())
        .map_err(|e| ToolboxError::ValidationError(format!("Invalid base URL: {e}")))?;
    let options = request.options.clone().unwrap_or_default();

    let mut generated_urls = Vec::with_capacity(request.variable_sets.len());
    for set in &request.variable_sets {
        let merged = merge(request, set)?;
        let formatted = UtmValues {
            source: format_value(&merged.source, &options),
            medium: format_value(&merged.medium, &options),
            campaign: format_value(&merged.campaign, &options),
            term: format_value(&merged.term, &options),
            content: format_value(&merged.content, &options),
        };
        let full_url = build_link(&base, &formatted);
        debug!("[UTM] Generated {full_url}");

        generated_urls.push(GeneratedUtmLink {
            source: formatted.source,
            medium: formatted.medium,
            campaign: formatted.campaign,
            term: non_empty(formatted.term),
            content: non_empty(formatted.content),
            full_url,
        });
    }

    Ok(UtmGeneratorResponse {
        base_url: request.base_url.clone(),
        generated_urls,
        options_applied: options,
    })
}
