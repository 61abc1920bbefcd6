//! Technology fingerprinting of fetched pages.
//!
//! The bundled matcher evaluates a small signature table against response
//! headers, `<meta>` tags, script sources and raw HTML.

use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;

use log::{debug, trace};
use regex::Regex;
use serde::Deserialize;

use super::http_client::PageFetcher;
use crate::error::{ToolboxError, ToolboxResult};
use crate::types::{DetectedTechnology, StackAnalyzerResponse};

const BUILTIN_SIGNATURES: &str = include_str!("stack_signatures.json");

static META_TAG: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?is)<meta\s[^>]*>").ok());
static META_NAME: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r#"(?i)\b(?:name|property|http-equiv)\s*=\s*["']([^"']+)["']"#).ok()
});
static META_CONTENT: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r#"(?i)\bcontent\s*=\s*["']([^"']*)["']"#).ok());
static SCRIPT_SRC: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r#"(?is)<script[^>]+src\s*=\s*["']([^"']+)["']"#).ok());

/// Recognises technologies from a page's headers and body.
pub trait TechnologyMatcher: Send + Sync {
    fn analyze(&self, headers: &BTreeMap<String, Vec<String>>, body: &str)
        -> Vec<DetectedTechnology>;
}

#[derive(Debug, Deserialize)]
struct RawSignature {
    name: String,
    #[serde(default)]
    categories: Vec<String>,
    description: Option<String>,
    website: Option<String>,
    icon: Option<String>,
    cpe: Option<String>,
    #[serde(default)]
    headers: BTreeMap<String, String>,
    #[serde(default)]
    meta: BTreeMap<String, String>,
    #[serde(default)]
    scripts: Vec<String>,
    #[serde(default)]
    html: Vec<String>,
}

#[derive(Debug)]
struct Signature {
    technology: DetectedTechnology,
    headers: Vec<(String, Regex)>,
    meta: Vec<(String, Regex)>,
    scripts: Vec<Regex>,
    html: Vec<Regex>,
}

fn compile(name: &str, pattern: &str) -> ToolboxResult<Regex> {
    Regex::new(&format!("(?i){pattern}")).map_err(|e| {
        ToolboxError::ValidationError(format!("Invalid signature pattern for {name}: {e}"))
    })
}

fn compile_keyed(
    name: &str,
    patterns: BTreeMap<String, String>,
) -> ToolboxResult<Vec<(String, Regex)>> {
    patterns
        .into_iter()
        .map(|(key, pattern)| Ok((key.to_lowercase(), compile(name, &pattern)?)))
        .collect()
}

impl Signature {
    fn compile(raw: RawSignature) -> ToolboxResult<Self> {
        let name = raw.name.as_str();
        let headers = compile_keyed(name, raw.headers)?;
        let meta = compile_keyed(name, raw.meta)?;
        let scripts = raw
            .scripts
            .iter()
            .map(|p| compile(name, p))
            .collect::<ToolboxResult<_>>()?;
        let html = raw
            .html
            .iter()
            .map(|p| compile(name, p))
            .collect::<ToolboxResult<_>>()?;

        Ok(Self {
            technology: DetectedTechnology {
                name: raw.name,
                version: None,
                categories: raw.categories,
                description: raw.description,
                website: raw.website,
                icon: raw.icon,
                cpe: raw.cpe,
            },
            headers,
            meta,
            scripts,
            html,
        })
    }
}

/// Page facts extracted once and shared by every signature.
struct PageFacts<'a> {
    /// Lowercased header name to values.
    headers: HashMap<String, &'a [String]>,
    /// Lowercased meta name to content values.
    meta: HashMap<String, Vec<&'a str>>,
    scripts: Vec<&'a str>,
    body: &'a str,
}

impl<'a> PageFacts<'a> {
    fn extract(headers: &'a BTreeMap<String, Vec<String>>, body: &'a str) -> Self {
        let headers = headers
            .iter()
            .map(|(name, values)| (name.to_lowercase(), values.as_slice()))
            .collect();

        let mut meta: HashMap<String, Vec<&str>> = HashMap::new();
        if let (Some(tag_re), Some(name_re), Some(content_re)) =
            (&*META_TAG, &*META_NAME, &*META_CONTENT)
        {
            for tag in tag_re.find_iter(body) {
                let tag = tag.as_str();
                let name = name_re.captures(tag).and_then(|c| c.get(1));
                let content = content_re.captures(tag).and_then(|c| c.get(1));
                if let (Some(name), Some(content)) = (name, content) {
                    meta.entry(name.as_str().to_lowercase())
                        .or_default()
                        .push(content.as_str());
                }
            }
        }

        let scripts = SCRIPT_SRC
            .as_ref()
            .map(|re| {
                re.captures_iter(body)
                    .filter_map(|c| c.get(1).map(|m| m.as_str()))
                    .collect()
            })
            .unwrap_or_default();

        Self {
            headers,
            meta,
            scripts,
            body,
        }
    }
}

/// Outcome of testing one pattern against some text.
fn probe(pattern: &Regex, text: &str) -> Option<Option<String>> {
    pattern.captures(text).map(|caps| {
        caps.iter()
            .skip(1)
            .flatten()
            .map(|m| m.as_str().to_string())
            .find(|v| !v.is_empty())
    })
}

/// Matcher backed by a JSON signature table.
#[derive(Debug)]
pub struct SignatureMatcher {
    signatures: Vec<Signature>,
}

impl SignatureMatcher {
    /// The signature table shipped with the crate.
    pub fn builtin() -> ToolboxResult<Self> {
        Self::from_json(BUILTIN_SIGNATURES)
    }

    pub fn from_json(json: &str) -> ToolboxResult<Self> {
        let raw: Vec<RawSignature> = serde_json::from_str(json).map_err(|e| {
            ToolboxError::ValidationError(format!("Invalid technology signatures: {e}"))
        })?;
        let signatures = raw
            .into_iter()
            .map(Signature::compile)
            .collect::<ToolboxResult<Vec<_>>>()?;
        debug!("[Stack] Loaded {} technology signatures", signatures.len());
        Ok(Self { signatures })
    }

    /// `None` when nothing matched, otherwise the first captured version.
    fn evaluate(signature: &Signature, page: &PageFacts<'_>) -> Option<Option<String>> {
        let mut hits = Vec::new();

        for (name, pattern) in &signature.headers {
            if let Some(values) = page.headers.get(name) {
                hits.extend(values.iter().filter_map(|v| probe(pattern, v)));
            }
        }
        for (name, pattern) in &signature.meta {
            if let Some(values) = page.meta.get(name) {
                hits.extend(values.iter().filter_map(|v| probe(pattern, v)));
            }
        }
        for pattern in &signature.scripts {
            hits.extend(page.scripts.iter().filter_map(|src| probe(pattern, src)));
        }
        for pattern in &signature.html {
            hits.extend(probe(pattern, page.body));
        }

        if hits.is_empty() {
            return None;
        }
        Some(hits.into_iter().flatten().next())
    }
}

impl TechnologyMatcher for SignatureMatcher {
    fn analyze(
        &self,
        headers: &BTreeMap<String, Vec<String>>,
        body: &str,
    ) -> Vec<DetectedTechnology> {
        let page = PageFacts::extract(headers, body);
        let mut found: Vec<DetectedTechnology> = self
            .signatures
            .iter()
            .filter_map(|signature| {
                Self::evaluate(signature, &page).map(|version| {
                    trace!("[Stack] Matched {} {version:?}", signature.technology.name);
                    DetectedTechnology {
                        version,
                        ..signature.technology.clone()
                    }
                })
            })
            .collect();
        found.sort_by(|a, b| a.name.cmp(&b.name));
        found
    }
}

/// Fetch `url` and fingerprint the page.
///
/// Only a `200` response is analysed; other statuses and fetch failures are
/// reported in `error`.
pub async fn analyze_stack(
    fetcher: &PageFetcher,
    matcher: &dyn TechnologyMatcher,
    url: &str,
) -> StackAnalyzerResponse {
    let mut response = StackAnalyzerResponse {
        request_url: url.to_string(),
        final_url: url.to_string(),
        ..Default::default()
    };

    let page = match fetcher.fetch(url).await {
        Ok(page) => page,
        Err(e) => {
            response.error = Some(e.detail());
            return response;
        }
    };
    response.final_url = page.final_url;

    if page.status_code != 200 {
        response.error = Some(format!(
            "failed to fetch {url}: received status code {} ({})",
            page.status_code, page.status
        ));
        return response;
    }

    response.technologies = matcher.analyze(&page.headers, &page.body);
    debug!(
        "[Stack] {} technologies detected on {}",
        response.technologies.len(),
        response.final_url
    );
    response
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::super::http_client::test_server::{response, spawn};
    use super::*;

    fn headers(pairs: &[(&str, &str)]) -> BTreeMap<String, Vec<String>> {
        let mut map: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (name, value) in pairs {
            map.entry((*name).to_string())
                .or_default()
                .push((*value).to_string());
        }
        map
    }

    fn names(found: &[DetectedTechnology]) -> Vec<&str> {
        found.iter().map(|t| t.name.as_str()).collect()
    }

    // ==================== SignatureMatcher tests ====================

    #[test]
    fn test_builtin_signatures_compile() {
        let matcher = SignatureMatcher::builtin().unwrap();
        assert!(matcher.signatures.len() > 10);
    }

    #[test]
    fn test_header_match_with_version() {
        let matcher = SignatureMatcher::builtin().unwrap();
        let found = matcher.analyze(
            &headers(&[("Server", "nginx/1.25.3"), ("X-Powered-By", "PHP/8.2.1")]),
            "",
        );
        assert_eq!(names(&found), ["Nginx", "PHP"]);
        assert_eq!(found[0].version.as_deref(), Some("1.25.3"));
        assert_eq!(found[1].version.as_deref(), Some("8.2.1"));
        assert!(found[0].categories.contains(&"Web servers".to_string()));
    }

    #[test]
    fn test_header_presence_only() {
        let matcher = SignatureMatcher::builtin().unwrap();
        let found = matcher.analyze(&headers(&[("CF-RAY", "8a1b2c3d4e5f-SYD")]), "");
        assert_eq!(names(&found), ["Cloudflare"]);
        assert!(found[0].version.is_none());
    }

    #[test]
    fn test_body_signals() {
        let body = r#"<html><head>
            <meta name="generator" content="WordPress 6.4.2">
            <script src="https://code.jquery.com/jquery-3.7.1.min.js"></script>
            </head><body><div id="app" ng-version="17.0.8"></div></body></html>"#;
        let matcher = SignatureMatcher::builtin().unwrap();
        let found = matcher.analyze(&BTreeMap::new(), body);
        assert_eq!(names(&found), ["Angular", "WordPress", "jQuery"]);
        assert_eq!(found[0].version.as_deref(), Some("17.0.8"));
        assert_eq!(found[1].version.as_deref(), Some("6.4.2"));
        assert_eq!(found[2].version.as_deref(), Some("3.7.1"));
    }

    #[test]
    fn test_nothing_detected() {
        let matcher = SignatureMatcher::builtin().unwrap();
        assert!(matcher
            .analyze(&headers(&[("Content-Type", "text/plain")]), "hello")
            .is_empty());
    }

    #[test]
    fn test_custom_table_and_invalid_pattern() {
        let json = r#"[{"name": "Acme", "categories": ["Custom"], "html": ["acme-widget v(\\d+)"]}]"#;
        let matcher = SignatureMatcher::from_json(json).unwrap();
        let found = matcher.analyze(&BTreeMap::new(), "<div class=\"ACME-WIDGET v3\">");
        assert_eq!(found[0].name, "Acme");
        assert_eq!(found[0].version.as_deref(), Some("3"));

        let broken = r#"[{"name": "Broken", "html": ["(unclosed"]}]"#;
        let err = SignatureMatcher::from_json(broken).unwrap_err();
        assert!(err.detail().starts_with("Invalid signature pattern for Broken"));
    }

    // ==================== analyze_stack tests ====================

    #[tokio::test]
    async fn test_analyze_stack_local_page() {
        let addr = spawn(vec![
            ("/", response("301 Moved Permanently", &[("location", "/home")], "")),
            (
                "/home",
                response(
                    "200 OK",
                    &[("server", "nginx"), ("x-powered-by", "Express")],
                    r#"<script id="__NEXT_DATA__" type="application/json">{}</script>"#,
                ),
            ),
        ])
        .await;

        let url = format!("http://{addr}/");
        let matcher = SignatureMatcher::builtin().unwrap();
        let result = analyze_stack(&PageFetcher::new().unwrap(), &matcher, &url).await;
        assert_eq!(result.request_url, url);
        assert_eq!(result.final_url, format!("http://{addr}/home"));
        assert_eq!(names(&result.technologies), ["Express", "Next.js", "Nginx"]);
        assert!(result.error.is_none());
    }

    #[tokio::test]
    async fn test_analyze_stack_non_200() {
        let addr = spawn(Vec::new()).await;
        let url = format!("http://{addr}/missing");
        let matcher = SignatureMatcher::builtin().unwrap();
        let result = analyze_stack(&PageFetcher::new().unwrap(), &matcher, &url).await;
        assert_eq!(
            result.error,
            Some(format!(
                "failed to fetch {url}: received status code 404 (404 Not Found)"
            ))
        );
        assert!(result.technologies.is_empty());
    }
}
