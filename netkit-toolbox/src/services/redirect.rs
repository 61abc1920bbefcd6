//! Follows a URL's redirect chain to its destination.

use std::time::Duration;

use log::debug;
use reqwest::Client;
use url::Url;

use super::http_client::{status_line, MAX_REDIRECTS};
use crate::error::{ToolboxError, ToolboxResult};
use crate::types::ResolveRedirectResponse;

const REDIRECT_TIMEOUT_SECS: u64 = 15;

#[derive(Clone)]
pub struct RedirectResolver {
    client: Client,
}

impl RedirectResolver {
    pub fn new() -> ToolboxResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REDIRECT_TIMEOUT_SECS))
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .build()
            .map_err(|e| ToolboxError::NetworkError(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Failures are reported in the response, with `final_url` set when known.
    pub async fn resolve(&self, url: &str) -> ResolveRedirectResponse {
        let mut outcome = ResolveRedirectResponse {
            original_url: url.to_string(),
            ..Default::default()
        };

        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                debug!("[HTTP] Redirect resolution for {url} failed: {e}");
                match e.url().filter(|_| e.is_redirect()) {
                    Some(last) => {
                        outcome.final_url = Some(last.to_string());
                        outcome.error = Some(format!(
                            "failed to get final URL, possibly too many redirects: {e}. Last known URL: {last}"
                        ));
                    }
                    None => outcome.error = Some(format!("request failed for {url}: {e}")),
                }
                return outcome;
            }
        };

        let final_url = response.url().clone();
        let status = response.status();
        debug!("[HTTP] {url} resolved to {final_url} ({status})");

        let redirected = Url::parse(url).map_or(true, |original| original != final_url);
        if !redirected && status.as_u16() >= 300 {
            outcome.error = Some(format!(
                "no redirect from {url}, but resulted in status: {}",
                status_line(status)
            ));
        }
        outcome.final_url = Some(final_url.to_string());
        outcome
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::super::http_client::test_server::{response, spawn};
    use super::*;

    #[tokio::test]
    async fn test_resolves_chain() {
        let addr = spawn(vec![
            ("/a", response("301 Moved Permanently", &[("location", "/b")], "")),
            ("/b", response("302 Found", &[("location", "/c")], "")),
            ("/c", response("200 OK", &[], "done")),
        ])
        .await;

        let url = format!("http://{addr}/a");
        let outcome = RedirectResolver::new().unwrap().resolve(&url).await;
        assert_eq!(outcome.original_url, url);
        assert_eq!(outcome.final_url, Some(format!("http://{addr}/c")));
        assert!(outcome.error.is_none());
    }

    #[tokio::test]
    async fn test_no_redirect_success() {
        let addr = spawn(vec![("/", response("200 OK", &[], "ok"))]).await;
        let url = format!("http://{addr}/");
        let outcome = RedirectResolver::new().unwrap().resolve(&url).await;
        assert_eq!(outcome.final_url.as_deref(), Some(url.as_str()));
        assert!(outcome.error.is_none());
    }

    #[tokio::test]
    async fn test_no_redirect_error_status() {
        let addr = spawn(Vec::new()).await;
        let url = format!("http://{addr}/gone");
        let outcome = RedirectResolver::new().unwrap().resolve(&url).await;
        assert_eq!(outcome.final_url.as_deref(), Some(url.as_str()));
        assert_eq!(
            outcome.error,
            Some(format!("no redirect from {url}, but resulted in status: 404 Not Found"))
        );
    }

    #[tokio::test]
    async fn test_redirect_loop_reports_last_url() {
        let addr = spawn(vec![
            ("/x", response("302 Found", &[("location", "/y")], "")),
            ("/y", response("302 Found", &[("location", "/x")], "")),
        ])
        .await;
        let outcome = RedirectResolver::new()
            .unwrap()
            .resolve(&format!("http://{addr}/x"))
            .await;
        assert!(outcome.final_url.is_some());
        assert!(outcome.error.unwrap().contains("Last known URL"));
    }

    #[tokio::test]
    async fn test_transport_failure() {
        let outcome = RedirectResolver::new()
            .unwrap()
            .resolve("not-a-url")
            .await;
        assert!(outcome.final_url.is_none());
        assert!(outcome
            .error
            .unwrap()
            .starts_with("request failed for not-a-url: "));
    }
}
