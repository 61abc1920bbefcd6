//! Browser-like page fetcher shared by the header viewer and stack analyzer.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::debug;
use reqwest::header::{HeaderMap, ACCEPT, ACCEPT_LANGUAGE, DNT, UPGRADE_INSECURE_REQUESTS, USER_AGENT};
use reqwest::{Client, StatusCode};

use crate::error::{ToolboxError, ToolboxResult};

const REQUEST_TIMEOUT_SECS: u64 = 30;
const CONNECT_TIMEOUT_SECS: u64 = 15;
pub(crate) const MAX_REDIRECTS: usize = 10;

const BROWSER_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8";
const BROWSER_ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";

/// Rotated per request.
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36 Edg/124.0.0.0",
    "Mozilla/5.0 (iPhone; CPU iPhone OS 17_4 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Mobile/15E148 Safari/604.1",
    "Mozilla/5.0 (Linux; Android 14; Pixel 8) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Mobile Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
];

/// A fetched page after redirects.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchedPage {
    pub status_code: u16,
    /// e.g. `200 OK`
    pub status: String,
    /// Canonical header names (`Content-Type`) to every value sent.
    pub headers: BTreeMap<String, Vec<String>>,
    pub body: String,
    pub final_url: String,
}

/// HTTP client that presents itself as a regular browser.
#[derive(Clone)]
pub struct PageFetcher {
    client: Client,
    next_agent: Arc<AtomicUsize>,
}

impl PageFetcher {
    pub fn new() -> ToolboxResult<Self> {
        Self::with_timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
    }

    pub fn with_timeout(request_timeout: Duration) -> ToolboxResult<Self> {
        let client = Client::builder()
            .timeout(request_timeout)
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .build()
            .map_err(|e| ToolboxError::NetworkError(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            next_agent: Arc::new(AtomicUsize::new(0)),
        })
    }

    fn user_agent(&self) -> &'static str {
        let index = self.next_agent.fetch_add(1, Ordering::Relaxed);
        USER_AGENTS[index % USER_AGENTS.len()]
    }

    /// GET `url` following redirects and read the whole body.
    pub async fn fetch(&self, url: &str) -> ToolboxResult<FetchedPage> {
        let user_agent = self.user_agent();
        debug!("[HTTP] Fetching {url}");

        let response = self
            .client
            .get(url)
            .header(USER_AGENT, user_agent)
            .header(ACCEPT, BROWSER_ACCEPT)
            .header(ACCEPT_LANGUAGE, BROWSER_ACCEPT_LANGUAGE)
            .header(DNT, "1")
            .header(UPGRADE_INSECURE_REQUESTS, "1")
            .send()
            .await
            .map_err(|e| ToolboxError::NetworkError(format!("failed to fetch {url}: {e}")))?;

        let status = response.status();
        let final_url = response.url().to_string();
        let headers = collect_headers(response.headers());
        let body = response.text().await.map_err(|e| {
            ToolboxError::NetworkError(format!("failed to read response body from {url}: {e}"))
        })?;

        debug!("[HTTP] {url} -> {final_url} ({status})");
        Ok(FetchedPage {
            status_code: status.as_u16(),
            status: status_line(status),
            headers,
            body,
            final_url,
        })
    }
}

/// `200 OK`; codes without a registered reason are shown bare.
pub(crate) fn status_line(status: StatusCode) -> String {
    match status.canonical_reason() {
        Some(reason) => format!("{} {reason}", status.as_u16()),
        None => status.as_u16().to_string(),
    }
}

/// `content-type` -> `Content-Type`
fn canonical_name(name: &str) -> String {
    name.split('-')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}

fn collect_headers(map: &HeaderMap) -> BTreeMap<String, Vec<String>> {
    let mut headers: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, value) in map {
        headers
            .entry(canonical_name(name.as_str()))
            .or_default()
            .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
    }
    headers
}

/// Minimal HTTP/1.1 server for exercising the fetchers without network access.
#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
pub(crate) mod test_server {
    use std::fmt::Write as _;
    use std::net::SocketAddr;
    use std::sync::Arc;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// A full raw response; the connection is closed after it is written.
    pub(crate) fn response(status: &str, headers: &[(&str, &str)], body: &str) -> String {
        let mut out = format!(
            "HTTP/1.1 {status}\r\ncontent-length: {}\r\nconnection: close\r\n",
            body.len()
        );
        for (name, value) in headers {
            let _ = write!(out, "{name}: {value}\r\n");
        }
        out.push_str("\r\n");
        out.push_str(body);
        out
    }

    /// Serve `routes` (path, raw response); unknown paths get a 404.
    pub(crate) async fn spawn(routes: Vec<(&'static str, String)>) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let routes = Arc::new(routes);

        tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                let routes = Arc::clone(&routes);
                tokio::spawn(async move {
                    let mut request = Vec::new();
                    let mut chunk = [0u8; 1024];
                    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                        match stream.read(&mut chunk).await {
                            Ok(0) | Err(_) => return,
                            Ok(n) => request.extend_from_slice(&chunk[..n]),
                        }
                    }
                    let text = String::from_utf8_lossy(&request);
                    let path = text.split_whitespace().nth(1).unwrap_or("/");
                    let reply = routes
                        .iter()
                        .find(|(route, _)| *route == path)
                        .map(|(_, reply)| reply.clone())
                        .unwrap_or_else(|| response("404 Not Found", &[], "missing"));
                    let _ = stream.write_all(reply.as_bytes()).await;
                    let _ = stream.shutdown().await;
                });
            }
        });
        addr
    }
}
