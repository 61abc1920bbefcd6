//! HTTP response header inspection.

use log::debug;

use super::http_client::PageFetcher;
use crate::types::HttpHeadersResponse;

/// Fetch `url` and report status plus response headers.
///
/// Fetch failures are reported in `error`.
pub async fn http_headers(fetcher: &PageFetcher, url: &str) -> HttpHeadersResponse {
    debug!("[HTTP] Checking headers for {url}");
    match fetcher.fetch(url).await {
        Ok(page) => HttpHeadersResponse {
            request_url: url.to_string(),
            final_url: Some(page.final_url),
            status_code: Some(page.status_code),
            status: Some(page.status),
            headers: page.headers,
            error: None,
        },
        Err(e) => HttpHeadersResponse {
            request_url: url.to_string(),
            error: Some(e.detail()),
            ..Default::default()
        },
    }
}
