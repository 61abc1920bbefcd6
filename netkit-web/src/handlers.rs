//! HTTP API endpoints
//!
//! All routes live under `/api/v1` and answer JSON. Lookup failures are
//! reported with `200` and an `error` field; only missing or malformed input
//! yields `400`.

use std::sync::Arc;

use actix_web::{error, get, post, web, HttpRequest, HttpResponse};
use chrono::Utc;
use netkit_toolbox::{
    CertificateRecord, DnsLookupResponse, HttpHeadersResponse, IpInfoResponse,
    ResolveRedirectResponse, StackAnalyzerResponse, ToolboxResult, UtmGeneratorRequest,
    WhoisRecord, DEFAULT_TLS_PORT,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::gateway::{run_toolbox_tool, ToolTimeouts, ToolboxGateway};

/// Raw query pairs; repeated keys are kept.
type QueryPairs = web::Query<Vec<(String, String)>>;
type Gateway = web::Data<dyn ToolboxGateway>;

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

/// A response shape plus the failure that cut it short.
#[derive(Debug, Serialize)]
struct WithError<T> {
    #[serde(flatten)]
    body: T,
    error: String,
}

#[derive(Debug, Deserialize)]
struct CleanUrlRequest {
    #[serde(default)]
    url: String,
}

fn bad_request(message: impl Into<String>) -> HttpResponse {
    HttpResponse::BadRequest().json(ErrorBody {
        error: message.into(),
    })
}

fn missing(name: &str) -> HttpResponse {
    bad_request(format!("{name} query parameter is required"))
}

/// First non-blank value of `name`.
fn param<'a>(pairs: &'a [(String, String)], name: &str) -> Option<&'a str> {
    pairs
        .iter()
        .filter(|(key, _)| key == name)
        .map(|(_, value)| value.trim())
        .find(|value| !value.is_empty())
}

/// Every value of `name`, comma-separated lists flattened.
fn list_param(pairs: &[(String, String)], name: &str) -> Vec<String> {
    pairs
        .iter()
        .filter(|(key, _)| key == name)
        .flat_map(|(_, value)| value.split(','))
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_port(raw: Option<&str>) -> Option<u16> {
    match raw {
        None => Some(DEFAULT_TLS_PORT),
        Some(text) => text.parse::<u16>().ok().filter(|port| *port != 0),
    }
}

async fn infallible<T>(value: impl std::future::Future<Output = T>) -> ToolboxResult<T> {
    Ok(value.await)
}

#[get("/api/v1/health")]
async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "status": "UP" }))
}

#[get("/api/v1/net/dns-lookup")]
async fn dns_lookup(
    query: QueryPairs,
    gateway: Gateway,
    timeouts: web::Data<ToolTimeouts>,
) -> HttpResponse {
    let Some(domain) = param(&query, "domain") else {
        return missing("domain");
    };
    let record_types = list_param(&query, "record_types");

    match run_toolbox_tool(
        timeouts.dns_lookup,
        gateway.dns_lookup(domain, &record_types),
        "DNS lookup",
    )
    .await
    {
        Ok(response) => HttpResponse::Ok().json(response),
        Err(error) => HttpResponse::Ok().json(WithError {
            body: DnsLookupResponse {
                domain: domain.to_string(),
                ..Default::default()
            },
            error,
        }),
    }
}

#[get("/api/v1/net/ip-info")]
async fn ip_info(
    query: QueryPairs,
    gateway: Gateway,
    timeouts: web::Data<ToolTimeouts>,
) -> HttpResponse {
    let Some(ip) = param(&query, "ip") else {
        return missing("ip");
    };

    let response = run_toolbox_tool(timeouts.ip_info, infallible(gateway.ip_info(ip)), "IP lookup")
        .await
        .unwrap_or_else(|error| IpInfoResponse {
            ip_address: ip.to_string(),
            error: Some(error),
            ..Default::default()
        });
    HttpResponse::Ok().json(response)
}

#[get("/api/v1/net/whois-lookup")]
async fn whois_lookup(
    query: QueryPairs,
    gateway: Gateway,
    timeouts: web::Data<ToolTimeouts>,
) -> HttpResponse {
    let Some(domain) = param(&query, "domain") else {
        return missing("domain");
    };

    match run_toolbox_tool(
        timeouts.whois_lookup,
        gateway.whois_lookup(domain),
        "WHOIS lookup",
    )
    .await
    {
        Ok(record) => HttpResponse::Ok().json(record),
        Err(error) => {
            warn!("WHOIS lookup for {domain} failed: {error}");
            HttpResponse::Ok().json(WithError {
                body: WhoisRecord {
                    domain: domain.to_string(),
                    query_time: Utc::now(),
                    ..Default::default()
                },
                error,
            })
        }
    }
}

#[get("/api/v1/net/ssl-check")]
async fn ssl_check(
    query: QueryPairs,
    gateway: Gateway,
    timeouts: web::Data<ToolTimeouts>,
) -> HttpResponse {
    let Some(host) = param(&query, "host") else {
        return missing("host");
    };
    let Some(port) = parse_port(param(&query, "port")) else {
        return bad_request("Invalid port number");
    };

    match run_toolbox_tool(timeouts.ssl_check, gateway.ssl_check(host, port), "SSL check").await {
        Ok(record) => HttpResponse::Ok().json(record),
        Err(error) => {
            warn!("SSL check for {host}:{port} failed: {error}");
            HttpResponse::Ok().json(WithError {
                body: CertificateRecord {
                    domain: host.to_string(),
                    query_time: Utc::now(),
                    ..Default::default()
                },
                error,
            })
        }
    }
}

#[post("/api/v1/url/clean")]
async fn clean_url(body: web::Json<CleanUrlRequest>, gateway: Gateway) -> HttpResponse {
    let url = body.url.trim();
    if url.is_empty() {
        return bad_request("url is required");
    }
    match gateway.clean_url(url) {
        Ok(response) => HttpResponse::Ok().json(response),
        Err(e) => bad_request(e.detail()),
    }
}

#[get("/api/v1/url/resolve-redirect")]
async fn resolve_redirect(
    query: QueryPairs,
    gateway: Gateway,
    timeouts: web::Data<ToolTimeouts>,
) -> HttpResponse {
    let Some(url) = param(&query, "url") else {
        return missing("url");
    };

    let response = run_toolbox_tool(
        timeouts.http,
        infallible(gateway.resolve_redirect(url)),
        "Redirect resolution",
    )
    .await
    .unwrap_or_else(|error| ResolveRedirectResponse {
        original_url: url.to_string(),
        final_url: None,
        error: Some(error),
    });
    HttpResponse::Ok().json(response)
}

#[post("/api/v1/url/generate-utm")]
async fn generate_utm(body: web::Json<UtmGeneratorRequest>, gateway: Gateway) -> HttpResponse {
    match gateway.generate_utm(&body) {
        Ok(response) => HttpResponse::Ok().json(response),
        Err(e) => bad_request(e.detail()),
    }
}

#[get("/api/v1/web/stack-analyzer")]
async fn stack_analyzer(
    query: QueryPairs,
    gateway: Gateway,
    timeouts: web::Data<ToolTimeouts>,
) -> HttpResponse {
    let Some(url) = param(&query, "url") else {
        return missing("url");
    };

    let response = run_toolbox_tool(
        timeouts.http,
        infallible(gateway.analyze_stack(url)),
        "Stack analysis",
    )
    .await
    .unwrap_or_else(|error| StackAnalyzerResponse {
        request_url: url.to_string(),
        final_url: url.to_string(),
        error: Some(error),
        ..Default::default()
    });
    HttpResponse::Ok().json(response)
}

#[get("/api/v1/web/http-headers")]
async fn http_headers(
    query: QueryPairs,
    gateway: Gateway,
    timeouts: web::Data<ToolTimeouts>,
) -> HttpResponse {
    let Some(url) = param(&query, "url") else {
        return missing("url");
    };

    match run_toolbox_tool(
        timeouts.http,
        infallible(gateway.http_headers(url)),
        "HTTP header fetch",
    )
    .await
    {
        Ok(response) => HttpResponse::Ok().json(response),
        Err(error) => HttpResponse::Ok().json(HttpHeadersResponse {
            request_url: url.to_string(),
            error: Some(error),
            ..Default::default()
        }),
    }
}

/// Malformed JSON bodies get the same `{"error": ...}` shape as other 400s.
fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req: &HttpRequest| {
        let response = bad_request(format!("Invalid request payload: {err}"));
        error::InternalError::from_response(err, response).into()
    })
}

/// Shared state for the routes.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<dyn ToolboxGateway>,
    pub timeouts: ToolTimeouts,
}

impl AppState {
    pub fn configure(&self, cfg: &mut web::ServiceConfig) {
        cfg.app_data(web::Data::from(Arc::clone(&self.gateway)))
            .app_data(web::Data::new(self.timeouts))
            .app_data(json_config())
            .service(health)
            .service(dns_lookup)
            .service(ip_info)
            .service(whois_lookup)
            .service(ssl_check)
            .service(clean_url)
            .service(resolve_redirect)
            .service(generate_utm)
            .service(stack_analyzer)
            .service(http_headers);
    }
}

#[cfg(test)]
#[path = "test_mocks.rs"]
#[allow(clippy::unwrap_used, clippy::panic)]
pub(crate) mod test_mocks;

#[cfg(test)]
#[path = "handlers_tests.rs"]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests;
