//! 统一错误类型定义

use serde::Serialize;
use thiserror::Error;

/// Why a single WHOIS server attempt failed.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum WhoisFailure {
    #[error("dial failed: {0}")]
    Connect(String),

    #[error("write failed: {0}")]
    Write(String),

    #[error("read failed: {0}")]
    Read(String),

    #[error("empty response from server")]
    EmptyResponse,

    #[error("no response within {0}s")]
    DeadlineExceeded(u64),
}

/// A failed query against one WHOIS server.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error("whois lookup failed for {domain} via {server}: {cause}")]
pub struct WhoisLookupError {
    pub domain: String,
    pub server: String,
    pub cause: WhoisFailure,
}

/// 工具箱错误类型
#[derive(Error, Debug, Serialize)]
#[serde(tag = "code", content = "details")]
pub enum ToolboxError {
    /// 验证错误
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// 网络错误
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Every candidate WHOIS server failed; only the last attempt is kept.
    #[error(transparent)]
    AllServersFailed(WhoisLookupError),

    /// TLS handshake failed or the peer presented no usable certificate.
    #[error("SSL check failed for {domain}: {reason}")]
    ProbeFailure { domain: String, reason: String },
}

impl ToolboxError {
    pub(crate) fn probe_failure(domain: &str, reason: impl Into<String>) -> Self {
        Self::ProbeFailure {
            domain: domain.to_string(),
            reason: reason.into(),
        }
    }

    /// The message without the category prefix, for response bodies.
    pub fn detail(&self) -> String {
        match self {
            Self::ValidationError(msg) | Self::NetworkError(msg) => msg.clone(),
            other => other.to_string(),
        }
    }
}

/// 工具箱 Result 类型别名
pub type ToolboxResult<T> = std::result::Result<T, ToolboxError>;
