//! Network toolbox utilities for netkit
//!
//! 提供各种网络工具：WHOIS（多服务器回退）、SSL 证书探测与校验、DNS 查询、
//! IP/GeoIP 查询、URL 追踪参数清理、UTM 链接生成、重定向解析、HTTP 头查看、技术栈识别。

mod error;
mod services;
mod types;

pub use error::{ToolboxError, ToolboxResult, WhoisFailure, WhoisLookupError};
pub use services::{
    build_resolver, build_system_resolver, CertificateProbe, CertificateValidator, DateParser,
    FetchedPage, GeoIpStore, MaxMindGeoIpStore, PageFetcher, RedirectResolver, SignatureMatcher,
    TcpWhoisTransport, TechnologyMatcher, ToolboxService, TrackingRules, WhoisClient,
    WhoisServerRegistry, WhoisTextParser, WhoisTransport, DEFAULT_TLS_PORT,
};
pub use types::{
    CertificateRecord, ChainEntry, CleanUrlResponse, DetectedTechnology, DnsLookupResponse,
    DnsRecord, DnsRecordKind, GeneratedUtmLink, GeoDetails, HttpHeadersResponse, IpInfoResponse,
    RemovedParam, ResolveRedirectResponse, StackAnalyzerResponse, UtmCommonParams,
    UtmGeneratorRequest, UtmGeneratorResponse, UtmOptions, UtmParameterSet, WhoisRecord,
};
