use std::fmt;
use std::time::Duration;

use serde::Serialize;

/// Deadline applied when a config carries no timeout (or a zero one).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5000);

/// Transport override applied together with a proxy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TlsOverride {
    #[default]
    Verify,
    AcceptInvalidCerts,
}

/// Options for one head-info fetch. Built once, then handed to a fetcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchConfig {
    pub url: String,
    pub timeout: Option<Duration>,
    pub proxy_address: Option<String>,
    pub tls_override: TlsOverride,
    /// Only title and description are extracted when set.
    pub only_basic_info: bool,
}

impl FetchConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout: None,
            proxy_address: None,
            tls_override: TlsOverride::Verify,
            only_basic_info: false,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_proxy(mut self, address: impl Into<String>) -> Self {
        self.proxy_address = Some(address.into());
        self
    }

    pub fn with_tls_override(mut self, tls_override: TlsOverride) -> Self {
        self.tls_override = tls_override;
        self
    }

    pub fn with_only_basic_info(mut self, only_basic_info: bool) -> Self {
        self.only_basic_info = only_basic_info;
        self
    }

    pub fn effective_timeout(&self) -> Duration {
        match self.timeout {
            Some(timeout) if !timeout.is_zero() => timeout,
            _ => DEFAULT_TIMEOUT,
        }
    }

    /// The proxy to route through, ignoring blank addresses.
    pub fn proxy(&self) -> Option<&str> {
        self.proxy_address
            .as_deref()
            .map(str::trim)
            .filter(|address| !address.is_empty())
    }
}

/// Metadata found in a page's head. Absent fields are empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteInfo {
    pub title: String,
    pub description: String,
    pub keywords: String,
    /// As written in the page; resolving it against the site URL is up to the caller.
    pub icon_url: String,
    #[serde(rename = "requestHtmlCost", serialize_with = "serialize_cost")]
    pub elapsed: Duration,
}

impl SiteInfo {
    /// Human readable network time, e.g. `12.345ms`.
    pub fn request_cost(&self) -> String {
        format!("{:?}", self.elapsed)
    }
}

fn serialize_cost<S: serde::Serializer>(elapsed: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(&format_args!("{elapsed:?}"))
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct FetchError {
    pub kind: FailureKind,
    pub message: String,
}

impl FetchError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn outcome(&self) -> Outcome {
        match self.kind {
            FailureKind::HttpStatus(code) => Outcome::BadStatus(code),
            _ => Outcome::Failure,
        }
    }
}

/// How a failed fetch is reported outward: a site that answered with a
/// non-200 status is told apart from everything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    BadStatus(u16),
    Failure,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidRequest,
    Network,
    HttpStatus(u16),
    Decode,
    Parse,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidRequest => write!(f, "invalid request"),
            FailureKind::Network => write!(f, "network error"),
            FailureKind::HttpStatus(code) => write!(f, "website responded with status {code}"),
            FailureKind::Decode => write!(f, "decode error"),
            FailureKind::Parse => write!(f, "parse error"),
        }
    }
}
