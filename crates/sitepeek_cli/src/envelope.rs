//! Maps between command-line input, the engine, and the JSON printed for
//! each URL.

use serde::Serialize;
use sitepeek_engine::{FetchError, Outcome, SiteInfo};
use url::Url;

pub const OK: u16 = 200;
pub const BAD_REQUEST: u16 = 400;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Envelope {
    pub url: String,
    pub code: u16,
    pub message: String,
    pub data: Option<SiteData>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteData {
    pub title: String,
    pub description: String,
    pub keywords: String,
    pub icon_url: String,
    pub host: String,
    pub request_html_cost: String,
}

impl Envelope {
    pub fn is_success(&self) -> bool {
        self.code == OK
    }

    fn failure(url: &str, message: impl Into<String>) -> Self {
        Self {
            url: url.to_string(),
            code: BAD_REQUEST,
            message: message.into(),
            data: None,
        }
    }

    pub fn invalid_url(url: &str, err: &InvalidUrl) -> Self {
        Self::failure(url, err.to_string())
    }

    pub fn from_result(site: &Url, result: Result<SiteInfo, FetchError>) -> Self {
        match result {
            Ok(info) => Self {
                url: site.to_string(),
                code: OK,
                message: "ok".to_string(),
                data: Some(SiteData {
                    icon_url: resolve_icon(site, &info.icon_url),
                    host: site.host_str().unwrap_or_default().to_string(),
                    request_html_cost: info.request_cost(),
                    title: info.title,
                    description: info.description,
                    keywords: info.keywords,
                }),
            },
            Err(err) => match err.outcome() {
                Outcome::BadStatus(code) => Self::failure(
                    site.as_str(),
                    format!("website request error with {code} response code"),
                ),
                Outcome::Failure => Self::failure(site.as_str(), err.to_string()),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidUrl {
    NotAbsolute,
    Scheme(String),
    Malformed(String),
}

impl std::fmt::Display for InvalidUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvalidUrl::NotAbsolute => {
                write!(f, "URL must be absolute, e.g. http(s)://example.com/**")
            }
            InvalidUrl::Scheme(scheme) => {
                write!(f, "unsupported scheme {scheme:?}, expected http or https")
            }
            InvalidUrl::Malformed(reason) => write!(f, "malformed URL: {reason}"),
        }
    }
}

/// Accepts only absolute http(s) URLs; the engine assumes that much.
pub fn validate_url(raw: &str) -> Result<Url, InvalidUrl> {
    let url = Url::parse(raw.trim()).map_err(|err| match err {
        url::ParseError::RelativeUrlWithoutBase => InvalidUrl::NotAbsolute,
        other => InvalidUrl::Malformed(other.to_string()),
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(InvalidUrl::Scheme(other.to_string())),
    }
}

/// Resolves the icon reference against the page URL. A missing icon stays
/// empty and an unresolvable one is returned as written.
pub fn resolve_icon(site: &Url, icon: &str) -> String {
    if icon.is_empty() {
        return String::new();
    }
    site.join(icon)
        .map(String::from)
        .unwrap_or_else(|_| icon.to_string())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use pretty_assertions::assert_eq;
    use sitepeek_engine::{FailureKind, FetchError};

    use super::*;

    fn site() -> Url {
        Url::parse("https://example.com/blog/post").unwrap()
    }

    #[test]
    fn validation_accepts_http_and_https_only() {
        assert!(validate_url("http://example.com").is_ok());
        assert!(validate_url(" https://example.com/a?b=c ").is_ok());
        assert_eq!(validate_url("example.com/path"), Err(InvalidUrl::NotAbsolute));
        assert_eq!(
            validate_url("ftp://example.com"),
            Err(InvalidUrl::Scheme("ftp".to_string()))
        );
        assert!(matches!(validate_url("http://[::1"), Err(InvalidUrl::Malformed(_))));
    }

    #[test]
    fn icons_resolve_against_the_page() {
        assert_eq!(resolve_icon(&site(), "/favicon.ico"), "https://example.com/favicon.ico");
        assert_eq!(resolve_icon(&site(), "icon.png"), "https://example.com/blog/icon.png");
        assert_eq!(
            resolve_icon(&site(), "//cdn.example.net/i.svg"),
            "https://cdn.example.net/i.svg"
        );
        assert_eq!(resolve_icon(&site(), ""), "");
    }

    #[test]
    fn success_envelope_carries_site_data() {
        let info = SiteInfo {
            title: "T".into(),
            description: "D".into(),
            keywords: "K".into(),
            icon_url: "/f.ico".into(),
            elapsed: Duration::from_millis(7),
        };
        let envelope = Envelope::from_result(&site(), Ok(info));
        assert!(envelope.is_success());
        assert_eq!(
            envelope.data,
            Some(SiteData {
                title: "T".into(),
                description: "D".into(),
                keywords: "K".into(),
                icon_url: "https://example.com/f.ico".into(),
                host: "example.com".into(),
                request_html_cost: "7ms".into(),
            })
        );

        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["data"]["iconUrl"], "https://example.com/f.ico");
        assert_eq!(json["data"]["requestHtmlCost"], "7ms");
    }

    #[test]
    fn bad_status_and_failures_are_distinguished_in_the_message() {
        let bad_status = FetchError {
            kind: FailureKind::HttpStatus(503),
            message: "503 Service Unavailable".into(),
        };
        let envelope = Envelope::from_result(&site(), Err(bad_status));
        assert_eq!(envelope.code, BAD_REQUEST);
        assert_eq!(envelope.message, "website request error with 503 response code");
        assert_eq!(envelope.data, None);

        let network = FetchError {
            kind: FailureKind::Network,
            message: "connection refused".into(),
        };
        let envelope = Envelope::from_result(&site(), Err(network));
        assert_eq!(envelope.code, BAD_REQUEST);
        assert_eq!(envelope.message, "network error: connection refused");
    }
}
