use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::{Buf, BytesMut};
use futures_util::StreamExt;
use reqwest::header::{
    HeaderMap, HeaderValue, ACCEPT, ACCEPT_ENCODING, ACCEPT_LANGUAGE, CONNECTION, CONTENT_ENCODING,
    CONTENT_TYPE, USER_AGENT,
};
use reqwest::StatusCode;
use sitepeek_logging::{peek_debug, peek_warn};

use crate::decode::{select_decoder, ContentEncoding};
use crate::extract::{find_head, Extractor, HeadExtractor};
use crate::parse::{HtmlParser, MarkupParser};
use crate::{DocumentTree, FailureKind, FetchConfig, FetchError, SiteInfo, TlsOverride};

pub const ACCEPT_VALUE: &str = "text/html,application/xhtml+xml,application/xml;q=0.9";
pub const ACCEPT_LANGUAGE_VALUE: &str = "zh-CN,zh;q=0.9,en-CN;q=0.8,en;q=0.7,fr-FR;q=0.6,fr;q=0.5";
pub const ACCEPT_ENCODING_VALUE: &str = "gzip, deflate, br";
pub const USER_AGENT_VALUE: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36";

/// A successfully fetched and parsed page.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub status: StatusCode,
    pub tree: DocumentTree,
    /// Dispatch until response headers arrived.
    pub elapsed: Duration,
}

#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, config: &FetchConfig) -> Result<FetchedPage, FetchError>;

    /// Fetches the page and pulls head metadata out of it. A page without a
    /// `<head>` gives an all-empty record, not an error.
    async fn site_info(&self, config: &FetchConfig) -> Result<SiteInfo, FetchError> {
        let page = self.fetch(config).await?;
        let extractor = HeadExtractor::new(config.only_basic_info);
        let mut info = find_head(&page.tree)
            .map(|head| extractor.extract(head))
            .unwrap_or_default();
        info.elapsed = page.elapsed;
        Ok(info)
    }
}

/// Fetches pages with reqwest. A fresh client is built per call so proxy and
/// timeout settings never leak between requests.
#[derive(Clone)]
pub struct ReqwestFetcher {
    parser: Arc<dyn MarkupParser>,
}

impl ReqwestFetcher {
    pub fn new() -> Self {
        Self::with_parser(Arc::new(HtmlParser))
    }

    pub fn with_parser(parser: Arc<dyn MarkupParser>) -> Self {
        Self { parser }
    }

    fn build_client(&self, config: &FetchConfig) -> Result<reqwest::Client, FetchError> {
        let builder = reqwest::Client::builder()
            .default_headers(default_headers())
            .timeout(config.effective_timeout());

        let builder = match config.proxy() {
            Some(address) => {
                let proxy = reqwest::Proxy::all(address).map_err(|err| {
                    FetchError::new(FailureKind::InvalidRequest, format!("invalid proxy address {address}: {err}"))
                })?;
                let builder = builder.proxy(proxy);
                match config.tls_override {
                    TlsOverride::Verify => builder,
                    TlsOverride::AcceptInvalidCerts => builder.danger_accept_invalid_certs(true),
                }
            }
            // Never pick up HTTP_PROXY and friends from the environment.
            None => builder.no_proxy(),
        };

        builder
            .build()
            .map_err(|err| FetchError::new(FailureKind::InvalidRequest, err.to_string()))
    }
}

impl Default for ReqwestFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Fetcher for ReqwestFetcher {
    async fn fetch(&self, config: &FetchConfig) -> Result<FetchedPage, FetchError> {
        let url = reqwest::Url::parse(&config.url)
            .map_err(|err| FetchError::new(FailureKind::InvalidRequest, format!("{}: {err}", config.url)))?;
        let client = self.build_client(config)?;

        peek_debug!(
            "GET {} timeout={:?} proxy={}",
            url,
            config.effective_timeout(),
            config.proxy().is_some()
        );

        let started = Instant::now();
        let response = client.get(url.clone()).send().await.map_err(|err| {
            let err = map_reqwest_error(err);
            peek_warn!("request to {} failed: {}", url, err);
            err
        })?;
        let elapsed = started.elapsed();

        let status = response.status();
        let encoding = response
            .headers()
            .get(CONTENT_ENCODING)
            .and_then(|value| value.to_str().ok())
            .map(ContentEncoding::from_header)
            .unwrap_or(ContentEncoding::Identity);
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());
        peek_debug!(
            "{} answered {} encoding={} after {:?}",
            url,
            status,
            encoding.as_str(),
            elapsed
        );

        if status != StatusCode::OK {
            peek_warn!("{} answered with status {}", url, status);
            // Dropping the response here releases the connection unread.
            return Err(FetchError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        let mut body = BytesMut::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|err| {
                let err = map_reqwest_error(err);
                peek_warn!("reading body of {} failed: {}", url, err);
                err
            })?;
            body.extend_from_slice(&chunk);
        }

        let body = body.freeze();
        let mut reader = select_decoder(encoding, body.reader()).map_err(|err| {
            peek_warn!("{}: {}", url, err);
            FetchError::from(err)
        })?;
        let tree = self
            .parser
            .parse(&mut reader, content_type.as_deref())
            .map_err(|err| {
                peek_warn!("{}: {}", url, err);
                FetchError::from(err)
            })?;

        Ok(FetchedPage {
            status,
            tree,
            elapsed,
        })
    }
}

fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_VALUE));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(ACCEPT_LANGUAGE_VALUE));
    headers.insert(ACCEPT_ENCODING, HeaderValue::from_static(ACCEPT_ENCODING_VALUE));
    headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
    headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
    headers
}

fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    if err.is_builder() {
        return FetchError::new(FailureKind::InvalidRequest, err.to_string());
    }
    let cause = if err.is_timeout() {
        format!("timed out: {err}")
    } else {
        err.to_string()
    };
    FetchError::new(FailureKind::Network, cause)
}

impl From<crate::DecodeError> for FetchError {
    fn from(err: crate::DecodeError) -> Self {
        FetchError::new(FailureKind::Decode, err.to_string())
    }
}

impl From<crate::ParseError> for FetchError {
    fn from(err: crate::ParseError) -> Self {
        FetchError::new(FailureKind::Parse, err.to_string())
    }
}
