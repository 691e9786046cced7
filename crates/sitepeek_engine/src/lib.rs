//! Sitepeek engine: fetch a page, undo its transport compression, parse it,
//! and read title, description, keywords and icon from its `<head>`.
mod decode;
mod extract;
mod fetch;
mod parse;
mod types;

pub use decode::{select_decoder, ContentEncoding, DecodeError};
pub use extract::{find_head, Extractor, HeadExtractor};
pub use fetch::{
    FetchedPage, Fetcher, ReqwestFetcher, ACCEPT_ENCODING_VALUE, ACCEPT_LANGUAGE_VALUE,
    ACCEPT_VALUE, USER_AGENT_VALUE,
};
pub use parse::{detect_encoding, parse_bytes, DocumentTree, HtmlParser, MarkupParser, ParseError};
pub use types::{FailureKind, FetchConfig, FetchError, Outcome, SiteInfo, TlsOverride, DEFAULT_TIMEOUT};

/// One-shot helper: fetch `config.url` with the default fetcher and extract
/// its head metadata.
pub async fn get_site_head_info(config: &FetchConfig) -> Result<SiteInfo, FetchError> {
    ReqwestFetcher::new().site_info(config).await
}
