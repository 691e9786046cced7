use std::io::{self, Read};

use encoding_rs::{Encoding, UTF_8};
use scraper::Html;
use sitepeek_logging::peek_debug;

/// How far into the body a `<meta charset>` declaration is looked for.
const META_PRESCAN_LIMIT: usize = 1024;

/// A parsed page. Nodes live in an arena (`ego_tree`) and are addressed by id,
/// so walking them never recurses.
#[derive(Debug, Clone)]
pub struct DocumentTree {
    html: Html,
    encoding: &'static Encoding,
}

impl DocumentTree {
    /// Wraps an already parsed document, assumed to have been UTF-8.
    pub fn from_html(html: Html) -> Self {
        Self { html, encoding: UTF_8 }
    }

    pub fn html(&self) -> &Html {
        &self.html
    }

    pub fn encoding_label(&self) -> &'static str {
        self.encoding.name()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("failed to read document body: {0}")]
    Read(#[from] io::Error),
}

pub trait MarkupParser: Send + Sync {
    /// Consumes `stream` into a tree. Only a failing stream aborts parsing;
    /// malformed markup still yields a best-effort tree.
    fn parse(&self, stream: &mut dyn Read, content_type: Option<&str>) -> Result<DocumentTree, ParseError>;
}

/// Browser-compatible parsing via html5ever (through `scraper`).
#[derive(Debug, Default, Clone, Copy)]
pub struct HtmlParser;

impl MarkupParser for HtmlParser {
    fn parse(&self, stream: &mut dyn Read, content_type: Option<&str>) -> Result<DocumentTree, ParseError> {
        let mut bytes = Vec::new();
        stream.read_to_end(&mut bytes)?;
        Ok(parse_bytes(&bytes, content_type))
    }
}

/// Parses an in-memory document.
pub fn parse_bytes(bytes: &[u8], content_type: Option<&str>) -> DocumentTree {
    let encoding = detect_encoding(bytes, content_type);
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        peek_debug!("replaced malformed {} sequences in document", encoding.name());
    }
    DocumentTree {
        html: Html::parse_document(&text),
        encoding,
    }
}

/// Picks the document encoding: BOM -> `<meta charset>` -> Content-Type
/// charset -> UTF-8. Nothing is guessed; undeclared bytes that are not valid
/// UTF-8 get replacement characters instead of re-decoding the whole page.
pub fn detect_encoding(bytes: &[u8], content_type: Option<&str>) -> &'static Encoding {
    if let Some((encoding, _)) = Encoding::for_bom(bytes) {
        return encoding;
    }

    meta_charset(&bytes[..bytes.len().min(META_PRESCAN_LIMIT)])
        .and_then(|label| Encoding::for_label(label.as_bytes()))
        .or_else(|| {
            content_type
                .and_then(charset_from_content_type)
                .and_then(|label| Encoding::for_label(label.as_bytes()))
        })
        .unwrap_or(UTF_8)
}

fn charset_from_content_type(content_type: &str) -> Option<String> {
    content_type.split(';').skip(1).find_map(|part| {
        let (key, value) = part.split_once('=')?;
        if !key.trim().eq_ignore_ascii_case("charset") {
            return None;
        }
        let value = value.trim().trim_matches(['"', '\'']);
        (!value.is_empty()).then(|| value.to_string())
    })
}

/// Finds `charset=` inside the first `<meta ...>` tag that declares one,
/// covering both `<meta charset="x">` and the `http-equiv` content form.
fn meta_charset(head: &[u8]) -> Option<String> {
    let lower = head.to_ascii_lowercase();
    let mut rest = lower.as_slice();
    while let Some(start) = find(rest, b"<meta") {
        let tag = &rest[start..];
        let end = tag.iter().position(|&b| b == b'>').unwrap_or(tag.len());
        let tag = &tag[..end];
        if let Some(pos) = find(tag, b"charset=") {
            let value = &tag[pos + b"charset=".len()..];
            let value: Vec<u8> = value
                .iter()
                .copied()
                .skip_while(|b| *b == b'"' || *b == b'\'' || b.is_ascii_whitespace())
                .take_while(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b':' | b'.'))
                .collect();
            if !value.is_empty() {
                return String::from_utf8(value).ok();
            }
        }
        rest = &rest[start + end..];
    }
    None
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|window| window == needle)
}
