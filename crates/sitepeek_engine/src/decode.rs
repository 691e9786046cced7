use std::io::{self, BufRead, Read};

use flate2::bufread::{DeflateDecoder, GzDecoder};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
const BROTLI_BUFFER_SIZE: usize = 4096;

/// Transport compression declared by a `Content-Encoding` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentEncoding {
    Gzip,
    Deflate,
    Brotli,
    /// Anything else, including a missing header. The body is read as is.
    Identity,
}

impl ContentEncoding {
    /// Matches the header value literally; no sniffing and no normalization.
    pub fn from_header(value: &str) -> Self {
        match value {
            "gzip" => ContentEncoding::Gzip,
            "deflate" => ContentEncoding::Deflate,
            "br" => ContentEncoding::Brotli,
            _ => ContentEncoding::Identity,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ContentEncoding::Gzip => "gzip",
            ContentEncoding::Deflate => "deflate",
            ContentEncoding::Brotli => "br",
            ContentEncoding::Identity => "identity",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("body declared as {encoding} is not valid {encoding} framing")]
    BadFraming { encoding: &'static str },
    #[error("failed to read {encoding} body: {source}")]
    Io {
        encoding: &'static str,
        #[source]
        source: io::Error,
    },
}

/// Wraps `body` in the decompressor matching `encoding`.
///
/// Only gzip can fail here: its header is checked up front. Broken deflate or
/// brotli data, and bodies mislabelled as identity, show up later as read
/// errors.
pub fn select_decoder<'a, R>(encoding: ContentEncoding, body: R) -> Result<Box<dyn Read + 'a>, DecodeError>
where
    R: BufRead + 'a,
{
    match encoding {
        ContentEncoding::Gzip => {
            let mut body = body;
            check_gzip_magic(&mut body)?;
            Ok(Box::new(GzDecoder::new(body)))
        }
        ContentEncoding::Deflate => Ok(Box::new(DeflateDecoder::new(body))),
        ContentEncoding::Brotli => Ok(Box::new(brotli::Decompressor::new(body, BROTLI_BUFFER_SIZE))),
        ContentEncoding::Identity => Ok(Box::new(body)),
    }
}

fn check_gzip_magic<R: BufRead>(body: &mut R) -> Result<(), DecodeError> {
    let head = body.fill_buf().map_err(|source| DecodeError::Io {
        encoding: "gzip",
        source,
    })?;
    if head.len() < GZIP_MAGIC.len() || head[..GZIP_MAGIC.len()] != GZIP_MAGIC {
        return Err(DecodeError::BadFraming { encoding: "gzip" });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use flate2::write::{DeflateEncoder, GzEncoder};
    use flate2::Compression;

    use super::*;

    const PAGE: &[u8] = b"<html><head><title>T</title></head></html>";

    fn read_all(mut reader: Box<dyn Read + '_>) -> io::Result<Vec<u8>> {
        let mut out = Vec::new();
        reader.read_to_end(&mut out)?;
        Ok(out)
    }

    #[test]
    fn header_values_match_literally() {
        assert_eq!(ContentEncoding::from_header("gzip"), ContentEncoding::Gzip);
        assert_eq!(ContentEncoding::from_header("deflate"), ContentEncoding::Deflate);
        assert_eq!(ContentEncoding::from_header("br"), ContentEncoding::Brotli);
        for other in ["", "GZIP", " gzip", "x-gzip", "identity", "gzip, br", "zstd"] {
            assert_eq!(ContentEncoding::from_header(other), ContentEncoding::Identity, "{other:?}");
        }
    }

    #[test]
    fn unknown_encodings_pass_bytes_through_unchanged() {
        let raw: Vec<u8> = (0..=255u8).chain(PAGE.iter().copied()).collect();
        for header in ["", "compress", "zstd", "Gzip"] {
            let reader = select_decoder(ContentEncoding::from_header(header), raw.as_slice()).unwrap();
            assert_eq!(read_all(reader).unwrap(), raw, "{header:?}");
        }
    }

    #[test]
    fn gzip_body_is_inflated() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(PAGE).unwrap();
        let compressed = encoder.finish().unwrap();

        let reader = select_decoder(ContentEncoding::Gzip, compressed.as_slice()).unwrap();
        assert_eq!(read_all(reader).unwrap(), PAGE);
    }

    #[test]
    fn deflate_is_raw_deflate() {
        let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(PAGE).unwrap();
        let compressed = encoder.finish().unwrap();

        let reader = select_decoder(ContentEncoding::Deflate, compressed.as_slice()).unwrap();
        assert_eq!(read_all(reader).unwrap(), PAGE);
    }

    #[test]
    fn brotli_body_is_decompressed() {
        let mut compressed = Vec::new();
        {
            let mut writer = brotli::CompressorWriter::new(&mut compressed, 4096, 5, 22);
            writer.write_all(PAGE).unwrap();
        }

        let reader = select_decoder(ContentEncoding::Brotli, compressed.as_slice()).unwrap();
        assert_eq!(read_all(reader).unwrap(), PAGE);
    }

    #[test]
    fn plain_text_declared_as_gzip_is_a_decode_error() {
        let err = select_decoder(ContentEncoding::Gzip, PAGE).err().unwrap();
        assert!(matches!(err, DecodeError::BadFraming { encoding: "gzip" }));

        let err = select_decoder(ContentEncoding::Gzip, &b""[..]).err().unwrap();
        assert!(matches!(err, DecodeError::BadFraming { .. }));
    }

    #[test]
    fn broken_deflate_fails_on_read_not_on_construction() {
        let reader = select_decoder(ContentEncoding::Deflate, &b"not deflate at all"[..]).unwrap();
        assert!(read_all(reader).is_err());
    }
}
