use flate2::write::{DeflateDecoder, GzDecoder, ZlibDecoder};
use std::io::{Result, Write};

/// Decodes `data` sent with `Content-Encoding: encoding`. `None` for
/// encodings that are not compressions this crate knows (`identity`, `br`, ...).
pub fn try_decompress(encoding: &str, data: &[u8]) -> Result<Option<Vec<u8>>> {
    Ok(match encoding.trim().to_ascii_lowercase().as_str() {
        "gzip" | "x-gzip" => {
            let mut decoder = GzDecoder::new(Vec::new());
            decoder.write_all(data)?;
            Some(decoder.finish()?)
        }
        // servers disagree on whether deflate carries the zlib wrapper
        "deflate" => match zlib(data) {
            Ok(decoded) => Some(decoded),
            Err(_) => {
                let mut decoder = DeflateDecoder::new(Vec::new());
                decoder.write_all(data)?;
                Some(decoder.finish()?)
            }
        },
        "zlib" => Some(zlib(data)?),
        _ => None,
    })
}

fn zlib(data: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(Vec::new());
    decoder.write_all(data)?;
    decoder.finish()
}

#[cfg(test)]
mod tests {
    use flate2::write::{DeflateEncoder, GzEncoder, ZlibEncoder};
    use flate2::Compression;

    use super::*;

    const TEXT: &[u8] = b"the quick brown fox jumps over the lazy dog";

    #[test]
    fn gzip() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(TEXT).unwrap();
        let data = encoder.finish().unwrap();
        assert_eq!(try_decompress("GZIP", &data).unwrap().as_deref(), Some(TEXT));
    }

    #[test]
    fn deflate_with_and_without_zlib_wrapper() {
        let mut wrapped = ZlibEncoder::new(Vec::new(), Compression::default());
        wrapped.write_all(TEXT).unwrap();
        let wrapped = wrapped.finish().unwrap();
        assert_eq!(try_decompress("deflate", &wrapped).unwrap().as_deref(), Some(TEXT));

        let mut raw = DeflateEncoder::new(Vec::new(), Compression::default());
        raw.write_all(TEXT).unwrap();
        let raw = raw.finish().unwrap();
        assert_eq!(try_decompress("deflate", &raw).unwrap().as_deref(), Some(TEXT));
    }

    #[test]
    fn unknown_encodings_are_left_alone() {
        assert_eq!(try_decompress("identity", TEXT).unwrap(), None);
        assert_eq!(try_decompress("br", TEXT).unwrap(), None);
    }

    #[test]
    fn corrupt_gzip_is_an_error() {
        assert!(try_decompress("gzip", b"definitely not gzip").is_err());
    }
}
