use std::{io::Write, str::FromStr};

use flate2::write::{GzEncoder, ZlibEncoder};

use crate::error::Error;

/// Payload compression applied before chunking.
///
/// Receivers detect the format from the payload's magic bytes, so nothing else on the wire
/// changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    #[default]
    None,
    Gzip,
    Zlib,
}

impl Compression {
    pub fn compress(self, payload: Vec<u8>) -> Result<Vec<u8>, Error> {
        let level = flate2::Compression::default();
        let compressed = match self {
            Compression::None => return Ok(payload),
            Compression::Gzip => {
                let mut encoder = GzEncoder::new(Vec::new(), level);
                encoder.write_all(&payload).map_err(Error::Encoding)?;
                encoder.finish()
            }
            Compression::Zlib => {
                let mut encoder = ZlibEncoder::new(Vec::new(), level);
                encoder.write_all(&payload).map_err(Error::Encoding)?;
                encoder.finish()
            }
        };
        compressed.map_err(Error::Encoding)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown compression `{0}`, expected none, gzip or zlib")]
pub struct UnknownCompression(pub String);

impl FromStr for Compression {
    type Err = UnknownCompression;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" | "" => Ok(Compression::None),
            "gzip" => Ok(Compression::Gzip),
            "zlib" => Ok(Compression::Zlib),
            _ => Err(UnknownCompression(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use flate2::read::{GzDecoder, ZlibDecoder};

    use super::*;

    const PAYLOAD: &[u8] = br#"{"version":"1.1","short_message":"compress me"}"#;

    #[test]
    fn none_is_passthrough() {
        let out = Compression::None.compress(PAYLOAD.to_vec()).unwrap();
        assert_eq!(out, PAYLOAD);
    }

    #[test]
    fn gzip() {
        let out = Compression::Gzip.compress(PAYLOAD.to_vec()).unwrap();
        assert_eq!(&out[..2], &[0x1f, 0x8b]);

        let mut read = Vec::new();
        GzDecoder::new(&out[..]).read_to_end(&mut read).unwrap();
        assert_eq!(read, PAYLOAD);
    }

    #[test]
    fn zlib() {
        let out = Compression::Zlib.compress(PAYLOAD.to_vec()).unwrap();
        assert_eq!(out[0], 0x78);

        let mut read = Vec::new();
        ZlibDecoder::new(&out[..]).read_to_end(&mut read).unwrap();
        assert_eq!(read, PAYLOAD);
    }

    #[test]
    fn parse() {
        assert_eq!("GZIP".parse::<Compression>(), Ok(Compression::Gzip));
        assert_eq!("zlib".parse::<Compression>(), Ok(Compression::Zlib));
        assert_eq!("none".parse::<Compression>(), Ok(Compression::None));
        assert_eq!(
            "lz4".parse::<Compression>().unwrap_err().to_string(),
            "unknown compression `lz4`, expected none, gzip or zlib"
        );
    }
}
