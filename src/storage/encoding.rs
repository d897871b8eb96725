//! Text encodings accepted by the storage layer

use std::io;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

/// Encoding of the text crossing the storage boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Encoding {
    /// Plain UTF-8 text (primary)
    Utf8,
    /// Base64 text standing for raw bytes (fallback)
    Base64,
}

impl Encoding {
    /// Turn caller text into the bytes that land on disk
    pub fn to_bytes(self, content: &str) -> io::Result<Vec<u8>> {
        match self {
            Encoding::Utf8 => Ok(content.as_bytes().to_vec()),
            Encoding::Base64 => STANDARD
                .decode(content)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e)),
        }
    }

    /// Turn on-disk bytes into text in this encoding
    pub fn from_bytes(self, bytes: Vec<u8>) -> io::Result<String> {
        match self {
            Encoding::Utf8 => {
                String::from_utf8(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
            }
            Encoding::Base64 => Ok(STANDARD.encode(bytes)),
        }
    }
}

/// Encode text for a fallback-encoded write
pub fn encode_fallback(text: &str) -> String {
    STANDARD.encode(text.as_bytes())
}

/// Decode fallback-read text back into a string
///
/// Invalid UTF-8 sequences in the payload are replaced rather than rejected,
/// so a file with a few corrupt bytes is still readable.
pub fn decode_fallback(encoded: &str) -> io::Result<String> {
    let bytes = STANDARD
        .decode(encoded.trim())
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
