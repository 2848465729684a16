//! Content types and value encodings
//!
//! A content type decides how the human-readable value of an item maps to the
//! raw value stored in the vault, which file extension it exports to, and how
//! the exported file is laid out on disk.

use std::fmt;
use std::io::{Read, Write};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use clap::ValueEnum;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};

use crate::error::{Result, VaultEditError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ContentType {
    #[default]
    None,
    Text,
    Csv,
    Tsv,
    Xml,
    Json,
    JsonGzBase64,
    Base64,
    Pkcs12,
    Certificate,
    Jwk,
}

/// Layout of an exported file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileEncoding {
    /// The human-readable value as UTF-8 text
    HumanText,
    /// The raw vault value as UTF-8 text
    RawText,
    /// The raw vault value is base64; the file holds the decoded bytes
    RawBytes,
}

impl ContentType {
    pub const ALL: [ContentType; 11] = [
        ContentType::None,
        ContentType::Text,
        ContentType::Csv,
        ContentType::Tsv,
        ContentType::Xml,
        ContentType::Json,
        ContentType::JsonGzBase64,
        ContentType::Base64,
        ContentType::Pkcs12,
        ContentType::Certificate,
        ContentType::Jwk,
    ];

    /// MIME string stored in the vault's `contentType` attribute
    pub fn mime(&self) -> Option<&'static str> {
        match self {
            ContentType::None => None,
            ContentType::Text => Some("text/plain"),
            ContentType::Csv => Some("text/csv"),
            ContentType::Tsv => Some("text/tab-separated-values"),
            ContentType::Xml => Some("application/xml"),
            ContentType::Json => Some("application/json"),
            ContentType::JsonGzBase64 => Some("application/x-json-gzb64"),
            ContentType::Base64 => Some("application/x-base64"),
            ContentType::Pkcs12 => Some("application/x-pkcs12"),
            ContentType::Certificate => Some("application/pkix-cert"),
            ContentType::Jwk => Some("application/jwk+json"),
        }
    }

    /// Parse a MIME string; unknown and empty values map to `None`
    pub fn parse(mime: Option<&str>) -> Self {
        let Some(mime) = mime.map(str::trim).filter(|m| !m.is_empty()) else {
            return ContentType::None;
        };
        // Parameters such as "; charset=utf-8" do not affect the encoding
        let essence = mime.split(';').next().unwrap_or(mime).trim();

        Self::ALL
            .into_iter()
            .find(|ct| ct.mime().is_some_and(|m| m.eq_ignore_ascii_case(essence)))
            .unwrap_or_else(|| {
                tracing::debug!("unrecognized content type '{}', treating as none", mime);
                ContentType::None
            })
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ContentType::None | ContentType::Text => ".txt",
            ContentType::Csv => ".csv",
            ContentType::Tsv => ".tsv",
            ContentType::Xml => ".xml",
            ContentType::Json => ".json",
            ContentType::JsonGzBase64 => ".json.gz",
            ContentType::Base64 => ".b64",
            ContentType::Pkcs12 => ".pfx",
            ContentType::Certificate => ".cer",
            ContentType::Jwk => ".jwk",
        }
    }

    /// Content type for a file name, matching the longest known extension
    pub fn from_extension(file_name: &str) -> Option<Self> {
        let lower = file_name.to_ascii_lowercase();
        Self::ALL
            .into_iter()
            // `.txt` belongs to Text; None shares it but is never inferred
            .filter(|ct| *ct != ContentType::None)
            .filter(|ct| lower.ends_with(ct.extension()))
            .max_by_key(|ct| ct.extension().len())
    }

    pub fn is_certificate(&self) -> bool {
        matches!(self, ContentType::Pkcs12 | ContentType::Certificate)
    }

    pub fn file_encoding(&self) -> FileEncoding {
        match self {
            ContentType::JsonGzBase64 | ContentType::Pkcs12 | ContentType::Certificate => {
                FileEncoding::RawBytes
            }
            ContentType::Base64 => FileEncoding::RawText,
            _ => FileEncoding::HumanText,
        }
    }

    /// Encode a human-readable value into the raw vault value
    pub fn to_raw_value(&self, value: &str) -> String {
        match self {
            ContentType::JsonGzBase64 => match gzip(value.as_bytes()) {
                Ok(compressed) => STANDARD.encode(compressed),
                Err(e) => {
                    tracing::warn!("gzip compression failed, storing value uncompressed: {}", e);
                    value.to_string()
                }
            },
            ContentType::Base64 => STANDARD.encode(value.as_bytes()),
            ContentType::Jwk => match serde_json::from_str::<serde_json::Value>(value) {
                Ok(json) => json.to_string(),
                Err(_) => value.to_string(),
            },
            _ => value.to_string(),
        }
    }

    /// Decode a raw vault value into its human-readable form
    pub fn from_raw_value(&self, raw: &str) -> Result<String> {
        match self {
            ContentType::JsonGzBase64 => {
                let compressed = STANDARD.decode(raw.trim())?;
                let mut decoder = GzDecoder::new(compressed.as_slice());
                let mut text = String::new();
                decoder
                    .read_to_string(&mut text)
                    .map_err(|e| VaultEditError::encoding(format!("invalid gzip payload: {e}")))?;
                Ok(text)
            }
            ContentType::Base64 => {
                let bytes = STANDARD.decode(raw.trim())?;
                String::from_utf8(bytes).map_err(|_| {
                    VaultEditError::encoding("base64 payload is not valid UTF-8 text")
                })
            }
            ContentType::Jwk => match serde_json::from_str::<serde_json::Value>(raw) {
                Ok(json) => Ok(serde_json::to_string_pretty(&json)?),
                Err(_) => Ok(raw.to_string()),
            },
            _ => Ok(raw.to_string()),
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime().unwrap_or("(none)"))
    }
}

fn gzip(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}
