use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Content-addressed locators
// ---------------------------------------------------------------------------

/// Hash family of a content-addressed locator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    /// IPFS content identifier, resolved through an HTTP gateway.
    Ipfs,
    /// Hex SHA-256 digest, resolved from a local content store.
    Sha256,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Ipfs => "ipfs",
            Scheme::Sha256 => "sha256",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed `scheme://hash[?label=...]` locator.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentUri {
    pub scheme: Scheme,
    pub hash: String,
    /// Human-readable suffix, e.g. `spike_time.npy`.  Not part of the identity
    /// of the content.
    pub label: Option<String>,
}

impl ContentUri {
    pub fn new(scheme: Scheme, hash: impl Into<String>) -> Self {
        Self {
            scheme,
            hash: hash.into(),
            label: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// The locator without its label.
    pub fn base(&self) -> String {
        format!("{}://{}", self.scheme, self.hash)
    }

    /// Check that the hash is well-formed for its scheme: 64 lowercase hex
    /// digits for `sha256`, ASCII alphanumerics for `ipfs`.  Stores and
    /// caches build paths from the hash, so anything else is refused.
    pub fn validate(&self) -> Result<()> {
        if hash_is_valid(self.scheme, &self.hash) {
            Ok(())
        } else {
            Err(Error::InvalidUri {
                uri: self.to_string(),
                reason: "invalid hash",
            })
        }
    }
}

fn hash_is_valid(scheme: Scheme, hash: &str) -> bool {
    match scheme {
        Scheme::Sha256 => {
            hash.len() == 64 && hash.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
        }
        Scheme::Ipfs => !hash.is_empty() && hash.bytes().all(|b| b.is_ascii_alphanumeric()),
    }
}

impl FromStr for ContentUri {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = |reason| Error::InvalidUri {
            uri: s.to_string(),
            reason,
        };

        let (scheme, rest) = s.split_once("://").ok_or_else(|| invalid("missing '://'"))?;
        let scheme = match scheme {
            "ipfs" => Scheme::Ipfs,
            "sha256" => Scheme::Sha256,
            _ => return Err(invalid("unknown scheme")),
        };

        let (hash, query) = match rest.split_once('?') {
            Some((h, q)) => (h, Some(q)),
            None => (rest, None),
        };
        let hash = hash.trim_end_matches('/');
        if hash.is_empty() {
            return Err(invalid("empty hash"));
        }
        if !hash_is_valid(scheme, hash) {
            return Err(invalid("invalid hash"));
        }

        let label = query.and_then(|q| {
            q.split('&')
                .filter_map(|pair| pair.split_once('='))
                .find(|(k, _)| *k == "label")
                .map(|(_, v)| percent_decode(v))
        });

        Ok(ContentUri {
            scheme,
            hash: hash.to_string(),
            label,
        })
    }
}

impl fmt::Display for ContentUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme, self.hash)?;
        if let Some(label) = &self.label {
            write!(f, "?label={}", percent_encode(label))?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Percent encoding (query values)
// ---------------------------------------------------------------------------

/// Percent-encode everything except RFC 3986 unreserved characters and `/`.
pub fn percent_encode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b'/' => {
                out.push(b as char)
            }
            _ => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}

/// Inverse of [`percent_encode`].  Malformed escapes are kept verbatim and
/// `+` decodes to a space.
pub fn percent_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' if i + 2 < bytes.len() => {
                let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
                match hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                    Some(v) => {
                        out.push(v);
                        i += 3;
                        continue;
                    }
                    None => out.push(b'%'),
                }
            }
            b'+' => out.push(b' '),
            other => out.push(other),
        }
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}
