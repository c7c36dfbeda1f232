use std::fmt;

use bledrop_protocol::TAG_LEN;
use sha2::{Digest, Sha256};

use crate::config::DigestScope;
use crate::error::IntegrityError;

/// Computes SHA-256 of `data` and returns the hex-encoded digest.
pub fn checksum_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Appends the hex SHA-256 of `body` as a trailer.
///
/// This produces content that verifies under [`DigestScope::Body`]. No
/// trailer can satisfy [`DigestScope::FullContent`] this way, since the
/// digest would have to cover itself.
pub fn seal_body(body: &[u8]) -> Vec<u8> {
    let mut content = Vec::with_capacity(body.len() + TAG_LEN);
    content.extend_from_slice(body);
    content.extend_from_slice(checksum_bytes(body).as_bytes());
    content
}

/// Hex digest that matched a transfer's trailer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrityTag(String);

impl IntegrityTag {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IntegrityTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Checks reassembled content against its trailing hex digest.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntegrityVerifier {
    scope: DigestScope,
}

impl IntegrityVerifier {
    pub fn new(scope: DigestScope) -> Self {
        Self { scope }
    }

    pub fn scope(&self) -> DigestScope {
        self.scope
    }

    /// Verifies `content`, whose last [`TAG_LEN`] bytes are the trailer.
    pub fn verify(&self, content: &[u8]) -> Result<IntegrityTag, IntegrityError> {
        if content.is_empty() {
            return Err(IntegrityError::EmptyContent);
        }
        if content.len() < TAG_LEN {
            return Err(IntegrityError::MalformedTrailer { len: content.len() });
        }

        let (body, trailer) = content.split_at(content.len() - TAG_LEN);
        let computed = match self.scope {
            DigestScope::FullContent => checksum_bytes(content),
            DigestScope::Body => checksum_bytes(body),
        };

        // A trailer that is not valid UTF-8 can never equal a hex digest.
        let expected = String::from_utf8_lossy(trailer).into_owned();
        if computed != expected {
            return Err(IntegrityError::IntegrityMismatch { expected, computed });
        }

        Ok(IntegrityTag(computed))
    }
}
