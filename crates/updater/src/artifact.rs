use std::io::{self, Read};

use sha2::{Digest, Sha256};

use crate::config::MAX_ARTIFACT_BYTES;
use crate::error::{Result, UpdaterError};
use crate::manifest::is_lower_hex_digest;

/// Streaming SHA-256 check of a downloaded artefact.
///
/// The stream is hashed incrementally and read at most `limit + 1` bytes
/// deep, so memory use does not depend on the artefact size and an oversized
/// stream is abandoned as soon as it crosses the limit.
#[derive(Debug, Clone, Copy)]
pub struct ArtifactIntegrityChecker {
    limit: u64,
}

impl Default for ArtifactIntegrityChecker {
    fn default() -> Self {
        Self {
            limit: MAX_ARTIFACT_BYTES,
        }
    }
}

impl ArtifactIntegrityChecker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a custom size ceiling instead of [`MAX_ARTIFACT_BYTES`].
    pub fn with_limit(limit: u64) -> Self {
        Self { limit }
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// Hash `reader` to its end and compare with `expected_hex`.
    ///
    /// `expected_hex` is trimmed and lowercased before use and must then be 64
    /// hex characters. Read failures surface as [`UpdaterError::StreamError`],
    /// never as a digest mismatch.
    pub fn verify<R: Read>(&self, reader: R, expected_hex: &str) -> Result<()> {
        let expected = expected_hex.trim().to_ascii_lowercase();
        if !is_lower_hex_digest(&expected) {
            return Err(UpdaterError::HashFormatError("expected artifact digest"));
        }

        let mut limited = reader.take(self.limit.saturating_add(1));
        let mut hasher = Sha256::new();
        let read = io::copy(&mut limited, &mut hasher).map_err(UpdaterError::StreamError)?;
        tracing::trace!(bytes = read, "artifact stream hashed");

        if read > self.limit {
            return Err(UpdaterError::ArtifactTooLarge { limit: self.limit });
        }

        let actual = hex::encode(hasher.finalize());
        if actual != expected {
            return Err(UpdaterError::IntegrityMismatch { expected, actual });
        }
        Ok(())
    }
}

/// Verify `reader` against `expected_hex` with the default 1 GiB ceiling.
pub fn verify_artifact_sha256<R: Read>(reader: R, expected_hex: &str) -> Result<()> {
    ArtifactIntegrityChecker::default().verify(reader, expected_hex)
}
