use chrono::{DateTime, Utc};

use crate::version::ParseVersionError;

/// Convenient result alias for updater operations.
pub type Result<T> = std::result::Result<T, UpdaterError>;

/// Reasons a manifest or artefact is rejected.
///
/// Every variant is terminal: the caller must discard the manifest or
/// artefact that produced it. Variants carry enough context to classify the
/// failure but never the signature or key material.
#[derive(thiserror::Error, Debug)]
pub enum UpdaterError {
    /// The manifest declares a schema version other than the supported one.
    #[error("unsupported manifest version {found} (expected {expected})")]
    SchemaVersionMismatch {
        /// Supported schema version.
        expected: i64,
        /// Version declared by the manifest.
        found: i64,
    },
    /// Channel, platform or arch differ from the requested build.
    #[error("manifest scope mismatch: {field} is `{actual}`, expected `{expected}`")]
    ScopeMismatch {
        /// Name of the mismatching scope field.
        field: &'static str,
        /// Value the caller asked for.
        expected: String,
        /// Value found in the manifest.
        actual: String,
    },
    /// A version field is not of the form `MAJOR.MINOR.PATCH`.
    #[error("invalid semver in manifest field {field}: `{value}`")]
    SemverFormatError {
        /// Manifest field holding the version.
        field: &'static str,
        /// Offending value.
        value: String,
    },
    /// A digest is not 64 lowercase hex characters.
    #[error("invalid sha256 format in {0}")]
    HashFormatError(&'static str),
    /// `key_id` or `signature` is blank.
    #[error("missing signature field: {field}")]
    MissingSignatureFields {
        /// Name of the blank field.
        field: &'static str,
    },
    /// The artefact URL is unparsable, not https, or points at an unknown host.
    #[error("bad update url: {reason}")]
    BadUrl {
        /// Why the URL was refused.
        reason: String,
    },
    /// A timestamp field is not RFC3339.
    #[error("invalid {field} timestamp: `{value}`")]
    BadTimestamp {
        /// Manifest field holding the timestamp.
        field: &'static str,
        /// Offending value.
        value: String,
    },
    /// The manifest names a key id that is not in the keyring.
    #[error("unknown key id `{key_id}`")]
    UnknownKey {
        /// Key id claimed by the manifest.
        key_id: String,
    },
    /// The signature is not valid standard base64.
    #[error("invalid signature encoding: {reason}")]
    BadSignatureEncoding {
        /// Decoder failure description.
        reason: String,
    },
    /// The signature does not verify over the canonical payload.
    #[error("invalid manifest signature for key `{key_id}`")]
    InvalidSignature {
        /// Key the signature was checked against.
        key_id: String,
    },
    /// The current time falls outside the manifest validity window.
    #[error("manifest is outside valid time window (now {now}, valid {not_before} to {not_after})")]
    ExpiredOrNotYetValid {
        /// Time used for the check.
        now: DateTime<Utc>,
        /// `created_at` minus the clock skew tolerance.
        not_before: DateTime<Utc>,
        /// `expires_at` plus the clock skew tolerance.
        not_after: DateTime<Utc>,
    },
    /// The release sequence does not advance past the last accepted one.
    #[error("downgrade/replay by release sequence: {release_seq} <= last seen {last_seen}")]
    ReplayOrDowngrade {
        /// Sequence number carried by the manifest.
        release_seq: u64,
        /// Highest sequence number previously accepted.
        last_seen: u64,
    },
    /// The announced version is not greater than the installed one.
    #[error("update version {version} must be greater than current version {current}")]
    VersionNotNewer {
        /// Version announced by the manifest.
        version: String,
        /// Currently installed version.
        current: String,
    },
    /// The artefact stream exceeded the size ceiling.
    #[error("artifact exceeds max size of {limit} bytes")]
    ArtifactTooLarge {
        /// Maximum accepted size in bytes.
        limit: u64,
    },
    /// The artefact digest did not match the expected one.
    #[error("artifact hash mismatch (expected {expected}, got {actual})")]
    IntegrityMismatch {
        /// Expected SHA-256 digest.
        expected: String,
        /// Actual SHA-256 digest.
        actual: String,
    },
    /// Reading the artefact stream failed.
    #[error("artifact stream failed: {0}")]
    StreamError(#[source] std::io::Error),
    /// A version string could not be parsed for comparison.
    #[error(transparent)]
    ParseError(#[from] ParseVersionError),
    /// Keyring configuration could not be decoded into Ed25519 public keys.
    #[error("invalid keyring: {reason}")]
    KeyringConfig {
        /// Why the keyring was refused, naming the entry when there is one.
        reason: String,
    },
    /// The signed payload could not be serialised.
    #[error("payload canonicalisation failed: {0}")]
    Canonicalize(#[from] serde_json::Error),
}
