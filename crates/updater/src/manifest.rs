use crate::config::{ExpectedScope, ALLOWED_HOSTS, ALLOWED_SCHEME, MANIFEST_SCHEMA_VERSION};
use crate::error::{Result, UpdaterError};
use crate::version::Version;
use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Utc};
use ed25519_dalek::{Signature, SIGNATURE_LENGTH};
use serde::{Deserialize, Serialize};
use url::Url;

/// Wire names of the signed fields, in canonical order.
///
/// [`SignedPayload`] serialises exactly these keys in exactly this order.
pub const SIGNED_FIELDS: [&str; 12] = [
    "manifest_version",
    "channel",
    "platform",
    "arch",
    "version",
    "release_seq",
    "min_supported_version",
    "url",
    "sha256",
    "created_at",
    "expires_at",
    "key_id",
];

/// The data covered by the release signature.
///
/// Field declaration order is the canonical serialisation order and is part
/// of the wire contract with the manifest publisher.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SignedPayload {
    /// Manifest schema version.
    pub manifest_version: i64,
    /// Update track, e.g. `stable` or `beta`.
    pub channel: String,
    /// Target operating system.
    pub platform: String,
    /// Target CPU architecture.
    pub arch: String,
    /// Version being announced.
    pub version: String,
    /// Monotonic release counter for this channel/platform/arch.
    pub release_seq: u64,
    /// Oldest version still allowed to keep running without updating.
    pub min_supported_version: String,
    /// Download location of the artefact.
    pub url: String,
    /// Expected SHA-256 digest (hex encoded, lowercase) of the artefact.
    pub sha256: String,
    /// RFC3339 time the manifest was produced.
    pub created_at: String,
    /// RFC3339 time after which the manifest must not be trusted.
    pub expires_at: String,
    /// Id of the keyring entry the signature was made with.
    pub key_id: String,
}

impl SignedPayload {
    /// Parsed `created_at`.
    pub fn created_at(&self) -> Result<DateTime<Utc>> {
        parse_timestamp("created_at", &self.created_at)
    }

    /// Parsed `expires_at`.
    pub fn expires_at(&self) -> Result<DateTime<Utc>> {
        parse_timestamp("expires_at", &self.expires_at)
    }
}

/// Signed release manifest as published by the update server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Manifest {
    #[serde(flatten)]
    pub payload: SignedPayload,
    /// Base64 encoded Ed25519 signature over the canonical JSON of [`SignedPayload`].
    pub signature: String,
}

impl Manifest {
    /// Check schema, scope and field formats against the build the manifest
    /// was requested for. Performs no cryptography.
    pub fn validate_shape(&self, scope: &ExpectedScope) -> Result<()> {
        let payload = &self.payload;

        if payload.manifest_version != MANIFEST_SCHEMA_VERSION {
            return Err(UpdaterError::SchemaVersionMismatch {
                expected: MANIFEST_SCHEMA_VERSION,
                found: payload.manifest_version,
            });
        }

        for (field, expected, actual) in [
            ("channel", &scope.channel, &payload.channel),
            ("platform", &scope.platform, &payload.platform),
            ("arch", &scope.arch, &payload.arch),
        ] {
            if expected != actual {
                return Err(UpdaterError::ScopeMismatch {
                    field,
                    expected: expected.clone(),
                    actual: actual.clone(),
                });
            }
        }

        for (field, value) in [
            ("version", &payload.version),
            ("min_supported_version", &payload.min_supported_version),
        ] {
            if Version::parse(value).is_err() {
                return Err(UpdaterError::SemverFormatError {
                    field,
                    value: value.clone(),
                });
            }
        }

        if !is_lower_hex_digest(&payload.sha256) {
            return Err(UpdaterError::HashFormatError("manifest sha256"));
        }

        if self.signature.trim().is_empty() {
            return Err(UpdaterError::MissingSignatureFields { field: "signature" });
        }
        if payload.key_id.trim().is_empty() {
            return Err(UpdaterError::MissingSignatureFields { field: "key_id" });
        }

        validate_url(&payload.url)?;

        payload.created_at()?;
        payload.expires_at()?;

        Ok(())
    }

    /// Decode the Ed25519 signature from the manifest.
    ///
    /// Undecodable base64 is an encoding error; well-formed base64 of the
    /// wrong length can never verify and is reported as an invalid signature.
    pub fn parsed_signature(&self) -> Result<Signature> {
        let raw = general_purpose::STANDARD
            .decode(self.signature.as_bytes())
            .map_err(|err| UpdaterError::BadSignatureEncoding {
                reason: err.to_string(),
            })?;

        let array: [u8; SIGNATURE_LENGTH] =
            raw.try_into().map_err(|_| UpdaterError::InvalidSignature {
                key_id: self.payload.key_id.clone(),
            })?;
        Ok(Signature::from_bytes(&array))
    }

    /// Parsed announced version.
    pub fn version(&self) -> Result<Version> {
        Ok(Version::parse(&self.payload.version)?)
    }

    /// Parsed minimum supported version.
    pub fn min_supported_version(&self) -> Result<Version> {
        Ok(Version::parse(&self.payload.min_supported_version)?)
    }
}

/// `true` when `value` is exactly 64 characters of `[0-9a-f]`.
pub(crate) fn is_lower_hex_digest(value: &str) -> bool {
    value.len() == 64
        && value
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

fn validate_url(raw: &str) -> Result<()> {
    if raw.bytes().any(|b| b.is_ascii_control() || b == b' ') {
        return Err(UpdaterError::BadUrl {
            reason: "update url contains whitespace or control characters".to_owned(),
        });
    }

    let parsed = Url::parse(raw).map_err(|err| UpdaterError::BadUrl {
        reason: err.to_string(),
    })?;

    if parsed.scheme() != ALLOWED_SCHEME {
        return Err(UpdaterError::BadUrl {
            reason: format!("update url must use {ALLOWED_SCHEME}, got {}", parsed.scheme()),
        });
    }

    // The host must appear verbatim after `https://`; `Url::parse` repairs
    // `https:host`, `https:///host` and percent-escaped dots.
    let host = parsed.host_str().unwrap_or_default().to_ascii_lowercase();
    match raw_host(raw) {
        Some(written) if written.eq_ignore_ascii_case(&host) => {}
        _ => {
            return Err(UpdaterError::BadUrl {
                reason: format!("update url authority does not match host {host:?}"),
            })
        }
    }

    if !ALLOWED_HOSTS.contains(&host.as_str()) {
        return Err(UpdaterError::BadUrl {
            reason: format!("unexpected update host: {host}"),
        });
    }

    Ok(())
}

/// Host as written between `https://` and the path, without userinfo or port.
fn raw_host(raw: &str) -> Option<&str> {
    let prefix = raw.get(..8)?;
    if !prefix.eq_ignore_ascii_case("https://") {
        return None;
    }
    let rest = &raw[8..];
    let authority = rest
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default();
    let host_port = authority
        .rsplit_once('@')
        .map_or(authority, |(_, host)| host);
    host_port.split(':').next().filter(|host| !host.is_empty())
}

/// RFC3339 timestamp in the `YYYY-MM-DDTHH:MM:SS[.frac](Z|+HH:MM|-HH:MM)` form.
///
/// chrono also takes a space or lowercase `t` as the date/time separator, a
/// lowercase `z`, and a leap second; all four are refused here.
fn parse_timestamp(field: &'static str, value: &str) -> Result<DateTime<Utc>> {
    let bad = || UpdaterError::BadTimestamp {
        field,
        value: value.to_owned(),
    };

    let bytes = value.as_bytes();
    if bytes.len() < 20 || bytes[10] != b'T' || &bytes[17..19] == b"60" {
        return Err(bad());
    }
    let zone_len = match bytes[bytes.len() - 1] {
        b'Z' => 1,
        _ => 6,
    };
    let (time, zone) = bytes.split_at(bytes.len().saturating_sub(zone_len));
    let zone_ok = time.last().is_some_and(u8::is_ascii_digit)
        && (zone == b"Z"
            || (zone.len() == 6
                && matches!(zone[0], b'+' | b'-')
                && zone[3] == b':'
                && [1, 2, 4, 5].iter().all(|&i| zone[i].is_ascii_digit())));
    if !zone_ok {
        return Err(bad());
    }

    DateTime::parse_from_rfc3339(value)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|_| bad())
}
