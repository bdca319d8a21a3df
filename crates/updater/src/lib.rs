//! Signed update manifest verification and artefact integrity checks.
//!
//! Update announcements are JSON manifests signed with Ed25519 over a
//! canonical encoding of every field except the signature. Before a
//! self-update may proceed the host runs [`verify_manifest`], which checks
//! the manifest shape against the build it was requested for, verifies the
//! signature against a trusted [`Keyring`], and enforces the validity window
//! plus the anti-replay (release sequence) and anti-downgrade (version)
//! rules. Once the artefact has been downloaded, [`verify_artifact_sha256`]
//! hashes it as a stream and compares it with the digest the manifest
//! announced.
//!
//! Fetching, persisting [`State`] and installing are left to the host; this
//! crate performs no I/O besides reading the artefact stream it is handed.
//!
//! ```ignore
//! use volta_updater::{verify_artifact_sha256, verify_manifest, ExpectedScope, Keyring, Manifest, State, VerifyOptions};
//!
//! # fn demo(manifest_json: &[u8], keyring: &Keyring, state: State) -> Result<(), Box<dyn std::error::Error>> {
//! let manifest: Manifest = serde_json::from_slice(manifest_json)?;
//! let options = VerifyOptions::new(ExpectedScope::new("stable", "windows", "amd64"), state);
//!
//! let verified = verify_manifest(&manifest, keyring, &options)?;
//! let artefact = std::fs::File::open("/tmp/volta-update.exe")?;
//! verify_artifact_sha256(artefact, verified.sha256())?;
//!
//! // install, then persist:
//! let next = verified.next_state();
//! # Ok(())
//! # }
//! ```

mod artifact;
mod canonical;
mod config;
mod error;
mod freshness;
mod keyring;
mod manifest;
mod signature;
mod verifier;
pub mod version;

pub use artifact::{verify_artifact_sha256, ArtifactIntegrityChecker};
pub use canonical::canonical_bytes;
pub use config::{
    ExpectedScope, VerifyOptions, ALLOWED_HOSTS, ALLOWED_SCHEME, MANIFEST_SCHEMA_VERSION,
    MAX_ARTIFACT_BYTES, MAX_CLOCK_SKEW,
};
pub use error::{Result, UpdaterError};
pub use freshness::{check_clock_window, check_freshness, check_release_seq, check_version, State};
pub use keyring::Keyring;
pub use manifest::{Manifest, SignedPayload, SIGNED_FIELDS};
pub use signature::verify_signature;
pub use verifier::{verify_manifest, VerifiedManifest};
pub use version::{ParseVersionError, Version};
