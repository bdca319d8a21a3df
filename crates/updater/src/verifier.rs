use crate::{
    config::VerifyOptions,
    error::Result,
    freshness::{check_freshness, State},
    keyring::Keyring,
    manifest::Manifest,
    signature::verify_signature,
    version::Version,
};

/// Verify a decoded manifest before any artefact is fetched.
///
/// Shape, then signature, then freshness; the first failing check is
/// returned. Neither the manifest nor `options.state` is modified.
pub fn verify_manifest<'m>(
    manifest: &'m Manifest,
    keyring: &Keyring,
    options: &VerifyOptions,
) -> Result<VerifiedManifest<'m>> {
    let payload = &manifest.payload;
    let span = tracing::debug_span!(
        "verify_manifest",
        channel = %payload.channel,
        platform = %payload.platform,
        arch = %payload.arch,
        release_seq = payload.release_seq,
        key_id = %payload.key_id,
    );
    let _enter = span.enter();

    let outcome = manifest
        .validate_shape(&options.scope)
        .and_then(|()| verify_signature(manifest, keyring))
        .and_then(|()| check_freshness(payload, options.effective_now(), &options.state));
    if let Err(err) = outcome {
        tracing::debug!(error = %err, "manifest rejected");
        return Err(err);
    }

    tracing::debug!(version = %payload.version, "manifest accepted");
    Ok(VerifiedManifest { manifest })
}

/// A manifest that passed [`verify_manifest`].
#[derive(Debug, Clone, Copy)]
pub struct VerifiedManifest<'m> {
    manifest: &'m Manifest,
}

impl<'m> VerifiedManifest<'m> {
    /// Access the manifest.
    pub fn manifest(&self) -> &'m Manifest {
        self.manifest
    }

    /// Artefact location to fetch.
    pub fn url(&self) -> &'m str {
        &self.manifest.payload.url
    }

    /// Expected SHA-256 digest of the artefact.
    pub fn sha256(&self) -> &'m str {
        &self.manifest.payload.sha256
    }

    /// State to persist once the artefact has been checked and installed.
    pub fn next_state(&self) -> State {
        State::new(
            self.manifest.payload.release_seq,
            self.manifest.payload.version.clone(),
        )
    }

    /// Whether `current` is older than the manifest's minimum supported
    /// version, i.e. the update must not be deferred.
    pub fn is_mandatory_for(&self, current: &str) -> Result<bool> {
        let current = Version::parse(current.trim())?;
        Ok(current < self.manifest.min_supported_version()?)
    }
}
