use crate::canonical::canonical_bytes;
use crate::error::{Result, UpdaterError};
use crate::keyring::Keyring;
use crate::manifest::Manifest;

/// Check the manifest signature over its canonical payload using the key the
/// manifest names.
pub fn verify_signature(manifest: &Manifest, keyring: &Keyring) -> Result<()> {
    let key_id = &manifest.payload.key_id;
    let verifying_key = keyring
        .get(key_id)
        .ok_or_else(|| UpdaterError::UnknownKey {
            key_id: key_id.clone(),
        })?;

    let signature = manifest.parsed_signature()?;
    let payload = canonical_bytes(&manifest.payload)?;

    verifying_key
        .verify_strict(&payload, &signature)
        .map_err(|_| UpdaterError::InvalidSignature {
            key_id: key_id.clone(),
        })?;

    tracing::trace!(key_id = %key_id, "manifest signature verified");
    Ok(())
}
