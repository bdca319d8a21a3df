//! Canonical byte form of the signed payload.
//!
//! The bytes produced here are what the publisher signs and what the verifier
//! checks, so the encoding is a compatibility contract: compact JSON, keys in
//! [`SIGNED_FIELDS`](crate::manifest::SIGNED_FIELDS) order, integers in plain
//! decimal, and strings escaped the way Go 1.22+ `encoding/json` does it:
//! `<`, `>`, `&`, U+2028 and U+2029 as `\uXXXX`, `\b`, `\f`, `\n`, `\r` and
//! `\t` in short form, and every other control character as `\u00XX`.

use std::io;

use base64::{engine::general_purpose, Engine as _};
use ed25519_dalek::{Signer, SigningKey};
use serde::Serialize;
use serde_json::ser::Formatter;

use crate::error::Result;
use crate::manifest::{Manifest, SignedPayload};

/// Serialise `payload` into the bytes covered by the manifest signature.
pub fn canonical_bytes(payload: &SignedPayload) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(512);
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, PublisherFormatter);
    payload.serialize(&mut serializer)?;
    Ok(out)
}

impl SignedPayload {
    /// Render the payload to the canonical bytes that are signed.
    pub fn signing_bytes(&self) -> Result<Vec<u8>> {
        canonical_bytes(self)
    }

    /// Sign the payload, producing a publishable [`Manifest`].
    pub fn sign(self, signing_key: &SigningKey) -> Result<Manifest> {
        let signature = signing_key.sign(&self.signing_bytes()?);
        Ok(Manifest {
            payload: self,
            signature: general_purpose::STANDARD.encode(signature.to_bytes()),
        })
    }
}

/// Compact formatter adding the publisher's HTML-safe escapes.
///
/// Short and `\u00XX` control escapes come from the default
/// `write_char_escape`, which already agrees with the publisher.
struct PublisherFormatter;

impl Formatter for PublisherFormatter {
    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        let mut start = 0;
        for (index, ch) in fragment.char_indices() {
            let escaped: &[u8] = match ch {
                '<' => b"\\u003c",
                '>' => b"\\u003e",
                '&' => b"\\u0026",
                '\u{2028}' => b"\\u2028",
                '\u{2029}' => b"\\u2029",
                _ => continue,
            };
            writer.write_all(fragment[start..index].as_bytes())?;
            writer.write_all(escaped)?;
            start = index + ch.len_utf8();
        }
        writer.write_all(fragment[start..].as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::SIGNED_FIELDS;
    use ed25519_dalek::Verifier;
    use serde_json::Value;

    fn payload() -> SignedPayload {
        SignedPayload {
            manifest_version: 1,
            channel: "stable".into(),
            platform: "windows".into(),
            arch: "amd64".into(),
            version: "1.2.0".into(),
            release_seq: 12,
            min_supported_version: "1.0.0".into(),
            url: "https://downloads.voltavpn.com/stable/windows/amd64/v1.2.0.exe".into(),
            sha256: "a".repeat(64),
            created_at: "2026-01-10T12:00:00Z".into(),
            expires_at: "2026-01-10T13:00:00Z".into(),
            key_id: "prod-2026-01".into(),
        }
    }

    #[test]
    fn canonical_form_is_compact_and_ordered() {
        let bytes = canonical_bytes(&payload()).unwrap();
        let expected = concat!(
            r#"{"manifest_version":1,"channel":"stable","platform":"windows","arch":"amd64","#,
            r#""version":"1.2.0","release_seq":12,"min_supported_version":"1.0.0","#,
            r#""url":"https://downloads.voltavpn.com/stable/windows/amd64/v1.2.0.exe","#,
            r#""sha256":"aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa","#,
            r#""created_at":"2026-01-10T12:00:00Z","expires_at":"2026-01-10T13:00:00Z","#,
            r#""key_id":"prod-2026-01"}"#
        );
        assert_eq!(String::from_utf8(bytes).unwrap(), expected);
    }

    #[test]
    fn signed_field_list_matches_payload_and_manifest() {
        let bytes = canonical_bytes(&payload()).unwrap();
        let keys: Vec<String> = serde_json::from_slice::<serde_json::Map<String, Value>>(&bytes)
            .unwrap()
            .keys()
            .cloned()
            .collect();
        let mut sorted_fields: Vec<String> = SIGNED_FIELDS.iter().map(|s| s.to_string()).collect();
        sorted_fields.sort();
        // serde_json::Map iterates in sorted key order without preserve_order.
        assert_eq!(keys, sorted_fields);

        let text = String::from_utf8(bytes).unwrap();
        let positions: Vec<usize> = SIGNED_FIELDS
            .iter()
            .map(|field| text.find(&format!("\"{field}\":")).expect(field))
            .collect();
        assert!(positions.windows(2).all(|pair| pair[0] < pair[1]));

        let manifest = payload().sign(&SigningKey::from_bytes(&[7u8; 32])).unwrap();
        let value = serde_json::to_value(&manifest).unwrap();
        let mut manifest_keys: Vec<&str> = value
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        manifest_keys.retain(|key| *key != "signature");
        manifest_keys.sort_unstable();
        let mut expected: Vec<&str> = SIGNED_FIELDS.to_vec();
        expected.sort_unstable();
        assert_eq!(manifest_keys, expected);
        assert!(value.get("signature").is_some());
    }

    #[test]
    fn strings_use_publisher_escaping() {
        let mut p = payload();
        p.url = "https://downloads.voltavpn.com/a?x=<1>&y=\u{2028}\"\\/".into();
        p.channel = "line\nfeed\ttab\u{0008}\u{000c}\u{0001}".into();
        let text = String::from_utf8(canonical_bytes(&p).unwrap()).unwrap();
        assert!(text.contains(
            r#""url":"https://downloads.voltavpn.com/a?x=\u003c1\u003e\u0026y=\u2028\"\\/""#
        ));
        assert!(text.contains(r#""channel":"line\nfeed\ttab\b\f\u0001""#));

        let back: SignedPayload = serde_json::from_str(&text).unwrap();
        assert_eq!(back, p);
    }

    #[test]
    fn sign_produces_verifiable_signature() {
        let key = SigningKey::from_bytes(&[7u8; 32]);
        let manifest = payload().sign(&key).unwrap();
        let signature = manifest.parsed_signature().unwrap();
        let bytes = canonical_bytes(&manifest.payload).unwrap();
        key.verifying_key().verify(&bytes, &signature).unwrap();
    }

    #[test]
    fn canonical_bytes_are_stable() {
        assert_eq!(
            canonical_bytes(&payload()).unwrap(),
            canonical_bytes(&payload().clone()).unwrap()
        );
    }
}
