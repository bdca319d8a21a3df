use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::freshness::State;

/// The only manifest schema version this verifier understands.
pub const MANIFEST_SCHEMA_VERSION: i64 = 1;

/// Hosts update artefacts may be served from.
pub const ALLOWED_HOSTS: [&str; 2] = ["downloads.voltavpn.com", "updates.voltavpn.com"];

/// Scheme artefact URLs must use.
pub const ALLOWED_SCHEME: &str = "https";

/// Tolerance applied to both ends of the manifest validity window.
pub const MAX_CLOCK_SKEW: Duration = Duration::from_secs(5 * 60);

/// Hard ceiling on artefact size (1 GiB).
pub const MAX_ARTIFACT_BYTES: u64 = 1 << 30;

/// The build a manifest was requested for. Manifests for any other
/// channel, platform or arch are refused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpectedScope {
    pub channel: String,
    pub platform: String,
    pub arch: String,
}

impl ExpectedScope {
    pub fn new(
        channel: impl Into<String>,
        platform: impl Into<String>,
        arch: impl Into<String>,
    ) -> Self {
        Self {
            channel: channel.into(),
            platform: platform.into(),
            arch: arch.into(),
        }
    }
}

/// Inputs to [`verify_manifest`](crate::verify_manifest) besides the manifest
/// and keyring.
#[derive(Debug, Clone)]
pub struct VerifyOptions {
    pub scope: ExpectedScope,
    /// Time to evaluate the validity window at. `None` uses the wall clock.
    pub now: Option<DateTime<Utc>>,
    /// Previously persisted verification state.
    pub state: State,
}

impl VerifyOptions {
    pub fn new(scope: ExpectedScope, state: State) -> Self {
        Self {
            scope,
            now: None,
            state,
        }
    }

    /// Pin the evaluation time instead of reading the wall clock.
    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }

    pub(crate) fn effective_now(&self) -> DateTime<Utc> {
        self.now.unwrap_or_else(Utc::now)
    }
}
