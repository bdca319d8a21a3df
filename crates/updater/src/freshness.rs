use std::cmp::Ordering;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::config::MAX_CLOCK_SKEW;
use crate::error::{Result, UpdaterError};
use crate::manifest::SignedPayload;
use crate::version::compare as compare_versions;

/// Verification state persisted by the host between update checks.
///
/// This crate only reads it. The host writes `next_state()` of an accepted
/// manifest once the update has been installed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    /// Highest `release_seq` accepted so far.
    #[serde(default)]
    pub last_seen_release_seq: u64,
    /// Installed version, empty when unknown.
    #[serde(default)]
    pub current_version: String,
}

impl State {
    pub fn new(last_seen_release_seq: u64, current_version: impl Into<String>) -> Self {
        Self {
            last_seen_release_seq,
            current_version: current_version.into(),
        }
    }
}

/// Run the clock window, release sequence and version checks in that order.
///
/// `payload` must already have passed shape validation.
pub fn check_freshness(payload: &SignedPayload, now: DateTime<Utc>, state: &State) -> Result<()> {
    check_clock_window(payload, now)?;
    check_release_seq(payload.release_seq, state)?;
    check_version(&payload.version, state)
}

/// `now` must lie in `[created_at - skew, expires_at + skew]`.
pub fn check_clock_window(payload: &SignedPayload, now: DateTime<Utc>) -> Result<()> {
    let skew = Duration::seconds(MAX_CLOCK_SKEW.as_secs() as i64);
    let created_at = payload.created_at()?;
    let expires_at = payload.expires_at()?;

    let not_before = created_at.checked_sub_signed(skew).unwrap_or(created_at);
    let not_after = expires_at.checked_add_signed(skew).unwrap_or(expires_at);

    if now < not_before || now > not_after {
        tracing::debug!(%now, %not_before, %not_after, "manifest outside validity window");
        return Err(UpdaterError::ExpiredOrNotYetValid {
            now,
            not_before,
            not_after,
        });
    }
    Ok(())
}

/// The release sequence must strictly exceed the last accepted one.
pub fn check_release_seq(release_seq: u64, state: &State) -> Result<()> {
    if release_seq <= state.last_seen_release_seq {
        tracing::debug!(
            release_seq,
            last_seen = state.last_seen_release_seq,
            "release sequence does not advance"
        );
        return Err(UpdaterError::ReplayOrDowngrade {
            release_seq,
            last_seen: state.last_seen_release_seq,
        });
    }
    Ok(())
}

/// When the installed version is known, the announced one must be newer.
pub fn check_version(version: &str, state: &State) -> Result<()> {
    let current = state.current_version.trim();
    if current.is_empty() {
        return Ok(());
    }

    match compare_versions(version, current)? {
        Ordering::Greater => Ok(()),
        Ordering::Equal | Ordering::Less => {
            tracing::debug!(version, current, "announced version is not newer");
            Err(UpdaterError::VersionNotNewer {
                version: version.to_owned(),
                current: current.to_owned(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::SecondsFormat;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-01T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn rfc3339(at: DateTime<Utc>) -> String {
        at.to_rfc3339_opts(SecondsFormat::Secs, true)
    }

    fn payload(created_at: DateTime<Utc>, expires_at: DateTime<Utc>) -> SignedPayload {
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
            created_at: rfc3339(created_at),
            expires_at: rfc3339(expires_at),
            key_id: "prod-2026-01".into(),
        }
    }

    #[test]
    fn window_bounds_are_inclusive_with_skew() {
        let p = payload(now(), now() + Duration::hours(1));
        let skew = Duration::minutes(5);

        for at in [
            now() - skew,
            now(),
            now() + Duration::hours(1),
            now() + Duration::hours(1) + skew,
        ] {
            check_clock_window(&p, at).expect("inside window");
        }

        for at in [
            now() - skew - Duration::seconds(1),
            now() + Duration::hours(1) + skew + Duration::seconds(1),
        ] {
            assert!(matches!(
                check_clock_window(&p, at),
                Err(UpdaterError::ExpiredOrNotYetValid { .. })
            ));
        }
    }

    #[test]
    fn expired_manifest_is_rejected() {
        let p = payload(now() - Duration::days(2), now() - Duration::days(1));
        assert!(matches!(
            check_clock_window(&p, now()),
            Err(UpdaterError::ExpiredOrNotYetValid { .. })
        ));
    }

    #[test]
    fn release_seq_must_strictly_increase() {
        let state = State::new(11, "");
        check_release_seq(12, &state).expect("advances");
        for seq in [0, 10, 11] {
            assert!(matches!(
                check_release_seq(seq, &state),
                Err(UpdaterError::ReplayOrDowngrade { last_seen: 11, .. })
            ));
        }
        assert!(check_release_seq(0, &State::default()).is_err());
        check_release_seq(1, &State::default()).expect("first release");
    }

    #[test]
    fn version_must_exceed_known_current() {
        for current in ["1.1.0", "1.2.0"] {
            assert!(matches!(
                check_version("1.1.0", &State::new(0, current)),
                Err(UpdaterError::VersionNotNewer { .. })
            ));
        }
        check_version("1.1.0", &State::new(0, "1.0.9")).expect("newer");
        check_version("1.1.0", &State::new(0, "1.0.10")).expect("numeric compare");
    }

    #[test]
    fn unknown_current_version_skips_version_check() {
        check_version("0.0.1", &State::new(0, "")).expect("no current version");
        check_version("0.0.1", &State::new(0, "  ")).expect("blank current version");
    }

    #[test]
    fn malformed_current_version_is_a_parse_error() {
        assert!(matches!(
            check_version("1.2.0", &State::new(0, "1.2.0-rc1")),
            Err(UpdaterError::ParseError(_))
        ));
    }

    #[test]
    fn freshness_reports_first_failing_check() {
        let p = payload(now() - Duration::minutes(1), now() + Duration::hours(1));
        check_freshness(&p, now(), &State::new(11, "1.1.9")).expect("fresh");

        let err = check_freshness(&p, now(), &State::new(12, "1.2.0")).unwrap_err();
        assert!(matches!(err, UpdaterError::ReplayOrDowngrade { .. }));

        let err =
            check_freshness(&p, now() + Duration::days(1), &State::new(12, "1.2.0")).unwrap_err();
        assert!(matches!(err, UpdaterError::ExpiredOrNotYetValid { .. }));
    }

    #[test]
    fn state_decodes_with_missing_fields() {
        let state: State = serde_json::from_str(r#"{"last_seen_release_seq": 4}"#).unwrap();
        assert_eq!(state, State::new(4, ""));
    }
}
