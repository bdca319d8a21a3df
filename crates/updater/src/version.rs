//! Strict three-component release versions.
//!
//! Only `MAJOR.MINOR.PATCH` with plain decimal components is accepted. Signs,
//! whitespace, pre-release and build-metadata suffixes are all rejected, so a
//! version string has exactly one interpretation on the signer and verifier
//! side.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Error returned when a string is not a strict `MAJOR.MINOR.PATCH` version.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid semver `{input}`: expected MAJOR.MINOR.PATCH")]
pub struct ParseVersionError {
    input: String,
}

impl ParseVersionError {
    fn new(input: &str) -> Self {
        Self {
            input: input.to_owned(),
        }
    }

    /// The rejected input.
    pub fn input(&self) -> &str {
        &self.input
    }
}

/// A parsed release version. Ordering is major, then minor, then patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl Version {
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    pub fn parse(input: &str) -> Result<Self, ParseVersionError> {
        let mut parts = input.split('.');
        let mut next = || -> Result<u64, ParseVersionError> {
            let part = parts.next().ok_or_else(|| ParseVersionError::new(input))?;
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(ParseVersionError::new(input));
            }
            part.parse().map_err(|_| ParseVersionError::new(input))
        };

        let version = Version::new(next()?, next()?, next()?);
        if parts.next().is_some() {
            return Err(ParseVersionError::new(input));
        }
        Ok(version)
    }
}

impl FromStr for Version {
    type Err = ParseVersionError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Compare two version strings, failing if either side is malformed.
pub fn compare(a: &str, b: &str) -> Result<Ordering, ParseVersionError> {
    Ok(Version::parse(a)?.cmp(&Version::parse(b)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_triples() {
        assert_eq!(Version::parse("1.2.3").unwrap(), Version::new(1, 2, 3));
        assert_eq!(Version::parse("0.0.0").unwrap(), Version::new(0, 0, 0));
        assert_eq!(Version::parse("01.10.007").unwrap(), Version::new(1, 10, 7));
    }

    #[test]
    fn rejects_anything_but_three_decimal_components() {
        for input in [
            "",
            "1",
            "1.2",
            "1.2.3.4",
            "1..3",
            ".1.2",
            "1.2.",
            "v1.2.3",
            "+1.2.3",
            "-1.2.3",
            "1.2.3-beta.1",
            "1.2.3+build.7",
            "1.2.3-rc1+meta",
            " 1.2.3",
            "1.2.3\n",
            "1.x.3",
            "１.2.3",
            "99999999999999999999999.0.0",
        ] {
            let err = Version::parse(input).expect_err(input);
            assert_eq!(err.input(), input);
        }
    }

    #[test]
    fn orders_major_then_minor_then_patch() {
        assert_eq!(compare("1.2.0", "1.1.9").unwrap(), Ordering::Greater);
        assert_eq!(compare("1.10.0", "1.9.99").unwrap(), Ordering::Greater);
        assert_eq!(compare("2.0.0", "1.99.99").unwrap(), Ordering::Greater);
        assert_eq!(compare("1.1.0", "1.2.0").unwrap(), Ordering::Less);
        assert_eq!(compare("1.1.0", "1.1.0").unwrap(), Ordering::Equal);
        assert_eq!(compare("1.01.0", "1.1.0").unwrap(), Ordering::Equal);
    }

    #[test]
    fn compare_fails_on_either_malformed_side() {
        assert!(compare("1.2.0-beta", "1.0.0").is_err());
        assert!(compare("1.0.0", "1.0").is_err());
    }

    #[test]
    fn display_round_trips_canonical_form() {
        assert_eq!(Version::new(3, 0, 12).to_string(), "3.0.12");
    }
}
