//! Operator tool for checking update manifests and artefacts.
//!
//! Decodes the manifest, keyring and persisted state from disk and hands them
//! to `volta-updater`. A non-zero exit status means the input was rejected.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use tracing_subscriber::{fmt, EnvFilter};
use volta_updater::{
    verify_artifact_sha256, verify_manifest, ExpectedScope, Keyring, Manifest, State,
    VerifyOptions,
};

/// Command-line arguments for the update verifier
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Enable debug logging
    #[arg(short, long, default_value_t = false, global = true)]
    debug: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Verify a signed manifest and print the state to persist after install
    Manifest {
        /// Manifest JSON as served by the update server
        #[arg(long)]
        manifest: PathBuf,

        /// JSON object mapping key ids to base64 Ed25519 public keys
        #[arg(long)]
        keyring: PathBuf,

        /// Persisted verification state; omitted means first run
        #[arg(long)]
        state: Option<PathBuf>,

        /// Expected update channel
        #[arg(long)]
        channel: String,

        /// Expected platform
        #[arg(long)]
        platform: String,

        /// Expected architecture
        #[arg(long)]
        arch: String,

        /// Evaluate the validity window at this RFC3339 time instead of now
        #[arg(long, value_parser = parse_rfc3339)]
        now: Option<DateTime<Utc>>,
    },

    /// Check a downloaded artefact against its SHA-256 digest
    Artifact {
        /// Downloaded artefact
        #[arg(long)]
        file: PathBuf,

        /// Expected digest as 64 hex characters
        #[arg(long, required_unless_present = "manifest", conflicts_with = "manifest")]
        sha256: Option<String>,

        /// Read the expected digest from this manifest's sha256 field; the
        /// manifest itself is not verified here, run `manifest` on it first
        #[arg(long)]
        manifest: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if args.debug {
            EnvFilter::new("debug,volta_updater=debug,update_verify=debug")
        } else {
            EnvFilter::new("info,volta_updater=info,update_verify=info")
        }
    });
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    match args.command {
        Commands::Manifest {
            manifest,
            keyring,
            state,
            channel,
            platform,
            arch,
            now,
        } => {
            let scope = ExpectedScope::new(channel, platform, arch);
            let next = check_manifest(&manifest, &keyring, state.as_deref(), scope, now)?;
            println!("{}", serde_json::to_string_pretty(&next)?);
        }
        Commands::Artifact {
            file,
            sha256,
            manifest,
        } => {
            let expected = match (sha256, manifest) {
                (Some(digest), _) => digest,
                (None, Some(path)) => read_json::<Manifest>(&path, "manifest")?.payload.sha256,
                (None, None) => anyhow::bail!("either --sha256 or --manifest is required"),
            };
            check_artifact(&file, &expected)?;
            println!("ok");
        }
    }

    Ok(())
}

fn check_manifest(
    manifest_path: &Path,
    keyring_path: &Path,
    state_path: Option<&Path>,
    scope: ExpectedScope,
    now: Option<DateTime<Utc>>,
) -> Result<State> {
    let manifest: Manifest = read_json(manifest_path, "manifest")?;
    let keyring_bytes = fs::read(keyring_path)
        .with_context(|| format!("failed to read keyring {}", keyring_path.display()))?;
    let keyring = Keyring::from_json(&keyring_bytes)?;
    let state = match state_path {
        Some(path) => read_json(path, "state")?,
        None => {
            tracing::info!("no state file given, treating as first run");
            State::default()
        }
    };

    let mut options = VerifyOptions::new(scope, state);
    options.now = now;

    let verified = verify_manifest(&manifest, &keyring, &options)
        .with_context(|| format!("manifest {} rejected", manifest_path.display()))?;
    tracing::info!(
        version = %manifest.payload.version,
        release_seq = manifest.payload.release_seq,
        "manifest accepted"
    );
    Ok(verified.next_state())
}

fn check_artifact(path: &Path, expected: &str) -> Result<()> {
    let file =
        File::open(path).with_context(|| format!("failed to open artefact {}", path.display()))?;
    verify_artifact_sha256(file, expected)
        .with_context(|| format!("artefact {} rejected", path.display()))?;
    tracing::info!(path = %path.display(), "artefact digest matches");
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let bytes =
        fs::read(path).with_context(|| format!("failed to read {what} {}", path.display()))?;
    serde_json::from_slice(&bytes)
        .with_context(|| format!("failed to decode {what} {}", path.display()))
}

fn parse_rfc3339(value: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(value).map(|parsed| parsed.with_timezone(&Utc))
}
