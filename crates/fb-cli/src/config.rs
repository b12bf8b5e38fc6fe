//! Runtime configuration: key material and pipeline settings.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::Args;
use zeroize::Zeroizing;

use fb_crypto::KeyPair;
use fb_pipeline::PipelineSettings;

#[derive(Args, Debug, Clone, Default)]
pub struct KeyArgs {
    /// PEM public key (SPKI or PKCS#1)
    #[arg(long, env = "FEEDBACK_PUBLIC_KEY", hide_env_values = true)]
    pub public_key: Option<String>,

    /// PEM private key (PKCS#8 or PKCS#1, unencrypted)
    #[arg(long, env = "FEEDBACK_PRIVATE_KEY", hide_env_values = true)]
    pub private_key: Option<String>,

    /// Read the public key from a file instead
    #[arg(long)]
    pub public_key_file: Option<PathBuf>,

    /// Read the private key from a file instead
    #[arg(long)]
    pub private_key_file: Option<PathBuf>,
}

impl KeyArgs {
    /// Load the key pair. Missing material is fatal.
    pub fn load(&self) -> Result<KeyPair> {
        let public = pem_from(
            "public",
            self.public_key_file.as_deref(),
            self.public_key.as_deref(),
            "FEEDBACK_PUBLIC_KEY",
        )?;
        let private = pem_from(
            "private",
            self.private_key_file.as_deref(),
            self.private_key.as_deref(),
            "FEEDBACK_PRIVATE_KEY",
        )?;
        KeyPair::load(&public, &private).context("failed to load key pair")
    }
}

/// File beats inline value. Inline values from `.env` files often carry
/// literal `\n` sequences instead of line breaks; those are expanded.
fn pem_from(
    which: &str,
    file: Option<&Path>,
    inline: Option<&str>,
    env_name: &str,
) -> Result<Zeroizing<String>> {
    if let Some(path) = file {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading {which} key from {}", path.display()))?;
        return Ok(Zeroizing::new(text));
    }
    match inline {
        Some(value) if !value.trim().is_empty() => {
            if !value.contains('\n') && value.contains("\\n") {
                Ok(Zeroizing::new(value.replace("\\n", "\n")))
            } else {
                Ok(Zeroizing::new(value.to_string()))
            }
        }
        _ => Err(anyhow!(
            "{which} key not configured (set {env_name} or --{which}-key-file)"
        )),
    }
}

/// Settings from a JSON file, or defaults when no file is given.
pub fn load_settings(path: Option<&Path>) -> Result<PipelineSettings> {
    match path {
        Some(path) => {
            let bytes = fs::read(path)
                .with_context(|| format!("reading settings from {}", path.display()))?;
            let settings: PipelineSettings = serde_json::from_slice(&bytes)
                .with_context(|| format!("parsing settings in {}", path.display()))?;
            settings
                .validate()
                .with_context(|| format!("invalid settings in {}", path.display()))?;
            Ok(settings)
        }
        None => Ok(PipelineSettings::default()),
    }
}
