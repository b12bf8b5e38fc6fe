use std::fs::{self, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use fb_crypto::KeyPair;
use fb_pipeline::FeedbackPipeline;
use fb_proto::FeedbackSubmission;
use fb_store::Store;

mod config;

use crate::config::{load_settings, KeyArgs};

#[derive(Parser, Debug)]
#[command(name = "fb-cli")]
#[command(author, version, about = "Sealed feedback store", long_about = None)]
struct Cli {
    /// sqlx SQLite URL
    #[arg(long, env = "FEEDBACK_DATABASE_URL", default_value = "sqlite://feedback.db")]
    database: String,

    /// Pipeline settings (JSON)
    #[arg(long)]
    settings: Option<PathBuf>,

    #[command(flatten)]
    keys: KeyArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate a new RSA key pair as PEM files
    Keygen {
        #[arg(long)]
        out_dir: PathBuf,
        #[arg(long, default_value = "2048")]
        bits: usize,
    },
    /// Seal and store a feedback submission (JSON file, `-` for stdin)
    Submit {
        #[arg(long)]
        file: PathBuf,
        /// Re-run a previous submission; parties already stored are kept
        #[arg(long)]
        submission_id: Option<Uuid>,
    },
    /// Feedback about one evaluated party
    ByParty {
        #[arg(long)]
        id: i64,
    },
    /// Feedback sent by one submitter
    BySubmitter {
        #[arg(long, conflicts_with = "reference", required_unless_present = "reference")]
        id: Option<i64>,
        /// Identifier the submitter used when submitting
        #[arg(long = "ref")]
        reference: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fb_cli=info,fb_pipeline=info,fb_store=info".into()),
        )
        .init();

    let cli = Cli::parse();
    if let Commands::Keygen { out_dir, bits } = &cli.command {
        return keygen_command(out_dir, *bits);
    }
    let pipeline = open_pipeline(&cli).await?;
    run_command(&pipeline, &cli.command).await
}

async fn open_pipeline(cli: &Cli) -> Result<FeedbackPipeline> {
    let keys = cli.keys.load()?;
    let settings = load_settings(cli.settings.as_deref())?;
    let store = Store::connect(&cli.database)
        .await
        .with_context(|| format!("opening database {}", cli.database))?;
    Ok(FeedbackPipeline::new(Arc::new(store), keys, &settings))
}

async fn run_command(pipeline: &FeedbackPipeline, command: &Commands) -> Result<()> {
    match command {
        Commands::Submit {
            file,
            submission_id,
        } => {
            let submission = read_submission(file)?;
            let report = match submission_id {
                Some(id) => pipeline.ingestor.ingest_as(*id, &submission).await?,
                None => pipeline.ingestor.ingest(&submission).await?,
            };
            print_json(&report)
        }
        Commands::ByParty { id } => print_json(&pipeline.retriever.by_evaluated_party(*id).await?),
        Commands::BySubmitter { id, reference } => {
            let found = match (id, reference) {
                (Some(id), _) => pipeline.retriever.by_submitter(*id).await?,
                (None, Some(reference)) => pipeline.retriever.by_submitter_ref(reference).await?,
                (None, None) => return Err(anyhow!("either --id or --ref is required")),
            };
            print_json(&found)
        }
        Commands::Keygen { .. } => Err(anyhow!("keygen does not use the pipeline")),
    }
}

fn keygen_command(out_dir: &Path, bits: usize) -> Result<()> {
    fs::create_dir_all(out_dir)?;
    let keys = KeyPair::generate(bits)?;

    let public_path = out_dir.join("public.pem");
    let private_path = out_dir.join("private.pem");
    if private_path.exists() {
        return Err(anyhow!("{} already exists", private_path.display()));
    }
    write_new(&public_path, keys.public_pem()?.as_bytes(), 0o644)?;
    write_new(&private_path, keys.private_pem()?.as_bytes(), 0o600)?;

    info!(bits, dir = %out_dir.display(), "key pair written");
    println!("Public key:  {}", public_path.display());
    println!("Private key: {}", private_path.display());
    Ok(())
}

/// Create `path` with `mode` already applied. Refuses to overwrite.
fn write_new(path: &Path, contents: &[u8], mode: u32) -> Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(mode);
    }
    #[cfg(not(unix))]
    let _ = mode;

    let mut file = options
        .open(path)
        .with_context(|| format!("creating {}", path.display()))?;
    file.write_all(contents)?;
    file.sync_all()?;
    Ok(())
}

fn read_submission(path: &Path) -> Result<FeedbackSubmission> {
    let text = if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?
    };
    serde_json::from_str(&text).context("submission is not valid feedback JSON")
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keygen_writes_loadable_pair() {
        let dir = tempfile::tempdir().unwrap();
        keygen_command(dir.path(), 2048).unwrap();

        let public = fs::read_to_string(dir.path().join("public.pem")).unwrap();
        let private = fs::read_to_string(dir.path().join("private.pem")).unwrap();
        assert!(KeyPair::load(&public, &private).is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn private_key_created_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("private.pem");
        write_new(&path, b"secret", 0o600).unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn existing_key_file_is_not_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("private.pem");
        fs::write(&path, "keep me").unwrap();

        assert!(write_new(&path, b"replacement", 0o600).is_err());
        assert_eq!(fs::read_to_string(&path).unwrap(), "keep me");
    }
}
