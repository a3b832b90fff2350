use anyhow::{Context, Result};
use clap::Parser;
use std::{env, time::Duration};

/// Centralized application configuration.
/// Combines environment variables and CLI arguments; CLI wins.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub storage_dir: String,
    pub database_url: String,
    pub processing_delay_ms: u64,
    pub embedding_delay_ms: u64,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Document upload & embedding-pipeline API")]
pub struct Args {
    /// Host to bind to (overrides DOCUMENT_STORE_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides DOCUMENT_STORE_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Directory where uploaded files are stored (overrides DOCUMENT_STORE_STORAGE_DIR)
    #[arg(long)]
    pub storage_dir: Option<String>,

    /// Database URL (overrides DOCUMENT_STORE_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Simulated processing-stage delay in ms (overrides DOCUMENT_STORE_PROCESSING_DELAY_MS)
    #[arg(long)]
    pub processing_delay_ms: Option<u64>,

    /// Simulated embedding-stage delay in ms (overrides DOCUMENT_STORE_EMBEDDING_DELAY_MS)
    #[arg(long)]
    pub embedding_delay_ms: Option<u64>,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,
}

fn env_u64(key: &str, default: u64) -> Result<u64> {
    match env::var(key) {
        Ok(value) => value
            .parse::<u64>()
            .with_context(|| format!("parsing {} value `{}`", key, value)),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(err) => Err(err).with_context(|| format!("reading {}", key)),
    }
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and migrate flag.
    pub fn from_env_and_args() -> Result<(Self, bool)> {
        // Parse CLI once
        let args = Args::parse();

        // --- Environment fallback ---
        let env_host = env::var("DOCUMENT_STORE_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = match env::var("DOCUMENT_STORE_PORT") {
            Ok(value) => value
                .parse::<u16>()
                .with_context(|| format!("parsing DOCUMENT_STORE_PORT value `{}`", value))?,
            Err(env::VarError::NotPresent) => 3001,
            Err(err) => return Err(err).context("reading DOCUMENT_STORE_PORT"),
        };
        let env_storage =
            env::var("DOCUMENT_STORE_STORAGE_DIR").unwrap_or_else(|_| "./data/uploads".into());
        let env_db = env::var("DOCUMENT_STORE_DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://./data/meta/documents.db".into());
        let env_processing = env_u64("DOCUMENT_STORE_PROCESSING_DELAY_MS", 2000)?;
        let env_embedding = env_u64("DOCUMENT_STORE_EMBEDDING_DELAY_MS", 2000)?;

        // --- Merge ---
        let cfg = Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            storage_dir: args.storage_dir.unwrap_or(env_storage),
            database_url: args.database_url.unwrap_or(env_db),
            processing_delay_ms: args.processing_delay_ms.unwrap_or(env_processing),
            embedding_delay_ms: args.embedding_delay_ms.unwrap_or(env_embedding),
        };

        Ok((cfg, args.migrate))
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn processing_delay(&self) -> Duration {
        Duration::from_millis(self.processing_delay_ms)
    }

    pub fn embedding_delay(&self) -> Duration {
        Duration::from_millis(self.embedding_delay_ms)
    }
}
