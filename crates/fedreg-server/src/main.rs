//! Federation Registry command line entry point.
//!
//! ```bash
//! # Reconcile one or more provider documents
//! fedreg apply providers/infn-cloud.json providers/recas.json
//!
//! # Remove a provider and everything it owns
//! fedreg remove --name infn-cloud --type openstack
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fedreg_core::models::provider::{CreateProvider, ProviderKind};
use fedreg_db::{DbConfig, DbManager, SurrealGraphStore};
use fedreg_reconcile::{ReconcileConfig, Reconciler};
use surrealdb::engine::remote::ws::Client;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

type CatalogReconciler = Reconciler<SurrealGraphStore<Client>>;

/// Federation Registry catalog tool
#[derive(Parser)]
#[command(name = "fedreg", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    db: DbConfig,

    /// Keep locations no region points at anymore
    #[arg(long, global = true)]
    keep_orphan_locations: bool,

    /// Keep user groups left without SLAs
    #[arg(long, global = true)]
    keep_orphan_user_groups: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Create or update the providers described by JSON documents
    Apply {
        /// Provider documents
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Remove a provider with its projects, regions and services
    Remove {
        #[arg(long)]
        name: String,

        /// Provider type (openstack, kubernetes)
        #[arg(long = "type", default_value = "openstack")]
        kind: ProviderKind,
    },
    /// Apply pending schema migrations and exit
    Migrate,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("fedreg=info")),
        )
        .json()
        .init();

    let cli = Cli::parse();
    let reconcile_config = ReconcileConfig {
        prune_orphan_locations: !cli.keep_orphan_locations,
        prune_orphan_user_groups: !cli.keep_orphan_user_groups,
    };

    let db = DbManager::connect(&cli.db)
        .await
        .context("failed to connect to SurrealDB")?;
    db.migrate().await.context("failed to run migrations")?;
    let reconciler = Reconciler::new(db.store(), reconcile_config);

    match cli.command {
        Command::Apply { files } => {
            for file in &files {
                apply_file(&reconciler, file).await?;
            }
        }
        Command::Remove { name, kind } => {
            match reconciler.find_provider(&name, kind).await? {
                Some(provider) => reconciler.remove_provider(&provider).await?,
                None => warn!(%name, %kind, "Provider not found, nothing to remove"),
            }
        }
        Command::Migrate => info!("Migrations applied"),
    }
    Ok(())
}

async fn apply_file(reconciler: &CatalogReconciler, path: &Path) -> Result<()> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let desired: CreateProvider = serde_json::from_str(&raw)
        .with_context(|| format!("invalid provider document {}", path.display()))?;

    let outcome = reconciler
        .apply(&desired)
        .await
        .with_context(|| format!("failed to apply {}", path.display()))?;
    let provider = outcome.provider();
    info!(
        file = %path.display(),
        id = %provider.id,
        name = %provider.attrs.name,
        kind = %provider.attrs.kind,
        outcome = outcome.as_str(),
        "Provider applied"
    );
    Ok(())
}
