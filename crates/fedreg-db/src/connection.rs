//! Connection to the catalog database.
//!
//! The settings double as command line arguments, so binaries read them
//! from flags or from the `FEDREG_DB_*` environment variables.

use clap::Args;
use surrealdb::Surreal;
use surrealdb::engine::remote::ws::{Client, Ws};
use surrealdb::opt::auth::Root;
use tracing::info;

use crate::error::DbError;
use crate::schema::run_migrations;
use crate::store::SurrealGraphStore;

const DEFAULT_URL: &str = "127.0.0.1:8000";
const DEFAULT_NAMESPACE: &str = "fedreg";
const DEFAULT_DATABASE: &str = "catalog";
const DEFAULT_USER: &str = "root";

/// Where the catalog lives and how to sign in to it.
#[derive(Debug, Clone, Args)]
pub struct DbConfig {
    /// SurrealDB WebSocket address, with or without the `ws://` scheme
    #[arg(long = "db-url", env = "FEDREG_DB_URL", default_value = DEFAULT_URL, global = true)]
    pub url: String,

    #[arg(long = "db-ns", env = "FEDREG_DB_NS", default_value = DEFAULT_NAMESPACE, global = true)]
    pub namespace: String,

    #[arg(long = "db-name", env = "FEDREG_DB_NAME", default_value = DEFAULT_DATABASE, global = true)]
    pub database: String,

    /// Root user
    #[arg(long = "db-user", env = "FEDREG_DB_USER", default_value = DEFAULT_USER, global = true)]
    pub username: String,

    #[arg(
        long = "db-pass",
        env = "FEDREG_DB_PASS",
        default_value = DEFAULT_USER,
        hide_env_values = true,
        global = true
    )]
    pub password: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.into(),
            namespace: DEFAULT_NAMESPACE.into(),
            database: DEFAULT_DATABASE.into(),
            username: DEFAULT_USER.into(),
            password: DEFAULT_USER.into(),
        }
    }
}

impl DbConfig {
    /// Host and port handed to the WebSocket engine.
    pub fn address(&self) -> &str {
        self.url
            .strip_prefix("ws://")
            .unwrap_or(&self.url)
            .trim_end_matches('/')
    }
}

/// An authenticated session on the catalog namespace and database.
#[derive(Clone)]
pub struct DbManager {
    db: Surreal<Client>,
}

impl DbManager {
    pub async fn connect(config: &DbConfig) -> Result<Self, DbError> {
        info!(
            address = %config.address(),
            namespace = %config.namespace,
            database = %config.database,
            "Connecting to the catalog"
        );
        let db = Surreal::new::<Ws>(config.address()).await?;
        db.signin(Root {
            username: config.username.clone(),
            password: config.password.clone(),
        })
        .await?;
        db.use_ns(&config.namespace)
            .use_db(&config.database)
            .await?;
        Ok(Self { db })
    }

    /// Brings the catalog schema up to date.
    pub async fn migrate(&self) -> Result<(), DbError> {
        run_migrations(&self.db).await
    }

    /// Graph store over this session.
    pub fn store(&self) -> SurrealGraphStore<Client> {
        SurrealGraphStore::new(self.db.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Cli {
        #[command(flatten)]
        db: DbConfig,
    }

    #[test]
    fn flag_defaults_match_default() {
        let cli = Cli::try_parse_from(["fedreg"]).unwrap();
        let default = DbConfig::default();
        assert_eq!(cli.db.url, default.url);
        assert_eq!(cli.db.namespace, default.namespace);
        assert_eq!(cli.db.database, default.database);
        assert_eq!(cli.db.username, default.username);
    }

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::try_parse_from(["fedreg", "--db-url", "ws://db:8000/", "--db-ns", "test"])
            .unwrap();
        assert_eq!(cli.db.address(), "db:8000");
        assert_eq!(cli.db.namespace, "test");
        assert_eq!(DbConfig::default().address(), "127.0.0.1:8000");
    }
}
