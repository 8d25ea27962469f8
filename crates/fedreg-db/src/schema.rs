//! Schema definitions and migration runner for SurrealDB.
//!
//! Every node table stores its attribute set in a flexible `props` object
//! next to the SCHEMAFULL timestamps, so the graph store can persist any
//! attribute set without per-entity statements. Edge tables carry their
//! own `props` for edge properties. Globally unique natural keys are
//! backed by unique indexes.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;

use crate::error::DbError;

// -----------------------------------------------------------------------
// Migration tracking
// -----------------------------------------------------------------------

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct MigrationRecord {
    version: u32,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "initial_catalog",
    sql: SCHEMA_V1,
}];

// -----------------------------------------------------------------------
// Schema v1
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Providers
-- =======================================================================
DEFINE TABLE provider SCHEMAFULL;
DEFINE FIELD props ON TABLE provider TYPE object FLEXIBLE DEFAULT {};
DEFINE FIELD created_at ON TABLE provider TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE provider TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_provider_name_type ON TABLE provider \
    COLUMNS props.name, props.type UNIQUE;

-- =======================================================================
-- Projects (one provider)
-- =======================================================================
DEFINE TABLE project SCHEMAFULL;
DEFINE FIELD props ON TABLE project TYPE object FLEXIBLE DEFAULT {};
DEFINE FIELD created_at ON TABLE project TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE project TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_project_uuid ON TABLE project COLUMNS props.uuid;

-- =======================================================================
-- Regions (one provider)
-- =======================================================================
DEFINE TABLE region SCHEMAFULL;
DEFINE FIELD props ON TABLE region TYPE object FLEXIBLE DEFAULT {};
DEFINE FIELD created_at ON TABLE region TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE region TYPE datetime \
    DEFAULT time::now();

-- =======================================================================
-- Locations (shared by regions)
-- =======================================================================
DEFINE TABLE location SCHEMAFULL;
DEFINE FIELD props ON TABLE location TYPE object FLEXIBLE DEFAULT {};
DEFINE FIELD created_at ON TABLE location TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE location TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_location_site ON TABLE location \
    COLUMNS props.site UNIQUE;

-- =======================================================================
-- Services (one region)
-- =======================================================================
DEFINE TABLE service SCHEMAFULL;
DEFINE FIELD props ON TABLE service TYPE object FLEXIBLE DEFAULT {};
DEFINE FIELD created_at ON TABLE service TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE service TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_service_endpoint ON TABLE service COLUMNS props.endpoint;

-- =======================================================================
-- Quotas (one project, one service)
-- =======================================================================
DEFINE TABLE quota SCHEMAFULL;
DEFINE FIELD props ON TABLE quota TYPE object FLEXIBLE DEFAULT {};
DEFINE FIELD created_at ON TABLE quota TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE quota TYPE datetime \
    DEFAULT time::now();

-- =======================================================================
-- Flavors
-- =======================================================================
DEFINE TABLE flavor SCHEMAFULL;
DEFINE FIELD props ON TABLE flavor TYPE object FLEXIBLE DEFAULT {};
DEFINE FIELD created_at ON TABLE flavor TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE flavor TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_flavor_uuid ON TABLE flavor COLUMNS props.uuid;

-- =======================================================================
-- Images
-- =======================================================================
DEFINE TABLE image SCHEMAFULL;
DEFINE FIELD props ON TABLE image TYPE object FLEXIBLE DEFAULT {};
DEFINE FIELD created_at ON TABLE image TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE image TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_image_uuid ON TABLE image COLUMNS props.uuid;

-- =======================================================================
-- Networks
-- =======================================================================
DEFINE TABLE network SCHEMAFULL;
DEFINE FIELD props ON TABLE network TYPE object FLEXIBLE DEFAULT {};
DEFINE FIELD created_at ON TABLE network TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE network TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_network_uuid ON TABLE network COLUMNS props.uuid;

-- =======================================================================
-- Identity providers (shared by providers)
-- =======================================================================
DEFINE TABLE identity_provider SCHEMAFULL;
DEFINE FIELD props ON TABLE identity_provider TYPE object FLEXIBLE DEFAULT {};
DEFINE FIELD created_at ON TABLE identity_provider TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE identity_provider TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_identity_provider_endpoint ON TABLE identity_provider \
    COLUMNS props.endpoint UNIQUE;

-- =======================================================================
-- User groups (one identity provider)
-- =======================================================================
DEFINE TABLE user_group SCHEMAFULL;
DEFINE FIELD props ON TABLE user_group TYPE object FLEXIBLE DEFAULT {};
DEFINE FIELD created_at ON TABLE user_group TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE user_group TYPE datetime \
    DEFAULT time::now();

-- =======================================================================
-- SLAs (one user group)
-- =======================================================================
DEFINE TABLE sla SCHEMAFULL;
DEFINE FIELD props ON TABLE sla TYPE object FLEXIBLE DEFAULT {};
DEFINE FIELD created_at ON TABLE sla TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE sla TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_sla_doc_uuid ON TABLE sla \
    COLUMNS props.doc_uuid UNIQUE;

-- =======================================================================
-- Graph Edge Tables (relations)
-- =======================================================================

-- Provider -> Project
DEFINE TABLE book_project TYPE RELATION SCHEMAFULL;
DEFINE FIELD props ON TABLE book_project TYPE object FLEXIBLE DEFAULT {};

-- Provider -> Region
DEFINE TABLE divided_into TYPE RELATION SCHEMAFULL;
DEFINE FIELD props ON TABLE divided_into TYPE object FLEXIBLE DEFAULT {};

-- Provider -> IdentityProvider, carries protocol and idp_name
DEFINE TABLE trusts TYPE RELATION SCHEMAFULL;
DEFINE FIELD props ON TABLE trusts TYPE object FLEXIBLE DEFAULT {};

-- Region -> Location
DEFINE TABLE located_at TYPE RELATION SCHEMAFULL;
DEFINE FIELD props ON TABLE located_at TYPE object FLEXIBLE DEFAULT {};

-- Region -> Service
DEFINE TABLE supplies TYPE RELATION SCHEMAFULL;
DEFINE FIELD props ON TABLE supplies TYPE object FLEXIBLE DEFAULT {};

-- Project -> Quota
DEFINE TABLE use_service_with TYPE RELATION SCHEMAFULL;
DEFINE FIELD props ON TABLE use_service_with TYPE object FLEXIBLE DEFAULT {};

-- Quota -> Service
DEFINE TABLE apply_to TYPE RELATION SCHEMAFULL;
DEFINE FIELD props ON TABLE apply_to TYPE object FLEXIBLE DEFAULT {};

-- Service -> Flavor
DEFINE TABLE available_vm_flavor TYPE RELATION SCHEMAFULL;
DEFINE FIELD props ON TABLE available_vm_flavor TYPE object FLEXIBLE DEFAULT {};

-- Service -> Image
DEFINE TABLE available_vm_image TYPE RELATION SCHEMAFULL;
DEFINE FIELD props ON TABLE available_vm_image TYPE object FLEXIBLE DEFAULT {};

-- Service -> Network
DEFINE TABLE available_network TYPE RELATION SCHEMAFULL;
DEFINE FIELD props ON TABLE available_network TYPE object FLEXIBLE DEFAULT {};

-- Project -> private Flavor
DEFINE TABLE can_use_vm_flavor TYPE RELATION SCHEMAFULL;
DEFINE FIELD props ON TABLE can_use_vm_flavor TYPE object FLEXIBLE DEFAULT {};

-- Project -> private Image
DEFINE TABLE can_use_vm_image TYPE RELATION SCHEMAFULL;
DEFINE FIELD props ON TABLE can_use_vm_image TYPE object FLEXIBLE DEFAULT {};

-- Project -> private Network
DEFINE TABLE can_use_network TYPE RELATION SCHEMAFULL;
DEFINE FIELD props ON TABLE can_use_network TYPE object FLEXIBLE DEFAULT {};

-- IdentityProvider -> UserGroup
DEFINE TABLE owns_group TYPE RELATION SCHEMAFULL;
DEFINE FIELD props ON TABLE owns_group TYPE object FLEXIBLE DEFAULT {};

-- UserGroup -> SLA
DEFINE TABLE agree TYPE RELATION SCHEMAFULL;
DEFINE FIELD props ON TABLE agree TYPE object FLEXIBLE DEFAULT {};

-- SLA -> Project
DEFINE TABLE refer_to TYPE RELATION SCHEMAFULL;
DEFINE FIELD props ON TABLE refer_to TYPE object FLEXIBLE DEFAULT {};
";

// -----------------------------------------------------------------------
// Public API
// -----------------------------------------------------------------------

/// Run all pending migrations against the given SurrealDB client.
///
/// Applied versions are recorded in `_migration`, so calling this on an
/// up-to-date database is a no-op.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    let mut result = db
        .query("SELECT version FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let records: Vec<MigrationRecord> = result.take(0)?;
    let current_version = records.first().map(|m| m.version).unwrap_or(0);

    for migration in MIGRATIONS {
        if migration.version <= current_version {
            continue;
        }
        info!(
            version = migration.version,
            name = migration.name,
            "Applying migration"
        );
        db.query(migration.sql).await?.check().map_err(|e| {
            DbError::Migration(format!(
                "Migration v{} '{}' failed: {}",
                migration.version, migration.name, e,
            ))
        })?;

        db.query(
            "CREATE _migration SET version = $version, \
             name = $name",
        )
        .bind(("version", migration.version))
        .bind(("name", migration.name))
        .await?
        .check()
        .map_err(|e| {
            DbError::Migration(format!(
                "Failed to record migration v{}: {}",
                migration.version, e,
            ))
        })?;

        info!(version = migration.version, "Migration applied");
    }

    Ok(())
}

/// The DDL of the initial schema.
pub fn schema_v1() -> &'static str {
    SCHEMA_V1
}

#[cfg(test)]
mod tests {
    use super::*;
    use fedreg_core::graph::{Label, Relation};

    #[test]
    fn migrations_are_ordered() {
        for window in MIGRATIONS.windows(2) {
            assert!(
                window[0].version < window[1].version,
                "Migrations must be in ascending version order"
            );
        }
    }

    #[test]
    fn schema_defines_every_label() {
        for label in Label::ALL {
            let ddl = format!("DEFINE TABLE {} SCHEMAFULL;", label.table());
            assert!(SCHEMA_V1.contains(&ddl), "missing table {label}");
        }
    }

    #[test]
    fn schema_defines_every_relation() {
        for rel in Relation::ALL {
            let ddl = format!("DEFINE TABLE {} TYPE RELATION SCHEMAFULL;", rel.edge());
            assert!(SCHEMA_V1.contains(&ddl), "missing edge {rel}");
        }
    }
}
