//! Database initialization
//!
//! Creates the database on first run and brings the schema up to date.
//! Schema creation is idempotent (`CREATE TABLE IF NOT EXISTS`) so every
//! startup runs through the same path.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;
use uuid::Uuid;

const SCHEMA_VERSION: i64 = 1;

/// Countries represented in the chamber, seeded as stable reference data.
/// The name column must match the country names used by the snapshot feed.
const COUNTRIES: &[(&str, &str)] = &[
    ("AT", "Austria"),
    ("BE", "Belgium"),
    ("BG", "Bulgaria"),
    ("HR", "Croatia"),
    ("CY", "Cyprus"),
    ("CZ", "Czech Republic"),
    ("DK", "Denmark"),
    ("EE", "Estonia"),
    ("FI", "Finland"),
    ("FR", "France"),
    ("DE", "Germany"),
    ("GR", "Greece"),
    ("HU", "Hungary"),
    ("IE", "Ireland"),
    ("IT", "Italy"),
    ("LV", "Latvia"),
    ("LT", "Lithuania"),
    ("LU", "Luxembourg"),
    ("MT", "Malta"),
    ("NL", "Netherlands"),
    ("PL", "Poland"),
    ("PT", "Portugal"),
    ("RO", "Romania"),
    ("SK", "Slovakia"),
    ("SI", "Slovenia"),
    ("ES", "Spain"),
    ("SE", "Sweden"),
    ("GB", "United Kingdom"),
];

/// Initialize the database connection pool and create tables if needed.
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // Enable foreign keys
    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;

    // WAL allows concurrent readers while the import holds the writer
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;

    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    create_schema(&pool).await?;

    Ok(pool)
}

/// Create all tables, indexes and seeded reference data.
///
/// Safe to call on every startup; existing rows are left untouched.
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_schema_version_table(pool).await?;

    // Reference entities
    create_countries_table(pool).await?;
    create_groups_table(pool).await?;
    create_committees_table(pool).await?;
    create_delegations_table(pool).await?;
    create_organizations_table(pool).await?;
    create_parties_table(pool).await?;
    create_buildings_table(pool).await?;
    create_assistants_table(pool).await?;

    // Persons
    create_meps_table(pool).await?;

    // Role assignments
    create_group_memberships_table(pool).await?;
    create_committee_roles_table(pool).await?;
    create_delegation_roles_table(pool).await?;
    create_organization_roles_table(pool).await?;
    create_country_mandates_table(pool).await?;
    create_party_affiliations_table(pool).await?;

    // Auxiliary per-person collections
    create_assistant_terms_table(pool).await?;
    create_emails_table(pool).await?;
    create_websites_table(pool).await?;
    create_cvs_table(pool).await?;
    create_postal_addresses_table(pool).await?;
    create_name_variations_table(pool).await?;

    seed_countries(pool).await?;

    Ok(())
}

async fn create_schema_version_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("INSERT OR IGNORE INTO schema_version (version) VALUES (?)")
        .bind(SCHEMA_VERSION)
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_countries_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS countries (
            guid TEXT PRIMARY KEY,
            code TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL UNIQUE,
            CHECK (length(code) = 2)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_groups_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS groups (
            guid TEXT PRIMARY KEY,
            abbreviation TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_committees_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS committees (
            guid TEXT PRIMARY KEY,
            abbreviation TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_delegations_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS delegations (
            guid TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_organizations_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS organizations (
            guid TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// National parties are scoped to their country: the same party name in
/// two countries is two distinct parties.
async fn create_parties_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS parties (
            guid TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            country_id TEXT REFERENCES countries(guid),
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            UNIQUE (name, country_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_buildings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS buildings (
            guid TEXT PRIMARY KEY,
            code TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            street TEXT NOT NULL,
            postcode TEXT NOT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_assistants_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS assistants (
            guid TEXT PRIMARY KEY,
            full_name TEXT NOT NULL UNIQUE,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the meps table
///
/// One row per member, keyed by the feed's immutable external identifier
/// (`ep_id`). Office fields are flattened per campus.
async fn create_meps_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS meps (
            guid TEXT PRIMARY KEY,
            ep_id INTEGER NOT NULL UNIQUE,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            full_name TEXT,
            gender TEXT CHECK (gender IS NULL OR gender IN ('M', 'F')),
            birth_date TEXT,
            birth_place TEXT,
            active INTEGER NOT NULL DEFAULT 0,
            bxl_building_id TEXT REFERENCES buildings(guid),
            bxl_floor TEXT,
            bxl_office_number TEXT,
            bxl_fax TEXT,
            bxl_phone1 TEXT,
            bxl_phone2 TEXT,
            stg_building_id TEXT REFERENCES buildings(guid),
            stg_floor TEXT,
            stg_office_number TEXT,
            stg_fax TEXT,
            stg_phone1 TEXT,
            stg_phone2 TEXT,
            total_score REAL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_meps_ep_id ON meps(ep_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_meps_active ON meps(active)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_meps_last_name ON meps(last_name)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_group_memberships_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS group_memberships (
            guid TEXT PRIMARY KEY,
            mep_id TEXT NOT NULL REFERENCES meps(guid) ON DELETE CASCADE,
            group_id TEXT NOT NULL REFERENCES groups(guid),
            role TEXT NOT NULL,
            begin_date TEXT,
            end_date TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_group_memberships_mep ON group_memberships(mep_id)")
        .execute(pool)
        .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_group_memberships_group ON group_memberships(group_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_committee_roles_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS committee_roles (
            guid TEXT PRIMARY KEY,
            mep_id TEXT NOT NULL REFERENCES meps(guid) ON DELETE CASCADE,
            committee_id TEXT NOT NULL REFERENCES committees(guid),
            role TEXT NOT NULL,
            begin_date TEXT,
            end_date TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_committee_roles_mep ON committee_roles(mep_id)")
        .execute(pool)
        .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_committee_roles_committee ON committee_roles(committee_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_delegation_roles_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS delegation_roles (
            guid TEXT PRIMARY KEY,
            mep_id TEXT NOT NULL REFERENCES meps(guid) ON DELETE CASCADE,
            delegation_id TEXT NOT NULL REFERENCES delegations(guid),
            role TEXT NOT NULL,
            begin_date TEXT,
            end_date TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_delegation_roles_mep ON delegation_roles(mep_id)")
        .execute(pool)
        .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_delegation_roles_delegation ON delegation_roles(delegation_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_organization_roles_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS organization_roles (
            guid TEXT PRIMARY KEY,
            mep_id TEXT NOT NULL REFERENCES meps(guid) ON DELETE CASCADE,
            organization_id TEXT NOT NULL REFERENCES organizations(guid),
            role TEXT NOT NULL,
            begin_date TEXT,
            end_date TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_organization_roles_mep ON organization_roles(mep_id)",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_organization_roles_organization ON organization_roles(organization_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the country_mandates table
///
/// A mandate links a member to a constituency country and carries the
/// party affiliation for that mandate instead of a role label.
async fn create_country_mandates_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS country_mandates (
            guid TEXT PRIMARY KEY,
            mep_id TEXT NOT NULL REFERENCES meps(guid) ON DELETE CASCADE,
            country_id TEXT NOT NULL REFERENCES countries(guid),
            party_id TEXT NOT NULL REFERENCES parties(guid),
            begin_date TEXT,
            end_date TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_country_mandates_mep ON country_mandates(mep_id)")
        .execute(pool)
        .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_country_mandates_country ON country_mandates(country_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_party_affiliations_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS party_affiliations (
            guid TEXT PRIMARY KEY,
            mep_id TEXT NOT NULL REFERENCES meps(guid) ON DELETE CASCADE,
            party_id TEXT NOT NULL REFERENCES parties(guid),
            role TEXT,
            current INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_party_affiliations_mep ON party_affiliations(mep_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_assistant_terms_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS assistant_terms (
            guid TEXT PRIMARY KEY,
            mep_id TEXT NOT NULL REFERENCES meps(guid) ON DELETE CASCADE,
            assistant_id TEXT NOT NULL REFERENCES assistants(guid),
            kind TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_assistant_terms_mep ON assistant_terms(mep_id)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_emails_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS emails (
            guid TEXT PRIMARY KEY,
            mep_id TEXT NOT NULL REFERENCES meps(guid) ON DELETE CASCADE,
            address TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_emails_mep ON emails(mep_id)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_websites_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS websites (
            guid TEXT PRIMARY KEY,
            mep_id TEXT NOT NULL REFERENCES meps(guid) ON DELETE CASCADE,
            url TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_websites_mep ON websites(mep_id)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_cvs_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS cvs (
            guid TEXT PRIMARY KEY,
            mep_id TEXT NOT NULL REFERENCES meps(guid) ON DELETE CASCADE,
            title TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_cvs_mep ON cvs(mep_id)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_postal_addresses_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS postal_addresses (
            guid TEXT PRIMARY KEY,
            mep_id TEXT NOT NULL REFERENCES meps(guid) ON DELETE CASCADE,
            addr TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_postal_addresses_mep ON postal_addresses(mep_id)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_name_variations_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS name_variations (
            guid TEXT PRIMARY KEY,
            mep_id TEXT NOT NULL REFERENCES meps(guid) ON DELETE CASCADE,
            name TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_name_variations_mep ON name_variations(mep_id)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Seed the country reference data.
///
/// Countries are stable reference data: resolved by strict lookup during
/// import and exempt from orphan cleanup.
async fn seed_countries(pool: &SqlitePool) -> Result<()> {
    for (code, name) in COUNTRIES {
        sqlx::query("INSERT OR IGNORE INTO countries (guid, code, name) VALUES (?, ?, ?)")
            .bind(Uuid::new_v4().to_string())
            .bind(code)
            .bind(name)
            .execute(pool)
            .await?;
    }

    Ok(())
}
