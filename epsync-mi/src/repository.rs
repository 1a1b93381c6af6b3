//! Get-or-create resolution of reference entities.
//!
//! Reference entities (groups, committees, delegations, organizations,
//! parties, buildings, assistants) are identified by a natural key unique
//! within their kind. Resolution is first-write-wins: an existing row is
//! returned untouched and attributes carried by later snapshots are never
//! applied to it.

use sqlx::query::Query;
use sqlx::sqlite::SqliteArguments;
use sqlx::{Row, Sqlite, SqliteConnection};
use tracing::debug;
use uuid::Uuid;

/// A reference-entity kind resolvable or creatable by natural key.
pub trait ReferenceEntity {
    const TABLE: &'static str;
    const LOOKUP_SQL: &'static str;
    const INSERT_SQL: &'static str;

    /// Natural key, for log messages.
    fn natural_key(&self) -> String;

    /// Bind the lookup key(s) in the placeholder order of `LOOKUP_SQL`.
    fn bind_lookup<'q>(
        &'q self,
        query: Query<'q, Sqlite, SqliteArguments<'q>>,
    ) -> Query<'q, Sqlite, SqliteArguments<'q>>;

    /// Bind the insert values in the placeholder order of `INSERT_SQL`.
    fn bind_insert<'q>(
        &'q self,
        query: Query<'q, Sqlite, SqliteArguments<'q>>,
        guid: &'q str,
    ) -> Query<'q, Sqlite, SqliteArguments<'q>>;
}

/// Look up an entity guid by natural key without creating it.
pub async fn lookup<E: ReferenceEntity>(
    conn: &mut SqliteConnection,
    entity: &E,
) -> Result<Option<String>, sqlx::Error> {
    let row = entity
        .bind_lookup(sqlx::query(E::LOOKUP_SQL))
        .fetch_optional(&mut *conn)
        .await?;
    row.map(|r| r.try_get(0)).transpose()
}

/// Resolve an entity by natural key, inserting it when absent.
///
/// Idempotent within and across runs: repeated calls with the same
/// natural key return the same guid and never create a duplicate.
pub async fn resolve_or_create<E: ReferenceEntity>(
    conn: &mut SqliteConnection,
    entity: &E,
) -> Result<String, sqlx::Error> {
    if let Some(guid) = lookup(conn, entity).await? {
        return Ok(guid);
    }

    let guid = Uuid::new_v4().to_string();
    entity
        .bind_insert(sqlx::query(E::INSERT_SQL), &guid)
        .execute(&mut *conn)
        .await?;
    debug!(
        table = E::TABLE,
        key = %entity.natural_key(),
        "created reference entity"
    );
    Ok(guid)
}

/// Strict country lookup. Countries are seeded reference data and never
/// auto-created during import.
pub async fn country_by_name(
    conn: &mut SqliteConnection,
    name: &str,
) -> Result<Option<String>, sqlx::Error> {
    sqlx::query_scalar("SELECT guid FROM countries WHERE name = ?")
        .bind(name)
        .fetch_optional(conn)
        .await
}

/// Parliamentary group, keyed by abbreviation.
pub struct NewGroup<'a> {
    pub abbreviation: &'a str,
    pub name: &'a str,
}

impl ReferenceEntity for NewGroup<'_> {
    const TABLE: &'static str = "groups";
    const LOOKUP_SQL: &'static str = "SELECT guid FROM groups WHERE abbreviation = ?";
    const INSERT_SQL: &'static str =
        "INSERT INTO groups (guid, abbreviation, name) VALUES (?, ?, ?)";

    fn natural_key(&self) -> String {
        self.abbreviation.to_string()
    }

    fn bind_lookup<'q>(
        &'q self,
        query: Query<'q, Sqlite, SqliteArguments<'q>>,
    ) -> Query<'q, Sqlite, SqliteArguments<'q>> {
        query.bind(self.abbreviation)
    }

    fn bind_insert<'q>(
        &'q self,
        query: Query<'q, Sqlite, SqliteArguments<'q>>,
        guid: &'q str,
    ) -> Query<'q, Sqlite, SqliteArguments<'q>> {
        query.bind(guid).bind(self.abbreviation).bind(self.name)
    }
}

/// Committee, keyed by abbreviation. A stable abbreviation is required to
/// create one; the reconciler refuses entries without it.
pub struct NewCommittee<'a> {
    pub abbreviation: &'a str,
    pub name: &'a str,
}

impl ReferenceEntity for NewCommittee<'_> {
    const TABLE: &'static str = "committees";
    const LOOKUP_SQL: &'static str = "SELECT guid FROM committees WHERE abbreviation = ?";
    const INSERT_SQL: &'static str =
        "INSERT INTO committees (guid, abbreviation, name) VALUES (?, ?, ?)";

    fn natural_key(&self) -> String {
        self.abbreviation.to_string()
    }

    fn bind_lookup<'q>(
        &'q self,
        query: Query<'q, Sqlite, SqliteArguments<'q>>,
    ) -> Query<'q, Sqlite, SqliteArguments<'q>> {
        query.bind(self.abbreviation)
    }

    fn bind_insert<'q>(
        &'q self,
        query: Query<'q, Sqlite, SqliteArguments<'q>>,
        guid: &'q str,
    ) -> Query<'q, Sqlite, SqliteArguments<'q>> {
        query.bind(guid).bind(self.abbreviation).bind(self.name)
    }
}

/// Interparliamentary delegation, keyed by name.
pub struct NewDelegation<'a> {
    pub name: &'a str,
}

impl ReferenceEntity for NewDelegation<'_> {
    const TABLE: &'static str = "delegations";
    const LOOKUP_SQL: &'static str = "SELECT guid FROM delegations WHERE name = ?";
    const INSERT_SQL: &'static str = "INSERT INTO delegations (guid, name) VALUES (?, ?)";

    fn natural_key(&self) -> String {
        self.name.to_string()
    }

    fn bind_lookup<'q>(
        &'q self,
        query: Query<'q, Sqlite, SqliteArguments<'q>>,
    ) -> Query<'q, Sqlite, SqliteArguments<'q>> {
        query.bind(self.name)
    }

    fn bind_insert<'q>(
        &'q self,
        query: Query<'q, Sqlite, SqliteArguments<'q>>,
        guid: &'q str,
    ) -> Query<'q, Sqlite, SqliteArguments<'q>> {
        query.bind(guid).bind(self.name)
    }
}

/// Parliament-internal organization, keyed by name.
pub struct NewOrganization<'a> {
    pub name: &'a str,
}

impl ReferenceEntity for NewOrganization<'_> {
    const TABLE: &'static str = "organizations";
    const LOOKUP_SQL: &'static str = "SELECT guid FROM organizations WHERE name = ?";
    const INSERT_SQL: &'static str = "INSERT INTO organizations (guid, name) VALUES (?, ?)";

    fn natural_key(&self) -> String {
        self.name.to_string()
    }

    fn bind_lookup<'q>(
        &'q self,
        query: Query<'q, Sqlite, SqliteArguments<'q>>,
    ) -> Query<'q, Sqlite, SqliteArguments<'q>> {
        query.bind(self.name)
    }

    fn bind_insert<'q>(
        &'q self,
        query: Query<'q, Sqlite, SqliteArguments<'q>>,
        guid: &'q str,
    ) -> Query<'q, Sqlite, SqliteArguments<'q>> {
        query.bind(guid).bind(self.name)
    }
}

/// National party, keyed by name scoped to its country.
pub struct NewParty<'a> {
    pub name: &'a str,
    pub country_id: &'a str,
}

impl ReferenceEntity for NewParty<'_> {
    const TABLE: &'static str = "parties";
    const LOOKUP_SQL: &'static str = "SELECT guid FROM parties WHERE name = ? AND country_id = ?";
    const INSERT_SQL: &'static str =
        "INSERT INTO parties (guid, name, country_id) VALUES (?, ?, ?)";

    fn natural_key(&self) -> String {
        self.name.to_string()
    }

    fn bind_lookup<'q>(
        &'q self,
        query: Query<'q, Sqlite, SqliteArguments<'q>>,
    ) -> Query<'q, Sqlite, SqliteArguments<'q>> {
        query.bind(self.name).bind(self.country_id)
    }

    fn bind_insert<'q>(
        &'q self,
        query: Query<'q, Sqlite, SqliteArguments<'q>>,
        guid: &'q str,
    ) -> Query<'q, Sqlite, SqliteArguments<'q>> {
        query.bind(guid).bind(self.name).bind(self.country_id)
    }
}

/// Parliament building, keyed by the feed's building code.
pub struct NewBuilding<'a> {
    pub code: &'a str,
    pub name: &'a str,
    pub street: &'a str,
    pub postcode: &'a str,
}

impl ReferenceEntity for NewBuilding<'_> {
    const TABLE: &'static str = "buildings";
    const LOOKUP_SQL: &'static str = "SELECT guid FROM buildings WHERE code = ?";
    const INSERT_SQL: &'static str =
        "INSERT INTO buildings (guid, code, name, street, postcode) VALUES (?, ?, ?, ?, ?)";

    fn natural_key(&self) -> String {
        self.code.to_string()
    }

    fn bind_lookup<'q>(
        &'q self,
        query: Query<'q, Sqlite, SqliteArguments<'q>>,
    ) -> Query<'q, Sqlite, SqliteArguments<'q>> {
        query.bind(self.code)
    }

    fn bind_insert<'q>(
        &'q self,
        query: Query<'q, Sqlite, SqliteArguments<'q>>,
        guid: &'q str,
    ) -> Query<'q, Sqlite, SqliteArguments<'q>> {
        query
            .bind(guid)
            .bind(self.code)
            .bind(self.name)
            .bind(self.street)
            .bind(self.postcode)
    }
}

/// Accredited assistant, keyed by full name.
pub struct NewAssistant<'a> {
    pub full_name: &'a str,
}

impl ReferenceEntity for NewAssistant<'_> {
    const TABLE: &'static str = "assistants";
    const LOOKUP_SQL: &'static str = "SELECT guid FROM assistants WHERE full_name = ?";
    const INSERT_SQL: &'static str = "INSERT INTO assistants (guid, full_name) VALUES (?, ?)";

    fn natural_key(&self) -> String {
        self.full_name.to_string()
    }

    fn bind_lookup<'q>(
        &'q self,
        query: Query<'q, Sqlite, SqliteArguments<'q>>,
    ) -> Query<'q, Sqlite, SqliteArguments<'q>> {
        query.bind(self.full_name)
    }

    fn bind_insert<'q>(
        &'q self,
        query: Query<'q, Sqlite, SqliteArguments<'q>>,
        guid: &'q str,
    ) -> Query<'q, Sqlite, SqliteArguments<'q>> {
        query.bind(guid).bind(self.full_name)
    }
}
