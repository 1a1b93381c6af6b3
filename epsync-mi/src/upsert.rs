//! Person upsert.
//!
//! Locates or creates a person by the feed's external identifier, applies
//! the scalar fields, then hands each role-kind to the reconciler and
//! replaces the auxiliary collections wholesale. Runs entirely inside the
//! caller's transaction so one record commits or rolls back as a unit.

use crate::error::{RecordError, UpsertError};
use crate::feed::{parse_feed_date, AddressBlock, MemberRecord, OneOrMany};
use crate::office::{self, Campus};
use crate::reconcile::RoleReconciler;
use crate::repository::{self, NewAssistant};
use chrono::NaiveDate;
use sqlx::SqliteConnection;
use std::collections::BTreeMap;
use uuid::Uuid;

pub struct PersonImporter {
    reconciler: RoleReconciler,
}

impl PersonImporter {
    pub fn new(reconciler: RoleReconciler) -> Self {
        Self { reconciler }
    }

    /// Upsert one snapshot record. Returns the person guid and whether
    /// the row was newly created.
    pub async fn upsert(
        &self,
        conn: &mut SqliteConnection,
        record: &MemberRecord,
    ) -> Result<(String, bool), UpsertError> {
        let existing: Option<String> = sqlx::query_scalar("SELECT guid FROM meps WHERE ep_id = ?")
            .bind(record.user_id)
            .fetch_optional(&mut *conn)
            .await?;

        let created = existing.is_none();
        let guid = match existing {
            Some(guid) => guid,
            None => self.create_person(conn, record).await?,
        };

        self.update_scalars(conn, &guid, record, created).await?;

        // Every member sits for a constituency; a record without the list
        // is malformed and rolls back as a whole.
        let constituencies = record
            .constituencies
            .as_deref()
            .ok_or(RecordError::MissingField("Constituencies"))?;

        self.reconciler
            .replace_committee_roles(conn, &guid, &record.committees)
            .await?;
        self.reconciler
            .replace_delegation_roles(conn, &guid, &record.delegations)
            .await?;
        self.reconciler
            .replace_country_mandates(conn, &guid, constituencies)
            .await?;
        self.reconciler
            .replace_group_memberships(conn, &guid, &record.groups)
            .await?;
        self.reconciler
            .replace_organization_roles(conn, &guid, &record.staff)
            .await?;

        self.replace_assistants(conn, &guid, &record.assistants)
            .await?;
        if let Some(addresses) = &record.addresses {
            self.apply_addresses(conn, &guid, addresses).await?;
        }
        self.replace_emails(conn, &guid, record.mail.as_ref())
            .await?;
        self.replace_websites(conn, &guid, record).await?;
        self.replace_cvs(conn, &guid, &record.cv).await?;

        Ok((guid, created))
    }

    /// Insert the bare person row. Name variations are recorded once, at
    /// creation.
    async fn create_person(
        &self,
        conn: &mut SqliteConnection,
        record: &MemberRecord,
    ) -> Result<String, UpsertError> {
        let guid = Uuid::new_v4().to_string();
        sqlx::query("INSERT INTO meps (guid, ep_id, first_name, last_name, active) VALUES (?, ?, '', '', 1)")
            .bind(&guid)
            .bind(record.user_id)
            .execute(&mut *conn)
            .await?;

        for alias in &record.name.aliases {
            sqlx::query("INSERT INTO name_variations (guid, mep_id, name) VALUES (?, ?, ?)")
                .bind(Uuid::new_v4().to_string())
                .bind(&guid)
                .bind(alias)
                .execute(&mut *conn)
                .await?;
        }

        Ok(guid)
    }

    async fn update_scalars(
        &self,
        conn: &mut SqliteConnection,
        guid: &str,
        record: &MemberRecord,
        created: bool,
    ) -> Result<(), UpsertError> {
        let full_name = format!("{} {}", record.name.sur, record.name.family);

        // the feed uses "n/a" where the gender is unknown
        let gender = match record.gender.as_deref() {
            Some("n/a") | None => None,
            Some(gender) => Some(gender),
        };

        let (birth_date, birth_place): (Option<NaiveDate>, Option<&str>) = match &record.birth {
            Some(birth) => (
                birth.date.as_deref().map(parse_feed_date).transpose()?,
                birth.place.as_deref(),
            ),
            None => (None, None),
        };

        // a record reappearing in the snapshot reactivates the person; a
        // brand-new person always starts active
        let active = if created { true } else { record.active };

        sqlx::query(
            r#"
            UPDATE meps SET
                first_name = ?, last_name = ?, full_name = ?, gender = ?,
                birth_date = ?, birth_place = ?, active = ?,
                updated_at = CURRENT_TIMESTAMP
            WHERE guid = ?
            "#,
        )
        .bind(&record.name.sur)
        .bind(&record.name.family)
        .bind(&full_name)
        .bind(gender)
        .bind(birth_date)
        .bind(birth_place)
        .bind(active)
        .bind(guid)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Replace assistant links wholesale. Assistant entities themselves
    /// are shared reference data resolved by full name.
    async fn replace_assistants(
        &self,
        conn: &mut SqliteConnection,
        guid: &str,
        assistants: &BTreeMap<String, Vec<String>>,
    ) -> Result<(), UpsertError> {
        sqlx::query("DELETE FROM assistant_terms WHERE mep_id = ?")
            .bind(guid)
            .execute(&mut *conn)
            .await?;

        for (kind, names) in assistants {
            for name in names {
                if name.is_empty() {
                    continue;
                }
                let assistant_guid =
                    repository::resolve_or_create(conn, &NewAssistant { full_name: name }).await?;
                sqlx::query(
                    "INSERT INTO assistant_terms (guid, mep_id, assistant_id, kind) VALUES (?, ?, ?, ?)",
                )
                .bind(Uuid::new_v4().to_string())
                .bind(guid)
                .bind(&assistant_guid)
                .bind(kind)
                .execute(&mut *conn)
                .await?;
            }
        }

        Ok(())
    }

    async fn apply_addresses(
        &self,
        conn: &mut SqliteConnection,
        guid: &str,
        addresses: &AddressBlock,
    ) -> Result<(), UpsertError> {
        if let Some(brussels) = &addresses.brussels {
            office::apply_campus(conn, guid, Campus::Brussels, brussels).await?;
        }
        if let Some(strasbourg) = &addresses.strasbourg {
            office::apply_campus(conn, guid, Campus::Strasbourg, strasbourg).await?;
        }

        sqlx::query("DELETE FROM postal_addresses WHERE mep_id = ?")
            .bind(guid)
            .execute(&mut *conn)
            .await?;
        for addr in &addresses.postal {
            sqlx::query("INSERT INTO postal_addresses (guid, mep_id, addr) VALUES (?, ?, ?)")
                .bind(Uuid::new_v4().to_string())
                .bind(guid)
                .bind(addr)
                .execute(&mut *conn)
                .await?;
        }

        Ok(())
    }

    /// Replace email addresses. The feed writes either a single address
    /// or a list.
    async fn replace_emails(
        &self,
        conn: &mut SqliteConnection,
        guid: &str,
        mail: Option<&OneOrMany<String>>,
    ) -> Result<(), UpsertError> {
        sqlx::query("DELETE FROM emails WHERE mep_id = ?")
            .bind(guid)
            .execute(&mut *conn)
            .await?;

        if let Some(mail) = mail {
            for address in mail.iter() {
                if address.is_empty() {
                    continue;
                }
                sqlx::query("INSERT INTO emails (guid, mep_id, address) VALUES (?, ?, ?)")
                    .bind(Uuid::new_v4().to_string())
                    .bind(guid)
                    .bind(address)
                    .execute(&mut *conn)
                    .await?;
            }
        }

        Ok(())
    }

    /// Replace websites: homepage plus social links, empty strings
    /// filtered before persisting.
    async fn replace_websites(
        &self,
        conn: &mut SqliteConnection,
        guid: &str,
        record: &MemberRecord,
    ) -> Result<(), UpsertError> {
        sqlx::query("DELETE FROM websites WHERE mep_id = ?")
            .bind(guid)
            .execute(&mut *conn)
            .await?;

        let urls = record
            .homepage
            .iter()
            .chain(record.twitter.iter())
            .chain(record.facebook.iter())
            .filter(|url| !url.is_empty());
        for url in urls {
            sqlx::query("INSERT INTO websites (guid, mep_id, url) VALUES (?, ?, ?)")
                .bind(Uuid::new_v4().to_string())
                .bind(guid)
                .bind(url)
                .execute(&mut *conn)
                .await?;
        }

        Ok(())
    }

    /// Replace CV entries, skipping blanks.
    async fn replace_cvs(
        &self,
        conn: &mut SqliteConnection,
        guid: &str,
        cv: &[String],
    ) -> Result<(), UpsertError> {
        sqlx::query("DELETE FROM cvs WHERE mep_id = ?")
            .bind(guid)
            .execute(&mut *conn)
            .await?;

        for title in cv {
            if title.trim().is_empty() {
                continue;
            }
            sqlx::query("INSERT INTO cvs (guid, mep_id, title) VALUES (?, ?, ?)")
                .bind(Uuid::new_v4().to_string())
                .bind(guid)
                .bind(title)
                .execute(&mut *conn)
                .await?;
        }

        Ok(())
    }
}
