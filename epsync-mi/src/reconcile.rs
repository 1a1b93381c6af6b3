//! Role reconciliation.
//!
//! For one person and one role-kind, the set of persisted assignments is
//! replaced wholesale by the set described in the incoming snapshot:
//! delete everything of that kind, then recreate from the incoming list.
//! No merging of individual records across runs, which also makes reruns
//! idempotent.
//!
//! A single unusable entry (missing natural key, unknown country,
//! inconsistent period) is skipped with a warning; an unparseable date
//! string marks the whole record malformed.

use crate::aliases::GroupAliases;
use crate::error::{RecordError, UpsertError};
use crate::feed::{parse_feed_date, ConstituencyEntry, GroupEntry, RoleEntry};
use crate::repository::{
    self, NewCommittee, NewDelegation, NewGroup, NewOrganization, NewParty,
};
use epsync_common::TimePeriod;
use sqlx::SqliteConnection;
use tracing::warn;
use uuid::Uuid;

pub struct RoleReconciler {
    aliases: GroupAliases,
}

impl RoleReconciler {
    pub fn new(aliases: GroupAliases) -> Self {
        Self { aliases }
    }

    /// Replace a person's committee roles.
    ///
    /// Committees are resolved by abbreviation only: an entry without one
    /// cannot name a stable committee and is skipped with a warning.
    pub async fn replace_committee_roles(
        &self,
        conn: &mut SqliteConnection,
        mep_guid: &str,
        entries: &[RoleEntry],
    ) -> Result<(), UpsertError> {
        sqlx::query("DELETE FROM committee_roles WHERE mep_id = ?")
            .bind(mep_guid)
            .execute(&mut *conn)
            .await?;

        for entry in entries {
            let Some(abbreviation) = entry.committee_id.as_deref().filter(|a| !a.is_empty())
            else {
                warn!(
                    organization = entry.organization.as_deref().unwrap_or("?"),
                    "committee entry without abbreviation, skipping"
                );
                continue;
            };
            let Some(role) = entry.role.as_deref() else {
                warn!(committee = abbreviation, "committee entry without role, skipping");
                continue;
            };
            let Some(period) = entry_period(entry.start.as_deref(), entry.end.as_deref())? else {
                warn!(committee = abbreviation, "inconsistent period, skipping");
                continue;
            };

            let committee = NewCommittee {
                abbreviation,
                name: entry.organization.as_deref().unwrap_or(abbreviation),
            };
            let committee_guid = repository::resolve_or_create(conn, &committee).await?;

            sqlx::query(
                r#"
                INSERT INTO committee_roles (guid, mep_id, committee_id, role, begin_date, end_date)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(mep_guid)
            .bind(&committee_guid)
            .bind(role)
            .bind(period.begin)
            .bind(period.end)
            .execute(&mut *conn)
            .await?;
        }

        Ok(())
    }

    /// Replace a person's delegation roles. Delegations are created on
    /// first reference, keyed by name.
    pub async fn replace_delegation_roles(
        &self,
        conn: &mut SqliteConnection,
        mep_guid: &str,
        entries: &[RoleEntry],
    ) -> Result<(), UpsertError> {
        sqlx::query("DELETE FROM delegation_roles WHERE mep_id = ?")
            .bind(mep_guid)
            .execute(&mut *conn)
            .await?;

        for entry in entries {
            let Some(name) = entry.organization.as_deref().filter(|n| !n.is_empty()) else {
                warn!("delegation entry without name, skipping");
                continue;
            };
            let Some(role) = entry.role.as_deref() else {
                warn!(delegation = name, "delegation entry without role, skipping");
                continue;
            };
            let Some(period) = entry_period(entry.start.as_deref(), entry.end.as_deref())? else {
                warn!(delegation = name, "inconsistent period, skipping");
                continue;
            };

            let delegation_guid =
                repository::resolve_or_create(conn, &NewDelegation { name }).await?;

            sqlx::query(
                r#"
                INSERT INTO delegation_roles (guid, mep_id, delegation_id, role, begin_date, end_date)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(mep_guid)
            .bind(&delegation_guid)
            .bind(role)
            .bind(period.begin)
            .bind(period.end)
            .execute(&mut *conn)
            .await?;
        }

        Ok(())
    }

    /// Replace a person's organization roles (the feed's Staff list).
    pub async fn replace_organization_roles(
        &self,
        conn: &mut SqliteConnection,
        mep_guid: &str,
        entries: &[RoleEntry],
    ) -> Result<(), UpsertError> {
        sqlx::query("DELETE FROM organization_roles WHERE mep_id = ?")
            .bind(mep_guid)
            .execute(&mut *conn)
            .await?;

        for entry in entries {
            let Some(name) = entry.organization.as_deref().filter(|n| !n.is_empty()) else {
                warn!("organization entry without name, skipping");
                continue;
            };
            let Some(role) = entry.role.as_deref() else {
                warn!(organization = name, "organization entry without role, skipping");
                continue;
            };
            let Some(period) = entry_period(entry.start.as_deref(), entry.end.as_deref())? else {
                warn!(organization = name, "inconsistent period, skipping");
                continue;
            };

            let organization_guid =
                repository::resolve_or_create(conn, &NewOrganization { name }).await?;

            sqlx::query(
                r#"
                INSERT INTO organization_roles (guid, mep_id, organization_id, role, begin_date, end_date)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(mep_guid)
            .bind(&organization_guid)
            .bind(role)
            .bind(period.begin)
            .bind(period.end)
            .execute(&mut *conn)
            .await?;
        }

        Ok(())
    }

    /// Replace a person's group memberships.
    ///
    /// The abbreviation may arrive as a list (first element wins) and may
    /// be a legacy code translated through the alias table.
    pub async fn replace_group_memberships(
        &self,
        conn: &mut SqliteConnection,
        mep_guid: &str,
        entries: &[GroupEntry],
    ) -> Result<(), UpsertError> {
        sqlx::query("DELETE FROM group_memberships WHERE mep_id = ?")
            .bind(mep_guid)
            .execute(&mut *conn)
            .await?;

        for entry in entries {
            let Some(raw_abbreviation) = entry
                .group_id
                .as_ref()
                .and_then(|id| id.first())
                .map(String::as_str)
                .filter(|a| !a.is_empty())
            else {
                continue;
            };
            let abbreviation = self.aliases.canonical(raw_abbreviation);
            let Some(role) = entry.role.as_deref() else {
                warn!(group = abbreviation, "group entry without role, skipping");
                continue;
            };
            let Some(period) = entry_period(entry.start.as_deref(), entry.end.as_deref())? else {
                warn!(group = abbreviation, "inconsistent period, skipping");
                continue;
            };

            let group = NewGroup {
                abbreviation,
                name: entry.organization.as_deref().unwrap_or(abbreviation),
            };
            let group_guid = repository::resolve_or_create(conn, &group).await?;

            sqlx::query(
                r#"
                INSERT INTO group_memberships (guid, mep_id, group_id, role, begin_date, end_date)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(mep_guid)
            .bind(&group_guid)
            .bind(role)
            .bind(period.begin)
            .bind(period.end)
            .execute(&mut *conn)
            .await?;
        }

        Ok(())
    }

    /// Replace a person's country mandates and the party-affiliation
    /// markers maintained alongside them.
    ///
    /// Countries are stable reference data resolved by strict lookup; a
    /// mandate for an unknown country is skipped. A mandate without a
    /// party field falls back to the country's placeholder "unknown"
    /// party, and only mandates that do name a party maintain an
    /// affiliation marker. A mandate with no end date is current.
    pub async fn replace_country_mandates(
        &self,
        conn: &mut SqliteConnection,
        mep_guid: &str,
        entries: &[ConstituencyEntry],
    ) -> Result<(), UpsertError> {
        sqlx::query("DELETE FROM party_affiliations WHERE mep_id = ?")
            .bind(mep_guid)
            .execute(&mut *conn)
            .await?;
        sqlx::query("DELETE FROM country_mandates WHERE mep_id = ?")
            .bind(mep_guid)
            .execute(&mut *conn)
            .await?;

        for entry in entries {
            let Some(country_name) = entry.country.as_deref().filter(|c| !c.is_empty()) else {
                warn!("mandate entry without country, skipping");
                continue;
            };
            let Some(country_guid) = repository::country_by_name(conn, country_name).await? else {
                warn!(country = country_name, "unknown country, skipping mandate");
                continue;
            };

            let party = NewParty {
                name: entry.party.as_deref().unwrap_or("unknown"),
                country_id: &country_guid,
            };
            let party_guid = repository::resolve_or_create(conn, &party).await?;

            if entry.party.is_some() {
                let current = entry.end.is_none();
                let existing: Option<String> = sqlx::query_scalar(
                    "SELECT guid FROM party_affiliations WHERE mep_id = ? AND party_id = ?",
                )
                .bind(mep_guid)
                .bind(&party_guid)
                .fetch_optional(&mut *conn)
                .await?;
                if existing.is_none() {
                    sqlx::query(
                        "INSERT INTO party_affiliations (guid, mep_id, party_id, current) VALUES (?, ?, ?, ?)",
                    )
                    .bind(Uuid::new_v4().to_string())
                    .bind(mep_guid)
                    .bind(&party_guid)
                    .bind(current)
                    .execute(&mut *conn)
                    .await?;
                }
            }

            let Some(period) = entry_period(entry.start.as_deref(), entry.end.as_deref())? else {
                warn!(country = country_name, "inconsistent period, skipping mandate");
                continue;
            };

            sqlx::query(
                r#"
                INSERT INTO country_mandates (guid, mep_id, country_id, party_id, begin_date, end_date)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(mep_guid)
            .bind(&country_guid)
            .bind(&party_guid)
            .bind(period.begin)
            .bind(period.end)
            .execute(&mut *conn)
            .await?;
        }

        Ok(())
    }
}

/// Parse an entry's validity period.
///
/// A missing end date means the assignment is still running and maps to
/// the far-future sentinel. Returns `Ok(None)` for a parseable but
/// inconsistent period (begin after end), which callers skip per entry;
/// an unparseable date string is a record-level error.
fn entry_period(
    start: Option<&str>,
    end: Option<&str>,
) -> Result<Option<TimePeriod>, RecordError> {
    let begin = start.map(parse_feed_date).transpose()?;
    match end {
        Some(raw) => {
            let end = parse_feed_date(raw)?;
            Ok(TimePeriod::new(begin, Some(end)).ok())
        }
        None => Ok(Some(TimePeriod::open_ended(begin))),
    }
}
