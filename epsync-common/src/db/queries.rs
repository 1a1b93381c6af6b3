//! Temporal read queries over the persisted model.
//!
//! Read-only consumers (query APIs, admin views) answer two kinds of
//! question: who holds a role now, and who held it on a given date. "Now"
//! is the far-future sentinel on the assignment's end date; date queries
//! compare against the stored interval bounds.

use crate::db::models::{
    CommitteeRole, CountryMandate, DelegationRole, Group, GroupMembership, Mep, OrganizationRole,
    Party,
};
use crate::period::FAR_FUTURE;
use crate::Result;
use chrono::NaiveDate;
use sqlx::SqlitePool;

/// A group together with its active-member count.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct GroupMemberCount {
    pub guid: String,
    pub abbreviation: String,
    pub name: String,
    pub member_count: i64,
}

/// All members marked active, ordered by last name.
pub async fn active_meps(pool: &SqlitePool) -> Result<Vec<Mep>> {
    let meps = sqlx::query_as::<_, Mep>("SELECT * FROM meps WHERE active = 1 ORDER BY last_name")
        .fetch_all(pool)
        .await?;
    Ok(meps)
}

/// Look up a member by its external identifier.
pub async fn mep_by_ep_id(pool: &SqlitePool, ep_id: i64) -> Result<Option<Mep>> {
    let mep = sqlx::query_as::<_, Mep>("SELECT * FROM meps WHERE ep_id = ?")
        .bind(ep_id)
        .fetch_optional(pool)
        .await?;
    Ok(mep)
}

pub async fn group_by_abbreviation(pool: &SqlitePool, abbreviation: &str) -> Result<Option<Group>> {
    let group = sqlx::query_as::<_, Group>("SELECT * FROM groups WHERE abbreviation = ?")
        .bind(abbreviation)
        .fetch_optional(pool)
        .await?;
    Ok(group)
}

/// Active members of a group, via any membership record.
pub async fn active_group_members(pool: &SqlitePool, group_guid: &str) -> Result<Vec<Mep>> {
    let meps = sqlx::query_as::<_, Mep>(
        r#"
        SELECT DISTINCT m.* FROM meps m
        JOIN group_memberships gm ON gm.mep_id = m.guid
        WHERE gm.group_id = ? AND m.active = 1
        ORDER BY m.last_name
        "#,
    )
    .bind(group_guid)
    .fetch_all(pool)
    .await?;
    Ok(meps)
}

/// Members of a group on a given date (membership interval contains it).
pub async fn group_members_on(
    pool: &SqlitePool,
    group_guid: &str,
    date: NaiveDate,
) -> Result<Vec<Mep>> {
    let meps = sqlx::query_as::<_, Mep>(
        r#"
        SELECT DISTINCT m.* FROM meps m
        JOIN group_memberships gm ON gm.mep_id = m.guid
        WHERE gm.group_id = ? AND gm.begin_date <= ? AND gm.end_date >= ?
        ORDER BY m.last_name
        "#,
    )
    .bind(group_guid)
    .bind(date)
    .bind(date)
    .fetch_all(pool)
    .await?;
    Ok(meps)
}

/// Groups ordered by their number of active members, descending.
pub async fn groups_by_member_count(pool: &SqlitePool) -> Result<Vec<GroupMemberCount>> {
    let counts = sqlx::query_as::<_, GroupMemberCount>(
        r#"
        SELECT g.guid, g.abbreviation, g.name, COUNT(DISTINCT gm.mep_id) AS member_count
        FROM groups g
        JOIN group_memberships gm ON gm.group_id = g.guid
        JOIN meps m ON m.guid = gm.mep_id
        WHERE m.active = 1
        GROUP BY g.guid
        ORDER BY member_count DESC
        "#,
    )
    .fetch_all(pool)
    .await?;
    Ok(counts)
}

/// A member's group memberships, most recently ended first.
pub async fn group_memberships_for(pool: &SqlitePool, mep_guid: &str) -> Result<Vec<GroupMembership>> {
    let rows = sqlx::query_as::<_, GroupMembership>(
        "SELECT * FROM group_memberships WHERE mep_id = ? ORDER BY end_date DESC, begin_date DESC",
    )
    .bind(mep_guid)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// A member's committee roles, most recently ended first.
pub async fn committee_roles_for(pool: &SqlitePool, mep_guid: &str) -> Result<Vec<CommitteeRole>> {
    let rows = sqlx::query_as::<_, CommitteeRole>(
        "SELECT * FROM committee_roles WHERE mep_id = ? ORDER BY end_date DESC, begin_date DESC",
    )
    .bind(mep_guid)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// A member's delegation roles, most recently ended first.
pub async fn delegation_roles_for(pool: &SqlitePool, mep_guid: &str) -> Result<Vec<DelegationRole>> {
    let rows = sqlx::query_as::<_, DelegationRole>(
        "SELECT * FROM delegation_roles WHERE mep_id = ? ORDER BY end_date DESC, begin_date DESC",
    )
    .bind(mep_guid)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// A member's organization roles, most recently ended first.
pub async fn organization_roles_for(
    pool: &SqlitePool,
    mep_guid: &str,
) -> Result<Vec<OrganizationRole>> {
    let rows = sqlx::query_as::<_, OrganizationRole>(
        "SELECT * FROM organization_roles WHERE mep_id = ? ORDER BY end_date DESC, begin_date DESC",
    )
    .bind(mep_guid)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// A member's mandates, most recently ended first.
pub async fn mandates_for(pool: &SqlitePool, mep_guid: &str) -> Result<Vec<CountryMandate>> {
    let rows = sqlx::query_as::<_, CountryMandate>(
        "SELECT * FROM country_mandates WHERE mep_id = ? ORDER BY end_date DESC, begin_date DESC",
    )
    .bind(mep_guid)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// A member's closed-out mandates, most recently ended first.
pub async fn previous_mandates(pool: &SqlitePool, mep_guid: &str) -> Result<Vec<CountryMandate>> {
    let rows = sqlx::query_as::<_, CountryMandate>(
        r#"
        SELECT * FROM country_mandates
        WHERE mep_id = ? AND end_date IS NOT NULL AND end_date < ?
        ORDER BY end_date DESC, begin_date DESC
        "#,
    )
    .bind(mep_guid)
    .bind(*FAR_FUTURE)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// The party held during a member's latest mandate.
pub async fn current_party(pool: &SqlitePool, mep_guid: &str) -> Result<Option<Party>> {
    let party = sqlx::query_as::<_, Party>(
        r#"
        SELECT p.* FROM parties p
        JOIN country_mandates cm ON cm.party_id = p.guid
        WHERE cm.mep_id = ?
        ORDER BY cm.end_date DESC, cm.begin_date DESC
        LIMIT 1
        "#,
    )
    .bind(mep_guid)
    .fetch_optional(pool)
    .await?;
    Ok(party)
}
