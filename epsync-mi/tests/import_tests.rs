//! End-to-end import tests: full snapshots driven through the snapshot
//! driver against an in-memory database.

use epsync_mi::aliases::GroupAliases;
use epsync_mi::driver::{ImportStats, SnapshotDriver};
use epsync_mi::feed::{decode_record, RecordResult};
use epsync_mi::reconcile::RoleReconciler;
use epsync_mi::upsert::PersonImporter;
use serde_json::{json, Value};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

// Single connection so every transaction sees the same in-memory
// database.
async fn memory_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    epsync_common::db::create_schema(&pool).await.unwrap();
    pool
}

fn driver(pool: &SqlitePool) -> SnapshotDriver {
    let importer = PersonImporter::new(RoleReconciler::new(GroupAliases::default()));
    SnapshotDriver::new(pool.clone(), importer)
}

/// A plausible snapshot record with one current mandate.
fn member(user_id: i64, sur: &str, family: &str) -> Value {
    json!({
        "UserID": user_id,
        "Name": {
            "sur": sur,
            "family": family,
            "full": format!("{sur} {family}"),
            "aliases": [format!("{} {}", family.to_uppercase(), sur)]
        },
        "Gender": "M",
        "Birth": {"date": "1965-03-11T00:09:00", "place": "Lyon"},
        "active": true,
        "Constituencies": [
            {"country": "France", "party": "Parti Socialiste", "start": "2009-07-14T00:09:00"}
        ]
    })
}

fn records(values: Vec<Value>) -> Vec<RecordResult> {
    values.into_iter().map(decode_record).collect()
}

async fn run(pool: &SqlitePool, values: Vec<Value>) -> ImportStats {
    driver(pool).run(records(values)).await.unwrap()
}

async fn count(pool: &SqlitePool, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(pool)
        .await
        .unwrap()
}

#[tokio::test]
async fn fresh_import_creates_active_person() {
    let pool = memory_pool().await;

    let mut record = member(42, "Jean", "Dupont");
    record["Committees"] = json!([
        {"committee_id": "ENVI", "Organization": "Committee on the Environment", "role": "Member",
         "start": "2009-07-16T00:09:00"}
    ]);
    record["Groups"] = json!([
        {"groupid": "PPE", "Organization": "European People's Party", "role": "Member",
         "start": "2009-07-14T00:09:00"}
    ]);

    let stats = run(&pool, vec![record]).await;
    assert_eq!(stats.created, 1);
    assert_eq!(stats.skipped, 0);

    let mep = epsync_common::db::queries::mep_by_ep_id(&pool, 42)
        .await
        .unwrap()
        .unwrap();
    assert!(mep.active);
    assert_eq!(mep.first_name, "Jean");
    assert_eq!(mep.last_name, "Dupont");
    assert_eq!(mep.full_name.as_deref(), Some("Jean Dupont"));
    assert_eq!(mep.gender.as_deref(), Some("M"));
    assert_eq!(mep.birth_place.as_deref(), Some("Lyon"));

    // exactly the assignments listed in the snapshot, nothing else
    assert_eq!(count(&pool, "committee_roles").await, 1);
    assert_eq!(count(&pool, "group_memberships").await, 1);
    assert_eq!(count(&pool, "country_mandates").await, 1);
    assert_eq!(count(&pool, "delegation_roles").await, 0);
    assert_eq!(count(&pool, "organization_roles").await, 0);

    // the alias table canonicalized the group abbreviation
    let group = epsync_common::db::queries::group_by_abbreviation(&pool, "EPP")
        .await
        .unwrap();
    assert!(group.is_some());

    // aliases are recorded at creation
    assert_eq!(count(&pool, "name_variations").await, 1);
}

#[tokio::test]
async fn rerun_with_identical_snapshot_is_idempotent() {
    let pool = memory_pool().await;

    let mut record = member(42, "Jean", "Dupont");
    record["Delegations"] = json!([
        {"Organization": "Delegation to Japan", "role": "Member", "start": "2009-09-16T00:09:00"}
    ]);
    record["Mail"] = json!(["jean.dupont@example.eu"]);
    record["CV"] = json!(["Mayor of Lyon", ""]);

    let first = run(&pool, vec![record.clone()]).await;
    assert_eq!(first.created, 1);

    let second = run(&pool, vec![record]).await;
    assert_eq!(second.created, 0);
    assert_eq!(second.updated, 1);

    assert_eq!(count(&pool, "meps").await, 1);
    assert_eq!(count(&pool, "delegation_roles").await, 1);
    assert_eq!(count(&pool, "delegations").await, 1);
    assert_eq!(count(&pool, "country_mandates").await, 1);
    assert_eq!(count(&pool, "parties").await, 1);
    assert_eq!(count(&pool, "emails").await, 1);
    assert_eq!(count(&pool, "cvs").await, 1); // the blank entry stays out
    assert_eq!(count(&pool, "name_variations").await, 1);
}

#[tokio::test]
async fn person_absent_from_snapshot_goes_inactive() {
    let pool = memory_pool().await;

    run(&pool, vec![member(7, "Anna", "Kovacs"), member(8, "Marie", "Laurent")]).await;

    let anna = epsync_common::db::queries::mep_by_ep_id(&pool, 7)
        .await
        .unwrap()
        .unwrap();
    assert!(anna.active);

    // next snapshot no longer contains person 7
    run(&pool, vec![member(8, "Marie", "Laurent")]).await;

    let anna = epsync_common::db::queries::mep_by_ep_id(&pool, 7)
        .await
        .unwrap()
        .unwrap();
    assert!(!anna.active);
    let marie = epsync_common::db::queries::mep_by_ep_id(&pool, 8)
        .await
        .unwrap()
        .unwrap();
    assert!(marie.active);
}

#[tokio::test]
async fn committee_without_abbreviation_is_skipped() {
    let pool = memory_pool().await;

    let mut record = member(42, "Jean", "Dupont");
    record["Committees"] = json!([
        {"Organization": "Committee with no abbreviation", "role": "Member"}
    ]);

    let stats = run(&pool, vec![record]).await;
    assert_eq!(stats.created, 1);

    // the entry is dropped and no committee is invented for it
    assert_eq!(count(&pool, "committee_roles").await, 0);
    assert_eq!(count(&pool, "committees").await, 0);
}

#[tokio::test]
async fn roles_are_replaced_wholesale_per_run() {
    let pool = memory_pool().await;

    let mut record = member(42, "Jean", "Dupont");
    record["Committees"] = json!([
        {"committee_id": "ENVI", "Organization": "Environment", "role": "Member"},
        {"committee_id": "ITRE", "Organization": "Industry", "role": "Substitute"}
    ]);
    run(&pool, vec![record]).await;
    assert_eq!(count(&pool, "committee_roles").await, 2);

    // the next snapshot lists a single, different assignment
    let mut record = member(42, "Jean", "Dupont");
    record["Committees"] = json!([
        {"committee_id": "ENVI", "Organization": "Environment", "role": "Chair"}
    ]);
    run(&pool, vec![record]).await;

    let roles: Vec<(String,)> =
        sqlx::query_as("SELECT role FROM committee_roles").fetch_all(&pool).await.unwrap();
    assert_eq!(roles.len(), 1);
    assert_eq!(roles[0].0, "Chair");
}

#[tokio::test]
async fn orphaned_reference_entities_are_cleaned_up() {
    let pool = memory_pool().await;

    let mut jean = member(42, "Jean", "Dupont");
    jean["Delegations"] = json!([
        {"Organization": "Delegation to Japan", "role": "Member"}
    ]);
    let mut anna = member(7, "Anna", "Kovacs");
    anna["Delegations"] = json!([
        {"Organization": "Delegation to Chile", "role": "Member"}
    ]);
    run(&pool, vec![jean, anna]).await;
    assert_eq!(count(&pool, "delegations").await, 2);

    // Jean drops his delegation; Anna keeps hers
    let jean = member(42, "Jean", "Dupont");
    let mut anna = member(7, "Anna", "Kovacs");
    anna["Delegations"] = json!([
        {"Organization": "Delegation to Chile", "role": "Member"}
    ]);
    let stats = run(&pool, vec![jean, anna]).await;

    assert_eq!(stats.orphans_removed, 1);
    let names: Vec<String> = sqlx::query_scalar("SELECT name FROM delegations")
        .fetch_all(&pool)
        .await
        .unwrap();
    assert_eq!(names, ["Delegation to Chile"]);
}

#[tokio::test]
async fn groups_survive_orphan_cleanup() {
    let pool = memory_pool().await;

    let mut record = member(42, "Jean", "Dupont");
    record["Groups"] = json!([
        {"groupid": "PPE", "Organization": "European People's Party", "role": "Member"}
    ]);
    run(&pool, vec![record]).await;

    // the membership disappears but the group is stable reference data
    run(&pool, vec![member(42, "Jean", "Dupont")]).await;
    assert_eq!(count(&pool, "group_memberships").await, 0);
    assert_eq!(count(&pool, "groups").await, 1);
}

#[tokio::test]
async fn record_without_constituencies_is_skipped_whole() {
    let pool = memory_pool().await;

    let mut broken = member(42, "Jean", "Dupont");
    broken.as_object_mut().unwrap().remove("Constituencies");

    let stats = run(&pool, vec![broken, member(7, "Anna", "Kovacs")]).await;
    assert_eq!(stats.skipped, 1);
    assert_eq!(stats.created, 1);

    // the rolled-back record left nothing behind
    assert!(epsync_common::db::queries::mep_by_ep_id(&pool, 42)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn malformed_record_does_not_abort_the_run() {
    let pool = memory_pool().await;

    let values = vec![json!({"unexpected": "shape"}), member(7, "Anna", "Kovacs")];
    let stats = run(&pool, values).await;

    assert_eq!(stats.processed, 2);
    assert_eq!(stats.skipped, 1);
    assert_eq!(stats.created, 1);
}

#[tokio::test]
async fn mandate_without_party_uses_country_placeholder() {
    let pool = memory_pool().await;

    let mut record = member(42, "Jean", "Dupont");
    record["Constituencies"] = json!([
        {"country": "France", "start": "2019-07-02T00:09:00"}
    ]);
    run(&pool, vec![record]).await;

    let party: (String,) =
        sqlx::query_as("SELECT name FROM parties").fetch_one(&pool).await.unwrap();
    assert_eq!(party.0, "unknown");

    // placeholder mandates carry no affiliation marker
    assert_eq!(count(&pool, "party_affiliations").await, 0);
}

#[tokio::test]
async fn open_ended_mandate_marks_affiliation_current() {
    let pool = memory_pool().await;

    let mut record = member(42, "Jean", "Dupont");
    record["Constituencies"] = json!([
        {"country": "France", "party": "Parti Socialiste", "start": "2019-07-02T00:09:00"},
        {"country": "France", "party": "Les Verts", "start": "2009-07-14T00:09:00",
         "end": "2014-06-30T00:09:00"}
    ]);
    run(&pool, vec![record]).await;

    let rows: Vec<(String, bool)> = sqlx::query_as(
        r#"
        SELECT p.name, pa.current FROM party_affiliations pa
        JOIN parties p ON p.guid = pa.party_id
        ORDER BY p.name
        "#,
    )
    .fetch_all(&pool)
    .await
    .unwrap();

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0], ("Les Verts".to_string(), false));
    assert_eq!(rows[1], ("Parti Socialiste".to_string(), true));

    // the open-ended mandate stores the sentinel end date
    let ends: Vec<(Option<String>,)> =
        sqlx::query_as("SELECT end_date FROM country_mandates ORDER BY end_date")
            .fetch_all(&pool)
            .await
            .unwrap();
    assert_eq!(ends[0].0.as_deref(), Some("2014-06-30"));
    assert_eq!(ends[1].0.as_deref(), Some("9999-12-31"));
}

#[tokio::test]
async fn unknown_country_skips_only_that_mandate() {
    let pool = memory_pool().await;

    let mut record = member(42, "Jean", "Dupont");
    record["Constituencies"] = json!([
        {"country": "Atlantis", "party": "Sea Party", "start": "2019-07-02T00:09:00"},
        {"country": "France", "party": "Parti Socialiste", "start": "2019-07-02T00:09:00"}
    ]);
    let stats = run(&pool, vec![record]).await;

    assert_eq!(stats.created, 1);
    assert_eq!(count(&pool, "country_mandates").await, 1);
}

#[tokio::test]
async fn office_fields_are_flattened_per_campus() {
    let pool = memory_pool().await;

    let mut record = member(42, "Jean", "Dupont");
    record["Addresses"] = json!({
        "Brussels": {
            "Address": {
                "Building": "Altiero Spinelli", "building_code": "ASP",
                "Street": "Rue Wiertz 60", "Zip": "1047", "Office": "09G305"
            },
            "Fax": "+32(0)2 28 49132",
            "Phone": "+32(0)2 28 45132"
        },
        "Strasbourg": {
            "Address": {
                "Building": "Louise Weiss", "building_code": "LOW",
                "Street": "Allée du Printemps", "Zip1": "67070", "Office": "T09033"
            },
            "Fax": "+33(0)3 88 179132",
            "Phone": "+33(0)3 88 175132"
        },
        "Postal": ["Rue Wiertz 60, 1047 Bruxelles"]
    });
    run(&pool, vec![record]).await;

    let mep = epsync_common::db::queries::mep_by_ep_id(&pool, 42)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(mep.bxl_floor.as_deref(), Some("09"));
    assert_eq!(mep.bxl_office_number.as_deref(), Some("G305"));
    assert_eq!(mep.bxl_phone2.as_deref(), Some("+32(0)2 28 47132"));
    assert_eq!(mep.stg_floor.as_deref(), Some("T09"));
    assert_eq!(mep.stg_office_number.as_deref(), Some("033"));
    assert_eq!(mep.bxl_office().as_deref(), Some("09G305"));

    assert_eq!(count(&pool, "buildings").await, 2);
    assert_eq!(count(&pool, "postal_addresses").await, 1);
}

#[tokio::test]
async fn gender_na_maps_to_unknown() {
    let pool = memory_pool().await;

    let mut record = member(42, "Jean", "Dupont");
    record["Gender"] = json!("n/a");
    run(&pool, vec![record]).await;

    let mep = epsync_common::db::queries::mep_by_ep_id(&pool, 42)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(mep.gender, None);
}

#[tokio::test]
async fn websites_collect_social_links_and_drop_blanks() {
    let pool = memory_pool().await;

    let mut record = member(42, "Jean", "Dupont");
    record["Homepage"] = json!(["http://jeandupont.example", ""]);
    record["Twitter"] = json!(["https://twitter.com/jdupont"]);
    record["Facebook"] = json!(["https://facebook.com/jdupont"]);
    run(&pool, vec![record]).await;

    let urls: Vec<String> = sqlx::query_scalar("SELECT url FROM websites ORDER BY url")
        .fetch_all(&pool)
        .await
        .unwrap();
    assert_eq!(
        urls,
        [
            "http://jeandupont.example",
            "https://facebook.com/jdupont",
            "https://twitter.com/jdupont"
        ]
    );
}

#[tokio::test]
async fn assistants_link_per_type_and_share_entities() {
    let pool = memory_pool().await;

    let mut jean = member(42, "Jean", "Dupont");
    jean["assistants"] = json!({
        "accredited": ["Paul Martin", "Julie Bernard"],
        "local": ["Paul Martin"]
    });
    run(&pool, vec![jean]).await;

    // two distinct assistants, three typed links
    assert_eq!(count(&pool, "assistants").await, 2);
    assert_eq!(count(&pool, "assistant_terms").await, 3);
}
