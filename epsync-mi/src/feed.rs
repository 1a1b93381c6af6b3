//! Snapshot feed models and readers.
//!
//! The feed arrives in one of two shapes: a plain JSON array of person
//! records, or a bracketed line stream (first line `[`, one JSON value
//! per line, bare `,` and `]` lines as structural noise). Both readers
//! decode each element separately so one bad record never takes down the
//! run.

use crate::error::{ImportError, RecordError};
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::io::BufRead;
use std::path::Path;

/// Date-time pattern used throughout the feed. The producer writes the
/// hour into the minute slot ("2004-07-19T00:09:00"); only the calendar
/// date carries information.
pub const FEED_DATE_FORMAT: &str = "%Y-%m-%dT00:%H:00";

/// Parse one feed date string down to its calendar date.
pub fn parse_feed_date(raw: &str) -> Result<NaiveDate, RecordError> {
    NaiveDate::parse_from_str(raw, FEED_DATE_FORMAT)
        .map_err(|_| RecordError::BadDate(raw.to_string()))
}

/// One decoded snapshot record, or the per-record reason it was rejected.
pub type RecordResult = Result<MemberRecord, RecordError>;

/// Snapshot file format selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SnapshotFormat {
    /// Try the array format first, fall back to the line stream.
    Auto,
    /// A single JSON array of person records.
    Array,
    /// Bracketed line stream: one JSON value per line.
    Stream,
}

/// A value that the feed serializes either bare or as a list.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        match self {
            OneOrMany::One(value) => std::slice::from_ref(value).iter(),
            OneOrMany::Many(values) => values.iter(),
        }
    }

    pub fn first(&self) -> Option<&T> {
        self.iter().next()
    }
}

/// One person record from the snapshot feed.
#[derive(Debug, Clone, Deserialize)]
pub struct MemberRecord {
    #[serde(rename = "UserID", deserialize_with = "int_from_any")]
    pub user_id: i64,
    #[serde(rename = "Name")]
    pub name: NameBlock,
    #[serde(rename = "Gender", default)]
    pub gender: Option<String>,
    #[serde(rename = "Birth", default)]
    pub birth: Option<BirthBlock>,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(rename = "Committees", default)]
    pub committees: Vec<RoleEntry>,
    #[serde(rename = "Delegations", default)]
    pub delegations: Vec<RoleEntry>,
    /// Mandatory: every member sits for a constituency.
    #[serde(rename = "Constituencies", default)]
    pub constituencies: Option<Vec<ConstituencyEntry>>,
    #[serde(rename = "Groups", default)]
    pub groups: Vec<GroupEntry>,
    /// Organization roles, labelled "Staff" by the feed.
    #[serde(rename = "Staff", default)]
    pub staff: Vec<RoleEntry>,
    /// Assistant names nested by assistant type.
    #[serde(default)]
    pub assistants: BTreeMap<String, Vec<String>>,
    #[serde(rename = "Addresses", default)]
    pub addresses: Option<AddressBlock>,
    #[serde(rename = "Mail", default)]
    pub mail: Option<OneOrMany<String>>,
    #[serde(rename = "Homepage", default)]
    pub homepage: Vec<String>,
    #[serde(rename = "Twitter", default)]
    pub twitter: Vec<String>,
    #[serde(rename = "Facebook", default)]
    pub facebook: Vec<String>,
    #[serde(rename = "CV", default)]
    pub cv: Vec<String>,
}

impl MemberRecord {
    /// Display name for progress reporting.
    pub fn display_name(&self) -> String {
        match &self.name.full {
            Some(full) => full.clone(),
            None => format!("{} {}", self.name.sur, self.name.family),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NameBlock {
    pub sur: String,
    pub family: String,
    #[serde(default)]
    pub full: Option<String>,
    #[serde(default)]
    pub aliases: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BirthBlock {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub place: Option<String>,
}

/// An entry in the Committees, Delegations or Staff lists.
#[derive(Debug, Clone, Deserialize)]
pub struct RoleEntry {
    #[serde(default)]
    pub committee_id: Option<String>,
    #[serde(rename = "Organization", default)]
    pub organization: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
}

/// An entry in the Groups list. The abbreviation is occasionally
/// serialized as a list; its first element wins.
#[derive(Debug, Clone, Deserialize)]
pub struct GroupEntry {
    #[serde(rename = "groupid", default)]
    pub group_id: Option<OneOrMany<String>>,
    #[serde(rename = "Organization", default)]
    pub organization: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
}

/// An entry in the Constituencies list.
#[derive(Debug, Clone, Deserialize)]
pub struct ConstituencyEntry {
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub party: Option<String>,
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddressBlock {
    #[serde(rename = "Brussels", default)]
    pub brussels: Option<CampusAddress>,
    #[serde(rename = "Strasbourg", default)]
    pub strasbourg: Option<CampusAddress>,
    #[serde(rename = "Postal", default)]
    pub postal: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CampusAddress {
    #[serde(rename = "Address", default)]
    pub address: Option<StreetAddress>,
    #[serde(rename = "Fax", default)]
    pub fax: Option<String>,
    #[serde(rename = "Phone", default)]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StreetAddress {
    #[serde(rename = "Building", default)]
    pub building: Option<String>,
    #[serde(default)]
    pub building_code: Option<String>,
    #[serde(rename = "Street", default)]
    pub street: Option<String>,
    #[serde(rename = "Zip", default)]
    pub zip: Option<String>,
    /// Alternate postcode key used by some Strasbourg entries.
    #[serde(rename = "Zip1", default)]
    pub zip1: Option<String>,
    #[serde(rename = "Office", default)]
    pub office: Option<String>,
}

fn default_active() -> bool {
    true
}

/// The feed writes `UserID` sometimes as a number, sometimes as a
/// string-encoded number.
fn int_from_any<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum IntOrString {
        Int(i64),
        Str(String),
    }

    match IntOrString::deserialize(deserializer)? {
        IntOrString::Int(value) => Ok(value),
        IntOrString::Str(raw) => raw.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// Decode one feed value into a person record.
pub fn decode_record(value: Value) -> RecordResult {
    serde_json::from_value(value).map_err(RecordError::from)
}

/// Read a snapshot file in the requested format.
pub fn read_snapshot(path: &Path, format: SnapshotFormat) -> Result<Vec<RecordResult>, ImportError> {
    match format {
        SnapshotFormat::Array => read_array(path),
        SnapshotFormat::Stream => read_stream(path),
        SnapshotFormat::Auto => match read_array(path) {
            Ok(records) => Ok(records),
            Err(ImportError::Feed(_)) => read_stream(path),
            Err(other) => Err(other),
        },
    }
}

/// Read a full-array snapshot. A top-level parse failure is fatal.
pub fn read_array(path: &Path) -> Result<Vec<RecordResult>, ImportError> {
    let raw = std::fs::read_to_string(path)?;
    let values: Vec<Value> = serde_json::from_str(&raw)?;
    Ok(values.into_iter().map(decode_record).collect())
}

/// Read the bracketed line stream. Each line carries one JSON value; a
/// line that fails to parse is reported as a malformed record instead of
/// aborting the run, since lines are the record boundaries.
pub fn read_stream(path: &Path) -> Result<Vec<RecordResult>, ImportError> {
    let file = std::fs::File::open(path)?;
    let reader = std::io::BufReader::new(file);
    let mut records = Vec::new();

    for line in reader.lines() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed == "[" || trimmed == "]" || trimmed == "," {
            continue;
        }
        // tolerate a trailing structural comma after the value
        let payload = trimmed.strip_suffix(',').unwrap_or(trimmed).trim_end();
        match serde_json::from_str::<Value>(payload) {
            Ok(value) => records.push(decode_record(value)),
            Err(e) => records.push(Err(RecordError::Shape(e))),
        }
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    fn minimal_record(user_id: Value) -> Value {
        json!({
            "UserID": user_id,
            "Name": {"sur": "Jean", "family": "Dupont", "full": "Jean Dupont", "aliases": ["DUPONT Jean"]},
            "Gender": "M",
            "active": true,
            "Constituencies": [{"country": "France", "party": "PS", "start": "2009-07-14T00:09:00"}]
        })
    }

    #[test]
    fn feed_dates_parse_down_to_the_day() {
        let date = parse_feed_date("2004-07-19T00:09:00").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2004, 7, 19).unwrap());

        assert!(matches!(
            parse_feed_date("19/07/2004"),
            Err(RecordError::BadDate(_))
        ));
    }

    #[test]
    fn user_id_accepts_number_or_string() {
        let by_number = decode_record(minimal_record(json!(4514))).unwrap();
        assert_eq!(by_number.user_id, 4514);

        let by_string = decode_record(minimal_record(json!("4514"))).unwrap();
        assert_eq!(by_string.user_id, 4514);

        assert!(decode_record(minimal_record(json!("not-a-number"))).is_err());
    }

    #[test]
    fn mail_accepts_single_value_or_list() {
        let mut single = minimal_record(json!(1));
        single["Mail"] = json!("jean@example.eu");
        let record = decode_record(single).unwrap();
        let mails: Vec<_> = record.mail.as_ref().unwrap().iter().collect();
        assert_eq!(mails, ["jean@example.eu"]);

        let mut many = minimal_record(json!(1));
        many["Mail"] = json!(["a@example.eu", "b@example.eu"]);
        let record = decode_record(many).unwrap();
        assert_eq!(record.mail.as_ref().unwrap().iter().count(), 2);
    }

    #[test]
    fn group_abbreviation_list_takes_first_element() {
        let mut value = minimal_record(json!(1));
        value["Groups"] = json!([{"groupid": ["PPE", "PPE-DE"], "Organization": "EPP", "role": "Member"}]);
        let record = decode_record(value).unwrap();
        let entry = &record.groups[0];
        assert_eq!(entry.group_id.as_ref().unwrap().first().unwrap(), "PPE");
    }

    #[test]
    fn missing_constituencies_still_decodes() {
        let mut value = minimal_record(json!(1));
        value.as_object_mut().unwrap().remove("Constituencies");
        let record = decode_record(value).unwrap();
        assert!(record.constituencies.is_none());
    }

    #[test]
    fn stream_reader_skips_structural_noise() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[").unwrap();
        writeln!(file, "{}", minimal_record(json!(1))).unwrap();
        writeln!(file, ",").unwrap();
        writeln!(file, "{}", minimal_record(json!(2))).unwrap();
        writeln!(file, "]").unwrap();

        let records = read_stream(file.path()).unwrap();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.is_ok()));
    }

    #[test]
    fn stream_reader_isolates_bad_lines() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[").unwrap();
        writeln!(file, "{}", minimal_record(json!(1))).unwrap();
        writeln!(file, "{{not json").unwrap();
        writeln!(file, "]").unwrap();

        let records = read_stream(file.path()).unwrap();
        assert_eq!(records.len(), 2);
        assert!(records[0].is_ok());
        assert!(records[1].is_err());
    }

    #[test]
    fn auto_detection_falls_back_to_stream() {
        // value-per-line with trailing commas is not one JSON document,
        // so the array parse fails and auto falls back to the stream path
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{},", minimal_record(json!(7))).unwrap();
        writeln!(file, "{}", minimal_record(json!(8))).unwrap();

        let records = read_snapshot(file.path(), SnapshotFormat::Auto).unwrap();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.is_ok()));
    }
}
