//! Office assignments on the parliament's two campuses.
//!
//! The feed nests office data per campus; the meps table flattens it into
//! fixed per-campus columns. Each campus is an explicit variant carrying
//! its own update statement and floor-prefix width, so no column name is
//! ever assembled at runtime.

use crate::feed::CampusAddress;
use crate::repository::{resolve_or_create, NewBuilding};
use sqlx::SqliteConnection;

/// The campus an office belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Campus {
    Brussels,
    Strasbourg,
}

impl Campus {
    /// Width of the floor prefix in the feed's Office string
    /// ("09G305" → floor "09", office "G305" in Brussels).
    fn floor_width(self) -> usize {
        match self {
            Campus::Brussels => 2,
            Campus::Strasbourg => 3,
        }
    }

    fn update_sql(self) -> &'static str {
        match self {
            Campus::Brussels => {
                r#"
                UPDATE meps SET
                    bxl_building_id = ?, bxl_floor = ?, bxl_office_number = ?,
                    bxl_fax = ?, bxl_phone1 = ?, bxl_phone2 = ?
                WHERE guid = ?
                "#
            }
            Campus::Strasbourg => {
                r#"
                UPDATE meps SET
                    stg_building_id = ?, stg_floor = ?, stg_office_number = ?,
                    stg_fax = ?, stg_phone1 = ?, stg_phone2 = ?
                WHERE guid = ?
                "#
            }
        }
    }
}

/// Flattened office fields parsed from one campus address block.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct OfficeFields {
    pub building_id: Option<String>,
    pub floor: Option<String>,
    pub office_number: Option<String>,
    pub fax: Option<String>,
    pub phone1: Option<String>,
    pub phone2: Option<String>,
}

/// Split the feed's Office string into floor prefix and office number.
pub fn split_office(office: &str, campus: Campus) -> (String, String) {
    let cut = office
        .char_indices()
        .nth(campus.floor_width())
        .map(|(i, _)| i)
        .unwrap_or(office.len());
    (office[..cut].to_string(), office[cut..].to_string())
}

/// Secondary phone number per the feed's office-phone scheme: the
/// fourth-from-last character is replaced by a 7. The convention comes
/// from the feed itself and is preserved bit-for-bit. Numbers too short
/// to carry the scheme get no secondary number.
pub fn derive_phone2(phone: &str) -> Option<String> {
    let chars: Vec<char> = phone.chars().collect();
    if chars.len() < 4 {
        return None;
    }
    let head: String = chars[..chars.len() - 4].iter().collect();
    let tail: String = chars[chars.len() - 3..].iter().collect();
    Some(format!("{head}7{tail}"))
}

/// Parse one campus block and store the flattened fields on the person
/// row. Creates the building on first reference.
pub async fn apply_campus(
    conn: &mut SqliteConnection,
    mep_guid: &str,
    campus: Campus,
    address: &CampusAddress,
) -> Result<(), sqlx::Error> {
    let fields = parse_campus(conn, campus, address).await?;

    sqlx::query(campus.update_sql())
        .bind(&fields.building_id)
        .bind(&fields.floor)
        .bind(&fields.office_number)
        .bind(&fields.fax)
        .bind(&fields.phone1)
        .bind(&fields.phone2)
        .bind(mep_guid)
        .execute(conn)
        .await?;

    Ok(())
}

async fn parse_campus(
    conn: &mut SqliteConnection,
    campus: Campus,
    address: &CampusAddress,
) -> Result<OfficeFields, sqlx::Error> {
    let mut fields = OfficeFields::default();

    if let Some(street) = &address.address {
        if let Some(code) = street.building_code.as_deref().filter(|c| !c.is_empty()) {
            let building = NewBuilding {
                code,
                name: street.building.as_deref().unwrap_or(code),
                street: street.street.as_deref().unwrap_or(""),
                postcode: street
                    .zip
                    .as_deref()
                    .or(street.zip1.as_deref())
                    .unwrap_or(""),
            };
            fields.building_id = Some(resolve_or_create(conn, &building).await?);
        }

        if let Some(office) = &street.office {
            let (floor, number) = split_office(office, campus);
            fields.floor = Some(floor);
            fields.office_number = Some(number);
        }
    }

    fields.fax = address.fax.clone();
    if let Some(phone) = &address.phone {
        fields.phone2 = derive_phone2(phone);
        fields.phone1 = Some(phone.clone());
    }

    Ok(fields)
}
