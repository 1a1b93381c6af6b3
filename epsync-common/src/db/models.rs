//! Database row models

use crate::period::{TimePeriod, Timed};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One member of the chamber.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Mep {
    pub guid: String,
    pub ep_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub full_name: Option<String>,
    pub gender: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub birth_place: Option<String>,
    pub active: bool,
    pub bxl_building_id: Option<String>,
    pub bxl_floor: Option<String>,
    pub bxl_office_number: Option<String>,
    pub bxl_fax: Option<String>,
    pub bxl_phone1: Option<String>,
    pub bxl_phone2: Option<String>,
    pub stg_building_id: Option<String>,
    pub stg_floor: Option<String>,
    pub stg_office_number: Option<String>,
    pub stg_fax: Option<String>,
    pub stg_phone1: Option<String>,
    pub stg_phone2: Option<String>,
    pub total_score: Option<f64>,
}

impl Mep {
    /// Brussels office designation (floor + office number).
    pub fn bxl_office(&self) -> Option<String> {
        match (&self.bxl_floor, &self.bxl_office_number) {
            (Some(floor), Some(number)) => Some(format!("{floor}{number}")),
            _ => None,
        }
    }

    /// Strasbourg office designation (floor + office number).
    pub fn stg_office(&self) -> Option<String> {
        match (&self.stg_floor, &self.stg_office_number) {
            (Some(floor), Some(number)) => Some(format!("{floor}{number}")),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Country {
    pub guid: String,
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Group {
    pub guid: String,
    pub abbreviation: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Committee {
    pub guid: String,
    pub abbreviation: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Delegation {
    pub guid: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Organization {
    pub guid: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Party {
    pub guid: String,
    pub name: String,
    pub country_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Building {
    pub guid: String,
    pub code: String,
    pub name: String,
    pub street: String,
    pub postcode: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Assistant {
    pub guid: String,
    pub full_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct GroupMembership {
    pub guid: String,
    pub mep_id: String,
    pub group_id: String,
    pub role: String,
    pub begin_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl Timed for GroupMembership {
    fn period(&self) -> TimePeriod {
        TimePeriod {
            begin: self.begin_date,
            end: self.end_date,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CommitteeRole {
    pub guid: String,
    pub mep_id: String,
    pub committee_id: String,
    pub role: String,
    pub begin_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl Timed for CommitteeRole {
    fn period(&self) -> TimePeriod {
        TimePeriod {
            begin: self.begin_date,
            end: self.end_date,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DelegationRole {
    pub guid: String,
    pub mep_id: String,
    pub delegation_id: String,
    pub role: String,
    pub begin_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl Timed for DelegationRole {
    fn period(&self) -> TimePeriod {
        TimePeriod {
            begin: self.begin_date,
            end: self.end_date,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct OrganizationRole {
    pub guid: String,
    pub mep_id: String,
    pub organization_id: String,
    pub role: String,
    pub begin_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl Timed for OrganizationRole {
    fn period(&self) -> TimePeriod {
        TimePeriod {
            begin: self.begin_date,
            end: self.end_date,
        }
    }
}

/// A time-bounded assignment of a member to a constituency country,
/// carrying the party held during that mandate.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CountryMandate {
    pub guid: String,
    pub mep_id: String,
    pub country_id: String,
    pub party_id: String,
    pub begin_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl Timed for CountryMandate {
    fn period(&self) -> TimePeriod {
        TimePeriod {
            begin: self.begin_date,
            end: self.end_date,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PartyAffiliation {
    pub guid: String,
    pub mep_id: String,
    pub party_id: String,
    pub role: Option<String>,
    pub current: bool,
}
