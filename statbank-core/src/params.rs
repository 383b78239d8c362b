//! Scalar transfer parameters and their local validation.
//!
//! Everything here is checked before any network call is made.

use std::fmt;
use std::str::FromStr;

use chrono::{Duration, Local, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Result, StatbankError};

/// What Statbank does when the loaded rows already exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(try_from = "String", into = "String")]
pub enum OverwritePolicy {
    /// `0`: duplicates make the load fail.
    NoOverwrite,
    /// `1`: existing rows are overwritten.
    #[default]
    Overwrite,
}

impl OverwritePolicy {
    pub fn code(self) -> &'static str {
        match self {
            OverwritePolicy::NoOverwrite => "0",
            OverwritePolicy::Overwrite => "1",
        }
    }
}

impl FromStr for OverwritePolicy {
    type Err = StatbankError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "0" => Ok(OverwritePolicy::NoOverwrite),
            "1" => Ok(OverwritePolicy::Overwrite),
            other => Err(StatbankError::configuration(format!(
                "overwrite policy must be '0' (no overwrite) or '1' (overwrite), got '{other}'"
            ))),
        }
    }
}

/// How the load is approved for publication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(try_from = "String", into = "String")]
pub enum ApprovalPolicy {
    /// `0`: manual approval.
    Manual,
    /// `1`: approved immediately.
    Immediate,
    /// `2`: approved just in time for publication.
    #[default]
    JustInTime,
}

impl ApprovalPolicy {
    pub fn code(self) -> &'static str {
        match self {
            ApprovalPolicy::Manual => "0",
            ApprovalPolicy::Immediate => "1",
            ApprovalPolicy::JustInTime => "2",
        }
    }
}

impl FromStr for ApprovalPolicy {
    type Err = StatbankError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "0" => Ok(ApprovalPolicy::Manual),
            "1" => Ok(ApprovalPolicy::Immediate),
            "2" => Ok(ApprovalPolicy::JustInTime),
            other => Err(StatbankError::configuration(format!(
                "approval policy must be '0' (manual), '1' (immediate) or '2' (just-in-time), got '{other}'"
            ))),
        }
    }
}

macro_rules! string_codes {
    ($($ty:ty),*) => {$(
        impl TryFrom<String> for $ty {
            type Error = StatbankError;
            fn try_from(value: String) -> Result<Self> {
                value.parse()
            }
        }

        impl From<$ty> for String {
            fn from(value: $ty) -> Self {
                value.code().to_string()
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.code())
            }
        }
    )*};
}

string_codes!(OverwritePolicy, ApprovalPolicy);

/// Query parameters of the loader request, in wire order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadParams {
    pub initials: String,
    pub main_table_name: String,
    pub publish_date: NaiveDate,
    pub responsible1: String,
    pub responsible2: String,
    pub overwrite: OverwritePolicy,
    pub approval: ApprovalPolicy,
}

impl LoadParams {
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("initialier", self.initials.clone()),
            ("hovedtabell", self.main_table_name.clone()),
            ("publiseringsdato", self.publish_date.format("%Y-%m-%d").to_string()),
            ("fagansvarlig1", self.responsible1.clone()),
            ("fagansvarlig2", self.responsible2.clone()),
            ("auto_overskriv_data", self.overwrite.code().to_string()),
            ("auto_godkjenn_data", self.approval.code().to_string()),
        ]
    }
}

/// Three-letter initials, as used for the loader and both responsible parties.
pub fn check_initials(role: &str, value: &str) -> Result<()> {
    if value.chars().count() != 3 {
        return Err(StatbankError::configuration(format!(
            "{role} '{value}' must be exactly three characters"
        )));
    }
    Ok(())
}

/// Parses a strict `YYYY-MM-DD` date.
pub fn parse_publish_date(value: &str) -> Result<NaiveDate> {
    let shape = Regex::new(r"^\d{4}-\d{2}-\d{2}$")
        .map_err(|e| StatbankError::configuration(e.to_string()))?;
    if !shape.is_match(value) {
        return Err(StatbankError::configuration(format!(
            "publish date '{value}' must be written as YYYY-MM-DD, e.g. 1900-01-01"
        )));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|e| {
        StatbankError::configuration(format!("publish date '{value}' is not a valid date: {e}"))
    })
}

/// A numeric table id must be five digits; anything else is taken as a table name.
pub fn check_table(table: &str) -> Result<()> {
    let table = table.trim();
    if table.is_empty() {
        return Err(StatbankError::configuration("table id or name must be set"));
    }
    if table.chars().all(|c| c.is_ascii_digit()) && table.len() != 5 {
        return Err(StatbankError::configuration(format!(
            "table id '{table}' must be five digits"
        )));
    }
    Ok(())
}

/// The default publication date: tomorrow.
pub fn tomorrow() -> NaiveDate {
    Local::now().date_naive() + Duration::days(1)
}
