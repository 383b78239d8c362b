//! The extract description ("uttaksbeskrivelse") of a Statbank table.
//!
//! A description lists the parts ("deltabeller") a table is loaded from, the
//! columns of each part in wire order, and the code lists the classification
//! columns draw their values from. It is fetched once per transfer with
//! [`fetch_description`] and is read-only afterwards.

use std::collections::BTreeSet;

use serde::{Deserialize, Deserializer};
use tracing::{error, info};

use crate::auth::{authenticate, AuthHeader};
use crate::contract::{CredentialEncryptor, PasswordPrompt, StatbankApi};
use crate::error::{Result, StatbankError};

/// Code list id used for free-form columns (years, for instance).
pub const NO_CODELIST: &str = "-";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDescription {
    /// Canonical five-digit table id, whatever the caller asked for.
    pub table_id: String,
    pub main_table_name: String,
    pub created_at: String,
    pub database: Option<String>,
    pub parts: Vec<PartSpec>,
    pub code_lists: Vec<CodeList>,
    pub suppression_code_list: Option<CodeList>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartSpec {
    /// Wire file name, e.g. `delfil1.dat`.
    pub file_name: String,
    pub description: String,
    pub ordinary_columns: Vec<ColumnSpec>,
    pub statistic_columns: Vec<ColumnSpec>,
    pub optional_suppression_columns: Vec<ColumnSpec>,
    pub example_line: Option<String>,
}

impl PartSpec {
    /// Number of columns a data part matching this part must have.
    pub fn column_count(&self) -> usize {
        self.ordinary_columns.len()
            + self.statistic_columns.len()
            + self.optional_suppression_columns.len()
    }

    pub fn columns(&self) -> impl Iterator<Item = &ColumnSpec> {
        self.ordinary_columns
            .iter()
            .chain(&self.statistic_columns)
            .chain(&self.optional_suppression_columns)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    /// 1-based position in the part.
    pub column_number: usize,
    /// `None` for free-form columns.
    pub code_list_id: Option<String>,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeList {
    pub id: String,
    pub codes: BTreeSet<String>,
    /// Sentinel "grand total" code, always accepted.
    pub total_code: Option<String>,
}

impl CodeList {
    pub fn contains(&self, value: &str) -> bool {
        self.codes.contains(value) || self.total_code.as_deref() == Some(value)
    }
}

/// A column bound to a code list, located by part index and column number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundColumn {
    pub part_index: usize,
    pub column_number: usize,
}

impl TableDescription {
    pub fn from_json(body: &str) -> Result<Self> {
        let raw: RawDescription = serde_json::from_str(body).map_err(|e| {
            StatbankError::protocol_parse(format!("malformed extract description: {e}"))
        })?;
        Ok(raw.into_description())
    }

    pub fn codelist(&self, id: &str) -> Option<&CodeList> {
        self.code_lists.iter().find(|c| c.id == id)
    }

    pub fn part_column_count(&self, index: usize) -> Option<usize> {
        self.parts.get(index).map(PartSpec::column_count)
    }

    pub fn total_columns(&self) -> usize {
        self.parts.iter().map(PartSpec::column_count).sum()
    }

    /// Every ordinary column, across all parts, that draws from `code_list_id`.
    pub fn columns_for_codelist(&self, code_list_id: &str) -> Vec<BoundColumn> {
        self.parts
            .iter()
            .enumerate()
            .flat_map(|(part_index, part)| {
                part.ordinary_columns
                    .iter()
                    .filter(move |c| c.code_list_id.as_deref() == Some(code_list_id))
                    .map(move |c| BoundColumn {
                        part_index,
                        column_number: c.column_number,
                    })
            })
            .collect()
    }
}

/// GETs and parses the description, reusing the transfer's header.
pub async fn fetch_description<A>(api: &A, auth: &AuthHeader, table: &str) -> Result<TableDescription>
where
    A: StatbankApi + ?Sized,
{
    info!(table = %table, "[FETCH] Requesting extract description");
    let response = api.get_description(auth, table).await?;
    match response.status {
        200 => {}
        401 | 403 => {
            error!(table = %table, status = response.status, "[FETCH] Description request not authorized");
            return Err(StatbankError::auth(format!(
                "extract description for {table} refused with status {}",
                response.status
            )));
        }
        status => {
            error!(table = %table, status, "[FETCH] Description request failed");
            return Err(StatbankError::connection(Some(status), response.body));
        }
    }
    let description = TableDescription::from_json(&response.body)?;
    info!(
        table_id = %description.table_id,
        main_table = %description.main_table_name,
        created_at = %description.created_at,
        parts = description.parts.len(),
        code_lists = description.code_lists.len(),
        "[FETCH] Extract description fetched"
    );
    Ok(description)
}

/// Fetches a description outside of a transfer, building its own header.
pub async fn describe<A, E, P>(
    api: &A,
    encryptor: &E,
    prompt: &P,
    loaduser: &str,
    table: &str,
) -> Result<TableDescription>
where
    A: StatbankApi + ?Sized,
    E: CredentialEncryptor + ?Sized,
    P: PasswordPrompt + ?Sized,
{
    crate::params::check_table(table)?;
    let auth = authenticate(encryptor, prompt, loaduser).await?;
    fetch_description(api, &auth, table).await
}

// Wire shape of the description. Numbers arrive as strings or as numbers
// depending on the Statbank version, so column numbers are read leniently.

#[derive(Deserialize)]
struct RawDescription {
    #[serde(rename = "TabellId", deserialize_with = "lenient_string")]
    table_id: String,
    #[serde(rename = "Huvudtabell")]
    main_table: String,
    #[serde(rename = "Uttaksbeskrivelse_lagd", default)]
    created_at: String,
    #[serde(rename = "base", default)]
    database: Option<String>,
    #[serde(rename = "DeltabellTitler", default)]
    part_titles: Vec<RawPartTitle>,
    #[serde(rename = "deltabller", default)]
    parts: Vec<RawPart>,
    #[serde(rename = "kodelister", default)]
    code_lists: Vec<RawCodeList>,
    #[serde(rename = "prikking", default)]
    suppression: Option<RawCodeList>,
}

#[derive(Deserialize)]
struct RawPartTitle {
    #[serde(rename = "Filnavn")]
    file_name: String,
    #[serde(rename = "Filtext", default)]
    text: String,
}

#[derive(Deserialize)]
struct RawPart {
    #[serde(rename = "deltabell")]
    file_name: String,
    #[serde(rename = "variabler", default)]
    variables: Vec<RawVariable>,
    #[serde(rename = "statistikkvariabler", default)]
    statistics: Vec<RawStatistic>,
    #[serde(rename = "null_prikk_missing", default)]
    suppression: Vec<RawSuppression>,
    #[serde(rename = "eksempel_linje", default)]
    example_line: Option<String>,
}

#[derive(Deserialize)]
struct RawVariable {
    #[serde(rename = "kolonnenummer", deserialize_with = "lenient_usize")]
    column: usize,
    #[serde(rename = "Kodeliste_id", default)]
    code_list_id: Option<String>,
    #[serde(rename = "Klassifikasjonsvariabel", default)]
    label: String,
}

#[derive(Deserialize)]
struct RawStatistic {
    #[serde(rename = "kolonnenummer", deserialize_with = "lenient_usize")]
    column: usize,
    #[serde(rename = "Text", default)]
    label: String,
}

#[derive(Deserialize)]
struct RawSuppression {
    #[serde(rename = "kolonnenummer", deserialize_with = "lenient_usize")]
    column: usize,
    #[serde(rename = "Beskrivelse", default)]
    label: String,
}

#[derive(Deserialize)]
struct RawCodeList {
    #[serde(rename = "kodeliste")]
    id: String,
    #[serde(rename = "SumIALtTotalKode", default)]
    total_code: Option<String>,
    #[serde(rename = "koder", default)]
    codes: Vec<RawCode>,
}

#[derive(Deserialize)]
struct RawCode {
    #[serde(rename = "kode")]
    code: String,
}

fn lenient_usize<'de, D>(deserializer: D) -> std::result::Result<usize, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(usize),
        Text(String),
    }
    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(n) => Ok(n),
        NumberOrString::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected a string or number, got {other}"
        ))),
    }
}

impl RawCodeList {
    fn into_code_list(self) -> CodeList {
        CodeList {
            id: self.id,
            codes: self.codes.into_iter().map(|c| c.code).collect(),
            total_code: self.total_code.filter(|t| !t.trim().is_empty()),
        }
    }
}

impl RawDescription {
    fn into_description(self) -> TableDescription {
        let titles = self.part_titles;
        let parts = self
            .parts
            .into_iter()
            .map(|part| {
                let description = titles
                    .iter()
                    .find(|t| t.file_name == part.file_name)
                    .map(|t| t.text.clone())
                    .unwrap_or_default();
                PartSpec {
                    description,
                    ordinary_columns: part
                        .variables
                        .into_iter()
                        .map(|v| ColumnSpec {
                            column_number: v.column,
                            code_list_id: v
                                .code_list_id
                                .filter(|id| !id.trim().is_empty() && id != NO_CODELIST),
                            label: v.label,
                        })
                        .collect(),
                    statistic_columns: part
                        .statistics
                        .into_iter()
                        .map(|s| ColumnSpec {
                            column_number: s.column,
                            code_list_id: None,
                            label: s.label,
                        })
                        .collect(),
                    optional_suppression_columns: part
                        .suppression
                        .into_iter()
                        .map(|s| ColumnSpec {
                            column_number: s.column,
                            code_list_id: None,
                            label: s.label,
                        })
                        .collect(),
                    example_line: part.example_line,
                    file_name: part.file_name,
                }
            })
            .collect();

        TableDescription {
            table_id: self.table_id,
            main_table_name: self.main_table,
            created_at: self.created_at,
            database: self.database,
            parts,
            code_lists: self
                .code_lists
                .into_iter()
                .map(RawCodeList::into_code_list)
                .collect(),
            suppression_code_list: self.suppression.map(RawCodeList::into_code_list),
        }
    }
}
