//! Pre-flight validation of data parts against a table description.
//!
//! Every violation is collected; nothing short-circuits. Values outside a
//! code list are errors. Codes that exist in a list but never occur in the
//! data are only warnings.

use std::collections::BTreeSet;

use tracing::{info, warn};

use crate::data::DataPart;
use crate::description::{CodeList, TableDescription};
use crate::error::{Result, ValidationReport};

/// Checks `parts` against `description`.
///
/// With `raise_errors` set, a report containing errors becomes
/// [`StatbankError::Validation`](crate::error::StatbankError::Validation).
/// Without it the report is always returned for inspection.
pub fn validate(
    parts: &[DataPart],
    description: &TableDescription,
    raise_errors: bool,
) -> Result<ValidationReport> {
    let report = collect_violations(parts, description);
    for warning in &report.warnings {
        warn!(table_id = %description.table_id, "[VALIDATE] {warning}");
    }
    info!(
        table_id = %description.table_id,
        errors = report.errors.len(),
        warnings = report.warnings.len(),
        "[VALIDATE] Validation finished"
    );
    if raise_errors {
        report.into_result()
    } else {
        Ok(report)
    }
}

fn collect_violations(parts: &[DataPart], description: &TableDescription) -> ValidationReport {
    let mut report = ValidationReport::new();

    if description.parts.is_empty() {
        report.error(
            "description_parts",
            format!(
                "extract description for {} lists no parts",
                description.table_id
            ),
        );
    }

    if parts.len() != description.parts.len() {
        report.error(
            "deltabell_num",
            format!(
                "table {} expects {} part(s), got {}",
                description.table_id,
                description.parts.len(),
                parts.len()
            ),
        );
    }

    for (index, (data, spec)) in parts.iter().zip(&description.parts).enumerate() {
        let expected = spec.column_count();
        if data.column_count() != expected {
            report.error(
                format!("col_count_data_{index}"),
                format!(
                    "part {index} ({}) needs {expected} columns, data has {}",
                    spec.file_name,
                    data.column_count()
                ),
            );
        }
    }

    for code_list in &description.code_lists {
        check_codelist(parts, description, code_list, &mut report);
    }

    if let Some(suppression) = &description.suppression_code_list {
        for (index, (data, spec)) in parts.iter().zip(&description.parts).enumerate() {
            for column in &spec.optional_suppression_columns {
                for value in data.distinct_values(column.column_number) {
                    if !suppression.contains(value) {
                        report.error(
                            format!("suppression_{index}_{}_{value}", column.column_number),
                            format!(
                                "value '{value}' in part {index} column {} is not a suppression code in {}",
                                column.column_number, suppression.id
                            ),
                        );
                    }
                }
            }
        }
    }

    report
}

fn check_codelist(
    parts: &[DataPart],
    description: &TableDescription,
    code_list: &CodeList,
    report: &mut ValidationReport,
) {
    let bound = description.columns_for_codelist(&code_list.id);
    if bound.is_empty() {
        return;
    }

    let mut observed: BTreeSet<&str> = BTreeSet::new();
    for column in bound {
        let Some(data) = parts.get(column.part_index) else {
            continue;
        };
        for value in data.distinct_values(column.column_number) {
            observed.insert(value);
            if !code_list.contains(value) {
                report.error(
                    format!(
                        "codelist_{}_{}_{}_{value}",
                        code_list.id, column.part_index, column.column_number
                    ),
                    format!(
                        "value '{value}' in part {} column {} is outside codelist {}",
                        column.part_index, column.column_number, code_list.id
                    ),
                );
            }
        }
    }

    let unused: Vec<&str> = code_list
        .codes
        .iter()
        .map(String::as_str)
        .filter(|code| !observed.contains(code))
        .collect();
    if !unused.is_empty() {
        report.warn(format!(
            "codelist {} has {} code(s) not present in the data: {}",
            code_list.id,
            unused.len(),
            unused.join(", ")
        ));
    }
}
