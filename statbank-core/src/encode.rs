//! The loader's multipart body.
//!
//! Statbank does not accept a standard multipart encoder's output. Each part
//! is framed by hand against a fixed boundary, rows are `;`-separated without
//! header or index, and every line ending, data included, must be CRLF.

use tracing::debug;

use crate::data::DataPart;
use crate::description::TableDescription;
use crate::error::{Result, StatbankError, ValidationReport};

pub const BOUNDARY: &str = "12345";
pub const CONTENT_TYPE: &str = "multipart/form-data; boundary=12345";

/// Encodes `parts`, paired with the description's parts by position.
pub fn encode_body(parts: &[DataPart], description: &TableDescription) -> Result<String> {
    if parts.len() != description.parts.len() {
        let mut report = ValidationReport::new();
        report.error(
            "deltabell_num",
            format!(
                "cannot encode {} part(s) for a table with {} part(s)",
                parts.len(),
                description.parts.len()
            ),
        );
        return Err(StatbankError::Validation(report));
    }

    let mut body = String::new();
    for (data, spec) in parts.iter().zip(&description.parts) {
        body.push_str(&format!(
            "--{BOUNDARY}\nContent-Disposition:form-data; filename={}\nContent-type:text/plain\n\n",
            spec.file_name
        ));
        body.push_str(&rows_to_csv(data)?);
        debug!(file_name = %spec.file_name, rows = data.row_count(), "Encoded part");
    }
    body.push_str(&format!("--{BOUNDARY}--"));
    Ok(body.replace('\n', "\r\n"))
}

fn rows_to_csv(data: &DataPart) -> Result<String> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b';')
        .has_headers(false)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    for row in &data.rows {
        writer
            .write_record(row.iter().map(|cell| cell.as_deref().unwrap_or("")))
            .map_err(|e| StatbankError::configuration(format!("cannot encode row: {e}")))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| StatbankError::configuration(format!("cannot encode part: {e}")))?;
    String::from_utf8(bytes)
        .map_err(|e| StatbankError::configuration(format!("encoded part is not UTF-8: {e}")))
}
