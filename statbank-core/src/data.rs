//! Tabular data parts.
//!
//! A [`DataPart`] is bound to a [`PartSpec`](crate::description::PartSpec) by
//! its position in the transfer, never by name: the wire format only carries
//! the part's file name. Keep parts in the same order as the description.

use std::collections::BTreeSet;
use std::io::Read;
use std::path::Path;

use tracing::{debug, error};

use crate::error::{Result, StatbankError};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DataPart {
    pub columns: Vec<String>,
    /// Row-major cells; `None` is a missing value.
    pub rows: Vec<Vec<Option<String>>>,
}

impl DataPart {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Option<String>>>) -> Result<Self> {
        if let Some((index, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != columns.len())
        {
            return Err(StatbankError::configuration(format!(
                "row {index} has {} cells, expected {}",
                row.len(),
                columns.len()
            )));
        }
        Ok(Self { columns, rows })
    }

    /// Builds a part from string cells, treating empty strings as missing.
    pub fn from_rows<S: AsRef<str>>(columns: &[&str], rows: &[Vec<S>]) -> Result<Self> {
        let rows = rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|cell| {
                        let cell = cell.as_ref();
                        (!cell.is_empty()).then(|| cell.to_string())
                    })
                    .collect()
            })
            .collect();
        Self::new(columns.iter().map(|c| c.to_string()).collect(), rows)
    }

    /// Reads a CSV file with a header row. The delimiter is `;` when the
    /// header line contains one, `,` otherwise.
    pub fn from_csv_path(path: &Path) -> Result<Self> {
        let mut raw = String::new();
        std::fs::File::open(path)
            .and_then(|mut f| f.read_to_string(&mut raw))
            .map_err(|e| {
                error!(error = ?e, path = %path.display(), "Failed to read data file");
                StatbankError::configuration(format!("cannot read {}: {e}", path.display()))
            })?;
        let part = Self::from_csv_str(&raw)?;
        debug!(
            path = %path.display(),
            rows = part.row_count(),
            columns = part.column_count(),
            "Loaded data part"
        );
        Ok(part)
    }

    pub fn from_csv_str(raw: &str) -> Result<Self> {
        let header_line = raw.lines().next().unwrap_or_default();
        let delimiter = if header_line.contains(';') { b';' } else { b',' };
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .from_reader(raw.as_bytes());
        let columns = reader
            .headers()
            .map_err(|e| StatbankError::configuration(format!("invalid CSV header: {e}")))?
            .iter()
            .map(str::to_string)
            .collect::<Vec<_>>();
        let mut rows = Vec::new();
        for record in reader.records() {
            let record =
                record.map_err(|e| StatbankError::configuration(format!("invalid CSV row: {e}")))?;
            rows.push(
                record
                    .iter()
                    .map(|cell| (!cell.is_empty()).then(|| cell.to_string()))
                    .collect(),
            );
        }
        Self::new(columns, rows)
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Distinct non-missing values of the 1-based column `column_number`.
    pub fn distinct_values(&self, column_number: usize) -> BTreeSet<&str> {
        let Some(index) = column_number.checked_sub(1) else {
            return BTreeSet::new();
        };
        self.rows
            .iter()
            .filter_map(|row| row.get(index).and_then(|cell| cell.as_deref()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_ragged_rows() {
        let err = DataPart::from_rows(&["a", "b"], &[vec!["1", "2"], vec!["3"]]).unwrap_err();
        assert!(err.to_string().contains("row 1"));
    }

    #[test]
    fn empty_cells_are_missing() {
        let part = DataPart::from_rows(&["a", "b"], &[vec!["1", ""]]).unwrap();
        assert_eq!(part.rows[0], vec![Some("1".to_string()), None]);
    }

    #[test]
    fn reads_semicolon_csv() {
        let part = DataPart::from_csv_str("region;aar;antall\n0301;2022;10\n1103;2022;\n").unwrap();
        assert_eq!(part.columns, vec!["region", "aar", "antall"]);
        assert_eq!(part.row_count(), 2);
        assert_eq!(part.rows[1][2], None);
    }

    #[test]
    fn reads_comma_csv() {
        let part = DataPart::from_csv_str("region,aar\n0301,2022\n").unwrap();
        assert_eq!(part.column_count(), 2);
    }

    #[test]
    fn reads_csv_file_and_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("delfil1.csv");
        std::fs::write(&path, "region;aar\n0301;2022\n").unwrap();
        assert_eq!(DataPart::from_csv_path(&path).unwrap().row_count(), 1);

        let err = DataPart::from_csv_path(&dir.path().join("missing.csv")).unwrap_err();
        assert!(matches!(err, StatbankError::Configuration(_)));
    }

    #[test]
    fn distinct_values_skip_missing() {
        let part = DataPart::from_rows(
            &["region", "aar"],
            &[vec!["0301", "2022"], vec!["0301", "2021"], vec!["", "2020"]],
        )
        .unwrap();
        let values: Vec<_> = part.distinct_values(1).into_iter().collect();
        assert_eq!(values, vec!["0301"]);
        assert!(part.distinct_values(0).is_empty());
        assert!(part.distinct_values(9).is_empty());
    }
}
