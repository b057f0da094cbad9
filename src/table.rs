//! Delimited-text tables (channels, events, …).
//!
//! The first line holds the column names.  Cells are typed on read:
//! integer, then float, then `True`/`False`, otherwise string; an empty
//! cell is null.
use serde_json::{Number, Value};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::debug;

use crate::error::{CmlError, Result};
use crate::session::{value_text, Row};

/// Column that anchors each event to a sample of the continuous recording.
pub const EEGOFFSET: &str = "eegoffset";
/// Column holding channel labels in a channels table.
pub const LABEL: &str = "label";

static NULL: Value = Value::Null;

/// Row-oriented table with a fixed column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Row>,
}

impl Table {
    pub fn read_csv(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|e| CmlError::NotFound(format!("{}: {e}", path.display())))?;
        let table = Self::from_reader(BufReader::new(file))?;
        debug!(
            path = %path.display(),
            rows = table.len(),
            cols = table.headers.len(),
            "read table"
        );
        Ok(table)
    }

    pub fn from_reader<R: std::io::Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);
        let headers: Vec<String> = rdr.headers()?.iter().map(String::from).collect();

        let mut rows: Vec<Row> = Vec::new();
        for record in rdr.records() {
            let record = record?;
            rows.push(
                headers
                    .iter()
                    .zip(record.iter())
                    .map(|(h, cell)| (h.clone(), parse_cell(cell)))
                    .collect(),
            );
        }
        Ok(Self { headers, rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn row(&self, i: usize) -> Option<&Row> {
        self.rows.get(i)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.headers.iter().any(|h| h == name)
    }

    /// Every cell of one column, `None` if the column does not exist.
    pub fn column(&self, name: &str) -> Option<Vec<&Value>> {
        if !self.has_column(name) {
            return None;
        }
        Some(self.rows.iter().map(|r| r.get(name).unwrap_or(&NULL)).collect())
    }

    /// Integer `eegoffset` of every row, in row order.
    ///
    /// # Errors
    ///
    /// [`CmlError::Format`] if the column is absent or any cell is not an
    /// integral number.
    pub fn eegoffsets(&self) -> Result<Vec<i64>> {
        let col = self
            .column(EEGOFFSET)
            .ok_or_else(|| CmlError::Format(format!("events table has no '{EEGOFFSET}' column")))?;
        col.into_iter()
            .enumerate()
            .map(|(i, v)| {
                as_integer(v).ok_or_else(|| {
                    CmlError::Format(format!("event {i}: {EEGOFFSET} {v} is not an integer"))
                })
            })
            .collect()
    }

    /// Channel labels from the `label` column.
    pub fn labels(&self) -> Result<Vec<String>> {
        let col = self
            .column(LABEL)
            .ok_or_else(|| CmlError::Format(format!("channels table has no '{LABEL}' column")))?;
        Ok(col.into_iter().map(value_text).collect())
    }
}

fn as_integer(v: &Value) -> Option<i64> {
    v.as_i64().or_else(|| {
        let f = v.as_f64()?;
        (f.fract() == 0.0 && f.abs() < i64::MAX as f64).then_some(f as i64)
    })
}

fn parse_cell(cell: &str) -> Value {
    if cell.is_empty() {
        return Value::Null;
    }
    if let Ok(i) = cell.parse::<i64>() {
        return Value::Number(i.into());
    }
    if let Ok(f) = cell.parse::<f64>() {
        // NaN / inf have no JSON number form.
        return Number::from_f64(f).map_or(Value::Null, Value::Number);
    }
    match cell {
        "True" | "true" => Value::Bool(true),
        "False" | "false" => Value::Bool(false),
        _ => Value::String(cell.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EVENTS: &str = "\
eegoffset,type,item,serialpos
500,WORD,CAT,1
1250.0,WORD,DOG,2
,REC_START,,
";

    #[test]
    fn cells_are_typed() {
        let t = Table::from_reader(EVENTS.as_bytes()).unwrap();
        assert_eq!(t.len(), 3);
        assert_eq!(t.headers(), ["eegoffset", "type", "item", "serialpos"]);
        let r0 = t.row(0).unwrap();
        assert_eq!(r0.get("eegoffset"), Some(&Value::from(500)));
        assert_eq!(r0.get("item"), Some(&Value::from("CAT")));
        assert_eq!(t.row(2).unwrap().get("item"), Some(&Value::Null));
    }

    #[test]
    fn eegoffsets_reject_missing_values() {
        let t = Table::from_reader(EVENTS.as_bytes()).unwrap();
        assert!(matches!(t.eegoffsets().unwrap_err(), CmlError::Format(_)));

        let t = Table::from_reader("eegoffset,type\n500,A\n1250.0,B\n".as_bytes()).unwrap();
        assert_eq!(t.eegoffsets().unwrap(), vec![500, 1250]);
    }

    #[test]
    fn eegoffsets_need_column() {
        let t = Table::from_reader("onset,type\n1,A\n".as_bytes()).unwrap();
        assert!(matches!(t.eegoffsets().unwrap_err(), CmlError::Format(_)));
    }

    #[test]
    fn channel_labels() {
        let t = Table::from_reader("type,label\nEEG,Fz\nEEG,Cz\n".as_bytes()).unwrap();
        assert_eq!(t.labels().unwrap(), ["Fz", "Cz"]);
    }

    #[test]
    fn missing_file_is_not_found() {
        let err = Table::read_csv("/nonexistent/events.csv").unwrap_err();
        assert!(matches!(err, CmlError::NotFound(_)));
    }
}
