//! Session index and row normalisation.
//!
//! `index.json` lists every exported session, one row per recording, with
//! `subject`, `experiment`, `session` and one `<key>_file` column per data
//! file (`eeg_file`, `channels_file`, `events_file`, …).  Paths are relative
//! to the data root.
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

use crate::error::{CmlError, Result};

/// Text form of a cell: strings unquoted, null as `None`, anything else JSON.
pub fn value_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => "None".into(),
        other => other.to_string(),
    }
}

// ── Row ──────────────────────────────────────────────────────────────────────

/// One table row: column name → cell value, in source column order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row(Map<String, Value>);

impl Row {
    /// Normalise any supported row shape into a [`Row`].
    ///
    /// Tried in order:
    /// 1. a JSON object mapping column → value;
    /// 2. an array of `[column, value]` pairs (named-tuple style);
    /// 3. a single-row table, either `[{…}]` or the column layout
    ///    `{"column": {"<row>": value}, …}`.
    ///
    /// Anything else is a [`CmlError::Format`].
    pub fn from_value(v: &Value) -> Result<Self> {
        if let Some(row) = Self::from_mapping(v) {
            return Ok(row);
        }
        if let Some(row) = Self::from_pairs(v) {
            return Ok(row);
        }
        if let Some(row) = Self::from_single_row_table(v) {
            return Ok(row);
        }
        Err(CmlError::Format(format!("cannot interpret {v} as a table row")))
    }

    fn from_mapping(v: &Value) -> Option<Self> {
        let obj = v.as_object()?;
        if is_column_table(obj) {
            return None;
        }
        Some(obj.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
    }

    fn from_pairs(v: &Value) -> Option<Self> {
        v.as_array()
            .filter(|pairs| !pairs.is_empty())?
            .iter()
            .map(|pair| match pair.as_array().map(Vec::as_slice) {
                Some([Value::String(k), val]) => Some((k.clone(), val.clone())),
                _ => None,
            })
            .collect()
    }

    fn from_single_row_table(v: &Value) -> Option<Self> {
        match v {
            Value::Array(rows) if rows.len() == 1 => {
                let obj = rows[0].as_object()?;
                Some(obj.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            }
            Value::Object(cols) if is_column_table(cols) => cols
                .iter()
                .map(|(k, col)| {
                    let cell = col.as_object()?.values().next()?;
                    Some((k.clone(), cell.clone()))
                })
                .collect(),
            _ => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Cell text for `key`, `None` if the column is absent.
    pub fn text(&self, key: &str) -> Option<String> {
        self.0.get(key).map(value_text)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Relative path stored under `<key>_file`.
    pub fn file_key(&self, key: &str) -> Result<&str> {
        let col = format!("{key}_file");
        match self.0.get(&col) {
            Some(Value::String(s)) => Ok(s),
            Some(other) => Err(CmlError::Format(format!("'{col}' is not a path: {other}"))),
            None => Err(CmlError::NotFound(format!("no '{col}' column for {}", self.label()))),
        }
    }

    /// `"<subject> <experiment> <session>"`.
    pub fn label(&self) -> String {
        format!("{} {} {}", self.field("subject"), self.field("experiment"), self.field("session"))
    }

    /// `"Sub=<subject>, Exp=<experiment>, Sess=<session>"`.
    pub fn dfr_label(&self) -> String {
        format!(
            "Sub={}, Exp={}, Sess={}",
            self.field("subject"),
            self.field("experiment"),
            self.field("session")
        )
    }

    fn field(&self, key: &str) -> String {
        self.text(key).unwrap_or_else(|| "?".into())
    }
}

impl FromIterator<(String, Value)> for Row {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Row(iter.into_iter().collect())
    }
}

impl TryFrom<&Value> for Row {
    type Error = CmlError;

    fn try_from(v: &Value) -> Result<Self> {
        Row::from_value(v)
    }
}

/// `{"col": {"0": v}, …}`: every value is an object with exactly one entry.
fn is_column_table(obj: &Map<String, Value>) -> bool {
    !obj.is_empty() && obj.values().all(|v| v.as_object().is_some_and(|o| o.len() == 1))
}

// ── SessionIndex ─────────────────────────────────────────────────────────────

/// Every session listed in `index.json`, in file order.
#[derive(Debug, Clone, Default)]
pub struct SessionIndex {
    rows: Vec<Row>,
}

impl SessionIndex {
    /// Read an index file.
    ///
    /// Accepts the records layout (`[{…}, {…}]`) and the column layout
    /// (`{"subject": {"0": …, "1": …}, …}`); column-layout rows are ordered
    /// by their numeric row key.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| CmlError::NotFound(format!("{}: {e}", path.display())))?;
        let index = Self::from_json(&serde_json::from_str(&text)?)?;
        debug!(path = %path.display(), sessions = index.len(), "loaded session index");
        Ok(index)
    }

    pub fn from_json(v: &Value) -> Result<Self> {
        let rows = match v {
            Value::Array(records) => records
                .iter()
                .map(|r| match r {
                    Value::Object(_) => Row::from_value(r),
                    other => {
                        Err(CmlError::Format(format!("index record is not an object: {other}")))
                    }
                })
                .collect::<Result<Vec<_>>>()?,
            Value::Object(cols) => columns_to_rows(cols)?,
            other => return Err(CmlError::Format(format!("unrecognised index layout: {other}"))),
        };
        Ok(Self { rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, i: usize) -> Option<&Row> {
        self.rows.get(i)
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Row> {
        self.rows.iter()
    }

    /// Rows matching `subject` and/or `experiment`; `None` matches anything.
    pub fn select(&self, subject: Option<&str>, experiment: Option<&str>) -> Vec<&Row> {
        let matches = |row: &Row, key: &str, want: Option<&str>| {
            want.map_or(true, |w| row.text(key).as_deref() == Some(w))
        };
        self.rows
            .iter()
            .filter(|r| matches(r, "subject", subject) && matches(r, "experiment", experiment))
            .collect()
    }

    /// The row for one recording, compared on cell text.
    pub fn find(&self, subject: &str, experiment: &str, session: &str) -> Option<&Row> {
        self.rows.iter().find(|r| {
            r.text("subject").as_deref() == Some(subject)
                && r.text("experiment").as_deref() == Some(experiment)
                && r.text("session").as_deref() == Some(session)
        })
    }
}

impl<'a> IntoIterator for &'a SessionIndex {
    type Item = &'a Row;
    type IntoIter = std::slice::Iter<'a, Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

fn columns_to_rows(cols: &Map<String, Value>) -> Result<Vec<Row>> {
    let mut by_row: BTreeMap<RowKey, Map<String, Value>> = BTreeMap::new();
    for (col, cells) in cols {
        let cells = cells
            .as_object()
            .ok_or_else(|| CmlError::Format(format!("index column '{col}' is not an object")))?;
        for (key, cell) in cells {
            by_row
                .entry(RowKey::parse(key))
                .or_default()
                .insert(col.clone(), cell.clone());
        }
    }
    Ok(by_row.into_values().map(Row).collect())
}

/// Row keys sort numerically when they are integers, textually otherwise.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum RowKey {
    Num(u64),
    Text(String),
}

impl RowKey {
    fn parse(s: &str) -> Self {
        s.parse().map(RowKey::Num).unwrap_or_else(|_| RowKey::Text(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn mapping_row() {
        let row =
            Row::from_value(&json!({"subject": "R1001P", "experiment": "FR1", "session": 0}))
                .unwrap();
        assert_eq!(row.label(), "R1001P FR1 0");
        assert_eq!(row.dfr_label(), "Sub=R1001P, Exp=FR1, Sess=0");
    }

    #[test]
    fn pair_row() {
        let pairs = json!([["subject", "LTP093"], ["session", 2], ["eeg_file", "a.st"]]);
        let row = Row::from_value(&pairs).unwrap();
        assert_eq!(row.text("subject").as_deref(), Some("LTP093"));
        assert_eq!(row.file_key("eeg").unwrap(), "a.st");
    }

    #[test]
    fn single_row_tables() {
        let records = Row::from_value(&json!([{"subject": "R1", "session": 1}])).unwrap();
        let columns =
            Row::from_value(&json!({"subject": {"7": "R1"}, "session": {"7": 1}})).unwrap();
        assert_eq!(records, columns);
    }

    #[test]
    fn columns_keep_file_order() {
        let text = r#"{"subject": "R1", "experiment": "FR1", "session": 0, "eeg_file": "x"}"#;
        let row = Row::from_value(&serde_json::from_str(text).unwrap()).unwrap();
        assert_eq!(
            row.columns().collect::<Vec<_>>(),
            ["subject", "experiment", "session", "eeg_file"]
        );
    }

    #[test]
    fn unsupported_row_shape() {
        assert!(matches!(Row::from_value(&json!(42)).unwrap_err(), CmlError::Format(_)));
        assert!(matches!(Row::from_value(&json!([1, 2])).unwrap_err(), CmlError::Format(_)));
    }

    #[test]
    fn missing_file_column_is_not_found() {
        let row = Row::from_value(&json!({"subject": "R1"})).unwrap();
        assert!(matches!(row.file_key("eeg").unwrap_err(), CmlError::NotFound(_)));
    }

    #[test]
    fn column_layout_index_orders_rows_numerically() {
        let v = json!({
            "subject":    {"0": "A", "10": "C", "2": "B"},
            "experiment": {"0": "FR1", "10": "FR1", "2": "catFR1"},
            "session":    {"0": 0, "10": 1, "2": 0},
        });
        let idx = SessionIndex::from_json(&v).unwrap();
        let subjects: Vec<_> = idx.iter().map(|r| r.text("subject").unwrap()).collect();
        assert_eq!(subjects, ["A", "B", "C"]);
        assert_eq!(idx.select(None, Some("FR1")).len(), 2);
        assert!(idx.find("C", "FR1", "1").is_some());
        assert!(idx.find("C", "FR1", "0").is_none());
    }
}
