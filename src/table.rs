use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::fs;
use std::path::Path;

pub type Row = Map<String, Value>;

pub const S3_PATH: &str = "S3Path";
const NAME: &str = "Name";

/// Product metadata returned by the catalog, in catalog order.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct MetadataTable {
    rows: Vec<Row>,
}

impl MetadataTable {
    pub fn new(rows: Vec<Row>) -> Self {
        Self { rows }
    }

    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let table: Self = serde_json::from_str(&content)?;
        Ok(table)
    }

    pub fn write<P: AsRef<Path>>(self: &Self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn len(self: &Self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(self: &Self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(self: &Self) -> &[Row] {
        &self.rows
    }

    pub fn row(self: &Self, idx: usize) -> Option<&Row> {
        self.rows.get(idx)
    }

    /// Attribute names in order of first appearance across all rows.
    pub fn columns(self: &Self) -> Vec<&str> {
        let mut columns: Vec<&str> = vec![];
        for row in self.rows.iter() {
            for key in row.keys() {
                if !columns.contains(&key.as_str()) {
                    columns.push(key);
                }
            }
        }
        columns
    }

    pub fn s3_path(self: &Self, idx: usize) -> Option<&str> {
        self.rows.get(idx)?.get(S3_PATH)?.as_str()
    }

    pub fn head(self: &Self, n: usize) -> Self {
        Self::new(self.rows.iter().take(n).cloned().collect())
    }
}

impl fmt::Display for MetadataTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} rows x {} columns", self.len(), self.columns().len())?;
        for (idx, row) in self.rows.iter().enumerate() {
            let name = row.get(NAME).and_then(Value::as_str).unwrap_or("-");
            let s3_path = row.get(S3_PATH).and_then(Value::as_str).unwrap_or("-");
            writeln!(f, "{idx:>4}  {name}  {s3_path}")?;
        }
        Ok(())
    }
}
