//! Parsed tabular dataset handed over by the CSV ingestion collaborator.

use serde::{Deserialize, Serialize};

/// A single cell value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl CellValue {
    /// Null cells and blank text count as missing.
    pub fn is_missing(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Text(s) => s.trim().is_empty(),
            Self::Number(n) => n.is_nan(),
            Self::Bool(_) => false,
        }
    }

    /// Numeric view of the cell, parsing text when possible.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) if n.is_finite() => Some(*n),
            Self::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            _ => None,
        }
    }

    /// Trimmed textual view of a non-missing cell.
    pub fn as_text(&self) -> Option<String> {
        if self.is_missing() {
            return None;
        }
        match self {
            Self::Null => None,
            Self::Bool(b) => Some(b.to_string()),
            Self::Number(n) => Some(n.to_string()),
            Self::Text(s) => Some(s.trim().to_string()),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Header row plus ordered data rows.
///
/// Rows may be shorter than the header; absent trailing cells are missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl Dataset {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        Self { headers, rows }
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Iterate the cells of one column, yielding `Null` for short rows.
    pub fn column(&self, index: usize) -> impl Iterator<Item = &CellValue> + '_ {
        static NULL: CellValue = CellValue::Null;
        self.rows.iter().map(move |row| row.get(index).unwrap_or(&NULL))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_text_is_missing() {
        assert!(CellValue::Null.is_missing());
        assert!(CellValue::from("   ").is_missing());
        assert!(!CellValue::from("0").is_missing());
        assert!(!CellValue::Bool(false).is_missing());
    }

    #[test]
    fn short_rows_yield_null() {
        let ds = Dataset::new(
            vec!["a".into(), "b".into()],
            vec![vec!["1".into(), "2".into()], vec!["3".into()]],
        );
        let b: Vec<_> = ds.column(1).collect();
        assert_eq!(b, vec![&CellValue::from("2"), &CellValue::Null]);
    }

    #[test]
    fn numeric_view() {
        assert_eq!(CellValue::from(" 4.5 ").as_f64(), Some(4.5));
        assert_eq!(CellValue::from("n/a").as_f64(), None);
    }
}
