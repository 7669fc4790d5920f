//! CSV ingestion into a [`Dataset`].

use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use csv::{ReaderBuilder, Trim};
use saw_model::{CellValue, Dataset};
use tracing::info;

/// Read a CSV file with a header row.
pub fn read_dataset(path: &Path) -> Result<Dataset> {
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let dataset =
        parse_dataset(file).with_context(|| format!("parse CSV {}", path.display()))?;
    info!(
        path = %path.display(),
        columns = dataset.column_count(),
        rows = dataset.row_count(),
        "loaded dataset"
    );
    Ok(dataset)
}

/// Parse CSV text. Rows may have fewer cells than the header.
pub fn parse_dataset<R: Read>(reader: R) -> Result<Dataset> {
    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let headers = reader
        .headers()
        .context("read header row")?
        .iter()
        .map(str::to_string)
        .collect();

    let mut rows = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("read row {}", index + 1))?;
        rows.push(record.iter().map(parse_cell).collect());
    }

    Ok(Dataset::new(headers, rows))
}

fn parse_cell(raw: &str) -> CellValue {
    if raw.is_empty() {
        return CellValue::Null;
    }
    match raw.parse::<f64>() {
        Ok(n) if n.is_finite() => CellValue::Number(n),
        _ => CellValue::Text(raw.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_numbers_text_and_blanks() {
        let csv = "age,gender,Q1_1\n34,female,4\n,male,\n27, female \n";
        let dataset = parse_dataset(csv.as_bytes()).unwrap();

        assert_eq!(dataset.headers, ["age", "gender", "Q1_1"]);
        assert_eq!(dataset.row_count(), 3);
        assert_eq!(dataset.rows[0][0], CellValue::Number(34.0));
        assert_eq!(dataset.rows[1][0], CellValue::Null);
        assert_eq!(dataset.rows[2][1], CellValue::Text("female".to_string()));
        // Short row: the missing trailing cell is simply absent.
        assert_eq!(dataset.rows[2].len(), 2);
    }

    #[test]
    fn nan_text_stays_text() {
        assert_eq!(parse_cell("NaN"), CellValue::Text("NaN".to_string()));
    }
}
