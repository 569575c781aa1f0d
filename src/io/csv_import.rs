use std::collections::BTreeMap;
use std::path::Path;

use crate::error::IngestError;
use crate::model::{ColumnMap, FlightRecord, SourceTable};

/// Parse CSV text into source rows.
///
/// The header order is kept so exports can reproduce it. Short rows are
/// accepted; the missing trailing fields are simply absent.
pub fn parse_csv(content: &str) -> Result<SourceTable, IngestError> {
    let content = content.trim_start_matches('\u{feff}');

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b',')
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let columns: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        if record.iter().all(str::is_empty) {
            continue;
        }
        let row: BTreeMap<String, String> = columns
            .iter()
            .zip(record.iter())
            .map(|(name, value)| (name.clone(), value.to_string()))
            .collect();
        rows.push(row);
    }
    tracing::debug!(columns = columns.len(), rows = rows.len(), "parsed CSV");

    Ok(SourceTable { columns, rows })
}

/// Import source rows from a CSV file.
pub fn import_csv(path: &Path) -> Result<SourceTable, IngestError> {
    let content = std::fs::read_to_string(path)?;
    let table = parse_csv(&content)?;
    tracing::info!(path = %path.display(), rows = table.rows.len(), "imported CSV");
    Ok(table)
}

/// Parse a solved schedule into original-track records.
pub fn parse_schedule(content: &str, columns: &ColumnMap) -> Result<Vec<FlightRecord>, IngestError> {
    let table = parse_csv(content)?;
    for required in columns.required() {
        if !table.columns.iter().any(|c| c == required) {
            return Err(IngestError::MissingColumn(required.to_string()));
        }
    }
    table
        .rows
        .iter()
        .enumerate()
        .map(|(i, fields)| FlightRecord::from_row(i + 1, fields, columns))
        .collect()
}
