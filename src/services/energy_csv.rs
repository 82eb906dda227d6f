//! Energy CSV ingestion.
//!
//! Parses uploaded plant readings into typed records. The header decides the
//! column order and the delimiter; data rows whose numeric fields do not parse
//! are skipped so one bad line never sinks an upload.

use std::fmt::Write;

use serde::{Deserialize, Serialize};

pub const REQUIRED_COLUMNS: [&str; 4] = ["date", "generatedEnergy", "temperature", "windSpeed"];

const DELIMITERS: [char; 3] = [',', ';', '\t'];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnergyRecord {
    pub date: String,
    pub generated_energy: f64,
    pub temperature: f64,
    pub wind_speed: f64,
}

impl EnergyRecord {
    /// One comma-separated line in [`REQUIRED_COLUMNS`] order.
    #[must_use]
    pub fn to_csv_line(&self) -> String {
        format!("{},{},{},{}", self.date, self.generated_energy, self.temperature, self.wind_speed)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnergySummary {
    pub count: usize,
    pub total_energy: f64,
    pub mean_temperature: Option<f64>,
    pub mean_wind_speed: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CsvError {
    #[error("el archivo CSV está vacío")]
    Empty,
    #[error("faltan columnas obligatorias: {}", .0.join(", "))]
    MissingColumns(Vec<String>),
}

struct ColumnMap {
    date: usize,
    generated_energy: usize,
    temperature: usize,
    wind_speed: usize,
}

// =============================================================================
// PARSING
// =============================================================================

/// Parse CSV text into records.
///
/// # Errors
///
/// [`CsvError::Empty`] when there is no header line, and
/// [`CsvError::MissingColumns`] when any required column is absent.
pub fn parse_energy_csv(text: &str) -> Result<Vec<EnergyRecord>, CsvError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut lines = text.lines().filter(|line| !line.trim().is_empty());
    let header = lines.next().ok_or(CsvError::Empty)?;
    let delimiter = detect_delimiter(header);
    let columns = map_columns(header, delimiter)?;

    Ok(lines
        .filter_map(|line| parse_row(line, delimiter, &columns))
        .collect())
}

fn detect_delimiter(header: &str) -> char {
    DELIMITERS
        .into_iter()
        .max_by_key(|d| (header.matches(*d).count(), *d == ','))
        .filter(|d| header.contains(*d))
        .unwrap_or(',')
}

fn clean_cell(cell: &str) -> &str {
    cell.trim().trim_matches('"').trim()
}

fn map_columns(header: &str, delimiter: char) -> Result<ColumnMap, CsvError> {
    let names: Vec<String> = header
        .split(delimiter)
        .map(|cell| clean_cell(cell).to_ascii_lowercase())
        .collect();
    let find = |wanted: &str| names.iter().position(|name| *name == wanted.to_ascii_lowercase());

    let missing: Vec<String> = REQUIRED_COLUMNS
        .into_iter()
        .filter(|&col| find(col).is_none())
        .map(str::to_owned)
        .collect();

    match (find("date"), find("generatedEnergy"), find("temperature"), find("windSpeed")) {
        (Some(date), Some(generated_energy), Some(temperature), Some(wind_speed)) => {
            Ok(ColumnMap { date, generated_energy, temperature, wind_speed })
        }
        _ => Err(CsvError::MissingColumns(missing)),
    }
}

fn parse_row(line: &str, delimiter: char, columns: &ColumnMap) -> Option<EnergyRecord> {
    let cells: Vec<&str> = line.split(delimiter).map(clean_cell).collect();
    let number = |idx: usize| cells.get(idx)?.parse::<f64>().ok().filter(|v| v.is_finite());
    Some(EnergyRecord {
        date: (*cells.get(columns.date)?).to_owned(),
        generated_energy: number(columns.generated_energy)?,
        temperature: number(columns.temperature)?,
        wind_speed: number(columns.wind_speed)?,
    })
}

// =============================================================================
// EXPORT + SUMMARY
// =============================================================================

/// Header plus one line per record.
#[must_use]
pub fn render_csv(records: &[EnergyRecord]) -> String {
    let mut out = REQUIRED_COLUMNS.join(",");
    out.push('\n');
    for record in records {
        let _ = writeln!(out, "{}", record.to_csv_line());
    }
    out
}

#[must_use]
pub fn summarize(records: &[EnergyRecord]) -> EnergySummary {
    if records.is_empty() {
        return EnergySummary::default();
    }
    #[allow(clippy::cast_precision_loss)]
    let n = records.len() as f64;
    let total_energy = records.iter().map(|r| r.generated_energy).sum();
    let temp_sum: f64 = records.iter().map(|r| r.temperature).sum();
    let wind_sum: f64 = records.iter().map(|r| r.wind_speed).sum();
    EnergySummary {
        count: records.len(),
        total_energy,
        mean_temperature: Some(temp_sum / n),
        mean_wind_speed: Some(wind_sum / n),
    }
}

#[cfg(test)]
#[path = "energy_csv_test.rs"]
mod tests;
