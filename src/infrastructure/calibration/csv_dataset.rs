use std::path::Path;

use crate::domain::value_objects::calibration::{
    CalibrationError, CalibrationPoint, CalibrationTable,
};

const RESISTANCE_HEADER: &str = "resistance";
const TEMPERATURE_HEADER: &str = "temperature";

/// Load a thermistor datasheet from a CSV file.
///
/// The file needs a header row with `Resistance` and `Temperature` columns
/// (any case, any position). Other columns are ignored.
///
/// # Errors
///
/// Returns `CalibrationError::Dataset` if the file cannot be read or parsed,
/// or any table construction error for an invalid curve.
pub fn load_dataset(path: &Path) -> Result<CalibrationTable, CalibrationError> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        CalibrationError::Dataset(format!("cannot read {}: {e}", path.display()))
    })?;
    let rows = parse_dataset(&text)?;
    let table = CalibrationTable::from_dataset_rows(rows)?;

    tracing::debug!(
        path = %path.display(),
        points = table.len(),
        "calibration dataset loaded"
    );
    Ok(table)
}

/// Parse dataset rows in file order.
///
/// # Errors
///
/// Returns `CalibrationError::Dataset` for a missing header, a missing column
/// or a cell that is not a number.
pub fn parse_dataset(text: &str) -> Result<Vec<CalibrationPoint>, CalibrationError> {
    let mut lines = text
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty());

    let (_, header) = lines
        .next()
        .ok_or_else(|| CalibrationError::Dataset("dataset is empty".to_string()))?;
    let columns: Vec<String> = split_cells(header)
        .map(|cell| cell.to_ascii_lowercase())
        .collect();

    let resistance_col = column_index(&columns, RESISTANCE_HEADER)?;
    let temperature_col = column_index(&columns, TEMPERATURE_HEADER)?;

    let mut points = Vec::new();
    for (index, line) in lines {
        let cells: Vec<&str> = split_cells(line).collect();
        let resistance = number_at(&cells, resistance_col, index + 1)?;
        let temperature = number_at(&cells, temperature_col, index + 1)?;
        points.push(CalibrationPoint::new(resistance, temperature));
    }

    Ok(points)
}

fn split_cells(line: &str) -> impl Iterator<Item = &str> {
    line.split(',')
        .map(|cell| cell.trim().trim_matches('"').trim())
}

fn column_index(columns: &[String], name: &str) -> Result<usize, CalibrationError> {
    columns
        .iter()
        .position(|c| c == name)
        .ok_or_else(|| CalibrationError::Dataset(format!("missing column '{name}'")))
}

fn number_at(cells: &[&str], col: usize, line_no: usize) -> Result<f64, CalibrationError> {
    let cell = cells.get(col).ok_or_else(|| {
        CalibrationError::Dataset(format!("line {line_no}: missing column {}", col + 1))
    })?;
    cell.parse::<f64>().map_err(|_| {
        CalibrationError::Dataset(format!("line {line_no}: '{cell}' is not a number"))
    })
}
