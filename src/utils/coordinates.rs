use crate::error::{ProcessingError, Result};

/// Convert degrees and decimal minutes (`DD:MM.m`, as printed in the station
/// lists) to decimal degrees.
///
/// # Examples
/// ```
/// use gwo_processor::utils::coordinates::dm_to_decimal;
///
/// let decimal = dm_to_decimal("35:41.5").unwrap();
/// assert!((decimal - 35.691667).abs() < 0.000001);
/// ```
pub fn dm_to_decimal(dm: &str) -> Result<f64> {
    let parts: Vec<&str> = dm.split(':').collect();

    if parts.len() != 2 {
        return Err(ProcessingError::InvalidCoordinate(format!(
            "Invalid coordinate format: '{}'. Expected format: 'DD:MM.m'",
            dm
        )));
    }

    let is_negative = dm.trim_start().starts_with('-');

    let degrees = parts[0].trim().parse::<f64>().map_err(|_| {
        ProcessingError::InvalidCoordinate(format!("Invalid degrees value: '{}'", parts[0]))
    })?;

    let minutes = parts[1].trim().parse::<f64>().map_err(|_| {
        ProcessingError::InvalidCoordinate(format!("Invalid minutes value: '{}'", parts[1]))
    })?;

    if !(0.0..60.0).contains(&minutes) {
        return Err(ProcessingError::InvalidCoordinate(format!(
            "Minutes must be between 0 and 60, got: {}",
            minutes
        )));
    }

    let decimal_value = degrees.abs() + minutes / 60.0;

    if is_negative {
        Ok(-decimal_value)
    } else {
        Ok(decimal_value)
    }
}

/// Parse coordinate that might be in degree-minute or decimal format
pub fn parse_coordinate(coord_str: &str) -> Result<f64> {
    let trimmed = coord_str.trim();

    if !trimmed.contains(':') {
        trimmed.parse::<f64>().map_err(|_| {
            ProcessingError::InvalidCoordinate(format!("Invalid coordinate value: '{}'", coord_str))
        })
    } else {
        dm_to_decimal(trimmed)
    }
}
