//! Numeric row sanitation.
//!
//! Every numeric field of an uploaded row must coerce to a positive finite
//! float. Rows failing the rule are dropped and counted by the caller; they
//! never abort a batch.

use crate::error::{Error, Result};
use crate::models::CellValue;

/// Coerce a cell to `f64`. Text cells are parsed, date cells never coerce.
pub fn coerce_numeric(value: &CellValue) -> Result<f64> {
    match value {
        CellValue::Number(n) => Ok(*n),
        CellValue::Text(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| Error::InvalidNumericValue(s.trim().to_string())),
        CellValue::DateTime(_) => {
            Err(Error::InvalidNumericValue("date value in numeric column".to_string()))
        }
    }
}

/// The sanitation rule applied to every numeric field of a row.
pub fn is_positive_finite(value: f64) -> bool {
    !(value.is_nan() || value.is_infinite() || value <= 0.0)
}

/// Coerce and check a single named field: positive and finite, or the row
/// is invalid.
pub fn validate_positive(name: &str, value: &CellValue) -> Result<f64> {
    let number = coerce_numeric(value)
        .map_err(|_| Error::InvalidNumericValue(format!("{}: {}", name, value.to_text())))?;

    if !is_positive_finite(number) {
        return Err(Error::InvalidNumericValue(format!("{}: {}", name, number)));
    }

    Ok(number)
}

/// Validate a fixed set of named numeric fields in order, returning the
/// coerced values on success. The first failing field invalidates the row.
pub fn validate_row(fields: &[(&str, &CellValue)]) -> Result<Vec<f64>> {
    fields
        .iter()
        .map(|(name, value)| validate_positive(name, value))
        .collect()
}
