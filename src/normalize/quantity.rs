//! CPU and memory quantity parsing.
//!
//! Values are returned unrounded in the normalized unit (millicores or
//! mebibytes) so callers can sum several samples before truncating.

use crate::error::QuantityError;

const NANOCORES_PER_MILLICORE: f64 = 1_000_000.0;
const MILLICORES_PER_CORE: f64 = 1000.0;
const KIB_PER_MIB: f64 = 1024.0;
const MIB_PER_GIB: f64 = 1024.0;
const BYTES_PER_MIB: f64 = 1_048_576.0;

/// Parse a CPU quantity ("250n", "100m", "2") into millicores.
///
/// An empty string is treated as an absent sample and yields zero.
pub fn parse_cpu_millicores(quantity: &str) -> Result<f64, QuantityError> {
    let quantity = quantity.trim();
    if quantity.is_empty() {
        return Ok(0.0);
    }

    let (value, unit) = split_quantity(quantity)?;
    match unit {
        "n" => Ok(value / NANOCORES_PER_MILLICORE),
        "m" => Ok(value),
        "" => Ok(value * MILLICORES_PER_CORE),
        other => Err(unknown_unit(quantity, other)),
    }
}

/// Parse a memory quantity ("512Ki", "7Mi", "1Gi", "1048576") into mebibytes.
///
/// An empty string is treated as an absent sample and yields zero.
pub fn parse_memory_mebibytes(quantity: &str) -> Result<f64, QuantityError> {
    let quantity = quantity.trim();
    if quantity.is_empty() {
        return Ok(0.0);
    }

    let (value, unit) = split_quantity(quantity)?;
    match unit {
        "Ki" => Ok(value / KIB_PER_MIB),
        "Mi" => Ok(value),
        "Gi" => Ok(value * MIB_PER_GIB),
        "" => Ok(value / BYTES_PER_MIB),
        other => Err(unknown_unit(quantity, other)),
    }
}

/// Split a quantity into its numeric part and unit suffix.
fn split_quantity(quantity: &str) -> Result<(f64, &str), QuantityError> {
    let split = quantity
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(quantity.len());
    let (number, unit) = quantity.split_at(split);

    let value: f64 = number
        .parse()
        .map_err(|_| QuantityError::InvalidNumber(quantity.to_string()))?;
    if !value.is_finite() {
        return Err(QuantityError::InvalidNumber(quantity.to_string()));
    }
    Ok((value, unit))
}

fn unknown_unit(quantity: &str, unit: &str) -> QuantityError {
    QuantityError::UnknownUnit {
        quantity: quantity.to_string(),
        unit: unit.to_string(),
    }
}
