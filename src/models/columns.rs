//! Column decoding helpers shared by the models
//!
//! Decimals and units are stored as TEXT; these turn malformed values into
//! conversion errors instead of silently defaulting.

use chrono::{SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::Row;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::measurement::{Unit, UnitType};

#[derive(Debug, Error)]
#[error("{0}")]
struct InvalidColumn(String);

fn invalid(row: &Row, column: &str, message: String) -> rusqlite::Error {
    match row.as_ref().column_index(column) {
        Ok(idx) => rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Text,
            Box::new(InvalidColumn(message)),
        ),
        Err(e) => e,
    }
}

pub(crate) fn decimal(row: &Row, column: &str) -> rusqlite::Result<Decimal> {
    let text: String = row.get(column)?;
    text.parse::<Decimal>()
        .map_err(|e| invalid(row, column, format!("'{}' is not a decimal: {}", text, e)))
}

pub(crate) fn optional_decimal(row: &Row, column: &str) -> rusqlite::Result<Option<Decimal>> {
    let text: Option<String> = row.get(column)?;
    match text {
        Some(text) => text
            .parse::<Decimal>()
            .map(Some)
            .map_err(|e| invalid(row, column, format!("'{}' is not a decimal: {}", text, e))),
        None => Ok(None),
    }
}

/// Read a unit type column and a unit symbol column that must agree
pub(crate) fn unit(row: &Row, type_column: &str, unit_column: &str) -> rusqlite::Result<Unit> {
    let type_text: String = row.get(type_column)?;
    let unit_type = UnitType::from_str(&type_text)
        .ok_or_else(|| invalid(row, type_column, format!("unknown unit type '{}'", type_text)))?;

    let symbol: String = row.get(unit_column)?;
    Unit::parse_for(unit_type, &symbol).ok_or_else(|| {
        invalid(
            row,
            unit_column,
            format!("'{}' is not a {} unit", symbol, unit_type),
        )
    })
}

/// Current time as a sortable RFC 3339 string
pub(crate) fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
