use std::borrow::Cow;

use thiserror::Error;

use crate::client::KuduValue;
use crate::conversions::hash::hash_column_value;
use crate::conversions::timestamp::timestamp_text_to_micros;
use crate::types::{ColumnType, Value};

/// Why a source value could not be stored in its target column.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CoercionError {
    #[error("cannot parse `{value}` as {column_type}")]
    InvalidNumber {
        column_type: ColumnType,
        value: String,
    },
    #[error("`{value}` is not a boolean, expected `true` or `false`")]
    InvalidBool { value: String },
}

/// Result of coercing one source value for one target column.
#[derive(Debug, Clone, PartialEq)]
pub enum Coercion {
    /// Set the column to this value.
    Set(KuduValue),
    /// Leave the column unset and continue with the next column.
    Unset(CoercionError),
    /// Leave the column unset and stop filling the rest of the row.
    ///
    /// Columns set before stay set and the row is still applied.
    AbortRow(CoercionError),
    /// The column type is not handled; leave it unset.
    Skip,
}

/// Coerces a source value into the representation of `column_type`.
///
/// Nulls become column nulls before any other rule. Encrypted columns are hashed first and
/// the digest is then coerced as text.
pub fn coerce_value(raw: &Value, column_type: ColumnType, encrypted: bool) -> Coercion {
    if raw.is_null() {
        return Coercion::Set(KuduValue::Null);
    }

    let hashed;
    let value = if encrypted {
        hashed = Value::Text(hash_column_value(&raw.to_text()));
        &hashed
    } else {
        raw
    };

    let text = value.to_text();

    match column_type {
        ColumnType::Int8 => parse_number(&text, column_type, KuduValue::Int8),
        ColumnType::Int16 => parse_number(&text, column_type, KuduValue::Int16),
        ColumnType::Int32 => parse_number(&text, column_type, KuduValue::Int32),
        ColumnType::Int64 => parse_number(&text, column_type, KuduValue::Int64),
        ColumnType::Float => parse_number(&text, column_type, KuduValue::Float),
        ColumnType::Double => parse_number(&text, column_type, KuduValue::Double),
        ColumnType::Bool => {
            if text.eq_ignore_ascii_case("true") {
                Coercion::Set(KuduValue::Bool(true))
            } else if text.eq_ignore_ascii_case("false") {
                Coercion::Set(KuduValue::Bool(false))
            } else {
                Coercion::AbortRow(CoercionError::InvalidBool {
                    value: text.into_owned(),
                })
            }
        }
        ColumnType::Binary => match value {
            Value::Bytes(bytes) => Coercion::Set(KuduValue::Binary(bytes.clone())),
            _ => Coercion::Set(KuduValue::Binary(text.into_owned().into_bytes())),
        },
        ColumnType::String => Coercion::Set(KuduValue::String(text.into_owned())),
        ColumnType::UnixtimeMicros => match value {
            Value::Timestamp(timestamp) => {
                Coercion::Set(KuduValue::UnixtimeMicros(timestamp.and_utc().timestamp_micros()))
            }
            _ => Coercion::Set(KuduValue::UnixtimeMicros(timestamp_text_to_micros(&text))),
        },
        ColumnType::Decimal | ColumnType::Varchar | ColumnType::Date => Coercion::Skip,
    }
}

fn parse_number<T, F>(text: &Cow<'_, str>, column_type: ColumnType, wrap: F) -> Coercion
where
    T: std::str::FromStr,
    F: FnOnce(T) -> KuduValue,
{
    match text.parse::<T>() {
        Ok(number) => Coercion::Set(wrap(number)),
        Err(_) => Coercion::Unset(CoercionError::InvalidNumber {
            column_type,
            value: text.to_string(),
        }),
    }
}
