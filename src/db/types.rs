//! PostgreSQL type mappings.
//!
//! Rows are decoded into [`CellValue`]s in two phases:
//! 1. `TypeCategory` classifies the column's type name
//! 2. a per-category decoder extracts the native value
//!
//! Both wire formats occur: statements without parameters run over the simple
//! query protocol (text results) while bound statements come back in binary.
//! Typed sqlx decoders handle most types in either format; `timetz` text is
//! parsed here, and anything else they reject falls back to the raw text when
//! the value arrived as text.

use crate::models::{CellRow, CellValue};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::postgres::types::{Oid, PgInterval, PgTimeTz};
use sqlx::postgres::{PgRow, PgTypeInfo, PgValueFormat, PgValueRef};
use sqlx::{Column, Decode, Row, Type, TypeInfo, ValueRef};
use tracing::debug;

// =============================================================================
// Type Classification
// =============================================================================

/// Logical category for a PostgreSQL column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    Boolean,
    SmallInt,
    Integer,
    BigInt,
    Oid,
    Real,
    Double,
    Decimal,
    Text,
    /// The single-byte internal `"char"` type.
    Char,
    Json,
    Binary,
    Uuid,
    Date,
    Time,
    TimeTz,
    Timestamp,
    TimestampTz,
    Interval,
    TextArray,
    IntArray,
    BigIntArray,
    BoolArray,
    DoubleArray,
    Unknown,
}

/// Classify a sqlx type name (e.g. `INT4`, `TIMESTAMPTZ`, `TEXT[]`).
pub fn categorize_type(type_name: &str) -> TypeCategory {
    match type_name.to_ascii_uppercase().as_str() {
        "BOOL" => TypeCategory::Boolean,
        "INT2" => TypeCategory::SmallInt,
        "INT4" => TypeCategory::Integer,
        "INT8" => TypeCategory::BigInt,
        "OID" => TypeCategory::Oid,
        "FLOAT4" => TypeCategory::Real,
        "FLOAT8" => TypeCategory::Double,
        "NUMERIC" => TypeCategory::Decimal,
        "TEXT" | "VARCHAR" | "CHAR" | "BPCHAR" | "NAME" | "CITEXT" | "UNKNOWN" => {
            TypeCategory::Text
        }
        "\"CHAR\"" => TypeCategory::Char,
        "JSON" | "JSONB" => TypeCategory::Json,
        "BYTEA" => TypeCategory::Binary,
        "UUID" => TypeCategory::Uuid,
        "DATE" => TypeCategory::Date,
        "TIME" => TypeCategory::Time,
        "TIMETZ" => TypeCategory::TimeTz,
        "TIMESTAMP" => TypeCategory::Timestamp,
        "TIMESTAMPTZ" => TypeCategory::TimestampTz,
        "INTERVAL" => TypeCategory::Interval,
        "TEXT[]" | "VARCHAR[]" | "NAME[]" | "BPCHAR[]" | "CHAR[]" => TypeCategory::TextArray,
        "INT4[]" => TypeCategory::IntArray,
        "INT8[]" => TypeCategory::BigIntArray,
        "BOOL[]" => TypeCategory::BoolArray,
        "FLOAT8[]" => TypeCategory::DoubleArray,
        _ => TypeCategory::Unknown,
    }
}

// =============================================================================
// Decimal Type Support
// =============================================================================

/// Exact NUMERIC value as decimal text.
#[derive(Debug)]
pub struct RawDecimal(pub String);

impl Type<sqlx::Postgres> for RawDecimal {
    fn type_info() -> PgTypeInfo {
        PgTypeInfo::with_name("NUMERIC")
    }

    fn compatible(ty: &PgTypeInfo) -> bool {
        ty.name().eq_ignore_ascii_case("NUMERIC")
    }
}

impl<'r> Decode<'r, sqlx::Postgres> for RawDecimal {
    fn decode(value: PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        match value.format() {
            PgValueFormat::Text => Ok(RawDecimal(value.as_str()?.to_string())),
            PgValueFormat::Binary => numeric_from_binary(value.as_bytes()?)
                .map(RawDecimal)
                .ok_or_else(|| "malformed binary NUMERIC value".into()),
        }
    }
}

const NUMERIC_NEG: u16 = 0x4000;
const NUMERIC_NAN: u16 = 0xC000;
const NUMERIC_PINF: u16 = 0xD000;
const NUMERIC_NINF: u16 = 0xF000;

/// Render a binary NUMERIC (base-10000 digit groups) as decimal text.
///
/// Layout: ndigits i16, weight i16, sign u16, dscale u16, then ndigits i16 groups.
/// Group `i` is worth `10000^(weight - i)`.
pub fn numeric_from_binary(buf: &[u8]) -> Option<String> {
    let word = |i: usize| -> Option<[u8; 2]> { buf.get(i..i + 2)?.try_into().ok() };

    let ndigits = i16::from_be_bytes(word(0)?);
    let weight = i16::from_be_bytes(word(2)?) as i32;
    let sign = u16::from_be_bytes(word(4)?);
    let dscale = u16::from_be_bytes(word(6)?) as usize;

    match sign {
        NUMERIC_NAN => return Some("NaN".to_string()),
        NUMERIC_PINF => return Some("Infinity".to_string()),
        NUMERIC_NINF => return Some("-Infinity".to_string()),
        _ => {}
    }

    let ndigits = usize::try_from(ndigits).ok()?;
    let digits = (0..ndigits)
        .map(|i| word(8 + 2 * i).map(i16::from_be_bytes))
        .collect::<Option<Vec<i16>>>()?;
    let group = |pos: i32| -> i16 {
        usize::try_from(pos)
            .ok()
            .and_then(|p| digits.get(p).copied())
            .unwrap_or(0)
    };

    let mut out = String::new();
    if sign == NUMERIC_NEG {
        out.push('-');
    }
    if weight < 0 {
        out.push('0');
    } else {
        for pos in 0..=weight {
            if pos == 0 {
                out.push_str(&group(pos).to_string());
            } else {
                out.push_str(&format!("{:04}", group(pos)));
            }
        }
    }

    if dscale > 0 {
        let mut frac = String::with_capacity(dscale + 4);
        let mut pos = weight + 1;
        while frac.len() < dscale {
            frac.push_str(&format!("{:04}", group(pos)));
            pos += 1;
        }
        frac.truncate(dscale);
        out.push('.');
        out.push_str(&frac);
    }

    Some(out)
}

// =============================================================================
// Row Decoding
// =============================================================================

/// Trait for converting database rows into native cell rows.
pub trait RowToCells {
    fn to_cells(&self) -> CellRow;
}

impl RowToCells for PgRow {
    fn to_cells(&self) -> CellRow {
        self.columns()
            .iter()
            .enumerate()
            .map(|(idx, col)| {
                let type_name = col.type_info().name();
                let value = decode_column(self, idx, type_name, categorize_type(type_name));
                (col.name().to_string(), value)
            })
            .collect()
    }
}

fn decode_column(row: &PgRow, idx: usize, type_name: &str, category: TypeCategory) -> CellValue {
    let Ok(raw) = row.try_get_raw(idx) else {
        return CellValue::Null;
    };
    if raw.is_null() {
        return CellValue::Null;
    }

    let decoded = match category {
        TypeCategory::Boolean => get::<bool>(row, idx).map(CellValue::Bool),
        TypeCategory::SmallInt => get::<i16>(row, idx).map(|v| CellValue::Int(v.into())),
        TypeCategory::Integer => get::<i32>(row, idx).map(|v| CellValue::Int(v.into())),
        TypeCategory::BigInt => get::<i64>(row, idx).map(CellValue::Int),
        TypeCategory::Oid => get::<Oid>(row, idx).map(|v| CellValue::Int(v.0.into())),
        TypeCategory::Real => get::<f32>(row, idx).map(|v| CellValue::Float(v.into())),
        TypeCategory::Double => get::<f64>(row, idx).map(CellValue::Float),
        TypeCategory::Decimal => get::<RawDecimal>(row, idx).map(|v| CellValue::Numeric(v.0)),
        TypeCategory::Text => get::<String>(row, idx).map(CellValue::Text),
        TypeCategory::Char => {
            get::<i8>(row, idx).map(|v| CellValue::Text(char::from(v as u8).to_string()))
        }
        TypeCategory::Json => get::<JsonValue>(row, idx).map(CellValue::Json),
        TypeCategory::Binary => get::<Vec<u8>>(row, idx).map(CellValue::Bytes),
        TypeCategory::Uuid => get::<uuid::Uuid>(row, idx).map(CellValue::Uuid),
        TypeCategory::Date => get::<NaiveDate>(row, idx).map(CellValue::Date),
        TypeCategory::Time => get::<NaiveTime>(row, idx).map(CellValue::Time),
        TypeCategory::TimeTz => match raw.format() {
            PgValueFormat::Text => raw
                .as_str()
                .ok()
                .and_then(timetz_from_text)
                .map(|(time, offset)| CellValue::TimeTz(time, offset)),
            PgValueFormat::Binary => get::<PgTimeTz<NaiveTime, FixedOffset>>(row, idx)
                .map(|v| CellValue::TimeTz(v.time, v.offset)),
        },
        TypeCategory::Timestamp => get::<NaiveDateTime>(row, idx).map(CellValue::Timestamp),
        TypeCategory::TimestampTz => get::<DateTime<Utc>>(row, idx).map(CellValue::TimestampTz),
        TypeCategory::Interval => get::<PgInterval>(row, idx).map(|v| CellValue::Interval {
            months: v.months,
            days: v.days,
            microseconds: v.microseconds,
        }),
        TypeCategory::TextArray => get::<Vec<String>>(row, idx).map(|v| array(v, CellValue::Text)),
        TypeCategory::IntArray => {
            get::<Vec<i32>>(row, idx).map(|v| array(v, |i| CellValue::Int(i.into())))
        }
        TypeCategory::BigIntArray => get::<Vec<i64>>(row, idx).map(|v| array(v, CellValue::Int)),
        TypeCategory::BoolArray => get::<Vec<bool>>(row, idx).map(|v| array(v, CellValue::Bool)),
        TypeCategory::DoubleArray => {
            get::<Vec<f64>>(row, idx).map(|v| array(v, CellValue::Float))
        }
        TypeCategory::Unknown => None,
    };

    decoded.unwrap_or_else(|| fallback(raw, type_name))
}

fn get<'r, T>(row: &'r PgRow, idx: usize) -> Option<T>
where
    T: Decode<'r, sqlx::Postgres> + Type<sqlx::Postgres>,
{
    match row.try_get::<T, _>(idx) {
        Ok(v) => Some(v),
        Err(e) => {
            debug!(column = idx, error = %e, "Typed decode failed, using fallback");
            None
        }
    }
}

/// Parse text-format `timetz` such as `13:45:30.5+02` or `08:00:00-05:30`.
fn timetz_from_text(s: &str) -> Option<(NaiveTime, FixedOffset)> {
    let split = s.rfind(['+', '-'])?;
    let time = NaiveTime::parse_from_str(&s[..split], "%H:%M:%S%.f").ok()?;

    let (sign, zone) = s[split..].split_at(1);
    let mut parts = zone.split(':').map(|p| p.parse::<i32>().ok());
    let hours = parts.next()??;
    let minutes = parts.next().unwrap_or(Some(0))?;
    let seconds = parts.next().unwrap_or(Some(0))?;
    let total = hours * 3600 + minutes * 60 + seconds;
    let offset = if sign == "-" {
        FixedOffset::west_opt(total)
    } else {
        FixedOffset::east_opt(total)
    }?;
    Some((time, offset))
}

/// Arrays containing NULL elements fail typed decoding and take the fallback path.
fn array<T>(items: Vec<T>, wrap: impl Fn(T) -> CellValue) -> CellValue {
    CellValue::Array(items.into_iter().map(wrap).collect())
}

/// Text-format values are passed through verbatim; binary ones of unsupported
/// types are kept as bytes.
fn fallback(raw: PgValueRef<'_>, type_name: &str) -> CellValue {
    match raw.format() {
        PgValueFormat::Text => match raw.as_str() {
            Ok(s) => CellValue::Text(s.to_string()),
            Err(_) => CellValue::Null,
        },
        PgValueFormat::Binary => {
            debug!(type_name, "No decoder for binary value, returning raw bytes");
            raw.as_bytes()
                .map(|b| CellValue::Bytes(b.to_vec()))
                .unwrap_or(CellValue::Null)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numeric(ndigits: i16, weight: i16, sign: u16, dscale: u16, digits: &[i16]) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&ndigits.to_be_bytes());
        buf.extend_from_slice(&weight.to_be_bytes());
        buf.extend_from_slice(&sign.to_be_bytes());
        buf.extend_from_slice(&dscale.to_be_bytes());
        for d in digits {
            buf.extend_from_slice(&d.to_be_bytes());
        }
        buf
    }

    #[test]
    fn test_categorize_common_types() {
        assert_eq!(categorize_type("INT4"), TypeCategory::Integer);
        assert_eq!(categorize_type("int8"), TypeCategory::BigInt);
        assert_eq!(categorize_type("NUMERIC"), TypeCategory::Decimal);
        assert_eq!(categorize_type("VARCHAR"), TypeCategory::Text);
        assert_eq!(categorize_type("TIMESTAMPTZ"), TypeCategory::TimestampTz);
        assert_eq!(categorize_type("TEXT[]"), TypeCategory::TextArray);
        assert_eq!(categorize_type("\"CHAR\""), TypeCategory::Char);
        assert_eq!(categorize_type("INET"), TypeCategory::Unknown);
        assert_eq!(categorize_type("mood"), TypeCategory::Unknown);
    }

    #[test]
    fn test_timetz_text() {
        let (time, offset) = timetz_from_text("13:45:30+02").unwrap();
        assert_eq!(time, NaiveTime::from_hms_opt(13, 45, 30).unwrap());
        assert_eq!(offset.local_minus_utc(), 7200);

        let (time, offset) = timetz_from_text("08:00:00.25-05:30").unwrap();
        assert_eq!(time, NaiveTime::from_hms_milli_opt(8, 0, 0, 250).unwrap());
        assert_eq!(offset.local_minus_utc(), -(5 * 3600 + 30 * 60));

        assert!(timetz_from_text("13:45:30").is_none());
        assert!(timetz_from_text("garbage").is_none());
    }

    #[test]
    fn test_numeric_integer_groups() {
        // 1234567 = 123 * 10000 + 4567
        let buf = numeric(2, 1, 0, 0, &[123, 4567]);
        assert_eq!(numeric_from_binary(&buf).unwrap(), "1234567");
    }

    #[test]
    fn test_numeric_with_scale() {
        // 12.50 with dscale 2
        let buf = numeric(2, 0, 0, 2, &[12, 5000]);
        assert_eq!(numeric_from_binary(&buf).unwrap(), "12.50");
    }

    #[test]
    fn test_numeric_small_fraction() {
        // 0.00012 = 0001 at weight -1, then 2000
        let buf = numeric(2, -1, 0, 5, &[1, 2000]);
        assert_eq!(numeric_from_binary(&buf).unwrap(), "0.00012");

        // 0.000012 skips the first fractional group entirely
        let buf = numeric(1, -2, 0, 6, &[1200]);
        assert_eq!(numeric_from_binary(&buf).unwrap(), "0.000012");
    }

    #[test]
    fn test_numeric_negative() {
        let buf = numeric(1, 0, NUMERIC_NEG, 1, &[7]);
        assert_eq!(numeric_from_binary(&buf).unwrap(), "-7.0");
    }

    #[test]
    fn test_numeric_trailing_zero_groups() {
        // 20000 = 2 * 10000, stored without the trailing zero group
        let buf = numeric(1, 1, 0, 0, &[2]);
        assert_eq!(numeric_from_binary(&buf).unwrap(), "20000");
    }

    #[test]
    fn test_numeric_zero() {
        let buf = numeric(0, 0, 0, 2, &[]);
        assert_eq!(numeric_from_binary(&buf).unwrap(), "0.00");
    }

    #[test]
    fn test_numeric_special_values() {
        assert_eq!(
            numeric_from_binary(&numeric(0, 0, NUMERIC_NAN, 0, &[])).unwrap(),
            "NaN"
        );
        assert_eq!(
            numeric_from_binary(&numeric(0, 0, NUMERIC_NINF, 0, &[])).unwrap(),
            "-Infinity"
        );
    }

    #[test]
    fn test_numeric_truncated_buffer() {
        assert!(numeric_from_binary(&[0, 1]).is_none());
        let mut buf = numeric(2, 0, 0, 0, &[1]);
        buf.truncate(buf.len() - 1);
        assert!(numeric_from_binary(&buf).is_none());
    }
}
