//! Native cell values decoded from result rows.
//!
//! Values stay in their native form while inside the query engine. The single
//! conversion to transport JSON is [`CellValue::into_json`], which is also the
//! only place temporal values become ISO-8601 text.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc};
use serde_json::Value as JsonValue;

/// One decoded column value.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    /// NUMERIC/DECIMAL kept as exact decimal text.
    Numeric(String),
    Text(String),
    Json(JsonValue),
    Bytes(Vec<u8>),
    Uuid(uuid::Uuid),
    Date(NaiveDate),
    Time(NaiveTime),
    TimeTz(NaiveTime, FixedOffset),
    Timestamp(NaiveDateTime),
    TimestampTz(DateTime<Utc>),
    Interval {
        months: i32,
        days: i32,
        microseconds: i64,
    },
    Array(Vec<CellValue>),
}

/// A decoded row: column names paired with values, in projection order.
pub type CellRow = Vec<(String, CellValue)>;

impl CellValue {
    /// Convert into a transport-safe JSON value.
    pub fn into_json(self) -> JsonValue {
        match self {
            Self::Null => JsonValue::Null,
            Self::Bool(b) => JsonValue::Bool(b),
            Self::Int(i) => JsonValue::Number(i.into()),
            Self::Float(f) => serde_json::Number::from_f64(f)
                .map(JsonValue::Number)
                .unwrap_or_else(|| JsonValue::String(float_text(f))),
            Self::Numeric(s) | Self::Text(s) => JsonValue::String(s),
            Self::Json(v) => v,
            Self::Bytes(b) => JsonValue::String(STANDARD.encode(b)),
            Self::Uuid(u) => JsonValue::String(u.to_string()),
            Self::Date(d) => JsonValue::String(format_date(d)),
            Self::Time(t) => JsonValue::String(format_time(t)),
            Self::TimeTz(t, offset) => {
                JsonValue::String(format!("{}{}", format_time(t), format_offset(offset)))
            }
            Self::Timestamp(ts) => JsonValue::String(format_timestamp(ts)),
            Self::TimestampTz(ts) => {
                JsonValue::String(format!("{}+00:00", format_timestamp(ts.naive_utc())))
            }
            Self::Interval {
                months,
                days,
                microseconds,
            } => JsonValue::String(format_interval(months, days, microseconds)),
            Self::Array(items) => {
                JsonValue::Array(items.into_iter().map(CellValue::into_json).collect())
            }
        }
    }
}

/// Convert a decoded row into an ordered JSON object.
pub fn row_into_json(row: CellRow) -> serde_json::Map<String, JsonValue> {
    row.into_iter()
        .map(|(name, value)| (name, value.into_json()))
        .collect()
}

fn float_text(f: f64) -> String {
    if f.is_nan() {
        "NaN".to_string()
    } else if f.is_sign_positive() {
        "Infinity".to_string()
    } else {
        "-Infinity".to_string()
    }
}

fn format_date(d: NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}

/// `HH:MM:SS`, with six fractional digits only when the fraction is non-zero.
fn format_time(t: NaiveTime) -> String {
    if t.nanosecond() == 0 {
        t.format("%H:%M:%S").to_string()
    } else {
        t.format("%H:%M:%S%.6f").to_string()
    }
}

fn format_timestamp(ts: NaiveDateTime) -> String {
    format!("{}T{}", format_date(ts.date()), format_time(ts.time()))
}

fn format_offset(offset: FixedOffset) -> String {
    let secs = offset.local_minus_utc();
    let sign = if secs < 0 { '-' } else { '+' };
    let secs = secs.abs();
    format!("{}{:02}:{:02}", sign, secs / 3600, (secs % 3600) / 60)
}

/// ISO-8601 duration, e.g. `P1Y2M3DT4H5M6.5S`. Each component keeps its own sign.
fn format_interval(months: i32, days: i32, microseconds: i64) -> String {
    let mut out = String::from("P");
    let (years, months) = (months / 12, months % 12);
    if years != 0 {
        out.push_str(&format!("{years}Y"));
    }
    if months != 0 {
        out.push_str(&format!("{months}M"));
    }
    if days != 0 {
        out.push_str(&format!("{days}D"));
    }

    let hours = microseconds / 3_600_000_000;
    let minutes = (microseconds % 3_600_000_000) / 60_000_000;
    let micros = microseconds % 60_000_000;
    if hours != 0 || minutes != 0 || micros != 0 {
        out.push('T');
        if hours != 0 {
            out.push_str(&format!("{hours}H"));
        }
        if minutes != 0 {
            out.push_str(&format!("{minutes}M"));
        }
        if micros != 0 {
            let sign = if micros < 0 { "-" } else { "" };
            let (whole, frac) = (micros.abs() / 1_000_000, micros.abs() % 1_000_000);
            if frac == 0 {
                out.push_str(&format!("{sign}{whole}S"));
            } else {
                let frac = format!("{frac:06}");
                out.push_str(&format!("{sign}{whole}.{}S", frac.trim_end_matches('0')));
            }
        }
    }

    if out.len() == 1 {
        out.push_str("T0S");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_date_renders_iso() {
        assert_eq!(CellValue::Date(date(2024, 3, 9)).into_json(), json!("2024-03-09"));
    }

    #[test]
    fn test_time_omits_zero_fraction() {
        let t = NaiveTime::from_hms_opt(7, 5, 0).unwrap();
        assert_eq!(CellValue::Time(t).into_json(), json!("07:05:00"));
    }

    #[test]
    fn test_time_keeps_microseconds() {
        let t = NaiveTime::from_hms_micro_opt(7, 5, 0, 120).unwrap();
        assert_eq!(CellValue::Time(t).into_json(), json!("07:05:00.000120"));
    }

    #[test]
    fn test_timestamp_uses_t_separator() {
        let ts = date(2023, 12, 31).and_hms_opt(23, 59, 58).unwrap();
        assert_eq!(
            CellValue::Timestamp(ts).into_json(),
            json!("2023-12-31T23:59:58")
        );
    }

    #[test]
    fn test_timestamptz_is_utc_with_offset_suffix() {
        let ts = date(2024, 1, 2)
            .and_hms_micro_opt(3, 4, 5, 500_000)
            .unwrap()
            .and_utc();
        assert_eq!(
            CellValue::TimestampTz(ts).into_json(),
            json!("2024-01-02T03:04:05.500000+00:00")
        );
    }

    #[test]
    fn test_timetz_carries_offset() {
        let t = NaiveTime::from_hms_opt(12, 0, 0).unwrap();
        let east = FixedOffset::east_opt(5 * 3600 + 30 * 60).unwrap();
        let west = FixedOffset::west_opt(8 * 3600).unwrap();
        assert_eq!(CellValue::TimeTz(t, east).into_json(), json!("12:00:00+05:30"));
        assert_eq!(CellValue::TimeTz(t, west).into_json(), json!("12:00:00-08:00"));
    }

    #[test]
    fn test_interval_iso_duration() {
        let v = CellValue::Interval {
            months: 14,
            days: 3,
            microseconds: 4 * 3_600_000_000 + 5 * 60_000_000 + 6_500_000,
        };
        assert_eq!(v.into_json(), json!("P1Y2M3DT4H5M6.5S"));
    }

    #[test]
    fn test_zero_interval() {
        let v = CellValue::Interval {
            months: 0,
            days: 0,
            microseconds: 0,
        };
        assert_eq!(v.into_json(), json!("PT0S"));
    }

    #[test]
    fn test_negative_interval_components() {
        let v = CellValue::Interval {
            months: 0,
            days: -1,
            microseconds: -90_000_000,
        };
        assert_eq!(v.into_json(), json!("P-1DT-1M-30S"));
    }

    #[test]
    fn test_non_finite_float_becomes_text() {
        assert_eq!(CellValue::Float(f64::NAN).into_json(), json!("NaN"));
        assert_eq!(
            CellValue::Float(f64::NEG_INFINITY).into_json(),
            json!("-Infinity")
        );
        assert_eq!(CellValue::Float(1.25).into_json(), json!(1.25));
    }

    #[test]
    fn test_bytes_are_base64() {
        assert_eq!(
            CellValue::Bytes(b"hello".to_vec()).into_json(),
            json!("aGVsbG8=")
        );
    }

    #[test]
    fn test_native_values_compare_before_conversion() {
        let earlier = CellValue::Date(date(2024, 1, 1));
        let later = CellValue::Date(date(2024, 1, 2));
        assert_ne!(earlier, later);
        assert_ne!(earlier, CellValue::Text("2024-01-01".into()));
    }

    #[test]
    fn test_row_keeps_column_order() {
        let row = vec![
            ("z".to_string(), CellValue::Int(1)),
            ("a".to_string(), CellValue::Null),
            ("m".to_string(), CellValue::Numeric("1.50".into())),
        ];
        let obj = row_into_json(row);
        let keys: Vec<&str> = obj.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
        assert_eq!(obj["m"], json!("1.50"));
    }
}
