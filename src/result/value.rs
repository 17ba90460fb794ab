// Copyright (c) 2025 ADBC Drivers Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Typed cell values and column types.

use chrono::{DateTime, NaiveDateTime, TimeDelta, Utc};
use serde_json::{Map, Number, Value};
use std::time::Duration;

use crate::error::{Error, Result};

/// Declared type of a result column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    Bool,
    DateTime,
    Dynamic,
    Guid,
    Int,
    Long,
    Real,
    String,
    TimeSpan,
    Decimal,
}

impl ColumnType {
    /// Parse a Kusto type name (`"long"`, `"datetime"`, ...).
    pub fn from_kusto_name(name: &str) -> Option<Self> {
        let ty = match name.to_ascii_lowercase().as_str() {
            "bool" | "boolean" => Self::Bool,
            "datetime" | "date" => Self::DateTime,
            "dynamic" => Self::Dynamic,
            "guid" | "uuid" | "uniqueid" => Self::Guid,
            "int" => Self::Int,
            "long" => Self::Long,
            "real" | "double" => Self::Real,
            "string" => Self::String,
            "timespan" | "time" => Self::TimeSpan,
            "decimal" => Self::Decimal,
            _ => return None,
        };
        Some(ty)
    }

    /// Parse a CLR type name as found in V1 `DataType`.
    pub fn from_clr_name(name: &str) -> Option<Self> {
        let name = name.strip_prefix("System.").unwrap_or(name);
        let ty = match name {
            "Boolean" | "SByte" => Self::Bool,
            "DateTime" => Self::DateTime,
            "Object" => Self::Dynamic,
            "Guid" => Self::Guid,
            "Int32" => Self::Int,
            "Int64" => Self::Long,
            "Double" | "Single" => Self::Real,
            "String" => Self::String,
            "TimeSpan" => Self::TimeSpan,
            "Decimal" | "Data.SqlTypes.SqlDecimal" => Self::Decimal,
            _ => return None,
        };
        Some(ty)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::DateTime => "datetime",
            Self::Dynamic => "dynamic",
            Self::Guid => "guid",
            Self::Int => "int",
            Self::Long => "long",
            Self::Real => "real",
            Self::String => "string",
            Self::TimeSpan => "timespan",
            Self::Decimal => "decimal",
        }
    }
}

/// A value of a `dynamic` column.
///
/// Produced by [`DynamicValue::decode`], which never fails: text that is
/// not valid JSON is kept as [`DynamicValue::RawFallback`].
#[derive(Debug, Clone, PartialEq)]
pub enum DynamicValue {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Object(Map<String, Value>),
    Array(Vec<Value>),
    RawFallback(String),
}

impl DynamicValue {
    /// Decode a raw dynamic cell.
    ///
    /// String cells are re-parsed as JSON: objects and arrays are unwrapped,
    /// scalars stay strings (so `"123"` is the string `"123"`), and anything
    /// unparsable is kept raw.
    pub fn decode(raw: Value) -> Self {
        match raw {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => Self::Number(n),
            Value::Object(o) => Self::Object(o),
            Value::Array(a) => Self::Array(a),
            Value::String(s) => match serde_json::from_str::<Value>(&s) {
                Ok(Value::Object(o)) => Self::Object(o),
                Ok(Value::Array(a)) => Self::Array(a),
                Ok(_) => Self::String(s),
                Err(_) => Self::RawFallback(s),
            },
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Text of a string or fallback value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) | Self::RawFallback(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Map<String, Value>> {
        match self {
            Self::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Convert back to a JSON value.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Bool(b) => Value::Bool(*b),
            Self::Number(n) => Value::Number(n.clone()),
            Self::String(s) | Self::RawFallback(s) => Value::String(s.clone()),
            Self::Object(o) => Value::Object(o.clone()),
            Self::Array(a) => Value::Array(a.clone()),
        }
    }
}

/// A decoded result cell.
#[derive(Debug, Clone, PartialEq)]
pub enum KustoValue {
    Null,
    Bool(bool),
    Int(i32),
    Long(i64),
    Real(f64),
    /// Kept as text to preserve precision.
    Decimal(String),
    String(String),
    DateTime(DateTime<Utc>),
    TimeSpan(TimeDelta),
    Guid(String),
    Dynamic(DynamicValue),
}

impl KustoValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null | Self::Dynamic(DynamicValue::Null))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) | Self::Dynamic(DynamicValue::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    /// Integer value of an `int`, `long` or numeric dynamic cell.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(i64::from(*i)),
            Self::Long(l) => Some(*l),
            Self::Dynamic(d) => d.as_i64(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Real(r) => Some(*r),
            Self::Int(i) => Some(f64::from(*i)),
            Self::Long(l) => Some(*l as f64),
            _ => None,
        }
    }

    /// Text of a string-like cell.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) | Self::Guid(s) | Self::Decimal(s) => Some(s),
            Self::Dynamic(d) => d.as_str(),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }

    pub fn as_timespan(&self) -> Option<TimeDelta> {
        match self {
            Self::TimeSpan(ts) => Some(*ts),
            _ => None,
        }
    }

    pub fn as_dynamic(&self) -> Option<&DynamicValue> {
        match self {
            Self::Dynamic(d) => Some(d),
            _ => None,
        }
    }
}

/// Decode one raw cell according to its column type.
///
/// JSON null is always [`KustoValue::Null`], except for `dynamic` columns
/// where it is the dynamic null.
pub fn decode_cell(column_type: ColumnType, raw: Value) -> Result<KustoValue> {
    if column_type == ColumnType::Dynamic {
        return Ok(KustoValue::Dynamic(DynamicValue::decode(raw)));
    }
    if raw.is_null() {
        return Ok(KustoValue::Null);
    }

    let mismatch = |raw: &Value| {
        Error::parse(format!(
            "Cannot decode {} as {}",
            raw,
            column_type.as_str()
        ))
    };

    let value = match column_type {
        ColumnType::Bool => match &raw {
            Value::Bool(b) => KustoValue::Bool(*b),
            Value::Number(n) => KustoValue::Bool(n.as_i64().ok_or_else(|| mismatch(&raw))? != 0),
            Value::String(s) if s.eq_ignore_ascii_case("true") => KustoValue::Bool(true),
            Value::String(s) if s.eq_ignore_ascii_case("false") => KustoValue::Bool(false),
            _ => return Err(mismatch(&raw)),
        },
        ColumnType::Int => {
            let wide = integer(&raw).ok_or_else(|| mismatch(&raw))?;
            KustoValue::Int(i32::try_from(wide).map_err(|_| mismatch(&raw))?)
        }
        ColumnType::Long => KustoValue::Long(integer(&raw).ok_or_else(|| mismatch(&raw))?),
        ColumnType::Real => match &raw {
            Value::Number(n) => KustoValue::Real(n.as_f64().ok_or_else(|| mismatch(&raw))?),
            Value::String(s) => KustoValue::Real(parse_real(s).ok_or_else(|| mismatch(&raw))?),
            _ => return Err(mismatch(&raw)),
        },
        ColumnType::Decimal => match raw {
            Value::String(s) => KustoValue::Decimal(s),
            Value::Number(n) => KustoValue::Decimal(n.to_string()),
            other => return Err(mismatch(&other)),
        },
        ColumnType::String => match raw {
            Value::String(s) => KustoValue::String(s),
            other => KustoValue::String(other.to_string()),
        },
        ColumnType::Guid => match raw {
            Value::String(s) => KustoValue::Guid(s),
            other => return Err(mismatch(&other)),
        },
        ColumnType::DateTime => {
            let text = raw.as_str().ok_or_else(|| mismatch(&raw))?;
            KustoValue::DateTime(parse_datetime(text).ok_or_else(|| mismatch(&raw))?)
        }
        ColumnType::TimeSpan => {
            let text = raw.as_str().ok_or_else(|| mismatch(&raw))?;
            KustoValue::TimeSpan(parse_timespan(text).ok_or_else(|| mismatch(&raw))?)
        }
        ColumnType::Dynamic => KustoValue::Dynamic(DynamicValue::decode(raw)),
    };
    Ok(value)
}

fn integer(raw: &Value) -> Option<i64> {
    match raw {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn parse_real(text: &str) -> Option<f64> {
    match text {
        "NaN" => Some(f64::NAN),
        "Infinity" => Some(f64::INFINITY),
        "-Infinity" => Some(f64::NEG_INFINITY),
        other => other.parse().ok(),
    }
}

/// Parse an ISO 8601 datetime. Values without an offset are taken as UTC.
pub fn parse_datetime(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Parse a Kusto timespan: `[-][d.]hh:mm:ss[.fffffff]`.
pub fn parse_timespan(text: &str) -> Option<TimeDelta> {
    let (negative, body) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };

    let mut parts = body.split(':');
    let head = parts.next()?;
    let minutes: i64 = parts.next()?.parse().ok()?;
    let seconds = parts.next()?;
    if parts.next().is_some() || minutes > 59 {
        return None;
    }

    let (days, hours): (i64, i64) = match head.split_once('.') {
        Some((d, h)) => (d.parse().ok()?, h.parse().ok()?),
        None => (0, head.parse().ok()?),
    };

    let (secs, nanos): (i64, i64) = match seconds.split_once('.') {
        Some((s, frac)) => {
            if frac.is_empty() || frac.len() > 9 || !frac.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            (s.parse().ok()?, format!("{:0<9}", frac).parse().ok()?)
        }
        None => (seconds.parse().ok()?, 0),
    };
    if secs > 59 {
        return None;
    }

    let total = TimeDelta::try_days(days)?
        + TimeDelta::try_hours(hours)?
        + TimeDelta::try_minutes(minutes)?
        + TimeDelta::try_seconds(secs)?
        + TimeDelta::nanoseconds(nanos);
    Some(if negative { -total } else { total })
}

/// Format a duration as a Kusto timespan literal (`[d.]hh:mm:ss[.fffffff]`).
pub fn format_timespan(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    let days = total_secs / 86_400;
    let hours = (total_secs % 86_400) / 3_600;
    let minutes = (total_secs % 3_600) / 60;
    let seconds = total_secs % 60;
    let ticks = duration.subsec_nanos() / 100;

    let mut out = String::new();
    if days > 0 {
        out.push_str(&format!("{}.", days));
    }
    out.push_str(&format!("{:02}:{:02}:{:02}", hours, minutes, seconds));
    if ticks > 0 {
        out.push_str(&format!(".{:07}", ticks));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_dynamic_decode() {
        assert_eq!(DynamicValue::decode(json!(123)).as_i64(), Some(123));
        assert_eq!(
            DynamicValue::decode(json!("123")),
            DynamicValue::String("123".into())
        );
        assert_eq!(
            DynamicValue::decode(json!("test bad json")),
            DynamicValue::RawFallback("test bad json".into())
        );
        assert_eq!(DynamicValue::decode(Value::Null), DynamicValue::Null);

        let decoded = DynamicValue::decode(json!(r#"{"a":1}"#));
        assert_eq!(decoded.as_object().unwrap()["a"], json!(1));

        let array = DynamicValue::decode(json!("[0,2]"));
        assert_eq!(array, DynamicValue::Array(vec![json!(0), json!(2)]));
    }

    #[test]
    fn test_column_type_names() {
        assert_eq!(ColumnType::from_kusto_name("long"), Some(ColumnType::Long));
        assert_eq!(ColumnType::from_kusto_name("DateTime"), Some(ColumnType::DateTime));
        assert_eq!(ColumnType::from_kusto_name("nope"), None);
        assert_eq!(ColumnType::from_clr_name("Int32"), Some(ColumnType::Int));
        assert_eq!(ColumnType::from_clr_name("System.Object"), Some(ColumnType::Dynamic));
    }

    #[test]
    fn test_decode_scalars() {
        assert_eq!(decode_cell(ColumnType::Int, json!(5)).unwrap(), KustoValue::Int(5));
        assert_eq!(
            decode_cell(ColumnType::Long, json!("9007199254740993")).unwrap(),
            KustoValue::Long(9007199254740993)
        );
        assert_eq!(
            decode_cell(ColumnType::Bool, json!(1)).unwrap(),
            KustoValue::Bool(true)
        );
        assert_eq!(
            decode_cell(ColumnType::Decimal, json!("0.1")).unwrap(),
            KustoValue::Decimal("0.1".into())
        );
        assert!(decode_cell(ColumnType::Real, json!("NaN"))
            .unwrap()
            .as_f64()
            .unwrap()
            .is_nan());
        assert!(decode_cell(ColumnType::Int, json!(10_000_000_000i64)).is_err());
    }

    #[test]
    fn test_decode_null_is_explicit() {
        assert_eq!(decode_cell(ColumnType::String, Value::Null).unwrap(), KustoValue::Null);
        assert_eq!(
            decode_cell(ColumnType::Dynamic, Value::Null).unwrap(),
            KustoValue::Dynamic(DynamicValue::Null)
        );
        assert!(decode_cell(ColumnType::Dynamic, Value::Null).unwrap().is_null());
    }

    #[test]
    fn test_decode_datetime() {
        let value =
            decode_cell(ColumnType::DateTime, json!("2016-06-06T15:35:00.1234567Z")).unwrap();
        let dt = value.as_datetime().unwrap();
        assert_eq!(dt.timestamp(), 1465227300);
        assert_eq!(dt.timestamp_subsec_nanos(), 123_456_700);

        let naive = decode_cell(ColumnType::DateTime, json!("2016-06-06T15:35:00")).unwrap();
        assert_eq!(naive.as_datetime().unwrap().timestamp(), 1465227300);

        assert!(decode_cell(ColumnType::DateTime, json!("yesterday")).is_err());
    }

    #[test]
    fn test_parse_timespan() {
        assert_eq!(parse_timespan("00:00:01"), Some(TimeDelta::seconds(1)));
        assert_eq!(
            parse_timespan("1.02:03:04.5"),
            Some(
                TimeDelta::days(1)
                    + TimeDelta::hours(2)
                    + TimeDelta::minutes(3)
                    + TimeDelta::seconds(4)
                    + TimeDelta::milliseconds(500)
            )
        );
        assert_eq!(parse_timespan("-00:00:00.0000001"), Some(-TimeDelta::nanoseconds(100)));
        assert_eq!(parse_timespan("00:61:00"), None);
        assert_eq!(parse_timespan("garbage"), None);
    }

    #[test]
    fn test_format_timespan() {
        assert_eq!(format_timespan(Duration::from_secs(240)), "00:04:00");
        assert_eq!(format_timespan(Duration::from_secs(90_061)), "1.01:01:01");
        assert_eq!(format_timespan(Duration::from_millis(1500)), "00:00:01.5000000");
    }
}
