//! Casting between atomic types for the subset the comparison machinery needs.

use super::XdmAtomicValue;
use super::temporal;
use crate::runtime::{Error, ErrorCode};
use crate::types::AtomicType;
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use std::str::FromStr;

fn invalid(lexical: &str, target: AtomicType) -> Error {
    Error::from_code(
        ErrorCode::FORG0001,
        format!("'{lexical}' is not a valid lexical form for {target}"),
    )
}

fn parse_double(s: &str) -> Option<f64> {
    match s {
        "INF" | "+INF" => Some(f64::INFINITY),
        "-INF" => Some(f64::NEG_INFINITY),
        "NaN" => Some(f64::NAN),
        _ => {
            // Rust accepts spellings like "inf" and "nan" that xs:double does not
            let lower = s.to_ascii_lowercase();
            if lower.contains("inf") || lower.contains("nan") {
                return None;
            }
            s.parse::<f64>().ok()
        }
    }
}

/// Cast the lexical form of a string or untyped value to `target`.
pub fn cast_from_str(lexical: &str, target: AtomicType) -> Result<XdmAtomicValue, Error> {
    use XdmAtomicValue as V;
    let s = lexical.trim();
    let value = match target {
        AtomicType::String => V::String(lexical.to_string()),
        AtomicType::UntypedAtomic => V::UntypedAtomic(lexical.to_string()),
        AtomicType::AnyUri => V::AnyUri(s.to_string()),
        AtomicType::Boolean => match s {
            "true" | "1" => V::Boolean(true),
            "false" | "0" => V::Boolean(false),
            _ => return Err(invalid(lexical, target)),
        },
        AtomicType::Integer => V::Integer(s.parse::<i64>().map_err(|_| invalid(lexical, target))?),
        AtomicType::Decimal => {
            if s.contains(['e', 'E']) {
                return Err(invalid(lexical, target));
            }
            V::Decimal(Decimal::from_str(s).map_err(|_| invalid(lexical, target))?)
        }
        AtomicType::Double => V::Double(parse_double(s).ok_or_else(|| invalid(lexical, target))?),
        AtomicType::Float => {
            V::Float(parse_double(s).ok_or_else(|| invalid(lexical, target))? as f32)
        }
        AtomicType::Date => {
            let (date, tz) = temporal::parse_date(s).ok_or_else(|| invalid(lexical, target))?;
            V::Date { date, tz }
        }
        AtomicType::Time => {
            let (time, tz) = temporal::parse_time(s).ok_or_else(|| invalid(lexical, target))?;
            V::Time { time, tz }
        }
        AtomicType::DateTime => {
            let (value, tz) = temporal::parse_date_time(s).ok_or_else(|| invalid(lexical, target))?;
            V::DateTime { value, tz }
        }
        AtomicType::Duration => {
            let d = temporal::parse_duration(s).ok_or_else(|| invalid(lexical, target))?;
            V::Duration {
                months: d.months,
                seconds: d.seconds,
            }
        }
        AtomicType::YearMonthDuration => match temporal::parse_duration(s) {
            Some(d) if !d.has_day_time => V::YearMonthDuration(d.months),
            _ => return Err(invalid(lexical, target)),
        },
        AtomicType::DayTimeDuration => match temporal::parse_duration(s) {
            Some(d) if !d.has_year_month => V::DayTimeDuration(d.seconds),
            _ => return Err(invalid(lexical, target)),
        },
        AtomicType::QName => match s.split_once(':') {
            Some((prefix, local)) if !prefix.is_empty() && !local.is_empty() => V::QName {
                ns_uri: None,
                prefix: Some(prefix.to_string()),
                local: local.to_string(),
            },
            None if !s.is_empty() => V::QName {
                ns_uri: None,
                prefix: None,
                local: s.to_string(),
            },
            _ => return Err(invalid(lexical, target)),
        },
    };
    Ok(value)
}

/// Cast an atomic value to `target`.
///
/// Supports identity, promotion along the numeric tower, casting to and from
/// the string-like types, and the duration family. Anything else is a type error.
pub fn cast_atomic(value: &XdmAtomicValue, target: AtomicType) -> Result<XdmAtomicValue, Error> {
    use XdmAtomicValue as V;
    if value.atomic_type() == target {
        return Ok(value.clone());
    }
    if let Some(s) = value.as_str() {
        return cast_from_str(s, target);
    }
    let cast = match (value, target) {
        (_, AtomicType::String) => Some(V::String(value.to_string())),
        (_, AtomicType::UntypedAtomic) => Some(V::UntypedAtomic(value.to_string())),
        (V::Integer(i), AtomicType::Decimal) => Some(V::Decimal(Decimal::from(*i))),
        (V::Integer(i), AtomicType::Double) => Some(V::Double(*i as f64)),
        (V::Integer(i), AtomicType::Float) => Some(V::Float(*i as f32)),
        (V::Decimal(d), AtomicType::Double) => d.to_f64().map(V::Double),
        (V::Decimal(d), AtomicType::Float) => d.to_f32().map(V::Float),
        (V::Decimal(d), AtomicType::Integer) => d.trunc().to_i64().map(V::Integer),
        (V::Float(f), AtomicType::Double) => Some(V::Double(f64::from(*f))),
        (V::Double(d), AtomicType::Float) => Some(V::Float(*d as f32)),
        (V::Double(d), AtomicType::Decimal) if d.is_finite() => Decimal::from_f64(*d).map(V::Decimal),
        (V::Boolean(b), t) if t.is_numeric() => {
            return cast_from_str(if *b { "1" } else { "0" }, t);
        }
        (v, AtomicType::Boolean) => v.effective_boolean_value().map(V::Boolean),
        (V::Duration { months, .. }, AtomicType::YearMonthDuration) => Some(V::YearMonthDuration(*months)),
        (V::Duration { seconds, .. }, AtomicType::DayTimeDuration) => Some(V::DayTimeDuration(*seconds)),
        (V::YearMonthDuration(months), AtomicType::Duration) => Some(V::Duration {
            months: *months,
            seconds: 0,
        }),
        (V::DayTimeDuration(seconds), AtomicType::Duration) => Some(V::Duration {
            months: 0,
            seconds: *seconds,
        }),
        (V::DateTime { value, tz }, AtomicType::Date) => Some(V::Date { date: value.date(), tz: *tz }),
        (V::DateTime { value, tz }, AtomicType::Time) => Some(V::Time { time: value.time(), tz: *tz }),
        _ => None,
    };
    cast.ok_or_else(|| {
        Error::from_code(
            ErrorCode::XPTY0004,
            format!("cannot cast {} to {}", value.atomic_type(), target),
        )
    })
}

/// `fn:number` style conversion used by XPath 1.0 compatibility mode:
/// anything that is not convertible becomes NaN.
pub fn to_double(value: &XdmAtomicValue) -> f64 {
    match cast_atomic(value, AtomicType::Double) {
        Ok(XdmAtomicValue::Double(d)) => d,
        _ => f64::NAN,
    }
}
