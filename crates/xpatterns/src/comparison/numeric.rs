//! Numeric classification and promotion shared by the numeric comparators.

use crate::xdm::XdmAtomicValue;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

/// Numeric classification carrying the value.
#[derive(Debug, Clone, Copy)]
pub(crate) enum NumKind {
    Int(i64),
    Dec(Decimal),
    Float(f32),
    Double(f64),
}

impl NumKind {
    /// Lossy for decimals outside the `f64` range, which become NaN.
    pub(crate) fn to_f64(self) -> f64 {
        match self {
            NumKind::Int(i) => i as f64,
            NumKind::Dec(d) => d.to_f64().unwrap_or(f64::NAN),
            NumKind::Float(f) => f64::from(f),
            NumKind::Double(d) => d,
        }
    }

    pub(crate) fn to_decimal(self) -> Option<Decimal> {
        match self {
            NumKind::Int(i) => Some(Decimal::from(i)),
            NumKind::Dec(d) => Some(d),
            NumKind::Float(_) | NumKind::Double(_) => None,
        }
    }
}

pub(crate) fn classify(v: &XdmAtomicValue) -> Option<NumKind> {
    match v {
        XdmAtomicValue::Integer(i) => Some(NumKind::Int(*i)),
        XdmAtomicValue::Decimal(d) => Some(NumKind::Dec(*d)),
        XdmAtomicValue::Float(f) => Some(NumKind::Float(*f)),
        XdmAtomicValue::Double(d) => Some(NumKind::Double(*d)),
        _ => None,
    }
}

/// Promote two values to their common numeric type: integer stays integer,
/// integer with decimal becomes decimal, anything with a float or double is
/// compared in double precision.
pub(crate) fn unify(a: NumKind, b: NumKind) -> (NumKind, NumKind) {
    use NumKind::*;
    match (a, b) {
        (Int(x), Int(y)) => (Int(x), Int(y)),
        (Int(_) | Dec(_), Int(_) | Dec(_)) => match (a.to_decimal(), b.to_decimal()) {
            (Some(x), Some(y)) => (Dec(x), Dec(y)),
            _ => (Double(a.to_f64()), Double(b.to_f64())),
        },
        _ => (Double(a.to_f64()), Double(b.to_f64())),
    }
}
