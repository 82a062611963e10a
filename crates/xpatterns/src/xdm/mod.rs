use crate::consts::{FNS, XS};
use crate::types::AtomicType;
use chrono::{FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use core::fmt;
use rust_decimal::Decimal;
use std::sync::Arc;

pub mod cast;
pub mod temporal;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExpandedName {
    pub ns_uri: Option<String>,
    pub local: String,
}

impl ExpandedName {
    pub fn new(ns_uri: Option<String>, local: impl Into<String>) -> Self {
        Self {
            ns_uri,
            local: local.into(),
        }
    }

    /// Name in the standard function namespace.
    pub fn fn_name(local: impl Into<String>) -> Self {
        Self::new(Some(FNS.to_string()), local)
    }
}

impl fmt::Display for ExpandedName {
    /// Well-known namespaces print with their conventional prefix, everything
    /// else in Clark-like `Q{ns}local` notation.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.ns_uri.as_deref() {
            None => f.write_str(&self.local),
            Some(FNS) => write!(f, "fn:{}", self.local),
            Some(XS) => write!(f, "xs:{}", self.local),
            Some(ns) => write!(f, "Q{{{}}}{}", ns, self.local),
        }
    }
}

/// The atomic value universe supported by the core.
///
/// Temporal values keep their timezone optional; comparisons fill in the
/// implicit timezone of the dynamic context. Durations are stored canonically:
/// total months and total seconds (fractional seconds are truncated).
#[derive(Debug, Clone, PartialEq)]
pub enum XdmAtomicValue {
    Boolean(bool),
    String(String),
    UntypedAtomic(String),
    AnyUri(String),
    Integer(i64),
    Decimal(Decimal),
    Float(f32),
    Double(f64),
    Date {
        date: NaiveDate,
        tz: Option<FixedOffset>,
    },
    Time {
        time: NaiveTime,
        tz: Option<FixedOffset>,
    },
    DateTime {
        value: NaiveDateTime,
        tz: Option<FixedOffset>,
    },
    Duration {
        months: i32,
        seconds: i64,
    },
    YearMonthDuration(i32),
    DayTimeDuration(i64),
    QName {
        ns_uri: Option<String>,
        prefix: Option<String>,
        local: String,
    },
}

impl XdmAtomicValue {
    pub fn atomic_type(&self) -> AtomicType {
        use XdmAtomicValue as V;
        match self {
            V::Boolean(_) => AtomicType::Boolean,
            V::String(_) => AtomicType::String,
            V::UntypedAtomic(_) => AtomicType::UntypedAtomic,
            V::AnyUri(_) => AtomicType::AnyUri,
            V::Integer(_) => AtomicType::Integer,
            V::Decimal(_) => AtomicType::Decimal,
            V::Float(_) => AtomicType::Float,
            V::Double(_) => AtomicType::Double,
            V::Date { .. } => AtomicType::Date,
            V::Time { .. } => AtomicType::Time,
            V::DateTime { .. } => AtomicType::DateTime,
            V::Duration { .. } => AtomicType::Duration,
            V::YearMonthDuration(_) => AtomicType::YearMonthDuration,
            V::DayTimeDuration(_) => AtomicType::DayTimeDuration,
            V::QName { .. } => AtomicType::QName,
        }
    }

    /// Borrow the lexical content of string-like values (`xs:string`,
    /// `xs:untypedAtomic`, `xs:anyURI`).
    pub fn as_str(&self) -> Option<&str> {
        match self {
            XdmAtomicValue::String(s) | XdmAtomicValue::UntypedAtomic(s) | XdmAtomicValue::AnyUri(s) => {
                Some(s)
            }
            _ => None,
        }
    }

    pub fn is_nan(&self) -> bool {
        match self {
            XdmAtomicValue::Double(d) => d.is_nan(),
            XdmAtomicValue::Float(f) => f.is_nan(),
            _ => false,
        }
    }

    /// Effective boolean value of a single atomic value, `None` when the type
    /// has no EBV (FORG0006 territory).
    pub fn effective_boolean_value(&self) -> Option<bool> {
        use XdmAtomicValue as V;
        match self {
            V::Boolean(b) => Some(*b),
            V::String(s) | V::UntypedAtomic(s) | V::AnyUri(s) => Some(!s.is_empty()),
            V::Integer(i) => Some(*i != 0),
            V::Decimal(d) => Some(!d.is_zero()),
            V::Float(f) => Some(*f != 0.0 && !f.is_nan()),
            V::Double(d) => Some(*d != 0.0 && !d.is_nan()),
            _ => None,
        }
    }

    /// Whether comparing this value depends on the implicit timezone.
    pub fn is_timezone_sensitive(&self) -> bool {
        matches!(
            self,
            XdmAtomicValue::Date { tz: None, .. }
                | XdmAtomicValue::Time { tz: None, .. }
                | XdmAtomicValue::DateTime { tz: None, .. }
        )
    }
}

impl fmt::Display for XdmAtomicValue {
    /// Canonical lexical form.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use XdmAtomicValue as V;
        match self {
            V::Boolean(b) => write!(f, "{b}"),
            V::String(s) | V::UntypedAtomic(s) | V::AnyUri(s) => f.write_str(s),
            V::Integer(i) => write!(f, "{i}"),
            V::Decimal(d) => write!(f, "{}", d.normalize()),
            V::Float(x) => f.write_str(&temporal::format_float(f64::from(*x))),
            V::Double(x) => f.write_str(&temporal::format_float(*x)),
            V::Date { date, tz } => write!(f, "{}{}", temporal::format_date(*date), temporal::format_tz(*tz)),
            V::Time { time, tz } => write!(f, "{}{}", temporal::format_time(*time), temporal::format_tz(*tz)),
            V::DateTime { value, tz } => write!(
                f,
                "{}T{}{}",
                temporal::format_date(value.date()),
                temporal::format_time(value.time()),
                temporal::format_tz(*tz)
            ),
            V::Duration { months, seconds } => f.write_str(&temporal::format_duration(*months, *seconds)),
            V::YearMonthDuration(months) => f.write_str(&temporal::format_duration(*months, 0)),
            V::DayTimeDuration(seconds) => f.write_str(&temporal::format_duration(0, *seconds)),
            V::QName { prefix, local, .. } => match prefix {
                Some(p) => write!(f, "{p}:{local}"),
                None => f.write_str(local),
            },
        }
    }
}

impl From<bool> for XdmAtomicValue {
    fn from(b: bool) -> Self {
        XdmAtomicValue::Boolean(b)
    }
}

impl From<i64> for XdmAtomicValue {
    fn from(i: i64) -> Self {
        XdmAtomicValue::Integer(i)
    }
}

impl From<f64> for XdmAtomicValue {
    fn from(d: f64) -> Self {
        XdmAtomicValue::Double(d)
    }
}

impl From<&str> for XdmAtomicValue {
    fn from(s: &str) -> Self {
        XdmAtomicValue::String(s.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Document,
    Element,
    Attribute,
    Text,
    Comment,
    ProcessingInstruction,
    Namespace,
}

/// Minimal node model required by the core. Node trees are owned by the host;
/// the core only atomizes nodes and hands them through.
pub trait XdmNode: fmt::Debug + Send + Sync {
    fn kind(&self) -> NodeKind;
    fn string_value(&self) -> String;
    /// Typed value used by atomization. Nodes without schema type information
    /// yield their string value as `xs:untypedAtomic`.
    fn typed_value(&self) -> Vec<XdmAtomicValue> {
        vec![XdmAtomicValue::UntypedAtomic(self.string_value())]
    }
    fn document_uri(&self) -> Option<String> {
        None
    }
}

pub type NodeHandle = Arc<dyn XdmNode>;

#[derive(Debug, Clone)]
pub enum XdmItem {
    Atomic(XdmAtomicValue),
    Node(NodeHandle),
}

impl XdmItem {
    pub fn as_atomic(&self) -> Option<&XdmAtomicValue> {
        match self {
            XdmItem::Atomic(a) => Some(a),
            XdmItem::Node(_) => None,
        }
    }
}

impl PartialEq for XdmItem {
    /// Atomic items compare by value, nodes by identity.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (XdmItem::Atomic(a), XdmItem::Atomic(b)) => a == b,
            (XdmItem::Node(a), XdmItem::Node(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<XdmAtomicValue> for XdmItem {
    fn from(a: XdmAtomicValue) -> Self {
        XdmItem::Atomic(a)
    }
}

impl fmt::Display for XdmItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            XdmItem::Node(n) => write!(f, "<{:?} node>", n.kind()),
            XdmItem::Atomic(a) => write!(f, "{a}"),
        }
    }
}

pub type XdmSequence = Vec<XdmItem>;
