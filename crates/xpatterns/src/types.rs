//! Static type descriptors: atomic types, item types, cardinalities and
//! sequence types.

use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AtomicType {
    Boolean,
    String,
    UntypedAtomic,
    AnyUri,
    Integer,
    Decimal,
    Float,
    Double,
    Date,
    Time,
    DateTime,
    Duration,
    YearMonthDuration,
    DayTimeDuration,
    QName,
}

impl AtomicType {
    pub fn local_name(self) -> &'static str {
        use AtomicType::*;
        match self {
            Boolean => "boolean",
            String => "string",
            UntypedAtomic => "untypedAtomic",
            AnyUri => "anyURI",
            Integer => "integer",
            Decimal => "decimal",
            Float => "float",
            Double => "double",
            Date => "date",
            Time => "time",
            DateTime => "dateTime",
            Duration => "duration",
            YearMonthDuration => "yearMonthDuration",
            DayTimeDuration => "dayTimeDuration",
            QName => "QName",
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            AtomicType::Integer | AtomicType::Decimal | AtomicType::Float | AtomicType::Double
        )
    }

    pub fn is_duration(self) -> bool {
        matches!(
            self,
            AtomicType::Duration | AtomicType::YearMonthDuration | AtomicType::DayTimeDuration
        )
    }

    pub fn is_temporal(self) -> bool {
        matches!(self, AtomicType::Date | AtomicType::Time | AtomicType::DateTime)
    }

    /// Derivation by restriction within the supported subset.
    pub fn is_subtype_of(self, other: AtomicType) -> bool {
        self == other
            || matches!(
                (self, other),
                (AtomicType::Integer, AtomicType::Decimal)
                    | (AtomicType::YearMonthDuration, AtomicType::Duration)
                    | (AtomicType::DayTimeDuration, AtomicType::Duration)
            )
    }
}

impl fmt::Display for AtomicType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "xs:{}", self.local_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemType {
    Item,
    Node,
    AnyAtomic,
    /// Union of the four numeric primitives, used for function signatures and
    /// for inferred types of arithmetic over mixed numerics.
    Numeric,
    Atomic(AtomicType),
}

impl ItemType {
    pub fn is_subtype_of(self, other: ItemType) -> bool {
        match (self, other) {
            (_, ItemType::Item) => true,
            (ItemType::Node, ItemType::Node) => true,
            (ItemType::AnyAtomic | ItemType::Numeric | ItemType::Atomic(_), ItemType::AnyAtomic) => true,
            (ItemType::Numeric, ItemType::Numeric) => true,
            (ItemType::Atomic(t), ItemType::Numeric) => t.is_numeric(),
            (ItemType::Atomic(a), ItemType::Atomic(b)) => a.is_subtype_of(b),
            _ => false,
        }
    }

    /// Least common supertype.
    pub fn union(self, other: ItemType) -> ItemType {
        if self.is_subtype_of(other) {
            other
        } else if other.is_subtype_of(self) {
            self
        } else if self.is_subtype_of(ItemType::Numeric) && other.is_subtype_of(ItemType::Numeric) {
            ItemType::Numeric
        } else if self.is_subtype_of(ItemType::AnyAtomic) && other.is_subtype_of(ItemType::AnyAtomic) {
            ItemType::AnyAtomic
        } else {
            ItemType::Item
        }
    }

    /// The concrete atomic type, if this item type names one.
    pub fn atomic(self) -> Option<AtomicType> {
        match self {
            ItemType::Atomic(t) => Some(t),
            _ => None,
        }
    }

    pub fn is_atomic(self) -> bool {
        self.is_subtype_of(ItemType::AnyAtomic)
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemType::Item => f.write_str("item()"),
            ItemType::Node => f.write_str("node()"),
            ItemType::AnyAtomic => f.write_str("xs:anyAtomicType"),
            ItemType::Numeric => f.write_str("numeric"),
            ItemType::Atomic(t) => write!(f, "{t}"),
        }
    }
}

/// Occurrence bounds of a sequence; `max == None` means unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cardinality {
    pub min: u32,
    pub max: Option<u32>,
}

impl Cardinality {
    pub const EMPTY: Cardinality = Cardinality::new(0, Some(0));
    pub const ZERO_OR_ONE: Cardinality = Cardinality::new(0, Some(1));
    pub const EXACTLY_ONE: Cardinality = Cardinality::new(1, Some(1));
    pub const ZERO_OR_MORE: Cardinality = Cardinality::new(0, None);
    pub const ONE_OR_MORE: Cardinality = Cardinality::new(1, None);

    pub const fn new(min: u32, max: Option<u32>) -> Self {
        if let Some(max) = max {
            assert!(min <= max, "cardinality minimum exceeds maximum");
        }
        Self { min, max }
    }

    /// Concatenation of two sequences.
    pub fn plus(self, other: Cardinality) -> Cardinality {
        let max = match (self.max, other.max) {
            (Some(a), Some(b)) => Some(a.saturating_add(b)),
            _ => None,
        };
        Cardinality::new(self.min.saturating_add(other.min), max)
    }

    /// One `other` sequence per item of `self`, as produced by a `for` clause.
    pub fn times(self, other: Cardinality) -> Cardinality {
        if self.is_empty() || other.is_empty() {
            return Cardinality::EMPTY;
        }
        let max = match (self.max, other.max) {
            (Some(a), Some(b)) => Some(a.saturating_mul(b)),
            _ => None,
        };
        Cardinality::new(self.min.saturating_mul(other.min), max)
    }

    pub fn union(self, other: Cardinality) -> Cardinality {
        let max = match (self.max, other.max) {
            (Some(a), Some(b)) => Some(a.max(b)),
            _ => None,
        };
        Cardinality::new(self.min.min(other.min), max)
    }

    pub fn allows_many(self) -> bool {
        self.max.is_none_or(|m| m > 1)
    }

    pub fn allows_empty(self) -> bool {
        self.min == 0
    }

    pub fn is_empty(self) -> bool {
        self.max == Some(0)
    }

    pub fn is_exactly_one(self) -> bool {
        self == Cardinality::EXACTLY_ONE
    }

    /// Whether the two ranges share at least one count.
    pub fn intersects(self, other: Cardinality) -> bool {
        self.max.is_none_or(|m| other.min <= m) && other.max.is_none_or(|m| self.min <= m)
    }

    /// Whether every count allowed by `other` is allowed by `self`.
    pub fn is_match(self, other: Cardinality) -> bool {
        self.min <= other.min
            && match (self.max, other.max) {
                (None, _) => true,
                (Some(_), None) => false,
                (Some(a), Some(b)) => b <= a,
            }
    }

    pub fn allows_count(self, n: usize) -> bool {
        let n = u32::try_from(n).unwrap_or(u32::MAX);
        self.min <= n && self.max.is_none_or(|m| n <= m)
    }
}

impl fmt::Display for Cardinality {
    /// Occurrence indicator as written after an item type.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.min, self.max) {
            (1, Some(1)) => Ok(()),
            (0, Some(1)) => f.write_str("?"),
            (0, None) => f.write_str("*"),
            (1, None) => f.write_str("+"),
            (min, Some(max)) => write!(f, "{{{min},{max}}}"),
            (min, None) => write!(f, "{{{min},}}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SequenceType {
    pub item_type: ItemType,
    pub cardinality: Cardinality,
}

impl SequenceType {
    pub const EMPTY: SequenceType = SequenceType::new(ItemType::Item, Cardinality::EMPTY);
    pub const ITEM_ZERO_OR_MORE: SequenceType =
        SequenceType::new(ItemType::Item, Cardinality::ZERO_OR_MORE);
    pub const ITEM_ZERO_OR_ONE: SequenceType =
        SequenceType::new(ItemType::Item, Cardinality::ZERO_OR_ONE);
    pub const NODE_ZERO_OR_ONE: SequenceType =
        SequenceType::new(ItemType::Node, Cardinality::ZERO_OR_ONE);
    pub const ATOMIC_ZERO_OR_ONE: SequenceType =
        SequenceType::new(ItemType::AnyAtomic, Cardinality::ZERO_OR_ONE);
    pub const ATOMIC_ZERO_OR_MORE: SequenceType =
        SequenceType::new(ItemType::AnyAtomic, Cardinality::ZERO_OR_MORE);
    pub const BOOLEAN: SequenceType = SequenceType::atomic(AtomicType::Boolean, Cardinality::EXACTLY_ONE);
    pub const BOOLEAN_ZERO_OR_ONE: SequenceType =
        SequenceType::atomic(AtomicType::Boolean, Cardinality::ZERO_OR_ONE);
    pub const INTEGER: SequenceType = SequenceType::atomic(AtomicType::Integer, Cardinality::EXACTLY_ONE);
    pub const STRING: SequenceType = SequenceType::atomic(AtomicType::String, Cardinality::EXACTLY_ONE);
    pub const STRING_ZERO_OR_ONE: SequenceType =
        SequenceType::atomic(AtomicType::String, Cardinality::ZERO_OR_ONE);
    pub const ANY_URI_ZERO_OR_ONE: SequenceType =
        SequenceType::atomic(AtomicType::AnyUri, Cardinality::ZERO_OR_ONE);
    pub const DATE_ZERO_OR_ONE: SequenceType =
        SequenceType::atomic(AtomicType::Date, Cardinality::ZERO_OR_ONE);
    pub const TIME_ZERO_OR_ONE: SequenceType =
        SequenceType::atomic(AtomicType::Time, Cardinality::ZERO_OR_ONE);
    pub const DATE_TIME_ZERO_OR_ONE: SequenceType =
        SequenceType::atomic(AtomicType::DateTime, Cardinality::ZERO_OR_ONE);

    pub const fn new(item_type: ItemType, cardinality: Cardinality) -> Self {
        Self {
            item_type,
            cardinality,
        }
    }

    pub const fn atomic(t: AtomicType, cardinality: Cardinality) -> Self {
        Self::new(ItemType::Atomic(t), cardinality)
    }

    /// Whether a value of static type `actual` is acceptable where `self` is required.
    pub fn matches(&self, actual: &SequenceType) -> bool {
        self.cardinality.is_match(actual.cardinality)
            && (actual.cardinality.is_empty() || actual.item_type.is_subtype_of(self.item_type))
    }

    pub fn with_cardinality(self, cardinality: Cardinality) -> Self {
        Self::new(self.item_type, cardinality)
    }
}

impl fmt::Display for SequenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.cardinality.is_empty() {
            f.write_str("empty-sequence()")
        } else {
            write!(f, "{}{}", self.item_type, self.cardinality)
        }
    }
}
