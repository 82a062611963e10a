//! Per-type comparison strategies and the machinery that selects them.
//!
//! An [`AtomicComparator`] knows how to relate two atomic values of one type
//! family. The [`ComparisonPlatform`] picks the comparator for a pair of
//! types, validates the operator against it and applies it; both comparison
//! expressions embed one.

use crate::xdm::XdmAtomicValue;
use core::fmt;

pub mod comparators;
pub(crate) mod numeric;
pub mod platform;

pub use comparators::comparator_for;
pub use platform::ComparisonPlatform;

/// Comparison operators as bit flags; the compound operators are unions.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AtomicOperator {
    Equal = 1,
    NotEqual = 2,
    GreaterThan = 4,
    LessThan = 8,
    /// Less-than for sorting, where NaN orders before every other value.
    LessThanNaNLeast = 16,
    /// Less-than for sorting, where NaN orders after every other value.
    LessThanNaNGreatest = 32,
    GreaterOrEqual = 1 | 4,
    LessOrEqual = 1 | 8,
}

impl AtomicOperator {
    pub const ALL: [AtomicOperator; 8] = [
        AtomicOperator::Equal,
        AtomicOperator::NotEqual,
        AtomicOperator::GreaterOrEqual,
        AtomicOperator::GreaterThan,
        AtomicOperator::LessOrEqual,
        AtomicOperator::LessThan,
        AtomicOperator::LessThanNaNLeast,
        AtomicOperator::LessThanNaNGreatest,
    ];

    pub const fn bits(self) -> u8 {
        self as u8
    }

    pub const fn contains(self, flag: AtomicOperator) -> bool {
        self.bits() & flag.bits() == flag.bits()
    }

    /// Whether the operator needs an ordering rather than just equality.
    pub const fn is_ordering(self) -> bool {
        !matches!(self, AtomicOperator::Equal | AtomicOperator::NotEqual)
    }

    /// The operator that gives the same answer with the operands swapped.
    /// The NaN sorting variants have no mirrored form and map to `GreaterThan`.
    pub fn inverse(self) -> AtomicOperator {
        use AtomicOperator::*;
        match self {
            Equal => Equal,
            NotEqual => NotEqual,
            GreaterThan => LessThan,
            LessThan => GreaterThan,
            GreaterOrEqual => LessOrEqual,
            LessOrEqual => GreaterOrEqual,
            LessThanNaNLeast | LessThanNaNGreatest => GreaterThan,
        }
    }

    /// Interpret an ordering result under this operator.
    pub fn accepts(self, result: ComparisonResult) -> bool {
        use AtomicOperator::*;
        match result {
            ComparisonResult::Incomparable => self == NotEqual,
            ComparisonResult::Equal => self.contains(Equal),
            ComparisonResult::LessThan => {
                matches!(self, NotEqual | LessThan | LessOrEqual | LessThanNaNLeast | LessThanNaNGreatest)
            }
            ComparisonResult::GreaterThan => matches!(self, NotEqual | GreaterThan | GreaterOrEqual),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparisonResult {
    LessThan,
    Equal,
    GreaterThan,
    Incomparable,
}

impl ComparisonResult {
    /// The result of the same comparison with the operands swapped.
    pub fn reversed(self) -> ComparisonResult {
        match self {
            ComparisonResult::LessThan => ComparisonResult::GreaterThan,
            ComparisonResult::GreaterThan => ComparisonResult::LessThan,
            other => other,
        }
    }
}

impl From<core::cmp::Ordering> for ComparisonResult {
    fn from(o: core::cmp::Ordering) -> Self {
        match o {
            core::cmp::Ordering::Less => ComparisonResult::LessThan,
            core::cmp::Ordering::Equal => ComparisonResult::Equal,
            core::cmp::Ordering::Greater => ComparisonResult::GreaterThan,
        }
    }
}

impl From<Option<core::cmp::Ordering>> for ComparisonResult {
    fn from(o: Option<core::cmp::Ordering>) -> Self {
        o.map_or(ComparisonResult::Incomparable, ComparisonResult::from)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparisonType {
    AsGeneralComparison,
    AsValueComparison,
}

/// Surface symbol of `op` in the given comparison flavor.
///
/// The general-comparison column pairs `GreaterOrEqual` with `<=` and
/// `GreaterThan` with `<` (and so on); diagnostics rely on this exact table.
pub fn display_name(op: AtomicOperator, ty: ComparisonType) -> &'static str {
    use AtomicOperator::*;
    match ty {
        ComparisonType::AsGeneralComparison => match op {
            Equal => "=",
            NotEqual => "!=",
            GreaterOrEqual => "<=",
            GreaterThan => "<",
            LessOrEqual => ">=",
            LessThan | LessThanNaNLeast | LessThanNaNGreatest => ">",
        },
        ComparisonType::AsValueComparison => match op {
            Equal => "eq",
            NotEqual => "ne",
            GreaterOrEqual => "ge",
            GreaterThan => "gt",
            LessOrEqual => "le",
            LessThan | LessThanNaNLeast | LessThanNaNGreatest => "lt",
        },
    }
}

/// Comparison strategy for one family of atomic types.
///
/// Comparators are stateless; the registry hands out `&'static` instances.
pub trait AtomicComparator: fmt::Debug + Send + Sync {
    /// Order `op1` relative to `op2`. `op` only matters for the NaN sorting
    /// variants. Comparators for unordered types never override this.
    fn compare(
        &self,
        _op1: &XdmAtomicValue,
        op: AtomicOperator,
        _op2: &XdmAtomicValue,
    ) -> ComparisonResult {
        unreachable!("{self:?} defines no ordering and cannot evaluate {op:?}")
    }

    fn equals(&self, op1: &XdmAtomicValue, op2: &XdmAtomicValue) -> bool;

    /// Whether [`compare`](Self::compare) is implemented.
    fn is_ordered(&self) -> bool {
        true
    }

    fn display_name(&self, op: AtomicOperator, ty: ComparisonType) -> &'static str {
        display_name(op, ty)
    }
}
