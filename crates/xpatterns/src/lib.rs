//! Expression core of an embedded XPath/XQuery engine.
//!
//! The crate models the compiled form of a query as a tree of [`expr::Expression`]
//! nodes. A tree goes through three phases:
//!
//! 1. `type_check` infers static types, validates operands and may rewrite nodes
//!    (for example `fn:document` is desugared into a `for` clause),
//! 2. `compress` applies declarative [`optimizer::OptimizationPass`]es and
//!    constant folding,
//! 3. `evaluate_*` produces items against a per-call [`runtime::DynamicContext`].
//!
//! Parsing is not part of this crate; trees are assembled through the node
//! constructors and the [`functions::FunctionFactory`].

pub mod comparison;
pub mod consts;
pub mod evaluator;
pub mod expr;
pub mod functions;
pub mod optimizer;
pub mod runtime;
pub mod types;
pub mod xdm;

pub use comparison::{AtomicComparator, AtomicOperator, ComparisonResult, ComparisonType};
pub use evaluator::{CompiledExpression, compile, compile_with_type};
pub use expr::{ExprRef, Expression, ExpressionId};
pub use functions::{BuiltinFunctionFactory, FunctionFactory, FunctionSignature};
pub use runtime::{
    DynamicContext, DynamicContextBuilder, Error, ErrorCode, SourceLocation, StaticContext,
    StaticContextBuilder,
};
pub use types::{AtomicType, Cardinality, ItemType, SequenceType};
pub use xdm::{ExpandedName, XdmAtomicValue, XdmItem, XdmNode, XdmSequence};
