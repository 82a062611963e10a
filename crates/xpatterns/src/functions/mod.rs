//! Function signatures and the factories that turn a name plus arguments
//! into a call node.
//!
//! Guidelines:
//! - Optional trailing parameters are expressed through the arity range
//!   (`min_arguments..=max_arguments`). A name may carry several signatures
//!   as long as their arity ranges do not overlap.
//! - `None` as `max_arguments` marks a variadic function.
//! - Implementations live next to each other by family (`sequences`,
//!   `strings`, `documents`, `datetime`) and are dispatched on the
//!   signature's [`ExpressionId`].

use crate::expr::{ExprRef, Expression, ExpressionId, FunctionCall, OperandList, Properties, atomize};
use crate::runtime::{DynamicContext, Error, ErrorCode, ExprKey, ReportContext, SourceLocation, StaticContext};
use crate::types::{AtomicType, Cardinality, ItemType, SequenceType};
use crate::xdm::cast::cast_atomic;
use crate::xdm::{ExpandedName, XdmAtomicValue};
use core::fmt;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

pub(crate) mod datetime;
pub(crate) mod documents;
pub(crate) mod sequences;
pub(crate) mod strings;

pub type Arity = usize;

/// `max_arguments` of a variadic function.
pub const UNLIMITED_ARITY: Option<Arity> = None;

/// A declared parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Argument {
    pub name: String,
    pub sequence_type: SequenceType,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionSignature {
    name: ExpandedName,
    min_arguments: Arity,
    max_arguments: Option<Arity>,
    arguments: Vec<Argument>,
    return_type: SequenceType,
    properties: Properties,
    id: ExpressionId,
}

impl FunctionSignature {
    pub fn new(
        name: ExpandedName,
        min_arguments: Arity,
        max_arguments: Option<Arity>,
        return_type: SequenceType,
        id: ExpressionId,
    ) -> Self {
        assert!(
            max_arguments.is_none_or(|max| min_arguments <= max),
            "signature of {name} has min arity {min_arguments} above max arity {max_arguments:?}"
        );
        Self {
            name,
            min_arguments,
            max_arguments,
            arguments: Vec::new(),
            return_type,
            properties: Properties::NONE,
            id,
        }
    }

    pub fn with_argument(mut self, name: impl Into<String>, sequence_type: SequenceType) -> Self {
        self.arguments.push(Argument {
            name: name.into(),
            sequence_type,
        });
        self
    }

    pub fn with_properties(mut self, properties: Properties) -> Self {
        self.properties = properties;
        self
    }

    pub fn name(&self) -> &ExpandedName {
        &self.name
    }

    pub fn min_arguments(&self) -> Arity {
        self.min_arguments
    }

    pub fn max_arguments(&self) -> Option<Arity> {
        self.max_arguments
    }

    pub fn arguments(&self) -> &[Argument] {
        &self.arguments
    }

    pub fn return_type(&self) -> SequenceType {
        self.return_type
    }

    pub fn properties(&self) -> Properties {
        self.properties
    }

    pub fn id(&self) -> ExpressionId {
        self.id
    }

    pub fn is_arity_valid(&self, arity: Arity) -> bool {
        arity >= self.min_arguments && self.max_arguments.is_none_or(|max| arity <= max)
    }

    /// Declared type of the parameter at `index`; variadic tails repeat the
    /// last declared parameter.
    pub fn argument_type(&self, index: usize) -> SequenceType {
        self.arguments
            .get(index)
            .or_else(|| self.arguments.last())
            .map_or(SequenceType::ITEM_ZERO_OR_MORE, |a| a.sequence_type)
    }

    /// Same name and at least one arity both accept.
    pub fn is_equal_to(&self, other: &FunctionSignature) -> bool {
        if self.name != other.name {
            return false;
        }
        let low = self.min_arguments.max(other.min_arguments);
        match (self.max_arguments, other.max_arguments) {
            (None, None) => true,
            (Some(a), None) | (None, Some(a)) => low <= a,
            (Some(a), Some(b)) => low <= a.min(b),
        }
    }

    /// `fn:name($a as t, ...) as r`; the `, ...` suffix marks a variadic
    /// function and is appended even when no argument is declared.
    pub fn display_name(&self) -> String {
        let mut params = itertools::join(
            self.arguments
                .iter()
                .map(|a| format!("${} as {}", a.name, a.sequence_type)),
            ", ",
        );
        if self.max_arguments.is_none() {
            params.push_str(", ...");
        }
        format!("{}({}) as {}", self.name, params, self.return_type)
    }
}

impl fmt::Display for FunctionSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_name())
    }
}

/// Source of function calls for the static context.
pub trait FunctionFactory: Send + Sync {
    fn signatures(&self) -> Vec<Arc<FunctionSignature>>;

    fn retrieve_function_signature(&self, name: &ExpandedName, arity: Arity) -> Option<Arc<FunctionSignature>> {
        self.signatures()
            .into_iter()
            .find(|s| s.name() == name && s.is_arity_valid(arity))
    }

    fn is_available(&self, name: &ExpandedName, arity: Arity) -> bool {
        self.retrieve_function_signature(name, arity).is_some()
    }

    /// Build a call node, registering `location` for it. Unknown names and
    /// unsupported arities are `XPST0017`.
    fn create_function_call(
        &self,
        name: &ExpandedName,
        arguments: OperandList,
        ctx: &mut StaticContext,
        location: Option<SourceLocation>,
    ) -> Result<ExprRef, Error> {
        let Some(signature) = self.retrieve_function_signature(name, arguments.len()) else {
            return Err(unavailable_function(&self.signatures(), name, arguments.len()).with_location(location));
        };
        let call = FunctionCall::new(signature, arguments);
        if let Some(location) = location {
            ctx.add_location(&call, location);
        }
        Ok(call)
    }
}

fn describe_arity(argc: Arity) -> String {
    match argc {
        0 => "no arguments".to_string(),
        1 => "one argument".to_string(),
        2 => "two arguments".to_string(),
        3 => "three arguments".to_string(),
        n => format!("{n} arguments"),
    }
}

/// `XPST0017` for a name/arity pair none of `known` accepts, listing the
/// arities the name does support.
pub(crate) fn unavailable_function(known: &[Arc<FunctionSignature>], name: &ExpandedName, argc: Arity) -> Error {
    let candidates: Vec<&Arc<FunctionSignature>> = known.iter().filter(|s| s.name() == name).collect();
    if candidates.is_empty() {
        return Error::from_code(ErrorCode::XPST0017, format!("unknown function: {name}#{argc}"));
    }
    let mut arities: Vec<String> = Vec::new();
    for s in &candidates {
        match s.max_arguments() {
            Some(max) => arities.extend((s.min_arguments()..=max).map(|a| a.to_string())),
            None => arities.push(format!("{} or more", s.min_arguments())),
        }
    }
    arities.dedup();
    Error::from_code(
        ErrorCode::XPST0017,
        format!(
            "function {}() cannot be called with {}; available arities: {}",
            name,
            describe_arity(argc),
            arities.join(", ")
        ),
    )
}

/// The built-in function library. Immutable after construction; one shared
/// instance serves every static context.
pub struct BuiltinFunctionFactory {
    signatures: Vec<Arc<FunctionSignature>>,
    by_name: HashMap<ExpandedName, Vec<usize>>,
}

impl fmt::Debug for BuiltinFunctionFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.signatures.iter().map(|s| s.display_name()))
            .finish()
    }
}

impl BuiltinFunctionFactory {
    pub fn shared() -> Arc<BuiltinFunctionFactory> {
        static SHARED: OnceLock<Arc<BuiltinFunctionFactory>> = OnceLock::new();
        Arc::clone(SHARED.get_or_init(|| Arc::new(BuiltinFunctionFactory::new())))
    }

    fn new() -> Self {
        let mut factory = Self {
            signatures: Vec::new(),
            by_name: HashMap::new(),
        };
        let item_star = SequenceType::ITEM_ZERO_OR_MORE;
        let one_item = SequenceType::new(ItemType::Item, Cardinality::EXACTLY_ONE);
        let node_star = SequenceType::new(ItemType::Node, Cardinality::ZERO_OR_MORE);
        let string = SequenceType::STRING;
        let string_opt = SequenceType::STRING_ZERO_OR_ONE;

        factory.register(
            FunctionSignature::new(ExpandedName::fn_name("count"), 1, Some(1), SequenceType::INTEGER, ExpressionId::CountFN)
                .with_argument("arg", item_star),
        );
        factory.register(
            FunctionSignature::new(ExpandedName::fn_name("exists"), 1, Some(1), SequenceType::BOOLEAN, ExpressionId::ExistsFN)
                .with_argument("arg", item_star),
        );
        factory.register(
            FunctionSignature::new(ExpandedName::fn_name("empty"), 1, Some(1), SequenceType::BOOLEAN, ExpressionId::EmptyFN)
                .with_argument("arg", item_star),
        );
        factory.register(
            FunctionSignature::new(ExpandedName::fn_name("not"), 1, Some(1), SequenceType::BOOLEAN, ExpressionId::NotFN)
                .with_argument("arg", item_star),
        );
        factory.register(
            FunctionSignature::new(ExpandedName::fn_name("boolean"), 1, Some(1), SequenceType::BOOLEAN, ExpressionId::BooleanFN)
                .with_argument("arg", item_star),
        );
        factory.register(
            FunctionSignature::new(
                ExpandedName::fn_name("distinct-values"),
                1,
                Some(1),
                SequenceType::ATOMIC_ZERO_OR_MORE,
                ExpressionId::DistinctValuesFN,
            )
            .with_argument("arg", SequenceType::ATOMIC_ZERO_OR_MORE),
        );
        factory.register(
            FunctionSignature::new(ExpandedName::fn_name("upper-case"), 1, Some(1), string, ExpressionId::UpperCaseFN)
                .with_argument("arg", string_opt),
        );
        factory.register(
            FunctionSignature::new(ExpandedName::fn_name("lower-case"), 1, Some(1), string, ExpressionId::LowerCaseFN)
                .with_argument("arg", string_opt),
        );
        factory.register(
            FunctionSignature::new(ExpandedName::fn_name("doc"), 1, Some(1), SequenceType::NODE_ZERO_OR_ONE, ExpressionId::DocFN)
                .with_argument("uri", string_opt)
                .with_properties(Properties::DISABLE_ELIMINATION),
        );
        factory.register(
            FunctionSignature::new(
                ExpandedName::fn_name("resolve-uri"),
                1,
                Some(2),
                SequenceType::ANY_URI_ZERO_OR_ONE,
                ExpressionId::ResolveUriFN,
            )
            .with_argument("relative", string_opt)
            .with_argument("base", string),
        );
        factory.register(
            FunctionSignature::new(ExpandedName::fn_name("document"), 1, Some(2), node_star, ExpressionId::DocumentFN)
                .with_argument("uri-sequence", item_star)
                .with_argument("base-node", one_item)
                .with_properties(Properties::DISABLE_ELIMINATION),
        );
        factory.register(
            FunctionSignature::new(
                ExpandedName::fn_name("dateTime"),
                2,
                Some(2),
                SequenceType::DATE_TIME_ZERO_OR_ONE,
                ExpressionId::DateTimeFN,
            )
            .with_argument("arg1", SequenceType::DATE_ZERO_OR_ONE)
            .with_argument("arg2", SequenceType::TIME_ZERO_OR_ONE),
        );
        factory
    }

    fn has_signature(&self, signature: &FunctionSignature) -> bool {
        self.signatures.iter().any(|s| s.is_equal_to(signature))
    }

    fn register(&mut self, signature: FunctionSignature) {
        debug_assert!(
            !self.has_signature(&signature),
            "{} is registered twice",
            signature.display_name()
        );
        self.by_name
            .entry(signature.name().clone())
            .or_default()
            .push(self.signatures.len());
        self.signatures.push(Arc::new(signature));
    }
}

impl FunctionFactory for BuiltinFunctionFactory {
    fn signatures(&self) -> Vec<Arc<FunctionSignature>> {
        self.signatures.clone()
    }

    fn retrieve_function_signature(&self, name: &ExpandedName, arity: Arity) -> Option<Arc<FunctionSignature>> {
        self.by_name
            .get(name)?
            .iter()
            .map(|&index| &self.signatures[index])
            .find(|s| s.is_arity_valid(arity))
            .cloned()
    }
}

/// Several factories consulted in order. The first factory that knows a
/// name owns it, whatever arities it supports.
#[derive(Default)]
pub struct FunctionFactoryCollection {
    factories: Vec<Arc<dyn FunctionFactory>>,
}

impl FunctionFactoryCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_factory(mut self, factory: Arc<dyn FunctionFactory>) -> Self {
        self.factories.push(factory);
        self
    }

    fn owner(&self, name: &ExpandedName) -> Option<&Arc<dyn FunctionFactory>> {
        self.factories
            .iter()
            .find(|f| f.signatures().iter().any(|s| s.name() == name))
    }
}

impl FunctionFactory for FunctionFactoryCollection {
    fn signatures(&self) -> Vec<Arc<FunctionSignature>> {
        self.factories.iter().flat_map(|f| f.signatures()).collect()
    }

    fn retrieve_function_signature(&self, name: &ExpandedName, arity: Arity) -> Option<Arc<FunctionSignature>> {
        self.owner(name)?.retrieve_function_signature(name, arity)
    }

    fn create_function_call(
        &self,
        name: &ExpandedName,
        arguments: OperandList,
        ctx: &mut StaticContext,
        location: Option<SourceLocation>,
    ) -> Result<ExprRef, Error> {
        match self.owner(name) {
            Some(factory) => factory.create_function_call(name, arguments, ctx, location),
            None => Err(unavailable_function(&[], name, arguments.len()).with_location(location)),
        }
    }
}

/// The atomized value of an argument declared with cardinality `?` (or
/// exactly one). Untyped values are cast to `target` when given.
pub(crate) fn optional_atomic_argument(
    call: &FunctionCall,
    index: usize,
    target: Option<AtomicType>,
    ctx: &DynamicContext,
) -> Result<Option<XdmAtomicValue>, Error> {
    let key = ExprKey::of(call);
    let mut values = atomize(call.operands()[index].evaluate_sequence(ctx));
    let Some(value) = values.next().transpose()? else {
        return Ok(None);
    };
    if values.next().is_some() {
        return Err(ctx.error(
            format!(
                "argument {} of {}() must not contain more than one item",
                index + 1,
                call.signature().name()
            ),
            ErrorCode::XPTY0004,
            key,
        ));
    }
    match target {
        Some(t) if value.atomic_type() == AtomicType::UntypedAtomic => {
            cast_atomic(&value, t).map(Some).map_err(|e| e.with_location(ctx.location_of(key)))
        }
        _ => Ok(Some(value)),
    }
}

/// String content of an `xs:string?` argument. `xs:anyURI` and untyped
/// values are accepted as strings.
pub(crate) fn optional_string_argument(
    call: &FunctionCall,
    index: usize,
    ctx: &DynamicContext,
) -> Result<Option<String>, Error> {
    match optional_atomic_argument(call, index, None, ctx)? {
        None => Ok(None),
        Some(XdmAtomicValue::String(s) | XdmAtomicValue::UntypedAtomic(s) | XdmAtomicValue::AnyUri(s)) => Ok(Some(s)),
        Some(other) => Err(ctx.error(
            format!(
                "argument {} of {}() must be of type xs:string, not {}",
                index + 1,
                call.signature().name(),
                other.atomic_type()
            ),
            ErrorCode::XPTY0004,
            ExprKey::of(call),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_factory() -> BuiltinFunctionFactory {
        BuiltinFunctionFactory {
            signatures: Vec::new(),
            by_name: HashMap::new(),
        }
    }

    fn f(min: Arity, max: Option<Arity>, id: ExpressionId) -> FunctionSignature {
        FunctionSignature::new(ExpandedName::fn_name("f"), min, max, SequenceType::STRING, id)
    }

    #[test]
    fn disjoint_arities_share_a_name() {
        let mut factory = empty_factory();
        factory.register(f(1, Some(1), ExpressionId::CountFN));
        factory.register(f(3, Some(3), ExpressionId::ExistsFN));
        let name = ExpandedName::fn_name("f");
        let one = factory.retrieve_function_signature(&name, 1).map(|s| s.id());
        let three = factory.retrieve_function_signature(&name, 3).map(|s| s.id());
        assert_eq!(one, Some(ExpressionId::CountFN));
        assert_eq!(three, Some(ExpressionId::ExistsFN));
        assert!(!factory.is_available(&name, 2));
        let err = factory
            .create_function_call(&name, OperandList::new(), &mut StaticContext::default(), None)
            .unwrap_err();
        assert!(err.message.ends_with("available arities: 1, 3"), "{}", err.message);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "is registered twice")]
    fn overlapping_arities_are_rejected() {
        let mut factory = empty_factory();
        factory.register(f(1, Some(3), ExpressionId::CountFN));
        factory.register(f(2, None, ExpressionId::ExistsFN));
    }

    #[test]
    fn builtin_library_has_no_overlapping_signatures() {
        let factory = BuiltinFunctionFactory::shared();
        for (i, a) in factory.signatures.iter().enumerate() {
            assert!(
                factory.signatures[i + 1..].iter().all(|b| !a.is_equal_to(b)),
                "{}",
                a.display_name()
            );
        }
    }
}
