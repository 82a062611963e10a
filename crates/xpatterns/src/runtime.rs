use crate::consts::ERR_NS;
use crate::expr::{ExprRef, Expression};
use crate::functions::{BuiltinFunctionFactory, FunctionFactory};
use crate::xdm::{ExpandedName, NodeHandle, XdmItem};
use chrono::{FixedOffset, Offset, Utc};
use core::fmt;
use smallvec::SmallVec;
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::{Arc, Weak};

/// The XPath/XQuery error codes raised by the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    FOAR0002, // numeric overflow
    FORG0001, // invalid lexical form / casting failure
    FORG0002, // invalid argument to fn:resolve-uri
    FORG0006, // invalid argument type for EBV
    FORG0008, // both arguments to fn:dateTime have a specified timezone
    FODC0002, // error retrieving resource
    FODC0005, // invalid argument to fn:doc
    FONS0005, // base-uri not defined in the static context
    XPTY0004, // type error
    XPST0008, // undeclared variable
    XPST0017, // unknown function or wrong arity
}

impl ErrorCode {
    pub fn local_name(&self) -> &'static str {
        match self {
            ErrorCode::FOAR0002 => "FOAR0002",
            ErrorCode::FORG0001 => "FORG0001",
            ErrorCode::FORG0002 => "FORG0002",
            ErrorCode::FORG0006 => "FORG0006",
            ErrorCode::FORG0008 => "FORG0008",
            ErrorCode::FODC0002 => "FODC0002",
            ErrorCode::FODC0005 => "FODC0005",
            ErrorCode::FONS0005 => "FONS0005",
            ErrorCode::XPTY0004 => "XPTY0004",
            ErrorCode::XPST0008 => "XPST0008",
            ErrorCode::XPST0017 => "XPST0017",
        }
    }

    /// QName of the code in the `http://www.w3.org/2005/xqt-errors` namespace.
    pub fn qname(&self) -> ExpandedName {
        ExpandedName::new(Some(ERR_NS.to_string()), self.local_name())
    }

    /// Static errors are raised while type checking; everything else is dynamic.
    pub fn is_static(&self) -> bool {
        matches!(self, ErrorCode::XPST0008 | ErrorCode::XPST0017)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "err:{}", self.local_name())
    }
}

/// Position of an expression in the query text it was built from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceLocation {
    pub uri: Option<Arc<str>>,
    pub line: u32,
    pub column: u32,
}

impl SourceLocation {
    pub fn new(uri: Option<&str>, line: u32, column: u32) -> Self {
        Self {
            uri: uri.map(Arc::from),
            line,
            column,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.uri {
            Some(uri) => write!(f, "{}:{}:{}", uri, self.line, self.column),
            None => write!(f, "{}:{}", self.line, self.column),
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("error: {message} ({code})")]
pub struct Error {
    pub code: ErrorCode,
    pub message: String,
    pub location: Option<SourceLocation>,
    #[source]
    pub source: Option<Arc<dyn std::error::Error + Send + Sync>>, // optional chained cause
}

impl Error {
    pub fn from_code(code: ErrorCode, msg: impl Into<String>) -> Self {
        Self {
            code,
            message: msg.into(),
            location: None,
            source: None,
        }
    }

    /// Compose an error with a source cause.
    pub fn with_source(
        mut self,
        source: impl Into<Option<Arc<dyn std::error::Error + Send + Sync>>>,
    ) -> Self {
        self.source = source.into();
        self
    }

    pub fn with_location(mut self, location: Option<SourceLocation>) -> Self {
        self.location = location;
        self
    }

    pub fn code_qname(&self) -> ExpandedName {
        self.code.qname()
    }
}

impl From<url::ParseError> for Error {
    fn from(e: url::ParseError) -> Self {
        Error::from_code(ErrorCode::FORG0002, e.to_string())
            .with_source(Some(Arc::new(e) as Arc<dyn std::error::Error + Send + Sync>))
    }
}

/// Identity of an expression node: the address of its shared allocation.
///
/// Trait default methods only see `&self`, so error reporting keys nodes by
/// address instead of by handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExprKey(usize);

impl ExprKey {
    pub fn of<T: ?Sized>(expr: &T) -> Self {
        ExprKey(expr as *const T as *const () as usize)
    }
}

/// Source locations of expression nodes, held through weak references so the
/// map never extends the lifetime of a discarded subtree.
#[derive(Debug, Default, Clone)]
pub struct LocationMap {
    entries: HashMap<ExprKey, (Weak<dyn Expression>, SourceLocation)>,
}

impl LocationMap {
    pub fn insert(&mut self, expr: &ExprRef, location: SourceLocation) {
        self.entries
            .insert(ExprKey::of(&**expr), (Arc::downgrade(expr), location));
    }

    pub fn get(&self, key: ExprKey) -> Option<&SourceLocation> {
        let (weak, location) = self.entries.get(&key)?;
        // a dead entry belongs to a node that has since been dropped
        if weak.strong_count() == 0 {
            return None;
        }
        Some(location)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn prune(&mut self) {
        self.entries.retain(|_, (weak, _)| weak.strong_count() > 0);
    }
}

/// Error channel shared by the static and the dynamic context.
pub trait ReportContext {
    fn location_of(&self, key: ExprKey) -> Option<SourceLocation>;

    /// Build an error for the node identified by `key`, attaching its source
    /// location. The caller returns it with `?`.
    fn error(&self, message: impl Into<String>, code: ErrorCode, key: ExprKey) -> Error {
        let message = message.into();
        let location = self.location_of(key);
        tracing::debug!(code = %code, location = ?location, message = %message, "reporting error");
        Error::from_code(code, message).with_location(location)
    }
}

/// Compile-time environment: configuration plus the location table and the
/// range-variable slot allocator.
pub struct StaticContext {
    base_uri: Option<Arc<str>>,
    backwards_compat: bool,
    implicit_timezone: Option<FixedOffset>,
    functions: Arc<dyn FunctionFactory>,
    next_slot: usize,
    locations: LocationMap,
}

impl Default for StaticContext {
    fn default() -> Self {
        Self {
            base_uri: None,
            backwards_compat: false,
            implicit_timezone: None,
            functions: BuiltinFunctionFactory::shared(),
            next_slot: 0,
            locations: LocationMap::default(),
        }
    }
}

impl fmt::Debug for StaticContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticContext")
            .field("base_uri", &self.base_uri)
            .field("backwards_compat", &self.backwards_compat)
            .field("implicit_timezone", &self.implicit_timezone)
            .field("next_slot", &self.next_slot)
            .field("locations", &self.locations.len())
            .finish()
    }
}

impl StaticContext {
    pub fn base_uri(&self) -> Option<&Arc<str>> {
        self.base_uri.as_ref()
    }

    /// XPath 1.0 compatibility mode.
    pub fn is_backwards_compat(&self) -> bool {
        self.backwards_compat
    }

    pub fn implicit_timezone(&self) -> Option<FixedOffset> {
        self.implicit_timezone
    }

    pub fn functions(&self) -> &Arc<dyn FunctionFactory> {
        &self.functions
    }

    /// Reserve a fresh range-variable slot.
    pub fn allocate_slot(&mut self) -> usize {
        let slot = self.next_slot;
        self.next_slot += 1;
        slot
    }

    pub fn slot_count(&self) -> usize {
        self.next_slot
    }

    pub fn add_location(&mut self, expr: &ExprRef, location: SourceLocation) {
        self.locations.insert(expr, location);
    }

    pub fn location_for(&self, expr: &dyn Expression) -> Option<&SourceLocation> {
        self.locations.get(ExprKey::of(expr))
    }

    /// Give `new` the source location of `existing`, if it has one.
    pub fn wrap_expression_with(&mut self, existing: &dyn Expression, new: &ExprRef) {
        if let Some(location) = self.location_for(existing).cloned() {
            self.locations.insert(new, location);
        }
    }

    /// Record that `old` has been replaced by `new` and hand back `new`.
    pub fn rewrite(&mut self, old: &dyn Expression, new: ExprRef) -> ExprRef {
        tracing::debug!(from = ?old.id(), to = ?new.id(), "rewriting expression");
        self.wrap_expression_with(old, &new);
        new
    }

    /// Snapshot of the live location entries, installed into dynamic contexts.
    pub fn location_snapshot(&mut self) -> Arc<LocationMap> {
        self.locations.prune();
        Arc::new(self.locations.clone())
    }
}

impl ReportContext for StaticContext {
    fn location_of(&self, key: ExprKey) -> Option<SourceLocation> {
        self.locations.get(key).cloned()
    }
}

pub struct StaticContextBuilder {
    ctx: StaticContext,
}

impl Default for StaticContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl StaticContextBuilder {
    pub fn new() -> Self {
        Self {
            ctx: StaticContext::default(),
        }
    }

    pub fn with_base_uri(mut self, uri: impl Into<String>) -> Self {
        self.ctx.base_uri = Some(Arc::from(uri.into()));
        self
    }

    pub fn with_backwards_compat(mut self, enabled: bool) -> Self {
        self.ctx.backwards_compat = enabled;
        self
    }

    /// Implicit timezone as an offset in minutes east of UTC. Out-of-range
    /// offsets are ignored.
    pub fn with_timezone(mut self, offset_minutes: i32) -> Self {
        if let Some(tz) = offset_minutes.checked_mul(60).and_then(FixedOffset::east_opt) {
            self.ctx.implicit_timezone = Some(tz);
        }
        self
    }

    pub fn with_functions(mut self, functions: Arc<dyn FunctionFactory>) -> Self {
        self.ctx.functions = functions;
        self
    }

    /// First slot handed out by [`StaticContext::allocate_slot`], for hosts
    /// that reserve slots of their own.
    pub fn with_first_slot(mut self, slot: usize) -> Self {
        self.ctx.next_slot = slot;
        self
    }

    pub fn build(self) -> StaticContext {
        self.ctx
    }
}

/// Host-side document retrieval for `fn:doc`.
pub trait DocumentResolver: Send + Sync {
    /// `Ok(None)` means the document does not exist.
    fn doc_node(&self, uri: &str) -> Result<Option<NodeHandle>, Error>;
}

/// Per-evaluation environment. Range variables live in slots with stack
/// discipline: binders save the previous values and restore them when done.
pub struct DynamicContext {
    slots: RefCell<Vec<Option<XdmItem>>>,
    implicit_timezone: FixedOffset,
    resolver: Option<Arc<dyn DocumentResolver>>,
    context_item: Option<XdmItem>,
    locations: RefCell<Arc<LocationMap>>,
}

impl Default for DynamicContext {
    fn default() -> Self {
        Self {
            slots: RefCell::new(Vec::new()),
            implicit_timezone: Utc.fix(),
            resolver: None,
            context_item: None,
            locations: RefCell::new(Arc::default()),
        }
    }
}

impl fmt::Debug for DynamicContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicContext")
            .field("slots", &self.slots.borrow().len())
            .field("implicit_timezone", &self.implicit_timezone)
            .field("has_resolver", &self.resolver.is_some())
            .finish()
    }
}

impl DynamicContext {
    pub fn implicit_timezone(&self) -> FixedOffset {
        self.implicit_timezone
    }

    pub fn resolver(&self) -> Option<&Arc<dyn DocumentResolver>> {
        self.resolver.as_ref()
    }

    pub fn context_item(&self) -> Option<&XdmItem> {
        self.context_item.as_ref()
    }

    /// Current value of a range-variable slot.
    pub fn range_variable(&self, slot: usize) -> Option<XdmItem> {
        self.slots.borrow().get(slot).cloned().flatten()
    }

    pub fn set_range_variable(&self, slot: usize, value: Option<XdmItem>) {
        let mut slots = self.slots.borrow_mut();
        if slots.len() <= slot {
            slots.resize(slot + 1, None);
        }
        slots[slot] = value;
    }

    /// Remember the current values of `slots`; they are put back when the
    /// returned guard is dropped.
    pub fn save_slots(&self, slots: &[usize]) -> SlotGuard<'_> {
        let saved = slots
            .iter()
            .map(|&slot| (slot, self.range_variable(slot)))
            .collect();
        SlotGuard { ctx: self, saved }
    }

    pub(crate) fn install_locations(&self, locations: Arc<LocationMap>) {
        *self.locations.borrow_mut() = locations;
    }
}

impl ReportContext for DynamicContext {
    fn location_of(&self, key: ExprKey) -> Option<SourceLocation> {
        self.locations.borrow().get(key).cloned()
    }
}

pub struct SlotGuard<'a> {
    ctx: &'a DynamicContext,
    saved: SmallVec<[(usize, Option<XdmItem>); 2]>,
}

impl Drop for SlotGuard<'_> {
    fn drop(&mut self) {
        for (slot, value) in self.saved.drain(..).rev() {
            self.ctx.set_range_variable(slot, value);
        }
    }
}

pub struct DynamicContextBuilder {
    ctx: DynamicContext,
}

impl Default for DynamicContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DynamicContextBuilder {
    pub fn new() -> Self {
        Self {
            ctx: DynamicContext::default(),
        }
    }

    pub fn with_document_resolver(mut self, resolver: Arc<dyn DocumentResolver>) -> Self {
        self.ctx.resolver = Some(resolver);
        self
    }

    pub fn with_implicit_timezone(mut self, tz: FixedOffset) -> Self {
        self.ctx.implicit_timezone = tz;
        self
    }

    /// Implicit timezone as an offset in minutes east of UTC. Out-of-range
    /// offsets are ignored.
    pub fn with_timezone(mut self, offset_minutes: i32) -> Self {
        if let Some(tz) = offset_minutes.checked_mul(60).and_then(FixedOffset::east_opt) {
            self.ctx.implicit_timezone = tz;
        }
        self
    }

    pub fn with_context_item(mut self, item: impl Into<XdmItem>) -> Self {
        self.ctx.context_item = Some(item.into());
        self
    }

    pub fn build(self) -> DynamicContext {
        self.ctx
    }
}
