/// Namespace of the standard function library (`fn:`).
pub const FNS: &str = "http://www.w3.org/2005/xpath-functions";
/// XML Schema namespace (`xs:`).
pub const XS: &str = "http://www.w3.org/2001/XMLSchema";
/// Namespace URI used for W3C-defined XPath/XQuery error codes (xqt-errors).
pub const ERR_NS: &str = "http://www.w3.org/2005/xqt-errors";
