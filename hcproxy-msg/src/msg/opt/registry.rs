//! The closed set of options this stack understands.
//!
//! The table is static and immutable; an option number that is not in it
//! can never be turned into an [`Opt`](super::Opt).

use super::OptNumber;

/// The kind of value an option carries on the wire
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueType {
  /// Non-negative integer in network byte order, using as few bytes as possible
  Integer,
  /// UTF-8 string
  Text,
  /// Sequence of bytes with no interpretation
  Opaque,
}

/// Everything the registry knows about one option number
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct OptDescriptor {
  /// Option number
  pub number: OptNumber,
  /// Human-readable name, e.g. `"Uri-Path"`
  pub name: &'static str,
  /// The type values of this option are coerced to
  pub value_type: ValueType,
  /// Value an [`Integer`](ValueType::Integer) option reads back as when it is present but empty
  pub default: Option<u32>,
  /// Whether this option may occur more than once in a message
  pub repeatable: bool,
}

macro_rules! registry {
  ($($const_name:ident = $nr:literal, $name:literal, $ty:ident, $default:expr, $repeatable:literal;)*) => {
    $(
      #[doc = concat!("`", $name, "` (", stringify!($nr), ")")]
      pub const $const_name: OptNumber = OptNumber($nr);
    )*

    /// Every option in the registry, in ascending order of number
    pub static REGISTRY: &[OptDescriptor] = &[
      $(OptDescriptor { number: $const_name,
                        name: $name,
                        value_type: ValueType::$ty,
                        default: $default,
                        repeatable: $repeatable },)*
    ];
  };
}

registry! {
  IF_MATCH       = 1,     "If-Match",       Opaque,  None,       true;
  URI_HOST       = 3,     "Uri-Host",       Text,    None,       false;
  ETAG           = 4,     "ETag",           Opaque,  None,       true;
  IF_NONE_MATCH  = 5,     "If-None-Match",  Integer, None,       false;
  OBSERVE        = 6,     "Observe",        Integer, Some(0),    false;
  URI_PORT       = 7,     "Uri-Port",       Integer, Some(5683), false;
  LOCATION_PATH  = 8,     "Location-Path",  Text,    None,       true;
  URI_PATH       = 11,    "Uri-Path",       Text,    None,       true;
  CONTENT_FORMAT = 12,    "Content-Format", Integer, Some(0),    false;
  MAX_AGE        = 14,    "Max-Age",        Integer, Some(60),   false;
  URI_QUERY      = 15,    "Uri-Query",      Text,    None,       true;
  ACCEPT         = 17,    "Accept",         Integer, Some(0),    false;
  LOCATION_QUERY = 20,    "Location-Query", Text,    None,       true;
  BLOCK2         = 23,    "Block2",         Integer, None,       false;
  BLOCK1         = 27,    "Block1",         Integer, None,       false;
  SIZE2          = 28,    "Size2",          Integer, Some(0),    false;
  PROXY_URI      = 35,    "Proxy-Uri",      Text,    None,       false;
  PROXY_SCHEME   = 39,    "Proxy-Scheme",   Text,    None,       false;
  SIZE1          = 60,    "Size1",          Integer, None,       false;
  NO_RESPONSE    = 258,   "No-Response",    Integer, None,       false;
  ROUTING        = 65524, "Routing",        Opaque,  None,       false;
}

/// Look up the descriptor for an option number
///
/// ```
/// use hcproxy_msg::registry::{self, ValueType};
/// use hcproxy_msg::OptNumber;
///
/// assert_eq!(registry::get(registry::MAX_AGE).map(|d| d.value_type),
///            Some(ValueType::Integer));
/// assert!(registry::get(OptNumber(2)).is_none());
/// ```
pub fn get(number: OptNumber) -> Option<&'static OptDescriptor> {
  REGISTRY.binary_search_by_key(&number.0, |d| d.number.0)
          .ok()
          .map(|ix| &REGISTRY[ix])
}

/// The options a proxy must understand and may not forward blindly.
///
/// This fixed set is the forwarding policy of this implementation; it is consulted
/// instead of the "UnSafe" bit of the option number (RFC7252 section 5.4.6).
pub const UNSAFE_TO_FORWARD: [OptNumber; 7] =
  [URI_HOST, URI_PORT, URI_PATH, MAX_AGE, URI_QUERY, PROXY_URI, PROXY_SCHEME];
