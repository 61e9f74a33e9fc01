use core::fmt;
use core::num::IntErrorKind;

use toad_macros::rfc_7252_doc;

use crate::from_bytes::TryConsumeBytes;
use crate::Cursor;

/// Option parsing & value errors
pub mod parse_error;
pub use parse_error::*;

pub mod registry;
use registry::{OptDescriptor, ValueType};

pub(crate) fn parse_opt_len_or_delta<A: AsRef<[u8]>>(head: u8,
                                                     bytes: &mut Cursor<A>,
                                                     reserved_err: OptParseError)
                                                     -> Result<u32, OptParseError> {
  match head {
    | 13 => {
      let n = bytes.next().ok_or_else(OptParseError::eof)?;
      Ok((n as u32) + 13)
    },
    | 14 => match bytes.take_exact(2) {
      | Some(&[a, b]) => Ok(u16::from_be_bytes([a, b]) as u32 + 269),
      | _ => Err(OptParseError::eof()),
    },
    | 15 => Err(reserved_err),
    | _ => Ok(head as u32),
  }
}

/// The "Option Delta" is the difference between this Option's Number
/// and the previous Option's number.
///
/// Deltas only exist on the wire; [`Opt`]s always know their absolute [`OptNumber`].
///
/// # Related
/// - [RFC7252#section-3.1 Option Format](https://datatracker.ietf.org/doc/html/rfc7252#section-3.1)
#[derive(Copy, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Debug, Default)]
pub struct OptDelta(pub u32);

#[doc = rfc_7252_doc!("5.4.6")]
/// <details><summary><b>RFC7252 Section 12.2 Core CoAP Option Numbers</b></summary>
#[doc = concat!("\n#", rfc_7252_doc!("12.2"))]
/// </details>
#[derive(Copy, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Debug, Default)]
pub struct OptNumber(pub u32);

#[doc = rfc_7252_doc!("5.4.1")]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum OptionMustBeProcessed {
  /// This option must be processed,
  /// and a response that ignores it
  /// will be rejected.
  ///
  /// Corresponds to the option being "critical"
  /// in strict CoAP terms
  Yes,
  /// This option does not _need_ to
  /// be processed,
  /// and a response that ignores it
  /// will be processed anyway.
  ///
  /// Corresponds to the option being "elective"
  /// in strict CoAP terms
  No,
}

#[doc = rfc_7252_doc!("5.4.2")]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum WhenOptionUnsupportedByProxy {
  /// This option /must be/ processed & understood by proxies
  /// and may not be forwarded blindly to their destination.
  ///
  /// Corresponds to the option being "UnSafe" to forward
  /// in strict CoAP terms
  Error,
  /// This option may not be processed & understood by proxies
  /// and may be forwarded blindly to their destination.
  ///
  /// Corresponds to the option being "SafeToForward"
  /// in strict CoAP terms
  Forward,
}

#[doc = rfc_7252_doc!("5.4.2")]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum WhenOptionChanges {
  /// If this option is safe to forward but unknown to a proxy,
  /// it should be included in the proxy's cache key for this message.
  ResponseChanges,
  /// If this option is safe to forward but unknown to a proxy,
  /// it should not be included in the proxy's cache key for this message.
  ///
  /// Corresponds to the option being "NoCacheKey"
  /// in strict CoAP terms
  ResponseDoesNotChange,
}

impl OptNumber {
  /// The registry entry for this number, if there is one
  pub fn descriptor(&self) -> Option<&'static OptDescriptor> {
    registry::get(*self)
  }

  /// Whether a proxy may relay this option without understanding it.
  ///
  /// This consults the fixed [`registry::UNSAFE_TO_FORWARD`] set rather than
  /// the number's "UnSafe" bit ([`OptNumber::when_unsupported_by_proxy`]):
  /// Uri-Host, Uri-Port, Uri-Path, Max-Age, Uri-Query, Proxy-Uri and Proxy-Scheme are unsafe,
  /// every other number (registered or not) is safe.
  ///
  /// ```
  /// use hcproxy_msg::{registry, OptNumber};
  ///
  /// assert!(!registry::MAX_AGE.is_safe_to_forward());
  /// assert!(registry::ETAG.is_safe_to_forward());
  /// assert!(OptNumber(9000).is_safe_to_forward());
  /// ```
  pub fn is_safe_to_forward(&self) -> bool {
    !registry::UNSAFE_TO_FORWARD.contains(self)
  }

  /// Whether or not this option may be ignored by a server
  pub fn must_be_processed(&self) -> OptionMustBeProcessed {
    #[allow(clippy::wildcard_in_or_patterns)] // will only ever be 0 or 1
    match self.0 & 0b1 {
      | 1 => OptionMustBeProcessed::Yes,
      | 0 | _ => OptionMustBeProcessed::No,
    }
  }

  /// What RFC7252's "UnSafe" bit says about forwarding this option
  pub fn when_unsupported_by_proxy(&self) -> WhenOptionUnsupportedByProxy {
    #[allow(clippy::wildcard_in_or_patterns)] // will only ever be 0 or 1
    match (self.0 & 0b10) >> 1 {
      | 1 => WhenOptionUnsupportedByProxy::Error,
      | 0 | _ => WhenOptionUnsupportedByProxy::Forward,
    }
  }

  /// Whether or not different values for this option should
  /// yield proxies' cached response
  pub fn when_option_changes(&self) -> WhenOptionChanges {
    match (self.0 & 0b11100) >> 2 {
      | 0b111 => WhenOptionChanges::ResponseDoesNotChange,
      | _ => WhenOptionChanges::ResponseChanges,
    }
  }
}

/// An untyped value on its way into an [`Opt`].
///
/// The option's registry entry decides what it gets coerced to; see [`Opt::new`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Raw {
  /// An unsigned integer
  Int(u64),
  /// A string
  Text(String),
  /// Raw bytes
  Bytes(Vec<u8>),
}

macro_rules! raw_from_uint {
  ($($t:ty),*) => {
    $(impl From<$t> for Raw {
      fn from(n: $t) -> Self {
        Raw::Int(n as u64)
      }
    })*
  };
}

raw_from_uint!(u8, u16, u32, u64);

impl From<&str> for Raw {
  fn from(s: &str) -> Self {
    Raw::Text(s.to_string())
  }
}

impl From<String> for Raw {
  fn from(s: String) -> Self {
    Raw::Text(s)
  }
}

impl From<&[u8]> for Raw {
  fn from(b: &[u8]) -> Self {
    Raw::Bytes(b.to_vec())
  }
}

impl<const N: usize> From<&[u8; N]> for Raw {
  fn from(b: &[u8; N]) -> Self {
    Raw::Bytes(b.to_vec())
  }
}

impl From<Vec<u8>> for Raw {
  fn from(b: Vec<u8>) -> Self {
    Raw::Bytes(b)
  }
}

#[doc = rfc_7252_doc!("3.2")]
///
/// # `OptValue`
/// The stored value of an [`Opt`]. The variant always matches the
/// [`ValueType`] declared for the option in the registry.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum OptValue {
  /// `None` when the option was present with a zero-length value and nothing
  /// else was ever stored; reads back as the registry default.
  ///
  /// `Some(0)` is an explicit zero, which also encodes to zero bytes.
  Integer(Option<u32>),
  /// UTF-8 text
  Text(String),
  /// Opaque bytes
  Opaque(Vec<u8>),
}

impl OptValue {
  /// The value's wire encoding
  pub fn encode(&self) -> Vec<u8> {
    match self {
      | OptValue::Integer(n) => encode_uint(n.unwrap_or(0)),
      | OptValue::Text(s) => s.as_bytes().to_vec(),
      | OptValue::Opaque(b) => b.clone(),
    }
  }

  /// Length in bytes of the value's wire encoding
  pub fn len(&self) -> usize {
    match self {
      | OptValue::Integer(n) => uint_len(n.unwrap_or(0)),
      | OptValue::Text(s) => s.len(),
      | OptValue::Opaque(b) => b.len(),
    }
  }

  /// Whether the value encodes to zero bytes
  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

/// A borrowed, typed view of an [`Opt`]'s value, as returned by [`Opt::get`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Value<'a> {
  /// Integer value (defaults already applied)
  Integer(u32),
  /// Text value
  Text(&'a str),
  /// Opaque value
  Opaque(&'a [u8]),
}

impl<'a> Value<'a> {
  /// The integer, if this is an integer value
  pub fn as_integer(&self) -> Option<u32> {
    match self {
      | Value::Integer(n) => Some(*n),
      | _ => None,
    }
  }

  /// The bytes of a text or opaque value
  pub fn as_bytes(&self) -> Option<&'a [u8]> {
    match self {
      | Value::Text(s) => Some(s.as_bytes()),
      | Value::Opaque(b) => Some(b),
      | Value::Integer(_) => None,
    }
  }
}

impl<'a> fmt::Display for Value<'a> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      | Value::Integer(n) => write!(f, "{}", n),
      | Value::Text(s) => write!(f, "{}", s),
      | Value::Opaque(b) => b.iter().try_for_each(|b| write!(f, "{:02x}", b)),
    }
  }
}

fn uint_len(n: u32) -> usize {
  4 - (n.leading_zeros() / 8) as usize
}

fn encode_uint(n: u32) -> Vec<u8> {
  let len = uint_len(n);
  n.to_be_bytes()[4 - len..].to_vec()
}

fn decode_uint(bytes: &[u8]) -> Option<u32> {
  if bytes.len() > 4 {
    None
  } else {
    Some(bytes.iter().fold(0u32, |n, b| (n << 8) | (*b as u32)))
  }
}

#[doc = rfc_7252_doc!("5.4")]
/// <details><summary><b>RFC7252 Section 3.1 Option binary format</b></summary>
#[doc = concat!("\n#", rfc_7252_doc!("3.1"))]
/// </details>
///
/// # `Opt` struct
/// One occurrence of a CoAP option.
///
/// An `Opt` can only be built for a number that is in the [`registry`],
/// and the registry entry fixes the type of its value for its whole lifetime.
///
/// Two `Opt`s are equal when they have the same number and the same wire encoding.
///
/// ```
/// use hcproxy_msg::{registry, Opt, OptError, Value};
///
/// let mut port = Opt::new(registry::URI_PORT, 5683u16).unwrap();
/// assert_eq!(port.len(), 2);
///
/// port.set("0").unwrap();
/// assert_eq!(port.get(), Value::Integer(0));
/// assert_eq!(port.len(), 0);
///
/// assert_eq!(port.set("zero"), Err(OptError::NotAnInteger(registry::URI_PORT)));
/// ```
#[derive(Clone, Debug)]
pub struct Opt {
  desc: &'static OptDescriptor,
  value: OptValue,
}

impl Opt {
  /// Build an option, coercing `raw` to the type the registry declares for `number`.
  ///
  /// - Integer options accept integers, decimal text, or big-endian bytes (at most 4).
  ///   Zero is stored as an explicit zero.
  /// - Text options accept text, integers (rendered in decimal), or UTF-8 bytes.
  /// - Opaque options keep bytes unchanged and store text (and decimal integers) as UTF-8.
  ///
  /// Fails with [`OptError::UnknownOptionType`] when `number` is not registered.
  pub fn new(number: OptNumber, raw: impl Into<Raw>) -> Result<Self, OptError> {
    let desc = Self::lookup(number)?;
    coerce(desc, raw.into()).map(|value| Opt { desc, value })
  }

  /// Build an option that is present with a zero-length value
  ///
  /// For integer options this reads back as the registry default.
  pub fn empty(number: OptNumber) -> Result<Self, OptError> {
    let desc = Self::lookup(number)?;
    let value = match desc.value_type {
      | ValueType::Integer => OptValue::Integer(None),
      | ValueType::Text => OptValue::Text(String::new()),
      | ValueType::Opaque => OptValue::Opaque(Vec::new()),
    };

    Ok(Opt { desc, value })
  }

  /// Interpret the value bytes of an option read off the wire
  pub fn from_wire(number: OptNumber, bytes: &[u8]) -> Result<Self, OptError> {
    let desc = Self::lookup(number)?;
    let value = match desc.value_type {
      | ValueType::Integer if bytes.is_empty() => OptValue::Integer(None),
      | ValueType::Integer => decode_uint(bytes).map(|n| OptValue::Integer(Some(n)))
                                                .ok_or(OptError::IntegerOutOfRange(number))?,
      | ValueType::Text => core::str::from_utf8(bytes).map(|s| OptValue::Text(s.to_string()))
                                                      .map_err(|_| OptError::InvalidUtf8(number))?,
      | ValueType::Opaque => OptValue::Opaque(bytes.to_vec()),
    };

    Ok(Opt { desc, value })
  }

  fn lookup(number: OptNumber) -> Result<&'static OptDescriptor, OptError> {
    registry::get(number).ok_or(OptError::UnknownOptionType(number))
  }

  /// Replace this option's value, coercing `raw` the same way [`Opt::new`] does.
  ///
  /// On error the previous value is kept.
  pub fn set(&mut self, raw: impl Into<Raw>) -> Result<(), OptError> {
    self.value = coerce(self.desc, raw.into())?;
    Ok(())
  }

  /// Read the value.
  ///
  /// Integer options decode their stored integer, unless they are present-but-empty
  /// ([`Opt::empty`], or zero-length on the wire), in which case the registry default
  /// is returned (`0` when the registry has none).
  pub fn get(&self) -> Value<'_> {
    match &self.value {
      | OptValue::Integer(Some(n)) => Value::Integer(*n),
      | OptValue::Integer(None) => Value::Integer(self.desc.default.unwrap_or(0)),
      | OptValue::Text(s) => Value::Text(s),
      | OptValue::Opaque(b) => Value::Opaque(b),
    }
  }

  /// The stored value
  pub fn value(&self) -> &OptValue {
    &self.value
  }

  /// Option number
  pub fn number(&self) -> OptNumber {
    self.desc.number
  }

  /// The registry entry this option was built from
  pub fn descriptor(&self) -> &'static OptDescriptor {
    self.desc
  }

  /// Option name, e.g. `"Uri-Path"`
  pub fn name(&self) -> &'static str {
    self.desc.name
  }

  /// Byte length of the value's wire encoding; 0 when empty
  pub fn len(&self) -> usize {
    self.value.len()
  }

  /// Whether the value encodes to zero bytes
  pub fn is_empty(&self) -> bool {
    self.value.is_empty()
  }

  /// See [`OptNumber::is_safe_to_forward`]
  pub fn is_safe_to_forward(&self) -> bool {
    self.number().is_safe_to_forward()
  }

  /// The value's wire encoding
  pub fn encode(&self) -> Vec<u8> {
    self.value.encode()
  }
}

fn coerce(desc: &OptDescriptor, raw: Raw) -> Result<OptValue, OptError> {
  let n = desc.number;

  match (desc.value_type, raw) {
    | (ValueType::Integer, Raw::Int(i)) => u32::try_from(i).map(|i| OptValue::Integer(Some(i)))
                                                           .map_err(|_| OptError::IntegerOutOfRange(n)),
    | (ValueType::Integer, Raw::Text(s)) => match s.trim().parse::<u32>() {
      | Ok(i) => Ok(OptValue::Integer(Some(i))),
      | Err(e) if *e.kind() == IntErrorKind::PosOverflow => Err(OptError::IntegerOutOfRange(n)),
      | Err(_) => Err(OptError::NotAnInteger(n)),
    },
    | (ValueType::Integer, Raw::Bytes(b)) => decode_uint(&b).map(|i| OptValue::Integer(Some(i)))
                                                            .ok_or(OptError::IntegerOutOfRange(n)),
    | (ValueType::Text, Raw::Int(i)) => Ok(OptValue::Text(i.to_string())),
    | (ValueType::Text, Raw::Text(s)) => Ok(OptValue::Text(s)),
    | (ValueType::Text, Raw::Bytes(b)) => {
      String::from_utf8(b).map(OptValue::Text)
                          .map_err(|_| OptError::InvalidUtf8(n))
    },
    | (ValueType::Opaque, Raw::Int(i)) => Ok(OptValue::Opaque(i.to_string().into_bytes())),
    | (ValueType::Opaque, Raw::Text(s)) => Ok(OptValue::Opaque(s.into_bytes())),
    | (ValueType::Opaque, Raw::Bytes(b)) => Ok(OptValue::Opaque(b)),
  }
}

impl PartialEq for Opt {
  fn eq(&self, other: &Self) -> bool {
    self.number() == other.number() && self.encode() == other.encode()
  }
}

impl Eq for Opt {}

impl core::hash::Hash for Opt {
  fn hash<H: core::hash::Hasher>(&self, state: &mut H) {
    self.number().hash(state);
    self.encode().hash(state);
  }
}

impl fmt::Display for Opt {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}: {}", self.name(), self.get())
  }
}

/// An option as it appears on the wire, before its number is known
struct RawOpt<'a> {
  delta: OptDelta,
  value: &'a [u8],
}

fn consume_raw_opt<'a, A: AsRef<[u8]>>(bytes: &'a mut Cursor<A>)
                                       -> Result<RawOpt<'a>, OptParseError> {
  let byte1 = bytes.next()
                   .ok_or(OptParseError::OptionsExhausted)
                   .and_then(|b| {
                     if b == 0b11111111 {
                       Err(OptParseError::OptionsExhausted)
                     } else {
                       Ok(b)
                     }
                   })?;

  // NOTE: Delta **MUST** be consumed before Value.
  let delta = parse_opt_len_or_delta(byte1 >> 4,
                                     bytes,
                                     OptParseError::OptionDeltaReservedValue(15))?;

  let len = parse_opt_len_or_delta(byte1 & 0b00001111,
                                   bytes,
                                   OptParseError::ValueLengthReservedValue(15))?
            as usize;

  let value = bytes.take_exact(len).ok_or_else(OptParseError::eof)?;

  Ok(RawOpt { delta: OptDelta(delta),
              value })
}

impl<Bytes: AsRef<[u8]>> TryConsumeBytes<Bytes> for Vec<Opt> {
  type Error = OptParseError;

  /// Parse options up to (and including) the payload marker or the end of the buffer.
  ///
  /// Elective options missing from the registry are dropped;
  /// critical ones fail the parse.
  fn try_consume_bytes(bytes: &mut Cursor<Bytes>) -> Result<Self, Self::Error> {
    let mut opts = Vec::new();
    let mut number = 0u32;

    loop {
      match consume_raw_opt(bytes) {
        | Ok(RawOpt { delta, value }) => {
          number += delta.0;
          let num = OptNumber(number);

          match Opt::from_wire(num, value) {
            | Ok(opt) => opts.push(opt),
            | Err(OptError::UnknownOptionType(_))
              if num.must_be_processed() == OptionMustBeProcessed::No => {},
            | Err(OptError::UnknownOptionType(_)) => {
              break Err(OptParseError::UnknownCriticalOption(num))
            },
            | Err(e) => break Err(OptParseError::InvalidValue(e)),
          }
        },
        | Err(OptParseError::OptionsExhausted) => break Ok(opts),
        | Err(e) => break Err(e),
      }
    }
  }
}

/// Append the wire form of `opts` to `bytes`, ordered by option number.
///
/// Occurrences of the same option keep their relative order.
pub(crate) fn extend_bytes(opts: &[Opt], bytes: &mut Vec<u8>) -> Result<(), crate::to_bytes::MessageToBytesError> {
  use crate::to_bytes::{opt_len_or_delta, MessageToBytesError};

  let mut sorted = opts.iter().collect::<Vec<_>>();
  sorted.sort_by_key(|o| o.number());

  let mut prev = 0u32;
  for opt in sorted {
    let value = opt.encode();
    let number = opt.number().0;

    let (del, del_bytes) = opt_len_or_delta(number - prev).ok_or(MessageToBytesError::OptionDeltaTooLarge(opt.number()))?;
    let (len, len_bytes) = opt_len_or_delta(value.len() as u32).ok_or(MessageToBytesError::OptionValueTooLong(opt.number()))?;

    bytes.push((del << 4) | len);
    bytes.extend(del_bytes.into_iter().flatten());
    bytes.extend(len_bytes.into_iter().flatten());
    bytes.extend(value);

    prev = number;
  }

  Ok(())
}
