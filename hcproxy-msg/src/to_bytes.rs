use core::fmt;

use tinyvec::ArrayVec;

use crate::*;

/// Trait allowing fallible conversion into bytes
pub trait TryIntoBytes {
  /// Error type yielded if conversion fails
  type Error;

  /// Try to convert into a collection of bytes
  ///
  /// ```
  /// use hcproxy_msg::{code, Id, Message, Token, TryIntoBytes, Type};
  ///
  /// let msg = Message::new(Type::Con, code::GET, Id(0), Token::default());
  /// let bytes: Vec<u8> = msg.try_into_bytes().unwrap();
  ///
  /// assert_eq!(bytes, vec![0b_01_00_0000, 0b_000_00001, 0, 0]);
  /// ```
  fn try_into_bytes(self) -> Result<Vec<u8>, Self::Error>;
}

/// Errors encounterable serializing to bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MessageToBytesError {
  /// The gap between two consecutive option numbers can't be represented on the wire
  OptionDeltaTooLarge(OptNumber),
  /// An option value is longer than the wire format allows (65804 bytes)
  OptionValueTooLong(OptNumber),
}

impl fmt::Display for MessageToBytesError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      | Self::OptionDeltaTooLarge(n) => write!(f, "option {} is too far from the previous option", n.0),
      | Self::OptionValueTooLong(n) => write!(f, "value of option {} is too long to encode", n.0),
    }
  }
}

impl std::error::Error for MessageToBytesError {}

impl TryIntoBytes for Message {
  type Error = MessageToBytesError;

  fn try_into_bytes(self) -> Result<Vec<u8>, Self::Error> {
    let mut bytes = Vec::with_capacity(4 + self.token.0.len() + 1 + self.payload.0.len());

    let byte1: u8 = Byte1 { tkl: self.token.0.len() as u8,
                            ver: self.ver,
                            ty: self.ty }.into();
    let code: u8 = self.code.into();
    let id: [u8; 2] = self.id.into();

    bytes.push(byte1);
    bytes.push(code);
    bytes.extend(id);
    bytes.extend(self.token.0);

    crate::msg::opt::extend_bytes(&self.opts, &mut bytes)?;

    if !self.payload.0.is_empty() {
      bytes.push(0b11111111);
      bytes.extend(self.payload.0);
    }

    Ok(bytes)
  }
}

/// Encode an option delta or value length as its 4-bit header nibble
/// plus the extended bytes that follow the header, if any.
///
/// `None` when `val` is too large to represent.
pub(crate) fn opt_len_or_delta(val: u32) -> Option<(u8, Option<ArrayVec<[u8; 2]>>)> {
  match val {
    | n if n >= 269 => {
      let ext = u16::try_from(n - 269).ok()?;
      let mut bytes = ArrayVec::new();
      bytes.extend(ext.to_be_bytes());
      Some((14, Some(bytes)))
    },
    | n if n >= 13 => {
      let mut bytes = ArrayVec::new();
      bytes.push((n as u8) - 13);
      Some((13, Some(bytes)))
    },
    | n => Some((n as u8, None)),
  }
}

impl From<Id> for [u8; 2] {
  fn from(id: Id) -> [u8; 2] {
    id.0.to_be_bytes()
  }
}

impl From<Byte1> for u8 {
  fn from(b: Byte1) -> u8 {
    let ver = b.ver.0 << 6;
    let ty = u8::from(b.ty) << 4;
    let tkl = b.tkl;

    ver | ty | tkl
  }
}
