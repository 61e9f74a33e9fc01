use toad_macros::rfc_7252_doc;

/// Message Code
pub mod code;

/// Message parsing errors
pub mod parse_error;

/// Message ID
pub mod id;

/// Message Options
pub mod opt;

/// Message Type
pub mod ty;

/// Message Token
pub mod token;

/// Message Version
pub mod ver;

pub use code::*;
pub use id::*;
pub use opt::*;
pub use parse_error::*;
pub use token::*;
pub use ty::*;
pub use ver::*;

use crate::from_bytes::TryConsumeBytes;
use crate::{Cursor, TryFromBytes};

#[doc = rfc_7252_doc!("5.5")]
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd)]
pub struct Payload(pub Vec<u8>);

/// Struct representing the first byte of a message.
///
/// ```text
/// CoAP version
/// |
/// |  Message type (request, response, empty)
/// |  |
/// |  |  Length of token, in bytes. (4-bit integer)
/// |  |  |
/// vv vv vvvv
/// 01 00 0000
/// ```
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
pub(crate) struct Byte1 {
  pub(crate) ver: Version,
  pub(crate) ty: Type,
  pub(crate) tkl: u8,
}

impl TryFrom<u8> for Byte1 {
  type Error = MessageParseError;

  fn try_from(b: u8) -> Result<Self, Self::Error> {
    let ver = b >> 6; // bits 0 & 1
    let ty = b >> 4 & 0b11; // bits 2 & 3
    let tkl = b & 0b1111u8; // last 4 bits

    if ver != Version::default().0 {
      return Err(MessageParseError::UnsupportedVersion(ver));
    }

    Ok(Byte1 { ver: Version(ver),
               ty: Type::try_from(ty)?,
               tkl })
  }
}

/// # `Message` struct
/// A CoAP message, kept very close to the binary format.
///
/// Options are stored in the order they were added; they are sorted by
/// number only when the message is serialized.
///
/// Messages support both serializing to bytes and from bytes, by using the provided [`TryFromBytes`] and [`TryIntoBytes`](crate::TryIntoBytes) traits.
///
/// <details>
/// <summary><b>RFC7252 - CoAP Messaging Model</b></summary>
#[doc = concat!("\n#", rfc_7252_doc!("2.1"))]
/// </details>
/// <details>
/// <summary><b>RFC7252 - CoAP Message Binary Format</b></summary>
#[doc = concat!("\n#", rfc_7252_doc!("3"))]
/// </details>
///
/// ```
/// use hcproxy_msg::*;
///
/// let mut req = Message::new(Type::Con, code::GET, Id(1), Token::from_bytes(&[1, 2, 3, 4]));
/// req.add(Opt::new(registry::URI_PATH, "light").unwrap());
/// req.add(Opt::new(registry::URI_PATH, "dimmer").unwrap());
///
/// let bytes = req.clone().try_into_bytes().unwrap();
/// let parsed = Message::try_from_bytes(&bytes).unwrap();
///
/// assert_eq!(parsed, req);
/// assert_eq!(parsed.path().collect::<Vec<_>>(), vec!["light", "dimmer"]);
/// ```
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Message {
  /// see [`Id`] for details
  pub id: Id,
  /// see [`Type`] for details
  pub ty: Type,
  /// see [`Version`] for details
  pub ver: Version,
  /// see [`Token`] for details
  pub token: Token,
  /// see [`Code`] for details
  pub code: Code,
  /// see [`opt::Opt`] for details
  pub opts: Vec<Opt>,
  /// see [`Payload`]
  pub payload: Payload,
}

impl Message {
  /// Create a message with no options and no payload
  pub fn new(ty: Type, code: Code, id: Id, token: Token) -> Self {
    Self { id,
           ty,
           ver: Default::default(),
           token,
           code,
           opts: Vec::new(),
           payload: Payload::default() }
  }

  /// Create an empty ACK for this message.
  ///
  /// Empty messages carry no token, so only `id` links the ACK to what it acknowledges.
  pub fn ack(&self, id: Id) -> Self {
    Self::new(Type::Ack, code::EMPTY, id, Token::default())
  }

  /// Add an option.
  ///
  /// Options whose registry entry is repeatable accumulate;
  /// any other option replaces an earlier occurrence of the same number.
  pub fn add(&mut self, opt: Opt) {
    if !opt.descriptor().repeatable {
      self.remove(opt.number());
    }

    self.opts.push(opt);
  }

  /// Build an option from `raw` and [`add`](Message::add) it
  pub fn set(&mut self, number: OptNumber, raw: impl Into<Raw>) -> Result<(), OptError> {
    self.add(Opt::new(number, raw)?);
    Ok(())
  }

  /// The first occurrence of an option
  pub fn get(&self, number: OptNumber) -> Option<&Opt> {
    self.opts.iter().find(|o| o.number() == number)
  }

  /// Every occurrence of an option, in the order they were added
  pub fn get_all(&self, number: OptNumber) -> impl Iterator<Item = &Opt> {
    self.opts.iter().filter(move |o| o.number() == number)
  }

  /// Remove every occurrence of an option, returning how many there were
  pub fn remove(&mut self, number: OptNumber) -> usize {
    let before = self.opts.len();
    self.opts.retain(|o| o.number() != number);
    before - self.opts.len()
  }

  /// The Uri-Path segments of this message
  pub fn path(&self) -> impl Iterator<Item = &str> {
    self.get_all(registry::URI_PATH).filter_map(|o| match o.get() {
                                      | Value::Text(s) => Some(s),
                                      | _ => None,
                                    })
  }

  /// The payload, if it is not empty
  pub fn payload(&self) -> Option<&[u8]> {
    Some(self.payload.0.as_slice()).filter(|p| !p.is_empty())
  }
}

impl<Bytes: AsRef<[u8]>> TryFromBytes<Bytes> for Message {
  type Error = MessageParseError;

  fn try_from_bytes(bytes: Bytes) -> Result<Self, Self::Error> {
    let mut bytes = Cursor::new(bytes);

    let Byte1 { tkl, ty, ver } = bytes.next().ok_or_else(MessageParseError::eof)?.try_into()?;

    if tkl > 8 {
      return Err(Self::Error::InvalidTokenLength(tkl));
    }

    let code: Code = bytes.next().ok_or_else(MessageParseError::eof)?.into();
    let id: Id = Id::try_consume_bytes(&mut bytes)?;

    let token = bytes.take_exact(tkl as usize)
                     .ok_or_else(MessageParseError::eof)?;
    let token = Token::from_bytes(token);

    let opts = Vec::<Opt>::try_consume_bytes(&mut bytes)?;

    let payload = Payload(bytes.take_until_end().to_vec());

    Ok(Message { id,
                 ty,
                 ver,
                 code,
                 token,
                 opts,
                 payload })
  }
}
