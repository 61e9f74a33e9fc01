use super::MessageParseError;

/// Indicates if this message is of
/// type Confirmable (0), Non-confirmable (1), Acknowledgement (2), or Reset (3).
///
/// See [RFC7252 - Message Details](https://datatracker.ietf.org/doc/html/rfc7252#section-3) for context
#[derive(Copy, Clone, Hash, Eq, Ord, PartialEq, PartialOrd, Debug)]
pub enum Type {
  /// Confirmable; the receiver must answer with an [`Ack`](Type::Ack) or [`Reset`](Type::Reset).
  ///
  /// Every request the gateway sends upstream is Confirmable.
  Con,
  /// Non-confirmable; fire and forget.
  Non,
  /// Acknowledges that a specific Confirmable message arrived.
  ///
  /// May carry a piggybacked response; when it carries none (code `0.00`)
  /// the response will arrive later in a message of its own.
  Ack,
  /// A specific message was received, but some context is missing to
  /// properly process it.
  Reset,
}

impl TryFrom<u8> for Type {
  type Error = MessageParseError;

  fn try_from(b: u8) -> Result<Self, Self::Error> {
    match b {
      | 0 => Ok(Type::Con),
      | 1 => Ok(Type::Non),
      | 2 => Ok(Type::Ack),
      | 3 => Ok(Type::Reset),
      | _ => Err(MessageParseError::InvalidType(b)),
    }
  }
}

impl From<Type> for u8 {
  fn from(t: Type) -> u8 {
    use Type::*;
    match t {
      | Con => 0,
      | Non => 1,
      | Ack => 2,
      | Reset => 3,
    }
  }
}
