use core::fmt;

use super::opt::parse_error::OptParseError;

/// Errors encounterable while parsing a message from bytes
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MessageParseError {
  /// Reached end of stream before parsing was finished
  UnexpectedEndOfStream,

  /// Token length was > 8
  InvalidTokenLength(u8),

  /// Error parsing option
  OptParseError(OptParseError),

  /// The message type is invalid (see [`Type`](crate::Type) for information & valid values)
  InvalidType(u8),

  /// The version bits were something other than 1
  UnsupportedVersion(u8),
}

impl MessageParseError {
  /// Shorthand for [`MessageParseError::UnexpectedEndOfStream`]
  pub fn eof() -> Self {
    Self::UnexpectedEndOfStream
  }
}

impl fmt::Display for MessageParseError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      | Self::UnexpectedEndOfStream => write!(f, "message ended before it was fully parsed"),
      | Self::InvalidTokenLength(n) => write!(f, "token length {} is greater than 8", n),
      | Self::OptParseError(e) => write!(f, "invalid option: {}", e),
      | Self::InvalidType(t) => write!(f, "invalid message type {}", t),
      | Self::UnsupportedVersion(v) => write!(f, "unsupported CoAP version {}", v),
    }
  }
}

impl std::error::Error for MessageParseError {}

impl From<OptParseError> for MessageParseError {
  fn from(e: OptParseError) -> Self {
    Self::OptParseError(e)
  }
}
