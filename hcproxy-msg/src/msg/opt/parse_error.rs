use core::fmt;

use super::OptNumber;

/// Errors encounterable while parsing an option from bytes
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OptParseError {
  /// Reached end of stream before parsing was finished
  UnexpectedEndOfStream,

  /// Option Delta was set to 15, which is invalid.
  OptionDeltaReservedValue(u8),

  /// Value Length was set to 15, which is invalid.
  ValueLengthReservedValue(u8),

  /// The bytes of a known option could not be read as its registered type
  InvalidValue(OptError),

  /// A critical option (odd number) that is not in the registry
  UnknownCriticalOption(OptNumber),

  /// Not a true failure case; only means we tried to read the payload marker byte (0xFF)
  /// as an option header.
  OptionsExhausted,
}

impl OptParseError {
  /// Shorthand for [`OptParseError::UnexpectedEndOfStream`]
  pub fn eof() -> Self {
    Self::UnexpectedEndOfStream
  }
}

impl fmt::Display for OptParseError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      | Self::UnexpectedEndOfStream => write!(f, "option ended before it was fully parsed"),
      | Self::OptionDeltaReservedValue(n) => write!(f, "reserved option delta nibble {}", n),
      | Self::ValueLengthReservedValue(n) => write!(f, "reserved option length nibble {}", n),
      | Self::InvalidValue(e) => write!(f, "{}", e),
      | Self::UnknownCriticalOption(n) => write!(f, "unrecognized critical option {}", n.0),
      | Self::OptionsExhausted => write!(f, "no more options"),
    }
  }
}

impl std::error::Error for OptParseError {}

/// Errors encounterable while building or changing an [`Opt`](super::Opt)
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OptError {
  /// The option number has no entry in the [`registry`](super::registry),
  /// so there is no declared type to coerce a value to.
  UnknownOptionType(OptNumber),

  /// An integer option was given something that does not fit in 32 bits
  IntegerOutOfRange(OptNumber),

  /// An integer option was given text that is not a decimal number
  NotAnInteger(OptNumber),

  /// A text option was given bytes that are not UTF-8
  InvalidUtf8(OptNumber),
}

impl fmt::Display for OptError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      | Self::UnknownOptionType(n) => write!(f, "option {} is not in the registry", n.0),
      | Self::IntegerOutOfRange(n) => write!(f, "value for option {} does not fit in 32 bits", n.0),
      | Self::NotAnInteger(n) => write!(f, "value for option {} is not a decimal integer", n.0),
      | Self::InvalidUtf8(n) => write!(f, "value for option {} is not valid UTF-8", n.0),
    }
  }
}

impl std::error::Error for OptError {}
