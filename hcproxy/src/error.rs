use std::io;

use hcproxy_msg::to_bytes::MessageToBytesError;
use hcproxy_msg::{Code, OptError};
use thiserror::Error;

/// The CoAP target embedded in a request path could not be used
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UriError {
  /// Not a URI at all
  #[error("target is not a valid URI: {0}")]
  Invalid(#[from] url::ParseError),
  /// A URI, but not a `coap://` one
  #[error("unsupported scheme {0:?}, expected \"coap\"")]
  UnsupportedScheme(String),
  /// `coap:///path` and friends
  #[error("target URI has no host")]
  MissingHost,
}

/// A POST or PUT whose target URI does not carry a usable payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PayloadError {
  /// The target URI has no query string (or an empty one)
  #[error("request needs a payload but the target URI has no query")]
  Missing,
  /// The query string is not exactly `key=value`
  #[error("query must contain exactly one '='")]
  Malformed,
}

/// Failures of a CoAP round trip
#[derive(Debug, Error)]
pub enum TransportError {
  /// The target host did not resolve to any address
  #[error("could not resolve {host}:{port}")]
  Resolve {
    /// Target host
    host: String,
    /// Target port
    port: u16,
  },
  /// Socket error, including ICMP port unreachable surfacing as `ConnectionRefused`
  #[error(transparent)]
  Io(#[from] io::Error),
  /// The request could not be built
  #[error("could not build request: {0}")]
  Request(#[from] OptError),
  /// The request could not be serialized
  #[error("could not encode request: {0}")]
  Encode(#[from] MessageToBytesError),
  /// Every transmission went unanswered
  #[error("no response after {0} transmissions")]
  Timeout(u16),
  /// The endpoint answered with a Reset
  #[error("endpoint reset the exchange")]
  Reset,
  /// The session was used after [`Session::stop`](crate::transport::Session::stop)
  #[error("session already stopped")]
  Stopped,
}

/// A CoAP response code with no entry in the translation table.
///
/// This is never turned into an HTTP status; see [`crate::translate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("CoAP response code {0} has no HTTP status")]
pub struct UnknownResponseCode(pub Code);

/// Configuration could not be loaded
#[derive(Debug, Error)]
pub enum ConfigError {
  /// The file could not be read
  #[error("could not read config file: {0}")]
  Read(#[from] io::Error),
  /// The file is not valid config JSON
  #[error("could not parse config file: {0}")]
  Parse(#[from] serde_json::Error),
}

/// Everything that can stop a gateway request from being answered normally
#[derive(Debug, Error)]
pub enum Error {
  /// The request path does not begin with the configured proxy path
  /// followed by a `coap://` target
  #[error("request path is not under the proxy path")]
  PathMismatch,
  /// The HTTP method has no CoAP counterpart
  #[error("method {0} is not supported")]
  UnsupportedMethod(String),
  /// The embedded target URI is unusable
  #[error("invalid target: {0}")]
  InvalidTarget(#[from] UriError),
  /// POST or PUT without a payload, or with a malformed one
  #[error(transparent)]
  Payload(#[from] PayloadError),
  /// The CoAP round trip failed
  #[error("upstream request failed: {0}")]
  UpstreamTransport(#[from] TransportError),
  /// The upstream answered with a code the translation table does not know
  #[error(transparent)]
  UnknownResponseCode(#[from] UnknownResponseCode),
}

impl Error {
  /// The HTTP status this error is answered with.
  ///
  /// `None` for [`Error::PathMismatch`] (no response at all) and
  /// [`Error::UnknownResponseCode`] (not answerable; a defect in the table).
  pub fn http_status(&self) -> Option<u16> {
    match self {
      | Error::PathMismatch | Error::UnknownResponseCode(_) => None,
      | Error::InvalidTarget(_) | Error::Payload(_) => Some(400),
      | Error::UnsupportedMethod(_) => Some(501),
      | Error::UpstreamTransport(_) => Some(502),
    }
  }
}
