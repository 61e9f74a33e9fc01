use std::net::SocketAddr;
use std::ops::{Deref, DerefMut};

use hcproxy_msg::{code, Code, Message, Opt};

use crate::error::TransportError;

/// The outcome of one CoAP round trip
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoapResponse {
  /// Where the response came from
  pub source: SocketAddr,
  /// Response code
  pub code: Code,
  /// Payload, `None` when the response carried none
  pub payload: Option<Vec<u8>>,
  /// Response options
  pub options: Vec<Opt>,
}

impl CoapResponse {
  /// Extract the response from a message received from `source`
  pub fn from_message(source: SocketAddr, msg: Message) -> Self {
    Self { source,
           code: msg.code,
           payload: Some(msg.payload.0).filter(|p| !p.is_empty()),
           options: msg.opts }
  }
}

/// A CoAP client bound to one endpoint.
///
/// Implementors provide [`Session::request`]; the method-specific
/// operations are built on it.
pub trait Session {
  /// Send one request and wait for its response
  fn request(&mut self,
             method: Code,
             path: &str,
             payload: Option<&[u8]>)
             -> Result<CoapResponse, TransportError>;

  /// Release the session. Calling this more than once has no further effect.
  fn stop(&mut self);

  /// `GET path`
  fn get(&mut self, path: &str) -> Result<CoapResponse, TransportError> {
    self.request(code::GET, path, None)
  }

  /// `POST path` with a payload
  fn post(&mut self, path: &str, payload: &[u8]) -> Result<CoapResponse, TransportError> {
    self.request(code::POST, path, Some(payload))
  }

  /// `PUT path` with a payload
  fn put(&mut self, path: &str, payload: &[u8]) -> Result<CoapResponse, TransportError> {
    self.request(code::PUT, path, Some(payload))
  }

  /// `DELETE path`
  fn delete(&mut self, path: &str) -> Result<CoapResponse, TransportError> {
    self.request(code::DELETE, path, None)
  }
}

/// Opens [`Session`]s.
///
/// Shared by every request the gateway handles concurrently.
pub trait Connect: Send + Sync {
  /// The session type this connector opens
  type Session: Session;

  /// Open a session with the endpoint at `host`:`port`
  fn connect(&self, host: &str, port: u16) -> Result<Self::Session, TransportError>;
}

/// A session that is [stopped](Session::stop) when dropped
#[derive(Debug)]
pub struct Scoped<S: Session>(S);

impl<S: Session> Scoped<S> {
  /// Take ownership of a session
  pub fn new(session: S) -> Self {
    Self(session)
  }
}

impl<S: Session> Deref for Scoped<S> {
  type Target = S;

  fn deref(&self) -> &S {
    &self.0
  }
}

impl<S: Session> DerefMut for Scoped<S> {
  fn deref_mut(&mut self) -> &mut S {
    &mut self.0
  }
}

impl<S: Session> Drop for Scoped<S> {
  fn drop(&mut self) {
    self.0.stop();
  }
}
