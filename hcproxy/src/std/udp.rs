use ::std::io;
use ::std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, ToSocketAddrs, UdpSocket};
use ::std::time::Instant;

use hcproxy_msg::{code, registry, Code, Id, Message, Payload, Token, TryFromBytes, TryIntoBytes,
                  Type};
use rand::Rng;

use super::io_to_nb;
use crate::config::TransportConfig;
use crate::error::TransportError;
use crate::logging::msg_summary;
use crate::retry::{RetryTimer, YouShould};
use crate::transport::{CoapResponse, Connect, Session};

/// Largest datagram we are prepared to receive
const MAX_DATAGRAM: usize = 65_535;

/// Opens a [`UdpSession`] per target, each on its own ephemeral socket
#[derive(Debug, Clone, Copy, Default)]
pub struct UdpConnector {
  config: TransportConfig,
}

impl UdpConnector {
  /// Create a connector whose sessions retransmit according to `config`
  pub fn new(config: TransportConfig) -> Self {
    Self { config }
  }
}

impl Connect for UdpConnector {
  type Session = UdpSession;

  fn connect(&self, host: &str, port: u16) -> Result<UdpSession, TransportError> {
    let resolve_err = || TransportError::Resolve { host: host.to_string(),
                                                   port };

    let peer = (host, port).to_socket_addrs()
                           .map_err(|e| {
                             log::debug!("resolving {}:{} failed: {}", host, port, e);
                             resolve_err()
                           })?
                           .next()
                           .ok_or_else(resolve_err)?;

    let local: SocketAddr = match peer {
      | SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
      | SocketAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
    };

    let socket = UdpSocket::bind(local)?;
    socket.connect(peer)?;
    log::debug!("session {} -> {} opened", socket.local_addr()?, peer);

    Ok(UdpSession { socket: Some(socket),
                    peer,
                    config: self.config })
  }
}

/// A CoAP client talking to one endpoint over UDP.
///
/// Every request is Confirmable and is retransmitted with exponential back-off
/// until it is acknowledged. Both piggybacked and separate responses are understood.
#[derive(Debug)]
pub struct UdpSession {
  socket: Option<UdpSocket>,
  peer: SocketAddr,
  config: TransportConfig,
}

/// What a received message means for the exchange in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Received {
  /// ACK carrying the response
  Piggybacked,
  /// The response, in a message of its own
  Separate,
  /// ACK without a response; one will follow
  EmptyAck,
  /// The endpoint rejected the request
  Reset,
  /// Stray or duplicate traffic
  Unrelated,
}

fn classify(id: Id, token: Token, msg: &Message) -> Received {
  match msg.ty {
    | Type::Ack | Type::Reset if msg.id != id => Received::Unrelated,
    | Type::Reset => Received::Reset,
    | Type::Ack if msg.code == code::EMPTY => Received::EmptyAck,
    | Type::Ack if msg.token == token => Received::Piggybacked,
    | Type::Con | Type::Non if msg.token == token && msg.code.class > 0 => Received::Separate,
    | _ => Received::Unrelated,
  }
}

fn recv(socket: &UdpSocket,
        buf: &mut [u8],
        until: Instant)
        -> nb::Result<Option<(Message, SocketAddr)>, io::Error> {
  let timeout = until.saturating_duration_since(Instant::now());
  if timeout.is_zero() {
    return Err(nb::Error::WouldBlock);
  }

  socket.set_read_timeout(Some(timeout))
        .map_err(nb::Error::Other)?;
  let (n, source) = socket.recv_from(buf).map_err(io_to_nb)?;

  match Message::try_from_bytes(&buf[..n]) {
    | Ok(msg) => {
      log::debug!("<- {} {}", source, msg_summary(&msg));
      Ok(Some((msg, source)))
    },
    | Err(e) => {
      log::warn!("ignoring unparseable datagram from {}: {}", source, e);
      Ok(None)
    },
  }
}

impl UdpSession {
  /// The endpoint this session talks to
  pub fn peer(&self) -> SocketAddr {
    self.peer
  }

  fn separate_response(socket: &UdpSocket,
                       msg: Message,
                       source: SocketAddr)
                       -> Result<CoapResponse, TransportError> {
    if msg.ty == Type::Con {
      let ack = msg.ack(msg.id);
      log::debug!("-> {} {}", source, msg_summary(&ack));
      socket.send(&ack.try_into_bytes()?)?;
    }

    Ok(CoapResponse::from_message(source, msg))
  }
}

impl Session for UdpSession {
  fn request(&mut self,
             method: Code,
             path: &str,
             payload: Option<&[u8]>)
             -> Result<CoapResponse, TransportError> {
    let socket = self.socket.as_ref().ok_or(TransportError::Stopped)?;

    let mut rng = rand::thread_rng();
    let id = Id(rng.gen());
    let token = Token::from_bytes(&rng.gen::<[u8; 4]>());

    let mut req = Message::new(Type::Con, method, id, token);
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .try_for_each(|segment| req.set(registry::URI_PATH, segment))?;
    if let Some(payload) = payload {
      req.payload = Payload(payload.to_vec());
    }

    log::debug!("-> {} {}", self.peer, msg_summary(&req));
    let bytes = req.try_into_bytes()?;
    let mut buf = vec![0u8; MAX_DATAGRAM];

    let mut retry = RetryTimer::new(Instant::now(),
                                    self.config.retry_strategy(),
                                    self.config.max_attempts());
    socket.send(&bytes)?;

    loop {
      match recv(socket, &mut buf, retry.next_attempt_at()) {
        | Ok(Some((msg, source))) => match classify(id, token, &msg) {
          | Received::Piggybacked => return Ok(CoapResponse::from_message(source, msg)),
          | Received::Separate => return Self::separate_response(socket, msg, source),
          | Received::Reset => return Err(TransportError::Reset),
          | Received::EmptyAck => break,
          | Received::Unrelated => continue,
        },
        | Ok(None) => continue,
        | Err(nb::Error::WouldBlock) => match retry.what_should_i_do(Instant::now()) {
          | Ok(YouShould::Retry) => {
            log::debug!("-> {} retransmitting {:?} (attempt {})",
                        self.peer,
                        id,
                        retry.attempts().0);
            socket.send(&bytes)?;
          },
          | Ok(YouShould::Cry) => return Err(TransportError::Timeout(retry.attempts().0)),
          | Err(nb::Error::WouldBlock) => continue,
          | Err(nb::Error::Other(never)) => match never {},
        },
        | Err(nb::Error::Other(e)) => return Err(e.into()),
      }
    }

    // acknowledged; the response comes separately
    let deadline = Instant::now() + self.config.max_transmit_wait();
    loop {
      match recv(socket, &mut buf, deadline) {
        | Ok(Some((msg, source))) => match classify(id, token, &msg) {
          | Received::Separate => return Self::separate_response(socket, msg, source),
          | Received::Reset => return Err(TransportError::Reset),
          | _ => continue,
        },
        | Ok(None) => continue,
        | Err(nb::Error::WouldBlock) => return Err(TransportError::Timeout(retry.attempts().0)),
        | Err(nb::Error::Other(e)) => return Err(e.into()),
      }
    }
  }

  fn stop(&mut self) {
    if self.socket.take().is_some() {
      log::debug!("session -> {} closed", self.peer);
    }
  }
}

#[cfg(test)]
mod tests {
  use ::std::thread::{self, JoinHandle};
  use ::std::time::Duration;

  use hcproxy_msg::Value;

  use super::*;

  fn endpoint<T, F>(script: F) -> (u16, JoinHandle<T>)
    where T: Send + 'static,
          F: FnOnce(UdpSocket) -> T + Send + 'static
  {
    let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
    socket.set_read_timeout(Some(Duration::from_secs(5)))
          .unwrap();
    let port = socket.local_addr().unwrap().port();
    (port, thread::spawn(move || script(socket)))
  }

  fn recv_msg(socket: &UdpSocket) -> (Message, SocketAddr) {
    let mut buf = [0u8; 2048];
    let (n, from) = socket.recv_from(&mut buf).unwrap();
    (Message::try_from_bytes(&buf[..n]).unwrap(), from)
  }

  fn send_msg(socket: &UdpSocket, msg: Message, to: SocketAddr) {
    socket.send_to(&msg.try_into_bytes().unwrap(), to).unwrap();
  }

  fn reply(req: &Message, ty: Type, code: Code, payload: &[u8]) -> Message {
    let mut resp = Message::new(ty, code, req.id, req.token);
    resp.payload = Payload(payload.to_vec());
    resp
  }

  fn connector() -> UdpConnector {
    UdpConnector::new(TransportConfig { ack_timeout_ms: 100,
                                        max_retransmit: 2 })
  }

  #[test]
  fn piggybacked_response() {
    let (port, server) = endpoint(|socket| {
                           let (req, from) = recv_msg(&socket);
                           assert_eq!(req.ty, Type::Con);
                           assert_eq!(req.code, code::GET);
                           assert_eq!(req.token.as_bytes().len(), 4);
                           assert_eq!(req.path().collect::<Vec<_>>(), vec!["sensors", "temp"]);
                           send_msg(&socket, reply(&req, Type::Ack, code::CONTENT, b"22.5"), from);
                         });

    let mut session = connector().connect("127.0.0.1", port).unwrap();
    let resp = session.get("/sensors/temp").unwrap();
    server.join().unwrap();

    assert_eq!(resp.code, code::CONTENT);
    assert_eq!(resp.payload, Some(b"22.5".to_vec()));
    assert_eq!(resp.source, session.peer());
  }

  #[test]
  fn post_carries_payload() {
    let (port, server) = endpoint(|socket| {
                           let (req, from) = recv_msg(&socket);
                           assert_eq!(req.code, code::POST);
                           assert_eq!(req.payload(), Some(b"on".as_ref()));
                           assert_eq!(req.path().collect::<Vec<_>>(), vec!["switch"]);

                           let mut resp = reply(&req, Type::Ack, code::CHANGED, b"");
                           resp.set(registry::MAX_AGE, 30u8).unwrap();
                           send_msg(&socket, resp, from);
                         });

    let mut session = connector().connect("127.0.0.1", port).unwrap();
    let resp = session.post("/switch", b"on").unwrap();
    server.join().unwrap();

    assert_eq!(resp.code, code::CHANGED);
    assert_eq!(resp.payload, None);
    assert_eq!(resp.options.first().map(|o| o.get()),
               Some(Value::Integer(30)));
  }

  #[test]
  fn separate_response_is_acked() {
    let (port, server) = endpoint(|socket| {
                           let (req, from) = recv_msg(&socket);
                           send_msg(&socket, req.ack(req.id), from);

                           let mut resp = reply(&req, Type::Con, code::CONTENT, b"late");
                           resp.id = Id(req.id.0.wrapping_add(1));
                           send_msg(&socket, resp.clone(), from);

                           let (ack, _) = recv_msg(&socket);
                           assert_eq!(ack.ty, Type::Ack);
                           assert_eq!(ack.code, code::EMPTY);
                           assert_eq!(ack.id, resp.id);
                         });

    let mut session = connector().connect("127.0.0.1", port).unwrap();
    let resp = session.get("/slow").unwrap();
    server.join().unwrap();

    assert_eq!(resp.payload, Some(b"late".to_vec()));
  }

  #[test]
  fn retransmits_until_acked() {
    let (port, server) = endpoint(|socket| {
                           let (first, _) = recv_msg(&socket);
                           let (second, from) = recv_msg(&socket);
                           assert_eq!(first, second);
                           send_msg(&socket, reply(&second, Type::Ack, code::VALID, b""), from);
                         });

    let mut session = connector().connect("127.0.0.1", port).unwrap();
    let resp = session.get("/").unwrap();
    server.join().unwrap();

    assert_eq!(resp.code, code::VALID);
  }

  #[test]
  fn gives_up_after_max_retransmit() {
    let (port, server) = endpoint(|socket| {
                           socket.set_read_timeout(Some(Duration::from_secs(2)))
                                 .unwrap();
                           let mut buf = [0u8; 2048];
                           let mut received = 0;
                           while socket.recv_from(&mut buf).is_ok() {
                             received += 1;
                           }
                           received
                         });

    let mut session = connector().connect("127.0.0.1", port).unwrap();
    let result = session.get("/void");

    assert!(matches!(result, Err(TransportError::Timeout(3))), "{:?}", result);
    assert_eq!(server.join().unwrap(), 3);
  }

  #[test]
  fn reset_is_an_error() {
    let (port, server) = endpoint(|socket| {
                           let (req, from) = recv_msg(&socket);
                           send_msg(&socket,
                                    Message::new(Type::Reset, code::EMPTY, req.id, Token::default()),
                                    from);
                         });

    let mut session = connector().connect("127.0.0.1", port).unwrap();
    let result = session.delete("/r");
    server.join().unwrap();

    assert!(matches!(result, Err(TransportError::Reset)), "{:?}", result);
  }

  #[test]
  fn stray_messages_are_ignored() {
    let (port, server) = endpoint(|socket| {
                           let (req, from) = recv_msg(&socket);

                           // wrong id, then garbage, then the real answer
                           let mut stray = reply(&req, Type::Ack, code::NOT_FOUND, b"");
                           stray.id = Id(req.id.0.wrapping_add(7));
                           send_msg(&socket, stray, from);
                           socket.send_to(&[0xff, 0xff], from).unwrap();
                           send_msg(&socket, reply(&req, Type::Ack, code::CONTENT, b"ok"), from);
                         });

    let mut session = connector().connect("127.0.0.1", port).unwrap();
    let resp = session.get("/r").unwrap();
    server.join().unwrap();

    assert_eq!(resp.code, code::CONTENT);
  }

  #[test]
  fn stopped_session_refuses_requests() {
    let (port, _server) = endpoint(|_| ());
    let mut session = connector().connect("127.0.0.1", port).unwrap();

    session.stop();
    session.stop();
    assert!(matches!(session.get("/"), Err(TransportError::Stopped)));
  }

  #[test]
  fn classification() {
    let id = Id(7);
    let token = Token::from_bytes(&[1, 2, 3, 4]);
    let msg = |ty, code, id, token| Message::new(ty, code, id, token);

    assert_eq!(classify(id, token, &msg(Type::Ack, code::CONTENT, id, token)),
               Received::Piggybacked);
    assert_eq!(classify(id, token, &msg(Type::Ack, code::EMPTY, id, Token::default())),
               Received::EmptyAck);
    assert_eq!(classify(id, token, &msg(Type::Reset, code::EMPTY, id, Token::default())),
               Received::Reset);
    assert_eq!(classify(id, token, &msg(Type::Non, code::CONTENT, Id(99), token)),
               Received::Separate);
    assert_eq!(classify(id, token, &msg(Type::Ack, code::CONTENT, Id(99), token)),
               Received::Unrelated);
    assert_eq!(classify(id, token, &msg(Type::Con, code::GET, Id(99), token)),
               Received::Unrelated);
  }
}
