use std::sync::Arc;

use hcproxy_msg::{code, Code};

use crate::config::GatewayConfig;
use crate::error::{Error, UnknownResponseCode, UriError};
use crate::http::{Method, Request, Response};
use crate::transport::{Connect, Scoped, Session};
use crate::translate;
use crate::uri::{TargetUri, COAP_SCHEME_MARKER};

/// The CoAP operation an HTTP method is carried out with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
  /// `GET`
  Get,
  /// `GET`, answered with headers only
  Head,
  /// `POST` with the payload from the target query
  Post,
  /// `PUT` with the payload from the target query
  Put,
  /// `DELETE`
  Delete,
}

impl Operation {
  /// The operation for an HTTP method, if the method has one
  pub fn for_method(method: &Method) -> Option<Self> {
    match method {
      | Method::Get => Some(Self::Get),
      | Method::Head => Some(Self::Head),
      | Method::Post => Some(Self::Post),
      | Method::Put => Some(Self::Put),
      | Method::Delete => Some(Self::Delete),
      | Method::Connect | Method::Options | Method::Trace | Method::Other(_) => None,
    }
  }

  /// CoAP method code sent upstream
  pub fn code(&self) -> Code {
    match self {
      | Self::Get | Self::Head => code::GET,
      | Self::Post => code::POST,
      | Self::Put => code::PUT,
      | Self::Delete => code::DELETE,
    }
  }

  fn needs_payload(&self) -> bool {
    matches!(self, Self::Post | Self::Put)
  }
}

/// Turns HTTP requests into single CoAP round trips.
///
/// The dispatcher holds no per-request state; one instance is shared by
/// every request the front end handles.
#[derive(Debug)]
pub struct Dispatcher<C> {
  config: Arc<GatewayConfig>,
  connector: C,
  parse_target: fn(&str, u16) -> Result<TargetUri, UriError>,
}

impl<C: Connect> Dispatcher<C> {
  /// Create a dispatcher
  pub fn new(config: Arc<GatewayConfig>, connector: C) -> Self {
    Self { config,
           connector,
           parse_target: TargetUri::parse }
  }

  /// The config this dispatcher was built with
  pub fn config(&self) -> &GatewayConfig {
    &self.config
  }

  /// Handle one HTTP request.
  ///
  /// - `Ok(None)`: the path is not under the proxy path; nothing was done and
  ///   the caller should answer however it answers unknown paths.
  /// - `Ok(Some(response))`: the response to send, including 400 / 501 / 502
  ///   for requests that could not be carried out.
  /// - `Err(_)`: the upstream response code has no HTTP status.
  pub fn dispatch(&self, req: &Request) -> Result<Option<Response>, UnknownResponseCode> {
    match self.try_dispatch(req) {
      | Ok(resp) => Ok(Some(resp)),
      | Err(Error::PathMismatch) => {
        log::debug!("ignoring {} {}: not under {}",
                    req.method,
                    req.path,
                    self.config.proxy_path);
        Ok(None)
      },
      | Err(Error::UnknownResponseCode(e)) => {
        log::error!("{} {}: {}", req.method, req.path, e);
        Err(e)
      },
      | Err(e) => {
        match &e {
          | Error::Payload(_) => log::error!("bad {} request {}: {}", req.method, req.path, e),
          | Error::UpstreamTransport(_) => log::warn!("{} {}: {}", req.method, req.path, e),
          | _ => log::info!("{} {}: {}", req.method, req.path, e),
        }

        // PathMismatch & UnknownResponseCode were matched above
        let status = e.http_status().unwrap_or(500);
        Ok(Some(error_response(status, &req.method, &e)))
      },
    }
  }

  fn try_dispatch(&self, req: &Request) -> Result<Response, Error> {
    let op = Operation::for_method(&req.method).ok_or_else(|| {
                                                  Error::UnsupportedMethod(req.method.to_string())
                                                })?;

    let target = self.target(&req.path)?;
    let payload = if op.needs_payload() {
      Some(target.payload()?)
    } else {
      None
    };

    let resp = {
      let mut session = Scoped::new(self.connector.connect(&target.host, target.port)?);
      match op {
        | Operation::Get | Operation::Head => session.get(&target.path),
        | Operation::Post => session.post(&target.path, payload.as_deref().unwrap_or_default()),
        | Operation::Put => session.put(&target.path, payload.as_deref().unwrap_or_default()),
        | Operation::Delete => session.delete(&target.path),
      }?
    };

    log::debug!("{} {} <- {} {} ({} byte payload)",
                req.method,
                req.path,
                resp.source,
                resp.code,
                resp.payload.as_ref().map(Vec::len).unwrap_or(0));

    let status = translate::http_status(resp.code)?;

    Ok(match op {
         | Operation::Head => Response::html_headers(status),
         | _ => Response::html(status, resp.payload.as_deref()),
       })
  }

  /// Strip the proxy path from a request path and parse what follows
  fn target(&self, path: &str) -> Result<TargetUri, Error> {
    let ix = path.find(COAP_SCHEME_MARKER).ok_or(Error::PathMismatch)?;
    let (prefix, target) = path.split_at(ix);

    if prefix != self.config.proxy_path.as_str() {
      return Err(Error::PathMismatch);
    }

    Ok((self.parse_target)(target, self.config.coap_port)?)
  }
}

fn error_response(status: u16, method: &Method, e: &Error) -> Response {
  match method {
    | Method::Head => Response::html_headers(status),
    | _ => Response::html(status, Some(e.to_string().as_bytes())),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::ProxyPath;
  use crate::error::TransportError;
  use crate::test::{Call, MockConnector};

  thread_local! {
    static PARSES: ::std::cell::Cell<usize> = ::std::cell::Cell::new(0);
  }

  fn counting_parse(target: &str, default_port: u16) -> Result<TargetUri, UriError> {
    PARSES.with(|n| n.set(n.get() + 1));
    TargetUri::parse(target, default_port)
  }

  fn parses() -> usize {
    PARSES.with(|n| n.get())
  }

  fn dispatcher(connector: MockConnector) -> Dispatcher<MockConnector> {
    let config = GatewayConfig { proxy_path: ProxyPath::new("/hc/"),
                                 ..Default::default() };
    Dispatcher::new(Arc::new(config), connector)
  }

  fn dispatch(d: &Dispatcher<MockConnector>, method: &str, path: &str) -> Option<Response> {
    d.dispatch(&Request::new(method, path)).unwrap()
  }

  #[test]
  fn operations() {
    assert_eq!(Operation::for_method(&Method::Head).map(|o| o.code()),
               Some(code::GET));
    assert_eq!(Operation::for_method(&Method::Put).map(|o| o.code()),
               Some(code::PUT));
    assert_eq!(Operation::for_method(&Method::Trace), None);
  }

  #[test]
  fn get_relays_payload() {
    let d = dispatcher(MockConnector::respond(code::CONTENT, Some(b"5".as_ref())));
    let resp = dispatch(&d, "GET", "/hc/coap://1.2.3.4:5683/dimmer").unwrap();

    assert_eq!(resp.status, 200);
    assert_eq!(resp.header("Content-Type"), Some("text/html"));
    assert!(resp.body_text().unwrap().contains('5'));
    assert_eq!(d.connector.calls(),
               vec![Call::Connect("1.2.3.4".into(), 5683),
                    Call::Request(code::GET, "/dimmer".into(), None),
                    Call::Stop]);
  }

  #[test]
  fn head_has_no_body() {
    let d = dispatcher(MockConnector::respond(code::CONTENT, Some(b"5".as_ref())));
    let resp = dispatch(&d, "HEAD", "/hc/coap://1.2.3.4:5683/dimmer").unwrap();

    assert_eq!(resp.status, 200);
    assert_eq!(resp.header("Content-Type"), Some("text/html"));
    assert_eq!(resp.body, None);
    assert!(d.connector
             .calls()
             .contains(&Call::Request(code::GET, "/dimmer".into(), None)));
  }

  #[test]
  fn missing_payload_is_placeholder() {
    let d = dispatcher(MockConnector::respond(code::DELETED, None));
    let resp = dispatch(&d, "DELETE", "/hc/coap://h/r").unwrap();

    assert_eq!(resp.status, 200);
    assert_eq!(resp.body_text().unwrap(), crate::http::NO_PAYLOAD_BODY);
    assert!(d.connector
             .calls()
             .contains(&Call::Request(code::DELETE, "/r".into(), None)));
  }

  #[test]
  fn post_and_put_send_query_value() {
    let d = dispatcher(MockConnector::respond(code::CHANGED, None));

    assert_eq!(dispatch(&d, "POST", "/hc/coap://h:5683/r?value=1").unwrap().status,
               200);
    assert_eq!(dispatch(&d, "PUT", "/hc/coap://h:5683/r?value=2").unwrap().status,
               200);

    let requests = d.connector
                    .calls()
                    .into_iter()
                    .filter(|c| matches!(c, Call::Request(..)))
                    .collect::<Vec<_>>();
    assert_eq!(requests,
               vec![Call::Request(code::POST, "/r".into(), Some(b"1".to_vec())),
                    Call::Request(code::PUT, "/r".into(), Some(b"2".to_vec()))]);
  }

  #[test]
  fn post_without_query_is_400_and_not_sent() {
    let d = dispatcher(MockConnector::respond(code::CHANGED, None));

    ["POST", "PUT"].into_iter().for_each(|m| {
                                 let resp = dispatch(&d, m, "/hc/coap://h:5683/r").unwrap();
                                 assert_eq!(resp.status, 400);
                               });

    assert_eq!(dispatch(&d, "POST", "/hc/coap://h:5683/r?a=b=c").unwrap().status,
               400);
    assert_eq!(d.connector.calls(), vec![]);
  }

  #[test]
  fn unsupported_methods_are_501_without_parsing() {
    let mut d = dispatcher(MockConnector::respond(code::CONTENT, None));
    d.parse_target = counting_parse;

    ["CONNECT", "OPTIONS", "TRACE", "PATCH"].into_iter().for_each(|m| {
                                                          let resp = dispatch(&d, m, "/hc/coap://h:5683/r").unwrap();
                                                          assert_eq!(resp.status, 501, "{}", m);
                                                        });
    assert_eq!(parses(), 0);
    assert_eq!(d.connector.calls(), vec![]);

    dispatch(&d, "GET", "/hc/coap://h:5683/r").unwrap();
    assert_eq!(parses(), 1);
  }

  #[test]
  fn path_mismatch_is_ignored() {
    let d = dispatcher(MockConnector::respond(code::CONTENT, None));

    ["/other/coap://h/r", "/hc/r", "/coap://h/r", "/hc/x/coap://h/r"].into_iter()
                                                                     .for_each(|p| {
                                                                       assert_eq!(dispatch(&d, "GET", p), None, "{}", p)
                                                                     });

    assert_eq!(d.connector.calls(), vec![]);
  }

  #[test]
  fn default_port_comes_from_config() {
    let d = dispatcher(MockConnector::respond(code::CONTENT, None));
    dispatch(&d, "GET", "/hc/coap://h/r").unwrap();

    assert_eq!(d.connector.calls().first(),
               Some(&Call::Connect("h".into(), 5683)));
  }

  #[test]
  fn invalid_target_is_400() {
    let d = dispatcher(MockConnector::respond(code::CONTENT, None));
    assert_eq!(dispatch(&d, "GET", "/hc/coap:///r").unwrap().status, 400);
    assert_eq!(d.connector.calls(), vec![]);
  }

  #[test]
  fn transport_failure_is_502_and_session_released() {
    let d = dispatcher(MockConnector::fail(|| TransportError::Timeout(5)));
    let resp = dispatch(&d, "GET", "/hc/coap://h/r").unwrap();

    assert_eq!(resp.status, 502);
    assert_eq!(d.connector.calls().last(), Some(&Call::Stop));
  }

  #[test]
  fn connect_failure_is_502() {
    let d = dispatcher(MockConnector::refuse());
    assert_eq!(dispatch(&d, "GET", "/hc/coap://h/r").unwrap().status, 502);
    assert_eq!(d.connector.calls(), vec![Call::Connect("h".into(), 5683)]);
  }

  #[test]
  fn unknown_response_code_is_an_error() {
    let d = dispatcher(MockConnector::respond(Code::new(2, 6), Some(b"5".as_ref())));
    let result = d.dispatch(&Request::new("GET", "/hc/coap://h/r"));

    assert_eq!(result, Err(UnknownResponseCode(Code::new(2, 6))));
    assert_eq!(d.connector.calls().last(), Some(&Call::Stop));
  }

  #[test]
  fn codes_are_translated() {
    [(code::NOT_FOUND, 404), (code::CREATED, 201), (code::GATEWAY_TIMEOUT, 504)].into_iter()
                                                                              .for_each(|(c, status)| {
                                                                                let d = dispatcher(MockConnector::respond(c, None));
                                                                                assert_eq!(dispatch(&d, "GET", "/hc/coap://h/r").unwrap().status,
                                                                                           status);
                                                                              });
  }
}
