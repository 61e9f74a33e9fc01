use std::fmt;

/// Methods of inbound HTTP requests
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Method {
  /// `GET`
  Get,
  /// `HEAD`
  Head,
  /// `POST`
  Post,
  /// `PUT`
  Put,
  /// `DELETE`
  Delete,
  /// `CONNECT`
  Connect,
  /// `OPTIONS`
  Options,
  /// `TRACE`
  Trace,
  /// Anything else, e.g. `PATCH`
  Other(String),
}

impl Method {
  /// The method's name as it appears on the request line
  pub fn as_str(&self) -> &str {
    match self {
      | Method::Get => "GET",
      | Method::Head => "HEAD",
      | Method::Post => "POST",
      | Method::Put => "PUT",
      | Method::Delete => "DELETE",
      | Method::Connect => "CONNECT",
      | Method::Options => "OPTIONS",
      | Method::Trace => "TRACE",
      | Method::Other(m) => m,
    }
  }
}

impl From<&str> for Method {
  fn from(s: &str) -> Self {
    match s {
      | "GET" => Method::Get,
      | "HEAD" => Method::Head,
      | "POST" => Method::Post,
      | "PUT" => Method::Put,
      | "DELETE" => Method::Delete,
      | "CONNECT" => Method::Connect,
      | "OPTIONS" => Method::Options,
      | "TRACE" => Method::Trace,
      | other => Method::Other(other.to_string()),
    }
  }
}

impl fmt::Display for Method {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// An inbound HTTP request, reduced to what the gateway looks at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
  /// Request method
  pub method: Method,
  /// Path and query of the request target, e.g. `/hc/coap://h/r?v=1`
  pub path: String,
}

impl Request {
  /// Create a request
  pub fn new(method: impl Into<Method>, path: impl Into<String>) -> Self {
    Self { method: method.into(),
           path: path.into() }
  }
}

/// An HTTP response produced by the gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
  /// Status code
  pub status: u16,
  /// Headers, in the order they should be sent
  pub headers: Vec<(String, String)>,
  /// `None` for responses without a body (e.g. to `HEAD`)
  pub body: Option<Vec<u8>>,
}

/// Body sent when the CoAP response had no payload
pub const NO_PAYLOAD_BODY: &str = "<html><body><h1>None</h1></body></html>";

impl Response {
  /// A `text/html` response; `body` is wrapped in a minimal document
  pub fn html(status: u16, body: Option<&[u8]>) -> Self {
    Self { status,
           headers: vec![("Content-Type".into(), "text/html".into())],
           body: Some(html_document(body)) }
  }

  /// Headers of a `text/html` response, no body
  pub fn html_headers(status: u16) -> Self {
    Self { body: None,
           ..Self::html(status, None) }
  }

  /// Get the value of a header (case-insensitive)
  pub fn header(&self, name: &str) -> Option<&str> {
    self.headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
  }

  /// The body as text, lossily
  pub fn body_text(&self) -> Option<String> {
    self.body
        .as_deref()
        .map(|b| String::from_utf8_lossy(b).into_owned())
  }
}

fn html_document(content: Option<&[u8]>) -> Vec<u8> {
  match content {
    | None => NO_PAYLOAD_BODY.as_bytes().to_vec(),
    | Some(bytes) => {
      format!("<html><body><h1>{}</h1></body></html>",
              escape(&String::from_utf8_lossy(bytes))).into_bytes()
    },
  }
}

fn escape(s: &str) -> String {
  s.chars().fold(String::with_capacity(s.len()), |mut out, c| {
             match c {
               | '<' => out.push_str("&lt;"),
               | '>' => out.push_str("&gt;"),
               | '&' => out.push_str("&amp;"),
               | '"' => out.push_str("&quot;"),
               | c => out.push(c),
             };
             out
           })
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn methods() {
    ["GET", "HEAD", "POST", "PUT", "DELETE", "CONNECT", "OPTIONS", "TRACE"].into_iter()
                                                                          .for_each(|m| {
                                                                            let method = Method::from(m);
                                                                            assert!(!matches!(method, Method::Other(_)));
                                                                            assert_eq!(method.as_str(), m);
                                                                          });

    assert_eq!(Method::from("PATCH"), Method::Other("PATCH".into()));
    assert_eq!(Method::from("get"), Method::Other("get".into()));
  }

  #[test]
  fn html_body() {
    let resp = Response::html(200, Some(b"5".as_ref()));
    assert_eq!(resp.header("content-type"), Some("text/html"));
    assert_eq!(resp.body_text().unwrap(),
               "<html><body><h1>5</h1></body></html>");

    let resp = Response::html(200, None);
    assert_eq!(resp.body_text().unwrap(), NO_PAYLOAD_BODY);
  }

  #[test]
  fn payload_is_escaped() {
    let resp = Response::html(200, Some(b"<b>&</b>".as_ref()));
    assert_eq!(resp.body_text().unwrap(),
               "<html><body><h1>&lt;b&gt;&amp;&lt;/b&gt;</h1></body></html>");
  }

  #[test]
  fn headers_only() {
    let resp = Response::html_headers(200);
    assert_eq!(resp.header("Content-Type"), Some("text/html"));
    assert_eq!(resp.body, None);
  }
}
