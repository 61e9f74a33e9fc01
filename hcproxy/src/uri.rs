use url::{Host, Url};

use crate::error::{PayloadError, UriError};

/// Separates the proxy path from the embedded target in a request path
pub const COAP_SCHEME_MARKER: &str = "coap://";

/// The CoAP endpoint & resource a gateway request is aimed at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetUri {
  /// Host name or address literal (IPv6 without brackets)
  pub host: String,
  /// Explicit port, or the configured default
  pub port: u16,
  /// Resource path, at least `/`
  pub path: String,
  /// Raw query string, without the `?`
  pub query: Option<String>,
}

impl TargetUri {
  /// Decompose `coap://host[:port]/path[?query]`.
  ///
  /// ```
  /// use hcproxy::uri::TargetUri;
  ///
  /// let target = TargetUri::parse("coap://1.2.3.4/light?level=5", 5683).unwrap();
  /// assert_eq!(target.host, "1.2.3.4");
  /// assert_eq!(target.port, 5683);
  /// assert_eq!(target.path, "/light");
  /// assert_eq!(target.payload().unwrap(), b"5");
  /// ```
  pub fn parse(target: &str, default_port: u16) -> Result<Self, UriError> {
    let url = Url::parse(target)?;

    if url.scheme() != "coap" {
      return Err(UriError::UnsupportedScheme(url.scheme().to_string()));
    }

    let host = match url.host() {
      | Some(Host::Domain(d)) if !d.is_empty() => d.to_string(),
      | Some(Host::Ipv4(ip)) => ip.to_string(),
      | Some(Host::Ipv6(ip)) => ip.to_string(),
      | _ => return Err(UriError::MissingHost),
    };

    let path = match url.path() {
      | "" => "/".to_string(),
      | p => p.to_string(),
    };

    Ok(Self { host,
              port: url.port().unwrap_or(default_port),
              path,
              query: url.query().map(str::to_string) })
  }

  /// The payload of a POST or PUT: the value of the single `key=value` pair in the query.
  ///
  /// The value is used as-is; it is not percent-decoded.
  pub fn payload(&self) -> Result<Vec<u8>, PayloadError> {
    let query = self.query
                    .as_deref()
                    .filter(|q| !q.is_empty())
                    .ok_or(PayloadError::Missing)?;

    let mut pair = query.split('=');
    match (pair.next(), pair.next(), pair.next()) {
      | (Some(_), Some(value), None) => Ok(value.as_bytes().to_vec()),
      | _ => Err(PayloadError::Malformed),
    }
  }
}
