use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::retry::{Attempts, Strategy};

/// The path prefix every proxied request must start with.
///
/// Always begins and ends with `/`, however it was constructed:
///
/// ```
/// use hcproxy::config::ProxyPath;
///
/// assert_eq!(ProxyPath::new("hc").as_str(), "/hc/");
/// assert_eq!(ProxyPath::new("/hc").as_str(), "/hc/");
/// assert_eq!(ProxyPath::new("").as_str(), "/");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct ProxyPath(String);

impl ProxyPath {
  /// Normalize `path` into a proxy path
  pub fn new(path: impl AsRef<str>) -> Self {
    let path = path.as_ref().trim();
    let mut normalized = String::with_capacity(path.len() + 2);

    if !path.starts_with('/') {
      normalized.push('/');
    }
    normalized.push_str(path);
    if !normalized.ends_with('/') {
      normalized.push('/');
    }

    Self(normalized)
  }

  /// The normalized path
  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl Default for ProxyPath {
  fn default() -> Self {
    Self("/".into())
  }
}

impl From<String> for ProxyPath {
  fn from(s: String) -> Self {
    Self::new(s)
  }
}

impl From<&str> for ProxyPath {
  fn from(s: &str) -> Self {
    Self::new(s)
  }
}

impl From<ProxyPath> for String {
  fn from(p: ProxyPath) -> Self {
    p.0
  }
}

impl fmt::Display for ProxyPath {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

/// Configuration of outbound Confirmable requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
  /// Initial time to wait for an ACK before retransmitting, in milliseconds.
  ///
  /// The actual initial wait is randomized between this and 1.5 times this.
  ///
  /// ```
  /// use hcproxy::config::TransportConfig;
  ///
  /// assert_eq!(TransportConfig::default().ack_timeout_ms, 2_000);
  /// ```
  pub ack_timeout_ms: u64,
  /// Number of times an unacknowledged request is resent before giving up.
  ///
  /// ```
  /// use hcproxy::config::TransportConfig;
  ///
  /// assert_eq!(TransportConfig::default().max_retransmit, 4);
  /// ```
  pub max_retransmit: u8,
}

impl Default for TransportConfig {
  fn default() -> Self {
    Self { ack_timeout_ms: 2_000,
           max_retransmit: 4 }
  }
}

impl TransportConfig {
  /// See [`TransportConfig::ack_timeout_ms`]
  pub fn ack_timeout(&self) -> Duration {
    Duration::from_millis(self.ack_timeout_ms)
  }

  /// Back-off between retransmissions of a request that has not been ACKed
  pub fn retry_strategy(&self) -> Strategy {
    Strategy::Exponential { init_min: self.ack_timeout(),
                            init_max: self.ack_timeout() * 3 / 2 }
  }

  /// Total transmissions allowed, the first one included
  pub fn max_attempts(&self) -> Attempts {
    Attempts(self.max_retransmit as u16 + 1)
  }

  /// How long to wait for a separate response once the request was ACKed
  pub fn max_transmit_wait(&self) -> Duration {
    self.retry_strategy().max_time(self.max_attempts())
  }
}

/// Runtime config of the gateway.
///
/// Built once at startup, then shared read-only (behind an `Arc`) by every request.
///
/// Every field has a default, so a config file only needs the fields it changes:
///
/// ```
/// use hcproxy::config::GatewayConfig;
///
/// let config: GatewayConfig = serde_json::from_str(r#"{ "proxy_path": "hc" }"#).unwrap();
/// assert_eq!(config.proxy_path.as_str(), "/hc/");
/// assert_eq!(config.http_port, 8080);
/// assert_eq!(config.coap_port, 5683);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
  /// Prefix of every proxied request path, e.g. `/hc/`
  pub proxy_path: ProxyPath,
  /// Address the HTTP listener binds to
  pub bind_addr: IpAddr,
  /// Port the HTTP listener binds to
  pub http_port: u16,
  /// Port used for targets that do not name one
  pub coap_port: u16,
  /// See [`TransportConfig`]
  pub transport: TransportConfig,
}

impl Default for GatewayConfig {
  fn default() -> Self {
    Self { proxy_path: ProxyPath::default(),
           bind_addr: IpAddr::V4(Ipv4Addr::LOCALHOST),
           http_port: 8080,
           coap_port: 5683,
           transport: TransportConfig::default() }
  }
}

impl GatewayConfig {
  /// Read config from a JSON file
  pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
    let json = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&json)?)
  }

  /// Where the HTTP listener binds
  pub fn http_addr(&self) -> SocketAddr {
    SocketAddr::new(self.bind_addr, self.http_port)
  }
}

#[cfg(test)]
mod tests {
  use std::io::Write;

  use super::*;

  #[test]
  fn proxy_path_normalization() {
    [("/", "/"),
     ("", "/"),
     ("hc", "/hc/"),
     ("hc/", "/hc/"),
     ("/hc", "/hc/"),
     ("/hc/", "/hc/"),
     (" /a/b ", "/a/b/")].into_iter()
                         .for_each(|(input, expected)| {
                           assert_eq!(ProxyPath::new(input).as_str(), expected, "{:?}", input)
                         });
  }

  #[test]
  fn proxy_path_normalizes_when_deserialized() {
    let path: ProxyPath = serde_json::from_str("\"hc\"").unwrap();
    assert_eq!(path.as_str(), "/hc/");
    assert_eq!(serde_json::to_string(&path).unwrap(), "\"/hc/\"");
  }

  #[test]
  fn defaults() {
    let config = GatewayConfig::default();
    assert_eq!(config.proxy_path.as_str(), "/");
    assert_eq!(config.http_addr(), "127.0.0.1:8080".parse().unwrap());
    assert_eq!(config.coap_port, 5683);
  }

  #[test]
  fn transport_timing() {
    let transport = TransportConfig::default();
    assert_eq!(transport.max_attempts(), Attempts(5));
    assert_eq!(transport.retry_strategy(),
               Strategy::Exponential { init_min: Duration::from_millis(2000),
                                       init_max: Duration::from_millis(3000) });
    assert_eq!(transport.max_transmit_wait(), Duration::from_secs(48));
  }

  #[test]
  fn many_retransmissions_saturate() {
    let transport: TransportConfig = serde_json::from_str(r#"{ "max_retransmit": 40 }"#).unwrap();
    assert_eq!(transport.max_attempts(), Attempts(41));
    assert_eq!(transport.max_transmit_wait(), crate::retry::MAX_DELAY);

    let transport = TransportConfig { ack_timeout_ms: u64::MAX,
                                      max_retransmit: u8::MAX };
    assert_eq!(transport.max_transmit_wait(), crate::retry::MAX_DELAY);
    let _deadline = ::std::time::Instant::now() + transport.max_transmit_wait();
  }

  #[test]
  fn from_json_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file,
           r#"{{ "proxy_path": "/hc", "http_port": 9000, "transport": {{ "max_retransmit": 1 }} }}"#).unwrap();

    let config = GatewayConfig::from_json_file(file.path()).unwrap();
    assert_eq!(config.proxy_path.as_str(), "/hc/");
    assert_eq!(config.http_port, 9000);
    assert_eq!(config.bind_addr, IpAddr::V4(Ipv4Addr::LOCALHOST));
    assert_eq!(config.transport,
               TransportConfig { ack_timeout_ms: 2000,
                                 max_retransmit: 1 });
  }

  #[test]
  fn from_bad_json_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{{ \"http_port\": \"eighty\" }}").unwrap();

    assert!(matches!(GatewayConfig::from_json_file(file.path()),
                     Err(ConfigError::Parse(_))));
    assert!(matches!(GatewayConfig::from_json_file("/definitely/not/here.json"),
                     Err(ConfigError::Read(_))));
  }
}
