//! `hcproxy` binary: serve the gateway over HTTP.
//!
//! ```bash
//! # GET http://localhost:8080/hc/coap://[::1]/sensors/temp
//! hcproxy --path hc
//!
//! # settings from a file, port overridden
//! hcproxy --config gateway.json --http-port 8081 --log-level debug
//! ```

use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use hcproxy::config::{GatewayConfig, ProxyPath};
use hcproxy::std::{server, UdpConnector};
use simple_logger::SimpleLogger;

#[derive(Parser, Debug)]
#[command(name = "hcproxy")]
#[command(about = "HTTP to CoAP gateway")]
#[command(version)]
struct Cli {
  /// Proxy path prefix, e.g. `hc` for `/hc/coap://...` (default: /)
  #[arg(short = 'p', long)]
  path: Option<String>,

  /// HTTP listen port (default: 8080)
  #[arg(long)]
  http_port: Option<u16>,

  /// HTTP listen address (default: 127.0.0.1)
  #[arg(long)]
  ip: Option<IpAddr>,

  /// Port of CoAP targets that do not name one (default: 5683)
  #[arg(long)]
  coap_port: Option<u16>,

  /// JSON config file; flags override its values
  #[arg(long)]
  config: Option<PathBuf>,

  /// Log level (off, error, warn, info, debug, trace)
  #[arg(long, default_value = "info")]
  log_level: log::LevelFilter,
}

impl Cli {
  fn gateway_config(&self) -> anyhow::Result<GatewayConfig> {
    let mut config = match &self.config {
      | Some(file) => GatewayConfig::from_json_file(file).with_context(|| {
                                                            format!("loading {}",
                                                                    file.display())
                                                          })?,
      | None => GatewayConfig::default(),
    };

    if let Some(path) = &self.path {
      config.proxy_path = ProxyPath::new(path);
    }
    if let Some(port) = self.http_port {
      config.http_port = port;
    }
    if let Some(ip) = self.ip {
      config.bind_addr = ip;
    }
    if let Some(port) = self.coap_port {
      config.coap_port = port;
    }

    Ok(config)
  }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  let cli = Cli::parse();

  SimpleLogger::new().with_level(cli.log_level).init()?;

  let config = Arc::new(cli.gateway_config()?);
  log::debug!("{:?}", config);

  let connector = UdpConnector::new(config.transport);
  server::serve(config, connector).await
                                  .context("HTTP server failed")
}

#[cfg(test)]
mod tests {
  use std::io::Write;

  use super::*;

  #[test]
  fn flags_override_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, r#"{{ "proxy_path": "/from-file/", "http_port": 9000, "coap_port": 6000 }}"#).unwrap();

    let cli = Cli::parse_from(["hcproxy",
                               "--config",
                               file.path().to_str().unwrap(),
                               "--http-port",
                               "9001",
                               "-p",
                               "hc"]);
    let config = cli.gateway_config().unwrap();

    assert_eq!(config.proxy_path.as_str(), "/hc/");
    assert_eq!(config.http_port, 9001);
    assert_eq!(config.coap_port, 6000);
    assert_eq!(cli.log_level, log::LevelFilter::Info);
  }

  #[test]
  fn defaults() {
    let cli = Cli::parse_from(["hcproxy"]);
    assert_eq!(cli.gateway_config().unwrap(), GatewayConfig::default());
  }

  #[test]
  fn missing_config_file() {
    let cli = Cli::parse_from(["hcproxy", "--config", "/nonexistent/hcproxy.json"]);
    assert!(cli.gateway_config().is_err());
  }
}
