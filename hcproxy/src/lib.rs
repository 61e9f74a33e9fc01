//! `hcproxy` is an HTTP to CoAP gateway.
//!
//! It lets ordinary HTTP clients reach resources that are only served over
//! [CoAP](https://datatracker.ietf.org/doc/html/rfc7252), by embedding the
//! CoAP target in the HTTP request path:
//!
//! ```text
//! GET /hc/coap://[fd00::1]:5683/sensors/temp
//!     ^^^^ proxy path
//!         ^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^ target
//! ```
//!
//! Each HTTP request becomes exactly one CoAP request. The CoAP response
//! code is translated to an HTTP status and the payload comes back wrapped in
//! a minimal HTML document.
//!
//! ## Methods
//! - `GET` and `HEAD` send a CoAP GET (`HEAD` answers with headers only)
//! - `POST` and `PUT` send the value of the target's `key=value` query as payload
//! - `DELETE` sends a CoAP DELETE
//! - anything else is answered `501 Not Implemented`
//!
//! ## Layout
//! - [`dispatch`] decides what to do with an HTTP request, independent of any HTTP server
//! - [`transport`] is the CoAP client capability the dispatcher is written against
//! - [`std`] has the real implementations: CoAP over UDP, and an `axum` front end
//!
//! ```
//! use std::sync::Arc;
//!
//! use hcproxy::config::{GatewayConfig, ProxyPath};
//! use hcproxy::dispatch::Dispatcher;
//! use hcproxy::http::Request;
//! use hcproxy::std::UdpConnector;
//!
//! let config = GatewayConfig { proxy_path: ProxyPath::new("hc"),
//!                              ..Default::default() };
//! let dispatcher = Dispatcher::new(Arc::new(config), UdpConnector::default());
//!
//! // not under the proxy path; nothing is sent
//! let resp = dispatcher.dispatch(&Request::new("GET", "/other/coap://localhost/r"));
//! assert_eq!(resp, Ok(None));
//!
//! // PATCH is not supported
//! let resp = dispatcher.dispatch(&Request::new("PATCH", "/hc/coap://localhost/r"))
//!                      .unwrap()
//!                      .unwrap();
//! assert_eq!(resp.status, 501);
//! ```

#![cfg_attr(any(docsrs, feature = "docs"), feature(doc_cfg))]
// -
// style
#![allow(clippy::unused_unit)]
// -
// deny
#![deny(missing_docs)]
#![deny(missing_debug_implementations)]
#![cfg_attr(not(test), deny(unsafe_code))]
// -
// warnings
#![cfg_attr(not(test), warn(unreachable_pub))]


pub(crate) mod logging;

/// customizable retrying of fallible operations
pub mod retry;

/// gateway configuration
pub mod config;

/// error types
pub mod error;

/// the parts of HTTP the gateway deals in
pub mod http;

/// parsing the CoAP target embedded in a request path
pub mod uri;

pub mod translate;

/// CoAP client capability
pub mod transport;

/// HTTP request → CoAP round trip → HTTP response
pub mod dispatch;

/// `std`-only implementations of transport & front end
pub mod std;

pub use config::GatewayConfig;
pub use dispatch::Dispatcher;
pub use error::Error;
