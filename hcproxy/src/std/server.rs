use ::std::io;
use ::std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::header::{HeaderName, HeaderValue};
use axum::http::{Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;

use crate::config::GatewayConfig;
use crate::dispatch::Dispatcher;
use crate::http;
use crate::transport::Connect;

/// Every request goes through the dispatcher; paths it does not
/// recognize get an empty 404.
pub fn router<C>(dispatcher: Arc<Dispatcher<C>>) -> Router
  where C: Connect + 'static
{
  Router::new().fallback(proxy::<C>).with_state(dispatcher)
}

/// Bind the HTTP listener from `config` and serve until the process exits
pub async fn serve<C>(config: Arc<GatewayConfig>, connector: C) -> io::Result<()>
  where C: Connect + 'static
{
  let addr = config.http_addr();
  let listener = tokio::net::TcpListener::bind(addr).await?;
  log::info!("listening on http://{} (proxy path {})",
             listener.local_addr()?,
             config.proxy_path);

  let dispatcher = Arc::new(Dispatcher::new(config, connector));
  axum::serve(listener, router(dispatcher)).await
}

async fn proxy<C>(State(dispatcher): State<Arc<Dispatcher<C>>>,
                  method: Method,
                  uri: Uri)
                  -> Response
  where C: Connect + 'static
{
  let path = uri.path_and_query()
                .map(|pq| pq.as_str())
                .unwrap_or_else(|| uri.path());
  let req = http::Request::new(method.as_str(), path);

  // sessions block on their socket
  match tokio::task::spawn_blocking(move || dispatcher.dispatch(&req)).await {
    | Ok(Ok(Some(resp))) => into_response(resp),
    | Ok(Ok(None)) => StatusCode::NOT_FOUND.into_response(),
    | Ok(Err(_)) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    | Err(e) => {
      log::error!("dispatch task failed: {}", e);
      StatusCode::INTERNAL_SERVER_ERROR.into_response()
    },
  }
}

fn into_response(resp: http::Response) -> Response {
  let status = match StatusCode::from_u16(resp.status) {
    | Ok(status) => status,
    | Err(_) => {
      log::error!("dispatcher produced invalid status {}", resp.status);
      return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    },
  };

  let body = resp.body.map(Body::from).unwrap_or_else(Body::empty);
  let mut out = (status, body).into_response();

  for (name, value) in resp.headers {
    match (HeaderName::try_from(name), HeaderValue::try_from(value)) {
      | (Ok(name), Ok(value)) => {
        out.headers_mut().insert(name, value);
      },
      | _ => log::warn!("dropping invalid response header"),
    }
  }

  out
}

#[cfg(test)]
mod tests {
  use axum::body::to_bytes;
  use axum::http::Request;
  use hcproxy_msg::{code, Code};
  use tower::ServiceExt;

  use super::*;
  use crate::config::ProxyPath;
  use crate::error::TransportError;
  use crate::test::{Call, MockConnector};

  fn app(connector: MockConnector) -> Router {
    let config = GatewayConfig { proxy_path: ProxyPath::new("/hc/"),
                                 ..Default::default() };
    router(Arc::new(Dispatcher::new(Arc::new(config), connector)))
  }

  async fn send(app: Router, method: &str, uri: &str) -> (StatusCode, Option<String>, String) {
    let req = Request::builder().method(method)
                                .uri(uri)
                                .body(Body::empty())
                                .unwrap();
    let resp = app.oneshot(req).await.unwrap();

    let status = resp.status();
    let content_type = resp.headers()
                           .get("content-type")
                           .map(|v| v.to_str().unwrap().to_string());
    let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();

    (status, content_type, String::from_utf8(body.to_vec()).unwrap())
  }

  #[tokio::test]
  async fn get_is_relayed() {
    let (status, content_type, body) =
      send(app(MockConnector::respond(code::CONTENT, Some(b"5".as_ref()))),
           "GET",
           "/hc/coap://127.0.0.1:5683/dimmer").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("text/html"));
    assert_eq!(body, "<html><body><h1>5</h1></body></html>");
  }

  #[tokio::test]
  async fn head_has_headers_only() {
    let (status, content_type, body) =
      send(app(MockConnector::respond(code::CONTENT, Some(b"5".as_ref()))),
           "HEAD",
           "/hc/coap://127.0.0.1/dimmer").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("text/html"));
    assert_eq!(body, "");
  }

  #[tokio::test]
  async fn other_paths_are_not_found() {
    let connector = MockConnector::respond(code::CONTENT, None);
    let (status, _, body) = send(app(connector.clone()), "GET", "/elsewhere/coap://h/r").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, "");
    assert_eq!(connector.calls(), vec![]);
  }

  #[tokio::test]
  async fn unsupported_method() {
    let connector = MockConnector::respond(code::CONTENT, None);
    let (status, _, _) = send(app(connector.clone()), "OPTIONS", "/hc/coap://h/r").await;

    assert_eq!(status, StatusCode::NOT_IMPLEMENTED);
    assert_eq!(connector.calls(), vec![]);
  }

  #[tokio::test]
  async fn post_without_payload() {
    let connector = MockConnector::respond(code::CHANGED, None);
    let (status, _, _) = send(app(connector.clone()), "POST", "/hc/coap://h/r").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(connector.calls(), vec![]);
  }

  #[tokio::test]
  async fn post_with_payload() {
    let connector = MockConnector::respond(code::CHANGED, None);
    let (status, _, _) = send(app(connector.clone()), "POST", "/hc/coap://h/r?v=on").await;

    assert_eq!(status, StatusCode::OK);
    assert!(connector.calls()
                     .contains(&Call::Request(code::POST, "/r".into(), Some(b"on".to_vec()))));
  }

  #[tokio::test]
  async fn unknown_code_is_server_error() {
    let (status, _, _) = send(app(MockConnector::respond(Code::new(2, 6), None)),
                              "GET",
                              "/hc/coap://h/r").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
  }

  #[tokio::test]
  async fn transport_failure_is_bad_gateway() {
    let (status, _, _) = send(app(MockConnector::fail(|| TransportError::Timeout(5))),
                              "GET",
                              "/hc/coap://h/r").await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
  }
}
