//! CoAP response code → HTTP status.
//!
//! The table covers every response code of RFC 7252 (and the two RFC 7959 adds).
//! A code missing from it is a defect, so a miss is an error rather than
//! a fallback status.

use hcproxy_msg::code::*;
use hcproxy_msg::Code;

use crate::error::UnknownResponseCode;

static TABLE: [(Code, u16); 23] = [(CREATED, 201),
                                   (DELETED, 200),
                                   (VALID, 304),
                                   (CHANGED, 200),
                                   (CONTENT, 200),
                                   (CONTINUE, 502),
                                   (BAD_REQUEST, 400),
                                   (UNAUTHORIZED, 401),
                                   (BAD_OPTION, 400),
                                   (FORBIDDEN, 403),
                                   (NOT_FOUND, 404),
                                   (METHOD_NOT_ALLOWED, 405),
                                   (NOT_ACCEPTABLE, 406),
                                   (REQUEST_ENTITY_INCOMPLETE, 400),
                                   (PRECONDITION_FAILED, 412),
                                   (REQUEST_ENTITY_TOO_LARGE, 413),
                                   (UNSUPPORTED_CONTENT_FORMAT, 415),
                                   (INTERNAL_SERVER_ERROR, 500),
                                   (NOT_IMPLEMENTED, 501),
                                   (BAD_GATEWAY, 502),
                                   (SERVICE_UNAVAILABLE, 503),
                                   (GATEWAY_TIMEOUT, 504),
                                   (PROXYING_NOT_SUPPORTED, 502)];

/// Look up the HTTP status for a CoAP response code
///
/// ```
/// use hcproxy::translate::http_status;
/// use hcproxy_msg::{code, Code};
///
/// assert_eq!(http_status(code::CONTENT), Ok(200));
/// assert!(http_status(Code::new(2, 6)).is_err());
/// ```
pub fn http_status(code: Code) -> Result<u16, UnknownResponseCode> {
  TABLE.binary_search_by_key(&code, |(c, _)| *c)
       .map(|ix| TABLE[ix].1)
       .map_err(|_| UnknownResponseCode(code))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn table_is_sorted() {
    assert!(TABLE.windows(2).all(|w| w[0].0 < w[1].0));
  }

  #[test]
  fn every_response_code_is_mapped() {
    RESPONSE_CODES.iter().for_each(|code| {
                           let status = http_status(*code).unwrap();
                           assert!((200..600).contains(&status), "{} -> {}", code, status);
                         });
  }

  #[test]
  fn some_mappings() {
    assert_eq!(http_status(CREATED), Ok(201));
    assert_eq!(http_status(VALID), Ok(304));
    assert_eq!(http_status(NOT_FOUND), Ok(404));
    assert_eq!(http_status(GATEWAY_TIMEOUT), Ok(504));
  }

  #[test]
  fn misses_are_errors() {
    [Code::new(2, 6), Code::new(4, 99), GET, EMPTY].into_iter()
                                                   .for_each(|code| {
                                                     assert_eq!(http_status(code),
                                                                Err(UnknownResponseCode(code)))
                                                   });
  }
}
