//! Low-level CoAP vocabulary used by `hcproxy`.
//!
//! The most notable items in `hcproxy_msg` are:
//! - [`registry`]: the closed, static table of CoAP options this stack understands
//! - [`Opt`]: one occurrence of an option, holding a value whose type
//!   was chosen once from the registry when the option was built
//! - [`Message`]: a CoAP message very close to the actual byte layout
//!
//! ## Options
//! Every option number this crate knows about has exactly one [`registry::OptDescriptor`],
//! declaring its name, value type ([`registry::ValueType`]), default and whether it may repeat.
//!
//! Values are coerced into the declared type when they are set, so code reading an
//! [`Opt`] never has to guess what kind of value it holds:
//!
//! ```
//! use hcproxy_msg::{registry, Opt, Value};
//!
//! let max_age = Opt::new(registry::MAX_AGE, "120").unwrap();
//! assert_eq!(max_age.get(), Value::Integer(120));
//!
//! // present but empty means "use the registry default"
//! let max_age = Opt::empty(registry::MAX_AGE).unwrap();
//! assert_eq!(max_age.get(), Value::Integer(60));
//!
//! let path = Opt::new(registry::URI_PATH, "dimmer").unwrap();
//! assert_eq!(path.to_string(), "Uri-Path: dimmer");
//! ```
//!
//! ## Messages
//! [`Message`] supports serializing to bytes and from bytes, using the provided
//! [`TryFromBytes`] and [`TryIntoBytes`] traits.

#![cfg_attr(not(test), deny(missing_debug_implementations, unsafe_code))]
#![cfg_attr(not(test), warn(unreachable_pub, missing_copy_implementations))]
#![cfg_attr(any(docsrs, feature = "docs"), feature(doc_cfg))]
#![deny(missing_docs)]

/// A cursor over a byte buffer
pub mod cursor;

#[doc(hidden)]
pub mod from_bytes;

/// Message structs
pub mod msg;

#[doc(hidden)]
pub mod to_bytes;

#[doc(inline)]
pub use cursor::Cursor;
#[doc(inline)]
pub use from_bytes::TryFromBytes;
#[doc(inline)]
pub use msg::*;
#[doc(inline)]
pub use to_bytes::TryIntoBytes;

#[cfg(test)]
pub(crate) fn test_msg() -> (Message, Vec<u8>) {
  //                                         version  token len  code (2.05 Content)
  //                                         |        |          /
  //                                         |  type  |         /  message ID
  //                                         |  |     |        |   |
  //                                         vv vv vvvv vvvvvvvv vvvvvvvvvvvvvvvv
  let header: [u8; 4] = 0b_01_00_0001_01000101_0000000000000001_u32.to_be_bytes();
  let token: [u8; 1] = [254u8];
  // Content-Format (12) = 50 (application/json)
  let content_format: &[u8] = &[0b_1100_0001u8, 50];
  // Max-Age (14) = 30, delta of 2 from Content-Format
  let max_age: &[u8] = &[0b_0010_0001u8, 30];
  let payload: [&[u8]; 2] = [&[0b1111_1111_u8], b"hello, world!"];
  let bytes = [header.as_ref(),
               token.as_ref(),
               content_format,
               max_age,
               payload.concat().as_ref()].concat();

  let msg = Message { id: Id(1),
                      ty: Type::Con,
                      ver: Version(1),
                      token: Token(tinyvec::array_vec!([u8; 8] => 254)),
                      opts: vec![Opt::new(registry::CONTENT_FORMAT, 50u32).unwrap(),
                                 Opt::new(registry::MAX_AGE, 30u32).unwrap()],
                      code: Code { class: 2,
                                   detail: 5 },
                      payload: Payload(b"hello, world!".to_vec()) };
  (msg, bytes)
}
