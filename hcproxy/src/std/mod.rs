use ::std::io;

/// CoAP over UDP
pub mod udp;
pub use udp::*;

/// The HTTP front end
pub mod server;

pub(crate) fn io_to_nb(err: io::Error) -> nb::Error<io::Error> {
  match err.kind() {
    | io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => nb::Error::WouldBlock,
    | _ => nb::Error::Other(err),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn timeouts_would_block() {
    [io::ErrorKind::WouldBlock, io::ErrorKind::TimedOut].into_iter()
                                                        .for_each(|kind| {
                                                          assert!(matches!(io_to_nb(io::Error::from(kind)),
                                                                           nb::Error::WouldBlock))
                                                        });

    assert!(matches!(io_to_nb(io::Error::from(io::ErrorKind::ConnectionRefused)),
                     nb::Error::Other(_)));
  }
}
