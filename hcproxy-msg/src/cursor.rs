/// Reads a byte buffer front to back, handing out borrowed slices
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Cursor<T> {
  buf: T,
  pos: usize,
}

impl<T: AsRef<[u8]>> Cursor<T> {
  /// Start reading at the beginning of `buf`
  pub fn new(buf: T) -> Cursor<T> {
    Cursor { buf, pos: 0 }
  }

  fn rest(&self) -> &[u8] {
    &self.buf.as_ref()[self.pos..]
  }

  /// The next byte, or None at the end of the buffer
  pub fn next(&mut self) -> Option<u8> {
    let b = self.rest().first().copied();
    self.pos += b.map(|_| 1).unwrap_or(0);
    b
  }

  /// Exactly `n` bytes, or None (consuming nothing) if fewer are left
  pub fn take_exact(&mut self, n: usize) -> Option<&[u8]> {
    if n > self.remaining() {
      return None;
    }

    let start = self.pos;
    self.pos += n;
    Some(&self.buf.as_ref()[start..start + n])
  }

  /// Everything not consumed yet
  pub fn take_until_end(&mut self) -> &[u8] {
    let start = self.pos;
    self.pos = self.buf.as_ref().len();
    &self.buf.as_ref()[start..]
  }

  /// Number of bytes not consumed yet
  pub fn remaining(&self) -> usize {
    self.rest().len()
  }

  /// Whether every byte has been consumed
  pub fn is_exhausted(&self) -> bool {
    self.remaining() == 0
  }
}
