use toad_macros::rfc_7252_doc;

#[doc = rfc_7252_doc!("5.3.1")]
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Debug, Default)]
pub struct Token(pub tinyvec::ArrayVec<[u8; 8]>);

impl Token {
  /// Build a token from up to 8 bytes, ignoring anything past the 8th.
  ///
  /// ```
  /// use hcproxy_msg::Token;
  ///
  /// let token = Token::from_bytes(&[0xde, 0xad, 0xbe, 0xef]);
  /// assert_eq!(token.as_bytes(), &[0xde, 0xad, 0xbe, 0xef]);
  /// ```
  pub fn from_bytes(bytes: &[u8]) -> Self {
    Token(bytes.iter().copied().take(8).collect())
  }

  /// The token's bytes
  pub fn as_bytes(&self) -> &[u8] {
    &self.0
  }
}
