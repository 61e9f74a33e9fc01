use hcproxy_msg::Message;

/// One-line description of a message, e.g.
/// `Response: Ack 2.05 with 1 byte payload`
pub(crate) fn msg_summary(msg: &Message) -> String {
  format!("{:?}: {:?} {} with {} byte payload",
          msg.code.kind(),
          msg.ty,
          msg.code,
          msg.payload.0.len())
}
