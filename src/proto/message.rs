use bytes::Bytes;
use std::fmt::Display;

use crate::consts;
use crate::proto::MessageKind;

/// A wire message: kind tag, opaque payload, and transport message id.
///
/// Messages start life with [`UNASSIGNED_MESSAGE_ID`]; the agent assigns
/// the real id when the message is handed to the transport. The id is what
/// keys the tracker's pinned-argument table.
///
/// [`UNASSIGNED_MESSAGE_ID`]: crate::consts::UNASSIGNED_MESSAGE_ID
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
  kind: MessageKind,
  payload: Bytes,
  id: i64,
}

impl Message {
  /// Creates a new message with an unassigned id.
  #[inline]
  pub fn new(kind: MessageKind, payload: Bytes) -> Self {
    Self {
      kind,
      payload,
      id: consts::UNASSIGNED_MESSAGE_ID,
    }
  }

  /// Creates an empty acknowledgement reply.
  #[inline]
  pub fn ack() -> Self {
    Self::new(MessageKind::Ack, Bytes::new())
  }

  /// Creates an exception reply carrying a UTF-8 error string.
  #[inline]
  pub fn exception<T>(error: T) -> Self
  where
    T: Display,
  {
    Self::new(MessageKind::Exception, Bytes::from(error.to_string()))
  }

  /// Returns this message with the given transport id.
  #[inline]
  pub fn with_id(mut self, id: i64) -> Self {
    self.id = id;
    self
  }

  /// Returns the kind tag.
  #[inline]
  pub const fn kind(&self) -> MessageKind {
    self.kind
  }

  /// Returns the payload bytes.
  #[inline]
  pub const fn payload(&self) -> &Bytes {
    &self.payload
  }

  /// Returns the transport message id.
  #[inline]
  pub const fn id(&self) -> i64 {
    self.id
  }
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------
