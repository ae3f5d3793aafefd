//! Typed views over the protocol message payloads.
//!
//! Each frame owns the encode/decode of exactly one [`MessageKind`]. All
//! integer fields are big-endian.

use bytes::Buf;
use bytes::BufMut;
use bytes::Bytes;
use bytes::BytesMut;

use crate::consts;
use crate::core::ForkId;
use crate::core::RRefId;
use crate::core::WorkerId;
use crate::error::Exception;
use crate::error::ExceptionGroup;
use crate::proto::Message;
use crate::proto::MessageKind;

#[inline]
fn expect_kind(message: &Message, kind: MessageKind) -> Result<Bytes, Exception> {
  if message.kind() != kind {
    return Err(Exception::new(
      ExceptionGroup::Codec,
      format!("expected a {} message, got {}", kind, message.kind()),
    ));
  }

  Ok(message.payload().clone())
}

// -----------------------------------------------------------------------------
// User Accept
// -----------------------------------------------------------------------------

/// Owner -> user: the owner has registered this user reference.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UserAccept {
  pub rref_id: RRefId,
  pub fork_id: ForkId,
}

impl UserAccept {
  /// Encodes this frame into a wire message.
  pub fn into_message(self) -> Message {
    let mut buf: BytesMut = BytesMut::with_capacity(2 * consts::GLOBAL_ID_WIRE_BYTES);

    self.rref_id.encode(&mut buf);
    self.fork_id.encode(&mut buf);

    Message::new(MessageKind::UserAccept, buf.freeze())
  }

  /// Decodes this frame from a wire message.
  ///
  /// # Errors
  ///
  /// Returns a `codec` [`Exception`] on a kind mismatch or short payload.
  pub fn from_message(message: &Message) -> Result<Self, Exception> {
    let mut buf: Bytes = expect_kind(message, MessageKind::UserAccept)?;

    Ok(Self {
      rref_id: RRefId::decode(&mut buf)?,
      fork_id: ForkId::decode(&mut buf)?,
    })
  }
}

// -----------------------------------------------------------------------------
// Fork Notify
// -----------------------------------------------------------------------------

/// User -> owner: a user has forked a new child reference to `fork_dst`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ForkNotify {
  pub rref_id: RRefId,
  pub fork_id: ForkId,
  pub fork_dst: WorkerId,
}

impl ForkNotify {
  /// Encodes this frame into a wire message.
  pub fn into_message(self) -> Message {
    let mut buf: BytesMut = BytesMut::with_capacity(2 * consts::GLOBAL_ID_WIRE_BYTES + 2);

    self.rref_id.encode(&mut buf);
    self.fork_id.encode(&mut buf);
    buf.put_u16(self.fork_dst.into_bits());

    Message::new(MessageKind::ForkNotify, buf.freeze())
  }

  /// Decodes this frame from a wire message.
  ///
  /// # Errors
  ///
  /// Returns a `codec` [`Exception`] on a kind mismatch or short payload.
  pub fn from_message(message: &Message) -> Result<Self, Exception> {
    let mut buf: Bytes = expect_kind(message, MessageKind::ForkNotify)?;

    let rref_id: RRefId = RRefId::decode(&mut buf)?;
    let fork_id: ForkId = ForkId::decode(&mut buf)?;

    if buf.remaining() < 2 {
      return Err(Exception::new(
        ExceptionGroup::Codec,
        "truncated fork destination",
      ));
    }

    Ok(Self {
      rref_id,
      fork_id,
      fork_dst: WorkerId::from_bits(buf.get_u16()),
    })
  }
}

// -----------------------------------------------------------------------------
// Fork Accept
// -----------------------------------------------------------------------------

/// Owner -> forking user: the child fork has been registered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ForkAccept {
  pub fork_id: ForkId,
}

impl ForkAccept {
  /// Encodes this frame into a wire message.
  pub fn into_message(self) -> Message {
    let mut buf: BytesMut = BytesMut::with_capacity(consts::GLOBAL_ID_WIRE_BYTES);

    self.fork_id.encode(&mut buf);

    Message::new(MessageKind::ForkAccept, buf.freeze())
  }

  /// Decodes this frame from a wire message.
  ///
  /// # Errors
  ///
  /// Returns a `codec` [`Exception`] on a kind mismatch or short payload.
  pub fn from_message(message: &Message) -> Result<Self, Exception> {
    let mut buf: Bytes = expect_kind(message, MessageKind::ForkAccept)?;

    Ok(Self {
      fork_id: ForkId::decode(&mut buf)?,
    })
  }
}

// -----------------------------------------------------------------------------
// User Delete
// -----------------------------------------------------------------------------

/// User -> owner: a user reference has been torn down.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UserDelete {
  pub rref_id: RRefId,
  pub fork_id: ForkId,
}

impl UserDelete {
  /// Encodes this frame into a wire message.
  pub fn into_message(self) -> Message {
    let mut buf: BytesMut = BytesMut::with_capacity(2 * consts::GLOBAL_ID_WIRE_BYTES);

    self.rref_id.encode(&mut buf);
    self.fork_id.encode(&mut buf);

    Message::new(MessageKind::UserDelete, buf.freeze())
  }

  /// Decodes this frame from a wire message.
  ///
  /// # Errors
  ///
  /// Returns a `codec` [`Exception`] on a kind mismatch or short payload.
  pub fn from_message(message: &Message) -> Result<Self, Exception> {
    let mut buf: Bytes = expect_kind(message, MessageKind::UserDelete)?;

    Ok(Self {
      rref_id: RRefId::decode(&mut buf)?,
      fork_id: ForkId::decode(&mut buf)?,
    })
  }
}

// -----------------------------------------------------------------------------
// Remote Exception
// -----------------------------------------------------------------------------

/// A remote worker raised an error while processing a message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteException {
  pub error: String,
}

impl RemoteException {
  /// Encodes this frame into a wire message.
  pub fn into_message(self) -> Message {
    Message::new(MessageKind::Exception, Bytes::from(self.error))
  }

  /// Decodes this frame from a wire message.
  ///
  /// Invalid UTF-8 is replaced rather than rejected; the payload is only
  /// ever displayed.
  ///
  /// # Errors
  ///
  /// Returns a `codec` [`Exception`] on a kind mismatch.
  pub fn from_message(message: &Message) -> Result<Self, Exception> {
    let buf: Bytes = expect_kind(message, MessageKind::Exception)?;

    Ok(Self {
      error: String::from_utf8_lossy(&buf).into_owned(),
    })
  }
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------
