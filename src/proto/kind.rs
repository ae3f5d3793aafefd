use std::fmt::Display;
use std::fmt::Formatter;
use std::fmt::Result as FmtResult;

use crate::error::Exception;
use crate::error::ExceptionGroup;

/// Discriminant of a wire [`Message`].
///
/// [`Message`]: crate::proto::Message
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageKind {
  /// Owner -> user: the owner has registered this user reference.
  UserAccept = 1,
  /// User -> owner: a user has forked a new child reference.
  ForkNotify = 2,
  /// Owner -> forking user: the child fork has been registered.
  ForkAccept = 3,
  /// User -> owner: a user reference has been torn down.
  UserDelete = 4,
  /// Application-level payload; opaque to the tracker.
  Call = 5,
  /// Generic processed-reply acknowledgement.
  Ack = 6,
  /// A remote worker raised an error while processing a message.
  Exception = 7,
}

impl MessageKind {
  /// Converts this kind into its wire tag.
  #[inline]
  pub const fn into_u8(self) -> u8 {
    self as u8
  }

  /// Converts a wire tag into a message kind.
  ///
  /// # Errors
  ///
  /// Returns a `codec` [`Exception`] if `tag` is not a known kind.
  pub fn from_u8(tag: u8) -> Result<Self, Exception> {
    match tag {
      1 => Ok(Self::UserAccept),
      2 => Ok(Self::ForkNotify),
      3 => Ok(Self::ForkAccept),
      4 => Ok(Self::UserDelete),
      5 => Ok(Self::Call),
      6 => Ok(Self::Ack),
      7 => Ok(Self::Exception),
      tag => Err(Exception::new(
        ExceptionGroup::Codec,
        format!("unknown message kind tag {tag}"),
      )),
    }
  }
}

impl Display for MessageKind {
  fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
    match self {
      Self::UserAccept => f.write_str("user_accept"),
      Self::ForkNotify => f.write_str("fork_notify"),
      Self::ForkAccept => f.write_str("fork_accept"),
      Self::UserDelete => f.write_str("user_delete"),
      Self::Call => f.write_str("call"),
      Self::Ack => f.write_str("ack"),
      Self::Exception => f.write_str("exception"),
    }
  }
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use crate::proto::MessageKind;

  const KINDS: &[MessageKind] = &[
    MessageKind::UserAccept,
    MessageKind::ForkNotify,
    MessageKind::ForkAccept,
    MessageKind::UserDelete,
    MessageKind::Call,
    MessageKind::Ack,
    MessageKind::Exception,
  ];

  #[test]
  fn test_tag_round_trip() {
    for kind in KINDS {
      assert_eq!(MessageKind::from_u8(kind.into_u8()).unwrap(), *kind);
    }
  }

  #[test]
  fn test_unknown_tag() {
    let error = MessageKind::from_u8(0).unwrap_err();

    assert_eq!(format!("{error}"), "error:codec - unknown message kind tag 0");
  }
}
