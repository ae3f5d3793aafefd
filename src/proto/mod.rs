//! Wire messages exchanged by the reference-counting protocol.
//!
//! A [`Message`] is an opaque envelope: a [`MessageKind`] tag, a byte
//! payload, and the transport-assigned message id. The typed frame views
//! encode and decode the payloads; the tracker never interprets payload
//! bytes directly.

mod frames;
mod kind;
mod message;

pub use self::frames::ForkAccept;
pub use self::frames::ForkNotify;
pub use self::frames::RemoteException;
pub use self::frames::UserAccept;
pub use self::frames::UserDelete;
pub use self::kind::MessageKind;
pub use self::message::Message;
