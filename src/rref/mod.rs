//! Remote reference objects.
//!
//! A [`RRef`] is either the authoritative [`OwnerRef`] holding the value on
//! its owning worker, or a [`UserRef`] handle to it on any other worker.
//! References are shared through [`triomphe::Arc`]: the tracker tables and
//! the application both hold strong refs, and whichever release comes last
//! triggers cleanup.

mod descriptor;
mod owner;
mod user;
mod value;

pub use self::descriptor::ForkDescriptor;
pub use self::owner::OwnerRef;
pub use self::user::UserRef;
pub use self::value::Value;

use crate::core::ForkId;
use crate::core::IdAllocator;
use crate::core::RRefId;
use crate::core::WorkerId;

/// A remote reference: the owning side or a user handle.
#[derive(Debug)]
pub enum RRef {
  /// The authoritative holder of the value.
  Owner(OwnerRef),
  /// A remote handle to a value owned elsewhere.
  User(UserRef),
}

impl RRef {
  /// Returns `true` if this reference is the owning side.
  #[inline]
  pub const fn is_owner(&self) -> bool {
    matches!(self, Self::Owner(_))
  }

  /// Returns the worker that owns the underlying value.
  #[inline]
  pub fn owner_worker(&self) -> WorkerId {
    match self {
      Self::Owner(owner) => owner.rref_id().worker(),
      Self::User(user) => user.owner(),
    }
  }

  /// Returns the identifier of the underlying remote reference.
  #[inline]
  pub fn rref_id(&self) -> RRefId {
    match self {
      Self::Owner(owner) => owner.rref_id(),
      Self::User(user) => user.rref_id(),
    }
  }

  /// Returns the fork identifier of this particular reference.
  ///
  /// The owning side has no separate fork of its own; its fork id is the
  /// reference id itself.
  #[inline]
  pub fn fork_id(&self) -> ForkId {
    match self {
      Self::Owner(owner) => owner.rref_id(),
      Self::User(user) => user.fork_id(),
    }
  }

  /// Mints a descriptor for transmitting this reference to another worker.
  ///
  /// This only allocates the child fork id; registering the fork with the
  /// tracker is the caller's responsibility.
  #[inline]
  pub fn fork(&self, ids: &IdAllocator) -> ForkDescriptor {
    ForkDescriptor::new(
      self.owner_worker(),
      self.rref_id(),
      ids.next_id(),
      self.fork_id(),
    )
  }

  /// Returns the owning side of this reference, if it is one.
  #[inline]
  pub const fn owner(&self) -> Option<&OwnerRef> {
    match self {
      Self::Owner(owner) => Some(owner),
      Self::User(_) => None,
    }
  }

  /// Returns the user side of this reference, if it is one.
  #[inline]
  pub const fn user(&self) -> Option<&UserRef> {
    match self {
      Self::Owner(_) => None,
      Self::User(user) => Some(user),
    }
  }
}
