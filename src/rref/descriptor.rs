use bytes::Buf;
use bytes::BufMut;

use crate::core::ForkId;
use crate::core::RRefId;
use crate::core::WorkerId;
use crate::error::Exception;
use crate::error::ExceptionGroup;

/// Serializable description of one fork of a remote reference.
///
/// A descriptor is what actually travels inside an RPC payload when a
/// reference is passed between workers: the owning worker, the reference
/// id, the freshly minted fork id of the new user, and the fork id of the
/// reference it was forked from.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub struct ForkDescriptor {
  owner: WorkerId,
  rref_id: RRefId,
  fork_id: ForkId,
  parent: ForkId,
}

impl ForkDescriptor {
  /// Number of bytes used by a descriptor on the wire.
  pub const WIRE_BYTES: usize = 32;

  /// Creates a new `ForkDescriptor`.
  #[inline]
  pub const fn new(owner: WorkerId, rref_id: RRefId, fork_id: ForkId, parent: ForkId) -> Self {
    Self {
      owner,
      rref_id,
      fork_id,
      parent,
    }
  }

  /// Returns the worker owning the underlying value.
  #[inline]
  pub const fn owner(&self) -> WorkerId {
    self.owner
  }

  /// Returns the identifier of the underlying remote reference.
  #[inline]
  pub const fn rref_id(&self) -> RRefId {
    self.rref_id
  }

  /// Returns the fork identifier minted for the new user.
  #[inline]
  pub const fn fork_id(&self) -> ForkId {
    self.fork_id
  }

  /// Returns the fork identifier of the forking reference.
  #[inline]
  pub const fn parent(&self) -> ForkId {
    self.parent
  }

  /// Writes the wire form of this descriptor to `buf`.
  pub fn encode<B: BufMut>(&self, buf: &mut B) {
    buf.put_u16(self.owner.into_bits());
    self.rref_id.encode(buf);
    self.fork_id.encode(buf);
    self.parent.encode(buf);
  }

  /// Reads a descriptor from its wire form in `buf`.
  ///
  /// # Errors
  ///
  /// Returns a `codec` [`Exception`] if `buf` is too short.
  pub fn decode<B: Buf>(buf: &mut B) -> Result<Self, Exception> {
    if buf.remaining() < Self::WIRE_BYTES {
      return Err(Exception::new(
        ExceptionGroup::Codec,
        "truncated fork descriptor",
      ));
    }

    Ok(Self {
      owner: WorkerId::from_bits(buf.get_u16()),
      rref_id: RRefId::decode(buf)?,
      fork_id: ForkId::decode(buf)?,
      parent: ForkId::decode(buf)?,
    })
  }
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------
