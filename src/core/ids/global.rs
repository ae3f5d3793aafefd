use bytes::Buf;
use bytes::BufMut;
use std::fmt::Debug;
use std::fmt::Display;
use std::fmt::Formatter;
use std::fmt::Result as FmtResult;

use crate::consts;
use crate::core::WorkerId;
use crate::error::Exception;
use crate::error::ExceptionGroup;

/// Identifier of a remote reference held anywhere in the cluster.
pub type RRefId = GlobalId;

/// Identifier of a single user reference (fork) of a remote reference.
pub type ForkId = GlobalId;

/// Globally unique identifier minted by a single worker.
///
/// A `GlobalId` pairs the minting worker with a per-worker monotonic
/// counter. Uniqueness holds for the lifetime of the cluster because each
/// worker only ever increments its own counter; ids are never reused.
///
/// # Format
///
/// Identifiers display as `#Gid<W.N>` where:
///
/// - `W`: the minting worker id
/// - `N`: the worker-local counter value
///
/// # Wire Form
///
/// On the wire an identifier occupies [`GLOBAL_ID_WIRE_BYTES`] bytes: the
/// worker id as a big-endian `u16` followed by the local id as a big-endian
/// `u64`.
///
/// [`GLOBAL_ID_WIRE_BYTES`]: crate::consts::GLOBAL_ID_WIRE_BYTES
#[derive(Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct GlobalId {
  worker: WorkerId,
  local: u64,
}

impl GlobalId {
  /// Creates a new global id from a worker id and a local counter value.
  #[inline]
  pub const fn new(worker: WorkerId, local: u64) -> Self {
    Self { worker, local }
  }

  /// Returns the worker that minted this id.
  #[inline]
  pub const fn worker(&self) -> WorkerId {
    self.worker
  }

  /// Returns the worker-local counter value.
  #[inline]
  pub const fn local(&self) -> u64 {
    self.local
  }

  /// Writes the wire form of this id to `buf`.
  #[inline]
  pub fn encode<B: BufMut>(&self, buf: &mut B) {
    buf.put_u16(self.worker.into_bits());
    buf.put_u64(self.local);
  }

  /// Reads an id from its wire form in `buf`.
  ///
  /// # Errors
  ///
  /// Returns a `codec` [`Exception`] if `buf` holds fewer than
  /// [`GLOBAL_ID_WIRE_BYTES`] remaining bytes.
  ///
  /// [`GLOBAL_ID_WIRE_BYTES`]: crate::consts::GLOBAL_ID_WIRE_BYTES
  pub fn decode<B: Buf>(buf: &mut B) -> Result<Self, Exception> {
    if buf.remaining() < consts::GLOBAL_ID_WIRE_BYTES {
      return Err(Exception::new(
        ExceptionGroup::Codec,
        "truncated global id",
      ));
    }

    let worker: WorkerId = WorkerId::from_bits(buf.get_u16());
    let local: u64 = buf.get_u64();

    Ok(Self::new(worker, local))
  }
}

impl Debug for GlobalId {
  fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
    Display::fmt(self, f)
  }
}

impl Display for GlobalId {
  fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
    write!(f, "#Gid<{}.{}>", self.worker, self.local)
  }
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------
