use crossbeam_utils::CachePadded;
use std::fmt::Debug;
use std::fmt::Formatter;
use std::fmt::Result as FmtResult;

use crate::core::GlobalId;
use crate::core::WorkerId;
use crate::loom::sync::atomic::AtomicU64;
use crate::loom::sync::atomic::Ordering;

/// Mints globally unique identifiers for one worker.
///
/// The allocator holds the local worker id and a monotonic counter. Each
/// call to [`next_id`] produces a fresh [`GlobalId`]; two allocators on
/// different workers can never collide because the worker id is part of the
/// identifier.
///
/// # Thread Safety
///
/// Identifiers are generated atomically with relaxed ordering, providing
/// uniqueness without synchronization overhead. The counter is never read
/// under the tracker mutex.
///
/// [`next_id`]: IdAllocator::next_id
pub struct IdAllocator {
  worker: WorkerId,
  local: CachePadded<AtomicU64>,
}

impl IdAllocator {
  /// Creates a new allocator for the given worker.
  #[inline]
  pub fn new(worker: WorkerId) -> Self {
    Self {
      worker,
      local: CachePadded::new(AtomicU64::new(0)),
    }
  }

  /// Returns the worker this allocator mints for.
  #[inline]
  pub const fn worker(&self) -> WorkerId {
    self.worker
  }

  /// Mints the next globally unique identifier.
  ///
  /// Wraparound of the 64-bit counter is out of scope; a worker minting one
  /// id per nanosecond would need centuries to exhaust it.
  #[inline]
  pub fn next_id(&self) -> GlobalId {
    GlobalId::new(self.worker, self.local.fetch_add(1, Ordering::Relaxed))
  }
}

impl Debug for IdAllocator {
  fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
    f.debug_struct("IdAllocator")
      .field("worker", &self.worker)
      .finish_non_exhaustive()
  }
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------
