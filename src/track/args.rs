//! Per-calling-context scratch for references used as RPC arguments.
//!
//! An outgoing RPC carries only descriptors, not strong refs. Without a pin
//! on the caller side, a destructor racing the in-flight message could tear
//! the reference down before the callee constructs its user. References are
//! staged here while a call is being prepared, then transferred into the
//! tracker's pinned-argument table under the message id when the call is
//! dispatched.
//!
//! The scratch is thread-local and lock-free. Call preparation must not
//! migrate across threads; in a task-based host, stage and transfer on the
//! same thread.

use std::cell::RefCell;
use std::mem;
use triomphe::Arc;

use crate::rref::RRef;

thread_local! {
  static RREF_ARGS: RefCell<Vec<Arc<RRef>>> = const { RefCell::new(Vec::new()) };
}

/// Stages `rref` in the calling context.
pub(crate) fn push(rref: Arc<RRef>) {
  RREF_ARGS.with_borrow_mut(|args| args.push(rref));
}

/// Takes every staged reference, leaving the scratch empty.
pub(crate) fn take() -> Vec<Arc<RRef>> {
  RREF_ARGS.with_borrow_mut(mem::take)
}

/// Returns the number of references staged in the calling context.
pub fn staged_rref_args() -> usize {
  RREF_ARGS.with_borrow(Vec::len)
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------
