use std::fmt::Debug;
use std::fmt::Formatter;
use std::fmt::Result as FmtResult;
use std::sync::Arc;

use crate::agent::RpcAgent;
use crate::core::ForkId;
use crate::core::RRefId;
use crate::core::WorkerId;
use crate::proto::Message;
use crate::proto::UserDelete;
use crate::track::RRefTracker;

/// A user reference: a remote handle to a value owned by another worker.
///
/// # Teardown
///
/// Dropping the last strong ref sends `USER_DELETE` to the owner. The
/// tracker's pending tables hold strong refs, so this can only fire once
/// the user has been acknowledged by the owner and has no outstanding
/// child-fork registrations; a user pinned by either table outlives its
/// application handles.
pub struct UserRef {
  owner: WorkerId,
  rref_id: RRefId,
  fork_id: ForkId,
  agent: Arc<dyn RpcAgent>,
}

impl UserRef {
  /// Creates a new user reference.
  #[inline]
  pub(crate) fn new(
    owner: WorkerId,
    rref_id: RRefId,
    fork_id: ForkId,
    agent: Arc<dyn RpcAgent>,
  ) -> Self {
    Self {
      owner,
      rref_id,
      fork_id,
      agent,
    }
  }

  /// Returns the worker that owns the underlying value.
  #[inline]
  pub const fn owner(&self) -> WorkerId {
    self.owner
  }

  /// Returns the identifier of the underlying remote reference.
  #[inline]
  pub const fn rref_id(&self) -> RRefId {
    self.rref_id
  }

  /// Returns the fork identifier of this particular user.
  #[inline]
  pub const fn fork_id(&self) -> ForkId {
    self.fork_id
  }
}

impl Drop for UserRef {
  fn drop(&mut self) {
    tracing::debug!(rref = %self.rref_id, fork = %self.fork_id, "User Delete");

    let message: Message = UserDelete {
      rref_id: self.rref_id,
      fork_id: self.fork_id,
    }
    .into_message();

    self
      .agent
      .send(&self.agent.worker_info(self.owner), message)
      .on_reply(|message| RRefTracker::handle_exception(&message));
  }
}

impl Debug for UserRef {
  fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
    f.debug_struct("UserRef")
      .field("owner", &self.owner)
      .field("rref_id", &self.rref_id)
      .field("fork_id", &self.fork_id)
      .finish_non_exhaustive()
  }
}
