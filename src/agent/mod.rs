//! Facade over the RPC agent consumed by the fork-tracking core.
//!
//! The tracker never talks to the transport directly: it sends through
//! [`RpcAgent`] and observes replies through [`ReplyFuture`]. Transport
//! implementations live outside this crate; tests provide a simulated
//! in-process cluster.

mod info;
mod reply;

pub use self::info::WorkerInfo;
pub use self::reply::ReplyFuture;
pub use self::reply::ReplyPromise;
pub use self::reply::reply_channel;

use crate::core::WorkerId;
use crate::proto::Message;

/// The transport contract consumed by the tracker.
///
/// # Callback Discipline
///
/// [`send`] must not block and must not invoke tracker methods on the
/// calling thread: the tracker releases its mutex before every send, and
/// reply callbacks re-acquire it. Completing a reply synchronously from
/// inside `send` would re-enter the tracker while the caller is mid
/// operation.
///
/// A failed or dropped send must complete its [`ReplyFuture`] with an
/// `EXCEPTION` message so the failure surfaces in the registered callback.
/// Abandoning the [`ReplyPromise`] does this automatically.
///
/// [`send`]: RpcAgent::send
pub trait RpcAgent: Send + Sync {
  /// Hands `message` to the transport for delivery to `dst`.
  ///
  /// The returned future completes with the destination's reply once the
  /// message has been processed there.
  fn send(&self, dst: &WorkerInfo, message: Message) -> ReplyFuture;

  /// Returns the worker info for the given worker id.
  fn worker_info(&self, id: WorkerId) -> WorkerInfo;

  /// Returns the worker info of the local worker.
  fn self_info(&self) -> WorkerInfo;
}
