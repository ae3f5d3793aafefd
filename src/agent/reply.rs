use std::fmt::Debug;
use std::fmt::Formatter;
use std::fmt::Result as FmtResult;
use std::mem;
use std::pin::Pin;
use std::sync::Arc;
use std::task::Context;
use std::task::Poll;
use std::task::Waker;

use crate::core::raise;
use crate::loom::sync::Mutex;
use crate::proto::Message;

type ReplyCallback = Box<dyn FnOnce(Message) + Send + 'static>;

/// Creates a linked completion pair for one reply.
///
/// The transport keeps the [`ReplyPromise`] and completes it when the
/// destination's reply arrives; the sender keeps the [`ReplyFuture`] and
/// either registers a callback or awaits it.
#[inline]
pub fn reply_channel() -> (ReplyPromise, ReplyFuture) {
  let shared: Arc<ReplyShared> = Arc::new(ReplyShared {
    state: Mutex::new(ReplyState::Idle),
  });

  (
    ReplyPromise {
      shared: Arc::clone(&shared),
    },
    ReplyFuture { shared },
  )
}

// -----------------------------------------------------------------------------
// Reply State
// -----------------------------------------------------------------------------

enum ReplyState {
  /// Neither side has acted yet.
  Idle,
  /// The sender registered a callback before the reply arrived.
  Callback(ReplyCallback),
  /// The sender polled before the reply arrived.
  Polled(Waker),
  /// The reply arrived before the sender observed it.
  Ready(Message),
  /// The reply has been delivered to the sender.
  Finished,
}

struct ReplyShared {
  state: Mutex<ReplyState>,
}

impl ReplyShared {
  /// Stores or delivers the reply, whichever the sender's state calls for.
  ///
  /// A registered callback runs on the calling thread, after the state lock
  /// has been released; callbacks take the tracker mutex.
  fn fulfil(&self, message: Message) {
    let mut state = self.state.lock();

    match mem::replace(&mut *state, ReplyState::Finished) {
      ReplyState::Idle => {
        *state = ReplyState::Ready(message);
      }
      ReplyState::Callback(callback) => {
        drop(state);
        callback(message);
      }
      ReplyState::Polled(waker) => {
        *state = ReplyState::Ready(message);
        drop(state);
        waker.wake();
      }
      ReplyState::Ready(_) | ReplyState::Finished => {
        drop(state);
        raise!(Protocol, "reply delivered twice");
      }
    }
  }
}

// -----------------------------------------------------------------------------
// Reply Promise
// -----------------------------------------------------------------------------

/// The completing side of a reply.
///
/// Dropping an uncompleted promise completes the future with an `EXCEPTION`
/// message, so a send abandoned by the transport still surfaces in the
/// sender's callback.
pub struct ReplyPromise {
  shared: Arc<ReplyShared>,
}

impl ReplyPromise {
  /// Completes the reply with `message`.
  ///
  /// If a callback is registered it runs on this thread before the call
  /// returns; if the sender is awaiting, its task is woken.
  #[inline]
  pub fn complete(self, message: Message) {
    self.shared.fulfil(message);
  }
}

impl Drop for ReplyPromise {
  fn drop(&mut self) {
    let abandoned: bool = {
      let state = self.shared.state.lock();

      matches!(
        *state,
        ReplyState::Idle | ReplyState::Callback(_) | ReplyState::Polled(_),
      )
    };

    if abandoned {
      self
        .shared
        .fulfil(Message::exception("reply abandoned by transport"));
    }
  }
}

impl Debug for ReplyPromise {
  fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
    f.write_str("ReplyPromise(..)")
  }
}

// -----------------------------------------------------------------------------
// Reply Future
// -----------------------------------------------------------------------------

/// The observing side of a reply.
///
/// The reply is delivered exactly once, either to a callback registered
/// with [`on_reply`] or to an `.await` of the future itself.
///
/// [`on_reply`]: ReplyFuture::on_reply
pub struct ReplyFuture {
  shared: Arc<ReplyShared>,
}

impl ReplyFuture {
  /// Registers `callback` to receive the reply.
  ///
  /// If the reply already arrived, `callback` runs immediately on this
  /// thread; otherwise it runs later on the thread that completes the
  /// promise. Either way it may re-enter the tracker, so no tracker lock
  /// may be held across this call.
  pub fn on_reply<F>(self, callback: F)
  where
    F: FnOnce(Message) + Send + 'static,
  {
    let mut state = self.shared.state.lock();

    match mem::replace(&mut *state, ReplyState::Finished) {
      ReplyState::Ready(message) => {
        drop(state);
        callback(message);
      }
      ReplyState::Idle | ReplyState::Polled(_) => {
        *state = ReplyState::Callback(Box::new(callback));
      }
      ReplyState::Callback(_) | ReplyState::Finished => {
        drop(state);
        raise!(Protocol, "reply observed twice");
      }
    }
  }
}

impl Future for ReplyFuture {
  type Output = Message;

  fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
    let mut state = self.shared.state.lock();

    match mem::replace(&mut *state, ReplyState::Finished) {
      ReplyState::Ready(message) => Poll::Ready(message),
      ReplyState::Idle | ReplyState::Polled(_) => {
        *state = ReplyState::Polled(cx.waker().clone());
        Poll::Pending
      }
      ReplyState::Callback(_) | ReplyState::Finished => {
        drop(state);
        raise!(Protocol, "reply polled after delivery");
      }
    }
  }
}

impl Debug for ReplyFuture {
  fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
    f.write_str("ReplyFuture(..)")
  }
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use std::sync::Arc;
  use std::sync::atomic::AtomicUsize;
  use std::sync::atomic::Ordering;

  use crate::agent::ReplyFuture;
  use crate::agent::ReplyPromise;
  use crate::agent::reply_channel;
  use crate::proto::Message;
  use crate::proto::MessageKind;

  #[test]
  fn test_callback_then_complete() {
    let (promise, future): (ReplyPromise, ReplyFuture) = reply_channel();
    let seen: Arc<AtomicUsize> = Arc::new(AtomicUsize::new(0));

    let counter: Arc<AtomicUsize> = Arc::clone(&seen);

    future.on_reply(move |message| {
      assert_eq!(message.kind(), MessageKind::Ack);
      counter.fetch_add(1, Ordering::SeqCst);
    });

    assert_eq!(seen.load(Ordering::SeqCst), 0);

    promise.complete(Message::ack());

    assert_eq!(seen.load(Ordering::SeqCst), 1);
  }

  #[test]
  fn test_complete_then_callback() {
    let (promise, future): (ReplyPromise, ReplyFuture) = reply_channel();
    let seen: Arc<AtomicUsize> = Arc::new(AtomicUsize::new(0));

    promise.complete(Message::ack());

    let counter: Arc<AtomicUsize> = Arc::clone(&seen);

    future.on_reply(move |_message| {
      counter.fetch_add(1, Ordering::SeqCst);
    });

    assert_eq!(seen.load(Ordering::SeqCst), 1);
  }

  #[test]
  fn test_abandoned_promise_raises_exception() {
    let (promise, future): (ReplyPromise, ReplyFuture) = reply_channel();

    drop(promise);

    future.on_reply(|message| {
      assert_eq!(message.kind(), MessageKind::Exception);
    });
  }

  #[tokio::test]
  async fn test_await_reply() {
    let (promise, future): (ReplyPromise, ReplyFuture) = reply_channel();

    let task = tokio::spawn(async move { future.await });

    promise.complete(Message::ack());

    let message: Message = task.await.unwrap();

    assert_eq!(message.kind(), MessageKind::Ack);
  }
}
