//! Simulated multi-worker cluster.
//!
//! Every tracker sends through a [`SimAgent`] that parks envelopes on a
//! shared bus instead of a real transport. Tests drive delivery explicitly,
//! in any order, which is exactly the non-FIFO regime the tracker is built
//! for. Delivering an envelope dispatches it through the destination
//! tracker's `handle_request` and completes the sender's reply future with
//! the returned reply, on the delivering thread.

#![allow(dead_code)]

use hashbrown::HashMap;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::AtomicI64;
use std::sync::atomic::Ordering;
use triomphe::Arc as ArcRef;

use tether::agent::ReplyFuture;
use tether::agent::ReplyPromise;
use tether::agent::RpcAgent;
use tether::agent::WorkerInfo;
use tether::agent::reply_channel;
use tether::proto::Message;
use tether::proto::MessageKind;
use tether::rref::RRef;
use tether::track::RRefTracker;
use tether::types::WorkerId;

// -----------------------------------------------------------------------------
// Envelope & Delivery Log
// -----------------------------------------------------------------------------

struct Envelope {
  src: WorkerId,
  dst: WorkerId,
  message: Message,
  promise: Option<ReplyPromise>,
}

/// One delivered request and the kind of its reply.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Delivery {
  pub src: WorkerId,
  pub dst: WorkerId,
  pub kind: MessageKind,
  pub reply: MessageKind,
}

// -----------------------------------------------------------------------------
// Sim Agent
// -----------------------------------------------------------------------------

struct Bus {
  queue: Mutex<Vec<Envelope>>,
  nodes: Mutex<HashMap<WorkerId, RRefTracker>>,
  log: Mutex<Vec<Delivery>>,
  next_message: AtomicI64,
}

struct SimAgent {
  bus: Arc<Bus>,
  info: WorkerInfo,
}

impl RpcAgent for SimAgent {
  fn send(&self, dst: &WorkerInfo, message: Message) -> ReplyFuture {
    let (promise, future): (ReplyPromise, ReplyFuture) = reply_channel();
    let id: i64 = self.bus.next_message.fetch_add(1, Ordering::SeqCst);

    self.bus.queue.lock().push(Envelope {
      src: self.info.id(),
      dst: dst.id(),
      message: message.with_id(id),
      promise: Some(promise),
    });

    future
  }

  fn worker_info(&self, id: WorkerId) -> WorkerInfo {
    WorkerInfo::new(id, format!("node-{id}"))
  }

  fn self_info(&self) -> WorkerInfo {
    self.info.clone()
  }
}

// -----------------------------------------------------------------------------
// Sim Cluster
// -----------------------------------------------------------------------------

pub struct SimCluster {
  bus: Arc<Bus>,
}

impl SimCluster {
  /// Builds a cluster of `workers` trackers with ids `0..workers`.
  pub fn new(workers: u16) -> (Self, Vec<RRefTracker>) {
    let bus: Arc<Bus> = Arc::new(Bus {
      queue: Mutex::new(Vec::new()),
      nodes: Mutex::new(HashMap::new()),
      log: Mutex::new(Vec::new()),
      next_message: AtomicI64::new(0),
    });

    let trackers: Vec<RRefTracker> = (0..workers)
      .map(|id| {
        let info: WorkerInfo = WorkerInfo::new(WorkerId::from_bits(id), format!("node-{id}"));
        let agent: Arc<SimAgent> = Arc::new(SimAgent {
          bus: Arc::clone(&bus),
          info,
        });

        let tracker: RRefTracker = RRefTracker::new(agent);

        bus
          .nodes
          .lock()
          .insert(WorkerId::from_bits(id), tracker.clone());

        tracker
      })
      .collect();

    (Self { bus }, trackers)
  }

  /// Number of undelivered envelopes.
  pub fn pending(&self) -> usize {
    self.bus.queue.lock().len()
  }

  /// Kinds of the undelivered envelopes, in queue order.
  pub fn kinds_in_flight(&self) -> Vec<MessageKind> {
    self
      .bus
      .queue
      .lock()
      .iter()
      .map(|envelope| envelope.message.kind())
      .collect()
  }

  /// Mints a message id for an application-level call the test emulates.
  pub fn next_message_id(&self) -> i64 {
    self.bus.next_message.fetch_add(1, Ordering::SeqCst)
  }

  /// Enqueues a message with no reply channel, as when the message itself
  /// is the reply of an application-level call.
  pub fn post(&self, src: WorkerId, dst: WorkerId, message: Message) {
    let id: i64 = self.bus.next_message.fetch_add(1, Ordering::SeqCst);

    self.bus.queue.lock().push(Envelope {
      src,
      dst,
      message: message.with_id(id),
      promise: None,
    });
  }

  /// Delivers the oldest envelope. Returns `false` if none was in flight.
  pub fn step(&self) -> bool {
    self.step_at(0)
  }

  /// Delivers the envelope at `index` (in queue order). Returns `false` if
  /// no envelope was at that index.
  pub fn step_at(&self, index: usize) -> bool {
    let envelope: Option<Envelope> = {
      let mut queue = self.bus.queue.lock();

      if index < queue.len() {
        Some(queue.remove(index))
      } else {
        None
      }
    };

    match envelope {
      Some(envelope) => {
        self.deliver(envelope);
        true
      }
      None => false,
    }
  }

  /// Delivers the oldest envelope of the given kind. Returns `false` if
  /// none was in flight.
  pub fn step_kind(&self, kind: MessageKind) -> bool {
    let index: Option<usize> = {
      let queue = self.bus.queue.lock();

      queue
        .iter()
        .position(|envelope| envelope.message.kind() == kind)
    };

    match index {
      Some(index) => self.step_at(index),
      None => false,
    }
  }

  /// Delivers everything, including envelopes enqueued by the deliveries
  /// themselves, in queue order.
  pub fn drain(&self) {
    while self.step() {}
  }

  /// Everything delivered so far.
  pub fn deliveries(&self) -> Vec<Delivery> {
    self.bus.log.lock().clone()
  }

  fn deliver(&self, envelope: Envelope) {
    let tracker: RRefTracker = self
      .bus
      .nodes
      .lock()
      .get(&envelope.dst)
      .cloned()
      .expect("delivery to unknown worker");

    let reply: Message = tracker.handle_request(&envelope.message);

    self.bus.log.lock().push(Delivery {
      src: envelope.src,
      dst: envelope.dst,
      kind: envelope.message.kind(),
      reply: reply.kind(),
    });

    if let Some(promise) = envelope.promise {
      promise.complete(reply.with_id(envelope.message.id()));
    }
  }
}

// -----------------------------------------------------------------------------
// Flows
// -----------------------------------------------------------------------------

/// The remote-create flow: `caller` constructs a user for a value owned by
/// `owner`, and the owner's acknowledgement is left in flight for the test
/// to deliver.
///
/// This mirrors an application call to the owner whose reply is the
/// `USER_ACCEPT`: the owner registers the fork synchronously while
/// processing the call, and the acknowledgement travels back as a plain
/// message.
pub fn remote_create(
  cluster: &SimCluster,
  caller: &RRefTracker,
  owner: &RRefTracker,
) -> ArcRef<RRef> {
  let user: ArcRef<RRef> = caller.create_user(owner.worker_id());

  let _owner_ref: ArcRef<RRef> = owner.get_or_create_owner(user.rref_id());
  let accept: Message = owner.accept_user_rref(user.rref_id(), user.fork_id());

  cluster.post(owner.worker_id(), caller.worker_id(), accept);

  user
}
