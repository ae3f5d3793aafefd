use hashbrown::HashMap;
use hashbrown::HashSet;
use std::fmt::Debug;
use std::fmt::Display;
use std::fmt::Formatter;
use std::fmt::Result as FmtResult;
use std::sync::OnceLock;
use triomphe::Arc;

use crate::agent::RpcAgent;
use crate::agent::WorkerInfo;
use crate::consts;
use crate::core::ForkId;
use crate::core::GlobalId;
use crate::core::IdAllocator;
use crate::core::RRefId;
use crate::core::WorkerId;
use crate::core::raise;
use crate::loom::sync::Mutex;
use crate::proto::ForkAccept;
use crate::proto::ForkNotify;
use crate::proto::Message;
use crate::proto::MessageKind;
use crate::proto::RemoteException;
use crate::proto::UserAccept;
use crate::proto::UserDelete;
use crate::rref::ForkDescriptor;
use crate::rref::OwnerRef;
use crate::rref::RRef;
use crate::rref::UserRef;
use crate::track::args;

static TRACKER: OnceLock<RRefTracker> = OnceLock::new();

// -----------------------------------------------------------------------------
// Fork Missing Error
// -----------------------------------------------------------------------------

#[derive(Debug)]
enum ForkMissing {
  UnknownRRef(RRefId),
  UnknownFork(ForkId),
}

impl Display for ForkMissing {
  fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
    match self {
      Self::UnknownRRef(rref_id) => {
        write!(f, "deleting a fork of {rref_id} before the owner knows it")
      }
      Self::UnknownFork(fork_id) => {
        write!(f, "deleting unknown fork {fork_id}")
      }
    }
  }
}

// -----------------------------------------------------------------------------
// Tracker Stats
// -----------------------------------------------------------------------------

/// Per-table entry counts of one tracker, taken in a single critical
/// section.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub struct TrackerStats {
  /// Owned references pinned on this worker.
  pub owners: usize,
  /// Forks tracked across all owned references.
  pub forks: usize,
  /// Users constructed locally but not yet acknowledged by their owner.
  pub pending_users: usize,
  /// Users pinned by an outstanding child-fork registration.
  pub pending_fork_requests: usize,
  /// Acknowledgements that arrived before their user was constructed.
  pub pending_accepted_users: usize,
  /// Messages whose argument references are pinned awaiting an ack.
  pub pending_rref_args: usize,
}

// -----------------------------------------------------------------------------
// Tracker State
// -----------------------------------------------------------------------------

/// The six tables of the reference-count protocol, guarded by one mutex.
struct TrackerState {
  /// Owned references, pinned while any fork of them is known.
  owners: HashMap<RRefId, Arc<RRef>>,
  /// Known living forks of each owned reference.
  forks: HashMap<RRefId, HashSet<ForkId>>,
  /// Users awaiting their owner's acknowledgement.
  pending_users: HashMap<ForkId, Arc<RRef>>,
  /// Users pinned until the owner registers their forked child.
  pending_fork_requests: HashMap<ForkId, Arc<RRef>>,
  /// Acknowledgements that overtook the message introducing the user.
  pending_accepted_users: HashSet<ForkId>,
  /// Argument references pinned until the callee acks the message.
  pending_rref_args: HashMap<i64, Vec<Arc<RRef>>>,
}

impl TrackerState {
  fn new() -> Self {
    Self {
      owners: HashMap::with_capacity(consts::CAP_OWNER_TABLE),
      forks: HashMap::with_capacity(consts::CAP_FORK_TABLE),
      pending_users: HashMap::with_capacity(consts::CAP_PENDING_USERS),
      pending_fork_requests: HashMap::with_capacity(consts::CAP_PENDING_FORKS),
      pending_accepted_users: HashSet::with_capacity(consts::CAP_PENDING_ACCEPTS),
      pending_rref_args: HashMap::with_capacity(consts::CAP_PENDING_ARGS),
    }
  }

  /// Removes `fork_id` from the forks of `rref_id`.
  ///
  /// Removing the last fork drops the `forks` entry and returns the owner
  /// pin, released from `owners` in the same critical section.
  fn remove_fork(
    &mut self,
    rref_id: RRefId,
    fork_id: ForkId,
  ) -> Result<Option<Arc<RRef>>, ForkMissing> {
    let Some(rref_forks) = self.forks.get_mut(&rref_id) else {
      return Err(ForkMissing::UnknownRRef(rref_id));
    };

    if !rref_forks.remove(&fork_id) {
      return Err(ForkMissing::UnknownFork(fork_id));
    }

    if rref_forks.is_empty() {
      self.forks.remove(&rref_id);
      return Ok(self.owners.remove(&rref_id));
    }

    Ok(None)
  }
}

// -----------------------------------------------------------------------------
// Tracker Shared
// -----------------------------------------------------------------------------

struct TrackerShared {
  agent: std::sync::Arc<dyn RpcAgent>,
  ids: IdAllocator,
  state: Mutex<TrackerState>,
}

// -----------------------------------------------------------------------------
// RRef Tracker
// -----------------------------------------------------------------------------

/// The node-local fork-tracking core.
///
/// `RRefTracker` is a cheaply-cloneable handle; clones share one set of
/// tables. Reply callbacks capture a clone and re-enter through the public
/// mutex-taking methods, so the mutex is never held across an agent
/// [`send`].
///
/// # Lifetime Protocol
///
/// For each owned reference the distributed count is the size of its fork
/// set plus creations in flight. An owner stays pinned in `owners` exactly
/// while its fork set is non-empty; removing the last fork releases the pin
/// in the same critical section. Users are pinned by `pending_users` until
/// acknowledged and by `pending_fork_requests` while a child fork awaits
/// registration; once both pins are gone, dropping the last application
/// handle tears the user down and notifies the owner.
///
/// Messages between a pair of workers are not assumed to arrive in order.
/// Two tables absorb the races: `pending_accepted_users` buffers an
/// acknowledgement that overtakes the message introducing the user, and
/// `pending_fork_requests` keeps a forking user alive so its teardown
/// cannot overtake the fork registration at the owner.
///
/// [`send`]: RpcAgent::send
#[derive(Clone)]
pub struct RRefTracker {
  shared: Arc<TrackerShared>,
}

impl RRefTracker {
  /// Creates a tracker backed by the given agent.
  pub fn new(agent: std::sync::Arc<dyn RpcAgent>) -> Self {
    let worker: WorkerId = agent.self_info().id();

    Self {
      shared: Arc::new(TrackerShared {
        agent,
        ids: IdAllocator::new(worker),
        state: Mutex::new(TrackerState::new()),
      }),
    }
  }

  // ---------------------------------------------------------------------------
  // Lifecycle
  // ---------------------------------------------------------------------------

  /// Installs the process-wide tracker.
  ///
  /// Raises a `lifecycle` error if a tracker is already installed.
  pub fn init(agent: std::sync::Arc<dyn RpcAgent>) {
    if TRACKER.set(Self::new(agent)).is_err() {
      raise!(Lifecycle, "tracker initialized twice");
    }
  }

  /// Returns the process-wide tracker.
  ///
  /// Raises a `lifecycle` error if [`init`] has not been called.
  ///
  /// [`init`]: RRefTracker::init
  pub fn instance() -> &'static Self {
    match TRACKER.get() {
      Some(tracker) => tracker,
      None => raise!(Lifecycle, "tracker used before initialization"),
    }
  }

  // ---------------------------------------------------------------------------
  // Accessors
  // ---------------------------------------------------------------------------

  /// Returns the agent this tracker sends through.
  #[inline]
  pub fn agent(&self) -> &std::sync::Arc<dyn RpcAgent> {
    &self.shared.agent
  }

  /// Returns the local worker id.
  #[inline]
  pub fn worker_id(&self) -> WorkerId {
    self.shared.ids.worker()
  }

  /// Returns the local worker name.
  #[inline]
  pub fn worker_name(&self) -> String {
    self.shared.agent.self_info().name().to_owned()
  }

  /// Mints a globally unique identifier.
  #[inline]
  pub fn next_id(&self) -> GlobalId {
    self.shared.ids.next_id()
  }

  // ---------------------------------------------------------------------------
  // Construction & Lookup
  // ---------------------------------------------------------------------------

  /// Constructs a user reference with freshly minted ids.
  pub fn create_user(&self, owner: WorkerId) -> Arc<RRef> {
    self.create_user_from(owner, self.next_id(), self.next_id())
  }

  /// Constructs a user reference from known ids.
  ///
  /// If the owner's acknowledgement already arrived, the early accept is
  /// consumed; otherwise the new user is pinned in `pending_users` until
  /// the acknowledgement lands.
  ///
  /// Raises a `protocol` error if `owner` is the local worker or if a user
  /// with this `fork_id` is already pending.
  pub fn create_user_from(&self, owner: WorkerId, rref_id: RRefId, fork_id: ForkId) -> Arc<RRef> {
    if owner == self.worker_id() {
      raise!(
        Protocol,
        format!("owner of {rref_id} cannot create a user of it"),
      );
    }

    let user: Arc<RRef> = {
      let mut state = self.shared.state.lock();

      if state.pending_users.contains_key(&fork_id) {
        raise!(
          Protocol,
          format!("attempt to create user {fork_id} twice"),
        );
      }

      let user: Arc<RRef> = Arc::new(RRef::User(UserRef::new(
        owner,
        rref_id,
        fork_id,
        std::sync::Arc::clone(&self.shared.agent),
      )));

      if !state.pending_accepted_users.remove(&fork_id) {
        state.pending_users.insert(fork_id, Arc::clone(&user));
      }

      user
    };

    tracing::debug!(rref = %rref_id, fork = %fork_id, owner = %owner, "User Create");

    user
  }

  /// Returns the owning reference for `rref_id`, constructing and pinning
  /// it on first sight.
  pub fn get_or_create_owner(&self, rref_id: RRefId) -> Arc<RRef> {
    let (owner, created): (Arc<RRef>, bool) = {
      let mut state = self.shared.state.lock();

      match state.owners.get(&rref_id) {
        Some(owner) => (Arc::clone(owner), false),
        None => {
          let owner: Arc<RRef> = Arc::new(RRef::Owner(OwnerRef::new(rref_id)));

          state.owners.insert(rref_id, Arc::clone(&owner));

          (owner, true)
        }
      }
    };

    if created {
      tracing::debug!(rref = %rref_id, "Owner Create");
    }

    owner
  }

  /// Returns the reference for the given ids: the local owner if this
  /// worker owns it, a newly constructed user otherwise.
  pub fn get_or_create_rref(&self, owner: WorkerId, rref_id: RRefId, fork_id: ForkId) -> Arc<RRef> {
    if owner == self.worker_id() {
      self.get_or_create_owner(rref_id)
    } else {
      self.create_user_from(owner, rref_id, fork_id)
    }
  }

  // ---------------------------------------------------------------------------
  // Forking
  // ---------------------------------------------------------------------------

  /// Forks `rref` for transmission to `fork_dst`.
  ///
  /// The reference is staged in the calling context so it stays pinned for
  /// the duration of the enclosing RPC. Cross-worker tracking depends on
  /// who forks:
  ///
  /// - to the owner itself: nothing to track, the callee resolves to its
  ///   local owner;
  /// - from the owner: the new fork is registered eagerly and
  ///   `USER_ACCEPT` is sent to the destination; the callee's ack releases
  ///   the creation-in-flight entry;
  /// - from a user: the forking user is pinned in `pending_fork_requests`
  ///   and `FORK_NOTIFY` is sent to the owner; the owner's `FORK_ACCEPT`
  ///   releases the pin.
  pub fn fork_to(&self, rref: &Arc<RRef>, fork_dst: WorkerId) -> ForkDescriptor {
    args::push(Arc::clone(rref));

    let descriptor: ForkDescriptor = rref.fork(&self.shared.ids);

    if rref.owner_worker() != fork_dst {
      if rref.is_owner() {
        let message: Message = self.accept_user_rref(descriptor.rref_id(), descriptor.fork_id());
        let dst: WorkerInfo = self.shared.agent.worker_info(fork_dst);

        let this: Self = self.clone();
        let rref_id: RRefId = descriptor.rref_id();
        let fork_id: ForkId = descriptor.fork_id();

        self.shared.agent.send(&dst, message).on_reply(move |message| {
          Self::handle_exception(&message);
          this.del_fork_of_owner(rref_id, fork_id);
        });
      } else {
        {
          let mut state = self.shared.state.lock();

          state
            .pending_fork_requests
            .insert(descriptor.fork_id(), Arc::clone(rref));
        }

        let message: Message = ForkNotify {
          rref_id: descriptor.rref_id(),
          fork_id: descriptor.fork_id(),
          fork_dst,
        }
        .into_message();

        let dst: WorkerInfo = self.shared.agent.worker_info(rref.owner_worker());
        let this: Self = self.clone();

        self.shared.agent.send(&dst, message).on_reply(move |message| {
          Self::handle_exception(&message);

          let accept: ForkAccept =
            ForkAccept::from_message(&message).unwrap_or_else(|error| raise!(error));

          this.finish_fork_request(accept.fork_id);
        });
      }
    }

    tracing::trace!(rref = %descriptor.rref_id(), fork = %descriptor.fork_id(), dst = %fork_dst, "Fork");

    descriptor
  }

  /// Registers a newly learned user on the owner and builds the outgoing
  /// `USER_ACCEPT` addressed to it.
  pub fn accept_user_rref(&self, rref_id: RRefId, fork_id: ForkId) -> Message {
    self.add_fork_of_owner(rref_id, fork_id);

    UserAccept { rref_id, fork_id }.into_message()
  }

  /// Handles a user-to-user fork notification on the owner.
  ///
  /// Sends `USER_ACCEPT` to the fork destination (its ack releases the
  /// creation-in-flight entry) and returns the `FORK_ACCEPT` reply for the
  /// forking user.
  pub fn accept_fork_request(
    &self,
    rref_id: RRefId,
    fork_id: ForkId,
    fork_dst: WorkerId,
  ) -> Message {
    let message: Message = self.accept_user_rref(rref_id, fork_id);
    let dst: WorkerInfo = self.shared.agent.worker_info(fork_dst);

    let this: Self = self.clone();

    self.shared.agent.send(&dst, message).on_reply(move |message| {
      Self::handle_exception(&message);
      this.del_fork_of_owner(rref_id, fork_id);
    });

    ForkAccept { fork_id }.into_message()
  }

  /// Handles the owner's `FORK_ACCEPT` on the forking user: the pin on the
  /// parent is released.
  ///
  /// Raises a `protocol` error if no fork request is pending for
  /// `fork_id`.
  pub fn finish_fork_request(&self, fork_id: ForkId) {
    let finished: Option<Arc<RRef>> = {
      let mut state = self.shared.state.lock();

      state.pending_fork_requests.remove(&fork_id)
    };

    if finished.is_none() {
      raise!(
        Protocol,
        format!("no pending fork request for {fork_id}"),
      );
    }

    tracing::debug!(fork = %fork_id, "Fork Accept");

    // `finished` drops here, outside the critical section; releasing the
    // pin may tear the parent user down and send.
  }

  /// Handles `USER_ACCEPT` on the user's worker.
  ///
  /// Pairs the acknowledgement with the locally constructed user, or
  /// records it in `pending_accepted_users` when the acknowledgement
  /// overtook the message introducing the user.
  ///
  /// Raises a `protocol` error on a second accept for the same fork, or if
  /// the pending user's reference id does not match.
  pub fn finish_user_rref(&self, rref_id: RRefId, fork_id: ForkId) {
    let finished: Option<Arc<RRef>> = {
      let mut state = self.shared.state.lock();

      if state.pending_accepted_users.contains(&fork_id) {
        raise!(
          Protocol,
          format!("attempt to accept user {fork_id} twice"),
        );
      }

      match state.pending_users.remove(&fork_id) {
        Some(user) => {
          if user.rref_id() != rref_id {
            raise!(
              Protocol,
              format!(
                "accept for fork {fork_id} names {rref_id}, expected {}",
                user.rref_id(),
              ),
            );
          }

          Some(user)
        }
        None => {
          state.pending_accepted_users.insert(fork_id);

          None
        }
      }
    };

    tracing::debug!(rref = %rref_id, fork = %fork_id, early = finished.is_none(), "User Accept");
  }

  // ---------------------------------------------------------------------------
  // Fork Bookkeeping
  // ---------------------------------------------------------------------------

  /// Registers `fork_id` as a living fork of `rref_id`.
  ///
  /// Raises a `protocol` error if the fork is already registered.
  pub fn add_fork_of_owner(&self, rref_id: RRefId, fork_id: ForkId) {
    {
      let mut state = self.shared.state.lock();

      let rref_forks: &mut HashSet<ForkId> = state
        .forks
        .entry(rref_id)
        .or_insert_with(|| HashSet::with_capacity(consts::CAP_FORKS_PER_OWNER));

      if !rref_forks.insert(fork_id) {
        raise!(
          Protocol,
          format!("fork {fork_id} of {rref_id} registered twice"),
        );
      }
    }

    tracing::trace!(rref = %rref_id, fork = %fork_id, "Fork Add");
  }

  /// Removes `fork_id` from the forks of `rref_id`.
  ///
  /// Removing the last fork releases the owner pin in the same critical
  /// section; this is the terminal event that lets the owned value go.
  ///
  /// Raises a `protocol` error if the reference or the fork is unknown.
  pub fn del_fork_of_owner(&self, rref_id: RRefId, fork_id: ForkId) {
    let released: Option<Arc<RRef>> = {
      let mut state = self.shared.state.lock();

      match state.remove_fork(rref_id, fork_id) {
        Ok(released) => released,
        Err(error) => raise!(Protocol, error),
      }
    };

    if released.is_some() {
      tracing::debug!(rref = %rref_id, "Owner Release");
    } else {
      tracing::trace!(rref = %rref_id, fork = %fork_id, "Fork Del");
    }
  }

  /// Handles `USER_DELETE` on the owner.
  ///
  /// A fork that was only ever tracked as a creation in flight has already
  /// been released by the construction ack; its eventual delete is ignored
  /// rather than raised.
  pub fn finish_user_delete(&self, rref_id: RRefId, fork_id: ForkId) {
    let released: Result<Option<Arc<RRef>>, ForkMissing> = {
      let mut state = self.shared.state.lock();

      state.remove_fork(rref_id, fork_id)
    };

    match &released {
      Ok(Some(_)) => tracing::debug!(rref = %rref_id, "Owner Release"),
      Ok(None) => tracing::trace!(rref = %rref_id, fork = %fork_id, "User Deleted"),
      Err(_) => tracing::trace!(rref = %rref_id, fork = %fork_id, "Stale User Delete"),
    }
  }

  // ---------------------------------------------------------------------------
  // Argument Pinning
  // ---------------------------------------------------------------------------

  /// Transfers every reference staged in the calling context into the
  /// pinned-argument table under `message_id`.
  ///
  /// Raises a `protocol` error if arguments are already pinned for this
  /// message.
  pub fn add_rref_args(&self, message_id: i64) {
    let staged: Vec<Arc<RRef>> = args::take();

    let mut state = self.shared.state.lock();

    if state.pending_rref_args.contains_key(&message_id) {
      raise!(
        Protocol,
        format!("arguments for message {message_id} pinned twice"),
      );
    }

    state.pending_rref_args.insert(message_id, staged);
  }

  /// Releases the argument references pinned under `message_id`; the
  /// callee has acked the message.
  ///
  /// Raises a `protocol` error if nothing is pinned for this message.
  pub fn del_rref_args(&self, message_id: i64) {
    let released: Vec<Arc<RRef>> = {
      let mut state = self.shared.state.lock();

      match state.pending_rref_args.remove(&message_id) {
        Some(pinned) => pinned,
        None => raise!(
          Protocol,
          format!("no pinned arguments for message {message_id}"),
        ),
      }
    };

    // `released` drops here, outside the critical section; the last pin on
    // a user tears it down and sends.
    drop(released);
  }

  // ---------------------------------------------------------------------------
  // Message Handling
  // ---------------------------------------------------------------------------

  /// Dispatches an incoming tracker message and returns the reply.
  ///
  /// Application `CALL` messages are routed by the host, not the tracker;
  /// receiving one here raises, as does any kind that only ever travels as
  /// a reply.
  pub fn handle_request(&self, message: &Message) -> Message {
    match message.kind() {
      MessageKind::UserAccept => {
        let frame: UserAccept =
          UserAccept::from_message(message).unwrap_or_else(|error| raise!(error));

        self.finish_user_rref(frame.rref_id, frame.fork_id);

        Message::ack()
      }
      MessageKind::ForkNotify => {
        let frame: ForkNotify =
          ForkNotify::from_message(message).unwrap_or_else(|error| raise!(error));

        self.accept_fork_request(frame.rref_id, frame.fork_id, frame.fork_dst)
      }
      MessageKind::UserDelete => {
        let frame: UserDelete =
          UserDelete::from_message(message).unwrap_or_else(|error| raise!(error));

        self.finish_user_delete(frame.rref_id, frame.fork_id);

        Message::ack()
      }
      kind => raise!(Protocol, format!("unexpected {kind} request")),
    }
  }

  /// Re-raises a remote worker's error on the calling thread.
  ///
  /// Reply callbacks run this first: an `EXCEPTION` arriving where a reply
  /// was expected is decoded, logged, and raised as a `remote` error.
  pub fn handle_exception(message: &Message) {
    if message.kind() == MessageKind::Exception {
      let frame: RemoteException =
        RemoteException::from_message(message).unwrap_or_else(|error| raise!(error));

      tracing::error!(error = %frame.error, "Remote Exception");

      raise!(Remote, frame.error);
    }
  }

  // ---------------------------------------------------------------------------
  // Introspection
  // ---------------------------------------------------------------------------

  /// Returns the per-table entry counts in a single critical section.
  pub fn stats(&self) -> TrackerStats {
    let state = self.shared.state.lock();

    TrackerStats {
      owners: state.owners.len(),
      forks: state.forks.values().map(HashSet::len).sum(),
      pending_users: state.pending_users.len(),
      pending_fork_requests: state.pending_fork_requests.len(),
      pending_accepted_users: state.pending_accepted_users.len(),
      pending_rref_args: state.pending_rref_args.len(),
    }
  }

  /// Returns `true` if `rref_id` is pinned in the owner table.
  pub fn has_owner(&self, rref_id: RRefId) -> bool {
    self.shared.state.lock().owners.contains_key(&rref_id)
  }

  /// Returns `true` if `fork_id` is a tracked fork of `rref_id`.
  pub fn tracks_fork(&self, rref_id: RRefId, fork_id: ForkId) -> bool {
    self
      .shared
      .state
      .lock()
      .forks
      .get(&rref_id)
      .is_some_and(|rref_forks| rref_forks.contains(&fork_id))
  }

  /// Returns the number of tracked forks of `rref_id`.
  pub fn fork_count(&self, rref_id: RRefId) -> usize {
    self
      .shared
      .state
      .lock()
      .forks
      .get(&rref_id)
      .map_or(0, HashSet::len)
  }

  /// Returns `true` if a locally constructed user with `fork_id` awaits
  /// its owner's acknowledgement.
  pub fn has_pending_user(&self, fork_id: ForkId) -> bool {
    self.shared.state.lock().pending_users.contains_key(&fork_id)
  }

  /// Returns `true` if an acknowledgement for `fork_id` arrived before the
  /// user was constructed.
  pub fn has_pending_accepted_user(&self, fork_id: ForkId) -> bool {
    self
      .shared
      .state
      .lock()
      .pending_accepted_users
      .contains(&fork_id)
  }

  /// Returns the number of references pinned for `message_id`, or `None`
  /// if nothing is pinned.
  pub fn pending_arg_count(&self, message_id: i64) -> Option<usize> {
    self
      .shared
      .state
      .lock()
      .pending_rref_args
      .get(&message_id)
      .map(Vec::len)
  }

  /// Returns `true` if every table is empty.
  pub fn is_quiescent(&self) -> bool {
    let state = self.shared.state.lock();

    state.owners.is_empty()
      && state.forks.is_empty()
      && state.pending_users.is_empty()
      && state.pending_fork_requests.is_empty()
      && state.pending_accepted_users.is_empty()
      && state.pending_rref_args.is_empty()
  }
}

impl Debug for RRefTracker {
  fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
    f.debug_struct("RRefTracker")
      .field("worker", &self.worker_id())
      .field("stats", &self.stats())
      .finish()
  }
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------
