//! Randomized protocol properties on a simulated cluster.
//!
//! Worker 0 owns every reference; workers 1 and 2 create, fork, and drop
//! users while messages are delivered in arbitrary order. After every step
//! the pending-user and early-accept sets must not overlap; after all
//! handles are gone and the bus has drained, every tracker must be back to
//! its initial state and no identifier may have been minted twice.

mod common;

use proptest::collection::vec;
use proptest::prelude::*;
use triomphe::Arc;

use tether::rref::ForkDescriptor;
use tether::rref::RRef;
use tether::track::RRefTracker;
use tether::types::ForkId;
use tether::types::WorkerId;

use crate::common::SimCluster;
use crate::common::remote_create;

#[derive(Clone, Copy, Debug)]
enum Op {
  /// A worker asks the owner to create a value and holds the user for it.
  Create { caller: u8 },
  /// A worker forks one of its users to another worker.
  Fork { user: u8, dst: u8 },
  /// The introducing call of an earlier fork reaches its destination.
  Intro { slot: u8 },
  /// A worker drops its application handle to a user.
  Drop { user: u8 },
  /// One in-flight message, chosen arbitrarily, is delivered.
  Deliver { slot: u8 },
}

fn op_strategy() -> impl Strategy<Value = Op> {
  prop_oneof![
    (0..2_u8).prop_map(|caller| Op::Create { caller }),
    (any::<u8>(), 0..2_u8).prop_map(|(user, dst)| Op::Fork { user, dst }),
    any::<u8>().prop_map(|slot| Op::Intro { slot }),
    any::<u8>().prop_map(|user| Op::Drop { user }),
    any::<u8>().prop_map(|slot| Op::Deliver { slot }),
  ]
}

/// An introduction still in flight: the fork has been sent but the
/// destination has not constructed its user yet.
struct PendingIntro {
  holder: usize,
  dst: usize,
  message_id: i64,
  descriptor: ForkDescriptor,
}

proptest! {
  #![proptest_config(ProptestConfig::with_cases(64))]

  #[test]
  fn random_interleavings_drain_clean(
    ops in vec(op_strategy(), 1..48),
    drain_seed in vec(any::<u8>(), 1..8),
  ) {
    let (cluster, trackers): (SimCluster, Vec<RRefTracker>) = SimCluster::new(3);

    let mut users: Vec<(usize, Arc<RRef>)> = Vec::new();
    let mut intros: Vec<PendingIntro> = Vec::new();
    let mut minted: Vec<ForkId> = Vec::new();

    for op in ops {
      match op {
        Op::Create { caller } => {
          let caller: usize = 1 + caller as usize % 2;
          let user: Arc<RRef> = remote_create(&cluster, &trackers[caller], &trackers[0]);

          minted.push(user.fork_id());
          users.push((caller, user));
        }
        Op::Fork { user, dst } => {
          if users.is_empty() {
            continue;
          }

          let index: usize = user as usize % users.len();
          let dst: usize = 1 + dst as usize % 2;
          let holder: usize = users[index].0;

          let message_id: i64 = cluster.next_message_id();
          let descriptor: ForkDescriptor =
            trackers[holder].fork_to(&users[index].1, WorkerId::from_bits(dst as u16));

          trackers[holder].add_rref_args(message_id);
          minted.push(descriptor.fork_id());
          intros.push(PendingIntro {
            holder,
            dst,
            message_id,
            descriptor,
          });
        }
        Op::Intro { slot } => {
          if intros.is_empty() {
            continue;
          }

          let intro: PendingIntro = intros.swap_remove(slot as usize % intros.len());
          let child: Arc<RRef> = trackers[intro.dst].get_or_create_rref(
            intro.descriptor.owner(),
            intro.descriptor.rref_id(),
            intro.descriptor.fork_id(),
          );

          users.push((intro.dst, child));
          trackers[intro.holder].del_rref_args(intro.message_id);
        }
        Op::Drop { user } => {
          if users.is_empty() {
            continue;
          }

          let index: usize = user as usize % users.len();

          users.swap_remove(index);
        }
        Op::Deliver { slot } => {
          if cluster.pending() == 0 {
            continue;
          }

          cluster.step_at(slot as usize % cluster.pending());
        }
      }

      for fork_id in &minted {
        for tracker in &trackers {
          prop_assert!(
            !(tracker.has_pending_user(*fork_id)
              && tracker.has_pending_accepted_user(*fork_id)),
            "fork {fork_id} pending and early-accepted at once",
          );
        }
      }
    }

    // Land the introductions still in flight, then let go of every handle.
    for intro in intros.drain(..) {
      let child: Arc<RRef> = trackers[intro.dst].get_or_create_rref(
        intro.descriptor.owner(),
        intro.descriptor.rref_id(),
        intro.descriptor.fork_id(),
      );

      users.push((intro.dst, child));
      trackers[intro.holder].del_rref_args(intro.message_id);
    }

    users.clear();

    let mut turn: usize = 0;

    while cluster.pending() > 0 {
      let slot: usize = drain_seed[turn % drain_seed.len()] as usize % cluster.pending();

      cluster.step_at(slot);
      turn += 1;
    }

    for tracker in &trackers {
      prop_assert!(tracker.is_quiescent(), "leftover state: {tracker:?}");
    }

    let mut unique: Vec<ForkId> = minted.clone();

    unique.sort();
    unique.dedup();

    prop_assert_eq!(unique.len(), minted.len(), "identifier minted twice");
  }
}
