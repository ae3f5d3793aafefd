//! Tracker configuration constants and default values.
//!
//! These constants size the tracker tables and fix the wire format of
//! identifiers. Capacities are starting points for the hash tables, not
//! limits; the tables grow as the cluster creates references.

// -----------------------------------------------------------------------------
// Wire Format
// -----------------------------------------------------------------------------

/// Number of bytes used by a [`GlobalId`] on the wire.
///
/// A big-endian `u16` worker id followed by a big-endian `u64` local id.
///
/// [`GlobalId`]: crate::types::GlobalId
pub const GLOBAL_ID_WIRE_BYTES: usize = 10;

/// Message id of a message that has not been assigned one by the agent.
pub const UNASSIGNED_MESSAGE_ID: i64 = -1;

// -----------------------------------------------------------------------------
// Memory Allocation
// -----------------------------------------------------------------------------

/// Initial capacity of the owner table.
pub const CAP_OWNER_TABLE: usize = 64;

/// Initial capacity of the per-owner fork table.
pub const CAP_FORK_TABLE: usize = 64;

/// Initial capacity of the set of forks tracked for a single owner.
pub const CAP_FORKS_PER_OWNER: usize = 8;

/// Initial capacity of the pending-user table.
pub const CAP_PENDING_USERS: usize = 32;

/// Initial capacity of the pending-fork-request table.
pub const CAP_PENDING_FORKS: usize = 32;

/// Initial capacity of the early-accept set.
pub const CAP_PENDING_ACCEPTS: usize = 32;

/// Initial capacity of the pinned-argument table.
pub const CAP_PENDING_ARGS: usize = 32;
