use std::fmt::Display;
use std::fmt::Formatter;
use std::fmt::Result;

/// Exception error category.
///
/// Groups map one-to-one onto the failure modes of the tracker: broken
/// protocol invariants, misuse of the singleton lifecycle, malformed wire
/// frames, and errors raised by remote workers.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
#[non_exhaustive]
pub enum ExceptionGroup {
  /// A malformed or truncated wire frame.
  Codec,
  /// Misuse of the tracker lifecycle (double init, use before init).
  Lifecycle,
  /// A broken reference-counting protocol invariant.
  Protocol,
  /// An error raised by a remote worker.
  Remote,
}

impl Display for ExceptionGroup {
  fn fmt(&self, f: &mut Formatter<'_>) -> Result {
    match self {
      Self::Codec => f.write_str("codec"),
      Self::Lifecycle => f.write_str("lifecycle"),
      Self::Protocol => f.write_str("protocol"),
      Self::Remote => f.write_str("remote"),
    }
  }
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------
