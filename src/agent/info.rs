use std::fmt::Display;
use std::fmt::Formatter;
use std::fmt::Result as FmtResult;

use crate::core::WorkerId;

/// Identity of a worker node: its cluster-wide id and human-readable name.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct WorkerInfo {
  id: WorkerId,
  name: String,
}

impl WorkerInfo {
  /// Creates a new `WorkerInfo`.
  #[inline]
  pub fn new<T>(id: WorkerId, name: T) -> Self
  where
    T: Into<String>,
  {
    Self {
      id,
      name: name.into(),
    }
  }

  /// Returns the worker id.
  #[inline]
  pub const fn id(&self) -> WorkerId {
    self.id
  }

  /// Returns the worker name.
  #[inline]
  pub fn name(&self) -> &str {
    self.name.as_str()
  }
}

impl Display for WorkerInfo {
  fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
    write!(f, "{}@{}", self.name, self.id)
  }
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------
