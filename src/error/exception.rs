use std::error::Error;
use std::fmt::Debug;
use std::fmt::Display;
use std::fmt::Formatter;
use std::fmt::Result;

use crate::error::ExceptionGroup;

/// A tracker exception: a failure category and a message.
///
/// The tracker has a single severity tier. Nothing at this layer is
/// recoverable, so exceptions carry no class hierarchy and no retry
/// information: a value of this type is either returned from a fallible
/// decode path or handed to the internal `raise!` macro, which panics with
/// it on the offending thread. An error raised by a remote worker arrives
/// as an `EXCEPTION` wire message and is rebuilt with the [`Remote`] group
/// before being re-raised on the callback thread.
///
/// # Display Format
///
/// Exceptions format as: `error:{group} - {message}`
///
/// Example: `error:protocol - attempt to accept user #Gid<1.2> twice`
///
/// [`Remote`]: ExceptionGroup::Remote
pub struct Exception {
  group: ExceptionGroup,
  error: Box<str>,
}

impl Exception {
  /// Creates a new exception in the given category.
  ///
  /// # Examples
  ///
  /// ```
  /// use tether::error::{Exception, ExceptionGroup};
  ///
  /// let exception = Exception::new(ExceptionGroup::Codec, "truncated frame");
  /// ```
  #[inline]
  pub fn new<T>(group: ExceptionGroup, error: T) -> Self
  where
    T: Display,
  {
    Self {
      group,
      error: error.to_string().into_boxed_str(),
    }
  }

  /// Returns the failure category.
  #[inline]
  pub const fn group(&self) -> ExceptionGroup {
    self.group
  }

  /// Returns the human-readable error message.
  #[inline]
  pub fn error(&self) -> &str {
    &self.error
  }
}

impl Debug for Exception {
  fn fmt(&self, f: &mut Formatter<'_>) -> Result {
    Display::fmt(self, f)
  }
}

impl Display for Exception {
  fn fmt(&self, f: &mut Formatter<'_>) -> Result {
    write!(f, "error:{} - {}", self.group, self.error)
  }
}

impl Error for Exception {}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------
