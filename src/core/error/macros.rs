//! Internal error handling macros.
//!
//! The tracker has no recoverable errors of its own: everything that can go
//! wrong at this layer is a broken protocol invariant, lifecycle misuse, a
//! malformed wire frame, or an error raised by a remote worker. All of them
//! surface through [`raise!`], which panics with a structured diagnostic on
//! the offending thread.

/// Panics with a structured [`Exception`].
///
/// The short form builds the exception from a failure category and a
/// message:
///
/// ```ignore
/// raise!(Protocol, "attempt to create the same user twice");
/// ```
///
/// The long form re-raises an existing exception, e.g. one returned by a
/// frame decoder:
///
/// ```ignore
/// raise!(exception);
/// ```
///
/// [`Exception`]: crate::error::Exception
macro_rules! raise {
  ($group:ident, $error:expr $(,)?) => {
    $crate::core::raise!($crate::error::Exception::new(
      $crate::error::ExceptionGroup::$group,
      $error,
    ))
  };
  ($exception:expr $(,)?) => {
    ::std::panic!("{}:{}: {}", ::std::file!(), ::std::line!(), $exception)
  };
}

pub(crate) use raise;
