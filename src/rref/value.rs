use dyn_clone::DynClone;
use std::any::Any;
use std::fmt::Debug;

/// The payload held by an owning reference.
///
/// The tracker is payload-agnostic; anything cloneable, printable, and
/// sendable across threads qualifies via the blanket implementation.
/// Callers recover the concrete type through [`as_any`].
///
/// [`as_any`]: Value::as_any
pub trait Value: Debug + DynClone + Send + Sync + 'static {
  /// Upcasts to [`Any`] for downcasting to the concrete payload type.
  fn as_any(&self) -> &dyn Any;
}

impl<T> Value for T
where
  T: Clone + Debug + Send + Sync + 'static,
{
  #[inline]
  fn as_any(&self) -> &dyn Any {
    self
  }
}

dyn_clone::clone_trait_object!(Value);

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------
