use std::fmt::Debug;
use std::fmt::Formatter;
use std::fmt::Result as FmtResult;
use std::sync::OnceLock;
use tokio::sync::Notify;
use tokio::sync::futures::Notified;

use crate::core::RRefId;
use crate::core::raise;
use crate::rref::Value;

/// The owning side of a remote reference.
///
/// The owner holds the value slot. The value may not exist yet when users
/// are already being handed out (the computation producing it is typically
/// in flight), so the slot is set-once and waiters park on a [`Notify`]
/// until it lands.
pub struct OwnerRef {
  rref_id: RRefId,
  value: OnceLock<Box<dyn Value>>,
  ready: Notify,
}

impl OwnerRef {
  /// Creates a new owning reference with an empty value slot.
  #[inline]
  pub(crate) fn new(rref_id: RRefId) -> Self {
    Self {
      rref_id,
      value: OnceLock::new(),
      ready: Notify::new(),
    }
  }

  /// Returns the identifier of this reference.
  #[inline]
  pub const fn rref_id(&self) -> RRefId {
    self.rref_id
  }

  /// Stores the owned value and wakes all waiters.
  ///
  /// The slot is set-once; storing a second value is a broken protocol
  /// invariant and raises.
  pub fn set_value(&self, value: Box<dyn Value>) {
    if self.value.set(value).is_err() {
      raise!(
        Protocol,
        format!("value of {} set twice", self.rref_id),
      );
    }

    self.ready.notify_waiters();
  }

  /// Returns the owned value, or `None` if it has not landed yet.
  #[inline]
  pub fn try_value(&self) -> Option<&dyn Value> {
    self.value.get().map(Box::as_ref)
  }

  /// Returns the owned value, waiting for it to land if necessary.
  pub async fn wait_value(&self) -> &dyn Value {
    loop {
      let notified: Notified<'_> = self.ready.notified();

      if let Some(value) = self.value.get() {
        return value.as_ref();
      }

      notified.await;
    }
  }

  /// Returns a clone of the owned value, or `None` if it has not landed.
  #[inline]
  pub fn clone_value(&self) -> Option<Box<dyn Value>> {
    self
      .value
      .get()
      .map(|value| dyn_clone::clone_box(value.as_ref()))
  }
}

impl Debug for OwnerRef {
  fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
    f.debug_struct("OwnerRef")
      .field("rref_id", &self.rref_id)
      .field("value", &self.value.get())
      .finish_non_exhaustive()
  }
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------
