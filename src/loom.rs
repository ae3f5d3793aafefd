#[cfg(not(loom))]
pub(crate) mod export {
  pub(crate) mod sync {
    pub(crate) use parking_lot::Mutex;

    pub(crate) mod atomic {
      pub(crate) use std::sync::atomic::AtomicU64;
      pub(crate) use std::sync::atomic::Ordering;
    }
  }
}

#[cfg(loom)]
pub(crate) mod export {
  pub(crate) mod sync {
    pub(crate) mod atomic {
      pub(crate) use loom::sync::atomic::AtomicU64;
      pub(crate) use loom::sync::atomic::Ordering;
    }

    use loom::sync::MutexGuard;

    /// Mutex with the `parking_lot` locking API, backed by the
    /// loom-checked mutex.
    pub(crate) struct Mutex<T> {
      inner: loom::sync::Mutex<T>,
    }

    impl<T> Mutex<T> {
      pub(crate) fn new(value: T) -> Self {
        Self {
          inner: loom::sync::Mutex::new(value),
        }
      }

      pub(crate) fn lock(&self) -> MutexGuard<'_, T> {
        self.inner.lock().expect("mutex poisoned")
      }
    }
  }
}

#[doc(inline)]
pub(crate) use self::export::*;
