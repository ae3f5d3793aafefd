//! Error handling utilities for tracker errors.

mod macros;

pub(crate) use self::macros::raise;
