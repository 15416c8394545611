//! Error type shared by the containers.
//!
//! Misses (lookup or removal of an absent element) are never errors; they
//! surface as `None` or `false`. Only precondition violations land here.

use thiserror::Error;

/// Precondition violations reported by the containers.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Error)]
pub enum Error {
    /// `first()`/`last()` on an empty ordered container.
    #[error("no such element: the container is empty")]
    NoSuchElement,
    /// A cursor operation was called in a state that does not allow it.
    #[error("illegal cursor state: {0}")]
    IllegalState(&'static str),
}

pub type Result<T, E = Error> = core::result::Result<T, E>;
