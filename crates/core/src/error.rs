//! # Error Types
//!
//! Failures fall into two families:
//!
//! - **Engine errors** are raised synchronously while a graph is being
//!   built or mutated: a missing operand, a blank name, an operator the
//!   value type cannot support, or a write to a derived entity.
//! - **Domain errors** come from the values themselves (integer overflow,
//!   division by zero, a custom type rejecting mismatched units). The engine
//!   has no knowledge to recover from these, so they travel out of
//!   `resolve()` untouched.

use thiserror::Error;

/// Errors produced by the entity engine.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EntityError {
    /// A required operand or argument was absent.
    #[error("Argument `{argument}` must not be null")]
    ArgumentNull { argument: &'static str },

    /// An argument was present but unusable (blank name, blank label, ...).
    #[error("Invalid argument `{argument}`: {reason}")]
    ArgumentInvalid {
        argument: &'static str,
        reason: String,
    },

    /// Neither the built-in fast path nor a registered capability applies.
    #[error(
        "operator `{operator}` is not supported for type `{type_name}`; implement `{capability}` and register it with `Capabilities::{registration}`"
    )]
    UnsupportedOperation {
        operator: &'static str,
        type_name: &'static str,
        capability: &'static str,
        registration: &'static str,
    },

    /// The entity cannot perform the requested state change.
    #[error("Invalid operation: {reason}")]
    InvalidState { reason: String },

    /// An error raised by a value's own arithmetic or by a user closure.
    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl EntityError {
    pub(crate) fn invalid(argument: &'static str, reason: impl Into<String>) -> Self {
        EntityError::ArgumentInvalid {
            argument,
            reason: reason.into(),
        }
    }
}

/// An error raised by value arithmetic or a user-supplied compute closure.
///
/// Capability implementations return this to reject inputs they cannot
/// combine; the engine forwards it unchanged.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct DomainError {
    pub message: String,
}

impl DomainError {
    /// Create a domain error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub(crate) fn overflow(operator: &str) -> Self {
        Self::new(format!("arithmetic overflow in `{}`", operator))
    }

    pub(crate) fn division_by_zero() -> Self {
        Self::new("attempt to divide by zero")
    }
}
