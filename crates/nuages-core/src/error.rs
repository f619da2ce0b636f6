//! Signal and action error types.
//!
//! This module defines the error types shared by the signal abstraction and
//! the action system.

use thiserror::Error;

/// Result type for signal write operations.
pub type SignalResult<T> = Result<T, SignalError>;

/// Result type for action execution.
pub type ActionResult<T> = Result<T, ActionError>;

/// Signal access errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SignalError {
	/// Write attempted on a signal that is not writable.
	#[error("signal is not writable")]
	NotWritable,

	/// Operation required the signal's value, but none is available.
	#[error("signal value is unavailable")]
	Unavailable,
}

/// Action execution errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ActionError {
	/// Action performed while `is_ready()` was false.
	#[error("action performed while not ready")]
	NotReady,

	/// Signal access failed while the action ran.
	#[error("signal access failed: {0}")]
	Signal(#[from] SignalError),
}
