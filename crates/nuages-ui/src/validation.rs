//! Candidate-versus-committed bookkeeping for validated text bindings.
//!
//! A validated input keeps two values apart: the committed value living in
//! the upstream signal, and the candidate the user is currently typing. A
//! candidate that fails to parse stays here, keeps being displayed, and
//! never touches the signal graph. The upstream signal stays authoritative:
//! when it changes identity, the candidate is discarded and the field
//! resyncs.

/// Validation state of one input binding.
#[derive(Debug, Clone, Default)]
pub(crate) struct ValidationState {
	candidate: Option<String>,
	message: Option<String>,
}

impl ValidationState {
	/// Records a rejected candidate and the reason it failed.
	pub fn reject(&mut self, candidate: String, message: String) {
		self.candidate = Some(candidate);
		self.message = Some(message);
	}

	/// Drops any held candidate; called on commit and on upstream resync.
	pub fn clear(&mut self) {
		self.candidate = None;
		self.message = None;
	}

	/// The text the user typed, while it fails validation.
	pub fn candidate(&self) -> Option<&str> {
		self.candidate.as_deref()
	}

	/// The failure message, while a rejected candidate is held.
	pub fn message(&self) -> Option<&str> {
		self.message.as_deref()
	}

	/// Returns true while a rejected candidate is held.
	pub fn is_invalid(&self) -> bool {
		self.message.is_some()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_starts_valid_and_empty() {
		let state = ValidationState::default();
		assert!(!state.is_invalid());
		assert_eq!(state.candidate(), None);
		assert_eq!(state.message(), None);
	}

	#[test]
	fn test_reject_holds_candidate_and_message() {
		let mut state = ValidationState::default();
		state.reject("12x".to_string(), "not a number".to_string());
		assert!(state.is_invalid());
		assert_eq!(state.candidate(), Some("12x"));
		assert_eq!(state.message(), Some("not a number"));
	}

	#[test]
	fn test_clear_resets_everything() {
		let mut state = ValidationState::default();
		state.reject("x".to_string(), "bad".to_string());
		state.clear();
		assert!(!state.is_invalid());
		assert_eq!(state.candidate(), None);
	}
}
