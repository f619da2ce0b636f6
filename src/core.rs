//! Signal layer: identity tokens, readable/duplex traits, combinators and
//! the action system.
//!
//! This module re-exports `nuages-core`, which has no host coupling and can
//! be used on its own for headless data-flow.
//!
//! # Examples
//!
//! ```rust,no_run
//! use nuages::core::{Readable, State, map};
//!
//! let celsius = State::new(21.0f64);
//! let fahrenheit = map(celsius.clone(), |c| c * 9.0 / 5.0 + 32.0);
//! assert_eq!(fahrenheit.try_read(), Some(69.8));
//! ```

pub use nuages_core::*;
