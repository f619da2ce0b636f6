//! Deferred effects.
//!
//! ## Overview
//!
//! An [`Action`] is an effect packaged for later: declaring one does
//! nothing, and the engine performs it only in response to a host event,
//! after checking [`Action::is_ready`]. Readiness is how effects stay
//! honest about unavailable or unwritable signals: a button wired to a
//! not-ready action renders disabled instead of failing at click time.
//!
//! Performing a not-ready action directly is a contract violation. Debug
//! builds assert; release builds log and return [`ActionError::NotReady`]
//! without side effects.

use std::rc::Rc;

use tracing::warn;

use crate::error::{ActionError, ActionResult, SignalError};
use crate::signal::{Duplex, Readable};

/// A deferred effect gated behind a readiness check.
pub trait Action {
	/// Returns true when performing would succeed right now.
	fn is_ready(&self) -> bool;

	/// Executes the effect.
	fn perform(&self) -> ActionResult<()>;

	/// Chains another action after this one.
	///
	/// The pair is ready only when both parts are. `next` is not attempted
	/// when this action fails.
	fn then<B>(self, next: B) -> Then<Self, B>
	where
		Self: Sized,
		B: Action,
	{
		Then { first: self, second: next }
	}
}

impl<A: Action + ?Sized> Action for Rc<A> {
	fn is_ready(&self) -> bool {
		(**self).is_ready()
	}

	fn perform(&self) -> ActionResult<()> {
		(**self).perform()
	}
}

fn guard_ready(ready: bool) -> ActionResult<()> {
	debug_assert!(ready, "action performed while not ready");
	if ready {
		Ok(())
	} else {
		warn!("action performed while not ready");
		Err(ActionError::NotReady)
	}
}

/// Sequencing of two actions. See [`Action::then`].
#[derive(Clone)]
pub struct Then<A, B> {
	first: A,
	second: B,
}

impl<A: Action, B: Action> Action for Then<A, B> {
	fn is_ready(&self) -> bool {
		self.first.is_ready() && self.second.is_ready()
	}

	fn perform(&self) -> ActionResult<()> {
		guard_ready(self.is_ready())?;
		self.first.perform()?;
		self.second.perform()
	}
}

/// Copies a source value into a target signal. See [`set`].
#[derive(Clone)]
pub struct Set<D, S> {
	target: D,
	source: S,
}

/// Creates an action that writes `source`'s current value into `target`.
///
/// Ready while the source is readable and the target writable. The value is
/// read at perform time, not at declaration time.
///
/// # Examples
///
/// ```
/// use nuages_core::{Action, State, set};
///
/// let draft = State::new(String::from("hello"));
/// let committed = State::new(String::new());
///
/// let save = set(committed.clone(), draft.clone());
/// assert!(save.is_ready());
/// save.perform().unwrap();
/// assert_eq!(committed.get(), "hello");
/// ```
pub fn set<D, S>(target: D, source: S) -> Set<D, S>
where
	D: Duplex,
	S: Readable<Value = D::Value>,
{
	Set { target, source }
}

impl<D, S> Action for Set<D, S>
where
	D: Duplex,
	S: Readable<Value = D::Value>,
{
	fn is_ready(&self) -> bool {
		self.source.is_readable() && self.target.is_writable()
	}

	fn perform(&self) -> ActionResult<()> {
		guard_ready(self.is_ready())?;
		let value = self.source.try_read().ok_or(SignalError::Unavailable)?;
		self.target.write(value)?;
		Ok(())
	}
}

/// Boolean flip. See [`toggle`].
#[derive(Clone)]
pub struct Toggle<D> {
	target: D,
}

/// Creates an action that inverts a boolean duplex signal.
pub fn toggle<D>(target: D) -> Toggle<D>
where
	D: Duplex<Value = bool>,
{
	Toggle { target }
}

impl<D: Duplex<Value = bool>> Action for Toggle<D> {
	fn is_ready(&self) -> bool {
		self.target.is_readable() && self.target.is_writable()
	}

	fn perform(&self) -> ActionResult<()> {
		guard_ready(self.is_ready())?;
		let value = self.target.try_read().ok_or(SignalError::Unavailable)?;
		self.target.write(!value)?;
		Ok(())
	}
}

/// List append. See [`push`].
#[derive(Clone)]
pub struct Push<D, S> {
	list: D,
	item: S,
}

/// Creates an action that appends `item`'s current value to a list signal.
pub fn push<T, D, S>(list: D, item: S) -> Push<D, S>
where
	T: Clone + 'static,
	D: Duplex<Value = Vec<T>>,
	S: Readable<Value = T>,
{
	Push { list, item }
}

impl<T, D, S> Action for Push<D, S>
where
	T: Clone + 'static,
	D: Duplex<Value = Vec<T>>,
	S: Readable<Value = T>,
{
	fn is_ready(&self) -> bool {
		self.list.is_readable() && self.list.is_writable() && self.item.is_readable()
	}

	fn perform(&self) -> ActionResult<()> {
		guard_ready(self.is_ready())?;
		let mut list = self.list.try_read().ok_or(SignalError::Unavailable)?;
		let item = self.item.try_read().ok_or(SignalError::Unavailable)?;
		list.push(item);
		self.list.write(list)?;
		Ok(())
	}
}

/// List removal by position. See [`erase_index`].
#[derive(Clone)]
pub struct EraseIndex<D, I> {
	list: D,
	index: I,
}

/// Creates an action that removes the element at `index` from a list signal.
///
/// Not ready while the index is out of range, so stale indices captured in
/// a previous cycle gate themselves off instead of corrupting the list.
pub fn erase_index<T, D, I>(list: D, index: I) -> EraseIndex<D, I>
where
	T: Clone + 'static,
	D: Duplex<Value = Vec<T>>,
	I: Readable<Value = usize>,
{
	EraseIndex { list, index }
}

impl<T, D, I> Action for EraseIndex<D, I>
where
	T: Clone + 'static,
	D: Duplex<Value = Vec<T>>,
	I: Readable<Value = usize>,
{
	fn is_ready(&self) -> bool {
		if !self.list.is_writable() {
			return false;
		}
		match (self.list.try_read(), self.index.try_read()) {
			(Some(list), Some(index)) => index < list.len(),
			_ => false,
		}
	}

	fn perform(&self) -> ActionResult<()> {
		guard_ready(self.is_ready())?;
		let mut list = self.list.try_read().ok_or(SignalError::Unavailable)?;
		let index = self.index.try_read().ok_or(SignalError::Unavailable)?;
		if index >= list.len() {
			return Err(ActionError::NotReady);
		}
		list.remove(index);
		self.list.write(list)?;
		Ok(())
	}
}

/// In-place transform. See [`apply_to`].
#[derive(Clone)]
pub struct ApplyTo<D, F> {
	target: D,
	transform: F,
}

/// Creates an action that mutates a duplex signal's value in place.
///
/// # Examples
///
/// ```
/// use nuages_core::{Action, State, apply_to};
///
/// let count = State::new(1i64);
/// apply_to(count.clone(), |n| *n += 1).perform().unwrap();
/// assert_eq!(count.get(), 2);
/// ```
pub fn apply_to<D, F>(target: D, transform: F) -> ApplyTo<D, F>
where
	D: Duplex,
	F: Fn(&mut D::Value),
{
	ApplyTo { target, transform }
}

impl<D, F> Action for ApplyTo<D, F>
where
	D: Duplex,
	F: Fn(&mut D::Value),
{
	fn is_ready(&self) -> bool {
		self.target.is_readable() && self.target.is_writable()
	}

	fn perform(&self) -> ActionResult<()> {
		guard_ready(self.is_ready())?;
		let mut value = self.target.try_read().ok_or(SignalError::Unavailable)?;
		(self.transform)(&mut value);
		self.target.write(value)?;
		Ok(())
	}
}

/// Arbitrary side effect. See [`callback`].
#[derive(Clone)]
pub struct Callback<F> {
	effect: F,
}

/// Creates an always-ready action from a closure.
pub fn callback<F: Fn()>(effect: F) -> Callback<F> {
	Callback { effect }
}

impl<F: Fn()> Action for Callback<F> {
	fn is_ready(&self) -> bool {
		true
	}

	fn perform(&self) -> ActionResult<()> {
		(self.effect)();
		Ok(())
	}
}

/// Side effect with an explicit readiness predicate. See [`callback_ready`].
#[derive(Clone)]
pub struct CallbackReady<R, F> {
	ready: R,
	effect: F,
}

/// Creates an action from a closure, gated by a readiness closure.
pub fn callback_ready<R, F>(ready: R, effect: F) -> CallbackReady<R, F>
where
	R: Fn() -> bool,
	F: Fn(),
{
	CallbackReady { ready, effect }
}

impl<R, F> Action for CallbackReady<R, F>
where
	R: Fn() -> bool,
	F: Fn(),
{
	fn is_ready(&self) -> bool {
		(self.ready)()
	}

	fn perform(&self) -> ActionResult<()> {
		guard_ready(self.is_ready())?;
		(self.effect)();
		Ok(())
	}
}

/// Always-ready action that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct Noop;

/// Creates an action that is always ready and has no effect.
pub fn noop() -> Noop {
	Noop
}

impl Action for Noop {
	fn is_ready(&self) -> bool {
		true
	}

	fn perform(&self) -> ActionResult<()> {
		Ok(())
	}
}
