//! Signal adapters.
//!
//! ## Overview
//!
//! Each adapter wraps one or more input signals and derives its identity
//! token from theirs, so any input change surfaces as a change of the
//! composite. Adapters that pass a single input through unchanged (pure
//! transforms with a fixed function) reuse the input token directly; the
//! rest combine their inputs with [`Identity::tuple`].
//!
//! Everything here is lazy: adapters hold no cached values and recompute on
//! every read. The memoizing variant lives on the traversal context in
//! `nuages-ui`, where recomputation can be keyed to retained state.

use std::fmt;

use crate::error::{SignalError, SignalResult};
use crate::identity::Identity;
use crate::signal::{Duplex, Readable};

/// Always-available signal carrying a fixed value.
#[derive(Debug, Clone)]
pub struct Constant<T> {
	value: T,
}

/// Creates a signal that always reads `value` and never changes.
pub fn constant<T: Clone + 'static>(value: T) -> Constant<T> {
	Constant { value }
}

impl<T: Clone + 'static> Readable for Constant<T> {
	type Value = T;

	fn identity(&self) -> Identity {
		Identity::Constant
	}

	fn try_read(&self) -> Option<T> {
		Some(self.value.clone())
	}

	fn is_readable(&self) -> bool {
		true
	}
}

/// Lazy pure transform over one signal. See [`map`].
#[derive(Clone)]
pub struct Map<S, F> {
	source: S,
	transform: F,
}

/// Transforms a readable signal with a fixed pure function.
///
/// The result reuses the source's identity token: the function never
/// changes, so the output changes exactly when the input does.
///
/// # Examples
///
/// ```
/// use nuages_core::{Readable, State, map};
///
/// let count = State::new(2i64);
/// let doubled = map(count.clone(), |n| n * 2);
/// assert_eq!(doubled.try_read(), Some(4));
/// assert_eq!(doubled.identity(), count.identity());
/// ```
pub fn map<S, F, U>(source: S, transform: F) -> Map<S, F>
where
	S: Readable,
	F: Fn(S::Value) -> U,
	U: Clone + 'static,
{
	Map { source, transform }
}

impl<S, F, U> Readable for Map<S, F>
where
	S: Readable,
	F: Fn(S::Value) -> U,
	U: Clone + 'static,
{
	type Value = U;

	fn identity(&self) -> Identity {
		self.source.identity()
	}

	fn try_read(&self) -> Option<U> {
		self.source.try_read().map(|v| (self.transform)(v))
	}

	fn is_readable(&self) -> bool {
		self.source.is_readable()
	}
}

/// Formats a displayable signal as a string signal.
pub fn as_text<S>(source: S) -> Map<S, fn(S::Value) -> String>
where
	S: Readable,
	S::Value: fmt::Display,
{
	Map {
		source,
		transform: |v: S::Value| v.to_string(),
	}
}

/// Lazy binary transform. See [`lazy_apply2`].
#[derive(Clone)]
pub struct LazyApply2<A, B, F> {
	a: A,
	b: B,
	transform: F,
}

/// Combines two readable signals with a pure function, recomputing on every
/// read.
///
/// Available only while both inputs are. The identity is the tuple of both
/// input identities.
pub fn lazy_apply2<A, B, F, U>(a: A, b: B, transform: F) -> LazyApply2<A, B, F>
where
	A: Readable,
	B: Readable,
	F: Fn(A::Value, B::Value) -> U,
	U: Clone + 'static,
{
	LazyApply2 { a, b, transform }
}

impl<A, B, F, U> Readable for LazyApply2<A, B, F>
where
	A: Readable,
	B: Readable,
	F: Fn(A::Value, B::Value) -> U,
	U: Clone + 'static,
{
	type Value = U;

	fn identity(&self) -> Identity {
		Identity::tuple([self.a.identity(), self.b.identity()])
	}

	fn try_read(&self) -> Option<U> {
		let a = self.a.try_read()?;
		let b = self.b.try_read()?;
		Some((self.transform)(a, b))
	}
}

/// Availability gate. See [`mask`].
#[derive(Clone)]
pub struct Mask<S, C> {
	source: S,
	condition: C,
}

/// Gates a signal behind a boolean condition.
///
/// While the condition reads anything but `true`, the result is unavailable
/// and rejects writes. The original value is untouched either way.
pub fn mask<S, C>(source: S, condition: C) -> Mask<S, C>
where
	S: Readable,
	C: Readable<Value = bool>,
{
	Mask { source, condition }
}

impl<S, C: Readable<Value = bool>> Mask<S, C> {
	fn enabled(&self) -> bool {
		self.condition.try_read() == Some(true)
	}
}

impl<S, C> Readable for Mask<S, C>
where
	S: Readable,
	C: Readable<Value = bool>,
{
	type Value = S::Value;

	fn identity(&self) -> Identity {
		Identity::tuple([self.source.identity(), self.condition.identity()])
	}

	fn try_read(&self) -> Option<S::Value> {
		if self.enabled() { self.source.try_read() } else { None }
	}

	fn is_readable(&self) -> bool {
		self.enabled() && self.source.is_readable()
	}
}

impl<S, C> Duplex for Mask<S, C>
where
	S: Duplex,
	C: Readable<Value = bool>,
{
	fn is_writable(&self) -> bool {
		self.enabled() && self.source.is_writable()
	}

	fn write(&self, value: S::Value) -> SignalResult<()> {
		if !self.enabled() {
			return Err(SignalError::NotWritable);
		}
		self.source.write(value)
	}
}

/// Write gate that leaves reads open. See [`mask_writes`].
#[derive(Clone)]
pub struct MaskWrites<S, C> {
	source: S,
	condition: C,
}

/// Gates only the write side of a duplex signal behind a boolean condition.
///
/// Reads pass through untouched, so the value stays visible while editing
/// is locked out.
pub fn mask_writes<S, C>(source: S, condition: C) -> MaskWrites<S, C>
where
	S: Duplex,
	C: Readable<Value = bool>,
{
	MaskWrites { source, condition }
}

impl<S, C> Readable for MaskWrites<S, C>
where
	S: Readable,
	C: Readable<Value = bool>,
{
	type Value = S::Value;

	fn identity(&self) -> Identity {
		self.source.identity()
	}

	fn try_read(&self) -> Option<S::Value> {
		self.source.try_read()
	}

	fn is_readable(&self) -> bool {
		self.source.is_readable()
	}
}

impl<S, C> Duplex for MaskWrites<S, C>
where
	S: Duplex,
	C: Readable<Value = bool>,
{
	fn is_writable(&self) -> bool {
		self.condition.try_read() == Some(true) && self.source.is_writable()
	}

	fn write(&self, value: S::Value) -> SignalResult<()> {
		if self.condition.try_read() != Some(true) {
			return Err(SignalError::NotWritable);
		}
		self.source.write(value)
	}
}

/// Fallback adapter. See [`with_default`].
#[derive(Clone)]
pub struct WithDefault<S, D> {
	source: S,
	fallback: D,
}

/// Reads the fallback while the primary signal is unavailable.
///
/// Writes always target the primary signal, even while the fallback is
/// showing.
pub fn with_default<S, D>(source: S, fallback: D) -> WithDefault<S, D>
where
	S: Readable,
	D: Readable<Value = S::Value>,
{
	WithDefault { source, fallback }
}

impl<S, D> Readable for WithDefault<S, D>
where
	S: Readable,
	D: Readable<Value = S::Value>,
{
	type Value = S::Value;

	fn identity(&self) -> Identity {
		Identity::tuple([self.source.identity(), self.fallback.identity()])
	}

	fn try_read(&self) -> Option<S::Value> {
		self.source.try_read().or_else(|| self.fallback.try_read())
	}

	fn is_readable(&self) -> bool {
		self.source.is_readable() || self.fallback.is_readable()
	}
}

impl<S, D> Duplex for WithDefault<S, D>
where
	S: Duplex,
	D: Readable<Value = S::Value>,
{
	fn is_writable(&self) -> bool {
		self.source.is_writable()
	}

	fn write(&self, value: S::Value) -> SignalResult<()> {
		self.source.write(value)
	}
}

/// Bidirectional transform. See [`duplex_map`].
#[derive(Clone)]
pub struct DuplexMap<S, F, B> {
	source: S,
	forward: F,
	backward: B,
}

/// Transforms a duplex signal in both directions.
///
/// Reads apply `forward` to the upstream value; writes apply `backward` and
/// hand the result upstream. The pair should round-trip for two-way bindings
/// to behave.
pub fn duplex_map<S, F, B, U>(source: S, forward: F, backward: B) -> DuplexMap<S, F, B>
where
	S: Duplex,
	F: Fn(S::Value) -> U,
	B: Fn(U) -> S::Value,
	U: Clone + 'static,
{
	DuplexMap { source, forward, backward }
}

impl<S, F, B, U> Readable for DuplexMap<S, F, B>
where
	S: Duplex,
	F: Fn(S::Value) -> U,
	B: Fn(U) -> S::Value,
	U: Clone + 'static,
{
	type Value = U;

	fn identity(&self) -> Identity {
		self.source.identity()
	}

	fn try_read(&self) -> Option<U> {
		self.source.try_read().map(|v| (self.forward)(v))
	}

	fn is_readable(&self) -> bool {
		self.source.is_readable()
	}
}

impl<S, F, B, U> Duplex for DuplexMap<S, F, B>
where
	S: Duplex,
	F: Fn(S::Value) -> U,
	B: Fn(U) -> S::Value,
	U: Clone + 'static,
{
	fn is_writable(&self) -> bool {
		self.source.is_writable()
	}

	fn write(&self, value: U) -> SignalResult<()> {
		self.source.write((self.backward)(value))
	}
}

/// Field access over a duplex aggregate. See [`lens`].
#[derive(Clone)]
pub struct Lens<S, G, P> {
	source: S,
	get: G,
	put: P,
}

/// Projects a field out of a duplex aggregate signal.
///
/// Reads clone the aggregate and project with `get`. Writes read the current
/// aggregate, patch it with `put`, and write the whole aggregate back, so a
/// field write moves the aggregate's identity. That over-invalidates sibling
/// lenses of the same aggregate; downstream consumers are expected to absorb
/// it (the engine's shadow compare turns those into no-ops at the host).
///
/// # Examples
///
/// ```
/// use nuages_core::{Duplex, Readable, State, lens};
///
/// #[derive(Clone)]
/// struct Todo {
/// 	title: String,
/// 	done: bool,
/// }
///
/// let todo = State::new(Todo { title: "write docs".into(), done: false });
/// let done = lens(todo.clone(), |t: &Todo| t.done, |t, v| t.done = v);
///
/// done.write(true).unwrap();
/// assert_eq!(done.try_read(), Some(true));
/// assert!(todo.get().done);
/// ```
pub fn lens<S, G, P, U>(source: S, get: G, put: P) -> Lens<S, G, P>
where
	S: Duplex,
	G: Fn(&S::Value) -> U,
	P: Fn(&mut S::Value, U),
	U: Clone + 'static,
{
	Lens { source, get, put }
}

impl<S, G, P, U> Readable for Lens<S, G, P>
where
	S: Duplex,
	G: Fn(&S::Value) -> U,
	P: Fn(&mut S::Value, U),
	U: Clone + 'static,
{
	type Value = U;

	fn identity(&self) -> Identity {
		self.source.identity()
	}

	fn try_read(&self) -> Option<U> {
		self.source.try_read().map(|aggregate| (self.get)(&aggregate))
	}

	fn is_readable(&self) -> bool {
		self.source.is_readable()
	}
}

impl<S, G, P, U> Duplex for Lens<S, G, P>
where
	S: Duplex,
	G: Fn(&S::Value) -> U,
	P: Fn(&mut S::Value, U),
	U: Clone + 'static,
{
	fn is_writable(&self) -> bool {
		self.source.is_writable() && self.source.is_readable()
	}

	fn write(&self, value: U) -> SignalResult<()> {
		let Some(mut aggregate) = self.source.try_read() else {
			return Err(SignalError::Unavailable);
		};
		(self.put)(&mut aggregate, value);
		self.source.write(aggregate)
	}
}

/// Two-way branch. See [`select`].
#[derive(Clone)]
pub struct Select<C, A, B> {
	condition: C,
	when_true: A,
	when_false: B,
}

/// Reads one of two signals depending on a boolean condition.
///
/// Unavailable while the condition is; the identity covers all three inputs
/// so flipping the condition alone registers as a change.
pub fn select<C, A, B>(condition: C, when_true: A, when_false: B) -> Select<C, A, B>
where
	C: Readable<Value = bool>,
	A: Readable,
	B: Readable<Value = A::Value>,
{
	Select { condition, when_true, when_false }
}

impl<C, A, B> Readable for Select<C, A, B>
where
	C: Readable<Value = bool>,
	A: Readable,
	B: Readable<Value = A::Value>,
{
	type Value = A::Value;

	fn identity(&self) -> Identity {
		Identity::tuple([
			self.condition.identity(),
			self.when_true.identity(),
			self.when_false.identity(),
		])
	}

	fn try_read(&self) -> Option<A::Value> {
		match self.condition.try_read()? {
			true => self.when_true.try_read(),
			false => self.when_false.try_read(),
		}
	}
}
