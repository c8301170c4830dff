// SPDX-License-Identifier: Apache-2.0

//! Ambient cancellation and deadlines.
//!
//! A scope wraps a block of code in a [`CancelToken`]: a deadline plus a
//! cancelled flag, installed in a thread-local slot for the duration of the
//! block. Every blocking operation in this crate passes through [`check`] on
//! entry, and operations that park inside the host (socket reads, pipe
//! waits) additionally register the blocked resource with a watchdog that
//! closes it once the deadline elapses or the scope is cancelled. Child
//! scopes inherit the tightest enclosing deadline; cancelling a scope also
//! cancels every scope nested within it.
//!
//! The slot is per-thread. To carry a scope onto a spawned thread, capture
//! its token and re-install it there with [`CancelToken::attach`].
//!
//! ```
//! use std::time::Duration;
//!
//! let result = jayo::cancel::with_timeout(Duration::from_millis(250), |_scope| {
//! 	// blocking reads and writes in here observe the deadline
//! 	jayo::cancel::check()
//! });
//! assert!(result.is_ok());
//! ```

mod watchdog;

use std::cell::RefCell;
use std::mem;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::{Duration, Instant};
use crate::{Error, Result};

/// A resource that another thread can shut down while a blocking call on it
/// is in flight, surfacing an error from that call.
pub trait AsyncCloseable: Send + Sync {
	fn close_abruptly(&self);
}

pub(crate) struct TokenState {
	deadline: Option<Instant>,
	cancelled: AtomicBool,
	parent: Option<Arc<TokenState>>,
	resources: Mutex<Vec<Weak<dyn AsyncCloseable>>>,
}

impl TokenState {
	pub(crate) fn cancelled_walk(&self) -> bool {
		if self.cancelled.load(Ordering::Acquire) {
			return true;
		}
		self.parent.as_deref().is_some_and(TokenState::cancelled_walk)
	}

	fn cancel(&self) {
		self.cancelled.store(true, Ordering::Release);
		let resources = mem::take(
			&mut *self.resources.lock().unwrap_or_else(PoisonError::into_inner),
		);
		for resource in resources {
			if let Some(resource) = resource.upgrade() {
				resource.close_abruptly();
			}
		}
		// Registrations under child tokens are swept by the watchdog.
		watchdog::poke();
	}
}

/// The deadline and cancellation state shared by a scope and everything
/// nested within it. Cheap to clone; clones observe the same state.
#[derive(Clone)]
pub struct CancelToken {
	state: Arc<TokenState>,
}

impl CancelToken {
	/// Returns the token installed by the innermost enclosing scope, if any.
	pub fn current() -> Option<CancelToken> {
		AMBIENT.with(|slot| slot.borrow().clone())
	}

	/// Returns `true` once this scope or any enclosing scope is cancelled.
	pub fn is_cancelled(&self) -> bool {
		self.state.cancelled_walk()
	}

	/// Returns the effective absolute deadline, already clamped to every
	/// enclosing scope's deadline.
	pub fn deadline(&self) -> Option<Instant> {
		self.state.deadline
	}

	/// Runs `block` with this token installed as the calling thread's
	/// ambient token, restoring the previous token afterwards. This is how a
	/// scope extends onto threads it spawns.
	pub fn attach<T>(&self, block: impl FnOnce() -> T) -> T {
		let _restore = install(Some(self.clone()));
		block()
	}
}

thread_local! {
	static AMBIENT: RefCell<Option<CancelToken>> = RefCell::new(None);
}

struct Restore(Option<CancelToken>);

impl Drop for Restore {
	fn drop(&mut self) {
		let outer = self.0.take();
		AMBIENT.with(|slot| *slot.borrow_mut() = outer);
	}
}

fn install(token: Option<CancelToken>) -> Restore {
	Restore(AMBIENT.with(|slot| mem::replace(&mut *slot.borrow_mut(), token)))
}

/// A running scope. Obtained by the block passed to [`with_timeout`],
/// [`with_deadline`], or [`scope`].
pub struct CancelScope {
	token: CancelToken,
}

impl CancelScope {
	pub fn token(&self) -> &CancelToken {
		&self.token
	}

	/// Cancels the scope: later checkpoints under it fail with
	/// [`Error::Interrupted`], and resources currently blocked under it are
	/// closed asynchronously so their in-flight calls return.
	pub fn cancel(&self) {
		self.token.state.cancel();
	}
}

fn enter<T>(
	timeout: Option<Duration>,
	at: Option<Instant>,
	block: impl FnOnce(&CancelScope) -> T,
) -> T {
	let parent = CancelToken::current();
	let mut deadline = parent.as_ref().and_then(CancelToken::deadline);
	if let Some(timeout) = timeout {
		let candidate = Instant::now() + timeout;
		deadline = Some(deadline.map_or(candidate, |d| d.min(candidate)));
	}
	if let Some(at) = at {
		deadline = Some(deadline.map_or(at, |d| d.min(at)));
	}
	let token = CancelToken {
		state: Arc::new(TokenState {
			deadline,
			cancelled: AtomicBool::new(false),
			parent: parent.map(|token| token.state),
			resources: Mutex::new(Vec::new()),
		}),
	};
	let scope = CancelScope { token };
	let _restore = install(Some(scope.token.clone()));
	block(&scope)
}

/// Runs `block` under a scope whose deadline is `timeout` from now, clamped
/// to any enclosing scope's deadline.
pub fn with_timeout<T>(timeout: Duration, block: impl FnOnce(&CancelScope) -> T) -> T {
	enter(Some(timeout), None, block)
}

/// Runs `block` under a scope with an absolute deadline, clamped to any
/// enclosing scope's deadline.
pub fn with_deadline<T>(deadline: Instant, block: impl FnOnce(&CancelScope) -> T) -> T {
	enter(None, Some(deadline), block)
}

/// Runs `block` under a scope with no deadline of its own, for manual
/// [`CancelScope::cancel`].
pub fn scope<T>(block: impl FnOnce(&CancelScope) -> T) -> T {
	enter(None, None, block)
}

/// The checkpoint every blocking operation passes through: fails with
/// [`Error::Interrupted`] when the ambient scope is cancelled, then with
/// [`Error::Timeout`] when its deadline has elapsed.
pub fn check() -> Result {
	let Some(token) = CancelToken::current() else { return Ok(()) };
	if token.is_cancelled() {
		return Err(Error::Interrupted);
	}
	if token.deadline().is_some_and(|deadline| Instant::now() >= deadline) {
		return Err(Error::Timeout);
	}
	Ok(())
}

/// Runs a blocking call on `resource` under the ambient scope: checks the
/// token, registers the resource with the watchdog for the duration of the
/// call, and maps a failure induced by an elapsed deadline or a cancel to
/// the corresponding error.
pub fn guard<T>(
	resource: Arc<dyn AsyncCloseable>,
	op: impl FnOnce() -> Result<T>,
) -> Result<T> {
	check()?;
	let Some(token) = CancelToken::current() else { return op() };
	let registration = watchdog::register(&token.state, &resource);
	let result = op();
	drop(registration);
	match result {
		Err(error) if !error.is_interruption() => Err(translate(&token, error)),
		other => other,
	}
}

/// Reinterprets a failure from a blocked call through the token state: an
/// elapsed deadline explains it as a timeout, a cancel as an interruption.
fn translate(token: &CancelToken, error: Error) -> Error {
	if token.deadline().is_some_and(|deadline| Instant::now() >= deadline) {
		return Error::Timeout;
	}
	if token.is_cancelled() {
		return Error::Interrupted;
	}
	error
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn no_scope_is_unbounded() {
		assert!(CancelToken::current().is_none());
		assert!(check().is_ok());
	}

	#[test]
	fn nested_deadline_takes_the_minimum() {
		with_timeout(Duration::from_secs(60), |outer| {
			let outer_deadline = outer.token().deadline().unwrap();
			with_timeout(Duration::from_secs(3600), |inner| {
				assert_eq!(inner.token().deadline(), Some(outer_deadline));
			});
			with_timeout(Duration::from_millis(1), |inner| {
				assert!(inner.token().deadline().unwrap() < outer_deadline);
			});
		});
	}

	#[test]
	fn slot_restored_after_scope() {
		scope(|_| {
			assert!(CancelToken::current().is_some());
			scope(|_| assert!(CancelToken::current().is_some()));
			assert!(CancelToken::current().is_some());
		});
		assert!(CancelToken::current().is_none());
	}

	#[test]
	fn cancel_reaches_children() {
		scope(|outer| {
			scope(|inner| {
				outer.cancel();
				assert!(inner.token().is_cancelled());
				assert!(matches!(check(), Err(Error::Interrupted)));
			});
		});
	}
}
