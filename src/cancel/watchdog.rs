// SPDX-License-Identifier: Apache-2.0

//! The deadline watchdog.
//!
//! One lazily-started thread watches every resource currently blocked under
//! a scope. When a registration's deadline elapses, or its token is
//! cancelled, the resource is closed abruptly so the blocked call returns.
//! Completed calls withdraw their registration before the watchdog fires.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError, Weak};
use std::thread;
use std::time::Instant;
use once_cell::sync::Lazy;
use super::{AsyncCloseable, TokenState};

struct Entry {
	id: u64,
	deadline: Option<Instant>,
	token: Weak<TokenState>,
	resource: Weak<dyn AsyncCloseable>,
}

struct State {
	next_id: u64,
	entries: Vec<Entry>,
}

struct Watchdog {
	state: Mutex<State>,
	signal: Condvar,
}

static WATCHDOG: Lazy<Watchdog> = Lazy::new(|| {
	thread::Builder::new()
		.name("jayo-watchdog".into())
		.spawn(run)
		.expect("failed to spawn the watchdog thread");
	Watchdog {
		state: Mutex::new(State { next_id: 0, entries: Vec::new() }),
		signal: Condvar::new(),
	}
});

fn lock() -> MutexGuard<'static, State> {
	WATCHDOG.state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Watches `resource` until the returned registration drops. The watchdog
/// closes it at the token's deadline, or as soon as the token (or an
/// ancestor) is cancelled.
pub(crate) fn register(
	token: &Arc<TokenState>,
	resource: &Arc<dyn AsyncCloseable>,
) -> Registration {
	token.resources
		.lock()
		.unwrap_or_else(PoisonError::into_inner)
		.push(Arc::downgrade(resource));
	let id = {
		let mut state = lock();
		let id = state.next_id;
		state.next_id += 1;
		state.entries.push(Entry {
			id,
			deadline: token.deadline,
			token: Arc::downgrade(token),
			resource: Arc::downgrade(resource),
		});
		id
	};
	log::trace!("watchdog: registered blocked resource #{id}");
	WATCHDOG.signal.notify_all();
	Registration {
		id,
		token: Arc::clone(token),
		resource: Arc::clone(resource),
	}
}

/// Wakes the watchdog for an immediate sweep, after a cancel.
pub(crate) fn poke() {
	if let Some(watchdog) = Lazy::get(&WATCHDOG) {
		watchdog.signal.notify_all();
	}
}

pub(crate) struct Registration {
	id: u64,
	token: Arc<TokenState>,
	resource: Arc<dyn AsyncCloseable>,
}

impl Drop for Registration {
	fn drop(&mut self) {
		lock().entries.retain(|entry| entry.id != self.id);
		self.token.resources
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.retain(|weak| {
				weak.upgrade()
					.is_some_and(|live| !Arc::ptr_eq(&live, &self.resource))
			});
	}
}

fn run() {
	let mut fired: Vec<Arc<dyn AsyncCloseable>> = Vec::new();
	let mut state = lock();
	loop {
		let now = Instant::now();
		state.entries.retain(|entry| {
			let Some(resource) = entry.resource.upgrade() else { return false };
			// A dropped token means its scope already ended.
			let Some(token) = entry.token.upgrade() else { return false };
			let due = entry.deadline.is_some_and(|deadline| now >= deadline);
			if due || token.cancelled_walk() {
				log::debug!("watchdog: closing blocked resource #{}", entry.id);
				fired.push(resource);
				return false;
			}
			true
		});
		if !fired.is_empty() {
			drop(state);
			for resource in fired.drain(..) {
				resource.close_abruptly();
			}
			state = lock();
			continue;
		}
		let next = state.entries.iter().filter_map(|entry| entry.deadline).min();
		state = match next {
			Some(at) => {
				let now = Instant::now();
				if at <= now { continue }
				WATCHDOG.signal
					.wait_timeout(state, at - now)
					.unwrap_or_else(PoisonError::into_inner)
					.0
			}
			None => WATCHDOG.signal
				.wait(state)
				.unwrap_or_else(PoisonError::into_inner),
		};
	}
}
