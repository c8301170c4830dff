// SPDX-License-Identifier: Apache-2.0

//! Segment recycling.
//!
//! Every thread keeps its own lane of cleared segments, capped at
//! [`MAX_LANE_BYTES`]. Claims pop the lane or allocate; releases push unless
//! the lane is full, in which case the segment is dropped for the allocator
//! to reclaim. Lanes are single-owner, so claims and releases never contend.

use std::cell::RefCell;
use crate::segment::{Segment, SIZE};

/// The most bytes a single thread's lane retains: eight segments.
pub const MAX_LANE_BYTES: usize = 64 * 1024;

thread_local! {
	static LANE: RefCell<Vec<Segment>> = RefCell::new(Vec::new());
}

/// Claims a segment from this thread's lane, allocating when the lane is
/// empty.
pub(crate) fn take() -> Segment {
	LANE.with(|lane| lane.borrow_mut().pop())
		.unwrap_or_else(Segment::new)
}

/// Recycles a segment into this thread's lane. A segment whose block is still
/// aliased by a byte string or another buffer is dropped instead; the block
/// stays alive through the remaining handles. A full lane also drops.
pub(crate) fn release(mut segment: Segment) {
	if !segment.reset() { return }
	LANE.with(|lane| {
		let mut lane = lane.borrow_mut();
		if (lane.len() + 1) * SIZE <= MAX_LANE_BYTES {
			lane.push(segment);
		}
	});
}

/// Returns the bytes currently retained by this thread's lane.
pub fn lane_bytes() -> usize {
	LANE.with(|lane| lane.borrow().len() * SIZE)
}

/// Empties this thread's lane, handing retained blocks back to the allocator.
/// Intended for tests that account for pool retention.
pub fn drain_lane() {
	LANE.with(|lane| lane.borrow_mut().clear());
}
