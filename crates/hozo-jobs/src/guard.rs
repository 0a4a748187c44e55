// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Per-job mutual exclusion.
//!
//! Acquisition is a single check-and-set under one lock, never blocks and
//! never queues: a busy job rejects the second trigger outright.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

/// Map of job name to held/free. Cheap to clone; clones share state.
#[derive(Clone, Default)]
pub struct ConcurrencyGuard {
	held: Arc<Mutex<HashSet<String>>>,
}

impl ConcurrencyGuard {
	pub fn new() -> Self {
		Self::default()
	}

	fn lock(&self) -> MutexGuard<'_, HashSet<String>> {
		// A panic while holding this lock cannot leave the set half-updated.
		self.held.lock().unwrap_or_else(|e| e.into_inner())
	}

	/// Take the token for `job`. Returns `false` immediately if it is held.
	pub fn try_acquire(&self, job: &str) -> bool {
		self.lock().insert(job.to_string())
	}

	/// Give the token back. Returns whether it was held.
	pub fn release(&self, job: &str) -> bool {
		self.lock().remove(job)
	}

	pub fn is_held(&self, job: &str) -> bool {
		self.lock().contains(job)
	}

	pub fn held(&self) -> Vec<String> {
		let mut names: Vec<String> = self.lock().iter().cloned().collect();
		names.sort();
		names
	}

	/// Like [`try_acquire`](Self::try_acquire), but the token is released
	/// when the returned permit drops, including during a panic unwind.
	pub fn try_permit(&self, job: &str) -> Option<RunPermit> {
		if self.try_acquire(job) {
			Some(RunPermit {
				guard: self.clone(),
				job: job.to_string(),
			})
		} else {
			None
		}
	}
}

/// Owned token for one in-flight run.
#[must_use = "dropping the permit releases the job immediately"]
pub struct RunPermit {
	guard: ConcurrencyGuard,
	job: String,
}

impl RunPermit {
	pub fn job(&self) -> &str {
		&self.job
	}
}

impl Drop for RunPermit {
	fn drop(&mut self) {
		self.guard.release(&self.job);
	}
}

impl std::fmt::Debug for RunPermit {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("RunPermit").field("job", &self.job).finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_second_acquire_fails_until_release() {
		let guard = ConcurrencyGuard::new();
		assert!(guard.try_acquire("weekly"));
		assert!(!guard.try_acquire("weekly"));
		assert!(guard.release("weekly"));
		assert!(guard.try_acquire("weekly"));
	}

	#[test]
	fn test_jobs_are_independent() {
		let guard = ConcurrencyGuard::new();
		assert!(guard.try_acquire("weekly"));
		assert!(guard.try_acquire("daily"));
		assert_eq!(guard.held(), vec!["daily".to_string(), "weekly".to_string()]);
	}

	#[test]
	fn test_release_of_free_token_is_noop() {
		let guard = ConcurrencyGuard::new();
		assert!(!guard.release("weekly"));
		assert!(!guard.is_held("weekly"));
	}

	#[test]
	fn test_permit_releases_on_drop() {
		let guard = ConcurrencyGuard::new();
		let permit = guard.try_permit("weekly").unwrap();
		assert_eq!(permit.job(), "weekly");
		assert!(guard.try_permit("weekly").is_none());
		drop(permit);
		assert!(!guard.is_held("weekly"));
	}

	#[test]
	fn test_permit_releases_on_panic() {
		let guard = ConcurrencyGuard::new();
		let cloned = guard.clone();
		let result = std::panic::catch_unwind(move || {
			let _permit = cloned.try_permit("weekly").unwrap();
			panic!("executor blew up");
		});
		assert!(result.is_err());
		assert!(guard.try_acquire("weekly"));
	}

	#[test]
	fn test_concurrent_acquire_admits_exactly_one() {
		let guard = ConcurrencyGuard::new();
		let barrier = Arc::new(std::sync::Barrier::new(16));
		let handles: Vec<_> = (0..16)
			.map(|_| {
				let guard = guard.clone();
				let barrier = Arc::clone(&barrier);
				std::thread::spawn(move || {
					barrier.wait();
					guard.try_acquire("weekly")
				})
			})
			.collect();
		let winners = handles
			.into_iter()
			.map(|h| h.join().unwrap())
			.filter(|won| *won)
			.count();
		assert_eq!(winners, 1);
	}
}
