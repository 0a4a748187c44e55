// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Bounded polling used for host reachability and device spin-up.

use std::future::Future;
use std::time::Duration;

use hozo_core::{ProbeResult, ReachabilityProbe};
use tokio::time::Instant;

use crate::context::CancellationToken;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
	Ready,
	TimedOut,
	Cancelled,
}

/// Call `check` until it reports ready, the timeout elapses, or `cancel` fires.
///
/// The first check runs immediately. Later checks are `interval` apart, and
/// the final sleep is shortened so one last check lands on the deadline. A
/// check still pending at the deadline is dropped and counts as a timeout.
pub async fn poll_until<F, Fut>(
	interval: Duration,
	timeout: Duration,
	cancel: &CancellationToken,
	mut check: F,
) -> PollOutcome
where
	F: FnMut(u32) -> Fut,
	Fut: Future<Output = bool>,
{
	let deadline = Instant::now() + timeout;
	let mut attempt = 0u32;
	loop {
		if cancel.is_cancelled() {
			return PollOutcome::Cancelled;
		}
		attempt += 1;
		let remaining = deadline.saturating_duration_since(Instant::now());
		tokio::select! {
			result = tokio::time::timeout(remaining, check(attempt)) => match result {
				Ok(true) => return PollOutcome::Ready,
				Ok(false) => {}
				Err(_) => return PollOutcome::TimedOut,
			},
			_ = cancel.cancelled() => return PollOutcome::Cancelled,
		}
		let now = Instant::now();
		if now >= deadline {
			return PollOutcome::TimedOut;
		}
		let pause = interval.min(deadline - now);
		tokio::select! {
			_ = tokio::time::sleep(pause) => {}
			_ = cancel.cancelled() => return PollOutcome::Cancelled,
		}
	}
}

/// Probe `host:port` until a connection succeeds or `timeout` elapses.
pub async fn wait_reachable(
	probe: &dyn ReachabilityProbe,
	host: &str,
	port: u16,
	timeout: Duration,
	interval: Duration,
	cancel: &CancellationToken,
) -> PollOutcome {
	poll_until(interval, timeout, cancel, |attempt| async move {
		let result = probe.probe(host, port).await;
		tracing::debug!(host, port, attempt, ?result, "reachability probe");
		result == ProbeResult::Connected
	})
	.await
}

#[cfg(test)]
mod tests {
	use super::*;
	use async_trait::async_trait;
	use std::sync::atomic::{AtomicU32, Ordering};

	struct ReadyAfter {
		start: Instant,
		after: Duration,
		probes: AtomicU32,
	}

	impl ReadyAfter {
		fn new(after: Duration) -> Self {
			Self {
				start: Instant::now(),
				after,
				probes: AtomicU32::new(0),
			}
		}
	}

	#[async_trait]
	impl ReachabilityProbe for ReadyAfter {
		async fn probe(&self, _host: &str, _port: u16) -> ProbeResult {
			self.probes.fetch_add(1, Ordering::SeqCst);
			if self.start.elapsed() >= self.after {
				ProbeResult::Connected
			} else {
				ProbeResult::Refused
			}
		}
	}

	#[tokio::test(start_paused = true)]
	async fn test_ready_before_timeout() {
		let probe = ReadyAfter::new(Duration::from_secs(12));
		let cancel = CancellationToken::new();
		let outcome = wait_reachable(
			&probe,
			"backup.local",
			22,
			Duration::from_secs(30),
			DEFAULT_POLL_INTERVAL,
			&cancel,
		)
		.await;
		assert_eq!(outcome, PollOutcome::Ready);
		// 0s, 5s, 10s refused; 15s connected.
		assert_eq!(probe.probes.load(Ordering::SeqCst), 4);
		assert_eq!(probe.start.elapsed(), Duration::from_secs(15));
	}

	#[tokio::test(start_paused = true)]
	async fn test_times_out_when_host_is_slower_than_timeout() {
		let probe = ReadyAfter::new(Duration::from_secs(12));
		let cancel = CancellationToken::new();
		let outcome = wait_reachable(
			&probe,
			"backup.local",
			22,
			Duration::from_secs(10),
			DEFAULT_POLL_INTERVAL,
			&cancel,
		)
		.await;
		assert_eq!(outcome, PollOutcome::TimedOut);
		assert_eq!(probe.start.elapsed(), Duration::from_secs(10));
	}

	#[tokio::test(start_paused = true)]
	async fn test_last_sleep_is_clipped_to_deadline() {
		let start = Instant::now();
		let cancel = CancellationToken::new();
		let outcome = poll_until(Duration::from_secs(5), Duration::from_secs(7), &cancel, |_| async {
			false
		})
		.await;
		assert_eq!(outcome, PollOutcome::TimedOut);
		assert_eq!(start.elapsed(), Duration::from_secs(7));
	}

	#[tokio::test(start_paused = true)]
	async fn test_cancel_interrupts_wait() {
		let cancel = CancellationToken::new();
		let trigger = cancel.clone();
		tokio::spawn(async move {
			tokio::time::sleep(Duration::from_secs(3)).await;
			trigger.cancel();
		});
		let start = Instant::now();
		let outcome = poll_until(Duration::from_secs(5), Duration::from_secs(60), &cancel, |_| async {
			false
		})
		.await;
		assert_eq!(outcome, PollOutcome::Cancelled);
		assert_eq!(start.elapsed(), Duration::from_secs(3));
	}

	#[tokio::test(start_paused = true)]
	async fn test_slow_check_is_cut_off_at_deadline() {
		let start = Instant::now();
		let cancel = CancellationToken::new();
		let outcome = poll_until(Duration::from_secs(5), Duration::from_secs(90), &cancel, |_| async {
			tokio::time::sleep(Duration::from_secs(300)).await;
			true
		})
		.await;
		assert_eq!(outcome, PollOutcome::TimedOut);
		assert_eq!(start.elapsed(), Duration::from_secs(90));
	}

	#[tokio::test(start_paused = true)]
	async fn test_slow_check_straddling_deadline_times_out() {
		let start = Instant::now();
		let cancel = CancellationToken::new();
		// 0s and 5s answer quickly; the check at 10s hangs past the 12s deadline.
		let outcome = poll_until(Duration::from_secs(5), Duration::from_secs(12), &cancel, |attempt| async move {
			if attempt >= 3 {
				tokio::time::sleep(Duration::from_secs(60)).await;
			}
			false
		})
		.await;
		assert_eq!(outcome, PollOutcome::TimedOut);
		assert_eq!(start.elapsed(), Duration::from_secs(12));
	}

	#[tokio::test(start_paused = true)]
	async fn test_cancel_interrupts_pending_check() {
		let cancel = CancellationToken::new();
		let trigger = cancel.clone();
		tokio::spawn(async move {
			tokio::time::sleep(Duration::from_secs(4)).await;
			trigger.cancel();
		});
		let start = Instant::now();
		let outcome = poll_until(Duration::from_secs(5), Duration::from_secs(60), &cancel, |_| async {
			std::future::pending::<bool>().await
		})
		.await;
		assert_eq!(outcome, PollOutcome::Cancelled);
		assert_eq!(start.elapsed(), Duration::from_secs(4));
	}
}
