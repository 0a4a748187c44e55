// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Replication with bounded retries.

use std::time::Duration;

use hozo_core::{ProcessOutput, ReplicationRequest, Replicator};

use crate::context::CancellationToken;
use crate::record::RunRecorder;

/// Output fragments that mean the transfer failed even when the tool exited 0.
pub const TRANSFER_ERROR_PATTERNS: &[&str] =
	&["CRITICAL ERROR", "cannot receive", "cannot send", "cannot open"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
	/// Total attempts, including the first. Never less than one.
	pub attempts: u32,
	pub delay: Duration,
}

impl RetryPolicy {
	pub fn new(attempts: u32, delay: Duration) -> Self {
		Self {
			attempts: attempts.max(1),
			delay,
		}
	}

	pub fn once() -> Self {
		Self::new(1, Duration::ZERO)
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicationOutcome {
	pub success: bool,
	pub last_error: Option<String>,
	pub attempts_used: u32,
	/// Stopped early because the run was aborted.
	pub aborted: bool,
}

/// First line of `output` that signals a failed transfer.
pub fn scan_transfer_errors(output: &ProcessOutput) -> Option<&str> {
	output
		.lines()
		.find(|line| TRANSFER_ERROR_PATTERNS.iter().any(|p| line.contains(p)))
}

fn attempt_error(output: &ProcessOutput) -> Option<String> {
	if !output.success() {
		let detail = output
			.stderr
			.lines()
			.rev()
			.find(|l| !l.trim().is_empty())
			.unwrap_or("no error output");
		return Some(format!("exit code {}: {}", output.exit_code, detail.trim()));
	}
	scan_transfer_errors(output).map(|line| format!("transfer error: {}", line.trim()))
}

pub struct ReplicationRunner<'a> {
	replicator: &'a dyn Replicator,
	recorder: &'a RunRecorder,
	cancel: &'a CancellationToken,
}

impl<'a> ReplicationRunner<'a> {
	pub fn new(
		replicator: &'a dyn Replicator,
		recorder: &'a RunRecorder,
		cancel: &'a CancellationToken,
	) -> Self {
		Self {
			replicator,
			recorder,
			cancel,
		}
	}

	/// Run the tool up to `policy.attempts` times, sleeping `policy.delay`
	/// between failures. There is no sleep after the final attempt.
	pub async fn replicate(
		&self,
		request: &ReplicationRequest,
		policy: RetryPolicy,
	) -> ReplicationOutcome {
		let mut last_error = None;
		let mut attempts_used = 0;

		for attempt in 1..=policy.attempts {
			if self.cancel.is_cancelled() {
				return ReplicationOutcome {
					success: false,
					last_error,
					attempts_used,
					aborted: true,
				};
			}

			attempts_used = attempt;
			self.recorder.update(|run| run.attempts_used = attempt);
			self.recorder.info(format!(
				"Replication attempt {attempt}/{}: {} -> {}",
				policy.attempts, request.source, request.target
			));

			let error = match self.replicator.run_replication(request).await {
				Ok(output) => {
					self.recorder.tool_output(&output);
					attempt_error(&output)
				}
				Err(e) => Some(e.to_string()),
			};

			let Some(error) = error else {
				self.recorder.info(format!("Replication succeeded on attempt {attempt}"));
				return ReplicationOutcome {
					success: true,
					last_error: None,
					attempts_used,
					aborted: false,
				};
			};

			self.recorder.warn(format!("Attempt {attempt} failed: {error}"));
			last_error = Some(error);

			if attempt < policy.attempts {
				self.recorder
					.info(format!("Retrying in {}s", policy.delay.as_secs()));
				tokio::select! {
					_ = tokio::time::sleep(policy.delay) => {}
					_ = self.cancel.cancelled() => {
						return ReplicationOutcome {
							success: false,
							last_error,
							attempts_used,
							aborted: true,
						};
					}
				}
			}
		}

		ReplicationOutcome {
			success: false,
			last_error,
			attempts_used,
			aborted: false,
		}
	}
}
