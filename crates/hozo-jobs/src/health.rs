// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use chrono::{DateTime, Utc};
use hozo_core::{Run, RunId, RunOutcome, RunState};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct LastRunInfo {
	pub run_id: RunId,
	pub state: RunState,
	pub started_at: DateTime<Utc>,
	pub duration_ms: Option<i64>,
	pub error: Option<String>,
}

impl From<&Run> for LastRunInfo {
	fn from(run: &Run) -> Self {
		Self {
			run_id: run.id,
			state: run.state,
			started_at: run.started_at,
			duration_ms: run.duration_ms(),
			error: run
				.outcome
				.as_ref()
				.and_then(RunOutcome::error_message)
				.map(str::to_string),
		}
	}
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
	Healthy,
	Degraded,
	Unhealthy,
}

#[derive(Debug, Clone, Serialize)]
pub struct JobHealthStatus {
	pub name: String,
	pub status: HealthState,
	pub last_run: Option<LastRunInfo>,
	pub consecutive_failures: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct JobsHealthStatus {
	pub status: HealthState,
	pub jobs: Vec<JobHealthStatus>,
}

impl JobsHealthStatus {
	pub fn from_jobs(jobs: Vec<JobHealthStatus>) -> Self {
		let status = jobs
			.iter()
			.map(|j| j.status)
			.fold(HealthState::Healthy, |worst, s| match (worst, s) {
				(HealthState::Unhealthy, _) | (_, HealthState::Unhealthy) => HealthState::Unhealthy,
				(HealthState::Degraded, _) | (_, HealthState::Degraded) => HealthState::Degraded,
				_ => HealthState::Healthy,
			});
		Self { status, jobs }
	}
}

/// Failed runs count against health; aborted runs do not.
pub(crate) fn determine_health_state(last_run: Option<&Run>, consecutive_failures: u32) -> HealthState {
	match last_run.and_then(|r| r.outcome.as_ref()) {
		Some(RunOutcome::Failed { .. }) if consecutive_failures >= 3 => HealthState::Unhealthy,
		Some(RunOutcome::Failed { .. }) if consecutive_failures >= 1 => HealthState::Degraded,
		_ => HealthState::Healthy,
	}
}

/// Failures at the head of `newest_first`, ignoring runs still in flight.
pub(crate) fn count_consecutive_failures<'a>(newest_first: impl IntoIterator<Item = &'a Run>) -> u32 {
	newest_first
		.into_iter()
		.filter(|r| r.is_terminal())
		.take_while(|r| matches!(r.outcome, Some(RunOutcome::Failed { .. })))
		.count() as u32
}

#[cfg(test)]
mod tests {
	use super::*;
	use hozo_core::{FailureKind, Operation, TriggerKind};

	fn finished(outcome: RunOutcome) -> Run {
		let mut run = Run::new("weekly", Operation::Backup, TriggerKind::Scheduled);
		run.state = if outcome.is_success() {
			RunState::Succeeded
		} else {
			RunState::Failed
		};
		run.outcome = Some(outcome);
		run
	}

	fn failure() -> RunOutcome {
		RunOutcome::Failed {
			kind: FailureKind::ReachabilityTimeout,
			message: "timeout".into(),
		}
	}

	#[test]
	fn test_consecutive_failures_stop_at_success() {
		let runs = [
			finished(failure()),
			finished(failure()),
			finished(RunOutcome::Success),
			finished(failure()),
		];
		assert_eq!(count_consecutive_failures(runs.iter()), 2);
	}

	#[test]
	fn test_health_thresholds() {
		let failed = finished(failure());
		assert_eq!(determine_health_state(None, 0), HealthState::Healthy);
		assert_eq!(determine_health_state(Some(&failed), 1), HealthState::Degraded);
		assert_eq!(determine_health_state(Some(&failed), 3), HealthState::Unhealthy);
		let ok = finished(RunOutcome::Success);
		assert_eq!(determine_health_state(Some(&ok), 0), HealthState::Healthy);
	}

	#[test]
	fn test_aggregate_takes_worst() {
		let job = |status| JobHealthStatus {
			name: "j".into(),
			status,
			last_run: None,
			consecutive_failures: 0,
		};
		let all = JobsHealthStatus::from_jobs(vec![job(HealthState::Healthy), job(HealthState::Degraded)]);
		assert_eq!(all.status, HealthState::Degraded);
		let all = JobsHealthStatus::from_jobs(vec![job(HealthState::Unhealthy), job(HealthState::Degraded)]);
		assert_eq!(all.status, HealthState::Unhealthy);
	}
}
