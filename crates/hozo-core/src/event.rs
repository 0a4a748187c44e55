// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Notification events handed to the notification gateway.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::run::{Operation, Run, RunOutcome, TriggerKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventOutcome {
	Success,
	Failed,
	Aborted,
	/// A trigger arrived while the job was already running and was dropped.
	Rejected,
}

impl EventOutcome {
	pub fn label(self) -> &'static str {
		match self {
			EventOutcome::Success => "SUCCESS",
			EventOutcome::Failed => "FAILED",
			EventOutcome::Aborted => "ABORTED",
			EventOutcome::Rejected => "REJECTED",
		}
	}

	pub fn is_success(self) -> bool {
		self == EventOutcome::Success
	}
}

/// Outcome, timing and a free-text summary of one run (or rejected trigger).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationEvent {
	pub job_name: String,
	pub operation: Operation,
	pub outcome: EventOutcome,
	pub started_at: DateTime<Utc>,
	pub finished_at: Option<DateTime<Utc>>,
	pub attempts: u32,
	pub snapshot_count: usize,
	pub latest_snapshot: Option<String>,
	pub error: Option<String>,
	pub summary: String,
}

impl NotificationEvent {
	/// Build the event for a run that has reached `Notifying`.
	///
	/// `finished_at` is taken as "now" because the run is not terminal yet.
	pub fn from_run(run: &Run, outcome: &RunOutcome) -> Self {
		let event_outcome = match outcome {
			RunOutcome::Success => EventOutcome::Success,
			RunOutcome::Failed { .. } => EventOutcome::Failed,
			RunOutcome::Aborted { .. } => EventOutcome::Aborted,
		};
		let finished_at = run.ended_at.unwrap_or_else(Utc::now);
		let error = outcome.error_message().map(str::to_string);
		let summary = match outcome {
			RunOutcome::Success => format!(
				"{} of '{}' completed with {} snapshot(s) on remote",
				run.operation,
				run.job_name,
				run.snapshots.len()
			),
			RunOutcome::Failed { kind, message } => {
				format!("{} of '{}' failed ({kind}): {message}", run.operation, run.job_name)
			}
			RunOutcome::Aborted { message } => {
				format!("{} of '{}' aborted: {message}", run.operation, run.job_name)
			}
		};
		Self {
			job_name: run.job_name.clone(),
			operation: run.operation,
			outcome: event_outcome,
			started_at: run.started_at,
			finished_at: Some(finished_at),
			attempts: run.attempts_used,
			snapshot_count: run.snapshots.len(),
			latest_snapshot: run.snapshots.last().cloned(),
			error,
			summary,
		}
	}

	/// Event for a trigger refused because the job was busy.
	pub fn rejected(job_name: &str, trigger: TriggerKind) -> Self {
		Self {
			job_name: job_name.to_string(),
			operation: Operation::Backup,
			outcome: EventOutcome::Rejected,
			started_at: Utc::now(),
			finished_at: None,
			attempts: 0,
			snapshot_count: 0,
			latest_snapshot: None,
			error: Some(format!("job '{job_name}' is already running")),
			summary: format!("{trigger} trigger for '{job_name}' dropped: already running"),
		}
	}

	pub fn duration_secs(&self) -> Option<f64> {
		self
			.finished_at
			.map(|end| (end - self.started_at).num_milliseconds() as f64 / 1000.0)
	}

	pub fn subject(&self) -> String {
		match self.operation {
			Operation::Backup => {
				format!("Hozo {}: {}", self.outcome.label(), self.job_name)
			}
			Operation::Restore => {
				format!("Hozo restore {}: {}", self.outcome.label(), self.job_name)
			}
		}
	}

	/// Plain-text body shared by every channel.
	pub fn body(&self) -> String {
		let status = match self.outcome {
			EventOutcome::Success => "Success",
			EventOutcome::Failed => "Failed",
			EventOutcome::Aborted => "Aborted",
			EventOutcome::Rejected => "Rejected",
		};
		let mut lines = vec![
			format!("Job: {}", self.job_name),
			format!("Status: {status}"),
			format!("Started: {}", self.started_at.to_rfc3339()),
		];
		if let Some(finished) = self.finished_at {
			lines.push(format!("Finished: {}", finished.to_rfc3339()));
		}
		if let Some(secs) = self.duration_secs() {
			lines.push(format!("Duration: {secs:.1}s"));
		}
		if self.attempts > 1 {
			lines.push(format!("Attempts: {}", self.attempts));
		}
		if self.snapshot_count > 0 {
			lines.push(format!("Snapshots on remote: {}", self.snapshot_count));
			if let Some(latest) = &self.latest_snapshot {
				lines.push(format!("Latest: {latest}"));
			}
		}
		if let Some(error) = &self.error {
			lines.push(format!("Error: {error}"));
		}
		lines.join("\n")
	}
}
