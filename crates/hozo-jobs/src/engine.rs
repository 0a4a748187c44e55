// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Entry point shared by the CLI, the scheduler and any API surface.
//!
//! Trigger operations are synchronous: they admit or reject the request
//! (job lookup, confirmation, concurrency guard) and return a [`RunHandle`]
//! for a run that is already executing on the tokio runtime.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use futures::Stream;
use hozo_core::{
	JobDefinition, LogLine, NotificationEvent, Operation, Run, RunId, TriggerError, TriggerKind,
};
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::executor::{Executor, RunPlan};
use crate::guard::RunPermit;
use crate::health::{
	count_consecutive_failures, determine_health_state, HealthState, JobHealthStatus,
	JobsHealthStatus, LastRunInfo,
};
use crate::record::{new_record, CrashClose, RunHandle};
use crate::registry::JobRegistry;
use crate::restore::check_confirmation;

/// One row of `list_jobs`.
#[derive(Debug, Clone, Serialize)]
pub struct JobSummary {
	pub name: String,
	pub description: String,
	pub source: String,
	pub target: String,
	pub schedule: Option<String>,
	pub next_run: Option<DateTime<Utc>>,
	pub running: bool,
	pub restoring: bool,
	pub shutdown_after: bool,
	pub last_run: Option<LastRunInfo>,
	pub health: HealthState,
}

#[derive(Clone)]
pub struct JobEngine {
	registry: Arc<JobRegistry>,
	executor: Arc<Executor>,
	timezone: Tz,
}

impl JobEngine {
	pub fn new(registry: Arc<JobRegistry>, executor: Arc<Executor>, timezone: Tz) -> Self {
		Self {
			registry,
			executor,
			timezone,
		}
	}

	pub fn registry(&self) -> &Arc<JobRegistry> {
		&self.registry
	}

	pub fn timezone(&self) -> Tz {
		self.timezone
	}

	pub(crate) fn executor(&self) -> &Arc<Executor> {
		&self.executor
	}

	pub fn job(&self, name: &str) -> Result<Arc<JobDefinition>, TriggerError> {
		self
			.registry
			.job(name)
			.ok_or_else(|| TriggerError::JobNotFound(name.to_string()))
	}

	pub fn list_jobs(&self) -> Vec<JobSummary> {
		let now = Utc::now();
		self
			.registry
			.jobs()
			.iter()
			.map(|job| {
				let backups = self.registry.runs_for(&job.name, Operation::Backup);
				let last = self
					.registry
					.latest(&job.name, Operation::Backup)
					.map(|h| h.snapshot());
				let failures = count_consecutive_failures(&backups);
				JobSummary {
					name: job.name.clone(),
					description: job.description.clone(),
					source: job.source_dataset.clone(),
					target: format!("{}:{}", job.target.login(), job.target_dataset),
					schedule: job.schedule.as_ref().map(ToString::to_string),
					next_run: job
						.schedule
						.as_ref()
						.and_then(|rule| rule.next_after(now, self.timezone)),
					running: self.registry.guard(Operation::Backup).is_held(&job.name),
					restoring: self.registry.guard(Operation::Restore).is_held(&job.name),
					shutdown_after: job.shutdown_after,
					health: determine_health_state(last.as_ref(), failures),
					last_run: last.as_ref().map(LastRunInfo::from),
				}
			})
			.collect()
	}

	/// Start a backup of the named job.
	#[instrument(skip(self), fields(job = %name))]
	pub fn trigger_run(&self, name: &str, trigger: TriggerKind) -> Result<RunHandle, TriggerError> {
		let job = self.job(name)?;
		self.execute(job, trigger)
	}

	/// Start a backup of an already-resolved definition.
	pub fn execute(
		&self,
		job: Arc<JobDefinition>,
		trigger: TriggerKind,
	) -> Result<RunHandle, TriggerError> {
		let permit = self.acquire(&job.name, Operation::Backup)?;
		let plan = RunPlan::backup(&job);
		Ok(self.launch(job, plan, trigger, permit))
	}

	/// Start a restore. `confirmation` must equal the job name exactly;
	/// on mismatch nothing is started and no process runs.
	#[instrument(skip(self, confirmation), fields(job = %name))]
	pub fn trigger_restore(
		&self,
		name: &str,
		confirmation: &str,
		trigger: TriggerKind,
	) -> Result<RunHandle, TriggerError> {
		let job = self.job(name)?;
		if let Err(e) = check_confirmation(&job, confirmation) {
			warn!("restore confirmation mismatch");
			return Err(e);
		}
		let permit = self.acquire(&job.name, Operation::Restore)?;
		let plan = RunPlan::restore(&job);
		Ok(self.launch(job, plan, trigger, permit))
	}

	fn acquire(&self, name: &str, operation: Operation) -> Result<RunPermit, TriggerError> {
		self
			.registry
			.guard(operation)
			.try_permit(name)
			.ok_or_else(|| {
				info!(job = %name, %operation, "trigger rejected: already running");
				TriggerError::AlreadyRunning(name.to_string())
			})
	}

	fn launch(
		&self,
		job: Arc<JobDefinition>,
		plan: RunPlan,
		trigger: TriggerKind,
		permit: RunPermit,
	) -> RunHandle {
		let mut run = Run::new(&job.name, plan.operation, trigger);
		run.attempts_allowed = plan.policy.attempts;
		let (handle, recorder) = new_record(run);
		self.registry.record(handle.clone());
		info!(job = %job.name, run_id = %handle.id(), operation = %plan.operation, %trigger, "run started");

		let executor = Arc::clone(&self.executor);
		let cancel = handle.cancellation();
		let supervisor = recorder.clone();
		let inner = tokio::spawn(async move {
			executor.execute(&job, plan, recorder, cancel, permit).await;
		});

		let notifier = self.executor.notifier();
		let notify_timeout = self.executor.settings().notify_timeout;
		tokio::spawn(async move {
			let Err(e) = inner.await else {
				return;
			};
			// The permit went down with the executor task; only the record is left open.
			// A run that already notified keeps its outcome and is not reported twice.
			if supervisor.crash(format!("executor task failed: {e}")) == CrashClose::Failed {
				let run = supervisor.snapshot();
				if let Some(outcome) = &run.outcome {
					let event = NotificationEvent::from_run(&run, outcome);
					let _ = tokio::time::timeout(notify_timeout, notifier.notify(&event)).await;
				}
			}
		});

		handle
	}

	/// Latest backup run of `name`.
	pub fn run_status(&self, name: &str) -> Option<Run> {
		self
			.registry
			.latest(name, Operation::Backup)
			.map(|h| h.snapshot())
	}

	/// Latest restore run of `name`.
	pub fn restore_status(&self, name: &str) -> Option<Run> {
		self
			.registry
			.latest(name, Operation::Restore)
			.map(|h| h.snapshot())
	}

	pub fn run(&self, id: RunId) -> Option<RunHandle> {
		self.registry.run(id)
	}

	/// Follow the log of a retained run.
	pub fn stream_log(&self, id: RunId) -> Option<impl Stream<Item = LogLine> + Send + 'static> {
		self.registry.run(id).map(|h| h.stream_log())
	}

	/// Abort whatever is running for `name`. Returns whether anything was.
	pub fn abort(&self, name: &str) -> bool {
		let mut aborted = false;
		for operation in [Operation::Backup, Operation::Restore] {
			if let Some(handle) = self.registry.latest(name, operation) {
				if !handle.is_terminal() {
					info!(job = %name, run_id = %handle.id(), %operation, "abort requested");
					handle.abort();
					aborted = true;
				}
			}
		}
		aborted
	}

	pub fn health_status(&self) -> JobsHealthStatus {
		let jobs = self
			.registry
			.jobs()
			.iter()
			.map(|job| {
				let backups = self.registry.runs_for(&job.name, Operation::Backup);
				let failures = count_consecutive_failures(&backups);
				let last = self
					.registry
					.latest(&job.name, Operation::Backup)
					.map(|h| h.snapshot());
				JobHealthStatus {
					name: job.name.clone(),
					status: determine_health_state(last.as_ref(), failures),
					last_run: last.as_ref().map(LastRunInfo::from),
					consecutive_failures: failures,
				}
			})
			.collect();
		JobsHealthStatus::from_jobs(jobs)
	}
}
