// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The per-run state machine.
//!
//! `Pending -> Waking -> WaitingReachable -> [SpinningUpDevice] -> Replicating
//! -> [Verifying] -> Notifying -> [ShuttingDown] -> Succeeded | Failed`
//!
//! Failures jump forward to `Notifying`; every run notifies exactly once.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use hozo_core::{
	DatasetLocation, DeviceSpinup, FailureKind, JobDefinition, NotificationEvent, Notifier,
	Operation, ReachabilityProbe, RemoteExecutor, ReplicationRequest, Replicator, RunOutcome,
	RunState, WakeSender,
};
use tracing::instrument;

use crate::context::CancellationToken;
use crate::guard::RunPermit;
use crate::poll::{poll_until, wait_reachable, PollOutcome, DEFAULT_POLL_INTERVAL};
use crate::record::RunRecorder;
use crate::remote::{self, DeviceState};
use crate::replication::{ReplicationRunner, RetryPolicy};

/// The external systems a run drives.
#[derive(Clone)]
pub struct Collaborators {
	pub waker: Arc<dyn WakeSender>,
	pub probe: Arc<dyn ReachabilityProbe>,
	pub replicator: Arc<dyn Replicator>,
	pub remote: Arc<dyn RemoteExecutor>,
	pub notifier: Arc<dyn Notifier>,
}

#[derive(Debug, Clone)]
pub struct ExecutorSettings {
	pub poll_interval: Duration,
	/// Pause after the wake packet before the first probe.
	pub wake_settle: Duration,
	/// Upper bound on one notification fan-out.
	pub notify_timeout: Duration,
}

impl Default for ExecutorSettings {
	fn default() -> Self {
		Self {
			poll_interval: DEFAULT_POLL_INTERVAL,
			wake_settle: Duration::from_secs(3),
			notify_timeout: Duration::from_secs(30),
		}
	}
}

/// What one run should do once the host is up.
#[derive(Debug, Clone)]
pub(crate) struct RunPlan {
	pub operation: Operation,
	pub request: ReplicationRequest,
	pub policy: RetryPolicy,
	pub verify: bool,
}

impl RunPlan {
	pub fn backup(job: &JobDefinition) -> Self {
		Self {
			operation: Operation::Backup,
			request: ReplicationRequest {
				source: DatasetLocation::Local {
					dataset: job.source_dataset.clone(),
				},
				target: DatasetLocation::Remote {
					target: job.target.clone(),
					dataset: job.target_dataset.clone(),
				},
				recursive: job.recursive,
				destructive: false,
				no_privilege_elevation: job.no_privilege_elevation,
			},
			policy: RetryPolicy::new(job.retries, job.retry_delay),
			verify: true,
		}
	}
}

type StepResult = Result<(), RunOutcome>;

fn failed(kind: FailureKind, message: impl Into<String>) -> RunOutcome {
	RunOutcome::Failed {
		kind,
		message: message.into(),
	}
}

fn aborted(during: RunState) -> RunOutcome {
	RunOutcome::Aborted {
		message: format!("aborted during {during}"),
	}
}

pub struct Executor {
	collaborators: Collaborators,
	settings: ExecutorSettings,
}

impl Executor {
	pub fn new(collaborators: Collaborators, settings: ExecutorSettings) -> Self {
		Self {
			collaborators,
			settings,
		}
	}

	pub fn settings(&self) -> &ExecutorSettings {
		&self.settings
	}

	pub fn notifier(&self) -> Arc<dyn Notifier> {
		Arc::clone(&self.collaborators.notifier)
	}

	/// Drive one run to a terminal state. The permit is released just before
	/// the terminal transition so a caller woken by it can trigger again.
	#[instrument(skip_all, fields(job = %job.name, operation = %plan.operation))]
	pub(crate) async fn execute(
		&self,
		job: &JobDefinition,
		plan: RunPlan,
		recorder: RunRecorder,
		cancel: CancellationToken,
		permit: RunPermit,
	) {
		recorder.update(|run| run.attempts_allowed = plan.policy.attempts);
		recorder.info(format!(
			"Starting {} of '{}' ({} -> {})",
			plan.operation, job.name, plan.request.source, plan.request.target
		));

		let mut reached = false;
		let outcome = match self
			.steps(job, &plan, &recorder, &cancel, &mut reached)
			.await
		{
			Ok(()) => RunOutcome::Success,
			Err(outcome) => outcome,
		};

		match &outcome {
			RunOutcome::Success => recorder.info(format!("{} completed", plan.operation)),
			RunOutcome::Failed { kind, message } => {
				recorder.error(format!("{} failed ({kind}): {message}", plan.operation))
			}
			RunOutcome::Aborted { message } => recorder.warn(format!("Run {message}")),
		}
		recorder.set_outcome(outcome.clone());

		recorder.transition(RunState::Notifying);
		self.notify(&recorder, &outcome).await;

		if job.shutdown_after && reached {
			recorder.transition(RunState::ShuttingDown);
			self.shutdown(job, &recorder).await;
		}

		drop(permit);
		let terminal = if outcome.is_success() {
			RunState::Succeeded
		} else {
			RunState::Failed
		};
		recorder.transition(terminal);
	}

	async fn steps(
		&self,
		job: &JobDefinition,
		plan: &RunPlan,
		recorder: &RunRecorder,
		cancel: &CancellationToken,
		reached: &mut bool,
	) -> StepResult {
		self.check_abort(recorder, cancel)?;
		recorder.transition(RunState::Waking);
		self.wake(job, recorder, cancel).await?;

		recorder.transition(RunState::WaitingReachable);
		self.wait_reachable(job, recorder, cancel).await?;
		*reached = true;

		if let Some(device) = &job.device {
			self.check_abort(recorder, cancel)?;
			recorder.transition(RunState::SpinningUpDevice);
			self.spin_up(job, device, recorder, cancel).await?;
		}

		self.check_abort(recorder, cancel)?;
		recorder.transition(RunState::Replicating);
		self.replicate(plan, recorder, cancel).await?;

		if plan.verify {
			self.check_abort(recorder, cancel)?;
			recorder.transition(RunState::Verifying);
			self.verify(job, recorder).await?;
		}
		Ok(())
	}

	fn check_abort(&self, recorder: &RunRecorder, cancel: &CancellationToken) -> StepResult {
		if cancel.is_cancelled() {
			return Err(aborted(recorder.state()));
		}
		Ok(())
	}

	async fn wake(
		&self,
		job: &JobDefinition,
		recorder: &RunRecorder,
		cancel: &CancellationToken,
	) -> StepResult {
		recorder.info(format!(
			"Sending wake packet to {} via {}:{}",
			job.wake.mac, job.wake.broadcast, job.wake.port
		));
		self
			.collaborators
			.waker
			.wake(&job.wake)
			.await
			.map_err(|e| failed(FailureKind::WakeFailed, format!("wake packet not sent: {e}")))?;

		if !self.settings.wake_settle.is_zero() {
			tokio::select! {
				_ = tokio::time::sleep(self.settings.wake_settle) => {}
				_ = cancel.cancelled() => return Err(aborted(RunState::Waking)),
			}
		}
		Ok(())
	}

	async fn wait_reachable(
		&self,
		job: &JobDefinition,
		recorder: &RunRecorder,
		cancel: &CancellationToken,
	) -> StepResult {
		let target = &job.target;
		recorder.info(format!(
			"Waiting up to {}s for {}:{}",
			job.reachability_timeout.as_secs(),
			target.host,
			target.port
		));
		match wait_reachable(
			self.collaborators.probe.as_ref(),
			&target.host,
			target.port,
			job.reachability_timeout,
			self.settings.poll_interval,
			cancel,
		)
		.await
		{
			PollOutcome::Ready => {
				recorder.info(format!("{} is reachable", target.host));
				Ok(())
			}
			PollOutcome::TimedOut => Err(failed(
				FailureKind::ReachabilityTimeout,
				format!(
					"{} not reachable on port {} within {}s",
					target.host,
					target.port,
					job.reachability_timeout.as_secs()
				),
			)),
			PollOutcome::Cancelled => Err(aborted(RunState::WaitingReachable)),
		}
	}

	async fn spin_up(
		&self,
		job: &JobDefinition,
		device: &DeviceSpinup,
		recorder: &RunRecorder,
		cancel: &CancellationToken,
	) -> StepResult {
		recorder.info(format!(
			"Waiting up to {}s for {} to spin up",
			device.timeout.as_secs(),
			device.device
		));
		let remote = self.collaborators.remote.as_ref();
		let kicked = AtomicBool::new(false);
		let kicked = &kicked;

		let outcome = poll_until(self.settings.poll_interval, device.timeout, cancel, |_| async move {
			let state = match remote
				.exec_remote(&job.target, &remote::device_state_command(&device.device))
				.await
			{
				Ok(output) => DeviceState::parse(&output),
				Err(e) => {
					recorder.warn(format!("Device state query failed: {e}"));
					return false;
				}
			};
			if state.is_ready() {
				recorder.info(format!("{} is {state}", device.device));
				return true;
			}
			if !kicked.swap(true, Ordering::SeqCst) {
				recorder.info(format!("{} is {state}, issuing a read to spin it up", device.device));
				if let Err(e) = remote
					.exec_remote(&job.target, &remote::device_kick_command(&device.device))
					.await
				{
					recorder.warn(format!("Spin-up read failed: {e}"));
				}
			}
			false
		})
		.await;

		match outcome {
			PollOutcome::Ready => Ok(()),
			PollOutcome::TimedOut => Err(failed(
				FailureKind::DeviceSpinupTimeout,
				format!(
					"{} not ready within {}s",
					device.device,
					device.timeout.as_secs()
				),
			)),
			PollOutcome::Cancelled => Err(aborted(RunState::SpinningUpDevice)),
		}
	}

	async fn replicate(
		&self,
		plan: &RunPlan,
		recorder: &RunRecorder,
		cancel: &CancellationToken,
	) -> StepResult {
		let runner = ReplicationRunner::new(self.collaborators.replicator.as_ref(), recorder, cancel);
		let outcome = runner.replicate(&plan.request, plan.policy).await;
		if outcome.success {
			return Ok(());
		}
		if outcome.aborted {
			return Err(aborted(RunState::Replicating));
		}
		let last = outcome
			.last_error
			.unwrap_or_else(|| "unknown error".to_string());
		Err(failed(
			FailureKind::ReplicationFailed,
			format!("all {} attempt(s) failed; last error: {last}", outcome.attempts_used),
		))
	}

	async fn verify(&self, job: &JobDefinition, recorder: &RunRecorder) -> StepResult {
		recorder.info(format!("Listing snapshots of {} on {}", job.target_dataset, job.target.host));
		let output = self
			.collaborators
			.remote
			.exec_remote(&job.target, &remote::list_snapshots_command(&job.target_dataset))
			.await
			.map_err(|e| {
				failed(
					FailureKind::VerificationMismatch,
					format!("snapshot listing failed: {e}"),
				)
			})?;
		if !output.success() {
			return Err(failed(
				FailureKind::VerificationMismatch,
				format!(
					"snapshot listing exited {}: {}",
					output.exit_code,
					output.stderr.trim()
				),
			));
		}
		let snapshots = remote::parse_snapshots(&output);
		if snapshots.is_empty() {
			return Err(failed(
				FailureKind::VerificationMismatch,
				format!("no snapshots of {} found on {}", job.target_dataset, job.target.host),
			));
		}
		recorder.info(format!(
			"Verified {} snapshot(s); latest {}",
			snapshots.len(),
			snapshots.last().map(String::as_str).unwrap_or_default()
		));
		recorder.update(|run| run.snapshots = snapshots);
		Ok(())
	}

	/// Failures, panics and timeouts here are logged and never change the outcome.
	async fn notify(&self, recorder: &RunRecorder, outcome: &RunOutcome) {
		let event = NotificationEvent::from_run(&recorder.snapshot(), outcome);
		let notifier = Arc::clone(&self.collaborators.notifier);
		let mut task = tokio::spawn(async move { notifier.notify(&event).await });
		match tokio::time::timeout(self.settings.notify_timeout, &mut task).await {
			Ok(Ok(())) => recorder.info("Notification dispatched"),
			Ok(Err(e)) => recorder.warn(format!("Notifier failed: {e}")),
			Err(_) => {
				task.abort();
				recorder.warn(format!(
					"Notification did not finish within {}s",
					self.settings.notify_timeout.as_secs()
				));
			}
		}
	}

	async fn shutdown(&self, job: &JobDefinition, recorder: &RunRecorder) {
		recorder.info(format!("Shutting down {}", job.target.host));
		let result = self
			.collaborators
			.remote
			.exec_remote(&job.target, remote::SHUTDOWN_COMMAND)
			.await;
		let error = match result {
			Ok(output) if output.success() || remote::shutdown_dropped_connection(&output) => None,
			Ok(output) => Some(format!(
				"shutdown exited {}: {}",
				output.exit_code,
				output.stderr.trim()
			)),
			Err(e) => Some(format!("shutdown not sent: {e}")),
		};
		match error {
			None => recorder.info(format!("Shutdown command sent to {}", job.target.host)),
			Some(error) => {
				recorder.warn(format!("Shutdown failed: {error}"));
				recorder.update(|run| run.shutdown_error = Some(error));
			}
		}
	}
}
