// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! In-memory collaborators for engine tests.
//!
//! Every fake records what it was asked to do. Tests run with paused tokio
//! time, so delays and timeouts elapse instantly but are still observable.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono_tz::Tz;
use hozo_core::{
	CollaboratorError, DeviceSpinup, JobDefinition, NotificationEvent, Notifier, ProbeResult,
	ProcessOutput, ReachabilityProbe, RemoteExecutor, RemoteTarget, ReplicationRequest, Replicator,
	RunState, WakeSender, WakeTarget,
};
use hozo_jobs::{Collaborators, Executor, ExecutorSettings, JobEngine, JobRegistry};
use tokio::time::Instant;

pub fn job(name: &str) -> JobDefinition {
	let mut job = JobDefinition::new(
		name,
		"rpool/data",
		RemoteTarget::new("backup.local", "root"),
		"backup/rpool-data",
		"AA:BB:CC:DD:EE:FF".parse().unwrap(),
	);
	job.retries = 1;
	job.retry_delay = Duration::from_secs(1);
	job.reachability_timeout = Duration::from_secs(30);
	job
}

pub fn with_device(mut job: JobDefinition, timeout: Duration) -> JobDefinition {
	job.device = Some(DeviceSpinup {
		device: "/dev/sdb".into(),
		timeout,
	});
	job
}

#[derive(Default)]
pub struct FakeWaker {
	pub fail: bool,
	pub sent: Mutex<Vec<WakeTarget>>,
}

#[async_trait]
impl WakeSender for FakeWaker {
	async fn wake(&self, target: &WakeTarget) -> Result<(), CollaboratorError> {
		if self.fail {
			return Err(CollaboratorError::Other("network unreachable".into()));
		}
		self.sent.lock().unwrap().push(target.clone());
		Ok(())
	}
}

/// Refuses connections until `ready_after` has elapsed since construction.
pub struct FakeProbe {
	start: Instant,
	ready_after: Option<Duration>,
	pub probes: AtomicU32,
}

impl FakeProbe {
	pub fn ready_after(after: Duration) -> Self {
		Self {
			start: Instant::now(),
			ready_after: Some(after),
			probes: AtomicU32::new(0),
		}
	}

	pub fn never() -> Self {
		Self {
			start: Instant::now(),
			ready_after: None,
			probes: AtomicU32::new(0),
		}
	}
}

#[async_trait]
impl ReachabilityProbe for FakeProbe {
	async fn probe(&self, _host: &str, _port: u16) -> ProbeResult {
		self.probes.fetch_add(1, Ordering::SeqCst);
		match self.ready_after {
			Some(after) if self.start.elapsed() >= after => ProbeResult::Connected,
			_ => ProbeResult::Refused,
		}
	}
}

/// Plays back scripted outputs, then repeats `fallback`.
pub struct FakeReplicator {
	pub script: Mutex<VecDeque<ProcessOutput>>,
	pub fallback: ProcessOutput,
	/// How long each invocation takes.
	pub duration: Duration,
	pub panic: bool,
	pub requests: Mutex<Vec<ReplicationRequest>>,
}

impl FakeReplicator {
	pub fn succeeding() -> Self {
		Self::with_fallback(ProcessOutput::new(
			0,
			"Sending incremental rpool/data@autosnap_a ... autosnap_b (~ 4 KB)\n",
			"",
		))
	}

	pub fn failing() -> Self {
		Self::with_fallback(ProcessOutput::new(
			2,
			"",
			"CRITICAL ERROR: ssh connection failed\n",
		))
	}

	pub fn with_fallback(fallback: ProcessOutput) -> Self {
		Self {
			script: Mutex::new(VecDeque::new()),
			fallback,
			duration: Duration::ZERO,
			panic: false,
			requests: Mutex::new(Vec::new()),
		}
	}

	pub fn then(self, output: ProcessOutput) -> Self {
		self.script.lock().unwrap().push_back(output);
		self
	}

	pub fn calls(&self) -> usize {
		self.requests.lock().unwrap().len()
	}
}

#[async_trait]
impl Replicator for FakeReplicator {
	async fn run_replication(
		&self,
		request: &ReplicationRequest,
	) -> Result<ProcessOutput, CollaboratorError> {
		self.requests.lock().unwrap().push(request.clone());
		if self.panic {
			panic!("replicator exploded");
		}
		if !self.duration.is_zero() {
			tokio::time::sleep(self.duration).await;
		}
		let next = self.script.lock().unwrap().pop_front();
		Ok(next.unwrap_or_else(|| self.fallback.clone()))
	}
}

/// Answers the handful of remote commands the executor issues.
pub struct FakeRemote {
	pub snapshots: Vec<String>,
	pub device_states: Mutex<VecDeque<&'static str>>,
	pub shutdown: ProcessOutput,
	pub shutdown_panics: bool,
	/// How long each device state query takes.
	pub device_query_delay: Duration,
	pub commands: Mutex<Vec<String>>,
}

impl Default for FakeRemote {
	fn default() -> Self {
		Self {
			snapshots: vec![
				"backup/rpool-data@autosnap_a".into(),
				"backup/rpool-data@autosnap_b".into(),
			],
			device_states: Mutex::new(VecDeque::new()),
			shutdown: ProcessOutput::new(0, "", ""),
			shutdown_panics: false,
			device_query_delay: Duration::ZERO,
			commands: Mutex::new(Vec::new()),
		}
	}
}

impl FakeRemote {
	pub fn commands_starting_with(&self, prefix: &str) -> usize {
		self
			.commands
			.lock()
			.unwrap()
			.iter()
			.filter(|c| c.starts_with(prefix))
			.count()
	}
}

#[async_trait]
impl RemoteExecutor for FakeRemote {
	async fn exec_remote(
		&self,
		_target: &RemoteTarget,
		command: &str,
	) -> Result<ProcessOutput, CollaboratorError> {
		self.commands.lock().unwrap().push(command.to_string());
		if command.starts_with("zfs list") {
			return Ok(ProcessOutput::new(0, self.snapshots.join("\n"), ""));
		}
		if command.starts_with("hdparm") {
			if !self.device_query_delay.is_zero() {
				tokio::time::sleep(self.device_query_delay).await;
			}
			let state = self
				.device_states
				.lock()
				.unwrap()
				.pop_front()
				.unwrap_or("active/idle");
			return Ok(ProcessOutput::new(
				0,
				format!("\n/dev/sdb:\n drive state is:  {state}\n"),
				"",
			));
		}
		if command.starts_with("shutdown") {
			if self.shutdown_panics {
				panic!("ssh client exploded");
			}
			return Ok(self.shutdown.clone());
		}
		Ok(ProcessOutput::new(0, "", ""))
	}
}

#[derive(Default)]
pub struct RecordingNotifier {
	pub events: Mutex<Vec<NotificationEvent>>,
}

impl RecordingNotifier {
	pub fn events(&self) -> Vec<NotificationEvent> {
		self.events.lock().unwrap().clone()
	}
}

#[async_trait]
impl Notifier for RecordingNotifier {
	async fn notify(&self, event: &NotificationEvent) {
		self.events.lock().unwrap().push(event.clone());
	}
}

/// Never returns.
pub struct HangingNotifier;

#[async_trait]
impl Notifier for HangingNotifier {
	async fn notify(&self, _event: &NotificationEvent) {
		std::future::pending::<()>().await;
	}
}

pub struct PanickingNotifier;

#[async_trait]
impl Notifier for PanickingNotifier {
	async fn notify(&self, _event: &NotificationEvent) {
		panic!("notifier exploded");
	}
}

pub struct Harness {
	pub waker: Arc<FakeWaker>,
	pub probe: Arc<FakeProbe>,
	pub replicator: Arc<FakeReplicator>,
	pub remote: Arc<FakeRemote>,
	pub notifier: Arc<RecordingNotifier>,
}

impl Default for Harness {
	fn default() -> Self {
		Self {
			waker: Arc::new(FakeWaker::default()),
			probe: Arc::new(FakeProbe::ready_after(Duration::ZERO)),
			replicator: Arc::new(FakeReplicator::succeeding()),
			remote: Arc::new(FakeRemote::default()),
			notifier: Arc::new(RecordingNotifier::default()),
		}
	}
}

impl Harness {
	pub fn collaborators(&self) -> Collaborators {
		Collaborators {
			waker: self.waker.clone(),
			probe: self.probe.clone(),
			replicator: self.replicator.clone(),
			remote: self.remote.clone(),
			notifier: self.notifier.clone(),
		}
	}

	pub fn engine(&self, jobs: Vec<JobDefinition>) -> JobEngine {
		self.engine_with(jobs, self.collaborators(), Tz::UTC)
	}

	pub fn engine_with(
		&self,
		jobs: Vec<JobDefinition>,
		collaborators: Collaborators,
		timezone: Tz,
	) -> JobEngine {
		let registry = Arc::new(JobRegistry::new(jobs).unwrap());
		let executor = Arc::new(Executor::new(collaborators, ExecutorSettings::default()));
		JobEngine::new(registry, executor, timezone)
	}
}

/// Every run's state history must strictly advance through the fixed order.
pub fn assert_monotonic(states: &[RunState]) {
	assert_eq!(states.first(), Some(&RunState::Pending));
	for pair in states.windows(2) {
		assert!(
			pair[0].ordinal() < pair[1].ordinal(),
			"{:?} -> {:?} is not forward in {states:?}",
			pair[0],
			pair[1]
		);
	}
	assert!(states.last().unwrap().is_terminal());
	assert_eq!(states.iter().filter(|s| s.is_terminal()).count(), 1);
}
