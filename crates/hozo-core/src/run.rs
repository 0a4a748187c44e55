// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Run records and the run state machine vocabulary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::exit_codes;
use crate::log::LogLine;

/// Unique identifier for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub Uuid);

impl RunId {
	pub fn new() -> Self {
		Self(Uuid::new_v4())
	}
}

impl Default for RunId {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Display for RunId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl FromStr for RunId {
	type Err = uuid::Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Ok(Self(Uuid::parse_str(s)?))
	}
}

/// What asked for the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
	Scheduled,
	Manual,
	Api,
}

impl fmt::Display for TriggerKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			TriggerKind::Scheduled => write!(f, "scheduled"),
			TriggerKind::Manual => write!(f, "manual"),
			TriggerKind::Api => write!(f, "api"),
		}
	}
}

/// Direction of the replication a run performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
	/// Local source to remote target.
	Backup,
	/// Break-glass: remote back to local, destructive, single attempt.
	Restore,
}

impl fmt::Display for Operation {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Operation::Backup => write!(f, "backup"),
			Operation::Restore => write!(f, "restore"),
		}
	}
}

/// States of the run state machine, in their only legal order.
///
/// `SpinningUpDevice` and `ShuttingDown` are skipped when not configured;
/// a failing run jumps forward to `Notifying`. A run never moves backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
	Pending,
	Waking,
	WaitingReachable,
	SpinningUpDevice,
	Replicating,
	Verifying,
	Notifying,
	ShuttingDown,
	Succeeded,
	Failed,
}

impl RunState {
	pub const ORDER: [RunState; 10] = [
		RunState::Pending,
		RunState::Waking,
		RunState::WaitingReachable,
		RunState::SpinningUpDevice,
		RunState::Replicating,
		RunState::Verifying,
		RunState::Notifying,
		RunState::ShuttingDown,
		RunState::Succeeded,
		RunState::Failed,
	];

	pub fn ordinal(self) -> usize {
		self as usize
	}

	pub fn is_terminal(self) -> bool {
		matches!(self, RunState::Succeeded | RunState::Failed)
	}

	/// Whether `next` is a legal successor. Terminal states have no successors,
	/// and `Succeeded`/`Failed` are mutually exclusive ends.
	pub fn can_advance_to(self, next: RunState) -> bool {
		if self.is_terminal() {
			return false;
		}
		next.ordinal() > self.ordinal()
	}

	pub fn as_str(self) -> &'static str {
		match self {
			RunState::Pending => "pending",
			RunState::Waking => "waking",
			RunState::WaitingReachable => "waiting_reachable",
			RunState::SpinningUpDevice => "spinning_up_device",
			RunState::Replicating => "replicating",
			RunState::Verifying => "verifying",
			RunState::Notifying => "notifying",
			RunState::ShuttingDown => "shutting_down",
			RunState::Succeeded => "succeeded",
			RunState::Failed => "failed",
		}
	}
}

impl fmt::Display for RunState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Why a run failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
	WakeFailed,
	ReachabilityTimeout,
	DeviceSpinupTimeout,
	ReplicationFailed,
	VerificationMismatch,
	/// The executor task itself died; the run was closed out on its behalf.
	Internal,
}

impl FailureKind {
	pub fn exit_code(self) -> i32 {
		match self {
			FailureKind::WakeFailed => exit_codes::WAKE_FAILED,
			FailureKind::ReachabilityTimeout => exit_codes::REACHABILITY_TIMEOUT,
			FailureKind::DeviceSpinupTimeout => exit_codes::DEVICE_SPINUP_TIMEOUT,
			FailureKind::ReplicationFailed => exit_codes::REPLICATION_FAILED,
			FailureKind::VerificationMismatch => exit_codes::VERIFICATION_MISMATCH,
			FailureKind::Internal => exit_codes::INTERNAL,
		}
	}
}

impl fmt::Display for FailureKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			FailureKind::WakeFailed => "wake_failed",
			FailureKind::ReachabilityTimeout => "reachability_timeout",
			FailureKind::DeviceSpinupTimeout => "device_spinup_timeout",
			FailureKind::ReplicationFailed => "replication_failed",
			FailureKind::VerificationMismatch => "verification_mismatch",
			FailureKind::Internal => "internal",
		};
		f.write_str(s)
	}
}

/// Final outcome of a terminal run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
	Success,
	Failed { kind: FailureKind, message: String },
	Aborted { message: String },
}

impl RunOutcome {
	pub fn is_success(&self) -> bool {
		matches!(self, RunOutcome::Success)
	}

	pub fn exit_code(&self) -> i32 {
		match self {
			RunOutcome::Success => exit_codes::SUCCESS,
			RunOutcome::Failed { kind, .. } => kind.exit_code(),
			RunOutcome::Aborted { .. } => exit_codes::ABORTED,
		}
	}

	pub fn error_message(&self) -> Option<&str> {
		match self {
			RunOutcome::Success => None,
			RunOutcome::Failed { message, .. } | RunOutcome::Aborted { message } => Some(message),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateTransition {
	pub state: RunState,
	pub at: DateTime<Utc>,
}

/// One execution attempt of a job definition.
///
/// Mutated only by the executor that owns it; everyone else sees clones.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
	pub id: RunId,
	pub job_name: String,
	pub operation: Operation,
	pub trigger: TriggerKind,
	pub state: RunState,
	pub transitions: Vec<StateTransition>,
	pub started_at: DateTime<Utc>,
	pub ended_at: Option<DateTime<Utc>>,
	pub attempts_allowed: u32,
	pub attempts_used: u32,
	pub outcome: Option<RunOutcome>,
	/// Remote snapshots observed during verification.
	pub snapshots: Vec<String>,
	/// Set when the post-run shutdown failed; never changes the outcome.
	pub shutdown_error: Option<String>,
	pub log: Vec<LogLine>,
}

impl Run {
	pub fn new(job_name: impl Into<String>, operation: Operation, trigger: TriggerKind) -> Self {
		let now = Utc::now();
		Self {
			id: RunId::new(),
			job_name: job_name.into(),
			operation,
			trigger,
			state: RunState::Pending,
			transitions: vec![StateTransition {
				state: RunState::Pending,
				at: now,
			}],
			started_at: now,
			ended_at: None,
			attempts_allowed: 0,
			attempts_used: 0,
			outcome: None,
			snapshots: Vec::new(),
			shutdown_error: None,
			log: Vec::new(),
		}
	}

	pub fn is_terminal(&self) -> bool {
		self.state.is_terminal()
	}

	pub fn states(&self) -> Vec<RunState> {
		self.transitions.iter().map(|t| t.state).collect()
	}

	pub fn duration_ms(&self) -> Option<i64> {
		self
			.ended_at
			.map(|end| (end - self.started_at).num_milliseconds())
	}
}
