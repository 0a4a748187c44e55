// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Interfaces to the external collaborators the engine drives.
//!
//! The engine never touches sockets or processes itself. `hozo-system`
//! provides the production implementations, `hozo-notify` the notifier,
//! and tests substitute in-memory fakes.

use async_trait::async_trait;
use std::fmt;

use crate::error::CollaboratorError;
use crate::event::NotificationEvent;
use crate::types::{RemoteTarget, WakeTarget};

/// Captured result of an external process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
	pub exit_code: i32,
	pub stdout: String,
	pub stderr: String,
}

impl ProcessOutput {
	pub fn new(exit_code: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
		Self {
			exit_code,
			stdout: stdout.into(),
			stderr: stderr.into(),
		}
	}

	pub fn success(&self) -> bool {
		self.exit_code == 0
	}

	/// Non-blank lines of stdout followed by stderr.
	pub fn lines(&self) -> impl Iterator<Item = &str> {
		self
			.stdout
			.lines()
			.chain(self.stderr.lines())
			.filter(|l| !l.trim().is_empty())
	}
}

/// Result of a single connection attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeResult {
	Connected,
	Refused,
	TimedOut,
}

/// One side of a replication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatasetLocation {
	Local { dataset: String },
	Remote { target: RemoteTarget, dataset: String },
}

impl DatasetLocation {
	pub fn dataset(&self) -> &str {
		match self {
			DatasetLocation::Local { dataset } | DatasetLocation::Remote { dataset, .. } => dataset,
		}
	}

	pub fn remote(&self) -> Option<&RemoteTarget> {
		match self {
			DatasetLocation::Local { .. } => None,
			DatasetLocation::Remote { target, .. } => Some(target),
		}
	}
}

impl fmt::Display for DatasetLocation {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			DatasetLocation::Local { dataset } => write!(f, "{dataset}"),
			DatasetLocation::Remote { target, dataset } => write!(f, "{}:{dataset}", target.login()),
		}
	}
}

/// Everything the replication tool needs for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicationRequest {
	pub source: DatasetLocation,
	pub target: DatasetLocation,
	pub recursive: bool,
	/// Delete target state absent from the source (restore only).
	pub destructive: bool,
	pub no_privilege_elevation: bool,
}

#[async_trait]
pub trait WakeSender: Send + Sync {
	/// Fire-and-forget; success means the packet left, nothing more.
	async fn wake(&self, target: &WakeTarget) -> Result<(), CollaboratorError>;
}

#[async_trait]
pub trait ReachabilityProbe: Send + Sync {
	/// A single connection attempt, no retry inside.
	async fn probe(&self, host: &str, port: u16) -> ProbeResult;
}

#[async_trait]
pub trait Replicator: Send + Sync {
	/// Run the replication tool to completion. `Err` only when it could not be run at all.
	async fn run_replication(
		&self,
		request: &ReplicationRequest,
	) -> Result<ProcessOutput, CollaboratorError>;
}

#[async_trait]
pub trait RemoteExecutor: Send + Sync {
	async fn exec_remote(
		&self,
		target: &RemoteTarget,
		command: &str,
	) -> Result<ProcessOutput, CollaboratorError>;
}

#[async_trait]
pub trait Notifier: Send + Sync {
	/// Deliver an event. Implementations swallow their own failures.
	async fn notify(&self, event: &NotificationEvent);
}
