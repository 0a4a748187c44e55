// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! `syncoid` as the replication tool.

use std::time::Duration;

use async_trait::async_trait;
use hozo_core::{CollaboratorError, ProcessOutput, RemoteTarget, ReplicationRequest, Replicator};
use tracing::info;

use crate::process::run_process;

/// Upper bound on a single syncoid invocation.
pub const DEFAULT_REPLICATION_TIMEOUT: Duration = Duration::from_secs(6 * 3600);

#[derive(Debug, Clone)]
pub struct SyncoidReplicator {
	pub program: String,
	pub timeout: Duration,
}

impl Default for SyncoidReplicator {
	fn default() -> Self {
		Self::new("syncoid")
	}
}

impl SyncoidReplicator {
	pub fn new(program: impl Into<String>) -> Self {
		Self {
			program: program.into(),
			timeout: DEFAULT_REPLICATION_TIMEOUT,
		}
	}
}

fn remote_target(request: &ReplicationRequest) -> Option<&RemoteTarget> {
	request.source.remote().or_else(|| request.target.remote())
}

/// The argument vector for one replication, without the program name.
///
/// ssh options come from whichever side is remote; the source is always
/// the second-to-last argument and the target the last.
pub fn syncoid_args(request: &ReplicationRequest) -> Vec<String> {
	let mut args = Vec::new();
	if request.recursive {
		args.push("--recursive".to_string());
	}
	if request.no_privilege_elevation {
		args.push("--no-privilege-elevation".to_string());
	}
	if request.destructive {
		args.push("--force-delete".to_string());
	}
	if let Some(remote) = remote_target(request) {
		if remote.port != 22 {
			args.push(format!("--sshport={}", remote.port));
		}
		if let Some(key) = &remote.key_path {
			args.push(format!("--sshkey={}", key.display()));
		}
	}
	args.push("--sshoption=StrictHostKeyChecking=accept-new".to_string());
	args.push(request.source.to_string());
	args.push(request.target.to_string());
	args
}

#[async_trait]
impl Replicator for SyncoidReplicator {
	async fn run_replication(
		&self,
		request: &ReplicationRequest,
	) -> Result<ProcessOutput, CollaboratorError> {
		let args = syncoid_args(request);
		info!(
			program = %self.program,
			source = %request.source,
			target = %request.target,
			"running replication"
		);
		run_process(&self.program, &args, Some(self.timeout)).await
	}
}
