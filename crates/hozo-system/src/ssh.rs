// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Remote command execution through the system `ssh` client.

use std::time::Duration;

use async_trait::async_trait;
use hozo_core::{CollaboratorError, ProcessOutput, RemoteExecutor, RemoteTarget};
use tracing::debug;

use crate::process::run_process;

#[derive(Debug, Clone)]
pub struct SshExecutor {
	pub program: String,
	pub connect_timeout: Duration,
	/// Upper bound on the whole remote command.
	pub command_timeout: Duration,
}

impl Default for SshExecutor {
	fn default() -> Self {
		Self {
			program: "ssh".to_string(),
			connect_timeout: Duration::from_secs(30),
			command_timeout: Duration::from_secs(300),
		}
	}
}

impl SshExecutor {
	/// Non-interactive: never prompts for a password or an unknown host key
	/// beyond accepting a first-seen key.
	pub fn args(&self, target: &RemoteTarget, command: &str) -> Vec<String> {
		let mut args = vec![
			"-o".to_string(),
			"BatchMode=yes".to_string(),
			"-o".to_string(),
			format!("ConnectTimeout={}", self.connect_timeout.as_secs().max(1)),
			"-o".to_string(),
			"StrictHostKeyChecking=accept-new".to_string(),
			"-p".to_string(),
			target.port.to_string(),
		];
		if let Some(key) = &target.key_path {
			args.push("-i".to_string());
			args.push(key.display().to_string());
		}
		args.push(target.login());
		args.push(command.to_string());
		args
	}
}

#[async_trait]
impl RemoteExecutor for SshExecutor {
	async fn exec_remote(
		&self,
		target: &RemoteTarget,
		command: &str,
	) -> Result<ProcessOutput, CollaboratorError> {
		debug!(host = %target.host, command, "remote exec");
		let args = self.args(target, command);
		run_process(&self.program, &args, Some(self.command_timeout)).await
	}
}
