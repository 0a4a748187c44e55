// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use anyhow::{bail, Context};
use hozo_config::HozoConfig;
use hozo_core::{exit_codes, ProcessOutput, RemoteExecutor};
use hozo_jobs::remote::{shutdown_dropped_connection, SHUTDOWN_COMMAND};

use super::{find_job, CommandResult};
use crate::wiring::ssh_executor;

pub async fn run(config: &HozoConfig, name: &str) -> CommandResult {
	let job = find_job(config, name)?;
	let output = ssh_executor(&config.settings)
		.exec_remote(&job.target, SHUTDOWN_COMMAND)
		.await
		.with_context(|| format!("failed to run ssh for {}", job.target.host))?;
	if !accepted(&output) {
		bail!(
			"shutdown of {} failed (exit {}): {}",
			job.target.host,
			output.exit_code,
			output.stderr.trim()
		);
	}
	println!("Shutdown sent to {}", job.target.host);
	Ok(exit_codes::SUCCESS)
}

fn accepted(output: &ProcessOutput) -> bool {
	output.success() || shutdown_dropped_connection(output)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_dropped_connection_counts_as_shutdown() {
		let dropped = ProcessOutput::new(255, "", "Connection to nas.lan closed by remote host.\n");
		assert!(accepted(&dropped));
		assert!(accepted(&ProcessOutput::new(0, "", "")));
		let denied = ProcessOutput::new(1, "", "shutdown: Permission denied\n");
		assert!(!accepted(&denied));
	}
}
