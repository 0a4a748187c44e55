// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Running an external program to completion and capturing its output.

use std::process::Stdio;
use std::time::Duration;

use hozo_core::{CollaboratorError, ProcessOutput};
use tokio::process::Command;
use tracing::{debug, warn};

/// Runs `program` with `args`, closing stdin and capturing stdout and stderr.
///
/// The child is killed if `limit` elapses or the returned future is dropped.
/// A child terminated by a signal reports exit code `-1`.
pub async fn run_process(
	program: &str,
	args: &[String],
	limit: Option<Duration>,
) -> Result<ProcessOutput, CollaboratorError> {
	debug!(program, ?args, "spawning process");
	let child = Command::new(program)
		.args(args)
		.stdin(Stdio::null())
		.stdout(Stdio::piped())
		.stderr(Stdio::piped())
		.kill_on_drop(true)
		.spawn()
		.map_err(|source| CollaboratorError::Spawn {
			program: program.to_string(),
			source,
		})?;

	let output = match limit {
		Some(limit) => match tokio::time::timeout(limit, child.wait_with_output()).await {
			Ok(output) => output?,
			Err(_) => {
				warn!(program, secs = limit.as_secs(), "process timed out, killed");
				return Err(CollaboratorError::Timeout(limit.as_secs()));
			}
		},
		None => child.wait_with_output().await?,
	};

	let result = ProcessOutput::new(
		output.status.code().unwrap_or(-1),
		String::from_utf8_lossy(&output.stdout),
		String::from_utf8_lossy(&output.stderr),
	);
	debug!(program, exit_code = result.exit_code, "process exited");
	Ok(result)
}
