// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use hozo_config::HozoConfig;
use hozo_core::{exit_codes, ProbeResult, ReachabilityProbe, RemoteExecutor};
use hozo_system::TcpProbe;
use tracing::warn;

use super::{find_job, CommandResult};
use crate::wiring::ssh_executor;

const STATUS_COMMANDS: [(&str, &str); 3] = [
	("Uptime", "uptime"),
	("Pools", "zpool list"),
	("Health", "zpool status -x"),
];

pub async fn run(config: &HozoConfig, name: &str) -> CommandResult {
	let job = find_job(config, name)?;
	let host = &job.target.host;
	match TcpProbe::default().probe(host, job.target.port).await {
		ProbeResult::Connected => println!("{host}: reachable"),
		result => {
			println!("{host}: offline ({})", probe_label(result));
			return Ok(exit_codes::REACHABILITY_TIMEOUT);
		}
	}

	let ssh = ssh_executor(&config.settings);
	for (title, command) in STATUS_COMMANDS {
		println!("\n== {title} ==");
		match ssh.exec_remote(&job.target, command).await {
			Ok(output) if output.success() => print!("{}", output.stdout),
			Ok(output) => println!(
				"`{command}` exited {}: {}",
				output.exit_code,
				output.stderr.trim()
			),
			Err(e) => {
				warn!(host = %host, command, error = %e, "status command failed");
				println!("`{command}` could not run: {e}");
			}
		}
	}
	Ok(exit_codes::SUCCESS)
}

fn probe_label(result: ProbeResult) -> &'static str {
	match result {
		ProbeResult::Connected => "connected",
		ProbeResult::Refused => "connection refused",
		ProbeResult::TimedOut => "timed out",
	}
}
