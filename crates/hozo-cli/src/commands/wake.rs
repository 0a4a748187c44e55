// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use anyhow::Context;
use hozo_config::HozoConfig;
use hozo_core::{exit_codes, WakeSender};
use hozo_jobs::{wait_reachable, CancellationToken, PollOutcome};
use hozo_system::{TcpProbe, UdpWakeSender};

use super::{find_job, CommandResult};

pub async fn run(config: &HozoConfig, name: &str, wait: bool) -> CommandResult {
	let job = find_job(config, name)?;
	UdpWakeSender
		.wake(&job.wake)
		.await
		.with_context(|| format!("failed to send wake packet to {}", job.wake.mac))?;
	println!(
		"Wake packet sent to {} via {}:{}",
		job.wake.mac, job.wake.broadcast, job.wake.port
	);
	if !wait {
		return Ok(exit_codes::SUCCESS);
	}

	println!(
		"Waiting up to {}s for {}:{}...",
		job.reachability_timeout.as_secs(),
		job.target.host,
		job.target.port
	);
	let cancel = CancellationToken::new();
	let ctrl_c = {
		let cancel = cancel.clone();
		tokio::spawn(async move {
			if tokio::signal::ctrl_c().await.is_ok() {
				cancel.cancel();
			}
		})
	};
	tokio::time::sleep(config.settings.wake_settle).await;
	let outcome = wait_reachable(
		&TcpProbe::default(),
		&job.target.host,
		job.target.port,
		job.reachability_timeout,
		config.settings.poll_interval,
		&cancel,
	)
	.await;
	ctrl_c.abort();

	Ok(match outcome {
		PollOutcome::Ready => {
			println!("{} is reachable", job.target.host);
			exit_codes::SUCCESS
		}
		PollOutcome::TimedOut => {
			eprintln!("{} did not become reachable", job.target.host);
			exit_codes::REACHABILITY_TIMEOUT
		}
		PollOutcome::Cancelled => exit_codes::ABORTED,
	})
}
