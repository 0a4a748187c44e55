// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Foreground scheduler process.

use std::path::Path;
use std::sync::Arc;

use hozo_config::HozoConfig;
use hozo_core::exit_codes;
use hozo_jobs::{JobEngine, Scheduler, SchedulerSettings};
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info, warn};

use super::CommandResult;
use crate::wiring;

pub async fn run(config: HozoConfig, config_path: Option<&Path>) -> CommandResult {
	let engine = wiring::build_engine(&config)?;
	let scheduler = Arc::new(Scheduler::new(
		engine.clone(),
		SchedulerSettings {
			tick_interval: config.settings.tick_interval,
			notify_on_rejection: config.notifications.notify_on_rejection,
		},
	));
	scheduler.start().await;
	info!(jobs = config.jobs.len(), "hozo daemon running");

	let mut sighup = signal(SignalKind::hangup())?;
	let mut sigterm = signal(SignalKind::terminate())?;
	loop {
		tokio::select! {
			_ = tokio::signal::ctrl_c() => {
				info!("Received Ctrl+C, shutting down");
				break;
			}
			_ = sigterm.recv() => {
				info!("Received SIGTERM, shutting down");
				break;
			}
			_ = sighup.recv() => reload(&engine, &config, config_path),
		}
	}

	scheduler.shutdown().await;
	drain(&engine).await;
	info!("hozo daemon stopped");
	Ok(exit_codes::SUCCESS)
}

/// Swap in the job list from a fresh read of the configuration. Runs in
/// flight keep the definition they started with.
fn reload(engine: &JobEngine, current: &HozoConfig, config_path: Option<&Path>) {
	info!("Received SIGHUP, reloading jobs");
	let fresh = match wiring::load(config_path) {
		Ok(fresh) => fresh,
		Err(e) => {
			error!(error = %e, "reload failed, keeping current jobs");
			return;
		}
	};
	if fresh.settings.timezone != current.settings.timezone {
		warn!(
			timezone = %fresh.settings.timezone,
			"timezone changes take effect after a restart"
		);
	}
	let count = fresh.jobs.len();
	match engine.registry().replace_jobs(fresh.jobs) {
		Ok(()) => info!(jobs = count, rejected = fresh.rejected.len(), "jobs reloaded"),
		Err(e) => error!(error = %e, "reload failed, keeping current jobs"),
	}
}

/// Abort everything still running and wait for each run to close out.
async fn drain(engine: &JobEngine) {
	let active = engine.registry().active_runs();
	if active.is_empty() {
		return;
	}
	warn!(count = active.len(), "aborting active runs");
	for handle in &active {
		handle.abort();
	}
	let runs = futures::future::join_all(active.iter().map(|handle| handle.wait())).await;
	for run in runs {
		info!(job = %run.job_name, run_id = %run.id, state = %run.state, "run closed out");
	}
}
