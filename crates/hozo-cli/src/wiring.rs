// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Assembling the engine from configuration and the system collaborators.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use hozo_config::{load_config, load_config_with_file, ConfigError, HozoConfig, SettingsConfig};
use hozo_jobs::{Collaborators, Executor, ExecutorSettings, JobEngine, JobRegistry};
use hozo_notify::NotificationGateway;
use hozo_system::{SshExecutor, SyncoidReplicator, TcpProbe, UdpWakeSender};

/// Headroom over the per-channel timeout for the whole fan-out.
const NOTIFY_GRACE: Duration = Duration::from_secs(5);

pub fn load(path: Option<&Path>) -> Result<HozoConfig, ConfigError> {
	match path {
		Some(path) => load_config_with_file(path),
		None => load_config(),
	}
}

pub fn ssh_executor(settings: &SettingsConfig) -> SshExecutor {
	SshExecutor {
		program: settings.ssh_path.clone(),
		connect_timeout: settings.ssh_connect_timeout,
		..SshExecutor::default()
	}
}

pub fn executor_settings(config: &HozoConfig) -> ExecutorSettings {
	ExecutorSettings {
		poll_interval: config.settings.poll_interval,
		wake_settle: config.settings.wake_settle,
		notify_timeout: config.notifications.timeout + NOTIFY_GRACE,
	}
}

pub fn build_engine(config: &HozoConfig) -> anyhow::Result<JobEngine> {
	let gateway = NotificationGateway::from_config(&config.notifications)
		.context("failed to set up notification channels")?;
	let collaborators = Collaborators {
		waker: Arc::new(UdpWakeSender),
		probe: Arc::new(TcpProbe::default()),
		replicator: Arc::new(SyncoidReplicator::new(config.settings.syncoid_path.clone())),
		remote: Arc::new(ssh_executor(&config.settings)),
		notifier: Arc::new(gateway),
	};
	let executor = Arc::new(Executor::new(collaborators, executor_settings(config)));
	let registry = Arc::new(JobRegistry::with_history_limit(
		config.jobs.clone(),
		config.settings.history_limit,
	)?);
	Ok(JobEngine::new(registry, executor, config.settings.timezone))
}
