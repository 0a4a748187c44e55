// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! `[[jobs]]` entries and their conversion into [`JobDefinition`]s.
//!
//! Validation is per job: a bad entry produces a [`JobLoadError`] and the
//! remaining entries still load.

use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use hozo_core::{DeviceSpinup, JobDefinition, MacAddress, RemoteTarget, ScheduleRule};
use serde::{Deserialize, Serialize};

use super::settings::SettingsConfig;

pub const DEFAULT_DEVICE_SPINUP_SECS: u64 = 90;

/// One raw `[[jobs]]` table, before validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct JobEntry {
	pub name: Option<String>,
	pub description: Option<String>,
	pub source: Option<String>,
	pub target_host: Option<String>,
	pub target_dataset: Option<String>,
	pub mac_address: Option<String>,
	pub ssh_user: Option<String>,
	pub ssh_port: Option<u16>,
	pub ssh_key: Option<PathBuf>,
	pub recursive: Option<bool>,
	pub no_privilege_elevation: Option<bool>,
	pub shutdown_after: Option<bool>,
	/// Seconds to wait for the host to accept ssh connections.
	pub ssh_timeout: Option<u64>,
	pub retries: Option<u32>,
	pub retry_delay: Option<u64>,
	pub broadcast_ip: Option<String>,
	pub wol_port: Option<u16>,
	pub backup_device: Option<String>,
	pub disk_spinup_timeout: Option<u64>,
	pub schedule: Option<String>,
}

/// Why one `[[jobs]]` entry was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobLoadError {
	/// Position in the `[[jobs]]` array.
	pub index: usize,
	pub name: Option<String>,
	pub reasons: Vec<String>,
}

impl fmt::Display for JobLoadError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match &self.name {
			Some(name) => write!(f, "jobs[{}] ({name}): ", self.index)?,
			None => write!(f, "jobs[{}]: ", self.index)?,
		}
		f.write_str(&self.reasons.join("; "))
	}
}

impl std::error::Error for JobLoadError {}

fn required<'a>(value: &'a Option<String>, field: &str, reasons: &mut Vec<String>) -> Option<&'a str> {
	match value.as_deref().map(str::trim) {
		Some(v) if !v.is_empty() => Some(v),
		_ => {
			reasons.push(format!("missing required field '{field}'"));
			None
		}
	}
}

impl JobEntry {
	/// Validates the entry and fills unset fields from `settings` and the
	/// stock job defaults.
	pub fn to_definition(
		&self,
		index: usize,
		settings: &SettingsConfig,
	) -> Result<JobDefinition, JobLoadError> {
		let mut reasons = Vec::new();

		let name = required(&self.name, "name", &mut reasons);
		let source = required(&self.source, "source", &mut reasons);
		let host = required(&self.target_host, "target_host", &mut reasons);
		let target_dataset = required(&self.target_dataset, "target_dataset", &mut reasons);
		let mac = required(&self.mac_address, "mac_address", &mut reasons).and_then(|raw| {
			raw.parse::<MacAddress>()
				.map_err(|_| reasons.push(format!("invalid mac_address '{raw}'")))
				.ok()
		});
		let schedule = match self.schedule.as_deref().map(str::trim) {
			None | Some("") => None,
			Some(raw) => match raw.parse::<ScheduleRule>() {
				Ok(rule) => Some(rule),
				Err(e) => {
					reasons.push(e.to_string());
					None
				}
			},
		};
		if self.retries == Some(0) {
			reasons.push("retries must be at least 1".to_string());
		}

		let (Some(name), Some(source), Some(host), Some(target_dataset), Some(mac), true) =
			(name, source, host, target_dataset, mac, reasons.is_empty())
		else {
			return Err(JobLoadError {
				index,
				name: self.name.clone().filter(|n| !n.trim().is_empty()),
				reasons,
			});
		};

		let mut target = RemoteTarget::new(
			host,
			self.ssh_user.clone().unwrap_or_else(|| settings.ssh_user.clone()),
		);
		if let Some(port) = self.ssh_port {
			target.port = port;
		}
		target.key_path = self.ssh_key.clone();

		let mut job = JobDefinition::new(name, source, target, target_dataset, mac);
		job.description = self.description.clone().unwrap_or_default();
		job.reachability_timeout = self
			.ssh_timeout
			.map(Duration::from_secs)
			.unwrap_or(settings.ssh_timeout);
		if let Some(v) = self.recursive {
			job.recursive = v;
		}
		if let Some(v) = self.no_privilege_elevation {
			job.no_privilege_elevation = v;
		}
		if let Some(v) = self.shutdown_after {
			job.shutdown_after = v;
		}
		if let Some(v) = self.retries {
			job.retries = v;
		}
		if let Some(v) = self.retry_delay {
			job.retry_delay = Duration::from_secs(v);
		}
		if let Some(v) = &self.broadcast_ip {
			job.wake.broadcast = v.clone();
		}
		if let Some(v) = self.wol_port {
			job.wake.port = v;
		}
		job.device = self
			.backup_device
			.as_deref()
			.map(str::trim)
			.filter(|d| !d.is_empty())
			.map(|device| DeviceSpinup {
				device: device.to_string(),
				timeout: Duration::from_secs(
					self.disk_spinup_timeout.unwrap_or(DEFAULT_DEVICE_SPINUP_SECS),
				),
			});
		job.schedule = schedule;
		Ok(job)
	}
}

/// Converts every entry, keeping the first definition of each name.
pub fn resolve_jobs(
	entries: &[JobEntry],
	settings: &SettingsConfig,
) -> (Vec<JobDefinition>, Vec<JobLoadError>) {
	let mut jobs = Vec::new();
	let mut rejected = Vec::new();
	let mut seen = HashSet::new();

	for (index, entry) in entries.iter().enumerate() {
		match entry.to_definition(index, settings) {
			Ok(job) if !seen.insert(job.name.clone()) => rejected.push(JobLoadError {
				index,
				name: Some(job.name.clone()),
				reasons: vec![format!("duplicate job name '{}'", job.name)],
			}),
			Ok(job) => jobs.push(job),
			Err(e) => rejected.push(e),
		}
	}
	(jobs, rejected)
}
