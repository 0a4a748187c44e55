// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Remote shell commands the executor issues over the remote executor,
//! and parsers for their output.

use hozo_core::ProcessOutput;

pub const SHUTDOWN_COMMAND: &str = "shutdown -h now";

/// Marker echoed when `hdparm` is missing on the backup host.
const HDPARM_UNAVAILABLE: &str = "hdparm_unavailable";

/// Power state reported by `hdparm -C`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceState {
	Active,
	Idle,
	ActiveIdle,
	Standby,
	Sleeping,
	/// hdparm answered but could not tell; treated as ready.
	Unknown,
	/// hdparm is not installed; treated as ready.
	Unavailable,
}

impl DeviceState {
	pub fn is_ready(self) -> bool {
		!matches!(self, DeviceState::Standby | DeviceState::Sleeping)
	}

	pub fn parse(output: &ProcessOutput) -> Self {
		let text = output.stdout.to_ascii_lowercase();
		if text.contains(HDPARM_UNAVAILABLE) {
			return DeviceState::Unavailable;
		}
		let Some(state) = text
			.lines()
			.find_map(|line| line.trim().strip_prefix("drive state is:"))
			.map(str::trim)
		else {
			return DeviceState::Unknown;
		};
		match state {
			"active/idle" => DeviceState::ActiveIdle,
			"active" => DeviceState::Active,
			"idle" => DeviceState::Idle,
			"standby" => DeviceState::Standby,
			"sleeping" => DeviceState::Sleeping,
			_ => DeviceState::Unknown,
		}
	}
}

impl std::fmt::Display for DeviceState {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let s = match self {
			DeviceState::Active => "active",
			DeviceState::Idle => "idle",
			DeviceState::ActiveIdle => "active/idle",
			DeviceState::Standby => "standby",
			DeviceState::Sleeping => "sleeping",
			DeviceState::Unknown => "unknown",
			DeviceState::Unavailable => "hdparm unavailable",
		};
		f.write_str(s)
	}
}

pub fn device_state_command(device: &str) -> String {
	format!(
		"hdparm -C {} 2>/dev/null || echo {HDPARM_UNAVAILABLE}",
		shell_quote(device)
	)
}

/// A single-block read is enough to make a sleeping disk spin up.
pub fn device_kick_command(device: &str) -> String {
	format!(
		"dd if={} of=/dev/null bs=4096 count=1 2>/dev/null",
		shell_quote(device)
	)
}

pub fn list_snapshots_command(dataset: &str) -> String {
	format!("zfs list -H -o name -t snapshot -r {}", shell_quote(dataset))
}

/// Snapshot names from `zfs list -H -o name` output.
pub fn parse_snapshots(output: &ProcessOutput) -> Vec<String> {
	output
		.stdout
		.lines()
		.map(str::trim)
		.filter(|l| !l.is_empty())
		.map(str::to_string)
		.collect()
}

/// A host that powers off tears the session down before ssh can report
/// the command's exit status. That is the expected way for shutdown to end.
pub fn shutdown_dropped_connection(output: &ProcessOutput) -> bool {
	if output.exit_code != 255 {
		return false;
	}
	let stderr = output.stderr.to_ascii_lowercase();
	["closed by remote host", "connection reset", "broken pipe"]
		.iter()
		.any(|needle| stderr.contains(needle))
}

/// POSIX shell quoting for a single word.
pub fn shell_quote(word: &str) -> String {
	let safe = !word.is_empty()
		&& word
			.chars()
			.all(|c| c.is_ascii_alphanumeric() || "@%+=:,./_-".contains(c));
	if safe {
		word.to_string()
	} else {
		format!("'{}'", word.replace('\'', r#"'"'"'"#))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn out(stdout: &str) -> ProcessOutput {
		ProcessOutput::new(0, stdout, "")
	}

	#[test]
	fn test_device_state_parsing() {
		assert_eq!(
			DeviceState::parse(&out("\n/dev/sdb:\n drive state is:  standby\n")),
			DeviceState::Standby
		);
		assert_eq!(
			DeviceState::parse(&out("/dev/sdb:\n drive state is:  active/idle\n")),
			DeviceState::ActiveIdle
		);
		assert_eq!(DeviceState::parse(&out("hdparm_unavailable\n")), DeviceState::Unavailable);
		assert_eq!(DeviceState::parse(&out("garbage")), DeviceState::Unknown);
	}

	#[test]
	fn test_only_standby_and_sleeping_are_not_ready() {
		assert!(!DeviceState::Standby.is_ready());
		assert!(!DeviceState::Sleeping.is_ready());
		assert!(DeviceState::Idle.is_ready());
		assert!(DeviceState::Unknown.is_ready());
		assert!(DeviceState::Unavailable.is_ready());
	}

	#[test]
	fn test_commands_quote_arguments() {
		assert_eq!(
			list_snapshots_command("backup/rpool-data"),
			"zfs list -H -o name -t snapshot -r backup/rpool-data"
		);
		assert_eq!(
			device_state_command("/dev/disk/by-id/ata-WD 1"),
			"hdparm -C '/dev/disk/by-id/ata-WD 1' 2>/dev/null || echo hdparm_unavailable"
		);
		assert_eq!(shell_quote("it's"), r#"'it'"'"'s'"#);
		assert_eq!(shell_quote(""), "''");
	}

	#[test]
	fn test_parse_snapshots() {
		let snaps = parse_snapshots(&out("backup/data@a\n\nbackup/data@b\n"));
		assert_eq!(snaps, vec!["backup/data@a", "backup/data@b"]);
	}

	#[test]
	fn test_shutdown_dropped_connection() {
		let dropped = ProcessOutput::new(255, "", "Connection to nas closed by remote host.\n");
		assert!(shutdown_dropped_connection(&dropped));
		let refused = ProcessOutput::new(255, "", "ssh: connect to host nas port 22: Connection refused\n");
		assert!(!shutdown_dropped_connection(&refused));
	}
}
