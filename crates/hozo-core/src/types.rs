// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Job definition types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::MacParseError;
use crate::schedule::ScheduleRule;

/// A hardware address used as the Wake-on-LAN target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MacAddress(pub [u8; 6]);

impl MacAddress {
	pub fn octets(&self) -> [u8; 6] {
		self.0
	}
}

impl fmt::Display for MacAddress {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let o = self.0;
		write!(
			f,
			"{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
			o[0], o[1], o[2], o[3], o[4], o[5]
		)
	}
}

impl FromStr for MacAddress {
	type Err = MacParseError;

	/// Accepts `AA:BB:CC:DD:EE:FF` or `AA-BB-CC-DD-EE-FF`.
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let invalid = || MacParseError(s.to_string());
		let parts: Vec<&str> = s.trim().split([':', '-']).collect();
		if parts.len() != 6 {
			return Err(invalid());
		}
		let mut octets = [0u8; 6];
		for (slot, part) in octets.iter_mut().zip(&parts) {
			if part.len() != 2 || !part.bytes().all(|b| b.is_ascii_hexdigit()) {
				return Err(invalid());
			}
			*slot = u8::from_str_radix(part, 16).map_err(|_| invalid())?;
		}
		Ok(Self(octets))
	}
}

impl Serialize for MacAddress {
	fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.collect_str(self)
	}
}

impl<'de> Deserialize<'de> for MacAddress {
	fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		let s = String::deserialize(deserializer)?;
		s.parse().map_err(serde::de::Error::custom)
	}
}

/// Where and how the wake packet is sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WakeTarget {
	pub mac: MacAddress,
	/// Broadcast address, `255.255.255.255` unless the LAN needs a directed broadcast.
	pub broadcast: String,
	pub port: u16,
}

/// The remote host plus the credentials reference used to reach it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteTarget {
	pub host: String,
	pub port: u16,
	pub user: String,
	/// Private key path; `None` defers to the ssh agent and default keys.
	pub key_path: Option<PathBuf>,
}

impl RemoteTarget {
	pub fn new(host: impl Into<String>, user: impl Into<String>) -> Self {
		Self {
			host: host.into(),
			port: 22,
			user: user.into(),
			key_path: None,
		}
	}

	/// `user@host`, as ssh and syncoid expect it.
	pub fn login(&self) -> String {
		format!("{}@{}", self.user, self.host)
	}
}

/// Optional wait for an external drive on the remote machine to spin up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceSpinup {
	/// Block device path on the remote, e.g. `/dev/sda`.
	pub device: String,
	pub timeout: Duration,
}

/// An immutable, externally loaded description of one backup job.
///
/// `name` is unique among the loaded definitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobDefinition {
	pub name: String,
	pub description: String,
	/// Local dataset, e.g. `rpool/data`.
	pub source_dataset: String,
	pub target: RemoteTarget,
	/// Dataset on the remote machine, e.g. `backup/rpool-data`.
	pub target_dataset: String,
	pub wake: WakeTarget,
	pub recursive: bool,
	pub no_privilege_elevation: bool,
	pub shutdown_after: bool,
	/// Number of replication attempts (at least one).
	pub retries: u32,
	pub retry_delay: Duration,
	pub reachability_timeout: Duration,
	pub device: Option<DeviceSpinup>,
	pub schedule: Option<ScheduleRule>,
}

impl JobDefinition {
	/// A definition with the stock defaults, for callers that fill in the rest.
	pub fn new(
		name: impl Into<String>,
		source_dataset: impl Into<String>,
		target: RemoteTarget,
		target_dataset: impl Into<String>,
		mac: MacAddress,
	) -> Self {
		Self {
			name: name.into(),
			description: String::new(),
			source_dataset: source_dataset.into(),
			target,
			target_dataset: target_dataset.into(),
			wake: WakeTarget {
				mac,
				broadcast: "255.255.255.255".to_string(),
				port: 9,
			},
			recursive: true,
			no_privilege_elevation: false,
			shutdown_after: true,
			retries: 3,
			retry_delay: Duration::from_secs(60),
			reachability_timeout: Duration::from_secs(120),
			device: None,
			schedule: None,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_mac_parse_colon_and_dash() {
		let a: MacAddress = "aa:bb:cc:dd:ee:ff".parse().unwrap();
		let b: MacAddress = "AA-BB-CC-DD-EE-FF".parse().unwrap();
		assert_eq!(a, b);
		assert_eq!(a.to_string(), "AA:BB:CC:DD:EE:FF");
	}

	#[test]
	fn test_mac_parse_rejects_garbage() {
		assert!("AA:BB:CC:DD:EE".parse::<MacAddress>().is_err());
		assert!("AA:BB:CC:DD:EE:GG".parse::<MacAddress>().is_err());
		assert!("AAA:BB:CC:DD:EE:F".parse::<MacAddress>().is_err());
		assert!("".parse::<MacAddress>().is_err());
	}

	#[test]
	fn test_mac_rejects_signed_octets() {
		let err = "+A:BB:CC:DD:EE:FF".parse::<MacAddress>().unwrap_err();
		assert_eq!(err, MacParseError("+A:BB:CC:DD:EE:FF".into()));
		assert!(err.to_string().contains("six hex octets"));
		assert!("AA:BB:CC:DD:EE:+f".parse::<MacAddress>().is_err());
	}

	#[test]
	fn test_remote_login() {
		let target = RemoteTarget::new("backup.local", "admin");
		assert_eq!(target.login(), "admin@backup.local");
		assert_eq!(target.port, 22);
	}

	#[test]
	fn test_job_definition_defaults() {
		let job = JobDefinition::new(
			"weekly",
			"rpool/data",
			RemoteTarget::new("backup.local", "root"),
			"backup/data",
			"AA:BB:CC:DD:EE:FF".parse().unwrap(),
		);
		assert_eq!(job.retries, 3);
		assert_eq!(job.retry_delay, Duration::from_secs(60));
		assert_eq!(job.reachability_timeout, Duration::from_secs(120));
		assert!(job.shutdown_after);
		assert!(job.recursive);
		assert_eq!(job.wake.broadcast, "255.255.255.255");
	}
}
