// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Global settings section.

use std::time::Duration;

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SettingsConfigLayer {
	pub timezone: Option<String>,
	pub tick_interval_secs: Option<u64>,
	pub poll_interval_secs: Option<u64>,
	pub wake_settle_secs: Option<u64>,
	/// Default `ssh_user` for jobs that do not set one.
	pub ssh_user: Option<String>,
	/// Default reachability timeout for jobs that do not set one.
	pub ssh_timeout: Option<u64>,
	pub ssh_connect_timeout_secs: Option<u64>,
	pub syncoid_path: Option<String>,
	pub ssh_path: Option<String>,
	pub history_limit: Option<usize>,
}

impl SettingsConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.timezone.is_some() {
			self.timezone = other.timezone;
		}
		if other.tick_interval_secs.is_some() {
			self.tick_interval_secs = other.tick_interval_secs;
		}
		if other.poll_interval_secs.is_some() {
			self.poll_interval_secs = other.poll_interval_secs;
		}
		if other.wake_settle_secs.is_some() {
			self.wake_settle_secs = other.wake_settle_secs;
		}
		if other.ssh_user.is_some() {
			self.ssh_user = other.ssh_user;
		}
		if other.ssh_timeout.is_some() {
			self.ssh_timeout = other.ssh_timeout;
		}
		if other.ssh_connect_timeout_secs.is_some() {
			self.ssh_connect_timeout_secs = other.ssh_connect_timeout_secs;
		}
		if other.syncoid_path.is_some() {
			self.syncoid_path = other.syncoid_path;
		}
		if other.ssh_path.is_some() {
			self.ssh_path = other.ssh_path;
		}
		if other.history_limit.is_some() {
			self.history_limit = other.history_limit;
		}
	}

	pub fn finalize(self) -> Result<SettingsConfig, ConfigError> {
		let defaults = SettingsConfig::default();
		let timezone = match self.timezone {
			Some(name) => name.parse::<Tz>().map_err(|_| ConfigError::InvalidValue {
				key: "settings.timezone".to_string(),
				message: format!("unknown timezone '{name}'"),
			})?,
			None => defaults.timezone,
		};
		Ok(SettingsConfig {
			timezone,
			tick_interval: self
				.tick_interval_secs
				.map(Duration::from_secs)
				.unwrap_or(defaults.tick_interval),
			poll_interval: self
				.poll_interval_secs
				.map(Duration::from_secs)
				.unwrap_or(defaults.poll_interval),
			wake_settle: self
				.wake_settle_secs
				.map(Duration::from_secs)
				.unwrap_or(defaults.wake_settle),
			ssh_user: self.ssh_user.unwrap_or(defaults.ssh_user),
			ssh_timeout: self
				.ssh_timeout
				.map(Duration::from_secs)
				.unwrap_or(defaults.ssh_timeout),
			ssh_connect_timeout: self
				.ssh_connect_timeout_secs
				.map(Duration::from_secs)
				.unwrap_or(defaults.ssh_connect_timeout),
			syncoid_path: self.syncoid_path.unwrap_or(defaults.syncoid_path),
			ssh_path: self.ssh_path.unwrap_or(defaults.ssh_path),
			history_limit: self.history_limit.unwrap_or(defaults.history_limit),
		})
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct SettingsConfig {
	pub timezone: Tz,
	pub tick_interval: Duration,
	pub poll_interval: Duration,
	pub wake_settle: Duration,
	pub ssh_user: String,
	pub ssh_timeout: Duration,
	pub ssh_connect_timeout: Duration,
	pub syncoid_path: String,
	pub ssh_path: String,
	pub history_limit: usize,
}

impl Default for SettingsConfig {
	fn default() -> Self {
		Self {
			timezone: Tz::UTC,
			tick_interval: Duration::from_secs(20),
			poll_interval: Duration::from_secs(5),
			wake_settle: Duration::from_secs(3),
			ssh_user: "root".to_string(),
			ssh_timeout: Duration::from_secs(120),
			ssh_connect_timeout: Duration::from_secs(30),
			syncoid_path: "syncoid".to_string(),
			ssh_path: "ssh".to_string(),
			history_limit: 50,
		}
	}
}

impl SettingsConfig {
	/// Cross-field rules that make the whole configuration unusable.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.tick_interval.is_zero() || self.tick_interval >= Duration::from_secs(60) {
			return Err(ConfigError::Validation(format!(
				"settings.tick_interval_secs must be between 1 and 59, got {}",
				self.tick_interval.as_secs()
			)));
		}
		if self.poll_interval.is_zero() {
			return Err(ConfigError::Validation(
				"settings.poll_interval_secs must be at least 1".to_string(),
			));
		}
		if self.history_limit == 0 {
			return Err(ConfigError::Validation(
				"settings.history_limit must be at least 1".to_string(),
			));
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_layer_finalize_defaults() {
		let config = SettingsConfigLayer::default().finalize().unwrap();
		assert_eq!(config, SettingsConfig::default());
		assert!(config.validate().is_ok());
	}

	#[test]
	fn test_timezone_parsed() {
		let layer = SettingsConfigLayer {
			timezone: Some("Australia/Sydney".into()),
			..Default::default()
		};
		assert_eq!(layer.finalize().unwrap().timezone, Tz::Australia__Sydney);
	}

	#[test]
	fn test_unknown_timezone_rejected() {
		let layer = SettingsConfigLayer {
			timezone: Some("Mars/Olympus_Mons".into()),
			..Default::default()
		};
		let err = layer.finalize().unwrap_err();
		assert!(err.to_string().contains("Mars/Olympus_Mons"));
	}

	#[test]
	fn test_tick_interval_must_be_under_a_minute() {
		let config = SettingsConfig {
			tick_interval: Duration::from_secs(60),
			..Default::default()
		};
		assert!(config.validate().is_err());
	}

	#[test]
	fn test_merge_overwrites() {
		let mut base = SettingsConfigLayer {
			timezone: Some("UTC".into()),
			ssh_user: Some("root".into()),
			..Default::default()
		};
		base.merge(SettingsConfigLayer {
			timezone: Some("Europe/London".into()),
			..Default::default()
		});
		assert_eq!(base.timezone.as_deref(), Some("Europe/London"));
		assert_eq!(base.ssh_user.as_deref(), Some("root"));
	}
}
