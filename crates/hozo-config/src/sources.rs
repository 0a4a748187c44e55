// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: built-in defaults, a TOML file and environment variables.

use std::collections::HashMap;
use std::path::PathBuf;

use tracing::{debug, trace};

use crate::error::ConfigError;
use crate::layer::HozoConfigLayer;
use crate::sections::{
	LogFormat, LoggingConfigLayer, NotificationsConfigLayer, NtfyConfigLayer, PushoverConfigLayer,
	SettingsConfigLayer, SmtpConfigLayer, WebhookConfigLayer,
};

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 20,
	Environment = 50,
}

/// Trait for configuration sources.
pub trait ConfigSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn precedence(&self) -> Precedence;
	fn load(&self) -> Result<HozoConfigLayer, ConfigError>;
}

/// Built-in defaults source.
pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<HozoConfigLayer, ConfigError> {
		debug!("loading defaults");
		Ok(HozoConfigLayer::default())
	}
}

/// `$XDG_CONFIG_HOME/hozo/config.toml`, or `/etc/hozo/config.toml` when no
/// user config directory exists.
pub fn default_config_path() -> PathBuf {
	dirs::config_dir()
		.map(|dir| dir.join("hozo").join("config.toml"))
		.unwrap_or_else(|| PathBuf::from("/etc/hozo/config.toml"))
}

/// TOML file configuration source.
pub struct TomlSource {
	path: PathBuf,
	required: bool,
}

impl TomlSource {
	/// A file that is skipped when missing.
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self {
			path: path.into(),
			required: false,
		}
	}

	/// A file the caller asked for explicitly; missing is an error.
	pub fn required(path: impl Into<PathBuf>) -> Self {
		Self {
			path: path.into(),
			required: true,
		}
	}

	pub fn user() -> Self {
		Self::new(default_config_path())
	}

	pub fn path(&self) -> &std::path::Path {
		&self.path
	}
}

impl ConfigSource for TomlSource {
	fn name(&self) -> &'static str {
		"toml-config"
	}

	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<HozoConfigLayer, ConfigError> {
		if !self.path.exists() {
			if self.required {
				return Err(ConfigError::NotFound(self.path.clone()));
			}
			debug!(path = %self.path.display(), "config file not found, skipping");
			return Ok(HozoConfigLayer::default());
		}

		debug!(path = %self.path.display(), "loading config file");
		let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::FileRead {
			path: self.path.clone(),
			source: e,
		})?;

		let layer: HozoConfigLayer = toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
			path: self.path.clone(),
			source: e,
		})?;

		trace!("parsed config layer from TOML");
		Ok(layer)
	}
}

/// Environment variable source.
///
/// Convention: HOZO_<FIELD>. Jobs are never read from the environment.
#[derive(Default)]
pub struct EnvSource {
	vars: Option<HashMap<String, String>>,
}

impl EnvSource {
	/// Reads the process environment.
	pub fn new() -> Self {
		Self::default()
	}

	/// Reads from a fixed map instead of the process environment.
	pub fn from_vars<K, V>(vars: impl IntoIterator<Item = (K, V)>) -> Self
	where
		K: Into<String>,
		V: Into<String>,
	{
		Self {
			vars: Some(
				vars.into_iter()
					.map(|(k, v)| (k.into(), v.into()))
					.collect(),
			),
		}
	}

	fn var(&self, name: &str) -> Option<String> {
		let value = match &self.vars {
			Some(vars) => vars.get(name).cloned(),
			None => std::env::var(name).ok(),
		};
		value.filter(|s| !s.is_empty())
	}

	fn var_bool(&self, name: &str) -> Option<bool> {
		self.var(name)
			.map(|v| v.eq_ignore_ascii_case("true") || v == "1")
	}

	fn var_u64(&self, name: &str) -> Result<Option<u64>, ConfigError> {
		match self.var(name) {
			Some(v) => v.parse().map(Some).map_err(|_| ConfigError::InvalidValue {
				key: name.to_string(),
				message: format!("invalid u64 value '{v}'"),
			}),
			None => Ok(None),
		}
	}

	fn load_settings(&self) -> Result<SettingsConfigLayer, ConfigError> {
		Ok(SettingsConfigLayer {
			timezone: self.var("HOZO_TIMEZONE"),
			tick_interval_secs: self.var_u64("HOZO_TICK_INTERVAL_SECS")?,
			..Default::default()
		})
	}

	fn load_logging(&self) -> Result<LoggingConfigLayer, ConfigError> {
		let format = match self.var("HOZO_LOG_FORMAT") {
			Some(v) => Some(v.parse::<LogFormat>().map_err(|message| {
				ConfigError::InvalidValue {
					key: "HOZO_LOG_FORMAT".to_string(),
					message,
				}
			})?),
			None => None,
		};
		Ok(LoggingConfigLayer {
			level: self.var("HOZO_LOG_LEVEL"),
			format,
		})
	}

	fn load_notifications(&self) -> NotificationsConfigLayer {
		let ntfy = NtfyConfigLayer {
			server: self.var("HOZO_NTFY_SERVER"),
			topic: self.var("HOZO_NTFY_TOPIC"),
		};
		let pushover = PushoverConfigLayer {
			token: self.var("HOZO_PUSHOVER_TOKEN"),
			user: self.var("HOZO_PUSHOVER_USER"),
		};
		let smtp = SmtpConfigLayer {
			password: self.var("HOZO_SMTP_PASSWORD"),
			..Default::default()
		};
		let webhook = WebhookConfigLayer {
			url: self.var("HOZO_WEBHOOK_URL"),
			secret: self.var("HOZO_WEBHOOK_SECRET"),
		};

		// Only materialize sub-tables the environment touched, so an env layer
		// never enables a channel the file did not mention.
		NotificationsConfigLayer {
			notify_on_rejection: self.var_bool("HOZO_NOTIFY_ON_REJECTION"),
			ntfy: (ntfy != NtfyConfigLayer::default()).then_some(ntfy),
			pushover: (pushover != PushoverConfigLayer::default()).then_some(pushover),
			smtp: (smtp != SmtpConfigLayer::default()).then_some(smtp),
			webhook: (webhook != WebhookConfigLayer::default()).then_some(webhook),
			..Default::default()
		}
	}
}

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<HozoConfigLayer, ConfigError> {
		debug!("loading environment variables");
		Ok(HozoConfigLayer {
			settings: Some(self.load_settings()?),
			logging: Some(self.load_logging()?),
			notifications: Some(self.load_notifications()),
			jobs: None,
		})
	}
}
