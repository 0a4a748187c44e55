// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Layered configuration for Hozo.
//!
//! This crate provides:
//! - Layered configuration from defaults, a TOML file and the environment
//! - Conversion of `[[jobs]]` tables into validated [`hozo_core::JobDefinition`]s
//! - Consistent environment variable naming (`HOZO_*`)
//!
//! A job that fails validation is reported in [`HozoConfig::rejected`] and
//! the rest still load. Anything wrong outside `[[jobs]]` fails the whole load.
//!
//! # Usage
//!
//! ```ignore
//! use hozo_config::load_config;
//!
//! let config = load_config()?;
//! for job in &config.jobs {
//!     println!("{} -> {}", job.name, job.target.host);
//! }
//! ```

pub mod error;
pub mod layer;
pub mod sections;
pub mod sources;

pub use error::ConfigError;
pub use layer::HozoConfigLayer;
pub use sections::*;
pub use sources::{
	default_config_path, ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource,
};

use std::path::PathBuf;

use hozo_core::JobDefinition;
use tracing::{debug, info, warn};

/// Fully resolved configuration.
#[derive(Debug, Clone, Default)]
pub struct HozoConfig {
	pub settings: SettingsConfig,
	pub logging: LoggingConfig,
	pub notifications: NotificationsConfig,
	pub jobs: Vec<JobDefinition>,
	/// Jobs that failed validation and were left out of `jobs`.
	pub rejected: Vec<JobLoadError>,
	/// The file that was read, if any.
	pub path: Option<PathBuf>,
}

impl HozoConfig {
	pub fn job(&self, name: &str) -> Option<&JobDefinition> {
		self.jobs.iter().find(|job| job.name == name)
	}
}

/// Load configuration from all sources with standard precedence.
///
/// Precedence (highest to lowest):
/// 1. Environment variables (`HOZO_*`)
/// 2. Config file (`$XDG_CONFIG_HOME/hozo/config.toml`, skipped when missing)
/// 3. Built-in defaults
pub fn load_config() -> Result<HozoConfig, ConfigError> {
	let file = TomlSource::user();
	let path = file.path().exists().then(|| file.path().to_path_buf());
	let config = load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(file),
		Box::new(EnvSource::new()),
	])?;
	Ok(HozoConfig { path, ..config })
}

/// Load configuration with an explicit config file, which must exist.
pub fn load_config_with_file(config_path: impl Into<PathBuf>) -> Result<HozoConfig, ConfigError> {
	let path = config_path.into();
	let config = load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::required(path.clone())),
		Box::new(EnvSource::new()),
	])?;
	Ok(HozoConfig {
		path: Some(path),
		..config
	})
}

/// Merge the given sources in precedence order and resolve the result.
pub fn load_from_sources(
	mut sources: Vec<Box<dyn ConfigSource>>,
) -> Result<HozoConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = HozoConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		let layer = source.load()?;
		merged.merge(layer);
	}

	finalize(merged)
}

/// Finalize configuration layer into resolved config.
fn finalize(layer: HozoConfigLayer) -> Result<HozoConfig, ConfigError> {
	let settings = layer.settings.unwrap_or_default().finalize()?;
	let logging = layer.logging.unwrap_or_default().finalize();
	let notifications = layer.notifications.unwrap_or_default().finalize();

	settings.validate()?;

	let entries = layer.jobs.unwrap_or_default();
	let (jobs, rejected) = resolve_jobs(&entries, &settings);
	for error in &rejected {
		warn!(index = error.index, job = ?error.name, "rejected job: {error}");
	}

	info!(
		timezone = %settings.timezone,
		jobs = jobs.len(),
		rejected = rejected.len(),
		channels = ?notifications.enabled_channels(),
		"Configuration loaded"
	);

	Ok(HozoConfig {
		settings,
		logging,
		notifications,
		jobs,
		rejected,
		path: None,
	})
}
