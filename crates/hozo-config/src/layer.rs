// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The partial configuration every source produces.

use serde::{Deserialize, Serialize};

use crate::sections::{JobEntry, LoggingConfigLayer, NotificationsConfigLayer, SettingsConfigLayer};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HozoConfigLayer {
	pub settings: Option<SettingsConfigLayer>,
	pub logging: Option<LoggingConfigLayer>,
	pub notifications: Option<NotificationsConfigLayer>,
	pub jobs: Option<Vec<JobEntry>>,
}

impl HozoConfigLayer {
	/// Overlays `other` on `self`. Sections merge field by field; the job list
	/// is replaced wholesale, never concatenated.
	pub fn merge(&mut self, other: Self) {
		if let Some(other) = other.settings {
			self.settings.get_or_insert_with(Default::default).merge(other);
		}
		if let Some(other) = other.logging {
			self.logging.get_or_insert_with(Default::default).merge(other);
		}
		if let Some(other) = other.notifications {
			self
				.notifications
				.get_or_insert_with(Default::default)
				.merge(other);
		}
		if other.jobs.is_some() {
			self.jobs = other.jobs;
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_merge_keeps_unset_sections() {
		let mut base: HozoConfigLayer = toml::from_str(
			r#"
[settings]
timezone = "Europe/Berlin"

[[jobs]]
name = "weekly"
"#,
		)
		.unwrap();
		base.merge(HozoConfigLayer {
			logging: Some(LoggingConfigLayer {
				level: Some("debug".into()),
				format: None,
			}),
			..Default::default()
		});
		assert_eq!(
			base.settings.unwrap().timezone.as_deref(),
			Some("Europe/Berlin")
		);
		assert_eq!(base.logging.unwrap().level.as_deref(), Some("debug"));
		assert_eq!(base.jobs.unwrap().len(), 1);
	}
}
