// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

pub mod jobs;
pub mod logging;
pub mod notifications;
pub mod settings;

pub use jobs::{resolve_jobs, JobEntry, JobLoadError};
pub use logging::{LogFormat, LoggingConfig, LoggingConfigLayer};
pub use notifications::{
	NotificationsConfig, NotificationsConfigLayer, NtfyConfig, NtfyConfigLayer, PushoverConfig,
	PushoverConfigLayer, SmtpConfig, SmtpConfigLayer, WebhookConfig, WebhookConfigLayer,
};
pub use settings::{SettingsConfig, SettingsConfigLayer};
