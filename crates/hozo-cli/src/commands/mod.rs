// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

pub mod check;
pub mod daemon;
pub mod jobs;
pub mod shutdown;
pub mod status;
pub mod version;
pub mod wake;

use hozo_config::HozoConfig;
use hozo_core::{JobDefinition, TriggerError};

/// Every command resolves to the process exit code.
pub type CommandResult = anyhow::Result<i32>;

pub(crate) fn find_job<'a>(
	config: &'a HozoConfig,
	name: &str,
) -> Result<&'a JobDefinition, TriggerError> {
	config
		.job(name)
		.ok_or_else(|| TriggerError::JobNotFound(name.to_string()))
}
