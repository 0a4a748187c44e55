// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use hozo_config::HozoConfig;
use hozo_core::exit_codes;

use super::CommandResult;

pub fn run(config: &HozoConfig) -> CommandResult {
	print!("{}", render_report(config));
	Ok(if config.rejected.is_empty() {
		exit_codes::SUCCESS
	} else {
		exit_codes::CONFIG
	})
}

fn render_report(config: &HozoConfig) -> String {
	let mut out = match &config.path {
		Some(path) => format!("Config file: {}\n", path.display()),
		None => "Config file: none (defaults and environment only)\n".to_string(),
	};
	out.push_str(&format!("Timezone:    {}\n", config.settings.timezone));
	let channels = config.notifications.enabled_channels();
	out.push_str(&format!(
		"Channels:    {}\n",
		if channels.is_empty() {
			"none".to_string()
		} else {
			channels.join(", ")
		}
	));
	out.push_str(&format!("Jobs:        {}\n", config.jobs.len()));
	for job in &config.jobs {
		let schedule = job
			.schedule
			.as_ref()
			.map_or_else(|| "manual".to_string(), |rule| rule.to_string());
		out.push_str(&format!(
			"  ok    {} ({} -> {}:{}) [{schedule}]\n",
			job.name, job.source_dataset, job.target.host, job.target_dataset
		));
	}
	for error in &config.rejected {
		out.push_str(&format!("  error {error}\n"));
	}
	out
}
