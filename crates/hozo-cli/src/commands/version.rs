// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use hozo_core::exit_codes;

use super::CommandResult;

pub fn format_version_info() -> String {
	format!(
		"hozo version: {}\n\
		 Platform:     {}-{}",
		env!("CARGO_PKG_VERSION"),
		std::env::consts::OS,
		std::env::consts::ARCH,
	)
}

pub fn run() -> CommandResult {
	println!("{}", format_version_info());
	Ok(exit_codes::SUCCESS)
}
