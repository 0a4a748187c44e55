// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! `hozo`: wake a backup host, replicate ZFS datasets to it, put it back to sleep.

mod cli;
mod commands;
mod logging;
mod wiring;

use clap::Parser;
use hozo_config::{ConfigError, LoggingConfig};
use hozo_core::{exit_codes, TriggerError};
use hozo_jobs::RegistryError;

use cli::{Cli, Command, JobsCommand};
use commands::CommandResult;

#[tokio::main]
async fn main() {
	let cli = Cli::parse();
	let code = match run(cli).await {
		Ok(code) => code,
		Err(e) => {
			eprintln!("error: {e:#}");
			exit_code_for(&e)
		}
	};
	std::process::exit(code);
}

async fn run(cli: Cli) -> CommandResult {
	if let Command::Version = cli.command {
		return commands::version::run();
	}

	let config = match wiring::load(cli.config.as_deref()) {
		Ok(config) => config,
		Err(e) => {
			logging::init(&LoggingConfig::default(), cli.verbose);
			return Err(e.into());
		}
	};
	logging::init(&config.logging, cli.verbose);

	match cli.command {
		Command::Jobs(JobsCommand::List { json }) => {
			commands::jobs::list(&wiring::build_engine(&config)?, json)
		}
		Command::Jobs(JobsCommand::Run { job, quiet }) => {
			commands::jobs::run(&wiring::build_engine(&config)?, &job, quiet).await
		}
		Command::Jobs(JobsCommand::Restore {
			job,
			confirm,
			quiet,
		}) => commands::jobs::restore(&wiring::build_engine(&config)?, &job, confirm, quiet).await,
		Command::Wake { job, wait } => commands::wake::run(&config, &job, wait).await,
		Command::Shutdown { job } => commands::shutdown::run(&config, &job).await,
		Command::Status { job } => commands::status::run(&config, &job).await,
		Command::Daemon => commands::daemon::run(config, cli.config.as_deref()).await,
		Command::CheckConfig => commands::check::run(&config),
		Command::Version => commands::version::run(),
	}
}

/// Configuration and admission errors keep their own codes for scripting;
/// anything else is an internal failure.
fn exit_code_for(err: &anyhow::Error) -> i32 {
	if let Some(e) = err.downcast_ref::<TriggerError>() {
		return e.exit_code();
	}
	if err.is::<ConfigError>() || err.is::<RegistryError>() {
		return exit_codes::CONFIG;
	}
	exit_codes::INTERNAL
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_exit_code_for_trigger_errors() {
		let err = anyhow::Error::new(TriggerError::AlreadyRunning("nightly".into()));
		assert_eq!(exit_code_for(&err), exit_codes::ALREADY_RUNNING);
		let err = anyhow::Error::new(TriggerError::JobNotFound("nope".into()));
		assert_eq!(exit_code_for(&err), exit_codes::JOB_NOT_FOUND);
	}

	#[test]
	fn test_exit_code_for_config_errors() {
		let err = anyhow::Error::new(ConfigError::Validation("tick interval".into()));
		assert_eq!(exit_code_for(&err), exit_codes::CONFIG);
		let err = anyhow::Error::new(RegistryError::DuplicateJob("nightly".into()));
		assert_eq!(exit_code_for(&err), exit_codes::CONFIG);
	}

	#[test]
	fn test_exit_code_for_other_errors() {
		assert_eq!(exit_code_for(&anyhow::anyhow!("boom")), exit_codes::INTERNAL);
	}
}
