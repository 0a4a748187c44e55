// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Hozo - wake-on-demand ZFS replication.
#[derive(Parser, Debug)]
#[command(name = "hozo", about = "Wake-on-demand ZFS replication orchestrator", version)]
pub struct Cli {
	/// Config file (defaults to $XDG_CONFIG_HOME/hozo/config.toml)
	#[arg(short, long, global = true, env = "HOZO_CONFIG")]
	pub config: Option<PathBuf>,

	/// Log at debug level unless RUST_LOG is set
	#[arg(short, long, global = true)]
	pub verbose: bool,

	#[command(subcommand)]
	pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
	/// Inspect and run backup jobs
	#[command(subcommand)]
	Jobs(JobsCommand),

	/// Send the Wake-on-LAN packet for a job's remote host
	Wake {
		job: String,
		/// Also wait until the host accepts ssh connections
		#[arg(long)]
		wait: bool,
	},

	/// Power off a job's remote host
	Shutdown { job: String },

	/// Probe a job's remote host and print pool status if it is up
	Status { job: String },

	/// Run the scheduler in the foreground
	Daemon,

	/// Load and validate the configuration, then exit
	CheckConfig,

	/// Show version and build information
	Version,
}

#[derive(Subcommand, Debug)]
pub enum JobsCommand {
	/// List configured jobs with their schedule and next run
	List {
		#[arg(long)]
		json: bool,
	},

	/// Run a backup now and follow its log
	Run {
		job: String,
		/// Only print the final result
		#[arg(short, long)]
		quiet: bool,
	},

	/// Replicate the remote copy back over the local dataset
	Restore {
		job: String,
		/// Job name, typed again to confirm; prompted for when omitted
		#[arg(long)]
		confirm: Option<String>,
		#[arg(short, long)]
		quiet: bool,
	},
}
