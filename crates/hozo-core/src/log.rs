// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Run log lines.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Who produced a log line. Viewers colour the two differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogSource {
	/// Control-plane events from the executor.
	Orchestrator,
	/// Captured output of the replication tool.
	Tool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
	Debug,
	Info,
	Warn,
	Error,
}

impl fmt::Display for LogLevel {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			LogLevel::Debug => "DEBUG",
			LogLevel::Info => "INFO",
			LogLevel::Warn => "WARN",
			LogLevel::Error => "ERROR",
		};
		f.pad(s)
	}
}

/// One append-only line of a run log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogLine {
	/// Position in the run log, starting at 0.
	pub seq: u64,
	pub at: DateTime<Utc>,
	pub source: LogSource,
	pub level: LogLevel,
	pub message: String,
}

impl fmt::Display for LogLine {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let ts = self.at.format("%H:%M:%S");
		match self.source {
			LogSource::Orchestrator => write!(f, "[{ts}] {:<5} {}", self.level, self.message),
			LogSource::Tool => write!(f, "[{ts}] [syncoid] {}", self.message),
		}
	}
}
