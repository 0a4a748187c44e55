// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types shared across Hozo crates.

use thiserror::Error;

/// Process exit codes for the CLI front end.
///
/// Each major failure kind gets its own code so wrapper scripts can branch
/// on the reason without parsing output.
pub mod exit_codes {
	pub const SUCCESS: i32 = 0;
	pub const INTERNAL: i32 = 1;
	pub const CONFIG: i32 = 2;
	pub const REACHABILITY_TIMEOUT: i32 = 3;
	pub const WAKE_FAILED: i32 = 4;
	pub const DEVICE_SPINUP_TIMEOUT: i32 = 5;
	pub const REPLICATION_FAILED: i32 = 6;
	pub const VERIFICATION_MISMATCH: i32 = 7;
	pub const ABORTED: i32 = 8;
	pub const ALREADY_RUNNING: i32 = 9;
	pub const CONFIRMATION_MISMATCH: i32 = 10;
	pub const JOB_NOT_FOUND: i32 = 11;
}

/// A schedule string that could not be understood.
///
/// Raised at load time only; a rule that parsed never fails at fire time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid schedule '{input}': {reason} (expected 'daily HH:MM' or 'weekly <Day> HH:MM')")]
pub struct ScheduleParseError {
	pub input: String,
	pub reason: String,
}

impl ScheduleParseError {
	pub fn new(input: impl Into<String>, reason: impl Into<String>) -> Self {
		Self {
			input: input.into(),
			reason: reason.into(),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid mac address '{0}' (expected six hex octets separated by ':' or '-')")]
pub struct MacParseError(pub String);

/// Admission failures returned synchronously by trigger operations.
///
/// None of these are execution failures: no Run exists when one is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TriggerError {
	#[error("job '{0}' not found")]
	JobNotFound(String),

	#[error("job '{0}' is already running")]
	AlreadyRunning(String),

	#[error("confirmation for '{job}' did not match; restore cancelled")]
	ConfirmationMismatch { job: String },
}

impl TriggerError {
	pub fn exit_code(&self) -> i32 {
		match self {
			TriggerError::JobNotFound(_) => exit_codes::JOB_NOT_FOUND,
			TriggerError::AlreadyRunning(_) => exit_codes::ALREADY_RUNNING,
			TriggerError::ConfirmationMismatch { .. } => exit_codes::CONFIRMATION_MISMATCH,
		}
	}
}

/// Errors raised by external collaborators (process spawn, sockets).
#[derive(Debug, Error)]
pub enum CollaboratorError {
	#[error("failed to spawn '{program}': {source}")]
	Spawn {
		program: String,
		#[source]
		source: std::io::Error,
	},

	#[error("i/o error: {0}")]
	Io(#[from] std::io::Error),

	#[error("timed out after {0}s")]
	Timeout(u64),

	#[error("{0}")]
	Other(String),
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_trigger_error_exit_codes_are_distinct() {
		let codes = [
			TriggerError::JobNotFound("a".into()).exit_code(),
			TriggerError::AlreadyRunning("a".into()).exit_code(),
			TriggerError::ConfirmationMismatch { job: "a".into() }.exit_code(),
		];
		assert_eq!(codes, [11, 9, 10]);
	}

	#[test]
	fn test_schedule_parse_error_message_names_formats() {
		let err = ScheduleParseError::new("hourly", "unknown frequency");
		let msg = err.to_string();
		assert!(msg.contains("hourly"));
		assert!(msg.contains("daily HH:MM"));
	}
}
