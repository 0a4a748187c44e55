// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core types for the Hozo wake-on-demand replication orchestrator.
//!
//! This crate holds everything the orchestration engine and its front ends
//! share without depending on each other:
//!
//! - Job definitions and run records ([`JobDefinition`], [`Run`], [`RunState`])
//! - Human schedule rules ([`ScheduleRule`])
//! - The failure taxonomy and exit-code mapping ([`FailureKind`], [`TriggerError`])
//! - Collaborator traits implemented by the I/O crates ([`WakeSender`],
//!   [`ReachabilityProbe`], [`Replicator`], [`RemoteExecutor`], [`Notifier`])

pub mod collab;
pub mod error;
pub mod event;
pub mod log;
pub mod run;
pub mod schedule;
pub mod types;

pub use collab::{
	DatasetLocation, Notifier, ProbeResult, ProcessOutput, ReachabilityProbe, RemoteExecutor,
	ReplicationRequest, Replicator, WakeSender,
};
pub use error::{exit_codes, CollaboratorError, MacParseError, ScheduleParseError, TriggerError};
pub use event::{EventOutcome, NotificationEvent};
pub use log::{LogLevel, LogLine, LogSource};
pub use run::{FailureKind, Operation, Run, RunId, RunOutcome, RunState, StateTransition, TriggerKind};
pub use schedule::{Frequency, ScheduleRule};
pub use types::{DeviceSpinup, JobDefinition, MacAddress, RemoteTarget, WakeTarget};
