// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Backup job orchestration.
//!
//! A [`JobEngine`] admits triggers through a per-job [`ConcurrencyGuard`] and
//! hands each admitted run to the [`Executor`], which walks it through the
//! wake, wait, replicate, verify, notify and shutdown states. The
//! [`Scheduler`] fires runs from wall-clock rules.

pub mod context;
pub mod engine;
pub mod error;
pub mod executor;
pub mod guard;
pub mod health;
pub mod poll;
pub mod record;
pub mod registry;
pub mod remote;
pub mod replication;
pub mod restore;
pub mod scheduler;

pub use context::CancellationToken;
pub use engine::{JobEngine, JobSummary};
pub use error::{RegistryError, Result};
pub use executor::{Collaborators, Executor, ExecutorSettings};
pub use guard::{ConcurrencyGuard, RunPermit};
pub use health::{HealthState, JobHealthStatus, JobsHealthStatus, LastRunInfo};
pub use poll::{poll_until, wait_reachable, PollOutcome, DEFAULT_POLL_INTERVAL};
pub use record::{CrashClose, RunHandle, RunRecorder};
pub use registry::{JobRegistry, DEFAULT_HISTORY_LIMIT};
pub use remote::DeviceState;
pub use replication::{ReplicationOutcome, ReplicationRunner, RetryPolicy};
pub use restore::check_confirmation;
pub use scheduler::{FireOutcome, Scheduler, SchedulerSettings, DEFAULT_TICK_INTERVAL};
