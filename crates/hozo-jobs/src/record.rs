// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Shared run record.
//!
//! The executor mutates a [`Run`] through a [`RunRecorder`]; everybody else
//! holds a [`RunHandle`] that only ever sees snapshots. Each mutation bumps a
//! watch counter so waiters and log followers wake without polling.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use futures::stream::{self, Stream};
use hozo_core::{
	FailureKind, LogLevel, LogLine, LogSource, Operation, ProcessOutput, Run, RunId, RunOutcome,
	RunState, StateTransition,
};
use tokio::sync::watch;

use crate::context::CancellationToken;

struct RunCell {
	run: Mutex<Run>,
	version: watch::Sender<u64>,
}

impl RunCell {
	fn lock(&self) -> MutexGuard<'_, Run> {
		self.run.lock().unwrap_or_else(|e| e.into_inner())
	}

	fn update<R>(&self, f: impl FnOnce(&mut Run) -> R) -> R {
		let result = {
			let mut run = self.lock();
			f(&mut run)
		};
		self.version.send_modify(|v| *v = v.wrapping_add(1));
		result
	}
}

/// Create the record for a fresh run and return both halves.
pub(crate) fn new_record(run: Run) -> (RunHandle, RunRecorder) {
	let (version, _) = watch::channel(0);
	let cell = Arc::new(RunCell {
		run: Mutex::new(run),
		version,
	});
	let handle = RunHandle {
		cell: Arc::clone(&cell),
		cancel: CancellationToken::new(),
	};
	let recorder = RunRecorder { cell };
	(handle, recorder)
}

/// Read-only view of a run plus the ability to abort it.
#[derive(Clone)]
pub struct RunHandle {
	cell: Arc<RunCell>,
	cancel: CancellationToken,
}

impl RunHandle {
	pub fn id(&self) -> RunId {
		self.cell.lock().id
	}

	pub fn job_name(&self) -> String {
		self.cell.lock().job_name.clone()
	}

	pub fn operation(&self) -> Operation {
		self.cell.lock().operation
	}

	pub fn state(&self) -> RunState {
		self.cell.lock().state
	}

	pub fn is_terminal(&self) -> bool {
		self.state().is_terminal()
	}

	/// Point-in-time copy of the run.
	pub fn snapshot(&self) -> Run {
		self.cell.lock().clone()
	}

	/// Request an abort. Takes effect at the next state boundary or wait.
	pub fn abort(&self) {
		self.cancel.cancel();
	}

	pub fn abort_requested(&self) -> bool {
		self.cancel.is_cancelled()
	}

	pub(crate) fn cancellation(&self) -> CancellationToken {
		self.cancel.clone()
	}

	/// Wait until the run is terminal and return its final state.
	pub async fn wait(&self) -> Run {
		let mut rx = self.cell.version.subscribe();
		loop {
			{
				let run = self.cell.lock();
				if run.is_terminal() {
					return run.clone();
				}
			}
			if rx.changed().await.is_err() {
				return self.snapshot();
			}
		}
	}

	/// Follow the run log from the first line.
	///
	/// Already-recorded lines are yielded immediately, later lines as they
	/// arrive. The stream ends once the run is terminal and fully drained.
	pub fn stream_log(&self) -> impl Stream<Item = LogLine> + Send + 'static {
		let cell = Arc::clone(&self.cell);
		let rx = cell.version.subscribe();
		stream::unfold((cell, rx, 0usize), |(cell, mut rx, cursor)| async move {
			loop {
				let (next, terminal) = {
					let run = cell.lock();
					(run.log.get(cursor).cloned(), run.is_terminal())
				};
				if let Some(line) = next {
					return Some((line, (cell, rx, cursor + 1)));
				}
				if terminal || rx.changed().await.is_err() {
					return None;
				}
			}
		})
	}
}

impl std::fmt::Debug for RunHandle {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let run = self.cell.lock();
		f.debug_struct("RunHandle")
			.field("id", &run.id)
			.field("job", &run.job_name)
			.field("state", &run.state)
			.finish()
	}
}

/// Write side of a run, owned by the executor.
#[derive(Clone)]
pub struct RunRecorder {
	cell: Arc<RunCell>,
}

impl RunRecorder {
	pub fn snapshot(&self) -> Run {
		self.cell.lock().clone()
	}

	pub fn state(&self) -> RunState {
		self.cell.lock().state
	}

	/// Advance to `next`. Backward or repeated moves are refused and logged.
	pub fn transition(&self, next: RunState) -> bool {
		let (advanced, job, from) = self.cell.update(|run| {
			let from = run.state;
			if !from.can_advance_to(next) {
				return (false, run.job_name.clone(), from);
			}
			let now = Utc::now();
			run.state = next;
			run.transitions.push(StateTransition { state: next, at: now });
			if next.is_terminal() {
				run.ended_at = Some(now);
			}
			push_line(run, LogSource::Orchestrator, LogLevel::Debug, format!("state {from} -> {next}"));
			(true, run.job_name.clone(), from)
		});
		if advanced {
			tracing::debug!(job = %job, from = %from, to = %next, "run state transition");
		} else {
			tracing::error!(job = %job, from = %from, to = %next, "refused non-forward state transition");
		}
		advanced
	}

	/// Append an orchestrator line and mirror it to tracing.
	pub fn log(&self, level: LogLevel, message: impl Into<String>) {
		let message = message.into();
		let (job, id) = self.cell.update(|run| {
			push_line(run, LogSource::Orchestrator, level, message.clone());
			(run.job_name.clone(), run.id)
		});
		match level {
			LogLevel::Debug => tracing::debug!(job = %job, run_id = %id, "{message}"),
			LogLevel::Info => tracing::info!(job = %job, run_id = %id, "{message}"),
			LogLevel::Warn => tracing::warn!(job = %job, run_id = %id, "{message}"),
			LogLevel::Error => tracing::error!(job = %job, run_id = %id, "{message}"),
		}
	}

	pub fn info(&self, message: impl Into<String>) {
		self.log(LogLevel::Info, message);
	}

	pub fn warn(&self, message: impl Into<String>) {
		self.log(LogLevel::Warn, message);
	}

	pub fn error(&self, message: impl Into<String>) {
		self.log(LogLevel::Error, message);
	}

	/// Append every line of a tool's captured output.
	pub fn tool_output(&self, output: &ProcessOutput) {
		self.cell.update(|run| {
			for line in output.lines() {
				push_line(run, LogSource::Tool, LogLevel::Info, line.to_string());
			}
		});
	}

	pub fn update<R>(&self, f: impl FnOnce(&mut Run) -> R) -> R {
		self.cell.update(f)
	}

	pub fn set_outcome(&self, outcome: RunOutcome) {
		self.cell.update(|run| run.outcome = Some(outcome));
	}

	/// Close out a run whose executor died before reaching a terminal state.
	///
	/// A run that already notified keeps its outcome and ends in the matching
	/// terminal state; anything earlier becomes an internal failure.
	pub fn crash(&self, message: impl Into<String>) -> CrashClose {
		let message = message.into();
		let closed = self.cell.update(|run| {
			if run.is_terminal() {
				return CrashClose::Untouched;
			}
			push_line(run, LogSource::Orchestrator, LogLevel::Error, message.clone());
			let (terminal, closed) = match &run.outcome {
				Some(outcome) if run.state >= RunState::Notifying => {
					let terminal = if outcome.is_success() {
						RunState::Succeeded
					} else {
						RunState::Failed
					};
					(terminal, CrashClose::KeptOutcome)
				}
				_ => {
					run.outcome = Some(RunOutcome::Failed {
						kind: FailureKind::Internal,
						message: message.clone(),
					});
					(RunState::Failed, CrashClose::Failed)
				}
			};
			let now = Utc::now();
			run.state = terminal;
			run.transitions.push(StateTransition { state: terminal, at: now });
			run.ended_at = Some(now);
			closed
		});
		if closed != CrashClose::Untouched {
			tracing::error!(error = %message, ?closed, "run closed out after executor failure");
		}
		closed
	}
}

/// How [`RunRecorder::crash`] closed a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrashClose {
	/// Already terminal; nothing changed.
	Untouched,
	/// Notified before the failure; outcome kept, nothing more to send.
	KeptOutcome,
	/// Marked as an internal failure that still has to be notified.
	Failed,
}

fn push_line(run: &mut Run, source: LogSource, level: LogLevel, message: String) {
	let seq = run.log.len() as u64;
	run.log.push(LogLine {
		seq,
		at: Utc::now(),
		source,
		level,
		message,
	});
}
