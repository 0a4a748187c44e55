// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Time-based triggering of scheduled jobs.
//!
//! Each job keeps the next occurrence of its rule, computed in the configured
//! timezone. A tick at or past that instant fires it once and moves on to the
//! following occurrence, so repeated or skipped wall-clock hours around
//! daylight-saving changes still fire exactly once. Fires missed while the
//! process was down are not caught up.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use hozo_core::{NotificationEvent, RunId, ScheduleRule, TriggerError, TriggerKind};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, instrument, warn};

use crate::engine::JobEngine;

pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(20);

/// An occurrence first seen this many seconds after its instant is skipped.
const MISSED_FIRE_GRACE_SECS: i64 = 60;

#[derive(Debug, Clone)]
pub struct SchedulerSettings {
	/// Must stay under a minute or matching minutes can be skipped.
	pub tick_interval: Duration,
	/// Send a notification when a fire is dropped because the job is busy.
	pub notify_on_rejection: bool,
}

impl Default for SchedulerSettings {
	fn default() -> Self {
		Self {
			tick_interval: DEFAULT_TICK_INTERVAL,
			notify_on_rejection: false,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FireOutcome {
	Started { job: String, run_id: RunId },
	Rejected { job: String },
	Error { job: String, error: String },
}

/// Firing state of one scheduled job.
#[derive(Debug, Clone)]
struct Slot {
	rule: ScheduleRule,
	/// Next occurrence not yet acted on.
	due: DateTime<Utc>,
	/// Latest evaluation instant; an earlier `now` means the clock stepped back.
	seen: DateTime<Utc>,
	/// Last occurrence that was fired or rejected.
	last: Option<DateTime<Utc>>,
}

/// First occurrence at or after the start of the minute containing `now`.
fn first_due(rule: &ScheduleRule, now: DateTime<Utc>, tz: Tz) -> Option<DateTime<Utc>> {
	let minute_start = DateTime::from_timestamp(now.timestamp().div_euclid(60) * 60, 0)?;
	rule.next_after(minute_start - chrono::Duration::seconds(1), tz)
}

pub struct Scheduler {
	engine: JobEngine,
	settings: SchedulerSettings,
	slots: Mutex<HashMap<String, Slot>>,
	shutdown_tx: broadcast::Sender<()>,
	handle: tokio::sync::Mutex<Option<JoinHandle<()>>>,
}

impl Scheduler {
	pub fn new(engine: JobEngine, settings: SchedulerSettings) -> Self {
		let (shutdown_tx, _) = broadcast::channel(1);
		Self {
			engine,
			settings,
			slots: Mutex::new(HashMap::new()),
			shutdown_tx,
			handle: tokio::sync::Mutex::new(None),
		}
	}

	/// Fire every job whose next occurrence has arrived by `now`.
	pub fn evaluate(&self, now: DateTime<Utc>) -> Vec<FireOutcome> {
		let mut outcomes = Vec::new();
		for job in self.due_jobs(now) {
			let schedule = job
				.schedule
				.as_ref()
				.map(ToString::to_string)
				.unwrap_or_default();
			let name = job.name.clone();
			match self.engine.execute(job, TriggerKind::Scheduled) {
				Ok(handle) => {
					info!(job = %name, run_id = %handle.id(), %schedule, "scheduled run started");
					outcomes.push(FireOutcome::Started {
						job: name,
						run_id: handle.id(),
					});
				}
				Err(TriggerError::AlreadyRunning(_)) => {
					warn!(job = %name, "scheduled fire dropped: job already running");
					if self.settings.notify_on_rejection {
						let notifier = self.engine.executor().notifier();
						let event = NotificationEvent::rejected(&name, TriggerKind::Scheduled);
						tokio::spawn(async move { notifier.notify(&event).await });
					}
					outcomes.push(FireOutcome::Rejected { job: name });
				}
				Err(e) => {
					warn!(job = %name, error = %e, "scheduled fire failed");
					outcomes.push(FireOutcome::Error {
						job: name,
						error: e.to_string(),
					});
				}
			}
		}
		outcomes
	}

	/// Advance every slot to `now` and collect the jobs whose occurrence is due.
	fn due_jobs(&self, now: DateTime<Utc>) -> Vec<Arc<hozo_core::JobDefinition>> {
		let tz = self.engine.timezone();
		let jobs = self.engine.registry().jobs();
		let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
		slots.retain(|name, _| jobs.iter().any(|job| &job.name == name));

		let mut due = Vec::new();
		for job in jobs {
			let Some(rule) = job.schedule else {
				slots.remove(&job.name);
				continue;
			};
			let stale = slots
				.get(&job.name)
				.map_or(true, |slot| slot.rule != rule || now < slot.seen);
			if stale {
				let last = slots.get(&job.name).and_then(|slot| slot.last);
				let Some(next) = first_due(&rule, now, tz) else {
					continue;
				};
				slots.insert(
					job.name.clone(),
					Slot {
						rule,
						due: next,
						seen: now,
						last,
					},
				);
			}
			let Some(slot) = slots.get_mut(&job.name) else {
				continue;
			};
			slot.seen = now;
			if now < slot.due {
				continue;
			}

			let occurrence = slot.due;
			match rule.next_after(now, tz) {
				Some(next) => slot.due = next,
				None => {
					slots.remove(&job.name);
					continue;
				}
			}
			if slot.last == Some(occurrence) {
				continue;
			}
			slot.last = Some(occurrence);
			if (now - occurrence).num_seconds() >= MISSED_FIRE_GRACE_SECS {
				warn!(job = %job.name, %occurrence, "scheduled fire missed, waiting for the next one");
				continue;
			}
			due.push(job);
		}
		due
	}

	#[instrument(skip(self))]
	pub async fn start(self: &Arc<Self>) {
		let mut slot = self.handle.lock().await;
		if slot.is_some() {
			return;
		}
		let scheduler = Arc::clone(self);
		let mut shutdown_rx = self.shutdown_tx.subscribe();
		let tick = self.settings.tick_interval;

		*slot = Some(tokio::spawn(async move {
			let mut interval = tokio::time::interval(tick);
			interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
			loop {
				tokio::select! {
					_ = interval.tick() => {
						let fired = scheduler.evaluate(Utc::now());
						if !fired.is_empty() {
							debug!(count = fired.len(), "scheduler tick fired jobs");
						}
					}
					_ = shutdown_rx.recv() => {
						info!("Shutting down scheduler");
						break;
					}
				}
			}
		}));

		info!(
			tick_secs = tick.as_secs(),
			timezone = %self.engine.timezone(),
			"Scheduler started"
		);
	}

	/// Stop ticking. Runs already started keep going.
	#[instrument(skip(self))]
	pub async fn shutdown(&self) {
		let _ = self.shutdown_tx.send(());
		if let Some(handle) = self.handle.lock().await.take() {
			let _ = handle.await;
		}
		info!("Scheduler shut down");
	}
}
