// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Scheduler evaluation against explicit instants.

mod support;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::Tz;
use hozo_core::{EventOutcome, JobDefinition, ScheduleRule};
use hozo_jobs::{FireOutcome, Scheduler, SchedulerSettings};
use support::*;

fn scheduled(name: &str, rule: &str) -> JobDefinition {
	let mut job = job(name);
	job.schedule = Some(rule.parse::<ScheduleRule>().unwrap());
	job
}

fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
	Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
}

fn started(outcomes: &[FireOutcome]) -> Vec<String> {
	outcomes
		.iter()
		.filter_map(|o| match o {
			FireOutcome::Started { job, .. } => Some(job.clone()),
			_ => None,
		})
		.collect()
}

/// Several ticks inside the matching minute start exactly one run.
#[tokio::test(start_paused = true)]
async fn test_fires_once_per_matching_minute() {
	let harness = Harness::default();
	// 2025-01-05 is a Sunday.
	let engine = harness.engine(vec![scheduled("weekly", "weekly Sunday 03:00")]);
	let scheduler = Scheduler::new(engine.clone(), SchedulerSettings::default());

	let first = scheduler.evaluate(at(2025, 1, 5, 3, 0, 0));
	assert_eq!(started(&first), vec!["weekly"]);
	let handle = engine.registry().latest("weekly", hozo_core::Operation::Backup).unwrap();
	handle.wait().await;

	assert!(scheduler.evaluate(at(2025, 1, 5, 3, 0, 20)).is_empty());
	assert!(scheduler.evaluate(at(2025, 1, 5, 3, 0, 40)).is_empty());
	assert!(scheduler.evaluate(at(2025, 1, 5, 3, 1, 0)).is_empty());
	assert_eq!(harness.replicator.calls(), 1);

	let next_week = scheduler.evaluate(at(2025, 1, 12, 3, 0, 10));
	assert_eq!(started(&next_week), vec!["weekly"]);
}

#[tokio::test(start_paused = true)]
async fn test_non_matching_times_do_not_fire() {
	let harness = Harness::default();
	let engine = harness.engine(vec![
		scheduled("weekly", "weekly Sunday 03:00"),
		scheduled("nightly", "daily 01:30"),
		job("manual-only"),
	]);
	let scheduler = Scheduler::new(engine, SchedulerSettings::default());

	// Monday 03:00 and Sunday 03:01.
	assert!(scheduler.evaluate(at(2025, 1, 6, 3, 0, 0)).is_empty());
	assert!(scheduler.evaluate(at(2025, 1, 5, 3, 1, 0)).is_empty());
	let nightly = scheduler.evaluate(at(2025, 1, 6, 1, 30, 5));
	assert_eq!(started(&nightly), vec!["nightly"]);
}

/// Rules are evaluated in the configured timezone.
#[tokio::test(start_paused = true)]
async fn test_rules_use_configured_timezone() {
	let harness = Harness::default();
	let engine = harness.engine_with(
		vec![scheduled("nightly", "daily 03:00")],
		harness.collaborators(),
		Tz::Australia__Sydney,
	);
	let scheduler = Scheduler::new(engine, SchedulerSettings::default());

	// 03:00 UTC is 14:00 in Sydney (AEDT, UTC+11).
	assert!(scheduler.evaluate(at(2025, 1, 15, 3, 0, 0)).is_empty());
	// 16:00 UTC on the 14th is 03:00 on the 15th in Sydney.
	let fired = scheduler.evaluate(at(2025, 1, 14, 16, 0, 0));
	assert_eq!(started(&fired), vec!["nightly"]);
}

/// A fire that lands on a busy job is dropped, and optionally reported.
#[tokio::test(start_paused = true)]
async fn test_busy_job_fire_is_dropped_and_reported() {
	let harness = Harness {
		replicator: Arc::new(FakeReplicator {
			duration: Duration::from_secs(3600),
			..FakeReplicator::succeeding()
		}),
		..Harness::default()
	};
	let engine = harness.engine(vec![scheduled("nightly", "daily 03:00")]);
	let running = engine
		.trigger_run("nightly", hozo_core::TriggerKind::Manual)
		.unwrap();

	let scheduler = Scheduler::new(
		engine,
		SchedulerSettings {
			notify_on_rejection: true,
			..SchedulerSettings::default()
		},
	);
	let outcomes = scheduler.evaluate(at(2025, 1, 6, 3, 0, 0));
	assert_eq!(
		outcomes,
		vec![FireOutcome::Rejected {
			job: "nightly".into()
		}]
	);
	// No catch-up once the job frees up within the same minute.
	assert!(scheduler.evaluate(at(2025, 1, 6, 3, 0, 30)).is_empty());

	tokio::time::sleep(Duration::from_millis(10)).await;
	let events = harness.notifier.events();
	assert_eq!(events.len(), 1);
	assert_eq!(events[0].outcome, EventOutcome::Rejected);

	running.wait().await;
	assert_eq!(harness.replicator.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_start_and_shutdown() {
	let harness = Harness::default();
	let engine = harness.engine(vec![job("manual-only")]);
	let scheduler = Arc::new(Scheduler::new(engine, SchedulerSettings::default()));

	scheduler.start().await;
	tokio::time::sleep(Duration::from_secs(65)).await;
	tokio::time::timeout(Duration::from_secs(1), scheduler.shutdown())
		.await
		.expect("scheduler should stop promptly");
	assert_eq!(harness.replicator.calls(), 0);
}

/// The repeated 01:30 on the night clocks go back fires only the first time.
#[tokio::test(start_paused = true)]
async fn test_repeated_hour_fires_once() {
	let harness = Harness::default();
	let engine = harness.engine_with(
		vec![scheduled("nightly", "daily 01:30")],
		harness.collaborators(),
		Tz::America__New_York,
	);
	let scheduler = Scheduler::new(engine.clone(), SchedulerSettings::default());

	// 05:30Z is 01:30 EDT, 06:30Z is 01:30 EST on 2025-11-02.
	let first = scheduler.evaluate(at(2025, 11, 2, 5, 30, 0));
	assert_eq!(started(&first), vec!["nightly"]);
	assert!(scheduler.evaluate(at(2025, 11, 2, 6, 30, 0)).is_empty());
	assert!(scheduler.evaluate(at(2025, 11, 2, 6, 30, 40)).is_empty());
	let handle = engine.registry().latest("nightly", hozo_core::Operation::Backup).unwrap();
	handle.wait().await;
	assert_eq!(harness.replicator.calls(), 1);

	let next_day = scheduler.evaluate(at(2025, 11, 3, 6, 30, 0));
	assert_eq!(started(&next_day), vec!["nightly"]);
}

/// A rule inside the hour skipped when clocks go forward fires right after the gap.
#[tokio::test(start_paused = true)]
async fn test_skipped_hour_fires_after_gap() {
	let harness = Harness::default();
	let engine = harness.engine_with(
		vec![scheduled("nightly", "daily 02:30")],
		harness.collaborators(),
		Tz::America__New_York,
	);
	let scheduler = Scheduler::new(engine, SchedulerSettings::default());

	// Every minute of 2025-03-09 local time (05:00Z to 04:00Z next day).
	let mut fired_at = Vec::new();
	let mut now = at(2025, 3, 9, 5, 0, 0);
	while now < at(2025, 3, 10, 4, 0, 0) {
		if !started(&scheduler.evaluate(now)).is_empty() {
			fired_at.push(now);
		}
		now += chrono::Duration::minutes(1);
	}
	// 03:00 EDT, the first minute after the gap.
	assert_eq!(fired_at, vec![at(2025, 3, 9, 7, 0, 0)]);
}

/// A clock stepping back into an occurrence already fired does not repeat it.
#[tokio::test(start_paused = true)]
async fn test_clock_step_back_does_not_refire() {
	let harness = Harness::default();
	let engine = harness.engine(vec![scheduled("nightly", "daily 03:00")]);
	let scheduler = Scheduler::new(engine, SchedulerSettings::default());

	assert_eq!(started(&scheduler.evaluate(at(2025, 1, 6, 3, 0, 30))), vec!["nightly"]);
	assert!(scheduler.evaluate(at(2025, 1, 6, 3, 0, 50)).is_empty());
	assert!(scheduler.evaluate(at(2025, 1, 6, 3, 0, 10)).is_empty());
}

/// Evaluating long after an occurrence does not catch it up.
#[tokio::test(start_paused = true)]
async fn test_late_evaluation_skips_missed_fire() {
	let harness = Harness::default();
	let engine = harness.engine(vec![scheduled("nightly", "daily 03:00")]);
	let scheduler = Scheduler::new(engine, SchedulerSettings::default());

	assert!(scheduler.evaluate(at(2025, 1, 6, 2, 59, 50)).is_empty());
	assert!(scheduler.evaluate(at(2025, 1, 6, 3, 20, 0)).is_empty());
	assert_eq!(harness.replicator.calls(), 0);
	assert_eq!(started(&scheduler.evaluate(at(2025, 1, 7, 3, 0, 5))), vec!["nightly"]);
}
