// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! `hozo jobs list|run|restore`.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use futures::StreamExt;
use hozo_core::{exit_codes, Run, TriggerKind};
use hozo_jobs::{HealthState, JobEngine, JobSummary, RunHandle};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::info;

use super::CommandResult;

pub fn list(engine: &JobEngine, json: bool) -> CommandResult {
	let jobs = engine.list_jobs();
	if json {
		println!("{}", serde_json::to_string_pretty(&jobs)?);
		return Ok(exit_codes::SUCCESS);
	}
	if jobs.is_empty() {
		println!("No jobs configured.");
		return Ok(exit_codes::SUCCESS);
	}
	let tz = engine.timezone();
	for job in &jobs {
		print!("{}", render_summary(job, tz));
	}
	Ok(exit_codes::SUCCESS)
}

fn health_label(health: HealthState) -> &'static str {
	match health {
		HealthState::Healthy => "healthy",
		HealthState::Degraded => "degraded",
		HealthState::Unhealthy => "unhealthy",
	}
}

fn local_time(at: DateTime<Utc>, tz: Tz) -> String {
	at.with_timezone(&tz).format("%Y-%m-%d %H:%M %Z").to_string()
}

fn render_summary(job: &JobSummary, tz: Tz) -> String {
	let mut out = format!("{} [{}]\n", job.name, health_label(job.health));
	if !job.description.is_empty() {
		out.push_str(&format!("  {}\n", job.description));
	}
	out.push_str(&format!("  {} -> {}\n", job.source, job.target));
	match (&job.schedule, job.next_run) {
		(Some(rule), Some(next)) => {
			out.push_str(&format!("  schedule: {rule} (next {})\n", local_time(next, tz)))
		}
		(Some(rule), None) => out.push_str(&format!("  schedule: {rule}\n")),
		(None, _) => out.push_str("  schedule: manual only\n"),
	}
	if let Some(last) = &job.last_run {
		out.push_str(&format!(
			"  last run: {} at {}",
			last.state,
			local_time(last.started_at, tz)
		));
		if let Some(error) = &last.error {
			out.push_str(&format!(" ({error})"));
		}
		out.push('\n');
	}
	if job.running {
		out.push_str("  backup in progress\n");
	}
	if job.restoring {
		out.push_str("  restore in progress\n");
	}
	out
}

pub async fn run(engine: &JobEngine, name: &str, quiet: bool) -> CommandResult {
	let handle = engine.trigger_run(name, TriggerKind::Manual)?;
	info!(job = %name, run_id = %handle.id(), "backup started");
	follow(handle, quiet).await
}

pub async fn restore(
	engine: &JobEngine,
	name: &str,
	confirm: Option<String>,
	quiet: bool,
) -> CommandResult {
	let job = engine.job(name)?;
	let confirmation = match confirm {
		Some(confirmation) => confirmation,
		None => {
			eprintln!(
				"WARNING: restore replicates {}@{}:{} over the local dataset {}.\n\
				 Local changes made since the last backup will be destroyed.",
				job.target.user, job.target.host, job.target_dataset, job.source_dataset
			);
			let line = prompt(&format!("Type the job name ({}) to confirm: ", job.name)).await?;
			prompt_answer(&line).to_string()
		}
	};
	let handle = engine.trigger_restore(name, &confirmation, TriggerKind::Manual)?;
	info!(job = %name, run_id = %handle.id(), "restore started");
	follow(handle, quiet).await
}

async fn prompt(question: &str) -> anyhow::Result<String> {
	let mut stderr = tokio::io::stderr();
	stderr.write_all(question.as_bytes()).await?;
	stderr.flush().await?;
	let mut line = String::new();
	BufReader::new(tokio::io::stdin()).read_line(&mut line).await?;
	Ok(line)
}

/// Strip the line terminator `read_line` keeps; anything else the user
/// typed is part of the confirmation.
fn prompt_answer(line: &str) -> &str {
	line.trim_end_matches(['\r', '\n'])
}

/// Print the run log until the run ends. Ctrl-C requests an abort and keeps
/// following so the final state is still reported.
async fn follow(handle: RunHandle, quiet: bool) -> CommandResult {
	let mut log = Box::pin(handle.stream_log());
	let mut abort_requested = false;
	loop {
		tokio::select! {
			line = log.next() => match line {
				Some(line) if !quiet => println!("{line}"),
				Some(_) => {}
				None => break,
			},
			_ = tokio::signal::ctrl_c(), if !abort_requested => {
				eprintln!("Abort requested, waiting for the run to stop...");
				handle.abort();
				abort_requested = true;
			}
		}
	}
	let run = handle.wait().await;
	println!("{}", render_result(&run));
	Ok(result_code(&run))
}

fn render_result(run: &Run) -> String {
	let duration = run
		.ended_at
		.map(|end| format!(" in {}s", (end - run.started_at).num_seconds()))
		.unwrap_or_default();
	let mut out = format!(
		"{} {} for {}: {}{duration}",
		run.operation, run.id, run.job_name, run.state
	);
	if let Some(message) = run.outcome.as_ref().and_then(|o| o.error_message()) {
		out.push_str(&format!("\n  error: {message}"));
	}
	if let Some(error) = &run.shutdown_error {
		out.push_str(&format!("\n  shutdown failed: {error}"));
	}
	out
}

fn result_code(run: &Run) -> i32 {
	run.outcome
		.as_ref()
		.map_or(exit_codes::INTERNAL, |outcome| outcome.exit_code())
}

#[cfg(test)]
mod tests {
	use super::*;
	use hozo_core::{FailureKind, Operation, RunOutcome, RunState};
	use hozo_jobs::LastRunInfo;

	fn summary() -> JobSummary {
		JobSummary {
			name: "nightly".into(),
			description: "Photos to the NAS".into(),
			source: "rpool/photos".into(),
			target: "root@nas.lan:tank/photos".into(),
			schedule: Some("daily 02:30".into()),
			next_run: None,
			running: false,
			restoring: true,
			shutdown_after: true,
			last_run: None,
			health: HealthState::Healthy,
		}
	}

	#[test]
	fn test_render_summary_without_history() {
		let text = render_summary(&summary(), chrono_tz::UTC);
		assert!(text.starts_with("nightly [healthy]\n"));
		assert!(text.contains("rpool/photos -> root@nas.lan:tank/photos"));
		assert!(text.contains("schedule: daily 02:30\n"));
		assert!(text.contains("restore in progress"));
		assert!(!text.contains("last run"));
	}

	#[test]
	fn test_render_summary_shows_last_failure_in_timezone() {
		let mut job = summary();
		job.schedule = None;
		job.health = HealthState::Unhealthy;
		let started = "2025-03-01T01:30:00Z".parse::<DateTime<Utc>>().unwrap();
		job.last_run = Some(LastRunInfo {
			run_id: hozo_core::RunId::new(),
			state: RunState::Failed,
			started_at: started,
			duration_ms: Some(1_000),
			error: Some("host unreachable".into()),
		});
		let text = render_summary(&job, chrono_tz::Europe::Berlin);
		assert!(text.contains("[unhealthy]"));
		assert!(text.contains("manual only"));
		assert!(text.contains("2025-03-01 02:30 CET"));
		assert!(text.contains("(host unreachable)"));
	}

	#[test]
	fn test_result_code_follows_outcome() {
		let mut run = Run::new("nightly", Operation::Backup, TriggerKind::Manual);
		assert_eq!(result_code(&run), exit_codes::INTERNAL);

		run.outcome = Some(RunOutcome::Failed {
			kind: FailureKind::ReachabilityTimeout,
			message: "no answer".into(),
		});
		assert_eq!(result_code(&run), exit_codes::REACHABILITY_TIMEOUT);
		assert!(render_result(&run).contains("error: no answer"));

		run.outcome = Some(RunOutcome::Success);
		assert_eq!(result_code(&run), exit_codes::SUCCESS);
	}

	#[test]
	fn test_prompt_answer_strips_only_line_terminator() {
		assert_eq!(prompt_answer("nightly\n"), "nightly");
		assert_eq!(prompt_answer("nightly\r\n"), "nightly");
		assert_eq!(prompt_answer("nightly"), "nightly");
		assert_eq!(prompt_answer(" nightly \n"), " nightly ");
		assert_eq!(prompt_answer("\n"), "");
	}
}
