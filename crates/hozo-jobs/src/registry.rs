// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Loaded job definitions, their concurrency guards, and recent runs.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use hozo_core::{JobDefinition, Operation, Run, RunId};

use crate::error::{RegistryError, Result};
use crate::guard::ConcurrencyGuard;
use crate::record::RunHandle;

pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Process-scoped state shared by every trigger surface.
pub struct JobRegistry {
	jobs: RwLock<BTreeMap<String, Arc<JobDefinition>>>,
	backups: ConcurrencyGuard,
	/// Restore tokens are separate from backup tokens of the same job.
	restores: ConcurrencyGuard,
	history: Mutex<RunHistory>,
}

struct RunHistory {
	/// Oldest first.
	runs: VecDeque<RunHandle>,
	latest: HashMap<(String, Operation), RunHandle>,
	limit: usize,
}

impl RunHistory {
	fn push(&mut self, handle: RunHandle) {
		self
			.latest
			.insert((handle.job_name(), handle.operation()), handle.clone());
		self.runs.push_back(handle);
		while self.runs.len() > self.limit {
			// Runs still in flight are never evicted.
			match self.runs.iter().position(RunHandle::is_terminal) {
				Some(i) => {
					self.runs.remove(i);
				}
				None => break,
			}
		}
	}
}

fn index(jobs: Vec<JobDefinition>) -> Result<BTreeMap<String, Arc<JobDefinition>>> {
	let mut map = BTreeMap::new();
	for job in jobs {
		if map.contains_key(&job.name) {
			return Err(RegistryError::DuplicateJob(job.name));
		}
		map.insert(job.name.clone(), Arc::new(job));
	}
	Ok(map)
}

impl JobRegistry {
	pub fn new(jobs: Vec<JobDefinition>) -> Result<Self> {
		Self::with_history_limit(jobs, DEFAULT_HISTORY_LIMIT)
	}

	pub fn with_history_limit(jobs: Vec<JobDefinition>, limit: usize) -> Result<Self> {
		Ok(Self {
			jobs: RwLock::new(index(jobs)?),
			backups: ConcurrencyGuard::new(),
			restores: ConcurrencyGuard::new(),
			history: Mutex::new(RunHistory {
				runs: VecDeque::new(),
				latest: HashMap::new(),
				limit: limit.max(1),
			}),
		})
	}

	/// Swap in a freshly loaded set of definitions. Runs in flight keep the
	/// definition they started with.
	pub fn replace_jobs(&self, jobs: Vec<JobDefinition>) -> Result<()> {
		let map = index(jobs)?;
		*self.jobs.write().unwrap_or_else(|e| e.into_inner()) = map;
		Ok(())
	}

	pub fn job(&self, name: &str) -> Option<Arc<JobDefinition>> {
		self
			.jobs
			.read()
			.unwrap_or_else(|e| e.into_inner())
			.get(name)
			.cloned()
	}

	/// All definitions, ordered by name.
	pub fn jobs(&self) -> Vec<Arc<JobDefinition>> {
		self
			.jobs
			.read()
			.unwrap_or_else(|e| e.into_inner())
			.values()
			.cloned()
			.collect()
	}

	pub fn guard(&self, operation: Operation) -> &ConcurrencyGuard {
		match operation {
			Operation::Backup => &self.backups,
			Operation::Restore => &self.restores,
		}
	}

	fn history(&self) -> MutexGuard<'_, RunHistory> {
		self.history.lock().unwrap_or_else(|e| e.into_inner())
	}

	pub(crate) fn record(&self, handle: RunHandle) {
		self.history().push(handle);
	}

	pub fn latest(&self, job: &str, operation: Operation) -> Option<RunHandle> {
		self
			.history()
			.latest
			.get(&(job.to_string(), operation))
			.cloned()
	}

	pub fn run(&self, id: RunId) -> Option<RunHandle> {
		let history = self.history();
		history
			.runs
			.iter()
			.chain(history.latest.values())
			.find(|h| h.id() == id)
			.cloned()
	}

	/// Retained runs of `job`, newest first.
	pub fn runs_for(&self, job: &str, operation: Operation) -> Vec<Run> {
		self
			.history()
			.runs
			.iter()
			.rev()
			.filter(|h| h.operation() == operation && h.job_name() == job)
			.map(RunHandle::snapshot)
			.collect()
	}

	/// Every retained run that has not finished yet.
	pub fn active_runs(&self) -> Vec<RunHandle> {
		self
			.history()
			.latest
			.values()
			.filter(|h| !h.is_terminal())
			.cloned()
			.collect()
	}
}
