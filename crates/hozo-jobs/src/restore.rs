// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Restore: replication in the reverse direction.
//!
//! Restores overwrite the local dataset, so they demand the job name typed
//! back exactly, make a single attempt, and skip verification.

use hozo_core::{DatasetLocation, JobDefinition, Operation, ReplicationRequest, TriggerError};

use crate::executor::RunPlan;
use crate::replication::RetryPolicy;

/// Exact, case-sensitive comparison; no trimming.
pub fn check_confirmation(job: &JobDefinition, confirmation: &str) -> Result<(), TriggerError> {
	if confirmation == job.name {
		Ok(())
	} else {
		Err(TriggerError::ConfirmationMismatch {
			job: job.name.clone(),
		})
	}
}

impl RunPlan {
	pub fn restore(job: &JobDefinition) -> Self {
		Self {
			operation: Operation::Restore,
			request: ReplicationRequest {
				source: DatasetLocation::Remote {
					target: job.target.clone(),
					dataset: job.target_dataset.clone(),
				},
				target: DatasetLocation::Local {
					dataset: job.source_dataset.clone(),
				},
				recursive: job.recursive,
				destructive: true,
				no_privilege_elevation: job.no_privilege_elevation,
			},
			policy: RetryPolicy::once(),
			verify: false,
		}
	}
}
