// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use thiserror::Error;

/// Delivery failure on a single channel.
#[derive(Debug, Error)]
pub enum NotifyError {
	#[error("http request failed: {0}")]
	Http(#[from] reqwest::Error),

	#[error("{channel} responded with HTTP {status}")]
	Status { channel: &'static str, status: u16 },

	#[error("invalid email address: {0}")]
	Address(String),

	#[error("smtp error: {0}")]
	Smtp(String),

	#[error("failed to encode payload: {0}")]
	Encode(#[from] serde_json::Error),

	#[error("failed to sign payload: {0}")]
	Signature(String),

	#[error("timed out after {0}s")]
	Timeout(u64),
}

pub type Result<T> = std::result::Result<T, NotifyError>;
