// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! ntfy push notifications: the body is the plain-text summary, metadata
//! travels in headers.

use async_trait::async_trait;
use hozo_config::NtfyConfig;
use hozo_core::NotificationEvent;
use tracing::debug;

use crate::channel::{check_status, NotifyChannel};
use crate::error::Result;

pub struct NtfyChannel {
	client: reqwest::Client,
	url: String,
}

impl NtfyChannel {
	pub fn new(client: reqwest::Client, config: &NtfyConfig) -> Self {
		Self {
			client,
			url: config.url(),
		}
	}
}

/// `(priority, tags)` for an event.
pub(crate) fn priority_and_tags(event: &NotificationEvent) -> (&'static str, &'static str) {
	if event.outcome.is_success() {
		("default", "white_check_mark")
	} else {
		("high", "warning")
	}
}

#[async_trait]
impl NotifyChannel for NtfyChannel {
	fn name(&self) -> &'static str {
		"ntfy"
	}

	async fn send(&self, event: &NotificationEvent) -> Result<()> {
		let (priority, tags) = priority_and_tags(event);
		debug!(url = %self.url, priority, "posting to ntfy");
		let response = self
			.client
			.post(&self.url)
			.header("Title", event.subject())
			.header("Priority", priority)
			.header("Tags", tags)
			.body(event.body())
			.send()
			.await?;
		check_status(self.name(), &response)
	}
}
