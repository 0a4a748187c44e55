// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use async_trait::async_trait;
use hozo_config::PushoverConfig;
use hozo_core::NotificationEvent;

use crate::channel::{check_status, NotifyChannel};
use crate::error::Result;

pub const PUSHOVER_API_URL: &str = "https://api.pushover.net/1/messages.json";

pub struct PushoverChannel {
	client: reqwest::Client,
	api_url: String,
	token: String,
	user: String,
}

impl PushoverChannel {
	pub fn new(client: reqwest::Client, config: &PushoverConfig) -> Self {
		Self::with_api_url(client, config, PUSHOVER_API_URL)
	}

	pub fn with_api_url(
		client: reqwest::Client,
		config: &PushoverConfig,
		api_url: impl Into<String>,
	) -> Self {
		Self {
			client,
			api_url: api_url.into(),
			token: config.token.clone(),
			user: config.user.clone(),
		}
	}
}

#[async_trait]
impl NotifyChannel for PushoverChannel {
	fn name(&self) -> &'static str {
		"pushover"
	}

	async fn send(&self, event: &NotificationEvent) -> Result<()> {
		// Priority 1 bypasses the recipient's quiet hours.
		let priority = if event.outcome.is_success() { "0" } else { "1" };
		let title = event.subject();
		let message = event.body();
		let form = [
			("token", self.token.as_str()),
			("user", self.user.as_str()),
			("title", title.as_str()),
			("message", message.as_str()),
			("priority", priority),
		];
		let response = self.client.post(&self.api_url).form(&form).send().await?;
		check_status(self.name(), &response)
	}
}
