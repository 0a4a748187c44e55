// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Fan-out of one event to every configured channel.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use hozo_config::NotificationsConfig;
use hozo_core::{NotificationEvent, Notifier};
use tracing::{info, instrument, warn};

use crate::channel::NotifyChannel;
use crate::email::EmailChannel;
use crate::error::{NotifyError, Result};
use crate::ntfy::NtfyChannel;
use crate::pushover::PushoverChannel;
use crate::webhook::WebhookChannel;

/// What happened on one channel.
#[derive(Debug)]
pub struct DeliveryReport {
	pub channel: &'static str,
	pub result: Result<()>,
}

/// Sends every event to all channels concurrently, each bounded by
/// `timeout`. A slow or failing channel never delays or blocks the others.
pub struct NotificationGateway {
	channels: Vec<Arc<dyn NotifyChannel>>,
	timeout: Duration,
}

impl NotificationGateway {
	pub fn new(channels: Vec<Arc<dyn NotifyChannel>>, timeout: Duration) -> Self {
		Self { channels, timeout }
	}

	/// Builds one channel per configured section.
	///
	/// Fails only when a configured e-mail address does not parse.
	pub fn from_config(config: &NotificationsConfig) -> Result<Self> {
		let client = reqwest::Client::builder()
			.timeout(config.timeout)
			.user_agent(concat!("hozo/", env!("CARGO_PKG_VERSION")))
			.build()?;

		let mut channels: Vec<Arc<dyn NotifyChannel>> = Vec::new();
		if let Some(ntfy) = &config.ntfy {
			channels.push(Arc::new(NtfyChannel::new(client.clone(), ntfy)));
		}
		if let Some(pushover) = &config.pushover {
			channels.push(Arc::new(PushoverChannel::new(client.clone(), pushover)));
		}
		if let Some(smtp) = &config.smtp {
			channels.push(Arc::new(EmailChannel::new(smtp)?));
		}
		if let Some(webhook) = &config.webhook {
			channels.push(Arc::new(WebhookChannel::new(client, webhook)));
		}
		Ok(Self::new(channels, config.timeout))
	}

	pub fn channel_names(&self) -> Vec<&'static str> {
		self.channels.iter().map(|c| c.name()).collect()
	}

	pub fn is_empty(&self) -> bool {
		self.channels.is_empty()
	}

	/// Delivers to every channel and reports each result, in channel order.
	#[instrument(skip_all, fields(job = %event.job_name, outcome = event.outcome.label()))]
	pub async fn dispatch(&self, event: &NotificationEvent) -> Vec<DeliveryReport> {
		let limit = self.timeout;
		let sends = self.channels.iter().map(|channel| async move {
			let result = match tokio::time::timeout(limit, channel.send(event)).await {
				Ok(result) => result,
				Err(_) => Err(NotifyError::Timeout(limit.as_secs())),
			};
			match &result {
				Ok(()) => info!(channel = channel.name(), "notification sent"),
				Err(e) => warn!(channel = channel.name(), error = %e, "notification failed"),
			}
			DeliveryReport {
				channel: channel.name(),
				result,
			}
		});
		join_all(sends).await
	}
}

#[async_trait]
impl Notifier for NotificationGateway {
	async fn notify(&self, event: &NotificationEvent) {
		if self.channels.is_empty() {
			return;
		}
		self.dispatch(event).await;
	}
}
