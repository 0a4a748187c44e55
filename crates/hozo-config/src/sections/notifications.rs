// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Notification channel configuration.
//!
//! Each channel sub-table finalizes to `None` unless its required fields are
//! present, so a half-filled table silently disables that one channel.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

const DEFAULT_NTFY_SERVER: &str = "https://ntfy.sh";
const DEFAULT_SMTP_PORT: u16 = 587;
const DEFAULT_TIMEOUT_SECS: u64 = 10;

fn merge_opt<T>(base: &mut Option<T>, other: Option<T>) {
	if other.is_some() {
		*base = other;
	}
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NtfyConfigLayer {
	pub server: Option<String>,
	pub topic: Option<String>,
}

impl NtfyConfigLayer {
	pub fn merge(&mut self, other: Self) {
		merge_opt(&mut self.server, other.server);
		merge_opt(&mut self.topic, other.topic);
	}

	pub fn finalize(self) -> Option<NtfyConfig> {
		let topic = self.topic.filter(|t| !t.is_empty())?;
		Some(NtfyConfig {
			server: self
				.server
				.unwrap_or_else(|| DEFAULT_NTFY_SERVER.to_string()),
			topic,
		})
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct NtfyConfig {
	pub server: String,
	pub topic: String,
}

impl NtfyConfig {
	pub fn url(&self) -> String {
		format!("{}/{}", self.server.trim_end_matches('/'), self.topic)
	}
}

#[derive(Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PushoverConfigLayer {
	pub token: Option<String>,
	pub user: Option<String>,
}

impl fmt::Debug for PushoverConfigLayer {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("PushoverConfigLayer")
			.field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
			.field("user", &self.user)
			.finish()
	}
}

impl PushoverConfigLayer {
	pub fn merge(&mut self, other: Self) {
		merge_opt(&mut self.token, other.token);
		merge_opt(&mut self.user, other.user);
	}

	pub fn finalize(self) -> Option<PushoverConfig> {
		Some(PushoverConfig {
			token: self.token.filter(|t| !t.is_empty())?,
			user: self.user.filter(|u| !u.is_empty())?,
		})
	}
}

#[derive(Clone, PartialEq)]
pub struct PushoverConfig {
	pub token: String,
	pub user: String,
}

impl fmt::Debug for PushoverConfig {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("PushoverConfig")
			.field("token", &"[REDACTED]")
			.field("user", &self.user)
			.finish()
	}
}

#[derive(Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SmtpConfigLayer {
	pub host: Option<String>,
	pub port: Option<u16>,
	pub username: Option<String>,
	pub password: Option<String>,
	pub from_address: Option<String>,
	pub to_address: Option<String>,
	pub use_tls: Option<bool>,
}

impl fmt::Debug for SmtpConfigLayer {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("SmtpConfigLayer")
			.field("host", &self.host)
			.field("port", &self.port)
			.field("username", &self.username)
			.field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
			.field("from_address", &self.from_address)
			.field("to_address", &self.to_address)
			.field("use_tls", &self.use_tls)
			.finish()
	}
}

impl SmtpConfigLayer {
	pub fn merge(&mut self, other: Self) {
		merge_opt(&mut self.host, other.host);
		merge_opt(&mut self.port, other.port);
		merge_opt(&mut self.username, other.username);
		merge_opt(&mut self.password, other.password);
		merge_opt(&mut self.from_address, other.from_address);
		merge_opt(&mut self.to_address, other.to_address);
		merge_opt(&mut self.use_tls, other.use_tls);
	}

	/// Requires `host` and `to_address`; `from_address` falls back to the
	/// username, then to `hozo@<host>`.
	pub fn finalize(self) -> Option<SmtpConfig> {
		let host = self.host.filter(|h| !h.is_empty())?;
		let to_address = self.to_address.filter(|t| !t.is_empty())?;
		let from_address = self
			.from_address
			.or_else(|| self.username.clone())
			.unwrap_or_else(|| format!("hozo@{host}"));
		Some(SmtpConfig {
			port: self.port.unwrap_or(DEFAULT_SMTP_PORT),
			username: self.username,
			password: self.password,
			from_address,
			to_address,
			use_tls: self.use_tls.unwrap_or(true),
			host,
		})
	}
}

#[derive(Clone, PartialEq)]
pub struct SmtpConfig {
	pub host: String,
	pub port: u16,
	pub username: Option<String>,
	pub password: Option<String>,
	pub from_address: String,
	pub to_address: String,
	pub use_tls: bool,
}

impl fmt::Debug for SmtpConfig {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("SmtpConfig")
			.field("host", &self.host)
			.field("port", &self.port)
			.field("username", &self.username)
			.field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
			.field("from_address", &self.from_address)
			.field("to_address", &self.to_address)
			.field("use_tls", &self.use_tls)
			.finish()
	}
}

#[derive(Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct WebhookConfigLayer {
	pub url: Option<String>,
	pub secret: Option<String>,
}

impl fmt::Debug for WebhookConfigLayer {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("WebhookConfigLayer")
			.field("url", &self.url)
			.field("secret", &self.secret.as_ref().map(|_| "[REDACTED]"))
			.finish()
	}
}

impl WebhookConfigLayer {
	pub fn merge(&mut self, other: Self) {
		merge_opt(&mut self.url, other.url);
		merge_opt(&mut self.secret, other.secret);
	}

	pub fn finalize(self) -> Option<WebhookConfig> {
		Some(WebhookConfig {
			url: self.url.filter(|u| !u.is_empty())?,
			secret: self.secret.filter(|s| !s.is_empty()),
		})
	}
}

#[derive(Clone, PartialEq)]
pub struct WebhookConfig {
	pub url: String,
	/// HMAC-SHA256 key for the signature header; unsigned when `None`.
	pub secret: Option<String>,
}

impl fmt::Debug for WebhookConfig {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("WebhookConfig")
			.field("url", &self.url)
			.field("secret", &self.secret.as_ref().map(|_| "[REDACTED]"))
			.finish()
	}
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NotificationsConfigLayer {
	pub timeout_secs: Option<u64>,
	pub notify_on_rejection: Option<bool>,
	pub ntfy: Option<NtfyConfigLayer>,
	pub pushover: Option<PushoverConfigLayer>,
	pub smtp: Option<SmtpConfigLayer>,
	pub webhook: Option<WebhookConfigLayer>,
}

fn merge_section<T: Default>(base: &mut Option<T>, other: Option<T>, merge: impl FnOnce(&mut T, T)) {
	if let Some(other) = other {
		merge(base.get_or_insert_with(T::default), other);
	}
}

impl NotificationsConfigLayer {
	pub fn merge(&mut self, other: Self) {
		merge_opt(&mut self.timeout_secs, other.timeout_secs);
		merge_opt(&mut self.notify_on_rejection, other.notify_on_rejection);
		merge_section(&mut self.ntfy, other.ntfy, NtfyConfigLayer::merge);
		merge_section(&mut self.pushover, other.pushover, PushoverConfigLayer::merge);
		merge_section(&mut self.smtp, other.smtp, SmtpConfigLayer::merge);
		merge_section(&mut self.webhook, other.webhook, WebhookConfigLayer::merge);
	}

	pub fn finalize(self) -> NotificationsConfig {
		NotificationsConfig {
			timeout: Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
			notify_on_rejection: self.notify_on_rejection.unwrap_or(false),
			ntfy: self.ntfy.and_then(NtfyConfigLayer::finalize),
			pushover: self.pushover.and_then(PushoverConfigLayer::finalize),
			smtp: self.smtp.and_then(SmtpConfigLayer::finalize),
			webhook: self.webhook.and_then(WebhookConfigLayer::finalize),
		}
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct NotificationsConfig {
	/// Upper bound on each channel's delivery.
	pub timeout: Duration,
	/// Also notify when a scheduled fire is dropped because the job is busy.
	pub notify_on_rejection: bool,
	pub ntfy: Option<NtfyConfig>,
	pub pushover: Option<PushoverConfig>,
	pub smtp: Option<SmtpConfig>,
	pub webhook: Option<WebhookConfig>,
}

impl Default for NotificationsConfig {
	fn default() -> Self {
		NotificationsConfigLayer::default().finalize()
	}
}

impl NotificationsConfig {
	/// Names of the channels that will receive events.
	pub fn enabled_channels(&self) -> Vec<&'static str> {
		let mut channels = Vec::new();
		if self.ntfy.is_some() {
			channels.push("ntfy");
		}
		if self.pushover.is_some() {
			channels.push("pushover");
		}
		if self.smtp.is_some() {
			channels.push("smtp");
		}
		if self.webhook.is_some() {
			channels.push("webhook");
		}
		channels
	}
}
