// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Plain-text e-mail over SMTP with optional STARTTLS.

use async_trait::async_trait;
use hozo_config::SmtpConfig;
use hozo_core::NotificationEvent;
use lettre::{
	message::{header::ContentType, Mailbox},
	transport::smtp::authentication::Credentials,
	AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use crate::channel::NotifyChannel;
use crate::error::{NotifyError, Result};

pub struct EmailChannel {
	transport: AsyncSmtpTransport<Tokio1Executor>,
	from: Mailbox,
	to: Mailbox,
}

impl EmailChannel {
	/// Validates both addresses and builds the transport. No connection is
	/// made until the first send.
	#[tracing::instrument(
		name = "email_channel_new",
		skip(config),
		fields(host = %config.host, port = config.port, use_tls = config.use_tls)
	)]
	pub fn new(config: &SmtpConfig) -> Result<Self> {
		let from: Mailbox = format!("Hozo <{}>", config.from_address)
			.parse()
			.map_err(|e| NotifyError::Address(format!("{}: {e}", config.from_address)))?;
		let to: Mailbox = config
			.to_address
			.parse()
			.map_err(|e| NotifyError::Address(format!("{}: {e}", config.to_address)))?;

		let builder = if config.use_tls {
			AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
				.map_err(|e| NotifyError::Smtp(e.to_string()))?
		} else {
			AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
		};
		let mut builder = builder.port(config.port);
		if let (Some(username), Some(password)) = (&config.username, &config.password) {
			builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
		}

		Ok(Self {
			transport: builder.build(),
			from,
			to,
		})
	}

	pub(crate) fn build_message(&self, event: &NotificationEvent) -> Result<Message> {
		Message::builder()
			.from(self.from.clone())
			.to(self.to.clone())
			.subject(event.subject())
			.header(ContentType::TEXT_PLAIN)
			.body(event.body())
			.map_err(|e| NotifyError::Smtp(format!("failed to build message: {e}")))
	}
}

#[async_trait]
impl NotifyChannel for EmailChannel {
	fn name(&self) -> &'static str {
		"smtp"
	}

	async fn send(&self, event: &NotificationEvent) -> Result<()> {
		let message = self.build_message(event)?;
		self
			.transport
			.send(message)
			.await
			.map_err(|e| NotifyError::Smtp(e.to_string()))?;
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use hozo_core::TriggerKind;

	fn config() -> SmtpConfig {
		SmtpConfig {
			host: "mail.example.com".into(),
			port: 587,
			username: Some("hozo@example.com".into()),
			password: Some("secret".into()),
			from_address: "hozo@example.com".into(),
			to_address: "ops@example.com".into(),
			use_tls: true,
		}
	}

	#[test]
	fn test_message_headers() {
		let channel = EmailChannel::new(&config()).unwrap();
		let event = NotificationEvent::rejected("weekly", TriggerKind::Scheduled);
		let raw = String::from_utf8(channel.build_message(&event).unwrap().formatted()).unwrap();
		assert!(raw.contains("Subject: Hozo REJECTED: weekly"));
		assert!(raw.contains("To: ops@example.com"));
		assert!(raw.contains("Job: weekly"));
	}

	#[test]
	fn test_invalid_recipient_rejected() {
		let bad = SmtpConfig {
			to_address: "not an address".into(),
			..config()
		};
		assert!(matches!(EmailChannel::new(&bad), Err(NotifyError::Address(_))));
	}
}
