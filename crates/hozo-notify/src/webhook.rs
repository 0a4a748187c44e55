// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Generic JSON webhook, optionally signed with HMAC-SHA256.
//!
//! The signature covers the exact request body and is sent as
//! `X-Hozo-Signature: sha256=<hex>`.

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use hozo_config::WebhookConfig;
use hozo_core::NotificationEvent;
use serde::Serialize;
use sha2::Sha256;

use crate::channel::{check_status, NotifyChannel};
use crate::error::{NotifyError, Result};

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "X-Hozo-Signature";
pub const EVENT_HEADER: &str = "X-Hozo-Event";

/// Hex-encoded HMAC-SHA256 of `payload`, without prefix.
pub fn compute_signature(secret: &[u8], payload: &[u8]) -> Result<String> {
	let mut mac =
		HmacSha256::new_from_slice(secret).map_err(|e| NotifyError::Signature(e.to_string()))?;
	mac.update(payload);
	Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Constant-time check of a hex signature produced by [`compute_signature`].
pub fn verify_signature(secret: &[u8], payload: &[u8], signature: &str) -> bool {
	let Ok(expected) = hex::decode(signature) else {
		return false;
	};
	let Ok(mut mac) = HmacSha256::new_from_slice(secret) else {
		return false;
	};
	mac.update(payload);
	mac.verify_slice(&expected).is_ok()
}

#[derive(Serialize)]
struct WebhookPayload<'a> {
	subject: String,
	body: String,
	#[serde(flatten)]
	event: &'a NotificationEvent,
}

pub struct WebhookChannel {
	client: reqwest::Client,
	url: String,
	secret: Option<String>,
}

impl WebhookChannel {
	pub fn new(client: reqwest::Client, config: &WebhookConfig) -> Self {
		Self {
			client,
			url: config.url.clone(),
			secret: config.secret.clone(),
		}
	}
}

#[async_trait]
impl NotifyChannel for WebhookChannel {
	fn name(&self) -> &'static str {
		"webhook"
	}

	async fn send(&self, event: &NotificationEvent) -> Result<()> {
		let payload = serde_json::to_vec(&WebhookPayload {
			subject: event.subject(),
			body: event.body(),
			event,
		})?;

		let mut request = self
			.client
			.post(&self.url)
			.header(reqwest::header::CONTENT_TYPE, "application/json")
			.header(EVENT_HEADER, event.outcome.label().to_ascii_lowercase());
		if let Some(secret) = &self.secret {
			let signature = compute_signature(secret.as_bytes(), &payload)?;
			request = request.header(SIGNATURE_HEADER, format!("sha256={signature}"));
		}

		let response = request.body(payload).send().await?;
		check_status(self.name(), &response)
	}
}
