// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Notification dispatch for Hozo run results.
//!
//! [`NotificationGateway`] implements [`hozo_core::Notifier`] and fans each
//! event out to ntfy, Pushover, SMTP e-mail and a signed JSON webhook.
//! Channel failures are logged and reported, never returned to the engine.

pub mod channel;
pub mod email;
pub mod error;
pub mod gateway;
pub mod ntfy;
pub mod pushover;
pub mod webhook;

pub use channel::NotifyChannel;
pub use email::EmailChannel;
pub use error::{NotifyError, Result};
pub use gateway::{DeliveryReport, NotificationGateway};
pub use ntfy::NtfyChannel;
pub use pushover::PushoverChannel;
pub use webhook::{compute_signature, verify_signature, WebhookChannel, SIGNATURE_HEADER};
