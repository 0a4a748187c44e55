// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use async_trait::async_trait;
use hozo_core::NotificationEvent;

use crate::error::Result;

/// One delivery endpoint. The gateway owns timeouts and error logging.
#[async_trait]
pub trait NotifyChannel: Send + Sync {
	fn name(&self) -> &'static str;

	async fn send(&self, event: &NotificationEvent) -> Result<()>;
}

/// Maps a non-2xx response to [`crate::NotifyError::Status`].
pub(crate) fn check_status(channel: &'static str, response: &reqwest::Response) -> Result<()> {
	let status = response.status();
	if status.is_success() {
		Ok(())
	} else {
		Err(crate::NotifyError::Status {
			channel,
			status: status.as_u16(),
		})
	}
}
