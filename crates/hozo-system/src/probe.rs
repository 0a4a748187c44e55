// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::time::Duration;

use async_trait::async_trait;
use hozo_core::{ProbeResult, ReachabilityProbe};
use tokio::net::TcpStream;
use tracing::trace;

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// A single TCP connect; the connection is closed immediately.
#[derive(Debug, Clone, Copy)]
pub struct TcpProbe {
	pub connect_timeout: Duration,
}

impl Default for TcpProbe {
	fn default() -> Self {
		Self {
			connect_timeout: DEFAULT_CONNECT_TIMEOUT,
		}
	}
}

#[async_trait]
impl ReachabilityProbe for TcpProbe {
	async fn probe(&self, host: &str, port: u16) -> ProbeResult {
		let connect = TcpStream::connect((host, port));
		let result = match tokio::time::timeout(self.connect_timeout, connect).await {
			Ok(Ok(_)) => ProbeResult::Connected,
			Ok(Err(_)) => ProbeResult::Refused,
			Err(_) => ProbeResult::TimedOut,
		};
		trace!(host, port, ?result, "tcp probe");
		result
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use tokio::net::TcpListener;

	#[tokio::test]
	async fn test_open_port_connects() {
		let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
		let port = listener.local_addr().unwrap().port();
		assert_eq!(
			TcpProbe::default().probe("127.0.0.1", port).await,
			ProbeResult::Connected
		);
	}

	#[tokio::test]
	async fn test_closed_port_is_refused() {
		let port = {
			let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
			listener.local_addr().unwrap().port()
		};
		assert_eq!(
			TcpProbe::default().probe("127.0.0.1", port).await,
			ProbeResult::Refused
		);
	}
}
