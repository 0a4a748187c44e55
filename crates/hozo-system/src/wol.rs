// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Wake-on-LAN magic packets over UDP broadcast.

use async_trait::async_trait;
use hozo_core::{CollaboratorError, MacAddress, WakeSender, WakeTarget};
use tokio::net::UdpSocket;
use tracing::{debug, info};

pub const MAGIC_PACKET_LEN: usize = 6 + 16 * 6;

/// Six `0xFF` bytes followed by the MAC address sixteen times.
pub fn magic_packet(mac: &MacAddress) -> [u8; MAGIC_PACKET_LEN] {
	let mut packet = [0xFFu8; MAGIC_PACKET_LEN];
	for chunk in packet[6..].chunks_exact_mut(6) {
		chunk.copy_from_slice(&mac.octets());
	}
	packet
}

#[derive(Debug, Default, Clone, Copy)]
pub struct UdpWakeSender;

#[async_trait]
impl WakeSender for UdpWakeSender {
	async fn wake(&self, target: &WakeTarget) -> Result<(), CollaboratorError> {
		let socket = UdpSocket::bind("0.0.0.0:0").await?;
		socket.set_broadcast(true)?;
		let packet = magic_packet(&target.mac);
		info!(
			mac = %target.mac,
			broadcast = %target.broadcast,
			port = target.port,
			"sending magic packet"
		);
		let sent = socket
			.send_to(&packet, (target.broadcast.as_str(), target.port))
			.await?;
		if sent != packet.len() {
			return Err(CollaboratorError::Other(format!(
				"short send: {sent} of {} bytes",
				packet.len()
			)));
		}
		debug!("magic packet sent");
		Ok(())
	}
}
