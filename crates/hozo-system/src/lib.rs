// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Production collaborators for the Hozo engine.
//!
//! - [`UdpWakeSender`]: Wake-on-LAN magic packet over UDP broadcast
//! - [`TcpProbe`]: one TCP connect per probe
//! - [`SyncoidReplicator`]: runs `syncoid`
//! - [`SshExecutor`]: runs commands through the system `ssh` client

pub mod probe;
pub mod process;
pub mod ssh;
pub mod syncoid;
pub mod wol;

pub use probe::TcpProbe;
pub use process::run_process;
pub use ssh::SshExecutor;
pub use syncoid::{syncoid_args, SyncoidReplicator};
pub use wol::{magic_packet, UdpWakeSender};
