// crates/warden-ipc/src/lib.rs
// ============================================================================
// Module: Warden IPC Library
// Description: Framed duplex channel between Core and the Gateway.
// Purpose: Expose the frame codec, the socket server, and the client half.
// Dependencies: crate::{client, framing, server}
// ============================================================================

//! ## Overview
//! The IPC channel is a local Unix domain stream carrying length-prefixed
//! UTF-8 JSON frames: a 4-byte big-endian length, then the payload bytes.
//! The transport is an unprivileged carrier; it validates framing only and
//! never inspects or audits message content.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod client;
pub mod framing;
pub mod server;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use client::IpcClient;
pub use framing::DEFAULT_MAX_FRAME_BYTES;
pub use framing::FramingError;
pub use framing::read_frame;
pub use framing::write_frame;
pub use server::IpcError;
pub use server::IpcServer;
pub use server::IpcServerConfig;
pub use server::IpcServerHandle;
pub use server::MessageHandler;
pub use server::SessionHandle;
