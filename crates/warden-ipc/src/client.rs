// crates/warden-ipc/src/client.rs
// ============================================================================
// Module: IPC Client
// Description: Core-side half of the framed channel.
// Purpose: Submit signed envelopes and await correlated responses.
// Dependencies: crate::{framing, server}, tokio, warden-core
// ============================================================================

//! ## Overview
//! The client holds one stream to the gateway socket. Requests and responses
//! correlate by identifier; because the channel is not multiplexed, a request
//! is written and its response read before the next request is submitted.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;

use tokio::net::UnixStream;
use warden_core::ActionResponse;
use warden_core::RequestEnvelope;

use crate::framing::DEFAULT_MAX_FRAME_BYTES;
use crate::framing::read_frame;
use crate::framing::write_frame;
use crate::server::IpcError;

// ============================================================================
// SECTION: Client
// ============================================================================

/// Client connection to a gateway socket.
pub struct IpcClient {
    /// Established stream.
    stream: UnixStream,
    /// Maximum accepted frame payload size in bytes.
    max_frame_bytes: usize,
}

impl IpcClient {
    /// Connects to the gateway socket with the default frame cap.
    ///
    /// # Errors
    ///
    /// Returns [`IpcError::Connect`] when the socket cannot be reached.
    pub async fn connect(path: &Path) -> Result<Self, IpcError> {
        Self::connect_with_limit(path, DEFAULT_MAX_FRAME_BYTES).await
    }

    /// Connects with an explicit frame cap.
    ///
    /// # Errors
    ///
    /// Returns [`IpcError::Connect`] when the socket cannot be reached.
    pub async fn connect_with_limit(path: &Path, max_frame_bytes: usize) -> Result<Self, IpcError> {
        let stream =
            UnixStream::connect(path).await.map_err(|err| IpcError::Connect(err.to_string()))?;
        Ok(Self {
            stream,
            max_frame_bytes,
        })
    }

    /// Submits a raw frame and reads the next response frame.
    ///
    /// # Errors
    ///
    /// Returns [`IpcError::Frame`] on codec failures and [`IpcError::Closed`]
    /// when the gateway hangs up before responding.
    pub async fn request_raw(&mut self, frame: &[u8]) -> Result<Vec<u8>, IpcError> {
        write_frame(&mut self.stream, frame)
            .await
            .map_err(|err| IpcError::Frame(err.to_string()))?;
        match read_frame(&mut self.stream, self.max_frame_bytes).await {
            Ok(response) => Ok(response),
            Err(crate::framing::FramingError::Closed) => Err(IpcError::Closed),
            Err(err) => Err(IpcError::Frame(err.to_string())),
        }
    }

    /// Submits a signed envelope and decodes the typed response.
    ///
    /// # Errors
    ///
    /// Returns [`IpcError::Decode`] when either side of the exchange fails to
    /// serialize, plus any transport error from [`IpcClient::request_raw`].
    pub async fn request(&mut self, envelope: &RequestEnvelope) -> Result<ActionResponse, IpcError> {
        let frame =
            serde_json::to_vec(envelope).map_err(|err| IpcError::Decode(err.to_string()))?;
        let response = self.request_raw(&frame).await?;
        serde_json::from_slice(&response).map_err(|err| IpcError::Decode(err.to_string()))
    }
}
