// crates/warden-ipc/src/framing.rs
// ============================================================================
// Module: IPC Frame Codec
// Description: Length-prefixed frame reading and writing.
// Purpose: Deliver whole messages or nothing; partial frames never surface.
// Dependencies: tokio
// ============================================================================

//! ## Overview
//! Each frame is a 32-bit big-endian payload length followed by that many
//! bytes of UTF-8 JSON. A length above the configured cap is a framing error
//! and closes the connection; the codec never hands a partial message upward.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;
use tokio::io::AsyncRead;
use tokio::io::AsyncReadExt;
use tokio::io::AsyncWrite;
use tokio::io::AsyncWriteExt;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default maximum frame payload size in bytes.
pub const DEFAULT_MAX_FRAME_BYTES: usize = 4 * 1024 * 1024;
/// Size of the frame length prefix in bytes.
pub const LENGTH_PREFIX_BYTES: usize = 4;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Frame codec errors.
///
/// # Invariants
/// - Any error invalidates the stream; callers must close the connection.
#[derive(Debug, Error)]
pub enum FramingError {
    /// Peer closed the stream at a frame boundary.
    #[error("stream closed")]
    Closed,
    /// Stream ended inside a frame.
    #[error("truncated frame: {0}")]
    Truncated(String),
    /// Declared payload length exceeds the cap.
    #[error("frame too large: {actual} bytes (max {max})")]
    Oversize {
        /// Declared payload length.
        actual: usize,
        /// Maximum permitted payload length.
        max: usize,
    },
    /// Underlying stream I/O failed.
    #[error("stream io error: {0}")]
    Io(String),
}

// ============================================================================
// SECTION: Read / Write
// ============================================================================

/// Reads one frame, returning the payload bytes.
///
/// # Errors
///
/// Returns [`FramingError::Closed`] at a clean end of stream,
/// [`FramingError::Truncated`] when the stream ends mid-frame,
/// [`FramingError::Oversize`] when the declared length exceeds `max_bytes`,
/// and [`FramingError::Io`] for other stream failures.
pub async fn read_frame<R: AsyncRead + Unpin>(
    reader: &mut R,
    max_bytes: usize,
) -> Result<Vec<u8>, FramingError> {
    let mut prefix = [0u8; LENGTH_PREFIX_BYTES];
    match reader.read_exact(&mut prefix).await {
        Ok(_) => {}
        Err(err) if err.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(FramingError::Closed);
        }
        Err(err) => return Err(FramingError::Io(err.to_string())),
    }
    let declared = usize::try_from(u32::from_be_bytes(prefix))
        .map_err(|_| FramingError::Io("length prefix out of range".to_string()))?;
    if declared > max_bytes {
        return Err(FramingError::Oversize {
            actual: declared,
            max: max_bytes,
        });
    }
    let mut payload = vec![0u8; declared];
    reader.read_exact(&mut payload).await.map_err(|err| {
        if err.kind() == std::io::ErrorKind::UnexpectedEof {
            FramingError::Truncated(err.to_string())
        } else {
            FramingError::Io(err.to_string())
        }
    })?;
    Ok(payload)
}

/// Writes one frame and flushes the stream.
///
/// # Errors
///
/// Returns [`FramingError::Oversize`] when the payload does not fit a 32-bit
/// length, and [`FramingError::Io`] when the stream write fails.
pub async fn write_frame<W: AsyncWrite + Unpin>(
    writer: &mut W,
    payload: &[u8],
) -> Result<(), FramingError> {
    let length = u32::try_from(payload.len()).map_err(|_| FramingError::Oversize {
        actual: payload.len(),
        max: usize::try_from(u32::MAX).unwrap_or(usize::MAX),
    })?;
    writer
        .write_all(&length.to_be_bytes())
        .await
        .map_err(|err| FramingError::Io(err.to_string()))?;
    writer.write_all(payload).await.map_err(|err| FramingError::Io(err.to_string()))?;
    writer.flush().await.map_err(|err| FramingError::Io(err.to_string()))
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only panic-based assertions are permitted."
    )]

    use super::FramingError;
    use super::read_frame;
    use super::write_frame;

    /// Tests a frame round-trips through the codec.
    #[tokio::test]
    async fn test_frame_round_trip() {
        let (mut client, mut server) = tokio::io::duplex(1024);
        write_frame(&mut client, b"{\"x\":1}").await.unwrap();
        let payload = read_frame(&mut server, 1024).await.unwrap();
        assert_eq!(payload, b"{\"x\":1}");
    }

    /// Tests a payload split across writes reassembles.
    #[tokio::test]
    async fn test_split_frame_reassembles() {
        use tokio::io::AsyncWriteExt;

        let (mut client, mut server) = tokio::io::duplex(1024);
        let payload = b"{\"body\":\"hello\"}";
        let length = u32::try_from(payload.len()).unwrap().to_be_bytes();
        let read = tokio::spawn(async move { read_frame(&mut server, 1024).await });
        client.write_all(&length[..2]).await.unwrap();
        client.write_all(&length[2..]).await.unwrap();
        client.write_all(&payload[..5]).await.unwrap();
        client.write_all(&payload[5..]).await.unwrap();
        client.flush().await.unwrap();
        assert_eq!(read.await.unwrap().unwrap(), payload);
    }

    /// Tests the length cap is inclusive at the boundary.
    #[tokio::test]
    async fn test_length_cap_boundary() {
        let payload = vec![b'x'; 64];

        let (mut client, mut server) = tokio::io::duplex(1024);
        write_frame(&mut client, &payload).await.unwrap();
        assert!(read_frame(&mut server, 64).await.is_ok());

        let (mut client, mut server) = tokio::io::duplex(1024);
        write_frame(&mut client, &payload).await.unwrap();
        let result = read_frame(&mut server, 63).await;
        assert!(matches!(result, Err(FramingError::Oversize { actual: 64, max: 63 })));
    }

    /// Tests clean close surfaces as Closed, mid-frame close as Truncated.
    #[tokio::test]
    async fn test_close_classification() {
        use tokio::io::AsyncWriteExt;

        let (client, mut server) = tokio::io::duplex(1024);
        drop(client);
        assert!(matches!(read_frame(&mut server, 1024).await, Err(FramingError::Closed)));

        let (mut client, mut server) = tokio::io::duplex(1024);
        client.write_all(&8u32.to_be_bytes()).await.unwrap();
        client.write_all(b"abc").await.unwrap();
        drop(client);
        assert!(matches!(read_frame(&mut server, 1024).await, Err(FramingError::Truncated(_))));
    }
}
