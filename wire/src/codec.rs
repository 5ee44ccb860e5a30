use prost::Message;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{DfsError, Result};

/// Upper bound on a single frame. Leaves headroom above the largest block a
/// default-configured cluster ships, everything bigger is a protocol error.
pub const MAX_FRAME_BYTES: u32 = 64 * 1024 * 1024 + 64 * 1024;

/// Writes one length-prefixed frame: u32-le payload size, then the encoded
/// message.
pub async fn write_frame<M: Message>(
    stream: &mut (impl AsyncWrite + Unpin),
    message: &M,
) -> Result<()> {
    let payload = message.encode_to_vec();
    if payload.len() > MAX_FRAME_BYTES as usize {
        return Err(DfsError::Protocol(format!(
            "refusing to send a {} byte frame, limit is {MAX_FRAME_BYTES}",
            payload.len()
        )));
    }
    stream.write_u32_le(payload.len() as u32).await?;
    stream.write_all(&payload).await?;
    stream.flush().await?;
    Ok(())
}

/// Reads one length-prefixed frame and decodes it.
pub async fn read_frame<M: Message + Default>(
    stream: &mut (impl AsyncRead + Unpin),
) -> Result<M> {
    let frame_size = stream.read_u32_le().await?;
    if frame_size > MAX_FRAME_BYTES {
        return Err(DfsError::Protocol(format!(
            "frame of {frame_size} bytes exceeds the {MAX_FRAME_BYTES} byte limit"
        )));
    }
    let mut frame = vec![0u8; frame_size as usize];
    stream.read_exact(&mut frame).await?;
    Ok(M::decode(frame.as_slice())?)
}
