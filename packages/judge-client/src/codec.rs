//! Length-prefixed JSON framing for the judge-server protocol.
//!
//! One frame = a 4-byte big-endian signed length, then exactly that many
//! bytes of UTF-8 JSON. Both directions of the protocol use the same shape.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::CodecError;

/// Upper bound on a single frame's payload. Source text and per-case detail
/// are both bounded well below this in practice.
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Write one frame: length prefix followed by the payload bytes.
pub async fn write_frame<W>(writer: &mut W, payload: &[u8]) -> Result<(), CodecError>
where
    W: AsyncWrite + Unpin,
{
    if payload.len() > MAX_FRAME_SIZE {
        return Err(CodecError::FrameTooLarge(payload.len(), MAX_FRAME_SIZE));
    }

    writer.write_all(&(payload.len() as i32).to_be_bytes()).await?;
    writer.write_all(payload).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one frame's payload.
///
/// `read_exact` loops internally until the full prefix and payload arrive;
/// a short read is never mistaken for a complete frame. A clean EOF inside
/// the payload is reported as `Truncated` so the caller can distinguish a
/// cut-off response from a transport fault.
pub async fn read_frame<R>(reader: &mut R) -> Result<Vec<u8>, CodecError>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf).await?;

    let len = i32::from_be_bytes(len_buf);
    if len < 0 {
        return Err(CodecError::InvalidLength(len));
    }
    let len = len as usize;
    if len > MAX_FRAME_SIZE {
        return Err(CodecError::FrameTooLarge(len, MAX_FRAME_SIZE));
    }

    let mut payload = vec![0u8; len];
    let mut read = 0;
    while read < len {
        match reader.read(&mut payload[read..]).await? {
            0 => return Err(CodecError::Truncated { read, expected: len }),
            n => read += n,
        }
    }
    Ok(payload)
}

/// Serialize a value and frame it.
pub fn encode_frame<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, serde_json::Error> {
    let payload = serde_json::to_vec(value)?;
    let mut frame = Vec::with_capacity(4 + payload.len());
    frame.extend_from_slice(&(payload.len() as i32).to_be_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn frame_round_trip() {
        let value = json!({
            "task_id": "7",
            "lang": "cpp",
            "limit": {"max_cpu_time": 1000, "max_memory": 268435456},
        });

        let (mut client, mut server) = tokio::io::duplex(1024);
        let payload = serde_json::to_vec(&value).unwrap();
        write_frame(&mut client, &payload).await.unwrap();

        let read = read_frame(&mut server).await.unwrap();
        let decoded: serde_json::Value = serde_json::from_slice(&read).unwrap();
        assert_eq!(decoded, value);
    }

    #[tokio::test]
    async fn encode_frame_matches_write_frame() {
        let value = json!({"status": 0, "score": 100});

        let frame = encode_frame(&value).unwrap();
        let payload = serde_json::to_vec(&value).unwrap();
        assert_eq!(&frame[..4], (payload.len() as i32).to_be_bytes());
        assert_eq!(&frame[4..], &payload[..]);
    }

    #[tokio::test]
    async fn payload_read_accumulates_across_short_reads() {
        let payload = serde_json::to_vec(&json!({"log": "x".repeat(4096)})).unwrap();

        // A tiny duplex buffer forces the payload through many partial reads.
        let (mut client, mut server) = tokio::io::duplex(16);
        let writer = {
            let payload = payload.clone();
            tokio::spawn(async move {
                write_frame(&mut client, &payload).await.unwrap();
            })
        };

        let read = read_frame(&mut server).await.unwrap();
        writer.await.unwrap();
        assert_eq!(read, payload);
    }

    #[tokio::test]
    async fn negative_length_is_rejected() {
        let (mut client, mut server) = tokio::io::duplex(64);
        tokio::io::AsyncWriteExt::write_all(&mut client, &(-1i32).to_be_bytes())
            .await
            .unwrap();
        drop(client);

        match read_frame(&mut server).await {
            Err(CodecError::InvalidLength(-1)) => {}
            other => panic!("expected InvalidLength, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn oversized_length_is_rejected() {
        let (mut client, mut server) = tokio::io::duplex(64);
        let huge = (MAX_FRAME_SIZE as i32) + 1;
        tokio::io::AsyncWriteExt::write_all(&mut client, &huge.to_be_bytes())
            .await
            .unwrap();
        drop(client);

        assert!(matches!(
            read_frame(&mut server).await,
            Err(CodecError::FrameTooLarge(_, _))
        ));
    }

    #[tokio::test]
    async fn truncated_payload_is_detected() {
        let (mut client, mut server) = tokio::io::duplex(64);
        tokio::io::AsyncWriteExt::write_all(&mut client, &100i32.to_be_bytes())
            .await
            .unwrap();
        tokio::io::AsyncWriteExt::write_all(&mut client, b"only a few bytes")
            .await
            .unwrap();
        drop(client);

        match read_frame(&mut server).await {
            Err(CodecError::Truncated { read, expected }) => {
                assert_eq!(read, 16);
                assert_eq!(expected, 100);
            }
            other => panic!("expected Truncated, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn oversized_write_is_rejected() {
        let (mut client, _server) = tokio::io::duplex(64);
        let payload = vec![0u8; MAX_FRAME_SIZE + 1];
        assert!(matches!(
            write_frame(&mut client, &payload).await,
            Err(CodecError::FrameTooLarge(_, _))
        ));
    }
}
