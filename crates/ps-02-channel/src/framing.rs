//! Frame boundaries for the supported source protocols.
//!
//! Framing is transport glue only; it knows nothing about envelopes or the
//! message codec. Both framings carry opaque byte frames.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::errors::ChannelError;

/// Maximum accepted frame size. Larger frames are rejected without reading
/// the body, bounding memory per connection.
pub const MAX_FRAME: usize = 64 * 1024;

/// Wire framing used by a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    /// Two-byte big-endian length prefix (ATM and POS concentrators).
    LengthPrefixed,
    /// Newline-delimited frames (e-commerce gateway bridge). Frame bodies
    /// must not contain `\n`; the envelope encoding guarantees that.
    NewlineDelimited,
}

impl Framing {
    /// Reads one frame. Returns `Ok(None)` on clean EOF at a frame
    /// boundary and `Err(ChannelError::Closed)` on EOF mid-frame.
    pub async fn read_frame<R>(self, reader: &mut R) -> Result<Option<Vec<u8>>, ChannelError>
    where
        R: AsyncRead + Unpin,
    {
        match self {
            Self::LengthPrefixed => {
                let mut prefix = [0u8; 2];
                match reader.read_exact(&mut prefix).await {
                    Ok(_) => {}
                    Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
                    Err(e) => return Err(e.into()),
                }
                let size = usize::from(u16::from_be_bytes(prefix));
                if size > MAX_FRAME {
                    return Err(ChannelError::FrameTooLarge { size, max: MAX_FRAME });
                }
                let mut frame = vec![0u8; size];
                reader
                    .read_exact(&mut frame)
                    .await
                    .map_err(|e| match e.kind() {
                        std::io::ErrorKind::UnexpectedEof => ChannelError::Closed,
                        _ => ChannelError::Io(e),
                    })?;
                Ok(Some(frame))
            }
            Self::NewlineDelimited => {
                let mut frame = Vec::new();
                let mut byte = [0u8; 1];
                loop {
                    match reader.read_exact(&mut byte).await {
                        Ok(_) => {}
                        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                            return if frame.is_empty() {
                                Ok(None)
                            } else {
                                Err(ChannelError::Closed)
                            };
                        }
                        Err(e) => return Err(e.into()),
                    }
                    if byte[0] == b'\n' {
                        return Ok(Some(frame));
                    }
                    if frame.len() >= MAX_FRAME {
                        return Err(ChannelError::FrameTooLarge {
                            size: frame.len() + 1,
                            max: MAX_FRAME,
                        });
                    }
                    frame.push(byte[0]);
                }
            }
        }
    }

    /// Writes one frame and flushes.
    pub async fn write_frame<W>(self, writer: &mut W, frame: &[u8]) -> Result<(), ChannelError>
    where
        W: AsyncWrite + Unpin,
    {
        if frame.len() > MAX_FRAME {
            return Err(ChannelError::FrameTooLarge {
                size: frame.len(),
                max: MAX_FRAME,
            });
        }
        match self {
            Self::LengthPrefixed => {
                writer.write_all(&(frame.len() as u16).to_be_bytes()).await?;
                writer.write_all(frame).await?;
            }
            Self::NewlineDelimited => {
                writer.write_all(frame).await?;
                writer.write_all(b"\n").await?;
            }
        }
        writer.flush().await?;
        Ok(())
    }
}
