//! Transport seam between the client and the adapter channel.
//!
//! Outbound frames go through a [`Transport`]. Inbound frames are fed to
//! [`DapClient::handle_frame`] by the host, in arrival order. For stream
//! adapters (stdio, TCP) [`pump_frames`] and [`write_frames`] do the
//! Content-Length framing on either side of a [`ChannelTransport`].

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

use crate::client::DapClient;
use crate::error::{DapError, DecodeError};
use crate::framing::{decode_frame, encode_frame};

/// Something that can carry one encoded text frame to the adapter.
///
/// `send` must not block and must preserve the order of calls.
pub trait Transport: Send + Sync {
    /// Hand a frame to the channel.
    fn send(&self, frame: String) -> Result<(), DapError>;
}

/// A [`Transport`] backed by an unbounded tokio channel.
#[derive(Debug, Clone)]
pub struct ChannelTransport {
    tx: mpsc::UnboundedSender<String>,
}

impl ChannelTransport {
    /// Create a transport and the receiver its frames arrive on.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Wrap an existing sender.
    pub fn new(tx: mpsc::UnboundedSender<String>) -> Self {
        Self { tx }
    }
}

impl Transport for ChannelTransport {
    fn send(&self, frame: String) -> Result<(), DapError> {
        self.tx
            .send(frame)
            .map_err(|_| DapError::Transport("channel closed".into()))
    }
}

/// Read Content-Length framed messages from `reader` and feed them to the
/// client until EOF or a read error, then report the close.
///
/// A frame with an unusable body is dropped. A bad header cannot be
/// resynchronised, so it ends the stream as well.
pub async fn pump_frames<R>(mut reader: R, client: DapClient)
where
    R: AsyncRead + Unpin,
{
    let mut buf: Vec<u8> = Vec::new();
    let mut chunk = [0u8; 8192];
    'read: loop {
        match reader.read(&mut chunk).await {
            Ok(0) => {
                if !buf.is_empty() {
                    tracing::debug!(bytes = buf.len(), "discarding partial frame at EOF");
                }
                break;
            }
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
            Err(e) => {
                client.handle_error(&format!("read failed: {e}"));
                break;
            }
        }

        loop {
            match decode_frame(&buf) {
                Ok((text, consumed)) => {
                    buf.drain(..consumed);
                    client.handle_frame(&text).await;
                }
                Err(DecodeError::Incomplete(_)) => break,
                Err(DecodeError::Body { reason, consumed }) => {
                    buf.drain(..consumed);
                    client.handle_error(&format!("dropping frame: {reason}"));
                }
                Err(e) => {
                    client.handle_error(&e.to_string());
                    break 'read;
                }
            }
        }
    }
    client.handle_close().await;
}

/// Frame and write every message from `rx` until the channel closes.
pub async fn write_frames<W>(
    mut writer: W,
    mut rx: mpsc::UnboundedReceiver<String>,
) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(frame) = rx.recv().await {
        writer.write_all(&encode_frame(&frame)).await?;
        writer.flush().await?;
    }
    Ok(())
}
