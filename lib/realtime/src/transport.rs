//! Push transport abstraction and the WebSocket implementation.
//!
//! The channel talks to the transport through a pair of in-memory pipes:
//! outgoing frames go into a sender, incoming frames arrive on a receiver,
//! and end-of-stream on the incoming side means the link closed. This keeps
//! the connection manager testable without a live socket.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use std::fmt;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::protocol::Message;

/// An open link to the push endpoint.
#[derive(Debug)]
pub struct TransportLink {
    /// Outgoing text frames. Dropping this sender closes the link.
    pub outgoing: mpsc::UnboundedSender<String>,
    /// Incoming text frames. `None` means the link closed.
    pub incoming: mpsc::UnboundedReceiver<String>,
}

/// Errors from opening a transport link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The connection attempt failed.
    ConnectFailed { message: String },
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectFailed { message } => write!(f, "transport connect failed: {message}"),
        }
    }
}

impl std::error::Error for TransportError {}

/// A factory for links to the push endpoint.
///
/// The production implementation is [`WebSocketTransport`]; tests substitute
/// an in-memory transport.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Opens a new link, authenticating with the given bearer token.
    ///
    /// # Errors
    ///
    /// Returns an error if the link cannot be established.
    async fn open(&self, url: &str, token: &str) -> Result<TransportLink, TransportError>;
}

/// WebSocket transport to the push endpoint.
///
/// The token travels as a query parameter because browsers cannot set
/// headers on a WebSocket handshake; the native client keeps the same
/// contract.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketTransport;

impl WebSocketTransport {
    /// Creates the transport.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn open(&self, url: &str, token: &str) -> Result<TransportLink, TransportError> {
        let full_url = format!("{url}?token={}", urlencoding::encode(token));
        let (socket, _response) =
            connect_async(full_url.as_str())
                .await
                .map_err(|e| TransportError::ConnectFailed {
                    message: e.to_string(),
                })?;

        let (mut sink, mut stream) = socket.split();
        let (outgoing_tx, mut outgoing_rx) = mpsc::unbounded_channel::<String>();
        let (incoming_tx, incoming_rx) = mpsc::unbounded_channel::<String>();

        // Pump outgoing frames until the channel side drops its sender.
        tokio::spawn(async move {
            while let Some(text) = outgoing_rx.recv().await {
                if sink.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
            let _ = sink.close().await;
        });

        // Pump incoming text frames; dropping incoming_tx signals closure.
        tokio::spawn(async move {
            while let Some(item) = stream.next().await {
                match item {
                    Ok(Message::Text(text)) => {
                        if incoming_tx.send(text).is_err() {
                            break;
                        }
                    }
                    Ok(Message::Close(frame)) => {
                        tracing::debug!(?frame, "push socket closed by server");
                        break;
                    }
                    // Protocol-level ping/pong and binary frames are not
                    // part of the event contract.
                    Ok(_) => {}
                    Err(e) => {
                        tracing::warn!(error = %e, "push socket read error");
                        break;
                    }
                }
            }
        });

        Ok(TransportLink {
            outgoing: outgoing_tx,
            incoming: incoming_rx,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_error_display() {
        let err = TransportError::ConnectFailed {
            message: "refused".to_string(),
        };
        assert!(err.to_string().contains("refused"));
    }

    #[tokio::test]
    async fn link_closes_when_incoming_sender_drops() {
        let (_outgoing_tx, _outgoing_rx) = mpsc::unbounded_channel::<String>();
        let (incoming_tx, mut incoming_rx) = mpsc::unbounded_channel::<String>();

        incoming_tx.send("frame".to_string()).expect("send");
        drop(incoming_tx);

        assert_eq!(incoming_rx.recv().await.as_deref(), Some("frame"));
        assert!(incoming_rx.recv().await.is_none());
    }
}
