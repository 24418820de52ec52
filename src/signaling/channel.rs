//! Signaling transport
//!
//! The session only needs a duplex text channel: a sink it can write JSON
//! to and a source it can read JSON from. Implementations are provided for
//! the two halves of a split WebSocket and for tokio unbounded channels
//! (handy for embedding and tests).

use std::future::Future;

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

use crate::error::SignalingError;

/// Outbound half of a signaling channel
pub trait SignalingSink: Send + 'static {
    /// Send one text message
    fn send(&mut self, text: String) -> impl Future<Output = Result<(), SignalingError>> + Send;

    /// Close the channel
    fn close(&mut self) -> impl Future<Output = Result<(), SignalingError>> + Send;
}

/// Inbound half of a signaling channel
pub trait SignalingSource: Send + 'static {
    /// Wait for the next text message
    ///
    /// Returns `Ok(None)` once the peer has closed the channel. Must be
    /// cancel-safe: the session polls it inside `tokio::select!`.
    fn receive(&mut self) -> impl Future<Output = Result<Option<String>, SignalingError>> + Send;
}

impl<S> SignalingSink for SplitSink<WebSocketStream<S>, Message>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    async fn send(&mut self, text: String) -> Result<(), SignalingError> {
        SinkExt::send(self, Message::Text(text)).await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), SignalingError> {
        SinkExt::close(self).await?;
        Ok(())
    }
}

impl<S> SignalingSource for SplitStream<WebSocketStream<S>>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    async fn receive(&mut self) -> Result<Option<String>, SignalingError> {
        while let Some(msg) = self.next().await {
            match msg? {
                Message::Text(text) => return Ok(Some(text)),
                Message::Binary(data) => match String::from_utf8(data) {
                    Ok(text) => return Ok(Some(text)),
                    Err(_) => {
                        tracing::warn!("Ignoring non-UTF-8 binary signaling frame");
                    }
                },
                Message::Close(frame) => {
                    tracing::debug!(frame = ?frame, "Signaling close frame received");
                    return Ok(None);
                }
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {}
            }
        }
        Ok(None)
    }
}

impl SignalingSink for mpsc::UnboundedSender<String> {
    async fn send(&mut self, text: String) -> Result<(), SignalingError> {
        mpsc::UnboundedSender::send(self, text).map_err(|_| SignalingError::Closed)
    }

    async fn close(&mut self) -> Result<(), SignalingError> {
        Ok(())
    }
}

impl SignalingSource for mpsc::UnboundedReceiver<String> {
    async fn receive(&mut self) -> Result<Option<String>, SignalingError> {
        Ok(self.recv().await)
    }
}
