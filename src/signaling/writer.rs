//! Serialized outbound writer
//!
//! Pipelines, the coordinator and engine callbacks all write to the same
//! signaling sink. The writer holds the sink behind one async mutex so that
//! whole messages never interleave.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::error::SignalingError;

use super::channel::SignalingSink;
use super::message::SignalMessage;

/// Cloneable handle to a session's outbound signaling sink
pub struct SignalWriter<S> {
    sink: Arc<Mutex<S>>,
}

impl<S> Clone for SignalWriter<S> {
    fn clone(&self) -> Self {
        Self {
            sink: Arc::clone(&self.sink),
        }
    }
}

impl<S: SignalingSink> SignalWriter<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink: Arc::new(Mutex::new(sink)),
        }
    }

    /// Serialize and send one message
    pub async fn send(&self, message: &SignalMessage) -> Result<(), SignalingError> {
        let json = message.to_json()?;
        let mut sink = self.sink.lock().await;
        sink.send(json).await
    }

    /// Close the underlying sink
    pub async fn close(&self) -> Result<(), SignalingError> {
        self.sink.lock().await.close().await
    }
}
