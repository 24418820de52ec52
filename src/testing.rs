//! Test doubles for the session and server tests

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;

use crate::codec::CodecKind;
use crate::error::{EngineError, Result};
use crate::pipeline::{DecodedFrame, FrameDecoder, InferenceClient, TrackKind, TrackSource};
use crate::reassembly::EncodedFrame;
use crate::rtp::RtpPacket;
use crate::session::{
    Backend, CandidateHandler, EngineConfig, PeerEngine, SessionContext, TrackHandler,
};
use crate::signaling::{IceCandidateInit, SessionDescription};

pub(crate) const ANSWER_SDP: &str = "v=0\r\no=- 0 0 IN IP4 127.0.0.1\r\n";

/// Track fed from an unbounded channel; ends when the sender is dropped
pub(crate) struct ChannelTrack {
    id: String,
    kind: TrackKind,
    mime_type: String,
    rx: mpsc::UnboundedReceiver<RtpPacket>,
}

impl ChannelTrack {
    pub(crate) fn new(
        id: &str,
        kind: TrackKind,
        mime_type: &str,
    ) -> (Self, mpsc::UnboundedSender<RtpPacket>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let track = Self {
            id: id.to_string(),
            kind,
            mime_type: mime_type.to_string(),
            rx,
        };
        (track, tx)
    }
}

impl TrackSource for ChannelTrack {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> TrackKind {
        self.kind
    }

    fn mime_type(&self) -> &str {
        &self.mime_type
    }

    async fn read_rtp(&mut self) -> Result<Option<RtpPacket>> {
        Ok(self.rx.recv().await)
    }
}

/// Hands the bitstream through as pixels
pub(crate) struct PassthroughDecoder;

impl FrameDecoder for PassthroughDecoder {
    fn decode(&mut self, frame: &EncodedFrame) -> Result<DecodedFrame> {
        Ok(DecodedFrame {
            pixels: frame.data.clone(),
            width: 1,
            height: 1,
        })
    }
}

/// Reads the pixels back as the result text
pub(crate) struct EchoInference;

impl InferenceClient for EchoInference {
    async fn infer(&self, frame: &DecodedFrame, _timeout: Duration) -> Result<String> {
        Ok(String::from_utf8_lossy(&frame.pixels).into_owned())
    }
}

/// Shared view into the mock engine: registered handlers and recorded calls
#[derive(Default)]
pub(crate) struct EngineProbe {
    track_handler: Mutex<Option<TrackHandler<ChannelTrack>>>,
    candidate_handler: Mutex<Option<CandidateHandler>>,
    pub(crate) remote: Mutex<Option<SessionDescription>>,
    pub(crate) local: Mutex<Option<SessionDescription>>,
    pub(crate) candidates: Mutex<Vec<IceCandidateInit>>,
    pub(crate) closed: AtomicBool,
    pub(crate) reject_offers: AtomicBool,
}

impl EngineProbe {
    pub(crate) fn emit_track(&self, track: ChannelTrack) {
        if let Some(handler) = self.track_handler.lock().unwrap().as_ref() {
            handler(track);
        }
    }

    pub(crate) fn emit_candidate(&self, candidate: Option<IceCandidateInit>) {
        if let Some(handler) = self.candidate_handler.lock().unwrap().as_ref() {
            handler(candidate);
        }
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

pub(crate) struct MockEngine {
    probe: Arc<EngineProbe>,
}

impl PeerEngine for MockEngine {
    type Track = ChannelTrack;

    async fn set_remote_description(
        &self,
        offer: SessionDescription,
    ) -> std::result::Result<(), EngineError> {
        if self.probe.reject_offers.load(Ordering::SeqCst) {
            return Err(EngineError::RemoteDescription("malformed SDP".into()));
        }
        *self.probe.remote.lock().unwrap() = Some(offer);
        Ok(())
    }

    async fn create_answer(&self) -> std::result::Result<SessionDescription, EngineError> {
        Ok(SessionDescription::answer(ANSWER_SDP))
    }

    async fn set_local_description(
        &self,
        answer: SessionDescription,
    ) -> std::result::Result<(), EngineError> {
        *self.probe.local.lock().unwrap() = Some(answer);
        Ok(())
    }

    async fn add_ice_candidate(
        &self,
        candidate: IceCandidateInit,
    ) -> std::result::Result<(), EngineError> {
        self.probe.candidates.lock().unwrap().push(candidate);
        Ok(())
    }

    async fn close(&self) -> std::result::Result<(), EngineError> {
        self.probe.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn on_ice_candidate(&self, handler: CandidateHandler) {
        *self.probe.candidate_handler.lock().unwrap() = Some(handler);
    }

    fn on_track(&self, handler: TrackHandler<ChannelTrack>) {
        *self.probe.track_handler.lock().unwrap() = Some(handler);
    }
}

#[derive(Default)]
pub(crate) struct MockBackend {
    pub(crate) probe: Arc<EngineProbe>,
}

impl Backend for MockBackend {
    type Engine = MockEngine;
    type Decoder = PassthroughDecoder;
    type Inference = EchoInference;

    async fn create_engine(
        &self,
        _config: &EngineConfig,
        _ctx: &SessionContext,
    ) -> Result<MockEngine> {
        Ok(MockEngine {
            probe: Arc::clone(&self.probe),
        })
    }

    fn create_decoder(&self, _codec: CodecKind) -> Result<PassthroughDecoder> {
        Ok(PassthroughDecoder)
    }

    fn inference(&self) -> Arc<EchoInference> {
        Arc::new(EchoInference)
    }
}

/// One-packet VP8 frame carrying `body`
pub(crate) fn vp8_frame(ssrc: u32, seq: u16, body: &[u8]) -> RtpPacket {
    let mut payload = vec![0x10];
    payload.extend_from_slice(body);
    RtpPacket::new(ssrc, seq, true, bytes::Bytes::from(payload))
}
