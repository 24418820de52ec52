//! Session coordinator
//!
//! A [`Session`] binds one signaling connection to one peer engine. Its task
//! is the only place session state is touched; everything else reaches it
//! through channels:
//!
//! ```text
//!   SignalingSource ──► offer / candidate ──► PeerEngine
//!                                                 │ handlers
//!                           EngineEvent channel ◄─┘
//!                                 │
//!          ┌──────────────────────┴───────────────────┐
//!   LocalCandidate ──► SignalWriter        Track ──► FramePipeline task (JoinSet)
//!                          ▲                               │
//!                          └──────── text results ─────────┘
//! ```
//!
//! When the signaling channel closes or fails, every pipeline is aborted and
//! the engine is closed.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};

use crate::codec::CodecKind;
use crate::debounce::ResultDebouncer;
use crate::error::{Result, SignalingError};
use crate::pipeline::{FramePipeline, PipelineConfig, StreamEnd, StreamReport, TrackKind, TrackSource};
use crate::signaling::{
    IceCandidateInit, SessionDescription, SignalMessage, SignalWriter, SignalingSink,
    SignalingSource,
};
use crate::stats::SessionStats;

use super::backend::Backend;
use super::context::SessionContext;
use super::engine::{EngineConfig, EngineEvent, PeerEngine};
use super::state::SessionState;

type TrackOf<B> = <<B as Backend>::Engine as PeerEngine>::Track;

/// One relay session
pub struct Session<B: Backend> {
    context: SessionContext,
    backend: Arc<B>,
    engine: B::Engine,
    config: PipelineConfig,
    state: SessionState,
    debouncer: Arc<ResultDebouncer>,
    events: mpsc::UnboundedReceiver<EngineEvent<TrackOf<B>>>,
    pipelines: JoinSet<StreamReport>,
}

impl<B: Backend> Session<B> {
    /// Create the session's engine and register its handlers
    pub async fn new(
        context: SessionContext,
        backend: Arc<B>,
        engine_config: &EngineConfig,
        config: PipelineConfig,
    ) -> Result<Self> {
        let engine = backend.create_engine(engine_config, &context).await?;

        let (event_tx, events) = mpsc::unbounded_channel::<EngineEvent<TrackOf<B>>>();
        let track_tx = event_tx.clone();
        engine.on_track(Box::new(move |track: TrackOf<B>| {
            let _ = track_tx.send(EngineEvent::Track(track));
        }));
        engine.on_ice_candidate(Box::new(move |candidate: Option<IceCandidateInit>| {
            if let Some(candidate) = candidate {
                let _ = event_tx.send(EngineEvent::LocalCandidate(candidate));
            }
        }));

        Ok(Self {
            state: SessionState::new(context.session_id),
            debouncer: Arc::new(ResultDebouncer::new(config.debounce_period)),
            context,
            backend,
            engine,
            config,
            events,
            pipelines: JoinSet::new(),
        })
    }

    /// Session context
    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    /// Drive the session until the signaling channel closes
    ///
    /// Returns the session counters, or the signaling error that ended it.
    /// Pipelines and the engine are shut down either way.
    pub async fn run<K, R>(mut self, sink: K, mut source: R) -> Result<SessionStats>
    where
        K: SignalingSink,
        R: SignalingSource,
    {
        let writer = SignalWriter::new(sink);
        tracing::info!(
            session_id = self.context.session_id,
            peer = %self.context.peer_addr,
            "Session started"
        );

        let result = loop {
            tokio::select! {
                inbound = source.receive() => match inbound {
                    Ok(Some(text)) => self.handle_message(&text, &writer).await,
                    Ok(None) => break Ok(()),
                    Err(e) => break Err(e),
                },
                Some(event) = self.events.recv() => self.handle_event(event, &writer).await,
                Some(joined) = self.pipelines.join_next(), if !self.pipelines.is_empty() => {
                    self.on_pipeline_finished(joined);
                }
            }
        };

        self.teardown(&writer).await;

        match result {
            Ok(()) => Ok(self.state.stats),
            Err(e) => {
                tracing::debug!(session_id = self.context.session_id, error = %e, "Signaling failed");
                Err(e.into())
            }
        }
    }

    async fn handle_message<K: SignalingSink>(&mut self, text: &str, writer: &SignalWriter<K>) {
        self.state.stats.messages_received += 1;

        let message = match SignalMessage::parse(text) {
            Ok(message) => message,
            Err(e) => {
                self.state.stats.messages_rejected += 1;
                tracing::warn!(session_id = self.context.session_id, error = %e, "Ignoring message");
                return;
            }
        };

        match message {
            SignalMessage::Offer(offer) => {
                if let Err(e) = self.negotiate(offer, writer).await {
                    tracing::warn!(session_id = self.context.session_id, error = %e, "Failed to handle offer");
                }
            }
            SignalMessage::Candidate(candidate) => {
                if let Err(e) = self.engine.add_ice_candidate(candidate).await {
                    tracing::warn!(session_id = self.context.session_id, error = %e, "Failed to add ICE candidate");
                }
            }
            other @ (SignalMessage::Answer(_) | SignalMessage::Text(_)) => {
                self.state.stats.messages_rejected += 1;
                let e = SignalingError::UnexpectedMessage(other.kind());
                tracing::warn!(session_id = self.context.session_id, error = %e, "Ignoring message");
            }
        }
    }

    async fn negotiate<K: SignalingSink>(
        &mut self,
        offer: SessionDescription,
        writer: &SignalWriter<K>,
    ) -> Result<()> {
        self.engine.set_remote_description(offer).await?;
        let answer = self.engine.create_answer().await?;
        self.engine.set_local_description(answer.clone()).await?;
        writer.send(&SignalMessage::Answer(answer)).await?;

        self.state.on_negotiated();
        tracing::info!(
            session_id = self.context.session_id,
            renegotiations = self.state.renegotiations,
            "Answer sent"
        );
        Ok(())
    }

    async fn handle_event<K: SignalingSink>(
        &mut self,
        event: EngineEvent<TrackOf<B>>,
        writer: &SignalWriter<K>,
    ) {
        match event {
            EngineEvent::LocalCandidate(candidate) => self.send_candidate(candidate, writer).await,
            EngineEvent::Track(track) => self.start_pipeline(track, writer),
        }
    }

    async fn send_candidate<K: SignalingSink>(
        &mut self,
        candidate: IceCandidateInit,
        writer: &SignalWriter<K>,
    ) {
        match writer.send(&SignalMessage::Candidate(candidate)).await {
            Ok(()) => self.state.stats.candidates_sent += 1,
            Err(e) => {
                tracing::warn!(session_id = self.context.session_id, error = %e, "Failed to send ICE candidate");
            }
        }
    }

    fn start_pipeline<K: SignalingSink>(&mut self, track: TrackOf<B>, writer: &SignalWriter<K>) {
        let session_id = self.context.session_id;
        tracing::info!(
            session_id = session_id,
            track = %track.id(),
            kind = %track.kind(),
            mime_type = %track.mime_type(),
            "Remote track"
        );

        if track.kind() == TrackKind::Audio {
            self.state.on_track_ignored();
            return;
        }

        let Some(codec) = CodecKind::from_mime_type(track.mime_type()) else {
            self.state.on_track_ignored();
            tracing::warn!(
                session_id = session_id,
                track = %track.id(),
                mime_type = %track.mime_type(),
                "Unsupported video codec, ignoring track"
            );
            return;
        };

        let decoder = match self.backend.create_decoder(codec) {
            Ok(decoder) => decoder,
            Err(e) => {
                self.state.on_track_ignored();
                tracing::warn!(session_id = session_id, codec = %codec, error = %e, "Failed to create decoder");
                return;
            }
        };

        let pipeline = FramePipeline::new(
            track,
            codec,
            decoder,
            self.backend.inference(),
            Arc::clone(&self.debouncer),
            writer.clone(),
            self.config.clone(),
        );
        self.pipelines.spawn(pipeline.run());
        self.state.on_stream_started();
    }

    fn on_pipeline_finished(&mut self, joined: std::result::Result<StreamReport, JoinError>) {
        let report = match joined {
            Ok(report) => report,
            Err(e) if e.is_cancelled() => return,
            Err(e) => {
                self.state.on_stream_ended();
                tracing::error!(session_id = self.context.session_id, error = %e, "Pipeline task panicked");
                return;
            }
        };

        self.state.on_stream_ended();
        if let Some(id) = report.stream_id {
            self.debouncer.remove(id);
        }
        let stream_id = report.stream_id.map(|id| id.to_string()).unwrap_or_default();
        match &report.end {
            StreamEnd::SourceClosed => tracing::info!(
                session_id = self.context.session_id,
                track = %report.track_id,
                stream_id = %stream_id,
                packets = report.stats.packets_received,
                frames = report.stats.frames_assembled,
                results = report.stats.results_sent,
                "Stream ended"
            ),
            StreamEnd::Failed(e) => tracing::warn!(
                session_id = self.context.session_id,
                track = %report.track_id,
                stream_id = %stream_id,
                packets = report.stats.packets_received,
                frames = report.stats.frames_assembled,
                error = %e,
                "Stream failed"
            ),
        }
    }

    async fn teardown<K: SignalingSink>(&mut self, writer: &SignalWriter<K>) {
        self.state.close();

        self.pipelines.abort_all();
        while let Some(joined) = self.pipelines.join_next().await {
            self.on_pipeline_finished(joined);
        }

        if let Err(e) = self.engine.close().await {
            tracing::warn!(session_id = self.context.session_id, error = %e, "Failed to close engine");
        }
        let _ = writer.close().await;

        self.state.mark_closed();
        tracing::info!(
            session_id = self.context.session_id,
            duration_ms = self.state.duration().as_millis() as u64,
            time_to_answer = ?self.state.time_to_answer(),
            streams = self.state.stats.streams_started,
            "Session closed"
        );
    }
}
