//! Frame dispatch pipeline
//!
//! One pipeline runs per inbound video track. Its read loop is the only
//! code touching the track's reassembler, so frames of a stream are
//! decoded, inferred and reported strictly in order, with at most one frame
//! in flight. Pipelines of different tracks run as independent tasks and only
//! meet at the shared debouncer and the session's signaling writer.

use std::sync::Arc;

use tokio::time::Instant;

use crate::codec::CodecKind;
use crate::debounce::ResultDebouncer;
use crate::error::{Error, Result, StreamError};
use crate::reassembly::{EncodedFrame, Reassembler, StreamId};
use crate::signaling::{SignalMessage, SignalWriter, SignalingSink};
use crate::stats::StreamStats;

use super::config::PipelineConfig;
use super::service::{DecodedFrame, FrameDecoder, InferenceClient};
use super::track::TrackSource;

/// Why a pipeline stopped
#[derive(Debug)]
pub enum StreamEnd {
    /// The track reported end of stream
    SourceClosed,
    /// A stream-terminal error occurred
    Failed(Error),
}

impl StreamEnd {
    pub fn is_failure(&self) -> bool {
        matches!(self, StreamEnd::Failed(_))
    }
}

/// Summary handed back to the session when a pipeline finishes
#[derive(Debug)]
pub struct StreamReport {
    /// Track the pipeline read from
    pub track_id: String,
    /// Stream id of the first packet seen, if any arrived
    pub stream_id: Option<StreamId>,
    pub end: StreamEnd,
    pub stats: StreamStats,
}

/// Per-track read loop: packets in, results out
pub struct FramePipeline<T, D, I, S> {
    track: T,
    reassembler: Reassembler,
    /// Lent to the blocking pool while a frame decodes
    decoder: Option<D>,
    inference: Arc<I>,
    debouncer: Arc<ResultDebouncer>,
    writer: SignalWriter<S>,
    config: PipelineConfig,
    stream_id: Option<StreamId>,
    stats: StreamStats,
}

impl<T, D, I, S> FramePipeline<T, D, I, S>
where
    T: TrackSource,
    D: FrameDecoder,
    I: InferenceClient,
    S: SignalingSink,
{
    /// Create a pipeline for a track whose codec has already been resolved
    pub fn new(
        track: T,
        codec: CodecKind,
        decoder: D,
        inference: Arc<I>,
        debouncer: Arc<ResultDebouncer>,
        writer: SignalWriter<S>,
        config: PipelineConfig,
    ) -> Self {
        let stats = StreamStats::new(track.id(), codec);
        Self {
            track,
            reassembler: Reassembler::new(codec, config.max_frame_size),
            decoder: Some(decoder),
            inference,
            debouncer,
            writer,
            config,
            stream_id: None,
            stats,
        }
    }

    /// Run until the track ends or a stream-terminal error occurs
    pub async fn run(mut self) -> StreamReport {
        tracing::info!(
            track = %self.stats.track_id,
            codec = %self.stats.codec,
            "Pipeline started"
        );

        let end = loop {
            let packet = match self.track.read_rtp().await {
                Ok(Some(packet)) => packet,
                Ok(None) => break StreamEnd::SourceClosed,
                Err(e) if e.is_stream_fatal() => break StreamEnd::Failed(e),
                Err(e) => {
                    self.stats.malformed_packets += 1;
                    tracing::warn!(track = %self.stats.track_id, error = %e, "Dropping packet");
                    continue;
                }
            };

            self.stats.packets_received += 1;
            self.stats.bytes_received += packet.payload.len() as u64;
            self.stream_id.get_or_insert(packet.stream_id());

            let frame = match self.reassembler.push(&packet) {
                Ok(Some(frame)) => frame,
                Ok(None) => continue,
                Err(e) if e.is_stream_fatal() => break StreamEnd::Failed(e),
                Err(e) => {
                    self.stats.malformed_packets += 1;
                    tracing::warn!(
                        stream_id = %packet.stream_id(),
                        seq = packet.sequence_number,
                        error = %e,
                        "Dropping malformed packet"
                    );
                    continue;
                }
            };

            if let Err(e) = self.dispatch(frame).await {
                break StreamEnd::Failed(e);
            }
        };

        self.stats.sequence_gaps = self.reassembler.sequence_gaps();

        match &end {
            StreamEnd::SourceClosed => tracing::info!(
                track = %self.stats.track_id,
                frames = self.stats.frames_assembled,
                results = self.stats.results_sent,
                "Pipeline finished"
            ),
            StreamEnd::Failed(e) => tracing::warn!(
                track = %self.stats.track_id,
                frames = self.stats.frames_assembled,
                error = %e,
                "Pipeline failed"
            ),
        }

        StreamReport {
            track_id: self.stats.track_id.clone(),
            stream_id: self.stream_id,
            end,
            stats: self.stats,
        }
    }

    /// Decode, infer and report one frame
    ///
    /// Returns an error only when the stream must end.
    async fn dispatch(&mut self, frame: EncodedFrame) -> Result<()> {
        if frame.is_empty() {
            self.stats.empty_frames += 1;
            tracing::debug!(stream_id = %frame.stream_id, "Empty frame, nothing to decode");
            return Ok(());
        }

        self.stats.frames_assembled += 1;
        if frame.is_keyframe() {
            self.stats.keyframes += 1;
        }

        let decoded = match self.decode(&frame).await? {
            Ok(decoded) => decoded,
            Err(e) => {
                self.stats.decode_failures += 1;
                tracing::warn!(
                    stream_id = %frame.stream_id,
                    timestamp = frame.timestamp,
                    size = frame.len(),
                    error = %e,
                    "Failed to decode frame"
                );
                return Ok(());
            }
        };
        self.stats.width = Some(decoded.width);
        self.stats.height = Some(decoded.height);

        let timeout = self.config.inference_timeout;
        let text = match tokio::time::timeout(timeout, self.inference.infer(&decoded, timeout)).await
        {
            Ok(Ok(text)) => text,
            Ok(Err(e @ Error::Stream(_))) => return Err(e),
            Ok(Err(e)) => return Err(StreamError::Inference(e.to_string()).into()),
            Err(_) => return Err(StreamError::InferenceTimeout(timeout).into()),
        };
        self.stats.inferences += 1;

        if self.config.is_ignored(&text) {
            self.stats.results_ignored += 1;
            return Ok(());
        }

        if !self
            .debouncer
            .accept(frame.stream_id, &text, Instant::now().into_std())
        {
            self.stats.results_suppressed += 1;
            tracing::debug!(stream_id = %frame.stream_id, result = %text, "Result debounced");
            return Ok(());
        }

        tracing::debug!(stream_id = %frame.stream_id, result = %text, "Sending result");
        match self.writer.send(&SignalMessage::text(text)).await {
            Ok(()) => self.stats.results_sent += 1,
            Err(e) => {
                tracing::warn!(stream_id = %frame.stream_id, error = %e, "Failed to send result");
            }
        }

        Ok(())
    }

    /// Run the decoder on the blocking pool
    ///
    /// The outer error means the decoder panicked and the stream must end;
    /// the inner one is the decoder's own verdict on the frame.
    async fn decode(&mut self, frame: &EncodedFrame) -> Result<Result<DecodedFrame>> {
        let mut decoder = self
            .decoder
            .take()
            .ok_or_else(|| StreamError::DecoderLost("decoder unavailable".into()))?;
        let frame = frame.clone();

        let (decoder, result) = tokio::task::spawn_blocking(move || {
            let result = decoder.decode(&frame);
            (decoder, result)
        })
        .await
        .map_err(|e| StreamError::DecoderLost(e.to_string()))?;

        self.decoder = Some(decoder);
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use bytes::Bytes;
    use tokio::sync::{mpsc, oneshot};
    use tokio_test::{assert_err, assert_ok};

    use super::*;
    use crate::pipeline::TrackKind;
    use crate::rtp::RtpPacket;

    const SSRC: u32 = 0x1234;

    /// Track replaying a fixed packet list, shared so tests can see what is left
    struct ScriptedTrack {
        packets: Arc<Mutex<VecDeque<RtpPacket>>>,
    }

    impl TrackSource for ScriptedTrack {
        fn id(&self) -> &str {
            "video0"
        }

        fn kind(&self) -> TrackKind {
            TrackKind::Video
        }

        fn mime_type(&self) -> &str {
            "video/VP8"
        }

        async fn read_rtp(&mut self) -> Result<Option<RtpPacket>> {
            Ok(self.packets.lock().unwrap().pop_front())
        }
    }

    /// Passes the bitstream through as pixels; frames starting with 0xBA fail
    struct PassthroughDecoder;

    impl FrameDecoder for PassthroughDecoder {
        fn decode(&mut self, frame: &EncodedFrame) -> Result<DecodedFrame> {
            if frame.data.first() == Some(&0xBA) {
                return Err(StreamError::DecodeFailed("corrupt frame".into()).into());
            }
            Ok(DecodedFrame {
                pixels: frame.data.clone(),
                width: 2,
                height: 2,
            })
        }
    }

    /// Reads the pixels back as the result text
    #[derive(Default)]
    struct EchoInference {
        calls: AtomicUsize,
    }

    impl InferenceClient for EchoInference {
        async fn infer(&self, frame: &DecodedFrame, _timeout: Duration) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(String::from_utf8_lossy(&frame.pixels).into_owned())
        }
    }

    /// Never answers in time
    #[derive(Default)]
    struct StalledInference {
        calls: AtomicUsize,
    }

    impl InferenceClient for StalledInference {
        async fn infer(&self, _frame: &DecodedFrame, _timeout: Duration) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok("late".into())
        }
    }

    struct FailingInference;

    impl InferenceClient for FailingInference {
        async fn infer(&self, _frame: &DecodedFrame, _timeout: Duration) -> Result<String> {
            Err(std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused").into())
        }
    }

    /// One-packet VP8 frame carrying `body`
    fn vp8_frame(seq: u16, body: &[u8]) -> RtpPacket {
        let mut payload = vec![0x10];
        payload.extend_from_slice(body);
        RtpPacket::new(SSRC, seq, true, Bytes::from(payload))
    }

    fn vp8_fragment(seq: u16, marker: bool, body: &[u8]) -> RtpPacket {
        let mut payload = vec![if seq == 0 { 0x10 } else { 0x00 }];
        payload.extend_from_slice(body);
        RtpPacket::new(SSRC, seq, marker, Bytes::from(payload))
    }

    struct Harness<I> {
        packets: Arc<Mutex<VecDeque<RtpPacket>>>,
        inference: Arc<I>,
        outbound: mpsc::UnboundedReceiver<String>,
        pipeline: FramePipeline<ScriptedTrack, PassthroughDecoder, I, mpsc::UnboundedSender<String>>,
    }

    fn harness<I: InferenceClient>(
        codec: CodecKind,
        packets: Vec<RtpPacket>,
        inference: I,
        config: PipelineConfig,
    ) -> Harness<I> {
        let packets = Arc::new(Mutex::new(VecDeque::from(packets)));
        let inference = Arc::new(inference);
        let (tx, outbound) = mpsc::unbounded_channel();
        let pipeline = FramePipeline::new(
            ScriptedTrack {
                packets: Arc::clone(&packets),
            },
            codec,
            PassthroughDecoder,
            Arc::clone(&inference),
            Arc::new(ResultDebouncer::new(config.debounce_period)),
            SignalWriter::new(tx),
            config,
        );
        Harness {
            packets,
            inference,
            outbound,
            pipeline,
        }
    }

    fn sent_texts(rx: &mut mpsc::UnboundedReceiver<String>) -> Vec<String> {
        let mut out = Vec::new();
        while let Ok(json) = rx.try_recv() {
            match SignalMessage::parse(&json).unwrap() {
                SignalMessage::Text(t) => out.push(t.message),
                other => panic!("unexpected message: {:?}", other),
            }
        }
        out
    }

    #[tokio::test(start_paused = true)]
    async fn test_results_forwarded_filtered_and_debounced() {
        let packets = vec![
            vp8_frame(0, b"cat"),
            vp8_frame(1, b"cat"),
            vp8_frame(2, b"result is None"),
            vp8_frame(3, b"dog"),
        ];
        let mut h = harness(CodecKind::Vp8, packets, EchoInference::default(), PipelineConfig::default());

        let report = h.pipeline.run().await;

        assert!(matches!(report.end, StreamEnd::SourceClosed));
        assert_eq!(report.track_id, "video0");
        assert_eq!(report.stream_id, Some(StreamId(SSRC)));
        assert_eq!(report.stats.frames_assembled, 4);
        assert_eq!(report.stats.results_sent, 2);
        assert_eq!(report.stats.results_suppressed, 1);
        assert_eq!(report.stats.results_ignored, 1);
        assert_eq!(h.inference.calls.load(Ordering::SeqCst), 4);
        assert_eq!(sent_texts(&mut h.outbound), vec!["cat", "dog"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeat_after_period_is_sent() {
        let packets = vec![vp8_frame(0, b"cat"), vp8_frame(1, b"cat")];
        let config = PipelineConfig::default().debounce_period(Duration::from_secs(2));
        let mut h = harness(CodecKind::Vp8, packets, EchoInference::default(), config);

        // Let the first frame through, then move the clock past the period
        let debouncer = Arc::clone(&h.pipeline.debouncer);
        let start = Instant::now().into_std();
        assert!(debouncer.accept(StreamId(SSRC), "cat", start));
        tokio::time::advance(Duration::from_secs(3)).await;

        let report = h.pipeline.run().await;

        assert_eq!(report.stats.results_sent, 1);
        assert_eq!(report.stats.results_suppressed, 1);
        assert_eq!(sent_texts(&mut h.outbound), vec!["cat"]);
    }

    #[tokio::test]
    async fn test_fragments_reassembled_before_dispatch() {
        let packets = vec![
            vp8_fragment(0, false, b"ze"),
            vp8_fragment(1, false, b"br"),
            vp8_fragment(2, true, b"a"),
        ];
        let mut h = harness(CodecKind::Vp8, packets, EchoInference::default(), PipelineConfig::default());

        let report = h.pipeline.run().await;

        assert_eq!(report.stats.packets_received, 3);
        assert_eq!(report.stats.frames_assembled, 1);
        assert_eq!(sent_texts(&mut h.outbound), vec!["zebra"]);
    }

    #[tokio::test]
    async fn test_decode_failure_then_recovery() {
        let packets = vec![vp8_frame(0, &[0xBA, 0xD0]), vp8_frame(1, b"cat")];
        let mut h = harness(CodecKind::Vp8, packets, EchoInference::default(), PipelineConfig::default());

        let report = h.pipeline.run().await;

        assert!(matches!(report.end, StreamEnd::SourceClosed));
        assert_eq!(report.stats.decode_failures, 1);
        assert_eq!(report.stats.frames_assembled, 2);
        assert_eq!(h.inference.calls.load(Ordering::SeqCst), 1);
        assert_eq!(sent_texts(&mut h.outbound), vec!["cat"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_inference_timeout_ends_stream() {
        let packets = vec![vp8_frame(0, b"cat"), vp8_frame(1, b"dog")];
        let config = PipelineConfig::default().inference_timeout(Duration::from_secs(3));
        let mut h = harness(CodecKind::Vp8, packets, StalledInference::default(), config);

        let report = h.pipeline.run().await;

        match report.end {
            StreamEnd::Failed(Error::Stream(StreamError::InferenceTimeout(d))) => {
                assert_eq!(d, Duration::from_secs(3));
            }
            other => panic!("unexpected end: {:?}", other),
        }
        assert_eq!(h.inference.calls.load(Ordering::SeqCst), 1);
        assert_eq!(h.packets.lock().unwrap().len(), 1);
        assert!(sent_texts(&mut h.outbound).is_empty());
    }

    #[tokio::test]
    async fn test_inference_error_ends_stream() {
        let packets = vec![vp8_frame(0, b"cat"), vp8_frame(1, b"dog")];
        let mut h = harness(CodecKind::Vp8, packets, FailingInference, PipelineConfig::default());

        let report = h.pipeline.run().await;

        assert!(report.end.is_failure());
        assert!(matches!(
            report.end,
            StreamEnd::Failed(Error::Stream(StreamError::Inference(_)))
        ));
        assert_eq!(h.packets.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_overflow_ends_stream() {
        let packets = vec![
            vp8_fragment(0, false, &[1, 2, 3]),
            vp8_fragment(1, false, &[4, 5, 6]),
            vp8_fragment(2, true, &[7]),
        ];
        let config = PipelineConfig::default().max_frame_size(4);
        let mut h = harness(CodecKind::Vp8, packets, EchoInference::default(), config);

        let report = h.pipeline.run().await;

        assert!(matches!(
            report.end,
            StreamEnd::Failed(Error::Stream(StreamError::BufferOverflow { limit: 4, .. }))
        ));
        assert_eq!(report.stats.frames_assembled, 0);
        assert_eq!(h.packets.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_malformed_packet_and_empty_frame_skipped() {
        let packets = vec![
            // FU-A end fragment with no start
            RtpPacket::new(SSRC, 0, false, Bytes::from_static(&[0x7C, 0x45, 0xBB])),
            // FU-A start closing the frame: nothing complete, fragment dropped
            RtpPacket::new(SSRC, 1, true, Bytes::from_static(&[0x7C, 0x85, 0xAA])),
            // Its end fragment arrives in the next frame and has nothing to finish
            RtpPacket::new(SSRC, 2, false, Bytes::from_static(&[0x7C, 0x45, 0xBB])),
            RtpPacket::new(SSRC, 3, true, Bytes::from_static(&[0x41, 0x01])),
            // A whole IDR slice
            RtpPacket::new(SSRC, 4, true, Bytes::from_static(&[0x65, 0x88])),
        ];
        let mut h = harness(CodecKind::H264, packets, EchoInference::default(), PipelineConfig::default());

        let report = h.pipeline.run().await;

        assert!(matches!(report.end, StreamEnd::SourceClosed));
        assert_eq!(report.stats.malformed_packets, 2);
        assert_eq!(report.stats.empty_frames, 1);
        assert_eq!(report.stats.frames_assembled, 2);
        assert_eq!(report.stats.keyframes, 1);

        let texts = sent_texts(&mut h.outbound);
        assert_eq!(texts.len(), 2);
        assert_eq!(texts[0].as_bytes(), &[0, 0, 0, 1, 0x41, 0x01]);
    }

    /// Blocks its thread for a while, like a software decoder on a large frame
    struct SlowDecoder {
        started: Option<oneshot::Sender<()>>,
        done: Arc<AtomicBool>,
    }

    impl FrameDecoder for SlowDecoder {
        fn decode(&mut self, frame: &EncodedFrame) -> Result<DecodedFrame> {
            if let Some(started) = self.started.take() {
                let _ = started.send(());
            }
            std::thread::sleep(Duration::from_millis(300));
            self.done.store(true, Ordering::SeqCst);
            Ok(DecodedFrame {
                pixels: frame.data.clone(),
                width: 4,
                height: 4,
            })
        }
    }

    struct PanickingDecoder;

    impl FrameDecoder for PanickingDecoder {
        fn decode(&mut self, _frame: &EncodedFrame) -> Result<DecodedFrame> {
            panic!("decoder crashed");
        }
    }

    #[tokio::test]
    async fn test_slow_decode_does_not_stall_other_pipelines() {
        let done = Arc::new(AtomicBool::new(false));
        let (started_tx, started_rx) = oneshot::channel();
        let (slow_tx, mut slow_rx) = mpsc::unbounded_channel();
        let slow = FramePipeline::new(
            ScriptedTrack {
                packets: Arc::new(Mutex::new(VecDeque::from(vec![vp8_frame(0, b"slow")]))),
            },
            CodecKind::Vp8,
            SlowDecoder {
                started: Some(started_tx),
                done: Arc::clone(&done),
            },
            Arc::new(EchoInference::default()),
            Arc::new(ResultDebouncer::new(Duration::from_secs(2))),
            SignalWriter::new(slow_tx),
            PipelineConfig::default(),
        );
        let slow = tokio::spawn(slow.run());
        started_rx.await.unwrap();

        let mut h = harness(
            CodecKind::Vp8,
            vec![vp8_frame(0, b"fast")],
            EchoInference::default(),
            PipelineConfig::default(),
        );
        let fast = tokio::spawn(h.pipeline.run());

        let json = tokio::time::timeout(Duration::from_secs(5), h.outbound.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(SignalMessage::parse(&json), Ok(SignalMessage::Text(t)) if t.message == "fast"));
        assert!(!done.load(Ordering::SeqCst));

        assert_ok!(fast.await);
        let report = slow.await.unwrap();
        assert!(done.load(Ordering::SeqCst));
        assert_eq!(report.stats.results_sent, 1);
        assert_eq!(sent_texts(&mut slow_rx), vec!["slow"]);
    }

    #[tokio::test]
    async fn test_decoder_panic_ends_stream() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let pipeline = FramePipeline::new(
            ScriptedTrack {
                packets: Arc::new(Mutex::new(VecDeque::from(vec![vp8_frame(0, b"a"), vp8_frame(1, b"b")]))),
            },
            CodecKind::Vp8,
            PanickingDecoder,
            Arc::new(EchoInference::default()),
            Arc::new(ResultDebouncer::new(Duration::from_secs(2))),
            SignalWriter::new(tx),
            PipelineConfig::default(),
        );

        let report = pipeline.run().await;

        assert!(matches!(
            report.end,
            StreamEnd::Failed(Error::Stream(StreamError::DecoderLost(_)))
        ));
        assert_eq!(report.stats.frames_assembled, 1);
        assert_eq!(report.stats.decode_failures, 0);
    }

    #[test]
    fn test_passthrough_decoder() {
        let frame = EncodedFrame {
            stream_id: StreamId(SSRC),
            codec: CodecKind::Vp8,
            timestamp: 0,
            packet_count: 1,
            data: Bytes::from_static(b"ok"),
        };
        let decoded = assert_ok!(PassthroughDecoder.decode(&frame));
        assert_eq!(decoded.width, 2);

        let bad = EncodedFrame {
            data: Bytes::from_static(&[0xBA]),
            ..frame
        };
        assert_err!(PassthroughDecoder.decode(&bad));
    }
}
