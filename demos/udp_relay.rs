//! Run one dispatch pipeline over plain RTP received on UDP
//!
//! Run with: cargo run --example udp_relay [BIND_ADDR] [MIME_TYPE]
//!
//! Examples:
//!   cargo run --example udp_relay                              # 127.0.0.1:5004, video/VP8
//!   cargo run --example udp_relay 0.0.0.0:5004 video/H264
//!
//! Feed it with ffmpeg:
//!   ffmpeg -re -i input.mp4 -an -c:v libvpx -f rtp rtp://127.0.0.1:5004
//!   ffmpeg -re -i input.mp4 -an -c:v libx264 -bsf:v h264_mp4toannexb -f rtp rtp://127.0.0.1:5004
//!
//! There is no pixel decoder or inference service here: the "decoder" passes
//! the bitstream through and the "inference" reports whether the frame was a
//! keyframe. Results go through the real ignore list and debouncer and are
//! printed as the JSON `text` messages a client would receive.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use rtp_relay::codec::{self, CodecKind};
use rtp_relay::debounce::ResultDebouncer;
use rtp_relay::error::Result;
use rtp_relay::pipeline::{
    DecodedFrame, FrameDecoder, FramePipeline, InferenceClient, PipelineConfig, StreamEnd,
};
use rtp_relay::reassembly::EncodedFrame;
use rtp_relay::rtp::UdpTrack;
use rtp_relay::signaling::SignalWriter;
use tokio::sync::mpsc;

/// Passes the encoded bitstream through, remembering the codec
struct BitstreamDecoder {
    codec: CodecKind,
}

impl FrameDecoder for BitstreamDecoder {
    fn decode(&mut self, frame: &EncodedFrame) -> Result<DecodedFrame> {
        tracing::debug!(
            codec = %self.codec,
            size = frame.len(),
            packets = frame.packet_count,
            "Frame assembled"
        );
        Ok(DecodedFrame {
            pixels: frame.data.clone(),
            width: 0,
            height: 0,
        })
    }
}

/// Labels keyframes; everything else is "no result"
struct KeyframeLabeler {
    codec: CodecKind,
}

impl InferenceClient for KeyframeLabeler {
    async fn infer(&self, frame: &DecodedFrame, _timeout: Duration) -> Result<String> {
        if codec::is_keyframe(self.codec, &frame.pixels) {
            Ok(format!("keyframe ({} bytes)", frame.pixels.len()))
        } else {
            Ok(rtp_relay::pipeline::NO_RESULT_TEXT.to_string())
        }
    }
}

fn print_usage() {
    eprintln!("Usage: udp_relay [BIND_ADDR] [MIME_TYPE]");
    eprintln!("  MIME_TYPE is one of video/VP8, video/VP9, video/H264, video/H265");
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();

    let bind_addr: SocketAddr = match args.get(1) {
        Some(addr) => addr.parse()?,
        None => "127.0.0.1:5004".parse()?,
    };
    let mime_type = args.get(2).cloned().unwrap_or_else(|| "video/VP8".to_string());
    let Some(codec) = CodecKind::from_mime_type(&mime_type) else {
        eprintln!("Error: unsupported codec {}", mime_type);
        print_usage();
        std::process::exit(1);
    };

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("rtp_relay=info".parse()?)
                .add_directive("udp_relay=debug".parse()?),
        )
        .init();

    let track = UdpTrack::bind(bind_addr, mime_type).await?;
    println!("Listening for {} RTP on {}", codec, track.local_addr()?);

    let config = PipelineConfig::default();
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let pipeline = FramePipeline::new(
        track,
        codec,
        BitstreamDecoder { codec },
        Arc::new(KeyframeLabeler { codec }),
        Arc::new(ResultDebouncer::new(config.debounce_period)),
        SignalWriter::new(tx),
        config,
    );

    let printer = tokio::spawn(async move {
        while let Some(json) = rx.recv().await {
            println!("{}", json);
        }
    });

    tokio::select! {
        report = pipeline.run() => {
            if let StreamEnd::Failed(e) = &report.end {
                eprintln!("Stream failed: {}", e);
            }
            println!("{:#?}", report.stats);
        }
        _ = tokio::signal::ctrl_c() => {
            println!("\nShutting down...");
        }
    }

    printer.abort();
    Ok(())
}
