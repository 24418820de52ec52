//! UDP track source
//!
//! Reads plain RTP datagrams from a UDP socket. Useful for feeding the
//! pipeline from `ffmpeg -f rtp` or GStreamer `udpsink` without a full
//! peer connection in front of it.

use std::net::SocketAddr;

use bytes::Bytes;
use tokio::net::UdpSocket;

use crate::error::Result;
use crate::pipeline::{TrackKind, TrackSource};

use super::packet::RtpPacket;

/// Largest datagram we expect on a typical MTU
const MAX_DATAGRAM_SIZE: usize = 1500;

/// Video track read from a UDP socket
pub struct UdpTrack {
    id: String,
    mime_type: String,
    socket: UdpSocket,
    buf: Vec<u8>,
}

impl UdpTrack {
    /// Bind a socket and read RTP carrying the given MIME type (e.g. `video/VP8`)
    pub async fn bind(addr: SocketAddr, mime_type: impl Into<String>) -> Result<Self> {
        let socket = UdpSocket::bind(addr).await?;
        let local = socket.local_addr()?;
        Ok(Self::from_socket(socket, format!("udp:{}", local), mime_type))
    }

    /// Wrap an already-bound socket
    pub fn from_socket(socket: UdpSocket, id: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            mime_type: mime_type.into(),
            socket,
            buf: vec![0u8; MAX_DATAGRAM_SIZE],
        }
    }

    /// Local address of the socket
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }
}

impl TrackSource for UdpTrack {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> TrackKind {
        TrackKind::Video
    }

    fn mime_type(&self) -> &str {
        &self.mime_type
    }

    async fn read_rtp(&mut self) -> Result<Option<RtpPacket>> {
        loop {
            let (len, peer) = self.socket.recv_from(&mut self.buf).await?;
            match RtpPacket::parse(Bytes::copy_from_slice(&self.buf[..len])) {
                Ok(packet) => return Ok(Some(packet)),
                Err(e) => {
                    tracing::warn!(track = %self.id, peer = %peer, error = %e, "Dropping non-RTP datagram");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_reads_rtp_and_skips_garbage() {
        let mut track = UdpTrack::bind("127.0.0.1:0".parse().unwrap(), "video/VP8")
            .await
            .unwrap();
        let target = track.local_addr().unwrap();

        let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        sender.send_to(&[0x01, 0x02], target).await.unwrap();
        sender
            .send_to(
                &[0x80, 0xE0, 0x00, 0x05, 0, 0, 0, 1, 0, 0, 0, 9, 0x10, 0xAA],
                target,
            )
            .await
            .unwrap();

        let packet = track.read_rtp().await.unwrap().unwrap();
        assert_eq!(packet.ssrc, 9);
        assert_eq!(packet.sequence_number, 5);
        assert!(packet.marker);
        assert_eq!(&packet.payload[..], &[0x10, 0xAA]);
        assert_eq!(track.mime_type(), "video/VP8");
        assert_eq!(track.kind(), TrackKind::Video);
    }
}
