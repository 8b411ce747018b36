use std::net::{IpAddr, SocketAddr};

use anyhow::{anyhow, Context};
use bytes::{BufMut, BytesMut};
use log::debug;
use serde::Deserialize;
use tokio::net::UdpSocket;

use crate::led::led_color::Rgb;

/// Frames per panel in every packet; the controller takes exactly one.
const FRAMES_PER_PANEL: u8 = 1;

/// Where the controller listens for external-control packets, as returned
/// when the `extControl` display mode is requested.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StreamEndpoint {
    pub stream_control_ip_addr: String,
    pub stream_control_port: u16,
    #[serde(default)]
    pub stream_control_protocol: Option<String>,
}

impl StreamEndpoint {
    /// The endpoint as a socket address. IPv6 addresses may come with or without brackets.
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        let host = self
            .stream_control_ip_addr
            .trim_start_matches('[')
            .trim_end_matches(']');
        let ip: IpAddr = host.parse().with_context(|| {
            format!(
                "Invalid stream control address {}",
                self.stream_control_ip_addr
            )
        })?;
        Ok(SocketAddr::new(ip, self.stream_control_port))
    }
}

/// One panel's target color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelFrame {
    pub panel_id: u8,
    pub color: Rgb,
    pub white: u8,
    /// Fade time in tenths of a second.
    pub transition_time: u8,
}

impl PanelFrame {
    pub fn new(panel_id: u8, color: Rgb) -> Self {
        PanelFrame {
            panel_id,
            color,
            white: 0,
            transition_time: 1,
        }
    }

    fn put(&self, packet: &mut BytesMut) {
        packet.put_u8(self.panel_id);
        packet.put_u8(FRAMES_PER_PANEL);
        packet.put_u8(self.color.red);
        packet.put_u8(self.color.green);
        packet.put_u8(self.color.blue);
        packet.put_u8(self.white);
        packet.put_u8(self.transition_time);
    }
}

/// Per-panel color stream over UDP.
///
/// Frames can be sent one panel at a time with [`AuroraStream::panel_set`], or
/// queued with [`AuroraStream::panel_prepare`] and sent together with
/// [`AuroraStream::panel_strobe`] so they change at the same moment.
#[derive(Debug)]
pub struct AuroraStream {
    socket: UdpSocket,
    prepared: Vec<PanelFrame>,
}

impl AuroraStream {
    pub async fn connect(endpoint: &StreamEndpoint) -> anyhow::Result<Self> {
        Self::connect_to(endpoint.socket_addr()?).await
    }

    pub async fn connect_to(address: SocketAddr) -> anyhow::Result<Self> {
        let local: SocketAddr = if address.is_ipv4() {
            ([0, 0, 0, 0], 0).into()
        } else {
            ([0u16; 8], 0).into()
        };
        let socket = UdpSocket::bind(local).await?;
        socket.connect(address).await?;
        Ok(AuroraStream {
            socket,
            prepared: Vec::new(),
        })
    }

    /// Builds the datagram for a batch of frames: the panel count, then each frame.
    pub fn encode(frames: &[PanelFrame]) -> anyhow::Result<BytesMut> {
        let panel_count = u8::try_from(frames.len())
            .map_err(|_| anyhow!("Too many panels in one packet: {}", frames.len()))?;
        let mut packet = BytesMut::with_capacity(1 + frames.len() * 7);
        packet.put_u8(panel_count);
        for frame in frames {
            frame.put(&mut packet);
        }
        Ok(packet)
    }

    /// Sends a single panel's color immediately.
    pub async fn panel_set(&self, frame: PanelFrame) -> anyhow::Result<usize> {
        self.send(&[frame]).await
    }

    /// Queues a panel's color for the next [`AuroraStream::panel_strobe`].
    pub fn panel_prepare(&mut self, frame: PanelFrame) {
        self.prepared.push(frame);
    }

    pub fn prepared(&self) -> &[PanelFrame] {
        &self.prepared
    }

    /// Sends every queued frame in one datagram and clears the queue.
    pub async fn panel_strobe(&mut self) -> anyhow::Result<usize> {
        let frames = std::mem::take(&mut self.prepared);
        self.send(&frames).await
    }

    async fn send(&self, frames: &[PanelFrame]) -> anyhow::Result<usize> {
        let packet = Self::encode(frames)?;
        debug!("Sending {} panel frames", frames.len());
        self.socket
            .send(&packet)
            .await
            .with_context(|| format!("Failed to send {} panel frames", frames.len()))
    }
}
