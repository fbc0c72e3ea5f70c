//! SNTP-disciplined wall clock
//!
//! Counts seconds since the device epoch (2000-01-01). Until the first
//! successful sync that is just uptime; afterwards it is the server time
//! plus the uptime elapsed since the reply arrived.

use aeris_core::traits::{Clock, ClockError, EPOCH_OFFSET_SECS};
use aeris_protocol::sntp::{self, NTP_PORT, PACKET_LEN};
use defmt::{debug, info};
use embassy_net::dns::DnsQueryType;
use embassy_net::udp::{PacketMetadata, UdpSocket};
use embassy_net::Stack;
use embassy_time::{with_timeout, Duration, Instant};

const REPLY_TIMEOUT: Duration = Duration::from_secs(5);

pub struct SntpClock {
    stack: Stack<'static>,
    server: &'static str,
    /// Device-epoch seconds at `synced_at`
    base_secs: u64,
    synced_at: Instant,
}

impl SntpClock {
    pub fn new(stack: Stack<'static>, server: &'static str) -> Self {
        Self {
            stack,
            server,
            base_secs: 0,
            synced_at: Instant::from_ticks(0),
        }
    }

    async fn query(&self) -> Result<u64, ClockError> {
        let addrs = self
            .stack
            .dns_query(self.server, DnsQueryType::A)
            .await
            .map_err(|_| ClockError::Unreachable)?;
        let server = *addrs.first().ok_or(ClockError::Unreachable)?;

        let mut rx_meta = [PacketMetadata::EMPTY; 1];
        let mut tx_meta = [PacketMetadata::EMPTY; 1];
        let mut rx_buffer = [0u8; PACKET_LEN * 2];
        let mut tx_buffer = [0u8; PACKET_LEN];
        let mut socket = UdpSocket::new(
            self.stack,
            &mut rx_meta,
            &mut rx_buffer,
            &mut tx_meta,
            &mut tx_buffer,
        );
        socket.bind(0).map_err(|_| ClockError::Unreachable)?;

        socket
            .send_to(&sntp::request(), (server, NTP_PORT))
            .await
            .map_err(|_| ClockError::Unreachable)?;

        let mut reply = [0u8; PACKET_LEN];
        let (len, _) = with_timeout(REPLY_TIMEOUT, socket.recv_from(&mut reply))
            .await
            .map_err(|_| ClockError::Timeout)?
            .map_err(|_| ClockError::InvalidResponse)?;

        sntp::parse_response(&reply[..len]).map_err(|e| {
            debug!("rejected SNTP reply: {}", e);
            ClockError::InvalidResponse
        })
    }
}

impl Clock for SntpClock {
    fn now(&self) -> u64 {
        let elapsed = Instant::now().saturating_duration_since(self.synced_at);
        self.base_secs.saturating_add(elapsed.as_secs())
    }

    async fn sync(&mut self) -> Result<(), ClockError> {
        let unix = self.query().await?;
        self.synced_at = Instant::now();
        self.base_secs = unix.saturating_sub(EPOCH_OFFSET_SECS);
        info!("clock synced to unix {}", unix);
        Ok(())
    }
}
