//! Byte stream handed to the MQTT client
//!
//! [`Wire`] adapts a [`Transport`] to `embedded-io-async`. On the read side
//! it tracks MQTT packet boundaries through [`Framer`]: a packet whose
//! size exceeds the client's buffers is drained from the transport and
//! replaced by an empty PINGRESP, so the client never sees it and the
//! stream stays in sync.
//!
//! On the write side the CONNECT is rewritten to keep the broker session
//! (see [`persistent_connect`]); `rust-mqtt` always asks for a clean start.

use embedded_io_async::{ErrorType, Read, ReadReady, Write};

use crate::traits::{Transport, TransportError};

/// Header byte plus up to four remaining-length bytes
const MAX_HEADER_LEN: usize = 5;

/// Stand-in for a dropped packet
const PINGRESP: [u8; 2] = [0xD0, 0x00];

const DRAIN_CHUNK_LEN: usize = 64;

/// Room for a rewritten CONNECT
const CONNECT_BUFFER_LEN: usize = 256;

/// Protocol name, level, connect flags and keepalive
const CONNECT_HEADER_LEN: usize = 10;
const PROTOCOL_LEVEL_AT: usize = 6;
const CONNECT_FLAGS_AT: usize = 7;
const CLEAN_START: u8 = 0x02;
const SESSION_EXPIRY_INTERVAL: u8 = 0x11;

/// Decode a variable byte integer, returning its value and encoded length
fn read_varint(bytes: &[u8]) -> Option<(usize, usize)> {
    let mut value = 0usize;
    for (i, byte) in bytes.iter().take(4).enumerate() {
        value |= usize::from(byte & 0x7F) << (7 * i);
        if byte & 0x80 == 0 {
            return Some((value, i + 1));
        }
    }
    None
}

fn write_varint(mut value: usize, out: &mut [u8; 4]) -> Option<usize> {
    for (i, slot) in out.iter_mut().enumerate() {
        let mut byte = (value % 128) as u8;
        value /= 128;
        if value > 0 {
            byte |= 0x80;
        }
        *slot = byte;
        if value == 0 {
            return Some(i + 1);
        }
    }
    None
}

/// Turn an MQTT 5 CONNECT into one that resumes and keeps the session
///
/// Clears Clean Start and prepends a Session Expiry Interval property of
/// `expiry_secs`. Returns the rewritten length in `out`, or `None` when
/// `packet` is not a complete MQTT 5 CONNECT or the result does not fit.
pub fn persistent_connect(packet: &[u8], expiry_secs: u32, out: &mut [u8]) -> Option<usize> {
    if packet.first() != Some(&0x10) {
        return None;
    }
    let (remaining, remaining_len) = read_varint(packet.get(1..)?)?;
    let body = packet.get(1 + remaining_len..1 + remaining_len + remaining)?;
    let header = body.get(..CONNECT_HEADER_LEN)?;
    if header[PROTOCOL_LEVEL_AT] != 5 {
        return None;
    }
    let (props_len, props_len_len) = read_varint(body.get(CONNECT_HEADER_LEN..)?)?;
    let rest = body.get(CONNECT_HEADER_LEN + props_len_len..)?;

    let expiry = expiry_secs.to_be_bytes();
    let property = [SESSION_EXPIRY_INTERVAL, expiry[0], expiry[1], expiry[2], expiry[3]];
    let mut props_len_bytes = [0u8; 4];
    let n = write_varint(props_len + property.len(), &mut props_len_bytes)?;
    let new_props_len = &props_len_bytes[..n];
    let new_remaining = CONNECT_HEADER_LEN + new_props_len.len() + property.len() + rest.len();
    let mut remaining_bytes = [0u8; 4];
    let n = write_varint(new_remaining, &mut remaining_bytes)?;
    let new_remaining_len = &remaining_bytes[..n];

    let total = 1 + new_remaining_len.len() + new_remaining;
    let out = out.get_mut(..total)?;
    let mut at = 0;
    for part in [&[0x10][..], new_remaining_len, header, new_props_len, &property[..], rest] {
        out[at..at + part.len()].copy_from_slice(part);
        at += part.len();
    }
    out[1 + new_remaining_len.len() + CONNECT_FLAGS_AT] &= !CLEAN_START;
    Some(total)
}

/// Read-side packet tracking, kept across client instances
#[derive(Debug)]
pub struct Framer {
    /// Largest packet (header included) passed through
    limit: usize,
    header: [u8; MAX_HEADER_LEN],
    header_len: usize,
    header_served: usize,
    body_left: usize,
    dropped: u32,
    last_error: Option<TransportError>,
}

impl Framer {
    pub const fn new(limit: usize) -> Self {
        Self {
            limit,
            header: [0; MAX_HEADER_LEN],
            header_len: 0,
            header_served: 0,
            body_left: 0,
            dropped: 0,
            last_error: None,
        }
    }

    /// Forget any half-read packet, e.g. after reopening the transport
    pub fn reset(&mut self) {
        self.header_len = 0;
        self.header_served = 0;
        self.body_left = 0;
        self.last_error = None;
    }

    /// Oversized packets dropped so far
    pub fn dropped(&self) -> u32 {
        self.dropped
    }

    /// Most recent transport failure seen through the wire
    pub fn last_error(&self) -> Option<TransportError> {
        self.last_error
    }

    fn mid_packet(&self) -> bool {
        self.header_served < self.header_len || self.body_left > 0
    }
}

pub struct Wire<'a, T> {
    transport: &'a mut T,
    framer: &'a mut Framer,
    session_expiry_secs: u32,
}

impl<'a, T: Transport> Wire<'a, T> {
    pub fn new(transport: &'a mut T, framer: &'a mut Framer, session_expiry_secs: u32) -> Self {
        Self {
            transport,
            framer,
            session_expiry_secs,
        }
    }

    fn track<V>(&mut self, result: Result<V, TransportError>) -> Result<V, TransportError> {
        if let Err(e) = result {
            self.framer.last_error = Some(e);
        }
        result
    }

    async fn read_byte(&mut self) -> Result<u8, TransportError> {
        let mut byte = [0u8; 1];
        let result = self.transport.read(&mut byte).await;
        self.track(result)?;
        Ok(byte[0])
    }

    /// Pull the next fixed header off the transport
    async fn next_header(&mut self) -> Result<(), TransportError> {
        let mut header = [0u8; MAX_HEADER_LEN];
        header[0] = self.read_byte().await?;

        let mut remaining: usize = 0;
        let mut len = 1;
        loop {
            if len == MAX_HEADER_LEN {
                self.framer.last_error = Some(TransportError::Io);
                return Err(TransportError::Io);
            }
            let byte = self.read_byte().await?;
            header[len] = byte;
            remaining |= usize::from(byte & 0x7F) << (7 * (len - 1));
            len += 1;
            if byte & 0x80 == 0 {
                break;
            }
        }

        if len + remaining > self.framer.limit {
            warn!("dropping {} byte inbound packet", len + remaining);
            self.drain(remaining).await?;
            self.framer.dropped = self.framer.dropped.wrapping_add(1);
            header[..PINGRESP.len()].copy_from_slice(&PINGRESP);
            len = PINGRESP.len();
            remaining = 0;
        }

        self.framer.header = header;
        self.framer.header_len = len;
        self.framer.header_served = 0;
        self.framer.body_left = remaining;
        Ok(())
    }

    async fn drain(&mut self, mut remaining: usize) -> Result<(), TransportError> {
        let mut scratch = [0u8; DRAIN_CHUNK_LEN];
        while remaining > 0 {
            let want = remaining.min(DRAIN_CHUNK_LEN);
            let result = self.transport.read(&mut scratch[..want]).await;
            remaining -= self.track(result)?;
        }
        Ok(())
    }
}

impl<T> ErrorType for Wire<'_, T> {
    type Error = TransportError;
}

impl<T: Transport> Read for Wire<'_, T> {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        if buf.is_empty() {
            return Ok(0);
        }
        if !self.framer.mid_packet() {
            self.next_header().await?;
        }

        let framer = &mut *self.framer;
        if framer.header_served < framer.header_len {
            let pending = &framer.header[framer.header_served..framer.header_len];
            let n = pending.len().min(buf.len());
            buf[..n].copy_from_slice(&pending[..n]);
            framer.header_served += n;
            return Ok(n);
        }

        // Never read past the end of the current packet
        let want = framer.body_left.min(buf.len());
        let result = self.transport.read(&mut buf[..want]).await;
        let n = self.track(result)?;
        self.framer.body_left -= n;
        Ok(n)
    }
}

impl<T: Transport> ReadReady for Wire<'_, T> {
    fn read_ready(&mut self) -> Result<bool, TransportError> {
        if self.framer.mid_packet() {
            return Ok(true);
        }
        let result = self.transport.read_ready();
        self.track(result)
    }
}

impl<T: Transport> Write for Wire<'_, T> {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, TransportError> {
        // The client hands over whole packets, one per write
        let mut connect = [0u8; CONNECT_BUFFER_LEN];
        let packet = match persistent_connect(buf, self.session_expiry_secs, &mut connect) {
            Some(len) => &connect[..len],
            None => buf,
        };
        let result = self.transport.write_all(packet).await;
        self.track(result)?;
        Ok(buf.len())
    }

    async fn flush(&mut self) -> Result<(), TransportError> {
        // `write_all` on the transport already flushes
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockTransport;
    use embassy_futures::block_on;

    fn open_transport(inbound: &[u8]) -> MockTransport {
        let mut transport = MockTransport::default();
        transport.is_open = true;
        transport.push_inbound(inbound);
        transport
    }

    fn read_all(wire: &mut Wire<'_, MockTransport>, len: usize) -> std::vec::Vec<u8> {
        let mut out = std::vec![0u8; len];
        let mut filled = 0;
        while filled < len {
            filled += block_on(wire.read(&mut out[filled..])).unwrap();
        }
        out
    }

    #[test]
    fn test_small_packet_passes_through() {
        let packet = [0x30, 0x03, 0x00, 0x01, b'x'];
        let mut transport = open_transport(&packet);
        let mut framer = Framer::new(16);
        let mut wire = Wire::new(&mut transport, &mut framer, 0);

        assert_eq!(read_all(&mut wire, packet.len()), packet);
        assert_eq!(wire.read_ready(), Ok(false));
        assert_eq!(framer.dropped(), 0);
    }

    #[test]
    fn test_reads_stop_at_packet_end() {
        let mut inbound = std::vec![0xD0, 0x00];
        inbound.extend_from_slice(&[0x30, 0x02, 0x00, 0x00]);
        let mut transport = open_transport(&inbound);
        let mut framer = Framer::new(16);
        let mut wire = Wire::new(&mut transport, &mut framer, 0);

        let mut buf = [0u8; 8];
        assert_eq!(block_on(wire.read(&mut buf)), Ok(2));
        assert_eq!(&buf[..2], &[0xD0, 0x00]);
        assert_eq!(block_on(wire.read(&mut buf)), Ok(2));
        assert_eq!(block_on(wire.read(&mut buf)), Ok(2));
        assert_eq!(&buf[..2], &[0x00, 0x00]);
    }

    #[test]
    fn test_oversized_packet_is_replaced() {
        // 200 byte body behind a two-byte remaining length
        let mut inbound = std::vec![0x30, 0xC8, 0x01];
        inbound.extend(core::iter::repeat(b'a').take(200));
        inbound.extend_from_slice(&[0xD0, 0x00]);
        let mut transport = open_transport(&inbound);
        let mut framer = Framer::new(64);
        let mut wire = Wire::new(&mut transport, &mut framer, 0);

        assert_eq!(read_all(&mut wire, 2), PINGRESP);
        assert_eq!(read_all(&mut wire, 2), [0xD0, 0x00]);
        assert!(transport.inbound.is_empty());
        assert_eq!(framer.dropped(), 1);
    }

    #[test]
    fn test_transport_error_is_recorded() {
        let mut transport = open_transport(&[0x30]);
        let mut framer = Framer::new(16);
        let mut wire = Wire::new(&mut transport, &mut framer, 0);

        let mut buf = [0u8; 1];
        assert_eq!(block_on(wire.read(&mut buf)), Err(TransportError::Closed));
        assert_eq!(framer.last_error(), Some(TransportError::Closed));
    }

    #[test]
    fn test_write_goes_straight_through() {
        let mut transport = open_transport(&[]);
        let mut framer = Framer::new(16);
        let mut wire = Wire::new(&mut transport, &mut framer, 0);

        assert_eq!(block_on(wire.write(&[0xE0, 0x00])), Ok(2));
        assert_eq!(transport.outbound, [0xE0, 0x00]);
    }

    /// CONNECT with Clean Start, keepalive 1000, no properties, client id "node"
    const CLEAN_CONNECT: [u8; 19] = [
        0x10, 0x11, 0x00, 0x04, b'M', b'Q', b'T', b'T', 0x05, 0x02, 0x03, 0xE8, 0x00, 0x00, 0x04,
        b'n', b'o', b'd', b'e',
    ];

    #[test]
    fn test_connect_keeps_session() {
        let mut out = [0u8; 64];
        let len = persistent_connect(&CLEAN_CONNECT, 3600, &mut out).unwrap();

        assert_eq!(
            out[..len],
            [
                0x10, 0x16, 0x00, 0x04, b'M', b'Q', b'T', b'T', 0x05, 0x00, 0x03, 0xE8, 0x05,
                0x11, 0x00, 0x00, 0x0E, 0x10, 0x00, 0x04, b'n', b'o', b'd', b'e',
            ]
        );
    }

    #[test]
    fn test_other_packets_are_not_rewritten() {
        let mut out = [0u8; 64];
        assert_eq!(persistent_connect(&[0xE0, 0x00], 3600, &mut out), None);
        // MQTT 3.1.1 CONNECT
        let mut old = CLEAN_CONNECT;
        old[8] = 0x04;
        assert_eq!(persistent_connect(&old, 3600, &mut out), None);
        // truncated
        assert_eq!(persistent_connect(&CLEAN_CONNECT[..12], 3600, &mut out), None);
        // no room
        assert_eq!(persistent_connect(&CLEAN_CONNECT, 3600, &mut out[..10]), None);
    }

    #[test]
    fn test_wire_rewrites_connect() {
        let mut transport = open_transport(&[]);
        let mut framer = Framer::new(16);
        let mut wire = Wire::new(&mut transport, &mut framer, 60);

        assert_eq!(block_on(wire.write(&CLEAN_CONNECT)), Ok(CLEAN_CONNECT.len()));
        assert_eq!(transport.outbound.len(), CLEAN_CONNECT.len() + 5);
        assert_eq!(transport.outbound[9] & CLEAN_START, 0);
    }
}
