//! Scripted collaborators for host tests

use core::cell::Cell;
use core::net::Ipv4Addr;
use std::collections::VecDeque;
use std::string::{String, ToString};
use std::vec::Vec;

use aeris_hal::{FlashError, FlashStorage, StorageKey};
use embedded_hal_async::delay::DelayNs;

use crate::credentials::Credentials;
use crate::traits::{
    Clock, ClockError, DisplayError, Hygrometer, LinkError, NetworkLink, SensorError, TextDisplay,
    Transport, TransportError,
};

/// MQTT 5 CONNACK with the given reason code and no properties
pub fn connack(reason: u8) -> [u8; 5] {
    [0x20, 0x03, 0x00, reason, 0x00]
}

/// MQTT 5 SUBACK for `packet_id` with one reason code
pub fn suback(packet_id: u16, reason: u8) -> [u8; 6] {
    let [hi, lo] = packet_id.to_be_bytes();
    [0x90, 0x04, hi, lo, 0x00, reason]
}

/// MQTT 5 QoS 0 PUBLISH without properties
pub fn publish_packet(topic: &str, payload: &[u8]) -> Vec<u8> {
    let mut remaining = 2 + topic.len() + 1 + payload.len();
    let mut packet = vec![0x30];
    loop {
        let mut byte = (remaining % 128) as u8;
        remaining /= 128;
        if remaining > 0 {
            byte |= 0x80;
        }
        packet.push(byte);
        if remaining == 0 {
            break;
        }
    }
    packet.extend_from_slice(&(topic.len() as u16).to_be_bytes());
    packet.extend_from_slice(topic.as_bytes());
    packet.push(0x00);
    packet.extend_from_slice(payload);
    packet
}

/// Offset of the variable header in an encoded packet
fn variable_header_start(packet: &[u8]) -> usize {
    1 + packet[1..]
        .iter()
        .position(|b| b & 0x80 == 0)
        .map_or(0, |i| i + 1)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawCall {
    pub text: String,
    pub x: i32,
    pub y: i32,
    pub row_id: u8,
}

/// Records draw calls; every `present` snapshots the current frame
#[derive(Debug, Default)]
pub struct MockDisplay {
    pub calls: Vec<DrawCall>,
    pub frames: Vec<Vec<DrawCall>>,
    pub clears: usize,
    pub presents: usize,
}

impl MockDisplay {
    /// Text of every row in presented frame `index`
    pub fn frame_text(&self, index: usize) -> Vec<&str> {
        self.frames[index].iter().map(|c| c.text.as_str()).collect()
    }

    /// Body rows (between header and footer) of the last presented frame
    pub fn last_body(&self) -> Vec<&str> {
        let frame = self.frames.last().expect("nothing presented");
        frame[2..5].iter().map(|c| c.text.as_str()).collect()
    }
}

impl TextDisplay for MockDisplay {
    fn clear(&mut self) -> Result<(), DisplayError> {
        self.calls.clear();
        self.clears += 1;
        Ok(())
    }

    fn draw_text(&mut self, text: &str, x: i32, y: i32, row_id: u8) -> Result<(), DisplayError> {
        self.calls.push(DrawCall {
            text: text.to_string(),
            x,
            y,
            row_id,
        });
        Ok(())
    }

    async fn present(&mut self) -> Result<(), DisplayError> {
        self.frames.push(self.calls.clone());
        self.presents += 1;
        Ok(())
    }
}

/// In-memory byte stream with scripted inbound bytes
///
/// With `connack`/`suback` set it answers CONNECT and SUBSCRIBE like a
/// broker would, echoing the subscription's packet id.
#[derive(Debug, Default)]
pub struct MockTransport {
    pub inbound: VecDeque<u8>,
    pub outbound: Vec<u8>,
    pub is_open: bool,
    pub open_calls: usize,
    pub close_calls: usize,
    pub reads: usize,
    pub opened_host: Option<String>,
    pub opened_port: Option<u16>,
    pub fail_open: Option<TransportError>,
    pub fail_write: Option<TransportError>,
    /// Reason code answered to CONNECT
    pub connack: Option<u8>,
    /// Reason code answered to SUBSCRIBE
    pub suback: Option<u8>,
}

impl MockTransport {
    /// Broker that accepts the connection and the subscription
    pub fn broker() -> Self {
        Self {
            connack: Some(0x00),
            suback: Some(0x00),
            ..Self::default()
        }
    }

    pub fn push_inbound(&mut self, bytes: &[u8]) {
        self.inbound.extend(bytes.iter().copied());
    }

    fn answer(&mut self, packet: &[u8]) {
        match (packet.first(), self.connack, self.suback) {
            (Some(0x10), Some(reason), _) => self.push_inbound(&connack(reason)),
            (Some(0x82), _, Some(reason)) => {
                let at = variable_header_start(packet);
                let id = u16::from_be_bytes([packet[at], packet[at + 1]]);
                self.push_inbound(&suback(id, reason));
            }
            _ => {}
        }
    }
}

impl Transport for MockTransport {
    async fn open(
        &mut self,
        host: &str,
        port: u16,
        credentials: &Credentials,
    ) -> Result<(), TransportError> {
        self.open_calls += 1;
        assert!(!credentials.key().is_empty());
        if let Some(e) = self.fail_open {
            return Err(e);
        }
        self.is_open = true;
        self.opened_host = Some(host.to_string());
        self.opened_port = Some(port);
        Ok(())
    }

    async fn write_all(&mut self, data: &[u8]) -> Result<(), TransportError> {
        if !self.is_open {
            return Err(TransportError::Closed);
        }
        if let Some(e) = self.fail_write {
            return Err(e);
        }
        self.outbound.extend_from_slice(data);
        self.answer(data);
        Ok(())
    }

    async fn read(&mut self, buffer: &mut [u8]) -> Result<usize, TransportError> {
        self.reads += 1;
        if !self.is_open || self.inbound.is_empty() {
            return Err(TransportError::Closed);
        }
        let n = buffer.len().min(self.inbound.len());
        for slot in &mut buffer[..n] {
            *slot = self.inbound.pop_front().unwrap_or_default();
        }
        Ok(n)
    }

    fn read_ready(&mut self) -> Result<bool, TransportError> {
        if !self.is_open {
            return Err(TransportError::Closed);
        }
        Ok(!self.inbound.is_empty())
    }

    async fn close(&mut self) {
        if self.is_open {
            self.close_calls += 1;
        }
        self.is_open = false;
    }
}

/// Key/value store backed by a vector
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Vec<(StorageKey, Vec<u8>)>,
}

impl MemoryStore {
    pub fn insert(&mut self, key: StorageKey, data: &[u8]) {
        self.entries.retain(|(k, _)| *k != key);
        self.entries.push((key, data.to_vec()));
    }

    fn get(&self, key: StorageKey) -> Option<&[u8]> {
        self.entries
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_slice())
    }
}

impl FlashStorage for MemoryStore {
    async fn read(&mut self, key: StorageKey, buffer: &mut [u8]) -> Result<usize, FlashError> {
        let data = self.get(key).ok_or(FlashError::NotFound)?;
        let slot = buffer
            .get_mut(..data.len())
            .ok_or(FlashError::BufferTooSmall)?;
        slot.copy_from_slice(data);
        Ok(data.len())
    }

    async fn write(&mut self, key: StorageKey, data: &[u8]) -> Result<(), FlashError> {
        self.insert(key, data);
        Ok(())
    }

    async fn erase_all(&mut self) -> Result<(), FlashError> {
        self.entries.clear();
        Ok(())
    }
}

/// WiFi link that can come up late and drop after a number of checks
#[derive(Debug)]
pub struct MockLink {
    pub connect_calls: usize,
    pub address: Option<Ipv4Addr>,
    /// `is_connected` checks answered `false` before the link comes up
    pub up_after: Cell<usize>,
    /// `is_connected` checks answered `true` before the link drops
    pub drop_after: Cell<Option<usize>>,
}

impl Default for MockLink {
    fn default() -> Self {
        Self {
            connect_calls: 0,
            address: Some(Ipv4Addr::new(192, 168, 1, 42)),
            up_after: Cell::new(0),
            drop_after: Cell::new(None),
        }
    }
}

impl MockLink {
    /// Never associates
    pub fn unreachable() -> Self {
        let link = Self::default();
        link.up_after.set(usize::MAX);
        link
    }
}

impl NetworkLink for MockLink {
    async fn connect(&mut self) -> Result<(), LinkError> {
        self.connect_calls += 1;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        let pending = self.up_after.get();
        if pending > 0 {
            self.up_after.set(pending - 1);
            return false;
        }
        match self.drop_after.get() {
            Some(0) => false,
            Some(n) => {
                self.drop_after.set(Some(n - 1));
                true
            }
            None => true,
        }
    }

    fn address(&self) -> Option<Ipv4Addr> {
        self.address
    }
}

/// Device-epoch clock that advances a fixed step per read
#[derive(Debug, Default)]
pub struct MockClock {
    pub now: Cell<u64>,
    pub step: u64,
    pub sync_calls: usize,
    pub fail_sync: bool,
}

impl MockClock {
    pub fn at(device_secs: u64) -> Self {
        Self {
            now: Cell::new(device_secs),
            ..Self::default()
        }
    }
}

impl Clock for MockClock {
    fn now(&self) -> u64 {
        let now = self.now.get();
        self.now.set(now + self.step);
        now
    }

    async fn sync(&mut self) -> Result<(), ClockError> {
        self.sync_calls += 1;
        if self.fail_sync {
            Err(ClockError::Timeout)
        } else {
            Ok(())
        }
    }
}

/// Sensor returning fixed values, optionally failing
#[derive(Debug, Default)]
pub struct MockSensor {
    pub temperature: f32,
    pub humidity: f32,
    pub measures: usize,
    pub fail: bool,
}

impl Hygrometer for MockSensor {
    async fn measure(&mut self) -> Result<(), SensorError> {
        self.measures += 1;
        if self.fail {
            Err(SensorError::Checksum)
        } else {
            Ok(())
        }
    }

    fn temperature(&self) -> f32 {
        self.temperature
    }

    fn humidity(&self) -> f32 {
        self.humidity
    }
}

/// Records every pause instead of sleeping
#[derive(Debug, Default)]
pub struct MockDelay {
    pub pauses_ms: Vec<u32>,
}

impl DelayNs for MockDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.pauses_ms.push(ns / 1_000_000);
    }

    async fn delay_ms(&mut self, ms: u32) {
        self.pauses_ms.push(ms);
    }
}
