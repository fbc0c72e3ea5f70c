//! SNTP v3 client packets (RFC 4330).
//!
//! The node only needs wall-clock seconds, so a response is reduced to the
//! integer part of its transmit timestamp.

/// Well-known NTP server port
pub const NTP_PORT: u16 = 123;

/// Size of an SNTP packet without extensions
pub const PACKET_LEN: usize = 48;

/// Seconds between the NTP epoch (1900-01-01) and the Unix epoch
pub const NTP_UNIX_OFFSET_SECS: u64 = 2_208_988_800;

/// LI = 0, VN = 3, Mode = 3 (client)
const CLIENT_HEADER: u8 = 0x1B;

const MODE_SERVER: u8 = 4;
const MODE_BROADCAST: u8 = 5;
const LEAP_UNSYNCHRONIZED: u8 = 3;

/// Offset of the transmit timestamp seconds field
const TRANSMIT_SECS: usize = 40;

/// Errors from response validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SntpError {
    /// Datagram shorter than an SNTP header
    TooShort,
    /// Not a server or broadcast reply
    UnexpectedMode(u8),
    /// Stratum 0 kiss-o'-death reply
    KissOfDeath,
    /// Server clock not synchronized
    Unsynchronized,
}

/// Build a client request
pub fn request() -> [u8; PACKET_LEN] {
    let mut packet = [0u8; PACKET_LEN];
    packet[0] = CLIENT_HEADER;
    packet
}

/// Validate a server reply and return its transmit time in Unix seconds
pub fn parse_response(packet: &[u8]) -> Result<u64, SntpError> {
    if packet.len() < PACKET_LEN {
        return Err(SntpError::TooShort);
    }

    let leap = packet[0] >> 6;
    let mode = packet[0] & 0x07;
    let stratum = packet[1];

    if mode != MODE_SERVER && mode != MODE_BROADCAST {
        return Err(SntpError::UnexpectedMode(mode));
    }
    if stratum == 0 {
        return Err(SntpError::KissOfDeath);
    }
    if leap == LEAP_UNSYNCHRONIZED {
        return Err(SntpError::Unsynchronized);
    }

    let secs = u32::from_be_bytes([
        packet[TRANSMIT_SECS],
        packet[TRANSMIT_SECS + 1],
        packet[TRANSMIT_SECS + 2],
        packet[TRANSMIT_SECS + 3],
    ]);
    Ok(ntp_to_unix(secs))
}

/// Convert NTP seconds to Unix seconds
///
/// Values with the top bit clear are taken to be in NTP era 1 (after
/// 2036-02-07).
pub fn ntp_to_unix(ntp_secs: u32) -> u64 {
    let secs = ntp_secs as u64;
    if ntp_secs & 0x8000_0000 == 0 {
        secs + (1u64 << 32) - NTP_UNIX_OFFSET_SECS
    } else {
        secs - NTP_UNIX_OFFSET_SECS
    }
}
