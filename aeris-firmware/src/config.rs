//! Build-time node configuration
//!
//! `build.rs` validates `node.toml` and exports each key as an `AERIS_*`
//! environment variable; this module turns them back into typed values.

use aeris_core::config::{BrokerConfig, NodeConfig};

pub const WIFI_SSID: &str = env!("AERIS_WIFI_SSID");
pub const WIFI_PASSWORD: &str = env!("AERIS_WIFI_PASSWORD");
pub const NTP_SERVER: &str = env!("AERIS_NODE_NTP_SERVER");

/// Parse a decimal integer at compile time
///
/// build.rs has already range-checked every value.
const fn parse_u32(s: &str) -> u32 {
    let bytes = s.as_bytes();
    let mut value: u32 = 0;
    let mut i = 0;
    while i < bytes.len() {
        let digit = bytes[i];
        assert!(digit.is_ascii_digit(), "not a decimal integer");
        value = value * 10 + (digit - b'0') as u32;
        i += 1;
    }
    value
}

pub const NODE: NodeConfig = NodeConfig {
    broker: BrokerConfig {
        endpoint: env!("AERIS_BROKER_ENDPOINT"),
        port: parse_u32(env!("AERIS_BROKER_PORT")) as u16,
        client_id: env!("AERIS_BROKER_CLIENT_ID"),
        keep_alive_secs: parse_u32(env!("AERIS_BROKER_KEEP_ALIVE_SECS")) as u16,
        publish_topic: env!("AERIS_BROKER_PUBLISH_TOPIC"),
        subscribe_topic: env!("AERIS_BROKER_SUBSCRIBE_TOPIC"),
    },
    publish_interval_secs: parse_u32(env!("AERIS_NODE_PUBLISH_INTERVAL_SECS")) as u64,
    loop_delay_ms: parse_u32(env!("AERIS_NODE_LOOP_DELAY_MS")),
    notice_pause_ms: parse_u32(env!("AERIS_NODE_NOTICE_PAUSE_MS")),
    link_timeout_ms: parse_u32(env!("AERIS_WIFI_LINK_TIMEOUT_MS")),
    link_poll_ms: parse_u32(env!("AERIS_WIFI_LINK_POLL_MS")),
    title: env!("AERIS_DISPLAY_TITLE"),
    subtitle: env!("AERIS_DISPLAY_SUBTITLE"),
};
