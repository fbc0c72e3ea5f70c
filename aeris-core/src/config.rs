//! Node configuration types
//!
//! Values are fixed at build time (the firmware assembles them from
//! `node.toml`); `Default` carries the reference deployment.

/// Broker connection settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BrokerConfig {
    /// Broker host name (TLS server name as well)
    pub endpoint: &'static str,
    /// TLS port
    pub port: u16,
    /// MQTT client identifier
    pub client_id: &'static str,
    /// MQTT keepalive in seconds
    pub keep_alive_secs: u16,
    /// Outbound telemetry topic
    pub publish_topic: &'static str,
    /// Inbound display-command topic
    pub subscribe_topic: &'static str,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            endpoint: "a2p90nfxm9qc10-ats.iot.eu-west-1.amazonaws.com",
            port: 8883,
            client_id: "aeris-node",
            keep_alive_secs: 1000,
            publish_topic: "weather",
            subscribe_topic: "message",
        }
    }
}

/// Complete node configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct NodeConfig {
    pub broker: BrokerConfig,
    /// Minimum seconds between telemetry publishes
    pub publish_interval_secs: u64,
    /// Cooperative yield at the end of every loop iteration
    pub loop_delay_ms: u32,
    /// Pause after status notices and waiting commands
    pub notice_pause_ms: u32,
    /// Give up on WiFi association after this long
    pub link_timeout_ms: u32,
    /// Delay between link-state polls while waiting
    pub link_poll_ms: u32,
    /// Header row 1
    pub title: &'static str,
    /// Header row 2
    pub subtitle: &'static str,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            broker: BrokerConfig::default(),
            publish_interval_secs: 5,
            loop_delay_ms: 200,
            notice_pause_ms: 2000,
            link_timeout_ms: 30_000,
            link_poll_ms: 100,
            title: "AWS IoT Core",
            subtitle: "Pico W",
        }
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Broker endpoint is empty
    MissingEndpoint,
    /// Port 0
    InvalidPort,
    /// Client identifier is empty
    MissingClientId,
    /// A topic is empty or contains wildcards
    InvalidTopic,
    /// Publish interval of zero seconds
    InvalidInterval,
    /// Link poll period is zero or exceeds the link timeout
    InvalidLinkTiming,
}

impl NodeConfig {
    /// Check invariants the node relies on
    pub fn validate(&self) -> Result<(), ConfigError> {
        let broker = &self.broker;

        if broker.endpoint.is_empty() {
            return Err(ConfigError::MissingEndpoint);
        }
        if broker.port == 0 {
            return Err(ConfigError::InvalidPort);
        }
        if broker.client_id.is_empty() {
            return Err(ConfigError::MissingClientId);
        }
        if !is_concrete_topic(broker.publish_topic) || !is_concrete_topic(broker.subscribe_topic) {
            return Err(ConfigError::InvalidTopic);
        }
        if self.publish_interval_secs == 0 {
            return Err(ConfigError::InvalidInterval);
        }
        if self.link_poll_ms == 0 || self.link_poll_ms > self.link_timeout_ms {
            return Err(ConfigError::InvalidLinkTiming);
        }
        Ok(())
    }
}

fn is_concrete_topic(topic: &str) -> bool {
    !topic.is_empty() && !topic.contains(['+', '#'])
}
