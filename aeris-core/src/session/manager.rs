//! MQTT session over a secure transport
//!
//! The manager owns the transport, the credentials and the only session
//! the node ever has. Everything is driven by the caller: there are no
//! background reads and no callbacks.
//!
//! Packets are handled by `rust-mqtt` (MQTT 5). Its client borrows the
//! transport and buffers, so a short-lived one is built for every
//! operation; the session itself lives in the transport and in
//! [`SessionState`]. The broker keeps the session for
//! [`SESSION_EXPIRY_SECS`] after a drop.

use rust_mqtt::client::client::MqttClient;
use rust_mqtt::client::client_config::{ClientConfig, MqttVersion};
use rust_mqtt::packet::v5::publish_packet::QualityOfService;
use rust_mqtt::packet::v5::reason_codes::ReasonCode;
use rust_mqtt::utils::rng_generator::CountingRng;

use super::state::{FailureKind, SessionEvent, SessionState};
use super::wire::{Framer, Wire};
use crate::command::{self, Command, DecodeError};
use crate::config::BrokerConfig;
use crate::credentials::Credentials;
use crate::traits::{Transport, TransportError};

/// Size of each of the client's packet buffers, and the largest packet
/// the broker is allowed to send
pub const MQTT_BUFFER_LEN: usize = 1024;

/// Fixed header, topic length and empty property block of a PUBLISH
const PUBLISH_OVERHEAD: usize = 5 + 2 + 1;

/// How long the broker keeps the session (and its subscription) after
/// the connection drops
pub const SESSION_EXPIRY_SECS: u32 = 3600;

const MAX_PROPERTIES: usize = 5;

type Client<'a, T> = MqttClient<'a, Wire<'a, T>, MAX_PROPERTIES, CountingRng>;

/// Session establishment failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConnectError {
    Transport(TransportError),
    /// Broker refused the connection
    Rejected,
    /// Broker refused the subscription
    SubscribeRejected,
}

impl ConnectError {
    fn failure_kind(self) -> FailureKind {
        match self {
            ConnectError::Transport(_) => FailureKind::Transport,
            ConnectError::Rejected => FailureKind::Handshake,
            ConnectError::SubscribeRejected => FailureKind::Subscribe,
        }
    }
}

impl From<TransportError> for ConnectError {
    fn from(error: TransportError) -> Self {
        ConnectError::Transport(error)
    }
}

/// Publish failed; the session stays up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PublishError {
    NotConnected,
    /// Topic and payload do not fit the transmit buffer
    Encode,
    Transport(TransportError),
}

/// Inbound poll failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PollError {
    NotConnected,
    /// Stream broke; the session is now failed
    Transport(TransportError),
    /// Command body was malformed or too large; the session stays up
    Decode(DecodeError),
}

/// Owner of the broker session
pub struct SessionManager<T> {
    transport: T,
    state: SessionState,
    credentials: Option<Credentials>,
    client_id: &'static str,
    keep_alive_secs: u16,
    subscribe_topic: &'static str,
    framer: Framer,
    tx: [u8; MQTT_BUFFER_LEN],
    rx: [u8; MQTT_BUFFER_LEN],
}

impl<T: Transport> SessionManager<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            state: SessionState::Disconnected,
            credentials: None,
            client_id: "",
            keep_alive_secs: 0,
            subscribe_topic: "",
            framer: Framer::new(MQTT_BUFFER_LEN),
            tx: [0; MQTT_BUFFER_LEN],
            rx: [0; MQTT_BUFFER_LEN],
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state.is_connected()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    /// Open the transport, handshake and subscribe
    ///
    /// On any failure the transport is closed, the session is left in
    /// `Failed` and nothing partial is exposed. Calling this while already
    /// connected does nothing.
    pub async fn connect(
        &mut self,
        broker: &BrokerConfig,
        credentials: Credentials,
    ) -> Result<(), ConnectError> {
        if self.state.is_connected() {
            return Ok(());
        }
        if self.state != SessionState::Disconnected {
            self.disconnect().await;
        }

        self.credentials = Some(credentials);
        self.client_id = broker.client_id;
        self.keep_alive_secs = broker.keep_alive_secs;
        self.subscribe_topic = broker.subscribe_topic;
        self.apply(SessionEvent::ConnectRequested);

        match self.establish(broker).await {
            Ok(()) => {
                self.apply(SessionEvent::Established);
                info!(
                    "session up: {}:{} as {}",
                    broker.endpoint, broker.port, broker.client_id
                );
                Ok(())
            }
            Err(e) => {
                self.apply(SessionEvent::Fault(e.failure_kind()));
                self.transport.close().await;
                warn!("session connect failed: {}", e);
                Err(e)
            }
        }
    }

    async fn establish(&mut self, broker: &BrokerConfig) -> Result<(), ConnectError> {
        let Some(credentials) = self.credentials.as_ref() else {
            return Err(ConnectError::Transport(TransportError::Handshake));
        };
        self.transport
            .open(broker.endpoint, broker.port, credentials)
            .await?;
        self.framer.reset();

        let connected = {
            let mut client = self.client();
            let result = client.connect_to_broker().await;
            result
        };
        if let Err(code) = connected {
            return Err(self.refusal(code, ConnectError::Rejected));
        }

        let subscribed = {
            let topic = self.subscribe_topic;
            let mut client = self.client();
            let result = client.subscribe_to_topic(topic).await;
            result
        };
        subscribed.map_err(|code| self.refusal(code, ConnectError::SubscribeRejected))
    }

    /// Publish at QoS 0
    ///
    /// Failure is reported but leaves the session connected.
    pub async fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), PublishError> {
        if !self.state.is_connected() {
            return Err(PublishError::NotConnected);
        }
        if topic.len() + payload.len() + PUBLISH_OVERHEAD > MQTT_BUFFER_LEN {
            return Err(PublishError::Encode);
        }

        let sent = {
            let mut client = self.client();
            let result = client
                .send_message(topic, payload, QualityOfService::QoS0, false)
                .await;
            result
        };
        match sent {
            Ok(()) | Err(ReasonCode::NoMatchingSubscribers) => Ok(()),
            Err(ReasonCode::NetworkError) => Err(PublishError::Transport(self.stream_error())),
            Err(_) => Err(PublishError::Encode),
        }
    }

    /// Take at most one pending inbound packet
    ///
    /// Returns immediately with `Ok(None)` when nothing is waiting. A
    /// publish on the subscribed topic is decoded into a [`Command`];
    /// anything else is consumed and yields nothing. A packet too large
    /// for the receive buffer is skipped and reported as malformed.
    pub async fn poll_inbound(&mut self) -> Result<Option<Command>, PollError> {
        if !self.state.is_connected() {
            return Err(PollError::NotConnected);
        }

        let dropped = self.framer.dropped();
        let received = {
            let topic = self.subscribe_topic;
            let mut client = self.client();
            let result = match client.receive_message_if_ready().await {
                Ok(Some((from, body))) if from == topic => Ok(Some(command::decode(body))),
                Ok(Some((from, _))) => {
                    debug!("ignoring publish on {}", from);
                    Ok(None)
                }
                Ok(None) => Ok(None),
                Err(code) => Err(code),
            };
            result
        };

        if self.framer.dropped() != dropped {
            return Err(PollError::Decode(DecodeError::Malformed));
        }

        match received {
            Ok(Some(decoded)) => decoded.map(Some).map_err(PollError::Decode),
            Ok(None) => Ok(None),
            Err(ReasonCode::NetworkError) => Err(self.lose().await),
            Err(_) => {
                debug!("skipped non-publish packet");
                Ok(None)
            }
        }
    }

    /// Close the session; safe to call in any state
    pub async fn disconnect(&mut self) {
        match self.state {
            SessionState::Disconnected => return,
            SessionState::Connected => {
                let mut client = self.client();
                let _ = client.disconnect().await;
                drop(client);
                self.transport.close().await;
            }
            SessionState::Connecting | SessionState::Failed(_) => {
                self.transport.close().await;
            }
        }
        self.apply(SessionEvent::Disconnect);
        info!("session closed");
    }

    fn client(&mut self) -> Client<'_, T> {
        let mut config = ClientConfig::new(MqttVersion::MQTTv5, CountingRng(20000));
        config.add_client_id(self.client_id);
        config.keep_alive = self.keep_alive_secs;
        config.max_packet_size = MQTT_BUFFER_LEN as u32;

        MqttClient::new(
            Wire::new(&mut self.transport, &mut self.framer, SESSION_EXPIRY_SECS),
            &mut self.tx,
            MQTT_BUFFER_LEN,
            &mut self.rx,
            MQTT_BUFFER_LEN,
            config,
        )
    }

    /// Transport error behind a `NetworkError` from the client
    fn stream_error(&self) -> TransportError {
        self.framer.last_error().unwrap_or(TransportError::Io)
    }

    fn refusal(&self, code: ReasonCode, refused: ConnectError) -> ConnectError {
        match code {
            ReasonCode::NetworkError => ConnectError::Transport(self.stream_error()),
            _ => refused,
        }
    }

    /// Mark the connection lost and release the transport
    async fn lose(&mut self) -> PollError {
        let error = PollError::Transport(self.stream_error());
        self.apply(SessionEvent::Fault(FailureKind::ConnectionLost));
        self.transport.close().await;
        error!("session lost: {}", error);
        error
    }

    fn apply(&mut self, event: SessionEvent) {
        let next = self.state.transition(event);
        if next != self.state {
            debug!("session {} -> {}", self.state, next);
        }
        self.state = next;
    }
}
