//! Node orchestrator
//!
//! Owns every collaborator plus the display state, the publish gate and
//! the broker session, and runs the boot sequence followed by the
//! sample/publish/render loop. All ordering between the sampling path and
//! inbound commands lives in [`Node::step`].

use core::fmt::Write;

use aeris_protocol::{Telemetry, MAX_TELEMETRY_LEN};
use embedded_hal_async::delay::DelayNs;
use heapless::String;

use crate::command;
use crate::config::NodeConfig;
use crate::credentials::{CredentialError, Credentials};
use crate::display::{Align, DisplayState};
use crate::gate::PublishGate;
use crate::session::{PollError, PublishError, SessionManager};
use crate::traits::{unix_time, Clock, Hygrometer, NetworkLink, Reboot, TextDisplay, Transport};

/// Boot could not complete
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BootError {
    /// WiFi did not come up within the configured timeout
    ConnectTimeout,
}

/// Outcome of one loop iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Step {
    Continue,
    /// WiFi dropped; the caller must restart the device
    LinkLost,
}

/// One sensor sample
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SensorReading {
    /// Degrees Celsius
    pub temperature: f32,
    /// Percent relative humidity
    pub humidity: f32,
    /// Unix seconds, never decreasing between samples
    pub timestamp: u64,
}

/// Body text of a reading, e.g. "Temper.: 22.5 C"
type ReadingLine = String<32>;

/// The sensor node
pub struct Node<L, C, S, D, T, Y> {
    config: NodeConfig,
    link: L,
    clock: C,
    sensor: S,
    display: D,
    delay: Y,
    session: SessionManager<T>,
    screen: DisplayState,
    gate: PublishGate,
    last_timestamp: u64,
}

impl<L, C, S, D, T, Y> Node<L, C, S, D, T, Y>
where
    L: NetworkLink,
    C: Clock,
    S: Hygrometer,
    D: TextDisplay,
    T: Transport,
    Y: DelayNs,
{
    pub fn new(
        config: NodeConfig,
        link: L,
        clock: C,
        sensor: S,
        display: D,
        transport: T,
        delay: Y,
    ) -> Self {
        Self {
            screen: DisplayState::new(config.title, config.subtitle),
            gate: PublishGate::new(0, config.publish_interval_secs),
            session: SessionManager::new(transport),
            config,
            link,
            clock,
            sensor,
            display,
            delay,
            last_timestamp: 0,
        }
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn screen(&self) -> &DisplayState {
        &self.screen
    }

    pub fn gate(&self) -> &PublishGate {
        &self.gate
    }

    pub fn session(&self) -> &SessionManager<T> {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut SessionManager<T> {
        &mut self.session
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn sensor_mut(&mut self) -> &mut S {
        &mut self.sensor
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn delay(&self) -> &Y {
        &self.delay
    }

    /// Bring up WiFi, sync the clock and open the broker session
    ///
    /// Only a WiFi timeout is fatal. Credential and broker failures are
    /// shown on the panel and leave the node running without a session.
    pub async fn boot(
        &mut self,
        credentials: Result<Credentials, CredentialError>,
    ) -> Result<(), BootError> {
        self.notice(["Connecting to", "Wifi...", ""], Align::Center, false)
            .await;
        self.wait_for_link().await?;

        if let Err(e) = self.clock.sync().await {
            warn!("time sync failed, keeping device clock: {}", e);
        }
        self.notice(["Connected to", "Wifi!", ""], Align::Center, true)
            .await;

        match credentials {
            Ok(credentials) => self.open_session(credentials).await,
            Err(e) => {
                error!("credentials unavailable: {}", e);
                self.notice(["Error", "reading", "credentials"], Align::Left, true)
                    .await;
            }
        }

        let now = self.timestamp();
        self.gate = PublishGate::new(now, self.config.publish_interval_secs);
        info!("boot complete at {}", now);
        Ok(())
    }

    async fn wait_for_link(&mut self) -> Result<(), BootError> {
        if let Err(e) = self.link.connect().await {
            warn!("WiFi join request failed: {}", e);
        }

        let mut waited_ms: u32 = 0;
        while !self.link.is_connected() {
            if waited_ms >= self.config.link_timeout_ms {
                error!("WiFi not up after {} ms", waited_ms);
                return Err(BootError::ConnectTimeout);
            }
            self.delay.delay_ms(self.config.link_poll_ms).await;
            waited_ms = waited_ms.saturating_add(self.config.link_poll_ms);
        }

        info!("WiFi up after {} ms", waited_ms);
        Ok(())
    }

    async fn open_session(&mut self, credentials: Credentials) {
        let mut target: String<32> = String::new();
        // Long titles are cut by the layout anyway
        let _ = write!(target, "{}...", self.config.title);
        self.notice(["Connecting to", target.as_str(), ""], Align::Left, false)
            .await;

        let broker = self.config.broker;
        target.clear();
        let _ = write!(target, "{}!", self.config.title);
        match self.session.connect(&broker, credentials).await {
            Ok(()) => {
                self.notice(["Connected to", target.as_str(), ""], Align::Left, true)
                    .await
            }
            Err(_) => {
                self.notice(["Error", "connecting", target.as_str()], Align::Left, true)
                    .await
            }
        }
    }

    /// One loop iteration
    pub async fn step(&mut self) -> Step {
        if !self.link.is_connected() {
            return Step::LinkLost;
        }

        let reading = self.sample().await;

        if self.session.is_connected() && self.gate.should_publish(reading.timestamp) {
            self.service_inbound().await;
            self.publish(&reading).await;
        }

        // Replaces any command lines shown above once their pause is over
        self.show_reading(&reading).await;
        self.delay.delay_ms(self.config.loop_delay_ms).await;
        Step::Continue
    }

    /// Loop until WiFi drops, then show the restart notice
    pub async fn run(&mut self) {
        while self.step().await == Step::Continue {}

        warn!("WiFi connection lost");
        self.notice(["Disconnected", "from Wifi!", "Rebooting..."], Align::Center, false)
            .await;
    }

    /// Boot, loop, and restart the device once the loop ends
    pub async fn run_forever<R: Reboot>(
        &mut self,
        credentials: Result<Credentials, CredentialError>,
        reboot: &mut R,
    ) -> ! {
        match self.boot(credentials).await {
            Ok(()) => self.run().await,
            Err(BootError::ConnectTimeout) => {
                self.notice(["Wifi timeout", "", "Rebooting..."], Align::Center, false)
                    .await;
            }
        }
        self.session.disconnect().await;
        reboot.restart()
    }

    async fn sample(&mut self) -> SensorReading {
        if let Err(e) = self.sensor.measure().await {
            warn!("measurement failed, reusing last values: {}", e);
        }
        SensorReading {
            temperature: self.sensor.temperature(),
            humidity: self.sensor.humidity(),
            timestamp: self.timestamp(),
        }
    }

    /// Current Unix time, clamped so it never goes backwards
    fn timestamp(&mut self) -> u64 {
        let now = unix_time(self.clock.now());
        self.last_timestamp = self.last_timestamp.max(now);
        self.last_timestamp
    }

    async fn service_inbound(&mut self) {
        match self.session.poll_inbound().await {
            Ok(Some(command)) => {
                debug!("display command received");
                command::apply(&command, &mut self.screen);
                self.refresh().await;
                if let Some(ms) = command.pause_ms() {
                    self.delay.delay_ms(ms).await;
                }
            }
            Ok(None) => {}
            Err(PollError::Decode(e)) => warn!("dropping malformed command: {}", e),
            Err(e) => warn!("inbound poll failed: {}", e),
        }
    }

    async fn publish(&mut self, reading: &SensorReading) {
        let telemetry = Telemetry {
            temp: reading.temperature,
            hum: reading.humidity,
            timestamp: reading.timestamp,
        };

        let mut body = [0u8; MAX_TELEMETRY_LEN];
        let topic = self.config.broker.publish_topic;
        let result = match telemetry.encode(&mut body) {
            Ok(len) => self.session.publish(topic, &body[..len]).await,
            Err(_) => Err(PublishError::Encode),
        };
        self.gate.record_attempt(reading.timestamp);

        match result {
            Ok(()) => debug!("published reading at {}", reading.timestamp),
            Err(e) => warn!("publish failed: {}", e),
        }
    }

    async fn show_reading(&mut self, reading: &SensorReading) {
        let mut temperature = ReadingLine::new();
        let mut humidity = ReadingLine::new();
        let _ = write!(temperature, "Temper.: {:2.1} C", reading.temperature);
        let _ = write!(humidity, "Humidity: {:3.1} %", reading.humidity);

        self.screen.set_body(
            [temperature.as_str(), humidity.as_str(), ""],
            Align::Left,
        );
        self.refresh().await;
    }

    /// Status text, optionally held for the notice pause
    async fn notice(&mut self, lines: [&str; 3], align: Align, hold: bool) {
        self.screen.set_body(lines, align);
        self.refresh().await;
        if hold {
            self.delay.delay_ms(self.config.notice_pause_ms).await;
        }
    }

    /// Update the footer and push the current state to the panel
    async fn refresh(&mut self) {
        let address = if self.link.is_connected() {
            self.link.address()
        } else {
            None
        };
        self.screen.set_connectivity(address);

        if let Err(e) = self.screen.render(&mut self.display) {
            warn!("render failed: {}", e);
            return;
        }
        if let Err(e) = self.display.present().await {
            warn!("display flush failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{
        publish_packet, MockClock, MockDelay, MockDisplay, MockLink, MockSensor, MockTransport,
    };
    use crate::traits::EPOCH_OFFSET_SECS;
    use embassy_futures::block_on;

    type TestNode = Node<MockLink, MockClock, MockSensor, MockDisplay, MockTransport, MockDelay>;

    /// Device clock reading that maps to Unix 1_700_000_000
    const DEVICE_T0: u64 = 1_700_000_000 - EPOCH_OFFSET_SECS;

    fn sensor() -> MockSensor {
        MockSensor {
            temperature: 22.5,
            humidity: 55.0,
            ..MockSensor::default()
        }
    }

    fn node_with(link: MockLink, transport: MockTransport) -> TestNode {
        Node::new(
            NodeConfig::default(),
            link,
            MockClock::at(DEVICE_T0),
            sensor(),
            MockDisplay::default(),
            transport,
            MockDelay::default(),
        )
    }

    fn credentials() -> Result<Credentials, CredentialError> {
        Credentials::new(&[0x30, 0x01], &[0x30, 0x02])
    }

    fn booted() -> TestNode {
        let mut node = node_with(MockLink::default(), MockTransport::broker());
        block_on(node.boot(credentials())).unwrap();
        node
    }

    fn advance(node: &TestNode, secs: u64) {
        let clock = node.clock();
        clock.now.set(clock.now.get() + secs);
    }

    fn sent_since(node: &TestNode, mark: usize) -> std::vec::Vec<u8> {
        node.session().transport().outbound[mark..].to_vec()
    }

    #[test]
    fn test_boot_sequence_notices() {
        let node = booted();
        let display = node.display();

        assert_eq!(display.presents, 4);
        assert_eq!(&display.frame_text(0)[2..4], [" Connecting to  ", "    Wifi...     "]);
        assert_eq!(display.frame_text(1)[3], "     Wifi!      ");
        // Broker notices are left aligned
        assert_eq!(&display.frame_text(2)[2..4], ["Connecting to   ", "AWS IoT Core... "]);
        assert_eq!(&display.frame_text(3)[2..4], ["Connected to    ", "AWS IoT Core!   "]);

        // Two held notices, nothing else
        assert_eq!(node.delay().pauses_ms, [2000, 2000]);
        assert!(node.session().is_connected());
        assert_eq!(node.clock().sync_calls, 1);
        assert_eq!(node.gate().last_published_at(), 1_700_000_000);
    }

    #[test]
    fn test_boot_footer_shows_address() {
        let node = booted();
        assert_eq!(node.screen().footer(), "  192.168.1.42  ");
    }

    #[test]
    fn test_boot_waits_for_link() {
        let link = MockLink::default();
        link.up_after.set(3);
        let mut node = node_with(link, MockTransport::broker());

        block_on(node.boot(credentials())).unwrap();

        // Footer of the first notice is rendered while the link is down
        assert_eq!(node.display().frame_text(0)[5], " Not connected  ");
        let polls: std::vec::Vec<u32> = node
            .delay()
            .pauses_ms
            .iter()
            .copied()
            .filter(|ms| *ms == 100)
            .collect();
        assert_eq!(polls.len(), 2);
    }

    #[test]
    fn test_boot_link_timeout() {
        let mut node = node_with(MockLink::unreachable(), MockTransport::default());

        assert_eq!(
            block_on(node.boot(credentials())),
            Err(BootError::ConnectTimeout)
        );
        // 30 s in 100 ms polls
        assert_eq!(node.delay().pauses_ms.len(), 300);
        assert_eq!(node.session().transport().open_calls, 0);
    }

    #[test]
    fn test_boot_without_credentials() {
        let mut node = node_with(MockLink::default(), MockTransport::broker());

        block_on(node.boot(Err(CredentialError::Empty))).unwrap();

        assert_eq!(
            node.display().last_body(),
            ["Error           ", "reading         ", "credentials     "]
        );
        assert_eq!(node.session().transport().open_calls, 0);
        assert!(!node.session().is_connected());
    }

    #[test]
    fn test_boot_broker_refusal() {
        let mut transport = MockTransport::broker();
        // not authorized
        transport.connack = Some(0x87);
        let mut node = node_with(MockLink::default(), transport);

        block_on(node.boot(credentials())).unwrap();

        assert_eq!(
            node.display().last_body(),
            ["Error           ", "connecting      ", "AWS IoT Core!   "]
        );
        assert!(!node.session().is_connected());
    }

    #[test]
    fn test_boot_survives_failed_time_sync() {
        let mut node = node_with(MockLink::default(), MockTransport::broker());
        let mut clock = MockClock::at(DEVICE_T0);
        clock.fail_sync = true;
        node.clock = clock;

        assert_eq!(block_on(node.boot(credentials())), Ok(()));
        assert!(node.session().is_connected());
    }

    #[test]
    fn test_step_renders_reading_without_publishing_early() {
        let mut node = booted();
        let mark = node.session().transport().outbound.len();

        assert_eq!(block_on(node.step()), Step::Continue);

        assert_eq!(node.screen().line(0), "Temper.: 22.5 C ");
        assert_eq!(node.screen().line(1), "Humidity: 55.0 %");
        assert_eq!(node.screen().offset(), 28);
        assert!(sent_since(&node, mark).is_empty());
        assert_eq!(node.delay().pauses_ms.last(), Some(&200));
    }

    #[test]
    fn test_step_publishes_after_interval() {
        let mut node = booted();
        let mark = node.session().transport().outbound.len();
        advance(&node, 5);

        block_on(node.step());

        let sent = sent_since(&node, mark);
        assert_eq!(sent[0], 0x30);
        assert!(sent.windows(7).any(|w| w == b"weather"));
        assert!(sent.ends_with(br#"{"temp":22.5,"hum":55.0,"timestamp":1700000005}"#));
        assert_eq!(node.gate().last_published_at(), 1_700_000_005);

        // Not again until another interval passes
        let mark = node.session().transport().outbound.len();
        advance(&node, 4);
        block_on(node.step());
        assert!(sent_since(&node, mark).is_empty());
    }

    #[test]
    fn test_step_applies_inbound_command_before_reading() {
        let mut node = booted();
        node.session_mut()
            .transport_mut()
            .push_inbound(&publish_packet("message", br#"{"line1":"Hello","center":true}"#));
        advance(&node, 5);
        let frames_before = node.display().presents;

        block_on(node.step());

        let display = node.display();
        assert_eq!(display.presents, frames_before + 2);
        assert_eq!(
            display.frame_text(frames_before)[2..5],
            ["     Hello      ", "                ", "                "]
        );
        // command pause, then the loop yield
        assert_eq!(node.delay().pauses_ms[node.delay().pauses_ms.len() - 2..], [2000, 200]);
        // last write wins
        assert_eq!(node.screen().line(0), "Temper.: 22.5 C ");
    }

    #[test]
    fn test_step_command_without_wait_skips_pause() {
        let mut node = booted();
        node.session_mut()
            .transport_mut()
            .push_inbound(&publish_packet("message", br#"{"line1":"x","wait":false}"#));
        advance(&node, 5);
        let pauses_before = node.delay().pauses_ms.len();

        block_on(node.step());

        assert_eq!(node.delay().pauses_ms[pauses_before..], [200]);
    }

    #[test]
    fn test_step_malformed_command_leaves_screen() {
        let mut node = booted();
        node.session_mut()
            .transport_mut()
            .push_inbound(&publish_packet("message", b"{oops"));
        advance(&node, 5);
        let mark = node.session().transport().outbound.len();
        let frames_before = node.display().presents;

        block_on(node.step());

        // Only the reading render; telemetry still goes out
        assert_eq!(node.display().presents, frames_before + 1);
        assert!(!sent_since(&node, mark).is_empty());
        assert!(node.session().is_connected());
    }

    #[test]
    fn test_publish_failure_still_advances_gate() {
        let mut node = booted();
        node.session_mut().transport_mut().fail_write = Some(crate::traits::TransportError::Io);
        advance(&node, 6);

        block_on(node.step());

        assert_eq!(node.gate().last_published_at(), 1_700_000_006);
        assert!(node.session().is_connected());
    }

    #[test]
    fn test_sensor_failure_reuses_values() {
        let mut node = booted();
        node.sensor_mut().fail = true;

        block_on(node.step());

        assert_eq!(node.screen().line(0), "Temper.: 22.5 C ");
    }

    #[test]
    fn test_no_session_skips_publish_and_poll() {
        let mut node = node_with(MockLink::default(), MockTransport::default());
        block_on(node.boot(Err(CredentialError::Empty))).unwrap();
        advance(&node, 60);

        block_on(node.step());

        assert!(node.session().transport().outbound.is_empty());
        assert_eq!(node.session().transport().reads, 0);
        assert_eq!(node.screen().line(1), "Humidity: 55.0 %");
    }

    #[test]
    fn test_timestamp_never_goes_backwards() {
        let mut node = booted();
        advance(&node, 10);
        let first = node.timestamp();
        node.clock().now.set(DEVICE_T0);
        assert_eq!(node.timestamp(), first);
    }

    #[test]
    fn test_link_loss_ends_run_with_notice() {
        let mut node = booted();
        node.link().drop_after.set(Some(4));

        block_on(node.run());

        assert_eq!(
            node.display().last_body(),
            ["  Disconnected  ", "   from Wifi!   ", "  Rebooting...  "]
        );
        assert_eq!(node.display().frames.last().unwrap()[5].text, " Not connected  ");
        assert_eq!(node.delay().pauses_ms.last(), Some(&200));
    }
}
