//! Aeris - Connected Climate Sensor Node Firmware
//!
//! Main firmware binary for the Raspberry Pi Pico W. Samples a DHT11,
//! publishes readings to AWS IoT Core over MQTT/TLS and shows status plus
//! remotely issued messages on an SSD1306 OLED.
//!
//! Wiring:
//! - SSD1306: I2C0, SDA GPIO4, SCL GPIO5
//! - DHT11: GPIO14 (module pull-up)
//! - CYW43 radio: GPIO23/24/25/29 via PIO0 + DMA_CH0

#![no_std]
#![no_main]

use defmt::{info, panic, warn};
use embassy_executor::Spawner;
use embassy_rp::bind_interrupts;
use embassy_rp::gpio::{Level, OutputOpenDrain};
use embassy_rp::i2c::{self, I2c};
use embassy_rp::peripherals::{I2C0, PIO0};
use embassy_rp::pio;
use embassy_time::Delay;
use static_cell::ConstStaticCell;
use {defmt_rtt as _, panic_probe as _};

use aeris_core::credentials::Credentials;
use aeris_core::Node;
use aeris_drivers::display::Ssd1306;
use aeris_drivers::sensor::{Dht11, PinBus};
use aeris_hal_rp2040::{Rp2040FlashStorage, StorageKey, SystemReset};

use crate::net::wifi::WifiResources;
use crate::net::{SntpClock, TlsBuffers, TlsTransport, WifiLink};

mod config;
mod net;
#[cfg(feature = "provision")]
mod provision;

bind_interrupts!(struct Irqs {
    PIO0_IRQ_0 => pio::InterruptHandler<PIO0>;
    I2C0_IRQ => i2c::InterruptHandler<I2C0>;
});

// TCP and TLS record buffers for the broker connection
static TLS_BUFFERS: ConstStaticCell<TlsBuffers> = ConstStaticCell::new(TlsBuffers::new());

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Aeris firmware starting...");

    let p = embassy_rp::init(Default::default());
    let node_config = config::NODE;
    if let Err(e) = node_config.validate() {
        panic!("invalid node configuration: {}", e);
    }

    // Credentials from the flash partition
    let mut storage = Rp2040FlashStorage::new(p.FLASH, p.DMA_CH2);
    #[cfg(feature = "provision")]
    provision::store_credentials(&mut storage).await;
    let credentials =
        Credentials::load(&mut storage, StorageKey::PrivateKey, StorageKey::Certificate).await;

    // OLED
    let mut i2c_config = i2c::Config::default();
    i2c_config.frequency = 400_000;
    let i2c = I2c::new_async(p.I2C0, p.PIN_5, p.PIN_4, Irqs, i2c_config);
    let mut display = Ssd1306::new(i2c);
    if let Err(e) = display.init().await {
        warn!("display init failed: {}", e);
    }

    // DHT11 on an open-drain line
    let data = OutputOpenDrain::new(p.PIN_14, Level::High);
    let sensor = Dht11::new(PinBus::new(data, Delay));

    // Radio, IP stack and the services on top of it
    let wifi = WifiLink::start(
        spawner,
        WifiResources {
            pwr: p.PIN_23,
            cs: p.PIN_25,
            dio: p.PIN_24,
            clk: p.PIN_29,
            pio: p.PIO0,
            dma: p.DMA_CH0,
        },
        config::WIFI_SSID,
        config::WIFI_PASSWORD,
    )
    .await;
    let stack = wifi.stack();
    let clock = SntpClock::new(stack, config::NTP_SERVER);
    let transport = TlsTransport::new(stack, TLS_BUFFERS.take());

    info!("Peripherals initialized");

    let mut node = Node::new(node_config, wifi, clock, sensor, display, transport, Delay);
    node.run_forever(credentials, &mut SystemReset).await
}
