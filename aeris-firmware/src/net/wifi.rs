//! WiFi link on the Pico W's CYW43439
//!
//! The radio runner and the IP stack runner each get their own task; the
//! node only sees [`WifiLink`].

use core::net::Ipv4Addr;

use aeris_core::traits::{LinkError, NetworkLink};
use cyw43::{JoinOptions, PowerManagementMode, State};
use cyw43_pio::{PioSpi, DEFAULT_CLOCK_DIVIDER};
use defmt::{info, unwrap, warn};
use embassy_executor::Spawner;
use embassy_net::{Config, Stack, StackResources};
use embassy_rp::clocks::RoscRng;
use embassy_rp::gpio::{Level, Output};
use embassy_rp::peripherals::{DMA_CH0, PIN_23, PIN_24, PIN_25, PIN_29, PIO0};
use embassy_rp::pio::Pio;
use embassy_rp::Peri;
use rand_core::RngCore;
use static_cell::StaticCell;

use crate::Irqs;

/// Pins and blocks wired to the radio on the Pico W
pub struct WifiResources {
    pub pwr: Peri<'static, PIN_23>,
    pub cs: Peri<'static, PIN_25>,
    pub dio: Peri<'static, PIN_24>,
    pub clk: Peri<'static, PIN_29>,
    pub pio: Peri<'static, PIO0>,
    pub dma: Peri<'static, DMA_CH0>,
}

#[embassy_executor::task]
async fn cyw43_task(
    runner: cyw43::Runner<'static, Output<'static>, PioSpi<'static, PIO0, 0, DMA_CH0>>,
) -> ! {
    runner.run().await
}

#[embassy_executor::task]
async fn net_task(mut runner: embassy_net::Runner<'static, cyw43::NetDriver<'static>>) -> ! {
    runner.run().await
}

/// Associated WiFi network plus its IP stack
pub struct WifiLink {
    control: cyw43::Control<'static>,
    stack: Stack<'static>,
    ssid: &'static str,
    password: &'static str,
}

impl WifiLink {
    /// Power up the radio and start the IP stack (DHCP)
    ///
    /// Does not join a network; the node does that through
    /// [`NetworkLink::connect`].
    pub async fn start(
        spawner: Spawner,
        r: WifiResources,
        ssid: &'static str,
        password: &'static str,
    ) -> Self {
        let pwr = Output::new(r.pwr, Level::Low);
        let cs = Output::new(r.cs, Level::High);
        let mut pio = Pio::new(r.pio, Irqs);
        let spi = PioSpi::new(
            &mut pio.common,
            pio.sm0,
            DEFAULT_CLOCK_DIVIDER,
            pio.irq0,
            cs,
            r.dio,
            r.clk,
            r.dma,
        );

        static STATE: StaticCell<State> = StaticCell::new();
        let state = STATE.init(State::new());

        let fw = include_bytes!("../../cyw43-firmware/43439A0.bin");
        let (net_device, mut control, runner) = cyw43::new(state, pwr, spi, fw).await;
        unwrap!(spawner.spawn(cyw43_task(runner)));

        let clm = include_bytes!("../../cyw43-firmware/43439A0_clm.bin");
        control.init(clm).await;
        control
            .set_power_management(PowerManagementMode::PowerSave)
            .await;

        let seed = RoscRng.next_u64();
        static RESOURCES: StaticCell<StackResources<4>> = StaticCell::new();
        let (stack, runner) = embassy_net::new(
            net_device,
            Config::dhcpv4(Default::default()),
            RESOURCES.init(StackResources::new()),
            seed,
        );
        unwrap!(spawner.spawn(net_task(runner)));

        info!("WiFi radio up");
        Self {
            control,
            stack,
            ssid,
            password,
        }
    }

    /// IP stack for sockets
    pub fn stack(&self) -> Stack<'static> {
        self.stack
    }
}

impl NetworkLink for WifiLink {
    async fn connect(&mut self) -> Result<(), LinkError> {
        info!("Joining WiFi network {}", self.ssid);
        let options = if self.password.is_empty() {
            JoinOptions::new_open()
        } else {
            JoinOptions::new(self.password.as_bytes())
        };

        self.control
            .join(self.ssid, options)
            .await
            .map_err(|e| {
                warn!("Failed to join WiFi network with status {}", e.status);
                LinkError::JoinFailed
            })
    }

    fn is_connected(&self) -> bool {
        self.stack.is_link_up() && self.stack.is_config_up()
    }

    fn address(&self) -> Option<Ipv4Addr> {
        self.stack.config_v4().map(|config| config.address.address())
    }
}
