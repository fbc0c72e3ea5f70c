//! Network link trait

use core::net::Ipv4Addr;

/// Errors from link bring-up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkError {
    /// Association with the access point failed
    JoinFailed,
}

/// WiFi station link
pub trait NetworkLink {
    /// Start associating with the configured network
    ///
    /// Returning `Ok` does not mean the link is usable yet; poll
    /// [`NetworkLink::is_connected`].
    fn connect(&mut self) -> impl core::future::Future<Output = Result<(), LinkError>>;

    /// Link up with an address assigned
    fn is_connected(&self) -> bool;

    /// Current IPv4 address, if any
    fn address(&self) -> Option<Ipv4Addr>;
}
