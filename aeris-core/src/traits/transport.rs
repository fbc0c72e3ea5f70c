//! Secure byte-stream trait

use crate::credentials::Credentials;

/// Errors from the secure transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransportError {
    /// Host name did not resolve
    Dns,
    /// TCP connection failed
    Connect,
    /// TLS handshake failed
    Handshake,
    /// Read or write failed on an open stream
    Io,
    /// Peer closed the stream, or it was never opened
    Closed,
}

impl embedded_io_async::Error for TransportError {
    fn kind(&self) -> embedded_io_async::ErrorKind {
        use embedded_io_async::ErrorKind;

        match self {
            TransportError::Dns => ErrorKind::AddrNotAvailable,
            TransportError::Connect => ErrorKind::ConnectionRefused,
            TransportError::Handshake => ErrorKind::PermissionDenied,
            TransportError::Io => ErrorKind::Other,
            TransportError::Closed => ErrorKind::NotConnected,
        }
    }
}

/// Mutually authenticated encrypted stream to the broker
pub trait Transport {
    /// Resolve `host`, connect and complete the TLS handshake using the
    /// client certificate and key in `credentials`
    fn open(
        &mut self,
        host: &str,
        port: u16,
        credentials: &Credentials,
    ) -> impl core::future::Future<Output = Result<(), TransportError>>;

    /// Write and flush all of `data`
    fn write_all(
        &mut self,
        data: &[u8],
    ) -> impl core::future::Future<Output = Result<(), TransportError>>;

    /// Read at least one byte into `buffer`, waiting if none are buffered
    ///
    /// Returns the number of bytes read. End of stream is
    /// [`TransportError::Closed`], never `Ok(0)`.
    fn read(
        &mut self,
        buffer: &mut [u8],
    ) -> impl core::future::Future<Output = Result<usize, TransportError>>;

    /// Whether a read would return data without waiting
    fn read_ready(&mut self) -> Result<bool, TransportError>;

    /// Shut the stream down; safe to call when already closed
    fn close(&mut self) -> impl core::future::Future<Output = ()>;
}
