//! TLS 1.3 client transport
//!
//! TCP via embassy-net, TLS via embedded-tls with the node's client
//! certificate. The socket and record buffers live in a `'static`
//! [`TlsBuffers`] that the first `open` takes ownership of; the transport
//! is therefore single-use, which matches the node never reconnecting
//! without a restart.

use aeris_core::credentials::Credentials;
use aeris_core::traits::{Transport, TransportError};
use defmt::{debug, info, warn};
use embassy_net::dns::DnsQueryType;
use embassy_net::tcp::TcpSocket;
use embassy_net::Stack;
use embassy_rp::clocks::RoscRng;
use embassy_time::Duration;
use embedded_io_async::{Read, ReadReady, Write};
use embedded_tls::{
    Aes128GcmSha256, Certificate, TlsConfig, TlsConnection, TlsContext, UnsecureProvider,
};

const TCP_BUFFER_LEN: usize = 4096;
/// Largest TLS record plus overhead
const TLS_READ_BUFFER_LEN: usize = 16_640;
const TLS_WRITE_BUFFER_LEN: usize = 4096;

const SOCKET_TIMEOUT: Duration = Duration::from_secs(10);

/// Backing storage for one connection
pub struct TlsBuffers {
    tcp_rx: [u8; TCP_BUFFER_LEN],
    tcp_tx: [u8; TCP_BUFFER_LEN],
    tls_read: [u8; TLS_READ_BUFFER_LEN],
    tls_write: [u8; TLS_WRITE_BUFFER_LEN],
}

impl TlsBuffers {
    pub const fn new() -> Self {
        Self {
            tcp_rx: [0; TCP_BUFFER_LEN],
            tcp_tx: [0; TCP_BUFFER_LEN],
            tls_read: [0; TLS_READ_BUFFER_LEN],
            tls_write: [0; TLS_WRITE_BUFFER_LEN],
        }
    }
}

type Connection = TlsConnection<'static, TcpSocket<'static>, Aes128GcmSha256>;

pub struct TlsTransport {
    stack: Stack<'static>,
    buffers: Option<&'static mut TlsBuffers>,
    connection: Option<Connection>,
}

impl TlsTransport {
    pub fn new(stack: Stack<'static>, buffers: &'static mut TlsBuffers) -> Self {
        Self {
            stack,
            buffers: Some(buffers),
            connection: None,
        }
    }

    fn connection(&mut self) -> Result<&mut Connection, TransportError> {
        self.connection.as_mut().ok_or(TransportError::Closed)
    }
}

impl Transport for TlsTransport {
    async fn open(
        &mut self,
        host: &str,
        port: u16,
        credentials: &Credentials,
    ) -> Result<(), TransportError> {
        let Some(buffers) = self.buffers.take() else {
            warn!("TLS transport already used; restart required");
            return Err(TransportError::Closed);
        };
        let TlsBuffers {
            tcp_rx,
            tcp_tx,
            tls_read,
            tls_write,
        } = buffers;

        let addrs = self
            .stack
            .dns_query(host, DnsQueryType::A)
            .await
            .map_err(|_| TransportError::Dns)?;
        let address = *addrs.first().ok_or(TransportError::Dns)?;
        debug!("{} resolved to {}", host, address);

        let mut socket = TcpSocket::new(self.stack, tcp_rx, tcp_tx);
        socket.set_timeout(Some(SOCKET_TIMEOUT));
        socket.connect((address, port)).await.map_err(|e| {
            warn!("TCP connect failed: {}", e);
            TransportError::Connect
        })?;

        let config = TlsConfig::new()
            .with_server_name(host)
            .with_cert(Certificate::X509(credentials.certificate()))
            .with_priv_key(credentials.key());

        let mut connection = TlsConnection::new(socket, tls_read, tls_write);
        connection
            .open(TlsContext::new(
                &config,
                UnsecureProvider::new::<Aes128GcmSha256>(RoscRng),
            ))
            .await
            .map_err(|e| {
                warn!("TLS handshake failed: {}", e);
                TransportError::Handshake
            })?;

        info!("TLS session open to {}:{}", host, port);
        self.connection = Some(connection);
        Ok(())
    }

    async fn write_all(&mut self, data: &[u8]) -> Result<(), TransportError> {
        let connection = self.connection()?;
        connection
            .write_all(data)
            .await
            .map_err(|_| TransportError::Io)?;
        connection.flush().await.map_err(|_| TransportError::Io)
    }

    async fn read(&mut self, buffer: &mut [u8]) -> Result<usize, TransportError> {
        match self.connection()?.read(buffer).await {
            Ok(0) if !buffer.is_empty() => Err(TransportError::Closed),
            Ok(n) => Ok(n),
            Err(_) => Err(TransportError::Io),
        }
    }

    fn read_ready(&mut self) -> Result<bool, TransportError> {
        self.connection()?
            .read_ready()
            .map_err(|_| TransportError::Io)
    }

    async fn close(&mut self) {
        let Some(connection) = self.connection.take() else {
            return;
        };
        let mut socket = match connection.close().await {
            Ok(socket) => socket,
            Err((socket, _)) => socket,
        };
        socket.close();
        let _ = socket.flush().await;
        info!("TLS session closed");
    }
}
