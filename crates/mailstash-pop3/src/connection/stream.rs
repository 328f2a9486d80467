//! TCP and TLS transports behind one type.

use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use rustls::pki_types::ServerName;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tokio_rustls::client::TlsStream;

use super::config::{Config, Security};
use crate::error::{Error, Result};

trait Duplex: AsyncRead + AsyncWrite + Unpin {}

impl<T: AsyncRead + AsyncWrite + Unpin> Duplex for T {}

/// Byte stream to a POP3 server.
#[derive(Debug)]
pub enum Pop3Stream {
    /// Cleartext.
    Tcp(TcpStream),
    /// Implicit TLS.
    Tls(Box<TlsStream<TcpStream>>),
}

impl Pop3Stream {
    /// Whether the transport is encrypted.
    #[must_use]
    pub const fn is_tls(&self) -> bool {
        matches!(self, Self::Tls(_))
    }

    fn io(self: Pin<&mut Self>) -> Pin<&mut dyn Duplex> {
        match self.get_mut() {
            Self::Tcp(tcp) => Pin::new(tcp as &mut dyn Duplex),
            Self::Tls(tls) => Pin::new(tls.as_mut() as &mut dyn Duplex),
        }
    }
}

impl AsyncRead for Pop3Stream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        self.io().poll_read(cx, buf)
    }
}

impl AsyncWrite for Pop3Stream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.io().poll_write(cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.io().poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.io().poll_shutdown(cx)
    }
}

/// Opens the transport `config` describes, bounded by
/// `config.connect_timeout`.
///
/// # Errors
///
/// [`Error::Timeout`] when the deadline passes, otherwise the underlying
/// I/O or TLS error.
pub async fn connect(config: &Config) -> Result<Pop3Stream> {
    tracing::debug!(
        host = %config.host,
        port = config.port,
        security = ?config.security,
        "Opening POP3 transport"
    );

    let open = async {
        let tcp = TcpStream::connect((config.host.as_str(), config.port)).await?;
        if config.security == Security::None {
            return Ok(Pop3Stream::Tcp(tcp));
        }
        let name = ServerName::try_from(config.host.clone())?;
        let roots =
            rustls::RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        let tls_config = rustls::ClientConfig::builder()
            .with_root_certificates(roots)
            .with_no_client_auth();
        let tls = TlsConnector::from(Arc::new(tls_config)).connect(name, tcp).await?;
        Ok(Pop3Stream::Tls(Box::new(tls)))
    };

    tokio::time::timeout(config.connect_timeout, open)
        .await
        .map_err(|_| Error::Timeout(config.connect_timeout))?
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_plain_transport() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let config = Config::new("127.0.0.1").with_security(Security::None).with_port(port);
        assert!(!connect(&config).await.unwrap().is_tls());
    }

    #[tokio::test]
    async fn test_closed_port_is_transport_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let config = Config::new("127.0.0.1").with_security(Security::None).with_port(port);
        assert!(connect(&config).await.unwrap_err().is_transport());
    }
}
