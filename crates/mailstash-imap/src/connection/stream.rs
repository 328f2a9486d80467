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
use crate::{Error, Result};

trait Duplex: AsyncRead + AsyncWrite + Unpin {}

impl<T: AsyncRead + AsyncWrite + Unpin> Duplex for T {}

/// Byte stream to an IMAP server.
pub enum ImapStream {
    /// Cleartext.
    Plain(TcpStream),
    /// Implicit TLS.
    Tls(Box<TlsStream<TcpStream>>),
}

impl ImapStream {
    /// Whether the transport is encrypted.
    #[must_use]
    pub const fn is_tls(&self) -> bool {
        matches!(self, Self::Tls(_))
    }

    fn io(self: Pin<&mut Self>) -> Pin<&mut dyn Duplex> {
        match self.get_mut() {
            Self::Plain(tcp) => Pin::new(tcp as &mut dyn Duplex),
            Self::Tls(tls) => Pin::new(tls.as_mut() as &mut dyn Duplex),
        }
    }
}

impl AsyncRead for ImapStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        self.io().poll_read(cx, buf)
    }
}

impl AsyncWrite for ImapStream {
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

/// Opens the transport `config` describes.
///
/// TCP setup and the TLS handshake share one deadline,
/// `config.connect_timeout`. Certificates are checked against the bundled
/// web PKI roots.
///
/// # Errors
///
/// [`Error::Timeout`] when the deadline passes, otherwise the underlying
/// I/O or TLS error.
pub async fn connect(config: &Config) -> Result<ImapStream> {
    tracing::debug!(
        host = %config.host,
        port = config.port,
        security = ?config.security,
        "Opening IMAP transport"
    );

    let open = async {
        let tcp = TcpStream::connect((config.host.as_str(), config.port)).await?;
        match config.security {
            Security::None => Ok(ImapStream::Plain(tcp)),
            Security::Implicit => {
                let name = ServerName::try_from(config.host.clone())?;
                let tls = tls_connector().connect(name, tcp).await?;
                Ok(ImapStream::Tls(Box::new(tls)))
            }
        }
    };

    tokio::time::timeout(config.connect_timeout, open)
        .await
        .map_err(|_| Error::Timeout(config.connect_timeout))?
}

fn tls_connector() -> TlsConnector {
    let roots = rustls::RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    let config = rustls::ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();
    TlsConnector::from(Arc::new(config))
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
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    fn local(port: u16) -> Config {
        Config::new("127.0.0.1").with_security(Security::None).with_port(port)
    }

    #[tokio::test]
    async fn test_plain_round_trip() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            socket.write_all(b"* OK hi\r\n").await.unwrap();
        });

        let mut stream = connect(&local(port)).await.unwrap();
        assert!(!stream.is_tls());
        let mut greeting = String::new();
        stream.read_to_string(&mut greeting).await.unwrap();
        assert_eq!(greeting, "* OK hi\r\n");
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_nobody_listening() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let err = connect(&local(port)).await.err().unwrap();
        assert!(err.is_transport());
    }

    #[test]
    fn test_tls_connector_builds() {
        let _ = tls_connector();
    }
}
