//! Transport streams: plain TCP, implicit TLS, and in-place upgrade.

use crate::error::{Error, Result};
use rustls::pki_types::ServerName;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::{
    TlsConnector,
    rustls::{ClientConfig, RootCertStore},
};

/// Byte stream to the submission server (plain TCP or TLS).
#[derive(Debug)]
pub enum SmtpStream {
    /// Plain TCP connection.
    Tcp(BufReader<TcpStream>),
    /// TLS-encrypted connection.
    Tls(Box<BufReader<tokio_rustls::client::TlsStream<TcpStream>>>),
}

impl SmtpStream {
    /// Reads one CRLF-terminated line, with the trailing line ending
    /// removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    pub async fn read_line(&mut self) -> Result<String> {
        let mut line = String::new();
        let n = match self {
            Self::Tcp(reader) => reader.read_line(&mut line).await?,
            Self::Tls(reader) => reader.read_line(&mut line).await?,
        };
        if n == 0 {
            return Err(Error::Protocol("connection closed by server".into()));
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    /// Writes and flushes the given bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub async fn write_all(&mut self, data: &[u8]) -> Result<()> {
        match self {
            Self::Tcp(reader) => {
                reader.get_mut().write_all(data).await?;
                reader.get_mut().flush().await?;
            }
            Self::Tls(reader) => {
                reader.get_mut().write_all(data).await?;
                reader.get_mut().flush().await?;
            }
        }
        Ok(())
    }

    /// Wraps the plain stream in TLS after a STARTTLS exchange. The plain
    /// handle is consumed; only the encrypted stream remains reachable.
    ///
    /// # Errors
    ///
    /// Fails when the stream is already encrypted or the handshake (which
    /// includes certificate verification) does not complete.
    pub async fn upgrade_to_tls(self, hostname: &str) -> Result<Self> {
        let tcp = match self {
            Self::Tcp(reader) => reader.into_inner(),
            Self::Tls(_) => return Err(Error::Protocol("stream is already encrypted".into())),
        };

        let connector = tls_connector();
        let server_name = ServerName::try_from(hostname.to_string())
            .map_err(|_| Error::Protocol(format!("invalid server name: {hostname}")))?;

        let tls = connector.connect(server_name, tcp).await?;
        Ok(Self::Tls(Box::new(BufReader::new(tls))))
    }

    /// Returns true once the underlying stream is encrypted.
    #[must_use]
    pub const fn is_tls(&self) -> bool {
        matches!(self, Self::Tls(_))
    }
}

/// Opens a plain TCP connection, bounded by `connect_timeout`.
///
/// # Errors
///
/// Returns an error on connection failure or timeout.
pub async fn connect(host: &str, port: u16, connect_timeout: Duration) -> Result<SmtpStream> {
    let addr = format!("{host}:{port}");
    let tcp = timeout(connect_timeout, TcpStream::connect(&addr))
        .await
        .map_err(|_| Error::Timeout(connect_timeout))??;
    Ok(SmtpStream::Tcp(BufReader::new(tcp)))
}

/// Opens an implicit-TLS connection (TLS from the first byte), bounded by
/// `connect_timeout` across both the TCP connect and the handshake.
///
/// # Errors
///
/// Returns an error on connection failure, handshake failure, or timeout.
pub async fn connect_tls(host: &str, port: u16, connect_timeout: Duration) -> Result<SmtpStream> {
    let addr = format!("{host}:{port}");
    let server_name = ServerName::try_from(host.to_string())
        .map_err(|_| Error::Protocol(format!("invalid server name: {host}")))?;

    let stream = timeout(connect_timeout, async {
        let tcp = TcpStream::connect(&addr).await?;
        let tls = tls_connector().connect(server_name, tcp).await?;
        Ok::<_, Error>(tls)
    })
    .await
    .map_err(|_| Error::Timeout(connect_timeout))??;

    Ok(SmtpStream::Tls(Box::new(BufReader::new(stream))))
}

/// Builds the TLS connector: webpki roots, certificate verification on.
fn tls_connector() -> TlsConnector {
    let root_store = RootCertStore {
        roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
    };

    let config = ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    TlsConnector::from(Arc::new(config))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn connect_reaches_local_listener() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let stream = connect("127.0.0.1", port, Duration::from_secs(5))
            .await
            .unwrap();
        assert!(!stream.is_tls());
    }
}
