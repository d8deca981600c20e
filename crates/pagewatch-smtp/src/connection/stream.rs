//! Low-level SMTP stream handling.

use crate::error::{Error, Result};
use rustls::pki_types::ServerName;
use std::io;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio_rustls::{
    TlsConnector,
    client::TlsStream,
    rustls::{ClientConfig, RootCertStore},
};

/// SMTP stream, plain or TLS, over any byte transport (TCP by default).
#[derive(Debug)]
pub enum SmtpStream<T = TcpStream> {
    /// Unencrypted transport.
    Plain(BufReader<T>),
    /// TLS-encrypted transport.
    Tls(Box<BufReader<TlsStream<T>>>),
}

impl<T> SmtpStream<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    /// Wraps an unencrypted transport.
    pub fn plain(io: T) -> Self {
        Self::Plain(BufReader::new(io))
    }

    /// Returns true once the session is encrypted.
    #[must_use]
    pub const fn is_tls(&self) -> bool {
        matches!(self, Self::Tls(_))
    }

    /// Reads one line, without its trailing CRLF.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails or the peer closed the connection.
    pub async fn read_line(&mut self) -> Result<String> {
        let mut line = String::new();
        let read = match self {
            Self::Plain(reader) => reader.read_line(&mut line).await?,
            Self::Tls(reader) => reader.read_line(&mut line).await?,
        };
        if read == 0 {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "server closed the connection",
            )));
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    /// Writes data to the stream and flushes it.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub async fn write_all(&mut self, data: &[u8]) -> Result<()> {
        match self {
            Self::Plain(reader) => {
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

    /// Upgrades a plain stream to TLS (after a `220` reply to STARTTLS).
    ///
    /// # Errors
    ///
    /// Returns an error if the stream is already encrypted, the hostname is
    /// not a valid server name, or the handshake fails.
    pub async fn upgrade_to_tls(self, hostname: &str) -> Result<Self> {
        let io = match self {
            Self::Plain(reader) => reader.into_inner(),
            Self::Tls(_) => return Err(Error::Protocol("Already using TLS".into())),
        };
        let tls = handshake(hostname, io).await?;
        Ok(Self::Tls(Box::new(BufReader::new(tls))))
    }
}

/// Connects to an SMTP server over plain TCP (port 25, or 587 before STARTTLS).
///
/// # Errors
///
/// Returns an error if the connection fails.
pub async fn connect(hostname: &str, port: u16) -> Result<SmtpStream> {
    let stream = TcpStream::connect((hostname, port)).await?;
    tracing::debug!(hostname, port, "SMTP TCP connection established");
    Ok(SmtpStream::plain(stream))
}

/// Connects to an SMTP server over implicit TLS (port 465).
///
/// # Errors
///
/// Returns an error if the connection or TLS handshake fails.
pub async fn connect_tls(hostname: &str, port: u16) -> Result<SmtpStream> {
    let stream = TcpStream::connect((hostname, port)).await?;
    let tls = handshake(hostname, stream).await?;
    tracing::debug!(hostname, port, "SMTP TLS connection established");
    Ok(SmtpStream::Tls(Box::new(BufReader::new(tls))))
}

async fn handshake<T>(hostname: &str, io: T) -> Result<TlsStream<T>>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    let server_name = ServerName::try_from(hostname.to_string())
        .map_err(|_| Error::Protocol(format!("Invalid hostname: {hostname}")))?;
    Ok(tls_connector().connect(server_name, io).await?)
}

/// Creates a TLS connector trusting the bundled Mozilla root certificates.
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
    use tokio_test::io::Builder;

    #[tokio::test]
    async fn read_line_strips_crlf() {
        let mock = Builder::new().read(b"220 ready\r\n").build();
        let mut stream = SmtpStream::plain(mock);
        assert_eq!(stream.read_line().await.unwrap(), "220 ready");
        assert!(!stream.is_tls());
    }

    #[tokio::test]
    async fn read_line_at_eof_is_an_error() {
        let mock = Builder::new().build();
        let mut stream = SmtpStream::plain(mock);
        let err = stream.read_line().await.unwrap_err();
        assert!(err.is_connection_error());
    }

    #[tokio::test]
    async fn write_all_passes_bytes_through() {
        let mock = Builder::new().write(b"QUIT\r\n").build();
        let mut stream = SmtpStream::plain(mock);
        stream.write_all(b"QUIT\r\n").await.unwrap();
    }
}
