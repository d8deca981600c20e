//! Type-state SMTP client.

use super::{ServerInfo, SmtpStream};
use crate::command::Command;
use crate::error::{Error, Result};
use crate::parser::{is_last_reply_line, parse_reply};
use crate::types::{Address, AuthMechanism, Extension, Reply, ReplyCode};
use base64::Engine;
use std::collections::HashSet;
use std::marker::PhantomData;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

/// Type-state marker: greeted, not yet authenticated.
#[derive(Debug)]
pub struct Connected;

/// Type-state marker: authenticated, ready for a transaction.
#[derive(Debug)]
pub struct Authenticated;

/// Type-state marker: `MAIL FROM` accepted.
#[derive(Debug)]
pub struct MailTransaction;

/// Type-state marker: at least one recipient accepted.
#[derive(Debug)]
pub struct RecipientAdded;

/// Type-state marker: server waiting for message content.
#[derive(Debug)]
pub struct Data;

/// SMTP client with type-state pattern.
#[derive(Debug)]
pub struct Client<State, T = TcpStream> {
    stream: SmtpStream<T>,
    server_info: ServerInfo,
    client_name: String,
    _state: PhantomData<State>,
}

impl<T> Client<Connected, T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    /// Creates a client from a stream and reads the server greeting.
    ///
    /// # Errors
    ///
    /// Returns an error if reading the greeting fails or the server refuses
    /// the session.
    pub async fn from_stream(mut stream: SmtpStream<T>) -> Result<Self> {
        let greeting = read_reply(&mut stream).await?;
        expect_success(&greeting)?;

        let hostname = greeting
            .message
            .first()
            .and_then(|msg| msg.split_whitespace().next())
            .unwrap_or("unknown")
            .to_string();
        tracing::debug!(%hostname, "SMTP greeting received");

        Ok(Self {
            stream,
            server_info: ServerInfo {
                hostname,
                extensions: HashSet::new(),
            },
            client_name: String::from("localhost"),
            _state: PhantomData,
        })
    }

    /// Sends EHLO and records the advertised extensions.
    ///
    /// # Errors
    ///
    /// Returns an error if the EHLO command fails.
    pub async fn ehlo(mut self, client_name: &str) -> Result<Self> {
        client_name.clone_into(&mut self.client_name);
        self.refresh_extensions().await?;
        Ok(self)
    }

    /// Upgrades the connection with STARTTLS and repeats EHLO.
    ///
    /// # Errors
    ///
    /// Returns an error if STARTTLS is not advertised, the server refuses it,
    /// or the TLS handshake fails.
    pub async fn starttls(mut self, server_hostname: &str) -> Result<Self> {
        if !self.server_info.supports_starttls() {
            return Err(Error::NotSupported("STARTTLS".into()));
        }

        let reply = self.send_command(Command::StartTls).await?;
        expect_success(&reply)?;

        self.stream = self.stream.upgrade_to_tls(server_hostname).await?;
        tracing::debug!(server_hostname, "STARTTLS upgrade complete");

        // RFC 3207: capabilities must be rediscovered after the upgrade
        self.refresh_extensions().await?;
        Ok(self)
    }

    /// Authenticates using the PLAIN mechanism with an initial response.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SmtpError`] carrying the server code (typically 535)
    /// if the credentials are rejected.
    pub async fn auth_plain(
        mut self,
        username: &str,
        password: &str,
    ) -> Result<Client<Authenticated, T>> {
        let credentials = format!("\0{username}\0{password}");
        let encoded = base64::engine::general_purpose::STANDARD.encode(credentials.as_bytes());

        let reply = self
            .send_command(Command::Auth {
                mechanism: AuthMechanism::Plain,
                initial_response: Some(encoded),
            })
            .await?;
        expect_success(&reply)?;

        tracing::debug!(username, "SMTP authentication accepted");
        Ok(self.transition())
    }

    async fn refresh_extensions(&mut self) -> Result<()> {
        let reply = self
            .send_command(Command::Ehlo {
                hostname: self.client_name.clone(),
            })
            .await?;
        expect_success(&reply)?;

        // First line is the server's hello, the rest are extension keywords
        self.server_info.extensions = reply
            .message
            .iter()
            .skip(1)
            .map(|line| Extension::parse(line))
            .collect();
        Ok(())
    }
}

impl<T> Client<Authenticated, T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    /// Starts a mail transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the MAIL FROM command is rejected.
    pub async fn mail_from(mut self, from: Address) -> Result<Client<MailTransaction, T>> {
        let reply = self.send_command(Command::MailFrom { from }).await?;
        expect_success(&reply)?;
        Ok(self.transition())
    }
}

impl<T> Client<MailTransaction, T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    /// Adds the first recipient to the transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the RCPT TO command is rejected.
    pub async fn rcpt_to(mut self, to: Address) -> Result<Client<RecipientAdded, T>> {
        let reply = self.send_command(Command::RcptTo { to }).await?;
        expect_success(&reply)?;
        Ok(self.transition())
    }
}

impl<T> Client<RecipientAdded, T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    /// Adds another recipient to the transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the RCPT TO command is rejected.
    pub async fn rcpt_to(mut self, to: Address) -> Result<Self> {
        let reply = self.send_command(Command::RcptTo { to }).await?;
        expect_success(&reply)?;
        Ok(self)
    }

    /// Begins sending message data.
    ///
    /// # Errors
    ///
    /// Returns an error unless the server answers `354`.
    pub async fn data(mut self) -> Result<Client<Data, T>> {
        let reply = self.send_command(Command::Data).await?;
        if reply.code != ReplyCode::START_DATA {
            return Err(Error::smtp_error(reply.code.as_u16(), reply.message_text()));
        }
        Ok(self.transition())
    }
}

impl<T> Client<Data, T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    /// Sends the RFC 5322 message and completes the transaction.
    ///
    /// Line endings are normalized to CRLF, lines starting with `.` are
    /// dot-stuffed, and the terminating `.` line is appended.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails or the server rejects the message.
    pub async fn send_message(mut self, message: &[u8]) -> Result<Client<Authenticated, T>> {
        if let Some(limit) = self.server_info.max_message_size()
            && limit > 0
            && message.len() > limit
        {
            return Err(Error::Protocol(format!(
                "message of {} bytes exceeds server limit of {limit}",
                message.len()
            )));
        }

        self.stream.write_all(&encode_data(message)).await?;

        let reply = read_reply(&mut self.stream).await?;
        expect_success(&reply)?;
        Ok(self.transition())
    }
}

// Common implementation for all states
impl<S, T> Client<S, T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    /// Returns what the server advertised.
    pub const fn server_info(&self) -> &ServerInfo {
        &self.server_info
    }

    /// Sends QUIT and closes the session (available in any state).
    ///
    /// # Errors
    ///
    /// Returns an error if the QUIT command fails.
    pub async fn quit(mut self) -> Result<()> {
        let reply = self.send_command(Command::Quit).await?;
        if !reply.is_success() && reply.code != ReplyCode::CLOSING {
            return Err(Error::smtp_error(reply.code.as_u16(), reply.message_text()));
        }
        Ok(())
    }

    async fn send_command(&mut self, cmd: Command) -> Result<Reply> {
        tracing::trace!(command = %cmd.redacted(), "SMTP >");
        self.stream.write_all(&cmd.serialize()).await?;
        let reply = read_reply(&mut self.stream).await?;
        tracing::trace!(code = %reply.code, "SMTP <");
        Ok(reply)
    }

    fn transition<N>(self) -> Client<N, T> {
        Client {
            stream: self.stream,
            server_info: self.server_info,
            client_name: self.client_name,
            _state: PhantomData,
        }
    }
}

async fn read_reply<T>(stream: &mut SmtpStream<T>) -> Result<Reply>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    let mut lines = Vec::new();
    loop {
        let line = stream.read_line().await?;
        if line.is_empty() {
            continue;
        }

        let is_last = is_last_reply_line(&line);
        lines.push(line);

        if is_last {
            break;
        }
    }

    parse_reply(&lines)
}

fn expect_success(reply: &Reply) -> Result<()> {
    if reply.is_success() {
        Ok(())
    } else {
        Err(Error::smtp_error(reply.code.as_u16(), reply.message_text()))
    }
}

/// Builds the DATA payload: CRLF lines, dot-stuffing, terminator.
fn encode_data(message: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(message.len() + 16);
    let body = message.strip_suffix(b"\n").unwrap_or(message);
    let body = body.strip_suffix(b"\r").unwrap_or(body);

    for line in body.split(|&b| b == b'\n') {
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        if line.first() == Some(&b'.') {
            out.push(b'.');
        }
        out.extend_from_slice(line);
        out.extend_from_slice(b"\r\n");
    }

    out.extend_from_slice(b".\r\n");
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tokio_test::io::{Builder, Mock};

    const GREETING: &[u8] = b"220 smtp.example.com ESMTP ready\r\n";
    const EHLO_REPLY: &[u8] =
        b"250-smtp.example.com at your service\r\n250-SIZE 35882577\r\n250-AUTH LOGIN PLAIN\r\n250 8BITMIME\r\n";
    // base64("\0bot@example.com\0secret")
    const AUTH_LINE: &[u8] = b"AUTH PLAIN AGJvdEBleGFtcGxlLmNvbQBzZWNyZXQ=\r\n";

    fn session(builder: &mut Builder) -> SmtpStream<Mock> {
        SmtpStream::plain(builder.build())
    }

    #[test]
    fn encode_data_normalizes_and_stuffs() {
        let encoded = encode_data(b"Subject: x\n\n.hidden\r\nlast\n");
        assert_eq!(encoded, b"Subject: x\r\n\r\n..hidden\r\nlast\r\n.\r\n");
    }

    #[test]
    fn encode_data_without_trailing_newline() {
        assert_eq!(encode_data(b"body"), b"body\r\n.\r\n");
    }

    #[tokio::test]
    async fn full_submission() {
        let stream = session(
            Builder::new()
                .read(GREETING)
                .write(b"EHLO localhost\r\n")
                .read(EHLO_REPLY)
                .write(AUTH_LINE)
                .read(b"235 2.7.0 Accepted\r\n")
                .write(b"MAIL FROM:<bot@example.com>\r\n")
                .read(b"250 2.1.0 OK\r\n")
                .write(b"RCPT TO:<me@example.com>\r\n")
                .read(b"250 2.1.5 OK\r\n")
                .write(b"DATA\r\n")
                .read(b"354 Go ahead\r\n")
                .write(b"Subject: live\r\n\r\nhello\r\n.\r\n")
                .read(b"250 2.0.0 OK queued\r\n")
                .write(b"QUIT\r\n")
                .read(b"221 2.0.0 closing connection\r\n"),
        );

        let client = Client::from_stream(stream).await.unwrap();
        assert_eq!(client.server_info().hostname, "smtp.example.com");

        let client = client.ehlo("localhost").await.unwrap();
        assert_eq!(client.server_info().max_message_size(), Some(35_882_577));
        assert!(
            client
                .server_info()
                .auth_mechanisms()
                .contains(&AuthMechanism::Plain)
        );
        assert!(!client.server_info().supports_starttls());

        let client = client.auth_plain("bot@example.com", "secret").await.unwrap();
        let client = client
            .mail_from(Address::new("bot@example.com").unwrap())
            .await
            .unwrap();
        let client = client
            .rcpt_to(Address::new("me@example.com").unwrap())
            .await
            .unwrap();
        let client = client.data().await.unwrap();
        let client = client
            .send_message(b"Subject: live\r\n\r\nhello\r\n")
            .await
            .unwrap();
        client.quit().await.unwrap();
    }

    #[tokio::test]
    async fn rejected_credentials_carry_the_code() {
        let stream = session(
            Builder::new()
                .read(GREETING)
                .write(b"EHLO localhost\r\n")
                .read(EHLO_REPLY)
                .write(AUTH_LINE)
                .read(b"535-5.7.8 Username and Password not accepted.\r\n535 5.7.8 Learn more\r\n"),
        );

        let client = Client::from_stream(stream).await.unwrap();
        let client = client.ehlo("localhost").await.unwrap();
        let err = client
            .auth_plain("bot@example.com", "secret")
            .await
            .unwrap_err();

        assert_eq!(err.reply_code(), Some(535));
        assert!(err.to_string().contains("Username and Password not accepted"));
    }

    #[tokio::test]
    async fn refused_greeting() {
        let stream = session(Builder::new().read(b"554 no service for you\r\n"));
        let err = Client::from_stream(stream).await.unwrap_err();
        assert_eq!(err.reply_code(), Some(554));
    }

    #[tokio::test]
    async fn starttls_requires_advertisement() {
        let stream = session(
            Builder::new()
                .read(GREETING)
                .write(b"EHLO localhost\r\n")
                .read(EHLO_REPLY),
        );
        let client = Client::from_stream(stream).await.unwrap();
        let client = client.ehlo("localhost").await.unwrap();
        let err = client.starttls("smtp.example.com").await.unwrap_err();
        assert!(matches!(err, Error::NotSupported(_)));
    }

    #[tokio::test]
    async fn rejected_recipient() {
        let stream = session(
            Builder::new()
                .read(GREETING)
                .write(b"EHLO localhost\r\n")
                .read(EHLO_REPLY)
                .write(AUTH_LINE)
                .read(b"235 2.7.0 Accepted\r\n")
                .write(b"MAIL FROM:<bot@example.com>\r\n")
                .read(b"250 OK\r\n")
                .write(b"RCPT TO:<nobody@example.com>\r\n")
                .read(b"550 5.1.1 No such user\r\n"),
        );

        let client = Client::from_stream(stream).await.unwrap();
        let client = client.ehlo("localhost").await.unwrap();
        let client = client.auth_plain("bot@example.com", "secret").await.unwrap();
        let client = client
            .mail_from(Address::new("bot@example.com").unwrap())
            .await
            .unwrap();
        let err = client
            .rcpt_to(Address::new("nobody@example.com").unwrap())
            .await
            .unwrap_err();
        assert_eq!(err.reply_code(), Some(550));
    }
}
