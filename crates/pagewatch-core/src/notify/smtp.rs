//! Alert delivery over SMTP.

use std::str::FromStr;
use std::time::Duration;

use chrono::Utc;
use pagewatch_smtp::connection::{connect, connect_tls};
use pagewatch_smtp::{Address, Client, SmtpStream};
use tokio::io::{AsyncRead, AsyncWrite};

use super::{AlertMessage, AlertTemplate, Notifier, NotifyError};

/// Name sent in EHLO.
const EHLO_NAME: &str = "localhost";

/// Security/encryption mode for the mail-submission session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Security {
    /// No encryption. Only for local relays and tests.
    None,
    /// Implicit TLS (connect directly with TLS).
    #[default]
    Tls,
    /// STARTTLS upgrade after plaintext connect.
    StartTls,
}

impl Security {
    /// Standard submission port for the mode.
    #[must_use]
    pub const fn default_port(self) -> u16 {
        match self {
            Self::None => 25,
            Self::StartTls => 587,
            Self::Tls => 465,
        }
    }
}

impl FromStr for Security {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "plain" => Ok(Self::None),
            "tls" | "ssl" | "implicit" => Ok(Self::Tls),
            "starttls" => Ok(Self::StartTls),
            other => Err(format!(
                "unknown SMTP security mode {other:?} (expected tls, starttls or none)"
            )),
        }
    }
}

/// SMTP server and account configuration.
#[derive(Clone, PartialEq, Eq)]
pub struct SmtpConfig {
    /// Server hostname.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Security mode.
    pub security: Security,
    /// Account identity, used for login and as the sender address.
    pub username: String,
    /// Account credential (an app password for Gmail).
    pub password: String,
    /// Address that receives alerts.
    pub recipient: String,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: "smtp.gmail.com".to_string(),
            port: Security::Tls.default_port(),
            security: Security::Tls,
            username: String::new(),
            password: String::new(),
            recipient: String::new(),
        }
    }
}

impl std::fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("security", &self.security)
            .field("username", &self.username)
            .field("password", &"****")
            .field("recipient", &self.recipient)
            .finish()
    }
}

/// Sends alerts through an authenticated SMTP submission session.
#[derive(Debug, Clone)]
pub struct SmtpNotifier {
    config: SmtpConfig,
    template: AlertTemplate,
    timeout: Duration,
}

impl SmtpNotifier {
    /// Creates a notifier. `timeout` bounds the whole session.
    #[must_use]
    pub const fn new(config: SmtpConfig, template: AlertTemplate, timeout: Duration) -> Self {
        Self {
            config,
            template,
            timeout,
        }
    }

    /// Renders the alert this notifier would send for `status`.
    #[must_use]
    pub fn message(&self, status: &str) -> AlertMessage {
        self.template
            .render(&self.config.username, &self.config.recipient, status)
    }

    async fn connect_and_deliver(
        &self,
        from: Address,
        to: Address,
        raw: &[u8],
    ) -> Result<(), NotifyError> {
        let SmtpConfig {
            host, port, security, ..
        } = &self.config;

        let stream = match security {
            Security::Tls => connect_tls(host, *port).await,
            Security::StartTls | Security::None => connect(host, *port).await,
        }
        .map_err(|e| NotifyError::Transport(format!("{host}:{port}: {e}")))?;

        self.deliver(stream, from, to, raw).await
    }

    /// Runs the SMTP dialogue for one rendered message over an established
    /// stream.
    pub(crate) async fn deliver<T>(
        &self,
        stream: SmtpStream<T>,
        from: Address,
        to: Address,
        raw: &[u8],
    ) -> Result<(), NotifyError>
    where
        T: AsyncRead + AsyncWrite + Unpin,
    {
        let transport = |e: pagewatch_smtp::Error| NotifyError::Transport(e.to_string());
        let unknown = |e: pagewatch_smtp::Error| NotifyError::Unknown(e.to_string());

        let client = Client::from_stream(stream).await.map_err(transport)?;
        let client = client.ehlo(EHLO_NAME).await.map_err(transport)?;
        let client = if self.config.security == Security::StartTls {
            client.starttls(&self.config.host).await.map_err(transport)?
        } else {
            client
        };

        let client = client
            .auth_plain(&self.config.username, &self.config.password)
            .await
            .map_err(|e| {
                if e.is_connection_error() {
                    NotifyError::Transport(e.to_string())
                } else {
                    NotifyError::Auth(e.to_string())
                }
            })?;

        let client = client.mail_from(from).await.map_err(unknown)?;
        let client = client.rcpt_to(to).await.map_err(unknown)?;
        let client = client.data().await.map_err(unknown)?;
        let client = client.send_message(raw).await.map_err(unknown)?;

        // The message is already accepted; a failed QUIT does not undo that
        if let Err(e) = client.quit().await {
            tracing::warn!(error = %e, "SMTP QUIT failed after message was accepted");
        }

        Ok(())
    }
}

/// Validates both envelope addresses before any connection is opened.
fn envelope(message: &AlertMessage) -> Result<(Address, Address), NotifyError> {
    let invalid =
        |role: &str, e: pagewatch_smtp::Error| NotifyError::Unknown(format!("{role}: {e}"));
    let from = Address::new(&message.from).map_err(|e| invalid("sender", e))?;
    let to = Address::new(&message.to).map_err(|e| invalid("recipient", e))?;
    Ok((from, to))
}

impl Notifier for SmtpNotifier {
    async fn notify(&self, status: &str) -> Result<(), NotifyError> {
        let message = self.message(status);
        let (from, to) = envelope(&message)?;
        let raw = message.to_rfc5322(Utc::now());

        tracing::info!(
            host = %self.config.host,
            port = self.config.port,
            recipient = %message.to,
            status,
            "Sending alert"
        );

        tokio::time::timeout(self.timeout, self.connect_and_deliver(from, to, raw.as_bytes()))
            .await
            .map_err(|_| {
                NotifyError::Transport(format!(
                    "SMTP session timed out after {:?}",
                    self.timeout
                ))
            })??;

        tracing::info!(recipient = %message.to, "Alert sent");
        Ok(())
    }
}
