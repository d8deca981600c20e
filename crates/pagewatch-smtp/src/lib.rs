//! # pagewatch-smtp
//!
//! A small SMTP submission client implementing the subset of RFC 5321 that
//! an alerting tool needs: greet, secure the channel, authenticate, send one
//! message, quit.
//!
//! ## Features
//!
//! - **Type-state connection management**: invalid command orderings do not
//!   compile
//! - **TLS support**: implicit TLS (port 465) and STARTTLS (port 587)
//! - **Authentication**: AUTH PLAIN with an initial response
//! - **Transport-generic**: any `AsyncRead + AsyncWrite` stream can carry the
//!   session, which keeps the client testable without a server
//!
//! ## Quick Start
//!
//! ```ignore
//! use pagewatch_smtp::{Address, Client};
//! use pagewatch_smtp::connection::connect_tls;
//!
//! #[tokio::main]
//! async fn main() -> pagewatch_smtp::Result<()> {
//!     let stream = connect_tls("smtp.gmail.com", 465).await?;
//!     let client = Client::from_stream(stream).await?;
//!     let client = client.ehlo("localhost").await?;
//!     let client = client.auth_plain("me@example.com", "app-password").await?;
//!
//!     let client = client.mail_from(Address::new("me@example.com")?).await?;
//!     let client = client.rcpt_to(Address::new("you@example.com")?).await?;
//!     let client = client.data().await?;
//!     let client = client.send_message(b"Subject: Hi\r\n\r\nHello\r\n").await?;
//!
//!     client.quit().await
//! }
//! ```
//!
//! ## Connection States
//!
//! ```text
//! Connected ── auth_plain() ──→ Authenticated ── mail_from() ──→ MailTransaction
//!                                     ↑                                 │
//!                               send_message()                      rcpt_to()
//!                                     │                                 ↓
//!                                   Data ←────── data() ────── RecipientAdded
//! ```
//!
//! `quit()` is available in every state.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod command;
pub mod connection;
mod error;
pub mod parser;
pub mod types;

pub use connection::{
    Authenticated, Client, Connected, Data, MailTransaction, RecipientAdded, ServerInfo,
    SmtpStream,
};
pub use error::{Error, Result};
pub use types::{Address, AuthMechanism, Extension, Reply, ReplyCode};
