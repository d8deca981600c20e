//! End-to-end check cycles against local HTTP and SMTP servers.
//!
//! Both servers are scripted on loopback listeners so the real `reqwest`
//! page source and the real SMTP notifier are exercised without touching
//! the network.

#![allow(clippy::unwrap_used)]

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use pagewatch_core::{
    AlertTemplate, Decision, Error, FetchError, HttpPageSource, MatchRules, Monitor, Notifier,
    NotifyError, Outcome, PageClassifier, PageSource, Security, SmtpConfig, SmtpNotifier,
};

const TIMEOUT: Duration = Duration::from_secs(5);

/// Serves canned pages. Every response closes its connection.
async fn spawn_http() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            tokio::spawn(async move {
                let (read, mut write) = stream.into_split();
                let mut read = BufReader::new(read);

                let mut request_line = String::new();
                read.read_line(&mut request_line).await.unwrap();
                let mut header = String::new();
                loop {
                    header.clear();
                    read.read_line(&mut header).await.unwrap();
                    if header == "\r\n" || header.is_empty() {
                        break;
                    }
                }

                let path = request_line.split_whitespace().nth(1).unwrap_or("/");
                let response = route(path);
                write.write_all(response.as_bytes()).await.unwrap();
                write.shutdown().await.unwrap();
            });
        }
    });

    addr
}

fn route(path: &str) -> String {
    let (status, extra, body) = match path {
        "/WRB2526/" => (
            "302 Found",
            "Location: /Login.aspx?ReturnUrl=/WRB2526/\r\n",
            String::new(),
        ),
        "/Login.aspx?ReturnUrl=/WRB2526/" => {
            ("200 OK", "", "<h2>Please log in</h2>".to_string())
        }
        "/offline/" => (
            "200 OK",
            "",
            r#"<span class="BannerTitle">Application Unavailable</span>"#.to_string(),
        ),
        "/live/" => (
            "200 OK",
            "",
            "<td>Web Room Booking System 2025/26</td><label>Preferred Start</label>".to_string(),
        ),
        _ => ("503 Service Unavailable", "", "down".to_string()),
    };

    format!(
        "HTTP/1.1 {status}\r\n{extra}Content-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    )
}

/// Accepts one SMTP session and returns the DATA payload it received.
async fn spawn_smtp(auth_reply: &'static str) -> (SocketAddr, JoinHandle<Option<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let (read, mut write) = stream.into_split();
        let mut read = BufReader::new(read);
        let mut data = None;

        write.write_all(b"220 relay.test ESMTP\r\n").await.unwrap();
        loop {
            let mut line = String::new();
            if read.read_line(&mut line).await.unwrap() == 0 {
                break;
            }
            let verb = line.split_whitespace().next().unwrap_or("").to_ascii_uppercase();
            let reply = match verb.as_str() {
                "EHLO" => "250-relay.test\r\n250 AUTH PLAIN LOGIN\r\n",
                "AUTH" => auth_reply,
                "MAIL" | "RCPT" => "250 OK\r\n",
                "DATA" => {
                    write.write_all(b"354 End data with <CR><LF>.<CR><LF>\r\n").await.unwrap();
                    let mut payload = String::new();
                    loop {
                        let mut body_line = String::new();
                        read.read_line(&mut body_line).await.unwrap();
                        if body_line == ".\r\n" {
                            break;
                        }
                        payload.push_str(&body_line);
                    }
                    data = Some(payload);
                    "250 OK queued\r\n"
                }
                "QUIT" => {
                    write.write_all(b"221 bye\r\n").await.unwrap();
                    break;
                }
                _ => "502 not implemented\r\n",
            };
            write.write_all(reply.as_bytes()).await.unwrap();
        }
        data
    });

    (addr, handle)
}

fn source(addr: SocketAddr, path: &str) -> HttpPageSource {
    HttpPageSource::new(format!("http://{addr}{path}"), TIMEOUT).unwrap()
}

fn notifier(addr: SocketAddr) -> SmtpNotifier {
    SmtpNotifier::new(
        SmtpConfig {
            host: addr.ip().to_string(),
            port: addr.port(),
            security: Security::None,
            username: "bot@example.com".to_string(),
            password: "app-password".to_string(),
            recipient: "me@example.com".to_string(),
        },
        AlertTemplate::default(),
        TIMEOUT,
    )
}

#[tokio::test]
async fn http_source_follows_redirects_to_the_login_page() {
    let http = spawn_http().await;
    let snapshot = source(http, "/WRB2526/").fetch().await.unwrap();

    assert!(snapshot.final_url().ends_with("/Login.aspx?ReturnUrl=/WRB2526/"));
    assert_eq!(snapshot.body(), "<h2>Please log in</h2>");
    assert_eq!(
        PageClassifier::default().classify(&snapshot),
        Decision::LoginRedirect
    );
}

#[tokio::test]
async fn http_source_treats_error_status_as_fatal() {
    let http = spawn_http().await;
    let err = source(http, "/maintenance/").fetch().await.unwrap_err();
    assert!(matches!(err, FetchError::Status { status: 503, .. }), "{err:?}");
}

#[tokio::test]
async fn live_page_sends_one_alert_over_smtp() {
    let http = spawn_http().await;
    let (smtp, session) = spawn_smtp("235 2.7.0 Accepted\r\n").await;

    let monitor = Monitor::new(
        PageClassifier::default(),
        source(http, "/live/"),
        notifier(smtp),
    );
    let outcome = monitor.run_once().await.unwrap();
    assert_eq!(
        outcome,
        Outcome::Notified {
            decision: Decision::BookingDetected,
            status: "Booking form detected".to_string(),
        }
    );

    let data = session.await.unwrap().unwrap();
    assert!(data.contains("From: bot@example.com\r\n"));
    assert!(data.contains("To: me@example.com\r\n"));
    assert!(data.contains("Subject: Warwick WRB 25/26 is LIVE!\r\n"));
    assert!(data.contains("(status: Booking form detected)."));
    assert!(data.contains("https://abs.warwick.ac.uk/WRB2526/\r\n"));
}

#[tokio::test]
async fn rejected_credentials_surface_as_auth_error() {
    let (smtp, _session) = spawn_smtp("535 5.7.8 Username and Password not accepted\r\n").await;

    let err = notifier(smtp).notify("Booking form detected").await.unwrap_err();
    assert!(matches!(err, NotifyError::Auth(_)), "{err:?}");
}

#[tokio::test]
async fn offline_page_never_contacts_the_mail_server() {
    let http = spawn_http().await;

    // Nothing listens here; any delivery attempt would fail the cycle
    let unreachable: SocketAddr = "127.0.0.1:9".parse().unwrap();
    let monitor = Monitor::new(
        PageClassifier::new(MatchRules::default()),
        source(http, "/offline/"),
        notifier(unreachable),
    );

    assert_eq!(
        monitor.run_once().await.unwrap(),
        Outcome::Printed("Still unavailable.".to_string())
    );
}

#[tokio::test]
async fn fetch_failure_ends_the_cycle() {
    let http = spawn_http().await;
    let unreachable: SocketAddr = "127.0.0.1:9".parse().unwrap();
    let monitor = Monitor::new(
        PageClassifier::default(),
        source(http, "/gone/"),
        notifier(unreachable),
    );

    let err = monitor.run_once().await.unwrap_err();
    assert!(matches!(err, Error::Fetch(_)), "{err:?}");
}
