//! SMTP reply parser.

use crate::error::{Error, Result};
use crate::types::{Reply, ReplyCode};

/// Parses an SMTP reply from its response lines (CRLF already stripped).
///
/// Continuation lines use `-` after the code, the final line uses a space:
/// `250-smtp.gmail.com at your service` … `250 SMTPUTF8`.
///
/// # Errors
///
/// Returns [`Error::Protocol`] if the reply is empty, a code is not three
/// digits, or the lines disagree on the code.
pub fn parse_reply(lines: &[String]) -> Result<Reply> {
    let Some(first) = lines.first() else {
        return Err(Error::Protocol("Empty reply".into()));
    };

    let code = parse_code(first)?;
    let mut message = Vec::with_capacity(lines.len());

    for line in lines {
        if parse_code(line)? != code {
            return Err(Error::Protocol(format!(
                "Reply code changed mid-reply: {line}"
            )));
        }
        let text = if line.len() == 3 {
            ""
        } else {
            line.get(4..)
                .ok_or_else(|| Error::Protocol(format!("Malformed reply line: {line}")))?
        };
        message.push(text.to_string());
    }

    Ok(Reply::new(ReplyCode::new(code), message))
}

/// Returns true if `line` is the final line of a (possibly multi-line) reply.
#[must_use]
pub fn is_last_reply_line(line: &str) -> bool {
    line.len() == 3 || (line.len() >= 4 && line.as_bytes()[3] == b' ')
}

fn parse_code(line: &str) -> Result<u16> {
    let digits = line
        .get(0..3)
        .filter(|d| d.bytes().all(|b| b.is_ascii_digit()))
        .ok_or_else(|| Error::Protocol(format!("Invalid reply line: {line}")))?;

    digits
        .parse::<u16>()
        .map_err(|_| Error::Protocol(format!("Invalid reply code: {digits}")))
}
