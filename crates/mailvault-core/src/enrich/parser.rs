//! Raw message parsing.
//!
//! The bridge only depends on [`MessageParser`]; [`MailParser`] is the default
//! implementation on top of `mailparse`.

use chrono::{DateTime, Utc};
use mailparse::{DispositionType, MailAddr, MailHeaderMap, ParsedMail};
use serde::{Deserialize, Serialize};

/// Errors produced while parsing raw message bytes.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// The file holds no message at all.
    #[error("message is empty")]
    Empty,

    /// The MIME structure could not be parsed.
    #[error("malformed message: {0}")]
    Malformed(#[from] mailparse::MailParseError),
}

/// Metadata of one attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    /// Suggested file name (`unnamed` when the part has none).
    pub filename: String,
    /// MIME type, lowercased.
    pub content_type: String,
    /// Decoded size in bytes.
    pub size: usize,
}

/// Structured view of a raw message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedMessage {
    /// Decoded Subject header.
    pub subject: String,
    /// First sender address.
    pub from: String,
    /// Every To address, comma separated.
    pub to: String,
    /// Date header, if present and parseable.
    pub date: Option<DateTime<Utc>>,
    /// First `text/plain` body.
    pub text: Option<String>,
    /// First `text/html` body.
    pub html: Option<String>,
    /// Attachment metadata in MIME order.
    pub attachments: Vec<Attachment>,
}

/// Turns raw message bytes into a [`ParsedMessage`].
pub trait MessageParser: Send + Sync {
    /// Parses one message.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] if the bytes are not a usable message.
    fn parse(&self, raw: &[u8]) -> Result<ParsedMessage, ParseError>;
}

/// [`MessageParser`] backed by the `mailparse` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct MailParser;

impl MessageParser for MailParser {
    fn parse(&self, raw: &[u8]) -> Result<ParsedMessage, ParseError> {
        if raw.iter().all(u8::is_ascii_whitespace) {
            return Err(ParseError::Empty);
        }

        let parsed = mailparse::parse_mail(raw)?;
        let headers = &parsed.headers;

        let subject = headers
            .get_first_value("Subject")
            .map(|s| s.trim().to_string())
            .unwrap_or_default();
        let from = headers
            .get_first_header("From")
            .map(|header| {
                mailparse::addrparse_header(header).map_or_else(
                    |_| header.get_value().trim().to_string(),
                    |list| list.iter().next().map(format_addr).unwrap_or_default(),
                )
            })
            .unwrap_or_default();
        let to = headers
            .get_all_headers("To")
            .into_iter()
            .flat_map(|header| match mailparse::addrparse_header(header) {
                Ok(list) => list.iter().map(format_addr).collect::<Vec<_>>(),
                Err(_) => vec![header.get_value().trim().to_string()],
            })
            .filter(|addr| !addr.is_empty())
            .collect::<Vec<_>>()
            .join(", ");
        let date = headers
            .get_first_value("Date")
            .and_then(|value| mailparse::dateparse(&value).ok())
            .and_then(|ts| DateTime::from_timestamp(ts, 0));

        let mut text = None;
        let mut html = None;
        let mut attachments = Vec::new();
        collect_parts(&parsed, &mut text, &mut html, &mut attachments)?;

        Ok(ParsedMessage {
            subject,
            from,
            to,
            date,
            text,
            html,
            attachments,
        })
    }
}

fn format_addr(addr: &MailAddr) -> String {
    match addr {
        MailAddr::Single(info) => match &info.display_name {
            Some(name) if !name.is_empty() => format!("{name} <{}>", info.addr),
            _ => info.addr.clone(),
        },
        MailAddr::Group(group) => {
            let members: Vec<_> = group.addrs.iter().map(|info| info.addr.as_str()).collect();
            format!("{}: {}", group.group_name, members.join(", "))
        }
    }
}

fn collect_parts(
    part: &ParsedMail<'_>,
    text: &mut Option<String>,
    html: &mut Option<String>,
    attachments: &mut Vec<Attachment>,
) -> Result<(), ParseError> {
    if !part.subparts.is_empty() {
        for sub in &part.subparts {
            collect_parts(sub, text, html, attachments)?;
        }
        return Ok(());
    }

    let mimetype = part.ctype.mimetype.to_lowercase();
    let disposition = part.get_content_disposition();
    let filename = disposition
        .params
        .get("filename")
        .or_else(|| part.ctype.params.get("name"))
        .cloned();

    if matches!(disposition.disposition, DispositionType::Attachment) || filename.is_some() {
        attachments.push(Attachment {
            filename: filename.unwrap_or_else(|| "unnamed".to_string()),
            content_type: mimetype,
            size: part.get_body_raw()?.len(),
        });
        return Ok(());
    }

    match mimetype.as_str() {
        "text/plain" if text.is_none() => *text = Some(part.get_body()?),
        "text/html" if html.is_none() => *html = Some(part.get_body()?),
        _ => {}
    }
    Ok(())
}
