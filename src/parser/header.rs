//! RFC 5322 header block handling: unfolding, encoded-words (RFC 2047), dates.

use base64::Engine as _;
use chrono::{DateTime, Utc};
use tracing::warn;

use crate::model::address::Address;
use crate::model::message::{Envelope, HeaderFields};

/// The header block of a raw message: everything before the first blank line.
pub fn header_block(raw: &[u8]) -> &[u8] {
    for (i, window) in raw.windows(2).enumerate() {
        if window == b"\n\n" {
            return &raw[..i + 1];
        }
        if window == b"\r\n" && raw[i + 2..].starts_with(b"\r\n") {
            return &raw[..i + 2];
        }
    }
    raw
}

/// Parse a raw header block into ordered fields with decoded values.
pub fn parse_header_fields(block: &[u8]) -> HeaderFields {
    let text = decode_header_bytes(block);
    let fields = unfold_headers(&text)
        .into_iter()
        .map(|(name, value)| {
            let value = decode_encoded_words(&value);
            (name, value)
        })
        .collect();
    HeaderFields::new(fields)
}

/// Build the envelope from already-decoded header fields.
pub fn parse_envelope(headers: &HeaderFields) -> Envelope {
    Envelope {
        date: parse_date(headers.get("date")),
        subject: headers.get("subject").to_string(),
        from: Address::parse_list(headers.get("from")),
        to: Address::parse_list(headers.get("to")),
        cc: Address::parse_list(headers.get("cc")),
        bcc: Address::parse_list(headers.get("bcc")),
    }
}

/// UTF-8 when valid, Windows-1252 otherwise (which accepts every byte).
fn decode_header_bytes(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            decoded.into_owned()
        }
    }
}

/// Join continuation lines onto their field. Names keep their source casing.
fn unfold_headers(text: &str) -> Vec<(String, String)> {
    let mut fields: Vec<(String, String)> = Vec::new();

    for line in text.lines() {
        if line.starts_with(' ') || line.starts_with('\t') {
            if let Some(last) = fields.last_mut() {
                last.1.push(' ');
                last.1.push_str(line.trim());
            }
        } else if let Some((name, value)) = line.split_once(':') {
            fields.push((name.trim().to_string(), value.trim().to_string()));
        }
    }

    fields
}

/// Decode RFC 2047 encoded-words in a header value.
///
/// Whitespace between two adjacent encoded-words is dropped (RFC 2047 §6.2).
/// Words that fail to decode are kept verbatim.
pub fn decode_encoded_words(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    let mut after_word = false;

    while let Some(start) = rest.find("=?") {
        let gap = &rest[..start];
        if !(after_word && gap.trim().is_empty()) {
            out.push_str(gap);
        }

        match decode_one_word(&rest[start + 2..]) {
            Some((text, consumed)) => {
                out.push_str(&text);
                rest = &rest[start + 2 + consumed..];
                after_word = true;
            }
            None => {
                out.push_str("=?");
                rest = &rest[start + 2..];
                after_word = false;
            }
        }
    }

    out.push_str(rest);
    out
}

/// Decode `charset?enc?text?=`, returning the text and the bytes consumed.
fn decode_one_word(s: &str) -> Option<(String, usize)> {
    let (charset, rest) = s.split_once('?')?;
    let (encoding, rest) = rest.split_once('?')?;
    let end = rest.find("?=")?;
    let payload = &rest[..end];
    let consumed = charset.len() + encoding.len() + end + 4;

    let bytes = match encoding {
        "B" | "b" => base64::engine::general_purpose::STANDARD_NO_PAD
            .decode(payload.trim_end_matches('='))
            .ok()?,
        "Q" | "q" => decode_q(payload),
        _ => return None,
    };

    Some((decode_charset(charset, &bytes), consumed))
}

/// Q-encoding: `_` is a space, `=XX` is a byte.
fn decode_q(input: &str) -> Vec<u8> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'_' => out.push(b' '),
            b'=' if i + 2 < bytes.len() => {
                let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
                match hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                    Some(b) => {
                        out.push(b);
                        i += 3;
                        continue;
                    }
                    None => out.push(b'='),
                }
            }
            b => out.push(b),
        }
        i += 1;
    }
    out
}

/// Decode bytes with a named charset, falling back to lossy UTF-8.
pub fn decode_charset(charset: &str, bytes: &[u8]) -> String {
    match encoding_rs::Encoding::for_label(charset.trim().as_bytes()) {
        Some(encoding) => encoding.decode(bytes).0.into_owned(),
        None => {
            warn!(charset, "Unknown charset, falling back to UTF-8 lossy");
            String::from_utf8_lossy(bytes).into_owned()
        }
    }
}

/// Parse a `Date:` value. RFC 2822 first, then common broken variants.
pub fn parse_date(date_str: &str) -> Option<DateTime<Utc>> {
    let trimmed = date_str.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc2822(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(&replace_named_tz(trimmed)) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Some(dt) = mail_parser_date(trimmed) {
        return Some(dt);
    }

    warn!(date = trimmed, "Could not parse date");
    None
}

/// Last resort: let `mail-parser` have a go at it.
fn mail_parser_date(input: &str) -> Option<DateTime<Utc>> {
    let fake_msg = format!("Date: {input}\n\n");
    let parsed = mail_parser::MessageParser::default().parse(fake_msg.as_bytes())?;
    let dt = parsed.date()?.to_rfc3339();
    DateTime::parse_from_rfc3339(&dt)
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

/// Swap a trailing timezone abbreviation for its numeric offset.
fn replace_named_tz(s: &str) -> String {
    const ZONES: [(&str, &str); 11] = [
        ("EST", "-0500"),
        ("EDT", "-0400"),
        ("CST", "-0600"),
        ("CDT", "-0500"),
        ("PST", "-0800"),
        ("PDT", "-0700"),
        ("GMT", "+0000"),
        ("UTC", "+0000"),
        ("CEST", "+0200"),
        ("CET", "+0100"),
        ("JST", "+0900"),
    ];
    for (name, offset) in ZONES {
        if let Some(head) = s.strip_suffix(name) {
            return format!("{head}{offset}");
        }
    }
    s.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_block_lf_and_crlf() {
        assert_eq!(header_block(b"A: 1\nB: 2\n\nbody"), b"A: 1\nB: 2\n");
        assert_eq!(header_block(b"A: 1\r\n\r\nbody"), b"A: 1\r\n");
        assert_eq!(header_block(b"A: 1\n"), b"A: 1\n");
    }

    #[test]
    fn test_unfold_keeps_order_and_case() {
        let fields = unfold_headers("Subject: a long\n\tsubject\nFrom: x@y.z\n");
        assert_eq!(
            fields,
            vec![
                ("Subject".to_string(), "a long subject".to_string()),
                ("From".to_string(), "x@y.z".to_string()),
            ]
        );
    }

    #[test]
    fn test_decode_base64_word() {
        assert_eq!(decode_encoded_words("=?UTF-8?B?SG9sYSBtdW5kbw==?="), "Hola mundo");
    }

    #[test]
    fn test_decode_unpadded_base64_word() {
        assert_eq!(decode_encoded_words("=?UTF-8?B?SG9sYQ?="), "Hola");
    }

    #[test]
    fn test_decode_adjacent_words_drop_gap() {
        let input = "Re: =?UTF-8?B?SG9sYQ==?= =?UTF-8?B?IG11bmRv?= !";
        assert_eq!(decode_encoded_words(input), "Re: Hola mundo !");
    }

    #[test]
    fn test_decode_q_latin1() {
        assert_eq!(
            decode_encoded_words("=?ISO-8859-1?Q?R=E9sum=E9_du_projet?="),
            "Résumé du projet"
        );
    }

    #[test]
    fn test_undecodable_word_is_kept() {
        assert_eq!(decode_encoded_words("=?broken"), "=?broken");
    }

    #[test]
    fn test_parse_envelope() {
        let headers = parse_header_fields(
            b"From: Alice <a@x.org>\nTo: b@y.org, c@z.org\nSubject: =?UTF-8?Q?caf=C3=A9?=\nDate: Thu, 04 Jan 2024 10:00:00 +0000\n",
        );
        let env = parse_envelope(&headers);
        assert_eq!(env.from[0].name, "Alice");
        assert_eq!(env.to.len(), 2);
        assert_eq!(env.subject, "café");
        assert_eq!(
            env.date.map(|d| d.format("%Y-%m-%d").to_string()),
            Some("2024-01-04".to_string())
        );
    }

    #[test]
    fn test_parse_date_named_tz() {
        assert!(parse_date("Thu, 04 Jan 2024 10:00:00 EST").is_some());
        assert!(parse_date("2024-01-04T10:00:00Z").is_some());
        assert!(parse_date("").is_none());
    }
}
