//! A message as the viewer sees it: envelope, raw header fields and structure.

use chrono::{DateTime, Utc};

use super::address::{format_addresses, Address};
use super::structure::BodyStructure;

/// Envelope fields extracted from the header block.
#[derive(Debug, Clone, Default)]
pub struct Envelope {
    pub date: Option<DateTime<Utc>>,
    /// Decoded subject (RFC 2047 encoded-words resolved).
    pub subject: String,
    pub from: Vec<Address>,
    pub to: Vec<Address>,
    pub cc: Vec<Address>,
    pub bcc: Vec<Address>,
}

/// Header fields in source order, with their original name casing.
#[derive(Debug, Clone, Default)]
pub struct HeaderFields {
    fields: Vec<(String, String)>,
}

impl HeaderFields {
    pub fn new(fields: Vec<(String, String)>) -> Self {
        Self { fields }
    }

    /// First value for `name`, compared case-insensitively. Empty if absent.
    pub fn get(&self, name: &str) -> &str {
        self.fields
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
            .unwrap_or("")
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// A message loaded into the viewer.
#[derive(Debug, Clone)]
pub struct MessageInfo {
    /// Identifier handed back to the fetch service.
    pub uid: u32,
    pub envelope: Envelope,
    pub headers: HeaderFields,
    pub body_structure: BodyStructure,
}

impl MessageInfo {
    /// Value of a header as the viewer displays it.
    ///
    /// Address headers come from the envelope, the date is reformatted,
    /// everything else is the raw field value.
    pub fn format_header(&self, name: &str) -> String {
        match name.to_ascii_lowercase().as_str() {
            "from" => format_addresses(&self.envelope.from),
            "to" => format_addresses(&self.envelope.to),
            "cc" => format_addresses(&self.envelope.cc),
            "bcc" => format_addresses(&self.envelope.bcc),
            "date" => self
                .envelope
                .date
                .map(|d| d.format("%a %b %-d, %Y at %-I:%M %p").to_string())
                .unwrap_or_default(),
            "subject" => self.envelope.subject.clone(),
            _ => self.headers.get(name).to_string(),
        }
    }
}
