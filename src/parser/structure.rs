//! Building the [`BodyStructure`] tree with `mail-parser`, and resolving
//! index paths back to decoded part contents.

use std::collections::BTreeMap;

use mail_parser::{Message, MessageParser, MessagePart, MimeHeaders, PartType};

use crate::error::{Result, ViewerError};
use crate::model::message::MessageInfo;
use crate::model::structure::BodyStructure;
use crate::parser::header;

/// Maximum nesting followed when building the tree (adversarial input guard).
const MAX_DEPTH: usize = 32;

/// Parse a complete raw message into headers, envelope and structure tree.
pub fn parse_message(raw: &[u8], uid: u32) -> Result<MessageInfo> {
    let headers = header::parse_header_fields(header::header_block(raw));
    let envelope = header::parse_envelope(&headers);

    let parsed = parse(raw)?;
    let root = parsed
        .part(0)
        .ok_or_else(|| ViewerError::Parse("message has no body".into()))?;
    let body_structure = build_node(&parsed, root, 0);

    Ok(MessageInfo {
        uid,
        envelope,
        headers,
        body_structure,
    })
}

/// Decoded bytes of the part at `index`.
///
/// Transfer encoding is undone; text parts come back as UTF-8. On a
/// non-multipart root, `[1]` names the root itself.
pub fn part_contents(raw: &[u8], index: &[u32]) -> Result<Vec<u8>> {
    let parsed = parse(raw)?;
    let part = resolve(&parsed, index)
        .ok_or_else(|| ViewerError::fetch(index, "no such part in message"))?;
    if matches!(&part.body, PartType::Multipart(children) if !children.is_empty()) {
        return Err(ViewerError::fetch(index, "multipart containers have no content"));
    }
    Ok(part.contents().to_vec())
}

fn parse(raw: &[u8]) -> Result<Message<'_>> {
    MessageParser::default()
        .parse(raw)
        .ok_or_else(|| ViewerError::Parse("not an RFC 5322 message".into()))
}

fn resolve<'m>(msg: &'m Message<'_>, index: &[u32]) -> Option<&'m MessagePart<'m>> {
    let mut part = msg.part(0)?;
    let childless = match &part.body {
        PartType::Multipart(children) => children.is_empty(),
        _ => true,
    };
    if index == [1] && childless {
        return Some(part);
    }
    for &pos in index {
        let PartType::Multipart(children) = &part.body else {
            return None;
        };
        let slot = (pos as usize).checked_sub(1)?;
        part = msg.part(*children.get(slot)?)?;
    }
    Some(part)
}

fn build_node(msg: &Message<'_>, part: &MessagePart<'_>, depth: usize) -> BodyStructure {
    let mut node = match part.content_type() {
        Some(ct) => {
            let mut node = BodyStructure::new(ct.ctype(), ct.subtype().unwrap_or("plain"));
            node.params = attributes(ct.attributes());
            node
        }
        None => BodyStructure::new("text", "plain"),
    };

    if let Some(disposition) = part.content_disposition() {
        node.disposition = Some(disposition.ctype().to_lowercase());
        node.disposition_params = attributes(disposition.attributes());
    }
    if let Some(encoding) = part.content_transfer_encoding() {
        node.encoding = encoding.to_lowercase();
    }
    node.description = part.content_description().map(str::to_string);

    match &part.body {
        PartType::Multipart(children) => {
            // A multipart without a usable Content-Type still has children.
            if !node.is_multipart() {
                node.mime_type = "multipart".to_string();
                node.mime_subtype = "mixed".to_string();
            }
            if depth < MAX_DEPTH {
                node.parts = children
                    .iter()
                    .filter_map(|&id| msg.part(id))
                    .map(|child| build_node(msg, child, depth + 1))
                    .collect();
            } else {
                tracing::warn!(depth, "MIME tree too deep, children ignored");
            }
        }
        _ => {
            // A declared multipart that failed to parse as one is shown as a leaf.
            if node.is_multipart() {
                node.mime_type = "text".to_string();
                node.mime_subtype = "plain".to_string();
            }
            node.size = part.contents().len() as u64;
        }
    }

    node
}

fn attributes<K, V>(attrs: Option<&[(K, V)]>) -> BTreeMap<String, String>
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    attrs
        .unwrap_or_default()
        .iter()
        .map(|(k, v)| (k.as_ref().to_lowercase(), v.as_ref().to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIXED: &[u8] = b"From: Alice <alice@example.com>\r\n\
Subject: Photos\r\n\
Content-Type: multipart/mixed; boundary=\"outer\"\r\n\
\r\n\
--outer\r\n\
Content-Type: multipart/alternative; boundary=\"inner\"\r\n\
\r\n\
--inner\r\n\
Content-Type: text/plain; charset=utf-8\r\n\
\r\n\
Hello there\r\n\
--inner\r\n\
Content-Type: text/html; charset=utf-8\r\n\
\r\n\
<p>Hello there</p>\r\n\
--inner--\r\n\
--outer\r\n\
Content-Type: image/png\r\n\
Content-Disposition: attachment; filename=\"a.png\"\r\n\
Content-Transfer-Encoding: base64\r\n\
\r\n\
iVBORw0KGgo=\r\n\
--outer--\r\n";

    #[test]
    fn test_parse_nested_structure() {
        let msg = parse_message(MIXED, 1).unwrap();
        let root = &msg.body_structure;
        assert_eq!(root.mime(), "multipart/mixed");
        assert_eq!(root.parts.len(), 2);
        assert_eq!(root.parts[0].mime(), "multipart/alternative");
        assert_eq!(root.parts[0].parts[1].mime(), "text/html");
        assert_eq!(root.parts[1].filename(), Some("a.png"));
        assert_eq!(root.parts[1].encoding, "base64");
        assert_eq!(msg.envelope.subject, "Photos");
    }

    #[test]
    fn test_part_contents_decodes_transfer_encoding() {
        let png = part_contents(MIXED, &[2]).unwrap();
        assert_eq!(png, b"\x89PNG\r\n\x1a\n");
        let text = part_contents(MIXED, &[1, 1]).unwrap();
        assert!(String::from_utf8(text).unwrap().starts_with("Hello there"));
    }

    #[test]
    fn test_part_contents_rejects_bad_paths() {
        assert!(part_contents(MIXED, &[3]).is_err());
        assert!(part_contents(MIXED, &[1]).is_err());
        assert!(part_contents(MIXED, &[2, 1]).is_err());
    }

    #[test]
    fn test_single_part_root_is_index_one() {
        let raw = b"Subject: hi\nContent-Type: text/plain\n\nJust text\n";
        let msg = parse_message(raw, 1).unwrap();
        assert!(msg.body_structure.parts.is_empty());
        let body = part_contents(raw, &[1]).unwrap();
        assert_eq!(String::from_utf8(body).unwrap().trim_end(), "Just text");
    }

    #[test]
    fn test_childless_multipart_root_is_index_one() {
        let raw = b"Subject: empty\nContent-Type: multipart/mixed; boundary=x\n\nno parts here\n";
        let msg = parse_message(raw, 1).unwrap();
        assert!(msg.body_structure.parts.is_empty());
        let parts = crate::viewer::flatten_parts(&msg.body_structure);
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].index, vec![1]);
        assert!(part_contents(raw, &[1]).is_ok());
    }
}
