//! The parsed MIME structure of a message.

use std::collections::BTreeMap;

/// One node of a message's MIME tree.
///
/// Built once by [`crate::parser::structure`] and never mutated afterwards.
/// Type and subtype are stored lowercased.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct BodyStructure {
    /// Top-level media type (`"text"`, `"multipart"`, `"image"`, …).
    pub mime_type: String,
    /// Media subtype (`"plain"`, `"mixed"`, `"png"`, …).
    pub mime_subtype: String,
    /// Content-Type parameters (`charset`, `boundary`, `name`, …), keys lowercased.
    pub params: BTreeMap<String, String>,
    /// Child nodes, in document order. Empty for non-multipart nodes.
    pub parts: Vec<BodyStructure>,
    /// Content-Disposition type (`"inline"`, `"attachment"`), if present.
    pub disposition: Option<String>,
    /// Content-Disposition parameters (`filename`, …), keys lowercased.
    pub disposition_params: BTreeMap<String, String>,
    /// Content-Transfer-Encoding as declared (`"base64"`, `"7bit"`, …).
    pub encoding: String,
    /// Content-Description header value.
    pub description: Option<String>,
    /// Decoded size of the body in bytes.
    pub size: u64,
}

impl BodyStructure {
    /// A bare node of the given type, with no parameters or children.
    pub fn new(mime_type: &str, mime_subtype: &str) -> Self {
        Self {
            mime_type: mime_type.to_lowercase(),
            mime_subtype: mime_subtype.to_lowercase(),
            params: BTreeMap::new(),
            parts: Vec::new(),
            disposition: None,
            disposition_params: BTreeMap::new(),
            encoding: "7bit".to_string(),
            description: None,
            size: 0,
        }
    }

    /// Builder-style helper used by tests and the fixture loader.
    pub fn with_parts(mut self, parts: Vec<BodyStructure>) -> Self {
        self.parts = parts;
        self
    }

    /// Builder-style helper setting the `filename` disposition parameter.
    pub fn with_filename(mut self, filename: &str) -> Self {
        self.disposition_params
            .insert("filename".to_string(), filename.to_string());
        self
    }

    pub fn is_multipart(&self) -> bool {
        self.mime_type == "multipart"
    }

    pub fn is_text(&self) -> bool {
        self.mime_type == "text"
    }

    /// `"type/subtype"`, the string matched against alternatives and filter globs.
    pub fn mime(&self) -> String {
        format!("{}/{}", self.mime_type, self.mime_subtype)
    }

    /// Attachment filename, from the disposition first and the `name` parameter second.
    pub fn filename(&self) -> Option<&str> {
        self.disposition_params
            .get("filename")
            .or_else(|| self.params.get("name"))
            .map(String::as_str)
    }

    /// Number of non-multipart nodes in this subtree.
    pub fn leaf_count(&self) -> usize {
        if self.is_multipart() {
            self.parts.iter().map(BodyStructure::leaf_count).sum()
        } else {
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_is_lowercased() {
        let node = BodyStructure::new("TEXT", "Plain");
        assert_eq!(node.mime(), "text/plain");
        assert!(node.is_text());
        assert!(!node.is_multipart());
    }

    #[test]
    fn test_filename_prefers_disposition() {
        let mut node = BodyStructure::new("image", "png").with_filename("a.png");
        node.params.insert("name".into(), "b.png".into());
        assert_eq!(node.filename(), Some("a.png"));
        node.disposition_params.clear();
        assert_eq!(node.filename(), Some("b.png"));
    }

    #[test]
    fn test_leaf_count() {
        let tree = BodyStructure::new("multipart", "mixed").with_parts(vec![
            BodyStructure::new("multipart", "alternative").with_parts(vec![
                BodyStructure::new("text", "plain"),
                BodyStructure::new("text", "html"),
            ]),
            BodyStructure::new("image", "png"),
        ]);
        assert_eq!(tree.leaf_count(), 3);
    }
}
