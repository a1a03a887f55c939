//! Handles into the flattened part list.

use super::structure::BodyStructure;

/// Whether a handle can be selected and displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PartKind {
    /// A multipart container. Listed so indices stay stable, never displayed.
    Marker,
    /// A displayable leaf.
    Leaf,
}

/// One entry of the flattened part sequence.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct PartHandle {
    pub kind: PartKind,
    /// 1-based sibling positions from the root. Empty for a multipart root.
    pub index: Vec<u32>,
    /// The node this handle stands for, without its children.
    pub part: BodyStructure,
}

impl PartHandle {
    pub fn marker(index: Vec<u32>, node: &BodyStructure) -> Self {
        Self {
            kind: PartKind::Marker,
            index,
            part: shallow(node),
        }
    }

    pub fn leaf(index: Vec<u32>, node: &BodyStructure) -> Self {
        Self {
            kind: PartKind::Leaf,
            index,
            part: shallow(node),
        }
    }

    pub fn is_selectable(&self) -> bool {
        self.kind == PartKind::Leaf
    }

    /// Selector strip label: `"type/subtype"` plus `" (filename)"` when known.
    pub fn label(&self) -> String {
        match self.part.filename() {
            Some(name) => format!("{} ({name})", self.part.mime()),
            None => self.part.mime(),
        }
    }
}

/// Everything a command needs to act on the currently selected part.
#[derive(Debug, Clone)]
pub struct PartInfo {
    pub uid: u32,
    pub index: Vec<u32>,
    pub part: BodyStructure,
}

/// Dotted rendering of an index path (`[2, 1]` → `"2.1"`).
pub fn format_index(index: &[u32]) -> String {
    if index.is_empty() {
        return "root".to_string();
    }
    index
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(".")
}

/// Parse a dotted index path such as `"2.1"`. Positions are 1-based.
pub fn parse_index(text: &str) -> Option<Vec<u32>> {
    text.split('.')
        .map(|pos| pos.trim().parse::<u32>().ok().filter(|&n| n > 0))
        .collect()
}

fn shallow(node: &BodyStructure) -> BodyStructure {
    BodyStructure {
        parts: Vec::new(),
        ..node.clone()
    }
}
