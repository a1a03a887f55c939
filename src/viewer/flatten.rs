//! Flattening a MIME tree into the part list, and picking the initial part.

use crate::model::part::PartHandle;
use crate::model::structure::BodyStructure;

/// Flatten `root` depth-first, pre-order.
///
/// A multipart node yields a marker immediately followed by its subtree;
/// any other node yields one leaf. A root without children is the message
/// body itself and becomes a single leaf at `[1]`.
pub fn flatten_parts(root: &BodyStructure) -> Vec<PartHandle> {
    if root.parts.is_empty() {
        return vec![PartHandle::leaf(vec![1], root)];
    }
    let mut out = Vec::with_capacity(root.leaf_count() + 1);
    walk(root, Vec::new(), &mut out);
    out
}

fn walk(node: &BodyStructure, index: Vec<u32>, out: &mut Vec<PartHandle>) {
    if !node.is_multipart() {
        out.push(PartHandle::leaf(index, node));
        return;
    }
    out.push(PartHandle::marker(index.clone(), node));
    for (i, child) in node.parts.iter().enumerate() {
        let mut child_index = index.clone();
        child_index.push(i as u32 + 1);
        walk(child, child_index, out);
    }
}

/// Index of the part to show first.
///
/// The first leaf is the fallback pick and carries no score. Every later
/// leaf whose `type/subtype` appears in `alternatives` at position `i`
/// scores `len - i`; only a strictly higher score replaces the current
/// pick, so document order breaks ties. Returns `None` when there is no
/// leaf at all.
pub fn select_alternative(parts: &[PartHandle], alternatives: &[String]) -> Option<usize> {
    let mut leaves = parts
        .iter()
        .enumerate()
        .filter(|(_, handle)| handle.is_selectable());

    let (mut selected, _) = leaves.next()?;
    let mut best = -1i64;

    for (i, handle) in leaves {
        let priority = priority(&handle.part.mime(), alternatives);
        if priority > best {
            best = priority;
            selected = i;
        }
    }

    Some(selected)
}

fn priority(mime: &str, alternatives: &[String]) -> i64 {
    alternatives
        .iter()
        .position(|alt| alt.eq_ignore_ascii_case(mime))
        .map(|idx| (alternatives.len() - idx) as i64)
        .unwrap_or(-1)
}
