//! Core data model: message envelope and headers, MIME structure, part handles.

pub mod address;
pub mod message;
pub mod part;
pub mod structure;
