//! Message parsing: header decoding, MIME structure, `.eml` loading.

pub mod eml;
pub mod header;
pub mod structure;
