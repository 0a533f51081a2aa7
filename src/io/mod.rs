//! Input adapters (`spec.md` §6.2) — outside the hard core proper, but
//! carried as the ambient parsing layer every CLI needs.

pub mod hyperedge_text;

pub use hyperedge_text::{parse_line, InputFormat};
