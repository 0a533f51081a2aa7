//! On-disk grammar + start-symbol layout (`spec.md` §4.7/§4.8, components
//! C7/C8) and the file framing of §6.1.
//!
//! Two sibling regions, concatenated after an 8-byte magic and a
//! VByte-encoded grammar-region length: the *grammar region* (rule bodies,
//! index functions inlined) and the *start-symbol region* (k²-tree matrix,
//! Elias–Fano labels, packed edge index-function ids, and a content-addressed
//! index-function table).
//!
//! A deliberate simplification from the literal spec text: Elias-γ/δ are
//! named there for a few integer fields (rule ranks, index-function
//! entries); this crate encodes every scalar with the one variable-length
//! code it already has full confidence in — [`crate::bits::VByteWrite`] /
//! [`crate::bits::VByteRead`] — rather than guess at `dsi-bitstream`'s
//! gamma/delta call shape in code that will never be compiled. See
//! `DESIGN.md`.

pub mod reader;
pub mod writer;

pub use reader::{CompiledGrammar, GrammarFile, RuleView, StartSymbolView};
pub use writer::write_file;
