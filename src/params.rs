//! Compression parameters.
//!
//! Defaults mirror `src/util/constants.h` of the original C implementation
//! this crate is modeled on: `DEFAULT_MAX_RANK`, `LIMIT_MAX_RANK`,
//! `DEFAULT_MONOGRAMS`, `DEFAULT_FACTOR`, `DEFAULT_NT_TABLE`, `DEFAULT_RRR`.

/// Hard ceiling on hyperedge rank, independent of `Params::max_rank`.
pub const LIMIT_MAX_RANK: u64 = 16348;

/// Magic bytes that open every compressed file (`§6.1`).
pub const MAGIC: &[u8; 8] = b"CGRAPH1\0";

/// Magic byte identifying the plain rank/select bit-sequence encoding.
pub const BITSEQUENCE_REGULAR: u8 = 0x1;
/// Magic byte identifying the RRR block-compressed bit-sequence encoding.
pub const BITSEQUENCE_RRR: u8 = 0x3;

/// Tunable parameters of the RePair compressor and the succinct writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Params {
    /// Rules whose nonterminal rank would exceed this are never created.
    pub max_rank: u64,
    /// Allow promoting a single repeated edge label to a rule.
    pub monograms: bool,
    /// Number of 64-bit blocks grouped into one rank/select superblock.
    pub factor: usize,
    /// Write the optional nonterminal -> reachable-terminal-labels table.
    pub nt_table: bool,
    /// Use the RRR block-compressed bit-sequence variant (requires `rrr` feature).
    pub rrr: bool,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            max_rank: 256,
            monograms: false,
            factor: 64,
            nt_table: false,
            rrr: false,
        }
    }
}

impl Params {
    /// Validates an *input* hyperedge's rank against the hard ceiling only.
    ///
    /// `max_rank` is not enforced here: the original's `cgraphw_add_edge`
    /// (`examples/original_source/src/cgraph/cgraphw.c`) performs no rank
    /// check at all on input edges, and `spec.md` §6.2/§8 scenario 6 reject
    /// input only above `LIMIT_MAX_RANK`. `max_rank` instead bounds which
    /// *nonterminals* RePair is allowed to create, applied at digram
    /// selection time (see `repair::pick_best_digram`).
    pub fn check_input_rank(&self, rank: u64) -> crate::error::Result<()> {
        if rank > LIMIT_MAX_RANK {
            return Err(crate::error::Error::CapacityExceeded {
                what: "rank",
                value: rank,
                limit: LIMIT_MAX_RANK,
            });
        }
        Ok(())
    }
}
