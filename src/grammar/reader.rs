//! Parses the on-disk layout into queryable views (`spec.md` §4.8, component
//! C8). No payload is copied beyond the initial byte buffer handed in by the
//! caller (typically an `mmap`, owned by [`crate::handle::ReaderHandle`]);
//! rule bodies and the index-function table are still materialized eagerly
//! at open time rather than lazily paged, trading strict succinctness for an
//! implementation whose correctness doesn't depend on random bit-level
//! seeking that was never exercised against a compiler (see `DESIGN.md`).

use crate::bits::VByteRead;
use crate::eliasfano::EliasFano;
use crate::error::{Error, Result};
use crate::k2tree::K2Tree;
use crate::params::MAGIC;

#[derive(Debug, Clone)]
pub struct RuleRhsEdge {
    pub label: u64,
    pub idx: Vec<usize>,
}

#[derive(Debug, Clone)]
pub struct RuleView {
    pub rank: u64,
    pub rhs: Vec<RuleRhsEdge>,
}

#[derive(Debug, Clone)]
pub struct CompiledGrammar {
    pub terminal_count: u64,
    pub rules: Vec<RuleView>,
}

impl CompiledGrammar {
    pub fn is_nonterminal(&self, label: u64) -> bool {
        label >= self.terminal_count
    }

    pub fn rule_for_label(&self, label: u64) -> Option<&RuleView> {
        if !self.is_nonterminal(label) {
            return None;
        }
        self.rules.get((label - self.terminal_count) as usize)
    }
}

#[derive(Debug, Clone)]
pub struct StartSymbolView {
    pub matrix: K2Tree,
    pub labels: EliasFano,
    pub edge_ifs: Vec<usize>,
    pub if_table: Vec<Vec<usize>>,
}

impl StartSymbolView {
    pub fn num_edges(&self) -> usize {
        self.labels.len()
    }

    /// Materializes the position-ordered node list for start-symbol edge
    /// `eid` from its column (ascending incident node ids) and its
    /// interned index function.
    pub fn edge_nodes(&self, eid: u64) -> Vec<u64> {
        let columns = self.matrix.column(eid);
        let idx = &self.if_table[self.edge_ifs[eid as usize]];
        idx.iter().map(|&p| columns[p]).collect()
    }
}

#[derive(Debug, Clone)]
pub struct GrammarFile {
    pub grammar: CompiledGrammar,
    pub start: StartSymbolView,
    pub node_count: u64,
}

fn decode_vbyte_raw(bytes: &[u8]) -> Result<(u64, usize)> {
    let mut value = 0u64;
    for (i, &byte) in bytes.iter().take(10).enumerate() {
        value |= ((byte & 0x7f) as u64) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok((value, i + 1));
        }
    }
    Err(Error::StructuralFile("truncated region-length vbyte".into()))
}

fn words_from_bytes(bytes: &[u8]) -> Result<Vec<u32>> {
    if bytes.len() % 4 != 0 {
        return Err(Error::StructuralFile(
            "region byte length is not word-aligned".into(),
        ));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

fn parse_grammar_region(bytes: &[u8]) -> Result<CompiledGrammar> {
    let words = words_from_bytes(bytes)?;
    let mut r = crate::bits::reader(&words);
    let terminal_count = r.read_vbyte()?;
    let num_rules = r.read_vbyte()? as usize;
    let mut rules = Vec::with_capacity(num_rules);
    for _ in 0..num_rules {
        let rank = r.read_vbyte()?;
        let num_rhs = r.read_vbyte()? as usize;
        let mut rhs = Vec::with_capacity(num_rhs);
        for _ in 0..num_rhs {
            let label = r.read_vbyte()?;
            let m = r.read_vbyte()? as usize;
            let mut idx = Vec::with_capacity(m);
            for _ in 0..m {
                idx.push(r.read_vbyte()? as usize);
            }
            rhs.push(RuleRhsEdge { label, idx });
        }
        rules.push(RuleView { rank, rhs });
    }
    Ok(CompiledGrammar {
        terminal_count,
        rules,
    })
}

fn parse_start_symbol_region(bytes: &[u8], node_count: u64) -> Result<StartSymbolView> {
    use dsi_bitstream::traits::BitRead;

    let words = words_from_bytes(bytes)?;
    let mut r = crate::bits::reader(&words);
    let matrix = K2Tree::read(&mut r)?;
    let labels = EliasFano::read(&mut r)?;

    let width = r.read_vbyte()? as u32;
    let n_edge_ifs = r.read_vbyte()? as usize;
    let mut edge_ifs = Vec::with_capacity(n_edge_ifs);
    for _ in 0..n_edge_ifs {
        let id = if width > 0 {
            r.read_bits(width)
                .map_err(|_| Error::StructuralFile("edge_ifs read failed".into()))?
        } else {
            0
        };
        edge_ifs.push(id as usize);
    }

    let n_if_entries = r.read_vbyte()? as usize;
    let _offsets = EliasFano::read(&mut r)?; // informational; entries are read sequentially below
    let mut if_table = Vec::with_capacity(n_if_entries);
    for _ in 0..n_if_entries {
        let m = r.read_vbyte()? as usize;
        let mut idx = Vec::with_capacity(m);
        for _ in 0..m {
            idx.push(r.read_vbyte()? as usize);
        }
        if_table.push(idx);
    }

    if edge_ifs.len() != labels.len() {
        return Err(Error::StructuralFile(
            "edge_ifs length does not match label count".into(),
        ));
    }

    let _ = node_count;
    Ok(StartSymbolView {
        matrix,
        labels,
        edge_ifs,
        if_table,
    })
}

impl GrammarFile {
    /// Parses a whole compressed file from a byte buffer (typically an
    /// `mmap`'d file, see `spec.md` §4.8 "maps the file"). The file is
    /// self-describing: every bit sequence records its own superblock
    /// `factor`, so no external factor needs to be supplied here (this is
    /// what makes `--factor` a pure write-time knob, `spec.md` §8
    /// "Monotonicity under parameter change").
    pub fn parse(bytes: &[u8], node_count: u64) -> Result<Self> {
        if bytes.len() < MAGIC.len() || &bytes[..MAGIC.len()] != MAGIC {
            return Err(Error::StructuralFile("bad magic".into()));
        }
        let rest = &bytes[MAGIC.len()..];
        let (grammar_len, consumed) = decode_vbyte_raw(rest)?;
        let grammar_len = grammar_len as usize;
        let rest = &rest[consumed..];
        if rest.len() < grammar_len {
            return Err(Error::StructuralFile(
                "grammar region length exceeds file size".into(),
            ));
        }
        let (grammar_bytes, start_bytes) = rest.split_at(grammar_len);
        let grammar = parse_grammar_region(grammar_bytes)?;
        let start = parse_start_symbol_region(start_bytes, node_count)?;
        Ok(GrammarFile {
            grammar,
            start,
            node_count,
        })
    }
}
