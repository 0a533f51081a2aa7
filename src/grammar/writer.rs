//! Grammar + start-symbol serialization (`spec.md` §4.7, component C7).

use dsi_bitstream::traits::BitWrite;

use crate::bits::{VByteWrite, Writer};
use crate::eliasfano::EliasFano;
use crate::error::{Error, Result};
use crate::k2tree::K2Tree;
use crate::params::{Params, MAGIC};
use crate::repair::{Grammar, IfTable};

/// Flushes a bit writer and returns its backing bytes, little-endian per
/// `spec.md` §6.1.
fn finish_bytes(w: Writer) -> Result<Vec<u8>> {
    let words = w
        .into_inner()
        .map_err(|_| Error::StructuralFile("failed to flush bit writer".into()))?
        .into_inner();
    let mut bytes = Vec::with_capacity(words.len() * 4);
    for word in words {
        bytes.extend_from_slice(&word.to_le_bytes());
    }
    Ok(bytes)
}

/// Bits needed to represent values in `0..=max`.
fn bits_for(max: u64) -> u32 {
    if max == 0 {
        0
    } else {
        64 - max.leading_zeros()
    }
}

fn write_if_table(w: &mut Writer, table: &IfTable) -> Result<()> {
    w.write_vbyte(table.len() as u64)?;
    let mut cumulative = Vec::with_capacity(table.len());
    let mut acc = 0u64;
    for entry in table.iter() {
        cumulative.push(acc);
        acc += 1 + entry.len() as u64;
    }
    let offsets = EliasFano::build(cumulative.into_iter(), acc.max(1), 4);
    offsets.write(w)?;
    for entry in table.iter() {
        w.write_vbyte(entry.len() as u64)?;
        for &p in entry {
            w.write_vbyte(p as u64)?;
        }
    }
    Ok(())
}

/// Serializes the grammar region: rule count, then per rule its rank and
/// RHS edges with index functions inlined (not interned — see module docs).
fn write_grammar_region(grammar: &Grammar) -> Result<Vec<u8>> {
    let mut w = crate::bits::writer();
    w.write_vbyte(grammar.terminal_count)?;
    w.write_vbyte(grammar.rules.len() as u64)?;
    for rule in &grammar.rules {
        w.write_vbyte(rule.rank)?;
        w.write_vbyte(rule.rhs.len() as u64)?;
        for edge in &rule.rhs {
            w.write_vbyte(edge.label)?;
            let idx = grammar.if_table.get(edge.if_id);
            w.write_vbyte(idx.len() as u64)?;
            for &p in idx {
                w.write_vbyte(p as u64)?;
            }
        }
    }
    finish_bytes(w)
}

/// Serializes the start-symbol region (`spec.md` §4.7 layout diagram).
///
/// Edge ids are assigned by a stable sort on label, which is what lets
/// `labels` be stored as a (monotone) Elias–Fano sequence while still
/// satisfying "`labels` is stored in the order of edge ids" (`spec.md` §3):
/// the order of edge ids *is* the label order.
fn write_start_symbol_region(grammar: &Grammar, node_count: u64, params: &Params) -> Result<Vec<u8>> {
    let mut order: Vec<usize> = (0..grammar.start_edges.len()).collect();
    order.sort_by_key(|&i| grammar.start_edges[i].label);

    let mut points: Vec<(u64, u64)> = Vec::new();
    let mut if_table = IfTable::new();
    let mut edge_ifs: Vec<usize> = Vec::with_capacity(order.len());
    let mut labels: Vec<u64> = Vec::with_capacity(order.len());

    for (eid, &orig_idx) in order.iter().enumerate() {
        let edge = &grammar.start_edges[orig_idx];
        labels.push(edge.label);
        let mut distinct: Vec<u64> = edge.nodes.clone();
        distinct.sort_unstable();
        distinct.dedup();
        for &v in &distinct {
            points.push((v, eid as u64));
        }
        let idx: Vec<usize> = edge
            .nodes
            .iter()
            .map(|n| distinct.binary_search(n).expect("node must be in its own distinct list"))
            .collect();
        edge_ifs.push(if_table.intern(idx));
    }

    let num_edges = order.len() as u64;
    let matrix = K2Tree::build(node_count.max(1), num_edges.max(1), &points, params.factor);
    let label_universe = grammar.terminal_count + grammar.rules.len() as u64;
    let ef_labels = EliasFano::build(labels.into_iter(), label_universe.max(1), params.factor);

    let mut w = crate::bits::writer();
    matrix.write(&mut w)?;
    ef_labels.write(&mut w)?;

    let width = bits_for(if_table.len().saturating_sub(1) as u64);
    w.write_vbyte(width as u64)?;
    w.write_vbyte(edge_ifs.len() as u64)?;
    for &id in &edge_ifs {
        if width > 0 {
            w.write_bits(id as u64, width)
                .map_err(|_| Error::StructuralFile("edge_ifs write failed".into()))?;
        }
    }

    write_if_table(&mut w, &if_table)?;
    finish_bytes(w)
}

/// Raw byte-level VByte encode, used only for the top-level region-length
/// prefix: the grammar and start-symbol regions are each a standalone,
/// word-aligned bit-writer buffer, so the outer framing works in plain
/// bytes rather than opening a third bit writer just to hold one integer.
fn encode_vbyte_raw(mut value: u64) -> Vec<u8> {
    let mut out = Vec::new();
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            break;
        }
        out.push(byte | 0x80);
    }
    out
}

/// Writes the full compressed file: magic, grammar-region length, grammar
/// region, start-symbol region (`spec.md` §6.1).
pub fn write_file(grammar: &Grammar, node_count: u64, params: &Params) -> Result<Vec<u8>> {
    let grammar_bytes = write_grammar_region(grammar)?;
    let start_bytes = write_start_symbol_region(grammar, node_count, params)?;

    let mut out = Vec::with_capacity(MAGIC.len() + 10 + grammar_bytes.len() + start_bytes.len());
    out.extend_from_slice(MAGIC);
    out.extend(encode_vbyte_raw(grammar_bytes.len() as u64));
    out.extend(grammar_bytes);
    out.extend(start_bytes);
    Ok(out)
}
