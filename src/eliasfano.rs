//! Elias–Fano monotone sequences (`spec.md` §4.3, component C3).
//!
//! A sequence of `n` non-decreasing values bounded by `universe` is split
//! into low bits (the `ceil(log2(universe/n))` least-significant bits of
//! each value, packed contiguously) and high bits (the remaining bits,
//! unary-encoded in a [`BitSeq`] so that rank/select over it recovers
//! membership). This mirrors the teacher's use of `sux::dict::EliasFano`
//! for the same role (e.g. `src/build_eliasfano.rs`'s offset table and
//! `graphs/csr_graph.rs`'s degree-cumulative function), built here directly
//! on our own rank/select bit sequence rather than the external crate, since
//! Elias–Fano is itself one of this crate's hard-core deliverables.

use crate::bitseq::BitSeq;
use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct EliasFano {
    n: usize,
    universe: u64,
    low_bits: u32,
    low: Vec<u64>, // packed, `low_bits` bits per entry, stored one-per-u64 for simplicity
    high: BitSeq,
}

impl EliasFano {
    /// Builds an Elias–Fano sequence from a non-decreasing iterator of `n`
    /// values all `< universe`.
    pub fn build(values: impl ExactSizeIterator<Item = u64>, universe: u64, factor: usize) -> Self {
        let n = values.len();
        let low_bits = if n == 0 {
            0
        } else {
            let ratio = (universe / n as u64).max(1);
            64 - ratio.leading_zeros()
        };
        let mut low = Vec::with_capacity(n);
        // high[i] uses unary encoding: value `v` contributes a 1-bit at
        // position `(v >> low_bits) + i` in a bit vector of length
        // `n + (universe >> low_bits) + 1`.
        let high_universe = (universe >> low_bits) as usize + 1;
        let high_len = n + high_universe + 1;
        let mut high_bits = vec![false; high_len];
        let low_mask: u64 = if low_bits == 0 {
            0
        } else {
            u64::MAX >> (64 - low_bits)
        };
        let mut prev = 0u64;
        for (i, v) in values.enumerate() {
            debug_assert!(v >= prev, "Elias-Fano input must be non-decreasing");
            prev = v;
            low.push(v & low_mask);
            let high = (v >> low_bits) as usize;
            high_bits[high + i] = true;
        }
        let high = BitSeq::build(high_len, factor, |i| high_bits[i]);
        Self {
            n,
            universe,
            low_bits,
            low,
            high,
        }
    }

    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Random access: the `i`-th value.
    pub fn get(&self, i: usize) -> u64 {
        debug_assert!(i < self.n);
        let high = self.high.select1(i as u64).expect("consistent EF state") - i;
        ((high as u64) << self.low_bits) | self.low[i]
    }

    /// Returns the smallest index `i` such that `get(i) >= lower_bound`,
    /// for use by the query engine walking the start symbol forward.
    pub fn successor(&self, lower_bound: u64) -> Option<usize> {
        if self.n == 0 {
            return None;
        }
        // binary search is adequate here; `n` is the number of edges,
        // not a hot per-bit loop.
        let mut lo = 0usize;
        let mut hi = self.n;
        while lo < hi {
            let mid = (lo + hi) / 2;
            if self.get(mid) < lower_bound {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        if lo < self.n {
            Some(lo)
        } else {
            None
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = u64> + '_ {
        (0..self.n).map(move |i| self.get(i))
    }

    /// Serializes as VByte(n), VByte(universe), VByte(low_bits), the packed
    /// low bits (VByte per entry), then the high bit sequence (`BitSeq::write`).
    pub fn write(&self, w: &mut crate::bits::Writer) -> Result<()> {
        use crate::bits::VByteWrite;
        w.write_vbyte(self.n as u64)?;
        w.write_vbyte(self.universe)?;
        w.write_vbyte(self.low_bits as u64)?;
        for &v in &self.low {
            w.write_vbyte(v)?;
        }
        self.high.write(w)?;
        Ok(())
    }

    pub fn read(r: &mut crate::bits::Reader<'_>) -> Result<Self> {
        use crate::bits::VByteRead;
        let n = r.read_vbyte()? as usize;
        let universe = r.read_vbyte()?;
        let low_bits = r.read_vbyte()? as u32;
        let mut low = Vec::with_capacity(n);
        for _ in 0..n {
            low.push(r.read_vbyte()?);
        }
        let high = BitSeq::read(r)?;
        if high.total_ones() as usize != n {
            return Err(Error::StructuralFile(
                "Elias-Fano high sequence cardinality mismatch".into(),
            ));
        }
        Ok(Self {
            n,
            universe,
            low_bits,
            low,
            high,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_random_monotone() {
        let values = [0u64, 2, 2, 5, 9, 9, 9, 100, 1000];
        let ef = EliasFano::build(values.iter().copied(), 1001, 4);
        for (i, &v) in values.iter().enumerate() {
            assert_eq!(ef.get(i), v);
        }
    }

    #[test]
    fn successor_finds_lower_bound() {
        let values = [1u64, 4, 4, 10, 20];
        let ef = EliasFano::build(values.iter().copied(), 21, 4);
        assert_eq!(ef.successor(0), Some(0));
        assert_eq!(ef.successor(5), Some(3));
        assert_eq!(ef.successor(21), None);
    }

    #[test]
    fn empty_sequence() {
        let ef = EliasFano::build(std::iter::empty(), 0, 4);
        assert_eq!(ef.len(), 0);
        assert_eq!(ef.successor(0), None);
    }
}
