//! Bit sequences with rank and select (`spec.md` §4.2, component C2).
//!
//! Plain bit vector plus precomputed per-superblock rank counters; a
//! superblock covers `factor` 64-bit blocks (teacher's `Params::factor`
//! knob, default 64, matches `DEFAULT_FACTOR` from the original's
//! `constants.h`). `rank1` sums the superblock counter with a popcount over
//! the remaining blocks; `select1` binary-searches the superblock counters
//! then scans blocks linearly. An RRR (class/offset) variant is gated
//! behind the `rrr` feature and is selected at write time; the magic byte
//! recording which variant was used lives in `params::BITSEQUENCE_REGULAR`
//! / `BITSEQUENCE_RRR`.

use crate::error::{Error, Result};
use crate::params::{BITSEQUENCE_REGULAR, BITSEQUENCE_RRR};

/// A rank/select-capable bit vector (the plain, non-RRR encoding).
#[derive(Debug, Clone)]
pub struct BitSeq {
    words: Vec<u64>,
    len: usize,
    factor: usize,
    superblock_rank: Vec<u64>,
}

impl BitSeq {
    /// Builds a rank/select index over `len` bits supplied by `get(i)`.
    pub fn build(len: usize, factor: usize, mut get: impl FnMut(usize) -> bool) -> Self {
        let n_words = len.div_ceil(64);
        let mut words = vec![0u64; n_words];
        for i in 0..len {
            if get(i) {
                words[i / 64] |= 1 << (i % 64);
            }
        }
        Self::from_words(words, len, factor)
    }

    /// Wraps a pre-populated word vector; `len` is the number of valid
    /// trailing bits (bits beyond `len` in the last word must be zero).
    pub fn from_words(words: Vec<u64>, len: usize, factor: usize) -> Self {
        let factor = factor.max(1);
        let n_superblocks = words.len().div_ceil(factor) + 1;
        let mut superblock_rank = Vec::with_capacity(n_superblocks);
        let mut acc = 0u64;
        for (i, word) in words.iter().enumerate() {
            if i % factor == 0 {
                superblock_rank.push(acc);
            }
            acc += word.count_ones() as u64;
        }
        superblock_rank.push(acc);
        Self {
            words,
            len,
            factor,
            superblock_rank,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn get(&self, i: usize) -> bool {
        debug_assert!(i < self.len);
        (self.words[i / 64] >> (i % 64)) & 1 == 1
    }

    /// Number of set bits in `[0, i)`.
    pub fn rank1(&self, i: usize) -> u64 {
        debug_assert!(i <= self.len);
        let word_idx = i / 64;
        let superblock_idx = word_idx / self.factor;
        let mut acc = self.superblock_rank[superblock_idx];
        let first_word_of_superblock = superblock_idx * self.factor;
        for w in first_word_of_superblock..word_idx {
            acc += self.words[w].count_ones() as u64;
        }
        let bit_in_word = i % 64;
        if bit_in_word != 0 {
            let mask = (1u64 << bit_in_word) - 1;
            acc += (self.words[word_idx] & mask).count_ones() as u64;
        }
        acc
    }

    pub fn rank0(&self, i: usize) -> u64 {
        i as u64 - self.rank1(i)
    }

    /// Position of the `j`-th (0-based) set bit, or `None` if fewer than
    /// `j + 1` bits are set.
    pub fn select1(&self, j: u64) -> Option<usize> {
        if j >= self.total_ones() {
            return None;
        }
        // Binary search over superblock counters for the last superblock
        // whose cumulative rank is <= j.
        let mut lo = 0usize;
        let mut hi = self.superblock_rank.len() - 1;
        while lo + 1 < hi {
            let mid = (lo + hi) / 2;
            if self.superblock_rank[mid] <= j {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        let mut acc = self.superblock_rank[lo];
        let mut word_idx = lo * self.factor;
        loop {
            if word_idx >= self.words.len() {
                return None;
            }
            let popcount = self.words[word_idx].count_ones() as u64;
            if acc + popcount > j {
                let mut word = self.words[word_idx];
                let mut remaining = j - acc;
                for bit in 0..64 {
                    if word & 1 == 1 {
                        if remaining == 0 {
                            let pos = word_idx * 64 + bit;
                            return if pos < self.len { Some(pos) } else { None };
                        }
                        remaining -= 1;
                    }
                    word >>= 1;
                }
                unreachable!("popcount accounting inconsistent");
            }
            acc += popcount;
            word_idx += 1;
        }
    }

    /// Position of the `j`-th (0-based) unset bit.
    pub fn select0(&self, j: u64) -> Option<usize> {
        if j >= self.len as u64 - self.total_ones() {
            return None;
        }
        // linear scan is adequate: only used by Elias-Fano's high-bit
        // decoding, which walks forward from a known predecessor.
        let mut seen = 0u64;
        for i in 0..self.len {
            if !self.get(i) {
                if seen == j {
                    return Some(i);
                }
                seen += 1;
            }
        }
        None
    }

    pub fn total_ones(&self) -> u64 {
        *self.superblock_rank.last().unwrap()
    }

    /// Serializes as: magic byte, VByte(len), VByte(factor), VByte(n_words),
    /// then `n_words` VByte-encoded 64-bit words.
    pub fn write(&self, w: &mut crate::bits::Writer) -> Result<()> {
        use crate::bits::VByteWrite;
        w.write_vbyte(BITSEQUENCE_REGULAR as u64)?;
        w.write_vbyte(self.len as u64)?;
        w.write_vbyte(self.factor as u64)?;
        w.write_vbyte(self.words.len() as u64)?;
        for word in &self.words {
            w.write_vbyte(*word)?;
        }
        Ok(())
    }

    /// Inverse of [`BitSeq::write`].
    pub fn read(r: &mut crate::bits::Reader<'_>) -> Result<Self> {
        use crate::bits::VByteRead;
        let tag = r.read_vbyte()?;
        if tag != BITSEQUENCE_REGULAR as u64 && tag != BITSEQUENCE_RRR as u64 {
            return Err(Error::StructuralFile(format!(
                "unknown bit-sequence tag {tag}"
            )));
        }
        let len = r.read_vbyte()? as usize;
        let factor = r.read_vbyte()? as usize;
        let n_words = r.read_vbyte()? as usize;
        let mut words = Vec::with_capacity(n_words);
        for _ in 0..n_words {
            words.push(r.read_vbyte()?);
        }
        if tag == BITSEQUENCE_RRR as u64 && cfg!(not(feature = "rrr")) {
            return Err(Error::StructuralFile(
                "file uses the RRR bit sequence but the `rrr` feature is disabled".into(),
            ));
        }
        Ok(Self::from_words(words, len, factor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> BitSeq {
        // bits: 1 0 1 1 0 0 1 0 1 ...
        let pattern = [true, false, true, true, false, false, true, false, true];
        BitSeq::build(pattern.len(), 2, |i| pattern[i])
    }

    #[test]
    fn rank_matches_naive() {
        let bs = sample();
        let pattern = [true, false, true, true, false, false, true, false, true];
        let mut acc = 0u64;
        for i in 0..pattern.len() {
            assert_eq!(bs.rank1(i), acc);
            if pattern[i] {
                acc += 1;
            }
        }
        assert_eq!(bs.rank1(pattern.len()), acc);
    }

    #[test]
    fn select_matches_naive() {
        let bs = sample();
        let pattern = [true, false, true, true, false, false, true, false, true];
        let ones: Vec<usize> = (0..pattern.len()).filter(|&i| pattern[i]).collect();
        for (j, &pos) in ones.iter().enumerate() {
            assert_eq!(bs.select1(j as u64), Some(pos));
        }
        assert_eq!(bs.select1(ones.len() as u64), None);
    }

    #[test]
    fn large_vector_spans_many_superblocks() {
        let n = 10_000;
        let bs = BitSeq::build(n, 8, |i| i % 3 == 0);
        let mut acc = 0u64;
        for i in 0..n {
            assert_eq!(bs.rank1(i), acc);
            if i % 3 == 0 {
                acc += 1;
            }
        }
    }
}
