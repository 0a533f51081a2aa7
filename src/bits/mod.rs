//! Bit I/O: the substrate every other succinct structure in this crate is
//! built on (`spec.md` §4.1, component C1).
//!
//! Gamma and delta codes are not hand-rolled: they are exactly what
//! `dsi-bitstream` gives the teacher's `bvgraph` codecs (see
//! `graph/bvgraph/code_reader_builder.rs`, `src/bin/build_eliasfano.rs` in
//! webgraph-rs), so we reuse `GammaRead`/`GammaWrite`/`DeltaRead`/`DeltaWrite`
//! from that crate instead of reimplementing unary-prefixed codes. VByte is
//! the one wire format `dsi-bitstream` does not provide, so it is added here
//! as a small extension trait over the same `BitRead`/`BitWrite` traits.

use dsi_bitstream::impls::{BufBitReader, BufBitWriter, MemWordReader, MemWordWriterVec};
use dsi_bitstream::traits::{BitRead, BitWrite, BE};

use crate::error::{Error, Result};

/// Bit-sequence reader over an in-memory word buffer, big-endian bit order.
///
/// Bit order is fixed MSB-first (`BE`) throughout the crate: producer and
/// consumer must agree, and this is the one place that decision is made
/// (`spec.md` §6.1).
pub type Reader<'a> = BufBitReader<BE, MemWordReader<u32, &'a [u32]>>;

/// Bit-sequence writer into an in-memory, growable word buffer.
pub type Writer = BufBitWriter<BE, MemWordWriterVec<u32, Vec<u32>>>;

/// Creates a reader over a byte slice (must be a multiple of 4 bytes; the
/// writer side always pads up to a whole number of `u32` words).
pub fn reader(words: &[u32]) -> Reader<'_> {
    BufBitReader::new(MemWordReader::new(words))
}

/// Creates a fresh writer backed by an empty word buffer.
pub fn writer() -> Writer {
    BufBitWriter::new(MemWordWriterVec::new(Vec::new()))
}

const VBYTE_MAX_BYTES: usize = 10;

/// VByte (base-128, high-bit continuation, little-endian groups) on top of
/// any bit writer.
pub trait VByteWrite {
    fn write_vbyte(&mut self, value: u64) -> Result<usize>;
}

/// VByte reading counterpart.
pub trait VByteRead {
    fn read_vbyte(&mut self) -> Result<u64>;
}

impl<B: BitWrite<BE>> VByteWrite for B {
    fn write_vbyte(&mut self, mut value: u64) -> Result<usize> {
        let mut bits = 0;
        loop {
            let byte = (value & 0x7f) as u64;
            value >>= 7;
            if value == 0 {
                bits += self.write_bits(byte, 8).map_err(|_| {
                    Error::StructuralFile("vbyte write failed".into())
                })?;
                break;
            }
            bits += self.write_bits(byte | 0x80, 8).map_err(|_| {
                Error::StructuralFile("vbyte write failed".into())
            })?;
        }
        Ok(bits)
    }
}

impl<B: BitRead<BE>> VByteRead for B {
    fn read_vbyte(&mut self) -> Result<u64> {
        let mut value: u64 = 0;
        for i in 0..VBYTE_MAX_BYTES {
            let byte = self
                .read_bits(8)
                .map_err(|_| Error::StructuralFile("truncated vbyte".into()))?;
            value |= (byte & 0x7f) << (7 * i);
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(Error::StructuralFile("vbyte exceeds 10 bytes".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vbyte_roundtrip() {
        let values = [0u64, 1, 127, 128, 300, 16384, u32::MAX as u64, u64::MAX];
        let mut w = writer();
        for &v in &values {
            w.write_vbyte(v).unwrap();
        }
        let words = w.into_inner().unwrap().into_inner();
        let mut r = reader(&words);
        for &v in &values {
            assert_eq!(r.read_vbyte().unwrap(), v);
        }
    }
}
