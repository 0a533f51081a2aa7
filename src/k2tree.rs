//! k²-tree: compressed binary matrix (`spec.md` §4.4, component C4).
//!
//! Recursively partitions an `s x s` grid (`s` the least power of two
//! covering `max(rows, cols)`) into quadrants; a node bit is 1 iff any
//! descendant cell is 1. The tree is serialized level-order into two bit
//! sequences: `t` holds every internal level, `l` holds the leaf level.
//! Child offsets are computed with the standard k²-tree rank trick: the
//! children of the `j`-th 1-bit within a level begin at
//! `level_start[level + 1] + j * 4`, where `j` is the rank of that bit
//! *within its own level* (`rank1_T(pos) - ones_before[level]`).
//!
//! This crate's incidence matrix is always used as a node -> edge reverse
//! index (`spec.md` §9 "Matrix vs lists"), so the two operations the query
//! engine actually drives are [`K2Tree::row_iter`] (smallest candidate set
//! for a seed node) and [`K2Tree::column`] (materializing one edge's
//! endpoints).

use crate::bitseq::BitSeq;
use crate::error::Result;

const K: u64 = 2;
const K2: u64 = K * K;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    T,
    L,
}

#[derive(Debug, Clone)]
pub struct K2Tree {
    rows: u64,
    cols: u64,
    size: u64,
    height: u32,
    /// Number of levels stored in `t` (the leaf level lives in `l` instead).
    num_t_levels: u32,
    t: BitSeq,
    l: BitSeq,
    /// `level_start[k]` = bit offset in `t` where level `k` begins;
    /// `level_start[num_t_levels]` is a sentinel equal to `t.len()`.
    level_start: Vec<usize>,
    /// `ones_before[k]` = `t.rank1(level_start[k])`.
    ones_before: Vec<u64>,
}

#[derive(Default, Clone)]
struct Frame {
    row0: u64,
    col0: u64,
    points: Vec<usize>,
}

impl K2Tree {
    /// Builds a k²-tree over a `rows x cols` matrix from a list of 1-cells.
    /// Duplicate `(row, col)` pairs are tolerated (collapsed at the leaf).
    pub fn build(rows: u64, cols: u64, points: &[(u64, u64)], factor: usize) -> Self {
        let dim = rows.max(cols).max(1);
        let mut size = 2u64;
        let mut height = 1u32;
        while size < dim {
            size <<= 1;
            height += 1;
        }
        let num_t_levels = height - 1;

        let mut t_bits: Vec<bool> = Vec::new();
        let mut l_bits: Vec<bool> = Vec::new();
        let mut level_start = vec![0usize];
        let mut ones_before = vec![0u64];

        let mut current = vec![Frame {
            row0: 0,
            col0: 0,
            points: (0..points.len()).collect(),
        }];
        let mut cur_size = size;

        for _level in 0..height {
            let half = cur_size / 2;
            let mut next: Vec<Frame> = Vec::new();
            for frame in &current {
                let mut quads: [Vec<usize>; 4] = Default::default();
                for &pi in &frame.points {
                    let (r, c) = points[pi];
                    let rb = (r >= frame.row0 + half) as u64;
                    let cb = (c >= frame.col0 + half) as u64;
                    quads[(rb * 2 + cb) as usize].push(pi);
                }
                for (q, pts) in quads.into_iter().enumerate() {
                    let has = !pts.is_empty();
                    if half == 1 {
                        l_bits.push(has);
                    } else {
                        t_bits.push(has);
                        if has {
                            let rb = (q / 2) as u64;
                            let cb = (q % 2) as u64;
                            next.push(Frame {
                                row0: frame.row0 + rb * half,
                                col0: frame.col0 + cb * half,
                                points: pts,
                            });
                        }
                    }
                }
            }
            if half > 1 {
                level_start.push(t_bits.len());
                let ones = t_bits.iter().filter(|b| **b).count() as u64;
                ones_before.push(ones);
            }
            current = next;
            cur_size = half;
        }

        let t = BitSeq::build(t_bits.len(), factor, |i| t_bits[i]);
        let l = BitSeq::build(l_bits.len(), factor, |i| l_bits[i]);
        Self {
            rows,
            cols,
            size,
            height,
            num_t_levels,
            t,
            l,
            level_start,
            ones_before,
        }
    }

    /// Children offset of the node whose own bit sits at `pos` within `t`,
    /// at depth `level`. Returns where to look for that node's 4 children.
    fn children_offset(&self, level: u32, pos: usize) -> (Target, usize) {
        let ones_in_level_before = self.t.rank1(pos) - self.ones_before[level as usize];
        let base = (ones_in_level_before * K2) as usize;
        if level + 1 < self.num_t_levels {
            (Target::T, self.level_start[level as usize + 1] + base)
        } else {
            (Target::L, base)
        }
    }

    pub fn get(&self, r: u64, c: u64) -> bool {
        if r >= self.rows || c >= self.cols {
            return false;
        }
        let mut row0 = 0u64;
        let mut col0 = 0u64;
        let mut size = self.size;
        let mut target = if self.num_t_levels > 0 {
            Target::T
        } else {
            Target::L
        };
        let mut base = 0usize;
        for level in 0..self.height {
            let half = size / 2;
            let rb = (r >= row0 + half) as u64;
            let cb = (c >= col0 + half) as u64;
            let quad = (rb * 2 + cb) as usize;
            let pos = base + quad;
            let bit = match target {
                Target::T => self.t.get(pos),
                Target::L => self.l.get(pos),
            };
            if !bit {
                return false;
            }
            if target == Target::L {
                return true;
            }
            let (next_target, next_base) = self.children_offset(level, pos);
            target = next_target;
            base = next_base;
            row0 += rb * half;
            col0 += cb * half;
            size = half;
        }
        unreachable!("descended past tree height without reaching a leaf");
    }

    /// Column indices `c` with `M[r, c] = 1`, ascending.
    pub fn row_iter(&self, r: u64) -> Vec<u64> {
        let mut out = Vec::new();
        if r >= self.rows {
            return out;
        }
        self.walk_fixed_row(0, 0, self.size, 0, Target::T_or_root(self.num_t_levels), r, &mut out);
        out
    }

    fn walk_fixed_row(
        &self,
        row0: u64,
        col0: u64,
        size: u64,
        base: usize,
        target: Target,
        r: u64,
        out: &mut Vec<u64>,
    ) {
        let half = size / 2;
        let rb = (r >= row0 + half) as u64;
        for cb in 0..K {
            let quad = (rb * 2 + cb) as usize;
            let pos = base + quad;
            let bit = match target {
                Target::T => self.t.get(pos),
                Target::L => self.l.get(pos),
            };
            if !bit {
                continue;
            }
            let new_col0 = col0 + cb * half;
            if target == Target::L {
                if new_col0 < self.cols {
                    out.push(new_col0);
                }
                continue;
            }
            // level is implicit in `target`/`base`; recompute via rank trick
            let level = self.level_of(base);
            let (next_target, next_base) = self.children_offset(level, pos);
            self.walk_fixed_row(row0 + rb * half, new_col0, half, next_base, next_target, r, out);
        }
    }

    /// Row indices `r` with `M[r, c] = 1`, ascending; this is the
    /// materializing operation the spec calls `column(c)`.
    pub fn column(&self, c: u64) -> Vec<u64> {
        let mut out = Vec::new();
        if c >= self.cols {
            return out;
        }
        self.walk_fixed_col(0, 0, self.size, 0, Target::T_or_root(self.num_t_levels), c, &mut out);
        out
    }

    fn walk_fixed_col(
        &self,
        row0: u64,
        col0: u64,
        size: u64,
        base: usize,
        target: Target,
        c: u64,
        out: &mut Vec<u64>,
    ) {
        let half = size / 2;
        let cb = (c >= col0 + half) as u64;
        for rb in 0..K {
            let quad = (rb * 2 + cb) as usize;
            let pos = base + quad;
            let bit = match target {
                Target::T => self.t.get(pos),
                Target::L => self.l.get(pos),
            };
            if !bit {
                continue;
            }
            let new_row0 = row0 + rb * half;
            if target == Target::L {
                if new_row0 < self.rows {
                    out.push(new_row0);
                }
                continue;
            }
            let level = self.level_of(base);
            let (next_target, next_base) = self.children_offset(level, pos);
            self.walk_fixed_col(new_row0, col0 + cb * half, half, next_base, next_target, c, out);
        }
    }

    /// Recovers which level a `t`-relative `base` offset belongs to by
    /// scanning `level_start`; `num_t_levels` is always small (`O(log s)`).
    fn level_of(&self, base: usize) -> u32 {
        for level in (0..self.num_t_levels as usize).rev() {
            if base >= self.level_start[level] {
                return level as u32;
            }
        }
        0
    }

    pub fn rows(&self) -> u64 {
        self.rows
    }

    pub fn cols(&self) -> u64 {
        self.cols
    }

    pub fn write(&self, w: &mut crate::bits::Writer) -> Result<()> {
        use crate::bits::VByteWrite;
        w.write_vbyte(self.rows)?;
        w.write_vbyte(self.cols)?;
        w.write_vbyte(self.size)?;
        w.write_vbyte(self.height as u64)?;
        self.t.write(w)?;
        self.l.write(w)?;
        Ok(())
    }

    pub fn read(r: &mut crate::bits::Reader<'_>) -> Result<Self> {
        use crate::bits::VByteRead;
        let rows = r.read_vbyte()?;
        let cols = r.read_vbyte()?;
        let size = r.read_vbyte()?;
        let height = r.read_vbyte()? as u32;
        let num_t_levels = height - 1;
        let t = BitSeq::read(r)?;
        let l = BitSeq::read(r)?;

        // Level boundaries are not stored directly: they are fully
        // determined by `t`'s content once `height` is known, since level
        // `k+1`'s length is exactly `4 * (live nodes in level k)`. Replay
        // that recurrence starting from the implicit root.
        let mut level_start = vec![0usize];
        let mut ones_before = vec![0u64];
        let mut start = 0usize;
        let mut ones_acc = 0u64;
        let mut live = 1u64; // the implicit root
        for _ in 0..num_t_levels {
            let level_len = live * K2;
            let end = (start + level_len as usize).min(t.len());
            let ones_here = t.rank1(end) - ones_acc;
            ones_acc += ones_here;
            start += level_len as usize;
            level_start.push(start);
            ones_before.push(ones_acc);
            live = ones_here;
        }

        Ok(Self {
            rows,
            cols,
            size,
            height,
            num_t_levels,
            t,
            l,
            level_start,
            ones_before,
        })
    }
}

impl Target {
    #[allow(non_snake_case)]
    fn T_or_root(num_t_levels: u32) -> Target {
        if num_t_levels > 0 {
            Target::T
        } else {
            Target::L
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn naive_get(points: &[(u64, u64)], r: u64, c: u64) -> bool {
        points.iter().any(|&(pr, pc)| pr == r && pc == c)
    }

    #[test]
    fn point_queries_match_naive() {
        let points = vec![(0u64, 1u64), (1, 2), (2, 0), (3, 3), (0, 0)];
        let tree = K2Tree::build(4, 4, &points, 2);
        for r in 0..4 {
            for c in 0..4 {
                assert_eq!(tree.get(r, c), naive_get(&points, r, c), "at ({r},{c})");
            }
        }
    }

    #[test]
    fn row_iter_and_column_agree_with_points() {
        let points = vec![(0u64, 1u64), (1, 2), (2, 0), (3, 3), (0, 0), (2, 3)];
        let tree = K2Tree::build(4, 4, &points, 2);
        for r in 0..4 {
            let mut expect: Vec<u64> = points
                .iter()
                .filter(|&&(pr, _)| pr == r)
                .map(|&(_, c)| c)
                .collect();
            expect.sort_unstable();
            expect.dedup();
            let mut got = tree.row_iter(r);
            got.sort_unstable();
            assert_eq!(got, expect, "row {r}");
        }
        for c in 0..4 {
            let mut expect: Vec<u64> = points
                .iter()
                .filter(|&&(_, pc)| pc == c)
                .map(|&(r, _)| r)
                .collect();
            expect.sort_unstable();
            expect.dedup();
            let mut got = tree.column(c);
            got.sort_unstable();
            assert_eq!(got, expect, "col {c}");
        }
    }

    #[test]
    fn non_square_and_odd_dimensions() {
        let points = vec![(0u64, 4u64), (2, 1), (4, 4)];
        let tree = K2Tree::build(5, 5, &points, 2);
        for &(r, c) in &points {
            assert!(tree.get(r, c));
        }
        assert!(!tree.get(1, 1));
    }
}
