//! Neighborhood iterator: unifies Exact/Contains/Decompress walks through
//! grammar productions (`spec.md` §4.9, component C9).
//!
//! The original protocol is an explicit descent stack returning one edge
//! per call, `0` on exhaustion, `-1` on error (`spec.md` §4.9/§7). Idiomatic
//! Rust expresses the same state machine as `Iterator<Item =
//! Result<HEdge>>`: `None` is exhaustion, `Some(Err(_))` is the error path,
//! both already "auto-release" since the iterator (and its descent stack)
//! is simply dropped.

use crate::error::{Error, Result};
use crate::grammar::GrammarFile;
use crate::hypergraph::HEdge;

/// A query pattern position: a concrete node, or a wildcard matching any
/// node at that position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pos {
    Node(u64),
    Any,
}

impl Pos {
    fn concrete(self) -> Option<u64> {
        match self {
            Pos::Node(n) => Some(n),
            Pos::Any => None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum QueryMode {
    /// Edges whose node list equals `pattern` position-by-position
    /// (wildcards match anything); `rank` must also match.
    Exact { rank: u64, pattern: Vec<Pos> },
    /// Edges incident to every non-wildcard node of `pattern`, regardless
    /// of position; `rank` is a hint only, not a filter.
    Contains { pattern: Vec<Pos> },
    /// Every edge, ascending start-symbol edge id.
    Decompress,
}

/// Deduplicated, order-preserving list of the pattern's concrete nodes
/// (`spec.md` §9 "Wildcard deduplication").
fn dedup_concrete(pattern: &[Pos]) -> Vec<u64> {
    let mut out = Vec::new();
    for p in pattern {
        if let Some(n) = p.concrete() {
            if !out.contains(&n) {
                out.push(n);
            }
        }
    }
    out
}

struct Frame<'a> {
    rule: &'a crate::grammar::RuleView,
    rhs_pos: usize,
    position_map: Vec<u64>,
}

/// Lazy pull iterator over edges satisfying a [`QueryMode`].
pub struct NeighborhoodIter<'a> {
    file: &'a GrammarFile,
    mode: QueryMode,
    filter_nodes: Vec<u64>,
    candidates: Vec<u64>,
    cursor: usize,
    stack: Vec<Frame<'a>>,
    done: bool,
}

enum Step {
    Emit(HEdge),
    Descend,
    Skip,
}

impl<'a> NeighborhoodIter<'a> {
    pub fn new(file: &'a GrammarFile, mode: QueryMode) -> Self {
        let (pattern, seed): (&[Pos], Option<u64>) = match &mode {
            QueryMode::Exact { pattern, .. } | QueryMode::Contains { pattern } => {
                let concrete = dedup_concrete(pattern);
                (pattern.as_slice(), concrete.first().copied())
            }
            QueryMode::Decompress => (&[], None),
        };
        let filter_nodes = dedup_concrete(pattern);
        let candidates: Vec<u64> = if matches!(mode, QueryMode::Decompress) {
            (0..file.start.num_edges() as u64).collect()
        } else {
            match seed {
                Some(n) => file.start.matrix.row_iter(n),
                None => (0..file.start.num_edges() as u64).collect(),
            }
        };
        Self {
            file,
            mode,
            filter_nodes,
            candidates,
            cursor: 0,
            stack: Vec::new(),
            done: false,
        }
    }

    fn passes_matrix_filter(&self, eid: u64) -> bool {
        self.filter_nodes
            .iter()
            .all(|&v| self.file.start.matrix.get(v, eid))
    }

    fn leaf_step(&self, label: u64, nodes: Vec<u64>) -> Step {
        match &self.mode {
            QueryMode::Decompress => Step::Emit(HEdge::new(label, nodes)),
            QueryMode::Contains { pattern } => {
                let ok = pattern.iter().all(|p| match p {
                    Pos::Any => true,
                    Pos::Node(n) => nodes.contains(n),
                });
                if ok {
                    Step::Emit(HEdge::new(label, nodes))
                } else {
                    Step::Skip
                }
            }
            QueryMode::Exact { rank, pattern } => {
                if nodes.len() as u64 != *rank || nodes.len() != pattern.len() {
                    return Step::Skip;
                }
                let ok = pattern
                    .iter()
                    .zip(nodes.iter())
                    .all(|(p, &n)| matches!(p, Pos::Any) || matches!(p, Pos::Node(v) if *v == n));
                if ok {
                    Step::Emit(HEdge::new(label, nodes))
                } else {
                    Step::Skip
                }
            }
        }
    }

    /// Classifies a (label, nodes) occurrence: a terminal label is tested
    /// against the query immediately; a nonterminal pushes a descent frame
    /// and is never itself emitted.
    fn classify(&mut self, label: u64, nodes: Vec<u64>) -> Result<Step> {
        if self.file.grammar.is_nonterminal(label) {
            let rule = self
                .file
                .grammar
                .rule_for_label(label)
                .ok_or_else(|| Error::StructuralFile("dangling nonterminal label".into()))?;
            if nodes.len() as u64 != rule.rank {
                return Err(Error::StructuralFile(
                    "rule rank does not match occurrence node count".into(),
                ));
            }
            self.stack.push(Frame {
                rule,
                rhs_pos: 0,
                position_map: nodes,
            });
            Ok(Step::Descend)
        } else {
            Ok(self.leaf_step(label, nodes))
        }
    }
}

impl<'a> Iterator for NeighborhoodIter<'a> {
    type Item = Result<HEdge>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            if let Some(frame) = self.stack.last_mut() {
                if frame.rhs_pos >= frame.rule.rhs.len() {
                    self.stack.pop();
                    continue;
                }
                let edge = &frame.rule.rhs[frame.rhs_pos];
                frame.rhs_pos += 1;
                let label = edge.label;
                let nodes: Vec<u64> = edge.idx.iter().map(|&p| frame.position_map[p]).collect();
                match self.classify(label, nodes) {
                    Ok(Step::Emit(e)) => return Some(Ok(e)),
                    Ok(Step::Descend) | Ok(Step::Skip) => continue,
                    Err(e) => {
                        self.done = true;
                        return Some(Err(e));
                    }
                }
            } else {
                if self.cursor >= self.candidates.len() {
                    self.done = true;
                    return None;
                }
                let eid = self.candidates[self.cursor];
                self.cursor += 1;
                if !self.passes_matrix_filter(eid) {
                    continue;
                }
                let label = self.file.start.labels.get(eid as usize);
                let nodes = self.file.start.edge_nodes(eid);
                match self.classify(label, nodes) {
                    Ok(Step::Emit(e)) => return Some(Ok(e)),
                    Ok(Step::Descend) | Ok(Step::Skip) => continue,
                    Err(e) => {
                        self.done = true;
                        return Some(Err(e));
                    }
                }
            }
        }
    }
}

/// Terminates the iterator immediately, releasing its descent stack
/// (`spec.md` §5 "Cancellation"). Idiomatic equivalent of the handle's
/// `finish()`: just drop the iterator.
pub fn finish(iter: NeighborhoodIter<'_>) {
    drop(iter);
}
