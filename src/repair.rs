//! RePair grammar compression over hyperedges (`spec.md` §4.6, component
//! C6) — the hard core of this crate.
//!
//! Iteratively: enumerate digrams (pairs of hyperedges sharing >= 1 node)
//! via node adjacency, pick the most frequent under the spec's tie-break
//! rules, replace every non-overlapping occurrence with a fresh
//! nonterminal, and repeat until no digram reaches the frequency floor.

use std::collections::{HashMap, HashSet};

use log::debug;

use crate::error::Result;
use crate::hypergraph::{HEdge, Hypergraph};
use crate::params::Params;

/// A content-addressed dictionary of index functions (`spec.md` §3, §9
/// "Index-function interning"). Every terminal or nonterminal occurrence
/// references one of these by id.
#[derive(Debug, Default, Clone)]
pub struct IfTable {
    entries: Vec<Vec<usize>>,
    index: HashMap<Vec<usize>, usize>,
}

impl IfTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&mut self, idx: Vec<usize>) -> usize {
        if let Some(&id) = self.index.get(&idx) {
            return id;
        }
        let id = self.entries.len();
        self.index.insert(idx.clone(), id);
        self.entries.push(idx);
        id
    }

    pub fn get(&self, id: usize) -> &[usize] {
        &self.entries[id]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Vec<usize>> {
        self.entries.iter()
    }
}

/// One edge on the right-hand side of a rule, expressed relative to the
/// rule's own `rank`-sized external position space rather than concrete
/// node ids.
#[derive(Debug, Clone)]
pub struct RuleEdge {
    pub label: u64,
    pub if_id: usize,
}

/// `NT_k -> HEdge_sequence` (`spec.md` §3).
#[derive(Debug, Clone)]
pub struct Rule {
    pub rank: u64,
    pub rhs: Vec<RuleEdge>,
}

/// The straight-line hyperedge-replacement grammar produced by RePair:
/// rules plus the (still abstract, not yet succinctly encoded) start
/// symbol edge set.
#[derive(Debug, Clone)]
pub struct Grammar {
    pub terminal_count: u64,
    pub rules: Vec<Rule>,
    pub if_table: IfTable,
    pub start_edges: Vec<HEdge>,
}

impl Grammar {
    pub fn nonterminal_label(&self, rule_index: usize) -> u64 {
        self.terminal_count + rule_index as u64
    }

    pub fn is_nonterminal(&self, label: u64) -> bool {
        label >= self.terminal_count
    }

    pub fn rule_for_label(&self, label: u64) -> Option<&Rule> {
        if !self.is_nonterminal(label) {
            return None;
        }
        self.rules.get((label - self.terminal_count) as usize)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
struct DigramKey {
    label_lo: u64,
    label_hi: u64,
    signature: Vec<(u32, u32)>,
}

#[derive(Debug, Default)]
struct DigramOccurrence {
    // (index of lo-ordered edge, index of hi-ordered edge) in `current`
    pairs: Vec<(usize, usize)>,
}

/// Orders two edges by label, returning `(lo, hi)`; `signature` entries are
/// `(position in lo, position in hi)`.
fn ordered(a: &HEdge, b: &HEdge) -> (&HEdge, &HEdge) {
    if a.label <= b.label {
        (a, b)
    } else {
        (b, a)
    }
}

fn canonical_key(a: &HEdge, b: &HEdge) -> DigramKey {
    let (lo, hi) = ordered(a, b);
    let mut signature = Vec::new();
    for (pa, &na) in lo.nodes.iter().enumerate() {
        for (pb, &nb) in hi.nodes.iter().enumerate() {
            if na == nb {
                signature.push((pa as u32, pb as u32));
            }
        }
    }
    signature.sort_unstable();
    DigramKey {
        label_lo: lo.label,
        label_hi: hi.label,
        signature,
    }
}

/// Builds the structural (value-independent) position template shared by
/// every occurrence of a digram key: which rule-external position each
/// `lo`/`hi` position maps to, and the resulting external rank `r*`.
fn build_template(rank_lo: usize, rank_hi: usize, signature: &[(u32, u32)]) -> (Vec<usize>, Vec<usize>, usize) {
    const UNSET: usize = usize::MAX;
    let mut lo_if = vec![UNSET; rank_lo];
    let mut hi_if = vec![UNSET; rank_hi];
    let mut next = 0usize;
    for p in 0..rank_lo {
        if lo_if[p] != UNSET {
            continue;
        }
        lo_if[p] = next;
        for &(spa, spb) in signature {
            if spa as usize == p && hi_if[spb as usize] == UNSET {
                hi_if[spb as usize] = next;
            }
        }
        next += 1;
    }
    for p in 0..rank_hi {
        if hi_if[p] == UNSET {
            hi_if[p] = next;
            next += 1;
        }
    }
    (lo_if, hi_if, next)
}

/// Runs RePair to convergence and returns the resulting grammar.
pub fn run_repair(graph: &Hypergraph, params: &Params) -> Result<Grammar> {
    let terminal_count = graph.edge_label_count();
    let mut current: Vec<HEdge> = graph.sorted_for_repair();
    let mut rules: Vec<Rule> = Vec::new();
    let mut if_table = IfTable::new();

    loop {
        let adjacency = build_adjacency(&current);
        let mut counts: HashMap<DigramKey, DigramOccurrence> = HashMap::new();
        for i in 0..current.len() {
            let mut partners: HashSet<usize> = HashSet::new();
            for &n in &current[i].nodes {
                if let Some(edges) = adjacency.get(&n) {
                    for &j in edges {
                        if j > i {
                            partners.insert(j);
                        }
                    }
                }
            }
            // `partners` is a hash set: its iteration order is seed-dependent
            // and, when two partners of `i` collapse to the same digram key,
            // that order decides which overlapping pair `apply_replacement`'s
            // greedy pass keeps. Sort before recording occurrences so the
            // chosen grammar is byte-identical across runs (`spec.md` §4.6
            // "Determinism").
            let mut partners: Vec<usize> = partners.into_iter().collect();
            partners.sort_unstable();
            for j in partners {
                let key = canonical_key(&current[i], &current[j]);
                counts.entry(key).or_default().pairs.push((i, j));
            }
        }

        let chosen = pick_best_digram(&counts, &current, params);
        let Some((key, occ)) = chosen else {
            break;
        };

        debug!(
            "repair: selected digram {:?} with {} occurrences",
            key,
            occ.pairs.len()
        );
        apply_replacement(
            &mut current,
            &key,
            occ,
            &mut rules,
            &mut if_table,
            terminal_count,
        );
    }

    if params.monograms {
        apply_monograms(&mut current, &mut rules, &mut if_table, terminal_count);
    }

    Ok(Grammar {
        terminal_count,
        rules,
        if_table,
        start_edges: current,
    })
}

fn build_adjacency(edges: &[HEdge]) -> HashMap<u64, Vec<usize>> {
    let mut adjacency: HashMap<u64, Vec<usize>> = HashMap::new();
    for (i, e) in edges.iter().enumerate() {
        for &n in &e.nodes {
            adjacency.entry(n).or_default().push(i);
        }
    }
    adjacency
}

fn pick_best_digram<'a>(
    counts: &'a HashMap<DigramKey, DigramOccurrence>,
    current: &[HEdge],
    params: &Params,
) -> Option<(DigramKey, &'a DigramOccurrence)> {
    let mut best: Option<(DigramKey, &DigramOccurrence, u64, u64)> = None; // key, occ, count, combined_rank
    for (key, occ) in counts {
        if occ.pairs.len() < 2 {
            continue;
        }
        let &(i, j) = occ.pairs.first().unwrap();
        let (lo, hi) = ordered(&current[i], &current[j]);
        let (_, _, r_star) = build_template(lo.nodes.len(), hi.nodes.len(), &key.signature);
        if r_star as u64 > 0 && params.max_rank != 0 && r_star as u64 > params.max_rank {
            continue;
        }
        if r_star as u64 > crate::params::LIMIT_MAX_RANK {
            continue;
        }
        if r_star == 1 && !params.monograms {
            continue;
        }
        let combined_rank = lo.nodes.len() as u64 + hi.nodes.len() as u64;
        let count = occ.pairs.len() as u64;
        let better = match &best {
            None => true,
            Some((bkey, _, bcount, bcombined)) => {
                count > *bcount
                    || (count == *bcount && combined_rank > *bcombined)
                    || (count == *bcount && combined_rank == *bcombined && key < bkey)
            }
        };
        if better {
            best = Some((key.clone(), occ, count, combined_rank));
        }
    }
    best.map(|(k, occ, _, _)| (k, occ))
}

fn apply_replacement(
    current: &mut Vec<HEdge>,
    key: &DigramKey,
    occ: &DigramOccurrence,
    rules: &mut Vec<Rule>,
    if_table: &mut IfTable,
    terminal_count: u64,
) {
    let mut used: HashSet<usize> = HashSet::new();
    let mut replacements: Vec<(usize, usize, HEdge)> = Vec::new(); // (i, j, new edge)
    let mut template: Option<(Vec<usize>, Vec<usize>, usize)> = None;

    for &(i, j) in &occ.pairs {
        if used.contains(&i) || used.contains(&j) {
            continue;
        }
        let (lo, hi) = ordered(&current[i], &current[j]);
        let tmpl = template.get_or_insert_with(|| {
            build_template(lo.nodes.len(), hi.nodes.len(), &key.signature)
        });
        let (lo_if, hi_if, r_star) = tmpl;
        let mut order = vec![0u64; *r_star];
        for (p, &n) in lo.nodes.iter().enumerate() {
            order[lo_if[p]] = n;
        }
        for (p, &n) in hi.nodes.iter().enumerate() {
            order[hi_if[p]] = n;
        }
        used.insert(i);
        used.insert(j);
        let nt_label = terminal_count + rules.len() as u64;
        replacements.push((i, j, HEdge::new(nt_label, order)));
    }

    if replacements.is_empty() {
        return;
    }

    let (_, _, rule) = template
        .map(|(lo_if, hi_if, r_star)| {
            let (i0, j0) = occ.pairs[0];
            let (lo, hi) = ordered(&current[i0], &current[j0]);
            let lo_if_id = if_table.intern(lo_if);
            let hi_if_id = if_table.intern(hi_if);
            (
                lo.label,
                hi.label,
                Rule {
                    rank: r_star as u64,
                    rhs: vec![
                        RuleEdge {
                            label: lo.label,
                            if_id: lo_if_id,
                        },
                        RuleEdge {
                            label: hi.label,
                            if_id: hi_if_id,
                        },
                    ],
                },
            )
        })
        .unwrap();
    rules.push(rule);

    let mut removed: HashSet<usize> = HashSet::new();
    let mut new_edges: Vec<HEdge> = Vec::new();
    for (i, j, edge) in replacements {
        removed.insert(i);
        removed.insert(j);
        new_edges.push(edge);
    }
    let mut next: Vec<HEdge> = current
        .iter()
        .enumerate()
        .filter(|(idx, _)| !removed.contains(idx))
        .map(|(_, e)| e.clone())
        .collect();
    next.extend(new_edges);
    *current = next;
}

/// A single pass promoting any terminal label with multiplicity >= 2 among
/// `current` into a one-edge rule. Not iterated to a fixed point; the
/// spec's "profitable by a size heuristic" termination is left as a single
/// greedy sweep (see `DESIGN.md`).
fn apply_monograms(
    current: &mut Vec<HEdge>,
    rules: &mut Vec<Rule>,
    if_table: &mut IfTable,
    terminal_count: u64,
) {
    let mut by_label: HashMap<u64, Vec<usize>> = HashMap::new();
    for (i, e) in current.iter().enumerate() {
        by_label.entry(e.label).or_default().push(i);
    }
    let mut promote: Vec<(u64, u64)> = Vec::new(); // (label, rank)
    for (&label, idxs) in &by_label {
        if idxs.len() < 2 {
            continue;
        }
        let rank = current[idxs[0]].nodes.len() as u64;
        if idxs.iter().all(|&i| current[i].nodes.len() as u64 == rank) {
            promote.push((label, rank));
        }
    }
    promote.sort_unstable();
    for (label, rank) in promote {
        let if_id = if_table.intern((0..rank as usize).collect());
        let nt_label = terminal_count + rules.len() as u64;
        rules.push(Rule {
            rank,
            rhs: vec![RuleEdge { label, if_id }],
        });
        for e in current.iter_mut() {
            if e.label == label {
                e.label = nt_label;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hypergraph::HEdge;

    fn edges(pairs: &[(u64, &[u64])]) -> Hypergraph {
        let mut g = Hypergraph::new();
        let p = Params::default();
        for &(label, nodes) in pairs {
            g.add_edge(&p, HEdge::new(label, nodes.to_vec())).unwrap();
        }
        g
    }

    #[test]
    fn single_edge_yields_no_rules() {
        let g = edges(&[(0, &[0, 1])]);
        let grammar = run_repair(&g, &Params::default()).unwrap();
        assert!(grammar.rules.is_empty());
        assert_eq!(grammar.start_edges.len(), 1);
    }

    #[test]
    fn repeated_triangle_pattern_creates_a_rule() {
        // Two disjoint copies of the same two-edge "digram" (same label
        // pair, same shared-position signature) should be merged.
        let g = edges(&[
            (1, &[0, 1]),
            (2, &[1, 2]),
            (1, &[3, 4]),
            (2, &[4, 5]),
        ]);
        let grammar = run_repair(&g, &Params::default()).unwrap();
        assert_eq!(grammar.rules.len(), 1);
        assert_eq!(grammar.start_edges.len(), 2);
        for e in &grammar.start_edges {
            assert!(grammar.is_nonterminal(e.label));
        }
    }

    #[test]
    fn max_rank_zero_blocks_replacement() {
        let g = edges(&[(1, &[0, 1]), (2, &[1, 2]), (1, &[3, 4]), (2, &[4, 5])]);
        let params = Params {
            max_rank: 1,
            ..Params::default()
        };
        let grammar = run_repair(&g, &params).unwrap();
        assert!(grammar.rules.is_empty());
    }
}
