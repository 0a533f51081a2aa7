//! Writer/reader façade handles and their lifecycle state machines
//! (`spec.md` §3 "Lifecycles", §4.10, component C10).

use std::path::Path;

use mmap_rs::{Mmap, MmapOptions};

use crate::error::{Error, Result};
use crate::grammar::{self, GrammarFile};
use crate::hypergraph::{HEdge, Hypergraph};
use crate::params::Params;
use crate::query::{NeighborhoodIter, Pos, QueryMode};
use crate::repair::{self, Grammar};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriterState {
    Accumulating,
    Compressed,
    Destroyed,
}

/// `init | add_edge | set_params | compress | write | destroy`
/// (`spec.md` §4.10). `add_edge` after `compress` is a [`Error::StateViolation`].
pub struct WriterHandle {
    state: WriterState,
    params: Params,
    graph: Hypergraph,
    grammar: Option<Grammar>,
}

impl WriterHandle {
    pub fn new(params: Params) -> Self {
        Self {
            state: WriterState::Accumulating,
            params,
            graph: Hypergraph::new(),
            grammar: None,
        }
    }

    pub fn set_params(&mut self, params: Params) -> Result<()> {
        if self.state != WriterState::Accumulating {
            return Err(Error::StateViolation(
                "set_params after compress is not allowed",
            ));
        }
        self.params = params;
        Ok(())
    }

    /// Returns `false` if the edge was a duplicate (not an error).
    pub fn add_edge(&mut self, edge: HEdge) -> Result<bool> {
        if self.state != WriterState::Accumulating {
            return Err(Error::StateViolation("add_edge after compress"));
        }
        self.graph.add_edge(&self.params, edge)
    }

    /// Runs RePair and discards the edge list, retaining only the grammar.
    pub fn compress(&mut self) -> Result<()> {
        if self.state != WriterState::Accumulating {
            return Err(Error::StateViolation("compress called twice"));
        }
        if self.graph.is_empty() {
            return Err(Error::StateViolation("compress on an empty graph"));
        }
        let grammar = repair::run_repair(&self.graph, &self.params)?;
        self.grammar = Some(grammar);
        self.graph = Hypergraph::new();
        self.state = WriterState::Compressed;
        Ok(())
    }

    /// Serializes the compressed grammar to `path`.
    pub fn write(&mut self, path: impl AsRef<Path>) -> Result<()> {
        if self.state != WriterState::Compressed {
            return Err(Error::StateViolation("write before compress"));
        }
        let grammar = self
            .grammar
            .as_ref()
            .expect("Compressed state implies a grammar is present");
        let node_count = grammar
            .start_edges
            .iter()
            .flat_map(|e| e.nodes.iter())
            .copied()
            .max()
            .map_or(0, |m| m + 1);
        let bytes = grammar::write_file(grammar, node_count, &self.params)?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    pub fn destroy(mut self) {
        self.state = WriterState::Destroyed;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReaderState {
    Open,
    Destroyed,
}

/// `init(path) | node_count | edge_label_count | edges_all | edges(...) |
/// edge_exists(...) | destroy` (`spec.md` §4.10). Read-only; holds a single
/// memory mapping for the file's lifetime.
pub struct ReaderHandle {
    state: ReaderState,
    _mmap: Mmap,
    file: GrammarFile,
}

impl ReaderHandle {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let f = std::fs::File::open(path)?;
        let len = f.metadata()?.len() as usize;
        let mmap = unsafe {
            MmapOptions::new(len.max(1))
                .map_err(|e| Error::StructuralFile(format!("mmap setup failed: {e}")))?
                .with_file(&f, 0)
                .map()
                .map_err(|e| Error::StructuralFile(format!("mmap failed: {e}")))?
        };
        // node_count isn't stored as its own field on disk; it is the
        // matrix's own row count, recovered while parsing.
        let file = GrammarFile::parse(mmap.as_slice(), 0)?;
        let node_count = file.start.matrix.rows();
        let file = GrammarFile {
            node_count,
            ..file
        };
        Ok(Self {
            state: ReaderState::Open,
            _mmap: mmap,
            file,
        })
    }

    fn check_open(&self) -> Result<()> {
        if self.state != ReaderState::Open {
            return Err(Error::StateViolation("reader handle used after destroy"));
        }
        Ok(())
    }

    pub fn node_count(&self) -> Result<u64> {
        self.check_open()?;
        Ok(self.file.node_count)
    }

    pub fn edge_label_count(&self) -> Result<u64> {
        self.check_open()?;
        Ok(self.file.grammar.terminal_count)
    }

    pub fn edges_all(&self) -> Result<NeighborhoodIter<'_>> {
        self.check_open()?;
        Ok(NeighborhoodIter::new(&self.file, QueryMode::Decompress))
    }

    /// `no_order` selects `Contains` (position-insensitive) over `Exact`
    /// (position-sensitive); `spec.md` §9 flags this as the one place the
    /// original's naming ("order" vs "exactness") is ambiguous — kept as a
    /// boolean switch between the two modes rather than a third axis.
    pub fn edges(&self, rank: u64, nodes: &[Option<u64>], no_order: bool) -> Result<NeighborhoodIter<'_>> {
        self.check_open()?;
        let pattern: Vec<Pos> = nodes
            .iter()
            .map(|n| n.map_or(Pos::Any, Pos::Node))
            .collect();
        let mode = if no_order {
            QueryMode::Contains { pattern }
        } else {
            QueryMode::Exact { rank, pattern }
        };
        Ok(NeighborhoodIter::new(&self.file, mode))
    }

    /// Existence check; consumes at most one edge from a fresh iterator.
    pub fn edge_exists(&self, rank: u64, nodes: &[Option<u64>], exact: bool) -> Result<bool> {
        self.check_open()?;
        let mut iter = self.edges(rank, nodes, !exact)?;
        match iter.next() {
            Some(Ok(_)) => Ok(true),
            Some(Err(e)) => Err(e),
            None => Ok(false),
        }
    }

    pub fn destroy(mut self) {
        self.state = ReaderState::Destroyed;
    }
}
