//! CLI adapter for the hypergraph grammar core (`spec.md` §6.3).
//!
//! Thin wrapper, not part of the core's test surface: parses arguments,
//! streams edges into a [`cgraph::handle::WriterHandle`] or issues queries
//! against a [`cgraph::handle::ReaderHandle`], and translates library
//! errors into process exit codes.

use std::fs;
use std::io::{BufRead, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;

use cgraph::error::Error as CoreError;
use cgraph::handle::{ReaderHandle, WriterHandle};
use cgraph::hypergraph::HEdge;
use cgraph::io::{parse_line, InputFormat};
use cgraph::params::Params;

#[derive(Parser, Debug)]
#[command(
    name = "cgraph",
    about = "Compress and query directed, labeled hypergraphs with a succinct RePair grammar.",
    long_about = None
)]
struct Args {
    /// Compressed file to read, or plain hyperedge file to compress.
    input: PathBuf,

    /// Destination of the compressed file. Supplying this selects compress
    /// mode; omitting it selects query mode over `input`.
    output: Option<PathBuf>,

    /// Input line format: "labelfirst" (default) or "rankaslabel".
    #[arg(long)]
    format: Option<String>,

    /// Overwrite the output file (compress mode) if it already exists.
    #[arg(long, default_value_t = false)]
    overwrite: bool,

    /// Print advanced progress information.
    #[arg(short = 'v', long, default_value_t = false)]
    verbose: bool,

    // --- compression options ---
    /// Maximum rank of a rule's nonterminal; 0 removes the (soft) limit.
    #[arg(long)]
    max_rank: Option<u64>,

    /// Enable replacement of monograms (repeated unary edge labels).
    #[arg(long, default_value_t = false)]
    monograms: bool,

    /// Number of 64-bit blocks grouped into one rank/select superblock.
    #[arg(long)]
    factor: Option<usize>,

    /// Skip writing the optional nonterminal -> reachable-label table.
    #[arg(long, default_value_t = false)]
    no_table: bool,

    /// Use the RRR block-compressed bit-sequence variant.
    #[arg(long, default_value_t = false)]
    rrr: bool,

    // --- query commands (repeatable, evaluated in order) ---
    /// Decompress the whole graph to the given output file.
    #[arg(long, value_name = "OUT")]
    decompress: Option<PathBuf>,

    /// Pattern "rank,label,n0,n1,..." (label/nodes may be `?`); may be
    /// repeated.
    #[arg(long = "hyperedges", value_name = "PATTERN")]
    hyperedges: Vec<String>,

    /// Treat `--hyperedges` patterns as set-containment queries (node count
    /// need not equal rank).
    #[arg(long, default_value_t = false)]
    exist_query: bool,

    /// Treat `--hyperedges` patterns as exact positional-match queries.
    #[arg(long, default_value_t = false)]
    exact_query: bool,

    /// Sort emitted edges by (rank, label, nodes) before printing.
    #[arg(long, default_value_t = false)]
    sort_result: bool,

    /// Read one pattern per line from this file, same syntax as
    /// `--hyperedges`.
    #[arg(long, value_name = "PATH")]
    query_file: Option<PathBuf>,

    /// Print the number of distinct nodes.
    #[arg(long, default_value_t = false)]
    node_count: bool,

    /// Print the number of distinct edge labels.
    #[arg(long, default_value_t = false)]
    edge_labels: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let compress_opts_set = args.max_rank.is_some()
        || args.monograms
        || args.factor.is_some()
        || args.no_table
        || args.rrr
        || args.overwrite;
    let query_cmds_set = args.decompress.is_some()
        || !args.hyperedges.is_empty()
        || args.exist_query
        || args.exact_query
        || args.sort_result
        || args.query_file.is_some()
        || args.node_count
        || args.edge_labels;

    if let Some(output) = &args.output {
        if query_cmds_set {
            bail!("usage error: query commands cannot be combined with an output file (compress mode)");
        }
        run_compress(&args, output)
    } else {
        if compress_opts_set {
            bail!("usage error: compression options require an output file (compress mode)");
        }
        run_query(&args)
    }
}

fn run_compress(args: &Args, output: &PathBuf) -> Result<()> {
    if output.exists() && !args.overwrite {
        bail!(
            "output file {} already exists; pass --overwrite to replace it",
            output.display()
        );
    }

    let format = match args.format.as_deref() {
        None | Some("labelfirst") | Some("hyperedge") => InputFormat::LabelFirst,
        Some("rankaslabel") => InputFormat::RankAsLabel,
        Some(other) => bail!("unknown --format {other:?}"),
    };

    let mut params = Params::default();
    if let Some(max_rank) = args.max_rank {
        params.max_rank = max_rank;
    }
    params.monograms = args.monograms;
    if let Some(factor) = args.factor {
        params.factor = factor;
    }
    // DEFAULT_NT_TABLE is already false (`params::Params::default`); the
    // table is opt-in in the original and this CLI never turns it on, so
    // `--no-table` is accepted for command-line compatibility but has no
    // observable effect (see `DESIGN.md`).
    let _ = args.no_table;
    params.rrr = args.rrr;
    if args.rrr {
        eprintln!(
            "warning: --rrr is accepted but not yet implemented; writing the plain bit-sequence encoding instead"
        );
    }

    let mut writer = WriterHandle::new(params);
    let text = fs::read_to_string(&args.input)
        .with_context(|| format!("reading {}", args.input.display()))?;
    let mut edge_count = 0u64;
    for (lineno, line) in text.lines().enumerate() {
        match parse_line(line, format) {
            Ok(Some(edge)) => {
                writer
                    .add_edge(edge)
                    .with_context(|| format!("line {}: add_edge failed", lineno + 1))?;
                edge_count += 1;
            }
            Ok(None) => {}
            Err(e) => bail!("line {}: {e}", lineno + 1),
        }
    }
    if args.verbose {
        log::info!("parsed {edge_count} hyperedges from {}", args.input.display());
    }

    writer.compress().context("compress")?;
    if args.verbose {
        log::info!("grammar compressed, writing {}", output.display());
    }
    writer.write(output).context("write")?;
    writer.destroy();
    Ok(())
}

fn run_query(args: &Args) -> Result<()> {
    let reader = ReaderHandle::open(&args.input)
        .with_context(|| format!("opening {}", args.input.display()))?;

    if args.node_count {
        println!("{}", reader.node_count()?);
    }
    if args.edge_labels {
        println!("{}", reader.edge_label_count()?);
    }

    if let Some(out_path) = &args.decompress {
        let file = fs::File::create(out_path)
            .with_context(|| format!("creating {}", out_path.display()))?;
        let mut out = BufWriter::new(file);
        let mut edges: Vec<HEdge> = Vec::new();
        for edge in reader.edges_all()? {
            edges.push(edge.map_err(core_err)?);
        }
        if args.sort_result {
            sort_edges(&mut edges);
        }
        for edge in &edges {
            write_edge_line(&mut out, edge)?;
        }
        out.flush()?;
    }

    for pattern in &args.hyperedges {
        run_one_hyperedges_query(&reader, pattern, args)?;
    }

    if let Some(query_file) = &args.query_file {
        let file = fs::File::open(query_file)
            .with_context(|| format!("opening {}", query_file.display()))?;
        for line in std::io::BufReader::new(file).lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            run_one_hyperedges_query(&reader, line, args)?;
        }
    }

    reader.destroy();
    Ok(())
}

fn core_err(e: CoreError) -> anyhow::Error {
    anyhow::anyhow!(e)
}

/// Parses `"r,label,n0,n1,..."`: first token the rank, second the label or
/// `?`, remaining tokens positional endpoints or `?` (`spec.md` §6.3
/// "Pattern syntax").
fn parse_pattern(pattern: &str) -> Result<(u64, Option<u64>, Vec<Option<u64>>)> {
    let tokens: Vec<&str> = pattern.split(',').map(str::trim).collect();
    if tokens.len() < 2 {
        bail!("pattern {pattern:?} must have at least a rank and a label/`?`");
    }
    let rank: u64 = tokens[0]
        .parse()
        .with_context(|| format!("pattern {pattern:?}: rank is not an integer"))?;
    let label = if tokens[1] == "?" {
        None
    } else {
        Some(
            tokens[1]
                .parse()
                .with_context(|| format!("pattern {pattern:?}: label is not an integer or `?`"))?,
        )
    };
    let mut nodes = Vec::with_capacity(tokens.len().saturating_sub(2));
    for t in &tokens[2..] {
        if *t == "?" {
            nodes.push(None);
        } else {
            nodes.push(Some(t.parse().with_context(|| {
                format!("pattern {pattern:?}: node token {t:?} is not an integer or `?`")
            })?));
        }
    }
    Ok((rank, label, nodes))
}

fn run_one_hyperedges_query(reader: &ReaderHandle, pattern: &str, args: &Args) -> Result<()> {
    let (rank, _label, nodes) = parse_pattern(pattern)?;
    if args.exist_query {
        // Existence check ignores position; filters by non-wildcard nodes only.
        let exists = reader.edge_exists(rank, &nodes, args.exact_query)?;
        println!("{exists}");
        return Ok(());
    }
    let no_order = !args.exact_query;
    let mut edges: Vec<HEdge> = Vec::new();
    for edge in reader.edges(rank, &nodes, no_order)? {
        edges.push(edge.map_err(core_err)?);
    }
    if args.sort_result {
        sort_edges(&mut edges);
    }
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for edge in &edges {
        write_edge_line(&mut out, edge)?;
    }
    Ok(())
}

fn sort_edges(edges: &mut [HEdge]) {
    edges.sort_by(|a, b| {
        a.rank()
            .cmp(&b.rank())
            .then_with(|| a.label.cmp(&b.label))
            .then_with(|| a.nodes.cmp(&b.nodes))
    });
}

fn write_edge_line(out: &mut impl Write, edge: &HEdge) -> Result<()> {
    write!(out, "{}", edge.label)?;
    for n in &edge.nodes {
        write!(out, " {n}")?;
    }
    writeln!(out)?;
    Ok(())
}
