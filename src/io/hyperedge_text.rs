//! Line-oriented hyperedge text formats (`spec.md` §6.2).
//!
//! Both formats are whitespace- or comma-delimited base-10 integer tokens,
//! one hyperedge per line; empty lines are ignored. They differ only in
//! how the first token is interpreted:
//!
//! - [`InputFormat::LabelFirst`]: first token is the edge label, the rest
//!   are endpoints in order.
//! - [`InputFormat::RankAsLabel`]: the label is *defined* as the rank (the
//!   token count), and every token is an endpoint. `spec.md` §9 flags this
//!   as possibly a shortcut rather than an intentional design — kept
//!   as-is, not silently "fixed" into something else.

use crate::error::{Error, Result};
use crate::hypergraph::HEdge;
use crate::params::LIMIT_MAX_RANK;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    LabelFirst,
    RankAsLabel,
}

fn tokenize(line: &str) -> Vec<&str> {
    if line.contains(',') {
        line.split(',').map(str::trim).filter(|t| !t.is_empty()).collect()
    } else {
        line.split_whitespace().collect()
    }
}

/// Parses one non-empty line into a hyperedge, or `Ok(None)` for a blank
/// line (to be skipped by the caller).
pub fn parse_line(line: &str, format: InputFormat) -> Result<Option<HEdge>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let tokens = tokenize(line);
    if tokens.is_empty() {
        return Ok(None);
    }
    if tokens.len() as u64 > LIMIT_MAX_RANK {
        return Err(Error::Malformed(format!(
            "line has {} tokens, exceeding the {} token limit",
            tokens.len(),
            LIMIT_MAX_RANK
        )));
    }
    let values: Result<Vec<u64>> = tokens
        .iter()
        .map(|t| {
            t.parse::<u64>()
                .map_err(|_| Error::Malformed(format!("not a non-negative integer: {t:?}")))
        })
        .collect();
    let values = values?;

    match format {
        InputFormat::LabelFirst => {
            let (label, nodes) = values
                .split_first()
                .ok_or_else(|| Error::Malformed("line has no label token".into()))?;
            Ok(Some(HEdge::new(*label, nodes.to_vec())))
        }
        InputFormat::RankAsLabel => {
            let label = values.len() as u64;
            Ok(Some(HEdge::new(label, values)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_first_whitespace() {
        let e = parse_line("7 4 5 6", InputFormat::LabelFirst).unwrap().unwrap();
        assert_eq!(e.label, 7);
        assert_eq!(e.nodes, vec![4, 5, 6]);
    }

    #[test]
    fn label_first_comma_delimited() {
        let e = parse_line("7, 4, 5, 6", InputFormat::LabelFirst).unwrap().unwrap();
        assert_eq!(e.label, 7);
        assert_eq!(e.nodes, vec![4, 5, 6]);
    }

    #[test]
    fn rank_as_label_uses_token_count() {
        let e = parse_line("4 5 6", InputFormat::RankAsLabel).unwrap().unwrap();
        assert_eq!(e.label, 3);
        assert_eq!(e.nodes, vec![4, 5, 6]);
    }

    #[test]
    fn blank_line_is_skipped() {
        assert!(parse_line("   ", InputFormat::LabelFirst).unwrap().is_none());
    }

    #[test]
    fn non_integer_token_is_malformed() {
        let err = parse_line("a b c", InputFormat::LabelFirst).unwrap_err();
        assert!(matches!(err, Error::Malformed(_)));
    }
}
