//! Tree notation parser
//!
//! Parses the bracketed tree notation into pattern and target trees using
//! a pest grammar. Nodes are numbered in preorder: the first root is 0, then
//! its arguments left to right, then the next root.

use pest::Parser;
use pest::iterators::Pair;
use pest_derive::Parser;
use thiserror::Error;

use crate::pattern::{PatternBuilder, PatternError, PatternIdx, PatternLabel, PatternTree};
use crate::symbols::{Sym, SymbolTable};
use crate::tree::{NodeId, NodeKind, TargetBuilder, TargetTree, TreeError};

#[derive(Parser)]
#[grammar = "tree.pest"]
struct TreeParser;

/// Error type for tree notation failures
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Parse error: {0}")]
    Syntax(#[from] pest::error::Error<Rule>),

    #[error("Parse error: wildcard at line {0}, column {1} is only allowed in patterns")]
    WildcardInTarget(usize, usize),

    #[error("Parse error: weight at line {0}, column {1} is only allowed in patterns")]
    WeightInTarget(usize, usize),

    #[error("Parse error: token span at line {0}, column {1} is only allowed in targets")]
    SpanInPattern(usize, usize),

    #[error("Parse error: invalid number {0:?}")]
    InvalidNumber(String),

    #[error("Parse error: malformed {0}")]
    Malformed(&'static str),

    #[error(transparent)]
    Pattern(#[from] PatternError),

    #[error(transparent)]
    Tree(#[from] TreeError),
}

/// Parse a pattern forest such as `buy(agent: ?, object: ?)`
pub fn parse_pattern(input: &str, symbols: &SymbolTable) -> Result<PatternTree, ParseError> {
    let mut builder = PatternBuilder::new();
    for tree in parse_forest(input)? {
        add_pattern_node(tree, symbols, &mut builder)?;
    }
    Ok(builder.build()?)
}

/// Parse a target forest such as `buy(agent: John, object: "car")`
pub fn parse_target(input: &str, symbols: &SymbolTable) -> Result<TargetTree, ParseError> {
    let mut builder = TargetBuilder::new();
    for tree in parse_forest(input)? {
        add_target_node(tree, symbols, &mut builder)?;
    }
    Ok(builder.build()?)
}

/// Top-level `tree` pairs of the input
fn parse_forest(input: &str) -> Result<Vec<Pair<'_, Rule>>, ParseError> {
    let mut pairs = TreeParser::parse(Rule::forest, input)?;
    let Some(forest) = pairs.next() else {
        return Err(ParseError::Malformed("forest"));
    };
    Ok(forest
        .into_inner()
        .filter(|p| p.as_rule() == Rule::tree)
        .collect())
}

/// True if `label` reads back as an unquoted `ident`
pub(crate) fn is_plain_label(label: &str) -> bool {
    !label.is_empty()
        && label
            .chars()
            .all(|c| c.is_alphabetic() || c.is_ascii_digit() || matches!(c, '_' | '-' | '.' | '\''))
}

fn line_col(pair: &Pair<'_, Rule>) -> (usize, usize) {
    pair.as_span().start_pos().line_col()
}

/// Text of a `quoted` or `ident` label
fn label_text<'i>(pair: Pair<'i, Rule>) -> &'i str {
    match pair.as_rule() {
        Rule::quoted => pair.into_inner().next().map_or("", |inner| inner.as_str()),
        _ => pair.as_str(),
    }
}

/// Split an `edge` pair into its role and argument tree
fn parse_edge<'i>(
    pair: Pair<'i, Rule>,
    symbols: &SymbolTable,
) -> Result<(Sym, Pair<'i, Rule>), ParseError> {
    let mut inner = pair.into_inner();
    let (Some(role), Some(tree)) = (inner.next(), inner.next()) else {
        return Err(ParseError::Malformed("edge"));
    };
    Ok((symbols.intern(role.as_str()), tree))
}

fn parse_weight(pair: Pair<'_, Rule>) -> Result<f32, ParseError> {
    let text = pair.into_inner().next().map_or("", |number| number.as_str());
    text.parse::<f32>()
        .map_err(|_| ParseError::InvalidNumber(text.to_string()))
}

fn parse_span(pair: Pair<'_, Rule>) -> Result<(usize, usize), ParseError> {
    let indices = pair
        .into_inner()
        .map(|p| {
            p.as_str()
                .parse::<usize>()
                .map_err(|_| ParseError::InvalidNumber(p.as_str().to_string()))
        })
        .collect::<Result<Vec<_>, _>>()?;
    match indices.as_slice() {
        [start] => Ok((*start, *start)),
        [start, end] => Ok((*start, *end)),
        _ => Err(ParseError::Malformed("token span")),
    }
}

fn add_pattern_node(
    pair: Pair<'_, Rule>,
    symbols: &SymbolTable,
    builder: &mut PatternBuilder,
) -> Result<PatternIdx, ParseError> {
    let mut inner = pair.into_inner();
    let Some(label_pair) = inner.next() else {
        return Err(ParseError::Malformed("pattern node"));
    };

    let label = match label_pair.as_rule() {
        Rule::wildcard => PatternLabel::Wildcard(
            label_pair
                .into_inner()
                .next()
                .map(|name| symbols.intern(name.as_str())),
        ),
        _ => PatternLabel::Predicate(symbols.intern(label_text(label_pair))),
    };
    let idx = builder.add_node(label);

    for part in inner {
        match part.as_rule() {
            Rule::weight => builder.set_weight(idx, parse_weight(part)?),
            Rule::span => {
                let (line, col) = line_col(&part);
                return Err(ParseError::SpanInPattern(line, col));
            }
            Rule::arguments => {
                for edge in part.into_inner() {
                    let (role, child_pair) = parse_edge(edge, symbols)?;
                    let child = add_pattern_node(child_pair, symbols, builder)?;
                    builder.add_edge(idx, role, child);
                }
            }
            _ => {}
        }
    }

    Ok(idx)
}

fn add_target_node(
    pair: Pair<'_, Rule>,
    symbols: &SymbolTable,
    builder: &mut TargetBuilder,
) -> Result<NodeId, ParseError> {
    let mut inner = pair.into_inner();
    let Some(label_pair) = inner.next() else {
        return Err(ParseError::Malformed("target node"));
    };
    let parts: Vec<Pair<'_, Rule>> = inner.collect();
    let is_leaf = !parts.iter().any(|p| p.as_rule() == Rule::arguments);

    let kind = match label_pair.as_rule() {
        Rule::wildcard => {
            let (line, col) = line_col(&label_pair);
            return Err(ParseError::WildcardInTarget(line, col));
        }
        Rule::quoted => NodeKind::Mention,
        _ if is_leaf && label_pair.as_str().starts_with(char::is_uppercase) => NodeKind::Mention,
        _ => NodeKind::Proposition,
    };
    let id = builder.add_node(symbols.intern(label_text(label_pair)), kind);

    for part in parts {
        match part.as_rule() {
            Rule::weight => {
                let (line, col) = line_col(&part);
                return Err(ParseError::WeightInTarget(line, col));
            }
            Rule::span => {
                let (start, end) = parse_span(part)?;
                builder.set_span(id, start, end);
            }
            Rule::arguments => {
                for edge in part.into_inner() {
                    let (role, child_pair) = parse_edge(edge, symbols)?;
                    let child = add_target_node(child_pair, symbols, builder)?;
                    builder.add_edge(id, role, child);
                }
            }
            _ => {}
        }
    }

    Ok(id)
}
