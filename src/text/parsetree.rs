use std::fmt;

use crate::core::error::{Error, ErrorKind, Result};
use crate::sets::Weighted;
use crate::text::engine::TextEngine;
use crate::text::setops::{mass_weighted_intersection, mass_weighted_union};

/// Parsed full-text query.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseTree {
    And(Vec<ParseTree>),
    Or(Vec<ParseTree>),
    Not(Box<ParseTree>),
    Atom(String),
    Phrase(Vec<String>),
    Glob(String),
}

impl ParseTree {
    pub fn node_type(&self) -> &'static str {
        match self {
            ParseTree::And(_) => "AND",
            ParseTree::Or(_) => "OR",
            ParseTree::Not(_) => "NOT",
            ParseTree::Atom(_) => "ATOM",
            ParseTree::Phrase(_) => "PHRASE",
            ParseTree::Glob(_) => "GLOB",
        }
    }

    pub fn is_not(&self) -> bool {
        matches!(self, ParseTree::Not(_))
    }

    /// Positive words of the query, used to compute its weight.
    pub fn terms(&self) -> Vec<String> {
        match self {
            ParseTree::And(nodes) | ParseTree::Or(nodes) => nodes.iter().flat_map(ParseTree::terms).collect(),
            ParseTree::Not(_) => Vec::new(),
            ParseTree::Atom(word) | ParseTree::Glob(word) => vec![word.clone()],
            ParseTree::Phrase(words) => vec![words.join(" ")],
        }
    }

    /// Run the query. `None` means "every document matches", which happens
    /// when a term reduces to no words at all.
    pub fn execute(&self, engine: &TextEngine) -> Result<Option<Weighted>> {
        match self {
            ParseTree::And(nodes) => {
                let mut positives = Vec::new();
                let mut negatives = Vec::new();
                for node in nodes {
                    match node {
                        // A NOT of a word matching everything excludes nothing
                        ParseTree::Not(inner) => {
                            if let Some(r) = inner.execute(engine)? {
                                negatives.push((r, 1.0));
                            }
                        }
                        other => positives.push(other.execute(engine)?.map(|r| (r, 1.0))),
                    }
                }
                let mut result = mass_weighted_intersection(positives);
                if !negatives.is_empty() {
                    let excluded = mass_weighted_union(negatives);
                    result.retain(|docid, _| !excluded.contains_key(docid));
                }
                Ok(Some(result))
            }
            ParseTree::Or(nodes) => {
                let mut parts = Vec::new();
                for node in nodes {
                    if let Some(r) = node.execute(engine)? {
                        parts.push((r, 1.0));
                    }
                }
                Ok(Some(mass_weighted_union(parts)))
            }
            ParseTree::Not(_) => Err(Error::new(
                ErrorKind::Query,
                "NOT parse tree node cannot be executed directly",
            )),
            ParseTree::Atom(word) => Ok(engine.search(word)),
            ParseTree::Phrase(words) => Ok(Some(engine.search_phrase(&words.join(" ")))),
            ParseTree::Glob(pattern) => engine.search_glob(pattern).map(Some),
        }
    }
}

impl fmt::Display for ParseTree {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ParseTree::And(nodes) | ParseTree::Or(nodes) => {
                write!(f, "{}(", self.node_type())?;
                for (i, node) in nodes.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", node)?;
                }
                write!(f, ")")
            }
            ParseTree::Not(node) => write!(f, "NOT({})", node),
            ParseTree::Atom(word) | ParseTree::Glob(word) => write!(f, "{}({:?})", self.node_type(), word),
            ParseTree::Phrase(words) => write!(f, "PHRASE({:?})", words.join(" ")),
        }
    }
}
