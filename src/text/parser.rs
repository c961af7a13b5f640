use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;

use crate::analysis::lexicon::Lexicon;
use crate::core::error::{Error, Result};
use crate::text::parsetree::ParseTree;

lazy_static! {
    // A paren, or an optional hyphen followed by a quoted string or a run
    // without whitespace, parens and quotes.
    static ref TOKEN: Regex = Regex::new(r#"[()]|-?(?:"[^"]*"|[^()\s"]+)"#).expect("valid regex");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenType {
    And,
    Or,
    Not,
    LParen,
    RParen,
    Atom,
    Eof,
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            TokenType::And => "AND",
            TokenType::Or => "OR",
            TokenType::Not => "NOT",
            TokenType::LParen => "(",
            TokenType::RParen => ")",
            TokenType::Atom => "ATOM",
            TokenType::Eof => "EOF",
        };
        write!(f, "{}", name)
    }
}

fn classify(token: &str) -> TokenType {
    match token.to_uppercase().as_str() {
        "AND" => TokenType::And,
        "OR" => TokenType::Or,
        "NOT" => TokenType::Not,
        "(" => TokenType::LParen,
        ")" => TokenType::RParen,
        _ => TokenType::Atom,
    }
}

/// Recursive-descent parser for full-text queries.
///
/// ```text
/// Or   -> And (OR And)*
/// And  -> Term ((AND NotExpr) | (NOT Term))*
/// Not  -> [NOT] Term
/// Term -> "(" Or ")" | Atom+
/// ```
///
/// Consecutive atoms are implicitly ANDed, a leading hyphen negates an
/// atom, and an atom that yields several words becomes a phrase. Atoms
/// made only of stop words are dropped and remembered as ignored.
pub struct QueryParser<'a> {
    lexicon: &'a Lexicon,
    tokens: Vec<String>,
    types: Vec<TokenType>,
    index: usize,
    ignored: Vec<String>,
}

impl<'a> QueryParser<'a> {
    pub fn new(lexicon: &'a Lexicon) -> Self {
        QueryParser {
            lexicon,
            tokens: Vec::new(),
            types: Vec::new(),
            index: 0,
            ignored: Vec::new(),
        }
    }

    pub fn parse_query(&mut self, query: &str) -> Result<ParseTree> {
        self.tokens = TOKEN.find_iter(query).map(|m| m.as_str().to_string()).collect();
        self.types = self.tokens.iter().map(|t| classify(t)).collect();
        self.tokens.push(String::new());
        self.types.push(TokenType::Eof);
        self.index = 0;
        self.ignored.clear();

        let tree = self.parse_or_expr()?;
        self.require(TokenType::Eof)?;
        tree.ok_or_else(|| Error::parse(format!("Query contains only common words: {:?}", query)))
    }

    /// Parse and also return the query terms dropped as stop words.
    pub fn parse_query_ex(&mut self, query: &str) -> Result<(ParseTree, Vec<String>)> {
        let tree = self.parse_query(query)?;
        Ok((tree, self.ignored.clone()))
    }

    /// Terms ignored by the last parse.
    pub fn ignored(&self) -> &[String] {
        &self.ignored
    }

    fn peek(&self, token_type: TokenType) -> bool {
        self.types[self.index] == token_type
    }

    fn check(&mut self, token_type: TokenType) -> bool {
        if self.peek(token_type) {
            self.index += 1;
            true
        } else {
            false
        }
    }

    fn require(&mut self, token_type: TokenType) -> Result<()> {
        if self.check(token_type) {
            return Ok(());
        }
        let found = &self.tokens[self.index];
        let found = if self.types[self.index] == TokenType::Eof { "EOF" } else { found.as_str() };
        Err(Error::parse(format!("Token {} required, {:?} found", token_type, found)))
    }

    fn get(&mut self, token_type: TokenType) -> Result<String> {
        let token = self.tokens[self.index].clone();
        self.require(token_type)?;
        Ok(token)
    }

    fn parse_or_expr(&mut self) -> Result<Option<ParseTree>> {
        let mut nodes = Vec::new();
        nodes.extend(self.parse_and_expr()?);
        while self.check(TokenType::Or) {
            nodes.extend(self.parse_and_expr()?);
        }
        Ok(match nodes.len() {
            0 => None,
            1 => nodes.pop(),
            _ => Some(ParseTree::Or(nodes)),
        })
    }

    fn parse_and_expr(&mut self) -> Result<Option<ParseTree>> {
        let mut nodes = Vec::new();
        nodes.extend(self.parse_term()?);
        let mut nots = Vec::new();
        loop {
            if self.check(TokenType::And) {
                match self.parse_not_expr()? {
                    Some(node) if node.is_not() => nots.push(node),
                    Some(node) => nodes.push(node),
                    None => continue,
                }
            } else if self.check(TokenType::Not) {
                if let Some(node) = self.parse_term()? {
                    nots.push(ParseTree::Not(Box::new(node)));
                }
            } else {
                break;
            }
        }
        if nodes.is_empty() {
            return Ok(None);
        }
        nodes.extend(nots);
        Ok(if nodes.len() == 1 { nodes.pop() } else { Some(ParseTree::And(nodes)) })
    }

    fn parse_not_expr(&mut self) -> Result<Option<ParseTree>> {
        if self.check(TokenType::Not) {
            return Ok(self.parse_term()?.map(|node| ParseTree::Not(Box::new(node))));
        }
        self.parse_term()
    }

    fn parse_term(&mut self) -> Result<Option<ParseTree>> {
        if self.check(TokenType::LParen) {
            let tree = self.parse_or_expr()?;
            self.require(TokenType::RParen)?;
            return Ok(tree);
        }

        let mut nodes = Vec::new();
        nodes.extend(self.parse_atom()?);
        while self.peek(TokenType::Atom) {
            nodes.extend(self.parse_atom()?);
        }
        if nodes.is_empty() {
            return Ok(None);
        }
        // Positive atoms first, keeping their relative order
        nodes.sort_by_key(ParseTree::is_not);
        if nodes[0].is_not() {
            return Err(Error::parse("a term must have at least one positive word"));
        }
        Ok(if nodes.len() == 1 { nodes.pop() } else { Some(ParseTree::And(nodes)) })
    }

    fn parse_atom(&mut self) -> Result<Option<ParseTree>> {
        let term = self.get(TokenType::Atom)?;
        let mut words = self.lexicon.parse_terms(&term);
        if words.is_empty() {
            self.ignored.push(term);
            return Ok(None);
        }
        let tree = if words.len() > 1 {
            ParseTree::Phrase(words)
        } else {
            let word = words.remove(0);
            if Lexicon::is_glob(&word) {
                ParseTree::Glob(word)
            } else {
                ParseTree::Atom(word)
            }
        };
        Ok(Some(if term.starts_with('-') { ParseTree::Not(Box::new(tree)) } else { tree }))
    }
}
