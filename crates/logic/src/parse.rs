use crate::error::{ParseError, Result};
use crate::expr::Expr;
use std::collections::HashMap;
use std::fmt;

const MAX_DEPTH: usize = 128;

/// Member path rooted at an imported holder type (`Flags.remote.enabled`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConditionPath {
    /// Qualified name of the holder type
    pub holder: String,
    /// Member accesses after the holder, never empty
    pub members: Vec<String>,
}

impl fmt::Display for ConditionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.holder, self.members.join("."))
    }
}

/// Names usable as the first segment of a condition path
#[derive(Debug, Clone, Default)]
pub struct ImportTable {
    /// name -> qualified type; `None` marks an ambiguous simple name
    entries: HashMap<String, Option<String>>,
}

impl ImportTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Imports a type under its qualified and its simple name
    pub fn import(&mut self, qualified: &str) {
        self.entries
            .insert(qualified.to_string(), Some(qualified.to_string()));
        let simple = qualified.rsplit('.').next().unwrap_or(qualified);
        if simple != qualified {
            let next = match self.entries.get(simple) {
                None => Some(qualified.to_string()),
                Some(Some(existing)) if existing == qualified => Some(existing.clone()),
                Some(_) => None,
            };
            self.entries.insert(simple.to_string(), next);
        }
    }

    /// Imports a type under an explicit alias; aliases shadow simple names
    pub fn import_as(&mut self, alias: &str, qualified: &str) {
        self.entries
            .insert(alias.to_string(), Some(qualified.to_string()));
    }

    #[must_use]
    pub fn with(mut self, qualified: &str) -> Self {
        self.import(qualified);
        self
    }

    pub fn resolve(&self, name: &str) -> Option<&str> {
        self.entries.get(name).and_then(|e| e.as_deref())
    }

    fn is_ambiguous(&self, name: &str) -> bool {
        matches!(self.entries.get(name), Some(None))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Ident(String),
    Dot,
    Bang,
    AndAnd,
    OrOr,
    LParen,
    RParen,
    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ident(name) => write!(f, "identifier '{name}'"),
            Self::Dot => write!(f, "'.'"),
            Self::Bang => write!(f, "'!'"),
            Self::AndAnd => write!(f, "'&&'"),
            Self::OrOr => write!(f, "'||'"),
            Self::LParen => write!(f, "'('"),
            Self::RParen => write!(f, "')'"),
            Self::Eof => write!(f, "end of expression"),
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '$'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

fn tokenize(source: &str) -> Result<Vec<(Token, usize)>> {
    let mut tokens = Vec::new();
    let mut chars = source.char_indices().peekable();

    while let Some((pos, c)) = chars.next() {
        let token = match c {
            c if c.is_whitespace() => continue,
            '.' => Token::Dot,
            '!' => Token::Bang,
            '(' => Token::LParen,
            ')' => Token::RParen,
            '&' | '|' => {
                if chars.next_if(|&(_, next)| next == c).is_none() {
                    return Err(ParseError::new(
                        pos,
                        format!("expected '{c}{c}', found single '{c}'"),
                    ));
                }
                if c == '&' {
                    Token::AndAnd
                } else {
                    Token::OrOr
                }
            }
            c if is_ident_start(c) => {
                let mut end = pos + c.len_utf8();
                while let Some((next_pos, next)) = chars.next_if(|&(_, next)| is_ident_continue(next)) {
                    end = next_pos + next.len_utf8();
                }
                Token::Ident(source[pos..end].to_string())
            }
            other => {
                return Err(ParseError::new(pos, format!("unexpected character '{other}'")));
            }
        };
        tokens.push((token, pos));
    }

    tokens.push((Token::Eof, source.len()));
    Ok(tokens)
}

struct Parser<'a> {
    tokens: Vec<(Token, usize)>,
    cursor: usize,
    depth: usize,
    imports: &'a ImportTable,
}

impl<'a> Parser<'a> {
    fn new(source: &str, imports: &'a ImportTable) -> Result<Self> {
        Ok(Self {
            tokens: tokenize(source)?,
            cursor: 0,
            depth: 0,
            imports,
        })
    }

    fn peek(&self) -> &(Token, usize) {
        // Eof is always last and never consumed past.
        &self.tokens[self.cursor.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> (Token, usize) {
        let token = self.peek().clone();
        if token.0 != Token::Eof {
            self.cursor += 1;
        }
        token
    }

    fn parse_expr(&mut self, min_bp: u8) -> Result<Expr<ConditionPath>> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ParseError::new(self.peek().1, "expression is nested too deeply"));
        }

        let mut lhs = self.parse_prefix()?;
        loop {
            let (bp, conjunction) = match self.peek().0 {
                Token::AndAnd => (2, true),
                Token::OrOr => (1, false),
                _ => break,
            };
            if bp < min_bp {
                break;
            }
            self.advance();
            let rhs = self.parse_expr(bp + 1)?;
            lhs = if conjunction { lhs.and(&rhs) } else { lhs.or(&rhs) };
        }

        self.depth -= 1;
        Ok(lhs)
    }

    fn parse_prefix(&mut self) -> Result<Expr<ConditionPath>> {
        let (token, pos) = self.advance();
        match token {
            Token::Bang => {
                self.depth += 1;
                if self.depth > MAX_DEPTH {
                    return Err(ParseError::new(pos, "expression is nested too deeply"));
                }
                let operand = self.parse_prefix()?;
                self.depth -= 1;
                Ok(operand.not())
            }
            Token::LParen => {
                let inner = self.parse_expr(0)?;
                let (close, close_pos) = self.advance();
                if close != Token::RParen {
                    return Err(ParseError::new(close_pos, format!("expected ')', found {close}")));
                }
                Ok(inner)
            }
            Token::Ident(first) => {
                let segments = self.parse_path_tail(first)?;
                Ok(Expr::var(self.resolve(segments, pos)?))
            }
            other => Err(ParseError::new(pos, format!("expected a condition, found {other}"))),
        }
    }

    fn parse_path_tail(&mut self, first: String) -> Result<Vec<String>> {
        let mut segments = vec![first];
        while self.peek().0 == Token::Dot {
            self.advance();
            match self.advance() {
                (Token::Ident(name), _) => segments.push(name),
                (other, pos) => {
                    return Err(ParseError::new(pos, format!("expected identifier after '.', found {other}")));
                }
            }
        }
        Ok(segments)
    }

    /// Longest dotted prefix that names an import becomes the holder
    fn resolve(&self, segments: Vec<String>, pos: usize) -> Result<ConditionPath> {
        for split in (1..segments.len()).rev() {
            let prefix = segments[..split].join(".");
            if let Some(holder) = self.imports.resolve(&prefix) {
                return Ok(ConditionPath {
                    holder: holder.to_string(),
                    members: segments[split..].to_vec(),
                });
            }
        }

        let first = &segments[0];
        if self.imports.is_ambiguous(first) {
            return Err(ParseError::new(pos, format!("'{first}' is ambiguous between several imports")));
        }
        if segments.len() == 1 {
            return Err(ParseError::new(
                pos,
                format!("'{first}' must be qualified by an imported type"),
            ));
        }
        Err(ParseError::new(pos, format!("unresolved reference '{first}': not imported")))
    }

    fn expect_end(&mut self) -> Result<()> {
        match self.advance() {
            (Token::Eof, _) => Ok(()),
            (other, pos) => Err(ParseError::new(pos, format!("unexpected {other}"))),
        }
    }
}

/// Parses `IDENT ('.' IDENT)*` operands combined with `!`, `&&`, `||` and
/// parentheses. `&&` binds tighter than `||`.
pub fn parse(source: &str, imports: &ImportTable) -> Result<Expr<ConditionPath>> {
    let mut parser = Parser::new(source, imports)?;
    if parser.peek().0 == Token::Eof {
        return Err(ParseError::new(0, "empty condition expression"));
    }
    let expr = parser.parse_expr(0)?;
    parser.expect_end()?;
    log::trace!("Parsed condition expression {source:?}");
    Ok(expr)
}

/// Parses a single, optionally negated member path (`!a.b.c`).
///
/// Returns the negation flag and the path segments.
pub fn parse_member_path(source: &str) -> Result<(bool, Vec<String>)> {
    let imports = ImportTable::new();
    let mut parser = Parser::new(source, &imports)?;
    let mut negated = false;
    while parser.peek().0 == Token::Bang {
        parser.advance();
        negated = !negated;
    }
    let segments = match parser.advance() {
        (Token::Ident(first), _) => parser.parse_path_tail(first)?,
        (other, pos) => {
            return Err(ParseError::new(pos, format!("expected a member path, found {other}")));
        }
    };
    parser.expect_end()?;
    Ok((negated, segments))
}
