//! Recursive-descent SQL parser
//!
//! Split into focused modules, each adding an `impl Parser` block:
//! - expr: expression parsing with operator precedence
//! - dml: SELECT/INSERT/UPDATE statements
//! - ddl: CREATE TABLE
//!
//! The parser only ensures the syntax is well-formed; whether a table or
//! column exists, or which join strategy to use, is decided by the planner.

mod ddl;
mod dml;
mod expr;

use super::ast::{Expression, Literal, Statement};
use super::lexer::{Keyword, Lexer, QuoteStyle, Token};
use crate::error::{Error, Result};
use std::iter::Peekable;

/// Identifier quoting styles controlled by the `identifier_quoting` setting.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum IdentifierQuoting {
    /// `"x"` and `` `x` `` are identifiers.
    #[default]
    Auto,
    /// Only `"x"` is an identifier.
    Quoted,
    /// Only `` `x` `` is an identifier; `"x"` is a string literal.
    Backtick,
    /// Only `[x]` is an identifier; `"x"` is a string literal.
    Bracket,
}

impl IdentifierQuoting {
    pub fn from_setting(value: &str) -> Result<Self> {
        match value.to_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "quoted" => Ok(Self::Quoted),
            "backtick" => Ok(Self::Backtick),
            "bracket" => Ok(Self::Bracket),
            other => Err(Error::ParseError(format!(
                "unknown identifier_quoting mode '{}'",
                other
            ))),
        }
    }

    pub(super) fn allows(&self, style: QuoteStyle) -> bool {
        matches!(
            (self, style),
            (Self::Auto, QuoteStyle::Double | QuoteStyle::Backtick)
                | (Self::Quoted, QuoteStyle::Double)
                | (Self::Backtick, QuoteStyle::Backtick)
                | (Self::Bracket, QuoteStyle::Bracket)
        )
    }
}

/// Which placeholder styles a statement used. Mixing both is rejected when
/// parameters are bound.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PlaceholderUse {
    pub positional: usize,
    pub named: bool,
}

/// The SQL parser takes tokens from the lexer and builds the AST.
pub struct Parser<'a> {
    lexer: Peekable<Lexer<'a>>,
    /// Active identifier quoting mode; SET statements earlier in the same
    /// text switch it for the statements that follow.
    pub quoting: IdentifierQuoting,
    /// Placeholder styles seen so far.
    pub placeholders: PlaceholderUse,
}

impl<'a> Parser<'a> {
    /// Creates a new parser for the given string.
    pub fn new(input: &'a str) -> Parser<'a> {
        Parser {
            lexer: Lexer::new(input).peekable(),
            quoting: IdentifierQuoting::default(),
            placeholders: PlaceholderUse::default(),
        }
    }

    /// Parses the input as a single statement, ending with an optional
    /// semicolon.
    pub fn parse(statement: &'a str) -> Result<Statement> {
        let mut parser = Self::new(statement);
        let statement = parser.parse_statement()?;
        parser.skip(Token::Semicolon);
        if let Some(token) = parser.lexer.next().transpose()? {
            return Err(Error::ParseError(format!("unexpected token {}", token)));
        }
        Ok(statement)
    }

    /// Parses the input as a semicolon-separated sequence of statements.
    /// `SET identifier_quoting = ...` takes effect for the statements that
    /// follow it in the same text.
    pub fn parse_all(&mut self) -> Result<Vec<Statement>> {
        let mut statements = Vec::new();
        loop {
            while self.skip(Token::Semicolon) {}
            if self.peek()?.is_none() {
                break;
            }
            let statement = self.parse_statement()?;
            if let Statement::Set { name, value } = &statement
                && name.eq_ignore_ascii_case("identifier_quoting")
                && let Literal::String(mode) = value
            {
                self.quoting = IdentifierQuoting::from_setting(mode)?;
            }
            statements.push(statement);
        }
        Ok(statements)
    }

    /// Parses a single statement by dispatching on the leading keyword.
    pub fn parse_statement(&mut self) -> Result<Statement> {
        match self.peek()? {
            Some(Token::Keyword(Keyword::Select | Keyword::With)) => self.parse_select_statement(),
            Some(Token::Keyword(Keyword::Insert)) => self.parse_insert(),
            Some(Token::Keyword(Keyword::Update)) => self.parse_update(),
            Some(Token::Keyword(Keyword::Create)) => self.parse_create_table(),
            Some(Token::Keyword(Keyword::Set)) => self.parse_set(),
            Some(token) => Err(Error::ParseError(format!("unexpected token {}", token))),
            None => Err(Error::ParseError("unexpected end of input".into())),
        }
    }

    /// SET name = value. The value may be a literal or a bare identifier
    /// (taken as a string), e.g. `SET identifier_quoting = backtick`.
    fn parse_set(&mut self) -> Result<Statement> {
        self.expect(Token::Keyword(Keyword::Set))?;
        let name = self.next_ident()?;
        self.expect(Token::Equal)?;
        let value = match self.next()? {
            Token::Ident(s) => Literal::String(s),
            Token::String(s) => Literal::String(s),
            Token::QuotedIdent(s, _) => Literal::String(s),
            Token::Number(n) if !n.contains(['.', 'e']) => Literal::Integer(
                n.parse()
                    .map_err(|_| Error::ParseError(format!("invalid number {}", n)))?,
            ),
            Token::Number(n) => Literal::Float(
                n.parse()
                    .map_err(|_| Error::ParseError(format!("invalid number {}", n)))?,
            ),
            Token::Keyword(Keyword::True) => Literal::Boolean(true),
            Token::Keyword(Keyword::False) => Literal::Boolean(false),
            token => {
                return Err(Error::ParseError(format!(
                    "expected setting value, found {}",
                    token
                )));
            }
        };
        Ok(Statement::Set { name, value })
    }

    // Token plumbing, shared by the sub-parsers.

    /// Fetches the next lexer token, or errors if none is found.
    pub(super) fn next(&mut self) -> Result<Token> {
        self.lexer
            .next()
            .transpose()?
            .ok_or_else(|| Error::ParseError("unexpected end of input".into()))
    }

    /// Returns the next identifier, honoring the active quoting mode, or
    /// errors if not found.
    pub(super) fn next_ident(&mut self) -> Result<String> {
        // Bracket-quoted identifiers arrive as three tokens.
        if self.quoting == IdentifierQuoting::Bracket
            && self.peek()? == Some(&Token::OpenBracket)
        {
            self.next()?;
            let ident = self.next_ident()?;
            self.expect(Token::CloseBracket)?;
            return Ok(ident);
        }
        match self.next()? {
            Token::Ident(ident) => Ok(ident),
            Token::QuotedIdent(ident, style) if self.quoting.allows(style) => Ok(ident),
            token => Err(Error::ParseError(format!(
                "expected identifier, found {}",
                token
            ))),
        }
    }

    /// Returns the next lexer token if it satisfies the predicate.
    pub(super) fn next_if(&mut self, predicate: impl Fn(&Token) -> bool) -> Option<Token> {
        self.peek().ok()?.filter(|&t| predicate(t))?;
        self.next().ok()
    }

    /// Passes the next lexer token through the closure, consuming it if the
    /// closure returns Some. Returns the result of the closure.
    pub(super) fn next_if_map<T>(&mut self, f: impl Fn(&Token) -> Option<T>) -> Option<T> {
        let value = f(self.peek().ok()??)?;
        self.next().ok()?;
        Some(value)
    }

    /// Consumes the next keyword if it matches, returning true.
    pub(super) fn next_is_keyword(&mut self, keyword: Keyword) -> bool {
        self.next_if(|t| t == &Token::Keyword(keyword)).is_some()
    }

    /// Consumes the next lexer token if it is the given token, returning
    /// true.
    pub(super) fn skip(&mut self, token: Token) -> bool {
        self.next_if(|t| t == &token).is_some()
    }

    /// Consumes the next lexer token if it's the expected token, or errors.
    pub(super) fn expect(&mut self, expect: Token) -> Result<()> {
        let token = self.next()?;
        if token != expect {
            return Err(Error::ParseError(format!(
                "expected {}, found {}",
                expect, token
            )));
        }
        Ok(())
    }

    /// Consumes the expected keyword, or errors.
    pub(super) fn expect_keyword(&mut self, keyword: Keyword) -> Result<()> {
        self.expect(Token::Keyword(keyword))
    }

    /// Peeks the next lexer token if any, without consuming it.
    pub(super) fn peek(&mut self) -> Result<Option<&Token>> {
        self.lexer
            .peek()
            .map(|result| result.as_ref().map(Some).map_err(|e| e.clone()))
            .unwrap_or(Ok(None))
    }

    /// Whether the next token is the given keyword.
    pub(super) fn peek_is_keyword(&mut self, keyword: Keyword) -> bool {
        matches!(self.peek(), Ok(Some(Token::Keyword(k))) if *k == keyword)
    }

    /// Parses a parenthesized, comma-separated identifier list.
    pub(super) fn parse_ident_list(&mut self) -> Result<Vec<String>> {
        self.expect(Token::OpenParen)?;
        let mut idents = Vec::new();
        loop {
            idents.push(self.next_ident()?);
            if !self.skip(Token::Comma) {
                break;
            }
        }
        self.expect(Token::CloseParen)?;
        Ok(idents)
    }

    /// Parses a target list: expressions with optional aliases, as used by
    /// SELECT and RETURNING.
    pub(super) fn parse_target_list(&mut self) -> Result<Vec<(Expression, Option<String>)>> {
        let mut targets = Vec::new();
        loop {
            let expr = self.parse_expression()?;
            let alias = if self.next_is_keyword(Keyword::As) {
                Some(self.next_ident()?)
            } else {
                // Implicit alias: a bare identifier directly after the
                // expression, unless it starts a clause keyword.
                self.next_if_map(|token| match token {
                    Token::Ident(ident) => Some(ident.clone()),
                    _ => None,
                })
            };
            targets.push((expr, alias));
            if !self.skip(Token::Comma) {
                break;
            }
        }
        Ok(targets)
    }
}
