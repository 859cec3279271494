//! The reader — turns a token stream into generic [`Sexp`] trees.
//!
//! Reading is shape-only: variant heads, component types, and address
//! spaces are resolved later by the space-directed parser.

use crate::error::{ParseError, ParseResult, Span};
use crate::lexer::Lexer;
use crate::token::{Token, TokenKind};
use num_bigint::BigInt;

/// A generic tagged tree, before elaboration against a language.
#[derive(Debug, Clone, PartialEq)]
pub enum Sexp {
    Int(BigInt, Span),
    Bool(bool, Span),
    Char(char, Span),
    Str(String, Span),
    Sym(String, Span),
    /// `(e …)`
    List(Vec<Sexp>, Span),
    /// `{k v …}`
    MapLit(Vec<(Sexp, Sexp)>, Span),
    /// `#{e …}`
    SetLit(Vec<Sexp>, Span),
}

impl Sexp {
    pub fn span(&self) -> Span {
        match self {
            Sexp::Int(_, s)
            | Sexp::Bool(_, s)
            | Sexp::Char(_, s)
            | Sexp::Str(_, s)
            | Sexp::Sym(_, s)
            | Sexp::List(_, s)
            | Sexp::MapLit(_, s)
            | Sexp::SetLit(_, s) => *s,
        }
    }
}

/// Read exactly one form from `source`; trailing input is an error.
pub fn read(source: &str) -> ParseResult<Sexp> {
    let tokens = Lexer::new(source).lex()?;
    let mut reader = Reader { tokens, pos: 0 };
    let sexp = reader.read_form()?;
    match reader.peek_kind() {
        TokenKind::Eof => Ok(sexp),
        _ => Err(ParseError::TrailingInput {
            span: reader.peek().span,
        }),
    }
}

struct Reader {
    tokens: Vec<Token>,
    pos: usize,
}

impl Reader {
    fn read_form(&mut self) -> ParseResult<Sexp> {
        let tok = self.advance();
        let span = tok.span;
        match tok.kind {
            TokenKind::Int(n) => Ok(Sexp::Int(n, span)),
            TokenKind::Bool(b) => Ok(Sexp::Bool(b, span)),
            TokenKind::Char(c) => Ok(Sexp::Char(c, span)),
            TokenKind::Str(s) => Ok(Sexp::Str(s, span)),
            TokenKind::Sym(s) => Ok(Sexp::Sym(s, span)),
            TokenKind::LParen => {
                let (elems, end) = self.read_until(TokenKind::RParen)?;
                Ok(Sexp::List(elems, span.merge(end)))
            }
            TokenKind::HashBrace => {
                let (elems, end) = self.read_until(TokenKind::RBrace)?;
                Ok(Sexp::SetLit(elems, span.merge(end)))
            }
            TokenKind::LBrace => {
                let (elems, end) = self.read_until(TokenKind::RBrace)?;
                if elems.len() % 2 != 0 {
                    return Err(ParseError::UnevenMapLiteral {
                        span: span.merge(end),
                    });
                }
                let mut pairs = Vec::with_capacity(elems.len() / 2);
                let mut it = elems.into_iter();
                while let (Some(k), Some(v)) = (it.next(), it.next()) {
                    pairs.push((k, v));
                }
                Ok(Sexp::MapLit(pairs, span.merge(end)))
            }
            TokenKind::Eof => Err(ParseError::UnexpectedEof),
            kind => Err(ParseError::UnexpectedToken {
                token: kind.to_string(),
                span,
            }),
        }
    }

    /// Read forms until the closing token, returning them and its span.
    fn read_until(&mut self, close: TokenKind) -> ParseResult<(Vec<Sexp>, Span)> {
        let mut elems = Vec::new();
        loop {
            match self.peek_kind() {
                TokenKind::Eof => return Err(ParseError::UnexpectedEof),
                kind if *kind == close => {
                    let end = self.advance().span;
                    return Ok((elems, end));
                }
                _ => elems.push(self.read_form()?),
            }
        }
    }

    fn peek(&self) -> &Token {
        self.tokens
            .get(self.pos)
            .unwrap_or_else(|| self.tokens.last().expect("stream ends with Eof"))
    }

    fn peek_kind(&self) -> &TokenKind {
        &self.peek().kind
    }

    fn advance(&mut self) -> Token {
        let tok = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }
}
