//! S-expression surface syntax for Opsem terms.
//!
//! The I/O boundary of the workbench:
//! - [`lexer::Lexer`] turns source text into spanned tokens
//! - [`reader::read`] builds generic [`reader::Sexp`] trees
//! - [`parse::parse_term`] elaborates a tree against a language space
//! - [`print::print_term`] renders a term back to text
//!
//! Parsing is fail-fast: the first error aborts with a spanned,
//! JSON-serializable [`ParseError`].

pub mod error;
pub mod lexer;
pub mod parse;
pub mod print;
pub mod reader;
pub mod token;

pub use error::{ParseError, ParseResult, Span};
pub use parse::{elab_component, elab_space, parse_term};
pub use print::{print_term, PrintError};
pub use reader::{read, Sexp};
