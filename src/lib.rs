//! A front end for protobuf source files.
//!
//! Source text is split into tokens, parsed into an [`ast::File`] while each declaration is
//! checked against the rules of the language, and finally passed to a scope resolver which
//! works out whether each named field type refers to a message or an enum.
//!
//! # Examples
//!
//! ```
//! # use protofront::{ast, parse};
//! let file = parse(
//!     r#"
//!     syntax = "proto3";
//!
//!     message Order {
//!         enum Status { UNKNOWN = 0; SHIPPED = 1; }
//!
//!         Status status = 1;
//!         Item item = 2;
//!     }
//!
//!     message Item {}
//!     "#,
//! )
//! .unwrap();
//!
//! let fields = &file.messages[0].fields;
//! assert!(matches!(&fields[0].ty, ast::Ty::Named(ty) if ty.kind == ast::TypeRefKind::Enum));
//! assert!(matches!(&fields[1].ty, ast::Ty::Named(ty) if ty.kind == ast::TypeRefKind::Message));
//! ```
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::{io::Read, ops::RangeInclusive, path::Path};

use tracing::{debug, debug_span};

pub mod ast;
mod case;
mod check;
mod error;
mod lex;
mod lines;
mod names;
mod parse;
mod resolve;
mod source;

pub use crate::{
    error::{Error, ErrorCategory, Issue, ParseError},
    lex::{SourceToken, TokenKind},
    lines::{LineResolver, Location},
    names::{Definition, DefinitionKind},
    resolve::resolve,
};

use crate::error::ParseErrorKind;

/// The default maximum length of a source file, in bytes.
pub const MAX_FILE_LEN: usize = i32::MAX as usize;

pub(crate) const MAX_MESSAGE_FIELD_NUMBER: i32 = 536_870_911;
pub(crate) const RESERVED_MESSAGE_FIELD_NUMBERS: RangeInclusive<i32> = 19_000..=19_999;

const DEFAULT_FILE_NAME: &str = "<input>";

/// Parses a protobuf source file and resolves its type references, using default options.
///
/// See [`ParseOptions::parse`].
pub fn parse(source: &str) -> Result<ast::File, ParseError> {
    ParseOptions::new().parse(source)
}

/// Splits a protobuf source file into tokens.
///
/// Comments and whitespace are dropped. The returned sequence always ends with a single
/// [`TokenKind::Eof`] token.
///
/// # Examples
///
/// ```
/// # use protofront::{tokenize, TokenKind};
/// let tokens = tokenize("message Foo {}").unwrap();
/// let kinds: Vec<_> = tokens.into_iter().map(|token| token.kind).collect();
/// assert_eq!(kinds, vec![
///     TokenKind::Keyword("message".to_owned()),
///     TokenKind::Ident("Foo".to_owned()),
///     TokenKind::Symbol('{'),
///     TokenKind::Symbol('}'),
///     TokenKind::Eof,
/// ]);
/// ```
pub fn tokenize(source: &str) -> Result<Vec<SourceToken>, ParseError> {
    ParseOptions::new().tokenize(source)
}

/// Options for parsing protobuf source files.
#[derive(Debug, Clone)]
pub struct ParseOptions {
    file_name: String,
    resolve_types: bool,
    max_file_len: usize,
}

impl ParseOptions {
    /// Creates a new [`ParseOptions`] with the default settings.
    pub fn new() -> Self {
        ParseOptions {
            file_name: DEFAULT_FILE_NAME.to_owned(),
            resolve_types: true,
            max_file_len: MAX_FILE_LEN,
        }
    }

    /// Sets the file name shown in diagnostics.
    pub fn file_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.file_name = name.into();
        self
    }

    /// Set whether named field types should be resolved after parsing.
    ///
    /// If unset, every named type is left as [`ast::TypeRefKind::Unresolved`].
    pub fn resolve_types(&mut self, yes: bool) -> &mut Self {
        self.resolve_types = yes;
        self
    }

    /// Sets the maximum length of a source file, in bytes.
    pub fn max_file_len(&mut self, len: usize) -> &mut Self {
        self.max_file_len = len;
        self
    }

    /// Parses a protobuf source file.
    ///
    /// # Errors
    ///
    /// Returns an error containing every diagnostic found if the file is not valid. Lexical and
    /// syntax errors stop parsing at the first problem, but other errors are collected from the
    /// whole file.
    pub fn parse(&self, source: &str) -> Result<ast::File, ParseError> {
        let _span = debug_span!("parse", file = %self.file_name).entered();

        self.check_len(source)?;
        let tokens = lex::tokenize(source).map_err(|errors| self.error(errors, source))?;
        debug!(tokens = tokens.len(), "tokenized source");

        let file = parse::parse_file(source, tokens).map_err(|errors| self.error(errors, source))?;
        debug!(
            messages = file.messages.len(),
            enums = file.enums.len(),
            services = file.services.len(),
            "parsed file"
        );

        if self.resolve_types {
            Ok(resolve(file))
        } else {
            Ok(file)
        }
    }

    /// Reads a protobuf source file from `reader` and parses it.
    ///
    /// # Errors
    ///
    /// Returns an error if reading fails, the input is too long or is not valid UTF-8, or the
    /// source is not valid.
    pub fn parse_reader<R: Read>(&self, reader: R) -> Result<ast::File, Error> {
        let source = source::read_source(reader, &self.file_name, self.max_file_len)?;
        Ok(self.parse(&source)?)
    }

    /// Opens the file at `path` and parses it, using the path as the file name in diagnostics.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid.
    pub fn open(&self, path: &Path) -> Result<ast::File, Error> {
        let source = source::open(path, self.max_file_len)?;
        let mut options = self.clone();
        options.file_name(path.display().to_string());
        Ok(options.parse(&source)?)
    }

    /// Splits a protobuf source file into tokens, using the configured file name and length limit.
    ///
    /// See [`tokenize`].
    pub fn tokenize(&self, source: &str) -> Result<Vec<SourceToken>, ParseError> {
        self.check_len(source)?;
        let tokens = lex::tokenize(source).map_err(|errors| self.error(errors, source))?;
        Ok(lex::to_source_tokens(source, &tokens))
    }

    /// Opens the file at `path` and splits it into tokens, using the path as the file name in
    /// diagnostics.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or contains an invalid token.
    pub fn tokenize_file(&self, path: &Path) -> Result<Vec<SourceToken>, Error> {
        let source = source::open(path, self.max_file_len)?;
        let mut options = self.clone();
        options.file_name(path.display().to_string());
        Ok(options.tokenize(&source)?)
    }

    fn check_len(&self, source: &str) -> Result<(), ParseError> {
        if source.len() > self.max_file_len {
            return Err(ParseError::new(
                vec![ParseErrorKind::FileTooLarge {
                    max: self.max_file_len,
                }],
                &self.file_name,
                source,
            ));
        }
        Ok(())
    }

    fn error(&self, errors: Vec<ParseErrorKind>, source: &str) -> ParseError {
        debug!(count = errors.len(), "failed to parse file");
        ParseError::new(errors, &self.file_name, source)
    }
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self::new()
    }
}
