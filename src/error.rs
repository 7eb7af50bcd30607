use std::{fmt, io, path::PathBuf};

use logos::Span;
use miette::{Diagnostic, NamedSource};
use thiserror::Error;

use crate::{
    lines::{LineResolver, Location},
    MAX_MESSAGE_FIELD_NUMBER, RESERVED_MESSAGE_FIELD_NUMBERS,
};

/// An error that may occur while parsing a protobuf source file.
///
/// The error holds every diagnostic produced for the file, ordered by their position in the
/// source. The first is reported as the primary error and the rest as related errors.
#[derive(Error, Diagnostic)]
#[error("{}", kind)]
#[diagnostic(forward(kind))]
pub struct ParseError {
    kind: Box<ParseErrorKind>,
    #[related]
    related: Vec<ParseErrorKind>,
    #[source_code]
    source_code: NamedSource,
    lines: LineResolver,
    name: String,
}

/// The broad class of a diagnostic.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// A malformed token, such as an unterminated string or comment.
    Lexical,
    /// A token sequence which does not match the grammar.
    Syntax,
    /// A construct which parses but breaks a rule of the language.
    Semantic,
    /// Input which exceeds a configured bound, such as the maximum file length.
    Limit,
    /// A bug in this crate.
    Internal,
}

/// A single diagnostic with its position resolved to a line and column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    /// The class of the diagnostic.
    pub category: ErrorCategory,
    /// A human-readable description of the problem.
    pub message: String,
    /// The 1-based position of the start of the problem.
    pub location: Location,
    /// The byte range of the source the problem refers to.
    pub span: Span,
}

#[derive(Error, Debug, Diagnostic, PartialEq, Clone)]
pub(crate) enum ParseErrorKind {
    #[error("invalid token")]
    InvalidToken {
        #[label("found here")]
        span: Span,
    },
    #[error("integer is too large")]
    IntegerOutOfRange {
        #[label("integer defined here")]
        span: Span,
    },
    #[error("invalid string character")]
    InvalidStringCharacters {
        #[label("invalid characters")]
        span: Span,
    },
    #[error("unterminated string")]
    UnterminatedString {
        #[label("string starts here")]
        span: Span,
    },
    #[error("invalid string escape")]
    InvalidStringEscape {
        #[label("defined here")]
        span: Span,
    },
    #[error("unterminated block comment")]
    UnterminatedComment {
        #[label("comment starts here")]
        span: Span,
    },
    #[error("whitespace is required between a number and an identifier")]
    NoSpaceBetweenNumberAndIdent {
        #[label("found here")]
        span: Span,
    },
    #[error("file is too large")]
    #[diagnostic(help("the maximum file length is {max} bytes"))]
    FileTooLarge { max: usize },
    #[error("string is not valid utf-8")]
    InvalidUtf8String {
        #[label("defined here")]
        span: Span,
    },
    #[error("expected {expected}, but found '{found}'")]
    UnexpectedToken {
        expected: String,
        found: String,
        #[label("found here")]
        span: Span,
    },
    #[error("expected {expected}, but reached end of file")]
    UnexpectedEof {
        expected: String,
        #[label("file ends here")]
        span: Span,
    },
    #[error("unexpected ';'")]
    #[diagnostic(help("an empty statement is only allowed directly after a closing '}}'"))]
    EmptyStatement {
        #[label("found here")]
        span: Span,
    },
    #[error("{kind} is nested too deeply")]
    #[diagnostic(help("the maximum nesting depth is {max}"))]
    NestingTooDeep {
        kind: &'static str,
        max: u32,
        #[label("limit exceeded here")]
        span: Span,
    },
    #[error("groups are not supported")]
    #[diagnostic(help("declare a nested message and a field of that type instead"))]
    UnsupportedGroup {
        #[label("defined here")]
        span: Span,
    },
    #[error("unknown syntax '{syntax}'")]
    #[diagnostic(help("possible values are 'proto2' and 'proto3'"))]
    UnknownSyntax {
        syntax: String,
        #[label("defined here")]
        span: Span,
    },
    #[error("invalid identifier")]
    #[diagnostic(help("identifiers must consist of letters, numbers and underscores, and may not start with a number"))]
    InvalidIdentifier {
        #[label("defined here")]
        span: Span,
    },
    #[error("invalid {kind} name '{name}'")]
    #[diagnostic(help("{kind} names must start with an uppercase letter, followed by letters, numbers and underscores"))]
    InvalidTypeName {
        kind: &'static str,
        name: String,
        #[label("defined here")]
        span: Span,
    },
    #[error("invalid package name '{name}'")]
    InvalidPackageName {
        name: String,
        #[label("defined here")]
        span: Span,
    },
    #[error("invalid import path")]
    #[diagnostic(help(
        "imports may not contain backslashes, repeated forward slashes, '.' or '..' components"
    ))]
    InvalidImport {
        #[label("defined here")]
        span: Span,
    },
    #[error("'{path}' is imported more than once")]
    DuplicateImport {
        path: String,
        #[label("first imported here…")]
        first: Span,
        #[label("…and again here")]
        second: Span,
    },
    #[error("multiple package names specified")]
    DuplicatePackage {
        #[label("defined here…")]
        first: Span,
        #[label("…and again here")]
        second: Span,
    },
    #[error("field numbers must be between 1 and {}", MAX_MESSAGE_FIELD_NUMBER)]
    InvalidMessageNumber {
        #[label("defined here")]
        span: Span,
    },
    #[error(
        "field numbers {} to {} are reserved for the protocol buffer library implementation",
        RESERVED_MESSAGE_FIELD_NUMBERS.start(),
        RESERVED_MESSAGE_FIELD_NUMBERS.end()
    )]
    ReservedMessageNumber {
        #[label("defined here")]
        span: Span,
    },
    #[error("enum numbers must be between {} and {}", i32::MIN, i32::MAX)]
    InvalidEnumNumber {
        #[label("defined here")]
        span: Span,
    },
    #[error("invalid reserved range: {start} is greater than {end}")]
    InvalidReservedRange {
        start: i64,
        end: i64,
        #[label("defined here")]
        span: Span,
    },
    #[error("name '{name}' is defined twice")]
    DuplicateName {
        name: String,
        #[label("first defined here…")]
        first: Span,
        #[label("…and again here")]
        second: Span,
    },
    #[error("field number {number} is used more than once")]
    DuplicateFieldNumber {
        number: i32,
        #[label("first used here…")]
        first: Span,
        #[label("…and again here")]
        second: Span,
    },
    #[error("enum number {number} is used more than once")]
    #[diagnostic(help("set 'option allow_alias = true;' to allow multiple values with the same number"))]
    DuplicateEnumNumber {
        number: i32,
        #[label("first used here…")]
        first: Span,
        #[label("…and again here")]
        second: Span,
    },
    #[error("number {number} is reserved")]
    ReservedNumberUsed {
        number: i32,
        #[label("used here…")]
        span: Span,
        #[label("…but reserved here")]
        reserved: Span,
    },
    #[error("name '{name}' is reserved")]
    ReservedNameUsed {
        name: String,
        #[label("used here…")]
        span: Span,
        #[label("…but reserved here")]
        reserved: Span,
    },
    #[error("an enum must have at least one value")]
    EmptyEnum {
        #[label("defined here")]
        span: Span,
    },
    #[error("the first value of an enum must be zero")]
    InvalidFirstEnumValue {
        #[label("defined here")]
        span: Span,
    },
    #[error("a oneof must have at least one field")]
    EmptyOneof {
        #[label("defined here")]
        span: Span,
    },
    #[error("oneof fields cannot have labels")]
    OneofFieldWithLabel {
        #[label("defined here")]
        span: Span,
    },
    #[error("{kind} fields are not allowed in a oneof")]
    InvalidOneofFieldKind {
        kind: &'static str,
        #[label("defined here")]
        span: Span,
    },
    #[error("map fields cannot have labels")]
    MapFieldWithLabel {
        #[label("defined here")]
        span: Span,
    },
    #[error("a map field key type must be an integer, boolean or string")]
    InvalidMapFieldKeyType {
        #[label("defined here")]
        span: Span,
    },
    #[error("{kind} fields are not allowed in extensions")]
    InvalidExtendFieldKind {
        kind: &'static str,
        #[label("defined here")]
        span: Span,
    },
    #[error("extension fields may not be required")]
    RequiredExtendField {
        #[label("defined here")]
        span: Span,
    },
    #[error("'{name}' cannot be extended")]
    #[diagnostic(help("only the 'google.protobuf.*Options' messages may be extended in proto3 files"))]
    InvalidExtendee {
        name: String,
        #[label("extended here")]
        span: Span,
    },
    #[error("required fields are not allowed in proto3 syntax")]
    Proto3RequiredField {
        #[label("defined here")]
        span: Span,
    },
    #[error("default values are not allowed in proto3 syntax")]
    Proto3DefaultValue {
        #[label("defined here")]
        span: Span,
    },
    #[error("invalid method type name '{name}'")]
    #[diagnostic(help("type names must be a dot-separated sequence of identifiers ending in a name which starts with an uppercase letter"))]
    InvalidMethodType {
        name: String,
        #[label("defined here")]
        span: Span,
    },
    #[error("internal error: {message}")]
    #[diagnostic(help("this is a bug, please report it"))]
    Internal {
        message: String,
        #[label("while processing this")]
        span: Span,
    },
}

/// An error that can occur when reading a protobuf source file and parsing it.
#[derive(Diagnostic, Error)]
#[error(transparent)]
#[diagnostic(transparent)]
pub struct Error {
    kind: Box<ErrorKind>,
}

#[derive(Debug, Diagnostic, Error)]
pub(crate) enum ErrorKind {
    #[error("{}", err)]
    #[diagnostic(forward(err))]
    Parse { err: ParseError },
    #[error("error opening file '{path}'")]
    OpenFile {
        path: PathBuf,
        #[source]
        err: io::Error,
    },
    #[error("error reading file '{name}'")]
    ReadFile {
        name: String,
        #[source]
        err: io::Error,
    },
    #[error("file '{name}' is too large")]
    #[diagnostic(help("the maximum file length is {max} bytes"))]
    FileTooLarge { name: String, max: usize },
    #[error("file '{name}' is not valid utf-8")]
    FileInvalidUtf8 { name: String },
}

impl ParseErrorKind {
    pub(crate) fn category(&self) -> ErrorCategory {
        match self {
            ParseErrorKind::InvalidToken { .. }
            | ParseErrorKind::IntegerOutOfRange { .. }
            | ParseErrorKind::InvalidStringCharacters { .. }
            | ParseErrorKind::UnterminatedString { .. }
            | ParseErrorKind::InvalidStringEscape { .. }
            | ParseErrorKind::UnterminatedComment { .. }
            | ParseErrorKind::NoSpaceBetweenNumberAndIdent { .. } => ErrorCategory::Lexical,
            ParseErrorKind::InvalidUtf8String { .. }
            | ParseErrorKind::UnexpectedToken { .. }
            | ParseErrorKind::UnexpectedEof { .. }
            | ParseErrorKind::EmptyStatement { .. }
            | ParseErrorKind::NestingTooDeep { .. }
            | ParseErrorKind::UnsupportedGroup { .. } => ErrorCategory::Syntax,
            ParseErrorKind::FileTooLarge { .. } => ErrorCategory::Limit,
            ParseErrorKind::Internal { .. } => ErrorCategory::Internal,
            _ => ErrorCategory::Semantic,
        }
    }

    pub(crate) fn span(&self) -> Span {
        match self {
            ParseErrorKind::InvalidToken { span }
            | ParseErrorKind::IntegerOutOfRange { span }
            | ParseErrorKind::InvalidStringCharacters { span }
            | ParseErrorKind::UnterminatedString { span }
            | ParseErrorKind::InvalidStringEscape { span }
            | ParseErrorKind::UnterminatedComment { span }
            | ParseErrorKind::NoSpaceBetweenNumberAndIdent { span }
            | ParseErrorKind::InvalidUtf8String { span }
            | ParseErrorKind::UnexpectedToken { span, .. }
            | ParseErrorKind::UnexpectedEof { span, .. }
            | ParseErrorKind::EmptyStatement { span }
            | ParseErrorKind::UnsupportedGroup { span }
            | ParseErrorKind::NestingTooDeep { span, .. }
            | ParseErrorKind::UnknownSyntax { span, .. }
            | ParseErrorKind::InvalidIdentifier { span }
            | ParseErrorKind::InvalidTypeName { span, .. }
            | ParseErrorKind::InvalidPackageName { span, .. }
            | ParseErrorKind::InvalidImport { span }
            | ParseErrorKind::InvalidMessageNumber { span }
            | ParseErrorKind::ReservedMessageNumber { span }
            | ParseErrorKind::InvalidEnumNumber { span }
            | ParseErrorKind::InvalidReservedRange { span, .. }
            | ParseErrorKind::ReservedNumberUsed { span, .. }
            | ParseErrorKind::ReservedNameUsed { span, .. }
            | ParseErrorKind::EmptyEnum { span }
            | ParseErrorKind::InvalidFirstEnumValue { span }
            | ParseErrorKind::EmptyOneof { span }
            | ParseErrorKind::OneofFieldWithLabel { span }
            | ParseErrorKind::InvalidOneofFieldKind { span, .. }
            | ParseErrorKind::MapFieldWithLabel { span }
            | ParseErrorKind::InvalidMapFieldKeyType { span }
            | ParseErrorKind::InvalidExtendFieldKind { span, .. }
            | ParseErrorKind::RequiredExtendField { span }
            | ParseErrorKind::InvalidExtendee { span, .. }
            | ParseErrorKind::Proto3RequiredField { span }
            | ParseErrorKind::Proto3DefaultValue { span }
            | ParseErrorKind::InvalidMethodType { span, .. }
            | ParseErrorKind::Internal { span, .. } => span.clone(),
            ParseErrorKind::DuplicateImport { second, .. }
            | ParseErrorKind::DuplicatePackage { second, .. }
            | ParseErrorKind::DuplicateName { second, .. }
            | ParseErrorKind::DuplicateFieldNumber { second, .. }
            | ParseErrorKind::DuplicateEnumNumber { second, .. } => second.clone(),
            ParseErrorKind::FileTooLarge { .. } => 0..0,
        }
    }
}

impl ParseError {
    pub(crate) fn new(mut errors: Vec<ParseErrorKind>, name: &str, source: &str) -> Self {
        debug_assert!(!errors.is_empty());
        errors.sort_by_key(|err| err.span().start);
        errors.dedup();

        let kind = errors.remove(0);
        ParseError {
            kind: Box::new(kind),
            related: errors,
            source_code: NamedSource::new(name, source.to_owned()),
            lines: LineResolver::new(source),
            name: name.to_owned(),
        }
    }

    /// Gets the name of the file in which this error occurred.
    pub fn file(&self) -> &str {
        &self.name
    }

    /// Gets the byte range of the primary error.
    pub fn span(&self) -> Span {
        self.kind.span()
    }

    /// Gets the category of the primary error.
    pub fn category(&self) -> ErrorCategory {
        self.kind.category()
    }

    /// Returns every diagnostic for the file, ordered by position.
    ///
    /// # Examples
    ///
    /// ```
    /// # use protofront::{parse, ErrorCategory};
    /// let err = parse("syntax = \"proto3\";\nmessage Foo { string x = 0; }").unwrap_err();
    /// let issues = err.diagnostics();
    /// assert_eq!(issues.len(), 1);
    /// assert_eq!(issues[0].category, ErrorCategory::Semantic);
    /// assert_eq!((issues[0].location.line, issues[0].location.column), (2, 26));
    /// ```
    pub fn diagnostics(&self) -> Vec<Issue> {
        std::iter::once(&*self.kind)
            .chain(&self.related)
            .map(|kind| {
                let span = kind.span();
                Issue {
                    category: kind.category(),
                    message: kind.to_string(),
                    location: self.lines.resolve(span.start),
                    span,
                }
            })
            .collect()
    }

    #[cfg(test)]
    pub(crate) fn into_inner(mut self) -> Vec<ParseErrorKind> {
        self.related.insert(0, *self.kind);
        self.related
    }
}

impl fmt::Debug for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let location = self.lines.resolve(self.span().start);
        write!(f, "{}:{}:{}: {}", self.name, location.line, location.column, self)
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Lexical => write!(f, "lexical error"),
            ErrorCategory::Syntax => write!(f, "syntax error"),
            ErrorCategory::Semantic => write!(f, "semantic error"),
            ErrorCategory::Limit => write!(f, "limit error"),
            ErrorCategory::Internal => write!(f, "internal error"),
        }
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}: {}: {}",
            self.location.line, self.location.column, self.category, self.message
        )
    }
}

impl Error {
    pub(crate) fn from_kind(kind: ErrorKind) -> Self {
        Error {
            kind: Box::new(kind),
        }
    }

    /// Returns the parse diagnostics, if this error was caused by an invalid source file.
    pub fn as_parse_error(&self) -> Option<&ParseError> {
        match &*self.kind {
            ErrorKind::Parse { err } => Some(err),
            _ => None,
        }
    }

    /// Returns true if this error is caused by an invalid protobuf source file.
    pub fn is_parse(&self) -> bool {
        matches!(
            &*self.kind,
            ErrorKind::Parse { .. }
                | ErrorKind::FileTooLarge { .. }
                | ErrorKind::FileInvalidUtf8 { .. }
        )
    }

    /// Returns true if this error is caused by an IO error while opening or reading a file.
    pub fn is_io(&self) -> bool {
        matches!(
            &*self.kind,
            ErrorKind::OpenFile { .. } | ErrorKind::ReadFile { .. }
        )
    }
}

impl From<ParseError> for Error {
    fn from(err: ParseError) -> Self {
        Error::from_kind(ErrorKind::Parse { err })
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &*self.kind {
            ErrorKind::Parse { err } => fmt::Debug::fmt(err, f),
            ErrorKind::OpenFile { err, .. } | ErrorKind::ReadFile { err, .. } => {
                write!(f, "{}: {}", self, err)
            }
            ErrorKind::FileTooLarge { .. } | ErrorKind::FileInvalidUtf8 { .. } => {
                write!(f, "{}", self)
            }
        }
    }
}
