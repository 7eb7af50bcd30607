#[cfg(test)]
mod tests;

use std::{ascii, borrow::Cow, convert::TryInto, fmt, num::IntErrorKind};

use logos::{Lexer, Logos, Span};

use crate::{
    error::ParseErrorKind,
    lines::{LineResolver, Location},
};

#[derive(Debug, Clone, Logos, PartialEq, Eq)]
#[logos(extras = TokenExtras)]
#[logos(skip r"[\t\v\f\r ]+")]
#[logos(subpattern exponent = r"[eE][+\-]?[0-9]+")]
pub(crate) enum Token<'a> {
    #[regex("[A-Za-z_][A-Za-z0-9_]*")]
    Ident(&'a str),
    #[regex("0", |_| 0)]
    #[regex("0[0-7]+", |lex| int(lex, 8, 1))]
    #[regex("[1-9][0-9]*", |lex| int(lex, 10, 0))]
    #[regex("0[xX][0-9A-Fa-f]+", |lex| int(lex, 16, 2))]
    IntLiteral(u64),
    #[regex(r#"[0-9]+\.[0-9]*(?&exponent)?"#, float)]
    #[regex(r#"[0-9]+(?&exponent)"#, float)]
    #[regex(r#"\.[0-9]+(?&exponent)?"#, float)]
    FloatLiteral(EqFloat),
    #[regex(r#"'|""#, string)]
    StringLiteral(Cow<'a, [u8]>),
    #[token(".")]
    Dot,
    #[token("-")]
    Minus,
    #[token("+")]
    Plus,
    #[token("(")]
    LeftParen,
    #[token(")")]
    RightParen,
    #[token("{")]
    LeftBrace,
    #[token("}")]
    RightBrace,
    #[token("[")]
    LeftBracket,
    #[token("]")]
    RightBracket,
    #[token("<")]
    LeftAngleBracket,
    #[token(">")]
    RightAngleBracket,
    #[token(",")]
    Comma,
    #[token("=")]
    Equals,
    #[token(":")]
    Colon,
    #[token(";")]
    Semicolon,
    #[token("/")]
    ForwardSlash,
    #[regex(r#"//[^\n]*\n?"#, line_comment)]
    LineComment(Cow<'a, str>),
    #[token(r#"/*"#, block_comment)]
    BlockComment(Cow<'a, str>),
    #[token("\n")]
    Newline,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub(crate) struct EqFloat(pub f64);

impl EqFloat {
    fn new(f: f64) -> Self {
        debug_assert!(!f.is_nan());
        EqFloat(f)
    }
}

impl Eq for EqFloat {}

impl Token<'_> {
    pub const SYNTAX: Token<'static> = Token::Ident("syntax");
    pub const PACKAGE: Token<'static> = Token::Ident("package");
    pub const IMPORT: Token<'static> = Token::Ident("import");
    pub const ENUM: Token<'static> = Token::Ident("enum");
    pub const OPTION: Token<'static> = Token::Ident("option");
    pub const SERVICE: Token<'static> = Token::Ident("service");
    pub const RPC: Token<'static> = Token::Ident("rpc");
    pub const RETURNS: Token<'static> = Token::Ident("returns");
    pub const EXTEND: Token<'static> = Token::Ident("extend");
    pub const MESSAGE: Token<'static> = Token::Ident("message");
    pub const MAP: Token<'static> = Token::Ident("map");
    pub const ONEOF: Token<'static> = Token::Ident("oneof");
    pub const RESERVED: Token<'static> = Token::Ident("reserved");
    pub const EXTENSIONS: Token<'static> = Token::Ident("extensions");

    /// Returns true if this token is trivia which the parser skips over.
    pub fn is_trivia(&self) -> bool {
        matches!(
            self,
            Token::LineComment(_) | Token::BlockComment(_) | Token::Newline
        )
    }
}

/// Words with a fixed meaning somewhere in the grammar.
///
/// The lexer never reserves these: they are only recognized by position, so `message string { }`
/// or `int32 message = 1;` are legal.
pub(crate) const KEYWORDS: &[&str] = &[
    "syntax",
    "package",
    "import",
    "weak",
    "public",
    "option",
    "message",
    "enum",
    "service",
    "rpc",
    "stream",
    "returns",
    "extend",
    "oneof",
    "map",
    "optional",
    "required",
    "repeated",
    "reserved",
    "extensions",
    "to",
    "max",
    "group",
    "double",
    "float",
    "int32",
    "int64",
    "uint32",
    "uint64",
    "sint32",
    "sint64",
    "fixed32",
    "fixed64",
    "sfixed32",
    "sfixed64",
    "bool",
    "string",
    "bytes",
];

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Ident(value) => write!(f, "{}", value),
            Token::IntLiteral(value) => write!(f, "{}", value),
            Token::FloatLiteral(value) => {
                if value.0.fract() == 0.0 {
                    write!(f, "{:.1}", value.0)
                } else {
                    write!(f, "{}", value.0)
                }
            }
            Token::StringLiteral(bytes) => {
                write!(f, "\"")?;
                for &ch in bytes.as_ref() {
                    write!(f, "{}", ascii::escape_default(ch))?;
                }
                write!(f, "\"")?;
                Ok(())
            }
            Token::Dot => write!(f, "."),
            Token::Minus => write!(f, "-"),
            Token::LeftParen => write!(f, "("),
            Token::RightParen => write!(f, ")"),
            Token::LeftBrace => write!(f, "{{"),
            Token::RightBrace => write!(f, "}}"),
            Token::LeftBracket => write!(f, "["),
            Token::RightBracket => write!(f, "]"),
            Token::LeftAngleBracket => write!(f, "<"),
            Token::RightAngleBracket => write!(f, ">"),
            Token::Comma => write!(f, ","),
            Token::Plus => write!(f, "+"),
            Token::Equals => write!(f, "="),
            Token::Colon => write!(f, ":"),
            Token::Semicolon => write!(f, ";"),
            Token::ForwardSlash => write!(f, "/"),
            Token::LineComment(value) => write!(f, "//{}", value),
            Token::BlockComment(value) => write!(f, "/*{}*/", value),
            Token::Newline => writeln!(f),
        }
    }
}

#[derive(Default)]
pub(crate) struct TokenExtras {
    pub errors: Vec<ParseErrorKind>,
}

/// Splits `source` into tokens, including comments and newlines.
///
/// Lexing carries on past malformed tokens so that every lexical error in the file is reported,
/// but any error means no token sequence is returned.
pub(crate) fn tokenize(source: &str) -> Result<Vec<(Token<'_>, Span)>, Vec<ParseErrorKind>> {
    let mut lexer = Token::lexer(source);
    let mut tokens = Vec::new();
    let mut errors = Vec::new();

    while let Some(result) = lexer.next() {
        match result {
            Ok(token) => tokens.push((token, lexer.span())),
            Err(()) => match errors.last_mut() {
                Some(ParseErrorKind::InvalidToken { span }) if span.end == lexer.span().start => {
                    span.end = lexer.span().end;
                }
                _ => errors.push(ParseErrorKind::InvalidToken { span: lexer.span() }),
            },
        }
        errors.append(&mut lexer.extras.errors);
    }

    if errors.is_empty() {
        Ok(tokens)
    } else {
        Err(errors)
    }
}

/// The class of a [`SourceToken`].
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// A word with a fixed meaning in the grammar, such as `message` or `int32`.
    Keyword(String),
    /// Any other identifier.
    Ident(String),
    /// A string literal, with escapes decoded.
    String(Vec<u8>),
    /// An integer literal.
    Int(u64),
    /// A floating-point literal.
    Float(f64),
    /// A punctuation character.
    Symbol(char),
    /// The end of the input.
    Eof,
}

/// A token produced by [`tokenize`](crate::tokenize), with its position in the source.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceToken {
    /// The kind and value of the token.
    pub kind: TokenKind,
    /// The byte range of the token in the source.
    pub span: Span,
    /// The 1-based position of the start of the token.
    pub location: Location,
}

pub(crate) fn to_source_tokens(source: &str, tokens: &[(Token<'_>, Span)]) -> Vec<SourceToken> {
    let lines = LineResolver::new(source);
    let mut result: Vec<SourceToken> = tokens
        .iter()
        .filter(|(token, _)| !token.is_trivia())
        .map(|(token, span)| SourceToken {
            kind: TokenKind::from(token),
            span: span.clone(),
            location: lines.resolve(span.start),
        })
        .collect();
    result.push(SourceToken {
        kind: TokenKind::Eof,
        span: source.len()..source.len(),
        location: lines.resolve(source.len()),
    });
    result
}

impl From<&Token<'_>> for TokenKind {
    fn from(token: &Token<'_>) -> Self {
        match token {
            Token::Ident(value) if KEYWORDS.contains(value) => {
                TokenKind::Keyword((*value).to_owned())
            }
            Token::Ident(value) => TokenKind::Ident((*value).to_owned()),
            Token::IntLiteral(value) => TokenKind::Int(*value),
            Token::FloatLiteral(value) => TokenKind::Float(value.0),
            Token::StringLiteral(value) => TokenKind::String(value.to_vec()),
            Token::Dot => TokenKind::Symbol('.'),
            Token::Minus => TokenKind::Symbol('-'),
            Token::Plus => TokenKind::Symbol('+'),
            Token::LeftParen => TokenKind::Symbol('('),
            Token::RightParen => TokenKind::Symbol(')'),
            Token::LeftBrace => TokenKind::Symbol('{'),
            Token::RightBrace => TokenKind::Symbol('}'),
            Token::LeftBracket => TokenKind::Symbol('['),
            Token::RightBracket => TokenKind::Symbol(']'),
            Token::LeftAngleBracket => TokenKind::Symbol('<'),
            Token::RightAngleBracket => TokenKind::Symbol('>'),
            Token::Comma => TokenKind::Symbol(','),
            Token::Equals => TokenKind::Symbol('='),
            Token::Colon => TokenKind::Symbol(':'),
            Token::Semicolon => TokenKind::Symbol(';'),
            Token::ForwardSlash => TokenKind::Symbol('/'),
            Token::LineComment(_) | Token::BlockComment(_) | Token::Newline => {
                unreachable!("trivia is filtered out before conversion")
            }
        }
    }
}

fn check_number_suffix<'a>(lex: &mut Lexer<'a, Token<'a>>) {
    if matches!(lex.remainder().chars().next(), Some(ch) if ch.is_ascii_alphabetic() || ch == '_')
    {
        let start = lex.span().start;
        let mut end = lex.span().end + 1;
        while end < lex.source().len()
            && matches!(lex.source().as_bytes()[end], b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'_')
        {
            end += 1;
        }
        lex.extras
            .errors
            .push(ParseErrorKind::NoSpaceBetweenNumberAndIdent { span: start..end })
    }
}

fn int<'a>(lex: &mut Lexer<'a, Token<'a>>, radix: u32, prefix_len: usize) -> Result<u64, ()> {
    debug_assert!(lex.slice().len() > prefix_len);
    check_number_suffix(lex);

    let span = lex.span().start + prefix_len..lex.span().end;
    match u64::from_str_radix(&lex.source()[span.clone()], radix) {
        Ok(value) => Ok(value),
        Err(err) => {
            debug_assert_eq!(err.kind(), &IntErrorKind::PosOverflow);
            lex.extras
                .errors
                .push(ParseErrorKind::IntegerOutOfRange { span: lex.span() });
            Ok(Default::default())
        }
    }
}

fn float<'a>(lex: &mut Lexer<'a, Token<'a>>) -> EqFloat {
    check_number_suffix(lex);

    // The regexes only match valid float syntax, and overflow saturates to infinity.
    EqFloat::new(lex.slice().parse().unwrap_or(f64::INFINITY))
}

fn string<'a>(lex: &mut Lexer<'a, Token<'a>>) -> Cow<'a, [u8]> {
    #[derive(Logos)]
    #[logos(subpattern hex = r"[0-9A-Fa-f]")]
    enum Component<'a> {
        #[regex(r#"[^\x00\n\\'"]+"#)]
        Unescaped(&'a str),
        #[regex(r#"['"]"#, terminator)]
        Terminator(u8),
        #[regex(r#"\\[xX](?&hex)(?&hex)?"#, hex_escape)]
        #[regex(r#"\\[0-7][0-7]?[0-7]?"#, oct_escape)]
        #[regex(r#"\\[abfnrtv?\\'"]"#, char_escape)]
        Byte(u8),
        #[regex(r#"\\u(?&hex)(?&hex)(?&hex)(?&hex)"#, unicode_escape)]
        #[regex(
            r#"\\U(?&hex)(?&hex)(?&hex)(?&hex)(?&hex)(?&hex)(?&hex)(?&hex)"#,
            unicode_escape
        )]
        Char(char),
    }

    fn terminator<'a>(lex: &mut Lexer<'a, Component<'a>>) -> u8 {
        lex.slice().as_bytes()[0]
    }

    fn hex_escape<'a>(lex: &mut Lexer<'a, Component<'a>>) -> Result<u8, ()> {
        u8::from_str_radix(&lex.slice()[2..], 16).map_err(drop)
    }

    fn oct_escape<'a>(lex: &mut Lexer<'a, Component<'a>>) -> Result<u8, ()> {
        u32::from_str_radix(&lex.slice()[1..], 8)
            .map_err(drop)?
            .try_into()
            .map_err(drop)
    }

    fn char_escape<'a>(lex: &mut Lexer<'a, Component<'a>>) -> u8 {
        match lex.slice().as_bytes()[1] {
            b'a' => b'\x07',
            b'b' => b'\x08',
            b'f' => b'\x0c',
            b'n' => b'\n',
            b'r' => b'\r',
            b't' => b'\t',
            b'v' => b'\x0b',
            b'?' => b'?',
            b'\\' => b'\\',
            b'\'' => b'\'',
            b'"' => b'"',
            _ => unreachable!("failed to parse char escape"),
        }
    }

    fn unicode_escape<'a>(lex: &mut Lexer<'a, Component<'a>>) -> Option<char> {
        let value = u32::from_str_radix(&lex.slice()[2..], 16).ok()?;
        char::from_u32(value)
    }

    let mut result: Option<Cow<'a, [u8]>> = None;

    let mut char_lexer = Component::lexer(lex.remainder());
    let terminator = lex.slice().as_bytes()[0];

    loop {
        match char_lexer.next() {
            Some(Ok(Component::Unescaped(s))) => cow_push_bytes(&mut result, s.as_bytes()),
            Some(Ok(Component::Terminator(t))) if t == terminator => {
                break;
            }
            Some(Ok(Component::Terminator(ch) | Component::Byte(ch))) => {
                result.get_or_insert_with(Cow::default).to_mut().push(ch)
            }
            Some(Ok(Component::Char(ch))) => {
                let mut buf = [0; 4];
                let ch = ch.encode_utf8(&mut buf);
                result
                    .get_or_insert_with(Cow::default)
                    .to_mut()
                    .extend_from_slice(ch.as_bytes())
            }
            Some(Err(())) => {
                let start = lex.span().end + char_lexer.span().start;
                let end = lex.span().end + char_lexer.span().end;

                if char_lexer.slice().contains('\n') {
                    lex.extras.errors.push(ParseErrorKind::UnterminatedString {
                        span: lex.span().start..start,
                    });
                    break;
                }

                match lex.extras.errors.last_mut() {
                    Some(
                        ParseErrorKind::InvalidStringCharacters { span: err_span }
                        | ParseErrorKind::InvalidStringEscape { span: err_span },
                    ) if err_span.end == start => {
                        // Extend the previous error rather than reporting every byte.
                        err_span.end = end;
                    }
                    _ if char_lexer.slice().starts_with('\\') => lex
                        .extras
                        .errors
                        .push(ParseErrorKind::InvalidStringEscape { span: start..end }),
                    _ => lex
                        .extras
                        .errors
                        .push(ParseErrorKind::InvalidStringCharacters { span: start..end }),
                }
            }
            None => {
                lex.extras.errors.push(ParseErrorKind::UnterminatedString {
                    span: lex.span().start..lex.source().len(),
                });
                break;
            }
        }
    }

    lex.bump(char_lexer.span().end);
    result.unwrap_or_default()
}

fn line_comment<'a>(lex: &mut Lexer<'a, Token<'a>>) -> Cow<'a, str> {
    let content = &lex.slice()[2..];
    normalize_newlines(content.into())
}

fn block_comment<'a>(lex: &mut Lexer<'a, Token<'a>>) -> Cow<'a, str> {
    #[derive(Logos)]
    enum Component {
        #[regex(r#"\*/[\t\v\f\r ]*"#)]
        EndComment,
        #[token("/*")]
        StartComment,
        #[token("\n")]
        Newline,
    }

    let mut comment_lexer = Component::lexer(lex.remainder());
    let mut result: Option<Cow<'a, str>> = None;

    let mut depth = 1u32;
    let len = loop {
        match comment_lexer.next() {
            Some(Ok(Component::EndComment)) => {
                depth -= 1;
                if depth == 0 {
                    break comment_lexer.span().end;
                } else {
                    cow_push_str(&mut result, comment_lexer.slice());
                }
            }
            Some(Ok(Component::StartComment)) => {
                depth += 1;
                cow_push_str(&mut result, comment_lexer.slice());
            }
            Some(Ok(Component::Newline)) => {
                cow_push_str(&mut result, "\n");
                let stripped = comment_lexer.remainder().trim_start_matches([' ', '\t']);
                comment_lexer.bump(comment_lexer.remainder().len() - stripped.len());
                if stripped.starts_with('*') && !stripped.starts_with("*/") {
                    comment_lexer.bump(1);
                }
            }
            Some(Err(())) => cow_push_str(&mut result, comment_lexer.slice()),
            None => {
                lex.extras
                    .errors
                    .push(ParseErrorKind::UnterminatedComment { span: lex.span() });
                break lex.remainder().len();
            }
        }
    };

    lex.bump(len);
    normalize_newlines(result.unwrap_or_default())
}

fn cow_push_str<'a>(cow: &mut Option<Cow<'a, str>>, s: &'a str) {
    match cow {
        Some(cow) => cow.to_mut().push_str(s),
        None => *cow = Some(Cow::Borrowed(s)),
    }
}

fn cow_push_bytes<'a>(cow: &mut Option<Cow<'a, [u8]>>, s: &'a [u8]) {
    match cow {
        Some(cow) => cow.to_mut().extend_from_slice(s),
        None => *cow = Some(Cow::Borrowed(s)),
    }
}

fn normalize_newlines(s: Cow<str>) -> Cow<str> {
    if s.contains("\r\n") {
        Cow::Owned(s.replace("\r\n", "\n"))
    } else {
        s
    }
}
