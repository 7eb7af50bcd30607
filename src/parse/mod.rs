mod comments;
#[cfg(test)]
mod tests;

use logos::Span;
use tracing::debug;

use self::comments::Comments;
use crate::{
    ast::{self, FieldLabel},
    check,
    error::ParseErrorKind,
    lex::{EqFloat, Token},
    MAX_MESSAGE_FIELD_NUMBER, RESERVED_MESSAGE_FIELD_NUMBERS,
};

/// The maximum depth of nested message declarations.
const MAX_MESSAGE_DEPTH: u32 = 32;
/// The maximum depth of nested aggregate option values.
const MAX_AGGREGATE_DEPTH: u32 = 100;

/// Parses a token sequence into a file, running the node validator on each declaration as it is
/// completed.
///
/// Returns every diagnostic recorded if any were, even if the whole file could be parsed.
pub(crate) fn parse_file(
    source: &str,
    tokens: Vec<(Token<'_>, Span)>,
) -> Result<ast::File, Vec<ParseErrorKind>> {
    let mut parser = Parser::new(source, tokens);
    match parser.parse_file() {
        Ok(file) if parser.errors.is_empty() => Ok(file),
        Ok(_) => {
            debug!(count = parser.errors.len(), "file parsed with errors");
            Err(parser.errors)
        }
        Err(()) => {
            debug!(count = parser.errors.len(), "parsing aborted");
            if parser.errors.is_empty() {
                let span = parser.peek_span();
                parser.add_error(ParseErrorKind::Internal {
                    message: "parsing stopped without reporting an error".to_owned(),
                    span,
                });
            }
            Err(parser.errors)
        }
    }
}

struct Parser<'a> {
    tokens: Vec<(Token<'a>, Span)>,
    pos: usize,
    source_len: usize,
    errors: Vec<ParseErrorKind>,
    comments: Comments,
    syntax: Option<ast::Syntax>,
    last_was_block: bool,
    message_depth: u32,
    aggregate_depth: u32,
}

/// Where a field is being declared.
#[derive(Debug, Copy, Clone, PartialEq)]
enum FieldContext {
    Message,
    Oneof(usize),
    Extend,
}

impl<'a> Parser<'a> {
    fn new(source: &str, tokens: Vec<(Token<'a>, Span)>) -> Self {
        Parser {
            tokens,
            pos: 0,
            source_len: source.len(),
            errors: Vec::new(),
            comments: Comments::new(),
            syntax: None,
            last_was_block: false,
            message_depth: 0,
            aggregate_depth: 0,
        }
    }

    fn parse_file(&mut self) -> Result<ast::File, ()> {
        let mut file = ast::File::default();

        if let Some((Token::Ident("syntax"), _)) = self.peek() {
            let syntax = self.parse_syntax()?;
            file.declared_syntax = Some(syntax);
            self.syntax = Some(syntax);
        }

        loop {
            match self.peek() {
                Some((Token::Ident("import"), _)) => file.imports.push(self.parse_import()?),
                Some((Token::Ident("package"), _)) => {
                    let package = self.parse_package()?;
                    match &file.package {
                        Some(first) => self.add_error(ParseErrorKind::DuplicatePackage {
                            first: first.span.clone(),
                            second: package.span,
                        }),
                        None => file.package = Some(package),
                    }
                }
                Some((Token::Ident("option"), _)) => file.options.push(self.parse_option()?),
                Some((Token::Ident("message"), _)) => {
                    let path = ast::MessagePath(vec![file.messages.len()]);
                    file.messages.push(self.parse_message(path)?);
                }
                Some((Token::Ident("enum"), _)) => file.enums.push(self.parse_enum()?),
                Some((Token::Ident("service"), _)) => file.services.push(self.parse_service()?),
                Some((Token::Ident("extend"), _)) => file.extends.push(self.parse_extend(None)?),
                Some((Token::Semicolon, _)) => self.parse_empty_statement()?,
                None => break,
                _ => self.unexpected_token(
                    "'enum', 'extend', 'import', 'message', 'option', 'service', 'package' or ';'",
                )?,
            }
        }

        check::check_file(&file, &mut self.errors);
        Ok(file)
    }

    fn parse_syntax(&mut self) -> Result<ast::Syntax, ()> {
        self.comments.take_leading();
        self.expect_eq(Token::SYNTAX)?;
        self.expect_eq(Token::Equals)?;

        let value = self.parse_string()?;
        let syntax = match value.value.as_str() {
            "proto2" => ast::Syntax::Proto2,
            "proto3" => ast::Syntax::Proto3,
            _ => {
                self.add_error(ParseErrorKind::UnknownSyntax {
                    syntax: value.value,
                    span: value.span,
                });
                ast::Syntax::Proto3
            }
        };

        self.expect_semicolon()?;
        self.parse_trailing_comment();
        Ok(syntax)
    }

    fn parse_package(&mut self) -> Result<ast::Package, ()> {
        let mut comments = self.leading_comments();
        let start = self.expect_eq(Token::PACKAGE)?;

        let name = self.parse_full_ident()?;

        let end = self.expect_semicolon()?;
        comments.trailing = self.parse_trailing_comment();

        Ok(ast::Package {
            name,
            comments,
            span: join_span(start, end),
        })
    }

    fn parse_import(&mut self) -> Result<ast::Import, ()> {
        let mut comments = self.leading_comments();
        let start = self.expect_eq(Token::IMPORT)?;

        let kind = match self.peek() {
            Some((Token::Ident("weak"), _)) => {
                self.bump();
                Some(ast::ImportKind::Weak)
            }
            Some((Token::Ident("public"), _)) => {
                self.bump();
                Some(ast::ImportKind::Public)
            }
            Some((Token::StringLiteral(_), _)) => None,
            _ => self.unexpected_token("a string literal, 'public' or 'weak'")?,
        };

        let value = self.parse_string()?;

        let end = self.expect_semicolon()?;
        comments.trailing = self.parse_trailing_comment();

        Ok(ast::Import {
            kind,
            value,
            comments,
            span: join_span(start, end),
        })
    }

    fn parse_message(&mut self, path: ast::MessagePath) -> Result<ast::Message, ()> {
        let mut comments = self.leading_comments();
        let start = self.expect_eq(Token::MESSAGE)?;
        self.message_depth =
            self.enter_nested(self.message_depth, "message", MAX_MESSAGE_DEPTH, &start)?;

        let name = self.parse_ident()?;

        comments.trailing = self.open_block()?;

        let mut message = ast::Message {
            name,
            fields: Vec::new(),
            oneofs: Vec::new(),
            messages: Vec::new(),
            enums: Vec::new(),
            extends: Vec::new(),
            extensions: Vec::new(),
            options: Vec::new(),
            reserved: Vec::new(),
            comments,
            span: start.clone(),
        };

        let end = loop {
            match self.peek() {
                Some((Token::Ident("message"), _)) => {
                    let mut nested_path = path.clone();
                    nested_path.0.push(message.messages.len());
                    message.messages.push(self.parse_message(nested_path)?);
                }
                Some((Token::Ident("enum"), _)) => message.enums.push(self.parse_enum()?),
                Some((Token::Ident("oneof"), _)) => {
                    let index = message.oneofs.len();
                    message.oneofs.push(self.parse_oneof(index)?);
                }
                Some((Token::Ident("reserved"), _)) => {
                    message.reserved.push(self.parse_reserved(NumberKind::Message)?)
                }
                Some((Token::Ident("extensions"), _)) => {
                    message.extensions.push(self.parse_extensions()?)
                }
                Some((Token::Ident("option"), _)) => message.options.push(self.parse_option()?),
                Some((Token::Ident("extend"), _)) => message
                    .extends
                    .push(self.parse_extend(Some(path.clone()))?),
                Some((Token::Semicolon, _)) => self.parse_empty_statement()?,
                Some((Token::RightBrace, _)) => break self.close_block()?,
                Some((tok, _)) if is_field_start_token(&tok) => {
                    if let Some(field) = self.parse_field(FieldContext::Message)? {
                        message.fields.push(field);
                    }
                }
                _ => self.unexpected_token(
                    "a message field, oneof, reserved range, enum, message, option or '}'",
                )?,
            }
        };

        message.span = join_span(start, end);
        check::check_message(&message, &mut self.errors);
        self.message_depth -= 1;
        Ok(message)
    }

    fn parse_field(&mut self, context: FieldContext) -> Result<Option<ast::Field>, ()> {
        let mut comments = self.leading_comments();
        let start = self.peek_span();

        let (label, label_span) = match self.peek() {
            Some((Token::Ident("optional"), span)) => {
                self.bump();
                (FieldLabel::Optional, Some(span))
            }
            Some((Token::Ident("repeated"), span)) => {
                self.bump();
                (FieldLabel::Repeated, Some(span))
            }
            Some((Token::Ident("required"), span)) => {
                self.bump();
                if context == FieldContext::Extend {
                    self.add_error(ParseErrorKind::RequiredExtendField { span: span.clone() });
                } else if self.syntax == Some(ast::Syntax::Proto3) {
                    self.add_error(ParseErrorKind::Proto3RequiredField { span: span.clone() });
                }
                (FieldLabel::Singular, Some(span))
            }
            _ => (FieldLabel::Singular, None),
        };

        if self.is_group_start() {
            let span = self.peek_span();
            self.add_error(ParseErrorKind::UnsupportedGroup { span });
            return Err(());
        }

        let ty = self.parse_field_type(true)?;

        let name = self.parse_ident()?;

        self.expect_eq(Token::Equals)?;

        let number = self.parse_field_number()?;

        let options = match self.peek() {
            Some((Token::LeftBracket, _)) => self.parse_options_list()?,
            Some((Token::Semicolon, _)) => vec![],
            _ => self.unexpected_token("';' or '['")?,
        };

        if self.syntax == Some(ast::Syntax::Proto3) {
            for option in &options {
                if option.is("default") {
                    self.add_error(ParseErrorKind::Proto3DefaultValue {
                        span: option.name_span(),
                    });
                }
            }
        }

        let end = self.expect_semicolon()?;
        comments.trailing = self.parse_trailing_comment();

        let ty = match ty {
            Some(ty) => ty,
            None => return Ok(None),
        };

        Ok(Some(ast::Field {
            label,
            label_span,
            ty,
            name,
            number,
            options,
            oneof_index: match context {
                FieldContext::Oneof(index) => Some(index),
                _ => None,
            },
            comments,
            span: join_span(start, end),
        }))
    }

    /// Parses a field type. Returns `None` if the type was a map with an invalid key type, after
    /// recording an error.
    fn parse_field_type(&mut self, allow_map: bool) -> Result<Option<ast::Ty>, ()> {
        if allow_map && self.is_map_start() {
            return self.parse_map_type();
        }

        match self.peek() {
            Some((Token::Ident(ident), span)) => {
                if let Some(scalar) = ast::ScalarTy::from_name(ident) {
                    if !matches!(self.peek_nth(1), Some(Token::Dot)) {
                        self.bump();
                        return Ok(Some(ast::Ty::Scalar(scalar, span)));
                    }
                }
            }
            Some((Token::Dot, _)) => (),
            _ => self.unexpected_token("a field type")?,
        }

        let name = self.parse_type_name()?;
        Ok(Some(ast::Ty::Named(ast::TypeRef {
            name,
            kind: ast::TypeRefKind::Unresolved,
        })))
    }

    fn parse_map_type(&mut self) -> Result<Option<ast::Ty>, ()> {
        let start = self.expect_eq(Token::MAP)?;

        self.expect_eq(Token::LeftAngleBracket)?;

        let key_name = self.parse_type_name()?;
        let key_span = key_name.span();
        let key = match &key_name.name.parts[..] {
            [ident] if key_name.leading_dot.is_none() => ast::ScalarTy::from_name(&ident.value),
            _ => None,
        }
        .filter(ast::ScalarTy::is_valid_map_key);

        self.expect_eq(Token::Comma)?;

        let value = self.parse_field_type(false)?;

        let end = self.expect_eq(Token::RightAngleBracket)?;

        match (key, value) {
            (Some(key), Some(value)) => Ok(Some(ast::Ty::Map(Box::new(ast::MapTy {
                key,
                key_span,
                value,
                span: join_span(start, end),
            })))),
            (None, _) => {
                self.add_error(ParseErrorKind::InvalidMapFieldKeyType { span: key_span });
                Ok(None)
            }
            (Some(_), None) => Ok(None),
        }
    }

    fn parse_field_number(&mut self) -> Result<ast::Int, ()> {
        let start = self.peek_span();
        let negative = self.bump_if_eq(Token::Minus);

        let number = match self.peek() {
            Some((Token::IntLiteral(value), span)) => {
                self.bump();
                ast::Int {
                    negative,
                    value,
                    span: join_span(start, span),
                }
            }
            _ => self.unexpected_token("a positive integer")?,
        };

        match number.as_i32() {
            Some(value) if RESERVED_MESSAGE_FIELD_NUMBERS.contains(&value) => {
                self.add_error(ParseErrorKind::ReservedMessageNumber {
                    span: number.span.clone(),
                })
            }
            Some(1..=MAX_MESSAGE_FIELD_NUMBER) => (),
            _ => self.add_error(ParseErrorKind::InvalidMessageNumber {
                span: number.span.clone(),
            }),
        }

        Ok(number)
    }

    fn parse_oneof(&mut self, index: usize) -> Result<ast::Oneof, ()> {
        let mut comments = self.leading_comments();
        let start = self.expect_eq(Token::ONEOF)?;

        let name = self.parse_ident()?;

        comments.trailing = self.open_block()?;

        let mut fields = Vec::new();
        let mut options = Vec::new();

        let end = loop {
            match self.peek() {
                Some((Token::Ident("option"), _)) => options.push(self.parse_option()?),
                Some((Token::Semicolon, _)) => self.parse_empty_statement()?,
                Some((Token::RightBrace, _)) => break self.close_block()?,
                Some((tok, _)) if is_field_start_token(&tok) => {
                    if let Some(field) = self.parse_field(FieldContext::Oneof(index))? {
                        fields.push(field);
                    }
                }
                _ => self.unexpected_token("a oneof field, option or '}'")?,
            }
        };

        let oneof = ast::Oneof {
            name,
            fields,
            options,
            comments,
            span: join_span(start, end),
        };
        check::check_oneof(&oneof, &mut self.errors);
        Ok(oneof)
    }

    fn parse_extend(&mut self, parent: Option<ast::MessagePath>) -> Result<ast::Extend, ()> {
        let mut comments = self.leading_comments();
        let start = self.expect_eq(Token::EXTEND)?;

        let extendee = self.parse_type_name()?;

        comments.trailing = self.open_block()?;

        let mut fields = Vec::new();
        let mut options = Vec::new();

        let end = loop {
            match self.peek() {
                Some((Token::Ident("option"), _)) => options.push(self.parse_option()?),
                Some((Token::Semicolon, _)) => self.parse_empty_statement()?,
                Some((Token::RightBrace, _)) => break self.close_block()?,
                Some((tok, _)) if is_field_start_token(&tok) => {
                    if let Some(field) = self.parse_field(FieldContext::Extend)? {
                        fields.push(field);
                    }
                }
                _ => self.unexpected_token("a message field, option or '}'")?,
            }
        };

        let is_option_extension = check::is_option_extendee(&extendee);
        let extend = ast::Extend {
            extendee,
            fields,
            options,
            parent,
            is_option_extension,
            comments,
            span: join_span(start, end),
        };
        check::check_extend(&extend, self.syntax, &mut self.errors);
        Ok(extend)
    }

    fn parse_service(&mut self) -> Result<ast::Service, ()> {
        let mut comments = self.leading_comments();
        let start = self.expect_eq(Token::SERVICE)?;

        let name = self.parse_ident()?;

        comments.trailing = self.open_block()?;

        let mut options = Vec::new();
        let mut methods = Vec::new();

        let end = loop {
            match self.peek() {
                Some((Token::Ident("rpc"), _)) => methods.push(self.parse_method()?),
                Some((Token::Ident("option"), _)) => options.push(self.parse_option()?),
                Some((Token::Semicolon, _)) => self.parse_empty_statement()?,
                Some((Token::RightBrace, _)) => break self.close_block()?,
                _ => self.unexpected_token("'rpc', 'option' or '}'")?,
            }
        };

        let service = ast::Service {
            name,
            methods,
            options,
            comments,
            span: join_span(start, end),
        };
        check::check_service(&service, &mut self.errors);
        Ok(service)
    }

    fn parse_method(&mut self) -> Result<ast::Method, ()> {
        let mut comments = self.leading_comments();
        let start = self.expect_eq(Token::RPC)?;

        let name = self.parse_ident()?;

        self.expect_eq(Token::LeftParen)?;
        let is_client_streaming = self.parse_stream_keyword();
        let input_ty = self.parse_type_name()?;
        self.expect_eq(Token::RightParen)?;

        self.expect_eq(Token::RETURNS)?;

        self.expect_eq(Token::LeftParen)?;
        let is_server_streaming = self.parse_stream_keyword();
        let output_ty = self.parse_type_name()?;
        self.expect_eq(Token::RightParen)?;

        let mut options = Vec::new();
        let end = match self.peek() {
            Some((Token::Semicolon, _)) => {
                let end = self.expect_semicolon()?;
                comments.trailing = self.parse_trailing_comment();
                end
            }
            Some((Token::LeftBrace, _)) => {
                comments.trailing = self.open_block()?;
                loop {
                    match self.peek() {
                        Some((Token::Ident("option"), _)) => options.push(self.parse_option()?),
                        Some((Token::Semicolon, _)) => self.parse_empty_statement()?,
                        Some((Token::RightBrace, _)) => break self.close_block()?,
                        _ => self.unexpected_token("'option' or '}'")?,
                    }
                }
            }
            _ => self.unexpected_token("';' or '{'")?,
        };

        Ok(ast::Method {
            name,
            input_ty,
            output_ty,
            is_client_streaming,
            is_server_streaming,
            options,
            comments,
            span: join_span(start, end),
        })
    }

    fn parse_stream_keyword(&mut self) -> bool {
        match (self.peek(), self.peek_nth(1)) {
            (Some((Token::Ident("stream"), _)), Some(Token::Ident(_) | Token::Dot)) => {
                self.bump();
                true
            }
            _ => false,
        }
    }

    fn parse_enum(&mut self) -> Result<ast::Enum, ()> {
        let mut comments = self.leading_comments();
        let start = self.expect_eq(Token::ENUM)?;

        let name = self.parse_ident()?;

        comments.trailing = self.open_block()?;

        let mut values = Vec::new();
        let mut options = Vec::new();
        let mut reserved = Vec::new();
        let mut allow_alias = false;

        let end = loop {
            match self.peek() {
                Some((Token::Ident("option"), _)) => {
                    let option = self.parse_option()?;
                    if option.body.is("allow_alias") {
                        allow_alias = matches!(
                            option.body.value,
                            ast::OptionValue::Bool(ast::Bool { value: true, .. })
                        );
                    }
                    options.push(option);
                }
                Some((Token::Ident("reserved"), _)) => {
                    reserved.push(self.parse_reserved(NumberKind::Enum)?)
                }
                Some((Token::Semicolon, _)) => self.parse_empty_statement()?,
                Some((Token::RightBrace, _)) => break self.close_block()?,
                Some((Token::Ident(_), _)) => values.push(self.parse_enum_value()?),
                _ => self.unexpected_token("an identifier, 'reserved', 'option' or '}'")?,
            }
        };

        let enu = ast::Enum {
            name,
            values,
            options,
            reserved,
            allow_alias,
            comments,
            span: join_span(start, end),
        };
        check::check_enum(&enu, &mut self.errors);
        Ok(enu)
    }

    fn parse_enum_value(&mut self) -> Result<ast::EnumValue, ()> {
        let mut comments = self.leading_comments();

        let name = self.parse_ident()?;

        self.expect_eq(Token::Equals)?;

        let number = self.parse_signed_int()?;
        if number.as_i32().is_none() {
            self.add_error(ParseErrorKind::InvalidEnumNumber {
                span: number.span.clone(),
            });
        }

        let options = match self.peek() {
            Some((Token::Semicolon, _)) => vec![],
            Some((Token::LeftBracket, _)) => self.parse_options_list()?,
            _ => self.unexpected_token("';' or '['")?,
        };

        let end = self.expect_semicolon()?;
        comments.trailing = self.parse_trailing_comment();

        Ok(ast::EnumValue {
            span: join_span(name.span.clone(), end),
            name,
            number,
            options,
            comments,
        })
    }

    fn parse_reserved(&mut self, kind: NumberKind) -> Result<ast::Reserved, ()> {
        let mut comments = self.leading_comments();
        let start = self.expect_eq(Token::RESERVED)?;

        let reserved = match self.peek() {
            Some((Token::IntLiteral(_) | Token::Minus, _)) => {
                ast::ReservedKind::Ranges(self.parse_reserved_ranges(kind)?)
            }
            Some((Token::StringLiteral(_), _)) => {
                ast::ReservedKind::Names(self.parse_reserved_names()?)
            }
            _ => self.unexpected_token("a positive integer or string")?,
        };

        let end = self.expect_semicolon()?;
        comments.trailing = self.parse_trailing_comment();

        Ok(ast::Reserved {
            kind: reserved,
            comments,
            span: join_span(start, end),
        })
    }

    fn parse_extensions(&mut self) -> Result<ast::Extensions, ()> {
        let mut comments = self.leading_comments();
        let start = self.expect_eq(Token::EXTENSIONS)?;

        let ranges = self.parse_reserved_ranges(NumberKind::Message)?;

        let options = match self.peek() {
            Some((Token::LeftBracket, _)) => self.parse_options_list()?,
            Some((Token::Semicolon, _)) => vec![],
            _ => self.unexpected_token("';' or '['")?,
        };

        let end = self.expect_semicolon()?;
        comments.trailing = self.parse_trailing_comment();

        Ok(ast::Extensions {
            ranges,
            options,
            comments,
            span: join_span(start, end),
        })
    }

    fn parse_reserved_names(&mut self) -> Result<Vec<ast::Ident>, ()> {
        let mut names = vec![self.parse_ident_string()?];

        while let Some((Token::Comma, _)) = self.peek() {
            self.bump();
            names.push(self.parse_ident_string()?);
        }

        match self.peek() {
            Some((Token::Semicolon, _)) => Ok(names),
            _ => self.unexpected_token("',' or ';'"),
        }
    }

    fn parse_ident_string(&mut self) -> Result<ast::Ident, ()> {
        let string = self.parse_string()?;
        if !crate::case::is_valid_ident(&string.value) {
            self.add_error(ParseErrorKind::InvalidIdentifier {
                span: string.span.clone(),
            })
        }
        Ok(ast::Ident {
            value: string.value,
            span: string.span,
        })
    }

    fn parse_reserved_ranges(&mut self, kind: NumberKind) -> Result<Vec<ast::ReservedRange>, ()> {
        let mut ranges = vec![self.parse_reserved_range(kind)?];

        loop {
            match self.peek() {
                Some((Token::Comma, _)) => {
                    self.bump();
                    ranges.push(self.parse_reserved_range(kind)?);
                }
                Some((Token::Semicolon | Token::LeftBracket, _)) => break,
                _ => self.unexpected_token("',' or ';'")?,
            }
        }

        Ok(ranges)
    }

    fn parse_reserved_range(&mut self, kind: NumberKind) -> Result<ast::ReservedRange, ()> {
        let start = self.parse_range_bound(kind)?;

        let end = match self.peek() {
            Some((Token::Ident("to"), _)) => {
                self.bump();
                match self.peek() {
                    Some((Token::Ident("max"), span)) => {
                        self.bump();
                        ast::ReservedRangeEnd::Max(span)
                    }
                    Some((Token::IntLiteral(_) | Token::Minus, _)) => {
                        ast::ReservedRangeEnd::Int(self.parse_range_bound(kind)?)
                    }
                    _ => self.unexpected_token("an integer or 'max'")?,
                }
            }
            Some((Token::Comma | Token::Semicolon | Token::LeftBracket, _)) => {
                ast::ReservedRangeEnd::None
            }
            _ => self.unexpected_token("'to', ',' or ';'")?,
        };

        Ok(ast::ReservedRange { start, end })
    }

    fn parse_range_bound(&mut self, kind: NumberKind) -> Result<ast::Int, ()> {
        match kind {
            NumberKind::Enum => self.parse_signed_int(),
            NumberKind::Message => self.parse_positive_int(),
        }
    }

    fn parse_options_list(&mut self) -> Result<Vec<ast::OptionBody>, ()> {
        self.expect_eq(Token::LeftBracket)?;

        let mut options = vec![self.parse_option_body()?];
        loop {
            match self.peek() {
                Some((Token::Comma, _)) => {
                    self.bump();
                    options.push(self.parse_option_body()?);
                }
                Some((Token::RightBracket, _)) => {
                    self.bump();
                    break;
                }
                _ => self.unexpected_token("',' or ']'")?,
            }
        }

        Ok(options)
    }

    fn parse_option(&mut self) -> Result<ast::Option, ()> {
        let mut comments = self.leading_comments();
        let start = self.expect_eq(Token::OPTION)?;

        let body = self.parse_option_body()?;

        let end = self.expect_semicolon()?;
        comments.trailing = self.parse_trailing_comment();

        Ok(ast::Option {
            body,
            comments,
            span: join_span(start, end),
        })
    }

    fn parse_option_body(&mut self) -> Result<ast::OptionBody, ()> {
        let mut name = vec![self.parse_option_name_part()?];
        loop {
            match self.peek() {
                Some((Token::Dot, _)) => {
                    self.bump();
                    name.push(self.parse_option_name_part()?);
                }
                Some((Token::Equals, _)) => {
                    self.bump();
                    break;
                }
                _ => self.unexpected_token("'.' or '='")?,
            }
        }

        let value = match self.peek() {
            Some((Token::LeftBrace, _)) => ast::OptionValue::Aggregate(self.parse_aggregate()?),
            _ => self.parse_scalar_value("a constant")?,
        };

        Ok(ast::OptionBody { name, value })
    }

    fn parse_option_name_part(&mut self) -> Result<ast::OptionNamePart, ()> {
        match self.peek() {
            Some((Token::LeftParen, start)) => {
                self.bump();
                let name = self.parse_type_name()?;
                let end = self.expect_eq(Token::RightParen)?;
                Ok(ast::OptionNamePart::Extension(name, join_span(start, end)))
            }
            Some((Token::Ident(_), _)) => Ok(ast::OptionNamePart::Ident(self.parse_ident()?)),
            _ => self.unexpected_token("an identifier or '('"),
        }
    }

    /// Parses a text-format message value delimited by `{}` or `<>`.
    fn parse_aggregate(&mut self) -> Result<ast::Aggregate, ()> {
        let (close, start) = match self.peek() {
            Some((Token::LeftBrace, span)) => (Token::RightBrace, span),
            Some((Token::LeftAngleBracket, span)) => (Token::RightAngleBracket, span),
            _ => self.unexpected_token("'{' or '<'")?,
        };
        self.aggregate_depth = self.enter_nested(
            self.aggregate_depth,
            "option value",
            MAX_AGGREGATE_DEPTH,
            &start,
        )?;
        self.bump();

        let mut fields = Vec::new();
        let end = loop {
            let name = match self.peek() {
                Some((tok, span)) if tok == close => {
                    self.bump();
                    break span;
                }
                Some((Token::Ident(_), _)) => ast::AggregateFieldName::Ident(self.parse_ident()?),
                Some((Token::LeftBracket, start)) => {
                    self.bump();
                    let name = self.parse_type_name()?;
                    let end = self.expect_eq(Token::RightBracket)?;
                    ast::AggregateFieldName::Extension(name, join_span(start, end))
                }
                _ => self.unexpected_token(format!("a field name or '{}'", close))?,
            };
            let field_start = match &name {
                ast::AggregateFieldName::Ident(ident) => ident.span.clone(),
                ast::AggregateFieldName::Extension(_, span) => span.clone(),
            };

            let value = match self.peek() {
                Some((Token::Colon, _)) => {
                    self.bump();
                    match self.peek() {
                        Some((Token::LeftBracket, _)) => {
                            ast::OptionValue::Array(self.parse_aggregate_array()?)
                        }
                        _ => self.parse_aggregate_value()?,
                    }
                }
                Some((Token::LeftBrace | Token::LeftAngleBracket, _)) => {
                    ast::OptionValue::Aggregate(self.parse_aggregate()?)
                }
                Some((Token::LeftBracket, _)) => {
                    ast::OptionValue::Array(self.parse_aggregate_array()?)
                }
                _ => self.unexpected_token("':', '{' or '<'")?,
            };

            fields.push(ast::AggregateField {
                span: join_span(field_start, value.span()),
                name,
                value,
            });

            if let Some((Token::Comma | Token::Semicolon, _)) = self.peek() {
                self.bump();
            }
        };

        self.aggregate_depth -= 1;
        Ok(ast::Aggregate {
            fields,
            span: join_span(start, end),
        })
    }

    fn parse_aggregate_array(&mut self) -> Result<ast::Array, ()> {
        let start = self.expect_eq(Token::LeftBracket)?;

        let mut values = Vec::new();
        if let Some((Token::RightBracket, end)) = self.peek() {
            self.bump();
            return Ok(ast::Array {
                values,
                span: join_span(start, end),
            });
        }

        loop {
            values.push(self.parse_aggregate_value()?);
            match self.peek() {
                Some((Token::Comma, _)) => {
                    self.bump();
                }
                Some((Token::RightBracket, end)) => {
                    self.bump();
                    return Ok(ast::Array {
                        values,
                        span: join_span(start, end),
                    });
                }
                _ => self.unexpected_token("',' or ']'")?,
            }
        }
    }

    fn parse_aggregate_value(&mut self) -> Result<ast::OptionValue, ()> {
        match self.peek() {
            Some((Token::LeftBrace | Token::LeftAngleBracket, _)) => {
                Ok(ast::OptionValue::Aggregate(self.parse_aggregate()?))
            }
            _ => self.parse_scalar_value("a value"),
        }
    }

    fn parse_scalar_value(&mut self, expected: &str) -> Result<ast::OptionValue, ()> {
        match self.peek() {
            Some((Token::Ident("true"), span)) => {
                self.bump();
                Ok(ast::OptionValue::Bool(ast::Bool { value: true, span }))
            }
            Some((Token::Ident("false"), span)) => {
                self.bump();
                Ok(ast::OptionValue::Bool(ast::Bool { value: false, span }))
            }
            Some((Token::Ident("inf" | "nan"), _))
            | Some((Token::IntLiteral(_) | Token::FloatLiteral(_), _)) => self.parse_number(),
            Some((Token::Ident(_), _)) => Ok(ast::OptionValue::Ident(self.parse_ident()?)),
            Some((Token::Minus | Token::Plus, _)) => self.parse_number(),
            Some((Token::StringLiteral(_), _)) => Ok(ast::OptionValue::String(self.parse_bytes()?)),
            _ => self.unexpected_token(expected),
        }
    }

    fn parse_number(&mut self) -> Result<ast::OptionValue, ()> {
        let start = self.peek_span();
        let negative = match self.peek() {
            Some((Token::Minus, _)) => {
                self.bump();
                true
            }
            Some((Token::Plus, _)) => {
                self.bump();
                false
            }
            _ => false,
        };

        let sign = if negative { -1.0 } else { 1.0 };
        match self.peek() {
            Some((Token::IntLiteral(value), end)) => {
                self.bump();
                Ok(ast::OptionValue::Int(ast::Int {
                    negative,
                    value,
                    span: join_span(start, end),
                }))
            }
            Some((Token::FloatLiteral(EqFloat(value)), end)) => {
                self.bump();
                Ok(ast::OptionValue::Float(ast::Float {
                    value: sign * value,
                    span: join_span(start, end),
                }))
            }
            Some((Token::Ident("inf"), end)) => {
                self.bump();
                Ok(ast::OptionValue::Float(ast::Float {
                    value: sign * f64::INFINITY,
                    span: join_span(start, end),
                }))
            }
            Some((Token::Ident("nan"), end)) => {
                self.bump();
                Ok(ast::OptionValue::Float(ast::Float {
                    value: f64::NAN,
                    span: join_span(start, end),
                }))
            }
            _ => self.unexpected_token("a number"),
        }
    }

    fn parse_type_name(&mut self) -> Result<ast::TypeName, ()> {
        let leading_dot = match self.peek() {
            Some((Token::Dot, span)) => {
                self.bump();
                Some(span)
            }
            Some((Token::Ident(_), _)) => None,
            _ => self.unexpected_token("a type name")?,
        };

        let name = self.parse_full_ident()?;

        Ok(ast::TypeName { leading_dot, name })
    }

    fn parse_full_ident(&mut self) -> Result<ast::FullIdent, ()> {
        let mut parts = vec![self.parse_ident()?];

        while let Some((Token::Dot, _)) = self.peek() {
            self.bump();
            parts.push(self.parse_ident()?);
        }

        Ok(ast::FullIdent::from(parts))
    }

    fn parse_ident(&mut self) -> Result<ast::Ident, ()> {
        match self.peek() {
            Some((Token::Ident(value), span)) => {
                self.bump();
                Ok(ast::Ident::new(value, span))
            }
            _ => self.unexpected_token("an identifier"),
        }
    }

    fn parse_positive_int(&mut self) -> Result<ast::Int, ()> {
        match self.peek() {
            Some((Token::IntLiteral(value), span)) => {
                self.bump();
                Ok(ast::Int {
                    negative: false,
                    value,
                    span,
                })
            }
            _ => self.unexpected_token("a positive integer"),
        }
    }

    fn parse_signed_int(&mut self) -> Result<ast::Int, ()> {
        let start = self.peek_span();
        let negative = self.bump_if_eq(Token::Minus);
        match self.peek() {
            Some((Token::IntLiteral(value), end)) => {
                self.bump();
                Ok(ast::Int {
                    negative,
                    value,
                    span: join_span(start, end),
                })
            }
            _ => self.unexpected_token("an integer"),
        }
    }

    /// Parses a string literal, concatenating any adjacent literals.
    fn parse_bytes(&mut self) -> Result<ast::Bytes, ()> {
        let (mut value, start) = match self.peek() {
            Some((Token::StringLiteral(value), span)) => {
                self.bump();
                (value.into_owned(), span)
            }
            _ => self.unexpected_token("a string literal")?,
        };

        let mut end = start.clone();
        while let Some((Token::StringLiteral(more), span)) = self.peek() {
            self.bump();
            value.extend_from_slice(&more);
            end = span;
        }

        Ok(ast::Bytes {
            value,
            span: join_span(start, end),
        })
    }

    fn parse_string(&mut self) -> Result<ast::String, ()> {
        let bytes = self.parse_bytes()?;
        match String::from_utf8(bytes.value) {
            Ok(value) => Ok(ast::String {
                value,
                span: bytes.span,
            }),
            Err(_) => {
                self.add_error(ParseErrorKind::InvalidUtf8String { span: bytes.span });
                Err(())
            }
        }
    }

    fn parse_empty_statement(&mut self) -> Result<(), ()> {
        if self.last_was_block {
            self.expect_semicolon()?;
            self.comments.reset();
            Ok(())
        } else {
            let span = self.peek_span();
            self.add_error(ParseErrorKind::EmptyStatement { span });
            Err(())
        }
    }

    fn is_group_start(&mut self) -> bool {
        matches!(self.peek_nth(0), Some(Token::Ident("group")))
            && matches!(self.peek_nth(1), Some(Token::Ident(_)))
            && matches!(self.peek_nth(2), Some(Token::Equals))
            && matches!(self.peek_nth(3), Some(Token::IntLiteral(_)))
            && matches!(self.peek_nth(4), Some(Token::LeftBrace))
    }

    fn is_map_start(&mut self) -> bool {
        matches!(self.peek_nth(0), Some(Token::Ident("map")))
            && matches!(self.peek_nth(1), Some(Token::LeftAngleBracket))
    }

    fn leading_comments(&mut self) -> ast::Comments {
        let (leading_detached, leading) = self.comments.take_leading();
        ast::Comments {
            leading_detached,
            leading,
            trailing: None,
        }
    }

    /// Collects a comment on the same line as the token just consumed.
    fn parse_trailing_comment(&mut self) -> Option<String> {
        self.comments.reset();
        self.peek();
        self.comments.take_trailing()
    }

    fn open_block(&mut self) -> Result<Option<String>, ()> {
        self.expect_eq(Token::LeftBrace)?;
        self.last_was_block = false;
        Ok(self.parse_trailing_comment())
    }

    fn close_block(&mut self) -> Result<Span, ()> {
        let span = self.expect_eq(Token::RightBrace)?;
        self.last_was_block = true;
        self.comments.reset();
        Ok(span)
    }

    fn expect_semicolon(&mut self) -> Result<Span, ()> {
        let span = self.expect_eq(Token::Semicolon)?;
        self.last_was_block = false;
        Ok(span)
    }

    fn expect_eq(&mut self, t: Token) -> Result<Span, ()> {
        match self.peek() {
            Some((tok, span)) if tok == t => {
                self.bump();
                Ok(span)
            }
            _ => self.unexpected_token(format!("'{}'", t))?,
        }
    }

    fn bump_if_eq(&mut self, t: Token) -> bool {
        match self.peek() {
            Some((tok, _)) if tok == t => {
                self.bump();
                true
            }
            _ => false,
        }
    }

    fn bump(&mut self) -> (Token<'a>, Span) {
        let next = self
            .peek()
            .expect("called bump without peek returning Some()");
        self.pos += 1;
        next
    }

    /// Gets the next non-trivia token, passing any comments and newlines before it to the
    /// comment tracker.
    fn peek(&mut self) -> Option<(Token<'a>, Span)> {
        while let Some((token, _)) = self.tokens.get(self.pos) {
            match token {
                Token::Newline => self.comments.newline(),
                Token::LineComment(comment) => self.comments.line_comment(comment.clone()),
                Token::BlockComment(comment) => self.comments.block_comment(comment.clone()),
                _ => return Some(self.tokens[self.pos].clone()),
            }
            self.pos += 1;
        }
        None
    }

    /// Looks ahead `n` non-trivia tokens past the current one without consuming anything.
    fn peek_nth(&self, n: usize) -> Option<&Token<'a>> {
        self.tokens[self.pos.min(self.tokens.len())..]
            .iter()
            .map(|(token, _)| token)
            .filter(|token| !token.is_trivia())
            .nth(n)
    }

    fn peek_span(&mut self) -> Span {
        match self.peek() {
            Some((_, span)) => span,
            None => self.source_len..self.source_len,
        }
    }

    fn unexpected_token<T>(&mut self, expected: impl ToString) -> Result<T, ()> {
        match self.peek() {
            Some((found, span)) => {
                self.add_error(ParseErrorKind::UnexpectedToken {
                    expected: expected.to_string(),
                    found: found.to_string(),
                    span,
                });
                Err(())
            }
            None => {
                self.add_error(ParseErrorKind::UnexpectedEof {
                    expected: expected.to_string(),
                    span: self.source_len..self.source_len,
                });
                Err(())
            }
        }
    }

    /// Returns the depth after entering one more level, or records an error if `max` is exceeded.
    ///
    /// Parsing stops on failure, so callers only restore the depth on success.
    fn enter_nested(
        &mut self,
        depth: u32,
        kind: &'static str,
        max: u32,
        span: &Span,
    ) -> Result<u32, ()> {
        if depth >= max {
            self.add_error(ParseErrorKind::NestingTooDeep {
                kind,
                max,
                span: span.clone(),
            });
            return Err(());
        }
        Ok(depth + 1)
    }

    fn add_error(&mut self, err: ParseErrorKind) {
        self.errors.push(err);
    }
}

/// Whether a reserved range bounds message field numbers or enum values.
#[derive(Debug, Copy, Clone)]
enum NumberKind {
    Message,
    Enum,
}

fn is_field_start_token(tok: &Token) -> bool {
    matches!(tok, Token::Dot | Token::Ident(_))
}

fn join_span(start: Span, end: Span) -> Span {
    start.start..end.end
}
