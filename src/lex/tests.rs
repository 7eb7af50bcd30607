use super::*;

use proptest::prelude::*;

#[test]
fn simple_tokens() {
    let source = r#"hell0 052 42 0x2A 5. 0.5 0.42e+2 2e-4 .2e+3 52e3 true
        false "hello \a\b\f\n\r\t\v\?\\\'\" \052 \x2a" 'hello 😀' _foo"#;
    let mut lexer = Token::lexer(source);

    assert_eq!(lexer.next().unwrap(), Ok(Token::Ident("hell0")));
    assert_eq!(lexer.next().unwrap(), Ok(Token::IntLiteral(42)));
    assert_eq!(lexer.next().unwrap(), Ok(Token::IntLiteral(42)));
    assert_eq!(lexer.next().unwrap(), Ok(Token::IntLiteral(42)));
    assert_eq!(lexer.next().unwrap(), Ok(Token::FloatLiteral(EqFloat(5.))));
    assert_eq!(lexer.next().unwrap(), Ok(Token::FloatLiteral(EqFloat(0.5))));
    assert_eq!(
        lexer.next().unwrap(),
        Ok(Token::FloatLiteral(EqFloat(0.42e+2)))
    );
    assert_eq!(
        lexer.next().unwrap(),
        Ok(Token::FloatLiteral(EqFloat(2e-4)))
    );
    assert_eq!(
        lexer.next().unwrap(),
        Ok(Token::FloatLiteral(EqFloat(0.2e+3)))
    );
    assert_eq!(
        lexer.next().unwrap(),
        Ok(Token::FloatLiteral(EqFloat(52e3)))
    );
    assert_eq!(lexer.next().unwrap(), Ok(Token::Ident("true")));
    assert_eq!(lexer.next().unwrap(), Ok(Token::Newline));
    assert_eq!(lexer.next().unwrap(), Ok(Token::Ident("false")));
    assert_eq!(
        lexer.next().unwrap(),
        Ok(Token::StringLiteral(
            b"hello \x07\x08\x0c\n\r\t\x0b?\\'\" * *".as_ref().into()
        ))
    );
    assert_eq!(
        lexer.next().unwrap(),
        Ok(Token::StringLiteral(
            b"hello \xF0\x9F\x98\x80".as_ref().into()
        ))
    );
    assert_eq!(lexer.next().unwrap(), Ok(Token::Ident("_foo")));
    assert_eq!(lexer.next(), None);

    assert_eq!(lexer.extras.errors, vec![]);
}

#[test]
fn unicode_escapes() {
    let source = r#"'é' "\U0001F600""#;
    let mut lexer = Token::lexer(source);

    assert_eq!(
        lexer.next().unwrap(),
        Ok(Token::StringLiteral(b"\xC3\xA9".as_ref().into()))
    );
    assert_eq!(
        lexer.next().unwrap(),
        Ok(Token::StringLiteral(b"\xF0\x9F\x98\x80".as_ref().into()))
    );
    assert_eq!(lexer.next(), None);
    assert_eq!(lexer.extras.errors, vec![]);
}

#[test]
fn integer_overflow() {
    let source = "99999999999999999999999999999999999999 4";
    let mut lexer = Token::lexer(source);

    assert_eq!(lexer.next(), Some(Ok(Token::IntLiteral(0))));
    assert_eq!(lexer.next(), Some(Ok(Token::IntLiteral(4))));
    assert_eq!(lexer.next(), None);

    assert_eq!(
        lexer.extras.errors,
        vec![ParseErrorKind::IntegerOutOfRange {
            span: 0..(source.len() - 2),
        }]
    );
}

#[test]
fn number_followed_by_ident() {
    let source = "1to 2.5e3abc 7";
    let mut lexer = Token::lexer(source);

    assert_eq!(lexer.next(), Some(Ok(Token::IntLiteral(1))));
    assert_eq!(lexer.next(), Some(Ok(Token::Ident("to"))));
    assert_eq!(
        lexer.next(),
        Some(Ok(Token::FloatLiteral(EqFloat(2.5e3))))
    );
    assert_eq!(lexer.next(), Some(Ok(Token::Ident("abc"))));
    assert_eq!(lexer.next(), Some(Ok(Token::IntLiteral(7))));
    assert_eq!(lexer.next(), None);

    assert_eq!(
        lexer.extras.errors,
        vec![
            ParseErrorKind::NoSpaceBetweenNumberAndIdent { span: 0..3 },
            ParseErrorKind::NoSpaceBetweenNumberAndIdent { span: 4..12 },
        ]
    );
}

#[test]
fn invalid_token() {
    let source = "@ foo";
    let mut lexer = Token::lexer(source);

    assert_eq!(lexer.next(), Some(Err(())));
    assert_eq!(lexer.next(), Some(Ok(Token::Ident("foo"))));
    assert_eq!(lexer.next(), None);

    assert_eq!(lexer.extras.errors, vec![]);
}

#[test]
fn tokenize_merges_invalid_tokens() {
    assert_eq!(
        tokenize("foo @$ bar ^"),
        Err(vec![
            ParseErrorKind::InvalidToken { span: 4..6 },
            ParseErrorKind::InvalidToken { span: 11..12 },
        ])
    );
}

#[test]
fn invalid_string_char() {
    let source = "\"\x00\" foo";
    let mut lexer = Token::lexer(source);

    assert_eq!(
        lexer.next(),
        Some(Ok(Token::StringLiteral(Default::default())))
    );
    assert_eq!(lexer.next(), Some(Ok(Token::Ident("foo"))));
    assert_eq!(lexer.next(), None);

    assert_eq!(
        lexer.extras.errors,
        vec![ParseErrorKind::InvalidStringCharacters { span: 1..2 }]
    );
}

#[test]
fn invalid_string_escape() {
    let source = r#""\m" foo"#;
    let mut lexer = Token::lexer(source);

    assert_eq!(
        lexer.next(),
        Some(Ok(Token::StringLiteral(b"m".as_ref().into())))
    );
    assert_eq!(lexer.next(), Some(Ok(Token::Ident("foo"))));
    assert_eq!(lexer.next(), None);

    assert_eq!(
        lexer.extras.errors,
        vec![ParseErrorKind::InvalidStringEscape { span: 1..2 }]
    );
}

#[test]
fn unterminated_string() {
    let source = "\"hello \n foo";
    let mut lexer = Token::lexer(source);

    assert_eq!(
        lexer.next(),
        Some(Ok(Token::StringLiteral(b"hello ".as_ref().into())))
    );
    assert_eq!(lexer.next(), Some(Ok(Token::Ident("foo"))));
    assert_eq!(lexer.next(), None);

    assert_eq!(
        lexer.extras.errors,
        vec![ParseErrorKind::UnterminatedString { span: 0..7 }]
    );
}

#[test]
fn string_unterminated_at_eof() {
    let source = "'abc";
    let mut lexer = Token::lexer(source);

    assert_eq!(
        lexer.next(),
        Some(Ok(Token::StringLiteral(b"abc".as_ref().into())))
    );
    assert_eq!(lexer.next(), None);

    assert_eq!(
        lexer.extras.errors,
        vec![ParseErrorKind::UnterminatedString { span: 0..4 }]
    );
}

#[test]
fn line_comments() {
    let source = "foo // bar \n  // baz \n";
    let mut lexer = Token::lexer(source);

    assert_eq!(lexer.next(), Some(Ok(Token::Ident("foo"))));
    assert_eq!(
        lexer.next(),
        Some(Ok(Token::LineComment(" bar \n".into())))
    );
    assert_eq!(
        lexer.next(),
        Some(Ok(Token::LineComment(" baz \n".into())))
    );
    assert_eq!(lexer.next(), None);

    assert_eq!(lexer.extras.errors, vec![]);
}

#[test]
fn block_comments() {
    let source = "foo /* bar\n * quz*/ /* baz\n */";
    let mut lexer = Token::lexer(source);

    assert_eq!(lexer.next(), Some(Ok(Token::Ident("foo"))));
    assert_eq!(
        lexer.next(),
        Some(Ok(Token::BlockComment(" bar\n quz".into())))
    );
    assert_eq!(
        lexer.next(),
        Some(Ok(Token::BlockComment(" baz\n".into())))
    );
    assert_eq!(lexer.next(), None);

    assert_eq!(lexer.extras.errors, vec![]);
}

#[test]
fn nested_block_comment() {
    let source = "foo /* bar /* inner */ baz */ quz";
    let mut lexer = Token::lexer(source);

    assert_eq!(lexer.next(), Some(Ok(Token::Ident("foo"))));
    assert_eq!(
        lexer.next(),
        Some(Ok(Token::BlockComment(" bar /* inner */ baz ".into())))
    );
    assert_eq!(lexer.next(), Some(Ok(Token::Ident("quz"))));
    assert_eq!(lexer.next(), None);

    assert_eq!(lexer.extras.errors, vec![]);
}

#[test]
fn nested_block_comment_unterminated() {
    let source = "foo /* bar /* inner */ baz";
    let mut lexer = Token::lexer(source);

    assert_eq!(lexer.next(), Some(Ok(Token::Ident("foo"))));
    assert_eq!(
        lexer.next(),
        Some(Ok(Token::BlockComment(" bar /* inner */ baz".into())))
    );
    assert_eq!(lexer.next(), None);

    assert_eq!(
        lexer.extras.errors,
        vec![ParseErrorKind::UnterminatedComment { span: 4..6 }]
    );
}

#[test]
fn keywords_are_identifiers() {
    let source = "message string int32";
    let mut lexer = Token::lexer(source);

    assert_eq!(lexer.next(), Some(Ok(Token::MESSAGE)));
    assert_eq!(lexer.next(), Some(Ok(Token::Ident("string"))));
    assert_eq!(lexer.next(), Some(Ok(Token::Ident("int32"))));
    assert_eq!(lexer.next(), None);
}

#[test]
fn source_tokens() {
    let tokens = tokenize("message Foo {\n  // hi\n  int32 x = 1;\n}").unwrap();
    let tokens = to_source_tokens("message Foo {\n  // hi\n  int32 x = 1;\n}", &tokens);

    let kinds: Vec<_> = tokens.iter().map(|t| t.kind.clone()).collect();
    assert_eq!(
        kinds,
        vec![
            TokenKind::Keyword("message".to_owned()),
            TokenKind::Ident("Foo".to_owned()),
            TokenKind::Symbol('{'),
            TokenKind::Keyword("int32".to_owned()),
            TokenKind::Ident("x".to_owned()),
            TokenKind::Symbol('='),
            TokenKind::Int(1),
            TokenKind::Symbol(';'),
            TokenKind::Symbol('}'),
            TokenKind::Eof,
        ]
    );

    assert_eq!(tokens[3].location, Location { line: 3, column: 3 });
    assert_eq!(tokens[9].location, Location { line: 4, column: 2 });
}

#[test]
fn whitespace() {
    assert_eq!(
        Token::lexer("value: -2.0").collect::<Vec<_>>(),
        vec![
            Ok(Token::Ident("value")),
            Ok(Token::Colon),
            Ok(Token::Minus),
            Ok(Token::FloatLiteral(EqFloat(2.0))),
        ]
    );
    assert_eq!(
        Token::lexer("value: - 2.0").collect::<Vec<_>>(),
        vec![
            Ok(Token::Ident("value")),
            Ok(Token::Colon),
            Ok(Token::Minus),
            Ok(Token::FloatLiteral(EqFloat(2.0))),
        ]
    );
}

proptest! {
    #[test]
    fn tokenize_never_panics(source in ".{0,64}") {
        let _ = tokenize(&source);
    }

    #[test]
    fn decimal_integers(value: u64) {
        let source = value.to_string();
        let tokens = tokenize(&source).unwrap();
        prop_assert_eq!(tokens.len(), 1);
        prop_assert_eq!(&tokens[0].0, &Token::IntLiteral(value));
    }
}
