use super::*;
use crate::lex::tokenize;

macro_rules! case {
    ($method:ident($source:expr $(, $arg:expr)*) => Err($errors:expr)) => {
        let tokens = tokenize($source).unwrap();
        let mut parser = Parser::new($source, tokens);
        parser.$method($($arg),*).unwrap_err();
        assert_eq!(parser.errors, $errors);
    };
    ($method:ident($source:expr $(, $arg:expr)*) => $ast:expr, Err($errors:expr)) => {
        let tokens = tokenize($source).unwrap();
        let mut parser = Parser::new($source, tokens);
        let result = parser.$method($($arg),*);
        assert_eq!(parser.errors, $errors);
        similar_asserts::assert_eq!(result.unwrap(), $ast);
    };
    ($method:ident($source:expr $(, $arg:expr)*) => $ast:expr) => {
        let tokens = tokenize($source).unwrap();
        let mut parser = Parser::new($source, tokens);
        let result = parser.$method($($arg),*);
        assert_eq!(parser.errors, vec![]);
        similar_asserts::assert_eq!(result.unwrap(), $ast);
    };
}

fn file(source: &str) -> Result<ast::File, Vec<ParseErrorKind>> {
    parse_file(source, tokenize(source).unwrap())
}

#[test]
pub fn parse_option() {
    case!(parse_option("option foo = 5;") => ast::Option {
        body: ast::OptionBody {
            name: vec![ast::OptionNamePart::Ident(ast::Ident::new("foo", 7..10))],
            value: ast::OptionValue::Int(ast::Int {
                negative: false,
                value: 5,
                span: 13..14,
            }),
        },
        comments: ast::Comments::default(),
        span: 0..15,
    });
    case!(parse_option("option (foo.bar) = \"hello\";") => ast::Option {
        body: ast::OptionBody {
            name: vec![ast::OptionNamePart::Extension(
                ast::TypeName {
                    leading_dot: None,
                    name: ast::FullIdent::from(vec![
                        ast::Ident::new("foo", 8..11),
                        ast::Ident::new("bar", 12..15),
                    ]),
                },
                7..16,
            )],
            value: ast::OptionValue::String(ast::Bytes {
                value: b"hello".to_vec(),
                span: 19..26,
            }),
        },
        comments: ast::Comments::default(),
        span: 0..27,
    });
    case!(parse_option("option (foo).bar = true;") => ast::Option {
        body: ast::OptionBody {
            name: vec![
                ast::OptionNamePart::Extension(
                    ast::TypeName {
                        leading_dot: None,
                        name: ast::FullIdent::from(ast::Ident::new("foo", 8..11)),
                    },
                    7..12,
                ),
                ast::OptionNamePart::Ident(ast::Ident::new("bar", 13..16)),
            ],
            value: ast::OptionValue::Bool(ast::Bool {
                value: true,
                span: 19..23,
            }),
        },
        comments: ast::Comments::default(),
        span: 0..24,
    });
    case!(parse_option("option ;") => Err(vec![ParseErrorKind::UnexpectedToken {
        expected: "an identifier or '('".to_owned(),
        found: ";".to_owned(),
        span: 7..8,
    }]));
    case!(parse_option("option foo (") => Err(vec![ParseErrorKind::UnexpectedToken {
        expected: "'.' or '='".to_owned(),
        found: "(".to_owned(),
        span: 11..12,
    }]));
    case!(parse_option("option foo = =") => Err(vec![ParseErrorKind::UnexpectedToken {
        expected: "a constant".to_owned(),
        found: "=".to_owned(),
        span: 13..14,
    }]));
    case!(parse_option("option foo = 1 )") => Err(vec![ParseErrorKind::UnexpectedToken {
        expected: "';'".to_owned(),
        found: ")".to_owned(),
        span: 15..16,
    }]));
    case!(parse_option("option foo") => Err(vec![ParseErrorKind::UnexpectedEof {
        expected: "'.' or '='".to_owned(),
        span: 10..10,
    }]));
}

#[test]
pub fn parse_option_values() {
    case!(parse_option("option foo = -inf;") => ast::Option {
        body: ast::OptionBody {
            name: vec![ast::OptionNamePart::Ident(ast::Ident::new("foo", 7..10))],
            value: ast::OptionValue::Float(ast::Float {
                value: f64::NEG_INFINITY,
                span: 13..17,
            }),
        },
        comments: ast::Comments::default(),
        span: 0..18,
    });
    case!(parse_option("option foo = -5;") => ast::Option {
        body: ast::OptionBody {
            name: vec![ast::OptionNamePart::Ident(ast::Ident::new("foo", 7..10))],
            value: ast::OptionValue::Int(ast::Int {
                negative: true,
                value: 5,
                span: 13..15,
            }),
        },
        comments: ast::Comments::default(),
        span: 0..16,
    });
    case!(parse_option("option foo = 'a' \"b\";") => ast::Option {
        body: ast::OptionBody {
            name: vec![ast::OptionNamePart::Ident(ast::Ident::new("foo", 7..10))],
            value: ast::OptionValue::String(ast::Bytes {
                value: b"ab".to_vec(),
                span: 13..20,
            }),
        },
        comments: ast::Comments::default(),
        span: 0..21,
    });
    case!(parse_option("option foo = SPEED;") => ast::Option {
        body: ast::OptionBody {
            name: vec![ast::OptionNamePart::Ident(ast::Ident::new("foo", 7..10))],
            value: ast::OptionValue::Ident(ast::Ident::new("SPEED", 13..18)),
        },
        comments: ast::Comments::default(),
        span: 0..19,
    });
}

#[test]
pub fn parse_aggregate_option() {
    let tokens = tokenize("option (foo) = { a: 1 b { c: \"x\" }, d: [1, 2]; [e.f] < > };").unwrap();
    let mut parser = Parser::new("", tokens);
    let option = parser.parse_option().unwrap();
    assert_eq!(parser.errors, vec![]);

    let aggregate = match option.body.value {
        ast::OptionValue::Aggregate(aggregate) => aggregate,
        value => panic!("expected aggregate, found {:?}", value),
    };
    assert_eq!(aggregate.fields.len(), 4);
    assert!(matches!(
        &aggregate.fields[0].value,
        ast::OptionValue::Int(ast::Int { value: 1, .. })
    ));
    assert!(matches!(
        &aggregate.fields[1].value,
        ast::OptionValue::Aggregate(nested) if nested.fields.len() == 1
    ));
    assert!(matches!(
        &aggregate.fields[2].value,
        ast::OptionValue::Array(array) if array.values.len() == 2
    ));
    assert!(matches!(
        &aggregate.fields[3].name,
        ast::AggregateFieldName::Extension(name, _) if name.to_string() == "e.f"
    ));
}

#[test]
pub fn parse_message() {
    case!(parse_message("message Foo { int32 bar = 1; }", ast::MessagePath(vec![0])) => ast::Message {
        name: ast::Ident::new("Foo", 8..11),
        fields: vec![ast::Field {
            label: FieldLabel::Singular,
            label_span: None,
            ty: ast::Ty::Scalar(ast::ScalarTy::Int32, 14..19),
            name: ast::Ident::new("bar", 20..23),
            number: ast::Int {
                negative: false,
                value: 1,
                span: 26..27,
            },
            options: vec![],
            oneof_index: None,
            comments: ast::Comments::default(),
            span: 14..28,
        }],
        oneofs: vec![],
        messages: vec![],
        enums: vec![],
        extends: vec![],
        extensions: vec![],
        options: vec![],
        reserved: vec![],
        comments: ast::Comments::default(),
        span: 0..30,
    });
    case!(parse_message("message Foo { 1 }", ast::MessagePath(vec![0])) => Err(vec![ParseErrorKind::UnexpectedToken {
        expected: "a message field, oneof, reserved range, enum, message, option or '}'".to_owned(),
        found: "1".to_owned(),
        span: 14..15,
    }]));
    case!(parse_message("message Foo {", ast::MessagePath(vec![0])) => Err(vec![ParseErrorKind::UnexpectedEof {
        expected: "a message field, oneof, reserved range, enum, message, option or '}'".to_owned(),
        span: 13..13,
    }]));
}

#[test]
pub fn parse_field() {
    case!(parse_field("repeated .foo.Bar bar = 2 [packed = true];", FieldContext::Message) => Some(ast::Field {
        label: FieldLabel::Repeated,
        label_span: Some(0..8),
        ty: ast::Ty::Named(ast::TypeRef {
            name: ast::TypeName {
                leading_dot: Some(9..10),
                name: ast::FullIdent::from(vec![
                    ast::Ident::new("foo", 10..13),
                    ast::Ident::new("Bar", 14..17),
                ]),
            },
            kind: ast::TypeRefKind::Unresolved,
        }),
        name: ast::Ident::new("bar", 18..21),
        number: ast::Int {
            negative: false,
            value: 2,
            span: 24..25,
        },
        options: vec![ast::OptionBody {
            name: vec![ast::OptionNamePart::Ident(ast::Ident::new("packed", 27..33))],
            value: ast::OptionValue::Bool(ast::Bool {
                value: true,
                span: 36..40,
            }),
        }],
        oneof_index: None,
        comments: ast::Comments::default(),
        span: 0..42,
    }));
    case!(parse_field("map<string, Foo> m = 1;", FieldContext::Message) => Some(ast::Field {
        label: FieldLabel::Singular,
        label_span: None,
        ty: ast::Ty::Map(Box::new(ast::MapTy {
            key: ast::ScalarTy::String,
            key_span: 4..10,
            value: ast::Ty::Named(ast::TypeRef {
                name: ast::TypeName {
                    leading_dot: None,
                    name: ast::FullIdent::from(ast::Ident::new("Foo", 12..15)),
                },
                kind: ast::TypeRefKind::Unresolved,
            }),
            span: 0..16,
        })),
        name: ast::Ident::new("m", 17..18),
        number: ast::Int {
            negative: false,
            value: 1,
            span: 21..22,
        },
        options: vec![],
        oneof_index: None,
        comments: ast::Comments::default(),
        span: 0..23,
    }));
    case!(parse_field("int32 string = 1;", FieldContext::Oneof(3)) => Some(ast::Field {
        label: FieldLabel::Singular,
        label_span: None,
        ty: ast::Ty::Scalar(ast::ScalarTy::Int32, 0..5),
        name: ast::Ident::new("string", 6..12),
        number: ast::Int {
            negative: false,
            value: 1,
            span: 15..16,
        },
        options: vec![],
        oneof_index: Some(3),
        comments: ast::Comments::default(),
        span: 0..17,
    }));
    case!(parse_field("map<float, int32> m = 1;", FieldContext::Message) => None, Err(vec![
        ParseErrorKind::InvalidMapFieldKeyType { span: 4..9 },
    ]));
    case!(parse_field("int32 a = 0;", FieldContext::Message) => Some(ast::Field {
        label: FieldLabel::Singular,
        label_span: None,
        ty: ast::Ty::Scalar(ast::ScalarTy::Int32, 0..5),
        name: ast::Ident::new("a", 6..7),
        number: ast::Int {
            negative: false,
            value: 0,
            span: 10..11,
        },
        options: vec![],
        oneof_index: None,
        comments: ast::Comments::default(),
        span: 0..12,
    }), Err(vec![ParseErrorKind::InvalidMessageNumber { span: 10..11 }]));
    case!(parse_field("int32 a = ;", FieldContext::Message) => Err(vec![ParseErrorKind::UnexpectedToken {
        expected: "a positive integer".to_owned(),
        found: ";".to_owned(),
        span: 10..11,
    }]));
    case!(parse_field("optional group Foo = 1 {}", FieldContext::Message) => Err(vec![
        ParseErrorKind::UnsupportedGroup { span: 9..14 },
    ]));
}

#[test]
pub fn parse_field_numbers() {
    assert_eq!(
        file("message Foo { int32 a = 19000; }").unwrap_err(),
        vec![ParseErrorKind::ReservedMessageNumber { span: 24..29 }]
    );
    assert_eq!(
        file("message Foo { int32 a = -1; }").unwrap_err(),
        vec![ParseErrorKind::InvalidMessageNumber { span: 24..26 }]
    );
    assert_eq!(
        file("message Foo { int32 a = 536870912; }").unwrap_err(),
        vec![ParseErrorKind::InvalidMessageNumber { span: 24..33 }]
    );
    assert!(file("message Foo { int32 a = 536870911; }").is_ok());
    assert!(file("message Foo { int32 a = 18999; int32 b = 20000; }").is_ok());
}

#[test]
pub fn parse_enum() {
    case!(parse_enum("enum Foo { A = 0; B = -1 [deprecated = true]; }") => ast::Enum {
        name: ast::Ident::new("Foo", 5..8),
        values: vec![
            ast::EnumValue {
                name: ast::Ident::new("A", 11..12),
                number: ast::Int {
                    negative: false,
                    value: 0,
                    span: 15..16,
                },
                options: vec![],
                comments: ast::Comments::default(),
                span: 11..17,
            },
            ast::EnumValue {
                name: ast::Ident::new("B", 18..19),
                number: ast::Int {
                    negative: true,
                    value: 1,
                    span: 22..24,
                },
                options: vec![ast::OptionBody {
                    name: vec![ast::OptionNamePart::Ident(ast::Ident::new("deprecated", 26..36))],
                    value: ast::OptionValue::Bool(ast::Bool {
                        value: true,
                        span: 39..43,
                    }),
                }],
                comments: ast::Comments::default(),
                span: 18..45,
            },
        ],
        options: vec![],
        reserved: vec![],
        allow_alias: false,
        comments: ast::Comments::default(),
        span: 0..47,
    });
    case!(parse_enum("enum Foo { A = 0 }") => Err(vec![ParseErrorKind::UnexpectedToken {
        expected: "';' or '['".to_owned(),
        found: "}".to_owned(),
        span: 17..18,
    }]));
}

#[test]
pub fn parse_enum_number_out_of_range() {
    assert_eq!(
        file("enum Foo { A = 0; B = 2147483648; }").unwrap_err(),
        vec![ParseErrorKind::InvalidEnumNumber { span: 22..32 }]
    );
    assert!(file("enum Foo { A = 0; B = -2147483648; }").is_ok());
}

#[test]
pub fn parse_reserved() {
    case!(parse_reserved("reserved 1, 5 to 10, 20 to max;", NumberKind::Message) => ast::Reserved {
        kind: ast::ReservedKind::Ranges(vec![
            ast::ReservedRange {
                start: ast::Int {
                    negative: false,
                    value: 1,
                    span: 9..10,
                },
                end: ast::ReservedRangeEnd::None,
            },
            ast::ReservedRange {
                start: ast::Int {
                    negative: false,
                    value: 5,
                    span: 12..13,
                },
                end: ast::ReservedRangeEnd::Int(ast::Int {
                    negative: false,
                    value: 10,
                    span: 17..19,
                }),
            },
            ast::ReservedRange {
                start: ast::Int {
                    negative: false,
                    value: 20,
                    span: 21..23,
                },
                end: ast::ReservedRangeEnd::Max(27..30),
            },
        ]),
        comments: ast::Comments::default(),
        span: 0..31,
    });
    case!(parse_reserved("reserved \"foo\", 'bar';", NumberKind::Message) => ast::Reserved {
        kind: ast::ReservedKind::Names(vec![
            ast::Ident::new("foo", 9..14),
            ast::Ident::new("bar", 16..21),
        ]),
        comments: ast::Comments::default(),
        span: 0..22,
    });
    case!(parse_reserved("reserved \"1foo\";", NumberKind::Message) => ast::Reserved {
        kind: ast::ReservedKind::Names(vec![ast::Ident::new("1foo", 9..15)]),
        comments: ast::Comments::default(),
        span: 0..16,
    }, Err(vec![ParseErrorKind::InvalidIdentifier { span: 9..15 }]));
    case!(parse_reserved("reserved 1, \"foo\";", NumberKind::Message) => Err(vec![ParseErrorKind::UnexpectedToken {
        expected: "a positive integer".to_owned(),
        found: "\"foo\"".to_owned(),
        span: 12..17,
    }]));
    case!(parse_reserved("reserved -5 to -1;", NumberKind::Enum) => ast::Reserved {
        kind: ast::ReservedKind::Ranges(vec![ast::ReservedRange {
            start: ast::Int {
                negative: true,
                value: 5,
                span: 9..11,
            },
            end: ast::ReservedRangeEnd::Int(ast::Int {
                negative: true,
                value: 1,
                span: 15..17,
            }),
        }]),
        comments: ast::Comments::default(),
        span: 0..18,
    });
}

#[test]
pub fn parse_service() {
    case!(parse_service("service Foo { rpc Bar(stream A) returns (.b.C) { option deprecated = true; }; }") => ast::Service {
        name: ast::Ident::new("Foo", 8..11),
        methods: vec![ast::Method {
            name: ast::Ident::new("Bar", 18..21),
            input_ty: ast::TypeName {
                leading_dot: None,
                name: ast::FullIdent::from(ast::Ident::new("A", 29..30)),
            },
            output_ty: ast::TypeName {
                leading_dot: Some(41..42),
                name: ast::FullIdent::from(vec![
                    ast::Ident::new("b", 42..43),
                    ast::Ident::new("C", 44..45),
                ]),
            },
            is_client_streaming: true,
            is_server_streaming: false,
            options: vec![ast::Option {
                body: ast::OptionBody {
                    name: vec![ast::OptionNamePart::Ident(ast::Ident::new("deprecated", 56..66))],
                    value: ast::OptionValue::Bool(ast::Bool {
                        value: true,
                        span: 69..73,
                    }),
                },
                comments: ast::Comments::default(),
                span: 49..74,
            }],
            comments: ast::Comments::default(),
            span: 14..76,
        }],
        options: vec![],
        comments: ast::Comments::default(),
        span: 0..79,
    });
    case!(parse_service("service Foo { rpc Bar(A) returns (B) }") => Err(vec![ParseErrorKind::UnexpectedToken {
        expected: "';' or '{'".to_owned(),
        found: "}".to_owned(),
        span: 37..38,
    }]));
}

#[test]
pub fn parse_import() {
    case!(parse_import("import weak \"foo.proto\";") => ast::Import {
        kind: Some(ast::ImportKind::Weak),
        value: ast::String {
            value: "foo.proto".to_owned(),
            span: 12..23,
        },
        comments: ast::Comments::default(),
        span: 0..24,
    });
    case!(parse_import("import \"\\xff\";") => Err(vec![ParseErrorKind::InvalidUtf8String {
        span: 7..13,
    }]));
    case!(parse_import("import foo;") => Err(vec![ParseErrorKind::UnexpectedToken {
        expected: "a string literal, 'public' or 'weak'".to_owned(),
        found: "foo".to_owned(),
        span: 7..10,
    }]));
}

#[test]
pub fn parse_syntax() {
    let ast = file("syntax = \"proto2\"; message Foo { required int32 a = 1; }").unwrap();
    assert_eq!(ast.syntax, ast::Syntax::Proto3);
    assert_eq!(ast.declared_syntax, Some(ast::Syntax::Proto2));
    let field = &ast.messages[0].fields[0];
    assert_eq!(field.label, FieldLabel::Singular);
    assert_eq!(field.label_span, Some(33..41));

    assert_eq!(
        file("syntax = \"proto3\"; message Foo { required int32 a = 1; }").unwrap_err(),
        vec![ParseErrorKind::Proto3RequiredField { span: 33..41 }]
    );
    assert_eq!(
        file("syntax = \"proto4\";").unwrap_err(),
        vec![ParseErrorKind::UnknownSyntax {
            syntax: "proto4".to_owned(),
            span: 9..17,
        }]
    );
    assert_eq!(
        file("syntax = \"proto3\"; message Foo { int32 a = 1 [default = 5]; }").unwrap_err(),
        vec![ParseErrorKind::Proto3DefaultValue { span: 46..53 }]
    );
}

#[test]
pub fn parse_empty_statements() {
    assert!(file("message Foo {};").is_ok());
    assert!(file("message Foo { enum Bar { A = 0; }; oneof o { int32 a = 1; }; };").is_ok());
    assert!(file("service Foo { rpc Bar(A) returns (B) {}; };").is_ok());
    assert_eq!(
        file(";").unwrap_err(),
        vec![ParseErrorKind::EmptyStatement { span: 0..1 }]
    );
    assert_eq!(
        file("message Foo { int32 a = 1;; }").unwrap_err(),
        vec![ParseErrorKind::EmptyStatement { span: 26..27 }]
    );
    assert_eq!(
        file("message Foo {};;").unwrap_err(),
        vec![ParseErrorKind::EmptyStatement { span: 15..16 }]
    );
}

#[test]
pub fn parse_comments() {
    let ast = file(
        "// detached

// leading
message Foo { // trailing
  /* field */
  int32 a = 1; // after field
}",
    )
    .unwrap();

    let message = &ast.messages[0];
    assert_eq!(
        message.comments,
        ast::Comments {
            leading_detached: vec![" detached\n".to_owned()],
            leading: Some(" leading\n".to_owned()),
            trailing: Some(" trailing\n".to_owned()),
        }
    );
    assert_eq!(
        message.fields[0].comments,
        ast::Comments {
            leading_detached: vec![],
            leading: Some(" field ".to_owned()),
            trailing: Some(" after field\n".to_owned()),
        }
    );
}

#[test]
pub fn parse_extend() {
    let ast = file("message Foo { extend Bar { optional int32 a = 1; } }").unwrap();
    let extend = &ast.messages[0].extends[0];
    assert_eq!(extend.parent, Some(ast::MessagePath(vec![0])));
    assert!(!extend.is_option_extension);
    assert_eq!(ast.extend_scope(extend).map(|m| m.name.value.as_str()), Some("Foo"));

    let ast = file("extend google.protobuf.FieldOptions { int32 a = 50000; }").unwrap();
    assert!(ast.extends[0].is_option_extension);
    assert_eq!(ast.extends[0].parent, None);

    assert_eq!(
        file("extend Foo { required int32 a = 1; }").unwrap_err(),
        vec![ParseErrorKind::RequiredExtendField { span: 13..21 }]
    );
}

#[test]
pub fn parse_duplicate_package() {
    assert_eq!(
        file("package a; package b;").unwrap_err(),
        vec![ParseErrorKind::DuplicatePackage {
            first: 0..10,
            second: 11..21,
        }]
    );
}

#[test]
pub fn parse_unexpected_top_level() {
    assert_eq!(
        file("int32 a = 1;").unwrap_err(),
        vec![ParseErrorKind::UnexpectedToken {
            expected:
                "'enum', 'extend', 'import', 'message', 'option', 'service', 'package' or ';'"
                    .to_owned(),
            found: "int32".to_owned(),
            span: 0..5,
        }]
    );
}

#[test]
pub fn nesting_limits() {
    let nested_messages = |depth: usize| {
        format!("{}{}", "message A { ".repeat(depth), "}".repeat(depth))
    };
    assert!(file(&nested_messages(32)).is_ok());
    assert_eq!(
        file(&nested_messages(20_000)).unwrap_err(),
        vec![ParseErrorKind::NestingTooDeep {
            kind: "message",
            max: 32,
            span: 384..391,
        }]
    );

    let nested_aggregates = |depth: usize| {
        format!(
            "option x = {}{{a: 1}}{};",
            "{a".repeat(depth - 1),
            "}".repeat(depth - 1)
        )
    };
    assert!(file(&nested_aggregates(100)).is_ok());
    assert_eq!(
        file(&nested_aggregates(5_000)).unwrap_err(),
        vec![ParseErrorKind::NestingTooDeep {
            kind: "option value",
            max: 100,
            span: 211..212,
        }]
    );
}
