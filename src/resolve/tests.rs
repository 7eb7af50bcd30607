use super::*;
use crate::{ast::Ty, ParseOptions};

fn kind(ty: &Ty) -> TypeRefKind {
    match ty {
        Ty::Named(ty) => ty.kind,
        Ty::Map(map) => kind(&map.value),
        Ty::Scalar(..) => panic!("expected a named type"),
    }
}

fn field_kinds(message: &ast::Message) -> Vec<(&str, TypeRefKind)> {
    message
        .all_fields()
        .map(|field| (field.name.value.as_str(), kind(&field.ty)))
        .collect()
}

#[test]
fn enclosing_scopes() {
    let file = crate::parse(
        "message Outer {
            enum Kind { A = 0; }
            message Inner { Kind kind = 1; }
            Kind kind = 1;
            Inner inner = 2;
        }",
    )
    .unwrap();

    let outer = &file.messages[0];
    assert_eq!(
        field_kinds(outer),
        vec![("kind", TypeRefKind::Enum), ("inner", TypeRefKind::Message)]
    );
    assert_eq!(
        field_kinds(&outer.messages[0]),
        vec![("kind", TypeRefKind::Enum)]
    );
}

#[test]
fn nearer_message_does_not_hide_enum() {
    let file = crate::parse(
        "message Outer {
            enum Kind { A = 0; }
            message Inner {
                message Kind {}
                Kind kind = 1;
            }
        }",
    )
    .unwrap();

    assert_eq!(
        field_kinds(&file.messages[0].messages[0]),
        vec![("kind", TypeRefKind::Enum)]
    );
}

#[test]
fn sibling_enums_are_not_visible() {
    let file = crate::parse(
        "message A { enum E { X = 0; } }
        message B { E e = 1; }",
    )
    .unwrap();

    assert_eq!(
        field_kinds(&file.messages[1]),
        vec![("e", TypeRefKind::Message)]
    );
}

#[test]
fn file_level_enums() {
    let file = crate::parse(
        "enum Top { X = 0; }
        message M { message N { Top t = 1; } Top t = 1; }",
    )
    .unwrap();

    assert_eq!(
        field_kinds(&file.messages[0]),
        vec![("t", TypeRefKind::Enum)]
    );
    assert_eq!(
        field_kinds(&file.messages[0].messages[0]),
        vec![("t", TypeRefKind::Enum)]
    );
}

#[test]
fn qualified_names() {
    let file = crate::parse(
        "package foo.bar;
        message A { enum E { X = 0; } }
        message B {
            A.E a = 1;
            foo.bar.A.E b = 2;
            .foo.bar.A.E c = 3;
            A d = 4;
            other.E e = 5;
        }",
    )
    .unwrap();

    assert_eq!(
        field_kinds(&file.messages[1]),
        vec![
            ("a", TypeRefKind::Enum),
            ("b", TypeRefKind::Enum),
            ("c", TypeRefKind::Enum),
            ("d", TypeRefKind::Message),
            ("e", TypeRefKind::Message),
        ]
    );
}

#[test]
fn qualified_names_from_nested_message() {
    let file = crate::parse(
        "message A { message B { enum E { X = 0; } } }
        message C { B.E e = 1; }",
    )
    .unwrap();

    assert_eq!(
        field_kinds(&file.messages[1]),
        vec![("e", TypeRefKind::Enum)]
    );
}

#[test]
fn map_values_and_oneofs() {
    let file = crate::parse(
        "enum E { X = 0; }
        message M {
            map<string, E> a = 1;
            map<int32, M> b = 2;
            oneof o { E c = 3; M d = 4; }
        }",
    )
    .unwrap();

    assert_eq!(
        field_kinds(&file.messages[0]),
        vec![
            ("a", TypeRefKind::Enum),
            ("b", TypeRefKind::Message),
            ("c", TypeRefKind::Enum),
            ("d", TypeRefKind::Message),
        ]
    );
}

#[test]
fn extend_fields() {
    let file = crate::parse(
        "enum Top { X = 0; }
        extend Foo { optional Top a = 1; }
        message M {
            enum Inner { Y = 0; }
            extend Foo { optional Inner b = 2; optional Bar c = 3; }
        }",
    )
    .unwrap();

    assert_eq!(kind(&file.extends[0].fields[0].ty), TypeRefKind::Enum);
    let nested = &file.messages[0].extends[0];
    assert_eq!(kind(&nested.fields[0].ty), TypeRefKind::Enum);
    assert_eq!(kind(&nested.fields[1].ty), TypeRefKind::Message);
}

#[test]
fn resolution_can_be_disabled() {
    let source = "enum E { X = 0; } message M { E e = 1; M m = 2; }";
    let file = ParseOptions::new()
        .resolve_types(false)
        .parse(source)
        .unwrap();

    assert_eq!(
        field_kinds(&file.messages[0]),
        vec![
            ("e", TypeRefKind::Unresolved),
            ("m", TypeRefKind::Unresolved),
        ]
    );

    let resolved = resolve(file);
    assert_eq!(
        field_kinds(&resolved.messages[0]),
        vec![("e", TypeRefKind::Enum), ("m", TypeRefKind::Message)]
    );
    similar_asserts::assert_eq!(resolve(resolved.clone()), resolved);
}
