//! Structural rules which are checked as soon as a declaration has been parsed.
//!
//! Each function inspects a single node and appends any problems it finds to the parser's error
//! list, so that a malformed declaration does not stop the rest of the file from being checked.


use std::collections::{hash_map, HashMap};

use logos::Span;

use crate::{
    ast, case,
    error::ParseErrorKind,
    names::{self, Definition},
    MAX_MESSAGE_FIELD_NUMBER,
};

/// The messages which may be extended to declare custom options.
const OPTION_EXTENDEES: &[&str] = &[
    "google.protobuf.FileOptions",
    "google.protobuf.MessageOptions",
    "google.protobuf.FieldOptions",
    "google.protobuf.OneofOptions",
    "google.protobuf.EnumOptions",
    "google.protobuf.EnumValueOptions",
    "google.protobuf.ServiceOptions",
    "google.protobuf.MethodOptions",
    "google.protobuf.ExtensionRangeOptions",
];

pub(crate) fn is_option_extendee(name: &ast::TypeName) -> bool {
    let name = name.name.to_string();
    OPTION_EXTENDEES.contains(&name.as_str())
}

pub(crate) fn check_file(file: &ast::File, errors: &mut Vec<ParseErrorKind>) {
    let mut imports: HashMap<&str, Span> = HashMap::new();
    for import in &file.imports {
        let path = import.value.value.as_str();
        if !is_valid_import(path) {
            errors.push(ParseErrorKind::InvalidImport {
                span: import.value.span.clone(),
            });
        }

        match imports.entry(path) {
            hash_map::Entry::Vacant(entry) => {
                entry.insert(import.span.clone());
            }
            hash_map::Entry::Occupied(entry) => errors.push(ParseErrorKind::DuplicateImport {
                path: path.to_owned(),
                first: entry.get().clone(),
                second: import.span.clone(),
            }),
        }
    }

    if let Some(package) = &file.package {
        for part in &package.name.parts {
            if !case::is_valid_ident(&part.value) {
                errors.push(ParseErrorKind::InvalidPackageName {
                    name: package.name.to_string(),
                    span: part.span.clone(),
                });
            }
        }
    }

    let mut seen: HashMap<&str, &Definition> = HashMap::new();
    let definitions = file.definitions();
    for definition in &definitions {
        match seen.entry(definition.full_name.as_str()) {
            hash_map::Entry::Vacant(entry) => {
                entry.insert(definition);
            }
            hash_map::Entry::Occupied(entry) => {
                if names::conflicts(entry.get(), definition) {
                    errors.push(ParseErrorKind::DuplicateName {
                        name: definition.full_name.clone(),
                        first: entry.get().span.clone(),
                        second: definition.span.clone(),
                    });
                }
            }
        }
    }
}

fn is_valid_import(path: &str) -> bool {
    !path.is_empty()
        && !path.contains('\\')
        && path
            .split('/')
            .all(|part| !part.is_empty() && part != "." && part != "..")
}

pub(crate) fn check_message(message: &ast::Message, errors: &mut Vec<ParseErrorKind>) {
    check_type_name("message", &message.name, errors);

    let mut nested: HashMap<&str, Span> = HashMap::new();
    let nested_names = message
        .messages
        .iter()
        .map(|message| &message.name)
        .chain(message.enums.iter().map(|enu| &enu.name));
    for name in nested_names {
        check_duplicate_name(&mut nested, name, errors);
    }

    let mut names: HashMap<&str, (Span, Option<usize>)> = HashMap::new();
    let mut numbers: HashMap<i32, (Span, Option<usize>)> = HashMap::new();
    let mut fields: Vec<&ast::Field> = message.all_fields().collect();
    fields.sort_by_key(|field| field.span.start);
    for &field in &fields {
        match names.entry(field.name.value.as_str()) {
            hash_map::Entry::Vacant(entry) => {
                entry.insert((field.name.span.clone(), field.oneof_index));
            }
            hash_map::Entry::Occupied(entry) => {
                let (first, oneof_index) = entry.get();
                if !in_same_oneof(*oneof_index, field.oneof_index) {
                    errors.push(ParseErrorKind::DuplicateName {
                        name: field.name.value.clone(),
                        first: first.clone(),
                        second: field.name.span.clone(),
                    });
                }
            }
        }

        if let Some(number) = field.number.as_i32() {
            match numbers.entry(number) {
                hash_map::Entry::Vacant(entry) => {
                    entry.insert((field.number.span.clone(), field.oneof_index));
                }
                hash_map::Entry::Occupied(entry) => {
                    let (first, oneof_index) = entry.get();
                    if !in_same_oneof(*oneof_index, field.oneof_index) {
                        errors.push(ParseErrorKind::DuplicateFieldNumber {
                            number,
                            first: first.clone(),
                            second: field.number.span.clone(),
                        });
                    }
                }
            }
        }

        if let (ast::Ty::Map(_), Some(label_span)) = (&field.ty, &field.label_span) {
            if field.oneof_index.is_none() {
                errors.push(ParseErrorKind::MapFieldWithLabel {
                    span: label_span.clone(),
                });
            }
        }
    }

    for oneof in &message.oneofs {
        if let Some((first, _)) = names.get(oneof.name.value.as_str()) {
            errors.push(ParseErrorKind::DuplicateName {
                name: oneof.name.value.clone(),
                first: first.clone(),
                second: oneof.name.span.clone(),
            });
        }
    }

    let ranges = check_reserved_ranges(
        &reserved_ranges(&message.reserved),
        RangeBounds::Message,
        errors,
    );
    let extension_ranges: Vec<_> = message
        .extensions
        .iter()
        .flat_map(|extensions| {
            extensions
                .ranges
                .iter()
                .map(move |range| (range, &extensions.span))
        })
        .collect();
    check_reserved_ranges(&extension_ranges, RangeBounds::Message, errors);

    for field in fields {
        if let Some(number) = field.number.as_i32() {
            if let Some(reserved) = find_reserved_number(&ranges, number) {
                errors.push(ParseErrorKind::ReservedNumberUsed {
                    number,
                    span: field.number.span.clone(),
                    reserved,
                });
            }
        }
        if let Some(reserved) = find_reserved_name(&message.reserved, &field.name.value) {
            errors.push(ParseErrorKind::ReservedNameUsed {
                name: field.name.value.clone(),
                span: field.name.span.clone(),
                reserved,
            });
        }
    }
}

fn reserved_ranges(reserved: &[ast::Reserved]) -> Vec<(&ast::ReservedRange, &Span)> {
    reserved
        .iter()
        .flat_map(|reserved| match &reserved.kind {
            ast::ReservedKind::Ranges(ranges) => ranges
                .iter()
                .map(|range| (range, &reserved.span))
                .collect::<Vec<_>>(),
            ast::ReservedKind::Names(_) => vec![],
        })
        .collect()
}

pub(crate) fn check_oneof(oneof: &ast::Oneof, errors: &mut Vec<ParseErrorKind>) {
    if oneof.fields.is_empty() {
        errors.push(ParseErrorKind::EmptyOneof {
            span: oneof.name.span.clone(),
        });
    }

    let mut names: HashMap<&str, Span> = HashMap::new();
    let mut numbers: HashMap<i32, Span> = HashMap::new();
    for field in &oneof.fields {
        if let Some(label_span) = &field.label_span {
            errors.push(ParseErrorKind::OneofFieldWithLabel {
                span: label_span.clone(),
            });
        }
        if let ast::Ty::Map(map) = &field.ty {
            errors.push(ParseErrorKind::InvalidOneofFieldKind {
                kind: "map",
                span: map.span.clone(),
            });
        }

        check_duplicate_name(&mut names, &field.name, errors);

        if let Some(number) = field.number.as_i32() {
            match numbers.entry(number) {
                hash_map::Entry::Vacant(entry) => {
                    entry.insert(field.number.span.clone());
                }
                hash_map::Entry::Occupied(entry) => {
                    errors.push(ParseErrorKind::DuplicateFieldNumber {
                        number,
                        first: entry.get().clone(),
                        second: field.number.span.clone(),
                    })
                }
            }
        }
    }
}

pub(crate) fn check_enum(enu: &ast::Enum, errors: &mut Vec<ParseErrorKind>) {
    check_type_name("enum", &enu.name, errors);

    match enu.values.first() {
        None => errors.push(ParseErrorKind::EmptyEnum {
            span: enu.name.span.clone(),
        }),
        Some(first) if first.number.as_i32() != Some(0) => {
            errors.push(ParseErrorKind::InvalidFirstEnumValue {
                span: first.number.span.clone(),
            })
        }
        Some(_) => (),
    }

    let mut names: HashMap<&str, Span> = HashMap::new();
    let mut numbers: HashMap<i32, Span> = HashMap::new();
    for value in &enu.values {
        check_type_name("enum value", &value.name, errors);
        check_duplicate_name(&mut names, &value.name, errors);

        if let Some(number) = value.number.as_i32() {
            match numbers.entry(number) {
                hash_map::Entry::Vacant(entry) => {
                    entry.insert(value.number.span.clone());
                }
                hash_map::Entry::Occupied(entry) => {
                    if !enu.allow_alias {
                        errors.push(ParseErrorKind::DuplicateEnumNumber {
                            number,
                            first: entry.get().clone(),
                            second: value.number.span.clone(),
                        })
                    }
                }
            }
        }
    }

    let ranges = check_reserved_ranges(
        &reserved_ranges(&enu.reserved),
        RangeBounds::Enum,
        errors,
    );

    for value in &enu.values {
        if let Some(number) = value.number.as_i32() {
            if let Some(reserved) = find_reserved_number(&ranges, number) {
                errors.push(ParseErrorKind::ReservedNumberUsed {
                    number,
                    span: value.number.span.clone(),
                    reserved,
                });
            }
        }
        if let Some(reserved) = find_reserved_name(&enu.reserved, &value.name.value) {
            errors.push(ParseErrorKind::ReservedNameUsed {
                name: value.name.value.clone(),
                span: value.name.span.clone(),
                reserved,
            });
        }
    }
}

pub(crate) fn check_service(service: &ast::Service, errors: &mut Vec<ParseErrorKind>) {
    check_type_name("service", &service.name, errors);

    let mut names: HashMap<&str, Span> = HashMap::new();
    for method in &service.methods {
        check_type_name("method", &method.name, errors);
        check_duplicate_name(&mut names, &method.name, errors);

        for ty in [&method.input_ty, &method.output_ty] {
            if !is_valid_method_type(ty) {
                errors.push(ParseErrorKind::InvalidMethodType {
                    name: ty.to_string(),
                    span: ty.span(),
                });
            }
        }
    }
}

fn is_valid_method_type(ty: &ast::TypeName) -> bool {
    match ty.name.parts.split_last() {
        Some((last, rest)) => {
            case::is_valid_type_name(&last.value)
                && rest.iter().all(|part| case::is_valid_ident(&part.value))
        }
        None => false,
    }
}

pub(crate) fn check_extend(
    extend: &ast::Extend,
    syntax: Option<ast::Syntax>,
    errors: &mut Vec<ParseErrorKind>,
) {
    if syntax == Some(ast::Syntax::Proto3) && !extend.is_option_extension {
        errors.push(ParseErrorKind::InvalidExtendee {
            name: extend.extendee.to_string(),
            span: extend.extendee.span(),
        });
    }

    for field in &extend.fields {
        if let ast::Ty::Map(map) = &field.ty {
            errors.push(ParseErrorKind::InvalidExtendFieldKind {
                kind: "map",
                span: map.span.clone(),
            });
        }
    }
}

fn check_type_name(kind: &'static str, name: &ast::Ident, errors: &mut Vec<ParseErrorKind>) {
    if !case::is_valid_type_name(&name.value) {
        errors.push(ParseErrorKind::InvalidTypeName {
            kind,
            name: name.value.clone(),
            span: name.span.clone(),
        });
    }
}

fn check_duplicate_name<'a>(
    names: &mut HashMap<&'a str, Span>,
    name: &'a ast::Ident,
    errors: &mut Vec<ParseErrorKind>,
) {
    match names.entry(name.value.as_str()) {
        hash_map::Entry::Vacant(entry) => {
            entry.insert(name.span.clone());
        }
        hash_map::Entry::Occupied(entry) => errors.push(ParseErrorKind::DuplicateName {
            name: name.value.clone(),
            first: entry.get().clone(),
            second: name.span.clone(),
        }),
    }
}

fn in_same_oneof(first: Option<usize>, second: Option<usize>) -> bool {
    first.is_some() && first == second
}

#[derive(Debug, Copy, Clone)]
enum RangeBounds {
    Message,
    Enum,
}

impl RangeBounds {
    fn min(self) -> i64 {
        match self {
            RangeBounds::Message => 1,
            RangeBounds::Enum => i32::MIN.into(),
        }
    }

    fn max(self) -> i64 {
        match self {
            RangeBounds::Message => MAX_MESSAGE_FIELD_NUMBER.into(),
            RangeBounds::Enum => i32::MAX.into(),
        }
    }
}

/// Checks each range is in order and within bounds, returning the valid ones as inclusive
/// `(start, end, span)` triples.
fn check_reserved_ranges(
    ranges: &[(&ast::ReservedRange, &Span)],
    bounds: RangeBounds,
    errors: &mut Vec<ParseErrorKind>,
) -> Vec<(i64, i64, Span)> {
    let mut result = Vec::with_capacity(ranges.len());
    for &(range, declaration_span) in ranges {
        let start = match range.start.as_i64() {
            Some(start) => start,
            None => {
                errors.push(out_of_bounds(bounds, range.start.span.clone()));
                continue;
            }
        };
        let end = match &range.end {
            ast::ReservedRangeEnd::None => start,
            ast::ReservedRangeEnd::Int(end) => match end.as_i64() {
                Some(end) => end,
                None => {
                    errors.push(out_of_bounds(bounds, end.span.clone()));
                    continue;
                }
            },
            ast::ReservedRangeEnd::Max(_) => bounds.max(),
        };

        if start > end {
            errors.push(ParseErrorKind::InvalidReservedRange {
                start,
                end,
                span: declaration_span.clone(),
            });
            continue;
        }
        if start < bounds.min() || end > bounds.max() {
            errors.push(out_of_bounds(bounds, range.span()));
            continue;
        }

        result.push((start, end, range.span()));
    }
    result
}

fn out_of_bounds(bounds: RangeBounds, span: Span) -> ParseErrorKind {
    match bounds {
        RangeBounds::Message => ParseErrorKind::InvalidMessageNumber { span },
        RangeBounds::Enum => ParseErrorKind::InvalidEnumNumber { span },
    }
}

fn find_reserved_number(ranges: &[(i64, i64, Span)], number: i32) -> Option<Span> {
    let number = i64::from(number);
    ranges
        .iter()
        .find(|(start, end, _)| (*start..=*end).contains(&number))
        .map(|(_, _, span)| span.clone())
}

fn find_reserved_name(reserved: &[ast::Reserved], name: &str) -> Option<Span> {
    reserved.iter().find_map(|reserved| match &reserved.kind {
        ast::ReservedKind::Names(names) => names
            .iter()
            .find(|reserved| reserved.value == name)
            .map(|reserved| reserved.span.clone()),
        ast::ReservedKind::Ranges(_) => None,
    })
}
