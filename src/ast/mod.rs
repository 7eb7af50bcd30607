//! The syntax tree produced by [`parse`](crate::parse).
//!
//! Every declaration carries its byte [`Span`] in the source and the [`Comments`] attached to
//! it. Nodes own their children, with one exception: an [`Extend`] nested inside a message
//! refers back to that message by [`MessagePath`], which can be looked up with
//! [`File::message_at`].

mod print;
mod visit;

use std::{fmt, ops::Range};

use logos::Span;

pub(crate) use self::visit::Visitor;

/// A parsed protobuf source file.
#[derive(Clone, Debug, PartialEq)]
pub struct File {
    /// The language version of the tree. Legacy input is normalized, so this is always
    /// [`Syntax::Proto3`].
    pub syntax: Syntax,
    /// The version named in the file's `syntax` statement, if it has one.
    pub declared_syntax: std::option::Option<Syntax>,
    pub package: std::option::Option<Package>,
    pub imports: Vec<Import>,
    pub options: Vec<Option>,
    pub messages: Vec<Message>,
    pub enums: Vec<Enum>,
    pub services: Vec<Service>,
    pub extends: Vec<Extend>,
}

/// Comments attached to a declaration.
#[derive(Clone, Default, Debug, PartialEq)]
pub struct Comments {
    /// Comment blocks above the declaration which are separated from it by a blank line.
    pub leading_detached: Vec<std::string::String>,
    /// The comment block directly above the declaration.
    pub leading: std::option::Option<std::string::String>,
    /// A comment following the declaration on the same line.
    pub trailing: std::option::Option<std::string::String>,
}

/// The version of the protobuf language.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Syntax {
    Proto2,
    Proto3,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Ident {
    pub value: std::string::String,
    pub span: Span,
}

/// A dot-separated sequence of identifiers, such as a package name.
#[derive(Clone, Debug, PartialEq)]
pub struct FullIdent {
    pub parts: Vec<Ident>,
}

/// A reference to a type by name, optionally fully qualified with a leading dot.
#[derive(Clone, Debug, PartialEq)]
pub struct TypeName {
    pub leading_dot: std::option::Option<Span>,
    pub name: FullIdent,
}

/// An integer literal, with an optional preceding minus sign.
#[derive(Clone, Debug, PartialEq)]
pub struct Int {
    pub negative: bool,
    pub value: u64,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Float {
    pub value: f64,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Bool {
    pub value: bool,
    pub span: Span,
}

/// A string literal which is required to be valid UTF-8.
#[derive(Clone, Debug, PartialEq)]
pub struct String {
    pub value: std::string::String,
    pub span: Span,
}

/// A string literal which may contain arbitrary bytes.
#[derive(Clone, Debug, PartialEq)]
pub struct Bytes {
    pub value: Vec<u8>,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Import {
    pub kind: std::option::Option<ImportKind>,
    pub value: String,
    pub comments: Comments,
    pub span: Span,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ImportKind {
    Weak,
    Public,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Package {
    pub name: FullIdent,
    pub comments: Comments,
    pub span: Span,
}

/// An `option` statement.
#[derive(Clone, Debug, PartialEq)]
pub struct Option {
    pub body: OptionBody,
    pub comments: Comments,
    pub span: Span,
}

/// The name and value of an option, shared by `option` statements and `[...]` option lists.
#[derive(Clone, Debug, PartialEq)]
pub struct OptionBody {
    pub name: Vec<OptionNamePart>,
    pub value: OptionValue,
}

#[derive(Clone, Debug, PartialEq)]
pub enum OptionNamePart {
    /// A plain identifier, such as `deprecated`.
    Ident(Ident),
    /// A parenthesized custom option name, such as `(my.option)`.
    Extension(TypeName, Span),
}

#[derive(Clone, Debug, PartialEq)]
pub enum OptionValue {
    Ident(Ident),
    Int(Int),
    Float(Float),
    String(Bytes),
    Bool(Bool),
    /// A list of values, only allowed inside an aggregate value.
    Array(Array),
    /// A text-format message value, such as `{ foo: 1 bar: "baz" }`.
    Aggregate(Aggregate),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Array {
    pub values: Vec<OptionValue>,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Aggregate {
    pub fields: Vec<AggregateField>,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AggregateField {
    pub name: AggregateFieldName,
    pub value: OptionValue,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub enum AggregateFieldName {
    Ident(Ident),
    /// An extension field name, such as `[my.ext]`.
    Extension(TypeName, Span),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Message {
    pub name: Ident,
    /// Fields declared directly in the message body. Oneof members are owned by their [`Oneof`].
    pub fields: Vec<Field>,
    pub oneofs: Vec<Oneof>,
    pub messages: Vec<Message>,
    pub enums: Vec<Enum>,
    pub extends: Vec<Extend>,
    pub extensions: Vec<Extensions>,
    pub options: Vec<Option>,
    pub reserved: Vec<Reserved>,
    pub comments: Comments,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    pub label: FieldLabel,
    /// The location of an explicit label keyword, if one was written.
    pub label_span: std::option::Option<Span>,
    pub ty: Ty,
    pub name: Ident,
    pub number: Int,
    pub options: Vec<OptionBody>,
    /// The index of the enclosing oneof in [`Message::oneofs`], for oneof members.
    pub oneof_index: std::option::Option<usize>,
    pub comments: Comments,
    pub span: Span,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FieldLabel {
    Singular,
    Optional,
    Repeated,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Ty {
    Scalar(ScalarTy, Span),
    Named(TypeRef),
    Map(Box<MapTy>),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ScalarTy {
    Double,
    Float,
    Int32,
    Int64,
    Uint32,
    Uint64,
    Sint32,
    Sint64,
    Fixed32,
    Fixed64,
    Sfixed32,
    Sfixed64,
    Bool,
    String,
    Bytes,
}

/// A field type given by name.
///
/// The parser cannot tell whether a name refers to a message or an enum, so named types start
/// out as [`TypeRefKind::Unresolved`] and are classified by the scope resolver.
#[derive(Clone, Debug, PartialEq)]
pub struct TypeRef {
    pub name: TypeName,
    pub kind: TypeRefKind,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TypeRefKind {
    Unresolved,
    Message,
    Enum,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MapTy {
    pub key: ScalarTy,
    pub key_span: Span,
    pub value: Ty,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Oneof {
    pub name: Ident,
    pub fields: Vec<Field>,
    pub options: Vec<Option>,
    pub comments: Comments,
    pub span: Span,
}

/// An `extend` block.
#[derive(Clone, Debug, PartialEq)]
pub struct Extend {
    pub extendee: TypeName,
    pub fields: Vec<Field>,
    pub options: Vec<Option>,
    /// The message this block is declared in, if it is not at the top level of the file.
    pub parent: std::option::Option<MessagePath>,
    /// Whether the extendee is one of the `google.protobuf.*Options` messages.
    pub is_option_extension: bool,
    pub comments: Comments,
    pub span: Span,
}

/// The location of a message in the tree, as indices into [`File::messages`] followed by
/// [`Message::messages`] at each level of nesting.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct MessagePath(pub Vec<usize>);

#[derive(Clone, Debug, PartialEq)]
pub struct Reserved {
    pub kind: ReservedKind,
    pub comments: Comments,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ReservedKind {
    Ranges(Vec<ReservedRange>),
    Names(Vec<Ident>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct ReservedRange {
    pub start: Int,
    pub end: ReservedRangeEnd,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ReservedRangeEnd {
    None,
    Int(Int),
    Max(Span),
}

/// A legacy `extensions` declaration in a message.
#[derive(Clone, Debug, PartialEq)]
pub struct Extensions {
    pub ranges: Vec<ReservedRange>,
    pub options: Vec<OptionBody>,
    pub comments: Comments,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Enum {
    pub name: Ident,
    pub values: Vec<EnumValue>,
    pub options: Vec<Option>,
    pub reserved: Vec<Reserved>,
    /// Set by `option allow_alias = true;`.
    pub allow_alias: bool,
    pub comments: Comments,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct EnumValue {
    pub name: Ident,
    pub number: Int,
    pub options: Vec<OptionBody>,
    pub comments: Comments,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Service {
    pub name: Ident,
    pub methods: Vec<Method>,
    pub options: Vec<Option>,
    pub comments: Comments,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Method {
    pub name: Ident,
    pub input_ty: TypeName,
    pub output_ty: TypeName,
    pub is_client_streaming: bool,
    pub is_server_streaming: bool,
    pub options: Vec<Option>,
    pub comments: Comments,
    pub span: Span,
}

impl Default for File {
    fn default() -> Self {
        File {
            syntax: Syntax::Proto3,
            declared_syntax: None,
            package: None,
            imports: vec![],
            options: vec![],
            messages: vec![],
            enums: vec![],
            services: vec![],
            extends: vec![],
        }
    }
}

impl File {
    /// Gets the message at `path`, or `None` if the path does not name a message in this file.
    pub fn message_at(&self, path: &MessagePath) -> std::option::Option<&Message> {
        let (first, rest) = path.0.split_first()?;
        let mut message = self.messages.get(*first)?;
        for &index in rest {
            message = message.messages.get(index)?;
        }
        Some(message)
    }

    /// Gets the message an `extend` block is declared in, if it is nested.
    pub fn extend_scope(&self, extend: &Extend) -> std::option::Option<&Message> {
        self.message_at(extend.parent.as_ref()?)
    }

    /// Gets the package name, or an empty string if the file has no package.
    pub fn package_name(&self) -> std::string::String {
        match &self.package {
            Some(package) => package.name.to_string(),
            None => std::string::String::new(),
        }
    }
}

impl Message {
    /// Iterates over all fields of the message, including oneof members, in declaration order
    /// of the fields and then of each oneof.
    pub fn all_fields(&self) -> impl Iterator<Item = &Field> {
        self.fields
            .iter()
            .chain(self.oneofs.iter().flat_map(|oneof| oneof.fields.iter()))
    }

    pub(crate) fn all_fields_mut(&mut self) -> impl Iterator<Item = &mut Field> {
        self.fields
            .iter_mut()
            .chain(self.oneofs.iter_mut().flat_map(|oneof| oneof.fields.iter_mut()))
    }
}

impl Ident {
    pub fn new(value: impl Into<std::string::String>, span: Range<usize>) -> Self {
        Ident {
            span,
            value: value.into(),
        }
    }
}

impl FullIdent {
    pub fn span(&self) -> Span {
        let start = self.parts.first().map_or(0, |part| part.span.start);
        let end = self.parts.last().map_or(0, |part| part.span.end);
        start..end
    }
}

impl From<Ident> for FullIdent {
    fn from(value: Ident) -> Self {
        FullIdent { parts: vec![value] }
    }
}

impl From<Vec<Ident>> for FullIdent {
    fn from(parts: Vec<Ident>) -> Self {
        debug_assert!(!parts.is_empty());
        FullIdent { parts }
    }
}

impl TypeName {
    pub fn span(&self) -> Span {
        match &self.leading_dot {
            Some(dot) => dot.start..self.name.span().end,
            None => self.name.span(),
        }
    }

    /// Returns true if the name has more than one component or a leading dot.
    pub fn is_qualified(&self) -> bool {
        self.leading_dot.is_some() || self.name.parts.len() > 1
    }
}

impl Ty {
    pub fn span(&self) -> Span {
        match self {
            Ty::Scalar(_, span) => span.clone(),
            Ty::Named(ty) => ty.name.span(),
            Ty::Map(map) => map.span.clone(),
        }
    }
}

impl ScalarTy {
    pub fn from_name(name: &str) -> std::option::Option<Self> {
        match name {
            "double" => Some(ScalarTy::Double),
            "float" => Some(ScalarTy::Float),
            "int32" => Some(ScalarTy::Int32),
            "int64" => Some(ScalarTy::Int64),
            "uint32" => Some(ScalarTy::Uint32),
            "uint64" => Some(ScalarTy::Uint64),
            "sint32" => Some(ScalarTy::Sint32),
            "sint64" => Some(ScalarTy::Sint64),
            "fixed32" => Some(ScalarTy::Fixed32),
            "fixed64" => Some(ScalarTy::Fixed64),
            "sfixed32" => Some(ScalarTy::Sfixed32),
            "sfixed64" => Some(ScalarTy::Sfixed64),
            "bool" => Some(ScalarTy::Bool),
            "string" => Some(ScalarTy::String),
            "bytes" => Some(ScalarTy::Bytes),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScalarTy::Double => "double",
            ScalarTy::Float => "float",
            ScalarTy::Int32 => "int32",
            ScalarTy::Int64 => "int64",
            ScalarTy::Uint32 => "uint32",
            ScalarTy::Uint64 => "uint64",
            ScalarTy::Sint32 => "sint32",
            ScalarTy::Sint64 => "sint64",
            ScalarTy::Fixed32 => "fixed32",
            ScalarTy::Fixed64 => "fixed64",
            ScalarTy::Sfixed32 => "sfixed32",
            ScalarTy::Sfixed64 => "sfixed64",
            ScalarTy::Bool => "bool",
            ScalarTy::String => "string",
            ScalarTy::Bytes => "bytes",
        }
    }

    /// Returns true if this type may be used as the key of a map field.
    pub fn is_valid_map_key(&self) -> bool {
        !matches!(self, ScalarTy::Double | ScalarTy::Float | ScalarTy::Bytes)
    }
}

impl ReservedRange {
    pub fn span(&self) -> Span {
        match &self.end {
            ReservedRangeEnd::None => self.start.span.clone(),
            ReservedRangeEnd::Int(end) => self.start.span.start..end.span.end,
            ReservedRangeEnd::Max(end) => self.start.span.start..end.end,
        }
    }
}

impl Int {
    /// Gets the value as an `i64`, or `None` if it does not fit.
    pub fn as_i64(&self) -> std::option::Option<i64> {
        if self.negative {
            if self.value <= i64::MAX as u64 + 1 {
                Some((self.value as i64).wrapping_neg())
            } else {
                None
            }
        } else {
            i64::try_from(self.value).ok()
        }
    }

    /// Gets the value as an `i32`, or `None` if it does not fit.
    pub fn as_i32(&self) -> std::option::Option<i32> {
        self.as_i64().and_then(|value| i32::try_from(value).ok())
    }
}

impl OptionBody {
    /// Returns true if the name of this option is the single identifier `name`.
    pub fn is(&self, name: &str) -> bool {
        matches!(self.name.as_slice(), [OptionNamePart::Ident(ident)] if ident.value == name)
    }

    pub fn name_span(&self) -> Span {
        let start = match self.name.first() {
            Some(OptionNamePart::Ident(ident)) => ident.span.start,
            Some(OptionNamePart::Extension(_, span)) => span.start,
            None => 0,
        };
        let end = match self.name.last() {
            Some(OptionNamePart::Ident(ident)) => ident.span.end,
            Some(OptionNamePart::Extension(_, span)) => span.end,
            None => 0,
        };
        start..end
    }
}

impl OptionValue {
    pub fn span(&self) -> Span {
        match self {
            OptionValue::Ident(ident) => ident.span.clone(),
            OptionValue::Int(int) => int.span.clone(),
            OptionValue::Float(float) => float.span.clone(),
            OptionValue::String(string) => string.span.clone(),
            OptionValue::Bool(value) => value.span.clone(),
            OptionValue::Array(array) => array.span.clone(),
            OptionValue::Aggregate(aggregate) => aggregate.span.clone(),
        }
    }
}

pub(crate) fn make_name(namespace: &str, name: impl fmt::Display) -> std::string::String {
    if namespace.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", namespace, name)
    }
}

impl fmt::Display for Syntax {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Syntax::Proto2 => write!(f, "proto2"),
            Syntax::Proto3 => write!(f, "proto3"),
        }
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl fmt::Display for FullIdent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some((first, rest)) = self.parts.split_first() {
            write!(f, "{}", first)?;
            for part in rest {
                write!(f, ".{}", part)?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.leading_dot.is_some() {
            write!(f, ".")?;
        }
        write!(f, "{}", self.name)
    }
}

impl fmt::Display for ScalarTy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for FieldLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldLabel::Singular => Ok(()),
            FieldLabel::Optional => write!(f, "optional"),
            FieldLabel::Repeated => write!(f, "repeated"),
        }
    }
}

impl fmt::Display for ImportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportKind::Weak => write!(f, "weak"),
            ImportKind::Public => write!(f, "public"),
        }
    }
}
