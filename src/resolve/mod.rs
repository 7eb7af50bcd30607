//! Classifies named field types as message or enum references.

#[cfg(test)]
mod tests;

use std::collections::HashMap;

use tracing::{debug, trace};

use crate::ast::{self, make_name, TypeRefKind};

/// Resolves every [`TypeRefKind::Unresolved`] field type in `file` against the types declared
/// in the same file.
///
/// A bare name refers to an enum if one of that name is declared in the field's message, in
/// any message enclosing it, or at the top level of the file. Enums nested in other messages
/// are never visible. A dotted name is looked up from the root of the file, and may also start
/// with the name of a nested message. Anything which does not name an enum is assumed to be a
/// message; whether it exists is left for a later stage to check.
pub fn resolve(mut file: ast::File) -> ast::File {
    let symbols = SymbolTable::new(&file);
    let mut resolver = Resolver {
        symbols,
        scopes: Vec::new(),
        count: 0,
    };

    for message in &mut file.messages {
        resolver.resolve_message(message);
    }
    for extend in &mut file.extends {
        resolver.resolve_extend(extend);
    }

    debug!(count = resolver.count, "resolved type references");
    file
}

/// The messages and enums declared in a file, keyed by name relative to the package.
struct SymbolTable {
    package: String,
    types: HashMap<String, TypeRefKind>,
    /// Every message in declaration order, as `(name, full name)` pairs.
    messages: Vec<(String, String)>,
}

impl SymbolTable {
    fn new(file: &ast::File) -> Self {
        let mut table = SymbolTable {
            package: file.package_name(),
            types: HashMap::new(),
            messages: Vec::new(),
        };
        table.add_scope("", &file.messages, &file.enums);
        table
    }

    fn add_scope(&mut self, scope: &str, messages: &[ast::Message], enums: &[ast::Enum]) {
        for message in messages {
            let name = make_name(scope, &message.name);
            self.types.insert(name.clone(), TypeRefKind::Message);
            self.messages.push((message.name.value.clone(), name.clone()));
            self.add_scope(&name, &message.messages, &message.enums);
        }
        for enu in enums {
            self.types
                .entry(make_name(scope, &enu.name))
                .or_insert(TypeRefKind::Enum);
        }
    }

    fn get(&self, name: &str) -> Option<TypeRefKind> {
        self.types.get(name).copied()
    }

    fn is_enum(&self, name: &str) -> bool {
        self.get(name) == Some(TypeRefKind::Enum)
    }

    /// Looks up a dotted name, first from the root of the file and then relative to the first
    /// message whose name matches its first component.
    fn resolve_qualified(&self, name: &ast::TypeName) -> TypeRefKind {
        let full_name = name.name.to_string();
        let relative = match full_name
            .strip_prefix(self.package.as_str())
            .and_then(|rest| rest.strip_prefix('.'))
        {
            Some(rest) if !self.package.is_empty() => rest,
            _ => full_name.as_str(),
        };

        if let Some(kind) = self.get(relative) {
            return kind;
        }

        let (first, rest) = match relative.split_once('.') {
            Some(parts) => parts,
            None => return TypeRefKind::Message,
        };
        self.messages
            .iter()
            .find(|(name, _)| name == first)
            .and_then(|(_, container)| self.get(&make_name(container, rest)))
            .unwrap_or(TypeRefKind::Message)
    }
}

struct Resolver {
    symbols: SymbolTable,
    /// The full names of the messages enclosing the current declaration, outermost first.
    scopes: Vec<String>,
    count: usize,
}

impl Resolver {
    fn resolve_message(&mut self, message: &mut ast::Message) {
        let scope = make_name(self.current_scope(), &message.name);
        self.scopes.push(scope);

        for field in message.all_fields_mut() {
            self.resolve_ty(&mut field.ty);
        }
        for nested in &mut message.messages {
            self.resolve_message(nested);
        }
        for extend in &mut message.extends {
            self.resolve_extend(extend);
        }

        self.scopes.pop();
    }

    fn resolve_extend(&mut self, extend: &mut ast::Extend) {
        for field in &mut extend.fields {
            self.resolve_ty(&mut field.ty);
        }
    }

    fn resolve_ty(&mut self, ty: &mut ast::Ty) {
        match ty {
            ast::Ty::Named(ty) if ty.kind == TypeRefKind::Unresolved => {
                ty.kind = self.resolve_name(&ty.name);
                self.count += 1;
                trace!(name = %ty.name, kind = ?ty.kind, "resolved type reference");
            }
            ast::Ty::Map(map) => self.resolve_ty(&mut map.value),
            ast::Ty::Named(_) | ast::Ty::Scalar(..) => (),
        }
    }

    fn resolve_name(&self, name: &ast::TypeName) -> TypeRefKind {
        if name.is_qualified() {
            return self.symbols.resolve_qualified(name);
        }

        let simple = &name.name.parts[0].value;
        let in_scope = self
            .scopes
            .iter()
            .rev()
            .any(|scope| self.symbols.is_enum(&make_name(scope, simple)));
        if in_scope || self.symbols.is_enum(simple) {
            TypeRefKind::Enum
        } else {
            TypeRefKind::Message
        }
    }

    fn current_scope(&self) -> &str {
        self.scopes.last().map_or("", String::as_str)
    }
}
