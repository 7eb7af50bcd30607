use std::mem::replace;

use logos::Span;

use crate::ast::{self, make_name, Visitor};

/// A named definition in a file.
#[derive(Debug, Clone, PartialEq)]
pub struct Definition {
    /// The package-qualified name, without a leading dot.
    pub full_name: String,
    pub kind: DefinitionKind,
    /// The location of the definition's name.
    pub span: Span,
    container: String,
    nested: bool,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DefinitionKind {
    Package,
    Message,
    Enum,
    EnumValue,
    Service,
    Method,
}

impl ast::File {
    /// Gets every named definition in the file, in declaration order.
    ///
    /// A package name `foo.bar` contributes definitions for both `foo` and `foo.bar`. Enum values
    /// are scoped alongside their enum rather than inside it, so `enum E { A = 0; }` in package
    /// `pkg` defines `pkg.E` and `pkg.A`.
    pub fn definitions(&self) -> Vec<Definition> {
        let mut pass = NamePass {
            scope: String::new(),
            nested: false,
            definitions: Vec::new(),
        };
        pass.visit_file(self);
        pass.definitions
    }
}

/// Returns true if two definitions with the same full name should be reported as a conflict by
/// the file-wide check.
///
/// Clashes between members of the same message, enum or service are caught when that declaration
/// is validated, and repeated package prefixes are allowed.
pub(crate) fn conflicts(first: &Definition, second: &Definition) -> bool {
    match (first.kind, second.kind) {
        (DefinitionKind::Package, DefinitionKind::Package) => false,
        (
            DefinitionKind::Message | DefinitionKind::Enum,
            DefinitionKind::Message | DefinitionKind::Enum,
        ) => !(first.nested && second.nested && first.container == second.container),
        (DefinitionKind::EnumValue, DefinitionKind::EnumValue)
        | (DefinitionKind::Method, DefinitionKind::Method) => first.container != second.container,
        _ => true,
    }
}

struct NamePass {
    scope: String,
    nested: bool,
    definitions: Vec<Definition>,
}

impl NamePass {
    fn add(&mut self, full_name: String, kind: DefinitionKind, span: Span, container: &str) {
        self.definitions.push(Definition {
            full_name,
            kind,
            span,
            container: container.to_owned(),
            nested: self.nested,
        });
    }
}

impl Visitor for NamePass {
    fn visit_file(&mut self, file: &ast::File) {
        if let Some(package) = &file.package {
            let mut name = String::new();
            for part in &package.name.parts {
                name = make_name(&name, part);
                let span = package.name.span().start..part.span.end;
                self.add(name.clone(), DefinitionKind::Package, span, "");
            }
            self.scope = name;
        }

        file.visit(self)
    }

    fn visit_message(&mut self, message: &ast::Message) {
        let full_name = make_name(&self.scope, &message.name);
        let scope = self.scope.clone();
        self.add(
            full_name.clone(),
            DefinitionKind::Message,
            message.name.span.clone(),
            &scope,
        );

        let parent_scope = replace(&mut self.scope, full_name);
        let parent_nested = replace(&mut self.nested, true);
        message.visit(self);
        self.scope = parent_scope;
        self.nested = parent_nested;
    }

    fn visit_enum(&mut self, enu: &ast::Enum) {
        let full_name = make_name(&self.scope, &enu.name);
        let scope = self.scope.clone();
        self.add(
            full_name.clone(),
            DefinitionKind::Enum,
            enu.name.span.clone(),
            &scope,
        );

        for value in &enu.values {
            self.add(
                make_name(&scope, &value.name),
                DefinitionKind::EnumValue,
                value.name.span.clone(),
                &full_name,
            );
        }
    }

    fn visit_service(&mut self, service: &ast::Service) {
        let full_name = make_name(&self.scope, &service.name);
        let scope = self.scope.clone();
        self.add(
            full_name.clone(),
            DefinitionKind::Service,
            service.name.span.clone(),
            &scope,
        );

        for method in &service.methods {
            self.add(
                make_name(&full_name, &method.name),
                DefinitionKind::Method,
                method.name.span.clone(),
                &full_name,
            );
        }
    }
}
