use crate::ast;

pub(crate) trait Visitor {
    fn visit_file(&mut self, file: &ast::File) {
        file.visit(self)
    }

    fn visit_enum(&mut self, enu: &ast::Enum) {
        enu.visit(self)
    }

    fn visit_enum_value(&mut self, _: &ast::EnumValue) {}

    fn visit_message(&mut self, message: &ast::Message) {
        message.visit(self)
    }

    fn visit_field(&mut self, _: &ast::Field) {}

    fn visit_oneof(&mut self, oneof: &ast::Oneof) {
        oneof.visit(self)
    }

    fn visit_extend(&mut self, extend: &ast::Extend) {
        extend.visit(self)
    }

    fn visit_service(&mut self, service: &ast::Service) {
        service.visit(self)
    }

    fn visit_method(&mut self, _: &ast::Method) {}
}

impl ast::File {
    pub(crate) fn visit<V: Visitor + ?Sized>(&self, visitor: &mut V) {
        for message in &self.messages {
            visitor.visit_message(message);
        }
        for enu in &self.enums {
            visitor.visit_enum(enu);
        }
        for service in &self.services {
            visitor.visit_service(service);
        }
        for extend in &self.extends {
            visitor.visit_extend(extend);
        }
    }
}

impl ast::Enum {
    pub(crate) fn visit<V: Visitor + ?Sized>(&self, visitor: &mut V) {
        for value in &self.values {
            visitor.visit_enum_value(value)
        }
    }
}

impl ast::Message {
    pub(crate) fn visit<V: Visitor + ?Sized>(&self, visitor: &mut V) {
        for field in &self.fields {
            visitor.visit_field(field);
        }
        for oneof in &self.oneofs {
            visitor.visit_oneof(oneof);
        }
        for message in &self.messages {
            visitor.visit_message(message);
        }
        for enu in &self.enums {
            visitor.visit_enum(enu);
        }
        for extend in &self.extends {
            visitor.visit_extend(extend);
        }
    }
}

impl ast::Oneof {
    pub(crate) fn visit<V: Visitor + ?Sized>(&self, visitor: &mut V) {
        for field in &self.fields {
            visitor.visit_field(field)
        }
    }
}

impl ast::Extend {
    pub(crate) fn visit<V: Visitor + ?Sized>(&self, visitor: &mut V) {
        for field in &self.fields {
            visitor.visit_field(field)
        }
    }
}

impl ast::Service {
    pub(crate) fn visit<V: Visitor + ?Sized>(&self, visitor: &mut V) {
        for method in &self.methods {
            visitor.visit_method(method)
        }
    }
}
