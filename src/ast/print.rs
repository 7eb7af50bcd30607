use std::fmt::{self, Write};

use crate::ast;

const INDENT: &str = "  ";

/// Writes the file in canonical form. Comments are not included.
impl fmt::Display for ast::File {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut printer = Printer { f, depth: 0 };
        printer.print_file(self)
    }
}

struct Printer<'a, 'b> {
    f: &'a mut fmt::Formatter<'b>,
    depth: usize,
}

impl<'a, 'b> Printer<'a, 'b> {
    fn print_file(&mut self, file: &ast::File) -> fmt::Result {
        let mut sections = 0;
        let mut section = |printer: &mut Self| -> fmt::Result {
            sections += 1;
            if sections > 1 {
                printer.f.write_char('\n')?;
            }
            Ok(())
        };

        if let Some(syntax) = file.declared_syntax {
            section(self)?;
            self.line(format_args!("syntax = \"{}\";", syntax))?;
        }
        if let Some(package) = &file.package {
            section(self)?;
            self.line(format_args!("package {};", package.name))?;
        }
        if !file.imports.is_empty() {
            section(self)?;
            for import in &file.imports {
                match import.kind {
                    Some(kind) => self.line(format_args!(
                        "import {} \"{}\";",
                        kind,
                        HexEscaped(import.value.value.as_bytes())
                    ))?,
                    None => self.line(format_args!(
                        "import \"{}\";",
                        HexEscaped(import.value.value.as_bytes())
                    ))?,
                }
            }
        }
        if !file.options.is_empty() {
            section(self)?;
            self.print_options(&file.options)?;
        }
        for message in &file.messages {
            section(self)?;
            self.print_message(message)?;
        }
        for enu in &file.enums {
            section(self)?;
            self.print_enum(enu)?;
        }
        for service in &file.services {
            section(self)?;
            self.print_service(service)?;
        }
        for extend in &file.extends {
            section(self)?;
            self.print_extend(extend)?;
        }

        Ok(())
    }

    fn print_message(&mut self, message: &ast::Message) -> fmt::Result {
        self.open(format_args!("message {}", message.name))?;
        self.print_options(&message.options)?;
        self.print_reserved(&message.reserved)?;
        for extensions in &message.extensions {
            self.indent()?;
            self.f.write_str("extensions ")?;
            self.print_ranges(&extensions.ranges)?;
            self.print_option_list(&extensions.options)?;
            self.f.write_str(";\n")?;
        }
        for field in &message.fields {
            self.print_field(field)?;
        }
        for oneof in &message.oneofs {
            self.open(format_args!("oneof {}", oneof.name))?;
            self.print_options(&oneof.options)?;
            for field in &oneof.fields {
                self.print_field(field)?;
            }
            self.close()?;
        }
        for nested in &message.messages {
            self.print_message(nested)?;
        }
        for enu in &message.enums {
            self.print_enum(enu)?;
        }
        for extend in &message.extends {
            self.print_extend(extend)?;
        }
        self.close()
    }

    fn print_field(&mut self, field: &ast::Field) -> fmt::Result {
        self.indent()?;
        if field.label != ast::FieldLabel::Singular {
            write!(self.f, "{} ", field.label)?;
        }
        self.print_ty(&field.ty)?;
        write!(self.f, " {} = {}", field.name, field.number.value)?;
        self.print_option_list(&field.options)?;
        self.f.write_str(";\n")
    }

    fn print_ty(&mut self, ty: &ast::Ty) -> fmt::Result {
        match ty {
            ast::Ty::Scalar(scalar, _) => write!(self.f, "{}", scalar),
            ast::Ty::Named(ty) => write!(self.f, "{}", ty.name),
            ast::Ty::Map(map) => {
                write!(self.f, "map<{}, ", map.key)?;
                self.print_ty(&map.value)?;
                self.f.write_char('>')
            }
        }
    }

    fn print_enum(&mut self, enu: &ast::Enum) -> fmt::Result {
        self.open(format_args!("enum {}", enu.name))?;
        self.print_options(&enu.options)?;
        self.print_reserved(&enu.reserved)?;
        for value in &enu.values {
            self.indent()?;
            write!(self.f, "{} = ", value.name)?;
            print_int(self.f, &value.number)?;
            self.print_option_list(&value.options)?;
            self.f.write_str(";\n")?;
        }
        self.close()
    }

    fn print_service(&mut self, service: &ast::Service) -> fmt::Result {
        self.open(format_args!("service {}", service.name))?;
        self.print_options(&service.options)?;
        for method in &service.methods {
            self.indent()?;
            write!(
                self.f,
                "rpc {}({}{}) returns ({}{})",
                method.name,
                if method.is_client_streaming {
                    "stream "
                } else {
                    ""
                },
                method.input_ty,
                if method.is_server_streaming {
                    "stream "
                } else {
                    ""
                },
                method.output_ty,
            )?;
            if method.options.is_empty() {
                self.f.write_str(";\n")?;
            } else {
                self.f.write_str(" {\n")?;
                self.depth += 1;
                self.print_options(&method.options)?;
                self.close()?;
            }
        }
        self.close()
    }

    fn print_extend(&mut self, extend: &ast::Extend) -> fmt::Result {
        self.open(format_args!("extend {}", extend.extendee))?;
        self.print_options(&extend.options)?;
        for field in &extend.fields {
            self.print_field(field)?;
        }
        self.close()
    }

    fn print_reserved(&mut self, reserved: &[ast::Reserved]) -> fmt::Result {
        for reserved in reserved {
            self.indent()?;
            self.f.write_str("reserved ")?;
            match &reserved.kind {
                ast::ReservedKind::Ranges(ranges) => self.print_ranges(ranges)?,
                ast::ReservedKind::Names(names) => {
                    for (index, name) in names.iter().enumerate() {
                        if index != 0 {
                            self.f.write_str(", ")?;
                        }
                        write!(self.f, "\"{}\"", name)?;
                    }
                }
            }
            self.f.write_str(";\n")?;
        }
        Ok(())
    }

    fn print_ranges(&mut self, ranges: &[ast::ReservedRange]) -> fmt::Result {
        for (index, range) in ranges.iter().enumerate() {
            if index != 0 {
                self.f.write_str(", ")?;
            }
            print_int(self.f, &range.start)?;
            match &range.end {
                ast::ReservedRangeEnd::None => (),
                ast::ReservedRangeEnd::Int(end) => {
                    self.f.write_str(" to ")?;
                    print_int(self.f, end)?;
                }
                ast::ReservedRangeEnd::Max(_) => self.f.write_str(" to max")?,
            }
        }
        Ok(())
    }

    fn print_options(&mut self, options: &[ast::Option]) -> fmt::Result {
        for option in options {
            self.indent()?;
            self.f.write_str("option ")?;
            print_option_body(self.f, &option.body)?;
            self.f.write_str(";\n")?;
        }
        Ok(())
    }

    fn print_option_list(&mut self, options: &[ast::OptionBody]) -> fmt::Result {
        if options.is_empty() {
            return Ok(());
        }

        self.f.write_str(" [")?;
        for (index, option) in options.iter().enumerate() {
            if index != 0 {
                self.f.write_str(", ")?;
            }
            print_option_body(self.f, option)?;
        }
        self.f.write_char(']')
    }

    fn open(&mut self, header: fmt::Arguments) -> fmt::Result {
        self.indent()?;
        writeln!(self.f, "{} {{", header)?;
        self.depth += 1;
        Ok(())
    }

    fn close(&mut self) -> fmt::Result {
        self.depth -= 1;
        self.line(format_args!("}}"))
    }

    fn line(&mut self, line: fmt::Arguments) -> fmt::Result {
        self.indent()?;
        writeln!(self.f, "{}", line)
    }

    fn indent(&mut self) -> fmt::Result {
        for _ in 0..self.depth {
            self.f.write_str(INDENT)?;
        }
        Ok(())
    }
}

fn print_option_body(f: &mut fmt::Formatter<'_>, option: &ast::OptionBody) -> fmt::Result {
    for (index, part) in option.name.iter().enumerate() {
        if index != 0 {
            f.write_char('.')?;
        }
        match part {
            ast::OptionNamePart::Ident(ident) => write!(f, "{}", ident)?,
            ast::OptionNamePart::Extension(name, _) => write!(f, "({})", name)?,
        }
    }
    f.write_str(" = ")?;
    print_option_value(f, &option.value)
}

fn print_option_value(f: &mut fmt::Formatter<'_>, value: &ast::OptionValue) -> fmt::Result {
    match value {
        ast::OptionValue::Ident(ident) => write!(f, "{}", ident),
        ast::OptionValue::Int(int) => print_int(f, int),
        ast::OptionValue::Float(float) => print_float(f, float.value),
        ast::OptionValue::String(string) => write!(f, "\"{}\"", HexEscaped(&string.value)),
        ast::OptionValue::Bool(value) => write!(f, "{}", value.value),
        ast::OptionValue::Array(array) => {
            f.write_char('[')?;
            for (index, value) in array.values.iter().enumerate() {
                if index != 0 {
                    f.write_str(", ")?;
                }
                print_option_value(f, value)?;
            }
            f.write_char(']')
        }
        ast::OptionValue::Aggregate(aggregate) => {
            f.write_char('{')?;
            for field in &aggregate.fields {
                f.write_char(' ')?;
                match &field.name {
                    ast::AggregateFieldName::Ident(ident) => write!(f, "{}", ident)?,
                    ast::AggregateFieldName::Extension(name, _) => write!(f, "[{}]", name)?,
                }
                f.write_str(": ")?;
                print_option_value(f, &field.value)?;
            }
            if !aggregate.fields.is_empty() {
                f.write_char(' ')?;
            }
            f.write_char('}')
        }
    }
}

fn print_int(f: &mut fmt::Formatter<'_>, int: &ast::Int) -> fmt::Result {
    if int.negative {
        f.write_char('-')?;
    }
    write!(f, "{}", int.value)
}

fn print_float(f: &mut fmt::Formatter<'_>, value: f64) -> fmt::Result {
    if value.is_nan() {
        f.write_str("nan")
    } else if value.is_infinite() {
        if value.is_sign_negative() {
            f.write_str("-inf")
        } else {
            f.write_str("inf")
        }
    } else {
        write!(f, "{:?}", value)
    }
}

pub(crate) struct HexEscaped<'a>(pub &'a [u8]);

impl<'a> fmt::Display for HexEscaped<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &ch in self.0 {
            match ch {
                b'\t' => f.write_str("\\t")?,
                b'\r' => f.write_str("\\r")?,
                b'\n' => f.write_str("\\n")?,
                b'\\' => f.write_str("\\\\")?,
                b'\'' => f.write_str("\\'")?,
                b'"' => f.write_str("\\\"")?,
                b'\x20'..=b'\x7e' => f.write_char(ch as char)?,
                _ => {
                    write!(f, "\\{:03o}", ch)?;
                }
            }
        }

        Ok(())
    }
}
