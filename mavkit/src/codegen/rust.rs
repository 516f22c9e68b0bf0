use crate::codegen::code::Code;
use crate::codegen::naming::{pascal_case, rust_ident, snake_case, upper_snake_case, Scope};
use crate::codegen::{Backend, SourceText};
use crate::consts::RUST_FILE_EXTENSION;
use crate::errors::CodegenError;
use crate::schema::{Dialect, Enum, Field, FieldType, Message, PrimitiveType};

const BACKEND_NAME: &str = "rust";
const RESERVED: &[&str] = &["DIALECT_NAME", "Lookup", "crc_extra", "max_len", "message_name"];

/// Renders a dialect as a Rust module.
///
/// The module depends on `mavkit`: message structs implement
/// [`MavMessage`](crate::protocol::MavMessage) on top of
/// [`PayloadWriter`](crate::protocol::PayloadWriter) and
/// [`PayloadReader`](crate::protocol::PayloadReader), and the generated `Lookup` type implements
/// [`CrcExtraLookup`](crate::protocol::CrcExtraLookup).
///
/// Enums are rendered as modules of `u64` constants. `char[N]` fields become [`String`], other
/// arrays become fixed size arrays.
#[derive(Copy, Clone, Debug, Default)]
pub struct RustBackend;

impl Backend for RustBackend {
    fn name(&self) -> &str {
        BACKEND_NAME
    }

    fn render(&self, dialect: &Dialect) -> Result<SourceText, CodegenError> {
        let mut scope = Scope::new(BACKEND_NAME);
        for reserved in RESERVED {
            scope.claim(reserved, "mavkit")?;
        }

        let mut code = Code::new("    ");
        render_header(&mut code, dialect);

        for mav_enum in dialect.enums() {
            render_enum(&mut code, &mut scope, mav_enum)?;
        }
        for message in dialect.messages() {
            render_message(&mut code, &mut scope, message)?;
        }
        render_lookup(&mut code, dialect);

        Ok(SourceText::new(
            format!("{}.{RUST_FILE_EXTENSION}", dialect.name()),
            code.into_string(),
        ))
    }
}

fn render_header(code: &mut Code, dialect: &Dialect) {
    code.line(format!("//! MAVLink dialect `{}`.", dialect.name()))
        .line("//!")
        .line("//! Generated by mavkit. Do not edit.");
    if let Some(version) = dialect.version() {
        code.line("//!")
            .line(format!("//! Definitions version: {version}."));
    }
    code.blank();

    if dialect.messages().next().is_some() {
        code.line("use mavkit::errors::{DecodeError, EncodeError};")
            .line("use mavkit::protocol::{")
            .line("    CrcExtra, CrcExtraLookup, MavLinkVersion, MavMessage, MessageId, Payload,")
            .line("    PayloadReader, PayloadWriter,")
            .line("};");
    } else {
        code.line("use mavkit::protocol::{CrcExtra, CrcExtraLookup, MessageId};");
    }
    code.blank()
        .line("/// Dialect name.")
        .line(format!("pub const DIALECT_NAME: &str = \"{}\";", dialect.name()))
        .blank();
}

fn render_enum(code: &mut Code, scope: &mut Scope, mav_enum: &Enum) -> Result<(), CodegenError> {
    let module = rust_ident(snake_case(mav_enum.name()));
    scope.claim(&module, mav_enum.name())?;

    let mut entries = Scope::new(BACKEND_NAME);

    code.line(format!("/// Enum `{}`.", mav_enum.name()));
    if let Some(description) = mav_enum.description() {
        code.line("///").doc("/// ", description);
    }
    if mav_enum.bitmask() {
        code.line("///").line("/// Bitmask flags.");
    }
    code.open(format!("pub mod {module} {{"));
    for entry in mav_enum.entries() {
        let ident = upper_snake_case(entry.name());
        entries.claim(&ident, entry.name())?;

        if let Some(description) = entry.description() {
            code.doc("/// ", description);
        }
        code.line(format!("pub const {ident}: u64 = {};", entry.value()));
    }
    code.close("}").blank();

    Ok(())
}

struct FieldIdent<'a> {
    ident: String,
    field: &'a Field,
}

fn render_message(
    code: &mut Code,
    scope: &mut Scope,
    message: &Message,
) -> Result<(), CodegenError> {
    let name = pascal_case(message.name());
    scope.claim(&name, message.name())?;

    let mut field_scope = Scope::new(BACKEND_NAME);
    let mut fields = Vec::with_capacity(message.fields().len());
    for field in message.fields() {
        let ident = rust_ident(snake_case(field.name()));
        field_scope.claim(&ident, &format!("{}.{}", message.name(), field.name()))?;
        fields.push(FieldIdent { ident, field });
    }
    let wire: Vec<&FieldIdent> = message
        .wire_fields()
        .filter_map(|wf| fields.iter().find(|f| std::ptr::eq(f.field, wf)))
        .collect();

    // Struct
    if let Some(description) = message.description() {
        code.doc("/// ", description).line("///");
    }
    code.line(format!(
        "/// MAVLink message `{}` (`ID` {}).",
        message.name(),
        message.id()
    ));
    if message.deprecated() {
        code.line("///").line("/// Deprecated.");
    }
    code.line("#[derive(Clone, Debug, PartialEq)]")
        .open(format!("pub struct {name} {{"));
    for f in &fields {
        render_field_doc(code, f.field);
        code.line(format!("pub {}: {},", f.ident, rust_type(f.field.field_type())));
    }
    code.close("}").blank();

    // Default
    code.open(format!("impl Default for {name} {{"))
        .open("fn default() -> Self {")
        .open("Self {");
    for f in &fields {
        code.line(format!("{}: {},", f.ident, zero_value(f.field.field_type())));
    }
    code.close("}").close("}").close("}").blank();

    // MavMessage
    code.open(format!("impl MavMessage for {name} {{"))
        .line(format!("const ID: MessageId = {};", message.id()))
        .line(format!("const NAME: &'static str = \"{}\";", message.name()))
        .line(format!("const CRC_EXTRA: CrcExtra = {};", message.crc_extra()))
        .line(format!("const BASE_LEN: usize = {};", message.base_len()))
        .line(format!("const MAX_LEN: usize = {};", message.max_len()))
        .blank();

    code.open(
        "fn encode_payload(&self, version: MavLinkVersion) -> Result<Payload, EncodeError> {",
    )
    .line("let mut writer = PayloadWriter::for_message::<Self>();");
    for f in &wire {
        render_put(code, f);
    }
    code.line("writer.finish(version)").close("}").blank();

    code.open("fn decode_payload(payload: &Payload) -> Result<Self, DecodeError> {")
        .line("let mut reader = PayloadReader::for_message::<Self>(payload)?;")
        .open("Ok(Self {");
    for f in &wire {
        render_get(code, f);
    }
    code.close("})").close("}").close("}").blank();

    Ok(())
}

fn render_field_doc(code: &mut Code, field: &Field) {
    let mut documented = false;
    if let Some(description) = field.description() {
        code.doc("/// ", description);
        documented = true;
    }
    if let Some(units) = field.units() {
        if documented {
            code.line("///");
        }
        code.line(format!("/// Units: `{units}`."));
        documented = true;
    }
    if let Some(enum_name) = field.enum_name() {
        if documented {
            code.line("///");
        }
        code.line(format!("/// Values: [`{}`].", rust_ident(snake_case(enum_name))));
        documented = true;
    }
    if field.is_extension() {
        if documented {
            code.line("///");
        }
        code.line("/// Extension field, `MAVLink 2` only.");
    }
}

fn render_put(code: &mut Code, f: &FieldIdent) {
    match f.field.field_type() {
        FieldType::Scalar(t) => {
            code.line(format!("writer.put_{}(self.{});", accessor(t), f.ident));
        }
        FieldType::Array(PrimitiveType::Char, len) => {
            code.line(format!(
                "writer.put_str(Self::NAME, \"{}\", &self.{}, {len})?;",
                f.field.name(),
                f.ident
            ));
        }
        FieldType::Array(t, _) => {
            code.open(format!("for value in &self.{} {{", f.ident))
                .line(format!("writer.put_{}(*value);", accessor(t)))
                .close("}");
        }
    }
}

fn render_get(code: &mut Code, f: &FieldIdent) {
    match f.field.field_type() {
        FieldType::Scalar(t) => {
            code.line(format!("{}: reader.get_{}(),", f.ident, accessor(t)));
        }
        FieldType::Array(PrimitiveType::Char, len) => {
            code.line(format!("{}: reader.get_str({len}),", f.ident));
        }
        FieldType::Array(t, _) => {
            code.line(format!(
                "{}: std::array::from_fn(|_| reader.get_{}()),",
                f.ident,
                accessor(t)
            ));
        }
    }
}

fn render_lookup(code: &mut Code, dialect: &Dialect) {
    code.line("/// CRC-extra of a message or `None` if message is not in the dialect.")
        .open("pub fn crc_extra(id: MessageId) -> Option<CrcExtra> {")
        .open("match id {");
    for message in dialect.messages() {
        code.line(format!(
            "{} => Some({}),",
            message.id(),
            message.crc_extra()
        ));
    }
    code.line("_ => None,").close("}").close("}").blank();

    code.line("/// Untruncated payload length of a message.")
        .open("pub fn max_len(id: MessageId) -> Option<usize> {")
        .open("match id {");
    for message in dialect.messages() {
        code.line(format!("{} => Some({}),", message.id(), message.max_len()));
    }
    code.line("_ => None,").close("}").close("}").blank();

    code.line("/// Message name by `ID`.")
        .open("pub fn message_name(id: MessageId) -> Option<&'static str> {")
        .open("match id {");
    for message in dialect.messages() {
        code.line(format!("{} => Some(\"{}\"),", message.id(), message.name()));
    }
    code.line("_ => None,").close("}").close("}").blank();

    code.line("/// Message lookup for frame decoding.")
        .line("#[derive(Copy, Clone, Debug, Default)]")
        .line("pub struct Lookup;")
        .blank()
        .open("impl CrcExtraLookup for Lookup {")
        .open("fn crc_extra(&self, id: MessageId) -> Option<CrcExtra> {")
        .line("crc_extra(id)")
        .close("}")
        .blank()
        .open("fn max_payload_len(&self, id: MessageId) -> Option<usize> {")
        .line("max_len(id)")
        .close("}")
        .close("}");
}

fn rust_type(field_type: FieldType) -> String {
    match field_type {
        FieldType::Scalar(t) => primitive_type(t).to_string(),
        FieldType::Array(PrimitiveType::Char, _) => "String".to_string(),
        FieldType::Array(t, len) => format!("[{}; {len}]", primitive_type(t)),
    }
}

fn zero_value(field_type: FieldType) -> String {
    match field_type {
        FieldType::Scalar(t) => primitive_zero(t).to_string(),
        FieldType::Array(PrimitiveType::Char, _) => "String::new()".to_string(),
        FieldType::Array(t, len) => format!("[{}; {len}]", primitive_zero(t)),
    }
}

fn primitive_type(t: PrimitiveType) -> &'static str {
    match t {
        PrimitiveType::Int8 => "i8",
        PrimitiveType::UInt8 | PrimitiveType::Char | PrimitiveType::UInt8MavlinkVersion => "u8",
        PrimitiveType::Int16 => "i16",
        PrimitiveType::UInt16 => "u16",
        PrimitiveType::Int32 => "i32",
        PrimitiveType::UInt32 => "u32",
        PrimitiveType::Int64 => "i64",
        PrimitiveType::UInt64 => "u64",
        PrimitiveType::Float => "f32",
        PrimitiveType::Double => "f64",
    }
}

fn primitive_zero(t: PrimitiveType) -> &'static str {
    if t.is_float() {
        "0.0"
    } else {
        "0"
    }
}

fn accessor(t: PrimitiveType) -> &'static str {
    primitive_type(t)
}
