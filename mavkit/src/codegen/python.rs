use crate::codegen::code::Code;
use crate::codegen::naming::{pascal_case, python_ident, snake_case, upper_snake_case, Scope};
use crate::codegen::{Backend, SourceText};
use crate::consts::PYTHON_FILE_EXTENSION;
use crate::errors::CodegenError;
use crate::schema::{Dialect, Enum, FieldType, Message, PrimitiveType};

const BACKEND_NAME: &str = "python";
const RESERVED: &[&str] = &[
    "struct",
    "DIALECT_NAME",
    "EncodeError",
    "DecodeError",
    "CRC_EXTRA",
    "MESSAGES",
    "_truncate",
    "_finish",
    "_prepare",
    "_text",
    "_array",
];

const PRELUDE: &str = r#"import struct


class EncodeError(ValueError):
    """Message can't be encoded."""


class DecodeError(ValueError):
    """Payload can't be decoded."""


def _truncate(payload):
    end = len(payload)
    while end > 1 and payload[end - 1] == 0:
        end -= 1
    return payload[:end]


def _finish(message, payload, version):
    if version == 1:
        if message.ID > 255:
            raise EncodeError("message ID %d can't be encoded as MAVLink 1" % message.ID)
        return payload[: message.BASE_LEN]
    return _truncate(payload)


def _prepare(message, payload, version):
    if len(payload) > message.MAX_LEN:
        raise DecodeError(
            "payload of %s is %d bytes, at most %d is allowed"
            % (message.NAME, len(payload), message.MAX_LEN)
        )
    if version == 1:
        payload = payload[: message.BASE_LEN]
    return payload + bytes(message.MAX_LEN - len(payload))


def _text(value, length, message, field):
    data = value.encode("utf-8")
    if len(data) > length:
        raise EncodeError(
            "field `%s.%s` expects %d elements, got %d" % (message, field, length, len(data))
        )
    return data


def _array(value, length, message, field):
    values = list(value)
    if len(values) != length:
        raise EncodeError(
            "field `%s.%s` expects %d elements, got %d" % (message, field, length, len(values))
        )
    return values
"#;

/// Renders a dialect as a self-contained Python module.
///
/// The module only depends on the standard `struct` module. Every message becomes a class with
/// `encode(version)` and `decode(payload, version)` methods. Enum entries become module-level
/// constants.
#[derive(Copy, Clone, Debug, Default)]
pub struct PythonBackend;

struct PyField {
    ident: String,
    name: String,
    field_type: FieldType,
}

impl Backend for PythonBackend {
    fn name(&self) -> &str {
        BACKEND_NAME
    }

    fn render(&self, dialect: &Dialect) -> Result<SourceText, CodegenError> {
        let mut scope = Scope::new(BACKEND_NAME);
        for reserved in RESERVED {
            scope.claim(reserved, "mavkit")?;
        }

        let mut code = Code::new("    ");
        code.line(format!("\"\"\"MAVLink dialect `{}`.", dialect.name()))
            .blank()
            .line("Generated by mavkit. Do not edit.")
            .line("\"\"\"")
            .blank();
        for line in PRELUDE.lines() {
            code.line(line);
        }
        code.blank()
            .blank()
            .line(format!("DIALECT_NAME = \"{}\"", dialect.name()));

        for mav_enum in dialect.enums() {
            render_enum(&mut code, &mut scope, mav_enum)?;
        }

        let mut classes = Vec::new();
        for message in dialect.messages() {
            classes.push((message.id(), render_message(&mut code, &mut scope, message)?));
        }

        code.blank().blank().open("CRC_EXTRA = {");
        for message in dialect.messages() {
            code.line(format!("{}: {},", message.id(), message.crc_extra()));
        }
        code.close("}").blank().open("MESSAGES = {");
        for (id, class) in &classes {
            code.line(format!("{id}: {class},"));
        }
        code.close("}");

        Ok(SourceText::new(
            format!("{}.{PYTHON_FILE_EXTENSION}", dialect.name()),
            code.into_string(),
        ))
    }
}

fn render_enum(code: &mut Code, scope: &mut Scope, mav_enum: &Enum) -> Result<(), CodegenError> {
    code.blank().blank().line(format!("# {}", mav_enum.name()));
    if let Some(description) = mav_enum.description() {
        code.doc("# ", description);
    }
    for entry in mav_enum.entries() {
        let ident = upper_snake_case(entry.name());
        scope.claim(&ident, entry.name())?;
        code.line(format!("{ident} = {}", entry.value()));
    }
    Ok(())
}

fn render_message(
    code: &mut Code,
    scope: &mut Scope,
    message: &Message,
) -> Result<String, CodegenError> {
    let class = python_ident(pascal_case(message.name()));
    scope.claim(&class, message.name())?;

    let mut field_scope = Scope::new(BACKEND_NAME);
    let mut declared = Vec::with_capacity(message.fields().len());
    for field in message.fields() {
        let ident = python_ident(snake_case(field.name()));
        field_scope.claim(&ident, &format!("{}.{}", message.name(), field.name()))?;
        declared.push(PyField {
            ident,
            name: field.name().to_string(),
            field_type: field.field_type(),
        });
    }
    let wire: Vec<&PyField> = message
        .wire_fields()
        .filter_map(|wf| declared.iter().find(|f| f.name == wf.name()))
        .collect();

    let format: String = wire.iter().map(|f| struct_format(f.field_type)).collect();

    code.blank().blank().open(format!("class {class}:"));
    code.line(format!(
        "\"\"\"MAVLink message `{}` (ID {}).",
        message.name(),
        message.id()
    ));
    if let Some(description) = message.description() {
        code.blank().doc("", &docstring(description));
    }
    code.line("\"\"\"")
        .blank()
        .line(format!("ID = {}", message.id()))
        .line(format!("NAME = \"{}\"", message.name()))
        .line(format!("CRC_EXTRA = {}", message.crc_extra()))
        .line(format!("BASE_LEN = {}", message.base_len()))
        .line(format!("MAX_LEN = {}", message.max_len()))
        .line(format!("_FORMAT = struct.Struct(\"<{format}\")"))
        .blank();

    // Constructor
    let params: Vec<String> = declared
        .iter()
        .map(|f| match f.field_type {
            FieldType::Array(PrimitiveType::Char, _) => format!("{}=\"\"", f.ident),
            FieldType::Array(_, _) => format!("{}=None", f.ident),
            FieldType::Scalar(t) => format!("{}={}", f.ident, python_zero(t)),
        })
        .collect();
    code.open(format!("def __init__(self, {}):", params.join(", ")));
    for f in &declared {
        match f.field_type {
            FieldType::Array(PrimitiveType::Char, _) | FieldType::Scalar(_) => {
                code.line(format!("self.{0} = {0}", f.ident));
            }
            FieldType::Array(t, len) => {
                code.line(format!(
                    "self.{0} = [{1}] * {2} if {0} is None else list({0})",
                    f.ident,
                    python_zero(t),
                    len
                ));
            }
        }
    }
    code.dedent().blank();

    // Encode
    code.open("def encode(self, version=2):")
        .open("try:")
        .open("payload = self._FORMAT.pack(");
    for f in &wire {
        let arg = match f.field_type {
            FieldType::Scalar(_) => format!("self.{}", f.ident),
            FieldType::Array(PrimitiveType::Char, len) => format!(
                "_text(self.{}, {len}, self.NAME, \"{}\")",
                f.ident, f.name
            ),
            FieldType::Array(_, len) => format!(
                "*_array(self.{}, {len}, self.NAME, \"{}\")",
                f.ident, f.name
            ),
        };
        code.line(format!("{arg},"));
    }
    code.close(")")
        .close("except (struct.error, OverflowError) as err:")
        .line("    raise EncodeError(\"%s: %s\" % (self.NAME, err))")
        .line("return _finish(self, payload, version)")
        .dedent()
        .blank();

    // Decode
    code.line("@classmethod")
        .open("def decode(cls, payload, version=2):")
        .line("values = cls._FORMAT.unpack(_prepare(cls, bytes(payload), version))")
        .open("return cls(");
    let mut idx = 0usize;
    for f in &wire {
        let value = match f.field_type {
            FieldType::Scalar(_) => {
                idx += 1;
                format!("values[{}]", idx - 1)
            }
            FieldType::Array(PrimitiveType::Char, _) => {
                idx += 1;
                format!(
                    "values[{}].split(b\"\\0\", 1)[0].decode(\"utf-8\", \"replace\")",
                    idx - 1
                )
            }
            FieldType::Array(_, len) => {
                let start = idx;
                idx += len as usize;
                format!("list(values[{start}:{idx}])")
            }
        };
        code.line(format!("{}={value},", f.ident));
    }
    code.close(")").dedent().blank();

    // Equality and representation
    code.open("def __eq__(self, other):")
        .line("return isinstance(other, self.__class__) and self.__dict__ == other.__dict__")
        .dedent()
        .blank()
        .open("def __repr__(self):")
        .line("fields = \", \".join(\"%s=%r\" % item for item in self.__dict__.items())")
        .line("return \"%s(%s)\" % (self.__class__.__name__, fields)")
        .dedent()
        .dedent();

    Ok(class)
}

fn struct_format(field_type: FieldType) -> String {
    match field_type {
        FieldType::Scalar(t) => primitive_format(t).to_string(),
        FieldType::Array(PrimitiveType::Char, len) => format!("{len}s"),
        FieldType::Array(t, len) => format!("{len}{}", primitive_format(t)),
    }
}

fn primitive_format(t: PrimitiveType) -> &'static str {
    match t {
        PrimitiveType::Int8 => "b",
        PrimitiveType::UInt8 | PrimitiveType::Char | PrimitiveType::UInt8MavlinkVersion => "B",
        PrimitiveType::Int16 => "h",
        PrimitiveType::UInt16 => "H",
        PrimitiveType::Int32 => "i",
        PrimitiveType::UInt32 => "I",
        PrimitiveType::Int64 => "q",
        PrimitiveType::UInt64 => "Q",
        PrimitiveType::Float => "f",
        PrimitiveType::Double => "d",
    }
}

fn python_zero(t: PrimitiveType) -> &'static str {
    if t.is_float() {
        "0.0"
    } else {
        "0"
    }
}

fn docstring(text: &str) -> String {
    text.replace('\\', "\\\\").replace("\"\"\"", "\\\"\\\"\\\"")
}
