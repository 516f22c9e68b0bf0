use std::collections::{BTreeMap, HashMap};

use crate::errors::{DecodeError, EncodeError};
use crate::protocol::{
    CrcExtra, CrcExtraLookup, Frame, MavLinkVersion, MessageId, MessageValue, Payload,
    PayloadReader, PayloadWriter, Value,
};
use crate::schema::{Dialect, FieldType, PrimitiveType};

/// Frozen message layouts of a dialect.
///
/// [`DialectTable`] keeps everything required to encode, decode, and verify messages at runtime
/// and holds no reference to the [`Dialect`] it was built from.
#[derive(Clone, Debug, Default)]
pub struct DialectTable {
    name: String,
    layouts: BTreeMap<MessageId, MessageLayout>,
    names: HashMap<String, MessageId>,
}

/// Layout of a single message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageLayout {
    id: MessageId,
    name: String,
    crc_extra: CrcExtra,
    base_len: usize,
    max_len: usize,
    fields: Vec<FieldLayout>,
}

/// Layout of a single field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldLayout {
    name: String,
    field_type: FieldType,
    is_extension: bool,
}

impl DialectTable {
    /// Builds a table from a dialect.
    pub fn new(dialect: &Dialect) -> Self {
        let mut table = Self {
            name: dialect.name().to_string(),
            ..Default::default()
        };

        for message in dialect.messages() {
            let layout = MessageLayout {
                id: message.id(),
                name: message.name().to_string(),
                crc_extra: message.crc_extra(),
                base_len: message.base_len(),
                max_len: message.max_len(),
                fields: message
                    .wire_fields()
                    .map(|f| FieldLayout {
                        name: f.name().to_string(),
                        field_type: f.field_type(),
                        is_extension: f.is_extension(),
                    })
                    .collect(),
            };
            table.names.insert(layout.name.clone(), layout.id);
            table.layouts.insert(layout.id, layout);
        }

        table
    }

    /// Dialect name.
    #[inline]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Message layout by `ID`.
    pub fn layout(&self, id: MessageId) -> Option<&MessageLayout> {
        self.layouts.get(&id)
    }

    /// Message `ID` by name.
    pub fn message_id(&self, name: &str) -> Option<MessageId> {
        self.names.get(name).copied()
    }

    /// All message layouts ordered by `ID`.
    pub fn layouts(&self) -> impl Iterator<Item = &MessageLayout> {
        self.layouts.values()
    }

    /// Encodes a dynamic message into payload.
    ///
    /// Every base field must be present. Missing extension fields are zero. Every value is checked
    /// against the declared field type.
    pub fn encode_value(
        &self,
        value: &MessageValue,
        version: MavLinkVersion,
    ) -> Result<Payload, EncodeError> {
        let layout = self
            .layouts
            .get(&value.id())
            .ok_or(EncodeError::UnknownMessage(value.id()))?;

        for name in value.field_map().keys() {
            if !layout.fields.iter().any(|f| &f.name == name) {
                return Err(EncodeError::UnknownField {
                    message: layout.name.clone(),
                    field: name.clone(),
                });
            }
        }

        let mut writer = PayloadWriter::new(layout.id, layout.base_len, layout.max_len);
        for field in &layout.fields {
            match value.get(&field.name) {
                Some(v) => write_field(&mut writer, layout, field, v)?,
                None if field.is_extension => {
                    for _ in 0..field.field_type.size() {
                        writer.put_u8(0);
                    }
                }
                None => {
                    return Err(EncodeError::MissingField {
                        message: layout.name.clone(),
                        field: field.name.clone(),
                    })
                }
            }
        }

        writer.finish(version)
    }

    /// Decodes payload into a dynamic message.
    ///
    /// All fields are present in the result, including zero-filled extensions.
    pub fn decode_value(&self, payload: &Payload) -> Result<MessageValue, DecodeError> {
        let layout = self
            .layouts
            .get(&payload.id())
            .ok_or_else(|| DecodeError::UnknownMessage {
                id: payload.id(),
                raw: payload.bytes().to_vec(),
            })?;

        let mut reader = PayloadReader::new(payload, layout.max_len)?;
        let mut value = MessageValue::new(layout.id);
        for field in &layout.fields {
            let decoded = match field.field_type {
                FieldType::Scalar(PrimitiveType::Char) => reader.get_str(1).into(),
                FieldType::Scalar(t) => read_primitive(&mut reader, t),
                FieldType::Array(PrimitiveType::Char, len) => {
                    Value::Text(reader.get_str(len as usize))
                }
                FieldType::Array(t, len) => Value::Array(
                    (0..len).map(|_| read_primitive(&mut reader, t)).collect(),
                ),
            };
            value.set(field.name.clone(), decoded);
        }

        Ok(value)
    }

    /// Decodes frame payload into a dynamic message.
    pub fn decode_frame(&self, frame: &Frame) -> Result<MessageValue, DecodeError> {
        self.decode_value(frame.payload())
    }
}

impl CrcExtraLookup for DialectTable {
    fn crc_extra(&self, id: MessageId) -> Option<CrcExtra> {
        self.layouts.get(&id).map(|l| l.crc_extra)
    }

    fn max_payload_len(&self, id: MessageId) -> Option<usize> {
        self.layouts.get(&id).map(|l| l.max_len)
    }
}

impl From<&Dialect> for DialectTable {
    fn from(value: &Dialect) -> Self {
        Self::new(value)
    }
}

impl MessageLayout {
    /// Message `ID`.
    #[inline]
    pub fn id(&self) -> MessageId {
        self.id
    }

    /// Message name.
    #[inline]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// CRC-extra.
    #[inline]
    pub fn crc_extra(&self) -> CrcExtra {
        self.crc_extra
    }

    /// `MAVLink 1` payload length.
    #[inline]
    pub fn base_len(&self) -> usize {
        self.base_len
    }

    /// Untruncated `MAVLink 2` payload length.
    #[inline]
    pub fn max_len(&self) -> usize {
        self.max_len
    }

    /// Fields in payload order.
    #[inline]
    pub fn fields(&self) -> &[FieldLayout] {
        self.fields.as_slice()
    }
}

impl FieldLayout {
    /// Field name.
    #[inline]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Field type.
    #[inline]
    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    /// Whether field is an extension.
    #[inline]
    pub fn is_extension(&self) -> bool {
        self.is_extension
    }
}

fn write_field(
    writer: &mut PayloadWriter,
    layout: &MessageLayout,
    field: &FieldLayout,
    value: &Value,
) -> Result<(), EncodeError> {
    match field.field_type {
        FieldType::Scalar(PrimitiveType::Char) => write_char(writer, layout, field, value),
        FieldType::Scalar(t) => write_primitive(writer, layout, field, t, value),
        FieldType::Array(PrimitiveType::Char, len) => match value {
            Value::Text(text) => writer.put_str(&layout.name, &field.name, text, len as usize),
            other => Err(type_mismatch(layout, field, other)),
        },
        FieldType::Array(t, len) => {
            let items = value
                .as_array()
                .ok_or_else(|| type_mismatch(layout, field, value))?;
            if items.len() != len as usize {
                return Err(EncodeError::ArrayLength {
                    message: layout.name.clone(),
                    field: field.name.clone(),
                    expected: len as usize,
                    actual: items.len(),
                });
            }
            for item in items {
                write_primitive(writer, layout, field, t, item)?;
            }
            Ok(())
        }
    }
}

fn write_char(
    writer: &mut PayloadWriter,
    layout: &MessageLayout,
    field: &FieldLayout,
    value: &Value,
) -> Result<(), EncodeError> {
    match value {
        Value::Text(text) => writer.put_str(&layout.name, &field.name, text, 1),
        Value::Int(_) | Value::UInt(_) => {
            write_primitive(writer, layout, field, PrimitiveType::UInt8, value)
        }
        other => Err(type_mismatch(layout, field, other)),
    }
}

fn write_primitive(
    writer: &mut PayloadWriter,
    layout: &MessageLayout,
    field: &FieldLayout,
    t: PrimitiveType,
    value: &Value,
) -> Result<(), EncodeError> {
    if t.is_float() {
        let v = value
            .as_f64()
            .ok_or_else(|| type_mismatch(layout, field, value))?;
        match t {
            PrimitiveType::Float => {
                if v.is_finite() && v.abs() > f32::MAX as f64 {
                    return Err(out_of_range(layout, field, t, value));
                }
                writer.put_f32(v as f32);
            }
            _ => writer.put_f64(v),
        }
        return Ok(());
    }

    let v = value
        .as_i128()
        .ok_or_else(|| type_mismatch(layout, field, value))?;
    let (min, max) = t.int_range().unwrap_or((0, u8::MAX as i128));
    if v < min || v > max {
        return Err(out_of_range(layout, field, t, value));
    }

    // Range is checked above, casts below are lossless
    match t {
        PrimitiveType::Int8 => writer.put_i8(v as i8),
        PrimitiveType::Int16 => writer.put_i16(v as i16),
        PrimitiveType::Int32 => writer.put_i32(v as i32),
        PrimitiveType::Int64 => writer.put_i64(v as i64),
        PrimitiveType::UInt16 => writer.put_u16(v as u16),
        PrimitiveType::UInt32 => writer.put_u32(v as u32),
        PrimitiveType::UInt64 => writer.put_u64(v as u64),
        _ => writer.put_u8(v as u8),
    }
    Ok(())
}

fn read_primitive(reader: &mut PayloadReader, t: PrimitiveType) -> Value {
    match t {
        PrimitiveType::Int8 => reader.get_i8().into(),
        PrimitiveType::Int16 => reader.get_i16().into(),
        PrimitiveType::Int32 => reader.get_i32().into(),
        PrimitiveType::Int64 => reader.get_i64().into(),
        PrimitiveType::UInt16 => reader.get_u16().into(),
        PrimitiveType::UInt32 => reader.get_u32().into(),
        PrimitiveType::UInt64 => reader.get_u64().into(),
        PrimitiveType::Float => reader.get_f32().into(),
        PrimitiveType::Double => reader.get_f64().into(),
        PrimitiveType::UInt8 | PrimitiveType::UInt8MavlinkVersion | PrimitiveType::Char => {
            reader.get_u8().into()
        }
    }
}

fn type_mismatch(layout: &MessageLayout, field: &FieldLayout, value: &Value) -> EncodeError {
    log::trace!(
        "[{}] field `{}` got {}",
        layout.name,
        field.name,
        value.kind()
    );
    EncodeError::TypeMismatch {
        message: layout.name.clone(),
        field: field.name.clone(),
        expected: field.field_type.to_string(),
    }
}

fn out_of_range(
    layout: &MessageLayout,
    field: &FieldLayout,
    t: PrimitiveType,
    value: &Value,
) -> EncodeError {
    EncodeError::OutOfRange {
        message: layout.name.clone(),
        field: field.name.clone(),
        expected: t.to_string(),
        value: value.to_string(),
    }
}
