use std::collections::{BTreeMap, HashSet};

use crate::errors::SchemaError;
use crate::protocol::consts::{PAYLOAD_MAX_SIZE, MESSAGE_ID_V1_MAX, MESSAGE_ID_V2_MAX};
use crate::protocol::{CrcExtra, MessageId};
use crate::schema::{crc_extra, FieldType};

/// <sup>[`serde`](https://serde.rs)</sup>
/// MAVLink dialect: messages and enums from a root definition and all its includes.
///
/// Dialects are produced by [`DialectLoader`](crate::schema::DialectLoader) and are read-only
/// afterward.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Dialect {
    pub(crate) name: String,
    pub(crate) version: Option<u8>,
    pub(crate) dialect: Option<u32>,
    pub(crate) includes: Vec<String>,
    pub(crate) messages: BTreeMap<MessageId, Message>,
    pub(crate) enums: BTreeMap<String, Enum>,
}

/// <sup>[`serde`](https://serde.rs)</sup>
/// MAVLink message definition.
///
/// Field order is part of the wire contract. Payload layout places non-extension fields first,
/// ordered by primitive size from the largest to the smallest (declared order is kept for fields of
/// the same size). Extension fields follow in declared order.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Message {
    pub(crate) id: MessageId,
    pub(crate) name: String,
    pub(crate) description: Option<String>,
    pub(crate) deprecated: bool,
    pub(crate) fields: Vec<Field>,
    pub(crate) wire_order: Vec<usize>,
    pub(crate) extensions_offset: Option<usize>,
    pub(crate) crc_extra: CrcExtra,
    pub(crate) base_len: usize,
    pub(crate) max_len: usize,
}

/// <sup>[`serde`](https://serde.rs)</sup>
/// Message field definition.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Field {
    pub(crate) name: String,
    pub(crate) field_type: FieldType,
    pub(crate) is_extension: bool,
    pub(crate) enum_name: Option<String>,
    pub(crate) units: Option<String>,
    pub(crate) display: Option<String>,
    pub(crate) print_format: Option<String>,
    pub(crate) invalid: Option<String>,
    pub(crate) description: Option<String>,
}

/// <sup>[`serde`](https://serde.rs)</sup>
/// MAVLink enum. Purely descriptive, enums have no wire presence.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Enum {
    pub(crate) name: String,
    pub(crate) bitmask: bool,
    pub(crate) description: Option<String>,
    pub(crate) entries: Vec<EnumEntry>,
}

/// <sup>[`serde`](https://serde.rs)</sup>
/// MAVLink enum entry.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EnumEntry {
    pub(crate) value: u64,
    pub(crate) name: String,
    pub(crate) description: Option<String>,
}

impl Dialect {
    /// Dialect name (stem of the root definition file).
    #[inline]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Dialect version from the root definition.
    #[inline]
    pub fn version(&self) -> Option<u8> {
        self.version
    }

    /// Dialect number from the root definition.
    #[inline]
    pub fn dialect(&self) -> Option<u32> {
        self.dialect
    }

    /// Names of all included definitions in the order they were resolved.
    pub fn includes(&self) -> impl Iterator<Item = &str> {
        self.includes.iter().map(String::as_str)
    }

    /// Messages ordered by ID.
    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.messages.values()
    }

    /// Enums ordered by name.
    pub fn enums(&self) -> impl Iterator<Item = &Enum> {
        self.enums.values()
    }

    /// Message by ID.
    pub fn message(&self, id: MessageId) -> Option<&Message> {
        self.messages.get(&id)
    }

    /// Message by name.
    pub fn message_by_name(&self, name: &str) -> Option<&Message> {
        self.messages.values().find(|msg| msg.name == name)
    }

    /// Enum by name.
    pub fn enum_by_name(&self, name: &str) -> Option<&Enum> {
        self.enums.get(name)
    }
}

impl Message {
    /// Creates a message definition from its fields in declared order.
    ///
    /// Validates field names, extension placement, and payload size, then calculates the payload
    /// layout and [`Message::crc_extra`].
    pub fn new(id: u64, name: impl Into<String>, fields: Vec<Field>) -> Result<Self, SchemaError> {
        let name = name.into();

        if id > MESSAGE_ID_V2_MAX as u64 {
            return Err(SchemaError::MessageIdOutOfRange { name, id });
        }
        if fields.is_empty() {
            return Err(SchemaError::EmptyMessage(name));
        }

        let mut seen = HashSet::new();
        for field in &fields {
            if !seen.insert(field.name.as_str()) {
                return Err(SchemaError::DuplicateField {
                    message: name,
                    field: field.name.clone(),
                });
            }
            if field.field_type.array_len() == Some(0) {
                return Err(SchemaError::ZeroLengthArray {
                    message: name,
                    field: field.name.clone(),
                });
            }
        }

        let extensions_offset = fields.iter().position(|f| f.is_extension);
        if let Some(offset) = extensions_offset {
            if let Some(field) = fields[offset..].iter().find(|f| !f.is_extension) {
                return Err(SchemaError::MisplacedExtension {
                    message: name,
                    field: field.name.clone(),
                });
            }
        }

        let base_end = extensions_offset.unwrap_or(fields.len());
        let mut wire_order: Vec<usize> = (0..base_end).collect();
        // `sort_by` is stable, fields of the same size keep declared order
        wire_order.sort_by(|&a, &b| {
            let a = fields[a].field_type.primitive().size();
            let b = fields[b].field_type.primitive().size();
            b.cmp(&a)
        });
        wire_order.extend(base_end..fields.len());

        let base_len: usize = fields[..base_end].iter().map(Field::size).sum();
        let max_len: usize = fields.iter().map(Field::size).sum();
        if max_len > PAYLOAD_MAX_SIZE {
            return Err(SchemaError::PayloadTooLarge {
                name,
                size: max_len,
            });
        }

        let mut message = Self {
            id: id as MessageId,
            name,
            description: None,
            deprecated: false,
            fields,
            wire_order,
            extensions_offset,
            crc_extra: 0,
            base_len,
            max_len,
        };
        message.crc_extra = crc_extra(&message);

        Ok(message)
    }

    /// Sets message description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Marks message as deprecated.
    pub fn with_deprecated(mut self, deprecated: bool) -> Self {
        self.deprecated = deprecated;
        self
    }

    /// Message `ID`.
    #[inline]
    pub fn id(&self) -> MessageId {
        self.id
    }

    /// Message name as in definitions (`SCREAMING_SNAKE_CASE`).
    #[inline]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Message description.
    #[inline]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Whether message is deprecated.
    #[inline]
    pub fn deprecated(&self) -> bool {
        self.deprecated
    }

    /// Fields in declared order.
    #[inline]
    pub fn fields(&self) -> &[Field] {
        self.fields.as_slice()
    }

    /// Fields in payload order.
    pub fn wire_fields(&self) -> impl Iterator<Item = &Field> {
        self.wire_order.iter().map(|&idx| &self.fields[idx])
    }

    /// Non-extension fields in payload order.
    ///
    /// These are the fields that contribute to [`Message::crc_extra`].
    pub fn base_fields(&self) -> impl Iterator<Item = &Field> {
        self.wire_fields().filter(|f| !f.is_extension)
    }

    /// Extension fields in declared order.
    pub fn extension_fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(|f| f.is_extension)
    }

    /// Index of the first extension field in declared order.
    #[inline]
    pub fn extensions_offset(&self) -> Option<usize> {
        self.extensions_offset
    }

    /// CRC-extra fingerprint of the message layout.
    #[inline]
    pub fn crc_extra(&self) -> CrcExtra {
        self.crc_extra
    }

    /// Payload length for `MAVLink 1` (extension fields excluded).
    #[inline]
    pub fn base_len(&self) -> usize {
        self.base_len
    }

    /// Untruncated payload length for `MAVLink 2`.
    #[inline]
    pub fn max_len(&self) -> usize {
        self.max_len
    }

    /// Whether the message can be sent as `MAVLink 1`.
    #[inline]
    pub fn is_v1_compatible(&self) -> bool {
        self.id <= MESSAGE_ID_V1_MAX
    }

    /// Field by name.
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Returns `true` if both definitions describe the same message on the wire.
    ///
    /// Documentation and metadata are ignored.
    pub fn same_layout(&self, other: &Message) -> bool {
        self.id == other.id
            && self.name == other.name
            && self.fields.len() == other.fields.len()
            && self.fields.iter().zip(other.fields.iter()).all(|(a, b)| {
                a.name == b.name
                    && a.field_type == b.field_type
                    && a.is_extension == b.is_extension
            })
    }
}

impl Field {
    /// Creates a regular (non-extension) field.
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            is_extension: false,
            enum_name: None,
            units: None,
            display: None,
            print_format: None,
            invalid: None,
            description: None,
        }
    }

    /// Marks field as an extension field.
    pub fn with_extension(mut self, is_extension: bool) -> Self {
        self.is_extension = is_extension;
        self
    }

    /// Binds field to an enum.
    pub fn with_enum(mut self, enum_name: impl Into<String>) -> Self {
        self.enum_name = Some(enum_name.into());
        self
    }

    /// Sets field units.
    pub fn with_units(mut self, units: impl Into<String>) -> Self {
        self.units = Some(units.into());
        self
    }

    /// Sets field description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

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

    /// Whether field is an extension field.
    #[inline]
    pub fn is_extension(&self) -> bool {
        self.is_extension
    }

    /// Name of the enum that describes field values.
    #[inline]
    pub fn enum_name(&self) -> Option<&str> {
        self.enum_name.as_deref()
    }

    /// Units of measurement.
    #[inline]
    pub fn units(&self) -> Option<&str> {
        self.units.as_deref()
    }

    /// Display hint (for example, `bitmask`).
    #[inline]
    pub fn display(&self) -> Option<&str> {
        self.display.as_deref()
    }

    /// Print format hint.
    #[inline]
    pub fn print_format(&self) -> Option<&str> {
        self.print_format.as_deref()
    }

    /// Value that marks field as invalid.
    #[inline]
    pub fn invalid(&self) -> Option<&str> {
        self.invalid.as_deref()
    }

    /// Field description.
    #[inline]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Size of the field in payload.
    #[inline]
    pub fn size(&self) -> usize {
        self.field_type.size()
    }
}

impl Enum {
    /// Creates an empty enum.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Enum name.
    #[inline]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Whether enum describes bit flags.
    #[inline]
    pub fn bitmask(&self) -> bool {
        self.bitmask
    }

    /// Enum description.
    #[inline]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Enum entries in declared order.
    #[inline]
    pub fn entries(&self) -> &[EnumEntry] {
        self.entries.as_slice()
    }

    /// Entry by value.
    pub fn entry(&self, value: u64) -> Option<&EnumEntry> {
        self.entries.iter().find(|e| e.value == value)
    }

    /// Adds entries from another definition of the same enum.
    ///
    /// Entries already present are skipped. An entry name bound to a different value, or a value
    /// bound to a different name, is a [`SchemaError::ConflictingEnumEntry`].
    pub(crate) fn merge(&mut self, other: Enum) -> Result<(), SchemaError> {
        for entry in other.entries {
            let same_name = self.entries.iter().find(|e| e.name == entry.name);
            let same_value = self.entries.iter().find(|e| e.value == entry.value);

            match (same_name, same_value) {
                (None, None) => {
                    log::trace!("[{}] merging entry {}", self.name, entry.name);
                    self.entries.push(entry);
                }
                (Some(a), Some(b)) if a.name == b.name => {}
                _ => {
                    return Err(SchemaError::ConflictingEnumEntry {
                        name: self.name.clone(),
                        entry: entry.name,
                    })
                }
            }
        }

        self.bitmask |= other.bitmask;
        if self.description.is_none() {
            self.description = other.description;
        }

        Ok(())
    }
}

impl EnumEntry {
    /// Creates an enum entry.
    pub fn new(value: u64, name: impl Into<String>) -> Self {
        Self {
            value,
            name: name.into(),
            description: None,
        }
    }

    /// Entry value.
    #[inline]
    pub fn value(&self) -> u64 {
        self.value
    }

    /// Entry name.
    #[inline]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Entry description.
    #[inline]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

#[cfg(test)]
mod model_tests {
    use super::*;
    use crate::schema::PrimitiveType;

    fn scalar(name: &str, t: PrimitiveType) -> Field {
        Field::new(name, FieldType::Scalar(t))
    }

    #[test]
    fn payload_layout() {
        let message = Message::new(
            22,
            "PARAM_VALUE",
            vec![
                Field::new("param_id", FieldType::Array(PrimitiveType::Char, 16)),
                scalar("param_value", PrimitiveType::Float),
                scalar("param_type", PrimitiveType::UInt8),
                scalar("param_count", PrimitiveType::UInt16),
                scalar("param_index", PrimitiveType::UInt16),
            ],
        )
        .unwrap();

        let order: Vec<&str> = message.wire_fields().map(Field::name).collect();
        assert_eq!(
            order,
            vec![
                "param_value",
                "param_count",
                "param_index",
                "param_id",
                "param_type"
            ]
        );
        assert_eq!(message.base_len(), 25);
        assert_eq!(message.max_len(), 25);
        assert_eq!(message.extensions_offset(), None);
        assert!(message.is_v1_compatible());
    }

    #[test]
    fn extensions_stay_last() {
        let message = Message::new(
            300,
            "EXT",
            vec![
                scalar("a", PrimitiveType::UInt8),
                scalar("b", PrimitiveType::UInt32),
                scalar("c", PrimitiveType::Double).with_extension(true),
                scalar("d", PrimitiveType::UInt8).with_extension(true),
            ],
        )
        .unwrap();

        let order: Vec<&str> = message.wire_fields().map(Field::name).collect();
        assert_eq!(order, vec!["b", "a", "c", "d"]);
        assert_eq!(message.extensions_offset(), Some(2));
        assert_eq!(message.base_len(), 5);
        assert_eq!(message.max_len(), 14);
        assert!(!message.is_v1_compatible());
    }

    #[test]
    fn invalid_messages_are_rejected() {
        assert!(matches!(
            Message::new(1, "EMPTY", vec![]),
            Err(SchemaError::EmptyMessage(_))
        ));
        assert!(matches!(
            Message::new(
                1,
                "DUP",
                vec![
                    scalar("a", PrimitiveType::UInt8),
                    scalar("a", PrimitiveType::UInt16)
                ]
            ),
            Err(SchemaError::DuplicateField { .. })
        ));
        assert!(matches!(
            Message::new(
                1,
                "ZERO",
                vec![Field::new("a", FieldType::Array(PrimitiveType::Float, 0))]
            ),
            Err(SchemaError::ZeroLengthArray { .. })
        ));
        assert!(matches!(
            Message::new(
                1,
                "EXT",
                vec![
                    scalar("a", PrimitiveType::UInt8).with_extension(true),
                    scalar("b", PrimitiveType::UInt8)
                ]
            ),
            Err(SchemaError::MisplacedExtension { .. })
        ));
        assert!(matches!(
            Message::new(
                1,
                "HUGE",
                vec![
                    Field::new("a", FieldType::Array(PrimitiveType::Double, 30)),
                    Field::new("b", FieldType::Array(PrimitiveType::Double, 30))
                ]
            ),
            Err(SchemaError::PayloadTooLarge { size: 480, .. })
        ));
        assert!(matches!(
            Message::new(1 << 24, "FAR", vec![scalar("a", PrimitiveType::UInt8)]),
            Err(SchemaError::MessageIdOutOfRange { .. })
        ));
    }

    #[test]
    fn enum_merge() {
        let mut base = Enum::new("MAV_STATE");
        base.entries.push(EnumEntry::new(0, "MAV_STATE_UNINIT"));

        let mut ext = Enum::new("MAV_STATE");
        ext.entries.push(EnumEntry::new(0, "MAV_STATE_UNINIT"));
        ext.entries.push(EnumEntry::new(1, "MAV_STATE_BOOT"));
        base.merge(ext).unwrap();
        assert_eq!(base.entries().len(), 2);

        let mut conflict = Enum::new("MAV_STATE");
        conflict.entries.push(EnumEntry::new(2, "MAV_STATE_BOOT"));
        assert!(matches!(
            base.merge(conflict),
            Err(SchemaError::ConflictingEnumEntry { .. })
        ));
    }
}
