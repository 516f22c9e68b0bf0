use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::errors::SchemaError;
use crate::schema::{Enum, EnumEntry, Field, FieldType, Message};

/// Contents of a single definition file before includes are merged.
#[derive(Clone, Debug, Default)]
pub(crate) struct RawDefinition {
    pub(crate) includes: Vec<String>,
    pub(crate) version: Option<u8>,
    pub(crate) dialect: Option<u32>,
    pub(crate) enums: Vec<Enum>,
    pub(crate) messages: Vec<Message>,
}

#[derive(Debug)]
struct MessageDraft {
    id: u64,
    name: String,
    description: Option<String>,
    deprecated: bool,
    in_extensions: bool,
    fields: Vec<Field>,
}

/// Parses MAVLink XML definition.
///
/// `file` is used only for error reporting.
pub(crate) fn parse_definition(file: &str, source: &str) -> Result<RawDefinition, SchemaError> {
    let mut reader = Reader::from_str(source);
    reader.trim_text(true);

    let mut parser = DefinitionParser::new(file);

    loop {
        let position = reader.buffer_position();
        let event = reader
            .read_event()
            .map_err(|err| parser.xml_error(position, err))?;

        match event {
            Event::Start(e) => parser.start(&e, position)?,
            Event::Empty(e) => {
                parser.start(&e, position)?;
                parser.end(position)?;
            }
            Event::End(_) => parser.end(position)?,
            Event::Text(e) => {
                let text = e.unescape().map_err(|err| parser.xml_error(position, err))?;
                parser.text(&text)?;
            }
            Event::CData(e) => {
                let text = String::from_utf8_lossy(&e).into_owned();
                parser.text(&text)?;
            }
            Event::Eof => break,
            _ => {}
        }
    }

    parser.finish(reader.buffer_position())
}

struct DefinitionParser<'a> {
    file: &'a str,
    stack: Vec<String>,
    definition: RawDefinition,
    message: Option<MessageDraft>,
    field: Option<Field>,
    mav_enum: Option<Enum>,
    entry: Option<EnumEntry>,
    next_entry_value: u64,
}

impl<'a> DefinitionParser<'a> {
    fn new(file: &'a str) -> Self {
        Self {
            file,
            stack: Vec::new(),
            definition: RawDefinition::default(),
            message: None,
            field: None,
            mav_enum: None,
            entry: None,
            next_entry_value: 0,
        }
    }

    fn start(&mut self, e: &BytesStart, position: usize) -> Result<(), SchemaError> {
        let element = String::from_utf8_lossy(e.name().as_ref()).into_owned();

        if self.stack.is_empty() && element != "mavlink" {
            return Err(SchemaError::Xml {
                file: self.file.to_string(),
                position,
                reason: format!("root element must be `mavlink`, got `{element}`"),
            });
        }

        match element.as_str() {
            "enum" if self.parent_is("enums") => {
                let mut mav_enum = Enum::new(self.required(e, &element, "name", position)?);
                mav_enum.bitmask = self
                    .optional(e, "bitmask", position)?
                    .is_some_and(|v| v == "true");
                self.mav_enum = Some(mav_enum);
                self.next_entry_value = 0;
            }
            "entry" if self.mav_enum.is_some() => {
                let name = self.required(e, &element, "name", position)?;
                let value = match self.optional(e, "value", position)? {
                    Some(value) => parse_u64(&value).ok_or_else(|| SchemaError::InvalidValue {
                        file: self.file.to_string(),
                        context: format!("value of enum entry `{name}`"),
                        value,
                    })?,
                    None => self.next_entry_value,
                };
                self.next_entry_value = value.saturating_add(1);
                self.entry = Some(EnumEntry::new(value, name));
            }
            "message" if self.parent_is("messages") => {
                let name = self.required(e, &element, "name", position)?;
                let raw_id = self.required(e, &element, "id", position)?;
                let id = parse_u64(&raw_id).ok_or_else(|| SchemaError::InvalidValue {
                    file: self.file.to_string(),
                    context: format!("id of message `{name}`"),
                    value: raw_id,
                })?;
                self.message = Some(MessageDraft {
                    id,
                    name,
                    description: None,
                    deprecated: false,
                    in_extensions: false,
                    fields: Vec::new(),
                });
            }
            "extensions" if self.parent_is("message") => {
                if let Some(message) = self.message.as_mut() {
                    message.in_extensions = true;
                }
            }
            "deprecated" if self.parent_is("message") => {
                if let Some(message) = self.message.as_mut() {
                    message.deprecated = true;
                }
            }
            "field" if self.parent_is("message") => {
                self.field = Some(self.parse_field(e, position)?);
            }
            _ => {}
        }

        self.stack.push(element);
        Ok(())
    }

    fn end(&mut self, position: usize) -> Result<(), SchemaError> {
        let element = self.stack.pop().unwrap_or_default();

        match element.as_str() {
            "field" => {
                if let (Some(field), Some(message)) = (self.field.take(), self.message.as_mut()) {
                    message.fields.push(field);
                }
            }
            "message" => {
                if let Some(draft) = self.message.take() {
                    let message = self.finish_message(draft)?;
                    log::trace!("[{}] parsed message {}", self.file, message.name());
                    self.definition.messages.push(message);
                }
            }
            "entry" => {
                if let (Some(entry), Some(mav_enum)) = (self.entry.take(), self.mav_enum.as_mut())
                {
                    mav_enum.entries.push(entry);
                }
            }
            "enum" => {
                if let Some(mav_enum) = self.mav_enum.take() {
                    self.definition.enums.push(mav_enum);
                }
            }
            "" => {
                return Err(SchemaError::Xml {
                    file: self.file.to_string(),
                    position,
                    reason: "unexpected closing tag".to_string(),
                })
            }
            _ => {}
        }

        Ok(())
    }

    fn text(&mut self, text: &str) -> Result<(), SchemaError> {
        let current = self.stack.last().map(String::as_str).unwrap_or_default();
        let parent = self
            .stack
            .len()
            .checked_sub(2)
            .and_then(|idx| self.stack.get(idx))
            .map(String::as_str)
            .unwrap_or_default();
        let text = text.trim();

        match (parent, current) {
            ("mavlink", "include") => self.definition.includes.push(text.to_string()),
            ("mavlink", "version") => {
                self.definition.version = Some(self.parse_number(text, "version")?);
            }
            ("mavlink", "dialect") => {
                self.definition.dialect = Some(self.parse_number(text, "dialect")?);
            }
            (_, "field") => {
                if let Some(field) = self.field.as_mut() {
                    append(&mut field.description, text);
                }
            }
            ("message", "description") => {
                if let Some(message) = self.message.as_mut() {
                    append(&mut message.description, text);
                }
            }
            ("enum", "description") => {
                if let Some(mav_enum) = self.mav_enum.as_mut() {
                    append(&mut mav_enum.description, text);
                }
            }
            ("entry", "description") => {
                if let Some(entry) = self.entry.as_mut() {
                    append(&mut entry.description, text);
                }
            }
            _ => {}
        }

        Ok(())
    }

    fn finish(self, position: usize) -> Result<RawDefinition, SchemaError> {
        if !self.stack.is_empty() {
            return Err(SchemaError::Xml {
                file: self.file.to_string(),
                position,
                reason: format!("unclosed element `{}`", self.stack.join("/")),
            });
        }
        Ok(self.definition)
    }

    fn parse_field(&self, e: &BytesStart, position: usize) -> Result<Field, SchemaError> {
        let name = self.required(e, "field", "name", position)?;
        let type_name = self.required(e, "field", "type", position)?;
        let message = self
            .message
            .as_ref()
            .map(|m| m.name.clone())
            .unwrap_or_default();

        let field_type = FieldType::parse(&type_name).ok_or_else(|| SchemaError::UnknownType {
            message: message.clone(),
            field: name.clone(),
            type_name: type_name.clone(),
        })?;

        let mut field = Field::new(name, field_type).with_extension(
            self.message
                .as_ref()
                .map(|m| m.in_extensions)
                .unwrap_or_default(),
        );
        field.enum_name = self.optional(e, "enum", position)?;
        field.units = self.optional(e, "units", position)?;
        field.display = self.optional(e, "display", position)?;
        field.print_format = self.optional(e, "print_format", position)?;
        field.invalid = self.optional(e, "invalid", position)?;

        Ok(field)
    }

    fn finish_message(&self, draft: MessageDraft) -> Result<Message, SchemaError> {
        let mut message = Message::new(draft.id, draft.name, draft.fields)?;
        message.description = draft.description;
        message.deprecated = draft.deprecated;
        Ok(message)
    }

    fn parent_is(&self, element: &str) -> bool {
        self.stack.last().is_some_and(|last| last == element)
    }

    fn required(
        &self,
        e: &BytesStart,
        element: &str,
        attribute: &str,
        position: usize,
    ) -> Result<String, SchemaError> {
        self.optional(e, attribute, position)?
            .ok_or_else(|| SchemaError::MissingAttribute {
                file: self.file.to_string(),
                element: element.to_string(),
                attribute: attribute.to_string(),
            })
    }

    fn optional(
        &self,
        e: &BytesStart,
        attribute: &str,
        position: usize,
    ) -> Result<Option<String>, SchemaError> {
        for attr in e.attributes() {
            let attr = attr.map_err(|err| self.xml_error(position, err))?;
            if attr.key.as_ref() == attribute.as_bytes() {
                let value = attr
                    .unescape_value()
                    .map_err(|err| self.xml_error(position, err))?;
                return Ok(Some(value.trim().to_string()));
            }
        }
        Ok(None)
    }

    fn parse_number<T: TryFrom<u64>>(&self, text: &str, context: &str) -> Result<T, SchemaError> {
        parse_u64(text)
            .and_then(|value| T::try_from(value).ok())
            .ok_or_else(|| SchemaError::InvalidValue {
                file: self.file.to_string(),
                context: context.to_string(),
                value: text.to_string(),
            })
    }

    fn xml_error(&self, position: usize, err: impl std::fmt::Display) -> SchemaError {
        SchemaError::Xml {
            file: self.file.to_string(),
            position,
            reason: err.to_string(),
        }
    }
}

fn append(target: &mut Option<String>, text: &str) {
    if text.is_empty() {
        return;
    }
    match target {
        Some(existing) => {
            existing.push(' ');
            existing.push_str(text);
        }
        None => *target = Some(text.to_string()),
    }
}

/// Parses decimal or `0x`-prefixed hexadecimal number.
pub(crate) fn parse_u64(value: &str) -> Option<u64> {
    let value = value.trim();
    match value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
    {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => value.parse().ok(),
    }
}
