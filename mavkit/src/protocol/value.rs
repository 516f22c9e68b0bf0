use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use crate::protocol::MessageId;

/// <sup>[`serde`](https://serde.rs)</sup>
/// Dynamically typed field value.
///
/// Used to encode and decode messages of a dialect loaded at runtime. Integer variants are
/// interchangeable as long as the value fits the declared field type.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Value {
    /// Signed integer.
    Int(i64),
    /// Unsigned integer.
    UInt(u64),
    /// Floating point number.
    Float(f64),
    /// String for `char` arrays.
    Text(String),
    /// Fixed-length array.
    Array(Vec<Value>),
}

/// <sup>[`serde`](https://serde.rs)</sup>
/// Dynamically typed message: message `ID` with named field values.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MessageValue {
    id: MessageId,
    fields: BTreeMap<String, Value>,
}

impl Value {
    /// Numeric value as `i128` if this is an integer.
    pub fn as_i128(&self) -> Option<i128> {
        match self {
            Value::Int(v) => Some(*v as i128),
            Value::UInt(v) => Some(*v as i128),
            _ => None,
        }
    }

    /// Numeric value as `f64` for any numeric variant.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::UInt(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// String slice for [`Value::Text`].
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(v) => Some(v.as_str()),
            _ => None,
        }
    }

    /// Elements of [`Value::Array`].
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(v) => Some(v.as_slice()),
            _ => None,
        }
    }

    /// Short description of the variant for error messages.
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Value::Int(_) => "integer",
            Value::UInt(_) => "unsigned integer",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::Array(_) => "array",
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            Value::UInt(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Text(v) => write!(f, "{v:?}"),
            Value::Array(values) => {
                f.write_str("[")?;
                for (idx, value) in values.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{value}")?;
                }
                f.write_str("]")
            }
        }
    }
}

macro_rules! impl_from_value {
    ($variant:ident, $target:ty, [$($t:ty),*]) => {
        $(
            impl From<$t> for Value {
                fn from(value: $t) -> Self {
                    Value::$variant(value as $target)
                }
            }
        )*
    };
}

impl_from_value!(Int, i64, [i8, i16, i32, i64]);
impl_from_value!(UInt, u64, [u8, u16, u32, u64]);
impl_from_value!(Float, f64, [f32, f64]);

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(value: Vec<T>) -> Self {
        Value::Array(value.into_iter().map(Into::into).collect())
    }
}

impl MessageValue {
    /// Creates an empty message value.
    pub fn new(id: MessageId) -> Self {
        Self {
            id,
            fields: BTreeMap::new(),
        }
    }

    /// Sets field value and returns updated message.
    ///
    /// # Usage
    ///
    /// ```rust
    /// use mavkit::protocol::{MessageValue, Value};
    ///
    /// let heartbeat = MessageValue::new(0)
    ///     .with("type", 6u8)
    ///     .with("custom_mode", 0u32);
    ///
    /// assert_eq!(heartbeat.get("type"), Some(&Value::UInt(6)));
    /// ```
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(field, value);
        self
    }

    /// Sets field value.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(field.into(), value.into());
    }

    /// Message `ID`.
    #[inline]
    pub fn id(&self) -> MessageId {
        self.id
    }

    /// Field value.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Fields ordered by name.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub(crate) fn field_map(&self) -> &BTreeMap<String, Value> {
        &self.fields
    }
}
