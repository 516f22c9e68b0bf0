use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// <sup>[`serde`](https://serde.rs)</sup>
/// MAVLink primitive type.
///
/// This is the fixed type table of MAVLink definitions. Any other type token is rejected during
/// dialect loading.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PrimitiveType {
    /// `int8_t`
    Int8,
    /// `uint8_t`
    UInt8,
    /// `int16_t`
    Int16,
    /// `uint16_t`
    UInt16,
    /// `int32_t`
    Int32,
    /// `uint32_t`
    UInt32,
    /// `int64_t`
    Int64,
    /// `uint64_t`
    UInt64,
    /// `float`
    Float,
    /// `double`
    Double,
    /// `char`
    Char,
    /// `uint8_t_mavlink_version`
    ///
    /// Behaves exactly as `uint8_t` on the wire and in CRC-extra calculation.
    UInt8MavlinkVersion,
}

/// <sup>[`serde`](https://serde.rs)</sup>
/// Field type: either a single primitive or a fixed-length array of primitives.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FieldType {
    /// Single value.
    Scalar(PrimitiveType),
    /// Fixed-length array.
    ///
    /// Length is always positive.
    Array(PrimitiveType, u8),
}

impl PrimitiveType {
    /// All supported primitive types.
    pub const ALL: [PrimitiveType; 12] = [
        PrimitiveType::Int8,
        PrimitiveType::UInt8,
        PrimitiveType::Int16,
        PrimitiveType::UInt16,
        PrimitiveType::Int32,
        PrimitiveType::UInt32,
        PrimitiveType::Int64,
        PrimitiveType::UInt64,
        PrimitiveType::Float,
        PrimitiveType::Double,
        PrimitiveType::Char,
        PrimitiveType::UInt8MavlinkVersion,
    ];

    /// Size in bytes.
    pub fn size(&self) -> usize {
        match self {
            PrimitiveType::Int8
            | PrimitiveType::UInt8
            | PrimitiveType::Char
            | PrimitiveType::UInt8MavlinkVersion => 1,
            PrimitiveType::Int16 | PrimitiveType::UInt16 => 2,
            PrimitiveType::Int32 | PrimitiveType::UInt32 | PrimitiveType::Float => 4,
            PrimitiveType::Int64 | PrimitiveType::UInt64 | PrimitiveType::Double => 8,
        }
    }

    /// Type token as written in MAVLink definitions.
    pub fn token(&self) -> &'static str {
        match self {
            PrimitiveType::Int8 => "int8_t",
            PrimitiveType::UInt8 => "uint8_t",
            PrimitiveType::Int16 => "int16_t",
            PrimitiveType::UInt16 => "uint16_t",
            PrimitiveType::Int32 => "int32_t",
            PrimitiveType::UInt32 => "uint32_t",
            PrimitiveType::Int64 => "int64_t",
            PrimitiveType::UInt64 => "uint64_t",
            PrimitiveType::Float => "float",
            PrimitiveType::Double => "double",
            PrimitiveType::Char => "char",
            PrimitiveType::UInt8MavlinkVersion => "uint8_t_mavlink_version",
        }
    }

    /// Canonical type name used for CRC-extra calculation.
    pub fn canonical_name(&self) -> &'static str {
        match self {
            PrimitiveType::UInt8MavlinkVersion => "uint8_t",
            other => other.token(),
        }
    }

    /// Returns `true` for signed integer types.
    pub fn is_signed(&self) -> bool {
        matches!(
            self,
            PrimitiveType::Int8 | PrimitiveType::Int16 | PrimitiveType::Int32 | PrimitiveType::Int64
        )
    }

    /// Returns `true` for unsigned integer types (excluding `char`).
    pub fn is_unsigned(&self) -> bool {
        matches!(
            self,
            PrimitiveType::UInt8
                | PrimitiveType::UInt16
                | PrimitiveType::UInt32
                | PrimitiveType::UInt64
                | PrimitiveType::UInt8MavlinkVersion
        )
    }

    /// Returns `true` for `float` and `double`.
    pub fn is_float(&self) -> bool {
        matches!(self, PrimitiveType::Float | PrimitiveType::Double)
    }

    /// Inclusive integer range representable by this type.
    ///
    /// Returns [`None`] for floating point types and `char`.
    pub fn int_range(&self) -> Option<(i128, i128)> {
        let range = match self {
            PrimitiveType::Int8 => (i8::MIN as i128, i8::MAX as i128),
            PrimitiveType::Int16 => (i16::MIN as i128, i16::MAX as i128),
            PrimitiveType::Int32 => (i32::MIN as i128, i32::MAX as i128),
            PrimitiveType::Int64 => (i64::MIN as i128, i64::MAX as i128),
            PrimitiveType::UInt8 | PrimitiveType::UInt8MavlinkVersion => (0, u8::MAX as i128),
            PrimitiveType::UInt16 => (0, u16::MAX as i128),
            PrimitiveType::UInt32 => (0, u32::MAX as i128),
            PrimitiveType::UInt64 => (0, u64::MAX as i128),
            PrimitiveType::Float | PrimitiveType::Double | PrimitiveType::Char => return None,
        };
        Some(range)
    }
}

impl FromStr for PrimitiveType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PrimitiveType::ALL
            .iter()
            .find(|t| t.token() == s)
            .copied()
            .ok_or(())
    }
}

impl Display for PrimitiveType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.token())
    }
}

impl FieldType {
    /// Underlying primitive type.
    #[inline]
    pub fn primitive(&self) -> PrimitiveType {
        match self {
            FieldType::Scalar(t) | FieldType::Array(t, _) => *t,
        }
    }

    /// Array length or [`None`] for scalars.
    #[inline]
    pub fn array_len(&self) -> Option<u8> {
        match self {
            FieldType::Scalar(_) => None,
            FieldType::Array(_, len) => Some(*len),
        }
    }

    /// Size of the field in payload.
    pub fn size(&self) -> usize {
        match self {
            FieldType::Scalar(t) => t.size(),
            FieldType::Array(t, len) => t.size() * *len as usize,
        }
    }

    /// Parses a type token such as `uint16_t` or `char[16]`.
    ///
    /// Returns [`None`] for unknown primitives and malformed array lengths. A zero length is
    /// accepted here and rejected by the loader with a dedicated error.
    pub fn parse(token: &str) -> Option<FieldType> {
        let token = token.trim();
        match token.split_once('[') {
            None => PrimitiveType::from_str(token).ok().map(FieldType::Scalar),
            Some((base, rest)) => {
                let len = rest.strip_suffix(']')?.trim().parse::<u8>().ok()?;
                let primitive = PrimitiveType::from_str(base.trim()).ok()?;
                if primitive == PrimitiveType::UInt8MavlinkVersion {
                    return None;
                }
                Some(FieldType::Array(primitive, len))
            }
        }
    }
}

impl Display for FieldType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldType::Scalar(t) => write!(f, "{t}"),
            FieldType::Array(t, len) => write!(f, "{t}[{len}]"),
        }
    }
}

#[cfg(test)]
mod types_tests {
    use super::*;

    #[test]
    fn parse_field_types() {
        assert_eq!(
            FieldType::parse("uint16_t"),
            Some(FieldType::Scalar(PrimitiveType::UInt16))
        );
        assert_eq!(
            FieldType::parse("char[16]"),
            Some(FieldType::Array(PrimitiveType::Char, 16))
        );
        assert_eq!(
            FieldType::parse("float[0]"),
            Some(FieldType::Array(PrimitiveType::Float, 0))
        );
        assert_eq!(FieldType::parse("uint128_t"), None);
        assert_eq!(FieldType::parse("float[4"), None);
        assert_eq!(FieldType::parse("uint8_t_mavlink_version[2]"), None);
        assert_eq!(FieldType::parse("char[256]"), None);
    }

    #[test]
    fn sizes_and_names() {
        assert_eq!(FieldType::Array(PrimitiveType::Double, 3).size(), 24);
        assert_eq!(PrimitiveType::UInt8MavlinkVersion.size(), 1);
        assert_eq!(PrimitiveType::UInt8MavlinkVersion.canonical_name(), "uint8_t");
        assert_eq!(
            FieldType::Array(PrimitiveType::Char, 16).to_string(),
            "char[16]"
        );
        assert_eq!(PrimitiveType::Int8.int_range(), Some((-128, 127)));
        assert_eq!(PrimitiveType::Float.int_range(), None);
    }
}
