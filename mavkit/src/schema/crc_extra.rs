use crate::protocol::crc::MAV_CRC;
use crate::protocol::CrcExtra;
use crate::schema::Message;

/// Calculates CRC-extra fingerprint of a message layout.
///
/// The checksum runs over the message name and the canonical type, name, and array length of every
/// non-extension field in payload order. The resulting 16-bit value is folded into one byte.
///
/// Extension fields and documentation never affect the result. The value is cached by
/// [`Message::crc_extra`], use this function only when you need to recalculate it.
pub fn crc_extra(message: &Message) -> CrcExtra {
    let mut digest = MAV_CRC.digest();

    digest.update(message.name().as_bytes());
    digest.update(b" ");

    for field in message.base_fields() {
        let field_type = field.field_type();
        digest.update(field_type.primitive().canonical_name().as_bytes());
        digest.update(b" ");
        digest.update(field.name().as_bytes());
        digest.update(b" ");
        if let Some(len) = field_type.array_len() {
            digest.update(&[len]);
        }
    }

    let crc = digest.finalize();
    ((crc & 0xFF) ^ (crc >> 8)) as CrcExtra
}
