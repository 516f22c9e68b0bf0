use crc::{Crc, CRC_16_MCRF4XX};

use crate::protocol::{Checksum, CrcExtra};

/// MAVLink checksum: `CRC-16/MCRF4XX` (also known as X.25 checksum with seed `0xFFFF`).
pub(crate) const MAV_CRC: Crc<u16> = Crc::<u16>::new(&CRC_16_MCRF4XX);

/// Calculates frame checksum.
///
/// `header` excludes the start marker, `crc_extra` of the message is appended to the checksum input.
pub fn checksum(header: &[u8], payload: &[u8], crc_extra: CrcExtra) -> Checksum {
    let mut digest = MAV_CRC.digest();
    digest.update(header);
    digest.update(payload);
    digest.update(&[crc_extra]);
    digest.finalize()
}
