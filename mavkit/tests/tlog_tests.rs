use std::time::{Duration, UNIX_EPOCH};

use mavkit::io::{TlogReader, TlogRecord, TlogWriter};
use mavkit::protocol::{DialectTable, Encoder, MavLinkVersion, MessageValue};
use mavkit::schema::{DialectLoader, FsResolver};

fn table() -> DialectTable {
    let resolver = FsResolver::new([concat!(env!("CARGO_MANIFEST_DIR"), "/tests/definitions")]);
    DialectTable::new(&DialectLoader::new(resolver).load("common").unwrap())
}

fn attitude(time_boot_ms: u32) -> MessageValue {
    MessageValue::new(30)
        .with("time_boot_ms", time_boot_ms)
        .with("roll", 0.5f32)
        .with("pitch", 0.0f32)
        .with("yaw", -1.5f32)
        .with("rollspeed", 0.0f32)
        .with("pitchspeed", 0.0f32)
        .with("yawspeed", 0.0f32)
}

#[test]
fn replay_log_file() {
    let table = table();
    let path = std::env::temp_dir().join(format!("mavkit-{}.tlog", std::process::id()));
    let start = UNIX_EPOCH + Duration::from_secs(1_700_000_000);

    {
        let file = std::fs::File::create(&path).unwrap();
        let mut writer = TlogWriter::new(std::io::BufWriter::new(file));
        let mut v2 = Encoder::new(MavLinkVersion::V2, 1, 1);
        let mut v1 = Encoder::new(MavLinkVersion::V1, 1, 1);

        for i in 0..10u32 {
            let encoder = if i % 2 == 0 { &mut v2 } else { &mut v1 };
            let frame = encoder.encode_value(&attitude(i * 100), &table).unwrap();
            writer
                .write_frame_at(&frame, start + Duration::from_millis(i as u64 * 100))
                .unwrap();
        }
        writer.flush().unwrap();
    }

    let file = std::fs::File::open(&path).unwrap();
    let records: Vec<TlogRecord> = TlogReader::new(file, &table)
        .collect::<mavkit::errors::Result<_>>()
        .unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(records.len(), 10);
    for (i, record) in records.iter().enumerate() {
        assert_eq!(record.time(), start + Duration::from_millis(i as u64 * 100));
        let frame = record.frame.as_ref().unwrap();
        let value = table.decode_frame(frame).unwrap();
        assert_eq!(value, attitude(i as u32 * 100));
    }
}
