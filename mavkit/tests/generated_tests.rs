use mavkit::codegen::{Backend, RustBackend};
use mavkit::io::{FrameReader, FrameWriter};
use mavkit::protocol::{
    decode_frame, DialectTable, Encoder, MavLinkVersion, MavMessage, MessageValue, Value,
};
use mavkit::schema::{Dialect, DialectLoader, FsResolver};

/// Rust backend output for `tests/definitions/sensors.xml`.
#[allow(dead_code)]
#[path = "generated/sensors.rs"]
mod sensors;

use sensors::{SensorReport, SensorReset};

fn dialect() -> Dialect {
    let resolver = FsResolver::new([concat!(env!("CARGO_MANIFEST_DIR"), "/tests/definitions")]);
    DialectLoader::new(resolver).load("sensors").unwrap()
}

fn table() -> DialectTable {
    DialectTable::new(&dialect())
}

fn report() -> SensorReport {
    SensorReport {
        sensor_id: 3,
        status: sensors::sensor_status::SENSOR_STATUS_DEGRADED as u8,
        temperature: 21.5,
        offsets: [-2, 0, 7],
        label: "baro".to_string(),
        capabilities: (sensors::sensor_capability::SENSOR_CAPABILITY_TEMPERATURE
            | sensors::sensor_capability::SENSOR_CAPABILITY_PRESSURE) as u32,
        pressure: 101_325.0,
    }
}

#[test]
fn rust_backend_output_is_up_to_date() {
    let source = RustBackend.render(&dialect()).unwrap();

    assert_eq!(source.file_name(), "sensors.rs");
    assert_eq!(source.text(), include_str!("generated/sensors.rs"));
}

#[test]
fn constants_match_dialect() {
    let table = table();

    fn check<M: MavMessage>(table: &DialectTable) {
        let layout = table.layout(M::ID).unwrap();
        assert_eq!(layout.name(), M::NAME);
        assert_eq!(layout.crc_extra(), M::CRC_EXTRA);
        assert_eq!(layout.base_len(), M::BASE_LEN);
        assert_eq!(layout.max_len(), M::MAX_LEN);
        assert_eq!(sensors::message_name(M::ID), Some(M::NAME));
        assert_eq!(sensors::crc_extra(M::ID), Some(M::CRC_EXTRA));
        assert_eq!(sensors::max_len(M::ID), Some(M::MAX_LEN));
    }

    check::<SensorReport>(&table);
    check::<SensorReset>(&table);
    assert_eq!(sensors::DIALECT_NAME, "sensors");
    assert_eq!(sensors::crc_extra(0), None);
}

#[test]
fn v2_frame_keeps_extensions() {
    let mut encoder = Encoder::new(MavLinkVersion::V2, 1, 1);
    let bytes = encoder.encode(&report()).unwrap().to_bytes();

    let frame = decode_frame(&bytes, &sensors::Lookup).unwrap();
    assert_eq!(frame.payload().len(), SensorReport::MAX_LEN);
    assert_eq!(frame.decode::<SensorReport>().unwrap(), report());
}

#[test]
fn v1_frame_drops_extensions() {
    let mut encoder = Encoder::new(MavLinkVersion::V1, 1, 1);
    let bytes = encoder.encode(&report()).unwrap().to_bytes();

    let frame = decode_frame(&bytes, &sensors::Lookup).unwrap();
    assert_eq!(frame.version(), MavLinkVersion::V1);
    assert_eq!(frame.payload().len(), SensorReport::BASE_LEN);

    let decoded: SensorReport = frame.decode().unwrap();
    assert_eq!(
        decoded,
        SensorReport {
            capabilities: 0,
            pressure: 0.0,
            ..report()
        }
    );
}

#[test]
fn truncated_v2_frame_zero_fills_extensions() {
    let report = SensorReport {
        capabilities: 1,
        pressure: 0.0,
        ..report()
    };
    let mut encoder = Encoder::new(MavLinkVersion::V2, 1, 1);
    let bytes = encoder.encode(&report).unwrap().to_bytes();

    // Base fields and the low byte of `capabilities`
    let frame = decode_frame(&bytes, &sensors::Lookup).unwrap();
    assert_eq!(frame.payload().len(), SensorReport::BASE_LEN + 1);
    assert_eq!(frame.decode::<SensorReport>().unwrap(), report);

    let empty = encoder.encode(&SensorReport::default()).unwrap();
    assert_eq!(empty.payload().len(), 1);
    assert_eq!(empty.decode::<SensorReport>().unwrap(), SensorReport::default());
}

#[test]
fn static_and_dynamic_encoding_agree() {
    let table = table();

    for version in [MavLinkVersion::V1, MavLinkVersion::V2] {
        let mut encoder = Encoder::new(version, 1, 1);

        let frame = encoder.encode(&report()).unwrap();
        let value = table.decode_frame(&frame).unwrap();
        assert_eq!(value.get("label"), Some(&Value::from("baro")));
        assert_eq!(value.get("temperature"), Some(&Value::Float(21.5)));
        assert_eq!(
            value.get("offsets"),
            Some(&Value::Array(vec![Value::Int(-2), Value::Int(0), Value::Int(7)]))
        );
        let expected_pressure = match version {
            MavLinkVersion::V1 => 0.0,
            MavLinkVersion::V2 => 101_325.0,
        };
        assert_eq!(value.get("pressure"), Some(&Value::Float(expected_pressure)));

        let dynamic = encoder.encode_value(&value, &table).unwrap();
        assert_eq!(dynamic.payload(), frame.payload());
    }
}

#[test]
fn dynamic_to_static() {
    let table = table();
    let value = MessageValue::new(201)
        .with("type", 4u8)
        .with("delay", 1500u16);

    let frame = Encoder::new(MavLinkVersion::V1, 1, 1)
        .encode_value(&value, &table)
        .unwrap();
    let reset: SensorReset = frame.decode().unwrap();

    assert_eq!(reset, SensorReset { type_: 4, delay: 1500 });
}

#[test]
fn generated_lookup_reads_streams() {
    let mut writer = FrameWriter::new(Vec::new(), Encoder::new(MavLinkVersion::V2, 42, 1));
    writer.send(&report()).unwrap();
    writer.send(&SensorReset::default()).unwrap();
    writer.send(&SensorReport::default()).unwrap();
    let bytes = writer.into_inner();

    let mut reader = FrameReader::new(bytes.as_slice(), sensors::Lookup);
    assert_eq!(reader.recv_frame().unwrap().decode::<SensorReport>().unwrap(), report());

    let reset = reader.recv_frame().unwrap();
    assert_eq!(reset.message_id(), 201);
    assert_eq!(reset.payload().len(), 1);
    assert_eq!(reset.decode::<SensorReset>().unwrap(), SensorReset::default());

    let empty = reader.recv_frame().unwrap();
    assert_eq!(empty.system_id(), 42);
    assert_eq!(empty.decode::<SensorReport>().unwrap(), SensorReport::default());
}
