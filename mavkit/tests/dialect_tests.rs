use mavkit::errors::SchemaError;
use mavkit::schema::{DialectLoader, FieldType, FsResolver, MemoryResolver, PrimitiveType};

fn loader() -> DialectLoader<FsResolver> {
    DialectLoader::new(FsResolver::new([concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/tests/definitions"
    )]))
}

#[test]
fn crc_extra_of_common_messages() {
    let dialect = loader().load("common").unwrap();

    for (name, crc_extra) in [
        ("HEARTBEAT", 50),
        ("SYS_STATUS", 124),
        ("PARAM_VALUE", 220),
        ("ATTITUDE", 39),
        ("MISSION_ITEM", 254),
        ("COMMAND_LONG", 152),
    ] {
        let message = dialect.message_by_name(name).unwrap();
        assert_eq!(message.crc_extra(), crc_extra, "{name}");
    }
}

#[test]
fn payload_lengths() {
    let dialect = loader().load("common").unwrap();

    let heartbeat = dialect.message(0).unwrap();
    assert_eq!((heartbeat.base_len(), heartbeat.max_len()), (9, 9));

    let sys_status = dialect.message_by_name("SYS_STATUS").unwrap();
    assert_eq!((sys_status.base_len(), sys_status.max_len()), (31, 43));

    let mission_item = dialect.message_by_name("MISSION_ITEM").unwrap();
    assert_eq!((mission_item.base_len(), mission_item.max_len()), (37, 38));
    assert!(mission_item.deprecated());
}

#[test]
fn wire_order() {
    let dialect = loader().load("common").unwrap();
    let mission_item = dialect.message(39).unwrap();

    let order: Vec<&str> = mission_item.wire_fields().map(|f| f.name()).collect();
    assert_eq!(
        order,
        vec![
            "param1",
            "param2",
            "param3",
            "param4",
            "x",
            "y",
            "z",
            "seq",
            "command",
            "target_system",
            "target_component",
            "frame",
            "current",
            "autocontinue",
            "mission_type",
        ]
    );
}

#[test]
fn includes_are_merged() {
    let dialect = loader().load("test").unwrap();

    assert_eq!(dialect.name(), "test");
    assert_eq!(dialect.dialect(), Some(99));
    assert_eq!(dialect.version(), Some(3));
    assert!(dialect.message(0).is_some());
    assert!(dialect.message(76).is_some());
    assert!(dialect.message(17000).is_some());

    let mav_type = dialect.enum_by_name("MAV_TYPE").unwrap();
    assert_eq!(mav_type.entry(2).unwrap().name(), "MAV_TYPE_QUADROTOR");
    assert_eq!(mav_type.entry(250).unwrap().name(), "MAV_TYPE_TEST_RIG");

    let mav_state = dialect.enum_by_name("MAV_STATE").unwrap();
    assert_eq!(mav_state.entry(4).unwrap().name(), "MAV_STATE_ACTIVE");

    assert!(dialect.enum_by_name("MAV_MODE_FLAG").unwrap().bitmask());
}

#[test]
fn field_metadata() {
    let dialect = loader().load("test").unwrap();
    let message = dialect.message_by_name("TEST_TYPES").unwrap();

    assert_eq!(
        message.field("s").unwrap().field_type(),
        FieldType::Array(PrimitiveType::Char, 10)
    );
    assert_eq!(
        message.field("d_array").unwrap().field_type(),
        FieldType::Array(PrimitiveType::Double, 3)
    );
    assert!(message.field("ext").unwrap().is_extension());
    assert_eq!(message.extension_fields().count(), 1);

    let sys_status = dialect.message(1).unwrap();
    let voltage = sys_status.field("voltage_battery").unwrap();
    assert_eq!(voltage.units(), Some("mV"));
    assert_eq!(voltage.invalid(), Some("UINT16_MAX"));
}

#[test]
fn missing_definitions() {
    let err = loader().load("nonexistent").unwrap_err();
    assert!(matches!(err, SchemaError::Fetch { name, .. } if name == "nonexistent"));

    let resolver = MemoryResolver::new().with(
        "broken.xml",
        "<mavlink><include>gone.xml</include></mavlink>",
    );
    assert!(matches!(
        DialectLoader::new(resolver).load("broken"),
        Err(SchemaError::Fetch { name, .. }) if name == "gone.xml"
    ));
}
