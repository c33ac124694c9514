//! Integration tests for deep copy and field-subset scans

use std::collections::BTreeMap;

use dynstruct::{scan_into, ScanPlanCache, StructBuilder, Value, ValueType};

fn person() -> StructBuilder {
    let mut builder = StructBuilder::new("json");
    builder.string_field("Name", "name", true).unwrap();
    builder.int_field("Age", "age", false).unwrap();
    builder.bool_field("Is_cool", "is_cool", false).unwrap();
    builder.build();
    builder
}

fn profile() -> StructBuilder {
    let mut address = StructBuilder::new("json");
    address.string_field("City", "city", false).unwrap();
    address.build();

    let mut builder = StructBuilder::new("json");
    builder.string_field("Name", "name", false).unwrap();
    builder
        .list_field("Tags", "tags", ValueType::String, false)
        .unwrap();
    builder
        .map_field("Scores", "scores", ValueType::String, ValueType::Int, false)
        .unwrap();
    builder
        .record_field("Address", "address", &address, false)
        .unwrap();
    builder.build();

    let mut home = address.as_record().unwrap().clone();
    home.set("City", "Leeds").unwrap();
    builder.set("Name", "Nigel").unwrap();
    builder.set("Tags", vec!["a"]).unwrap();
    builder.set("Scores", BTreeMap::from([("x", 1i64)])).unwrap();
    builder.set("Address", home).unwrap();
    builder
}

#[test]
fn test_nigel_scenario() {
    let mut original = person();
    original.set("Name", "Nigel").unwrap();
    original.set("Age", 23i64).unwrap();
    original.set("Is_cool", true).unwrap();

    let mut copy = original.deep_copy().unwrap();
    copy.set("Name", "Nigel2").unwrap();
    copy.set("Age", 24i64).unwrap();
    copy.set("Is_cool", false).unwrap();

    assert_eq!(original.get_as::<String>("Name").unwrap(), "Nigel");
    assert_eq!(original.get_as::<i64>("Age").unwrap(), 23);
    assert!(original.get_as::<bool>("Is_cool").unwrap());

    assert_eq!(copy.get_as::<String>("Name").unwrap(), "Nigel2");
    assert_eq!(copy.get_as::<i64>("Age").unwrap(), 24);
    assert!(!copy.get_as::<bool>("Is_cool").unwrap());
}

#[test]
fn test_deep_copy_independent_for_every_kind() {
    let mut source = profile();
    let mut copy = source.deep_copy().unwrap();
    assert_eq!(
        copy.as_record().unwrap().values(),
        source.as_record().unwrap().values()
    );

    copy.set("Name", "Copy").unwrap();
    copy.set("Tags", vec!["b", "c"]).unwrap();
    copy.set("Scores", BTreeMap::from([("y", 2i64)])).unwrap();
    let mut away = copy.get_as::<dynstruct::Record>("Address").unwrap();
    away.set("City", "York").unwrap();
    copy.set("Address", away).unwrap();

    assert_eq!(source.get_as::<String>("Name").unwrap(), "Nigel");
    assert_eq!(source.get_as::<Vec<String>>("Tags").unwrap(), vec!["a"]);
    assert_eq!(
        source.get("Scores").unwrap(),
        Value::from(BTreeMap::from([("x", 1i64)]))
    );
    let home = source.get_as::<dynstruct::Record>("Address").unwrap();
    assert_eq!(home.get_as::<String>("City").unwrap(), "Leeds");

    // and the other direction
    source.set("Tags", Vec::<String>::new()).unwrap();
    assert_eq!(copy.get_as::<Vec<String>>("Tags").unwrap(), vec!["b", "c"]);
}

#[test]
fn test_scan_copies_only_matching_name_and_type() {
    let mut source = person();
    source.set("Name", "Nigel").unwrap();
    source.set("Age", 23i64).unwrap();
    source.set("Is_cool", true).unwrap();

    let mut dest = StructBuilder::new("json");
    dest.string_field("Name", "name", false).unwrap();
    dest.string_field("Age", "age", false).unwrap();
    dest.int_field("Height", "height", false).unwrap();
    dest.build();
    dest.set("Age", "unchanged").unwrap();
    dest.set("Height", 180i64).unwrap();

    let copied = source
        .scan_into(&mut dest, &["Name", "Age", "Is_cool", "Height"])
        .unwrap();
    assert_eq!(copied, 1);
    assert_eq!(dest.get_as::<String>("Name").unwrap(), "Nigel");
    assert_eq!(dest.get_as::<String>("Age").unwrap(), "unchanged");
    assert_eq!(dest.get_as::<i64>("Height").unwrap(), 180);
}

#[test]
fn test_scan_through_values_and_cache() {
    let mut source = person();
    source.set("Age", 41i64).unwrap();
    let dest_builder = person();

    let src_value = Value::Record(source.as_record().unwrap().clone());
    let mut dst_value = Value::some(dest_builder.as_record().unwrap().clone());
    assert_eq!(scan_into(&src_value, &mut dst_value, &["Age"]).unwrap(), 1);
    let Value::Optional(Some(inner)) = &dst_value else {
        panic!("destination should stay optional");
    };
    assert_eq!(inner.as_record().unwrap().get_as::<i64>("Age").unwrap(), 41);

    let mut cache = ScanPlanCache::new();
    let mut dest = person();
    for _ in 0..3 {
        let copied = cache.scan(
            source.as_record().unwrap(),
            dest.as_record_mut().unwrap(),
            &["Age", "Name"],
        );
        assert_eq!(copied, 2);
    }
    assert_eq!(cache.len(), 1);
    assert_eq!(dest.get_as::<i64>("Age").unwrap(), 41);
}
