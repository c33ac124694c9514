//! Integration tests for JSON encoding and schema-driven builders

use std::collections::BTreeMap;

use dynstruct::{CodecOptions, SchemaFile, StructBuilder, StructError, Value, ValueType};

const SCHEMA: &str = r#"
tag = "json"

[[records.Address.fields]]
name = "City"
rename = "city"
type = "string"

[[records.Address.fields]]
name = "Zip"
rename = "zip"
type = "optional<int>"

[[records.User.fields]]
name = "Name"
rename = "name"
type = "string"
required = true

[[records.User.fields]]
name = "Height"
rename = "height"
type = "float"

[[records.User.fields]]
name = "Tags"
rename = "tags"
type = "list<string>"

[[records.User.fields]]
name = "Ids"
rename = "ids"
type = "map<int, bool>"

[[records.User.fields]]
name = "Home"
rename = "home"
type = "record:Address"

[[records.User.fields]]
name = "Work"
rename = "work"
type = "optional<record:Address>"
"#;

fn users() -> SchemaFile {
    SchemaFile::from_toml_str(SCHEMA).unwrap()
}

fn populated(schema: &SchemaFile) -> StructBuilder {
    let mut user = schema.builder("User").unwrap();

    user.set("Name", "Nigel").unwrap();
    user.set("Height", 1.85).unwrap();
    user.set("Tags", vec!["bass", "amp"]).unwrap();
    user.set("Ids", BTreeMap::from([(7i64, true), (-2, false)]))
        .unwrap();

    let home_ty = user.field_by_name("Home").unwrap().ty.clone();
    assert_eq!(home_ty.to_string(), "record{City: string, Zip: optional<int>}");
    let mut home = dynstruct::Record::zero(home_ty.as_record().unwrap().clone());
    home.set("City", "Leeds").unwrap();
    home.set("Zip", 11i64).unwrap();
    user.set("Home", home).unwrap();
    user
}

#[test]
fn test_round_trip_into_fresh_builder() {
    let schema = users();
    let source = populated(&schema);
    let bytes = source.marshal().unwrap();

    let mut fresh = schema.builder("User").unwrap();
    fresh.unmarshal(&bytes).unwrap();

    let ours = source.as_record().unwrap();
    let theirs = fresh.as_record().unwrap();
    assert_eq!(ours.len(), theirs.len());
    for ((field, a), (_, b)) in ours.iter().zip(theirs.iter()) {
        assert_eq!(a, b, "field {} differs after round trip", field.name);
    }
}

#[test]
fn test_round_trip_keeps_every_field_distinct() {
    let mut source = StructBuilder::new("json");
    source.int_field("A", "x", false).unwrap();
    assert!(matches!(
        source.int_field("B", "x", false),
        Err(StructError::DuplicateExternalName { .. })
    ));
    source.int_field("B", "y", false).unwrap();
    source.build();
    source.set("A", 1i64).unwrap();
    source.set("B", 2i64).unwrap();

    let bytes = source.marshal().unwrap();
    assert_eq!(String::from_utf8(bytes.clone()).unwrap(), r#"{"x":1,"y":2}"#);

    let mut fresh = StructBuilder::from_source(&source, "json", &[]).unwrap();
    fresh.build();
    fresh.unmarshal(&bytes).unwrap();
    assert_eq!(fresh.get_as::<i64>("A").unwrap(), 1);
    assert_eq!(fresh.get_as::<i64>("B").unwrap(), 2);
}

#[test]
fn test_encoded_shape() {
    let source = populated(&users());
    let json: serde_json::Value = serde_json::from_slice(&source.marshal().unwrap()).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "name": "Nigel",
            "height": 1.85,
            "tags": ["bass", "amp"],
            "ids": {"-2": false, "7": true},
            "home": {"city": "Leeds", "zip": 11},
            "work": null,
        })
    );
}

#[test]
fn test_unmarshal_optional_record() {
    let mut user = users().builder("User").unwrap();
    user.unmarshal(br#"{"work":{"city":"York"}}"#).unwrap();

    let work = user.get("Work").unwrap();
    let Some(Value::Record(record)) = work.deref_once() else {
        panic!("work should be present");
    };
    assert_eq!(record.get_as::<String>("City").unwrap(), "York");
    assert_eq!(record.get("Zip").unwrap(), Value::none());

    user.unmarshal(br#"{"work":null}"#).unwrap();
    assert_eq!(user.get("Work").unwrap(), Value::none());
}

#[test]
fn test_decode_errors_are_recoverable() {
    let mut user = users().builder("User").unwrap();
    user.set("Name", "kept").unwrap();

    let err = user
        .unmarshal(br#"{"name":"lost","home":{"zip":"LS1"}}"#)
        .unwrap_err();
    assert!(!err.is_usage_error());
    assert!(matches!(err, StructError::Decode { ref path, .. } if path == "home.zip"));
    assert_eq!(user.get_as::<String>("Name").unwrap(), "kept");
}

#[test]
fn test_depth_limit_from_options() {
    let mut nested = StructBuilder::new("json").with_codec_options(CodecOptions {
        max_depth: 3,
        ..CodecOptions::default()
    });
    nested
        .list_field(
            "Grid",
            "grid",
            ValueType::list(ValueType::list(ValueType::Int)),
            false,
        )
        .unwrap();
    nested.build();

    assert!(nested.unmarshal(br#"{"grid":[[[1]]]}"#).is_err());
    assert!(nested.unmarshal(br#"{"grid":[[]]}"#).is_ok());
    assert!(nested
        .unmarshal_with(br#"{"grid":[[[1, 2]]]}"#, &CodecOptions::default())
        .is_ok());
}
