use chrono::{TimeZone, Utc};
use glyph::{
    canonicalize, canonicalize_with_options, glyph, parse, parse_with_options, to_value,
    CanonOptions, NullStyle, ParseOptions, Pool, SchemaRef, Value,
};

fn assert_roundtrip(value: &Value) {
    let text = canonicalize(value);
    let back = parse(&text).unwrap();
    assert_eq!(&back, value, "canonical text was: {}", text);
}

#[test]
fn test_determinism() {
    let value = glyph!({
        "name": "Ada",
        "scores": [1, 2, 3],
        "meta": { "active": true, "note": null }
    });
    assert_eq!(canonicalize(&value), canonicalize(&value));
}

#[test]
fn test_key_order_is_irrelevant() {
    let ab = glyph!({ "a": 1, "b": 2 });
    let ba = glyph!({ "b": 2, "a": 1 });
    assert_eq!(canonicalize(&ab), canonicalize(&ba));
    assert!(ab.loosely_eq(&ba));
}

#[test]
fn test_key_sort_stability() {
    let value = glyph!({ "b": 1, "a": 2, "c": 3 });
    assert_eq!(canonicalize(&value), "{a=2 b=1 c=3}");
}

#[test]
fn test_number_normalization() {
    assert_eq!(canonicalize(&Value::Int(0)), canonicalize(&Value::Int(-0)));
    assert_eq!(
        canonicalize(&Value::Float(1.50)),
        canonicalize(&Value::Float(1.5))
    );
    assert_eq!(canonicalize(&Value::Float(-0.0)), "0");
}

#[test]
fn test_scalar_roundtrips() {
    assert_roundtrip(&Value::Null);
    assert_roundtrip(&Value::Bool(true));
    assert_roundtrip(&Value::Bool(false));
    assert_roundtrip(&Value::Int(i64::MAX));
    assert_roundtrip(&Value::Int(i64::MIN));
    assert_roundtrip(&Value::Float(3.5));
    assert_roundtrip(&Value::Float(1e-9));
    assert_roundtrip(&Value::Str("plain".into()));
    assert_roundtrip(&Value::Bytes(vec![0, 1, 2, 255]));
    assert_roundtrip(&Value::id("user", "alice"));
    assert_roundtrip(&Value::Time(Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap()));
}

#[test]
fn test_special_strings_roundtrip() {
    let special = [
        "",
        "two words",
        "line1\nline2",
        "tab\there",
        "pipe|here",
        "quote\"here",
        "back\\slash",
        "t",
        "f",
        "_",
        "\u{2205}",
        "42",
        "1e-6",
        "2024-01-15T10:30:00Z",
        "^user:alice",
        "{a=1}",
        "@tab",
        "#0",
        "ends with space ",
    ];
    for s in special {
        assert_roundtrip(&Value::Str(s.to_string()));
    }
}

#[test]
fn test_nested_structures_roundtrip() {
    assert_roundtrip(&glyph!({
        "user": { "name": "Ada", "tags": ["math", "logic"] },
        "checked": [true, false, null],
        "depth": { "one": { "two": { "three": 3 } } }
    }));
}

#[test]
fn test_struct_and_sum_roundtrip() {
    let st = parse("Point{x=1 y=2}").unwrap();
    assert_roundtrip(&st);
    assert_roundtrip(&Value::sum("Some", Value::Int(42)));
    assert_roundtrip(&Value::sum_unit("None"));
    assert_roundtrip(&Value::sum("Wrap", glyph!({ "inner": [1, 2] })));
}

#[test]
fn test_tabular_scenario() {
    let rows = glyph!([{ "id": 1 }, { "id": 2 }, { "id": 3 }]);

    let tabular = canonicalize(&rows);
    assert_eq!(tabular, "@tab _ [id]\n|1|\n|2|\n|3|\n@end");

    let plain = canonicalize_with_options(&rows, &CanonOptions::new().with_auto_tabular(false));
    assert_eq!(plain, "[{id=1} {id=2} {id=3}]");

    // Tabular equivalence: both encodings decode to the same value.
    assert_eq!(parse(&tabular).unwrap(), parse(&plain).unwrap());
}

#[test]
fn test_tabular_roundtrip_with_mixed_cells() {
    let rows = glyph!([
        { "id": 1, "meta": { "ok": true }, "name": "Ada" },
        { "id": 2, "name": "pipe|in|name" },
        { "id": 3, "meta": { "ok": false }, "name": null }
    ]);
    // A tolerated missing key emits as null, so the decoded row carries an
    // explicit null where the original had no key at all.
    let normalized = glyph!([
        { "id": 1, "meta": { "ok": true }, "name": "Ada" },
        { "id": 2, "name": "pipe|in|name", "meta": null },
        { "id": 3, "meta": { "ok": false }, "name": null }
    ]);
    let text = canonicalize(&rows);
    assert_eq!(parse(&text).unwrap(), normalized);
    // Nested maps embed inline in cells; the block itself stays one table.
    assert_eq!(text.matches("@tab").count(), 1);
}

#[test]
fn test_nested_table_only_at_eligible_positions() {
    // The outer list is too short for a table, the inner one is eligible.
    let value = glyph!([{ "rows": [{ "n": 1 }, { "n": 2 }, { "n": 3 }] }]);
    let text = canonicalize(&value);
    assert!(text.starts_with("[{rows=@tab"), "got: {text}");
    assert_eq!(parse(&text).unwrap(), value);
}

#[test]
fn test_struct_table_carries_type_name() {
    let rows = Value::List(vec![
        parse("Point{x=1 y=2}").unwrap(),
        parse("Point{x=3 y=4}").unwrap(),
        parse("Point{x=5 y=6}").unwrap(),
    ]);
    let text = canonicalize(&rows);
    assert!(text.starts_with("@tab Point [x y]\n"), "got: {text}");
    assert_eq!(parse(&text).unwrap(), rows);
}

#[test]
fn test_column_cap_falls_back_to_brackets() {
    let mut items = Vec::new();
    for i in 0..3 {
        let mut map = glyph::GlyphMap::new();
        for c in 0..5 {
            map.insert(format!("k{}_{}", i, c), Value::Int(c));
        }
        items.push(Value::Map(map));
    }
    let rows = Value::List(items);
    let options = CanonOptions::new().with_max_table_cols(4);
    let text = canonicalize_with_options(&rows, &options);
    assert!(text.starts_with('['), "got: {text}");
    assert_eq!(parse(&text).unwrap(), rows);
}

#[test]
fn test_null_style_ascii() {
    let value = glyph!({ "a": null });
    let options = CanonOptions::new().with_null_style(NullStyle::Ascii);
    let text = canonicalize_with_options(&value, &options);
    assert_eq!(text, "{a=_}");
    assert_eq!(parse(&text).unwrap(), value);
}

#[test]
fn test_schema_mode_roundtrip() {
    let value = glyph!({ "age": 36, "name": "Ada", "extra": true });
    let schema = SchemaRef::new("S1", vec!["age".into(), "name".into()]);
    let options = CanonOptions::new().with_schema(schema);
    let text = canonicalize_with_options(&value, &options);
    // Keys in the dictionary compress; others emit literally.
    assert_eq!(text, "@schema S1 [age name]\n{#0=36 extra=t #1=Ada}");
    assert_eq!(parse(&text).unwrap(), value);
}

#[test]
fn test_schema_mode_in_table_header() {
    let rows = glyph!([{ "id": 1 }, { "id": 2 }, { "id": 3 }]);
    let schema = SchemaRef::new("S2", vec!["id".into()]);
    let options = CanonOptions::new().with_schema(schema);
    let text = canonicalize_with_options(&rows, &options);
    assert_eq!(text, "@schema S2 [id]\n@tab _ [#0]\n|1|\n|2|\n|3|\n@end");
    assert_eq!(parse(&text).unwrap(), rows);
}

#[test]
fn test_external_key_dictionary() {
    let keys = vec!["count".to_string()];
    let options = ParseOptions {
        keys: Some(&keys),
        packed: None,
    };
    let value = parse_with_options("{#0=7}", &options).unwrap();
    assert_eq!(value, glyph!({ "count": 7 }));
}

#[test]
fn test_pool_resolution() {
    let mut pool = Pool::new();
    pool.insert(3, vec![glyph!("shared"), glyph!({ "deep": [1, 2] })]);

    let parsed = parse("{a=^S3:\"0\" b=[^S3:\"1\" ^S3:\"9\"] c=^other:ref}").unwrap();
    let resolved = pool.resolve(parsed);
    let map = resolved.as_map().unwrap();

    assert_eq!(map.get("a"), Some(&glyph!("shared")));
    let b = map.get("b").unwrap().as_list().unwrap();
    assert_eq!(b[0], glyph!({ "deep": [1, 2] }));
    // Unresolvable index and foreign prefixes survive untouched.
    assert!(b[1].is_id());
    assert!(map.get("c").unwrap().is_id());
}

#[test]
fn test_loose_whitespace_tolerated() {
    let value = parse("  {  a = 1\n   b = [ 1   2 ]  }  ").unwrap();
    assert_eq!(value, glyph!({ "a": 1, "b": [1, 2] }));
}

#[test]
fn test_canonical_json_bridge_scenario() {
    let json: serde_json::Value = serde_json::from_str(r#"{"b":1,"a":2}"#).unwrap();
    let value = to_value(&json).unwrap();
    assert_eq!(canonicalize(&value), "{a=2 b=1}");
}

#[test]
fn test_parse_never_partially_succeeds() {
    for bad in [
        "{a=1",
        "[1 2",
        "{a=}",
        "Point{x=",
        "@tab _ [a b]\n|1|\n@end",
        "\"unterminated",
        "{=1}",
    ] {
        assert!(parse(bad).is_err(), "should fail: {bad}");
    }
}
