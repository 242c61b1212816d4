//! Property-based tests
//!
//! 1. Serializing a tree of maps and string leaves and reparsing it yields
//!    the same tree.
//! 2. Duplicate sibling elements follow the documented policy in both
//!    reader modes.
//! 3. XML-RPC decode(encode(v)) == v for the value kinds the wire format
//!    represents losslessly.

use proptest::prelude::*;
use saxtree::rpc::{decode_call, decode_value, encode_call, encode_value};
use saxtree::{make_xml_with_root, parse_xml, parse_xml_as_data, Map, Value, WriteOptions};

fn leaf_string() -> impl Strategy<Value = String> {
    // starts with a non-space character so the reader never sees a
    // whitespace-only text node
    "[a-zA-Z0-9][a-zA-Z0-9 .,;&<>-]{0,12}"
}

fn element_name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9]{0,7}"
}

/// Trees of maps with string leaves; what the generic XML mapping can
/// represent without special keys
fn xml_tree() -> impl Strategy<Value = Value> {
    let leaf = leaf_string().prop_map(Value::String);
    leaf.prop_recursive(3, 24, 6, |inner| {
        proptest::collection::btree_map(element_name(), inner, 1..5).prop_map(|entries| {
            Value::Map(entries.into_iter().collect::<Map>())
        })
    })
}

/// Values the XML-RPC wire format round-trips exactly: 32-bit range
/// integers, finite floats, printable strings, dates at second precision
fn rpc_value() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        any::<i32>().prop_map(|i| Value::Int(i64::from(i))),
        any::<bool>().prop_map(Value::Bool),
        (-1.0e12_f64..1.0e12).prop_map(Value::Float),
        "[ -~]{0,16}".prop_map(Value::String),
        proptest::collection::vec(any::<u8>(), 0..16).prop_map(Value::Binary),
        (2000i32..2100, 1u8..13, 1u8..29, 0u8..24, 0u8..60, 0u8..60).prop_map(
            |(y, mo, d, h, mi, s)| {
                let month = time::Month::try_from(mo).unwrap_or(time::Month::January);
                let date = time::Date::from_calendar_date(y, month, d)
                    .unwrap_or(time::Date::MIN);
                let tod = time::Time::from_hms(h, mi, s).unwrap_or(time::Time::MIDNIGHT);
                Value::DateTime(time::PrimitiveDateTime::new(date, tod))
            }
        ),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            proptest::collection::vec(inner.clone(), 0..4).prop_map(Value::from),
            proptest::collection::btree_map("[a-zA-Z][a-zA-Z0-9_]{0,8}", inner, 0..4)
                .prop_map(|entries| Value::Map(entries.into_iter().collect::<Map>())),
        ]
    })
}

proptest! {
    #[test]
    fn xml_tree_round_trips(tree in xml_tree()) {
        let xml = make_xml_with_root("root", &tree).expect("serialize");
        let reparsed = parse_xml(&xml).expect("reparse");
        let root = reparsed
            .as_map()
            .and_then(|m| m.get("root"))
            .expect("root key");
        prop_assert_eq!(root, &tree);
    }

    #[test]
    fn formatted_output_parses_back(tree in xml_tree()) {
        let xml = saxtree::write_document_with_root("root", &tree, &WriteOptions::formatted())
            .expect("serialize");
        let reparsed = parse_xml(&xml).expect("reparse");
        let root = reparsed
            .as_map()
            .and_then(|m| m.get("root"))
            .expect("root key");
        prop_assert_eq!(root, &tree);
    }

    #[test]
    fn duplicate_sibling_policy(values in proptest::collection::vec(leaf_string(), 1..6)) {
        let mut xml = String::from("<r>");
        for v in &values {
            xml.push_str("<b>");
            xml.push_str(&saxtree::write::escape_xml(v));
            xml.push_str("</b>");
        }
        xml.push_str("</r>");

        // order-preserving mode: b, b^2, b^3 ... in encounter order
        let preserved = parse_xml(&xml).expect("parse");
        let r = preserved
            .as_map()
            .and_then(|m| m.get("r"))
            .and_then(Value::as_map)
            .expect("map root");
        prop_assert_eq!(r.len(), values.len());
        for (i, v) in values.iter().enumerate() {
            let key = if i == 0 { "b".to_string() } else { format!("b^{}", i + 1) };
            prop_assert_eq!(r.get(&key), Some(&Value::String(v.clone())));
        }

        // collapse mode: a single list in encounter order
        let collapsed = parse_xml_as_data(&xml).expect("parse");
        let b = collapsed
            .as_map()
            .and_then(|m| m.get("r"))
            .and_then(Value::as_map)
            .and_then(|m| m.get("b"))
            .expect("b entry");
        if values.len() == 1 {
            prop_assert_eq!(b, &Value::String(values[0].clone()));
        } else {
            let list = b.as_list().expect("list");
            prop_assert_eq!(list.len(), values.len());
            for (i, v) in values.iter().enumerate() {
                prop_assert_eq!(list.get(i), Some(&Value::String(v.clone())));
            }
        }
    }

    #[test]
    fn rpc_value_round_trips(value in rpc_value()) {
        let xml = encode_value(&value, &WriteOptions::default()).expect("encode");
        prop_assert_eq!(decode_value(&xml).expect("decode"), value);
    }

    #[test]
    fn rpc_call_round_trips(
        method in "[a-zA-Z][a-zA-Z0-9._]{0,12}",
        params in proptest::collection::vec(rpc_value(), 0..4),
    ) {
        let xml = encode_call(&method, &params, &WriteOptions::default()).expect("encode");
        let call = decode_call(&xml).expect("decode");
        prop_assert_eq!(call.method, method);
        prop_assert_eq!(call.params, params);
    }
}
