//! Integration tests for the XML data mapping round trip

use saxtree::{
    make_xml, parse_xml, parse_xml_as_data, read_document, write_document, ReadOptions,
    SaxIterator, Value, WriteOptions,
};

fn get<'v>(value: &'v Value, path: &[&str]) -> Option<&'v Value> {
    let mut cur = value;
    for key in path {
        cur = cur.as_map()?.get(key)?;
    }
    Some(cur)
}

#[test]
fn duplicate_siblings_in_both_modes() {
    let xml = "<a><b>1</b><b>2</b></a>";

    let preserved = parse_xml(xml).expect("parse");
    assert_eq!(get(&preserved, &["a", "b"]), Some(&Value::from("1")));
    assert_eq!(get(&preserved, &["a", "b^2"]), Some(&Value::from("2")));

    let collapsed = parse_xml_as_data(xml).expect("parse");
    let list = get(&collapsed, &["a", "b"])
        .and_then(Value::as_list)
        .expect("list");
    assert_eq!(list.get(0), Some(&Value::from("1")));
    assert_eq!(list.get(1), Some(&Value::from("2")));
}

#[test]
fn no_suffix_keys_without_duplicates() {
    let tree = parse_xml("<r><a>1</a><b>2</b><c>3</c></r>").expect("parse");
    let r = get(&tree, &["r"]).and_then(Value::as_map).expect("map");
    let keys: Vec<&str> = r.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["a", "b", "c"]);
}

#[test]
fn document_round_trip() {
    let xml = "<order id=\"17\"><customer>Arnie</customer>\
               <item><sku>a1</sku><qty>2</qty></item>\
               <item><sku>b2</sku><qty>1</qty></item></order>";
    let tree = parse_xml(xml).expect("parse");
    let out = make_xml(&tree).expect("serialize");
    let reparsed = parse_xml(&out).expect("reparse");
    assert_eq!(tree, reparsed);
}

#[test]
fn formatted_round_trip() {
    let xml = "<cfg><host>db1</host><port>5432</port></cfg>";
    let tree = parse_xml(xml).expect("parse");
    let formatted = write_document(&tree, &WriteOptions::formatted()).expect("serialize");
    assert!(formatted.contains("\n  <host>db1</host>\n"));
    let reparsed = parse_xml(&formatted).expect("reparse");
    assert_eq!(tree, reparsed);
}

#[test]
fn cdata_and_comment_round_trip() {
    let opts = ReadOptions {
        add_comments: true,
        ..ReadOptions::default()
    };
    let xml = "<doc><!-- draft --><body><![CDATA[if (a < b) { go(); }]]></body></doc>";
    let tree = read_document(xml, &opts).expect("parse");
    assert_eq!(
        get(&tree, &["doc", "^comment^"]),
        Some(&Value::from(" draft "))
    );
    assert_eq!(
        get(&tree, &["doc", "body", "^cdata^"]),
        Some(&Value::from("if (a < b) { go(); }"))
    );

    let out = make_xml(&tree).expect("serialize");
    let reparsed = read_document(&out, &opts).expect("reparse");
    assert_eq!(tree, reparsed);
}

#[test]
fn attribute_round_trip() {
    let xml = "<a id=\"1\" name=\"x &amp; y\"><b>z</b></a>";
    let tree = parse_xml(xml).expect("parse");
    let attrs = get(&tree, &["a", "^attributes^"])
        .and_then(Value::as_map)
        .expect("attributes");
    assert_eq!(attrs.get("id"), Some(&Value::from("1")));
    assert_eq!(attrs.get("name"), Some(&Value::from("x & y")));

    let out = make_xml(&tree).expect("serialize");
    assert_eq!(parse_xml(&out).expect("reparse"), tree);
}

#[test]
fn deep_nesting_and_sibling_pops() {
    let xml = "<a><b><c><d>deep</d></c></b><e>after</e></a>";
    let tree = parse_xml(xml).expect("parse");
    assert_eq!(
        get(&tree, &["a", "b", "c", "d"]),
        Some(&Value::from("deep"))
    );
    assert_eq!(get(&tree, &["a", "e"]), Some(&Value::from("after")));
}

#[test]
fn sax_iterator_streams_matching_elements() {
    let xml = "<feed><entry><id>1</id></entry><skip/><entry><id>2</id></entry></feed>";
    let ids: Vec<String> = SaxIterator::new(xml, "entry")
        .map(|entry| {
            let entry = entry.expect("entry parses");
            get(&entry, &["id"])
                .and_then(Value::as_str)
                .expect("id")
                .to_string()
        })
        .collect();
    assert_eq!(ids, vec!["1", "2"]);
}

#[test]
fn malformed_xml_reports_tokenizer_error() {
    let err = parse_xml("<a><b></a>").expect_err("mismatched close tag");
    assert!(matches!(
        err.kind(),
        saxtree::ErrorKind::Tokenizer { .. }
    ));
}

#[test]
fn collapse_mode_with_three_occurrences() {
    let tree = parse_xml_as_data("<r><x>1</x><x>2</x><x>3</x></r>").expect("parse");
    let list = get(&tree, &["r", "x"]).and_then(Value::as_list).expect("list");
    assert_eq!(list.len(), 3);
    assert_eq!(list.get(2), Some(&Value::from("3")));
}
