use super::*;
use serde_json::json;
use std::collections::BTreeMap;

fn id(raw: i64) -> NodeId {
    NodeId::try_new(raw).unwrap()
}

#[test]
fn id_validation() {
    assert_eq!(
        OwnerId::try_new("").unwrap_err(),
        IdError::Empty { field: "owner_id" }
    );
    assert!(matches!(
        OwnerId::try_new("bad|owner").unwrap_err(),
        IdError::InvalidChar { ch: '|', index: 3, .. }
    ));
    assert!(matches!(
        ProjectId::try_new("a/b").unwrap_err(),
        IdError::InvalidChar { ch: '/', .. }
    ));
    assert!(ProjectId::try_new("novel").is_ok());

    assert_eq!(NodeId::parse("42").unwrap().get(), 42);
    assert!(matches!(
        NodeId::parse("0").unwrap_err(),
        IdError::NotPositive { .. }
    ));
    assert!(matches!(
        NodeId::parse("abc").unwrap_err(),
        IdError::NotDecimal { .. }
    ));
}

#[test]
fn node_ids_round_trip_as_json_numbers() {
    let value = serde_json::to_value(vec![id(3), id(7)]).unwrap();
    assert_eq!(value, json!([3, 7]));
    assert!(serde_json::from_value::<NodeId>(json!(-1)).is_err());
}

#[test]
fn snapshot_nodes_behave_as_a_set() {
    let mut snapshot = Snapshot::rooted_at(id(1));
    assert!(snapshot.insert(id(2)));
    assert!(!snapshot.insert(id(2)));
    assert_eq!(snapshot.nodes, vec![id(1), id(2)]);
    assert!(snapshot.remove(id(2)));
    assert!(!snapshot.remove(id(2)));
    assert_eq!(snapshot.nodes, vec![id(1)]);
}

#[test]
fn structural_edits_decode_each_entry_shape() {
    let edits = StructuralEdits::from_json(&json!({
        "root": 4,
        "5": null,
        "6": {"name": "Part One", "collapsed": true, "children": [8, 9.0]},
    }))
    .unwrap();

    let collected: Vec<_> = edits.iter().cloned().collect();
    assert_eq!(
        collected,
        vec![
            StructuralEdit::Delete(id(5)),
            StructuralEdit::Patch {
                id: id(6),
                patch: NodePatch {
                    name: Some("Part One".to_string()),
                    collapsed: Some(true),
                    children: Some(vec![id(8), id(9)]),
                },
            },
            StructuralEdit::RootReassign(id(4)),
        ]
    );
}

#[test]
fn structural_edits_reject_malformed_entries() {
    let err = StructuralEdits::from_json(&json!({"5": {"text": "x"}})).unwrap_err();
    assert!(matches!(err, EditError::UnknownProperty { ref property, .. } if property == "text"));
    assert_eq!(err.code(), "UNKNOWN_PROPERTY");

    let err = StructuralEdits::from_json(&json!({"5": {"collapsed": "yes"}})).unwrap_err();
    assert_eq!(err.code(), "INVALID_PROPERTY");

    let err = StructuralEdits::from_json(&json!({"5": 7})).unwrap_err();
    assert_eq!(err.code(), "INVALID_PROPERTY");

    let err = StructuralEdits::from_json(&json!({"root": "7"})).unwrap_err();
    assert_eq!(err.code(), "INVALID_PROPERTY");

    let err = StructuralEdits::from_json(&json!({"5": {"children": [1, -2]}})).unwrap_err();
    assert_eq!(err.code(), "INVALID_PROPERTY");

    let err = StructuralEdits::from_json(&json!({"five": null})).unwrap_err();
    assert!(err.is_decode_failure());

    let err = StructuralEdits::from_json(&json!([1, 2])).unwrap_err();
    assert!(matches!(err, EditError::NotAnObject));

    let err = StructuralEdits::from_slice(b"{not json").unwrap_err();
    assert!(err.is_decode_failure());
}

#[test]
fn float_node_ids_must_fit_in_i64() {
    let edits = StructuralEdits::from_json(&json!({"root": 4.0})).unwrap();
    assert_eq!(
        edits.iter().collect::<Vec<_>>(),
        vec![&StructuralEdit::RootReassign(id(4))]
    );

    // 2^63 would saturate to i64::MAX if cast.
    let err = StructuralEdits::from_json(&json!({"root": 9_223_372_036_854_775_808.0_f64})).unwrap_err();
    assert_eq!(err.code(), "INVALID_PROPERTY");

    let err = StructuralEdits::from_json(&json!({"5": {"children": [1e19]}})).unwrap_err();
    assert_eq!(err.code(), "INVALID_PROPERTY");
}

#[test]
fn content_edits_decode_and_validate() {
    let edits = ContentEdits::from_slice(br#"{"3": {"text": "hello"}, "4": null}"#).unwrap();
    let collected: Vec<_> = edits.iter().cloned().collect();
    assert_eq!(
        collected,
        vec![
            ContentEdit::Patch {
                id: id(3),
                patch: ContentPatch {
                    text: Some("hello".to_string()),
                    ..ContentPatch::default()
                },
            },
            ContentEdit::Removed(id(4)),
        ]
    );

    let err = ContentEdits::from_json(&json!({"3": {"name": "x"}})).unwrap_err();
    assert_eq!(err.code(), "UNKNOWN_PROPERTY");

    let err = ContentEdits::from_json(&json!({"3": {"notes": 1}})).unwrap_err();
    assert_eq!(err.code(), "INVALID_PROPERTY");
}

#[test]
fn tree_view_matches_the_wire_shape() {
    let mut nodes = BTreeMap::new();
    nodes.insert(id(1), Node::named_folder("novel"));
    let mut leaf = Node::empty(NodeKind::Document);
    leaf.name = "Chapter".to_string();
    leaf.text = "never sent in tree reads".to_string();
    nodes.insert(id(2), leaf);
    nodes.get_mut(&id(1)).unwrap().children.push(id(2));

    let value = serde_json::to_value(TreeView::project(id(1), &nodes)).unwrap();
    assert_eq!(
        value,
        json!({
            "1": {"name": "novel", "collapsed": false, "children": [2]},
            "2": {"name": "Chapter"},
            "root": 1,
        })
    );

    nodes.get_mut(&id(1)).unwrap().children.clear();
    let value = serde_json::to_value(TreeView::project(id(1), &nodes)).unwrap();
    assert_eq!(value["1"]["children"], json!([]));
}

#[test]
fn document_view_hides_text_for_folders() {
    let mut leaf = Node::empty(NodeKind::Document);
    leaf.text = "hello".to_string();
    assert_eq!(
        serde_json::to_value(DocumentView::from(&leaf)).unwrap(),
        json!({"notes": "", "synopsis": "", "text": "hello"})
    );

    let folder = Node::named_folder("Part One");
    assert_eq!(
        serde_json::to_value(DocumentView::from(&folder)).unwrap(),
        json!({"notes": "", "synopsis": ""})
    );
}

#[test]
fn node_records_omit_empty_children() {
    let leaf = Node::empty(NodeKind::Document);
    let value = serde_json::to_value(&leaf).unwrap();
    assert!(value.get("children").is_none());
    let decoded: Node = serde_json::from_value(json!({"folder": true})).unwrap();
    assert_eq!(decoded, Node::named_folder(""));
    assert_eq!(NodeKind::from_form_flag("true"), NodeKind::Folder);
    assert_eq!(NodeKind::from_form_flag("false"), NodeKind::Document);
}
