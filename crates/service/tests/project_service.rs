#![forbid(unsafe_code)]

use scribe_core::OwnerId;
use scribe_service::{CreateDocumentForm, ErrorKind, ProjectService, ServiceError, require_owner};
use scribe_storage::TreeStore;
use serde_json::json;

fn service() -> ProjectService {
    ProjectService::new(TreeStore::open_in_memory().expect("open store"))
}

fn owner() -> OwnerId {
    require_owner(Some("u1")).expect("owner")
}

fn create(service: &ProjectService, parent: i64, folder: bool) -> i64 {
    let form = CreateDocumentForm {
        folder: if folder { "true" } else { "false" }.to_string(),
        parent: Some(parent.to_string()),
    };
    service
        .create_document(&owner(), "novel", &form)
        .expect("create document")
        .id
        .get()
}

fn root_of(service: &ProjectService) -> i64 {
    service
        .read_tree(&owner(), "novel")
        .expect("read tree")
        .root
        .get()
}

#[test]
fn missing_identity_is_unauthenticated() {
    for identity in [None, Some(""), Some("   ")] {
        let err = require_owner(identity).expect_err("no identity");
        assert_eq!(err.kind(), ErrorKind::Unauthenticated);
    }
    let err = require_owner(Some("a|b")).expect_err("reserved char");
    assert_eq!(err.kind(), ErrorKind::DecodeFailure);
}

#[test]
fn new_project_reads_as_a_single_empty_folder() {
    let service = service();
    service
        .create_project(&owner(), "novel")
        .expect("create project");

    let tree = service.read_tree(&owner(), "novel").expect("read tree");
    let value = serde_json::to_value(&tree).expect("serialize tree");
    let root = tree.root.get();
    assert_eq!(
        value,
        json!({
            root.to_string(): {"name": "novel", "collapsed": false, "children": []},
            "root": root,
        })
    );

    let listed = service.list_projects(&owner()).expect("list projects");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].as_str(), "novel");
}

#[test]
fn duplicate_and_missing_projects() {
    let service = service();
    service
        .create_project(&owner(), "novel")
        .expect("create project");
    let err = service
        .create_project(&owner(), "novel")
        .expect_err("duplicate");
    assert_eq!(err.kind(), ErrorKind::AlreadyExists);

    let err = service.read_tree(&owner(), "essay").expect_err("missing");
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(err.code(), "NOT_FOUND");

    let err = service
        .create_project(&owner(), "a/b")
        .expect_err("slash in name");
    assert_eq!(err.kind(), ErrorKind::DecodeFailure);
}

#[test]
fn documents_are_created_under_folders_only() {
    let service = service();
    service
        .create_project(&owner(), "novel")
        .expect("create project");
    let root = root_of(&service);
    let folder = create(&service, root, true);
    let leaf = create(&service, folder, false);

    let tree = service.read_tree(&owner(), "novel").expect("read tree");
    let value = serde_json::to_value(&tree).expect("serialize tree");
    assert_eq!(value[root.to_string()]["children"], json!([folder]));
    assert_eq!(value[folder.to_string()]["children"], json!([leaf]));
    assert_eq!(value[leaf.to_string()], json!({"name": ""}));

    let form = CreateDocumentForm {
        folder: String::new(),
        parent: Some(leaf.to_string()),
    };
    let err = service
        .create_document(&owner(), "novel", &form)
        .expect_err("leaf parent");
    assert_eq!(err.kind(), ErrorKind::NotAFolder);

    let form = CreateDocumentForm {
        folder: String::new(),
        parent: Some("abc".to_string()),
    };
    let err = service
        .create_document(&owner(), "novel", &form)
        .expect_err("non-numeric parent");
    assert_eq!(err.kind(), ErrorKind::DecodeFailure);

    let form = CreateDocumentForm {
        folder: "true".to_string(),
        parent: None,
    };
    let err = service
        .create_document(&owner(), "novel", &form)
        .expect_err("missing parent");
    assert_eq!(err.kind(), ErrorKind::DecodeFailure);
    assert!(matches!(err, ServiceError::MissingField("parent")));
}

#[test]
fn structural_and_content_updates() {
    let service = service();
    service
        .create_project(&owner(), "novel")
        .expect("create project");
    let root = root_of(&service);
    let folder = create(&service, root, true);
    let leaf = create(&service, root, false);

    let body = json!({ folder.to_string(): {"name": "Part One", "collapsed": true} });
    service
        .update_tree(&owner(), "novel", body.to_string().as_bytes())
        .expect("rename");

    let body = json!({ leaf.to_string(): {"text": "It was a dark night.", "notes": "draft"} });
    service
        .update_documents(&owner(), "novel", body.to_string().as_bytes())
        .expect("content");

    let document = service
        .read_document(&owner(), "novel", &leaf.to_string())
        .expect("read leaf");
    let value = serde_json::to_value(&document).expect("serialize document");
    assert_eq!(
        value,
        json!({"notes": "draft", "synopsis": "", "text": "It was a dark night."})
    );

    let folder_doc = service
        .read_document(&owner(), "novel", &folder.to_string())
        .expect("read folder");
    let value = serde_json::to_value(&folder_doc).expect("serialize document");
    assert_eq!(value, json!({"notes": "", "synopsis": ""}));

    let tree = serde_json::to_value(service.read_tree(&owner(), "novel").expect("read tree"))
        .expect("serialize tree");
    assert_eq!(
        tree[folder.to_string()],
        json!({"name": "Part One", "collapsed": true, "children": []})
    );

    let body = json!({ leaf.to_string(): null });
    service
        .update_tree(&owner(), "novel", body.to_string().as_bytes())
        .expect("delete");
    let err = service
        .read_document(&owner(), "novel", &leaf.to_string())
        .expect_err("deleted");
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn edit_payload_errors_are_classified() {
    let service = service();
    service
        .create_project(&owner(), "novel")
        .expect("create project");
    let root = root_of(&service);
    let leaf = create(&service, root, false);

    let cases: Vec<(Vec<u8>, ErrorKind)> = vec![
        (b"not json".to_vec(), ErrorKind::DecodeFailure),
        (b"[1, 2]".to_vec(), ErrorKind::DecodeFailure),
        (json!({"x": null}).to_string().into_bytes(), ErrorKind::DecodeFailure),
        (
            json!({ leaf.to_string(): {"colour": "red"} }).to_string().into_bytes(),
            ErrorKind::UnknownProperty,
        ),
        (
            json!({ leaf.to_string(): {"name": 5} }).to_string().into_bytes(),
            ErrorKind::InvalidProperty,
        ),
        (
            json!({ root.to_string(): {"children": [root]} }).to_string().into_bytes(),
            ErrorKind::InvalidStructure,
        ),
    ];
    for (body, expected) in cases {
        let err = service
            .update_tree(&owner(), "novel", &body)
            .expect_err("bad structural body");
        assert_eq!(err.kind(), expected, "body {}", String::from_utf8_lossy(&body));
    }

    let body = json!({ root.to_string(): {"text": "no"} });
    let err = service
        .update_documents(&owner(), "novel", body.to_string().as_bytes())
        .expect_err("text on folder");
    assert_eq!(err.kind(), ErrorKind::InvalidProperty);
}

#[test]
fn malformed_body_is_rejected_before_the_project_is_resolved() {
    let service = service();
    let err = service
        .update_tree(&owner(), "missing", b"{")
        .expect_err("bad body");
    assert_eq!(err.kind(), ErrorKind::DecodeFailure);
}
