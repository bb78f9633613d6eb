use std::sync::Arc;

use docmodel::{
    bson::doc,
    capability::Capability,
    memory::InMemoryStore,
    prelude::*,
};

#[tokio::test]
async fn created_classes_are_bound_and_registered() {
    let db = Database::new("app", InMemoryStore::new());
    let mut models = Namespace::new();

    let users = create_document_class(&db, &mut models, "User", None, Vec::new());
    let audit = create_document_class(
        &db,
        &mut models,
        "AuditEntry",
        Some("audit_log"),
        vec![Arc::new(Timestamps::new()) as Arc<dyn Capability>],
    );

    assert!(users.is_bound());
    assert_eq!(users.collection_name(), "users");
    assert_eq!(audit.collection_name(), "audit_log");
    assert_eq!(
        models.iter().map(|(name, _)| name).collect::<Vec<_>>(),
        vec!["User", "AuditEntry"]
    );
    assert_eq!(models.get("User"), Some(&users));
    assert!(audit.capability::<Timestamps>().is_some());

    let mut alice = models
        .get("User")
        .unwrap()
        .from_fields(doc! { "name": "Alice" })
        .unwrap();
    alice.save().await.unwrap();

    let mut entry = audit.from_fields(doc! { "action": "login" }).unwrap();
    entry.save().await.unwrap();

    let found = users.find_one(doc! { "name": "Alice" }).await.unwrap().unwrap();
    assert_eq!(found.id(), alice.id());

    let logged = db
        .collection("audit_log")
        .find(doc! {}, FindOptions::default())
        .await
        .unwrap();
    assert_eq!(logged.len(), 1);
    assert!(logged[0].get_datetime("created_at").is_ok());
}

#[test]
fn registering_again_replaces_the_previous_class() {
    let db = Database::new("app", InMemoryStore::new());
    let mut models = Namespace::new();

    let first = create_document_class(&db, &mut models, "User", None, Vec::new());
    let second = create_document_class(&db, &mut models, "User", Some("members"), Vec::new());

    assert_eq!(models.len(), 1);
    assert_ne!(first, second);
    assert_eq!(models.get("User").map(DocumentClass::collection_name), Some("members"));
}
