mod common;

use common::{people, probe_database};
use docmodel::{
    bson::{Bson, DateTime, doc, oid::ObjectId},
    prelude::*,
};

fn users(database: &Database) -> DocumentClass {
    DocumentClass::builder("User").bind(database).build()
}

#[tokio::test]
async fn first_save_assigns_an_identifier() {
    let (_, db) = probe_database();
    let users = users(&db);

    let mut alice = users.from_fields(doc! { "name": "Alice", "age": 18 }).unwrap();
    assert!(!alice.is_saved().await);

    alice.save().await.unwrap();

    let id = alice.id().expect("saved document has an id");
    assert_eq!(id.to_hex().len(), 24);
    assert!(alice.is_saved().await);
    assert_eq!(users.find_by_id(id).await.unwrap(), Some(alice));
}

#[tokio::test]
async fn saving_twice_writes_once() {
    let (probe, db) = probe_database();
    let users = users(&db);

    let mut alice = users.from_fields(doc! { "name": "Alice", "age": 18 }).unwrap();
    alice.save().await.unwrap();
    alice.save().await.unwrap();

    assert_eq!(probe.writes(), 1);
}

#[tokio::test]
async fn has_changed_reports_exactly_the_mutated_fields() {
    let (probe, db) = probe_database();
    let users = users(&db);

    let mut alice = users.from_fields(doc! { "name": "Alice", "age": 18 }).unwrap();
    alice.save().await.unwrap();

    alice.set("age", 19).unwrap();
    alice.set("email", "alice@example.com").unwrap();

    assert_eq!(
        alice.has_changed().await,
        doc! { "age": 19, "email": "alice@example.com" }
    );
    assert!(matches!(alice.changes().await, ChangeSet::Modified(_)));

    alice.save().await.unwrap();
    assert_eq!(probe.writes(), 2);
    assert!(alice.has_changed().await.is_empty());

    let stored = probe
        .inner
        .find_one("users", doc! { "_id": alice.id().unwrap() })
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.get_i32("age").unwrap(), 19);
    assert_eq!(stored.get_str("email").unwrap(), "alice@example.com");
}

#[tokio::test]
async fn stale_update_fails_with_not_found() {
    let (probe, db) = probe_database();
    let users = users(&db);

    let mut alice = users.from_fields(doc! { "name": "Alice", "age": 18 }).unwrap();
    alice.save().await.unwrap();
    let id = alice.id().unwrap();

    probe.inner.delete_many("users", doc! {}).await.unwrap();

    alice.set("age", 19).unwrap();
    match alice.save().await {
        Err(DocumentError::DocumentNotFound { id: missing, collection }) => {
            assert_eq!(missing, id.to_hex());
            assert_eq!(collection, "users");
        }
        other => panic!("expected not found, got {other:?}"),
    }
}

#[tokio::test]
async fn reload_overwrites_stored_fields_and_keeps_local_ones() {
    let (probe, db) = probe_database();
    let users = users(&db);

    let mut unsaved = users.from_fields(doc! { "name": "Nobody" }).unwrap();
    assert!(matches!(
        unsaved.reload().await,
        Err(DocumentError::UnsavedDocument { operation: "reload", .. })
    ));

    let mut alice = users.from_fields(doc! { "name": "Alice", "age": 18 }).unwrap();
    alice.save().await.unwrap();
    let id = alice.id().unwrap();

    probe
        .inner
        .update_one("users", doc! { "_id": id }, Update::Set(doc! { "age": 50 }))
        .await
        .unwrap();

    alice.set("age", 20).unwrap();
    alice.set("nickname", "Al").unwrap();
    alice.reload().await.unwrap();

    assert_eq!(alice.get("age"), Some(&Bson::Int32(50)));
    assert_eq!(alice.get_str("nickname"), Some("Al"));

    probe.inner.delete_many("users", doc! {}).await.unwrap();
    assert!(matches!(
        alice.reload().await,
        Err(DocumentError::DocumentNotFound { .. })
    ));
}

#[tokio::test]
async fn delete_field_is_best_effort() {
    let (probe, db) = probe_database();
    let users = users(&db);

    let mut alice = users
        .from_fields(doc! { "name": "Alice", "email": "a@example.com", "phone": "555" })
        .unwrap();
    alice.save().await.unwrap();
    let id = alice.id().unwrap();

    assert_eq!(alice.delete_field("email").await, FieldDeletion::Removed);
    assert_eq!(alice.get("email"), None);

    let stored = probe.inner.find_one("users", doc! { "_id": id }).await.unwrap().unwrap();
    assert!(!stored.contains_key("email"));

    probe.fail_writes(true);
    assert!(matches!(alice.delete_field("phone").await, FieldDeletion::Failed(_)));
    probe.fail_writes(false);

    assert_eq!(alice.get_str("phone"), Some("555"));
    assert!(alice.is_saved().await);
    assert_eq!(alice.delete_field("phone").await, FieldDeletion::Removed);
    assert_eq!(alice.get("phone"), None);

    let stored = probe.inner.find_one("users", doc! { "_id": id }).await.unwrap().unwrap();
    assert!(!stored.contains_key("phone"));
}

#[tokio::test]
async fn empty_documents_are_saved_only_after_save() {
    let (probe, db) = probe_database();
    let users = users(&db);

    let mut blank = users.construct(DocumentArgs::new()).unwrap();
    assert!(!blank.is_saved().await);

    if !blank.is_saved().await {
        blank.save().await.unwrap();
    }

    assert!(blank.id().is_some());
    assert!(blank.is_saved().await);
    assert_eq!(probe.writes(), 1);
}

#[tokio::test]
async fn delete_document_leaves_a_stale_identifier() {
    let (_, db) = probe_database();
    let users = users(&db);

    let unsaved = users.from_fields(doc! { "name": "Nobody" }).unwrap();
    assert!(matches!(
        unsaved.delete_document().await,
        Err(DocumentError::UnsavedDocument { operation: "delete", .. })
    ));

    let mut alice = users.from_fields(doc! { "name": "Alice" }).unwrap();
    alice.save().await.unwrap();
    let id = alice.id().unwrap();

    alice.delete_document().await.unwrap();

    assert_eq!(alice.id(), Some(id));
    assert_eq!(users.find_by_id(id).await.unwrap(), None);
    assert_eq!(users.document_count(None).await.unwrap(), 0);
}

#[tokio::test]
async fn unverified_change_checks_are_distinguished() {
    let (probe, db) = probe_database();
    let users = users(&db);

    let mut alice = users.from_fields(doc! { "name": "Alice", "age": 18 }).unwrap();
    alice.save().await.unwrap();
    alice.set("age", 19).unwrap();

    probe.fail_reads(true);

    assert!(matches!(alice.changes().await, ChangeSet::Unverified(_)));
    assert!(alice.has_changed().await.is_empty());
    assert!(alice.is_saved().await);
    assert!(matches!(alice.save().await, Err(DocumentError::Backend(_))));
    assert_eq!(probe.writes(), 1);

    probe.fail_reads(false);
    assert_eq!(alice.has_changed().await, doc! { "age": 19 });
}

#[tokio::test]
async fn unbound_class_fails_before_io() {
    let class = DocumentClass::new("Orphan");
    let mut orphan = class.from_fields(doc! { "name": "x" }).unwrap();

    assert!(matches!(
        orphan.save().await,
        Err(DocumentError::CollectionUnavailable(ref name)) if name == "orphans"
    ));
    assert!(matches!(
        class.find(doc! {}, FindOptions::default()).await,
        Err(DocumentError::CollectionUnavailable(_))
    ));
}

#[tokio::test]
async fn twenty_six_users_round_trip_through_queries() {
    let (_, db) = probe_database();
    let users = users(&db);

    let report = users.insert_many(people()).await.unwrap();
    assert_eq!(report.inserted.len(), 26);
    assert_eq!(report.skipped, 0);

    let older = users
        .find(doc! { "age": { "$gt": 30 } }, FindOptions::default())
        .await
        .unwrap();
    assert_eq!(older.len(), 13);
    assert_eq!(
        older.iter().map(|u| u.get("age").cloned()).collect::<Vec<_>>(),
        (31..=43).map(|age| Some(Bson::Int32(age))).collect::<Vec<_>>()
    );

    users.delete(doc! { "age": { "$gt": 30 } }).await.unwrap();

    let older = users
        .find(doc! { "age": { "$gt": 30 } }, FindOptions::default())
        .await
        .unwrap();
    assert!(older.is_empty());
    assert_eq!(users.document_count(None).await.unwrap(), 13);
    assert_eq!(users.document_count(Some(Filter::lt("age", 20))).await.unwrap(), 2);
}

#[tokio::test]
async fn lookups_by_identifier() {
    let (_, db) = probe_database();
    let users = users(&db);

    assert_eq!(users.find_by_id("not-24-hex-chars").await.unwrap(), None);
    assert_eq!(users.find_by_id(ObjectId::new()).await.unwrap(), None);

    let mut alice = users.from_fields(doc! { "name": "Alice" }).unwrap();
    alice.save().await.unwrap();
    let id = alice.id().unwrap();

    let by_hex = users.find_by_id(id.to_hex()).await.unwrap().unwrap();
    assert_eq!(by_hex.get_str("name"), Some("Alice"));

    let by_string_filter = users.find_one(doc! { "_id": id.to_hex() }).await.unwrap();
    let by_canonical_filter = users.find_one(doc! { "_id": id }).await.unwrap();
    assert_eq!(by_string_filter, by_canonical_filter);
    assert!(by_string_filter.is_some());

    assert!(matches!(
        users.find(doc! { "_id": "nope" }, FindOptions::default()).await,
        Err(DocumentError::FieldValidation { .. })
    ));
}

#[tokio::test]
async fn find_in_and_all_honor_options() {
    let (_, db) = probe_database();
    let users = users(&db);
    users.insert_many(people()).await.unwrap();

    let picked = users.find_in("name", ["Alice", "Eve", "Zed"]).await.unwrap();
    assert_eq!(
        picked.iter().filter_map(|u| u.get_str("name")).collect::<Vec<_>>(),
        vec!["Alice", "Eve"]
    );

    let oldest = users
        .all(
            FindOptions::builder()
                .sort("age", SortDirection::Desc)
                .limit(3)
                .projection(doc! { "name": 1 })
                .build(),
        )
        .await
        .unwrap();
    assert_eq!(
        oldest.iter().filter_map(|u| u.get_str("name")).collect::<Vec<_>>(),
        vec!["Zach", "Yvonne", "Xavier"]
    );
    assert!(oldest.iter().all(|u| u.id().is_some() && u.get("age").is_none()));

    let keys = users
        .all(FindOptions::builder().return_key(true).limit(2).build())
        .await
        .unwrap();
    assert!(keys.iter().all(|u| u.fields().is_empty() && u.id().is_some()));
}

#[tokio::test]
async fn insert_many_skips_failed_writes() {
    let (_, db) = probe_database();
    let users = users(&db);

    let taken = ObjectId::new();
    users
        .insert_many([doc! { "_id": taken, "name": "First" }])
        .await
        .unwrap();

    let report = users
        .insert_many([
            doc! { "name": "Alice" },
            doc! { "_id": taken, "name": "Duplicate" },
            doc! { "name": "Bob" },
        ])
        .await
        .unwrap();

    assert_eq!(report.inserted.len(), 2);
    assert_eq!(report.skipped, 1);
    assert_eq!(users.document_count(None).await.unwrap(), 3);

    assert!(matches!(
        users.insert_many([doc! { "_id": "bad-id" }]).await,
        Err(DocumentError::FieldValidation { .. })
    ));

    let aborted = users
        .insert_many([
            doc! { "name": "Carol" },
            doc! { "_id": "bad-id", "name": "Dave" },
            doc! { "name": "Erin" },
        ])
        .await
        .unwrap_err();
    match aborted {
        DocumentError::BatchAborted { inserted, source } => {
            assert_eq!(inserted.len(), 1);
            assert!(matches!(*source, DocumentError::FieldValidation { .. }));
            let carol = users.find_by_id(inserted[0]).await.unwrap().unwrap();
            assert_eq!(carol.get_str("name"), Some("Carol"));
        }
        other => panic!("expected an aborted batch, got {other:?}"),
    }
    assert_eq!(users.document_count(None).await.unwrap(), 4);
}

#[tokio::test]
async fn to_dict_matches_the_stored_record_after_reload() {
    let (_, db) = probe_database();
    let users = users(&db);

    let joined = DateTime::from_millis(1_680_000_000_123);
    let mut alice = users
        .from_fields(doc! { "name": "Alice", "joined": joined, "tags": ["a"] })
        .unwrap();
    alice.save().await.unwrap();
    alice.reload().await.unwrap();

    let id = alice.id().unwrap();
    assert_eq!(
        alice.to_dict(),
        doc! {
            "_id": id.to_hex(),
            "name": "Alice",
            "joined": "2023-03-28T10:40:00.123Z",
            "tags": ["a"],
        }
    );

    let json: serde_json::Value = serde_json::from_str(&alice.to_json().unwrap()).unwrap();
    assert_eq!(json["_id"], id.to_hex());
    assert_eq!(json["joined"], "2023-03-28T10:40:00.123Z");
}

#[tokio::test]
async fn timestamps_capability_stamps_writes() {
    let (probe, db) = probe_database();
    let events = DocumentClass::builder("Event")
        .capability(Timestamps::new())
        .bind(&db)
        .build();

    let mut launch = events.from_fields(doc! { "title": "Launch" }).unwrap();
    launch.save().await.unwrap();
    assert!(launch.get("created_at").is_some());
    assert!(launch.is_saved().await);

    launch.set("title", "Launch v2").unwrap();
    launch.save().await.unwrap();
    assert!(launch.get("updated_at").is_some());

    let stored = probe
        .inner
        .find_one("events", doc! { "_id": launch.id().unwrap() })
        .await
        .unwrap()
        .unwrap();
    assert!(stored.get_datetime("created_at").is_ok());
    assert!(stored.get_datetime("updated_at").is_ok());
    assert!(launch.is_saved().await);
}

#[tokio::test]
async fn result_lists_of_documents() {
    let (_, db) = probe_database();
    let users = users(&db);
    users.insert_many(people()).await.unwrap();

    let all = users.all(FindOptions::default()).await.unwrap();
    assert_eq!(all.first().and_then(|u| u.get_str("name")), Some("Alice"));
    assert_eq!(all.last().and_then(|u| u.get_str("name")), Some("Zach"));

    let decades = all.group_by(|u| u.get("age").and_then(Bson::as_i32).unwrap_or_default() / 10);
    assert_eq!(decades.keys().copied().collect::<Vec<_>>(), vec![1, 2, 3, 4]);
    assert_eq!(decades[&1].len(), 2);

    let total_age = all
        .clone()
        .map(|u| u.get("age").and_then(Bson::as_i32).unwrap_or_default())
        .reduce(|a, b| a + b);
    assert_eq!(total_age, Some((18..=43).sum()));

    let mut sorted = all.filter(|u| u.get_str("name").is_some_and(|n| n.len() == 3));
    sorted.sort_by_key(|u| u.get_str("name").map(str::to_string), true);
    assert_eq!(
        sorted.iter().filter_map(|u| u.get_str("name")).collect::<Vec<_>>(),
        vec!["Eve", "Bob"]
    );
}
