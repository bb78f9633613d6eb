use docmodel::{bson::doc, memory::InMemoryStore, prelude::*};

#[derive(Model)]
struct BlogPost;

#[derive(Model)]
#[model(collection = "people", name = "Person")]
struct PersonModel;

#[derive(Model)]
struct Comment;

#[test]
fn derived_models_name_their_collections() {
    assert_eq!(BlogPost::collection_name(), "blog_posts");
    assert_eq!(BlogPost::class().name(), "BlogPost");

    assert_eq!(PersonModel::collection_name(), "people");
    assert_eq!(PersonModel::class().name(), "Person");
}

#[tokio::test]
async fn derived_models_persist_through_their_class() {
    let db = Database::new("app", InMemoryStore::new());
    assert!(PersonModel::bind(&db));
    assert!(!PersonModel::bind(&db));

    let mut ada = PersonModel::new(doc! { "name": "Ada", "born": 1815 }).unwrap();
    ada.save().await.unwrap();

    let mut alan = PersonModel::construct(
        DocumentArgs::named(doc! { "name": "Alan" }).with("born", 1912),
    )
    .unwrap();
    alan.save().await.unwrap();

    let born_early = PersonModel::class()
        .find(Filter::lt("born", 1900), FindOptions::default())
        .await
        .unwrap();
    assert_eq!(born_early.len(), 1);
    assert_eq!(born_early[0], ada);
    assert_eq!(born_early[0].class(), PersonModel::class());
}

#[tokio::test]
async fn instances_of_one_model_cannot_seed_another() {
    let db = Database::new("app", InMemoryStore::new());
    Comment::bind(&db);

    let post = BlogPost::new(doc! { "title": "Hello" }).unwrap();
    assert!(matches!(
        Comment::construct(DocumentArgs::instance(post)),
        Err(DocumentError::Construction(_))
    ));

    let comment = Comment::new(doc! { "body": "First" }).unwrap();
    let copy = Comment::construct(DocumentArgs::instance(comment.clone())).unwrap();
    assert_eq!(copy, comment);
}
