mod common;

use bson::{Bson, DateTime, doc};
use chrono::NaiveDate;
use docmodel::{backend::StoreBackend, prelude::*};
use serde_json::json;

use common::{Foo, Person, Point, Ticket, store};

#[tokio::test]
async fn create_fills_defaults_and_persists() {
    let store = store();
    let foos = store.models::<Foo>().unwrap();

    let mut foo = foos.create(doc! { "str_field": "x" }).await.unwrap();

    assert!(!foo.is_new());
    assert_eq!(foo.get("str_field").unwrap(), Bson::String("x".into()));
    assert_eq!(foo.get("int_field").unwrap(), Bson::Int64(0));
    assert_eq!(foo.get("list_field").unwrap(), Bson::Array(vec![]));
    assert!(foo.id().is_some());
}

#[tokio::test]
async fn create_runs_default_producers_per_instance() {
    let store = store();
    let tickets = store.models::<Ticket>().unwrap();

    let mut first = tickets.create(doc! {}).await.unwrap();
    let mut second = tickets.create(doc! {}).await.unwrap();

    let first_token = first.get_as::<String>("token").unwrap().unwrap();
    let second_token = second.get_as::<String>("token").unwrap().unwrap();
    assert_ne!(first_token, second_token);

    let mut loaded = tickets
        .get_one(first.id().cloned().unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(loaded.get_as::<String>("token").unwrap(), Some(first_token));
}

#[tokio::test]
async fn get_one_returns_the_stored_document() {
    let store = store();
    let people = store.models::<Person>().unwrap();

    let created = people
        .create(doc! {
            "name": "Mary",
            "age": "20",
            "birthday": DateTime::from_chrono(
                NaiveDate::from_ymd_opt(1999, 4, 2)
                    .unwrap()
                    .and_hms_opt(13, 0, 0)
                    .unwrap()
                    .and_utc(),
            ),
            "home": { "x": 1, "y": 2 },
        })
        .await
        .unwrap();
    let id = created.id().cloned().unwrap();

    let mut loaded = people.get_one(id.clone()).await.unwrap().unwrap();
    assert!(!loaded.is_new());
    assert_eq!(loaded.record().to_document(), created.record().to_document());

    assert_eq!(loaded.get("age").unwrap(), Bson::Int64(20));
    assert_eq!(
        loaded.get_date("birthday").unwrap(),
        NaiveDate::from_ymd_opt(1999, 4, 2)
    );
    assert_eq!(
        loaded.get_as::<Point>("home").unwrap(),
        Some(Point { x: 1, y: 2 })
    );

    let raw = StoreBackend::find_one(store.backend(), Filter::id(id), None, "people")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(raw.get_str("n").unwrap(), "Mary");
    assert!(!raw.contains_key("name"));
}

#[tokio::test]
async fn get_one_misses_and_rejects_null() {
    let store = store();
    let people = store.models::<Person>().unwrap();

    assert!(people.get_one("nobody").await.unwrap().is_none());
    assert!(matches!(
        people.get_one(Bson::Null).await.unwrap_err(),
        ModelError::Argument(_)
    ));
}

#[tokio::test]
async fn unknown_keys_persist_nothing() {
    let store = store();
    let foos = store.models::<Foo>().unwrap();

    let err = foos.create(doc! { "unknown_key": 1 }).await.unwrap_err();
    assert!(matches!(err, ModelError::UnknownField { field, .. } if field == "unknown_key"));
    assert_eq!(StoreBackend::count(store.backend(), None, "foo").await.unwrap(), 0);
}

#[tokio::test]
async fn save_twice_leaves_the_store_unchanged() {
    let store = store();
    let foos = store.models::<Foo>().unwrap();

    let mut foo = foos
        .create(doc! { "str_field": "x", "int_field": 3 })
        .await
        .unwrap();
    let id = foo.id().cloned().unwrap();

    let before = StoreBackend::find_one(store.backend(), Filter::id(id.clone()), None, "foo")
        .await
        .unwrap();
    foos.save(&mut foo, None).await.unwrap();
    foos.save(&mut foo, None).await.unwrap();
    let after = StoreBackend::find_one(store.backend(), Filter::id(id), None, "foo")
        .await
        .unwrap();

    assert_eq!(before, after);
    assert_eq!(StoreBackend::count(store.backend(), None, "foo").await.unwrap(), 1);
}

#[tokio::test]
async fn save_updates_only_allowed_fields() {
    let store = store();
    let foos = store.models::<Foo>().unwrap();

    let mut foo = foos.create(doc! { "str_field": "x" }).await.unwrap();
    foo.set("str_field", "y").unwrap();
    foo.set("int_field", 7).unwrap();
    foos.save(&mut foo, Some(&["int_field"][..])).await.unwrap();

    let mut loaded = foos.get_one(foo.id().cloned().unwrap()).await.unwrap().unwrap();
    assert_eq!(loaded.get("str_field").unwrap(), Bson::String("x".into()));
    assert_eq!(loaded.get("int_field").unwrap(), Bson::Int64(7));
}

#[tokio::test]
async fn new_instances_get_an_id_on_first_save() {
    let store = store();
    let people = store.models::<Person>().unwrap();

    let mut person = Person::new().unwrap();
    person.set("name", "Ann").unwrap();
    assert!(person.is_new());
    assert!(person.id().is_none());

    people.save(&mut person, None).await.unwrap();
    assert!(!person.is_new());
    let id = person.id().and_then(Bson::as_str).unwrap().to_string();
    assert!(uuid::Uuid::parse_str(&id).is_ok());

    // Saving a persisted instance whose document is gone matches nothing.
    store.drop_collection("people").await.unwrap();
    assert!(matches!(
        people.save(&mut person, None).await.unwrap_err(),
        ModelError::Save { .. }
    ));
}

#[tokio::test]
async fn list_defaults_are_not_shared() {
    let store = store();
    let foos = store.models::<Foo>().unwrap();

    let mut a = foos.create(doc! {}).await.unwrap();
    let mut b = foos.create(doc! {}).await.unwrap();

    let mut list = a.get_as::<Vec<String>>("list_field").unwrap().unwrap();
    list.push("only a".to_string());
    a.set("list_field", list).unwrap();
    foos.save(&mut a, None).await.unwrap();

    assert_eq!(b.get("list_field").unwrap(), Bson::Array(vec![]));
    let mut reloaded = foos.get_one(b.id().cloned().unwrap()).await.unwrap().unwrap();
    assert_eq!(reloaded.get("list_field").unwrap(), Bson::Array(vec![]));
}

#[tokio::test]
async fn typed_fields_reject_wrong_shapes() {
    let store = store();
    let people = store.models::<Person>().unwrap();

    let err = people
        .create(doc! { "birthday": 20161201 })
        .await
        .unwrap_err();
    assert!(matches!(err, ModelError::FieldValue(_)));

    let mut person = Person::new().unwrap();
    assert!(person.set("home", doc! { "x": "far" }).is_err());
    assert!(person.set("tags", "not a list").is_err());

    person.set_null("age").unwrap();
    assert_eq!(person.get("age").unwrap(), Bson::Null);
}

#[tokio::test]
async fn jsonify_round_trip() {
    let store = store();
    let people = store.models::<Person>().unwrap();

    let mut mary = people
        .create(doc! { "name": "Mary", "active": 1, "tags": ["a", "b"], "home": { "x": 3, "y": 4 } })
        .await
        .unwrap();
    mary.set_date("birthday", NaiveDate::from_ymd_opt(2016, 12, 1).unwrap())
        .unwrap();

    let payload = mary.to_jsonify();
    assert_eq!(payload[TYPE_TAG_KEY], json!("Person"));
    assert_eq!(payload["birthday"], json!("2016-12-01"));
    assert_eq!(payload["active"], json!(true));
    assert_eq!(payload["home"], json!({ "x": 3, "y": 4 }));

    let mut copy = Person::from_jsonify(&payload).unwrap();
    assert!(copy.is_new());
    for key in ["name", "age", "active", "birthday", "home", "tags"] {
        assert_eq!(copy.get(key).unwrap(), mary.get(key).unwrap(), "{key}");
    }
}

#[tokio::test]
async fn jsonify_omits_untouched_fields() {
    store();

    let mut person = Person::new().unwrap();
    person.set("name", "Bo").unwrap();

    let payload = person.to_jsonify();
    assert_eq!(payload.len(), 2);
    assert_eq!(payload["name"], json!("Bo"));
}

#[tokio::test]
async fn update_from_jsonify_skips_bad_dates() {
    store();

    let mut person = Person::new().unwrap();
    person
        .set_date("birthday", NaiveDate::from_ymd_opt(2000, 1, 1).unwrap())
        .unwrap();

    let payload = json!({ "name": "Al", "age": 40, "birthday": "not a date" });
    person
        .update_from_jsonify(payload.as_object().unwrap(), None)
        .unwrap();

    assert_eq!(person.get("name").unwrap(), Bson::String("Al".into()));
    assert_eq!(person.get("age").unwrap(), Bson::Int64(40));
    assert_eq!(
        person.get_date("birthday").unwrap(),
        NaiveDate::from_ymd_opt(2000, 1, 1)
    );

    let payload = json!({ "name": "Zed", "age": 1 });
    person
        .update_from_jsonify(payload.as_object().unwrap(), Some(&["age"][..]))
        .unwrap();
    assert_eq!(person.get("name").unwrap(), Bson::String("Al".into()));
    assert_eq!(person.get("age").unwrap(), Bson::Int64(1));
}

#[tokio::test]
async fn from_jsonify_checks_the_type_tag() {
    store();

    let foo_payload = json!({ "__class__": "Foo", "str_field": "x" });
    assert!(matches!(
        Person::from_jsonify(foo_payload.as_object().unwrap()).unwrap_err(),
        ModelError::Parser { .. }
    ));

    let untagged = json!({ "name": "x" });
    assert!(matches!(
        Person::from_jsonify(untagged.as_object().unwrap()).unwrap_err(),
        ModelError::Parser { .. }
    ));
}

#[tokio::test]
async fn from_raw_wraps_documents() {
    let store = store();
    let foos = store.models::<Foo>().unwrap();

    let mut foo = foos
        .from_raw(doc! { "_id": "f1", "str_field": "raw", "extra": true })
        .unwrap();
    assert!(!foo.is_new());
    assert_eq!(foo.get("str_field").unwrap(), Bson::String("raw".into()));
    assert!(foo.record().to_document().get("extra").is_none());

    assert!(matches!(
        foos.from_raw(doc! { "str_field": "no id" }).unwrap_err(),
        ModelError::Argument(_)
    ));
}

#[tokio::test]
async fn saving_an_unstored_raw_document_fails() {
    let store = store();
    let foos = store.models::<Foo>().unwrap();

    let mut ghost = foos.from_raw(doc! { "_id": "ghost" }).unwrap();
    assert!(matches!(
        foos.save(&mut ghost, None).await.unwrap_err(),
        ModelError::Save { .. }
    ));
    assert_eq!(StoreBackend::count(store.backend(), None, "foo").await.unwrap(), 0);
}
