mod common;

use bson::{Bson, doc};
use docmodel::{memory::InMemoryStore, prelude::*};
use futures::TryStreamExt;

use common::{Person, store};

async fn seeded() -> DocumentStore<InMemoryStore> {
    let store = store();
    let people = store.models::<Person>().unwrap();

    for (name, age, tags) in [
        ("Ann", 31, vec!["admin"]),
        ("Bob", 17, vec![]),
        ("Cid", 45, vec!["admin", "ops"]),
        ("Dee", 23, vec!["ops"]),
        ("Eve", 23, vec![]),
    ] {
        people
            .create(doc! { "name": name, "age": age, "tags": tags })
            .await
            .unwrap();
    }

    store
}

fn names(people: &mut [Person]) -> Vec<String> {
    people
        .iter_mut()
        .map(|person| person.get_as::<String>("name").unwrap().unwrap())
        .collect()
}

#[tokio::test]
async fn total_ignores_limit_and_reset_restores_everything() {
    let store = seeded().await;
    let people = store.models::<Person>().unwrap();

    let mut result = people.fetch(Query::new()).limit(1);
    assert_eq!(result.total().await.unwrap(), 5);

    assert_eq!(result.all().await.unwrap().len(), 1);
    assert!(result.next().await.unwrap().is_none());

    result.reset();
    assert_eq!(result.all().await.unwrap().len(), 5);
}

#[tokio::test]
async fn sort_chains_keys_and_rewind_replays() {
    let store = seeded().await;
    let people = store.models::<Person>().unwrap();

    let mut result = people
        .fetch(Filter::gte("age", 18))
        .sort("age", SortDirection::Asc)
        .sort("n", SortDirection::Desc);

    let mut first = result.all().await.unwrap();
    assert_eq!(names(&mut first), vec!["Eve", "Dee", "Ann", "Cid"]);

    result.rewind();
    let mut again = result.all().await.unwrap();
    assert_eq!(names(&mut again), names(&mut first));
}

#[tokio::test]
async fn get_indexes_the_window_without_iterating() {
    let store = seeded().await;
    let people = store.models::<Person>().unwrap();

    let mut result = people
        .fetch(Query::new())
        .sort("n", SortDirection::Asc)
        .skip(1)
        .limit(2);

    let mut second = result.get(1).await.unwrap().unwrap();
    assert_eq!(second.get("name").unwrap(), Bson::String("Cid".into()));
    assert!(result.get(2).await.unwrap().is_none());

    let mut first = result.next().await.unwrap().unwrap();
    assert_eq!(first.get("name").unwrap(), Bson::String("Bob".into()));
    assert!(!first.is_new());
}

#[tokio::test]
async fn filters_reach_into_lists() {
    let store = seeded().await;
    let people = store.models::<Person>().unwrap();

    let admins = people.fetch(Filter::contains("tags", "admin"));
    assert_eq!(admins.total().await.unwrap(), 2);

    let mut result = people
        .fetch(Filter::any_of("n", vec!["Bob", "Eve"]).or(Filter::gt("age", 40)))
        .sort("n", SortDirection::Asc);
    let mut matched = result.all().await.unwrap();
    assert_eq!(names(&mut matched), vec!["Bob", "Cid", "Eve"]);
}

#[tokio::test]
async fn stream_yields_every_match() {
    let store = seeded().await;
    let people = store.models::<Person>().unwrap();

    let mut streamed: Vec<Person> = people
        .fetch(Filter::lt("age", 30))
        .sort("n", SortDirection::Asc)
        .into_stream()
        .try_collect()
        .await
        .unwrap();

    assert_eq!(names(&mut streamed), vec!["Bob", "Dee", "Eve"]);
}

#[tokio::test]
async fn paginate_walks_the_root_query() {
    let store = seeded().await;
    let people = store.models::<Person>().unwrap();

    let result = people
        .fetch(Query::new())
        .sort("n", SortDirection::Asc)
        .limit(1);

    let mut page = result
        .paginate(&PaginationParams::new(2, 2))
        .await
        .unwrap();
    assert_eq!(page.count, 5);
    assert_eq!(page.next_page, Some(3));
    assert_eq!(page.previous_page, Some(1));
    assert_eq!(names(&mut page.items), vec!["Cid", "Dee"]);

    let last = result
        .paginate(&PaginationParams::new(3, 2))
        .await
        .unwrap();
    assert_eq!(last.items.len(), 1);
    assert_eq!(last.next_page, None);
}

#[tokio::test]
async fn zero_limit_and_far_windows_are_safe() {
    let store = seeded().await;
    let people = store.models::<Person>().unwrap();

    let mut result = people.fetch(Query::new()).limit(0);
    assert_eq!(result.all().await.unwrap().len(), 5);
    assert!(result.get(4).await.unwrap().is_some());

    let far = people.fetch(Query::new()).skip(usize::MAX);
    assert!(far.get(1).await.unwrap().is_none());

    let first = people
        .fetch(Query::new())
        .paginate(&PaginationParams::new(0, 2))
        .await
        .unwrap();
    assert_eq!(first.items.len(), 2);
    assert_eq!(first.next_page, Some(2));
    assert_eq!(first.previous_page, None);
}

#[tokio::test]
async fn dyn_store_serves_models() {
    let store = common::store().into_dyn();
    let people = store.models::<Person>().unwrap();

    people.create(doc! { "name": "Ann" }).await.unwrap();
    people.create(doc! { "name": "Bob" }).await.unwrap();

    assert_eq!(people.fetch(Query::new()).total().await.unwrap(), 2);
    assert_eq!(store.list_collections().await.unwrap(), vec!["people"]);

    let backend = store.backend_as::<InMemoryStore>().unwrap();
    assert_eq!(
        docmodel::backend::StoreBackend::count(backend, None, "people")
            .await
            .unwrap(),
        2
    );
}
