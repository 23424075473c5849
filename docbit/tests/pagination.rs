use std::sync::Arc;

use docbit::{memory::InMemoryStore, prelude::*};

/// Hands the computed arguments back unchanged.
struct Echo;

impl PaginationAdapter for Echo {
    type Output = PaginationArgs;

    fn paginate(&self, args: &PaginationArgs) -> PaginationArgs {
        args.clone()
    }
}

fn items() -> Arc<Schema> {
    Arc::new(
        Schema::builder("Item")
            .field("name", Field::string())
            .field("rank", Field::int())
            .field("odd", Field::bool())
            .build()
            .unwrap(),
    )
}

async fn seeded(config: PaginationConfig) -> DocumentStore<InMemoryStore> {
    let store = DocumentStore::new(InMemoryStore::new()).with_config(config);
    let items = store.collection(items());

    for rank in 1..=25 {
        items
            .create(doc! { "name": format!("item{rank:02}"), "rank": rank, "odd": rank % 2 == 1 })
            .await
            .unwrap();
    }

    store
}

fn names(page: &Paginated<impl Sized>) -> Vec<String> {
    page.records
        .iter()
        .map(|record| record.get_str("name").unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_page_window_and_links() {
    let store = seeded(PaginationConfig::default()).await;
    let items = store.collection(items());

    let page = items
        .paginate(Query::builder().sort("rank").build(), &PageRequest::new(2), &LinkWindow)
        .await
        .unwrap();

    assert_eq!(page.skip, 10);
    assert_eq!(page.records.len(), 10);
    assert_eq!(names(&page).first().map(String::as_str), Some("item11"));
    assert_eq!(page.pagination.total_pages, 3);
    assert_eq!(page.pagination.previous_page, Some(1));
    assert_eq!(page.pagination.next_page, Some(3));
    assert_eq!(page.pagination.pages, vec![Some(1), Some(2), Some(3)]);
}

#[tokio::test]
async fn test_last_page_is_partial() {
    let store = seeded(PaginationConfig::default()).await;
    let items = store.collection(items());

    let page = items
        .paginate(Query::builder().sort("rank desc").build(), &PageRequest::new(3), &LinkWindow)
        .await
        .unwrap();

    assert_eq!(names(&page), vec!["item05", "item04", "item03", "item02", "item01"]);
    assert_eq!(page.pagination.next_page, None);
}

#[tokio::test]
async fn test_page_below_one_is_first_page() {
    let store = seeded(PaginationConfig::default()).await;
    let items = store.collection(items());

    let page = items
        .paginate(Query::builder().sort("rank").build(), &PageRequest::new(0), &Echo)
        .await
        .unwrap();

    assert_eq!(page.skip, 0);
    assert_eq!(page.pagination.page, 1);
    assert_eq!(names(&page).first().map(String::as_str), Some("item01"));
}

#[tokio::test]
async fn test_total_strategies() {
    let store = seeded(PaginationConfig::default()).await;
    let items = store.collection(items());
    let odd = || Query::builder().filter(Filter::eq("odd", true)).build();

    let all = items
        .paginate(odd(), &PageRequest::new(1), &Echo)
        .await
        .unwrap();
    assert_eq!(all.pagination.found, 13);
    assert_eq!(all.pagination.total, 25);
    assert_eq!(all.records.len(), 10);

    let docs = items
        .paginate(odd(), &PageRequest::new(1).total(TotalStrategy::Docs), &Echo)
        .await
        .unwrap();
    assert_eq!(docs.pagination.total, 13);
    assert_eq!(docs.pagination.total_pages(), 2);

    let fixed = items
        .paginate(odd(), &PageRequest::new(1).total(TotalStrategy::Fixed(100)), &LinkWindow)
        .await
        .unwrap();
    assert_eq!(fixed.pagination.total_pages, 10);
}

#[tokio::test]
async fn test_store_config_supplies_defaults() {
    let config: PaginationConfig =
        serde_json::from_str(r#"{"per_page": 5, "link_size": "sm", "link_align": "right"}"#).unwrap();
    let store = seeded(config).await;
    let items = store.collection(items());

    let page = items
        .paginate(Query::builder().sort("rank").build(), &PageRequest::new(2), &Echo)
        .await
        .unwrap();
    assert_eq!(page.skip, 5);
    assert_eq!(names(&page).first().map(String::as_str), Some("item06"));
    assert_eq!(page.pagination.per_page, 5);
    assert_eq!(page.pagination.inner_window, 2);
    assert_eq!(page.pagination.link_size.as_deref(), Some("sm"));
    assert_eq!(page.pagination.alignment.as_deref(), Some("right"));

    let labels = PageLabels {
        next_label: Some("Next".to_string()),
        ..PageLabels::default()
    };
    let request = PageRequest::new(1)
        .per_page(7)
        .search(true)
        .labels(labels.clone());
    let page = items
        .paginate(Query::new(), &request, &Echo)
        .await
        .unwrap();
    assert_eq!(page.records.len(), 7);
    assert_eq!(page.pagination.per_page, 7);
    assert!(page.pagination.search);
    assert_eq!(page.pagination.labels, labels);
}

#[tokio::test]
async fn test_query_window_is_replaced_by_page() {
    let store = seeded(PaginationConfig::default()).await;
    let items = store.collection(items());

    let query = Query::builder().sort("rank").limit(2).offset(20).build();
    let page = items
        .paginate(query, &PageRequest::new(1), &Echo)
        .await
        .unwrap();

    assert_eq!(page.records.len(), 10);
    assert_eq!(names(&page).first().map(String::as_str), Some("item01"));
}
