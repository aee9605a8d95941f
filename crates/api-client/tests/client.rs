use api_client::{ApiError, PriceListClient, ProductApi};
use configuration::{
    AppEnvironment, ClientSettings, CorsSettings, DatabaseSettings, LoggingSettings,
    ServerSettings, Settings,
};
use core_types::{BulkUpdateItem, NewProduct, ProductField, ProductPatch, ProductQuery};
use database::InMemoryStore;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;
use web_server::{build_router, AppState};

fn settings() -> Settings {
    Settings {
        server: ServerSettings {
            port: 0,
            environment: AppEnvironment::Test,
            body_limit_bytes: 1024 * 1024,
        },
        database: DatabaseSettings {
            url: String::new(),
            max_connections: 1,
            acquire_timeout_secs: 1,
        },
        cors: CorsSettings {
            allowed_origins: vec![configuration::DEFAULT_CORS_ORIGIN.to_string()],
        },
        client: ClientSettings {
            api_base_url: String::new(),
            timeout_secs: 5,
        },
        logging: LoggingSettings {
            directory: None,
            file_prefix: "test.log".to_string(),
        },
    }
}

/// Serves the real router on an ephemeral port.
async fn spawn_server() -> (PriceListClient, Arc<InMemoryStore>) {
    let store = Arc::new(InMemoryStore::new());
    let state = Arc::new(AppState {
        store: store.clone(),
    });
    let router = build_router(state, &settings());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    let client =
        PriceListClient::with_timeout(&format!("http://{addr}/api"), Duration::from_secs(5))
            .unwrap();
    (client, store)
}

fn widget(article_no: &str) -> NewProduct {
    let mut product = NewProduct::new(article_no, "Widget");
    product.price = Some(dec!(19.99));
    product
}

#[tokio::test]
async fn crud_round_trip() {
    let (client, store) = spawn_server().await;

    let created = client.create_product(&widget("AB-1")).await.unwrap();
    assert_eq!(created.price, dec!(19.99));
    assert_eq!(created.unit, "pieces");

    let fetched = client.get_product(created.id).await.unwrap();
    assert_eq!(fetched, created);

    let updated = client
        .update_product(created.id, &ProductPatch::new().in_stock(7))
        .await
        .unwrap();
    assert_eq!(updated.in_stock, 7);
    assert_eq!(updated.article_no, "AB-1");

    client.delete_product(created.id).await.unwrap();
    assert!(store.is_empty());
}

#[tokio::test]
async fn listing_carries_the_page_metadata() {
    let (client, _) = spawn_server().await;
    for article_no in ["ab-1", "XY-2", "CAB-3"] {
        client.create_product(&widget(article_no)).await.unwrap();
    }

    let page = client
        .list_products(&ProductQuery {
            search_article: Some("ab".into()),
            limit: Some(1),
            ..ProductQuery::default()
        })
        .await
        .unwrap();
    assert_eq!(page.total, 2);
    assert_eq!(page.limit, 1);
    assert_eq!(page.offset, 0);
    assert_eq!(page.products.len(), 1);
    assert_eq!(page.products[0].article_no, "CAB-3");
}

#[tokio::test]
async fn server_errors_surface_their_message() {
    let (client, _) = spawn_server().await;
    client.create_product(&widget("DUP")).await.unwrap();

    let err = client.create_product(&widget("DUP")).await.unwrap_err();
    assert_eq!(err.to_string(), "Article number already exists");
    assert_eq!(err.status(), Some(400));

    let err = client.get_product(404).await.unwrap_err();
    assert_eq!(err.to_string(), "Product not found");
    assert!(!err.is_connection());

    let err = client
        .create_product(&NewProduct::new("", "Widget"))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Validation failed");
    assert_eq!(err.details()[0].field, ProductField::ArticleNo.as_str());
}

#[tokio::test]
async fn bulk_update_returns_per_item_results() {
    let (client, _) = spawn_server().await;
    let a = client.create_product(&widget("A")).await.unwrap();

    let results = client
        .bulk_update(&[
            BulkUpdateItem {
                id: a.id,
                changes: ProductPatch::new().price(dec!(5)),
            },
            BulkUpdateItem {
                id: 999,
                changes: ProductPatch::new().price(dec!(5)),
            },
        ])
        .await
        .unwrap();

    assert_eq!(results.len(), 2);
    assert!(results[0].success);
    assert_eq!(results[0].data.as_ref().map(|p| p.price), Some(dec!(5)));
    assert!(!results[1].success);
    assert_eq!(results[1].error.as_deref(), Some("Product not found"));
}

#[tokio::test]
async fn health_reports_database_state() {
    let (client, store) = spawn_server().await;
    assert!(client.health().await.unwrap().is_healthy());

    store.set_unavailable(true);
    let report = client.health().await.unwrap();
    assert!(!report.is_healthy());
    assert_eq!(report.database, "disconnected");
}

#[tokio::test]
async fn unreachable_server_is_a_connection_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client =
        PriceListClient::with_timeout(&format!("http://{addr}/api"), Duration::from_secs(2))
            .unwrap();
    let err = client
        .list_products(&ProductQuery::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Transport(_)));
    assert!(err.is_connection());
}
