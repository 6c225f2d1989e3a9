//! Integration tests for DocumentStoreClient using the in-memory driver.

use mongowrap_client::{DocumentStoreClient, StoreConfig};
use mongowrap_core::bson::{Bson, doc};
use mongowrap_core::{Payload, QueryOptions, StoreError};
use mongowrap_db::MemoryServer;

/// Helper: connect a client to a fresh in-memory server.
async fn setup() -> (DocumentStoreClient<MemoryServer>, MemoryServer) {
    let server = MemoryServer::new();
    let config = StoreConfig::with_unauthenticated_user("anonymous", "anonymous");
    let client = DocumentStoreClient::new(config, server.clone()).unwrap();
    client.connect().await.unwrap();
    (client, server)
}

#[tokio::test]
async fn post_without_id_generates_one() {
    let (client, _server) = setup().await;

    let posted = client
        .post("notes", doc! { "title": "hello", "n": 1 })
        .await
        .unwrap()
        .into_one()
        .unwrap();

    let id = posted.get_str("id").unwrap().to_string();
    assert!(!id.is_empty());
    assert!(!posted.contains_key("_id"));

    let fetched = client.get("notes", id.as_str()).await.unwrap().unwrap();
    assert_eq!(fetched, doc! { "id": id.as_str(), "title": "hello", "n": 1 });
}

#[tokio::test]
async fn post_with_id_keeps_it() {
    let (client, server) = setup().await;

    let posted = client
        .post("notes", doc! { "id": "note-1", "title": "hello" })
        .await
        .unwrap()
        .into_one()
        .unwrap();
    assert_eq!(posted, doc! { "id": "note-1", "title": "hello" });

    // Storage uses the internal name only.
    let stored = server.documents("test", "notes");
    assert_eq!(stored, vec![doc! { "_id": "note-1", "title": "hello" }]);
}

#[tokio::test]
async fn post_batch_preserves_shape_and_order() {
    let (client, _server) = setup().await;

    let posted = client
        .post(
            "notes",
            vec![
                doc! { "id": "a", "n": 1 },
                doc! { "n": 2 },
                doc! { "id": "c", "n": 3 },
            ],
        )
        .await
        .unwrap();

    let Payload::Many(docs) = posted else {
        panic!("expected a batch result");
    };
    assert_eq!(docs.len(), 3);
    assert_eq!(docs[0].get_str("id").unwrap(), "a");
    assert!(!docs[1].get_str("id").unwrap().is_empty());
    assert_eq!(docs[2].get_str("id").unwrap(), "c");
    assert!(docs.iter().all(|d| !d.contains_key("_id")));
}

#[tokio::test]
async fn post_empty_batch_makes_no_driver_call() {
    let (client, server) = setup().await;
    let before = server.operation_count();

    let posted = client.post("notes", Payload::Many(Vec::new())).await.unwrap();
    assert_eq!(posted, Payload::Many(vec![]));
    assert_eq!(server.operation_count(), before);
}

#[tokio::test]
async fn post_duplicate_id_fails() {
    let (client, _server) = setup().await;
    client.post("notes", doc! { "id": "dup" }).await.unwrap();

    let err = client.post("notes", doc! { "id": "dup" }).await.unwrap_err();
    assert!(matches!(err, StoreError::DuplicateKey { .. }));
}

#[tokio::test]
async fn put_overrides_embedded_id() {
    let (client, _server) = setup().await;
    client
        .post("notes", doc! { "id": "n1", "title": "draft" })
        .await
        .unwrap();

    client
        .put(
            "notes",
            "n1",
            doc! { "id": "something-else", "_id": "stray", "title": "final" },
        )
        .await
        .unwrap();

    let fetched = client.get("notes", "n1").await.unwrap().unwrap();
    assert_eq!(fetched, doc! { "id": "n1", "title": "final" });
    assert!(client.get("notes", "something-else").await.unwrap().is_none());
}

#[tokio::test]
async fn put_unknown_id_writes_nothing() {
    let (client, _server) = setup().await;
    client.put("notes", "missing", doc! { "title": "x" }).await.unwrap();
    assert!(client.get("notes", "missing").await.unwrap().is_none());
}

#[tokio::test]
async fn del_then_get_is_not_found() {
    let (client, _server) = setup().await;
    let posted = client
        .post("notes", doc! { "title": "bye" })
        .await
        .unwrap()
        .into_one()
        .unwrap();
    let id = posted.get("id").cloned().unwrap();

    client.del("notes", id.clone()).await.unwrap();
    assert!(client.get("notes", id).await.unwrap().is_none());
}

#[tokio::test]
async fn find_returns_public_ids() {
    let (client, _server) = setup().await;
    client
        .post(
            "notes",
            vec![
                doc! { "id": "a", "tag": "x", "n": 2 },
                doc! { "id": "b", "tag": "x", "n": 1 },
                doc! { "id": "c", "tag": "y", "n": 3 },
            ],
        )
        .await
        .unwrap();

    let docs = client
        .find(
            "notes",
            doc! { "tag": "x" },
            Some(QueryOptions {
                sort: Some(doc! { "n": 1 }),
                ..QueryOptions::default()
            }),
        )
        .await
        .unwrap();

    assert_eq!(
        docs,
        vec![
            doc! { "id": "b", "tag": "x", "n": 1 },
            doc! { "id": "a", "tag": "x", "n": 2 },
        ]
    );
    assert!(docs.iter().all(|d| !d.contains_key("_id")));
}

#[tokio::test]
async fn find_by_public_id() {
    let (client, _server) = setup().await;
    client
        .post("notes", vec![doc! { "id": "a" }, doc! { "id": "b" }])
        .await
        .unwrap();

    let docs = client.find("notes", doc! { "id": "b" }, None).await.unwrap();
    assert_eq!(docs, vec![doc! { "id": "b" }]);

    let all = client.find("notes", doc! {}, None).await.unwrap();
    assert_eq!(all.len(), 2);
}

#[tokio::test]
async fn count_defaults_and_id_queries() {
    let (client, _server) = setup().await;
    client
        .post(
            "notes",
            vec![doc! { "id": 1, "tag": "x" }, doc! { "id": 2, "tag": "x" }],
        )
        .await
        .unwrap();

    assert_eq!(client.count("notes", None, None).await.unwrap(), 2);
    assert_eq!(
        client
            .count("notes", Some(doc! { "id": 2 }), None)
            .await
            .unwrap(),
        1
    );
    assert_eq!(
        client
            .count(
                "notes",
                Some(doc! { "tag": "x" }),
                Some(QueryOptions {
                    limit: Some(1),
                    ..QueryOptions::default()
                }),
            )
            .await
            .unwrap(),
        1
    );
    assert_eq!(client.count("empty", None, None).await.unwrap(), 0);
}

#[tokio::test]
async fn numeric_ids_round_trip() {
    let (client, _server) = setup().await;
    client.post("notes", doc! { "id": 7, "v": true }).await.unwrap();

    let fetched = client.get("notes", 7).await.unwrap().unwrap();
    assert_eq!(fetched.get("id"), Some(&Bson::Int32(7)));
}

#[tokio::test]
async fn empty_collection_name_is_rejected_without_driver_call() {
    let (client, server) = setup().await;
    let before = server.operation_count();

    let results = [
        client.count("", None, None).await.map(|_| ()),
        client.find("", doc! {}, None).await.map(|_| ()),
        client.get("", "x").await.map(|_| ()),
        client.put("", "x", doc! {}).await,
        client.post("", doc! {}).await.map(|_| ()),
        client.del("", "x").await,
    ];

    for result in results {
        assert!(matches!(result, Err(StoreError::InvalidArgument { .. })));
    }
    assert_eq!(server.operation_count(), before);
}

#[tokio::test]
async fn operations_require_connection() {
    let server = MemoryServer::new();
    let config = StoreConfig::with_unauthenticated_user("anonymous", "anonymous");
    let client = DocumentStoreClient::new(config, server.clone()).unwrap();

    assert!(!client.is_connected());
    let err = client.get("notes", "x").await.unwrap_err();
    assert!(matches!(err, StoreError::NotConnected));
    assert_eq!(server.operation_count(), 0);
}

#[tokio::test]
async fn client_is_shareable_across_tasks() {
    let (client, _server) = setup().await;
    let client = std::sync::Arc::new(client);

    let mut handles = Vec::new();
    for i in 0..8 {
        let client = std::sync::Arc::clone(&client);
        handles.push(tokio::spawn(async move {
            client.post("notes", doc! { "id": i }).await.map(|_| ())
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(client.count("notes", None, None).await.unwrap(), 8);
}
