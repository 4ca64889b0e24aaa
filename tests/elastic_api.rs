// file: tests/elastic_api.rs
// description: integration tests against a mocked Elasticsearch endpoint
// reference: https://docs.rs/httpmock

use es_ingest::{
    Config, Document, DocumentInserter, ElasticClient, IndexManager, IngestError, SearchHit,
};
use httpmock::prelude::*;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::io::Write;

/// Config pointing at the mock server, with fallback embeddings so no
/// embedding endpoint is needed.
fn test_config(server: &MockServer) -> Config {
    let mut config = Config::default_config();
    config.elastic.url = Some(server.base_url());
    config.elastic.api_key = Some("test-key".to_string());
    config.ingest.batch_size = 2;
    config
}

fn client(config: &Config) -> ElasticClient {
    ElasticClient::new(config.elastic.clone()).unwrap()
}

#[tokio::test]
async fn connect_fetches_cluster_info() {
    let server = MockServer::start_async().await;
    let config = test_config(&server);

    let info_mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/")
                .header("Authorization", "ApiKey test-key");
            then.status(200).json_body(json!({
                "name": "instance-0",
                "cluster_name": "test-cluster",
                "version": {"number": "8.13.0"}
            }));
        })
        .await;

    let client = client(&config);
    let info = client.info().await.unwrap();

    info_mock.assert_async().await;
    assert_eq!(info["cluster_name"], json!("test-cluster"));
    assert!(client.ping().await.unwrap());
}

#[tokio::test]
async fn recreate_ignores_missing_index_and_declares_vector_field() {
    let server = MockServer::start_async().await;
    let config = test_config(&server);

    let delete_mock = server
        .mock_async(|when, then| {
            when.method(DELETE).path("/my_documents");
            then.status(404).json_body(json!({
                "error": {"type": "index_not_found_exception"},
                "status": 404
            }));
        })
        .await;

    let create_mock = server
        .mock_async(|when, then| {
            when.method(PUT).path("/my_documents").json_body(json!({
                "mappings": {
                    "properties": {
                        "embedding": {"type": "dense_vector", "dims": 384}
                    }
                }
            }));
            then.status(200)
                .json_body(json!({"acknowledged": true, "index": "my_documents"}));
        })
        .await;

    let client = client(&config);
    let index = IndexManager::new(&client, config.index.clone());
    index.recreate(Some(384)).await.unwrap();

    delete_mock.assert_async().await;
    create_mock.assert_async().await;
}

#[tokio::test]
async fn bulk_insert_batches_and_counts_results() {
    let server = MockServer::start_async().await;
    let config = test_config(&server);

    // batch_size is 2, so 4 documents arrive as two bulk calls
    let bulk_mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/my_documents/_bulk")
                .header("Content-Type", "application/x-ndjson");
            then.status(200).json_body(json!({
                "errors": false,
                "items": [
                    {"index": {"_id": "a", "status": 201}},
                    {"index": {"_id": "b", "status": 201}}
                ]
            }));
        })
        .await;

    let client = client(&config);
    let inserter = DocumentInserter::new(&client, &config);

    let documents = Document::array_from_value(json!([
        {"summary": "one"},
        {"summary": "two"},
        {"summary": "three"},
        {"summary": "four"}
    ]))
    .unwrap();

    let stats = inserter.bulk_insert(documents).await.unwrap();

    assert_eq!(bulk_mock.hits_async().await, 2);
    assert_eq!(stats.indexed, 4);
    assert_eq!(stats.errors, 0);
}

#[tokio::test]
async fn bulk_insert_skips_documents_missing_the_text_field() {
    let server = MockServer::start_async().await;
    let config = test_config(&server);

    let bulk_mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/my_documents/_bulk");
            then.status(200).json_body(json!({
                "errors": false,
                "items": [{"index": {"_id": "a", "status": 201}}]
            }));
        })
        .await;

    let client = client(&config);
    let inserter = DocumentInserter::new(&client, &config);

    let documents = Document::array_from_value(json!([
        {"summary": "has the field"},
        {"title": "missing the summary field"}
    ]))
    .unwrap();

    let stats = inserter.bulk_insert(documents).await.unwrap();

    assert_eq!(bulk_mock.hits_async().await, 1);
    assert_eq!(stats.indexed, 1);
    assert_eq!(stats.errors, 1);
}

#[tokio::test]
async fn insert_document_attaches_embedding_and_returns_engine_response() {
    let server = MockServer::start_async().await;
    let config = test_config(&server);

    let index_mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/my_documents/_doc")
                .json_body_partial(r#"{"summary": "work from home policy"}"#);
            then.status(201)
                .json_body(json!({"_id": "doc-1", "result": "created"}));
        })
        .await;

    let client = client(&config);
    let inserter = DocumentInserter::new(&client, &config);

    let document = Document::from_value(json!({"summary": "work from home policy"})).unwrap();
    let response = inserter.insert_document(document).await.unwrap();

    index_mock.assert_async().await;
    assert_eq!(response["_id"], json!("doc-1"));
}

#[tokio::test]
async fn insert_document_rejects_missing_text_field() {
    let server = MockServer::start_async().await;
    let config = test_config(&server);

    let client = client(&config);
    let inserter = DocumentInserter::new(&client, &config);

    let document = Document::from_value(json!({"title": "no summary"})).unwrap();
    let err = inserter.insert_document(document).await.unwrap_err();

    assert!(matches!(err, IngestError::Validation(_)));
}

#[tokio::test]
async fn search_forwards_body_and_returns_response_unmodified() {
    let server = MockServer::start_async().await;
    let config = test_config(&server);

    let query = json!({"query": {"match": {"summary": {"query": "vacation"}}}, "size": 5});
    let engine_response = json!({
        "took": 2,
        "hits": {
            "total": {"value": 1, "relation": "eq"},
            "hits": [{
                "_index": "my_documents",
                "_id": "doc-7",
                "_score": 1.32,
                "_source": {"summary": "vacation policy"}
            }]
        }
    });

    let response_clone = engine_response.clone();
    let search_mock = server
        .mock_async(move |when, then| {
            when.method(POST)
                .path("/my_documents/_search")
                .json_body(query.clone());
            then.status(200).json_body(response_clone.clone());
        })
        .await;

    let client = client(&config);
    let body = json!({"query": {"match": {"summary": {"query": "vacation"}}}, "size": 5});
    let response = client.search("my_documents", &body).await.unwrap();

    search_mock.assert_async().await;
    assert_eq!(response, engine_response);

    let hits = SearchHit::from_response(&response);
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, "doc-7");
}

#[tokio::test]
async fn get_document_by_id() {
    let server = MockServer::start_async().await;
    let config = test_config(&server);

    let get_mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/my_documents/_doc/doc-1");
            then.status(200).json_body(json!({
                "_index": "my_documents",
                "_id": "doc-1",
                "found": true,
                "_source": {"summary": "retrieved"}
            }));
        })
        .await;

    let client = client(&config);
    let response = client.get_document("my_documents", "doc-1").await.unwrap();

    get_mock.assert_async().await;
    assert_eq!(response["_source"]["summary"], json!("retrieved"));
}

#[tokio::test]
async fn get_missing_document_surfaces_engine_404() {
    let server = MockServer::start_async().await;
    let config = test_config(&server);

    server
        .mock_async(|when, then| {
            when.method(GET).path("/my_documents/_doc/nope");
            then.status(404)
                .json_body(json!({"_id": "nope", "found": false}));
        })
        .await;

    let client = client(&config);
    let err = client.get_document("my_documents", "nope").await.unwrap_err();

    assert!(matches!(err, IngestError::Api { status: 404, .. }));
}

#[tokio::test]
async fn document_count_treats_missing_index_as_zero() {
    let server = MockServer::start_async().await;
    let config = test_config(&server);

    server
        .mock_async(|when, then| {
            when.method(GET).path("/my_documents/_count");
            then.status(404).json_body(json!({
                "error": {"type": "index_not_found_exception"},
                "status": 404
            }));
        })
        .await;

    let client = client(&config);
    assert_eq!(client.document_count("my_documents").await.unwrap(), 0);
}

#[tokio::test]
async fn rebuild_recreates_index_and_loads_every_document() {
    let server = MockServer::start_async().await;
    let mut config = test_config(&server);
    config.ingest.batch_size = 10;

    let delete_mock = server
        .mock_async(|when, then| {
            when.method(DELETE).path("/my_documents");
            then.status(404).json_body(json!({"status": 404}));
        })
        .await;

    let create_mock = server
        .mock_async(|when, then| {
            when.method(PUT).path("/my_documents");
            then.status(200).json_body(json!({"acknowledged": true}));
        })
        .await;

    let bulk_mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/my_documents/_bulk");
            then.status(200).json_body(json!({
                "errors": false,
                "items": [
                    {"index": {"_id": "a", "status": 201}},
                    {"index": {"_id": "b", "status": 201}},
                    {"index": {"_id": "c", "status": 201}}
                ]
            }));
        })
        .await;

    let mut data_file = tempfile::NamedTempFile::new().unwrap();
    let data = json!([
        {"summary": "first", "category": "hr"},
        {"summary": "second", "category": "it"},
        {"summary": "third", "category": "hr"}
    ]);
    write!(data_file, "{}", data).unwrap();

    let client = client(&config);
    let index = IndexManager::new(&client, config.index.clone());
    let inserter = DocumentInserter::new(&client, &config);

    let stats = inserter
        .rebuild_from_file(&index, data_file.path())
        .await
        .unwrap();

    delete_mock.assert_async().await;
    create_mock.assert_async().await;
    bulk_mock.assert_async().await;

    // document count after rebuild equals the input array length
    assert_eq!(stats.indexed, 3);
    assert_eq!(stats.errors, 0);
}

#[tokio::test]
async fn bulk_errors_are_tallied_from_item_statuses() {
    let server = MockServer::start_async().await;
    let mut config = test_config(&server);
    config.ingest.batch_size = 10;

    server
        .mock_async(|when, then| {
            when.method(POST).path("/my_documents/_bulk");
            then.status(200).json_body(json!({
                "errors": true,
                "items": [
                    {"index": {"_id": "a", "status": 201}},
                    {"index": {"status": 400, "error": {"type": "mapper_parsing_exception"}}}
                ]
            }));
        })
        .await;

    let client = client(&config);
    let inserter = DocumentInserter::new(&client, &config);

    let documents = Document::array_from_value(json!([
        {"summary": "good"},
        {"summary": "bad mapping"}
    ]))
    .unwrap();

    let stats = inserter.bulk_insert(documents).await.unwrap();
    assert_eq!(stats.indexed, 1);
    assert_eq!(stats.errors, 1);
}

#[tokio::test]
async fn search_error_surfaces_engine_status() {
    let server = MockServer::start_async().await;
    let config = test_config(&server);

    server
        .mock_async(|when, then| {
            when.method(POST).path("/my_documents/_search");
            then.status(400).json_body(json!({
                "error": {"type": "parsing_exception", "reason": "unknown query"},
                "status": 400
            }));
        })
        .await;

    let client = client(&config);
    let err = client
        .search("my_documents", &json!({"query": {"bogus": {}}}))
        .await
        .unwrap_err();

    match err {
        IngestError::Api { status, body } => {
            assert_eq!(status, 400);
            assert!(body.contains("parsing_exception"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn embedding_endpoint_is_used_when_api_key_is_set() {
    let server = MockServer::start_async().await;
    let mut config = test_config(&server);
    config.embedding.api_key = Some("hf-key".to_string());
    config.embedding.api_url = format!("{}/v1/embeddings", server.base_url());
    config.embedding.dimensions = 3;

    let embed_mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1/embeddings")
                .header("Authorization", "Bearer hf-key");
            then.status(200).json_body(json!({
                "data": [{"embedding": [0.25, 0.5, 0.75]}]
            }));
        })
        .await;

    let index_mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/my_documents/_doc")
                .json_body_partial(r#"{"embedding": [0.25, 0.5, 0.75]}"#);
            then.status(201).json_body(json!({"_id": "doc-9"}));
        })
        .await;

    let client = client(&config);
    let inserter = DocumentInserter::new(&client, &config);

    let document = Document::from_value(json!({"summary": "embed me"})).unwrap();
    let response = inserter.insert_document(document).await.unwrap();

    embed_mock.assert_async().await;
    index_mock.assert_async().await;
    assert_eq!(response["_id"], json!("doc-9"));
}
