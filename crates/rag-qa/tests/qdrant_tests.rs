//! Qdrant REST client tests against a mock server

use std::time::Duration;

use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use rag_qa::providers::{QdrantIndex, VectorIndex};
use rag_qa::types::CollectionStatus;
use rag_qa::{Chunk, ErrorKind, IndexedChunk};

fn index(server: &MockServer) -> QdrantIndex {
    QdrantIndex::new(
        server.uri(),
        Some(SecretString::new("secret-key".to_string())),
        Duration::from_secs(5),
    )
    .unwrap()
}

fn described(points: u64) -> serde_json::Value {
    json!({
        "result": {
            "status": "green",
            "points_count": points,
            "vectors_count": points,
            "config": {"params": {"vectors": {"size": 4, "distance": "Cosine"}}}
        },
        "status": "ok",
        "time": 0.001
    })
}

#[tokio::test]
async fn test_describe_parses_collection() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/collections/docs"))
        .and(header("api-key", "secret-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(described(7)))
        .mount(&server)
        .await;

    let info = index(&server).describe("docs").await.unwrap();

    assert_eq!(info.name, "docs");
    assert_eq!(info.points_count, 7);
    assert_eq!(info.dimensions, 4);
    assert_eq!(info.distance, "Cosine");
    assert_eq!(info.status, CollectionStatus::Green);
}

#[tokio::test]
async fn test_create_when_missing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/collections/docs"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"status": {"error": "Not found"}})))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/collections/docs"))
        .and(body_partial_json(json!({"vectors": {"size": 4, "distance": "Cosine"}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": true})))
        .expect(1)
        .mount(&server)
        .await;

    index(&server).create("docs", 4, false).await.unwrap();
}

#[tokio::test]
async fn test_create_existing_is_noop() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/collections/docs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(described(3)))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/collections/docs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": true})))
        .expect(0)
        .mount(&server)
        .await;

    index(&server).create("docs", 4, false).await.unwrap();
}

#[tokio::test]
async fn test_force_recreate_deletes_first() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/collections/docs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": true})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/collections/docs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": true})))
        .expect(1)
        .mount(&server)
        .await;

    index(&server).create("docs", 4, true).await.unwrap();
}

#[tokio::test]
async fn test_upsert_sends_chunk_payloads() {
    let server = MockServer::start().await;
    let chunk = Chunk::new("AWS is a cloud platform.", 0, "aws.pdf");
    let id = chunk.point_id().to_string();

    Mock::given(method("PUT"))
        .and(path("/collections/docs/points"))
        .and(query_param("wait", "true"))
        .and(body_partial_json(json!({
            "points": [{
                "id": id,
                "vector": [1.0, 0.0, 0.0, 0.0],
                "payload": {"text": "AWS is a cloud platform.", "sequence_index": 0, "source_document_id": "aws.pdf"}
            }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": {"status": "completed"}})))
        .expect(1)
        .mount(&server)
        .await;

    index(&server)
        .upsert("docs", &[IndexedChunk::new(chunk, vec![1.0, 0.0, 0.0, 0.0])])
        .await
        .unwrap();
}

#[tokio::test]
async fn test_query_maps_scored_points() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/collections/docs/points/search"))
        .and(body_partial_json(json!({"limit": 2, "with_payload": true})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": [
                {"id": "a", "score": 0.9, "payload": {"text": "first", "sequence_index": 0, "source_document_id": "aws.pdf"}},
                {"id": "b", "score": 0.4, "payload": {"text": "second", "sequence_index": 1, "source_document_id": "aws.pdf"}}
            ]
        })))
        .mount(&server)
        .await;

    let results = index(&server).query("docs", &[0.1, 0.2, 0.3, 0.4], 2).await.unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].chunk.text, "first");
    assert_eq!(results[1].chunk.sequence_index, 1);
    assert!(results[0].score > results[1].score);
}

#[tokio::test]
async fn test_error_statuses() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/collections/docs/points/search"))
        .respond_with(ResponseTemplate::new(400).set_body_string("wrong vector dimension"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/collections/docs"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/collections/docs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": false})))
        .mount(&server)
        .await;

    let qdrant = index(&server);
    assert_eq!(
        qdrant.query("docs", &[0.0; 3], 3).await.unwrap_err().kind(),
        ErrorKind::InvalidArgument
    );
    assert_eq!(qdrant.describe("docs").await.unwrap_err().kind(), ErrorKind::ServiceUnavailable);
    assert_eq!(qdrant.delete("docs").await.unwrap_err().kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_unreachable_service() {
    let qdrant = QdrantIndex::new("http://127.0.0.1:9", None, Duration::from_millis(500)).unwrap();
    assert_eq!(qdrant.describe("docs").await.unwrap_err().kind(), ErrorKind::ServiceUnavailable);
}
