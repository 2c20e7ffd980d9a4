//! End-to-end pipeline tests against the in-memory index

mod common;

use std::sync::Arc;

use common::{fixture, fixture_with, letters, DownEmbedder, EMBEDDING_MODEL, TEXT_MODEL};
use rag_qa::providers::{
    DocumentStore, EmbeddingRequest, GenerationParams, GenerationRequest, LocalDocumentStore, VectorIndex,
};
use rag_qa::{AskOptions, Document, ErrorKind, IngestOptions, Stage};

fn ingest_options(collection: &str) -> IngestOptions {
    IngestOptions {
        collection: collection.to_string(),
        chunk_size: 500,
        overlap: 100,
        embedding: EmbeddingRequest::for_model(EMBEDDING_MODEL).unwrap(),
        region: "us-east-1".to_string(),
        force_recreate: false,
    }
}

fn ask_options(collection: &str, k: usize) -> AskOptions {
    AskOptions {
        collection: collection.to_string(),
        k,
        embedding: EmbeddingRequest::for_model(EMBEDDING_MODEL).unwrap(),
        generation: GenerationRequest::for_model(TEXT_MODEL).unwrap(),
        params: GenerationParams::default(),
        region: "us-east-1".to_string(),
    }
}

#[tokio::test]
async fn test_thousand_chars_become_three_points() {
    let fx = fixture();
    let doc = Document::text("alphabet.txt", letters(1000));

    let state = fx.pipeline.ingest(&doc, &ingest_options("docs")).await.unwrap();

    assert_eq!(state.chunks_upserted, 3);
    assert_eq!(state.info.points_count, 3);
    assert_eq!(state.info.dimensions, 384);
    assert_eq!(state.document, "alphabet.txt");
}

#[tokio::test]
async fn test_reingesting_is_idempotent() {
    let fx = fixture();
    let doc = Document::text("alphabet.txt", letters(1000));
    let options = ingest_options("docs");

    fx.pipeline.ingest(&doc, &options).await.unwrap();
    let second = fx.pipeline.ingest(&doc, &options).await.unwrap();

    assert_eq!(second.info.points_count, 3);
}

#[tokio::test]
async fn test_force_recreate_drops_other_documents() {
    let fx = fixture();
    let mut options = ingest_options("docs");

    fx.pipeline
        .ingest(&Document::text("a.txt", letters(1000)), &options)
        .await
        .unwrap();
    let both = fx
        .pipeline
        .ingest(&Document::text("b.txt", "Lambda runs code without servers."), &options)
        .await
        .unwrap();
    assert_eq!(both.info.points_count, 4);

    options.force_recreate = true;
    let fresh = fx
        .pipeline
        .ingest(&Document::text("b.txt", "Lambda runs code without servers."), &options)
        .await
        .unwrap();
    assert_eq!(fresh.info.points_count, 1);
}

#[tokio::test]
async fn test_ingest_all_recreates_once() {
    let fx = fixture();
    let mut options = ingest_options("docs");
    fx.pipeline
        .ingest(&Document::text("old.txt", "stale content"), &options)
        .await
        .unwrap();

    options.force_recreate = true;
    let docs = vec![
        Document::text("a.txt", letters(1000)),
        Document::text("b.txt", "S3 stores objects in buckets."),
    ];
    let states = fx.pipeline.ingest_all(&docs, &options).await.unwrap();

    assert_eq!(states.len(), 2);
    assert_eq!(states[1].info.points_count, 4);
}

#[tokio::test]
async fn test_directory_ingest_reports_each_document() {
    let fx = fixture();
    let dir = tempfile::TempDir::new().unwrap();
    std::fs::write(dir.path().join("a.txt"), letters(1000)).unwrap();
    std::fs::write(dir.path().join("b.md"), "S3 stores objects in buckets.").unwrap();
    std::fs::write(dir.path().join("logo.png"), [0x89, b'P', b'N', b'G']).unwrap();

    let mut options = ingest_options("cnu");
    fx.pipeline
        .ingest(&Document::text("old.txt", "stale content"), &options)
        .await
        .unwrap();

    let documents = LocalDocumentStore::new(dir.path()).fetch_all("", "").await.unwrap();
    assert_eq!(documents.len(), 2);

    options.force_recreate = true;
    let mut reported = Vec::new();
    let states = fx
        .pipeline
        .ingest_all_with(&documents, &options, |state| reported.push(state.document.clone()))
        .await
        .unwrap();

    assert_eq!(reported, vec!["a.txt", "b.md"]);
    assert_eq!(states[0].info.points_count, 3);
    assert_eq!(states[1].info.points_count, 4);
}

#[tokio::test]
async fn test_empty_document_creates_empty_collection() {
    let fx = fixture();
    let state = fx
        .pipeline
        .ingest(&Document::text("blank.txt", ""), &ingest_options("docs"))
        .await
        .unwrap();

    assert_eq!(state.chunks_upserted, 0);
    assert_eq!(state.info.points_count, 0);
}

#[tokio::test]
async fn test_ask_places_retrieved_chunks_in_prompt() {
    let fx = fixture();
    let doc = Document::text("aws.txt", "AWS stands for Amazon Web Services, a cloud platform.");
    fx.pipeline.ingest(&doc, &ingest_options("docs")).await.unwrap();

    let outcome = fx
        .pipeline
        .ask("What is AWS?", &ask_options("docs", 3))
        .await
        .unwrap();

    assert_eq!(outcome.answer.text(), " AWS is a cloud platform.");
    assert_eq!(outcome.chunks_used, 1);

    let prompt = fx.llm.last_prompt().unwrap();
    assert!(prompt.contains("Question: What is AWS?"));
    assert!(prompt.contains("Amazon Web Services"));
    assert!(prompt.trim_end().ends_with("Answer:"));
}

#[tokio::test]
async fn test_ask_on_empty_collection_uses_empty_context() {
    let fx = fixture();
    fx.pipeline
        .create(
            "empty",
            &EmbeddingRequest::for_model(EMBEDDING_MODEL).unwrap(),
            false,
        )
        .await
        .unwrap();

    let outcome = fx
        .pipeline
        .ask("What is AWS?", &ask_options("empty", 3))
        .await
        .unwrap();

    assert_eq!(outcome.chunks_used, 0);
    assert!(fx.llm.last_prompt().unwrap().contains("Question: What is AWS?"));
}

#[tokio::test]
async fn test_ask_missing_collection_reports_retrieving_stage() {
    let fx = fixture();
    let err = fx
        .pipeline
        .ask("What is AWS?", &ask_options("missing", 3))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(err.stage(), Some(Stage::Retrieving));
    assert!(fx.llm.last_prompt().is_none());
}

#[tokio::test]
async fn test_embedding_failure_reports_stage() {
    let fx = fixture_with(Arc::new(DownEmbedder));
    let err = fx
        .pipeline
        .ingest(&Document::text("a.txt", "some text"), &ingest_options("docs"))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ServiceUnavailable);
    assert_eq!(err.stage(), Some(Stage::Embedding));
    assert!(fx.index.describe("docs").await.is_err());
}

#[tokio::test]
async fn test_retrieve_returns_at_most_k_ordered() {
    let fx = fixture();
    let text = (0..20)
        .map(|i| format!("Paragraph {} talks about topic {}.", i, letters(i + 3)))
        .collect::<Vec<_>>()
        .join(" ");
    fx.pipeline
        .ingest(&Document::text("topics.txt", text), &IngestOptions {
            chunk_size: 60,
            overlap: 10,
            ..ingest_options("docs")
        })
        .await
        .unwrap();

    let vector = vec![1.0f32; 384];
    let results = fx.index.query("docs", &vector, 4).await.unwrap();

    assert_eq!(results.len(), 4);
    assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
}

#[tokio::test]
async fn test_invalid_arguments() {
    let fx = fixture();

    let err = fx.pipeline.ask("   ", &ask_options("docs", 3)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);

    let err = fx.pipeline.ask("What?", &ask_options("docs", 0)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);

    let mut options = ask_options("docs", 3);
    options.params = options.params.with_temperature(1.5);
    let err = fx.pipeline.ask("What?", &options).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);

    let err = fx
        .pipeline
        .ingest(&Document::text("a.txt", "x"), &IngestOptions {
            overlap: 500,
            ..ingest_options("docs")
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    assert_eq!(err.stage(), Some(Stage::Splitting));
}

#[tokio::test]
async fn test_describe_and_delete() {
    let fx = fixture();
    fx.pipeline
        .ingest(&Document::text("a.txt", letters(1000)), &ingest_options("docs"))
        .await
        .unwrap();

    let info = fx.pipeline.describe("docs").await.unwrap();
    assert_eq!(info.points_count, 3);
    assert_eq!(info.distance, "Cosine");

    fx.pipeline.delete("docs").await.unwrap();
    assert_eq!(
        fx.pipeline.delete("docs").await.unwrap_err().kind(),
        ErrorKind::NotFound
    );
    assert_eq!(
        fx.pipeline.describe("docs").await.unwrap_err().kind(),
        ErrorKind::NotFound
    );
}

#[test]
fn test_unknown_models_are_configuration_errors() {
    let err = EmbeddingRequest::for_model("text-embedding-3-large").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidConfiguration);

    let err = GenerationRequest::for_model("gpt-4").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidConfiguration);
}

#[tokio::test]
async fn test_create_twice_keeps_points() {
    let fx = fixture();
    let embedding = EmbeddingRequest::for_model(EMBEDDING_MODEL).unwrap();
    fx.pipeline
        .ingest(&Document::text("a.txt", letters(1000)), &ingest_options("docs"))
        .await
        .unwrap();

    fx.pipeline.create("docs", &embedding, false).await.unwrap();
    fx.pipeline.create("docs", &embedding, false).await.unwrap();

    assert_eq!(fx.pipeline.describe("docs").await.unwrap().points_count, 3);
}
