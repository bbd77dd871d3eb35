use super::*;
use crate::embeddings::chunking::chunk_text;
use serde_json::json;
use std::num::NonZeroUsize;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TEST_DIMENSION: u32 = 3;

fn test_embedder(server: &MockServer, batch_size: usize) -> PineconeEmbedder {
    let pinecone = PineconeConfig {
        inference_url: server.uri(),
        ..PineconeConfig::default()
    };
    let embedding = EmbeddingConfig {
        dimension: TEST_DIMENSION,
        batch_size,
        ..EmbeddingConfig::default()
    };
    let api = ApiClient::new("test-key", &pinecone)
        .expect("client should build")
        .with_retry_delay(Duration::from_millis(5));
    PineconeEmbedder::new(api, &pinecone, &embedding).expect("embedder should build")
}

fn embed_response(vectors: &[[f32; 3]]) -> ResponseTemplate {
    let data = vectors
        .iter()
        .map(|values| json!({ "values": values, "vector_type": "dense" }))
        .collect::<Vec<_>>();
    ResponseTemplate::new(200).set_body_json(json!({
        "model": "multilingual-e5-large",
        "vector_type": "dense",
        "data": data,
        "usage": { "total_tokens": 12 }
    }))
}

fn strings(texts: &[&str]) -> Vec<String> {
    texts.iter().map(|t| (*t).to_string()).collect()
}

#[test]
fn input_type_and_truncate_wire_names() {
    assert_eq!(
        serde_json::to_value(InputType::Query).expect("serializes"),
        json!("query")
    );
    assert_eq!(
        serde_json::to_value(InputType::Passage).expect("serializes"),
        json!("passage")
    );
    assert_eq!(
        serde_json::to_value(Truncate::End).expect("serializes"),
        json!("END")
    );
    assert_eq!(
        serde_json::to_value(Truncate::Disabled).expect("serializes"),
        json!("NONE")
    );
}

#[tokio::test]
async fn passage_embeddings_request_shape() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/embed"))
        .and(header("Api-Key", "test-key"))
        .and(body_json(json!({
            "model": "multilingual-e5-large",
            "parameters": { "input_type": "passage", "truncate": "END" },
            "inputs": [{ "text": "a b" }, { "text": "c d" }, { "text": "e" }]
        })))
        .respond_with(embed_response(&[
            [0.1, 0.2, 0.3],
            [0.4, 0.5, 0.6],
            [0.7, 0.8, 0.9],
        ]))
        .expect(1)
        .mount(&server)
        .await;

    let embedder = test_embedder(&server, 96);
    let chunks = chunk_text("a b c d e", NonZeroUsize::new(2).expect("non-zero"));
    let vectors = embedder
        .embed_chunks(&chunks, InputType::Passage)
        .expect("embedding should succeed");

    assert_eq!(vectors.len(), chunks.len());
    assert_eq!(vectors[0], vec![0.1, 0.2, 0.3]);
    assert_eq!(vectors[2], vec![0.7, 0.8, 0.9]);
}

#[tokio::test]
async fn query_embeddings_use_query_input_type() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/embed"))
        .and(body_json(json!({
            "model": "multilingual-e5-large",
            "parameters": { "input_type": "query", "truncate": "END" },
            "inputs": [{ "text": "hello" }]
        })))
        .respond_with(embed_response(&[[1.0, 0.0, 0.0]]))
        .expect(1)
        .mount(&server)
        .await;

    let vectors = test_embedder(&server, 96)
        .embed(&strings(&["hello"]), InputType::Query)
        .expect("embedding should succeed");

    assert_eq!(vectors, vec![vec![1.0, 0.0, 0.0]]);
}

#[tokio::test]
async fn batches_preserve_order() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/embed"))
        .and(body_json(json!({
            "model": "multilingual-e5-large",
            "parameters": { "input_type": "passage", "truncate": "END" },
            "inputs": [{ "text": "first" }, { "text": "second" }]
        })))
        .respond_with(embed_response(&[[1.0, 1.0, 1.0], [2.0, 2.0, 2.0]]))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/embed"))
        .and(body_json(json!({
            "model": "multilingual-e5-large",
            "parameters": { "input_type": "passage", "truncate": "END" },
            "inputs": [{ "text": "third" }]
        })))
        .respond_with(embed_response(&[[3.0, 3.0, 3.0]]))
        .expect(1)
        .mount(&server)
        .await;

    let vectors = test_embedder(&server, 2)
        .embed(&strings(&["first", "second", "third"]), InputType::Passage)
        .expect("embedding should succeed");

    let firsts = vectors.iter().map(|v| v[0]).collect::<Vec<_>>();
    assert_eq!(firsts, vec![1.0, 2.0, 3.0]);
}

#[tokio::test]
async fn empty_input_makes_no_request() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(embed_response(&[]))
        .expect(0)
        .mount(&server)
        .await;

    let vectors = test_embedder(&server, 96)
        .embed(&[], InputType::Passage)
        .expect("empty input should succeed");

    assert!(vectors.is_empty());
}

#[tokio::test]
async fn count_mismatch_is_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/embed"))
        .respond_with(embed_response(&[[1.0, 2.0, 3.0]]))
        .mount(&server)
        .await;

    let result = test_embedder(&server, 96).embed(&strings(&["one", "two"]), InputType::Passage);

    assert!(matches!(result, Err(NotesError::Embedding(_))));
}

#[tokio::test]
async fn dimension_mismatch_is_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/embed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{ "values": [1.0, 2.0] }]
        })))
        .mount(&server)
        .await;

    let result = test_embedder(&server, 96).embed(&strings(&["one"]), InputType::Query);

    let message = result.expect_err("should fail").to_string();
    assert!(message.contains("expected 3"), "unexpected message: {}", message);
}

#[tokio::test]
async fn remote_failure_propagates() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/embed"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": { "code": "RESOURCE_EXHAUSTED", "message": "quota exceeded" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = test_embedder(&server, 96).embed(&strings(&["one"]), InputType::Query);

    assert!(matches!(result, Err(NotesError::Api { status: 429, .. })));
}
