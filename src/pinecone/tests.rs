use super::*;
use serde::Deserialize;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Debug, Deserialize, PartialEq)]
struct Echo {
    value: u32,
}

fn test_client() -> ApiClient {
    ApiClient::new("test-key", &PineconeConfig::default())
        .expect("client should build")
        .with_retry_delay(Duration::from_millis(5))
}

fn url_for(server: &MockServer, path: &str) -> Url {
    let base = Url::parse(&server.uri()).expect("mock uri should parse");
    endpoint(&base, path).expect("endpoint should join")
}

#[test]
fn blank_api_key_is_rejected() {
    let result = ApiClient::new("  ", &PineconeConfig::default());
    assert!(matches!(result, Err(NotesError::Config(_))));
}

#[test]
fn endpoint_keeps_base_path_prefix() {
    let origin = Url::parse("https://api.pinecone.io").expect("valid url");
    assert_eq!(
        endpoint(&origin, "embed").expect("joins").as_str(),
        "https://api.pinecone.io/embed"
    );

    let proxied = Url::parse("https://gw.example.com/pinecone").expect("valid url");
    assert_eq!(
        endpoint(&proxied, "/vectors/upsert").expect("joins").as_str(),
        "https://gw.example.com/pinecone/vectors/upsert"
    );

    let trailing = Url::parse("https://gw.example.com/pinecone/").expect("valid url");
    assert_eq!(
        endpoint(&trailing, "indexes/notes").expect("joins").as_str(),
        "https://gw.example.com/pinecone/indexes/notes"
    );
}

#[tokio::test]
async fn clients_can_share_an_agent() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/shared"))
        .and(header("Api-Key", "second-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "value": 2 })))
        .expect(1)
        .mount(&server)
        .await;

    let config = PineconeConfig::default();
    let agent = agent_for(&config);
    let _first = ApiClient::with_agent(agent.clone(), "first-key", &config).expect("client builds");
    let second = ApiClient::with_agent(agent, "second-key", &config).expect("client builds");

    let echo: Echo = second
        .get_json(&url_for(&server, "shared"), &[])
        .expect("request should succeed");
    assert_eq!(echo, Echo { value: 2 });
}

#[test]
fn debug_output_redacts_api_key() {
    let client = test_client();
    let rendered = format!("{:?}", client);
    assert!(!rendered.contains("test-key"));
    assert!(rendered.contains("<redacted>"));
}

#[test]
fn error_message_extraction() {
    assert_eq!(
        error_message(r#"{"error":{"code":"INVALID_ARGUMENT","message":"bad vector"},"status":400}"#),
        "bad vector"
    );
    assert_eq!(
        error_message(r#"{"code":5,"message":"Not Found","details":[]}"#),
        "Not Found"
    );
    assert_eq!(error_message("upstream exploded"), "upstream exploded");
    assert_eq!(error_message(""), "empty response body");
}

#[tokio::test]
async fn sends_auth_and_version_headers() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/vectors/fetch"))
        .and(header("Api-Key", "test-key"))
        .and(header("X-Pinecone-API-Version", "2025-01"))
        .and(query_param("ids", "count"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "value": 7 })))
        .expect(1)
        .mount(&server)
        .await;

    let echo: Echo = test_client()
        .get_json(&url_for(&server, "/vectors/fetch"), &[("ids", "count")])
        .expect("request should succeed");

    assert_eq!(echo, Echo { value: 7 });
}

#[tokio::test]
async fn posts_json_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/query"))
        .and(body_json(json!({ "topK": 3 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "value": 3 })))
        .expect(1)
        .mount(&server)
        .await;

    let echo: Echo = test_client()
        .post_json(&url_for(&server, "/query"), &json!({ "topK": 3 }))
        .expect("request should succeed");

    assert_eq!(echo.value, 3);
}

#[tokio::test]
async fn client_errors_are_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/embed"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": { "code": "UNAUTHENTICATED", "message": "Invalid API Key" },
            "status": 401
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result: Result<Echo> = test_client().post_json(&url_for(&server, "/embed"), &json!({}));

    match result {
        Err(NotesError::Api { status, message }) => {
            assert_eq!(status, 401);
            assert_eq!(message, "Invalid API Key");
        }
        other => panic!("expected API error, got {:?}", other),
    }
}

#[tokio::test]
async fn server_errors_are_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/indexes/notes"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let result: Result<Echo> = test_client().get_json(&url_for(&server, "/indexes/notes"), &[]);

    assert!(matches!(result, Err(NotesError::Api { status: 503, .. })));
}

#[tokio::test]
async fn recovers_after_transient_server_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "value": 1 })))
        .mount(&server)
        .await;

    let echo: Echo = test_client()
        .get_json(&url_for(&server, "/flaky"), &[])
        .expect("second attempt should succeed");

    assert_eq!(echo.value, 1);
}

#[tokio::test]
async fn malformed_response_is_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/garbage"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let result: Result<Echo> = test_client().get_json(&url_for(&server, "/garbage"), &[]);

    assert!(matches!(result, Err(NotesError::Network(_))));
}
