#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

// End-to-end tests of the index, ask and status commands against a mock
// Azure OpenAI endpoint

use std::fs;

use faq_bot::FaqError;
use faq_bot::commands::{ask, build_index, check_artifacts, open_context, related};
use faq_bot::config::{Config, ProviderConfig};
use faq_bot::index::IndexArtifacts;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

const EMBEDDINGS_PATH: &str = "/openai/deployments/embed/embeddings";
const CHAT_PATH: &str = "/openai/deployments/chat/chat/completions";

const CORPUS: &str = r#"{
    "Billing": [
        {"question": "What is my due date?", "answer": "Your due date is the 5th."},
        {"question": "Can I pay early?", "answer": "Yes, payments are accepted any time."}
    ],
    "Account": [
        {"question": "How do I reset my password?", "answer": "Use the reset link on the login page."}
    ]
}"#;

/// Embeds known texts to fixed vectors and rejects anything else
struct TableEmbeddings;

impl Respond for TableEmbeddings {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: serde_json::Value =
            serde_json::from_slice(&request.body).expect("request body is json");
        let vector = match body["input"].as_str().expect("input is a string") {
            "What is my due date?" => vec![1.0, 0.0, 0.0],
            "Can I pay early?" => vec![0.0, 1.0, 0.0],
            "How do I reset my password?" => vec![0.0, 0.0, 1.0],
            "when do I need to pay" => vec![0.9, 0.1, 0.0],
            "weather on mars" => vec![5.0, 5.0, 5.0],
            _ => {
                return ResponseTemplate::new(400).set_body_json(json!({
                    "error": {"code": "UnknownInput", "message": "unexpected text"}
                }));
            }
        };
        ResponseTemplate::new(200).set_body_json(json!({"data": [{"embedding": vector}]}))
    }
}

fn chat_reply(content: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "choices": [{"message": {"role": "assistant", "content": content}}]
    }))
}

fn workspace(server: &MockServer) -> (TempDir, Config) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();

    let temp_dir = TempDir::new().expect("should create TempDir successfully");
    fs::create_dir_all(temp_dir.path().join("data")).expect("data dir created");
    fs::write(temp_dir.path().join("data/faqs.json"), CORPUS).expect("corpus written");

    let mut config = Config::with_base_dir(temp_dir.path());
    config.provider = ProviderConfig {
        endpoint: server.uri(),
        embedding_deployment: "embed".to_string(),
        chat_deployment: "chat".to_string(),
        api_key: Some("test-key".to_string()),
        ..ProviderConfig::default()
    };
    (temp_dir, config)
}

async fn mount_embeddings(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(EMBEDDINGS_PATH))
        .and(header("api-key", "test-key"))
        .respond_with(TableEmbeddings)
        .mount(server)
        .await;
}

async fn build_blocking(config: &Config) -> IndexArtifacts {
    let config = config.clone();
    tokio::task::spawn_blocking(move || build_index(&config, None))
        .await
        .expect("blocking task should join")
        .expect("index builds")
}

#[tokio::test]
async fn index_then_answer_confident_query() {
    let server = MockServer::start().await;
    mount_embeddings(&server).await;
    Mock::given(method("POST"))
        .and(path(CHAT_PATH))
        .respond_with(chat_reply("  Payments are due on the 5th of every month.  "))
        .expect(1)
        .mount(&server)
        .await;

    let (temp_dir, config) = workspace(&server);
    let artifacts = build_blocking(&config).await;
    assert_eq!(artifacts.records.len(), 3);
    assert_eq!(artifacts.index.len(), 3);
    assert!(IndexArtifacts::exist_in(&temp_dir.path().join("embeddings")));

    let result = tokio::task::spawn_blocking(move || {
        ask(&config, "when do I need to pay", "English", Some(2), true)
    })
    .await
    .expect("blocking task should join")
    .expect("ask succeeds");

    assert_eq!(
        result.response.source.as_deref(),
        Some("What is my due date?")
    );
    assert_eq!(
        result.response.answer,
        "Payments are due on the 5th of every month."
    );
    let related: Vec<&str> = result.related.iter().map(|hit| hit.question.as_str()).collect();
    assert_eq!(related, vec!["What is my due date?", "Can I pay early?"]);
}

#[tokio::test]
async fn distant_query_declines_without_generation() {
    let server = MockServer::start().await;
    mount_embeddings(&server).await;
    Mock::given(method("POST"))
        .and(path(CHAT_PATH))
        .respond_with(chat_reply("should not be used"))
        .expect(0)
        .mount(&server)
        .await;

    let (_temp_dir, config) = workspace(&server);
    build_blocking(&config).await;

    let decline = config.answer.decline_message.clone();
    let result = tokio::task::spawn_blocking(move || {
        ask(&config, "weather on mars", "English", Some(0), false)
    })
    .await
    .expect("blocking task should join")
    .expect("decline is not an error");

    assert_eq!(result.response.source, None);
    assert_eq!(result.response.answer, decline);
    assert!(result.related.is_empty());
}

#[tokio::test]
async fn embedding_outage_surfaces_as_service_error() {
    let server = MockServer::start().await;
    mount_embeddings(&server).await;

    let (_temp_dir, config) = workspace(&server);
    build_blocking(&config).await;

    server.reset().await;
    Mock::given(method("POST"))
        .and(path(EMBEDDINGS_PATH))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(CHAT_PATH))
        .respond_with(chat_reply("unused"))
        .expect(0)
        .mount(&server)
        .await;

    let error = tokio::task::spawn_blocking(move || {
        ask(&config, "when do I need to pay", "English", None, false)
    })
    .await
    .expect("blocking task should join")
    .expect_err("ask must fail");

    assert!(matches!(
        error.downcast_ref::<FaqError>(),
        Some(FaqError::EmbeddingService {
            status: Some(503),
            ..
        })
    ));
}

#[tokio::test]
async fn related_lists_distances_in_order() {
    let server = MockServer::start().await;
    mount_embeddings(&server).await;

    let (_temp_dir, config) = workspace(&server);
    build_blocking(&config).await;

    let hits = tokio::task::spawn_blocking(move || related(&config, "when do I need to pay", Some(3)))
        .await
        .expect("blocking task should join")
        .expect("related succeeds");

    assert_eq!(hits.len(), 3);
    assert_eq!(hits[0].position, 0);
    assert_eq!(hits[2].question, "How do I reset my password?");
    assert!(hits.windows(2).all(|pair| pair[0].distance <= pair[1].distance));
}

#[tokio::test]
async fn related_defaults_to_configured_count() {
    let server = MockServer::start().await;
    mount_embeddings(&server).await;

    let (_temp_dir, mut config) = workspace(&server);
    config.answer.related_questions = 2;
    build_blocking(&config).await;

    let hits = tokio::task::spawn_blocking(move || related(&config, "when do I need to pay", None))
        .await
        .expect("blocking task should join")
        .expect("related succeeds");

    let questions: Vec<&str> = hits.iter().map(|hit| hit.question.as_str()).collect();
    assert_eq!(questions, vec!["What is my due date?", "Can I pay early?"]);
}

#[tokio::test]
async fn status_detects_corpus_drift_and_provider_change() {
    let server = MockServer::start().await;
    mount_embeddings(&server).await;

    let (temp_dir, config) = workspace(&server);
    build_blocking(&config).await;

    let (_, report) = check_artifacts(&config).expect("artifacts check");
    assert!(report.is_consistent);

    let edited = CORPUS.replace("Can I pay early?", "Can I pay before the due date?");
    fs::write(temp_dir.path().join("data/faqs.json"), edited).expect("corpus rewritten");
    let (_, report) = check_artifacts(&config).expect("artifacts check");
    assert!(!report.is_consistent);
    assert!(report.requires_rebuild());

    let mut switched = config.clone();
    switched.provider.embedding_deployment = "text-embedding-3-large".to_string();
    let error = open_context(&switched).expect_err("provider change is rejected");
    assert!(matches!(
        error.downcast_ref::<FaqError>(),
        Some(FaqError::ProviderMismatch { .. })
    ));
}
