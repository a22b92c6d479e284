use crate::e2e::helpers;

use helpers::{text_with_chunks, TestContext, MAX_TEXT_LENGTH};
use hyper::StatusCode;
use serde_json::json;
use test_context::test_context;

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_split_on_sentence_boundaries(ctx: &TestContext) {
    let response = ctx
        .client
        .post(
            "/api/chunks/preview",
            &json!({
                "text": text_with_chunks(4),
                "provider": "polly"
            }),
        )
        .await
        .unwrap();

    response.assert_status(StatusCode::OK);
    let body = response.body.as_ref().unwrap();

    assert_eq!(body["max_chunk_length"], 3000);
    assert_eq!(body["total_batches"], 1);

    let chunks = body["chunks"].as_array().unwrap();
    assert_eq!(chunks.len(), 4);
    for (i, chunk) in chunks.iter().enumerate() {
        assert_eq!(chunk["index"], i);
        let text = chunk["text"].as_str().unwrap();
        assert!(text.ends_with('.'), "chunk {} should end at a sentence", i);
        assert!(text.chars().count() <= 3000);
    }
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_use_the_provider_chunk_limit(ctx: &TestContext) {
    let text = "word ".repeat(2000);

    let polly = ctx
        .client
        .post("/api/chunks/preview", &json!({ "text": text, "provider": "polly" }))
        .await
        .unwrap();
    let openai = ctx
        .client
        .post("/api/chunks/preview", &json!({ "text": text, "provider": "OpenAI" }))
        .await
        .unwrap();

    polly.assert_status(StatusCode::OK);
    openai.assert_status(StatusCode::OK);

    let polly_chunks = polly.body.as_ref().unwrap()["chunks"].as_array().unwrap().len();
    let openai_chunks = openai.body.as_ref().unwrap()["chunks"].as_array().unwrap().len();
    assert_eq!(polly_chunks, 4);
    assert_eq!(openai_chunks, 3);
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_reject_an_unknown_provider(ctx: &TestContext) {
    let response = ctx
        .client
        .post("/api/chunks/preview", &json!({ "text": "Hello.", "provider": "espeak" }))
        .await
        .unwrap();

    response
        .assert_status(StatusCode::BAD_REQUEST)
        .assert_error_message("unknown provider");
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_reject_empty_text(ctx: &TestContext) {
    let response = ctx
        .client
        .post("/api/chunks/preview", &json!({ "text": "  \n\t ", "provider": "polly" }))
        .await
        .unwrap();

    response
        .assert_status(StatusCode::BAD_REQUEST)
        .assert_error_message("empty");
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_reject_text_over_the_global_limit(ctx: &TestContext) {
    let response = ctx
        .client
        .post(
            "/api/chunks/preview",
            &json!({ "text": "a".repeat(MAX_TEXT_LENGTH + 1), "provider": "polly" }),
        )
        .await
        .unwrap();

    response.assert_status(StatusCode::PAYLOAD_TOO_LARGE);
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_clean_html_before_chunking(ctx: &TestContext) {
    let response = ctx
        .client
        .post(
            "/api/chunks/preview",
            &json!({
                "text": "<p>Read <a href=\"https://example.com\">this</a> now.</p>",
                "provider": "polly"
            }),
        )
        .await
        .unwrap();

    response.assert_status(StatusCode::OK);
    let chunks = response.body.as_ref().unwrap()["chunks"].as_array().unwrap().clone();
    assert_eq!(chunks.len(), 1);

    let text = chunks[0]["text"].as_str().unwrap();
    assert!(!text.contains('<'));
    assert!(text.contains("Read"));
    assert!(text.contains("now."));
}
