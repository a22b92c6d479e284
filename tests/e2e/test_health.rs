use crate::e2e::helpers;

use helpers::TestContext;
use hyper::StatusCode;
use test_context::test_context;

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_return_ok_for_health_check(ctx: &TestContext) {
    let response = ctx.client.get("/health").await.unwrap();

    response.assert_status(StatusCode::OK);

    // Health endpoint returns plain text
    let body = String::from_utf8(response.body_bytes.clone()).unwrap();
    assert_eq!(body, "OK");
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_include_request_id_in_responses(ctx: &TestContext) {
    let response = ctx.client.get("/health").await.unwrap();
    response.assert_header_exists("x-request-id");

    let response = ctx.client.get("/api/providers").await.unwrap();
    response.assert_header_exists("x-request-id");
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_echo_an_inbound_request_id(ctx: &TestContext) {
    let response = ctx
        .client
        .get_with_headers("/health", &[("x-request-id", "trace-me-123")])
        .await
        .unwrap();

    response.assert_header("x-request-id", "trace-me-123");
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_handle_concurrent_health_checks(ctx: &TestContext) {
    let mut futures = Vec::new();
    for _ in 0..10 {
        let client = ctx.client.clone();
        futures.push(async move { client.get("/health").await });
    }

    let results = futures::future::join_all(futures).await;

    for result in results {
        let response = result.unwrap();
        response.assert_status(StatusCode::OK);
    }
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_list_provider_profiles(ctx: &TestContext) {
    let response = ctx.client.get("/api/providers").await.unwrap();
    response.assert_status(StatusCode::OK);

    let providers = response.body.as_ref().unwrap().as_array().unwrap().clone();
    assert_eq!(providers.len(), 2);

    let polly = providers.iter().find(|p| p["provider"] == "polly").unwrap();
    assert_eq!(polly["configured"], true);
    assert_eq!(polly["profile"]["max_chunk_length"], 3000);
    assert_eq!(polly["profile"]["batch_size"], 10);
    assert_eq!(polly["profile"]["inter_batch_delay_seconds"], 3);

    let openai = providers.iter().find(|p| p["provider"] == "openai").unwrap();
    assert_eq!(openai["configured"], false);
    assert_eq!(openai["profile"]["max_chunk_length"], 4096);
}
