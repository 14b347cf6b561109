//! HTTP-level tests for the parse endpoint.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use recipe_extraction::{
    testing::{sample_recipe_json, MockFetcher, MockProvider},
    ExtractedContent, FallbackGenerator, MemoryStore, PipelineDeps, RecipeParser,
};
use recipe_server::build_app;
use serde_json::Value;
use tower::ServiceExt;

const URL: &str = "https://example.com/pasta";

fn app(provider: MockProvider) -> Router {
    let fetcher = MockFetcher::new().with_content(
        URL,
        ExtractedContent::new(URL)
            .with_title("Weeknight Spaghetti")
            .with_ingredients("1 lb spaghetti\n28 oz crushed tomatoes")
            .with_instructions("Boil the pasta. Simmer the sauce."),
    );
    let deps = PipelineDeps::new(
        FallbackGenerator::new(Arc::new(provider)),
        Arc::new(MemoryStore::new()),
        Arc::new(fetcher),
    );
    build_app(Arc::new(RecipeParser::new(deps)))
}

async fn post_parse(app: Router, body: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::post("/api/recipes/parse")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_parse_success() {
    let app =
        app(MockProvider::new("openai").with_response(sample_recipe_json("Weeknight Spaghetti")));

    let (status, body) = post_parse(app, &format!(r#"{{"input": "{}"}}"#, URL)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["recipe"]["title"], "Weeknight Spaghetti");
    assert_eq!(body["error"], Value::Null);
    assert_eq!(body["fromCache"], false);
    assert_eq!(body["cacheKey"], URL);
    assert!(body["timings"]["total"].is_u64());
}

#[tokio::test]
async fn test_generation_failure_maps_to_503() {
    let app = app(MockProvider::new("openai"));

    let (status, body) = post_parse(app, &format!(r#"{{"input": "{}"}}"#, URL)).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["code"], "GENERATION_FAILED");
    assert_eq!(body["recipe"], Value::Null);
}

#[tokio::test]
async fn test_malformed_body_is_invalid_input() {
    let app = app(MockProvider::new("openai"));

    let (status, body) = post_parse(app, r#"{"forceRefresh": true}"#).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_INPUT");
}

#[tokio::test]
async fn test_health() {
    let response = app(MockProvider::new("openai"))
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["promptVersion"].as_str().unwrap().len(), 12);
}
