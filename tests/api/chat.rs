use serde_json::{json, Value};
use wiremock::matchers::{any, header, method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::helpers::{TestApp, TEST_API_KEY};

struct InputContains(&'static str);

impl wiremock::Match for InputContains {
    fn matches(&self, request: &wiremock::Request) -> bool {
        let result: Result<Value, _> = serde_json::from_slice(&request.body);

        if let Ok(body) = result {
            return body.get("model").is_some()
                && body
                    .get("input")
                    .and_then(Value::as_str)
                    .map_or(false, |input| input.contains(self.0));
        }

        false
    }
}

#[tokio::test]
async fn chat_returns_the_upstream_reply() {
    let test_app = TestApp::spawn_app().await;

    Mock::given(path("/v1/responses"))
        .and(method("POST"))
        .and(header("Authorization", format!("Bearer {}", TEST_API_KEY).as_str()))
        .and(InputContains("What is Rust?"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "output_text": "Hello" })))
        .expect(1)
        .mount(&test_app.chat_server)
        .await;

    let response = test_app
        .post_chat(json!({ "message": "  What is Rust?  " }))
        .await;

    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({ "reply": "Hello" }));
}

#[tokio::test]
async fn chat_reads_replies_from_output_blocks() {
    let test_app = TestApp::spawn_app().await;

    Mock::given(path("/v1/responses"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "output": [{ "content": [{ "text": "Hi" }] }] })),
        )
        .expect(1)
        .mount(&test_app.chat_server)
        .await;

    let response = test_app.post_chat(json!({ "message": "Hello" })).await;

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["reply"], json!("Hi"));
}

#[tokio::test]
async fn chat_returns_400_without_calling_upstream_when_message_is_invalid() {
    let test_app = TestApp::spawn_app().await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&test_app.chat_server)
        .await;

    let test_cases = vec![
        (json!({}), "missing message"),
        (json!({ "message": 7 }), "message is not a string"),
        (json!({ "message": "" }), "empty message"),
        (json!({ "message": " \n\t " }), "whitespace message"),
    ];

    for (invalid_body, error_message) in test_cases {
        let response = test_app.post_chat(invalid_body).await;

        assert_eq!(
            400,
            response.status().as_u16(),
            "The API did not fail with 400 status when payload was {}",
            error_message
        );
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["error"], json!("Please write a message."));
    }
}

#[tokio::test]
async fn chat_returns_500_when_api_key_is_missing() {
    let test_app = TestApp::spawn_app_with(|config| config.set_chat_api_key(None)).await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&test_app.chat_server)
        .await;

    let response = test_app.post_chat(json!({ "message": "Hello" })).await;

    assert_eq!(response.status().as_u16(), 500);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], json!("Server configuration is incomplete."));
}

#[tokio::test]
async fn chat_does_not_leak_upstream_errors() {
    let test_app = TestApp::spawn_app().await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(429).set_body_string("Rate limit reached for org-secret"))
        .expect(1)
        .mount(&test_app.chat_server)
        .await;

    let response = test_app.post_chat(json!({ "message": "Hello" })).await;

    assert_eq!(response.status().as_u16(), 500);
    let text = response.text().await.unwrap();
    assert!(!text.contains("org-secret"));
    assert_eq!(serde_json::from_str::<Value>(&text).unwrap(), json!({ "error": "Server error" }));
}

#[tokio::test]
async fn chat_returns_500_when_upstream_reply_is_empty() {
    let test_app = TestApp::spawn_app().await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "output_text": "",
            "messages": [{ "role": "user", "content": [{ "text": "echo" }] }]
        })))
        .expect(1)
        .mount(&test_app.chat_server)
        .await;

    let response = test_app.post_chat(json!({ "message": "Hello" })).await;

    assert_eq!(response.status().as_u16(), 500);
}
