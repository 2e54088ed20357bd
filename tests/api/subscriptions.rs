use serde_json::{json, Value};

use crate::helpers::TestApp;

#[tokio::test]
async fn subscribe_returns_200_when_body_is_valid() {
    let test_app = TestApp::spawn_app().await;

    let response = test_app
        .post_subscription(json!({ "email": "frank@test.com" }))
        .await;

    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["ok"], json!(true));
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn ledger_starts_with_only_the_header() {
    let test_app = TestApp::spawn_app().await;

    let content = std::fs::read_to_string(&test_app.ledger_path).unwrap();

    assert_eq!(content, "email,created_at\n");
}

#[tokio::test]
async fn subscribe_persists_the_new_subscriber() {
    let test_app = TestApp::spawn_app().await;

    test_app
        .post_subscription(json!({ "email": "  Frank@Test.com " }))
        .await;

    let rows = test_app.ledger_rows();
    assert_eq!(rows.len(), 1);
    let (email, created_at) = rows[0].split_once(',').unwrap();
    assert_eq!(email, "\"Frank@Test.com\"");
    assert!(chrono::DateTime::parse_from_rfc3339(created_at).is_ok());
}

#[tokio::test]
async fn subscribe_returns_409_when_email_is_already_subscribed() {
    let test_app = TestApp::spawn_app().await;

    let first = test_app
        .post_subscription(json!({ "email": "frank@test.com" }))
        .await;
    let second = test_app
        .post_subscription(json!({ "email": "FRANK@test.com" }))
        .await;

    assert_eq!(first.status().as_u16(), 200);
    assert_eq!(second.status().as_u16(), 409);
    let body: Value = second.json().await.unwrap();
    assert!(body["error"].is_string());
    assert_eq!(test_app.ledger_rows().len(), 1);
}

#[tokio::test]
async fn distinct_subscribers_are_all_stored() {
    let test_app = TestApp::spawn_app().await;
    let emails = ["ada@test.com", "grace@test.com", "linus@test.org"];

    for email in emails {
        let response = test_app.post_subscription(json!({ "email": email })).await;
        assert_eq!(response.status().as_u16(), 200, "{} was not accepted", email);
    }

    assert_eq!(
        test_app.ledger_rows().len(),
        emails.len(),
        "Every distinct subscriber should have its own row"
    );
}

#[tokio::test]
async fn concurrent_subscriptions_for_one_email_store_a_single_row() {
    let test_app = TestApp::spawn_app().await;
    let body = json!({ "email": "race@test.com" });

    let (first, second) = tokio::join!(
        test_app.post_subscription(body.clone()),
        test_app.post_subscription(body.clone())
    );

    let mut statuses = vec![first.status().as_u16(), second.status().as_u16()];
    statuses.sort();
    assert_eq!(statuses, vec![200, 409]);
    assert_eq!(test_app.ledger_rows().len(), 1);
}

#[tokio::test]
async fn subscribe_returns_400_when_body_is_not_valid() {
    let test_app = TestApp::spawn_app().await;

    // This is a common practice and it is called table-driven tests. In this case, it simulates different kind of possible request bodies
    // where API should return 400.
    let test_cases = vec![
        (json!({}), "missing email"),
        (json!({ "email": 42 }), "email is not a string"),
        (json!({ "email": "" }), "empty email"),
        (json!({ "email": "   " }), "whitespace email"),
        (json!({ "email": "not-an-email" }), "email without @"),
        (json!({ "email": "a@b" }), "email without top level domain"),
    ];

    for (invalid_body, error_message) in test_cases {
        let response = test_app.post_subscription(invalid_body).await;

        assert_eq!(
            400,
            response.status().as_u16(),
            "The API did not fail with 400 status when payload was {}",
            error_message
        );
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["error"], json!("Please enter a valid email address."));
    }

    assert!(test_app.ledger_rows().is_empty());
}

#[tokio::test]
async fn subscribe_returns_500_when_ledger_cannot_be_read() {
    // A directory can be opened but never read as a ledger file.
    let test_app = TestApp::spawn_app_with(|config| {
        config.set_ledger_path(std::env::temp_dir());
    })
    .await;

    let response = test_app
        .post_subscription(json!({ "email": "frank@test.com" }))
        .await;

    assert_eq!(response.status().as_u16(), 500);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], json!("Server error"));
}

#[tokio::test]
async fn quoted_emails_are_escaped_in_the_ledger_and_deduplicated() {
    let test_app = TestApp::spawn_app().await;

    let first = test_app
        .post_subscription(json!({ "email": "a\"b@example.com" }))
        .await;
    let second = test_app
        .post_subscription(json!({ "email": "A\"B@Example.com" }))
        .await;

    assert_eq!(first.status().as_u16(), 200);
    assert_eq!(second.status().as_u16(), 409);
    let rows = test_app.ledger_rows();
    assert_eq!(rows.len(), 1);
    assert!(
        rows[0].starts_with("\"a\"\"b@example.com\","),
        "Unexpected ledger row {}",
        rows[0]
    );
}
