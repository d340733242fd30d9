//! Integration tests for signup, login and token refresh.

#![allow(clippy::unwrap_used)]

use bazaar_integration_tests::{TestContext, field};
use reqwest::StatusCode;
use serde_json::{Value, json};

fn signup_body(email: &str, phone: &str) -> Value {
    json!({
        "firstName": "Ada",
        "lastName": "Lovelace",
        "email": email,
        "phone": phone,
        "password": "hunter22",
    })
}

#[tokio::test]
async fn test_signup_returns_profile_and_tokens() {
    let ctx = TestContext::new().await;

    let resp = ctx
        .client
        .post(ctx.url("/users/signup"))
        .json(&signup_body("Ada@Example.com", "+44 20 7946 0000"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["user"]["email"], "ada@example.com");
    assert_eq!(body["user"]["firstName"], "Ada");
    assert!(body["user"].get("password").is_none());
    assert!(!field(&body, &["token"]).is_empty());
    assert!(!field(&body, &["refreshToken"]).is_empty());
}

#[tokio::test]
async fn test_signup_conflicts() {
    let ctx = TestContext::new().await;
    ctx.signup("ada@example.com", "+44 20 7946 0000").await;

    let same_email = ctx
        .client
        .post(ctx.url("/users/signup"))
        .json(&signup_body("ADA@example.com", "+44 20 7946 9999"))
        .send()
        .await
        .unwrap();
    assert_eq!(same_email.status(), StatusCode::CONFLICT);

    let same_phone = ctx
        .client
        .post(ctx.url("/users/signup"))
        .json(&signup_body("grace@example.com", "+44 20 7946 0000"))
        .send()
        .await
        .unwrap();
    assert_eq!(same_phone.status(), StatusCode::CONFLICT);
    let body: Value = same_phone.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("phone"));
}

#[tokio::test]
async fn test_signup_validation() {
    let ctx = TestContext::new().await;

    for body in [
        signup_body("not-an-email", "+1 555 010 0001"),
        signup_body("ada@example.com", "call me"),
        json!({
            "firstName": "A",
            "lastName": "Lovelace",
            "email": "ada@example.com",
            "phone": "+1 555 010 0001",
            "password": "hunter22",
        }),
        json!({
            "firstName": "Ada",
            "lastName": "Lovelace",
            "email": "ada@example.com",
            "phone": "+1 555 010 0001",
            "password": "123",
        }),
        json!({ "email": "ada@example.com" }),
    ] {
        let resp = ctx
            .client
            .post(ctx.url("/users/signup"))
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "body: {body}");
    }
}

#[tokio::test]
async fn test_login() {
    let ctx = TestContext::new().await;
    let user = ctx.default_user().await;

    let resp = ctx
        .client
        .post(ctx.url("/users/login"))
        .json(&json!({ "email": "shopper@example.com", "password": "hunter22" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(field(&body, &["user", "userId"]), user.id);
    assert_ne!(field(&body, &["token"]), user.token);

    let wrong = ctx
        .client
        .post(ctx.url("/users/login"))
        .json(&json!({ "email": "shopper@example.com", "password": "hunter23" }))
        .send()
        .await
        .unwrap();
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);

    let unknown = ctx
        .client
        .post(ctx.url("/users/login"))
        .json(&json!({ "email": "nobody@example.com", "password": "hunter22" }))
        .send()
        .await
        .unwrap();
    assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_replaces_previous_token() {
    let ctx = TestContext::new().await;
    let user = ctx.default_user().await;

    ctx.client
        .post(ctx.url("/users/login"))
        .json(&json!({ "email": "shopper@example.com", "password": "hunter22" }))
        .send()
        .await
        .unwrap();

    let resp = ctx
        .get_as(&user, &format!("/listcart?id={}", user.id))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_rotates_tokens() {
    let ctx = TestContext::new().await;
    let user = ctx.default_user().await;

    let resp = ctx
        .client
        .post(ctx.url("/users/refresh"))
        .json(&json!({ "refreshToken": user.refresh_token }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    let token = field(&body, &["token"]);

    let fresh = ctx
        .client
        .get(ctx.url(&format!("/listcart?id={}", user.id)))
        .header("token", &token)
        .send()
        .await
        .unwrap();
    assert_eq!(fresh.status(), StatusCode::OK);

    let reused = ctx
        .client
        .post(ctx.url("/users/refresh"))
        .json(&json!({ "refreshToken": user.refresh_token }))
        .send()
        .await
        .unwrap();
    assert_eq!(reused.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_health() {
    let ctx = TestContext::new().await;

    let live = ctx.client.get(ctx.url("/health")).send().await.unwrap();
    assert_eq!(live.status(), StatusCode::OK);
    assert!(live.headers().contains_key("x-request-id"));

    let ready = ctx.client.get(ctx.url("/health/ready")).send().await.unwrap();
    assert_eq!(ready.status(), StatusCode::OK);
}
