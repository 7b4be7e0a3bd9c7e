mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

use common::{TestServer, ADMIN_EMAIL, ADMIN_PASSWORD, JWT_SECRET};

#[tokio::test]
async fn login_issues_a_usable_token() -> Result<()> {
    let server = TestServer::spawn().await?;

    let res = server
        .client
        .post(server.url("/auth/login"))
        .json(&json!({"email": ADMIN_EMAIL, "password": ADMIN_PASSWORD}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["expires_in"], 3600);
    assert_eq!(body["data"]["user"]["id"], server.admin_id.as_str());

    let token = body["data"]["token"].as_str().unwrap_or_default();
    let claims = site_api::auth::validate_jwt(token, JWT_SECRET)?;
    assert_eq!(claims.sub, server.admin_id);
    assert_eq!(claims.email, ADMIN_EMAIL);

    let res = server.client.get(server.url("/contacts")).bearer_auth(token).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn login_rejects_bad_credentials() -> Result<()> {
    let server = TestServer::spawn().await?;

    let res = server
        .client
        .post(server.url("/auth/login"))
        .json(&json!({"email": ADMIN_EMAIL, "password": "wrong"}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await?;
    assert_eq!(body["code"], "UNAUTHORIZED");

    let res = server
        .client
        .post(server.url("/auth/login"))
        .json(&json!({"email": ADMIN_EMAIL}))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn token_signed_with_another_secret_is_refused() -> Result<()> {
    let server = TestServer::spawn().await?;

    let claims = site_api::auth::Claims::new(server.admin_id.clone(), ADMIN_EMAIL.to_string(), 1);
    let forged = site_api::auth::generate_jwt(&claims, "some-other-secret")?;
    let res = server.client.get(server.url("/contacts")).bearer_auth(forged).send().await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn malformed_json_is_a_client_error() -> Result<()> {
    let server = TestServer::spawn().await?;

    let res = server
        .client
        .post(server.url("/requestEmailChange"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await?;
    assert_eq!(body["code"], "INVALID_JSON");
    Ok(())
}
