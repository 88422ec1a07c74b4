//! Test state shared by the router and database suites

#![allow(dead_code)]

use aws_sdk_sesv2::Client as SesClient;
use aws_sdk_sesv2::config::{BehaviorVersion, Region};
use axum::body::Body;
use http::{Request, header};
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::PgPool;

use ems_server::config::Config;
use ems_server::state::AppState;

pub const JWT_SECRET: &str = "test-jwt-secret";
pub const WEBHOOK_SECRET: &str = "whsec_test";

pub fn test_config(database_url: &str) -> Config {
    Config {
        database_url: database_url.to_string(),
        http_port: 0,
        environment: "development".to_string(),
        jwt_secret: JWT_SECRET.to_string(),
        stripe_secret_key: "sk_test_unused".to_string(),
        stripe_webhook_secret: WEBHOOK_SECRET.to_string(),
        ticket_signing_secret: "test-ticket-secret".to_string(),
        checkout_success_url: "https://example.test/success".to_string(),
        checkout_cancel_url: "https://example.test/cancel".to_string(),
        ses_from_email: "tickets@example.test".to_string(),
        currency: "eur".to_string(),
        reservation_ttl_minutes: 30,
        sweep_interval_secs: 60,
        ticket_prefix: "EMS".to_string(),
        event_name: "EMS Trade Fair".to_string(),
        event_venue: "VR Room Malta".to_string(),
        event_date: "TBA".to_string(),
        cors_origins: vec![],
        admin_bootstrap_username: None,
        admin_bootstrap_password: None,
    }
}

/// State around `pool` with an SES client that is never called
pub fn state(pool: PgPool, database_url: &str) -> AppState {
    let ses_config = aws_sdk_sesv2::Config::builder()
        .behavior_version(BehaviorVersion::latest())
        .region(Region::new("eu-west-1"))
        .build();
    AppState::from_parts(pool, SesClient::from_conf(ses_config), test_config(database_url))
}

pub fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn bearer(request: Request<Body>, token: &str) -> Request<Body> {
    let mut request = request;
    request.headers_mut().insert(
        header::AUTHORIZATION,
        format!("Bearer {token}").parse().unwrap(),
    );
    request
}

pub async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
