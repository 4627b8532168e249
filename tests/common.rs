#![allow(dead_code)]

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{header, Method, Request, Response};
use axum::Router;
use serde_json::Value;
use solid_launch::config::{AppConfig, DatabaseConfig, Environment, LoggingConfig, S3Config};
use solid_launch::routes::create_router;
use solid_launch::startup::build_state;

pub fn test_config(database_url: &str) -> AppConfig {
    AppConfig {
        port: 0,
        environment: Environment::Development,
        database: DatabaseConfig {
            url: database_url.to_string(),
            auth_token: None,
        },
        s3: S3Config::default(),
        logging: LoggingConfig::default_for(Environment::Development),
    }
}

/// Router over a fresh in-memory database.
pub async fn build_app() -> Router {
    let state = build_state(Arc::new(test_config("file::memory:")))
        .await
        .expect("state should build");
    create_router(state)
}

pub fn rpc_request(method: Method, path: &str, body: Option<Value>, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(path);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    let body = match body {
        Some(json) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    let mut request = builder.body(body).expect("failed to build request");

    request.extensions_mut().insert(ConnectInfo(SocketAddr::new(
        IpAddr::V4(Ipv4Addr::LOCALHOST),
        0,
    )));

    request
}

/// The `name=value` part of the response's Set-Cookie header.
pub fn session_cookie(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(str::to_string)
}

pub async fn json_body(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should be readable");
    serde_json::from_slice(&bytes).expect("body should be JSON")
}
