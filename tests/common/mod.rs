#![allow(dead_code)]

use agency_cms::auth::{hash_password, issue_token};
use agency_cms::config::Config;
use agency_cms::constants::AUTH_COOKIE;
use agency_cms::domain::{Role, UserInput};
use agency_cms::mailer::{LogMailer, Mailer};
use agency_cms::server::{create_server, AppState};
use agency_cms::storage::Database;
use axum::{
    body::{to_bytes, Body},
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use std::sync::Arc;
use tempfile::{tempdir, TempDir};
use tower::ServiceExt;

pub const TEST_PASSWORD: &str = "correct-horse-battery";

pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    pub mailer: Arc<LogMailer>,
    pub uploads: TempDir,
}

pub fn setup() -> TestApp {
    let uploads = tempdir().expect("temp upload dir");
    let config = Config {
        upload_dir: uploads.path().to_path_buf(),
        max_upload_bytes: 1024,
        jwt_secret: "test-secret".to_string(),
        ..Config::default()
    };
    let db = Database::open_in_memory().expect("in-memory database");
    let mailer = Arc::new(LogMailer::default());
    let shared: Arc<dyn Mailer> = mailer.clone();
    let state = AppState::with_mailer(db, config, shared);
    TestApp {
        app: create_server(state.clone()),
        state,
        mailer,
        uploads,
    }
}

impl TestApp {
    /// Creates an account and returns a `Cookie` header value for it.
    pub fn login_as(&self, email: &str, role: Role) -> String {
        let input = UserInput {
            name: Some("Test User".to_string()),
            email: Some(email.to_string()),
            password: Some(TEST_PASSWORD.to_string()),
            role: Some(role.as_str().to_string()),
            is_active: Some(true),
        };
        let (mut user, password) = input.into_user().expect("valid user");
        user.password_hash = hash_password(&password).expect("hash");
        self.state.db.create_user(&mut user).expect("insert user");
        let token = issue_token(&user, &self.state.config.jwt_secret, 1).expect("token");
        format!("{AUTH_COOKIE}={token}")
    }

    pub async fn json(&self, method: Method, uri: &str, cookie: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            request = request.header(header::COOKIE, cookie);
        }
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .expect("request");
        let (status, _, bytes) = self.send(request).await;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json body")
        };
        (status, value)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, HeaderMap, String) {
        let request = Request::builder().uri(uri).body(Body::empty()).expect("request");
        let (status, headers, bytes) = self.send(request).await;
        (status, headers, String::from_utf8_lossy(&bytes).into_owned())
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, HeaderMap, Vec<u8>) {
        let response = self.app.clone().oneshot(request).await.expect("response");
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        (status, headers, bytes.to_vec())
    }
}
