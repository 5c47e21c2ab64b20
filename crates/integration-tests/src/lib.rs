//! Integration test harness for the Minh Phat server.
//!
//! Each [`TestContext`] seeds a fresh store, serves the real router on an
//! ephemeral `127.0.0.1` port and hands out a cookie-keeping HTTP client.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p minh-phat-integration-tests
//! ```
//!
//! Every scenario runs against both backends: the in-memory store and an
//! in-memory SQLite database with migrations applied.

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::missing_panics_doc)]

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Response};
use serde_json::{Value, json};
use tokio::task::JoinHandle;

use minh_phat_server::config::ServerConfig;
use minh_phat_server::db::{MemoryStore, SqliteStore, Store, seed};
use minh_phat_server::state::AppState;

pub const ADMIN_USERNAME: &str = "admin";
pub const ADMIN_PASSWORD: &str = "admin123";

/// Which store backs a test server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Memory,
    Sqlite,
}

/// A running server plus a client that keeps cookies between calls.
pub struct TestContext {
    pub client: Client,
    pub base_url: String,
    server: JoinHandle<()>,
}

impl TestContext {
    /// Seeded server with default settings.
    pub async fn start(backend: Backend) -> Self {
        Self::start_with(backend, ServerConfig::default()).await
    }

    /// Seeded server with a custom config. Host, port and seeding are fixed.
    pub async fn start_with(backend: Backend, config: ServerConfig) -> Self {
        match backend {
            Backend::Memory => Self::serve(MemoryStore::new(), config).await,
            Backend::Sqlite => {
                let store = SqliteStore::in_memory()
                    .await
                    .expect("Failed to open in-memory SQLite store");
                Self::serve(store, config).await
            }
        }
    }

    async fn serve<S: Store>(store: S, config: ServerConfig) -> Self {
        seed::seed(&store, &config.admin_password)
            .await
            .expect("Failed to seed store");

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to address");
        let addr = listener.local_addr().expect("Listener has no address");

        let app = minh_phat_server::app(AppState::new(config, Arc::new(store)));
        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Server error");
        });

        Self {
            client: cookie_client(),
            base_url: format!("http://{addr}"),
            server,
        }
    }

    /// Absolute URL for `path`.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Log the context's client in as the seeded admin and return the token.
    pub async fn login(&self) -> String {
        let response = self
            .client
            .post(self.url("/api/auth/login"))
            .json(&json!({ "username": ADMIN_USERNAME, "password": ADMIN_PASSWORD }))
            .send()
            .await
            .expect("Login request failed");
        assert_eq!(response.status(), 200, "seeded admin must be able to log in");
        let body: Value = response.json().await.expect("Login body is not JSON");
        body["token"]
            .as_str()
            .expect("Login body has no token")
            .to_string()
    }

    pub async fn get(&self, path: &str) -> Response {
        self.client
            .get(self.url(path))
            .send()
            .await
            .expect("GET failed")
    }

    pub async fn post_json(&self, path: &str, body: &Value) -> Response {
        self.client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .expect("POST failed")
    }

    pub async fn put_json(&self, path: &str, body: &Value) -> Response {
        self.client
            .put(self.url(path))
            .json(body)
            .send()
            .await
            .expect("PUT failed")
    }

    pub async fn delete(&self, path: &str) -> Response {
        self.client
            .delete(self.url(path))
            .send()
            .await
            .expect("DELETE failed")
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        self.server.abort();
    }
}

/// A fresh client with its own cookie jar.
#[must_use]
pub fn cookie_client() -> Client {
    Client::builder()
        .cookie_store(true)
        .timeout(Duration::from_secs(10))
        .build()
        .expect("Failed to build HTTP client")
}

/// Read a response body as JSON.
pub async fn json_body(response: Response) -> Value {
    response.json().await.expect("Response body is not JSON")
}

/// Run an async scenario against both store backends.
///
/// ```rust,ignore
/// async fn health_is_ok(ctx: TestContext) {
///     assert_eq!(ctx.get("/health").await.status(), 200);
/// }
/// both_backends!(test_health, health_is_ok);
/// ```
#[macro_export]
macro_rules! both_backends {
    ($name:ident, $scenario:path) => {
        mod $name {
            use super::*;

            #[tokio::test]
            async fn memory() {
                let ctx = $crate::TestContext::start($crate::Backend::Memory).await;
                $scenario(ctx).await;
            }

            #[tokio::test]
            async fn sqlite() {
                let ctx = $crate::TestContext::start($crate::Backend::Sqlite).await;
                $scenario(ctx).await;
            }
        }
    };
}
