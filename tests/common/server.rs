//! Test server lifecycle management
//!
//! This module manages spawning and shutting down test HTTP servers.
//! Each test gets an isolated server with its own databases.

use super::constants::*;
use super::fixtures::{create_test_portal_db, create_test_user_db};
use ethica_server::notifications::BufferingEventSink;
use ethica_server::portal_store::{PortalStore, SqlitePortalStore};
use ethica_server::reviews::WorkflowOrchestrator;
use ethica_server::server::{make_app, RequestsLoggingLevel, ServerConfig};
use ethica_server::users::{SqliteUserStore, UserStore};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;

/// Test server instance with isolated databases
///
/// When dropped, the server gracefully shuts down and temp resources are
/// cleaned up.
pub struct TestServer {
    /// Base URL for making requests (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    /// The port the server is listening on
    pub port: u16,

    /// Stores for direct database access in tests
    pub portal_store: Arc<dyn PortalStore>,
    pub user_store: Arc<dyn UserStore>,

    /// Events emitted by the workflow during the test
    pub events: Arc<BufferingEventSink>,

    // Private fields - keep resources alive until drop
    _temp_portal_dir: TempDir,
    _temp_user_dir: TempDir,
    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestServer {
    /// Spawns a new test server on a random port with seeded fixtures.
    pub async fn spawn() -> Self {
        let (temp_portal_dir, portal_db_path) =
            create_test_portal_db().expect("Failed to create test portal database");
        let (temp_user_dir, user_db_path) =
            create_test_user_db().expect("Failed to create test user database");

        let portal_store: Arc<SqlitePortalStore> = Arc::new(
            SqlitePortalStore::new(&portal_db_path).expect("Failed to open portal store"),
        );
        let user_store: Arc<SqliteUserStore> =
            Arc::new(SqliteUserStore::new(&user_db_path).expect("Failed to open user store"));
        let events = Arc::new(BufferingEventSink::new());

        let workflow = Arc::new(WorkflowOrchestrator::new(
            portal_store.clone(),
            user_store.clone(),
            events.clone(),
        ));

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();
        let base_url = format!("http://127.0.0.1:{}", port);

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        let config = ServerConfig {
            port,
            requests_logging_level: RequestsLoggingLevel::None,
        };
        let app = make_app(
            config,
            portal_store.clone(),
            user_store.clone(),
            workflow,
        )
        .expect("Failed to build app");

        tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .with_graceful_shutdown(async {
                shutdown_rx.await.ok();
            })
            .await
            .expect("Server failed");
        });

        let server = Self {
            base_url,
            port,
            portal_store,
            user_store,
            events,
            _temp_portal_dir: temp_portal_dir,
            _temp_user_dir: temp_user_dir,
            _shutdown_tx: Some(shutdown_tx),
        };

        server.wait_for_ready().await;

        server
    }

    /// Waits for the server to become ready by polling the home endpoint
    async fn wait_for_ready(&self) {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .expect("Failed to build reqwest client");

        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(SERVER_READY_TIMEOUT_MS);

        loop {
            if start.elapsed() > timeout {
                panic!(
                    "Server did not become ready within {}ms",
                    SERVER_READY_TIMEOUT_MS
                );
            }

            match client.get(format!("{}/", self.base_url)).send().await {
                Ok(response) if response.status().is_success() => {
                    return;
                }
                _ => {
                    tokio::time::sleep(Duration::from_millis(SERVER_READY_POLL_INTERVAL_MS)).await;
                }
            }
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self._shutdown_tx.take() {
            let _ = tx.send(());
        }
        // TempDirs are cleaned up automatically
    }
}
