use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::ws::{WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Json;
use inkbridge_relay::{RelayConfig, RelayEvent, RelayStatus, Router};
use tokio::sync::{mpsc, watch, OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::connection::{self, ConnectionTable};
use crate::dispatcher;
use crate::health;

const EVENT_QUEUE: usize = 1024;
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Shared state passed to Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub connections: Arc<ConnectionTable>,
    pub events: mpsc::Sender<RelayEvent>,
    pub status: watch::Receiver<RelayStatus>,
    pub shutdown: CancellationToken,
    pub start_time: Instant,
    /// One permit per open socket, taken before the upgrade.
    pub connection_slots: Arc<Semaphore>,
    pub max_message_size: usize,
    pub heartbeat_interval: Duration,
}

/// Build the Axum router. The socket is served on `/ws` and on `/` for
/// clients that connect to the bare host.
pub fn build_router(state: AppState) -> axum::Router {
    axum::Router::new()
        .route("/", get(ws_handler))
        .route("/ws", get(ws_handler))
        .route("/health", get(health_handler))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Bind, spawn the dispatcher, sweeper and HTTP server. Returns a handle to
/// shut them down.
pub async fn start(config: ServerConfig, relay: RelayConfig) -> Result<ServerHandle, std::io::Error> {
    let shutdown = CancellationToken::new();
    let connections = Arc::new(ConnectionTable::new(config.max_send_queue));

    let router = Router::new(&relay, connections.clone());
    let (event_tx, event_rx) = mpsc::channel(EVENT_QUEUE);
    let (status_tx, status_rx) = watch::channel(router.status());
    let dispatcher = dispatcher::spawn_dispatcher(
        router,
        event_rx,
        status_tx,
        Duration::from_millis(config.send_stall_timeout_ms),
        shutdown.clone(),
    );

    let heartbeat_interval = Duration::from_secs(config.heartbeat_interval_secs.max(1));
    let heartbeat_timeout = Duration::from_secs(config.heartbeat_timeout_secs.max(1));
    let sweeper = connection::start_sweeper(
        Arc::clone(&connections),
        heartbeat_interval,
        heartbeat_timeout,
        shutdown.clone(),
    );

    let state = AppState {
        connections,
        events: event_tx,
        status: status_rx,
        shutdown: shutdown.clone(),
        start_time: Instant::now(),
        connection_slots: Arc::new(Semaphore::new(
            config.max_connections.min(Semaphore::MAX_PERMITS),
        )),
        max_message_size: config.max_message_size,
        heartbeat_interval,
    };

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
    let local_addr = listener.local_addr()?;

    tracing::info!(
        addr = %local_addr,
        binding_policy = %relay.binding_policy,
        "inkbridge relay listening"
    );

    let serve_token = shutdown.clone();
    let server = tokio::spawn(async move {
        let result = axum::serve(listener, app)
            .with_graceful_shutdown(serve_token.cancelled_owned())
            .await;
        if let Err(e) = result {
            tracing::error!(error = %e, "HTTP server stopped with error");
        }
    });

    Ok(ServerHandle {
        local_addr,
        shutdown,
        tasks: vec![server, dispatcher, sweeper],
    })
}

/// Handle returned by [`start`]; keeps the background tasks reachable.
pub struct ServerHandle {
    local_addr: SocketAddr,
    shutdown: CancellationToken,
    tasks: Vec<tokio::task::JoinHandle<()>>,
}

impl ServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn port(&self) -> u16 {
        self.local_addr.port()
    }

    /// Token cancelled when the server shuts down.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Cancel every task (closing open sockets) and wait for them to finish.
    pub async fn shutdown(self) {
        self.shutdown.cancel();
        tracing::info!(task_count = self.tasks.len(), "shutting down");

        let drain = futures::future::join_all(self.tasks);
        if tokio::time::timeout(SHUTDOWN_TIMEOUT, drain).await.is_err() {
            tracing::warn!("shutdown timed out after {SHUTDOWN_TIMEOUT:?}");
        }
    }
}

/// WebSocket upgrade handler.
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    if state.shutdown.is_cancelled() {
        return (StatusCode::SERVICE_UNAVAILABLE, "shutting down").into_response();
    }
    let Ok(permit) = Arc::clone(&state.connection_slots).try_acquire_owned() else {
        tracing::warn!(open = state.connections.count(), "connection limit reached");
        return (StatusCode::SERVICE_UNAVAILABLE, "too many connections").into_response();
    };

    // A failed upgrade drops the closure and with it the permit.
    ws.max_message_size(state.max_message_size)
        .on_upgrade(move |socket| handle_socket(socket, state, permit))
}

async fn handle_socket(socket: WebSocket, state: AppState, _permit: OwnedSemaphorePermit) {
    let (id, rx, closed) = state.connections.register(&state.shutdown);
    tracing::info!(connection_id = %id, "WebSocket client connected");

    connection::handle_ws_connection(
        socket,
        id,
        rx,
        closed,
        state.connections,
        state.events,
        state.heartbeat_interval,
    )
    .await;
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let relay = state.status.borrow().clone();
    Json(health::health_check(state.start_time, relay))
}
