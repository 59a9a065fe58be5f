//! # Race Replay Server
//!
//! Replays a cached race session to every WebSocket client that connects to
//! `/ws`. Each connection gets its own independent broadcast: an `info`
//! acknowledgement, one lap-time `prediction` (or an `error`), then the
//! interleaved `telemetry` records with live positions, paced by a short
//! delay.
//!
//! ## Functionality:
//! - **Layered configuration**: defaults, `server_replay.conf`, `REPLAY_*`
//!   environment variables and CLI flags (see `lib_common::configs`).
//! - **Logging**: console plus daily-rolling JSON files through `tracing`.
//! - **Per-connection sessions**: a bounded channel between the session and
//!   the socket writer; a closed socket cancels the session.
//! - **Graceful Shutdown**: `tokio-graceful` stops accepting, then cancels
//!   every running session.
//! - **Health check**: `GET /health` answers `OK`.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{
    Router,
    extract::{
        ConnectInfo, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
    routing::get,
};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_graceful::{Shutdown, ShutdownGuard};
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};

use lib_common::configs::{self, Settings};
use lib_common::feeds::{ArchiveSource, RaceDataSource};
use lib_common::loggers;
use lib_common::prediction::HistoricalLapModel;
use lib_common::replay::ServerMessage;
use lib_common::session::{ReplaySession, SessionPlan};

const APP_NAME: &str = "server_replay";

/// Records buffered between a session and its socket writer.
const OUTBOUND_CAPACITY: usize = 256;

#[derive(Clone)]
struct AppState {
    session: ReplaySession,
    /// Parent of every session token; cancelled on shutdown.
    sessions: CancellationToken,
    next_client: Arc<AtomicUsize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let settings = configs::load_settings().context("failed to load configuration")?;
    let _log_guard = loggers::setup_logging(
        &settings.log_dir,
        &settings.log_level,
        APP_NAME,
        settings.log_retention,
    )
    .context("failed to initialize logging")?;

    if settings.config_file_loaded {
        info!(path = %settings.config_path.display(), "config file loaded");
    } else {
        info!(
            path = %settings.config_path.display(),
            "config file not found, using defaults and environment/CLI values"
        );
    }

    let session = build_session(&settings);
    let plan = session.plan();
    info!(
        race = %plan.race,
        reference = %settings.reference,
        pacing_ms = plan.pacing.as_millis() as u64,
        interleave = %plan.mode,
        cache_dir = %settings.cache_dir.display(),
        "replay configured"
    );

    let listener = TcpListener::bind(settings.bind_addr())
        .await
        .with_context(|| format!("failed to bind {}", settings.bind_addr()))?;
    info!("{} listening on {}", APP_NAME, listener.local_addr()?);

    let shutdown = Shutdown::default();
    shutdown.spawn_task_fn(move |guard| serve(listener, session, guard));

    match shutdown.shutdown_with_limit(Duration::from_secs(10)).await {
        Ok(elapsed) => {
            info!(
                "shutdown: gracefully {}s after shutdown signal received",
                elapsed.as_secs_f64()
            );
        }
        Err(e) => {
            warn!("shutdown: forcefully due to timeout: {}", e);
        }
    }

    info!("Bye!");
    Ok(())
}

fn build_session(settings: &Settings) -> ReplaySession {
    let source: Arc<dyn RaceDataSource> = Arc::new(ArchiveSource::new(settings.cache_dir.clone()));
    let predictor = Arc::new(HistoricalLapModel::new(
        Arc::clone(&source),
        settings.reference.clone(),
        settings.qualifying.clone(),
    ));
    ReplaySession::new(
        source,
        predictor,
        SessionPlan {
            race: settings.race.clone(),
            pacing: settings.pacing,
            mode: settings.interleave,
        },
    )
}

async fn serve(listener: TcpListener, session: ReplaySession, guard: ShutdownGuard) {
    let sessions = CancellationToken::new();
    let state = AppState {
        session,
        sessions: sessions.clone(),
        next_client: Arc::new(AtomicUsize::new(1)),
    };

    let app = Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health_handler))
        .layer(CorsLayer::permissive())
        .with_state(state);

    let served = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        guard.cancelled().await;
        info!("Signal received: cancelling running sessions");
        sessions.cancel();
    })
    .await;

    if let Err(e) = served {
        error!("server error: {}", e);
    }
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, addr, state))
}

async fn health_handler() -> impl IntoResponse {
    (axum::http::StatusCode::OK, "OK")
}

async fn handle_socket(socket: WebSocket, addr: SocketAddr, state: AppState) {
    let client_id = state.next_client.fetch_add(1, Ordering::Relaxed);
    info!(client_id, %addr, "client connected");

    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::channel::<ServerMessage>(OUTBOUND_CAPACITY);
    let cancel = state.sessions.child_token();

    let session = state.session.clone();
    let session_cancel = cancel.clone();
    let producer = tokio::spawn(async move { session.run(tx, session_cancel).await });

    let writer = async {
        while let Some(message) = rx.recv().await {
            let text = match message.to_json() {
                Ok(text) => text,
                Err(e) => {
                    error!(client_id, "failed to encode record: {}", e);
                    continue;
                }
            };
            if sink.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
        let _ = sink.close().await;
    };

    let reader = async {
        while let Some(frame) = stream.next().await {
            match frame {
                Ok(Message::Close(_)) | Err(_) => break,
                Ok(_) => {}
            }
        }
    };

    tokio::select! {
        _ = writer => {}
        _ = reader => {
            info!(client_id, "client closed the connection");
        }
    }
    cancel.cancel();
    drop(rx);

    match producer.await {
        Ok(Ok(summary)) => info!(
            client_id,
            records = summary.telemetry_records,
            drivers = summary.drivers,
            excluded = summary.excluded,
            outcome = ?summary.outcome,
            "session ended"
        ),
        Ok(Err(e)) => warn!(client_id, "session aborted: {}", e),
        Err(e) => error!(client_id, "session task failed: {}", e),
    }
    info!(client_id, "client disconnected");
}
