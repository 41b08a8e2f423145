use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router,
    extract::{Path, State, WebSocketUpgrade},
    middleware,
    response::IntoResponse,
    routing::{delete, get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use playmaker_api::middleware::require_auth;
use playmaker_api::state::{AppState, AppStateInner};
use playmaker_api::{chat, notifications};
use playmaker_gateway::dispatcher::Dispatcher;
use playmaker_gateway::registry::GroupRegistry;
use playmaker_gateway::session;
use playmaker_jobs::{JobContext, LogMailer};

#[derive(Clone)]
struct ServerState {
    dispatcher: Dispatcher,
    registry: GroupRegistry,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "playmaker=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let db_path = std::env::var("PLAYMAKER_DB_PATH").unwrap_or_else(|_| "playmaker.db".into());
    let host = std::env::var("PLAYMAKER_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("PLAYMAKER_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;
    let job_workers: usize = std::env::var("PLAYMAKER_JOB_WORKERS")
        .unwrap_or_else(|_| "4".into())
        .parse()?;

    // Init database
    let db = Arc::new(playmaker_db::Database::open(&PathBuf::from(&db_path))?);

    // Shared state
    let registry = GroupRegistry::new();
    let dispatcher = Dispatcher::new(db.clone(), registry.clone());
    let app_state: AppState = Arc::new(AppStateInner { db });

    // Background job runner. The triggering subsystems (post/trial creation,
    // friend graph) clone this handle to enqueue fan-outs; holding it here
    // keeps the workers alive for the server's lifetime.
    let _job_queue = playmaker_jobs::start(
        job_workers,
        JobContext {
            dispatcher: dispatcher.clone(),
            mailer: Arc::new(LogMailer),
        },
    );

    let state = ServerState {
        dispatcher,
        registry,
    };

    // Routes
    let api_routes = Router::new()
        .route("/chat", post(chat::resolve_thread))
        .route("/chat", get(chat::get_history))
        .route("/chat_list", get(chat::chat_list))
        .route("/notifications", get(notifications::list))
        .route("/notifications/unseen_count", get(notifications::unseen_count))
        .route("/notifications/{id}/mark_as_read", post(notifications::mark_as_read))
        .route("/notifications/mark_all_as_read", post(notifications::mark_all_as_read))
        .route("/notifications/{id}", delete(notifications::destroy))
        .layer(middleware::from_fn(require_auth))
        .with_state(app_state);

    let ws_routes = Router::new()
        .route("/ws/chat/{thread_name}", get(chat_ws_upgrade))
        .route("/ws/notifications/{user_id}", get(notification_ws_upgrade))
        .with_state(state);

    let app = Router::new()
        .merge(api_routes)
        .merge(ws_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("PlayMaker realtime server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn chat_ws_upgrade(
    State(state): State<ServerState>,
    Path(thread_name): Path<String>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| session::handle_chat_socket(socket, state.dispatcher, thread_name))
}

async fn notification_ws_upgrade(
    State(state): State<ServerState>,
    Path(user_id): Path<i64>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| session::handle_notification_socket(socket, state.registry, user_id))
}
