use std::net::SocketAddr;
use std::time::Instant;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tokio::task::JoinHandle;
use tracing::info;

use pb_core::error::CoreError;
use pb_core::gate::ApiGate;
use pb_core::job::{JobStatus, Mode};
use pb_core::store::JobStore;

use crate::module::{Module, ModuleCtx};

#[derive(Clone)]
struct AppState {
    store: JobStore,
    gate: ApiGate,
    token: Option<String>,
    started: Instant,
}

#[derive(Deserialize, Clone, Copy)]
#[serde(rename_all = "snake_case")]
enum PingAction {
    Add,
    Update,
    Remove,
    Start,
    Stop,
}

/// One mutation request against the job registry.
#[derive(Deserialize)]
struct ModPing {
    target: String,
    action: PingAction,
    mode: Option<Mode>,
    interval: Option<u64>,
    target_count: Option<u64>,
}

pub struct WebServer {
    addr: SocketAddr,
}

impl WebServer {
    pub fn new(addr: SocketAddr) -> Self {
        Self { addr }
    }
}

impl Module for WebServer {
    fn name(&self) -> &'static str {
        "web"
    }

    fn spawn(self: Box<Self>, ctx: ModuleCtx) -> JoinHandle<anyhow::Result<()>> {
        tokio::spawn(async move {
            let state = AppState {
                store: ctx.store.clone(),
                gate: ctx.gate.clone(),
                token: ctx.cfg.api_token.clone(),
                started: Instant::now(),
            };

            let app = Router::new()
                .route("/status", get(status))
                .route("/api/pings", get(pings_list).post(pings_mod))
                .with_state(state);

            let listener = tokio::net::TcpListener::bind(self.addr).await?;
            info!("web listening on http://{}", self.addr);

            let mut shutdown = ctx.shutdown.clone();
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown.changed().await;
                })
                .await?;

            Ok(())
        })
    }
}

/// Auth-then-throttle gate shared by the /api handlers.
fn api_check(state: &AppState, headers: &HeaderMap) -> Result<(), Response> {
    if let Some(expected) = &state.token {
        let presented = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "));
        if presented != Some(expected.as_str()) {
            return Err(err_response(StatusCode::UNAUTHORIZED, "invalid token"));
        }
    }
    if let Err(e) = state.gate.check() {
        return Err(err_response(StatusCode::TOO_MANY_REQUESTS, &e.to_string()));
    }
    Ok(())
}

fn err_response(code: StatusCode, message: &str) -> Response {
    (code, Json(json!({ "status": "error", "message": message }))).into_response()
}

async fn status(State(state): State<AppState>) -> impl IntoResponse {
    let jobs = state.store.list();
    let running = jobs
        .values()
        .filter(|j| j.status == JobStatus::Running)
        .count();
    Json(json!({
        "uptime_ms": state.started.elapsed().as_millis() as u64,
        "jobs": jobs.len(),
        "running": running,
    }))
}

async fn pings_list(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Err(resp) = api_check(&state, &headers) {
        return resp;
    }
    Json(state.store.list()).into_response()
}

async fn pings_mod(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ModPing>,
) -> Response {
    if let Err(resp) = api_check(&state, &headers) {
        return resp;
    }
    match dispatch(&state.store, &req) {
        Ok(()) => Json(state.store.list()).into_response(),
        Err(e @ CoreError::Validation(_)) => err_response(StatusCode::BAD_REQUEST, &e.to_string()),
        Err(e @ CoreError::NotFound(_)) => err_response(StatusCode::NOT_FOUND, &e.to_string()),
        Err(e) => err_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
    }
}

/// Apply one mutation request to the registry.
fn dispatch(store: &JobStore, req: &ModPing) -> pb_core::error::Result<()> {
    match req.action {
        PingAction::Add | PingAction::Update => {
            let (Some(mode), Some(interval)) = (req.mode, req.interval) else {
                return Err(CoreError::Validation(
                    "add/update require mode and interval".into(),
                ));
            };
            store.upsert(&req.target, mode, interval, req.target_count)?;
            Ok(())
        }
        PingAction::Remove => {
            store.remove(&req.target);
            Ok(())
        }
        PingAction::Start => store.start(&req.target),
        PingAction::Stop => store.stop(&req.target),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pb_core::job::Outcome;

    fn req(target: &str, action: PingAction) -> ModPing {
        ModPing {
            target: target.to_string(),
            action,
            mode: None,
            interval: None,
            target_count: None,
        }
    }

    #[test]
    fn add_requires_mode_and_interval() {
        let store = JobStore::new();
        let err = dispatch(&store, &req("8.8.8.8", PingAction::Add)).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        assert!(store.list().is_empty());
    }

    #[test]
    fn update_is_an_add_in_disguise() {
        let store = JobStore::new();
        let mut r = req("8.8.8.8", PingAction::Update);
        r.mode = Some(Mode::Custom);
        r.interval = Some(2);
        r.target_count = Some(3);
        dispatch(&store, &r).unwrap();

        let job = &store.list()["8.8.8.8"];
        assert_eq!(job.mode, Mode::Custom);
        assert_eq!(job.status, JobStatus::Running);
        assert_eq!(job.last_result, Outcome::Unknown);
    }

    #[test]
    fn start_and_stop_surface_unknown_targets() {
        let store = JobStore::new();
        assert!(matches!(
            dispatch(&store, &req("ghost", PingAction::Start)),
            Err(CoreError::NotFound(_))
        ));
        assert!(matches!(
            dispatch(&store, &req("ghost", PingAction::Stop)),
            Err(CoreError::NotFound(_))
        ));
    }

    #[test]
    fn remove_never_errors() {
        let store = JobStore::new();
        dispatch(&store, &req("ghost", PingAction::Remove)).unwrap();

        let mut r = req("1.1.1.1", PingAction::Add);
        r.mode = Some(Mode::Continuous);
        r.interval = Some(5);
        dispatch(&store, &r).unwrap();
        dispatch(&store, &req("1.1.1.1", PingAction::Remove)).unwrap();
        assert!(store.list().is_empty());
    }
}
