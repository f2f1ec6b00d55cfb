use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use clap::Parser;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use thermal_core::column::Column;
use thermal_core::config::GroundConditions;
use thermal_core::io::frame::{make_frame, Frame};
use thermal_core::io::sounding::{build_column, Sounding};
use thermal_core::profile::{Field, Sample};
use thermal_core::run_once;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, Mutex};
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "thermald", about = "Thermal ascent streaming daemon")]
struct Args {
    /// Path to the sounding JSON document.
    #[arg(long, value_name = "PATH")]
    sounding: PathBuf,

    /// Address to bind (defaults to 127.0.0.1).
    #[arg(long, default_value = "127.0.0.1")]
    bind: String,

    /// Port to listen on for HTTP and WebSocket clients.
    #[arg(long, default_value_t = 8788)]
    port: u16,
}

/// Column plus the frame counter, guarded together so every frame sees one snapshot.
struct Shared {
    column: Column,
    next_t: u64,
}

#[derive(Clone)]
struct AppState {
    shared: Arc<Mutex<Shared>>,
    tx: broadcast::Sender<String>,
}

#[derive(Debug, Deserialize)]
struct UpdateRequest {
    altitude: f64,
    field: Field,
    value: f64,
}

#[derive(Debug, Deserialize)]
struct CeilingRequest {
    altitude: f64,
}

#[derive(Debug)]
enum Command {
    Update(UpdateRequest),
    Conditions(GroundConditions),
    Ceiling(CeilingRequest),
}

struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn unprocessable(err: impl std::fmt::Display) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            message: err.to_string(),
        }
    }

    fn internal(err: anyhow::Error) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: format!("{:#}", err),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, self.message).into_response()
    }
}

/// Run the column and stamp the result with the next frame number.
fn next_frame(shared: &mut Shared) -> Result<Frame> {
    let (run, chronicle) = run_once(&shared.column)?;
    for event in &run.events {
        info!(target = "event", %event.code, altitude = event.altitude, note = ?event.note);
    }
    let t = shared.next_t;
    shared.next_t += 1;
    Ok(make_frame(
        t,
        shared.column.revision(),
        shared.column.conditions(),
        run,
        chronicle,
    ))
}

/// Apply one mutation and recompute the run while the caller holds the lock.
fn apply(shared: &mut Shared, command: Command) -> Result<Frame, ApiError> {
    match command {
        Command::Update(request) => {
            let inserted = shared
                .column
                .update(request.altitude, request.field, request.value)
                .map_err(ApiError::unprocessable)?;
            info!(
                altitude = request.altitude,
                field = request.field.label(),
                value = request.value,
                inserted,
                "profile updated"
            );
        }
        Command::Conditions(conditions) => {
            shared
                .column
                .set_conditions(conditions)
                .map_err(ApiError::unprocessable)?;
        }
        Command::Ceiling(request) => {
            let extended = shared
                .column
                .raise_ceiling(request.altitude)
                .map_err(ApiError::unprocessable)?;
            info!(altitude = request.altitude, extended, "ceiling requested");
        }
    }
    next_frame(shared).map_err(ApiError::internal)
}

/// Broadcast a frame to stream subscribers. Callers hold the lock so frames go out in `t` order.
fn publish(tx: &broadcast::Sender<String>, frame: &Frame) {
    match frame.to_ndjson() {
        Ok(line) => {
            if tx.send(line).is_err() {
                tracing::trace!("no subscribers for frame t={}", frame.t);
            }
        }
        Err(err) => error!(?err, "frame serialization failed"),
    }
}

async fn apply_and_publish(state: &AppState, command: Command) -> Result<Frame, ApiError> {
    let mut shared = state.shared.lock().await;
    let frame = apply(&mut shared, command)?;
    publish(&state.tx, &frame);
    Ok(frame)
}

async fn get_profile(State(state): State<AppState>) -> Json<Vec<Sample>> {
    let shared = state.shared.lock().await;
    Json(shared.column.profile().samples().to_vec())
}

async fn get_run(State(state): State<AppState>) -> Result<Json<Frame>, ApiError> {
    let mut shared = state.shared.lock().await;
    let frame = next_frame(&mut shared).map_err(ApiError::internal)?;
    publish(&state.tx, &frame);
    Ok(Json(frame))
}

async fn post_profile(
    State(state): State<AppState>,
    Json(request): Json<UpdateRequest>,
) -> Result<Json<Frame>, ApiError> {
    apply_and_publish(&state, Command::Update(request))
        .await
        .map(Json)
}

async fn post_conditions(
    State(state): State<AppState>,
    Json(conditions): Json<GroundConditions>,
) -> Result<Json<Frame>, ApiError> {
    apply_and_publish(&state, Command::Conditions(conditions))
        .await
        .map(Json)
}

async fn post_ceiling(
    State(state): State<AppState>,
    Json(request): Json<CeilingRequest>,
) -> Result<Json<Frame>, ApiError> {
    apply_and_publish(&state, Command::Ceiling(request))
        .await
        .map(Json)
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(|socket| async move { handle_socket(socket, state).await })
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let mut rx = state.tx.subscribe();

    let mut send_task = tokio::spawn(async move {
        while let Ok(line) = rx.recv().await {
            if sender.send(Message::Text(line)).await.is_err() {
                break;
            }
        }
    });

    let recv_state = state.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(message)) = receiver.next().await {
            let Message::Text(text) = message else {
                continue;
            };
            match serde_json::from_str::<UpdateRequest>(&text) {
                Ok(request) => {
                    let result = apply_and_publish(&recv_state, Command::Update(request)).await;
                    if let Err(err) = result {
                        warn!(status = %err.status, message = %err.message, "rejected update");
                    }
                }
                Err(err) => warn!(%err, "malformed update message"),
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }
    info!("websocket client disconnected");
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(?err, "failed to listen for shutdown signal");
    }
    info!("shutting down");
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let args = Args::parse();

    let sounding = Sounding::load_from_path(&args.sounding)
        .with_context(|| format!("failed to load sounding from {:?}", args.sounding))?;
    let column = build_column(&sounding)?;
    info!(
        sounding = %sounding.name,
        samples = column.profile().len(),
        "column ready"
    );

    let (tx, _rx) = broadcast::channel::<String>(128);
    let state = AppState {
        shared: Arc::new(Mutex::new(Shared { column, next_t: 0 })),
        tx,
    };

    let app = Router::new()
        .route("/profile", get(get_profile).post(post_profile))
        .route("/run", get(get_run))
        .route("/conditions", axum::routing::post(post_conditions))
        .route("/ceiling", axum::routing::post(post_ceiling))
        .route("/stream", get(ws_handler))
        .with_state(state);

    let addr: SocketAddr = format!("{}:{}", args.bind, args.port)
        .parse()
        .with_context(|| format!("invalid bind address {}:{}", args.bind, args.port))?;

    info!(%addr, "starting thermald");
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    fn shared() -> Shared {
        let json = r#"{
            "name": "daemon",
            "samples": [
                {"altitude": 0, "temperature": 25.0, "humidity": 10.0},
                {"altitude": 9500, "temperature": -41.5}
            ]
        }"#;
        let sounding = Sounding::from_reader(json.as_bytes()).expect("sounding parses");
        Shared {
            column: build_column(&sounding).expect("column builds"),
            next_t: 0,
        }
    }

    #[test]
    fn requires_sounding() {
        let err = Args::try_parse_from(["thermald", "--port", "9000"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn update_request_parses_field_names() {
        let request: UpdateRequest =
            serde_json::from_str(r#"{"altitude": 1200, "field": "humidity", "value": 6.5}"#)
                .expect("request parses");
        assert_eq!(request.field, Field::Humidity);
        assert!(serde_json::from_str::<UpdateRequest>(
            r#"{"altitude": 1200, "field": "dew_point", "value": 6.5}"#
        )
        .is_err());
    }

    #[test]
    fn frames_advance_with_each_mutation() {
        let mut shared = shared();
        let first = apply(
            &mut shared,
            Command::Update(UpdateRequest {
                altitude: 1_200.0,
                field: Field::Temperature,
                value: 20.0,
            }),
        )
        .unwrap_or_else(|err| panic!("update rejected: {}", err.message));
        assert_eq!(first.t, 0);
        assert_eq!(first.revision, 1);

        let second = apply(
            &mut shared,
            Command::Conditions(GroundConditions {
                solar_strength: 0.2,
                ..GroundConditions::default()
            }),
        )
        .unwrap_or_else(|err| panic!("conditions rejected: {}", err.message));
        assert_eq!(second.t, 1);
        assert_eq!(second.revision, 2);
        assert_eq!(second.ground.solar_strength, 0.2);
    }

    #[test]
    fn out_of_range_update_is_unprocessable() {
        let mut shared = shared();
        let result = apply(
            &mut shared,
            Command::Update(UpdateRequest {
                altitude: 15_000.0,
                field: Field::Wind,
                value: 3.0,
            }),
        );
        match result {
            Err(err) => assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY),
            Ok(_) => panic!("update above the ceiling must be rejected"),
        }
        assert_eq!(shared.column.revision(), 0);
        assert_eq!(shared.next_t, 0);
    }

    #[test]
    fn raised_ceiling_allows_higher_updates() {
        let mut shared = shared();
        apply(
            &mut shared,
            Command::Ceiling(CeilingRequest { altitude: 14_000.0 }),
        )
        .unwrap_or_else(|err| panic!("ceiling rejected: {}", err.message));
        apply(
            &mut shared,
            Command::Update(UpdateRequest {
                altitude: 12_000.0,
                field: Field::Wind,
                value: 30.0,
            }),
        )
        .unwrap_or_else(|err| panic!("update rejected: {}", err.message));
        assert_eq!(
            shared.column.profile().query(12_000.0, Field::Wind),
            Ok(30.0)
        );
    }

    #[test]
    fn conditions_outside_bounds_are_unprocessable() {
        let mut shared = shared();
        let result = apply(
            &mut shared,
            Command::Conditions(GroundConditions {
                solar_strength: 1.3,
                ..GroundConditions::default()
            }),
        );
        match result {
            Err(err) => {
                assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
                assert!(err.message.contains("solar strength"));
            }
            Ok(_) => panic!("solar strength above one must be rejected"),
        }
        assert_eq!(shared.column.revision(), 0);
        assert_eq!(shared.next_t, 0);
    }

    #[tokio::test]
    async fn every_frame_reaches_the_stream() {
        let (tx, mut rx) = broadcast::channel::<String>(8);
        let state = AppState {
            shared: Arc::new(Mutex::new(shared())),
            tx,
        };

        let Ok(Json(first)) = get_run(State(state.clone())).await else {
            panic!("run rejected");
        };
        let second = apply_and_publish(
            &state,
            Command::Ceiling(CeilingRequest { altitude: 12_000.0 }),
        )
        .await
        .unwrap_or_else(|err| panic!("ceiling rejected: {}", err.message));
        assert_eq!((first.t, second.t), (0, 1));

        let streamed: Vec<u64> = (0..2)
            .map(|_| {
                let line = rx.try_recv().expect("frame broadcast");
                let value: serde_json::Value = serde_json::from_str(&line).expect("frame json");
                value["t"].as_u64().expect("frame t")
            })
            .collect();
        assert_eq!(streamed, vec![0, 1]);
    }
}
