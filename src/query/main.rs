//! HTTP API over the place stores.
//!
//! Thin marshaling layer: every route maps onto one store or matcher
//! operation. Record creation runs the full request-time flow (parse the
//! free-text name, match against the gazetteer, persist with the match
//! reference when one was found).

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post, put},
    Router,
};
use clap::Parser;
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use ortnamn::models::{
    GazetteerRecord, MergedPlace, PersonEvents, StructuredPlace, UnmatchedPlace, UserPlace,
};
use ortnamn::store::{
    self, merged_places, AdminEntry, GazetteerPatch, LocalityEntry, RecordedPlace, Stores,
    UserPlacePatch,
};
use ortnamn::{parse, Error};

#[derive(Parser, Debug)]
#[command(name = "query")]
#[command(about = "Place gazetteer query server")]
struct Args {
    /// Listen address
    #[arg(short, long, default_value = "0.0.0.0:3000")]
    listen: String,

    /// Sled database directory
    #[arg(long, default_value = "gazetteer.db")]
    db: PathBuf,
}

/// Application state shared across handlers
struct AppState {
    stores: Stores,
}

type HttpResult<T> = std::result::Result<Json<T>, (StatusCode, String)>;

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::DEBUG)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    info!("Place Gazetteer Query Server");
    let stores = store::open(&args.db).context("Failed to open place database")?;
    info!(
        "Opened database with {} gazetteer records",
        stores.gazetteer.count()?
    );

    let state = Arc::new(AppState { stores });

    let app = Router::new()
        .route("/health", get(health_handler))
        .route("/api/places", get(list_places).post(create_place))
        .route("/api/places/unmatched", post(unmatched_places))
        .route(
            "/api/places/{id}",
            axum::routing::patch(update_place).delete(delete_place),
        )
        .route("/api/places/{id}/hide", post(hide_place))
        .route("/api/places/{id}/match", put(set_match))
        .route("/api/official", get(search_official))
        .route(
            "/api/official/{id}",
            get(get_official)
                .patch(update_official)
                .delete(delete_official),
        )
        .route("/api/official/{id}/copy", post(copy_official))
        .route("/api/parse", get(parse_handler))
        .route("/api/lan", get(list_counties))
        .route("/api/lan/{code}/kommuner", get(list_municipalities))
        .route("/api/kommuner/{code}/forsamlingar", get(list_parishes))
        .route("/api/forsamlingar/{code}/orter", get(list_localities))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    info!("Starting server on {}", args.listen);
    let listener = tokio::net::TcpListener::bind(&args.listen).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn to_http(err: Error) -> (StatusCode, String) {
    let status = match &err {
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        Error::Validation(_) => StatusCode::BAD_REQUEST,
        Error::Storage(_) | Error::Corrupt(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        error!("request failed: {}", err);
    }
    (status, err.to_string())
}

async fn health_handler(State(state): State<Arc<AppState>>) -> HttpResult<HealthResponse> {
    Ok(Json(HealthResponse {
        status: "ok",
        gazetteer_records: state.stores.gazetteer.count().map_err(to_http)?,
        user_places: state.stores.users.all().map_err(to_http)?.len(),
    }))
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    gazetteer_records: usize,
    user_places: usize,
}

/// User places first, then official records not shadowed by a user entry.
async fn list_places(State(state): State<Arc<AppState>>) -> HttpResult<Vec<MergedPlace>> {
    merged_places(&state.stores.users, &state.stores.gazetteer)
        .map(Json)
        .map_err(to_http)
}

/// Record a place against an event: parse, match, persist.
async fn create_place(
    State(state): State<Arc<AppState>>,
    Json(place): Json<UserPlace>,
) -> HttpResult<RecordedPlace> {
    state.stores.record_place(place).map(Json).map_err(to_http)
}

/// Unmatched places annotated with the event references the caller supplies.
async fn unmatched_places(
    State(state): State<Arc<AppState>>,
    Json(people): Json<Vec<PersonEvents>>,
) -> HttpResult<Vec<UnmatchedPlace>> {
    state.stores.users.unmatched(&people).map(Json).map_err(to_http)
}

async fn update_place(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
    Json(patch): Json<UserPlacePatch>,
) -> HttpResult<UserPlace> {
    state.stores.users.update(id, &patch).map(Json).map_err(to_http)
}

async fn delete_place(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> std::result::Result<StatusCode, (StatusCode, String)> {
    state.stores.users.delete(id).map_err(to_http)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn hide_place(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> std::result::Result<StatusCode, (StatusCode, String)> {
    state.stores.users.hide(id).map_err(to_http)?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
struct MatchBody {
    matched_place_id: Option<u64>,
}

async fn set_match(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
    Json(body): Json<MatchBody>,
) -> std::result::Result<StatusCode, (StatusCode, String)> {
    state
        .stores
        .users
        .set_matched_place(id, body.matched_place_id)
        .map_err(to_http)?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
struct SearchParams {
    q: String,
}

async fn search_official(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> HttpResult<Vec<GazetteerRecord>> {
    state.stores.gazetteer.search(&params.q).map(Json).map_err(to_http)
}

async fn get_official(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> HttpResult<GazetteerRecord> {
    match state.stores.gazetteer.get(id).map_err(to_http)? {
        Some(record) => Ok(Json(record)),
        None => Err(to_http(Error::NotFound(id))),
    }
}

async fn update_official(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
    Json(patch): Json<GazetteerPatch>,
) -> HttpResult<GazetteerRecord> {
    state.stores.gazetteer.update(id, &patch).map(Json).map_err(to_http)
}

async fn delete_official(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> std::result::Result<StatusCode, (StatusCode, String)> {
    state.stores.gazetteer.delete(id).map_err(to_http)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Editable user copy of an official record, for override-without-delete.
async fn copy_official(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> HttpResult<UserPlace> {
    let record = match state.stores.gazetteer.get(id).map_err(to_http)? {
        Some(record) => record,
        None => return Err(to_http(Error::NotFound(id))),
    };
    let copy_id = state
        .stores
        .users
        .copy_from_gazetteer(&record)
        .map_err(to_http)?;
    match state.stores.users.get(copy_id).map_err(to_http)? {
        Some(place) => Ok(Json(place)),
        None => Err(to_http(Error::NotFound(copy_id))),
    }
}

#[derive(Deserialize)]
struct ParseParams {
    text: String,
}

async fn parse_handler(Query(params): Query<ParseParams>) -> Json<StructuredPlace> {
    Json(parse::parse(&params.text))
}

async fn list_counties(State(state): State<Arc<AppState>>) -> HttpResult<Vec<AdminEntry>> {
    state.stores.gazetteer.counties().map(Json).map_err(to_http)
}

async fn list_municipalities(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> HttpResult<Vec<AdminEntry>> {
    state
        .stores
        .gazetteer
        .municipalities_in_county(&code)
        .map(Json)
        .map_err(to_http)
}

async fn list_parishes(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> HttpResult<Vec<AdminEntry>> {
    state
        .stores
        .gazetteer
        .parishes_in_municipality(&code)
        .map(Json)
        .map_err(to_http)
}

async fn list_localities(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> HttpResult<Vec<LocalityEntry>> {
    state
        .stores
        .gazetteer
        .localities_in_parish(&code)
        .map(Json)
        .map_err(to_http)
}
