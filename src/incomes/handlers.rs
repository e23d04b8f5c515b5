use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Response,
    routing::{get, post, put},
    Json, Router,
};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::jwt::AuthUser,
    export::{self, RangeQuery},
    state::AppState,
};

use super::dto::{CreateIncomeRequest, ListIncomesQuery, UpdateIncomeRequest};
use super::repo::{self, Income, IncomeChanges, IncomeFilter};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/incomes", get(list_incomes))
        .route("/incomes/download/csv", get(download_csv))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/incomes", post(create_income))
        .route("/incomes/:id", put(update_income).delete(delete_income))
}

fn internal(e: anyhow::Error) -> (StatusCode, String) {
    error!(error = %e, "request failed");
    (StatusCode::INTERNAL_SERVER_ERROR, "Server error".into())
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

#[instrument(skip(state, payload))]
pub async fn create_income(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<CreateIncomeRequest>,
) -> Result<Json<Income>, (StatusCode, String)> {
    let (Some(amount), Some(source), Some(date)) =
        (payload.amount, non_empty(payload.source), payload.date)
    else {
        return Err((
            StatusCode::BAD_REQUEST,
            "amount, source, date required".into(),
        ));
    };

    let income = repo::insert(
        &state.db,
        user_id,
        amount,
        &source,
        date,
        payload.description.as_deref().unwrap_or(""),
    )
    .await
    .map_err(internal)?;

    info!(income_id = %income.id, %user_id, "income created");
    Ok(Json(income))
}

#[instrument(skip(state))]
pub async fn list_incomes(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(q): Query<ListIncomesQuery>,
) -> Result<Json<Vec<Income>>, (StatusCode, String)> {
    let limit = q.limit.max(1);
    let offset = (q.page.max(1) - 1) * limit;
    let filter = IncomeFilter {
        source: non_empty(q.source),
        start: q.start,
        end: q.end,
        search: non_empty(q.search),
    };

    let rows = repo::list(&state.db, user_id, &filter, limit, offset)
        .await
        .map_err(internal)?;
    Ok(Json(rows))
}

#[instrument(skip(state, payload))]
pub async fn update_income(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateIncomeRequest>,
) -> Result<Json<Income>, (StatusCode, String)> {
    let existing = repo::find_by_id(&state.db, id)
        .await
        .map_err(internal)?
        .ok_or((StatusCode::NOT_FOUND, "Income not found".to_string()))?;
    if existing.user_id != user_id {
        warn!(income_id = %id, %user_id, owner = %existing.user_id, "income update denied");
        return Err((StatusCode::FORBIDDEN, "Not authorized".into()));
    }

    let changes = IncomeChanges {
        amount: payload.amount,
        source: non_empty(payload.source),
        date: payload.date,
        description: payload.description,
    };
    let updated = repo::update(&state.db, id, user_id, &changes)
        .await
        .map_err(internal)?;

    info!(income_id = %id, %user_id, "income updated");
    Ok(Json(updated))
}

#[instrument(skip(state))]
pub async fn delete_income(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    let existing = repo::find_by_id(&state.db, id)
        .await
        .map_err(internal)?
        .ok_or((StatusCode::NOT_FOUND, "Income not found".to_string()))?;
    if existing.user_id != user_id {
        warn!(income_id = %id, %user_id, owner = %existing.user_id, "income delete denied");
        return Err((StatusCode::FORBIDDEN, "Not authorized".into()));
    }

    repo::delete(&state.db, id, user_id).await.map_err(internal)?;

    info!(income_id = %id, %user_id, "income deleted");
    Ok(Json(serde_json::json!({ "message": "Income deleted successfully" })))
}

#[instrument(skip(state))]
pub async fn download_csv(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(q): Query<RangeQuery>,
) -> Result<Response, (StatusCode, String)> {
    let filter = IncomeFilter {
        start: q.start,
        end: q.end,
        ..Default::default()
    };
    let rows = repo::list_all(&state.db, user_id, &filter)
        .await
        .map_err(internal)?;
    Ok(export::csv_response(
        "incomes.csv",
        export::incomes_csv(&rows),
    ))
}
