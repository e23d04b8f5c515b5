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

use super::dto::{CreateExpenseRequest, ListExpensesQuery, UpdateExpenseRequest};
use super::repo::{self, Expense, ExpenseChanges, ExpenseFilter};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/expenses", get(list_expenses))
        .route("/expenses/download/csv", get(download_csv))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/expenses", post(create_expense))
        .route("/expenses/:id", put(update_expense).delete(delete_expense))
}

fn internal(e: anyhow::Error) -> (StatusCode, String) {
    error!(error = %e, "request failed");
    (StatusCode::INTERNAL_SERVER_ERROR, "Server error".into())
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

#[instrument(skip(state, payload))]
pub async fn create_expense(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<CreateExpenseRequest>,
) -> Result<Json<Expense>, (StatusCode, String)> {
    let (Some(amount), Some(category), Some(date)) =
        (payload.amount, non_empty(payload.category), payload.date)
    else {
        return Err((
            StatusCode::BAD_REQUEST,
            "amount, category, date required".into(),
        ));
    };

    let expense = repo::insert(
        &state.db,
        user_id,
        amount,
        &category,
        date,
        payload.description.as_deref().unwrap_or(""),
    )
    .await
    .map_err(internal)?;

    info!(expense_id = %expense.id, %user_id, "expense created");
    Ok(Json(expense))
}

#[instrument(skip(state))]
pub async fn list_expenses(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(q): Query<ListExpensesQuery>,
) -> Result<Json<Vec<Expense>>, (StatusCode, String)> {
    let limit = q.limit.max(1);
    let offset = (q.page.max(1) - 1) * limit;
    let filter = ExpenseFilter {
        category: non_empty(q.category),
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
pub async fn update_expense(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateExpenseRequest>,
) -> Result<Json<Expense>, (StatusCode, String)> {
    let existing = repo::find_by_id(&state.db, id)
        .await
        .map_err(internal)?
        .ok_or((StatusCode::NOT_FOUND, "Expense not found".to_string()))?;
    if existing.user_id != user_id {
        warn!(expense_id = %id, %user_id, owner = %existing.user_id, "expense update denied");
        return Err((StatusCode::FORBIDDEN, "Not authorized".into()));
    }

    let changes = ExpenseChanges {
        amount: payload.amount,
        category: non_empty(payload.category),
        date: payload.date,
        description: payload.description,
    };
    let updated = repo::update(&state.db, id, user_id, &changes)
        .await
        .map_err(internal)?;

    info!(expense_id = %id, %user_id, "expense updated");
    Ok(Json(updated))
}

#[instrument(skip(state))]
pub async fn delete_expense(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    let existing = repo::find_by_id(&state.db, id)
        .await
        .map_err(internal)?
        .ok_or((StatusCode::NOT_FOUND, "Expense not found".to_string()))?;
    if existing.user_id != user_id {
        warn!(expense_id = %id, %user_id, owner = %existing.user_id, "expense delete denied");
        return Err((StatusCode::FORBIDDEN, "Not authorized".into()));
    }

    repo::delete(&state.db, id, user_id).await.map_err(internal)?;

    info!(expense_id = %id, %user_id, "expense deleted");
    Ok(Json(serde_json::json!({ "message": "Expense deleted" })))
}

#[instrument(skip(state))]
pub async fn download_csv(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(q): Query<RangeQuery>,
) -> Result<Response, (StatusCode, String)> {
    let filter = ExpenseFilter {
        start: q.start,
        end: q.end,
        ..Default::default()
    };
    let rows = repo::list_all(&state.db, user_id, &filter)
        .await
        .map_err(internal)?;
    Ok(export::csv_response(
        "expenses.csv",
        export::expenses_csv(&rows),
    ))
}
