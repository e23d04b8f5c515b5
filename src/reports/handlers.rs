use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Response,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tracing::{error, instrument};

use crate::{
    auth::jwt::AuthUser,
    expenses,
    export::{self, RangeQuery},
    incomes,
    state::AppState,
};

use super::repo::{self, CategoryTotal, SourceTotal, TimelinePoint};

pub fn report_routes() -> Router<AppState> {
    Router::new()
        .route("/reports/summary", get(summary))
        .route("/reports/timeline", get(timeline))
        .route("/reports/expenses-by-category", get(expenses_by_category))
        .route("/reports/incomes-by-category", get(incomes_by_category))
        .route("/reports/download/expenses", get(download_expenses))
        .route("/reports/download/incomes", get(download_incomes))
}

fn internal(e: anyhow::Error) -> (StatusCode, String) {
    error!(error = %e, "request failed");
    (StatusCode::INTERNAL_SERVER_ERROR, "Server error".into())
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub total_expenses: f64,
    pub total_incomes: f64,
    pub balance: f64,
}

impl SummaryResponse {
    fn new(total_expenses: f64, total_incomes: f64) -> Self {
        Self {
            total_expenses,
            total_incomes,
            balance: total_incomes - total_expenses,
        }
    }
}

#[instrument(skip(state))]
pub async fn summary(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<SummaryResponse>, (StatusCode, String)> {
    let total_expenses = repo::expense_total(&state.db, user_id)
        .await
        .map_err(internal)?;
    let total_incomes = repo::income_total(&state.db, user_id)
        .await
        .map_err(internal)?;
    Ok(Json(SummaryResponse::new(total_expenses, total_incomes)))
}

#[instrument(skip(state))]
pub async fn timeline(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<TimelinePoint>>, (StatusCode, String)> {
    let points = repo::expense_timeline(&state.db, user_id)
        .await
        .map_err(internal)?;
    Ok(Json(points))
}

#[instrument(skip(state))]
pub async fn expenses_by_category(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<CategoryTotal>>, (StatusCode, String)> {
    let rows = repo::expenses_by_category(&state.db, user_id)
        .await
        .map_err(internal)?;
    Ok(Json(rows))
}

#[instrument(skip(state))]
pub async fn incomes_by_category(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<SourceTotal>>, (StatusCode, String)> {
    let rows = repo::incomes_by_source(&state.db, user_id)
        .await
        .map_err(internal)?;
    Ok(Json(rows))
}

#[instrument(skip(state))]
pub async fn download_expenses(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(q): Query<RangeQuery>,
) -> Result<Response, (StatusCode, String)> {
    let filter = expenses::repo::ExpenseFilter {
        start: q.start,
        end: q.end,
        ..Default::default()
    };
    let rows = expenses::repo::list_all(&state.db, user_id, &filter)
        .await
        .map_err(internal)?;
    Ok(export::csv_response(
        "expenses.csv",
        export::expenses_csv(&rows),
    ))
}

#[instrument(skip(state))]
pub async fn download_incomes(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(q): Query<RangeQuery>,
) -> Result<Response, (StatusCode, String)> {
    let filter = incomes::repo::IncomeFilter {
        start: q.start,
        end: q.end,
        ..Default::default()
    };
    let rows = incomes::repo::list_all(&state.db, user_id, &filter)
        .await
        .map_err(internal)?;
    Ok(export::csv_response(
        "incomes.csv",
        export::incomes_csv(&rows),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn balance_is_incomes_minus_expenses() {
        let s = SummaryResponse::new(300.0, 1000.0);
        assert_eq!(s.balance, 700.0);

        let empty = SummaryResponse::new(0.0, 0.0);
        assert_eq!(empty.balance, 0.0);

        let negative = SummaryResponse::new(120.5, 100.0);
        assert_eq!(negative.balance, -20.5);
    }

    #[test]
    fn summary_serialization() {
        let json = serde_json::to_string(&SummaryResponse::new(50.0, 80.0)).unwrap();
        assert!(json.contains(r#""total_expenses":50.0"#));
        assert!(json.contains(r#""total_incomes":80.0"#));
        assert!(json.contains(r#""balance":30.0"#));
    }
}
