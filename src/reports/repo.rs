use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

/// Total spent by one category across a user's expenses.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CategoryTotal {
    pub category: String,
    pub total: f64,
}

/// Total received from one source across a user's incomes.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct SourceTotal {
    pub source: String,
    pub total: f64,
}

/// Expense total for one calendar month.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct TimelinePoint {
    pub year: i32,
    pub month: i32,
    pub total: f64,
}

pub async fn expense_total(db: &PgPool, user_id: Uuid) -> anyhow::Result<f64> {
    let total = sqlx::query_scalar::<_, f64>(
        "SELECT COALESCE(SUM(amount), 0) FROM expenses WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_one(db)
    .await?;
    Ok(total)
}

pub async fn income_total(db: &PgPool, user_id: Uuid) -> anyhow::Result<f64> {
    let total = sqlx::query_scalar::<_, f64>(
        "SELECT COALESCE(SUM(amount), 0) FROM incomes WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_one(db)
    .await?;
    Ok(total)
}

pub async fn expenses_by_category(
    db: &PgPool,
    user_id: Uuid,
) -> anyhow::Result<Vec<CategoryTotal>> {
    let rows = sqlx::query_as::<_, CategoryTotal>(
        r#"
        SELECT category, SUM(amount) AS total
        FROM expenses
        WHERE user_id = $1
        GROUP BY category
        ORDER BY total DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn incomes_by_source(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<SourceTotal>> {
    let rows = sqlx::query_as::<_, SourceTotal>(
        r#"
        SELECT source, SUM(amount) AS total
        FROM incomes
        WHERE user_id = $1
        GROUP BY source
        ORDER BY total DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

/// Year/month buckets ascending, oldest first, for the dashboard chart.
pub async fn expense_timeline(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<TimelinePoint>> {
    let rows = sqlx::query_as::<_, TimelinePoint>(
        r#"
        SELECT EXTRACT(YEAR FROM date)::int AS year,
               EXTRACT(MONTH FROM date)::int AS month,
               SUM(amount) AS total
        FROM expenses
        WHERE user_id = $1
        GROUP BY 1, 2
        ORDER BY 1, 2
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await?;
    Ok(rows)
}
