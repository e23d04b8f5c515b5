use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Expense {
    pub id: Uuid,
    pub user_id: Uuid,
    pub amount: f64,
    pub category: String,
    #[serde(with = "crate::dates::date_format")]
    pub date: Date,
    pub description: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Default)]
pub struct ExpenseFilter {
    pub category: Option<String>,
    pub start: Option<Date>,
    pub end: Option<Date>,
    pub search: Option<String>,
}

#[derive(Debug, Default)]
pub struct ExpenseChanges {
    pub amount: Option<f64>,
    pub category: Option<String>,
    pub date: Option<Date>,
    pub description: Option<String>,
}

pub async fn insert(
    db: &PgPool,
    user_id: Uuid,
    amount: f64,
    category: &str,
    date: Date,
    description: &str,
) -> anyhow::Result<Expense> {
    let expense = sqlx::query_as::<_, Expense>(
        r#"
        INSERT INTO expenses (user_id, amount, category, date, description)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, user_id, amount, category, date, description, created_at, updated_at
        "#,
    )
    .bind(user_id)
    .bind(amount)
    .bind(category)
    .bind(date)
    .bind(description)
    .fetch_one(db)
    .await?;
    Ok(expense)
}

/// LIKE wildcards in user input match literally.
fn escape_like(raw: &str) -> String {
    raw.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

fn filtered_query(user_id: Uuid, filter: &ExpenseFilter) -> QueryBuilder<'static, Postgres> {
    let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
        "SELECT id, user_id, amount, category, date, description, created_at, updated_at \
         FROM expenses WHERE user_id = ",
    );
    qb.push_bind(user_id);
    if let Some(category) = &filter.category {
        qb.push(" AND category = ").push_bind(category.clone());
    }
    if let Some(start) = filter.start {
        qb.push(" AND date >= ").push_bind(start);
    }
    if let Some(end) = filter.end {
        qb.push(" AND date <= ").push_bind(end);
    }
    if let Some(search) = &filter.search {
        qb.push(" AND description ILIKE ")
            .push_bind(format!("%{}%", escape_like(search)));
    }
    qb.push(" ORDER BY date DESC, created_at DESC");
    qb
}

pub async fn list(
    db: &PgPool,
    user_id: Uuid,
    filter: &ExpenseFilter,
    limit: i64,
    offset: i64,
) -> anyhow::Result<Vec<Expense>> {
    let mut qb = filtered_query(user_id, filter);
    qb.push(" LIMIT ").push_bind(limit);
    qb.push(" OFFSET ").push_bind(offset);
    let rows = qb.build_query_as::<Expense>().fetch_all(db).await?;
    Ok(rows)
}

/// Unpaginated variant used by the CSV exports.
pub async fn list_all(
    db: &PgPool,
    user_id: Uuid,
    filter: &ExpenseFilter,
) -> anyhow::Result<Vec<Expense>> {
    let mut qb = filtered_query(user_id, filter);
    let rows = qb.build_query_as::<Expense>().fetch_all(db).await?;
    Ok(rows)
}

pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Expense>> {
    let expense = sqlx::query_as::<_, Expense>(
        r#"
        SELECT id, user_id, amount, category, date, description, created_at, updated_at
        FROM expenses
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(db)
    .await?;
    Ok(expense)
}

pub async fn update(
    db: &PgPool,
    id: Uuid,
    user_id: Uuid,
    changes: &ExpenseChanges,
) -> anyhow::Result<Expense> {
    let expense = sqlx::query_as::<_, Expense>(
        r#"
        UPDATE expenses
        SET amount = COALESCE($3, amount),
            category = COALESCE($4, category),
            date = COALESCE($5, date),
            description = COALESCE($6, description),
            updated_at = now()
        WHERE id = $1 AND user_id = $2
        RETURNING id, user_id, amount, category, date, description, created_at, updated_at
        "#,
    )
    .bind(id)
    .bind(user_id)
    .bind(changes.amount)
    .bind(changes.category.as_deref())
    .bind(changes.date)
    .bind(changes.description.as_deref())
    .fetch_one(db)
    .await?;
    Ok(expense)
}

pub async fn delete(db: &PgPool, id: Uuid, user_id: Uuid) -> anyhow::Result<u64> {
    let result = sqlx::query("DELETE FROM expenses WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(db)
        .await?;
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("50%"), "50\\%");
        assert_eq!(escape_like("a_b"), "a\\_b");
        assert_eq!(escape_like("back\\slash"), "back\\\\slash");
        assert_eq!(escape_like("plain"), "plain");
    }
}
