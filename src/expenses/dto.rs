use serde::Deserialize;
use time::Date;

/// All three required fields arrive as options so the handler can answer
/// with the exact message clients expect.
#[derive(Debug, Deserialize)]
pub struct CreateExpenseRequest {
    pub amount: Option<f64>,
    pub category: Option<String>,
    #[serde(default, with = "crate::dates::date_format::option")]
    pub date: Option<Date>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Partial update; absent fields keep their stored value.
#[derive(Debug, Deserialize)]
pub struct UpdateExpenseRequest {
    pub amount: Option<f64>,
    pub category: Option<String>,
    #[serde(default, with = "crate::dates::date_format::option")]
    pub date: Option<Date>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListExpensesQuery {
    pub category: Option<String>,
    #[serde(default, with = "crate::dates::date_format::option")]
    pub start: Option<Date>,
    #[serde(default, with = "crate::dates::date_format::option")]
    pub end: Option<Date>,
    pub search: Option<String>,
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_page() -> i64 {
    1
}
fn default_limit() -> i64 {
    1000
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn create_request_parses_iso_date() {
        let req: CreateExpenseRequest = serde_json::from_str(
            r#"{"amount":50,"category":"Food","date":"2024-01-01","description":"lunch"}"#,
        )
        .unwrap();
        assert_eq!(req.amount, Some(50.0));
        assert_eq!(req.category.as_deref(), Some("Food"));
        assert_eq!(req.date, Some(date!(2024 - 01 - 01)));
    }

    #[test]
    fn list_query_defaults() {
        let q: ListExpensesQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(q.page, 1);
        assert_eq!(q.limit, 1000);
        assert!(q.category.is_none());
        assert!(q.start.is_none());
    }
}
