use serde::Deserialize;
use time::Date;

#[derive(Debug, Deserialize)]
pub struct CreateIncomeRequest {
    pub amount: Option<f64>,
    pub source: Option<String>,
    #[serde(default, with = "crate::dates::date_format::option")]
    pub date: Option<Date>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Partial update; absent fields keep their stored value.
#[derive(Debug, Deserialize)]
pub struct UpdateIncomeRequest {
    pub amount: Option<f64>,
    pub source: Option<String>,
    #[serde(default, with = "crate::dates::date_format::option")]
    pub date: Option<Date>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListIncomesQuery {
    pub source: Option<String>,
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
        let req: CreateIncomeRequest = serde_json::from_str(
            r#"{"amount":2500,"source":"Salary","date":"2024-03-31"}"#,
        )
        .unwrap();
        assert_eq!(req.amount, Some(2500.0));
        assert_eq!(req.source.as_deref(), Some("Salary"));
        assert_eq!(req.date, Some(date!(2024 - 03 - 31)));
        assert!(req.description.is_none());
    }
}
