use axum::{
    http::header,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use time::Date;

use crate::dates::format_date;
use crate::expenses::repo::Expense;
use crate::incomes::repo::Income;

/// Optional inclusive date window shared by every CSV download endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct RangeQuery {
    #[serde(default, with = "crate::dates::date_format::option")]
    pub start: Option<Date>,
    #[serde(default, with = "crate::dates::date_format::option")]
    pub end: Option<Date>,
}

/// RFC 4180 quoting: wrap the field when it carries a comma, quote or line
/// break, doubling embedded quotes.
fn csv_field(raw: &str) -> String {
    if raw.contains(',') || raw.contains('"') || raw.contains('\n') || raw.contains('\r') {
        format!("\"{}\"", raw.replace('"', "\"\""))
    } else {
        raw.to_string()
    }
}

fn csv_line(fields: &[String]) -> String {
    fields
        .iter()
        .map(|f| csv_field(f))
        .collect::<Vec<_>>()
        .join(",")
}

pub fn expenses_csv(rows: &[Expense]) -> String {
    let mut out = String::from("id,amount,category,date,description\n");
    for r in rows {
        out.push_str(&csv_line(&[
            r.id.to_string(),
            r.amount.to_string(),
            r.category.clone(),
            format_date(r.date),
            r.description.clone(),
        ]));
        out.push('\n');
    }
    out
}

pub fn incomes_csv(rows: &[Income]) -> String {
    let mut out = String::from("id,amount,source,date,description\n");
    for r in rows {
        out.push_str(&csv_line(&[
            r.id.to_string(),
            r.amount.to_string(),
            r.source.clone(),
            format_date(r.date),
            r.description.clone(),
        ]));
        out.push('\n');
    }
    out
}

pub fn csv_response(filename: &str, body: String) -> Response {
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        body,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use time::macros::{date, datetime};
    use uuid::Uuid;

    use super::*;

    fn expense(amount: f64, category: &str, description: &str) -> Expense {
        Expense {
            id: Uuid::nil(),
            user_id: Uuid::nil(),
            amount,
            category: category.into(),
            date: date!(2024 - 01 - 01),
            description: description.into(),
            created_at: datetime!(2024-01-01 00:00 UTC),
            updated_at: datetime!(2024-01-01 00:00 UTC),
        }
    }

    #[test]
    fn plain_fields_stay_unquoted() {
        let csv = expenses_csv(&[expense(50.0, "Food", "lunch")]);
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("id,amount,category,date,description"));
        assert_eq!(
            lines.next(),
            Some("00000000-0000-0000-0000-000000000000,50,Food,2024-01-01,lunch")
        );
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn commas_and_quotes_are_escaped() {
        let csv = expenses_csv(&[expense(9.99, "Food, drinks", r#"said "hi""#)]);
        let row = csv.lines().nth(1).unwrap();
        assert!(row.contains(r#""Food, drinks""#));
        assert!(row.contains(r#""said ""hi""""#));
    }

    #[test]
    fn fractional_amounts_keep_their_digits() {
        let csv = expenses_csv(&[expense(12.5, "Transport", "")]);
        assert!(csv.lines().nth(1).unwrap().contains(",12.5,"));
    }

    #[test]
    fn incomes_use_source_header() {
        let row = Income {
            id: Uuid::nil(),
            user_id: Uuid::nil(),
            amount: 100.0,
            source: "Salary".into(),
            date: date!(2024 - 02 - 29),
            description: "feb".into(),
            created_at: datetime!(2024-02-29 00:00 UTC),
            updated_at: datetime!(2024-02-29 00:00 UTC),
        };
        let csv = incomes_csv(&[row]);
        assert!(csv.starts_with("id,amount,source,date,description\n"));
        assert!(csv.contains("Salary,2024-02-29,feb"));
    }
}
