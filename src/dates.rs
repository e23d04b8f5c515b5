use time::{format_description::FormatItem, macros::format_description, Date};

/// Calendar dates travel as `YYYY-MM-DD` in JSON bodies, query strings and
/// CSV exports.
pub const DATE_FORMAT: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

pub fn format_date(date: Date) -> String {
    date.format(&DATE_FORMAT).unwrap_or_else(|_| date.to_string())
}

pub mod date_format {
    use serde::{de::Error as _, ser::Error as _, Deserialize, Deserializer, Serializer};
    use time::Date;

    use super::DATE_FORMAT;

    pub fn serialize<S>(date: &Date, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let s = date.format(&DATE_FORMAT).map_err(S::Error::custom)?;
        serializer.serialize_str(&s)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Date, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Date::parse(&s, &DATE_FORMAT).map_err(D::Error::custom)
    }

    pub mod option {
        use serde::{de::Error as _, Deserialize, Deserializer, Serializer};
        use time::Date;

        use super::DATE_FORMAT;

        pub fn serialize<S>(date: &Option<Date>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match date {
                Some(d) => super::serialize(d, serializer),
                None => serializer.serialize_none(),
            }
        }

        /// Treats a missing or empty parameter as no filter.
        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Date>, D::Error>
        where
            D: Deserializer<'de>,
        {
            let s = Option::<String>::deserialize(deserializer)?;
            match s.as_deref() {
                None | Some("") => Ok(None),
                Some(v) => Date::parse(v, &DATE_FORMAT).map(Some).map_err(D::Error::custom),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};
    use time::macros::date;

    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    struct Doc {
        #[serde(with = "date_format")]
        date: time::Date,
    }

    #[derive(Debug, Deserialize)]
    struct Range {
        #[serde(default, with = "date_format::option")]
        start: Option<time::Date>,
    }

    #[test]
    fn date_roundtrips_as_iso_day() {
        let doc = Doc {
            date: date!(2024 - 01 - 01),
        };
        let json = serde_json::to_string(&doc).unwrap();
        assert_eq!(json, r#"{"date":"2024-01-01"}"#);
        let back: Doc = serde_json::from_str(&json).unwrap();
        assert_eq!(back.date, doc.date);
    }

    #[test]
    fn garbage_date_is_rejected() {
        assert!(serde_json::from_str::<Doc>(r#"{"date":"yesterday"}"#).is_err());
        assert!(serde_json::from_str::<Doc>(r#"{"date":"2024-13-01"}"#).is_err());
    }

    #[test]
    fn optional_date_accepts_missing_and_empty() {
        let r: Range = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(r.start, None);
        let r: Range = serde_json::from_str(r#"{"start":""}"#).unwrap();
        assert_eq!(r.start, None);
        let r: Range = serde_json::from_str(r#"{"start":"2023-06-15"}"#).unwrap();
        assert_eq!(r.start, Some(date!(2023 - 06 - 15)));
    }

    #[test]
    fn format_date_is_zero_padded() {
        assert_eq!(format_date(date!(2024 - 03 - 05)), "2024-03-05");
    }
}
