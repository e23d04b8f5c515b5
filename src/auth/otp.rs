use rand::Rng;
use time::{Duration, OffsetDateTime};

/// Reset codes are only honored for a short window.
pub const OTP_TTL: Duration = Duration::minutes(5);

/// Six-digit numeric code, zero never leads.
pub fn generate() -> String {
    rand::thread_rng().gen_range(100_000..=999_999u32).to_string()
}

pub fn expiry_from_now() -> OffsetDateTime {
    OffsetDateTime::now_utc() + OTP_TTL
}

/// A missing expiry counts as expired; tokens without one were never issued.
pub fn is_expired(expiry: Option<OffsetDateTime>) -> bool {
    match expiry {
        Some(t) => OffsetDateTime::now_utc() > t,
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_six_digit_codes() {
        for _ in 0..200 {
            let code = generate();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
            let n: u32 = code.parse().unwrap();
            assert!((100_000..=999_999).contains(&n));
        }
    }

    #[test]
    fn future_expiry_is_not_expired() {
        assert!(!is_expired(Some(OffsetDateTime::now_utc() + Duration::minutes(1))));
    }

    #[test]
    fn past_expiry_is_expired() {
        assert!(is_expired(Some(OffsetDateTime::now_utc() - Duration::seconds(1))));
    }

    #[test]
    fn missing_expiry_is_expired() {
        assert!(is_expired(None));
    }
}
