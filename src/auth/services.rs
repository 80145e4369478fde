use lazy_static::lazy_static;
use rand::{rngs::OsRng, RngCore};
use regex::Regex;
use time::{Duration as TimeDuration, OffsetDateTime};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_login(login: &str) -> String {
    login.trim().to_lowercase()
}

/// 32 random bytes, hex encoded. Used for verification and reset links.
pub(crate) fn random_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

pub(crate) fn reset_expiry(now: OffsetDateTime, ttl_minutes: i64) -> OffsetDateTime {
    now + TimeDuration::minutes(ttl_minutes)
}

pub(crate) fn verify_url(base_url: &str, token: &str) -> String {
    format!("{}/confirm-email/{}", base_url, token)
}

pub(crate) fn reset_url(base_url: &str, token: &str) -> String {
    format!("{}/reset-password/{}", base_url, token)
}
