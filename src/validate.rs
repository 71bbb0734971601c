//! Input validation helpers shared by the auth and profile handlers.

use lazy_static::lazy_static;
use regex::Regex;

pub fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// At least 8 characters with an uppercase letter, a lowercase letter and a
/// digit.
pub fn is_strong_password(password: &str) -> bool {
    password.len() >= 8
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_digit())
}

pub fn is_valid_phone(phone: &str) -> bool {
    lazy_static! {
        static ref PHONE_RE: Regex = Regex::new(r"^(\+\d{1,3}[- ]?)?\d{1,14}$").unwrap();
    }
    PHONE_RE.is_match(phone)
}

pub fn is_valid_skill_level(level: &str) -> bool {
    matches!(
        level.to_ascii_lowercase().as_str(),
        "beginner" | "intermediate" | "advanced" | "professional"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_emails() {
        assert!(is_valid_email("a@x.com"));
        assert!(is_valid_email("first.last@sub.domain.org"));
    }

    #[test]
    fn rejects_malformed_emails() {
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("a b@x.com"));
        assert!(!is_valid_email("a@nodot"));
    }

    #[test]
    fn password_strength_rules() {
        assert!(is_strong_password("Abcdef12"));
        assert!(!is_strong_password("abcdef12")); // no uppercase
        assert!(!is_strong_password("ABCDEF12")); // no lowercase
        assert!(!is_strong_password("Abcdefgh")); // no digit
        assert!(!is_strong_password("Ab1")); // too short
    }

    #[test]
    fn phone_numbers() {
        assert!(is_valid_phone("+971 501234567"));
        assert!(is_valid_phone("0501234567"));
        assert!(!is_valid_phone("phone"));
    }

    #[test]
    fn skill_levels_case_insensitive() {
        assert!(is_valid_skill_level("beginner"));
        assert!(is_valid_skill_level("Advanced"));
        assert!(!is_valid_skill_level("pro"));
    }
}
