//! Login identifier normalization.
//!
//! Users type their registration number (RF) or taxpayer id (CPF) with any
//! punctuation they like. Everything that is not a digit is dropped and the
//! remaining digit count decides the login path.

use std::fmt;

use crate::error::AuthError;

/// Message returned when the identifier has the wrong number of digits.
pub const INVALID_LOGIN_MESSAGE: &str =
    "Login inválido. Use RF (7/8 dígitos) ou CPF (11 dígitos numéricos).";

/// A normalized login identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LoginIdentifier {
    /// Registration number (7 or 8 digits). Verified by the external system.
    Rf(String),
    /// Taxpayer id (11 digits). Verified locally.
    Cpf(String),
}

impl LoginIdentifier {
    /// Normalizes and classifies a raw identifier.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidInput` unless the digit count is 7, 8 or 11.
    pub fn parse(raw: &str) -> Result<Self, AuthError> {
        let digits = digits_only(raw);
        match digits.len() {
            7 | 8 => Ok(Self::Rf(digits)),
            11 => Ok(Self::Cpf(digits)),
            _ => Err(AuthError::invalid_input(INVALID_LOGIN_MESSAGE)),
        }
    }

    /// Returns the digit-only identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Rf(digits) | Self::Cpf(digits) => digits,
        }
    }

    /// Returns `true` for the locally verified CPF path.
    #[must_use]
    pub fn is_cpf(&self) -> bool {
        matches!(self, Self::Cpf(_))
    }
}

impl fmt::Display for LoginIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Drops every character that is not an ASCII digit.
#[must_use]
pub fn digits_only(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

/// Returns `true` when the identifier normalizes to 11 digits.
#[must_use]
pub fn is_cpf(raw: &str) -> bool {
    digits_only(raw).len() == 11
}

/// Masks the local part of an e-mail address.
///
/// Keeps three leading characters (one when the local part is three
/// characters or shorter) and replaces the rest with `*`. Input without
/// `@` keeps only its first character.
#[must_use]
pub fn anonymize_email(email: &str) -> String {
    let (local, domain) = match email.split_once('@') {
        Some((local, domain)) => (local, Some(domain)),
        None => (email, None),
    };

    let len = local.chars().count();
    let keep = if len > 3 && domain.is_some() {
        3
    } else {
        len.min(1)
    };
    let mut masked: String = local.chars().take(keep).collect();
    masked.extend(std::iter::repeat_n('*', len - keep));

    match domain {
        Some(domain) => format!("{masked}@{domain}"),
        None => masked,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rf_with_seven_and_eight_digits() {
        assert_eq!(
            LoginIdentifier::parse("1234567").unwrap(),
            LoginIdentifier::Rf("1234567".to_string())
        );
        assert_eq!(
            LoginIdentifier::parse("123.456-78").unwrap(),
            LoginIdentifier::Rf("12345678".to_string())
        );
    }

    #[test]
    fn test_cpf_with_punctuation() {
        let id = LoginIdentifier::parse("123.456.789-00").unwrap();
        assert_eq!(id, LoginIdentifier::Cpf("12345678900".to_string()));
        assert!(id.is_cpf());
        assert_eq!(id.as_str(), "12345678900");
    }

    #[test]
    fn test_other_lengths_are_invalid() {
        for raw in ["", "abc", "123456", "123456789", "1234567890", "123456789012"] {
            let err = LoginIdentifier::parse(raw).unwrap_err();
            assert!(matches!(err, AuthError::InvalidInput { .. }), "{raw}");
            assert_eq!(err.user_message(), INVALID_LOGIN_MESSAGE);
        }
    }

    #[test]
    fn test_letters_are_dropped_before_counting() {
        assert_eq!(
            LoginIdentifier::parse("RF 123 4567").unwrap(),
            LoginIdentifier::Rf("1234567".to_string())
        );
    }

    #[test]
    fn test_is_cpf() {
        assert!(is_cpf("123.456.789-01"));
        assert!(!is_cpf("1234567"));
    }

    #[test]
    fn test_anonymize_email() {
        assert_eq!(anonymize_email("joaosilva@email.com"), "joa******@email.com");
        assert_eq!(anonymize_email("ab@dominio.com"), "a*@dominio.com");
        assert_eq!(anonymize_email("abc@dominio.com"), "a**@dominio.com");
        assert_eq!(anonymize_email("abcd@dominio.com"), "abc*@dominio.com");
    }

    #[test]
    fn test_anonymize_email_without_domain() {
        assert_eq!(anonymize_email("joaosilva"), "j********");
        assert_eq!(anonymize_email("ab"), "a*");
        assert_eq!(anonymize_email(""), "");
    }
}
