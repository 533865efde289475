//! Password reset links.
//!
//! A link has two parts:
//!
//! - `uid`: the principal id as URL-safe base64 without padding
//! - `token`: `<issued-at, base36>-<hex HMAC-SHA256>`
//!
//! The MAC covers the principal id, its current password hash, its last login
//! and the issue time. Changing the password or logging in again invalidates
//! every outstanding link without any server-side state.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::AuthResult;
use crate::config::PasswordResetConfig;
use crate::error::AuthError;
use crate::types::Principal;

type HmacSha256 = Hmac<Sha256>;

/// Message returned for a uid that does not decode to a principal id.
pub const INVALID_UID_MESSAGE: &str = "UID inválido ou malformado.";

/// Signs and checks password reset links.
#[derive(Clone)]
pub struct ResetLinkSigner {
    secret: Vec<u8>,
    lifetime_secs: i64,
    frontend_url: String,
}

impl std::fmt::Debug for ResetLinkSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResetLinkSigner")
            .field("lifetime_secs", &self.lifetime_secs)
            .field("frontend_url", &self.frontend_url)
            .finish_non_exhaustive()
    }
}

impl ResetLinkSigner {
    /// Creates a signer from the reset settings.
    #[must_use]
    pub fn new(config: &PasswordResetConfig) -> Self {
        Self {
            secret: config.secret.as_bytes().to_vec(),
            lifetime_secs: i64::try_from(config.link_lifetime.as_secs()).unwrap_or(i64::MAX),
            frontend_url: config.frontend_url.trim_end_matches('/').to_string(),
        }
    }

    /// Encodes a principal id for use in a link.
    #[must_use]
    pub fn encode_uid(id: Uuid) -> String {
        URL_SAFE_NO_PAD.encode(id.as_bytes())
    }

    /// Decodes a link uid.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidInput` when the uid is not a base64 encoded UUID.
    pub fn decode_uid(uid: &str) -> AuthResult<Uuid> {
        URL_SAFE_NO_PAD
            .decode(uid.trim())
            .ok()
            .and_then(|bytes| Uuid::from_slice(&bytes).ok())
            .ok_or_else(|| AuthError::invalid_input(INVALID_UID_MESSAGE))
    }

    /// Creates a token for the principal's current state.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Configuration` if the secret cannot key the MAC.
    pub fn make_token(&self, principal: &Principal) -> AuthResult<String> {
        self.make_token_at(principal, OffsetDateTime::now_utc().unix_timestamp())
    }

    fn make_token_at(&self, principal: &Principal, issued_at: i64) -> AuthResult<String> {
        let issued_at = u64::try_from(issued_at)
            .map_err(|_| AuthError::internal("issue time before the Unix epoch"))?;
        let mac = self.mac(principal, issued_at)?.finalize().into_bytes();
        Ok(format!("{}-{}", to_base36(issued_at), hex::encode(mac)))
    }

    /// Builds the frontend link for a principal.
    ///
    /// # Errors
    ///
    /// Same as [`make_token`](Self::make_token).
    pub fn reset_link(&self, principal: &Principal) -> AuthResult<String> {
        Ok(format!(
            "{}/reset-senha/{}/{}",
            self.frontend_url,
            Self::encode_uid(principal.id),
            self.make_token(principal)?
        ))
    }

    /// Returns `true` when the token was issued for the principal's current
    /// state and has not expired.
    #[must_use]
    pub fn check_token(&self, principal: &Principal, token: &str) -> bool {
        let Some((ts, signature)) = token.split_once('-') else {
            return false;
        };
        let Ok(issued_at) = u64::from_str_radix(ts, 36) else {
            return false;
        };
        let Ok(signature) = hex::decode(signature) else {
            return false;
        };

        let now = OffsetDateTime::now_utc().unix_timestamp();
        let Ok(issued) = i64::try_from(issued_at) else {
            return false;
        };
        if issued > now || now - issued > self.lifetime_secs {
            return false;
        }

        match self.mac(principal, issued_at) {
            Ok(mac) => mac.verify_slice(&signature).is_ok(),
            Err(_) => false,
        }
    }

    fn mac(&self, principal: &Principal, issued_at: u64) -> AuthResult<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| AuthError::configuration(format!("invalid reset secret: {e}")))?;
        let last_login = principal
            .last_login
            .map(|t| t.unix_timestamp().to_string())
            .unwrap_or_default();
        mac.update(principal.id.as_bytes());
        mac.update(b":");
        mac.update(principal.password_hash.as_bytes());
        mac.update(b":");
        mac.update(last_login.as_bytes());
        mac.update(b":");
        mac.update(issued_at.to_string().as_bytes());
        Ok(mac)
    }
}

fn to_base36(mut value: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn signer() -> ResetLinkSigner {
        ResetLinkSigner::new(&PasswordResetConfig {
            secret: "reset-secret".to_string(),
            link_lifetime: Duration::from_secs(3 * 24 * 3600),
            frontend_url: "https://gipe.sme.prefeitura.sp.gov.br/".to_string(),
        })
    }

    fn principal() -> Principal {
        Principal::builder("1234567")
            .password_hash("$argon2id$v=19$hash")
            .build()
    }

    #[test]
    fn test_base36() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
        assert_eq!(u64::from_str_radix(&to_base36(1_700_000_000), 36), Ok(1_700_000_000));
    }

    #[test]
    fn test_uid_decodes_to_principal_id() {
        let id = Uuid::new_v4();
        let uid = ResetLinkSigner::encode_uid(id);
        assert!(!uid.contains('='));
        assert_eq!(ResetLinkSigner::decode_uid(&uid).unwrap(), id);
    }

    #[test]
    fn test_malformed_uid() {
        for uid in ["", "%%%", "YWJj"] {
            let err = ResetLinkSigner::decode_uid(uid).unwrap_err();
            assert_eq!(err.user_message(), INVALID_UID_MESSAGE);
        }
    }

    #[test]
    fn test_fresh_token_is_accepted() {
        let signer = signer();
        let principal = principal();
        let token = signer.make_token(&principal).unwrap();
        assert!(signer.check_token(&principal, &token));
    }

    #[test]
    fn test_password_change_invalidates_token() {
        let signer = signer();
        let mut principal = principal();
        let token = signer.make_token(&principal).unwrap();
        principal.password_hash = "$argon2id$v=19$other".to_string();
        assert!(!signer.check_token(&principal, &token));
    }

    #[test]
    fn test_login_invalidates_token() {
        let signer = signer();
        let mut principal = principal();
        let token = signer.make_token(&principal).unwrap();
        principal.last_login = Some(OffsetDateTime::now_utc());
        assert!(!signer.check_token(&principal, &token));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let signer = signer();
        let principal = principal();
        let four_days_ago = OffsetDateTime::now_utc().unix_timestamp() - 4 * 24 * 3600;
        let token = signer.make_token_at(&principal, four_days_ago).unwrap();
        assert!(!signer.check_token(&principal, &token));
    }

    #[test]
    fn test_token_for_other_principal_is_rejected() {
        let signer = signer();
        let token = signer.make_token(&principal()).unwrap();
        assert!(!signer.check_token(&principal(), &token));
    }

    #[test]
    fn test_garbage_tokens_are_rejected() {
        let signer = signer();
        let principal = principal();
        for token in ["", "abc", "zz-zz", "-", "1-"] {
            assert!(!signer.check_token(&principal, token), "{token}");
        }
    }

    #[test]
    fn test_reset_link_shape() {
        let signer = signer();
        let principal = principal();
        let link = signer.reset_link(&principal).unwrap();
        let prefix = format!(
            "https://gipe.sme.prefeitura.sp.gov.br/reset-senha/{}/",
            ResetLinkSigner::encode_uid(principal.id)
        );
        assert!(link.starts_with(&prefix));
        let token = &link[prefix.len()..];
        assert!(signer.check_token(&principal, token));
    }
}
