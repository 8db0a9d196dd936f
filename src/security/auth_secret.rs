//! Registry credentials held in memory-safe, encoded form
//!
//! An [`AuthSecret`] keeps `user:pass` base64-encoded inside a
//! `secrecy::SecretString`. It is decoded only while an ephemeral config is
//! being rendered, and every diagnostic that may echo it goes through
//! [`AuthSecret::redact`] first.

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use secrecy::{ExposeSecret, SecretString};
use std::fmt;

/// Needles shorter than this are left alone; masking them would shred
/// ordinary words in the diagnostics
const MIN_REDACT_LEN: usize = 4;

/// Opaque `user:pass` secret for the destination registry
pub struct AuthSecret {
    encoded: SecretString,
}

/// Decoded credentials, alive only while a config is rendered
pub struct Credentials {
    pub user: String,
    password: SecretString,
}

impl AuthSecret {
    /// Encode a raw `user:pass` string
    ///
    /// # Examples
    ///
    /// ```
    /// use registry_migrate::security::AuthSecret;
    /// use secrecy::ExposeSecret;
    ///
    /// let secret = AuthSecret::from_user_pass("alice:s3cret");
    /// assert_eq!(secret.encoded().expose_secret(), "YWxpY2U6czNjcmV0");
    /// ```
    pub fn from_user_pass(raw: &str) -> Self {
        Self {
            encoded: SecretString::from(BASE64.encode(raw.as_bytes())),
        }
    }

    /// The base64 form, as written to `_auth`
    pub fn encoded(&self) -> &SecretString {
        &self.encoded
    }

    /// Split the secret on the first colon
    ///
    /// The password is empty when there is no colon.
    pub fn decode(&self) -> Credentials {
        let bytes = BASE64
            .decode(self.encoded.expose_secret().as_bytes())
            .unwrap_or_default();
        let raw = String::from_utf8_lossy(&bytes);

        let (user, password) = raw.split_once(':').unwrap_or((&*raw, ""));

        Credentials {
            user: user.to_string(),
            password: SecretString::from(password.to_string()),
        }
    }

    /// Mask every form of this secret that may appear in `text`
    ///
    /// Covers the encoded secret, the raw password and the re-encoded password.
    /// Forms shorter than a few characters are not masked.
    pub fn redact(&self, text: &str) -> String {
        let credentials = self.decode();
        let password = credentials.password.expose_secret();
        let encoded_password = credentials.encoded_password();

        let mut masked = text.to_string();
        for needle in [
            self.encoded.expose_secret(),
            encoded_password.expose_secret(),
            password,
        ] {
            if needle.chars().count() < MIN_REDACT_LEN {
                continue;
            }
            masked = masked.replace(needle, &mask_token(needle));
        }

        masked
    }
}

impl fmt::Debug for AuthSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthSecret(****)")
    }
}

impl Credentials {
    /// Raw password
    pub fn password(&self) -> &SecretString {
        &self.password
    }

    /// Password re-encoded for `_password`; empty when there is no password
    pub fn encoded_password(&self) -> SecretString {
        let password = self.password.expose_secret();
        if password.is_empty() {
            SecretString::from(String::new())
        } else {
            SecretString::from(BASE64.encode(password.as_bytes()))
        }
    }
}

/// Masks a token for safe logging
///
/// Shows only the first 3 and last 3 characters for identification purposes.
/// Tokens shorter than 10 characters are fully masked as "****".
///
/// ```
/// use registry_migrate::security::mask_token;
///
/// assert_eq!(mask_token("abcdef123456"), "abc...456");
/// assert_eq!(mask_token("short"), "****");
/// ```
pub fn mask_token(token: &str) -> String {
    if token.chars().count() < 10 {
        return "****".to_string();
    }

    let prefix: String = token.chars().take(3).collect();
    let suffix: String = token
        .chars()
        .rev()
        .take(3)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    format!("{}...{}", prefix, suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_splits_on_first_colon() {
        let secret = AuthSecret::from_user_pass("alice:pa:ss");
        let credentials = secret.decode();

        assert_eq!(credentials.user, "alice");
        assert_eq!(credentials.password().expose_secret(), "pa:ss");
    }

    #[test]
    fn test_decode_without_colon_has_empty_password() {
        let credentials = AuthSecret::from_user_pass("token-only").decode();

        assert_eq!(credentials.user, "token-only");
        assert_eq!(credentials.password().expose_secret(), "");
        assert_eq!(credentials.encoded_password().expose_secret(), "");
    }

    #[test]
    fn test_encoded_password() {
        let credentials = AuthSecret::from_user_pass("alice:s3cret").decode();
        assert_eq!(credentials.encoded_password().expose_secret(), "czNjcmV0");
    }

    #[test]
    fn test_debug_does_not_leak() {
        let secret = AuthSecret::from_user_pass("alice:s3cret");
        let debug = format!("{:?}", secret);

        assert_eq!(debug, "AuthSecret(****)");
        assert!(!debug.contains("YWxpY2U6czNjcmV0"));
    }

    #[test]
    fn test_redact_masks_every_form() {
        let secret = AuthSecret::from_user_pass("alice:correct-horse-battery");
        let encoded = secret.encoded().expose_secret().to_string();
        let encoded_password = secret.decode().encoded_password().expose_secret().to_string();

        let text = format!(
            "auth={} pass=correct-horse-battery _password={}",
            encoded, encoded_password
        );
        let redacted = secret.redact(&text);

        assert!(!redacted.contains(&encoded));
        assert!(!redacted.contains("correct-horse-battery"));
        assert!(!redacted.contains(&encoded_password));
        assert!(redacted.contains("cor...ery"));
    }

    #[test]
    fn test_redact_leaves_clean_text_alone() {
        let secret = AuthSecret::from_user_pass("alice:s3cret-value");
        let input = "npm ERR! 403 Forbidden";
        assert_eq!(secret.redact(input), input);
    }

    #[test]
    fn test_redact_skips_very_short_password() {
        let secret = AuthSecret::from_user_pass("alice:a");
        let input = "npm ERR! a package named abc already exists";

        let redacted = secret.redact(input);

        assert!(redacted.starts_with("npm ERR! a package named abc"));
        assert!(!redacted.contains("****"));
    }

    #[test]
    fn test_redact_is_literal() {
        let secret = AuthSecret::from_user_pass("alice:p.ss+words");
        let redacted = secret.redact("pass p.ss+words passXsswords");

        assert_eq!(redacted, "pass p.s...rds passXsswords");
    }

    #[test]
    fn test_mask_token() {
        assert_eq!(mask_token(""), "****");
        assert_eq!(mask_token("short"), "****");
        assert_eq!(mask_token("very-long-token-string"), "ver...ing");
    }
}
