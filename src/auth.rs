use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::error::{ConsoleError, ConsoleResult};

pub const PBKDF2_ROUNDS: u32 = 390_000;
const SALT_LEN: usize = 16;
const KEY_LEN: usize = 32;
const HASH_PREFIX: &str = "pbkdf2$";
const CSRF_TOKEN_BYTES: usize = 32;

// ──────────────────────────── Passwords ────────────────────────────

fn derive_key(password: &str, salt: &[u8]) -> [u8; KEY_LEN] {
    let mut out = [0u8; KEY_LEN];
    pbkdf2::pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, PBKDF2_ROUNDS, &mut out);
    out
}

/// Hash a password as `pbkdf2$` + base64(salt || derived key).
pub fn hash_password(password: &str) -> String {
    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);
    let key = derive_key(password, &salt);

    let mut raw = Vec::with_capacity(SALT_LEN + KEY_LEN);
    raw.extend_from_slice(&salt);
    raw.extend_from_slice(&key);
    format!("{HASH_PREFIX}{}", STANDARD.encode(raw))
}

fn split_hash(hashed: &str) -> Option<(Vec<u8>, Vec<u8>)> {
    let encoded = hashed.strip_prefix(HASH_PREFIX)?;
    let raw = STANDARD.decode(encoded).ok()?;
    if raw.len() != SALT_LEN + KEY_LEN {
        return None;
    }
    let (salt, digest) = raw.split_at(SALT_LEN);
    Some((salt.to_vec(), digest.to_vec()))
}

/// Check `password` against a stored hash. Missing or malformed hashes never match.
pub fn verify_password(password: &str, hashed: Option<&str>) -> bool {
    let Some((salt, digest)) = hashed.and_then(split_hash) else {
        return false;
    };
    let candidate = derive_key(password, &salt);
    candidate.as_slice().ct_eq(digest.as_slice()).into()
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// Admin credentials held in settings.
#[derive(Debug, Clone)]
pub struct AdminCredentials {
    pub username: String,
    pub password_hash: Option<String>,
}

impl AdminCredentials {
    /// Verify a login attempt. Both checks always run and fail identically.
    pub fn check(&self, username: &str, password: &str) -> ConsoleResult<()> {
        let user_ok = constant_time_eq(username, &self.username);
        let password_ok = verify_password(password, self.password_hash.as_deref());
        if user_ok && password_ok {
            Ok(())
        } else {
            Err(ConsoleError::AuthenticationFailure)
        }
    }
}

// ──────────────────────────── CSRF ────────────────────────────

/// Return a random URL-safe CSRF token.
pub fn generate_csrf_token() -> String {
    let mut bytes = [0u8; CSRF_TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Ensure the session token and the submitted token are present and equal.
pub fn validate_csrf_token(session_token: Option<&str>, form_token: Option<&str>) -> ConsoleResult<()> {
    let (Some(expected), Some(given)) = (
        session_token.filter(|t| !t.is_empty()),
        form_token.filter(|t| !t.is_empty()),
    ) else {
        return Err(ConsoleError::CsrfFailure("Missing CSRF token".to_string()));
    };
    if !constant_time_eq(expected, given) {
        return Err(ConsoleError::CsrfFailure("Invalid CSRF token".to_string()));
    }
    Ok(())
}

// ──────────────────────────── Session tokens ────────────────────────────

/// One-shot status message shown on the next page render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub message: String,
    pub category: String,
}

/// Claims carried by the signed session cookie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Set once the admin has logged in.
    #[serde(default)]
    pub auth: bool,
    /// Issue time (Unix timestamp).
    pub iat: i64,
    /// Expiration time (Unix timestamp).
    pub exp: i64,
    pub csrf: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flash: Option<Flash>,
}

/// Sign session claims with the session secret (HS256).
pub fn encode_session(claims: &SessionClaims, secret: &str) -> anyhow::Result<String> {
    let token = encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;
    Ok(token)
}

/// Verify a session token. Tampered, foreign or expired tokens yield `None`.
pub fn decode_session(token: &str, secret: &str) -> Option<SessionClaims> {
    let mut validation = Validation::new(Algorithm::HS256);
    // Session expiry is exact.
    validation.leeway = 0;
    validation.set_required_spec_claims(&["exp"]);

    let key = DecodingKey::from_secret(secret.as_bytes());
    decode::<SessionClaims>(token, &key, &validation)
        .map(|data| data.claims)
        .ok()
}
