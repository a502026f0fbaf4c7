//! Password login and signed session cookies.
//!
//! The configured password hash is `salt:hex`, where `hex` is the 32-byte
//! scrypt (N = 2^14, r = 8, p = 1) of the password keyed with the salt
//! string. A session cookie holds `<issued millis>.<hex HMAC-SHA256 of the
//! millis>`; nothing is stored server side.

use crate::config::AuthConfig;
use crate::error::{Error, Result};
use crate::gantt::payload::{self, LoginRequest};
use crate::server::AppState;
use axum::body::Bytes;
use axum::extract::{Request, State};
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use getrandom::getrandom;
use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

const SCRYPT_LOG_N: u8 = 14;
const SCRYPT_R: u32 = 8;
const SCRYPT_P: u32 = 1;
const SCRYPT_KEY_LEN: usize = 32;

const MILLIS_PER_DAY: i64 = 86_400_000;

/// Derive the hex scrypt key for `password` with `salt`.
///
/// # Errors
///
/// Returns [`Error::Config`] if the scrypt parameters are rejected.
pub fn derive_key(password: &str, salt: &str) -> Result<String> {
    let params = scrypt::Params::new(SCRYPT_LOG_N, SCRYPT_R, SCRYPT_P, SCRYPT_KEY_LEN)
        .map_err(|e| Error::Config(format!("invalid scrypt parameters: {e}")))?;
    let mut key = [0_u8; SCRYPT_KEY_LEN];
    scrypt::scrypt(password.as_bytes(), salt.as_bytes(), &params, &mut key)
        .map_err(|e| Error::Config(format!("scrypt failed: {e}")))?;
    Ok(hex::encode(key))
}

/// Produce a `salt:hex` hash for `password` with a fresh random salt.
///
/// # Errors
///
/// Returns an error if key derivation fails.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = generate_salt()?;
    let key = derive_key(password, &salt)?;
    Ok(format!("{salt}:{key}"))
}

/// Generate a 32-character hex salt from 16 bytes of OS randomness.
///
/// # Errors
///
/// Returns an error if the OS random source is unavailable.
pub fn generate_salt() -> Result<String> {
    let mut bytes = [0u8; 16];
    getrandom(&mut bytes).map_err(|e| Error::Io(std::io::Error::other(e.to_string())))?;
    Ok(hex::encode(bytes))
}

/// Check `password` against a stored `salt:hex` hash.
///
/// A malformed stored hash never verifies.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let Some((salt, expected)) = stored.split_once(':') else {
        return false;
    };
    if salt.is_empty() || expected.is_empty() {
        return false;
    }
    derive_key(password, salt).is_ok_and(|actual| constant_time_eq(&actual, expected))
}

/// Hex HMAC-SHA256 of `payload` under `secret`.
fn sign(secret: &str, payload: &str) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(payload.as_bytes());
    Some(hex::encode(mac.finalize().into_bytes()))
}

/// Mint a session token issued at `issued_millis`.
pub fn issue_token(secret: &str, issued_millis: i64) -> Option<String> {
    let payload = issued_millis.to_string();
    let mac = sign(secret, &payload)?;
    Some(format!("{payload}.{mac}"))
}

/// Check a session token's signature and age.
///
/// Tokens older than `max_age_days` (or issued in the future) are rejected.
pub fn verify_token(secret: &str, token: &str, max_age_days: u64, now_millis: i64) -> bool {
    let Some((payload, mac)) = token.split_once('.') else {
        return false;
    };
    let Ok(issued) = payload.parse::<i64>() else {
        return false;
    };
    let signed = sign(secret, payload).is_some_and(|expected| constant_time_eq(&expected, mac));
    if !signed {
        return false;
    }

    let max_age = i64::try_from(max_age_days).unwrap_or(i64::MAX).saturating_mul(MILLIS_PER_DAY);
    let age = now_millis.saturating_sub(issued);
    (0..=max_age).contains(&age)
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut diff: u8 = 0;
    for (x, y) in a.as_bytes().iter().zip(b.as_bytes()) {
        diff |= x ^ y;
    }
    diff == 0
}

/// Find cookie `name` among the request's `Cookie` headers.
pub fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
}

/// Whether the request carries a valid session cookie.
pub fn has_valid_session(auth: &AuthConfig, headers: &HeaderMap) -> bool {
    let Some(secret) = auth.cookie_secret.as_deref() else {
        return false;
    };
    cookie_value(headers, &auth.cookie_name).is_some_and(|token| {
        verify_token(secret, token, auth.cookie_max_age_days, chrono::Utc::now().timestamp_millis())
    })
}

fn session_cookie(auth: &AuthConfig, token: &str) -> String {
    let max_age = auth.cookie_max_age_days.saturating_mul(86_400);
    let mut cookie =
        format!("{}={token}; Path=/; Max-Age={max_age}; HttpOnly; SameSite=Lax", auth.cookie_name);
    if auth.secure_cookies {
        cookie.push_str("; Secure");
    }
    cookie
}

fn cleared_cookie(auth: &AuthConfig) -> String {
    let mut cookie = format!("{}=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax", auth.cookie_name);
    if auth.secure_cookies {
        cookie.push_str("; Secure");
    }
    cookie
}

fn with_cookie(mut response: Response, cookie: &str) -> Result<Response> {
    let value =
        HeaderValue::from_str(cookie).map_err(|e| Error::Config(format!("invalid cookie: {e}")))?;
    response.headers_mut().append(SET_COOKIE, value);
    Ok(response)
}

/// `POST /auth/login`
///
/// # Errors
///
/// Returns [`Error::InvalidPayload`] for a malformed body and
/// [`Error::AuthNotConfigured`] when no password hash or cookie secret is set.
pub async fn login(State(state): State<AppState>, body: Bytes) -> Result<Response> {
    let request: LoginRequest =
        if body.is_empty() { LoginRequest::default() } else { payload::parse(&body)? };

    let auth = &state.auth;
    let (Some(hash), Some(secret)) = (auth.password_hash.as_deref(), auth.cookie_secret.as_deref())
    else {
        return Err(Error::AuthNotConfigured);
    };

    if !verify_password(&request.password, hash) {
        tracing::warn!("rejected login attempt");
        return Ok((StatusCode::UNAUTHORIZED, Json(json!({"error": "Unauthorized"}))).into_response());
    }

    let token = issue_token(secret, chrono::Utc::now().timestamp_millis())
        .ok_or_else(|| Error::Config("cannot sign session".to_string()))?;
    tracing::info!("session issued");
    with_cookie(Json(json!({"ok": true})).into_response(), &session_cookie(auth, &token))
}

/// `POST /auth/logout`
///
/// # Errors
///
/// Returns an error only if the cookie name cannot form a header.
pub async fn logout(State(state): State<AppState>) -> Result<Response> {
    with_cookie(Json(json!({"ok": true})).into_response(), &cleared_cookie(&state.auth))
}

/// `GET /auth/me`
pub async fn me(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if has_valid_session(&state.auth, &headers) {
        Json(json!({"ok": true})).into_response()
    } else {
        (StatusCode::UNAUTHORIZED, Json(json!({"ok": false}))).into_response()
    }
}

/// Middleware rejecting requests without a valid session.
pub async fn require_session(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if has_valid_session(&state.auth, request.headers()) {
        next.run(request).await
    } else {
        Error::Unauthorized.into_response()
    }
}
