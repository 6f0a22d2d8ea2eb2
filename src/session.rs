//! Signed session tokens.
//!
//! A token proves an earlier sign-in without any server-side storage:
//!
//! ```text
//! <user id>-<expiry epoch seconds>-<sha256 hex of "id-password hash-expiry-secret">
//! ```
//!
//! Because the digest covers the stored password hash, changing a password
//! invalidates every outstanding token for that user.

use std::future::Future;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::error::Result;
use crate::response::ResponseBuilder;

/// What a scrubbed password reads as.
pub const SCRUBBED_PASSWORD: &str = "******";

/// Value a cleared session cookie carries.
pub const DELETED_COOKIE: &str = "-deleted-";

/// An identity a session token can be minted for.
pub trait Credentials {
    fn user_id(&self) -> &str;
    fn password_hash(&self) -> &str;
    /// Replaces the password hash before the identity leaves the codec.
    fn scrub_password(&mut self);
}

/// Cookie settings for the session.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SessionConfig {
    #[serde(default = "default_secret")]
    pub secret: String,

    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,

    /// Token and cookie lifetime in seconds.
    #[serde(default = "default_max_age")]
    pub max_age: u64,
}

fn default_secret() -> String {
    "Awesome".to_string()
}

fn default_cookie_name() -> String {
    "awesession".to_string()
}

fn default_max_age() -> u64 {
    86400
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            secret: default_secret(),
            cookie_name: default_cookie_name(),
            max_age: default_max_age(),
        }
    }
}

impl SessionConfig {
    /// Sets a fresh session cookie for `user` on the response being built.
    pub fn sign_in(&self, response: ResponseBuilder, user: &impl Credentials) -> ResponseBuilder {
        let token = encode(user.user_id(), user.password_hash(), self.max_age, &self.secret);
        response.cookie(&self.cookie_name, &token, self.max_age)
    }

    /// Overwrites the session cookie with [`DELETED_COOKIE`].
    pub fn sign_out(&self, response: ResponseBuilder) -> ResponseBuilder {
        response.cookie(&self.cookie_name, DELETED_COOKIE, self.max_age)
    }
}

/// Seconds since the Unix epoch.
pub fn now_secs() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map_or(0, |d| d.as_secs())
}

/// Mints a token for `user_id` valid for `max_age` seconds from now.
pub fn encode(user_id: &str, password_hash: &str, max_age: u64, secret: &str) -> String {
    encode_until(user_id, password_hash, now_secs().saturating_add(max_age), secret)
}

/// Mints a token that expires at `expires` (epoch seconds).
pub fn encode_until(user_id: &str, password_hash: &str, expires: u64, secret: &str) -> String {
    format!("{user_id}-{expires}-{}", digest(user_id, password_hash, expires, secret))
}

/// Resolves a token back to its user.
///
/// `lookup` loads a user by id. Returns `Ok(None)` when the token is
/// malformed, expired, names an unknown user or carries a wrong digest; only
/// a failing `lookup` is an error. The returned user has its password
/// scrubbed.
pub async fn decode<U, F, Fut>(token: &str, secret: &str, lookup: F) -> Result<Option<U>>
where
    U: Credentials,
    F: FnOnce(String) -> Fut,
    Fut: Future<Output = Result<Option<U>>>,
{
    let parts: Vec<&str> = token.split('-').collect();
    let [uid, expires, signature] = parts.as_slice() else {
        debug!("malformed session token");
        return Ok(None);
    };
    let Ok(expires) = expires.parse::<u64>() else {
        debug!("malformed session expiry");
        return Ok(None);
    };
    if expires < now_secs() {
        return Ok(None);
    }
    let Some(mut user) = lookup((*uid).to_owned()).await? else {
        return Ok(None);
    };
    let expected = digest(uid, user.password_hash(), expires, secret);
    if !constant_time_eq(expected.as_bytes(), signature.as_bytes()) {
        info!("invalid session digest");
        return Ok(None);
    }
    user.scrub_password();
    Ok(Some(user))
}

fn digest(user_id: &str, password_hash: &str, expires: u64, secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("{user_id}-{password_hash}-{expires}-{secret}").as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Compares without short-circuiting on the first differing byte.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// SHA-256 hex digest of `input`.
pub fn sha256_hex(input: &str) -> String {
    format!("{:x}", Sha256::digest(input.as_bytes()))
}
