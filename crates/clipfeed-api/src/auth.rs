//! Minimal in-repo authentication. Spec §1 places "Auth: password hashing,
//! JWT issuance and validation" out of core scope — the core only consumes
//! a `user_id` from request context. This is the one in-repo
//! implementation of that external seam: salted iterated-hash password
//! storage and opaque signed bearer tokens, good enough for the server to
//! run standalone, not a hardened auth system (no `argon2`/`bcrypt`, no
//! `jsonwebtoken` — see `DESIGN.md`'s dependency deltas).
//!
//! The signing scheme follows the base64-`Engine` decode style already
//! used for bearer tokens in the teacher's `control-plane-api` server
//! handlers, and the salted-hash idiom mirrors `clipfeed_security::
//! cookie_vault`'s direct use of `sha2`.

use base64::Engine;
use chrono::Utc;
use clipfeed_models::Id;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

const PASSWORD_HASH_ROUNDS: u32 = 100_000;
const TOKEN_TTL_HOURS: i64 = 24 * 7;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("malformed bearer token")]
    Malformed,
    #[error("token signature is invalid")]
    BadSignature,
    #[error("token has expired")]
    Expired,
}

/// Claims carried by a signed bearer token. `admin` is the `admin:true`
/// claim §6 names for the separate admin-login flow.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: Id,
    #[serde(default)]
    pub admin: bool,
    pub exp: i64,
}

/// Hashes a password behind a random 16-byte salt with `PASSWORD_HASH_ROUNDS`
/// of iterated SHA-256, storing `"<salt-hex>:<hash-hex>"` as a single
/// column value (`users.password_hash`).
pub fn hash_password(password: &str) -> String {
    let mut salt = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut salt);
    let hash = iterate(password.as_bytes(), &salt);
    format!("{}:{}", hex::encode(salt), hex::encode(hash))
}

pub fn verify_password(password: &str, stored: &str) -> bool {
    let Some((salt_hex, hash_hex)) = stored.split_once(':') else {
        return false;
    };
    let Ok(salt) = hex::decode(salt_hex) else {
        return false;
    };
    let expected = iterate(password.as_bytes(), &salt);
    constant_time_eq(hex::encode(expected).as_bytes(), hash_hex.as_bytes())
}

fn iterate(password: &[u8], salt: &[u8]) -> Vec<u8> {
    let mut state = Sha256::digest([salt, password].concat()).to_vec();
    for _ in 1..PASSWORD_HASH_ROUNDS {
        state = Sha256::digest(&state).to_vec();
    }
    state
}

/// Issues a bearer token good for `TOKEN_TTL_HOURS`, signed with `secret`.
pub fn issue_token(secret: &str, user_id: Id, admin: bool) -> String {
    let claims = Claims {
        user_id,
        admin,
        exp: (Utc::now() + chrono::Duration::hours(TOKEN_TTL_HOURS)).timestamp(),
    };
    sign(secret, &claims)
}

fn sign(secret: &str, claims: &Claims) -> String {
    let payload = serde_json::to_vec(claims).expect("Claims always serializes");
    let payload_b64 = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(&payload);
    let signature = hex::encode(Sha256::digest([payload.as_slice(), secret.as_bytes()].concat()));
    format!("{payload_b64}.{signature}")
}

/// Verifies a bearer token's signature and expiry, returning its claims.
pub fn verify_token(secret: &str, token: &str) -> Result<Claims, Error> {
    let (payload_b64, signature) = token.split_once('.').ok_or(Error::Malformed)?;
    let payload = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(payload_b64)
        .map_err(|_| Error::Malformed)?;

    let expected = hex::encode(Sha256::digest([payload.as_slice(), secret.as_bytes()].concat()));
    if !constant_time_eq(expected.as_bytes(), signature.as_bytes()) {
        return Err(Error::BadSignature);
    }

    let claims: Claims = serde_json::from_slice(&payload).map_err(|_| Error::Malformed)?;
    if claims.exp < Utc::now().timestamp() {
        return Err(Error::Expired);
    }
    Ok(claims)
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Compares a worker-presented bearer token against the configured shared
/// secret in constant time, for the `/api/internal/*` routes (§6).
pub fn verify_worker_secret(secret: &str, provided: &str) -> bool {
    constant_time_eq(secret.as_bytes(), provided.as_bytes())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn password_round_trips() {
        let stored = hash_password("correct horse battery staple");
        assert!(verify_password("correct horse battery staple", &stored));
        assert!(!verify_password("wrong password", &stored));
    }

    #[test]
    fn token_round_trips_and_carries_claims() {
        let user_id = Id::new();
        let token = issue_token("secret", user_id, false);
        let claims = verify_token("secret", &token).unwrap();
        assert_eq!(claims.user_id, user_id);
        assert!(!claims.admin);
    }

    #[test]
    fn token_rejects_tampered_signature() {
        let token = issue_token("secret", Id::new(), false);
        let mut tampered = token.clone();
        tampered.push('0');
        assert!(matches!(verify_token("secret", &tampered), Err(Error::BadSignature)));
    }

    #[test]
    fn token_rejects_wrong_secret() {
        let token = issue_token("secret", Id::new(), true);
        assert!(matches!(verify_token("other", &token), Err(Error::BadSignature)));
    }

    #[test]
    fn admin_claim_round_trips() {
        let token = issue_token("secret", Id::new(), true);
        let claims = verify_token("secret", &token).unwrap();
        assert!(claims.admin);
    }
}
