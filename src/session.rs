use super::{config, crypto, models::User};
use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};

/// HMAC-secured session string, signed by $SESSION_SECRET
///
/// Note: since this guy is stored in a browser cookie, it's important to
/// esure it does not get too large.
#[derive(Debug, Serialize, Deserialize)]
pub struct Session {
    pub user: User,
    pub created_at: i64,
}

pub fn serialize_session(secret: &[u8], session: &Session) -> String {
    let json_bytes = serde_json::to_string(&session)
        .expect("session can be JSON serialized");
    let b64 = general_purpose::STANDARD_NO_PAD.encode(json_bytes);
    let raw_digest = crypto::get_digest(secret, b64.as_bytes());
    let digest = general_purpose::STANDARD_NO_PAD.encode(raw_digest);

    format!("{}:{}", b64, digest)
}

pub fn deserialize_session(
    secret: &[u8],
    cookie: &str,
) -> Result<Session, &'static str> {
    let parts: Vec<&str> = cookie.split(':').collect();
    if parts.len() != 2 {
        return Err("Invalid session");
    }
    let b64_json: Vec<u8> = parts[0].into();
    let digest: Vec<u8> =
        match general_purpose::STANDARD_NO_PAD.decode(parts[1]) {
            Ok(v) => v,
            Err(_) => {
                return Err("Cannot base64 decode the digest");
            }
        };

    if !crypto::is_valid(secret, &b64_json, &digest) {
        return Err("Failed to validate session signature");
    }
    let json_string = match general_purpose::STANDARD_NO_PAD.decode(b64_json) {
        Ok(v) => v,
        Err(_) => {
            return Err("Cannot base64 decode sesion string");
        }
    };

    match serde_json::from_slice(&json_string) {
        Ok(v) => Ok(v),
        Err(_) => Err("Cannot deserialize session JSON"),
    }
}

/// `Set-Cookie` value that stores the session.
pub fn session_cookie(secret: &[u8], session: &Session) -> String {
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age=2592000",
        config::SESSION_COOKIE,
        serialize_session(secret, session)
    )
}

/// `Set-Cookie` value that signs the user out.
pub fn clear_cookie() -> String {
    format!(
        "{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0",
        config::SESSION_COOKIE
    )
}
