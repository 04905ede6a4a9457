//! Local inspection of the stored access token.
//!
//! The backend issues JWT access tokens. Before making any call, the client
//! can decode the token's `exp` claim to tell whether the user still looks
//! logged in. The signature is **not** verified: this is only a hint used to
//! route the user to the login flow early. The server remains authoritative
//! and an expired token is still refreshed transparently by the gateway.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::Deserialize;
use time::OffsetDateTime;

/// What the stored access token says about the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// No access token is stored.
    Missing,
    /// A token is stored but its payload cannot be decoded.
    Undecodable,
    /// The token's `exp` claim lies in the past.
    Expired { expired_at: OffsetDateTime },
    /// The token is usable; `expires_at` is `None` when it has no `exp` claim.
    Active { expires_at: Option<OffsetDateTime> },
}

#[derive(Deserialize)]
struct Claims {
    exp: Option<i64>,
}

/// Classifies an access token against the given instant.
pub fn inspect(access_token: Option<&str>, now: OffsetDateTime) -> SessionStatus {
    let Some(token) = access_token else {
        return SessionStatus::Missing;
    };
    let Some(claims) = decode_claims(token) else {
        return SessionStatus::Undecodable;
    };
    let expires_at = match claims.exp {
        Some(exp) => match OffsetDateTime::from_unix_timestamp(exp) {
            Ok(at) => Some(at),
            Err(_) => return SessionStatus::Undecodable,
        },
        None => None,
    };

    match expires_at {
        Some(at) if at < now => SessionStatus::Expired { expired_at: at },
        _ => SessionStatus::Active { expires_at },
    }
}

fn decode_claims(token: &str) -> Option<Claims> {
    let mut segments = token.split('.');
    let (_header, payload) = (segments.next()?, segments.next()?);
    segments.next()?;
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    serde_json::from_slice(&bytes).ok()
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    fn token(payload: &str) -> String {
        format!(
            "{}.{}.signature",
            URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#),
            URL_SAFE_NO_PAD.encode(payload)
        )
    }

    const NOW: OffsetDateTime = datetime!(2024-05-01 12:00 UTC);

    #[test]
    fn test_missing() {
        assert_eq!(inspect(None, NOW), SessionStatus::Missing);
    }

    #[test]
    fn test_undecodable() {
        assert_eq!(inspect(Some("not-a-jwt"), NOW), SessionStatus::Undecodable);
        assert_eq!(inspect(Some("a.%%%.c"), NOW), SessionStatus::Undecodable);
        assert_eq!(
            inspect(Some(&token("not json")), NOW),
            SessionStatus::Undecodable
        );
    }

    #[test]
    fn test_expired() {
        let exp = NOW.unix_timestamp() - 60;
        let status = inspect(Some(&token(&format!(r#"{{"exp":{exp}}}"#))), NOW);
        assert_eq!(
            status,
            SessionStatus::Expired {
                expired_at: NOW - time::Duration::seconds(60)
            }
        );
    }

    #[test]
    fn test_active() {
        let exp = NOW.unix_timestamp() + 300;
        let status = inspect(Some(&token(&format!(r#"{{"exp":{exp},"user_id":7}}"#))), NOW);
        assert_eq!(
            status,
            SessionStatus::Active {
                expires_at: Some(NOW + time::Duration::seconds(300))
            }
        );
    }

    #[test]
    fn test_without_exp_is_active() {
        let status = inspect(Some(&token(r#"{"user_id":7}"#)), NOW);
        assert_eq!(status, SessionStatus::Active { expires_at: None });
    }
}
