use anyhow::Result;
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

/// JWT Claims structure.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // Username
    pub uid: i32,    // User ID
    /// Permission strings granted to the user at sign time.
    #[serde(default)]
    pub permissions: Vec<String>,
    pub exp: usize, // Expiration timestamp
}

/// Sign a new JWT token for a user.
pub fn sign(secret: &str, user_id: i32, username: &str, permissions: Vec<String>) -> Result<String> {
    let expiration = Utc::now()
        .checked_add_signed(Duration::days(7))
        .expect("valid timestamp")
        .timestamp();

    let claims = Claims {
        sub: username.to_owned(),
        uid: user_id,
        permissions,
        exp: expiration as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

/// Verify and decode a JWT token.
pub fn verify(secret: &str, token: &str) -> Result<Claims> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_and_verify_round_trip() {
        let token = sign("secret", 3, "alice", vec!["problem:judge".into()]).unwrap();
        let claims = verify("secret", &token).unwrap();
        assert_eq!(claims.uid, 3);
        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.permissions, vec!["problem:judge".to_string()]);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = sign("secret", 3, "alice", vec![]).unwrap();
        assert!(verify("other-secret", &token).is_err());
    }
}
