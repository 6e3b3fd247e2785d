use chrono::Duration;
use chrono::Utc;
use hmac::{Hmac, Mac};
use jwt::SignWithKey;
use jwt::VerifyWithKey;
use serde::Deserialize;
use serde::Serialize;
use sha2::Sha256;

use crate::database::schema::User;
use crate::error::{Error, ErrorKind};
use crate::schema::{Id, UserRole};

use super::permissions::ActionType;

/// HMAC key shared with the service that issues session tokens.
#[derive(Clone)]
pub struct SessionKey(Hmac<Sha256>);

impl SessionKey {
    pub fn new(secret: &[u8]) -> Result<Self, Error> {
        Hmac::new_from_slice(secret).map(Self).map_err(|e| {
            log::error!("Invalid session key: {e}");
            ErrorKind::InternalServerError.default()
        })
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JwtSessionData {
    pub user_id: Id,
    pub username: String,
    pub role: UserRole,
    iat: i64,
    exp: i64,
}

impl JwtSessionData {
    pub fn new(id: Id, username: String, role: UserRole, lifetime_hours: i64) -> Self {
        let now = Utc::now();
        let iat = now.timestamp();
        let exp = (now + Duration::hours(lifetime_hours)).timestamp();

        Self {
            user_id: id,
            username,
            role,
            iat,
            exp,
        }
    }
}

/// Identity of the requester, passed explicitly into every action that needs it.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct SessionData {
    pub user_id: Id,
    pub username: String,
    pub role: UserRole,
}

impl SessionData {
    pub fn authenticate(&self, action: ActionType) -> Result<(), Error> {
        if !action.authenticate(self) {
            return Err(ErrorKind::Forbidden
                .new("You don't have permission to perform this action"));
        }
        Ok(())
    }
}

impl From<JwtSessionData> for SessionData {
    fn from(value: JwtSessionData) -> Self {
        SessionData {
            user_id: value.user_id,
            username: value.username,
            role: value.role,
        }
    }
}

pub fn generate_jwt_session(
    user: &User,
    key: &SessionKey,
    lifetime_hours: i64,
) -> Result<String, Error> {
    let claims = JwtSessionData::new(
        user.id,
        user.username.to_owned(),
        user.role,
        lifetime_hours,
    );

    claims.sign_with_key(&key.0).map_err(|e| {
        log::error!("Failed to sign session: {e}");
        ErrorKind::InternalServerError.default()
    })
}

pub fn verify_jwt_session(token: &str, key: &SessionKey) -> Result<JwtSessionData, Error> {
    let session: JwtSessionData = token
        .verify_with_key(&key.0)
        .map_err(|_| ErrorKind::InvalidSession.new("Invalid session; Invalid token"))?;

    let now = Utc::now().timestamp();
    if (session.exp - now).is_negative() {
        return Err(ErrorKind::InvalidSession.new("Invalid session; Token expired"));
    }

    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            id: 7,
            email: String::from("cook@example.com"),
            username: String::from("cook"),
            first_name: String::from("Ada"),
            last_name: String::from("Cook"),
            password: String::new(),
            role: UserRole::User,
            avatar: None,
        }
    }

    #[test]
    fn session_round_trip() {
        let key = SessionKey::new(b"test-secret").unwrap();
        let token = generate_jwt_session(&user(), &key, 1).unwrap();

        let session: SessionData = verify_jwt_session(&token, &key).unwrap().into();
        assert_eq!(session.user_id, 7);
        assert_eq!(session.username, "cook");
        assert_eq!(session.role, UserRole::User);
    }

    #[test]
    fn expired_sessions_are_rejected() {
        let key = SessionKey::new(b"test-secret").unwrap();
        let token = generate_jwt_session(&user(), &key, -1).unwrap();

        let error = verify_jwt_session(&token, &key).unwrap_err();
        assert_eq!(error.kind, ErrorKind::InvalidSession);
    }

    #[test]
    fn foreign_signatures_are_rejected() {
        let key = SessionKey::new(b"test-secret").unwrap();
        let other = SessionKey::new(b"other-secret").unwrap();
        let token = generate_jwt_session(&user(), &other, 1).unwrap();

        assert!(verify_jwt_session(&token, &key).is_err());
    }
}
