use warp::{reject::Rejection, Filter};

use crate::error::{Error, ErrorKind};

use super::jwt::{verify_jwt_session, SessionData, SessionKey};

const SCHEMES: &[&str] = &["Token ", "Bearer "];

fn parse_authorization(header: &str) -> Option<&str> {
    SCHEMES
        .iter()
        .find_map(|scheme| header.strip_prefix(scheme))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

fn session_from_header(header: Option<String>, key: &SessionKey) -> Result<SessionData, Error> {
    let header = header.ok_or_else(|| ErrorKind::Unauthorized.default())?;
    let token = parse_authorization(&header)
        .ok_or_else(|| ErrorKind::InvalidSession.new("Invalid session; Malformed header"))?;

    verify_jwt_session(token, key).map(SessionData::from)
}

/// Requires a valid session token.
pub fn with_session(
    key: SessionKey,
) -> impl Filter<Extract = (SessionData,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization").and_then(move |header: Option<String>| {
        let key = key.clone();
        async move { session_from_header(header, &key).map_err(Rejection::from) }
    })
}

/// Resolves the session when one is present; anonymous or invalid tokens yield `None`.
pub fn with_possible_session(
    key: SessionKey,
) -> impl Filter<Extract = (Option<SessionData>,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization").map(move |header: Option<String>| {
        header.and_then(|header| session_from_header(Some(header), &key).ok())
    })
}
