use chrono::Utc;
use sqlx::{Pool, Sqlite};

use crate::{
    error::{Error, ErrorKind, QueryError},
    jwt::SessionData,
    permissions::ActionType,
    schema::{Id, Subscription, User},
};

use super::users::get_user;

pub async fn subscribe(
    session: &SessionData,
    user_id: Id,
    pool: &Pool<Sqlite>,
) -> Result<Subscription, Error> {
    session.authenticate(ActionType::ManageOwnSubscriptions)?;

    if user_id == session.user_id {
        return Err(ErrorKind::SelfReference.new("You cannot subscribe to yourself."));
    }
    get_user(user_id, pool).await?;

    let row: Subscription = sqlx::query_as(
        "INSERT INTO subscriptions (subscriber_id, user_id, created_at) VALUES ($1, $2, $3) RETURNING subscriber_id, user_id, created_at",
    )
    .bind(session.user_id)
    .bind(user_id)
    .bind(Utc::now())
    .fetch_one(pool)
    .await
    .map_err(|e| QueryError::from(e).on_conflict("You are already subscribed to this user."))?;

    Ok(row)
}

pub async fn unsubscribe(
    session: &SessionData,
    user_id: Id,
    pool: &Pool<Sqlite>,
) -> Result<(), Error> {
    session.authenticate(ActionType::ManageOwnSubscriptions)?;
    get_user(user_id, pool).await?;

    let result = sqlx::query("DELETE FROM subscriptions WHERE subscriber_id = $1 AND user_id = $2")
        .bind(session.user_id)
        .bind(user_id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(ErrorKind::InvalidRequest.new("You are not subscribed to this user."));
    }
    Ok(())
}

pub async fn is_subscribed(
    session: Option<&SessionData>,
    user_id: Id,
    pool: &Pool<Sqlite>,
) -> Result<bool, Error> {
    let session = match session {
        Some(session) => session,
        None => return Ok(false),
    };

    let count: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM subscriptions WHERE subscriber_id = $1 AND user_id = $2",
    )
    .bind(session.user_id)
    .bind(user_id)
    .fetch_one(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(count.0 > 0)
}

/// Users the requester follows, by username.
pub async fn list_subscriptions(
    session: &SessionData,
    pool: &Pool<Sqlite>,
) -> Result<Vec<User>, Error> {
    session.authenticate(ActionType::ManageOwnSubscriptions)?;

    let rows: Vec<User> = sqlx::query_as(
        "SELECT u.* FROM subscriptions s JOIN users u ON u.id = s.user_id WHERE s.subscriber_id = $1 ORDER BY u.username",
    )
    .bind(session.user_id)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows)
}
