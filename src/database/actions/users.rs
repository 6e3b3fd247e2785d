use sqlx::{Pool, Sqlite};

use crate::{
    cryptography::{hash_password, verify_password},
    error::{Error, ErrorKind, QueryError},
    form::NewUser,
    jwt::SessionData,
    permissions::ActionType,
    schema::{Id, User, UserRole},
};

pub async fn get_user_by_id(id: Id, pool: &Pool<Sqlite>) -> Result<Option<User>, Error> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn get_user(id: Id, pool: &Pool<Sqlite>) -> Result<User, Error> {
    get_user_by_id(id, pool)
        .await?
        .ok_or_else(|| ErrorKind::NotFound.new("User not found."))
}

async fn field_taken(
    column: &str,
    value: &str,
    pool: &Pool<Sqlite>,
) -> Result<bool, Error> {
    let query = format!("SELECT COUNT(*) FROM users WHERE {column} = $1");
    let count: (i64,) = sqlx::query_as(&query)
        .bind(value)
        .fetch_one(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(count.0 > 0)
}

/// Creates a user with the hashed version of their password.
pub async fn register_user(user: NewUser, pool: &Pool<Sqlite>) -> Result<User, Error> {
    if field_taken("email", &user.email, pool).await? {
        return Err(Error::field("email", "A user with that email already exists."));
    }
    if field_taken("username", &user.username, pool).await? {
        return Err(Error::field(
            "username",
            "A user with that username already exists.",
        ));
    }

    let password_hash = hash_password(&user.password)?;

    let row: User = sqlx::query_as(
        "INSERT INTO users (email, username, first_name, last_name, password, role) VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
    )
    .bind(&user.email)
    .bind(&user.username)
    .bind(&user.first_name)
    .bind(&user.last_name)
    .bind(password_hash)
    .bind(UserRole::User)
    .fetch_one(pool)
    .await
    .map_err(|e| QueryError::from(e).on_conflict("A user with that email or username already exists."))?;

    log::info!("Registered user {} ({})", row.username, row.id);
    Ok(row)
}

pub async fn list_users(pool: &Pool<Sqlite>) -> Result<Vec<User>, Error> {
    let rows: Vec<User> = sqlx::query_as("SELECT * FROM users ORDER BY id")
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(rows)
}

pub async fn set_password(
    session: &SessionData,
    current_password: &str,
    new_password: &str,
    pool: &Pool<Sqlite>,
) -> Result<(), Error> {
    session.authenticate(ActionType::ManageOwnProfile)?;

    let user = get_user_by_id(session.user_id, pool)
        .await?
        .ok_or_else(|| ErrorKind::InvalidSession.new("Invalid session; User no longer exists"))?;

    if !verify_password(current_password, &user.password)? {
        return Err(Error::field("current_password", "Wrong password."));
    }

    let password_hash = hash_password(new_password)?;
    sqlx::query("UPDATE users SET password = $1 WHERE id = $2")
        .bind(password_hash)
        .bind(user.id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(())
}

/// Stores a new avatar reference, returning the one it replaced.
pub async fn set_avatar(
    session: &SessionData,
    reference: &str,
    pool: &Pool<Sqlite>,
) -> Result<Option<String>, Error> {
    session.authenticate(ActionType::ManageOwnProfile)?;

    let previous: Option<(Option<String>,)> =
        sqlx::query_as("SELECT avatar FROM users WHERE id = $1")
            .bind(session.user_id)
            .fetch_optional(pool)
            .await
            .map_err(QueryError::from)?;
    let previous = previous
        .ok_or_else(|| ErrorKind::InvalidSession.new("Invalid session; User no longer exists"))?
        .0;

    sqlx::query("UPDATE users SET avatar = $1 WHERE id = $2")
        .bind(reference)
        .bind(session.user_id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(previous)
}

/// Clears the avatar and returns the removed reference.
pub async fn remove_avatar(session: &SessionData, pool: &Pool<Sqlite>) -> Result<String, Error> {
    session.authenticate(ActionType::ManageOwnProfile)?;

    let current: Option<(Option<String>,)> =
        sqlx::query_as("SELECT avatar FROM users WHERE id = $1")
            .bind(session.user_id)
            .fetch_optional(pool)
            .await
            .map_err(QueryError::from)?;
    let reference = current
        .and_then(|row| row.0)
        .ok_or_else(|| ErrorKind::InvalidRequest.new("Avatar is not set."))?;

    sqlx::query("UPDATE users SET avatar = NULL WHERE id = $1")
        .bind(session.user_id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(reference)
}

/// Grants the admin role to the user registered with `email`.
pub async fn promote_user(email: &str, pool: &Pool<Sqlite>) -> Result<User, Error> {
    let row: Option<User> = sqlx::query_as("UPDATE users SET role = $1 WHERE email = $2 RETURNING *")
        .bind(UserRole::Admin)
        .bind(email)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    let user = row.ok_or_else(|| ErrorKind::NotFound.new("User not found."))?;
    log::info!("Promoted {} to admin", user.username);
    Ok(user)
}
