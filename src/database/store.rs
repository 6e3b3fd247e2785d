use std::str::FromStr;

use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Sqlite,
};

use super::error::{Error, QueryError};

const SCHEMA: &[&str] = &[
    "
    CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        email TEXT NOT NULL UNIQUE,
        username TEXT NOT NULL UNIQUE,
        first_name TEXT NOT NULL,
        last_name TEXT NOT NULL,
        password TEXT NOT NULL,
        role TEXT NOT NULL DEFAULT 'user',
        avatar TEXT
    )
    ",
    "
    CREATE TABLE IF NOT EXISTS tags (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        slug TEXT NOT NULL UNIQUE,
        created_at TEXT NOT NULL
    )
    ",
    "
    CREATE TABLE IF NOT EXISTS ingredients (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        measurement_unit TEXT NOT NULL,
        created_at TEXT NOT NULL,
        UNIQUE (name, measurement_unit)
    )
    ",
    "
    CREATE TABLE IF NOT EXISTS recipes (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        author_id INTEGER NOT NULL REFERENCES users (id) ON DELETE CASCADE,
        name TEXT NOT NULL,
        image TEXT NOT NULL,
        text TEXT NOT NULL,
        cooking_time INTEGER NOT NULL CHECK (cooking_time BETWEEN 1 AND 10080),
        link TEXT NOT NULL UNIQUE CHECK (link <> ''),
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    ",
    "CREATE INDEX IF NOT EXISTS recipes_author_idx ON recipes (author_id)",
    "
    CREATE TABLE IF NOT EXISTS recipe_tags (
        recipe_id INTEGER NOT NULL REFERENCES recipes (id) ON DELETE CASCADE,
        tag_id INTEGER NOT NULL REFERENCES tags (id) ON DELETE CASCADE,
        PRIMARY KEY (recipe_id, tag_id)
    )
    ",
    "
    CREATE TABLE IF NOT EXISTS recipe_ingredients (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        recipe_id INTEGER NOT NULL REFERENCES recipes (id) ON DELETE CASCADE,
        ingredient_id INTEGER NOT NULL REFERENCES ingredients (id) ON DELETE CASCADE,
        amount INTEGER NOT NULL CHECK (amount BETWEEN 1 AND 1000000),
        UNIQUE (recipe_id, ingredient_id)
    )
    ",
    "
    CREATE TABLE IF NOT EXISTS favorites (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL REFERENCES users (id) ON DELETE CASCADE,
        recipe_id INTEGER NOT NULL REFERENCES recipes (id) ON DELETE CASCADE,
        created_at TEXT NOT NULL,
        UNIQUE (user_id, recipe_id)
    )
    ",
    "
    CREATE TABLE IF NOT EXISTS shopping_list (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL REFERENCES users (id) ON DELETE CASCADE,
        recipe_id INTEGER NOT NULL REFERENCES recipes (id) ON DELETE CASCADE,
        created_at TEXT NOT NULL,
        UNIQUE (user_id, recipe_id)
    )
    ",
    "
    CREATE TABLE IF NOT EXISTS subscriptions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        subscriber_id INTEGER NOT NULL REFERENCES users (id) ON DELETE CASCADE,
        user_id INTEGER NOT NULL REFERENCES users (id) ON DELETE CASCADE,
        created_at TEXT NOT NULL,
        UNIQUE (subscriber_id, user_id),
        CHECK (subscriber_id <> user_id)
    )
    ",
];

/// Opens a pool for `database_url` and creates any missing tables.
pub async fn connect(database_url: &str) -> Result<Pool<Sqlite>, Error> {
    let options = SqliteConnectOptions::from_str(database_url)
        .map_err(QueryError::from)?
        .foreign_keys(true)
        .create_if_missing(true);

    // Every connection to an in-memory database would otherwise see its own copy.
    let pool_options = if database_url.contains(":memory:") {
        SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(8)
    };

    let pool = pool_options
        .connect_with(options)
        .await
        .map_err(QueryError::from)?;

    migrate(&pool).await?;
    log::info!("Database ready at {database_url}");

    Ok(pool)
}

pub async fn migrate(pool: &Pool<Sqlite>) -> Result<(), Error> {
    for statement in SCHEMA {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(QueryError::from)?;
    }

    Ok(())
}
