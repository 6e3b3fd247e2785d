use std::collections::HashSet;

use chrono::Utc;
use sqlx::{Pool, QueryBuilder, Sqlite, SqliteConnection};

use crate::{
    constants::BATCH_SIZE,
    error::{Error, ErrorKind, QueryError},
    jwt::SessionData,
    permissions::ActionType,
    schema::{Id, Tag},
};

pub async fn create_tag(
    session: &SessionData,
    name: &str,
    slug: &str,
    pool: &Pool<Sqlite>,
) -> Result<Tag, Error> {
    session.authenticate(ActionType::ManageTags)?;

    let tag: Tag = sqlx::query_as(
        "INSERT INTO tags (name, slug, created_at) VALUES ($1, $2, $3) RETURNING id, name, slug",
    )
    .bind(name)
    .bind(slug)
    .bind(Utc::now())
    .fetch_one(pool)
    .await
    .map_err(|e| QueryError::from(e).on_conflict("A tag with this name or slug already exists."))?;

    Ok(tag)
}

pub async fn get_tag(id: Id, pool: &Pool<Sqlite>) -> Result<Tag, Error> {
    let tag: Option<Tag> = sqlx::query_as("SELECT id, name, slug FROM tags WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    tag.ok_or_else(|| ErrorKind::NotFound.new("Tag not found."))
}

pub async fn list_tags(pool: &Pool<Sqlite>) -> Result<Vec<Tag>, Error> {
    let list: Vec<Tag> = sqlx::query_as("SELECT id, name, slug FROM tags ORDER BY name")
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(list)
}

pub async fn list_recipe_tags(recipe_id: Id, pool: &Pool<Sqlite>) -> Result<Vec<Tag>, Error> {
    let list: Vec<Tag> = sqlx::query_as(
        "SELECT t.id, t.name, t.slug FROM recipe_tags rt JOIN tags t ON t.id = rt.tag_id WHERE rt.recipe_id = $1 ORDER BY t.id",
    )
    .bind(recipe_id)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(list)
}

/// Fails with a `tags` field error naming the first id that has no row.
pub async fn ensure_tags_exist(ids: &[Id], conn: &mut SqliteConnection) -> Result<(), Error> {
    let mut found = HashSet::new();

    for chunk in ids.chunks(BATCH_SIZE) {
        let mut query_builder: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT id FROM tags WHERE id IN (");
        let mut separated = query_builder.separated(", ");
        for id in chunk {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");

        let rows: Vec<(Id,)> = query_builder
            .build_query_as()
            .fetch_all(&mut *conn)
            .await
            .map_err(QueryError::from)?;
        found.extend(rows.into_iter().map(|row| row.0));
    }

    match ids.iter().find(|id| !found.contains(id)) {
        Some(missing) => Err(Error::field(
            "tags",
            &format!("Invalid pk \"{missing}\" - object does not exist."),
        )),
        None => Ok(()),
    }
}

/// Replaces the whole tag set of a recipe.
pub async fn replace_recipe_tags(
    recipe_id: Id,
    tags: &[Id],
    conn: &mut SqliteConnection,
) -> Result<(), Error> {
    sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut *conn)
        .await
        .map_err(QueryError::from)?;

    for chunk in tags.chunks(BATCH_SIZE) {
        let mut query_builder: QueryBuilder<Sqlite> =
            QueryBuilder::new("INSERT INTO recipe_tags (recipe_id, tag_id) ");

        query_builder.push_values(chunk, |mut b, tag_id| {
            b.push_bind(recipe_id).push_bind(*tag_id);
        });

        query_builder
            .build()
            .execute(&mut *conn)
            .await
            .map_err(QueryError::from)?;
    }

    Ok(())
}
