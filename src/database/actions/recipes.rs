use std::collections::HashMap;

use chrono::Utc;
use sqlx::{Pool, QueryBuilder, Sqlite, SqliteConnection};

use crate::{
    constants::{BATCH_SIZE, LINK_GENERATION_ATTEMPTS},
    cryptography::generate_short_link,
    error::{Error, ErrorKind, QueryError},
    form::{unique_ids, NewRecipe, RecipeChanges, RecipeFilter},
    jwt::SessionData,
    permissions::ActionType,
    reconcile::{self, ReconcilePlan},
    schema::{Id, IngredientAmount, Recipe, RecipeIngredient, RecipeIngredientRow},
};

use super::{
    ingredients::ensure_ingredients_exist,
    tags::{ensure_tags_exist, replace_recipe_tags},
};

/// Creates a recipe with its tags and ingredients in one transaction.
/// `image` is the stored media reference.
pub async fn create_recipe(
    session: &SessionData,
    recipe: &NewRecipe,
    image: &str,
    pool: &Pool<Sqlite>,
) -> Result<Recipe, Error> {
    create_recipe_with_links(session, recipe, image, generate_short_link, pool).await
}

/// Same as [`create_recipe`] with a caller supplied short link generator.
pub async fn create_recipe_with_links<F>(
    session: &SessionData,
    recipe: &NewRecipe,
    image: &str,
    generate: F,
    pool: &Pool<Sqlite>,
) -> Result<Recipe, Error>
where
    F: FnMut() -> String,
{
    session.authenticate(ActionType::CreateRecipes)?;

    let mut tr = pool
        .begin()
        .await
        .map_err(|_| QueryError::new("Could not start transaction".to_owned()))?;

    ensure_tags_exist(&recipe.tags, &mut tr).await?;
    let ingredient_ids: Vec<Id> = recipe.ingredients.iter().map(|part| part.id).collect();
    ensure_ingredients_exist(&ingredient_ids, &mut tr).await?;

    let link = assign_link(generate, &mut tr).await?;
    let now = Utc::now();

    let row: Recipe = sqlx::query_as(
        "INSERT INTO recipes (author_id, name, image, text, cooking_time, link, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $7) RETURNING *",
    )
    .bind(session.user_id)
    .bind(&recipe.name)
    .bind(image)
    .bind(&recipe.text)
    .bind(recipe.cooking_time)
    .bind(&link)
    .bind(now)
    .fetch_one(&mut *tr)
    .await
    .map_err(|e| QueryError::from(e).on_conflict("Short link collision, please retry."))?;

    replace_recipe_tags(row.id, &recipe.tags, &mut tr).await?;
    insert_recipe_ingredients(row.id, &recipe.ingredients, &mut tr).await?;

    tr.commit()
        .await
        .map_err(|_| QueryError::new("Could not commit transaction".to_owned()))?;

    log::info!("User {} created recipe {} ({})", session.user_id, row.id, row.link);
    Ok(row)
}

/// Draws candidates until one is not used by any recipe.
async fn assign_link<F>(mut generate: F, conn: &mut SqliteConnection) -> Result<String, Error>
where
    F: FnMut() -> String,
{
    for _ in 0..LINK_GENERATION_ATTEMPTS {
        let candidate = generate();
        if candidate.is_empty() {
            continue;
        }

        let taken: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM recipes WHERE link = $1")
            .bind(&candidate)
            .fetch_one(&mut *conn)
            .await
            .map_err(QueryError::from)?;

        if taken.0 == 0 {
            return Ok(candidate);
        }
        log::warn!("Short link {candidate} is taken, regenerating");
    }

    Err(ErrorKind::Conflict.new("Could not generate a unique short link."))
}

pub async fn get_recipe(id: Id, pool: &Pool<Sqlite>) -> Result<Recipe, Error> {
    let row: Option<Recipe> = sqlx::query_as("SELECT * FROM recipes WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    row.ok_or_else(|| ErrorKind::NotFound.new("Recipe not found."))
}

/// Fetches a recipe the requester is allowed to modify.
pub async fn get_recipe_mut(
    id: Id,
    session: &SessionData,
    pool: &Pool<Sqlite>,
) -> Result<Recipe, Error> {
    let mut conn = pool.acquire().await.map_err(QueryError::from)?;
    owned_recipe(id, session, &mut conn).await
}

async fn owned_recipe(
    id: Id,
    session: &SessionData,
    conn: &mut SqliteConnection,
) -> Result<Recipe, Error> {
    session.authenticate(ActionType::ManageOwnRecipes)?;

    let row: Option<Recipe> = sqlx::query_as("SELECT * FROM recipes WHERE id = $1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(QueryError::from)?;

    let recipe = row.ok_or_else(|| ErrorKind::NotFound.new("Recipe not found."))?;
    if recipe.author_id != session.user_id {
        return Err(ErrorKind::Forbidden.new("Only the author may change this recipe."));
    }

    Ok(recipe)
}

pub async fn get_recipe_by_link(link: &str, pool: &Pool<Sqlite>) -> Result<Recipe, Error> {
    let row: Option<Recipe> = sqlx::query_as("SELECT * FROM recipes WHERE link = $1")
        .bind(link)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    row.ok_or_else(|| ErrorKind::NotFound.new("Short link not found."))
}

/// Applies a partial update. Tags are replaced and ingredients reconciled
/// in the same transaction as the field changes.
/// Returns the updated recipe and the image reference it no longer uses.
pub async fn update_recipe(
    id: Id,
    session: &SessionData,
    changes: &RecipeChanges,
    image: Option<&str>,
    pool: &Pool<Sqlite>,
) -> Result<(Recipe, Option<String>), Error> {
    let mut tr = pool
        .begin()
        .await
        .map_err(|_| QueryError::new("Could not start transaction".to_owned()))?;

    let current = owned_recipe(id, session, &mut tr).await?;
    ensure_tags_exist(&changes.tags, &mut tr).await?;
    let ingredient_ids: Vec<Id> = changes.ingredients.iter().map(|part| part.id).collect();
    ensure_ingredients_exist(&ingredient_ids, &mut tr).await?;

    let row: Recipe = sqlx::query_as(
        "UPDATE recipes SET name = COALESCE($1, name), text = COALESCE($2, text), cooking_time = COALESCE($3, cooking_time), image = COALESCE($4, image), updated_at = $5 WHERE id = $6 RETURNING *",
    )
    .bind(changes.name.as_deref())
    .bind(changes.text.as_deref())
    .bind(changes.cooking_time)
    .bind(image)
    .bind(Utc::now())
    .bind(id)
    .fetch_one(&mut *tr)
    .await
    .map_err(QueryError::from)?;

    replace_recipe_tags(id, &changes.tags, &mut tr).await?;
    reconcile_ingredients(id, &changes.ingredients, &mut tr).await?;

    tr.commit()
        .await
        .map_err(|_| QueryError::new("Could not commit transaction".to_owned()))?;

    let replaced = image.map(|_| current.image).filter(|old| *old != row.image);
    Ok((row, replaced))
}

/// Deletes a recipe; join rows cascade. Returns the deleted row.
pub async fn delete_recipe(
    id: Id,
    session: &SessionData,
    pool: &Pool<Sqlite>,
) -> Result<Recipe, Error> {
    let mut tr = pool
        .begin()
        .await
        .map_err(|_| QueryError::new("Could not start transaction".to_owned()))?;

    let recipe = owned_recipe(id, session, &mut tr).await?;
    sqlx::query("DELETE FROM recipes WHERE id = $1")
        .bind(id)
        .execute(&mut *tr)
        .await
        .map_err(QueryError::from)?;

    tr.commit()
        .await
        .map_err(|_| QueryError::new("Could not commit transaction".to_owned()))?;

    log::info!("User {} deleted recipe {}", session.user_id, id);
    Ok(recipe)
}

/// Lists recipes newest first. Requester-relative filters match nothing for
/// anonymous requesters.
pub async fn list_recipes(
    filter: &RecipeFilter,
    session: Option<&SessionData>,
    pool: &Pool<Sqlite>,
) -> Result<Vec<Recipe>, Error> {
    let user_id = session.map(|s| s.user_id);
    if (filter.is_favorited || filter.is_in_shopping_cart) && user_id.is_none() {
        return Ok(Vec::new());
    }

    let mut query_builder: QueryBuilder<Sqlite> =
        QueryBuilder::new("SELECT r.* FROM recipes r WHERE 1 = 1");

    if let Some(author) = filter.author {
        query_builder.push(" AND r.author_id = ").push_bind(author);
    }

    if !filter.tags.is_empty() {
        query_builder.push(
            " AND EXISTS (SELECT 1 FROM recipe_tags rt JOIN tags t ON t.id = rt.tag_id WHERE rt.recipe_id = r.id AND t.slug IN (",
        );
        let mut separated = query_builder.separated(", ");
        for slug in &filter.tags {
            separated.push_bind(slug.as_str());
        }
        separated.push_unseparated("))");
    }

    if let Some(user_id) = user_id {
        if filter.is_favorited {
            query_builder
                .push(" AND EXISTS (SELECT 1 FROM favorites f WHERE f.recipe_id = r.id AND f.user_id = ")
                .push_bind(user_id)
                .push(")");
        }
        if filter.is_in_shopping_cart {
            query_builder
                .push(" AND EXISTS (SELECT 1 FROM shopping_list s WHERE s.recipe_id = r.id AND s.user_id = ")
                .push_bind(user_id)
                .push(")");
        }
    }

    query_builder.push(" ORDER BY r.created_at DESC, r.id DESC");

    let rows: Vec<Recipe> = query_builder
        .build_query_as()
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(rows)
}

/// Most recent recipes of an author, at most `limit`.
pub async fn recent_recipes(
    author_id: Id,
    limit: i64,
    pool: &Pool<Sqlite>,
) -> Result<Vec<Recipe>, Error> {
    let rows: Vec<Recipe> = sqlx::query_as(
        "SELECT * FROM recipes WHERE author_id = $1 ORDER BY created_at DESC, id DESC LIMIT $2",
    )
    .bind(author_id)
    .bind(limit)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows)
}

pub async fn count_recipes(author_id: Id, pool: &Pool<Sqlite>) -> Result<i64, Error> {
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM recipes WHERE author_id = $1")
        .bind(author_id)
        .fetch_one(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(count.0)
}

/// Ingredients of a recipe expanded with their names, by ingredient id.
pub async fn list_recipe_ingredients(
    recipe_id: Id,
    pool: &Pool<Sqlite>,
) -> Result<Vec<RecipeIngredientRow>, Error> {
    let rows: Vec<RecipeIngredientRow> = sqlx::query_as(
        "SELECT i.id AS id, i.name AS name, i.measurement_unit AS measurement_unit, ri.amount AS amount FROM recipe_ingredients ri JOIN ingredients i ON i.id = ri.ingredient_id WHERE ri.recipe_id = $1 ORDER BY i.id",
    )
    .bind(recipe_id)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows)
}

async fn current_ingredients(
    recipe_id: Id,
    conn: &mut SqliteConnection,
) -> Result<HashMap<Id, RecipeIngredient>, Error> {
    let rows: Vec<RecipeIngredient> =
        sqlx::query_as("SELECT * FROM recipe_ingredients WHERE recipe_id = $1")
            .bind(recipe_id)
            .fetch_all(&mut *conn)
            .await
            .map_err(QueryError::from)?;

    Ok(rows
        .into_iter()
        .map(|row| (row.ingredient_id, row))
        .collect())
}

/// Makes the stored ingredient rows of a recipe equal `target`.
pub async fn reconcile_ingredients(
    recipe_id: Id,
    target: &[IngredientAmount],
    conn: &mut SqliteConnection,
) -> Result<ReconcilePlan, Error> {
    unique_ids("ingredients", target.iter().map(|part| part.id))?;

    let current = current_ingredients(recipe_id, conn).await?;
    let plan = reconcile::plan(&current, target);

    delete_recipe_ingredients(&plan.delete, conn).await?;
    update_recipe_ingredient_amounts(&plan.update, conn).await?;
    insert_recipe_ingredients(recipe_id, &plan.insert, conn).await?;

    log::trace!(
        "> Recipe {recipe_id} ingredients: {} deleted, {} updated, {} inserted",
        plan.delete.len(),
        plan.update.len(),
        plan.insert.len()
    );
    Ok(plan)
}

async fn delete_recipe_ingredients(ids: &[Id], conn: &mut SqliteConnection) -> Result<(), Error> {
    for chunk in ids.chunks(BATCH_SIZE) {
        let mut query_builder: QueryBuilder<Sqlite> =
            QueryBuilder::new("DELETE FROM recipe_ingredients WHERE id IN (");
        let mut separated = query_builder.separated(", ");
        for id in chunk {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");

        query_builder
            .build()
            .execute(&mut *conn)
            .await
            .map_err(QueryError::from)?;
    }

    Ok(())
}

async fn update_recipe_ingredient_amounts(
    updates: &[(Id, i32)],
    conn: &mut SqliteConnection,
) -> Result<(), Error> {
    for chunk in updates.chunks(BATCH_SIZE) {
        let mut query_builder: QueryBuilder<Sqlite> =
            QueryBuilder::new("UPDATE recipe_ingredients SET amount = CASE id");
        for (id, amount) in chunk {
            query_builder
                .push(" WHEN ")
                .push_bind(*id)
                .push(" THEN ")
                .push_bind(*amount);
        }
        query_builder.push(" END WHERE id IN (");

        let mut separated = query_builder.separated(", ");
        for (id, _) in chunk {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");

        query_builder
            .build()
            .execute(&mut *conn)
            .await
            .map_err(QueryError::from)?;
    }

    Ok(())
}

async fn insert_recipe_ingredients(
    recipe_id: Id,
    parts: &[IngredientAmount],
    conn: &mut SqliteConnection,
) -> Result<(), Error> {
    for chunk in parts.chunks(BATCH_SIZE) {
        let mut query_builder: QueryBuilder<Sqlite> = QueryBuilder::new(
            "INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount) ",
        );

        query_builder.push_values(chunk, |mut b, part| {
            b.push_bind(recipe_id)
                .push_bind(part.id)
                .push_bind(part.amount);
        });

        query_builder
            .build()
            .execute(&mut *conn)
            .await
            .map_err(|e| QueryError::from(e).on_conflict("Ingredients must be unique."))?;
    }

    Ok(())
}
