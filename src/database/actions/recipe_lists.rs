use chrono::Utc;
use sqlx::{Pool, Sqlite};

use crate::{
    error::{Error, ErrorKind, QueryError},
    jwt::SessionData,
    permissions::ActionType,
    schema::{Id, UserRecipeLink},
};

use super::recipes::get_recipe;

/// Per-user recipe sets sharing the `UserRecipeLink` row shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecipeList {
    Favorites,
    ShoppingList,
}

impl RecipeList {
    fn table(self) -> &'static str {
        match self {
            RecipeList::Favorites => "favorites",
            RecipeList::ShoppingList => "shopping_list",
        }
    }

    fn action(self) -> ActionType {
        match self {
            RecipeList::Favorites => ActionType::ManageOwnFavorites,
            RecipeList::ShoppingList => ActionType::ManageOwnShoppingList,
        }
    }

    fn already_added(self) -> &'static str {
        match self {
            RecipeList::Favorites => "Recipe is already in favorites.",
            RecipeList::ShoppingList => "Recipe is already in the shopping cart.",
        }
    }

    fn not_added(self) -> &'static str {
        match self {
            RecipeList::Favorites => "Recipe is not in favorites.",
            RecipeList::ShoppingList => "Recipe is not in the shopping cart.",
        }
    }
}

pub async fn add_to_list(
    list: RecipeList,
    session: &SessionData,
    recipe_id: Id,
    pool: &Pool<Sqlite>,
) -> Result<UserRecipeLink, Error> {
    session.authenticate(list.action())?;
    get_recipe(recipe_id, pool).await?;

    let query = format!(
        "INSERT INTO {} (user_id, recipe_id, created_at) VALUES ($1, $2, $3) RETURNING user_id, recipe_id, created_at",
        list.table()
    );
    let row: UserRecipeLink = sqlx::query_as(&query)
        .bind(session.user_id)
        .bind(recipe_id)
        .bind(Utc::now())
        .fetch_one(pool)
        .await
        .map_err(|e| QueryError::from(e).on_conflict(list.already_added()))?;

    Ok(row)
}

pub async fn remove_from_list(
    list: RecipeList,
    session: &SessionData,
    recipe_id: Id,
    pool: &Pool<Sqlite>,
) -> Result<(), Error> {
    session.authenticate(list.action())?;
    get_recipe(recipe_id, pool).await?;

    let query = format!(
        "DELETE FROM {} WHERE user_id = $1 AND recipe_id = $2",
        list.table()
    );
    let result = sqlx::query(&query)
        .bind(session.user_id)
        .bind(recipe_id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(ErrorKind::InvalidRequest.new(list.not_added()));
    }
    Ok(())
}

/// Anonymous requesters never have a recipe in any list.
pub async fn is_in_list(
    list: RecipeList,
    session: Option<&SessionData>,
    recipe_id: Id,
    pool: &Pool<Sqlite>,
) -> Result<bool, Error> {
    let session = match session {
        Some(session) => session,
        None => return Ok(false),
    };

    let query = format!(
        "SELECT COUNT(*) FROM {} WHERE user_id = $1 AND recipe_id = $2",
        list.table()
    );
    let count: (i64,) = sqlx::query_as(&query)
        .bind(session.user_id)
        .bind(recipe_id)
        .fetch_one(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(count.0 > 0)
}

pub async fn list_entries(
    list: RecipeList,
    user_id: Id,
    pool: &Pool<Sqlite>,
) -> Result<Vec<UserRecipeLink>, Error> {
    let query = format!(
        "SELECT user_id, recipe_id, created_at FROM {} WHERE user_id = $1 ORDER BY id",
        list.table()
    );
    let rows: Vec<UserRecipeLink> = sqlx::query_as(&query)
        .bind(user_id)
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(rows)
}
