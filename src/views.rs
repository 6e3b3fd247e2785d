//! Response payloads. Requester-relative flags are resolved here from an
//! explicit `Option<&SessionData>`; anonymous requesters see `false`.

use serde::Serialize;

use crate::{
    actions::{
        count_recipes, get_user, is_in_list, is_subscribed, list_recipe_ingredients,
        list_recipe_tags, recent_recipes, RecipeList,
    },
    error::Error,
    jwt::SessionData,
    schema::{Id, Recipe, RecipeIngredientRow, Tag, User},
    state::State,
};

#[derive(Debug, Clone, Serialize)]
pub struct RegisteredUserView {
    pub email: String,
    pub id: Id,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

impl From<&User> for RegisteredUserView {
    fn from(user: &User) -> Self {
        Self {
            email: user.email.to_owned(),
            id: user.id,
            username: user.username.to_owned(),
            first_name: user.first_name.to_owned(),
            last_name: user.last_name.to_owned(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UserView {
    pub email: String,
    pub id: Id,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AvatarView {
    pub avatar: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecipeView {
    pub id: Id,
    pub tags: Vec<Tag>,
    pub author: UserView,
    pub ingredients: Vec<RecipeIngredientRow>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ShortRecipeView {
    pub id: Id,
    pub name: String,
    pub image: String,
    pub cooking_time: i32,
}

/// A followed user with a capped preview of their recipes.
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionView {
    #[serde(flatten)]
    pub user: UserView,
    pub recipes: Vec<ShortRecipeView>,
    pub recipes_count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ShortLinkView {
    #[serde(rename = "short-link")]
    pub short_link: String,
}

pub async fn user_view(
    user: &User,
    session: Option<&SessionData>,
    state: &State,
) -> Result<UserView, Error> {
    Ok(UserView {
        email: user.email.to_owned(),
        id: user.id,
        username: user.username.to_owned(),
        first_name: user.first_name.to_owned(),
        last_name: user.last_name.to_owned(),
        is_subscribed: is_subscribed(session, user.id, &state.pool).await?,
        avatar: user.avatar.as_deref().map(|avatar| state.media_url(avatar)),
    })
}

pub fn short_recipe_view(recipe: &Recipe, state: &State) -> ShortRecipeView {
    ShortRecipeView {
        id: recipe.id,
        name: recipe.name.to_owned(),
        image: state.media_url(&recipe.image),
        cooking_time: recipe.cooking_time,
    }
}

pub async fn recipe_view(
    recipe: &Recipe,
    session: Option<&SessionData>,
    state: &State,
) -> Result<RecipeView, Error> {
    let pool = &state.pool;
    let author = get_user(recipe.author_id, pool).await?;

    Ok(RecipeView {
        id: recipe.id,
        tags: list_recipe_tags(recipe.id, pool).await?,
        author: user_view(&author, session, state).await?,
        ingredients: list_recipe_ingredients(recipe.id, pool).await?,
        is_favorited: is_in_list(RecipeList::Favorites, session, recipe.id, pool).await?,
        is_in_shopping_cart: is_in_list(RecipeList::ShoppingList, session, recipe.id, pool)
            .await?,
        name: recipe.name.to_owned(),
        image: state.media_url(&recipe.image),
        text: recipe.text.to_owned(),
        cooking_time: recipe.cooking_time,
    })
}

pub async fn recipe_views(
    recipes: &[Recipe],
    session: Option<&SessionData>,
    state: &State,
) -> Result<Vec<RecipeView>, Error> {
    let mut views = Vec::with_capacity(recipes.len());
    for recipe in recipes {
        views.push(recipe_view(recipe, session, state).await?);
    }
    Ok(views)
}

pub async fn subscription_view(
    user: &User,
    session: Option<&SessionData>,
    recipes_limit: i64,
    state: &State,
) -> Result<SubscriptionView, Error> {
    let recipes = recent_recipes(user.id, recipes_limit, &state.pool).await?;

    Ok(SubscriptionView {
        user: user_view(user, session, state).await?,
        recipes: recipes
            .iter()
            .map(|recipe| short_recipe_view(recipe, state))
            .collect(),
        recipes_count: count_recipes(user.id, &state.pool).await?,
    })
}
