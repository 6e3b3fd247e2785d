use std::collections::HashMap;

use warp::{
    http::{StatusCode, Uri},
    reject::Rejection,
    reply::{self, Reply, Response},
};

use crate::{
    actions::{
        add_to_list, create_ingredient, create_recipe, create_tag, delete_recipe,
        get_ingredient, get_recipe, get_recipe_by_link, get_recipe_mut, get_tag, get_user,
        list_ingredients, list_recipes, list_subscriptions, list_tags, list_users,
        register_user, remove_avatar, remove_from_list, render_shopping_list, set_avatar,
        set_password, shopping_list, subscribe, unsubscribe, update_recipe, RecipeList,
    },
    constants::{AVATAR_IMAGE_DIR, RECIPE_IMAGE_DIR, SHOPPING_LIST_FILENAME},
    error::ErrorKind,
    form::{
        recipes_limit, AvatarForm, IngredientForm, PasswordForm, RecipeFilter, RecipeForm,
        RegistrationForm, TagForm,
    },
    jwt::SessionData,
    schema::Id,
    state::State,
    views::{
        recipe_view, recipe_views, short_recipe_view, subscription_view, user_view, AvatarView,
        RegisteredUserView, ShortLinkView,
    },
};

fn json_with_status<T: serde::Serialize>(value: &T, status: StatusCode) -> Response {
    reply::with_status(reply::json(value), status).into_response()
}

fn no_content() -> Response {
    StatusCode::NO_CONTENT.into_response()
}

pub async fn list_tags_handler(state: State) -> Result<Response, Rejection> {
    let tags = list_tags(&state.pool).await?;
    Ok(reply::json(&tags).into_response())
}

pub async fn get_tag_handler(id: Id, state: State) -> Result<Response, Rejection> {
    let tag = get_tag(id, &state.pool).await?;
    Ok(reply::json(&tag).into_response())
}

pub async fn create_tag_handler(
    session: SessionData,
    form: TagForm,
    state: State,
) -> Result<Response, Rejection> {
    let (name, slug) = form.validate()?;
    let tag = create_tag(&session, &name, &slug, &state.pool).await?;
    Ok(json_with_status(&tag, StatusCode::CREATED))
}

pub async fn list_ingredients_handler(
    query: HashMap<String, String>,
    state: State,
) -> Result<Response, Rejection> {
    let ingredients =
        list_ingredients(query.get("name").map(String::as_str), &state.pool).await?;
    Ok(reply::json(&ingredients).into_response())
}

pub async fn get_ingredient_handler(id: Id, state: State) -> Result<Response, Rejection> {
    let ingredient = get_ingredient(id, &state.pool).await?;
    Ok(reply::json(&ingredient).into_response())
}

pub async fn create_ingredient_handler(
    session: SessionData,
    form: IngredientForm,
    state: State,
) -> Result<Response, Rejection> {
    let (name, unit) = form.validate()?;
    let ingredient = create_ingredient(&session, &name, unit, &state.pool).await?;
    Ok(json_with_status(&ingredient, StatusCode::CREATED))
}

pub async fn register_handler(
    form: RegistrationForm,
    state: State,
) -> Result<Response, Rejection> {
    let user = register_user(form.validate()?, &state.pool).await?;
    Ok(json_with_status(
        &RegisteredUserView::from(&user),
        StatusCode::CREATED,
    ))
}

pub async fn list_users_handler(
    session: Option<SessionData>,
    state: State,
) -> Result<Response, Rejection> {
    let users = list_users(&state.pool).await?;

    let mut views = Vec::with_capacity(users.len());
    for user in &users {
        views.push(user_view(user, session.as_ref(), &state).await?);
    }
    Ok(reply::json(&views).into_response())
}

pub async fn get_user_handler(
    id: Id,
    session: Option<SessionData>,
    state: State,
) -> Result<Response, Rejection> {
    let user = get_user(id, &state.pool).await?;
    let view = user_view(&user, session.as_ref(), &state).await?;
    Ok(reply::json(&view).into_response())
}

pub async fn me_handler(session: SessionData, state: State) -> Result<Response, Rejection> {
    let user = get_user(session.user_id, &state.pool)
        .await
        .map_err(|e| match e.kind {
            ErrorKind::NotFound => {
                ErrorKind::InvalidSession.new("Invalid session; User no longer exists")
            }
            _ => e,
        })?;
    let view = user_view(&user, Some(&session), &state).await?;
    Ok(reply::json(&view).into_response())
}

pub async fn set_password_handler(
    session: SessionData,
    form: PasswordForm,
    state: State,
) -> Result<Response, Rejection> {
    let (current, new) = form.validate()?;
    set_password(&session, &current, &new, &state.pool).await?;
    Ok(no_content())
}

pub async fn put_avatar_handler(
    session: SessionData,
    form: AvatarForm,
    state: State,
) -> Result<Response, Rejection> {
    let image = form.validate()?;
    let reference = state.media.save(AVATAR_IMAGE_DIR, &image).await?;

    match set_avatar(&session, &reference, &state.pool).await {
        Ok(previous) => {
            if let Some(previous) = previous {
                state.media.remove(&previous).await;
            }
        }
        Err(e) => {
            state.media.remove(&reference).await;
            return Err(e.into());
        }
    }

    let view = AvatarView {
        avatar: state.media_url(&reference),
    };
    Ok(reply::json(&view).into_response())
}

pub async fn delete_avatar_handler(
    session: SessionData,
    state: State,
) -> Result<Response, Rejection> {
    let removed = remove_avatar(&session, &state.pool).await?;
    state.media.remove(&removed).await;
    Ok(no_content())
}

pub async fn list_subscriptions_handler(
    session: SessionData,
    query: HashMap<String, String>,
    state: State,
) -> Result<Response, Rejection> {
    let limit = recipes_limit(&query);
    let users = list_subscriptions(&session, &state.pool).await?;

    let mut views = Vec::with_capacity(users.len());
    for user in &users {
        views.push(subscription_view(user, Some(&session), limit, &state).await?);
    }
    Ok(reply::json(&views).into_response())
}

pub async fn subscribe_handler(
    id: Id,
    session: SessionData,
    query: HashMap<String, String>,
    state: State,
) -> Result<Response, Rejection> {
    let subscription = subscribe(&session, id, &state.pool).await?;
    let user = get_user(subscription.user_id, &state.pool).await?;

    let view = subscription_view(&user, Some(&session), recipes_limit(&query), &state).await?;
    Ok(json_with_status(&view, StatusCode::CREATED))
}

pub async fn unsubscribe_handler(
    id: Id,
    session: SessionData,
    state: State,
) -> Result<Response, Rejection> {
    unsubscribe(&session, id, &state.pool).await?;
    Ok(no_content())
}

pub async fn list_recipes_handler(
    query: Vec<(String, String)>,
    session: Option<SessionData>,
    state: State,
) -> Result<Response, Rejection> {
    let filter = RecipeFilter::from_query(&query)?;
    let recipes = list_recipes(&filter, session.as_ref(), &state.pool).await?;

    let views = recipe_views(&recipes, session.as_ref(), &state).await?;
    Ok(reply::json(&views).into_response())
}

pub async fn get_recipe_handler(
    id: Id,
    session: Option<SessionData>,
    state: State,
) -> Result<Response, Rejection> {
    let recipe = get_recipe(id, &state.pool).await?;
    let view = recipe_view(&recipe, session.as_ref(), &state).await?;
    Ok(reply::json(&view).into_response())
}

pub async fn create_recipe_handler(
    session: SessionData,
    form: RecipeForm,
    state: State,
) -> Result<Response, Rejection> {
    let recipe = form.validate_new()?;
    let image = state.media.save(RECIPE_IMAGE_DIR, &recipe.image).await?;

    let created = match create_recipe(&session, &recipe, &image, &state.pool).await {
        Ok(created) => created,
        Err(e) => {
            state.media.remove(&image).await;
            return Err(e.into());
        }
    };

    let view = recipe_view(&created, Some(&session), &state).await?;
    Ok(json_with_status(&view, StatusCode::CREATED))
}

pub async fn update_recipe_handler(
    id: Id,
    session: SessionData,
    form: RecipeForm,
    state: State,
) -> Result<Response, Rejection> {
    // Missing and foreign recipes are rejected before the body is looked at.
    get_recipe_mut(id, &session, &state.pool).await?;
    let changes = form.validate_changes()?;

    let image = match &changes.image {
        Some(image) => Some(state.media.save(RECIPE_IMAGE_DIR, image).await?),
        None => None,
    };

    let (updated, replaced) =
        match update_recipe(id, &session, &changes, image.as_deref(), &state.pool).await {
            Ok(result) => result,
            Err(e) => {
                if let Some(image) = &image {
                    state.media.remove(image).await;
                }
                return Err(e.into());
            }
        };

    if let Some(replaced) = replaced {
        state.media.remove(&replaced).await;
    }

    let view = recipe_view(&updated, Some(&session), &state).await?;
    Ok(reply::json(&view).into_response())
}

pub async fn delete_recipe_handler(
    id: Id,
    session: SessionData,
    state: State,
) -> Result<Response, Rejection> {
    let deleted = delete_recipe(id, &session, &state.pool).await?;
    state.media.remove(&deleted.image).await;
    Ok(no_content())
}

pub async fn get_link_handler(id: Id, state: State) -> Result<Response, Rejection> {
    let recipe = get_recipe(id, &state.pool).await?;
    let view = ShortLinkView {
        short_link: state.short_link_url(&recipe.link),
    };
    Ok(reply::json(&view).into_response())
}

pub async fn add_to_list_handler(
    list: RecipeList,
    id: Id,
    session: SessionData,
    state: State,
) -> Result<Response, Rejection> {
    let entry = add_to_list(list, &session, id, &state.pool).await?;
    let recipe = get_recipe(entry.recipe_id, &state.pool).await?;
    Ok(json_with_status(
        &short_recipe_view(&recipe, &state),
        StatusCode::CREATED,
    ))
}

pub async fn remove_from_list_handler(
    list: RecipeList,
    id: Id,
    session: SessionData,
    state: State,
) -> Result<Response, Rejection> {
    remove_from_list(list, &session, id, &state.pool).await?;
    Ok(no_content())
}

pub async fn download_shopping_cart_handler(
    session: SessionData,
    state: State,
) -> Result<Response, Rejection> {
    let lines = shopping_list(&session, &state.pool).await?;
    let text = render_shopping_list(&lines);

    let response = reply::with_header(
        reply::with_header(text, "content-type", "text/plain; charset=utf-8"),
        "content-disposition",
        format!("attachment; filename=\"{SHOPPING_LIST_FILENAME}\""),
    );
    Ok(response.into_response())
}

pub async fn short_link_handler(link: String, state: State) -> Result<Response, Rejection> {
    let recipe = get_recipe_by_link(&link, &state.pool).await?;

    let location: Uri = format!("/api/recipes/{}/", recipe.id)
        .parse()
        .map_err(|e| {
            log::error!("Failed to build redirect for recipe {}: {e}", recipe.id);
            ErrorKind::InternalServerError.default()
        })?;
    Ok(warp::redirect::found(location).into_response())
}
