use std::{collections::HashMap, convert::Infallible};

use serde::de::DeserializeOwned;
use warp::{reject::Rejection, reply::Reply, Filter};

use crate::{
    actions::RecipeList,
    constants::MAX_BODY_SIZE,
    middleware::{with_possible_session, with_session},
    schema::Id,
    state::State,
};

use super::{handlers::*, rejection::handle_rejection};

fn with_state(state: State) -> impl Filter<Extract = (State,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

fn json_body<T: DeserializeOwned + Send>() -> impl Filter<Extract = (T,), Error = Rejection> + Clone
{
    warp::body::content_length_limit(MAX_BODY_SIZE).and(warp::body::json())
}

fn with_list(list: RecipeList) -> impl Filter<Extract = (RecipeList,), Error = Infallible> + Clone {
    warp::any().map(move || list)
}

/// Every endpoint of the service, with rejections recovered into JSON errors.
pub fn routes(state: State) -> impl Filter<Extract = impl Reply, Error = Infallible> + Clone {
    let api = tag_routes(state.clone())
        .or(ingredient_routes(state.clone()))
        .or(user_routes(state.clone()))
        .or(recipe_routes(state.clone()));

    let short_link = warp::path!("s" / String)
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(short_link_handler);

    let media = warp::path("media").and(warp::fs::dir(state.media.root().to_path_buf()));

    warp::path("api")
        .and(api)
        .or(short_link)
        .or(media)
        .recover(handle_rejection)
        .with(warp::log("foodgram::api"))
}

fn tag_routes(state: State) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    let key = state.session_key.clone();

    let list = warp::path!("tags")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(list_tags_handler);

    let detail = warp::path!("tags" / Id)
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(get_tag_handler);

    let create = warp::path!("tags")
        .and(warp::post())
        .and(with_session(key))
        .and(json_body())
        .and(with_state(state))
        .and_then(create_tag_handler);

    list.or(detail).or(create)
}

fn ingredient_routes(state: State) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    let key = state.session_key.clone();

    let list = warp::path!("ingredients")
        .and(warp::get())
        .and(warp::query::<HashMap<String, String>>())
        .and(with_state(state.clone()))
        .and_then(list_ingredients_handler);

    let detail = warp::path!("ingredients" / Id)
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(get_ingredient_handler);

    let create = warp::path!("ingredients")
        .and(warp::post())
        .and(with_session(key))
        .and(json_body())
        .and(with_state(state))
        .and_then(create_ingredient_handler);

    list.or(detail).or(create)
}

fn user_routes(state: State) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    let key = state.session_key.clone();

    let register = warp::path!("users")
        .and(warp::post())
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(register_handler);

    let list = warp::path!("users")
        .and(warp::get())
        .and(with_possible_session(key.clone()))
        .and(with_state(state.clone()))
        .and_then(list_users_handler);

    let me = warp::path!("users" / "me")
        .and(warp::get())
        .and(with_session(key.clone()))
        .and(with_state(state.clone()))
        .and_then(me_handler);

    let set_password = warp::path!("users" / "set_password")
        .and(warp::post())
        .and(with_session(key.clone()))
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(set_password_handler);

    let put_avatar = warp::path!("users" / "me" / "avatar")
        .and(warp::put())
        .and(with_session(key.clone()))
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(put_avatar_handler);

    let delete_avatar = warp::path!("users" / "me" / "avatar")
        .and(warp::delete())
        .and(with_session(key.clone()))
        .and(with_state(state.clone()))
        .and_then(delete_avatar_handler);

    let subscriptions = warp::path!("users" / "subscriptions")
        .and(warp::get())
        .and(with_session(key.clone()))
        .and(warp::query::<HashMap<String, String>>())
        .and(with_state(state.clone()))
        .and_then(list_subscriptions_handler);

    let subscribe = warp::path!("users" / Id / "subscribe")
        .and(warp::post())
        .and(with_session(key.clone()))
        .and(warp::query::<HashMap<String, String>>())
        .and(with_state(state.clone()))
        .and_then(subscribe_handler);

    let unsubscribe = warp::path!("users" / Id / "subscribe")
        .and(warp::delete())
        .and(with_session(key.clone()))
        .and(with_state(state.clone()))
        .and_then(unsubscribe_handler);

    let detail = warp::path!("users" / Id)
        .and(warp::get())
        .and(with_possible_session(key))
        .and(with_state(state))
        .and_then(get_user_handler);

    register
        .or(list)
        .or(me)
        .or(set_password)
        .or(put_avatar)
        .or(delete_avatar)
        .or(subscriptions)
        .or(subscribe)
        .or(unsubscribe)
        .or(detail)
}

fn recipe_routes(state: State) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    let key = state.session_key.clone();

    let list = warp::path!("recipes")
        .and(warp::get())
        .and(warp::query::<Vec<(String, String)>>())
        .and(with_possible_session(key.clone()))
        .and(with_state(state.clone()))
        .and_then(list_recipes_handler);

    let create = warp::path!("recipes")
        .and(warp::post())
        .and(with_session(key.clone()))
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(create_recipe_handler);

    let download = warp::path!("recipes" / "download_shopping_cart")
        .and(warp::get())
        .and(with_session(key.clone()))
        .and(with_state(state.clone()))
        .and_then(download_shopping_cart_handler);

    let detail = warp::path!("recipes" / Id)
        .and(warp::get())
        .and(with_possible_session(key.clone()))
        .and(with_state(state.clone()))
        .and_then(get_recipe_handler);

    let update = warp::path!("recipes" / Id)
        .and(warp::patch())
        .and(with_session(key.clone()))
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(update_recipe_handler);

    let delete = warp::path!("recipes" / Id)
        .and(warp::delete())
        .and(with_session(key.clone()))
        .and(with_state(state.clone()))
        .and_then(delete_recipe_handler);

    let get_link = warp::path!("recipes" / Id / "get-link")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(get_link_handler);

    let favorite = list_routes("favorite", RecipeList::Favorites, state.clone());
    let shopping_cart = list_routes("shopping_cart", RecipeList::ShoppingList, state);

    list.or(create)
        .or(download)
        .or(detail)
        .or(update)
        .or(delete)
        .or(get_link)
        .or(favorite)
        .or(shopping_cart)
}

/// `POST` and `DELETE /recipes/{id}/{segment}` for one of the per-user recipe lists.
fn list_routes(
    segment: &'static str,
    list: RecipeList,
    state: State,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    let key = state.session_key.clone();
    let path = warp::path("recipes")
        .and(warp::path::param::<Id>())
        .and(warp::path(segment))
        .and(warp::path::end());

    let add = with_list(list)
        .and(path.clone())
        .and(warp::post())
        .and(with_session(key.clone()))
        .and(with_state(state.clone()))
        .and_then(add_to_list_handler);

    let remove = with_list(list)
        .and(path)
        .and(warp::delete())
        .and(with_session(key))
        .and(with_state(state))
        .and_then(remove_from_list_handler);

    add.or(remove)
}
