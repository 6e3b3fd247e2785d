#![allow(dead_code)]
//! Shared setup for integration tests: an in-memory database, a temporary
//! media directory and helpers for seeding users and reference data.

use std::{net::SocketAddr, path::PathBuf};

use foodgram::{
    actions::{create_ingredient, create_recipe, create_tag, promote_user, register_user},
    config::Config,
    form::{NewRecipe, NewUser},
    jwt::{generate_jwt_session, SessionData},
    media::EncodedImage,
    schema::{Id, Ingredient, IngredientAmount, MeasurementUnit, Recipe, Tag, User},
    state::State,
    store,
};
use tempfile::TempDir;

pub const PIXEL: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

pub struct TestApp {
    pub state: State,
    // Held so the media directory outlives the test.
    pub media: TempDir,
}

pub struct TestUser {
    pub user: User,
    pub session: SessionData,
    pub token: String,
}

impl TestUser {
    pub fn header(&self) -> String {
        format!("Token {}", self.token)
    }
}

pub async fn setup() -> TestApp {
    let media = tempfile::tempdir().unwrap();
    let pool = store::connect("sqlite::memory:").await.unwrap();

    let config = Config {
        database_url: String::from("sqlite::memory:"),
        bind_address: SocketAddr::from(([127, 0, 0, 1], 0)),
        public_url: String::from("http://testserver"),
        jwt_secret: String::from("integration-test-secret"),
        media_root: PathBuf::from(media.path()),
        media_url: String::from("/media/"),
    };

    TestApp {
        state: State::new(pool, config).unwrap(),
        media,
    }
}

fn session_for(user: &User) -> SessionData {
    SessionData {
        user_id: user.id,
        username: user.username.to_owned(),
        role: user.role,
    }
}

pub async fn user(app: &TestApp, username: &str) -> TestUser {
    let user = register_user(
        NewUser {
            email: format!("{username}@example.com"),
            username: username.to_owned(),
            first_name: String::from("Test"),
            last_name: String::from("Cook"),
            password: String::from("secret-password"),
        },
        &app.state.pool,
    )
    .await
    .unwrap();

    let token = generate_jwt_session(&user, &app.state.session_key, 1).unwrap();
    TestUser {
        session: session_for(&user),
        user,
        token,
    }
}

pub async fn admin(app: &TestApp, username: &str) -> TestUser {
    let registered = user(app, username).await;
    let user = promote_user(&registered.user.email, &app.state.pool)
        .await
        .unwrap();

    let token = generate_jwt_session(&user, &app.state.session_key, 1).unwrap();
    TestUser {
        session: session_for(&user),
        user,
        token,
    }
}

pub async fn tag(app: &TestApp, admin: &TestUser, slug: &str) -> Tag {
    create_tag(&admin.session, &slug.to_uppercase(), slug, &app.state.pool)
        .await
        .unwrap()
}

pub async fn ingredient(
    app: &TestApp,
    admin: &TestUser,
    name: &str,
    unit: MeasurementUnit,
) -> Ingredient {
    create_ingredient(&admin.session, name, unit, &app.state.pool)
        .await
        .unwrap()
}

pub fn parts(amounts: &[(Id, i32)]) -> Vec<IngredientAmount> {
    amounts
        .iter()
        .map(|&(id, amount)| IngredientAmount { id, amount })
        .collect()
}

pub fn new_recipe(name: &str, tags: &[Id], ingredients: &[(Id, i32)]) -> NewRecipe {
    NewRecipe {
        name: name.to_owned(),
        text: format!("How to make {name}."),
        cooking_time: 30,
        image: EncodedImage::parse("image", PIXEL).unwrap(),
        tags: tags.to_vec(),
        ingredients: parts(ingredients),
    }
}

pub async fn recipe(
    app: &TestApp,
    author: &TestUser,
    name: &str,
    tags: &[Id],
    ingredients: &[(Id, i32)],
) -> Recipe {
    create_recipe(
        &author.session,
        &new_recipe(name, tags, ingredients),
        "recipes/images/test.png",
        &app.state.pool,
    )
    .await
    .unwrap()
}
