mod common;

use common::{admin, ingredient, recipe, setup, tag, user};
use foodgram::{
    actions::{
        add_to_list, is_in_list, list_entries, remove_from_list, render_shopping_list,
        shopping_list, RecipeList,
    },
    error::ErrorKind,
    schema::MeasurementUnit,
};

#[tokio::test]
async fn shopping_list_sums_across_recipes() {
    let app = setup().await;
    let admin = admin(&app, "admin").await;
    let cook = user(&app, "cook").await;
    let baking = tag(&app, &admin, "baking").await;
    let flour = ingredient(&app, &admin, "flour", MeasurementUnit::Grams).await;
    let sugar = ingredient(&app, &admin, "sugar", MeasurementUnit::Grams).await;

    let bread = recipe(&app, &cook, "Bread", &[baking.id], &[(flour.id, 100)]).await;
    let cake = recipe(
        &app,
        &cook,
        "Cake",
        &[baking.id],
        &[(sugar.id, 20), (flour.id, 50)],
    )
    .await;

    let pool = &app.state.pool;
    add_to_list(RecipeList::ShoppingList, &cook.session, bread.id, pool)
        .await
        .unwrap();
    add_to_list(RecipeList::ShoppingList, &cook.session, cake.id, pool)
        .await
        .unwrap();

    let lines = shopping_list(&cook.session, pool).await.unwrap();
    let totals: Vec<(&str, i64)> = lines
        .iter()
        .map(|line| (line.name.as_str(), line.total_amount))
        .collect();
    assert_eq!(totals, vec![("flour", 150), ("sugar", 20)]);

    assert_eq!(
        render_shopping_list(&lines),
        "Shopping list:\n\n1) flour (г): 150\n2) sugar (г): 20\n"
    );
}

#[tokio::test]
async fn same_name_with_other_units_stays_separate() {
    let app = setup().await;
    let admin = admin(&app, "admin").await;
    let cook = user(&app, "cook").await;
    let baking = tag(&app, &admin, "baking").await;
    let milk_ml = ingredient(&app, &admin, "milk", MeasurementUnit::Milliliters).await;
    let milk_cup = ingredient(&app, &admin, "milk", MeasurementUnit::Cup).await;

    let pancakes = recipe(
        &app,
        &cook,
        "Pancakes",
        &[baking.id],
        &[(milk_ml.id, 200), (milk_cup.id, 1)],
    )
    .await;
    add_to_list(RecipeList::ShoppingList, &cook.session, pancakes.id, &app.state.pool)
        .await
        .unwrap();

    let lines = shopping_list(&cook.session, &app.state.pool).await.unwrap();
    assert_eq!(lines.len(), 2);
    assert!(lines.iter().all(|line| line.name == "milk"));
}

#[tokio::test]
async fn empty_cart_has_no_lines() {
    let app = setup().await;
    let cook = user(&app, "cook").await;

    let lines = shopping_list(&cook.session, &app.state.pool).await.unwrap();
    assert!(lines.is_empty());
    assert_eq!(render_shopping_list(&lines), "Shopping list:\n\n");
}

#[tokio::test]
async fn favorites_are_a_set() {
    let app = setup().await;
    let admin = admin(&app, "admin").await;
    let cook = user(&app, "cook").await;
    let fan = user(&app, "fan").await;
    let lunch = tag(&app, &admin, "lunch").await;
    let apple = ingredient(&app, &admin, "apple", MeasurementUnit::Pieces).await;
    let pie = recipe(&app, &cook, "Pie", &[lunch.id], &[(apple.id, 2)]).await;

    let pool = &app.state.pool;
    let list = RecipeList::Favorites;

    let entry = add_to_list(list, &fan.session, pie.id, pool).await.unwrap();
    assert_eq!(entry.user_id, fan.user.id);
    assert_eq!(entry.recipe_id, pie.id);
    assert!(is_in_list(list, Some(&fan.session), pie.id, pool).await.unwrap());

    let error = add_to_list(list, &fan.session, pie.id, pool)
        .await
        .unwrap_err();
    assert_eq!(error.kind, ErrorKind::Conflict);
    assert_eq!(list_entries(list, fan.user.id, pool).await.unwrap().len(), 1);

    remove_from_list(list, &fan.session, pie.id, pool).await.unwrap();
    assert!(!is_in_list(list, Some(&fan.session), pie.id, pool).await.unwrap());
    assert!(list_entries(list, fan.user.id, pool).await.unwrap().is_empty());

    let error = remove_from_list(list, &fan.session, pie.id, pool)
        .await
        .unwrap_err();
    assert_eq!(error.kind, ErrorKind::InvalidRequest);
}

#[tokio::test]
async fn lists_are_independent() {
    let app = setup().await;
    let admin = admin(&app, "admin").await;
    let cook = user(&app, "cook").await;
    let lunch = tag(&app, &admin, "lunch").await;
    let apple = ingredient(&app, &admin, "apple", MeasurementUnit::Pieces).await;
    let pie = recipe(&app, &cook, "Pie", &[lunch.id], &[(apple.id, 2)]).await;

    let pool = &app.state.pool;
    add_to_list(RecipeList::Favorites, &cook.session, pie.id, pool)
        .await
        .unwrap();

    assert!(
        !is_in_list(RecipeList::ShoppingList, Some(&cook.session), pie.id, pool)
            .await
            .unwrap()
    );
    assert!(!is_in_list(RecipeList::Favorites, None, pie.id, pool).await.unwrap());
}

#[tokio::test]
async fn missing_recipes_are_not_found() {
    let app = setup().await;
    let cook = user(&app, "cook").await;

    let error = add_to_list(RecipeList::Favorites, &cook.session, 77, &app.state.pool)
        .await
        .unwrap_err();
    assert_eq!(error.kind, ErrorKind::NotFound);
}
