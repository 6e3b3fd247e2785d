use std::collections::HashSet;

use chrono::Utc;
use sqlx::{Pool, QueryBuilder, Sqlite, SqliteConnection};

use crate::{
    constants::BATCH_SIZE,
    error::{Error, ErrorKind, QueryError},
    jwt::SessionData,
    permissions::ActionType,
    schema::{Id, Ingredient, MeasurementUnit},
};

pub async fn create_ingredient(
    session: &SessionData,
    name: &str,
    unit: MeasurementUnit,
    pool: &Pool<Sqlite>,
) -> Result<Ingredient, Error> {
    session.authenticate(ActionType::ManageIngredients)?;

    let ingredient: Ingredient = sqlx::query_as(
        "INSERT INTO ingredients (name, measurement_unit, created_at) VALUES ($1, $2, $3) RETURNING id, name, measurement_unit",
    )
    .bind(name)
    .bind(unit)
    .bind(Utc::now())
    .fetch_one(pool)
    .await
    .map_err(|e| {
        QueryError::from(e).on_conflict("This ingredient already exists with that measurement unit.")
    })?;

    Ok(ingredient)
}

pub async fn get_ingredient(id: Id, pool: &Pool<Sqlite>) -> Result<Ingredient, Error> {
    let ingredient: Option<Ingredient> =
        sqlx::query_as("SELECT id, name, measurement_unit FROM ingredients WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(QueryError::from)?;

    ingredient.ok_or_else(|| ErrorKind::NotFound.new("Ingredient not found."))
}

/// Lists ingredients, optionally narrowed by a case-insensitive name search.
/// Names starting with the query come first, then names merely containing it.
pub async fn list_ingredients(
    name: Option<&str>,
    pool: &Pool<Sqlite>,
) -> Result<Vec<Ingredient>, Error> {
    let list: Vec<Ingredient> = sqlx::query_as(
        "SELECT id, name, measurement_unit FROM ingredients ORDER BY name, measurement_unit",
    )
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    let query = match name.map(str::trim).filter(|q| !q.is_empty()) {
        Some(query) => query.to_lowercase(),
        None => return Ok(list),
    };

    Ok(rank_by_name(list, &query))
}

// SQLite's LIKE folds ASCII only, so matching happens here.
fn rank_by_name(list: Vec<Ingredient>, query: &str) -> Vec<Ingredient> {
    let (mut starting, mut containing): (Vec<_>, Vec<_>) = list
        .into_iter()
        .filter_map(|ingredient| {
            let lowered = ingredient.name.to_lowercase();
            if lowered.starts_with(query) {
                Some((true, ingredient))
            } else if lowered.contains(query) {
                Some((false, ingredient))
            } else {
                None
            }
        })
        .partition(|(starts, _)| *starts);

    starting.append(&mut containing);
    starting.into_iter().map(|(_, ingredient)| ingredient).collect()
}

/// Fails with an `ingredients` field error naming the first id that has no row.
pub async fn ensure_ingredients_exist(
    ids: &[Id],
    conn: &mut SqliteConnection,
) -> Result<(), Error> {
    let mut found = HashSet::new();

    for chunk in ids.chunks(BATCH_SIZE) {
        let mut query_builder: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT id FROM ingredients WHERE id IN (");
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
            "ingredients",
            &format!("Invalid pk \"{missing}\" - object does not exist."),
        )),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ingredient(id: Id, name: &str) -> Ingredient {
        Ingredient {
            id,
            name: name.to_owned(),
            measurement_unit: MeasurementUnit::Grams,
        }
    }

    #[test]
    fn prefix_matches_rank_first() {
        let list = vec![
            ingredient(1, "Brown sugar"),
            ingredient(2, "Salt"),
            ingredient(3, "Sugar"),
            ingredient(4, "Sugar syrup"),
        ];

        let names: Vec<String> = rank_by_name(list, "sugar")
            .into_iter()
            .map(|i| i.name)
            .collect();
        assert_eq!(names, vec!["Sugar", "Sugar syrup", "Brown sugar"]);
    }

    #[test]
    fn search_folds_cyrillic_case() {
        let list = vec![ingredient(1, "Мука"), ingredient(2, "Сахар")];

        let found = rank_by_name(list, "мук");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, 1);
    }
}
