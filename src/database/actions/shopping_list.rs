use sqlx::{Pool, Sqlite};

use crate::{
    constants::SHOPPING_LIST_HEADER,
    error::{Error, QueryError},
    jwt::SessionData,
    permissions::ActionType,
    schema::ShoppingListLine,
};

/// Sums ingredient amounts over every recipe in the requester's shopping list,
/// one line per (name, unit), ordered by name.
pub async fn shopping_list(
    session: &SessionData,
    pool: &Pool<Sqlite>,
) -> Result<Vec<ShoppingListLine>, Error> {
    session.authenticate(ActionType::ManageOwnShoppingList)?;

    let rows: Vec<ShoppingListLine> = sqlx::query_as(
        "
        SELECT i.name AS name, i.measurement_unit AS measurement_unit, SUM(ri.amount) AS total_amount
        FROM shopping_list s
        JOIN recipe_ingredients ri ON ri.recipe_id = s.recipe_id
        JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE s.user_id = $1
        GROUP BY i.name, i.measurement_unit
        ORDER BY i.name, i.measurement_unit
        ",
    )
    .bind(session.user_id)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows)
}

pub fn render_shopping_list(lines: &[ShoppingListLine]) -> String {
    let items: String = lines
        .iter()
        .enumerate()
        .map(|(i, line)| {
            format!(
                "{}) {} ({}): {}\n",
                i + 1,
                line.name,
                line.measurement_unit,
                line.total_amount
            )
        })
        .collect();

    format!("{SHOPPING_LIST_HEADER}\n\n{items}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::MeasurementUnit;

    #[test]
    fn renders_numbered_lines() {
        let lines = vec![
            ShoppingListLine {
                name: String::from("flour"),
                measurement_unit: MeasurementUnit::Grams,
                total_amount: 150,
            },
            ShoppingListLine {
                name: String::from("salt"),
                measurement_unit: MeasurementUnit::ToTaste,
                total_amount: 1,
            },
        ];

        assert_eq!(
            render_shopping_list(&lines),
            "Shopping list:\n\n1) flour (г): 150\n2) salt (по вкусу): 1\n"
        );
    }

    #[test]
    fn empty_list_has_only_the_header() {
        assert_eq!(render_shopping_list(&[]), "Shopping list:\n\n");
    }
}
