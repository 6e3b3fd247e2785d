use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::Error;

pub type Id = i64;

#[derive(
    Clone, Copy, Debug, PartialEq, PartialOrd, sqlx::Type, Serialize, Eq, Ord, Hash, Deserialize,
)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    User,
    Admin,
}

#[derive(
    Clone, Copy, Debug, PartialEq, PartialOrd, sqlx::Type, Serialize, Eq, Ord, Hash, Deserialize,
)]
pub enum MeasurementUnit {
    #[sqlx(rename = "г")]
    #[serde(rename = "г")]
    Grams,
    #[sqlx(rename = "мл")]
    #[serde(rename = "мл")]
    Milliliters,
    #[sqlx(rename = "шт.")]
    #[serde(rename = "шт.")]
    Pieces,
    #[sqlx(rename = "ч. л.")]
    #[serde(rename = "ч. л.")]
    Teaspoon,
    #[sqlx(rename = "ст. л.")]
    #[serde(rename = "ст. л.")]
    Tablespoon,
    #[sqlx(rename = "щепотка")]
    #[serde(rename = "щепотка")]
    Pinch,
    #[sqlx(rename = "капля")]
    #[serde(rename = "капля")]
    Drop,
    #[sqlx(rename = "стакан")]
    #[serde(rename = "стакан")]
    Cup,
    #[sqlx(rename = "банка")]
    #[serde(rename = "банка")]
    Jar,
    #[sqlx(rename = "по вкусу")]
    #[serde(rename = "по вкусу")]
    ToTaste,
}

impl MeasurementUnit {
    pub const ALL: [MeasurementUnit; 10] = [
        MeasurementUnit::Grams,
        MeasurementUnit::Milliliters,
        MeasurementUnit::Pieces,
        MeasurementUnit::Teaspoon,
        MeasurementUnit::Tablespoon,
        MeasurementUnit::Pinch,
        MeasurementUnit::Drop,
        MeasurementUnit::Cup,
        MeasurementUnit::Jar,
        MeasurementUnit::ToTaste,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MeasurementUnit::Grams => "г",
            MeasurementUnit::Milliliters => "мл",
            MeasurementUnit::Pieces => "шт.",
            MeasurementUnit::Teaspoon => "ч. л.",
            MeasurementUnit::Tablespoon => "ст. л.",
            MeasurementUnit::Pinch => "щепотка",
            MeasurementUnit::Drop => "капля",
            MeasurementUnit::Cup => "стакан",
            MeasurementUnit::Jar => "банка",
            MeasurementUnit::ToTaste => "по вкусу",
        }
    }
}

impl fmt::Display for MeasurementUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MeasurementUnit {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        MeasurementUnit::ALL
            .into_iter()
            .find(|unit| unit.as_str() == value)
            .ok_or_else(|| {
                Error::field(
                    "measurement_unit",
                    &format!("\"{value}\" is not a valid choice."),
                )
            })
    }
}

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct User {
    pub id: Id,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
    pub role: UserRole,
    pub avatar: Option<String>,
}

#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tag {
    pub id: Id,
    pub name: String,
    pub slug: String,
}

#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ingredient {
    pub id: Id,
    pub name: String,
    pub measurement_unit: MeasurementUnit,
}

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct Recipe {
    pub id: Id,
    pub author_id: Id,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
    pub link: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A stored (recipe, ingredient, amount) join row.
#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Eq)]
pub struct RecipeIngredient {
    pub id: Id,
    pub recipe_id: Id,
    pub ingredient_id: Id,
    pub amount: i32,
}

/// Join row expanded with the ingredient it points to.
#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecipeIngredientRow {
    pub id: Id,
    pub name: String,
    pub measurement_unit: MeasurementUnit,
    pub amount: i32,
}

/// Submitted (ingredient, amount) pair after validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IngredientAmount {
    pub id: Id,
    pub amount: i32,
}

/// Shape shared by favorites and shopping list entries.
#[derive(sqlx::FromRow, Debug, Clone)]
pub struct UserRecipeLink {
    pub user_id: Id,
    pub recipe_id: Id,
    pub created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct Subscription {
    pub subscriber_id: Id,
    pub user_id: Id,
    pub created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShoppingListLine {
    pub name: String,
    pub measurement_unit: MeasurementUnit,
    pub total_amount: i64,
}
