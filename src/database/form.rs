use std::collections::{HashMap, HashSet};

use serde::Deserialize;

use crate::{
    constants::{
        AMOUNT_MAX, AMOUNT_MIN, COOKING_TIME_MAX, COOKING_TIME_MIN, EMAIL_MAX_LENGTH,
        FIRST_NAME_MAX_LENGTH, FORBIDDEN_USERNAMES, INGREDIENT_NAME_MAX_LENGTH,
        LAST_NAME_MAX_LENGTH, RECIPES_LIMIT_DEFAULT, RECIPE_NAME_MAX_LENGTH, TAG_NAME_MAX_LENGTH,
        TAG_SLUG_MAX_LENGTH, USERNAME_MAX_LENGTH,
    },
    media::EncodedImage,
};

use super::{
    error::Error,
    schema::{Id, IngredientAmount, MeasurementUnit},
};

const REQUIRED: &str = "This field is required.";

fn required<T>(field: &str, value: Option<T>) -> Result<T, Error> {
    value.ok_or_else(|| Error::field(field, REQUIRED))
}

fn text(field: &str, value: String, max_length: usize) -> Result<String, Error> {
    let value = value.trim().to_owned();
    if value.is_empty() {
        return Err(Error::field(field, "This field may not be blank."));
    }
    if value.chars().count() > max_length {
        return Err(Error::field(
            field,
            &format!("Ensure this field has no more than {max_length} characters."),
        ));
    }
    Ok(value)
}

fn bounded(field: &str, value: i64, min: i64, max: i64) -> Result<i32, Error> {
    if value < min {
        return Err(Error::field(
            field,
            &format!("Ensure this value is greater than or equal to {min}."),
        ));
    }
    if value > max {
        return Err(Error::field(
            field,
            &format!("Ensure this value is less than or equal to {max}."),
        ));
    }
    // min/max are within i32 for every bounded field.
    i32::try_from(value).map_err(|_| Error::field(field, "Value is out of range."))
}

pub(crate) fn unique_ids<I>(field: &str, ids: I) -> Result<(), Error>
where
    I: IntoIterator<Item = Id>,
{
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(Error::field(field, &format!("Duplicate id {id}; {field} must be unique.")));
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize)]
pub struct IngredientAmountForm {
    pub id: Id,
    pub amount: i64,
}

/// Body of recipe create (POST) and update (PATCH) requests.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecipeForm {
    pub name: Option<String>,
    pub text: Option<String>,
    pub cooking_time: Option<i64>,
    pub image: Option<String>,
    pub tags: Option<Vec<Id>>,
    pub ingredients: Option<Vec<IngredientAmountForm>>,
}

#[derive(Debug, Clone)]
pub struct NewRecipe {
    pub name: String,
    pub text: String,
    pub cooking_time: i32,
    pub image: EncodedImage,
    pub tags: Vec<Id>,
    pub ingredients: Vec<IngredientAmount>,
}

#[derive(Debug, Clone)]
pub struct RecipeChanges {
    pub name: Option<String>,
    pub text: Option<String>,
    pub cooking_time: Option<i32>,
    pub image: Option<EncodedImage>,
    pub tags: Vec<Id>,
    pub ingredients: Vec<IngredientAmount>,
}

impl RecipeForm {
    pub fn validate_new(self) -> Result<NewRecipe, Error> {
        let name = text("name", required("name", self.name)?, RECIPE_NAME_MAX_LENGTH)?;
        let text_value = text("text", required("text", self.text)?, usize::MAX)?;
        let cooking_time = bounded(
            "cooking_time",
            required("cooking_time", self.cooking_time)?,
            COOKING_TIME_MIN,
            COOKING_TIME_MAX,
        )?;
        let image = EncodedImage::parse("image", &required("image", self.image)?)?;
        let tags = validate_tags(self.tags)?;
        let ingredients = validate_ingredients(self.ingredients)?;

        Ok(NewRecipe {
            name,
            text: text_value,
            cooking_time,
            image,
            tags,
            ingredients,
        })
    }

    /// Partial update: tags and ingredients are still required.
    pub fn validate_changes(self) -> Result<RecipeChanges, Error> {
        let name = self
            .name
            .map(|name| text("name", name, RECIPE_NAME_MAX_LENGTH))
            .transpose()?;
        let text_value = self
            .text
            .map(|value| text("text", value, usize::MAX))
            .transpose()?;
        let cooking_time = self
            .cooking_time
            .map(|value| bounded("cooking_time", value, COOKING_TIME_MIN, COOKING_TIME_MAX))
            .transpose()?;
        let image = self
            .image
            .map(|data| EncodedImage::parse("image", &data))
            .transpose()?;
        let tags = validate_tags(self.tags)?;
        let ingredients = validate_ingredients(self.ingredients)?;

        Ok(RecipeChanges {
            name,
            text: text_value,
            cooking_time,
            image,
            tags,
            ingredients,
        })
    }
}

pub fn validate_tags(tags: Option<Vec<Id>>) -> Result<Vec<Id>, Error> {
    let tags = required("tags", tags)?;
    if tags.is_empty() {
        return Err(Error::field("tags", "At least one tag is required."));
    }
    unique_ids("tags", tags.iter().copied())?;

    Ok(tags)
}

pub fn validate_ingredients(
    ingredients: Option<Vec<IngredientAmountForm>>,
) -> Result<Vec<IngredientAmount>, Error> {
    let ingredients = required("ingredients", ingredients)?;
    if ingredients.is_empty() {
        return Err(Error::field(
            "ingredients",
            "At least one ingredient is required.",
        ));
    }
    unique_ids("ingredients", ingredients.iter().map(|part| part.id))?;

    ingredients
        .into_iter()
        .map(|part| {
            Ok(IngredientAmount {
                id: part.id,
                amount: bounded("ingredients", part.amount, AMOUNT_MIN, AMOUNT_MAX)?,
            })
        })
        .collect()
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegistrationForm {
    pub email: Option<String>,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

impl RegistrationForm {
    pub fn validate(self) -> Result<NewUser, Error> {
        let email = validate_email(required("email", self.email)?)?;
        let username = validate_username(required("username", self.username)?)?;
        let first_name = text(
            "first_name",
            required("first_name", self.first_name)?,
            FIRST_NAME_MAX_LENGTH,
        )?;
        let last_name = text(
            "last_name",
            required("last_name", self.last_name)?,
            LAST_NAME_MAX_LENGTH,
        )?;
        let password = required("password", self.password)?;
        if password.is_empty() {
            return Err(Error::field("password", "This field may not be blank."));
        }

        Ok(NewUser {
            email,
            username,
            first_name,
            last_name,
            password,
        })
    }
}

pub fn validate_email(email: String) -> Result<String, Error> {
    let email = text("email", email, EMAIL_MAX_LENGTH)?;
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };

    if !valid {
        return Err(Error::field("email", "Enter a valid email address."));
    }
    Ok(email)
}

pub fn validate_username(username: String) -> Result<String, Error> {
    let username = text("username", username, USERNAME_MAX_LENGTH)?;

    if !username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '.' | '@' | '+' | '-' | '_'))
    {
        return Err(Error::field(
            "username",
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
        ));
    }

    if FORBIDDEN_USERNAMES.contains(&username.to_lowercase().as_str()) {
        return Err(Error::field(
            "username",
            &format!("Username {username} is forbidden."),
        ));
    }

    Ok(username)
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PasswordForm {
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

impl PasswordForm {
    pub fn validate(self) -> Result<(String, String), Error> {
        let current = required("current_password", self.current_password)?;
        let new = required("new_password", self.new_password)?;
        if new.is_empty() {
            return Err(Error::field("new_password", "This field may not be blank."));
        }
        Ok((current, new))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AvatarForm {
    pub avatar: Option<String>,
}

impl AvatarForm {
    pub fn validate(self) -> Result<EncodedImage, Error> {
        EncodedImage::parse("avatar", &required("avatar", self.avatar)?)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TagForm {
    pub name: Option<String>,
    pub slug: Option<String>,
}

impl TagForm {
    pub fn validate(self) -> Result<(String, String), Error> {
        let name = text("name", required("name", self.name)?, TAG_NAME_MAX_LENGTH)?;
        let slug = text("slug", required("slug", self.slug)?, TAG_SLUG_MAX_LENGTH)?;

        if !slug
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(Error::field(
                "slug",
                "Enter a valid slug consisting of letters, numbers, underscores or hyphens.",
            ));
        }

        Ok((name, slug))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IngredientForm {
    pub name: Option<String>,
    pub measurement_unit: Option<String>,
}

impl IngredientForm {
    pub fn validate(self) -> Result<(String, MeasurementUnit), Error> {
        let name = text(
            "name",
            required("name", self.name)?,
            INGREDIENT_NAME_MAX_LENGTH,
        )?;
        let unit = required("measurement_unit", self.measurement_unit)?.parse()?;

        Ok((name, unit))
    }
}

/// Listing filters parsed from `author`, repeated `tags`, `is_favorited`, `is_in_shopping_cart`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeFilter {
    pub author: Option<Id>,
    pub tags: Vec<String>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
}

fn flag(field: &str, value: &str) -> Result<bool, Error> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" => Ok(true),
        "0" | "false" | "" => Ok(false),
        _ => Err(Error::field(field, "Must be a valid boolean.")),
    }
}

impl RecipeFilter {
    pub fn from_query(pairs: &[(String, String)]) -> Result<Self, Error> {
        let mut filter = RecipeFilter::default();

        for (key, value) in pairs {
            match key.as_str() {
                "author" => {
                    let author = value
                        .parse()
                        .map_err(|_| Error::field("author", "Enter a number."))?;
                    filter.author = Some(author);
                }
                "tags" => filter.tags.push(value.to_owned()),
                "is_favorited" => filter.is_favorited = flag("is_favorited", value)?,
                "is_in_shopping_cart" => {
                    filter.is_in_shopping_cart = flag("is_in_shopping_cart", value)?
                }
                _ => {}
            }
        }

        Ok(filter)
    }
}

/// Preview size for subscription listings; bad values fall back to the default.
pub fn recipes_limit(query: &HashMap<String, String>) -> i64 {
    query
        .get("recipes_limit")
        .and_then(|value| value.parse::<i64>().ok())
        .filter(|limit| *limit >= 0)
        .unwrap_or(RECIPES_LIMIT_DEFAULT)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PIXEL: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

    fn part(id: Id, amount: i64) -> IngredientAmountForm {
        IngredientAmountForm { id, amount }
    }

    fn recipe_form() -> RecipeForm {
        RecipeForm {
            name: Some(String::from("Pancakes")),
            text: Some(String::from("Mix and fry.")),
            cooking_time: Some(20),
            image: Some(String::from(PIXEL)),
            tags: Some(vec![1, 2]),
            ingredients: Some(vec![part(1, 200), part(2, 3)]),
        }
    }

    fn field_of(error: Error) -> String {
        error.field.unwrap_or_default()
    }

    #[test]
    fn accepts_a_complete_recipe() {
        let recipe = recipe_form().validate_new().unwrap();

        assert_eq!(recipe.name, "Pancakes");
        assert_eq!(recipe.cooking_time, 20);
        assert_eq!(recipe.tags, vec![1, 2]);
        assert_eq!(
            recipe.ingredients,
            vec![
                IngredientAmount { id: 1, amount: 200 },
                IngredientAmount { id: 2, amount: 3 }
            ]
        );
    }

    #[test]
    fn rejects_duplicate_ingredients() {
        let form = RecipeForm {
            ingredients: Some(vec![part(1, 200), part(1, 100)]),
            ..recipe_form()
        };

        assert_eq!(field_of(form.validate_new().unwrap_err()), "ingredients");
    }

    #[test]
    fn rejects_empty_or_missing_ingredients() {
        let empty = RecipeForm {
            ingredients: Some(vec![]),
            ..recipe_form()
        };
        let missing = RecipeForm {
            ingredients: None,
            ..recipe_form()
        };

        assert_eq!(field_of(empty.validate_changes().unwrap_err()), "ingredients");
        assert_eq!(field_of(missing.validate_changes().unwrap_err()), "ingredients");
    }

    #[test]
    fn rejects_out_of_range_amounts() {
        for amount in [0, 1_000_001, -5] {
            let form = RecipeForm {
                ingredients: Some(vec![part(1, amount)]),
                ..recipe_form()
            };
            assert_eq!(field_of(form.validate_new().unwrap_err()), "ingredients");
        }

        let edge = RecipeForm {
            ingredients: Some(vec![part(1, 1), part(2, 1_000_000)]),
            ..recipe_form()
        };
        assert!(edge.validate_new().is_ok());
    }

    #[test]
    fn rejects_out_of_range_cooking_time() {
        for cooking_time in [0, 10_081] {
            let form = RecipeForm {
                cooking_time: Some(cooking_time),
                ..recipe_form()
            };
            assert_eq!(field_of(form.validate_new().unwrap_err()), "cooking_time");
        }
    }

    #[test]
    fn rejects_duplicate_or_empty_tags() {
        let duplicate = RecipeForm {
            tags: Some(vec![3, 3]),
            ..recipe_form()
        };
        let empty = RecipeForm {
            tags: Some(vec![]),
            ..recipe_form()
        };

        assert_eq!(field_of(duplicate.validate_new().unwrap_err()), "tags");
        assert_eq!(field_of(empty.validate_new().unwrap_err()), "tags");
    }

    #[test]
    fn create_requires_every_field() {
        let form = RecipeForm {
            image: None,
            ..recipe_form()
        };
        let error = form.validate_new().unwrap_err();

        assert_eq!(error.field.as_deref(), Some("image"));
        assert_eq!(error.info, REQUIRED);
    }

    #[test]
    fn update_allows_partial_fields() {
        let form = RecipeForm {
            name: None,
            text: None,
            cooking_time: None,
            image: None,
            ..recipe_form()
        };
        let changes = form.validate_changes().unwrap();

        assert!(changes.name.is_none());
        assert!(changes.image.is_none());
        assert_eq!(changes.ingredients.len(), 2);
    }

    #[test]
    fn forbidden_usernames() {
        for name in ["me", "Me", "ME"] {
            let error = validate_username(String::from(name)).unwrap_err();
            assert_eq!(field_of(error), "username");
        }

        assert!(validate_username(String::from("mellow")).is_ok());
        assert!(validate_username(String::from("bad name")).is_err());
        assert!(validate_username(String::from("повар.42")).is_ok());
    }

    #[test]
    fn emails() {
        assert!(validate_email(String::from("cook@example.com")).is_ok());
        for email in ["cook", "cook@", "@example.com", "cook@example", "co ok@example.com"] {
            assert!(validate_email(String::from(email)).is_err(), "{email}");
        }
    }

    #[test]
    fn recipe_filter_from_query() {
        let pairs = vec![
            (String::from("author"), String::from("3")),
            (String::from("tags"), String::from("breakfast")),
            (String::from("tags"), String::from("lunch")),
            (String::from("is_favorited"), String::from("1")),
            (String::from("limit"), String::from("6")),
        ];
        let filter = RecipeFilter::from_query(&pairs).unwrap();

        assert_eq!(
            filter,
            RecipeFilter {
                author: Some(3),
                tags: vec![String::from("breakfast"), String::from("lunch")],
                is_favorited: true,
                is_in_shopping_cart: false,
            }
        );
        assert!(RecipeFilter::from_query(&[(String::from("author"), String::from("x"))]).is_err());
    }

    #[test]
    fn recipes_limit_falls_back_to_default() {
        let mut query = HashMap::new();
        assert_eq!(recipes_limit(&query), RECIPES_LIMIT_DEFAULT);

        query.insert(String::from("recipes_limit"), String::from("2"));
        assert_eq!(recipes_limit(&query), 2);

        query.insert(String::from("recipes_limit"), String::from("many"));
        assert_eq!(recipes_limit(&query), RECIPES_LIMIT_DEFAULT);

        query.insert(String::from("recipes_limit"), String::from("-1"));
        assert_eq!(recipes_limit(&query), RECIPES_LIMIT_DEFAULT);
    }

    #[test]
    fn ingredient_units_must_be_known() {
        let form = IngredientForm {
            name: Some(String::from("salt")),
            measurement_unit: Some(String::from("kg")),
        };
        assert_eq!(field_of(form.validate().unwrap_err()), "measurement_unit");

        let form = IngredientForm {
            name: Some(String::from("salt")),
            measurement_unit: Some(String::from("по вкусу")),
        };
        assert_eq!(form.validate().unwrap().1, MeasurementUnit::ToTaste);
    }
}
