pub const FORBIDDEN_USERNAMES: &[&str] = &["me"];

pub const USERNAME_MAX_LENGTH: usize = 150;
pub const FIRST_NAME_MAX_LENGTH: usize = 150;
pub const LAST_NAME_MAX_LENGTH: usize = 150;
pub const EMAIL_MAX_LENGTH: usize = 254;

pub const TAG_NAME_MAX_LENGTH: usize = 128;
pub const TAG_SLUG_MAX_LENGTH: usize = 32;
pub const INGREDIENT_NAME_MAX_LENGTH: usize = 128;
pub const RECIPE_NAME_MAX_LENGTH: usize = 256;

pub const AMOUNT_MIN: i64 = 1;
pub const AMOUNT_MAX: i64 = 1_000_000;
pub const COOKING_TIME_MIN: i64 = 1;
pub const COOKING_TIME_MAX: i64 = 10_080;

pub const LINK_LENGTH: usize = 8;
pub const LINK_GENERATION_ATTEMPTS: usize = 16;

/// Rows per batched insert/update statement.
pub const BATCH_SIZE: usize = 100;

pub const RECIPES_LIMIT_DEFAULT: i64 = 5;

pub const RECIPE_IMAGE_DIR: &str = "recipes/images";
pub const AVATAR_IMAGE_DIR: &str = "users/images";

pub const MAX_BODY_SIZE: u64 = 16 * 1024 * 1024;

pub const SHOPPING_LIST_HEADER: &str = "Shopping list:";
pub const SHOPPING_LIST_FILENAME: &str = "shopping_cart.txt";
