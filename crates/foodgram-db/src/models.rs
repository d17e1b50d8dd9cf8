//! Database row types. These map directly to SQLite rows and are kept
//! separate from the API types so the storage layer stays independent.

pub struct UserRow {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
    pub created_at: String,
}

pub struct TagRow {
    pub id: i64,
    pub name: String,
    pub color: String,
    pub slug: String,
}

pub struct IngredientRow {
    pub id: i64,
    pub name: String,
    pub measurement_unit: String,
}

pub struct RecipeRow {
    pub id: i64,
    pub author_id: i64,
    pub name: String,
    pub text: String,
    pub cooking_time: i64,
    pub created_at: String,
}

/// An ingredient line joined with its ingredient's name and unit.
pub struct RecipeIngredientRow {
    pub ingredient_id: i64,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i64,
}

pub struct CartEntryRow {
    pub id: i64,
    pub user_id: i64,
    pub recipe_id: i64,
}
