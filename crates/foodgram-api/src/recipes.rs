use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::{info, warn};

use foodgram_db::recipes::{NewRecipe, RecipeChanges, RecipeFilter};
use foodgram_db::{Database, EdgeTable, models::RecipeRow};
use foodgram_types::api::{
    IngredientAmount, RecipeIngredientResponse, RecipeResponse, RecipeSummary, RecipeWriteRequest,
};

use crate::auth::AppState;
use crate::catalog::tag_response;
use crate::error::ApiError;
use crate::extract::{Id, Params, Payload};
use crate::middleware::Actor;
use crate::users::user_profile;
use crate::validation::check_recipe;
use crate::with_db;

#[derive(Debug, Default, Deserialize)]
pub struct RecipeQuery {
    pub author: Option<i64>,
    pub tags: Option<String>,
    pub is_favorited: Option<u8>,
    pub is_in_shopping_cart: Option<u8>,
}

impl RecipeQuery {
    /// Favourite and cart filters only mean something for a signed-in user;
    /// for anonymous callers they are ignored.
    fn into_filter(self, viewer: Option<i64>) -> RecipeFilter {
        let scoped = |flag: Option<u8>| viewer.filter(|_| flag == Some(1));
        RecipeFilter {
            author_id: self.author,
            tag_slug: self.tags.filter(|slug| !slug.is_empty()),
            favourited_by: scoped(self.is_favorited),
            in_cart_of: scoped(self.is_in_shopping_cart),
        }
    }
}

/// GET /api/recipes/
pub async fn list_recipes(
    State(state): State<AppState>,
    actor: Actor,
    Params(query): Params<RecipeQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let viewer = actor.user_id();
    let filter = query.into_filter(viewer);

    let recipes = with_db(&state, move |db| {
        db.list_recipes(&filter)?
            .into_iter()
            .map(|row| recipe_response(db, viewer, row))
            .collect::<Result<Vec<_>, _>>()
    })
    .await?;

    Ok(Json(recipes))
}

/// GET /api/recipes/{id}/
pub async fn get_recipe(
    State(state): State<AppState>,
    Id(recipe_id): Id,
    actor: Actor,
) -> Result<impl IntoResponse, ApiError> {
    let viewer = actor.user_id();
    let recipe = with_db(&state, move |db| {
        let row = load_recipe(db, recipe_id)?;
        recipe_response(db, viewer, row)
    })
    .await?;
    Ok(Json(recipe))
}

/// POST /api/recipes/
pub async fn create_recipe(
    State(state): State<AppState>,
    actor: Actor,
    Payload(req): Payload<RecipeWriteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let author_id = actor.require()?.sub;
    check_recipe(&req, false)?;

    let recipe = with_db(&state, move |db| {
        let ingredients = req.ingredients.unwrap_or_default();
        ensure_ingredients_exist(db, &ingredients)?;

        let id = db.create_recipe(&NewRecipe {
            author_id,
            name: req.name.unwrap_or_default(),
            text: req.text.unwrap_or_default(),
            cooking_time: req.cooking_time.unwrap_or_default(),
            ingredients,
            tags: req.tags.unwrap_or_default(),
        })?;
        let row = load_recipe(db, id)?;
        recipe_response(db, Some(author_id), row)
    })
    .await?;

    info!("Recipe {} created by user {}", recipe.id, author_id);
    Ok((StatusCode::CREATED, Json(recipe)))
}

/// PATCH /api/recipes/{id}/
pub async fn update_recipe(
    State(state): State<AppState>,
    Id(recipe_id): Id,
    actor: Actor,
    Payload(req): Payload<RecipeWriteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = actor.require()?.sub;
    check_recipe(&req, true)?;

    let recipe = with_db(&state, move |db| {
        let row = load_recipe(db, recipe_id)?;
        ensure_author(&row, user_id)?;
        if let Some(ingredients) = &req.ingredients {
            ensure_ingredients_exist(db, ingredients)?;
        }

        let changes = RecipeChanges {
            name: req.name,
            text: req.text,
            cooking_time: req.cooking_time,
            ingredients: req.ingredients,
            tags: req.tags,
        };
        if !db.update_recipe(recipe_id, &changes)? {
            return Err(ApiError::not_found("recipe", recipe_id));
        }
        let row = load_recipe(db, recipe_id)?;
        recipe_response(db, Some(user_id), row)
    })
    .await?;

    info!("Recipe {} updated by user {}", recipe_id, user_id);
    Ok(Json(recipe))
}

/// DELETE /api/recipes/{id}/
pub async fn delete_recipe(
    State(state): State<AppState>,
    Id(recipe_id): Id,
    actor: Actor,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = actor.require()?.sub;

    with_db(&state, move |db| {
        let row = load_recipe(db, recipe_id)?;
        ensure_author(&row, user_id)?;
        db.delete_recipe(recipe_id)?;
        Ok(())
    })
    .await?;

    info!("Recipe {} deleted by user {}", recipe_id, user_id);
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) fn load_recipe(db: &Database, recipe_id: i64) -> Result<RecipeRow, ApiError> {
    db.get_recipe(recipe_id)?
        .ok_or_else(|| ApiError::not_found("recipe", recipe_id))
}

fn ensure_author(row: &RecipeRow, user_id: i64) -> Result<(), ApiError> {
    if row.author_id != user_id {
        warn!("User {} tried to modify recipe {} owned by {}", user_id, row.id, row.author_id);
        return Err(ApiError::PermissionDenied(
            "Only the author may change this recipe.".into(),
        ));
    }
    Ok(())
}

fn ensure_ingredients_exist(db: &Database, lines: &[IngredientAmount]) -> Result<(), ApiError> {
    let ids: Vec<i64> = lines.iter().map(|line| line.id).collect();
    match db.missing_ingredients(&ids)?.first() {
        Some(missing) => Err(ApiError::not_found("ingredient", missing)),
        None => Ok(()),
    }
}

/// Full representation of a recipe as seen by `viewer`.
pub(crate) fn recipe_response(
    db: &Database,
    viewer: Option<i64>,
    row: RecipeRow,
) -> Result<RecipeResponse, ApiError> {
    let author = db
        .get_user_by_id(row.author_id)?
        .ok_or_else(|| ApiError::not_found("user", row.author_id))?;

    let (is_favorited, is_in_shopping_cart) = match viewer {
        Some(viewer) => (
            db.edge_exists(EdgeTable::FAVOURITES, viewer, row.id)?,
            db.edge_exists(EdgeTable::CARTS, viewer, row.id)?,
        ),
        None => (false, false),
    };

    let ingredients = db
        .recipe_ingredients(row.id)?
        .into_iter()
        .map(|line| RecipeIngredientResponse {
            id: line.ingredient_id,
            name: line.name,
            measurement_unit: line.measurement_unit,
            amount: line.amount,
        })
        .collect();

    Ok(RecipeResponse {
        id: row.id,
        tags: db.recipe_tags(row.id)?.into_iter().map(tag_response).collect(),
        author: user_profile(db, viewer, &author)?,
        ingredients,
        is_favorited,
        is_in_shopping_cart,
        name: row.name,
        text: row.text,
        cooking_time: row.cooking_time,
    })
}

pub(crate) fn summary(row: &RecipeRow) -> RecipeSummary {
    RecipeSummary {
        id: row.id,
        name: row.name.clone(),
        cooking_time: row.cooking_time,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn membership_filters_need_a_signed_in_viewer() {
        let query = RecipeQuery {
            is_favorited: Some(1),
            is_in_shopping_cart: Some(1),
            ..Default::default()
        };
        let filter = query.into_filter(None);
        assert!(filter.favourited_by.is_none());
        assert!(filter.in_cart_of.is_none());

        let query = RecipeQuery {
            is_favorited: Some(1),
            is_in_shopping_cart: Some(0),
            tags: Some("breakfast".into()),
            ..Default::default()
        };
        let filter = query.into_filter(Some(7));
        assert_eq!(filter.favourited_by, Some(7));
        assert!(filter.in_cart_of.is_none());
        assert_eq!(filter.tag_slug.as_deref(), Some("breakfast"));
    }

    #[test]
    fn only_the_author_may_edit() {
        let row = RecipeRow {
            id: 1,
            author_id: 10,
            name: "Soup".into(),
            text: "Boil.".into(),
            cooking_time: 5,
            created_at: "2024-01-01 00:00:00".into(),
        };
        assert!(ensure_author(&row, 10).is_ok());
        assert!(matches!(ensure_author(&row, 11), Err(ApiError::PermissionDenied(_))));
    }
}
