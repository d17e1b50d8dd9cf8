//! Read-only reference data: tags and ingredients.

use axum::{
    Json,
    extract::State,
    response::IntoResponse,
};
use serde::Deserialize;

use foodgram_db::models::{IngredientRow, TagRow};
use foodgram_types::api::{IngredientResponse, TagResponse};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::extract::{Id, Params};
use crate::with_db;

#[derive(Debug, Deserialize)]
pub struct IngredientQuery {
    pub name: Option<String>,
}

pub async fn list_tags(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let tags = with_db(&state, |db| Ok(db.list_tags()?)).await?;
    Ok(Json(tags.into_iter().map(tag_response).collect::<Vec<_>>()))
}

pub async fn get_tag(
    State(state): State<AppState>,
    Id(tag_id): Id,
) -> Result<impl IntoResponse, ApiError> {
    let tag = with_db(&state, move |db| {
        db.get_tag(tag_id)?
            .ok_or_else(|| ApiError::not_found("tag", tag_id))
    })
    .await?;
    Ok(Json(tag_response(tag)))
}

/// GET /api/ingredients/?name=<prefix>
pub async fn list_ingredients(
    State(state): State<AppState>,
    Params(query): Params<IngredientQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let rows = with_db(&state, |db| Ok(db.list_ingredients()?)).await?;
    let matching = filter_by_prefix(rows, query.name.as_deref());
    Ok(Json(matching.into_iter().map(ingredient_response).collect::<Vec<_>>()))
}

pub async fn get_ingredient(
    State(state): State<AppState>,
    Id(ingredient_id): Id,
) -> Result<impl IntoResponse, ApiError> {
    let ingredient = with_db(&state, move |db| {
        db.get_ingredient(ingredient_id)?
            .ok_or_else(|| ApiError::not_found("ingredient", ingredient_id))
    })
    .await?;
    Ok(Json(ingredient_response(ingredient)))
}

/// Case-insensitive prefix match. Done here rather than in SQL because
/// SQLite only folds ASCII case.
fn filter_by_prefix(rows: Vec<IngredientRow>, prefix: Option<&str>) -> Vec<IngredientRow> {
    let Some(prefix) = prefix.map(str::to_lowercase).filter(|p| !p.is_empty()) else {
        return rows;
    };
    rows.into_iter()
        .filter(|row| row.name.to_lowercase().starts_with(&prefix))
        .collect()
}

pub(crate) fn tag_response(row: TagRow) -> TagResponse {
    TagResponse {
        id: row.id,
        name: row.name,
        color: row.color,
        slug: row.slug,
    }
}

fn ingredient_response(row: IngredientRow) -> IngredientResponse {
    IngredientResponse {
        id: row.id,
        name: row.name,
        measurement_unit: row.measurement_unit,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: i64, name: &str) -> IngredientRow {
        IngredientRow {
            id,
            name: name.to_string(),
            measurement_unit: "g".to_string(),
        }
    }

    #[test]
    fn prefix_filter_ignores_case_beyond_ascii() {
        let rows = vec![row(1, "Соль"), row(2, "сахар"), row(3, "Salt")];

        let matched = filter_by_prefix(rows, Some("со"));
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].id, 1);
    }

    #[test]
    fn empty_prefix_keeps_everything() {
        let rows = vec![row(1, "a"), row(2, "b")];
        assert_eq!(filter_by_prefix(rows, Some("")).len(), 2);
    }
}
