//! Shopping list: the ingredients of every carted recipe, summed per
//! ingredient and rendered as a downloadable document.

use std::collections::HashMap;

use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
};
use tracing::info;

use foodgram_db::Database;
use foodgram_db::models::RecipeIngredientRow;
use foodgram_types::models::ShoppingItem;

use crate::auth::AppState;
use crate::error::ApiError;
use crate::middleware::Actor;
use crate::with_db;

/// Sums ingredient lines into one item per ingredient.
///
/// Items come out in first-encounter order. Two lines are the same ingredient
/// when name and unit both match, so "salt, g" and "salt, pinch" stay apart.
/// A total that no longer fits in an `i64` is a validation error.
pub fn aggregate<I>(lines: I) -> Result<Vec<ShoppingItem>, ApiError>
where
    I: IntoIterator<Item = RecipeIngredientRow>,
{
    let mut items: Vec<ShoppingItem> = Vec::new();
    let mut index: HashMap<(String, String), usize> = HashMap::new();

    for line in lines {
        let key = (line.name, line.measurement_unit);
        match index.get(&key) {
            Some(&at) => {
                let item = &mut items[at];
                item.amount = item.amount.checked_add(line.amount).ok_or_else(|| {
                    ApiError::validation(format!(
                        "Total amount of {} ({}) is too large.",
                        item.name, item.measurement_unit
                    ))
                })?;
            }
            None => {
                index.insert(key.clone(), items.len());
                items.push(ShoppingItem {
                    name: key.0,
                    measurement_unit: key.1,
                    amount: line.amount,
                });
            }
        }
    }
    Ok(items)
}

/// The aggregated shopping list of `user_id`, walking the cart in the order
/// recipes were added. Read-only.
pub fn shopping_list(db: &Database, user_id: i64) -> Result<Vec<ShoppingItem>, ApiError> {
    db.get_user_by_id(user_id)?
        .ok_or_else(|| ApiError::not_found("user", user_id))?;

    let mut lines = Vec::new();
    for entry in db.cart_entries(user_id)? {
        lines.extend(db.recipe_ingredients(entry.recipe_id)?);
    }
    aggregate(lines)
}

/// A rendered file ready to be served as an attachment.
pub struct Document {
    pub content_type: &'static str,
    pub file_name: &'static str,
    pub bytes: Vec<u8>,
}

/// Turns a shopping list into a document. `header` is the owner's username.
pub trait DocumentRenderer {
    fn render(&self, header: &str, items: &[ShoppingItem]) -> Document;
}

/// One `name (unit) - amount` line per item under a title line.
pub struct TextRenderer;

impl DocumentRenderer for TextRenderer {
    fn render(&self, header: &str, items: &[ShoppingItem]) -> Document {
        let mut body = format!("Shopping list for {header}\n\n");
        for item in items {
            body.push_str(&format!(
                "{} ({}) - {}\n",
                item.name, item.measurement_unit, item.amount
            ));
        }

        Document {
            content_type: "text/plain; charset=utf-8",
            file_name: "shopping_list.txt",
            bytes: body.into_bytes(),
        }
    }
}

/// GET /api/recipes/download_shopping_cart/
pub async fn download_shopping_cart(
    State(state): State<AppState>,
    actor: Actor,
) -> Result<impl IntoResponse, ApiError> {
    let claims = actor.require()?.clone();
    let user_id = claims.sub;

    let items = with_db(&state, move |db| shopping_list(db, user_id)).await?;
    info!("Shopping list for user {}: {} items", user_id, items.len());

    let document = TextRenderer.render(&claims.username, &items);
    let disposition = format!("attachment; filename=\"{}\"", document.file_name);

    Ok((
        [
            (header::CONTENT_TYPE, document.content_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        document.bytes,
    ))
}
