use anyhow::Result;
use rusqlite::types::Value;
use rusqlite::{Connection, Row};
use tracing::debug;

use foodgram_types::api::IngredientAmount;

use crate::models::{CartEntryRow, RecipeIngredientRow, RecipeRow, TagRow};
use crate::queries::map_tag;
use crate::{Database, OptionalExt};

const RECIPE_COLUMNS: &str = "r.id, r.author_id, r.name, r.text, r.cooking_time, r.created_at";

pub struct NewRecipe {
    pub author_id: i64,
    pub name: String,
    pub text: String,
    pub cooking_time: i64,
    pub ingredients: Vec<IngredientAmount>,
    pub tags: Vec<i64>,
}

/// Partial update. `None` leaves the stored value untouched; a provided
/// ingredient or tag list replaces the old one entirely.
#[derive(Default)]
pub struct RecipeChanges {
    pub name: Option<String>,
    pub text: Option<String>,
    pub cooking_time: Option<i64>,
    pub ingredients: Option<Vec<IngredientAmount>>,
    pub tags: Option<Vec<i64>>,
}

/// Recipe list filters. Favourite and cart filters are scoped to one user.
#[derive(Debug, Default)]
pub struct RecipeFilter {
    pub author_id: Option<i64>,
    pub tag_slug: Option<String>,
    pub favourited_by: Option<i64>,
    pub in_cart_of: Option<i64>,
}

impl Database {
    /// Writes the recipe, its ingredient lines and tag links in one
    /// transaction. Unknown tag ids are skipped.
    pub fn create_recipe(&self, recipe: &NewRecipe) -> Result<i64> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO recipes (author_id, name, text, cooking_time) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![recipe.author_id, recipe.name, recipe.text, recipe.cooking_time],
            )?;
            let id = tx.last_insert_rowid();
            insert_lines(&tx, id, &recipe.ingredients)?;
            insert_tags(&tx, id, &recipe.tags)?;
            tx.commit()?;
            Ok(id)
        })
    }

    /// Returns `false` if the recipe does not exist.
    pub fn update_recipe(&self, id: i64, changes: &RecipeChanges) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let changed = tx.execute(
                "UPDATE recipes SET
                    name = COALESCE(?1, name),
                    text = COALESCE(?2, text),
                    cooking_time = COALESCE(?3, cooking_time)
                 WHERE id = ?4",
                rusqlite::params![changes.name, changes.text, changes.cooking_time, id],
            )?;
            if changed == 0 {
                return Ok(false);
            }

            if let Some(lines) = &changes.ingredients {
                tx.execute("DELETE FROM recipe_ingredients WHERE recipe_id = ?1", [id])?;
                insert_lines(&tx, id, lines)?;
            }
            if let Some(tags) = &changes.tags {
                tx.execute("DELETE FROM recipe_tags WHERE recipe_id = ?1", [id])?;
                insert_tags(&tx, id, tags)?;
            }
            tx.commit()?;
            Ok(true)
        })
    }

    /// Deletes the recipe; lines, tag links, favourites and cart entries
    /// go with it through `ON DELETE CASCADE`.
    pub fn delete_recipe(&self, id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM recipes WHERE id = ?1", [id])?;
            Ok(changed > 0)
        })
    }

    pub fn get_recipe(&self, id: i64) -> Result<Option<RecipeRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {RECIPE_COLUMNS} FROM recipes r WHERE r.id = ?1"),
                [id],
                map_recipe,
            )
            .optional()
        })
    }

    /// Recipes matching `filter`, newest first.
    pub fn list_recipes(&self, filter: &RecipeFilter) -> Result<Vec<RecipeRow>> {
        let mut sql = format!("SELECT {RECIPE_COLUMNS} FROM recipes r WHERE 1 = 1");
        let mut params: Vec<Value> = Vec::new();

        if let Some(author_id) = filter.author_id {
            params.push(Value::Integer(author_id));
            sql.push_str(&format!(" AND r.author_id = ?{}", params.len()));
        }
        if let Some(slug) = &filter.tag_slug {
            params.push(Value::Text(slug.clone()));
            sql.push_str(&format!(
                " AND EXISTS (SELECT 1 FROM recipe_tags rt JOIN tags t ON t.id = rt.tag_id
                   WHERE rt.recipe_id = r.id AND t.slug = ?{})",
                params.len()
            ));
        }
        if let Some(user_id) = filter.favourited_by {
            params.push(Value::Integer(user_id));
            sql.push_str(&format!(
                " AND EXISTS (SELECT 1 FROM favourites f WHERE f.recipe_id = r.id AND f.user_id = ?{})",
                params.len()
            ));
        }
        if let Some(user_id) = filter.in_cart_of {
            params.push(Value::Integer(user_id));
            sql.push_str(&format!(
                " AND EXISTS (SELECT 1 FROM carts c WHERE c.recipe_id = r.id AND c.user_id = ?{})",
                params.len()
            ));
        }
        sql.push_str(" ORDER BY r.created_at DESC, r.id DESC");
        debug!(?filter, "Listing recipes");

        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params_from_iter(params), map_recipe)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Recipes by one author, newest first. `limit` of `None` returns all.
    pub fn recipes_by_author(&self, author_id: i64, limit: Option<i64>) -> Result<Vec<RecipeRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {RECIPE_COLUMNS} FROM recipes r
                 WHERE r.author_id = ?1
                 ORDER BY r.created_at DESC, r.id DESC
                 LIMIT ?2"
            ))?;
            // SQLite treats a negative LIMIT as unbounded.
            let rows = stmt
                .query_map(rusqlite::params![author_id, limit.unwrap_or(-1)], map_recipe)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn count_recipes_by_author(&self, author_id: i64) -> Result<i64> {
        self.with_conn(|conn| {
            let count = conn.query_row(
                "SELECT COUNT(*) FROM recipes WHERE author_id = ?1",
                [author_id],
                |row| row.get(0),
            )?;
            Ok(count)
        })
    }

    /// Ingredient lines of a recipe in the order they were submitted.
    pub fn recipe_ingredients(&self, recipe_id: i64) -> Result<Vec<RecipeIngredientRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT i.id, i.name, i.measurement_unit, ri.amount
                 FROM recipe_ingredients ri
                 JOIN ingredients i ON i.id = ri.ingredient_id
                 WHERE ri.recipe_id = ?1
                 ORDER BY ri.id",
            )?;
            let rows = stmt
                .query_map([recipe_id], |row| {
                    Ok(RecipeIngredientRow {
                        ingredient_id: row.get(0)?,
                        name: row.get(1)?,
                        measurement_unit: row.get(2)?,
                        amount: row.get(3)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn recipe_tags(&self, recipe_id: i64) -> Result<Vec<TagRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT t.id, t.name, t.color, t.slug
                 FROM recipe_tags rt
                 JOIN tags t ON t.id = rt.tag_id
                 WHERE rt.recipe_id = ?1
                 ORDER BY t.id",
            )?;
            let rows = stmt
                .query_map([recipe_id], map_tag)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// A user's cart, in the order recipes were added.
    pub fn cart_entries(&self, user_id: i64) -> Result<Vec<CartEntryRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare("SELECT id, user_id, recipe_id FROM carts WHERE user_id = ?1 ORDER BY id")?;
            let rows = stmt
                .query_map([user_id], |row| {
                    Ok(CartEntryRow {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        recipe_id: row.get(2)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn insert_lines(conn: &Connection, recipe_id: i64, lines: &[IngredientAmount]) -> Result<()> {
    let mut stmt = conn.prepare(
        "INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount) VALUES (?1, ?2, ?3)",
    )?;
    for line in lines {
        stmt.execute(rusqlite::params![recipe_id, line.id, line.amount])?;
    }
    Ok(())
}

fn insert_tags(conn: &Connection, recipe_id: i64, tags: &[i64]) -> Result<()> {
    let mut stmt = conn.prepare(
        "INSERT OR IGNORE INTO recipe_tags (recipe_id, tag_id) SELECT ?1, id FROM tags WHERE id = ?2",
    )?;
    for tag_id in tags {
        stmt.execute([recipe_id, *tag_id])?;
    }
    Ok(())
}

fn map_recipe(row: &Row<'_>) -> rusqlite::Result<RecipeRow> {
    Ok(RecipeRow {
        id: row.get(0)?,
        author_id: row.get(1)?,
        name: row.get(2)?,
        text: row.get(3)?,
        cooking_time: row.get(4)?,
        created_at: row.get(5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EdgeTable;
    use crate::queries::tests::user;

    fn ingredient(db: &Database, name: &str) -> i64 {
        db.insert_ingredient(name, "g").unwrap();
        db.list_ingredients()
            .unwrap()
            .into_iter()
            .find(|i| i.name == name)
            .unwrap()
            .id
    }

    fn recipe(db: &Database, author_id: i64, name: &str, lines: &[(i64, i64)]) -> i64 {
        db.create_recipe(&NewRecipe {
            author_id,
            name: name.to_string(),
            text: "Cook it.".to_string(),
            cooking_time: 10,
            ingredients: lines
                .iter()
                .map(|&(id, amount)| IngredientAmount { id, amount })
                .collect(),
            tags: vec![],
        })
        .unwrap()
    }

    #[test]
    fn create_keeps_line_order_and_skips_unknown_tags() {
        let db = Database::open_in_memory().unwrap();
        let author = user(&db, "chef");
        let salt = ingredient(&db, "salt");
        let pepper = ingredient(&db, "pepper");
        db.insert_tag("Dinner", "#49B64E", "dinner").unwrap();
        let dinner = db.list_tags().unwrap()[0].id;

        let id = db
            .create_recipe(&NewRecipe {
                author_id: author,
                name: "Soup".into(),
                text: "Boil.".into(),
                cooking_time: 30,
                ingredients: vec![
                    IngredientAmount { id: pepper, amount: 2 },
                    IngredientAmount { id: salt, amount: 5 },
                ],
                tags: vec![dinner, 404],
            })
            .unwrap();

        let names: Vec<String> = db
            .recipe_ingredients(id)
            .unwrap()
            .into_iter()
            .map(|l| l.name)
            .collect();
        assert_eq!(names, vec!["pepper", "salt"]);
        assert_eq!(db.recipe_tags(id).unwrap().len(), 1);
    }

    #[test]
    fn failed_line_insert_rolls_back_the_recipe() {
        let db = Database::open_in_memory().unwrap();
        let author = user(&db, "chef");
        let salt = ingredient(&db, "salt");

        let result = db.create_recipe(&NewRecipe {
            author_id: author,
            name: "Bad".into(),
            text: "Nope.".into(),
            cooking_time: 5,
            ingredients: vec![
                IngredientAmount { id: salt, amount: 1 },
                IngredientAmount { id: salt, amount: 2 },
            ],
            tags: vec![],
        });

        assert!(result.is_err());
        assert!(db.list_recipes(&RecipeFilter::default()).unwrap().is_empty());
    }

    #[test]
    fn update_replaces_only_provided_parts() {
        let db = Database::open_in_memory().unwrap();
        let author = user(&db, "chef");
        let salt = ingredient(&db, "salt");
        let sugar = ingredient(&db, "sugar");
        let id = recipe(&db, author, "Tea", &[(salt, 1)]);

        let changed = db
            .update_recipe(
                id,
                &RecipeChanges {
                    cooking_time: Some(3),
                    ingredients: Some(vec![IngredientAmount { id: sugar, amount: 2 }]),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(changed);

        let row = db.get_recipe(id).unwrap().unwrap();
        assert_eq!(row.name, "Tea");
        assert_eq!(row.cooking_time, 3);
        let lines = db.recipe_ingredients(id).unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].ingredient_id, sugar);

        assert!(!db.update_recipe(999, &RecipeChanges::default()).unwrap());
    }

    #[test]
    fn list_filters_by_author_favourites_and_cart() {
        let db = Database::open_in_memory().unwrap();
        let chef = user(&db, "chef");
        let cook = user(&db, "cook");
        let first = recipe(&db, chef, "First", &[]);
        let second = recipe(&db, cook, "Second", &[]);

        let all: Vec<i64> = db
            .list_recipes(&RecipeFilter::default())
            .unwrap()
            .iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(all, vec![second, first]);

        let by_chef = db
            .list_recipes(&RecipeFilter { author_id: Some(chef), ..Default::default() })
            .unwrap();
        assert_eq!(by_chef.len(), 1);
        assert_eq!(by_chef[0].id, first);

        db.insert_edge(EdgeTable::FAVOURITES, chef, second).unwrap();
        db.insert_edge(EdgeTable::CARTS, cook, first).unwrap();
        let favourites = db
            .list_recipes(&RecipeFilter { favourited_by: Some(chef), ..Default::default() })
            .unwrap();
        assert_eq!(favourites[0].id, second);
        let cart = db
            .list_recipes(&RecipeFilter { in_cart_of: Some(cook), ..Default::default() })
            .unwrap();
        assert_eq!(cart[0].id, first);
    }

    #[test]
    fn list_filters_by_tag_slug() {
        let db = Database::open_in_memory().unwrap();
        let chef = user(&db, "chef");
        db.insert_tag("Breakfast", "#E26C2D", "breakfast").unwrap();
        let breakfast = db.list_tags().unwrap()[0].id;

        let tagged = db
            .create_recipe(&NewRecipe {
                author_id: chef,
                name: "Porridge".into(),
                text: "Stir.".into(),
                cooking_time: 10,
                ingredients: vec![],
                tags: vec![breakfast],
            })
            .unwrap();
        recipe(&db, chef, "Untagged", &[]);

        let found = db
            .list_recipes(&RecipeFilter { tag_slug: Some("breakfast".into()), ..Default::default() })
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, tagged);

        let none = db
            .list_recipes(&RecipeFilter { tag_slug: Some("dinner".into()), ..Default::default() })
            .unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn deleting_a_recipe_clears_cart_entries() {
        let db = Database::open_in_memory().unwrap();
        let chef = user(&db, "chef");
        let id = recipe(&db, chef, "Gone", &[]);
        db.insert_edge(EdgeTable::CARTS, chef, id).unwrap();

        assert!(db.delete_recipe(id).unwrap());
        assert!(db.cart_entries(chef).unwrap().is_empty());
        assert!(!db.delete_recipe(id).unwrap());
    }

    #[test]
    fn author_recipes_respect_limit() {
        let db = Database::open_in_memory().unwrap();
        let chef = user(&db, "chef");
        for name in ["a", "b", "c"] {
            recipe(&db, chef, name, &[]);
        }

        assert_eq!(db.recipes_by_author(chef, Some(2)).unwrap().len(), 2);
        assert_eq!(db.recipes_by_author(chef, None).unwrap().len(), 3);
        assert_eq!(db.count_recipes_by_author(chef).unwrap(), 3);
    }
}
