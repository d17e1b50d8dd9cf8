//! Startup import of reference data (tags and ingredients).

use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, warn};

use foodgram_api::validation::normalize_tag_color;
use foodgram_db::Database;
use foodgram_types::models::SeedData;

pub fn load(path: &Path) -> Result<SeedData> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading seed file {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing seed file {}", path.display()))
}

/// Inserts every tag and ingredient not already present. Tags with an
/// invalid color are skipped with a warning.
pub fn import(db: &Database, seed: &SeedData) -> Result<()> {
    let mut tags = 0;
    for tag in &seed.tags {
        let color = match normalize_tag_color(&tag.color) {
            Ok(color) => color,
            Err(e) => {
                warn!("Skipping tag {:?}: {}", tag.slug, e);
                continue;
            }
        };
        if db.insert_tag(&tag.name, &color, &tag.slug)? {
            tags += 1;
        }
    }

    let mut ingredients = 0;
    for ingredient in &seed.ingredients {
        if db.insert_ingredient(&ingredient.name, &ingredient.measurement_unit)? {
            ingredients += 1;
        }
    }

    info!("Seed import: {} new tags, {} new ingredients", tags, ingredients);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEED: &str = r##"{
        "tags": [
            { "name": "Breakfast", "color": "#e26c2d", "slug": "breakfast" },
            { "name": "Broken", "color": "orange", "slug": "broken" }
        ],
        "ingredients": [
            { "name": "salt", "measurement_unit": "g" },
            { "name": "milk", "measurement_unit": "ml" }
        ]
    }"##;

    #[test]
    fn import_is_repeatable_and_skips_bad_colors() {
        let db = Database::open_in_memory().unwrap();
        let seed: SeedData = serde_json::from_str(SEED).unwrap();

        import(&db, &seed).unwrap();
        import(&db, &seed).unwrap();

        let tags = db.list_tags().unwrap();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].color, "#E26C2D");
        assert_eq!(db.list_ingredients().unwrap().len(), 2);
    }
}
