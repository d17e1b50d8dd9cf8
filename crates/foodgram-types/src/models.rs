use serde::{Deserialize, Serialize};

/// One line of a shopping list: an ingredient and the total amount needed
/// across every recipe in a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShoppingItem {
    pub name: String,
    pub measurement_unit: String,
    pub amount: i64,
}

/// Reference data imported at startup.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedData {
    #[serde(default)]
    pub tags: Vec<NewTag>,
    #[serde(default)]
    pub ingredients: Vec<NewIngredient>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewTag {
    pub name: String,
    pub color: String,
    pub slug: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewIngredient {
    pub name: String,
    pub measurement_unit: String,
}
