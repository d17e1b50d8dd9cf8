//! Favourite, shopping cart and follow share one add/remove implementation.
//!
//! Each relationship is a marker type implementing [`Relationship`], which
//! names the edge table, how to find the target and what to send back once
//! an edge is created. [`add`] and [`remove`] do the rest.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use serde::Serialize;
use tracing::info;

use foodgram_db::{Database, EdgeTable};
use foodgram_types::api::{RecipeSummary, SubscriptionProfile};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::extract::Id;
use crate::middleware::Actor;
use crate::recipes::{load_recipe, summary};
use crate::users::subscription_profile;
use crate::with_db;

pub trait Relationship: Send + 'static {
    const EDGE: EdgeTable;
    /// Target name used in error messages.
    const TARGET: &'static str;
    const ALREADY_PRESENT: &'static str;
    const NOT_PRESENT: &'static str;

    type Snapshot: Serialize + Send + 'static;

    fn target_exists(db: &Database, target_id: i64) -> Result<bool, ApiError>;

    /// Rules beyond existence and uniqueness.
    fn validate(_actor_id: i64, _target_id: i64) -> Result<(), ApiError> {
        Ok(())
    }

    fn snapshot(db: &Database, actor_id: i64, target_id: i64) -> Result<Self::Snapshot, ApiError>;
}

pub struct Favourite;
pub struct Cart;
pub struct Follow;

impl Relationship for Favourite {
    const EDGE: EdgeTable = EdgeTable::FAVOURITES;
    const TARGET: &'static str = "recipe";
    const ALREADY_PRESENT: &'static str = "Recipe is already in favourites.";
    const NOT_PRESENT: &'static str = "Recipe is not in favourites.";

    type Snapshot = RecipeSummary;

    fn target_exists(db: &Database, target_id: i64) -> Result<bool, ApiError> {
        Ok(db.get_recipe(target_id)?.is_some())
    }

    fn snapshot(db: &Database, _actor_id: i64, target_id: i64) -> Result<RecipeSummary, ApiError> {
        Ok(summary(&load_recipe(db, target_id)?))
    }
}

impl Relationship for Cart {
    const EDGE: EdgeTable = EdgeTable::CARTS;
    const TARGET: &'static str = "recipe";
    const ALREADY_PRESENT: &'static str = "Recipe is already in the shopping cart.";
    const NOT_PRESENT: &'static str = "Recipe is not in the shopping cart.";

    type Snapshot = RecipeSummary;

    fn target_exists(db: &Database, target_id: i64) -> Result<bool, ApiError> {
        Ok(db.get_recipe(target_id)?.is_some())
    }

    fn snapshot(db: &Database, _actor_id: i64, target_id: i64) -> Result<RecipeSummary, ApiError> {
        Ok(summary(&load_recipe(db, target_id)?))
    }
}

impl Relationship for Follow {
    const EDGE: EdgeTable = EdgeTable::FOLLOWS;
    const TARGET: &'static str = "user";
    const ALREADY_PRESENT: &'static str = "You are already subscribed to this user.";
    const NOT_PRESENT: &'static str = "You are not subscribed to this user.";

    type Snapshot = SubscriptionProfile;

    fn target_exists(db: &Database, target_id: i64) -> Result<bool, ApiError> {
        Ok(db.get_user_by_id(target_id)?.is_some())
    }

    fn validate(actor_id: i64, target_id: i64) -> Result<(), ApiError> {
        if actor_id == target_id {
            return Err(ApiError::validation("You cannot subscribe to yourself."));
        }
        Ok(())
    }

    fn snapshot(
        db: &Database,
        actor_id: i64,
        target_id: i64,
    ) -> Result<SubscriptionProfile, ApiError> {
        let row = db
            .get_user_by_id(target_id)?
            .ok_or_else(|| ApiError::not_found("user", target_id))?;
        subscription_profile(db, actor_id, &row, None)
    }
}

/// Creates the `(actor, target)` edge and returns a snapshot of the target.
/// A second add of the same edge is a conflict, not a no-op.
pub fn add<R: Relationship>(
    db: &Database,
    actor_id: i64,
    target_id: i64,
) -> Result<R::Snapshot, ApiError> {
    if !R::target_exists(db, target_id)? {
        return Err(ApiError::not_found(R::TARGET, target_id));
    }
    R::validate(actor_id, target_id)?;

    if !db.insert_edge(R::EDGE, actor_id, target_id)? {
        return Err(ApiError::Conflict(R::ALREADY_PRESENT.into()));
    }
    info!(edge = R::EDGE.table, actor_id, target_id, "Edge added");

    R::snapshot(db, actor_id, target_id)
}

pub fn remove<R: Relationship>(db: &Database, actor_id: i64, target_id: i64) -> Result<(), ApiError> {
    if !R::target_exists(db, target_id)? {
        return Err(ApiError::not_found(R::TARGET, target_id));
    }
    if !db.delete_edge(R::EDGE, actor_id, target_id)? {
        return Err(ApiError::NotFound(R::NOT_PRESENT.into()));
    }
    info!(edge = R::EDGE.table, actor_id, target_id, "Edge removed");
    Ok(())
}

/// POST handler shared by `/favorite/`, `/shopping_cart/` and `/subscribe/`.
pub async fn add_edge<R: Relationship>(
    State(state): State<AppState>,
    Id(target_id): Id,
    actor: Actor,
) -> Result<impl IntoResponse, ApiError> {
    let actor_id = actor.require()?.sub;
    let snapshot = with_db(&state, move |db| add::<R>(db, actor_id, target_id)).await?;
    Ok((StatusCode::CREATED, Json(snapshot)))
}

/// DELETE handler shared by `/favorite/`, `/shopping_cart/` and `/subscribe/`.
pub async fn remove_edge<R: Relationship>(
    State(state): State<AppState>,
    Id(target_id): Id,
    actor: Actor,
) -> Result<impl IntoResponse, ApiError> {
    let actor_id = actor.require()?.sub;
    with_db(&state, move |db| remove::<R>(db, actor_id, target_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use foodgram_db::queries::NewUser;
    use foodgram_db::recipes::NewRecipe;

    fn user(db: &Database, name: &str) -> i64 {
        let email = format!("{name}@example.com");
        db.create_user(&NewUser {
            email: &email,
            username: name,
            first_name: name,
            last_name: "Test",
            password: "hash",
        })
        .unwrap()
        .unwrap()
    }

    fn recipe(db: &Database, author_id: i64) -> i64 {
        db.create_recipe(&NewRecipe {
            author_id,
            name: "Soup".into(),
            text: "Boil.".into(),
            cooking_time: 15,
            ingredients: vec![],
            tags: vec![],
        })
        .unwrap()
    }

    #[test]
    fn adding_twice_conflicts() {
        let db = Database::open_in_memory().unwrap();
        let alice = user(&db, "alice");
        let soup = recipe(&db, alice);

        let snapshot = add::<Favourite>(&db, alice, soup).unwrap();
        assert_eq!(snapshot.id, soup);
        assert_eq!(snapshot.cooking_time, 15);

        assert!(matches!(add::<Favourite>(&db, alice, soup), Err(ApiError::Conflict(_))));
    }

    #[test]
    fn favourites_and_cart_are_independent() {
        let db = Database::open_in_memory().unwrap();
        let alice = user(&db, "alice");
        let soup = recipe(&db, alice);

        add::<Favourite>(&db, alice, soup).unwrap();
        add::<Cart>(&db, alice, soup).unwrap();
        remove::<Favourite>(&db, alice, soup).unwrap();

        assert!(db.edge_exists(EdgeTable::CARTS, alice, soup).unwrap());
    }

    #[test]
    fn removing_a_missing_edge_is_not_found() {
        let db = Database::open_in_memory().unwrap();
        let alice = user(&db, "alice");
        let soup = recipe(&db, alice);

        let err = remove::<Cart>(&db, alice, soup).unwrap_err();
        assert_eq!(err.to_string(), Cart::NOT_PRESENT);
    }

    #[test]
    fn unknown_target_is_not_found() {
        let db = Database::open_in_memory().unwrap();
        let alice = user(&db, "alice");

        assert!(matches!(add::<Cart>(&db, alice, 404), Err(ApiError::NotFound(_))));
        assert!(matches!(remove::<Follow>(&db, alice, 404), Err(ApiError::NotFound(_))));
    }

    #[test]
    fn self_follow_is_a_validation_error() {
        let db = Database::open_in_memory().unwrap();
        let alice = user(&db, "alice");

        assert!(matches!(add::<Follow>(&db, alice, alice), Err(ApiError::Validation(_))));
        assert!(!db.edge_exists(EdgeTable::FOLLOWS, alice, alice).unwrap());
    }

    #[test]
    fn follow_snapshot_reports_the_new_subscription() {
        let db = Database::open_in_memory().unwrap();
        let alice = user(&db, "alice");
        let bob = user(&db, "bob");
        recipe(&db, bob);

        let profile = add::<Follow>(&db, alice, bob).unwrap();
        assert!(profile.profile.is_subscribed);
        assert_eq!(profile.recipes_count, 1);
        assert_eq!(profile.recipes.len(), 1);

        remove::<Follow>(&db, alice, bob).unwrap();
        assert!(add::<Follow>(&db, alice, bob).is_ok());
    }
}
