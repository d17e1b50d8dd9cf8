use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::info;

use foodgram_db::queries::NewUser;
use foodgram_db::{Database, EdgeTable, models::UserRow};
use foodgram_types::api::{
    RegisterRequest, RegisterResponse, SetPasswordRequest, SubscriptionProfile, UserProfile,
};

use crate::auth::{AppState, hash_password, verify_password};
use crate::error::ApiError;
use crate::extract::{Id, Params, Payload};
use crate::middleware::Actor;
use crate::recipes::summary;
use crate::validation::{check_password, check_registration};
use crate::with_db;

#[derive(Debug, Deserialize)]
pub struct SubscriptionQuery {
    pub recipes_limit: Option<i64>,
}

/// POST /api/users/
pub async fn register(
    State(state): State<AppState>,
    Payload(req): Payload<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    check_registration(&req)?;

    let created = with_db(&state, move |db| {
        let password = hash_password(&req.password)?;
        let id = db
            .create_user(&NewUser {
                email: &req.email,
                username: &req.username,
                first_name: &req.first_name,
                last_name: &req.last_name,
                password: &password,
            })?
            .ok_or_else(|| {
                ApiError::Conflict("A user with that email or username already exists.".into())
            })?;

        Ok(RegisterResponse {
            email: req.email,
            id,
            username: req.username,
            first_name: req.first_name,
            last_name: req.last_name,
        })
    })
    .await?;

    info!("Registered user {} ({})", created.username, created.id);
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /api/users/
pub async fn list_users(
    State(state): State<AppState>,
    actor: Actor,
) -> Result<impl IntoResponse, ApiError> {
    let viewer = actor.user_id();
    let users = with_db(&state, move |db| {
        db.list_users()?
            .iter()
            .map(|row| user_profile(db, viewer, row))
            .collect::<Result<Vec<_>, _>>()
    })
    .await?;

    Ok(Json(users))
}

/// GET /api/users/{id}/
pub async fn get_user(
    State(state): State<AppState>,
    Id(user_id): Id,
    actor: Actor,
) -> Result<impl IntoResponse, ApiError> {
    let viewer = actor.user_id();
    let profile = with_db(&state, move |db| load_profile(db, viewer, user_id)).await?;
    Ok(Json(profile))
}

/// GET /api/users/me/
pub async fn me(State(state): State<AppState>, actor: Actor) -> Result<impl IntoResponse, ApiError> {
    let user_id = actor.require()?.sub;
    let profile = with_db(&state, move |db| load_profile(db, Some(user_id), user_id)).await?;
    Ok(Json(profile))
}

/// POST /api/users/set_password/
pub async fn set_password(
    State(state): State<AppState>,
    actor: Actor,
    Payload(req): Payload<SetPasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = actor.require()?.sub;
    check_password(&req.new_password)?;

    with_db(&state, move |db| {
        let user = db
            .get_user_by_id(user_id)?
            .ok_or_else(|| ApiError::not_found("user", user_id))?;
        if !verify_password(&req.current_password, &user.password) {
            return Err(ApiError::validation("Current password is incorrect."));
        }
        let hash = hash_password(&req.new_password)?;
        db.update_password(user_id, &hash)?;
        Ok(())
    })
    .await?;

    info!("User {} changed their password", user_id);
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/users/subscriptions/
pub async fn subscriptions(
    State(state): State<AppState>,
    actor: Actor,
    Params(query): Params<SubscriptionQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = actor.require()?.sub;
    let limit = recipes_limit(query.recipes_limit)?;

    let authors = with_db(&state, move |db| {
        db.list_followed_users(user_id)?
            .iter()
            .map(|row| subscription_profile(db, user_id, row, limit))
            .collect::<Result<Vec<_>, _>>()
    })
    .await?;

    Ok(Json(authors))
}

fn recipes_limit(raw: Option<i64>) -> Result<Option<i64>, ApiError> {
    match raw {
        Some(limit) if limit < 0 => Err(ApiError::validation(
            "recipes_limit must not be negative.",
        )),
        other => Ok(other),
    }
}

fn load_profile(db: &Database, viewer: Option<i64>, user_id: i64) -> Result<UserProfile, ApiError> {
    let row = db
        .get_user_by_id(user_id)?
        .ok_or_else(|| ApiError::not_found("user", user_id))?;
    user_profile(db, viewer, &row)
}

/// Profile of `row` as seen by `viewer`; anonymous viewers follow nobody.
pub(crate) fn user_profile(
    db: &Database,
    viewer: Option<i64>,
    row: &UserRow,
) -> Result<UserProfile, ApiError> {
    let is_subscribed = match viewer {
        Some(viewer) => db.edge_exists(EdgeTable::FOLLOWS, viewer, row.id)?,
        None => false,
    };

    Ok(UserProfile {
        email: row.email.clone(),
        id: row.id,
        username: row.username.clone(),
        first_name: row.first_name.clone(),
        last_name: row.last_name.clone(),
        is_subscribed,
    })
}

pub(crate) fn subscription_profile(
    db: &Database,
    viewer: i64,
    row: &UserRow,
    recipes_limit: Option<i64>,
) -> Result<SubscriptionProfile, ApiError> {
    let recipes = db
        .recipes_by_author(row.id, recipes_limit)?
        .iter()
        .map(summary)
        .collect();

    Ok(SubscriptionProfile {
        profile: user_profile(db, Some(viewer), row)?,
        recipes,
        recipes_count: db.count_recipes_by_author(row.id)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_recipes_limit_is_rejected() {
        assert!(recipes_limit(Some(-1)).is_err());
        assert_eq!(recipes_limit(Some(3)).unwrap(), Some(3));
        assert_eq!(recipes_limit(None).unwrap(), None);
    }

    #[test]
    fn anonymous_viewer_is_never_subscribed() {
        let db = Database::open_in_memory().unwrap();
        let id = db
            .create_user(&NewUser {
                email: "a@example.com",
                username: "a",
                first_name: "A",
                last_name: "A",
                password: "hash",
            })
            .unwrap()
            .unwrap();

        let profile = load_profile(&db, None, id).unwrap();
        assert!(!profile.is_subscribed);
        assert!(matches!(load_profile(&db, None, 999), Err(ApiError::NotFound(_))));
    }
}
