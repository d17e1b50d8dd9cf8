//! Every HTTP route in one table, each with the access it demands.

use axum::{
    Router,
    handler::Handler,
    middleware,
    routing::{MethodFilter, MethodRouter, on},
};

use crate::auth::{self, AppState};
use crate::middleware::{Access, guard, resolve_actor};
use crate::relations::{Cart, Favourite, Follow, add_edge, remove_edge};
use crate::{catalog, recipes, shopping, users};

pub struct Endpoint {
    pub method: MethodFilter,
    pub path: &'static str,
    pub access: Access,
    handler: MethodRouter<AppState>,
}

fn endpoint<H, T>(method: MethodFilter, path: &'static str, access: Access, handler: H) -> Endpoint
where
    H: Handler<T, AppState>,
    T: 'static,
{
    Endpoint {
        method,
        path,
        access,
        handler: on(method, handler),
    }
}

pub fn endpoints() -> Vec<Endpoint> {
    use crate::middleware::Access::{Anonymous, Authenticated};
    use axum::routing::MethodFilter as M;

    vec![
        // -- Auth & users --
        endpoint(M::POST, "/api/auth/token/login/", Anonymous, auth::token_login),
        endpoint(M::POST, "/api/users/", Anonymous, users::register),
        endpoint(M::GET, "/api/users/", Anonymous, users::list_users),
        endpoint(M::GET, "/api/users/me/", Authenticated, users::me),
        endpoint(M::POST, "/api/users/set_password/", Authenticated, users::set_password),
        endpoint(M::GET, "/api/users/subscriptions/", Authenticated, users::subscriptions),
        endpoint(M::GET, "/api/users/{id}/", Anonymous, users::get_user),
        endpoint(M::POST, "/api/users/{id}/subscribe/", Authenticated, add_edge::<Follow>),
        endpoint(M::DELETE, "/api/users/{id}/subscribe/", Authenticated, remove_edge::<Follow>),
        // -- Reference data --
        endpoint(M::GET, "/api/tags/", Anonymous, catalog::list_tags),
        endpoint(M::GET, "/api/tags/{id}/", Anonymous, catalog::get_tag),
        endpoint(M::GET, "/api/ingredients/", Anonymous, catalog::list_ingredients),
        endpoint(M::GET, "/api/ingredients/{id}/", Anonymous, catalog::get_ingredient),
        // -- Recipes --
        endpoint(M::GET, "/api/recipes/", Anonymous, recipes::list_recipes),
        endpoint(M::POST, "/api/recipes/", Authenticated, recipes::create_recipe),
        endpoint(
            M::GET,
            "/api/recipes/download_shopping_cart/",
            Authenticated,
            shopping::download_shopping_cart,
        ),
        endpoint(M::GET, "/api/recipes/{id}/", Anonymous, recipes::get_recipe),
        endpoint(M::PATCH, "/api/recipes/{id}/", Authenticated, recipes::update_recipe),
        endpoint(M::DELETE, "/api/recipes/{id}/", Authenticated, recipes::delete_recipe),
        endpoint(M::POST, "/api/recipes/{id}/favorite/", Authenticated, add_edge::<Favourite>),
        endpoint(M::DELETE, "/api/recipes/{id}/favorite/", Authenticated, remove_edge::<Favourite>),
        endpoint(M::POST, "/api/recipes/{id}/shopping_cart/", Authenticated, add_edge::<Cart>),
        endpoint(M::DELETE, "/api/recipes/{id}/shopping_cart/", Authenticated, remove_edge::<Cart>),
    ]
}

/// Builds the application router from [`endpoints`]. Each handler sits behind
/// [`guard`] configured with its access level; [`resolve_actor`] runs first
/// for every request.
pub fn router(state: AppState) -> Router {
    let mut router = Router::new();
    for endpoint in endpoints() {
        let handler = endpoint
            .handler
            .route_layer(middleware::from_fn_with_state(endpoint.access, guard));
        router = router.route(endpoint.path, handler);
    }

    router
        .layer(middleware::from_fn_with_state(state.clone(), resolve_actor))
        .with_state(state)
}
