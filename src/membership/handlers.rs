use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use uuid::Uuid;

use super::repo_types::MembershipKind;
use super::services;
use crate::{auth::AuthUser, error::AppResult, recipes::dto::RecipeShort, state::AppState};

pub fn write_router() -> Router<AppState> {
    Router::new()
        .route(
            "/recipes/:id/favorite",
            post(add_favorite).delete(remove_favorite),
        )
        .route(
            "/recipes/:id/shopping_cart",
            post(add_to_cart).delete(remove_from_cart),
        )
}

async fn added(
    state: &AppState,
    kind: MembershipKind,
    user_id: Uuid,
    recipe_id: Uuid,
) -> AppResult<(StatusCode, Json<RecipeShort>)> {
    let short = services::add(state.store.as_ref(), kind, user_id, recipe_id).await?;
    Ok((StatusCode::CREATED, Json(short)))
}

async fn removed(
    state: &AppState,
    kind: MembershipKind,
    user_id: Uuid,
    recipe_id: Uuid,
) -> AppResult<StatusCode> {
    services::remove(state.store.as_ref(), kind, user_id, recipe_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_favorite(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<(StatusCode, Json<RecipeShort>)> {
    added(&state, MembershipKind::Favorite, user_id, id).await
}

pub async fn remove_favorite(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    removed(&state, MembershipKind::Favorite, user_id, id).await
}

pub async fn add_to_cart(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<(StatusCode, Json<RecipeShort>)> {
    added(&state, MembershipKind::ShoppingCart, user_id, id).await
}

pub async fn remove_from_cart(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    removed(&state, MembershipKind::ShoppingCart, user_id, id).await
}
