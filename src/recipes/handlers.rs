use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use axum_extra::extract::Query;
use tracing::instrument;
use uuid::Uuid;

use super::dto::{CreateRecipeRequest, Page, RecipeDetails, RecipeQuery, UpdateRecipeRequest};
use super::services;
use crate::{auth::AuthUser, error::AppResult, state::AppState};

pub fn read_router() -> Router<AppState> {
    Router::new()
        .route("/recipes", get(list_recipes))
        .route("/recipes/:id", get(get_recipe))
}

pub fn write_router() -> Router<AppState> {
    Router::new()
        .route("/recipes", axum::routing::post(create_recipe))
        .route(
            "/recipes/:id",
            axum::routing::patch(update_recipe).delete(delete_recipe),
        )
}

#[instrument(skip(state, auth))]
pub async fn list_recipes(
    State(state): State<AppState>,
    auth: Option<AuthUser>,
    Query(q): Query<RecipeQuery>,
) -> AppResult<Json<Page<RecipeDetails>>> {
    let viewer = auth.map(|AuthUser(viewer)| viewer);
    Ok(Json(services::list_recipes(state.store.as_ref(), &q, viewer).await?))
}

pub async fn get_recipe(
    State(state): State<AppState>,
    auth: Option<AuthUser>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<RecipeDetails>> {
    let viewer = auth.map(|AuthUser(viewer)| viewer);
    Ok(Json(services::get_recipe(state.store.as_ref(), id, viewer).await?))
}

#[instrument(skip(state, req))]
pub async fn create_recipe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(req): Json<CreateRecipeRequest>,
) -> AppResult<(StatusCode, Json<RecipeDetails>)> {
    let details = services::create_recipe(state.store.as_ref(), user_id, req).await?;
    Ok((StatusCode::CREATED, Json(details)))
}

#[instrument(skip(state, req))]
pub async fn update_recipe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateRecipeRequest>,
) -> AppResult<Json<RecipeDetails>> {
    Ok(Json(
        services::update_recipe(state.store.as_ref(), user_id, id, req).await?,
    ))
}

#[instrument(skip(state))]
pub async fn delete_recipe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    services::delete_recipe(state.store.as_ref(), user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
