use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use tracing::instrument;

use super::dto::IngredientQuery;
use super::repo_types::{Ingredient, Tag};
use super::services;
use crate::{error::AppResult, state::AppState};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/tags", get(list_tags))
        .route("/tags/:id", get(get_tag))
        .route("/ingredients", get(list_ingredients))
        .route("/ingredients/:id", get(get_ingredient))
}

pub async fn list_tags(State(state): State<AppState>) -> AppResult<Json<Vec<Tag>>> {
    Ok(Json(services::list_tags(state.store.as_ref()).await?))
}

pub async fn get_tag(State(state): State<AppState>, Path(id): Path<i64>) -> AppResult<Json<Tag>> {
    Ok(Json(services::get_tag(state.store.as_ref(), id).await?))
}

#[instrument(skip(state))]
pub async fn list_ingredients(
    State(state): State<AppState>,
    Query(q): Query<IngredientQuery>,
) -> AppResult<Json<Vec<Ingredient>>> {
    let rows = services::list_ingredients(state.store.as_ref(), q.name.as_deref()).await?;
    Ok(Json(rows))
}

pub async fn get_ingredient(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Ingredient>> {
    Ok(Json(services::get_ingredient(state.store.as_ref(), id).await?))
}
