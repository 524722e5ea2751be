use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::dto::{AuthorView, SubscribeQuery, SubscriptionView, SubscriptionsQuery, UsersQuery};
use super::services;
use crate::{auth::AuthUser, error::AppResult, recipes::dto::Page, state::AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/me", get(me))
        .route("/users/:id", get(get_user))
        .route("/users/subscriptions", get(subscriptions))
        .route("/users/:id/subscribe", post(subscribe).delete(unsubscribe))
}

#[instrument(skip(state, auth))]
pub async fn list_users(
    State(state): State<AppState>,
    auth: Option<AuthUser>,
    Query(q): Query<UsersQuery>,
) -> AppResult<Json<Page<AuthorView>>> {
    let viewer = auth.map(|AuthUser(viewer)| viewer);
    Ok(Json(services::list_users(state.store.as_ref(), &q, viewer).await?))
}

pub async fn get_user(
    State(state): State<AppState>,
    auth: Option<AuthUser>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<AuthorView>> {
    let viewer = auth.map(|AuthUser(viewer)| viewer);
    Ok(Json(services::get_user(state.store.as_ref(), id, viewer).await?))
}

pub async fn me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<AuthorView>> {
    Ok(Json(services::me(state.store.as_ref(), user_id).await?))
}

#[instrument(skip(state))]
pub async fn subscriptions(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(q): Query<SubscriptionsQuery>,
) -> AppResult<Json<Page<SubscriptionView>>> {
    Ok(Json(
        services::list_subscriptions(state.store.as_ref(), user_id, &q).await?,
    ))
}

pub async fn subscribe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(author_id): Path<Uuid>,
    Query(q): Query<SubscribeQuery>,
) -> AppResult<(StatusCode, Json<SubscriptionView>)> {
    let view =
        services::subscribe(state.store.as_ref(), user_id, author_id, q.recipes_limit).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn unsubscribe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(author_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    services::unsubscribe(state.store.as_ref(), user_id, author_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
