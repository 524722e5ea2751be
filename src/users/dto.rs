use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::recipes::dto::RecipeShort;
use crate::users::repo_types::User;

/// Public author profile as seen by the current viewer.
#[derive(Debug, Serialize)]
pub struct AuthorView {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
}

impl AuthorView {
    pub fn new(user: User, is_subscribed: bool) -> Self {
        Self {
            id: user.id,
            email: user.email,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            is_subscribed,
        }
    }
}

/// Followed author with a preview of their newest recipes.
#[derive(Debug, Serialize)]
pub struct SubscriptionView {
    #[serde(flatten)]
    pub author: AuthorView,
    pub recipes: Vec<RecipeShort>,
    pub recipes_count: i64,
}

#[derive(Debug, Deserialize)]
pub struct UsersQuery {
    #[serde(default = "crate::recipes::dto::default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

#[derive(Debug, Deserialize)]
pub struct SubscriptionsQuery {
    #[serde(default = "crate::recipes::dto::default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
    pub recipes_limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct SubscribeQuery {
    pub recipes_limit: Option<i64>,
}
