//! Persistence seam: every read and write goes through a [`StoreTx`].
//!
//! A transaction is opened with [`Store::begin`] and only becomes visible on
//! [`StoreTx::commit`]. Dropping it without committing rolls everything back,
//! which is what the composite recipe write relies on.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::catalog::repo_types::{Ingredient, NewTag, Tag};
use crate::membership::repo_types::{CartLine, Membership, MembershipKind};
use crate::recipes::repo_types::{IngredientLine, NewRecipe, Recipe, RecipeChanges, RecipeFilter};
use crate::users::repo_types::{NewUser, Subscription, User};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Storage failures, classified so services can map constraint hits to
/// domain errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),
    #[error("foreign key constraint violated: {0}")]
    ForeignKeyViolation(String),
    #[error("check constraint violated: {0}")]
    CheckViolation(String),
    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        use sqlx::error::ErrorKind;

        if let sqlx::Error::Database(db) = &e {
            let constraint = db.constraint().unwrap_or_default().to_string();
            match db.kind() {
                ErrorKind::UniqueViolation => return Self::UniqueViolation(constraint),
                ErrorKind::ForeignKeyViolation => return Self::ForeignKeyViolation(constraint),
                ErrorKind::CheckViolation => return Self::CheckViolation(constraint),
                _ => {}
            }
        }
        Self::Database(e)
    }
}

/// Constraint names shared by the migration and the in-memory store.
pub mod constraints {
    pub const RECIPE_NAME: &str = "recipes_name_key";
    pub const RECIPE_AUTHOR: &str = "recipes_author_id_fkey";
    pub const RECIPE_LINE_UNIQUE: &str = "recipe_ingredients_recipe_id_ingredient_id_key";
    pub const RECIPE_LINE_INGREDIENT: &str = "recipe_ingredients_ingredient_id_fkey";
    pub const RECIPE_TAG: &str = "recipe_tags_tag_id_fkey";
    pub const INGREDIENT_NAME_UNIT: &str = "ingredients_name_measurement_unit_key";
    pub const MEMBERSHIP_UNIQUE: &str = "recipe_memberships_user_id_recipe_id_kind_key";
    pub const MEMBERSHIP_RECIPE: &str = "recipe_memberships_recipe_id_fkey";
    pub const MEMBERSHIP_USER: &str = "recipe_memberships_user_id_fkey";
    pub const SUBSCRIPTION_UNIQUE: &str = "subscriptions_user_id_author_id_key";
    pub const SUBSCRIPTION_SELF: &str = "subscriptions_no_self";
    pub const SUBSCRIPTION_AUTHOR: &str = "subscriptions_author_id_fkey";
    pub const SUBSCRIPTION_USER: &str = "subscriptions_user_id_fkey";
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn StoreTx>, StoreError>;
}

#[async_trait]
pub trait StoreTx: Send {
    // users
    async fn user(&mut self, id: Uuid) -> Result<Option<User>, StoreError>;
    async fn upsert_user(&mut self, user: &NewUser) -> Result<User, StoreError>;
    /// Ordered by lowercased username. Returns the page and the total.
    async fn list_users(&mut self, limit: i64, offset: i64)
        -> Result<(Vec<User>, i64), StoreError>;

    // ingredient and tag catalog
    async fn ingredient(&mut self, id: i64) -> Result<Option<Ingredient>, StoreError>;
    async fn find_ingredient(
        &mut self,
        name: &str,
        measurement_unit: &str,
    ) -> Result<Option<Ingredient>, StoreError>;
    async fn insert_ingredient(
        &mut self,
        name: &str,
        measurement_unit: &str,
    ) -> Result<Ingredient, StoreError>;
    /// Ordered by lowercased name, then id; `name_prefix` matches
    /// case-insensitively.
    async fn list_ingredients(
        &mut self,
        name_prefix: Option<&str>,
    ) -> Result<Vec<Ingredient>, StoreError>;
    async fn tag(&mut self, id: i64) -> Result<Option<Tag>, StoreError>;
    async fn tags_by_ids(&mut self, ids: &[i64]) -> Result<Vec<Tag>, StoreError>;
    async fn list_tags(&mut self) -> Result<Vec<Tag>, StoreError>;
    async fn upsert_tag(&mut self, tag: &NewTag) -> Result<Tag, StoreError>;

    // recipes
    async fn insert_recipe(&mut self, recipe: &NewRecipe) -> Result<Recipe, StoreError>;
    async fn update_recipe(
        &mut self,
        id: Uuid,
        changes: &RecipeChanges,
    ) -> Result<Recipe, StoreError>;
    async fn recipe(&mut self, id: Uuid) -> Result<Option<Recipe>, StoreError>;
    /// Cascades to lines, tag links and memberships.
    async fn delete_recipe(&mut self, id: Uuid) -> Result<bool, StoreError>;
    /// Newest first. Returns the page and the total count before paging.
    async fn list_recipes(
        &mut self,
        filter: &RecipeFilter,
    ) -> Result<(Vec<Recipe>, i64), StoreError>;
    /// Replaces the whole tag set of a recipe.
    async fn set_recipe_tags(&mut self, recipe_id: Uuid, tag_ids: &[i64])
        -> Result<(), StoreError>;
    async fn recipe_tags(&mut self, recipe_id: Uuid) -> Result<Vec<Tag>, StoreError>;
    async fn delete_recipe_lines(&mut self, recipe_id: Uuid) -> Result<(), StoreError>;
    /// Bulk insert of `(ingredient_id, amount)` pairs.
    async fn insert_recipe_lines(
        &mut self,
        recipe_id: Uuid,
        lines: &[(i64, i32)],
    ) -> Result<(), StoreError>;
    /// Lines joined with their ingredient, in insertion order.
    async fn recipe_lines(&mut self, recipe_id: Uuid) -> Result<Vec<IngredientLine>, StoreError>;

    // favorites and shopping cart
    async fn insert_membership(
        &mut self,
        kind: MembershipKind,
        user_id: Uuid,
        recipe_id: Uuid,
    ) -> Result<Membership, StoreError>;
    async fn delete_membership(
        &mut self,
        kind: MembershipKind,
        user_id: Uuid,
        recipe_id: Uuid,
    ) -> Result<bool, StoreError>;
    async fn has_membership(
        &mut self,
        kind: MembershipKind,
        user_id: Uuid,
        recipe_id: Uuid,
    ) -> Result<bool, StoreError>;
    /// Every ingredient line of every recipe in the user's cart, cart entries
    /// in the order they were added and lines in insertion order.
    async fn cart_lines(&mut self, user_id: Uuid) -> Result<Vec<CartLine>, StoreError>;

    // subscriptions
    async fn insert_subscription(
        &mut self,
        user_id: Uuid,
        author_id: Uuid,
    ) -> Result<Subscription, StoreError>;
    async fn delete_subscription(&mut self, user_id: Uuid, author_id: Uuid)
        -> Result<bool, StoreError>;
    async fn is_subscribed(&mut self, user_id: Uuid, author_id: Uuid) -> Result<bool, StoreError>;
    /// Followed authors, most recent subscription first.
    async fn list_subscriptions(
        &mut self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<User>, i64), StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}
