use anyhow::Context;
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::{Store, StoreError, StoreTx};
use crate::catalog::{
    repo as catalog_repo,
    repo_types::{Ingredient, NewTag, Tag},
};
use crate::membership::{
    repo as membership_repo,
    repo_types::{CartLine, Membership, MembershipKind},
};
use crate::recipes::{
    repo as recipe_repo,
    repo_types::{IngredientLine, NewRecipe, Recipe, RecipeChanges, RecipeFilter},
};
use crate::users::{
    repo as user_repo,
    repo_types::{NewUser, Subscription, User},
};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .context("connect to database")?;
        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("run migrations")?;
        Ok(())
    }
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgTx { tx }))
    }
}

pub struct PgTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTx for PgTx {
    async fn user(&mut self, id: Uuid) -> Result<Option<User>, StoreError> {
        user_repo::get_user(&mut self.tx, id).await
    }

    async fn upsert_user(&mut self, user: &NewUser) -> Result<User, StoreError> {
        user_repo::upsert_user(&mut self.tx, user).await
    }

    async fn list_users(
        &mut self,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<User>, i64), StoreError> {
        user_repo::list_users(&mut self.tx, limit, offset).await
    }

    async fn ingredient(&mut self, id: i64) -> Result<Option<Ingredient>, StoreError> {
        catalog_repo::get_ingredient(&mut self.tx, id).await
    }

    async fn find_ingredient(
        &mut self,
        name: &str,
        measurement_unit: &str,
    ) -> Result<Option<Ingredient>, StoreError> {
        catalog_repo::find_ingredient(&mut self.tx, name, measurement_unit).await
    }

    async fn insert_ingredient(
        &mut self,
        name: &str,
        measurement_unit: &str,
    ) -> Result<Ingredient, StoreError> {
        catalog_repo::insert_ingredient(&mut self.tx, name, measurement_unit).await
    }

    async fn list_ingredients(
        &mut self,
        name_prefix: Option<&str>,
    ) -> Result<Vec<Ingredient>, StoreError> {
        catalog_repo::list_ingredients(&mut self.tx, name_prefix).await
    }

    async fn tag(&mut self, id: i64) -> Result<Option<Tag>, StoreError> {
        catalog_repo::get_tag(&mut self.tx, id).await
    }

    async fn tags_by_ids(&mut self, ids: &[i64]) -> Result<Vec<Tag>, StoreError> {
        catalog_repo::tags_by_ids(&mut self.tx, ids).await
    }

    async fn list_tags(&mut self) -> Result<Vec<Tag>, StoreError> {
        catalog_repo::list_tags(&mut self.tx).await
    }

    async fn upsert_tag(&mut self, tag: &NewTag) -> Result<Tag, StoreError> {
        catalog_repo::upsert_tag(&mut self.tx, tag).await
    }

    async fn insert_recipe(&mut self, recipe: &NewRecipe) -> Result<Recipe, StoreError> {
        recipe_repo::insert_recipe(&mut self.tx, recipe).await
    }

    async fn update_recipe(
        &mut self,
        id: Uuid,
        changes: &RecipeChanges,
    ) -> Result<Recipe, StoreError> {
        recipe_repo::update_recipe(&mut self.tx, id, changes).await
    }

    async fn recipe(&mut self, id: Uuid) -> Result<Option<Recipe>, StoreError> {
        recipe_repo::get_recipe(&mut self.tx, id).await
    }

    async fn delete_recipe(&mut self, id: Uuid) -> Result<bool, StoreError> {
        recipe_repo::delete_recipe(&mut self.tx, id).await
    }

    async fn list_recipes(
        &mut self,
        filter: &RecipeFilter,
    ) -> Result<(Vec<Recipe>, i64), StoreError> {
        recipe_repo::list_recipes(&mut self.tx, filter).await
    }

    async fn set_recipe_tags(
        &mut self,
        recipe_id: Uuid,
        tag_ids: &[i64],
    ) -> Result<(), StoreError> {
        recipe_repo::set_recipe_tags(&mut self.tx, recipe_id, tag_ids).await
    }

    async fn recipe_tags(&mut self, recipe_id: Uuid) -> Result<Vec<Tag>, StoreError> {
        recipe_repo::recipe_tags(&mut self.tx, recipe_id).await
    }

    async fn delete_recipe_lines(&mut self, recipe_id: Uuid) -> Result<(), StoreError> {
        recipe_repo::delete_recipe_lines(&mut self.tx, recipe_id).await
    }

    async fn insert_recipe_lines(
        &mut self,
        recipe_id: Uuid,
        lines: &[(i64, i32)],
    ) -> Result<(), StoreError> {
        recipe_repo::insert_recipe_lines(&mut self.tx, recipe_id, lines).await
    }

    async fn recipe_lines(&mut self, recipe_id: Uuid) -> Result<Vec<IngredientLine>, StoreError> {
        recipe_repo::recipe_lines(&mut self.tx, recipe_id).await
    }

    async fn insert_membership(
        &mut self,
        kind: MembershipKind,
        user_id: Uuid,
        recipe_id: Uuid,
    ) -> Result<Membership, StoreError> {
        membership_repo::insert_membership(&mut self.tx, kind, user_id, recipe_id).await
    }

    async fn delete_membership(
        &mut self,
        kind: MembershipKind,
        user_id: Uuid,
        recipe_id: Uuid,
    ) -> Result<bool, StoreError> {
        membership_repo::delete_membership(&mut self.tx, kind, user_id, recipe_id).await
    }

    async fn has_membership(
        &mut self,
        kind: MembershipKind,
        user_id: Uuid,
        recipe_id: Uuid,
    ) -> Result<bool, StoreError> {
        membership_repo::has_membership(&mut self.tx, kind, user_id, recipe_id).await
    }

    async fn cart_lines(&mut self, user_id: Uuid) -> Result<Vec<CartLine>, StoreError> {
        membership_repo::cart_lines(&mut self.tx, user_id).await
    }

    async fn insert_subscription(
        &mut self,
        user_id: Uuid,
        author_id: Uuid,
    ) -> Result<Subscription, StoreError> {
        user_repo::insert_subscription(&mut self.tx, user_id, author_id).await
    }

    async fn delete_subscription(
        &mut self,
        user_id: Uuid,
        author_id: Uuid,
    ) -> Result<bool, StoreError> {
        user_repo::delete_subscription(&mut self.tx, user_id, author_id).await
    }

    async fn is_subscribed(&mut self, user_id: Uuid, author_id: Uuid) -> Result<bool, StoreError> {
        user_repo::is_subscribed(&mut self.tx, user_id, author_id).await
    }

    async fn list_subscriptions(
        &mut self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<User>, i64), StoreError> {
        user_repo::list_subscriptions(&mut self.tx, user_id, limit, offset).await
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }
}
