//! In-process store used when no database is configured, and by the tests.
//!
//! A transaction owns the table lock for its whole lifetime and works on a
//! copy of the tables; commit swaps the copy in. Transactions are therefore
//! fully serialized and a dropped transaction leaves no trace.

use std::sync::Arc;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::{constraints, Store, StoreError, StoreTx};
use crate::catalog::repo_types::{Ingredient, NewTag, Tag};
use crate::membership::repo_types::{CartLine, Membership, MembershipKind};
use crate::recipes::repo_types::{IngredientLine, NewRecipe, Recipe, RecipeChanges, RecipeFilter};
use crate::users::repo_types::{NewUser, Subscription, User};

#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone)]
struct StoredRecipe {
    seq: i64,
    recipe: Recipe,
}

#[derive(Debug, Clone)]
struct StoredLine {
    id: i64,
    recipe_id: Uuid,
    ingredient_id: i64,
    amount: i32,
}

#[derive(Debug, Clone)]
struct StoredMembership {
    kind: MembershipKind,
    membership: Membership,
}

#[derive(Debug, Clone, Default)]
struct Tables {
    next_id: i64,
    users: Vec<User>,
    ingredients: Vec<Ingredient>,
    tags: Vec<Tag>,
    recipes: Vec<StoredRecipe>,
    recipe_tags: Vec<(Uuid, i64)>,
    lines: Vec<StoredLine>,
    memberships: Vec<StoredMembership>,
    subscriptions: Vec<Subscription>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn user_exists(&self, id: Uuid) -> bool {
        self.users.iter().any(|u| u.id == id)
    }

    fn recipe(&self, id: Uuid) -> Option<&Recipe> {
        self.recipes.iter().find(|r| r.recipe.id == id).map(|r| &r.recipe)
    }

    fn has_membership(&self, kind: MembershipKind, user_id: Uuid, recipe_id: Uuid) -> bool {
        self.memberships.iter().any(|m| {
            m.kind == kind && m.membership.user_id == user_id && m.membership.recipe_id == recipe_id
        })
    }

    fn recipe_has_tag_slug(&self, recipe_id: Uuid, slugs: &[String]) -> bool {
        self.recipe_tags
            .iter()
            .filter(|(r, _)| *r == recipe_id)
            .filter_map(|(_, tag_id)| self.tags.iter().find(|t| t.id == *tag_id))
            .any(|t| slugs.contains(&t.slug))
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>, StoreError> {
        let guard = self.tables.clone().lock_owned().await;
        let work = guard.clone();
        Ok(Box::new(MemoryTx { guard, work }))
    }
}

pub struct MemoryTx {
    guard: OwnedMutexGuard<Tables>,
    work: Tables,
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn user(&mut self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.work.users.iter().find(|u| u.id == id).cloned())
    }

    async fn upsert_user(&mut self, user: &NewUser) -> Result<User, StoreError> {
        if let Some(existing) = self.work.users.iter_mut().find(|u| u.email == user.email) {
            existing.username = user.username.clone();
            existing.first_name = user.first_name.clone();
            existing.last_name = user.last_name.clone();
            return Ok(existing.clone());
        }
        if self.work.users.iter().any(|u| u.username == user.username) {
            return Err(StoreError::UniqueViolation("users_username_key".into()));
        }
        let row = User {
            id: user.id.unwrap_or_else(Uuid::new_v4),
            email: user.email.clone(),
            username: user.username.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            created_at: OffsetDateTime::now_utc(),
        };
        self.work.users.push(row.clone());
        Ok(row)
    }

    async fn list_users(
        &mut self,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<User>, i64), StoreError> {
        let mut users = self.work.users.clone();
        users.sort_by_cached_key(|u| (u.username.to_lowercase(), u.username.clone()));
        let total = users.len() as i64;
        let page = users
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect();
        Ok((page, total))
    }

    async fn ingredient(&mut self, id: i64) -> Result<Option<Ingredient>, StoreError> {
        Ok(self.work.ingredients.iter().find(|i| i.id == id).cloned())
    }

    async fn find_ingredient(
        &mut self,
        name: &str,
        measurement_unit: &str,
    ) -> Result<Option<Ingredient>, StoreError> {
        Ok(self
            .work
            .ingredients
            .iter()
            .find(|i| i.name == name && i.measurement_unit == measurement_unit)
            .cloned())
    }

    async fn insert_ingredient(
        &mut self,
        name: &str,
        measurement_unit: &str,
    ) -> Result<Ingredient, StoreError> {
        if let Some(existing) = self.find_ingredient(name, measurement_unit).await? {
            return Ok(existing);
        }
        let row = Ingredient {
            id: self.work.next_id(),
            name: name.to_string(),
            measurement_unit: measurement_unit.to_string(),
        };
        self.work.ingredients.push(row.clone());
        Ok(row)
    }

    async fn list_ingredients(
        &mut self,
        name_prefix: Option<&str>,
    ) -> Result<Vec<Ingredient>, StoreError> {
        let prefix = name_prefix.map(str::to_lowercase);
        let mut rows: Vec<Ingredient> = self
            .work
            .ingredients
            .iter()
            .filter(|i| match &prefix {
                Some(p) => i.name.to_lowercase().starts_with(p.as_str()),
                None => true,
            })
            .cloned()
            .collect();
        rows.sort_by_cached_key(|i| (i.name.to_lowercase(), i.id));
        Ok(rows)
    }

    async fn tag(&mut self, id: i64) -> Result<Option<Tag>, StoreError> {
        Ok(self.work.tags.iter().find(|t| t.id == id).cloned())
    }

    async fn tags_by_ids(&mut self, ids: &[i64]) -> Result<Vec<Tag>, StoreError> {
        Ok(self
            .work
            .tags
            .iter()
            .filter(|t| ids.contains(&t.id))
            .cloned()
            .collect())
    }

    async fn list_tags(&mut self) -> Result<Vec<Tag>, StoreError> {
        Ok(self.work.tags.clone())
    }

    async fn upsert_tag(&mut self, tag: &NewTag) -> Result<Tag, StoreError> {
        if self
            .work
            .tags
            .iter()
            .any(|t| t.name == tag.name && t.slug != tag.slug)
        {
            return Err(StoreError::UniqueViolation("tags_name_key".into()));
        }
        if let Some(existing) = self.work.tags.iter_mut().find(|t| t.slug == tag.slug) {
            existing.name = tag.name.clone();
            existing.color = tag.color.clone();
            return Ok(existing.clone());
        }
        let row = Tag {
            id: self.work.next_id(),
            name: tag.name.clone(),
            color: tag.color.clone(),
            slug: tag.slug.clone(),
        };
        self.work.tags.push(row.clone());
        Ok(row)
    }

    async fn insert_recipe(&mut self, recipe: &NewRecipe) -> Result<Recipe, StoreError> {
        if !self.work.user_exists(recipe.author_id) {
            return Err(StoreError::ForeignKeyViolation(constraints::RECIPE_AUTHOR.into()));
        }
        if self.work.recipes.iter().any(|r| r.recipe.name == recipe.name) {
            return Err(StoreError::UniqueViolation(constraints::RECIPE_NAME.into()));
        }
        if recipe.cooking_time < 1 {
            return Err(StoreError::CheckViolation("recipes_cooking_time_check".into()));
        }
        let row = Recipe {
            id: Uuid::new_v4(),
            author_id: recipe.author_id,
            name: recipe.name.clone(),
            text: recipe.text.clone(),
            cooking_time: recipe.cooking_time,
            image: recipe.image.clone(),
            created_at: OffsetDateTime::now_utc(),
        };
        let seq = self.work.next_id();
        self.work.recipes.push(StoredRecipe {
            seq,
            recipe: row.clone(),
        });
        Ok(row)
    }

    async fn update_recipe(
        &mut self,
        id: Uuid,
        changes: &RecipeChanges,
    ) -> Result<Recipe, StoreError> {
        if let Some(name) = &changes.name {
            if self
                .work
                .recipes
                .iter()
                .any(|r| r.recipe.id != id && &r.recipe.name == name)
            {
                return Err(StoreError::UniqueViolation(constraints::RECIPE_NAME.into()));
            }
        }
        if matches!(changes.cooking_time, Some(t) if t < 1) {
            return Err(StoreError::CheckViolation("recipes_cooking_time_check".into()));
        }
        let stored = self
            .work
            .recipes
            .iter_mut()
            .find(|r| r.recipe.id == id)
            .ok_or(StoreError::Database(sqlx::Error::RowNotFound))?;
        let recipe = &mut stored.recipe;
        if let Some(name) = &changes.name {
            recipe.name = name.clone();
        }
        if let Some(text) = &changes.text {
            recipe.text = text.clone();
        }
        if let Some(cooking_time) = changes.cooking_time {
            recipe.cooking_time = cooking_time;
        }
        if let Some(image) = &changes.image {
            recipe.image = Some(image.clone());
        }
        Ok(recipe.clone())
    }

    async fn recipe(&mut self, id: Uuid) -> Result<Option<Recipe>, StoreError> {
        Ok(self.work.recipe(id).cloned())
    }

    async fn delete_recipe(&mut self, id: Uuid) -> Result<bool, StoreError> {
        let before = self.work.recipes.len();
        self.work.recipes.retain(|r| r.recipe.id != id);
        if self.work.recipes.len() == before {
            return Ok(false);
        }
        self.work.recipe_tags.retain(|(r, _)| *r != id);
        self.work.lines.retain(|l| l.recipe_id != id);
        self.work.memberships.retain(|m| m.membership.recipe_id != id);
        Ok(true)
    }

    async fn list_recipes(
        &mut self,
        filter: &RecipeFilter,
    ) -> Result<(Vec<Recipe>, i64), StoreError> {
        let t = &self.work;
        let mut matching: Vec<&StoredRecipe> = t
            .recipes
            .iter()
            .filter(|r| filter.author.map_or(true, |a| r.recipe.author_id == a))
            .filter(|r| {
                filter.tag_slugs.is_empty() || t.recipe_has_tag_slug(r.recipe.id, &filter.tag_slugs)
            })
            .filter(|r| {
                filter.favorited_by.map_or(true, |u| {
                    t.has_membership(MembershipKind::Favorite, u, r.recipe.id)
                })
            })
            .filter(|r| {
                filter.in_cart_of.map_or(true, |u| {
                    t.has_membership(MembershipKind::ShoppingCart, u, r.recipe.id)
                })
            })
            .collect();
        matching.sort_by(|a, b| b.seq.cmp(&a.seq));

        let total = matching.len() as i64;
        let page = matching
            .into_iter()
            .skip(filter.offset.max(0) as usize)
            .take(filter.limit.max(0) as usize)
            .map(|r| r.recipe.clone())
            .collect();
        Ok((page, total))
    }

    async fn set_recipe_tags(
        &mut self,
        recipe_id: Uuid,
        tag_ids: &[i64],
    ) -> Result<(), StoreError> {
        if let Some(missing) = tag_ids
            .iter()
            .find(|id| !self.work.tags.iter().any(|t| t.id == **id))
        {
            return Err(StoreError::ForeignKeyViolation(format!(
                "{} ({missing})",
                constraints::RECIPE_TAG
            )));
        }
        self.work.recipe_tags.retain(|(r, _)| *r != recipe_id);
        self.work
            .recipe_tags
            .extend(tag_ids.iter().map(|tag_id| (recipe_id, *tag_id)));
        Ok(())
    }

    async fn recipe_tags(&mut self, recipe_id: Uuid) -> Result<Vec<Tag>, StoreError> {
        let t = &self.work;
        let mut tags: Vec<Tag> = t
            .recipe_tags
            .iter()
            .filter(|(r, _)| *r == recipe_id)
            .filter_map(|(_, tag_id)| t.tags.iter().find(|tag| tag.id == *tag_id).cloned())
            .collect();
        tags.sort_by_key(|tag| tag.id);
        Ok(tags)
    }

    async fn delete_recipe_lines(&mut self, recipe_id: Uuid) -> Result<(), StoreError> {
        self.work.lines.retain(|l| l.recipe_id != recipe_id);
        Ok(())
    }

    async fn insert_recipe_lines(
        &mut self,
        recipe_id: Uuid,
        lines: &[(i64, i32)],
    ) -> Result<(), StoreError> {
        // row by row, so a bad row fails with the earlier ones already written
        for &(ingredient_id, amount) in lines {
            if !self.work.ingredients.iter().any(|i| i.id == ingredient_id) {
                return Err(StoreError::ForeignKeyViolation(format!(
                    "{} ({ingredient_id})",
                    constraints::RECIPE_LINE_INGREDIENT
                )));
            }
            if self
                .work
                .lines
                .iter()
                .any(|l| l.recipe_id == recipe_id && l.ingredient_id == ingredient_id)
            {
                return Err(StoreError::UniqueViolation(
                    constraints::RECIPE_LINE_UNIQUE.into(),
                ));
            }
            if amount < 1 {
                return Err(StoreError::CheckViolation("recipe_ingredients_amount_check".into()));
            }
            let id = self.work.next_id();
            self.work.lines.push(StoredLine {
                id,
                recipe_id,
                ingredient_id,
                amount,
            });
        }
        Ok(())
    }

    async fn recipe_lines(&mut self, recipe_id: Uuid) -> Result<Vec<IngredientLine>, StoreError> {
        let t = &self.work;
        let mut lines: Vec<&StoredLine> = t.lines.iter().filter(|l| l.recipe_id == recipe_id).collect();
        lines.sort_by_key(|l| l.id);
        Ok(lines
            .into_iter()
            .filter_map(|l| {
                t.ingredients
                    .iter()
                    .find(|i| i.id == l.ingredient_id)
                    .map(|i| IngredientLine {
                        ingredient_id: i.id,
                        name: i.name.clone(),
                        measurement_unit: i.measurement_unit.clone(),
                        amount: l.amount,
                    })
            })
            .collect())
    }

    async fn insert_membership(
        &mut self,
        kind: MembershipKind,
        user_id: Uuid,
        recipe_id: Uuid,
    ) -> Result<Membership, StoreError> {
        if !self.work.user_exists(user_id) {
            return Err(StoreError::ForeignKeyViolation(
                constraints::MEMBERSHIP_USER.into(),
            ));
        }
        if self.work.recipe(recipe_id).is_none() {
            return Err(StoreError::ForeignKeyViolation(
                constraints::MEMBERSHIP_RECIPE.into(),
            ));
        }
        if self.work.has_membership(kind, user_id, recipe_id) {
            return Err(StoreError::UniqueViolation(
                constraints::MEMBERSHIP_UNIQUE.into(),
            ));
        }
        let membership = Membership {
            id: self.work.next_id(),
            user_id,
            recipe_id,
            created_at: OffsetDateTime::now_utc(),
        };
        self.work.memberships.push(StoredMembership {
            kind,
            membership: membership.clone(),
        });
        Ok(membership)
    }

    async fn delete_membership(
        &mut self,
        kind: MembershipKind,
        user_id: Uuid,
        recipe_id: Uuid,
    ) -> Result<bool, StoreError> {
        let before = self.work.memberships.len();
        self.work.memberships.retain(|m| {
            !(m.kind == kind && m.membership.user_id == user_id && m.membership.recipe_id == recipe_id)
        });
        Ok(self.work.memberships.len() < before)
    }

    async fn has_membership(
        &mut self,
        kind: MembershipKind,
        user_id: Uuid,
        recipe_id: Uuid,
    ) -> Result<bool, StoreError> {
        Ok(self.work.has_membership(kind, user_id, recipe_id))
    }

    async fn cart_lines(&mut self, user_id: Uuid) -> Result<Vec<CartLine>, StoreError> {
        let t = &self.work;
        let mut entries: Vec<&Membership> = t
            .memberships
            .iter()
            .filter(|m| m.kind == MembershipKind::ShoppingCart && m.membership.user_id == user_id)
            .map(|m| &m.membership)
            .collect();
        entries.sort_by_key(|m| m.id);

        let mut out = Vec::new();
        for entry in entries {
            let mut lines: Vec<&StoredLine> = t
                .lines
                .iter()
                .filter(|l| l.recipe_id == entry.recipe_id)
                .collect();
            lines.sort_by_key(|l| l.id);
            for line in lines {
                if let Some(ingredient) = t.ingredients.iter().find(|i| i.id == line.ingredient_id) {
                    out.push(CartLine {
                        name: ingredient.name.clone(),
                        measurement_unit: ingredient.measurement_unit.clone(),
                        amount: line.amount,
                    });
                }
            }
        }
        Ok(out)
    }

    async fn insert_subscription(
        &mut self,
        user_id: Uuid,
        author_id: Uuid,
    ) -> Result<Subscription, StoreError> {
        if user_id == author_id {
            return Err(StoreError::CheckViolation(constraints::SUBSCRIPTION_SELF.into()));
        }
        if !self.work.user_exists(user_id) {
            return Err(StoreError::ForeignKeyViolation(
                constraints::SUBSCRIPTION_USER.into(),
            ));
        }
        if !self.work.user_exists(author_id) {
            return Err(StoreError::ForeignKeyViolation(
                constraints::SUBSCRIPTION_AUTHOR.into(),
            ));
        }
        if self
            .work
            .subscriptions
            .iter()
            .any(|s| s.user_id == user_id && s.author_id == author_id)
        {
            return Err(StoreError::UniqueViolation(
                constraints::SUBSCRIPTION_UNIQUE.into(),
            ));
        }
        let row = Subscription {
            id: self.work.next_id(),
            user_id,
            author_id,
        };
        self.work.subscriptions.push(row.clone());
        Ok(row)
    }

    async fn delete_subscription(
        &mut self,
        user_id: Uuid,
        author_id: Uuid,
    ) -> Result<bool, StoreError> {
        let before = self.work.subscriptions.len();
        self.work
            .subscriptions
            .retain(|s| !(s.user_id == user_id && s.author_id == author_id));
        Ok(self.work.subscriptions.len() < before)
    }

    async fn is_subscribed(&mut self, user_id: Uuid, author_id: Uuid) -> Result<bool, StoreError> {
        Ok(self
            .work
            .subscriptions
            .iter()
            .any(|s| s.user_id == user_id && s.author_id == author_id))
    }

    async fn list_subscriptions(
        &mut self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<User>, i64), StoreError> {
        let t = &self.work;
        let mut subs: Vec<&Subscription> =
            t.subscriptions.iter().filter(|s| s.user_id == user_id).collect();
        subs.sort_by(|a, b| b.id.cmp(&a.id));
        let total = subs.len() as i64;
        let authors = subs
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .filter_map(|s| t.users.iter().find(|u| u.id == s.author_id).cloned())
            .collect();
        Ok((authors, total))
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let MemoryTx { mut guard, work } = *self;
        *guard = work;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seeded() -> (MemoryStore, Uuid) {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        let user = tx
            .upsert_user(&NewUser {
                id: None,
                email: "cook@example.com".into(),
                username: "cook".into(),
                first_name: String::new(),
                last_name: String::new(),
            })
            .await
            .unwrap();
        tx.commit().await.unwrap();
        (store, user.id)
    }

    #[tokio::test]
    async fn dropped_transaction_is_rolled_back() {
        let (store, _) = seeded().await;
        {
            let mut tx = store.begin().await.unwrap();
            tx.insert_ingredient("flour", "g").await.unwrap();
        }
        let mut tx = store.begin().await.unwrap();
        assert!(tx.find_ingredient("flour", "g").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn committed_transaction_is_visible() {
        let (store, _) = seeded().await;
        let mut tx = store.begin().await.unwrap();
        let flour = tx.insert_ingredient("flour", "g").await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        assert_eq!(tx.ingredient(flour.id).await.unwrap(), Some(flour));
    }

    #[tokio::test]
    async fn deleting_recipe_cascades() {
        let (store, author_id) = seeded().await;
        let mut tx = store.begin().await.unwrap();
        let flour = tx.insert_ingredient("flour", "g").await.unwrap();
        let recipe = tx
            .insert_recipe(&NewRecipe {
                author_id,
                name: "bread".into(),
                text: "bake".into(),
                cooking_time: 60,
                image: None,
            })
            .await
            .unwrap();
        tx.insert_recipe_lines(recipe.id, &[(flour.id, 500)]).await.unwrap();
        tx.insert_membership(MembershipKind::ShoppingCart, author_id, recipe.id)
            .await
            .unwrap();
        tx.insert_membership(MembershipKind::Favorite, author_id, recipe.id)
            .await
            .unwrap();

        assert!(tx.delete_recipe(recipe.id).await.unwrap());
        assert!(tx.recipe_lines(recipe.id).await.unwrap().is_empty());
        assert!(tx.cart_lines(author_id).await.unwrap().is_empty());
        assert!(!tx
            .has_membership(MembershipKind::Favorite, author_id, recipe.id)
            .await
            .unwrap());
        // the catalog row survives
        assert!(tx.ingredient(flour.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn membership_pair_is_unique_per_kind() {
        let (store, author_id) = seeded().await;
        let mut tx = store.begin().await.unwrap();
        let recipe = tx
            .insert_recipe(&NewRecipe {
                author_id,
                name: "soup".into(),
                text: "boil".into(),
                cooking_time: 30,
                image: None,
            })
            .await
            .unwrap();
        tx.insert_membership(MembershipKind::ShoppingCart, author_id, recipe.id)
            .await
            .unwrap();
        tx.insert_membership(MembershipKind::Favorite, author_id, recipe.id)
            .await
            .unwrap();
        let err = tx
            .insert_membership(MembershipKind::ShoppingCart, author_id, recipe.id)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation(c) if c == constraints::MEMBERSHIP_UNIQUE));
    }

    #[tokio::test]
    async fn memberships_and_subscriptions_need_a_known_user() {
        let (store, author_id) = seeded().await;
        let stranger = Uuid::new_v4();
        let mut tx = store.begin().await.unwrap();
        let recipe = tx
            .insert_recipe(&NewRecipe {
                author_id,
                name: "stew".into(),
                text: "simmer".into(),
                cooking_time: 90,
                image: None,
            })
            .await
            .unwrap();

        let err = tx
            .insert_membership(MembershipKind::Favorite, stranger, recipe.id)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::ForeignKeyViolation(c) if c == constraints::MEMBERSHIP_USER));

        let err = tx.insert_subscription(stranger, author_id).await.unwrap_err();
        assert!(matches!(err, StoreError::ForeignKeyViolation(c) if c == constraints::SUBSCRIPTION_USER));
    }
}
