//! Favorites and shopping cart share one contract; only the set differs.

use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::membership::repo_types::MembershipKind;
use crate::recipes::dto::RecipeShort;
use crate::store::{constraints, Store, StoreError};

/// Put a recipe into the user's set. A second add of the same pair is a
/// conflict; the unique index settles concurrent adds.
#[instrument(skip(store))]
pub async fn add(
    store: &dyn Store,
    kind: MembershipKind,
    user_id: Uuid,
    recipe_id: Uuid,
) -> AppResult<RecipeShort> {
    let mut tx = store.begin().await?;
    if tx.user(user_id).await?.is_none() {
        return Err(AppError::not_found("user not found"));
    }
    let recipe = tx
        .recipe(recipe_id)
        .await?
        .ok_or_else(|| AppError::not_found("recipe not found"))?;

    tx.insert_membership(kind, user_id, recipe_id)
        .await
        .map_err(|e| match e {
            StoreError::UniqueViolation(c) if c.starts_with(constraints::MEMBERSHIP_UNIQUE) => {
                AppError::conflict(format!("recipe is already in {}", kind.label()))
            }
            StoreError::ForeignKeyViolation(c) if c.starts_with(constraints::MEMBERSHIP_RECIPE) => {
                AppError::not_found("recipe not found")
            }
            StoreError::ForeignKeyViolation(c) if c.starts_with(constraints::MEMBERSHIP_USER) => {
                AppError::not_found("user not found")
            }
            other => AppError::Store(other),
        })?;
    tx.commit().await?;

    info!(kind = kind.as_str(), %user_id, %recipe_id, "membership added");
    Ok(RecipeShort {
        id: recipe.id,
        name: recipe.name,
        image: recipe.image,
        cooking_time: recipe.cooking_time,
    })
}

#[instrument(skip(store))]
pub async fn remove(
    store: &dyn Store,
    kind: MembershipKind,
    user_id: Uuid,
    recipe_id: Uuid,
) -> AppResult<()> {
    let mut tx = store.begin().await?;
    if !tx.delete_membership(kind, user_id, recipe_id).await? {
        return Err(AppError::not_found(format!(
            "recipe is not in {}",
            kind.label()
        )));
    }
    tx.commit().await?;
    info!(kind = kind.as_str(), %user_id, %recipe_id, "membership removed");
    Ok(())
}
