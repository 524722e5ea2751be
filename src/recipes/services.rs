use std::collections::HashSet;

use tracing::{info, instrument};
use uuid::Uuid;

use crate::catalog::services::resolve;
use crate::error::{AppError, AppResult};
use crate::membership::repo_types::MembershipKind;
use crate::recipes::dto::{
    query_flag, CreateRecipeRequest, IngredientAmount, Page, RecipeDetails, RecipeQuery,
    UpdateRecipeRequest,
};
use crate::recipes::repo_types::{NewRecipe, Recipe, RecipeChanges, RecipeFilter};
use crate::store::{constraints, Store, StoreError, StoreTx};
use crate::users::dto::AuthorView;
use crate::users::repo_types::User;

const MAX_NAME_LEN: usize = 200;

/// How a recipe line names its ingredient.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IngredientRef {
    Id(i64),
    Named {
        name: String,
        measurement_unit: String,
    },
}

#[derive(Debug, Clone)]
pub struct IngredientEntry {
    pub ingredient: IngredientRef,
    pub amount: i32,
}

/// Checks done before any write: references well formed, no ingredient
/// listed twice, every amount positive.
pub fn parse_entries(items: &[IngredientAmount]) -> AppResult<Vec<IngredientEntry>> {
    if items.is_empty() {
        return Err(AppError::validation(
            "ingredients",
            "at least one ingredient is required",
        ));
    }

    let entries = items
        .iter()
        .map(|item| {
            let ingredient = match (item.id, &item.name, &item.measurement_unit) {
                (Some(id), _, _) => IngredientRef::Id(id),
                (None, Some(name), Some(unit)) => IngredientRef::Named {
                    name: name.trim().to_string(),
                    measurement_unit: unit.trim().to_string(),
                },
                _ => {
                    return Err(AppError::validation(
                        "ingredients",
                        "each ingredient needs an id, or a name and measurement_unit",
                    ))
                }
            };
            Ok(IngredientEntry {
                ingredient,
                amount: item.amount,
            })
        })
        .collect::<AppResult<Vec<_>>>()?;

    let mut seen = HashSet::new();
    if entries.iter().any(|e| !seen.insert(&e.ingredient)) {
        return Err(AppError::validation("ingredients", "duplicate ingredient"));
    }
    if let Some(bad) = entries.iter().find(|e| e.amount < 1) {
        return Err(AppError::validation(
            "amount",
            format!("amount must be at least 1, got {}", bad.amount),
        ));
    }
    Ok(entries)
}

fn validate_cooking_time(minutes: i32) -> AppResult<i32> {
    if minutes < 1 {
        return Err(AppError::validation(
            "cooking_time",
            "cooking time must be at least 1 minute",
        ));
    }
    Ok(minutes)
}

/// Non-empty, duplicates collapsed, first occurrence order kept.
fn validate_tags(ids: &[i64]) -> AppResult<Vec<i64>> {
    if ids.is_empty() {
        return Err(AppError::validation("tags", "at least one tag is required"));
    }
    let mut seen = HashSet::new();
    Ok(ids.iter().copied().filter(|id| seen.insert(*id)).collect())
}

fn validate_name(name: &str) -> AppResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::validation("name", "name must not be blank"));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(AppError::validation(
            "name",
            format!("name must be at most {MAX_NAME_LEN} characters"),
        ));
    }
    Ok(name.to_string())
}

fn validate_text(text: &str) -> AppResult<String> {
    if text.trim().is_empty() {
        return Err(AppError::validation("text", "text must not be blank"));
    }
    Ok(text.to_string())
}

/// Constraint hits during the composite write, in domain terms.
fn map_write_error(e: StoreError) -> AppError {
    match &e {
        StoreError::UniqueViolation(c) if c.starts_with(constraints::RECIPE_NAME) => {
            AppError::conflict("a recipe with this name already exists")
        }
        StoreError::UniqueViolation(c) if c.starts_with(constraints::RECIPE_LINE_UNIQUE) => {
            AppError::validation("ingredients", "duplicate ingredient")
        }
        StoreError::ForeignKeyViolation(c) if c.starts_with(constraints::RECIPE_LINE_INGREDIENT) => {
            AppError::validation("ingredients", "unknown ingredient")
        }
        StoreError::ForeignKeyViolation(c) if c.starts_with(constraints::RECIPE_TAG) => {
            AppError::validation("tags", "unknown tag")
        }
        StoreError::ForeignKeyViolation(c) if c.starts_with(constraints::RECIPE_AUTHOR) => {
            AppError::not_found("author not found")
        }
        _ => AppError::Store(e),
    }
}

async fn ensure_tags_exist(tx: &mut dyn StoreTx, ids: &[i64]) -> AppResult<()> {
    let found = tx.tags_by_ids(ids).await?;
    if let Some(missing) = ids.iter().find(|id| !found.iter().any(|t| t.id == **id)) {
        return Err(AppError::validation("tags", format!("unknown tag {missing}")));
    }
    Ok(())
}

/// Turn entries into `(ingredient_id, amount)` rows, creating catalog rows
/// for named references. Two references landing on the same row are a
/// duplicate.
async fn resolve_lines(
    tx: &mut dyn StoreTx,
    entries: &[IngredientEntry],
) -> AppResult<Vec<(i64, i32)>> {
    let mut lines = Vec::with_capacity(entries.len());
    let mut seen = HashSet::new();
    for entry in entries {
        let id = match &entry.ingredient {
            IngredientRef::Id(id) => *id,
            IngredientRef::Named {
                name,
                measurement_unit,
            } => resolve(tx, name, measurement_unit).await?.id,
        };
        if !seen.insert(id) {
            return Err(AppError::validation("ingredients", "duplicate ingredient"));
        }
        lines.push((id, entry.amount));
    }
    Ok(lines)
}

async fn existing_recipe(tx: &mut dyn StoreTx, id: Uuid) -> AppResult<Recipe> {
    tx.recipe(id)
        .await?
        .ok_or_else(|| AppError::not_found("recipe not found"))
}

fn ensure_author(recipe: &Recipe, user_id: Uuid) -> AppResult<()> {
    if recipe.author_id != user_id {
        return Err(AppError::Forbidden(
            "only the author may modify this recipe".into(),
        ));
    }
    Ok(())
}

async fn assemble(
    tx: &mut dyn StoreTx,
    recipe: Recipe,
    author: User,
    viewer: Option<Uuid>,
) -> AppResult<RecipeDetails> {
    let tags = tx.recipe_tags(recipe.id).await?;
    let ingredients = tx.recipe_lines(recipe.id).await?;
    let (is_favorited, is_in_shopping_cart, is_subscribed) = match viewer {
        Some(v) => (
            tx.has_membership(MembershipKind::Favorite, v, recipe.id).await?,
            tx.has_membership(MembershipKind::ShoppingCart, v, recipe.id)
                .await?,
            tx.is_subscribed(v, author.id).await?,
        ),
        None => (false, false, false),
    };

    Ok(RecipeDetails {
        id: recipe.id,
        author: AuthorView::new(author, is_subscribed),
        name: recipe.name,
        text: recipe.text,
        cooking_time: recipe.cooking_time,
        image: recipe.image,
        tags,
        ingredients,
        is_favorited,
        is_in_shopping_cart,
        created_at: recipe.created_at,
    })
}

async fn load_details(
    tx: &mut dyn StoreTx,
    recipe: Recipe,
    viewer: Option<Uuid>,
) -> AppResult<RecipeDetails> {
    let author = tx
        .user(recipe.author_id)
        .await?
        .ok_or_else(|| AppError::not_found("author not found"))?;
    assemble(tx, recipe, author, viewer).await
}

/// Create a recipe with its tags and ingredient lines in one transaction.
#[instrument(skip(store, req), fields(name = %req.name))]
pub async fn create_recipe(
    store: &dyn Store,
    author_id: Uuid,
    req: CreateRecipeRequest,
) -> AppResult<RecipeDetails> {
    let entries = parse_entries(&req.ingredients)?;
    let cooking_time = validate_cooking_time(req.cooking_time)?;
    let tag_ids = validate_tags(&req.tags)?;
    let name = validate_name(&req.name)?;
    let text = validate_text(&req.text)?;

    let mut tx = store.begin().await?;
    let author = tx
        .user(author_id)
        .await?
        .ok_or_else(|| AppError::not_found("author not found"))?;
    ensure_tags_exist(tx.as_mut(), &tag_ids).await?;
    let lines = resolve_lines(tx.as_mut(), &entries).await?;

    let recipe = tx
        .insert_recipe(&NewRecipe {
            author_id,
            name,
            text,
            cooking_time,
            image: req.image,
        })
        .await
        .map_err(map_write_error)?;
    tx.set_recipe_tags(recipe.id, &tag_ids)
        .await
        .map_err(map_write_error)?;
    tx.insert_recipe_lines(recipe.id, &lines)
        .await
        .map_err(map_write_error)?;

    let details = assemble(tx.as_mut(), recipe, author, Some(author_id)).await?;
    tx.commit().await?;

    info!(recipe_id = %details.id, %author_id, lines = lines.len(), "recipe created");
    Ok(details)
}

/// Partial update. Supplied `tags`/`ingredients` replace the stored sets;
/// catalog rows are never modified.
#[instrument(skip(store, req))]
pub async fn update_recipe(
    store: &dyn Store,
    user_id: Uuid,
    recipe_id: Uuid,
    req: UpdateRecipeRequest,
) -> AppResult<RecipeDetails> {
    let entries = req.ingredients.as_deref().map(parse_entries).transpose()?;
    let cooking_time = req.cooking_time.map(validate_cooking_time).transpose()?;
    let tag_ids = req.tags.as_deref().map(validate_tags).transpose()?;
    let name = req.name.as_deref().map(validate_name).transpose()?;
    let text = req.text.as_deref().map(validate_text).transpose()?;

    let mut tx = store.begin().await?;
    let recipe = existing_recipe(tx.as_mut(), recipe_id).await?;
    ensure_author(&recipe, user_id)?;

    if let Some(tag_ids) = &tag_ids {
        ensure_tags_exist(tx.as_mut(), tag_ids).await?;
    }
    let lines = match &entries {
        Some(entries) => Some(resolve_lines(tx.as_mut(), entries).await?),
        None => None,
    };

    let changes = RecipeChanges {
        name,
        text,
        cooking_time,
        image: req.image,
    };
    let recipe = tx
        .update_recipe(recipe_id, &changes)
        .await
        .map_err(map_write_error)?;

    if let Some(tag_ids) = &tag_ids {
        tx.set_recipe_tags(recipe_id, tag_ids)
            .await
            .map_err(map_write_error)?;
    }
    if let Some(lines) = &lines {
        tx.delete_recipe_lines(recipe_id).await?;
        tx.insert_recipe_lines(recipe_id, lines)
            .await
            .map_err(map_write_error)?;
    }

    let details = load_details(tx.as_mut(), recipe, Some(user_id)).await?;
    tx.commit().await?;

    info!(%recipe_id, %user_id, "recipe updated");
    Ok(details)
}

#[instrument(skip(store))]
pub async fn delete_recipe(store: &dyn Store, user_id: Uuid, recipe_id: Uuid) -> AppResult<()> {
    let mut tx = store.begin().await?;
    let recipe = existing_recipe(tx.as_mut(), recipe_id).await?;
    ensure_author(&recipe, user_id)?;
    tx.delete_recipe(recipe_id).await?;
    tx.commit().await?;
    info!(%recipe_id, %user_id, "recipe deleted");
    Ok(())
}

pub async fn get_recipe(
    store: &dyn Store,
    recipe_id: Uuid,
    viewer: Option<Uuid>,
) -> AppResult<RecipeDetails> {
    let mut tx = store.begin().await?;
    let recipe = existing_recipe(tx.as_mut(), recipe_id).await?;
    load_details(tx.as_mut(), recipe, viewer).await
}

/// Favorite and cart filters only apply to authenticated viewers.
#[instrument(skip(store))]
pub async fn list_recipes(
    store: &dyn Store,
    query: &RecipeQuery,
    viewer: Option<Uuid>,
) -> AppResult<Page<RecipeDetails>> {
    let (limit, offset) = query.page().clamped();
    let filter = RecipeFilter {
        author: query.author,
        tag_slugs: query.tag_slugs(),
        favorited_by: viewer.filter(|_| query_flag(query.is_favorited.as_deref())),
        in_cart_of: viewer.filter(|_| query_flag(query.is_in_shopping_cart.as_deref())),
        limit,
        offset,
    };

    let mut tx = store.begin().await?;
    let (recipes, count) = tx.list_recipes(&filter).await?;
    let mut results = Vec::with_capacity(recipes.len());
    for recipe in recipes {
        results.push(load_details(tx.as_mut(), recipe, viewer).await?);
    }
    Ok(Page { count, results })
}
