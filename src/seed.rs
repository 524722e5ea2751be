//! Development fixtures loaded at startup when `SEED_FILE` is set.
//!
//! ```json
//! { "ingredients": [{ "name": "flour", "measurement_unit": "g" }],
//!   "tags": [{ "name": "Breakfast", "color": "#E26C2D", "slug": "breakfast" }],
//!   "users": [{ "email": "cook@example.com", "username": "cook" }] }
//! ```
//!
//! A bare array of `{name, measurement_unit}` objects is read as the
//! ingredients section alone. Every section is optional and loading the same
//! file twice changes nothing.

use std::path::Path;

use anyhow::Context;
use serde::Deserialize;
use tracing::{info, instrument};

use crate::catalog::repo_types::NewTag;
use crate::catalog::services::{resolve, validate_tag};
use crate::error::AppResult;
use crate::store::{Store, StoreTx};
use crate::users::repo_types::NewUser;

#[derive(Debug, Deserialize)]
pub struct SeedIngredient {
    pub name: String,
    pub measurement_unit: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SeedData {
    pub ingredients: Vec<SeedIngredient>,
    pub tags: Vec<NewTag>,
    pub users: Vec<NewUser>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SeedDocument {
    Ingredients(Vec<SeedIngredient>),
    Sections(SeedData),
}

impl SeedData {
    pub fn parse(raw: &str) -> serde_json::Result<Self> {
        Ok(match serde_json::from_str(raw)? {
            SeedDocument::Ingredients(ingredients) => SeedData {
                ingredients,
                ..Default::default()
            },
            SeedDocument::Sections(data) => data,
        })
    }
}

/// Rows created by a load; entries that already existed are not counted.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub ingredients: usize,
    pub tags: usize,
    pub users: usize,
}

async fn row_counts(tx: &mut dyn StoreTx) -> AppResult<SeedReport> {
    Ok(SeedReport {
        ingredients: tx.list_ingredients(None).await?.len(),
        tags: tx.list_tags().await?.len(),
        users: usize::try_from(tx.list_users(0, 0).await?.1).unwrap_or_default(),
    })
}

/// Applies the whole document in one transaction; a bad entry loads nothing.
pub async fn apply(store: &dyn Store, data: &SeedData) -> AppResult<SeedReport> {
    for tag in &data.tags {
        validate_tag(tag)?;
    }

    let mut tx = store.begin().await?;
    let before = row_counts(tx.as_mut()).await?;
    for item in &data.ingredients {
        resolve(tx.as_mut(), &item.name, &item.measurement_unit).await?;
    }
    for tag in &data.tags {
        tx.upsert_tag(tag).await?;
    }
    for user in &data.users {
        tx.upsert_user(user).await?;
    }
    let after = row_counts(tx.as_mut()).await?;
    tx.commit().await?;

    Ok(SeedReport {
        ingredients: after.ingredients.saturating_sub(before.ingredients),
        tags: after.tags.saturating_sub(before.tags),
        users: after.users.saturating_sub(before.users),
    })
}

#[instrument(skip(store))]
pub async fn load_file(store: &dyn Store, path: &Path) -> anyhow::Result<SeedReport> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("read seed file {}", path.display()))?;
    let data = SeedData::parse(&raw)
        .with_context(|| format!("parse seed file {}", path.display()))?;
    let report = apply(store, &data).await?;
    info!(
        ingredients = report.ingredients,
        tags = report.tags,
        users = report.users,
        "seed data loaded"
    );
    Ok(report)
}
