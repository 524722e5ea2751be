use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, instrument};

use crate::catalog::repo_types::{Ingredient, NewTag, Tag};
use crate::error::{AppError, AppResult};
use crate::store::{Store, StoreTx};

/// Column width of catalog names, units and slugs.
pub const MAX_FIELD_LEN: usize = 200;

/// Find the catalog row for `(name, unit)`, creating it when absent.
///
/// Runs inside the caller's transaction. Repeated calls with the same pair
/// return the same row.
pub async fn resolve(
    tx: &mut dyn StoreTx,
    name: &str,
    measurement_unit: &str,
) -> AppResult<Ingredient> {
    let name = name.trim();
    let measurement_unit = measurement_unit.trim();
    if name.is_empty() {
        return Err(AppError::validation("name", "ingredient name must not be blank"));
    }
    if measurement_unit.is_empty() {
        return Err(AppError::validation(
            "measurement_unit",
            "measurement unit must not be blank",
        ));
    }
    if name.chars().count() > MAX_FIELD_LEN {
        return Err(AppError::validation(
            "name",
            format!("ingredient name must be at most {MAX_FIELD_LEN} characters"),
        ));
    }
    if measurement_unit.chars().count() > MAX_FIELD_LEN {
        return Err(AppError::validation(
            "measurement_unit",
            format!("measurement unit must be at most {MAX_FIELD_LEN} characters"),
        ));
    }

    if let Some(found) = tx.find_ingredient(name, measurement_unit).await? {
        return Ok(found);
    }
    let created = tx.insert_ingredient(name, measurement_unit).await?;
    debug!(ingredient_id = created.id, name, measurement_unit, "ingredient created");
    Ok(created)
}

#[instrument(skip(store))]
pub async fn list_ingredients(store: &dyn Store, name: Option<&str>) -> AppResult<Vec<Ingredient>> {
    let prefix = name.map(str::trim).filter(|p| !p.is_empty());
    let mut tx = store.begin().await?;
    Ok(tx.list_ingredients(prefix).await?)
}

#[instrument(skip(store))]
pub async fn get_ingredient(store: &dyn Store, id: i64) -> AppResult<Ingredient> {
    let mut tx = store.begin().await?;
    tx.ingredient(id)
        .await?
        .ok_or_else(|| AppError::not_found("ingredient not found"))
}

pub async fn list_tags(store: &dyn Store) -> AppResult<Vec<Tag>> {
    let mut tx = store.begin().await?;
    Ok(tx.list_tags().await?)
}

pub async fn get_tag(store: &dyn Store, id: i64) -> AppResult<Tag> {
    let mut tx = store.begin().await?;
    tx.tag(id).await?.ok_or_else(|| AppError::not_found("tag not found"))
}

pub fn validate_tag(tag: &NewTag) -> AppResult<()> {
    lazy_static! {
        static ref COLOR_RE: Regex = Regex::new(r"^#[0-9A-Fa-f]{6}$").unwrap();
        static ref SLUG_RE: Regex = Regex::new(r"^[-a-zA-Z0-9_]+$").unwrap();
    }
    if tag.name.trim().is_empty() || tag.name.chars().count() > MAX_FIELD_LEN {
        return Err(AppError::validation("name", "tag name must be 1-200 characters"));
    }
    if !COLOR_RE.is_match(&tag.color) {
        return Err(AppError::validation("color", "color must look like #RRGGBB"));
    }
    if tag.slug.chars().count() > MAX_FIELD_LEN || !SLUG_RE.is_match(&tag.slug) {
        return Err(AppError::validation(
            "slug",
            "slug may contain only letters, digits, '-' and '_'",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn resolve_is_idempotent() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        let first = resolve(tx.as_mut(), "flour", "g").await.unwrap();
        let second = resolve(tx.as_mut(), "flour", "g").await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(first.id, second.id);
        let all = list_ingredients(&store, None).await.unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn resolve_keeps_units_apart() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        let grams = resolve(tx.as_mut(), "flour", "g").await.unwrap();
        let cups = resolve(tx.as_mut(), " flour ", "cup").await.unwrap();
        assert_ne!(grams.id, cups.id);
        assert_eq!(cups.name, "flour");
    }

    #[tokio::test]
    async fn resolve_rejects_blank_name() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        let err = resolve(tx.as_mut(), "  ", "g").await.unwrap_err();
        assert!(matches!(err, AppError::Validation { field: "name", .. }));
    }

    #[tokio::test]
    async fn resolve_rejects_over_long_name_and_unit() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        let long = "x".repeat(MAX_FIELD_LEN + 1);

        let err = resolve(tx.as_mut(), &long, "g").await.unwrap_err();
        assert!(matches!(err, AppError::Validation { field: "name", .. }));
        let err = resolve(tx.as_mut(), "flour", &long).await.unwrap_err();
        assert!(matches!(err, AppError::Validation { field: "measurement_unit", .. }));

        let edge = "x".repeat(MAX_FIELD_LEN);
        assert!(resolve(tx.as_mut(), &edge, "g").await.is_ok());
        assert!(tx.find_ingredient(&long, "g").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_filters_by_case_insensitive_prefix() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        for (name, unit) in [("sour cream", "ml"), ("Sugar", "g"), ("salt", "g")] {
            resolve(tx.as_mut(), name, unit).await.unwrap();
        }
        tx.commit().await.unwrap();

        let found = list_ingredients(&store, Some("S")).await.unwrap();
        let names: Vec<_> = found.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, ["salt", "sour cream", "Sugar"]);

        let found = list_ingredients(&store, Some("so")).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "sour cream");
    }

    #[tokio::test]
    async fn unknown_ingredient_is_not_found() {
        let store = MemoryStore::new();
        let err = get_ingredient(&store, 42).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn tag_color_and_slug_are_checked() {
        let good = NewTag {
            name: "Breakfast".into(),
            color: "#E26C2D".into(),
            slug: "breakfast".into(),
        };
        assert!(validate_tag(&good).is_ok());

        let bad_color = NewTag { color: "orange".into(), ..good.clone() };
        assert!(matches!(
            validate_tag(&bad_color),
            Err(AppError::Validation { field: "color", .. })
        ));

        let bad_slug = NewTag { slug: "late night".into(), ..good };
        assert!(matches!(
            validate_tag(&bad_slug),
            Err(AppError::Validation { field: "slug", .. })
        ));
    }
}
