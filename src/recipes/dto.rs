use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::catalog::repo_types::Tag;
use crate::recipes::repo_types::IngredientLine;
use crate::users::dto::AuthorView;

/// One `ingredients[]` element of a recipe payload: a catalog id, or a
/// name/unit pair resolved through the catalog.
#[derive(Debug, Clone, Deserialize)]
pub struct IngredientAmount {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub measurement_unit: Option<String>,
    pub amount: i32,
}

#[derive(Debug, Deserialize)]
pub struct CreateRecipeRequest {
    pub name: String,
    pub text: String,
    pub cooking_time: i32,
    #[serde(default)]
    pub image: Option<String>,
    pub tags: Vec<i64>,
    pub ingredients: Vec<IngredientAmount>,
}

/// Absent fields keep their stored value; `tags` and `ingredients`, when
/// present, replace the whole set.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateRecipeRequest {
    pub name: Option<String>,
    pub text: Option<String>,
    pub cooking_time: Option<i32>,
    pub image: Option<String>,
    pub tags: Option<Vec<i64>>,
    pub ingredients: Option<Vec<IngredientAmount>>,
}

#[derive(Debug, Serialize)]
pub struct RecipeDetails {
    pub id: Uuid,
    pub author: AuthorView,
    pub name: String,
    pub text: String,
    pub cooking_time: i32,
    pub image: Option<String>,
    pub tags: Vec<Tag>,
    pub ingredients: Vec<IngredientLine>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Compact form used in membership and subscription responses.
#[derive(Debug, Serialize)]
pub struct RecipeShort {
    pub id: Uuid,
    pub name: String,
    pub image: Option<String>,
    pub cooking_time: i32,
}

#[derive(Debug, Deserialize)]
pub struct RecipeQuery {
    pub author: Option<Uuid>,
    /// Tag slugs, any match. Accepts repeated `tags=` keys and
    /// comma separated values.
    #[serde(default)]
    pub tags: Vec<String>,
    pub is_favorited: Option<String>,
    pub is_in_shopping_cart: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

impl RecipeQuery {
    pub fn page(&self) -> Pagination {
        Pagination {
            limit: self.limit,
            offset: self.offset,
        }
    }

    pub fn tag_slugs(&self) -> Vec<String> {
        self.tags
            .iter()
            .flat_map(|t| t.split(','))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

#[derive(Debug, Deserialize)]
pub struct Pagination {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

pub(crate) fn default_limit() -> i64 {
    20
}

impl Pagination {
    pub const MAX_LIMIT: i64 = 100;

    pub fn clamped(&self) -> (i64, i64) {
        (self.limit.clamp(1, Self::MAX_LIMIT), self.offset.max(0))
    }
}

#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub count: i64,
    pub results: Vec<T>,
}

/// Query-string booleans as the web client sends them.
pub fn query_flag(value: Option<&str>) -> bool {
    matches!(value.map(str::trim), Some("1" | "true" | "True"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_flags() {
        assert!(query_flag(Some("1")));
        assert!(query_flag(Some("true")));
        assert!(!query_flag(Some("0")));
        assert!(!query_flag(None));
    }

    #[test]
    fn pagination_is_clamped() {
        let p = Pagination { limit: 1000, offset: -5 };
        assert_eq!(p.clamped(), (Pagination::MAX_LIMIT, 0));
        let p = Pagination { limit: 0, offset: 3 };
        assert_eq!(p.clamped(), (1, 3));
    }

    #[test]
    fn tag_slugs_split_on_commas() {
        let q: RecipeQuery =
            serde_json::from_str(r#"{"tags": ["breakfast, lunch,,", "dinner"]}"#).unwrap();
        assert_eq!(q.tag_slugs(), ["breakfast", "lunch", "dinner"]);
        assert_eq!(q.limit, 20);
    }

    #[test]
    fn update_request_fields_are_optional() {
        let req: UpdateRecipeRequest = serde_json::from_str(r#"{"cooking_time": 5}"#).unwrap();
        assert_eq!(req.cooking_time, Some(5));
        assert!(req.tags.is_none());
        assert!(req.ingredients.is_none());
    }
}
