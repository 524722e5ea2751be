use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// The two per-user recipe sets. Same contract, different set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipKind {
    Favorite,
    ShoppingCart,
}

impl MembershipKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MembershipKind::Favorite => "favorite",
            MembershipKind::ShoppingCart => "shopping_cart",
        }
    }

    /// Human label used in error messages.
    pub fn label(self) -> &'static str {
        match self {
            MembershipKind::Favorite => "favorites",
            MembershipKind::ShoppingCart => "shopping cart",
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct Membership {
    pub id: i64,
    pub user_id: Uuid,
    pub recipe_id: Uuid,
    pub created_at: OffsetDateTime,
}

/// One ingredient line reached through a cart entry.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct CartLine {
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}
