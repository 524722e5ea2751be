use sqlx::PgConnection;
use uuid::Uuid;

use crate::membership::repo_types::{CartLine, Membership, MembershipKind};
use crate::store::StoreError;

pub async fn insert_membership(
    conn: &mut PgConnection,
    kind: MembershipKind,
    user_id: Uuid,
    recipe_id: Uuid,
) -> Result<Membership, StoreError> {
    let row = sqlx::query_as::<_, Membership>(
        r#"
        INSERT INTO recipe_memberships (user_id, recipe_id, kind)
        VALUES ($1, $2, $3)
        RETURNING id, user_id, recipe_id, created_at
        "#,
    )
    .bind(user_id)
    .bind(recipe_id)
    .bind(kind.as_str())
    .fetch_one(conn)
    .await?;
    Ok(row)
}

pub async fn delete_membership(
    conn: &mut PgConnection,
    kind: MembershipKind,
    user_id: Uuid,
    recipe_id: Uuid,
) -> Result<bool, StoreError> {
    let res = sqlx::query(
        r#"DELETE FROM recipe_memberships WHERE user_id = $1 AND recipe_id = $2 AND kind = $3"#,
    )
    .bind(user_id)
    .bind(recipe_id)
    .bind(kind.as_str())
    .execute(conn)
    .await?;
    Ok(res.rows_affected() > 0)
}

pub async fn has_membership(
    conn: &mut PgConnection,
    kind: MembershipKind,
    user_id: Uuid,
    recipe_id: Uuid,
) -> Result<bool, StoreError> {
    let exists: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM recipe_memberships
             WHERE user_id = $1 AND recipe_id = $2 AND kind = $3
        )
        "#,
    )
    .bind(user_id)
    .bind(recipe_id)
    .bind(kind.as_str())
    .fetch_one(conn)
    .await?;
    Ok(exists)
}

pub async fn cart_lines(conn: &mut PgConnection, user_id: Uuid) -> Result<Vec<CartLine>, StoreError> {
    let rows = sqlx::query_as::<_, CartLine>(
        r#"
        SELECT i.name, i.measurement_unit, ri.amount
          FROM recipe_memberships m
          JOIN recipe_ingredients ri ON ri.recipe_id = m.recipe_id
          JOIN ingredients i ON i.id = ri.ingredient_id
         WHERE m.user_id = $1 AND m.kind = 'shopping_cart'
         ORDER BY m.id, ri.id
        "#,
    )
    .bind(user_id)
    .fetch_all(conn)
    .await?;
    Ok(rows)
}
