use sqlx::PgConnection;

use crate::catalog::repo_types::{Ingredient, NewTag, Tag};
use crate::store::StoreError;

pub async fn get_ingredient(
    conn: &mut PgConnection,
    id: i64,
) -> Result<Option<Ingredient>, StoreError> {
    let row = sqlx::query_as::<_, Ingredient>(
        r#"SELECT id, name, measurement_unit FROM ingredients WHERE id = $1"#,
    )
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(row)
}

pub async fn find_ingredient(
    conn: &mut PgConnection,
    name: &str,
    measurement_unit: &str,
) -> Result<Option<Ingredient>, StoreError> {
    let row = sqlx::query_as::<_, Ingredient>(
        r#"
        SELECT id, name, measurement_unit
          FROM ingredients
         WHERE name = $1 AND measurement_unit = $2
        "#,
    )
    .bind(name)
    .bind(measurement_unit)
    .fetch_optional(conn)
    .await?;
    Ok(row)
}

/// Insert-or-return. `ON CONFLICT DO UPDATE` with a no-op assignment makes
/// `RETURNING` yield the existing row when a concurrent insert won.
pub async fn insert_ingredient(
    conn: &mut PgConnection,
    name: &str,
    measurement_unit: &str,
) -> Result<Ingredient, StoreError> {
    let row = sqlx::query_as::<_, Ingredient>(
        r#"
        INSERT INTO ingredients (name, measurement_unit)
        VALUES ($1, $2)
        ON CONFLICT ON CONSTRAINT ingredients_name_measurement_unit_key
        DO UPDATE SET name = EXCLUDED.name
        RETURNING id, name, measurement_unit
        "#,
    )
    .bind(name)
    .bind(measurement_unit)
    .fetch_one(conn)
    .await?;
    Ok(row)
}

pub async fn list_ingredients(
    conn: &mut PgConnection,
    name_prefix: Option<&str>,
) -> Result<Vec<Ingredient>, StoreError> {
    let rows = match name_prefix {
        Some(prefix) => {
            sqlx::query_as::<_, Ingredient>(
                r#"
                SELECT id, name, measurement_unit
                  FROM ingredients
                 WHERE lower(name) LIKE $1 ESCAPE '\'
                 ORDER BY lower(name), id
                "#,
            )
            .bind(format!("{}%", escape_like(&prefix.to_lowercase())))
            .fetch_all(conn)
            .await?
        }
        None => {
            sqlx::query_as::<_, Ingredient>(
                r#"SELECT id, name, measurement_unit FROM ingredients ORDER BY lower(name), id"#,
            )
            .fetch_all(conn)
            .await?
        }
    };
    Ok(rows)
}

pub async fn get_tag(conn: &mut PgConnection, id: i64) -> Result<Option<Tag>, StoreError> {
    let row = sqlx::query_as::<_, Tag>(r#"SELECT id, name, color, slug FROM tags WHERE id = $1"#)
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(row)
}

pub async fn tags_by_ids(conn: &mut PgConnection, ids: &[i64]) -> Result<Vec<Tag>, StoreError> {
    let rows = sqlx::query_as::<_, Tag>(
        r#"SELECT id, name, color, slug FROM tags WHERE id = ANY($1) ORDER BY id"#,
    )
    .bind(ids)
    .fetch_all(conn)
    .await?;
    Ok(rows)
}

pub async fn list_tags(conn: &mut PgConnection) -> Result<Vec<Tag>, StoreError> {
    let rows = sqlx::query_as::<_, Tag>(r#"SELECT id, name, color, slug FROM tags ORDER BY id"#)
        .fetch_all(conn)
        .await?;
    Ok(rows)
}

pub async fn upsert_tag(conn: &mut PgConnection, tag: &NewTag) -> Result<Tag, StoreError> {
    let row = sqlx::query_as::<_, Tag>(
        r#"
        INSERT INTO tags (name, color, slug)
        VALUES ($1, $2, $3)
        ON CONFLICT ON CONSTRAINT tags_slug_key
        DO UPDATE SET name = EXCLUDED.name, color = EXCLUDED.color
        RETURNING id, name, color, slug
        "#,
    )
    .bind(&tag.name)
    .bind(&tag.color)
    .bind(&tag.slug)
    .fetch_one(conn)
    .await?;
    Ok(row)
}

fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

#[cfg(test)]
mod tests {
    use super::escape_like;

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("50%_off"), "50\\%\\_off");
        assert_eq!(escape_like("flour"), "flour");
    }
}
