use sqlx::{PgConnection, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::catalog::repo_types::Tag;
use crate::recipes::repo_types::{IngredientLine, NewRecipe, Recipe, RecipeChanges, RecipeFilter};
use crate::store::StoreError;

const RECIPE_COLUMNS: &str = "r.id, r.author_id, r.name, r.text, r.cooking_time, r.image, r.created_at";

pub async fn insert_recipe(
    conn: &mut PgConnection,
    recipe: &NewRecipe,
) -> Result<Recipe, StoreError> {
    let row = sqlx::query_as::<_, Recipe>(
        r#"
        INSERT INTO recipes (author_id, name, text, cooking_time, image)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, author_id, name, text, cooking_time, image, created_at
        "#,
    )
    .bind(recipe.author_id)
    .bind(&recipe.name)
    .bind(&recipe.text)
    .bind(recipe.cooking_time)
    .bind(recipe.image.as_deref())
    .fetch_one(conn)
    .await?;
    Ok(row)
}

pub async fn update_recipe(
    conn: &mut PgConnection,
    id: Uuid,
    changes: &RecipeChanges,
) -> Result<Recipe, StoreError> {
    let row = sqlx::query_as::<_, Recipe>(
        r#"
        UPDATE recipes
           SET name         = COALESCE($2, name),
               text         = COALESCE($3, text),
               cooking_time = COALESCE($4, cooking_time),
               image        = COALESCE($5, image)
         WHERE id = $1
        RETURNING id, author_id, name, text, cooking_time, image, created_at
        "#,
    )
    .bind(id)
    .bind(changes.name.as_deref())
    .bind(changes.text.as_deref())
    .bind(changes.cooking_time)
    .bind(changes.image.as_deref())
    .fetch_one(conn)
    .await?;
    Ok(row)
}

pub async fn get_recipe(conn: &mut PgConnection, id: Uuid) -> Result<Option<Recipe>, StoreError> {
    let row = sqlx::query_as::<_, Recipe>(
        r#"
        SELECT id, author_id, name, text, cooking_time, image, created_at
          FROM recipes
         WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(row)
}

pub async fn delete_recipe(conn: &mut PgConnection, id: Uuid) -> Result<bool, StoreError> {
    let res = sqlx::query(r#"DELETE FROM recipes WHERE id = $1"#)
        .bind(id)
        .execute(conn)
        .await?;
    Ok(res.rows_affected() > 0)
}

pub async fn list_recipes(
    conn: &mut PgConnection,
    filter: &RecipeFilter,
) -> Result<(Vec<Recipe>, i64), StoreError> {
    use sqlx::{FromRow, Row};

    let rows = filtered_query(filter, filter.limit, filter.offset)
        .build()
        .fetch_all(&mut *conn)
        .await?;

    let mut total = 0_i64;
    let mut recipes = Vec::with_capacity(rows.len());
    for row in &rows {
        total = row.try_get("total")?;
        recipes.push(Recipe::from_row(row)?);
    }

    // an empty page carries no window count
    if rows.is_empty() && (filter.offset > 0 || filter.limit < 1) {
        if let Some(row) = filtered_query(filter, 1, 0)
            .build()
            .fetch_optional(conn)
            .await?
        {
            total = row.try_get("total")?;
        }
    }

    Ok((recipes, total))
}

fn filtered_query(filter: &RecipeFilter, limit: i64, offset: i64) -> QueryBuilder<'static, Postgres> {
    let mut qb: QueryBuilder<Postgres> = QueryBuilder::new("SELECT ");
    qb.push(RECIPE_COLUMNS);
    qb.push(", COUNT(*) OVER() AS total FROM recipes r WHERE TRUE");

    if let Some(author) = filter.author {
        qb.push(" AND r.author_id = ").push_bind(author);
    }
    if !filter.tag_slugs.is_empty() {
        qb.push(
            " AND EXISTS (SELECT 1 FROM recipe_tags rt JOIN tags t ON t.id = rt.tag_id \
             WHERE rt.recipe_id = r.id AND t.slug = ANY(",
        )
        .push_bind(filter.tag_slugs.clone())
        .push("))");
    }
    if let Some(user_id) = filter.favorited_by {
        qb.push(
            " AND EXISTS (SELECT 1 FROM recipe_memberships m \
             WHERE m.recipe_id = r.id AND m.kind = 'favorite' AND m.user_id = ",
        )
        .push_bind(user_id)
        .push(")");
    }
    if let Some(user_id) = filter.in_cart_of {
        qb.push(
            " AND EXISTS (SELECT 1 FROM recipe_memberships m \
             WHERE m.recipe_id = r.id AND m.kind = 'shopping_cart' AND m.user_id = ",
        )
        .push_bind(user_id)
        .push(")");
    }
    qb.push(" ORDER BY r.created_at DESC, r.id LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);
    qb
}

pub async fn set_recipe_tags(
    conn: &mut PgConnection,
    recipe_id: Uuid,
    tag_ids: &[i64],
) -> Result<(), StoreError> {
    sqlx::query(r#"DELETE FROM recipe_tags WHERE recipe_id = $1"#)
        .bind(recipe_id)
        .execute(&mut *conn)
        .await?;
    sqlx::query(
        r#"
        INSERT INTO recipe_tags (recipe_id, tag_id)
        SELECT $1, tag_id FROM UNNEST($2::bigint[]) AS t(tag_id)
        "#,
    )
    .bind(recipe_id)
    .bind(tag_ids)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn recipe_tags(conn: &mut PgConnection, recipe_id: Uuid) -> Result<Vec<Tag>, StoreError> {
    let rows = sqlx::query_as::<_, Tag>(
        r#"
        SELECT t.id, t.name, t.color, t.slug
          FROM tags t
          JOIN recipe_tags rt ON rt.tag_id = t.id
         WHERE rt.recipe_id = $1
         ORDER BY t.id
        "#,
    )
    .bind(recipe_id)
    .fetch_all(conn)
    .await?;
    Ok(rows)
}

pub async fn delete_recipe_lines(conn: &mut PgConnection, recipe_id: Uuid) -> Result<(), StoreError> {
    sqlx::query(r#"DELETE FROM recipe_ingredients WHERE recipe_id = $1"#)
        .bind(recipe_id)
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn insert_recipe_lines(
    conn: &mut PgConnection,
    recipe_id: Uuid,
    lines: &[(i64, i32)],
) -> Result<(), StoreError> {
    let (ingredient_ids, amounts): (Vec<i64>, Vec<i32>) = lines.iter().copied().unzip();
    sqlx::query(
        r#"
        INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount)
        SELECT $1, l.ingredient_id, l.amount
          FROM UNNEST($2::bigint[], $3::int[]) WITH ORDINALITY AS l(ingredient_id, amount, pos)
         ORDER BY l.pos
        "#,
    )
    .bind(recipe_id)
    .bind(ingredient_ids)
    .bind(amounts)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn recipe_lines(
    conn: &mut PgConnection,
    recipe_id: Uuid,
) -> Result<Vec<IngredientLine>, StoreError> {
    let rows = sqlx::query_as::<_, IngredientLine>(
        r#"
        SELECT i.id AS ingredient_id, i.name, i.measurement_unit, ri.amount
          FROM recipe_ingredients ri
          JOIN ingredients i ON i.id = ri.ingredient_id
         WHERE ri.recipe_id = $1
         ORDER BY ri.id
        "#,
    )
    .bind(recipe_id)
    .fetch_all(conn)
    .await?;
    Ok(rows)
}
