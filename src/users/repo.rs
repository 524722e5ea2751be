use sqlx::PgConnection;
use uuid::Uuid;

use crate::store::StoreError;
use crate::users::repo_types::{NewUser, Subscription, User};

pub async fn get_user(conn: &mut PgConnection, id: Uuid) -> Result<Option<User>, StoreError> {
    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT id, email, username, first_name, last_name, created_at
          FROM users
         WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(user)
}

/// Insert by email, or refresh the profile fields of the existing row.
pub async fn upsert_user(conn: &mut PgConnection, user: &NewUser) -> Result<User, StoreError> {
    let row = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (id, email, username, first_name, last_name)
        VALUES (COALESCE($1, gen_random_uuid()), $2, $3, $4, $5)
        ON CONFLICT ON CONSTRAINT users_email_key
        DO UPDATE SET username = EXCLUDED.username,
                      first_name = EXCLUDED.first_name,
                      last_name = EXCLUDED.last_name
        RETURNING id, email, username, first_name, last_name, created_at
        "#,
    )
    .bind(user.id)
    .bind(&user.email)
    .bind(&user.username)
    .bind(&user.first_name)
    .bind(&user.last_name)
    .fetch_one(conn)
    .await?;
    Ok(row)
}

pub async fn insert_subscription(
    conn: &mut PgConnection,
    user_id: Uuid,
    author_id: Uuid,
) -> Result<Subscription, StoreError> {
    let row = sqlx::query_as::<_, Subscription>(
        r#"
        INSERT INTO subscriptions (user_id, author_id)
        VALUES ($1, $2)
        RETURNING id, user_id, author_id
        "#,
    )
    .bind(user_id)
    .bind(author_id)
    .fetch_one(conn)
    .await?;
    Ok(row)
}

pub async fn delete_subscription(
    conn: &mut PgConnection,
    user_id: Uuid,
    author_id: Uuid,
) -> Result<bool, StoreError> {
    let res = sqlx::query(r#"DELETE FROM subscriptions WHERE user_id = $1 AND author_id = $2"#)
        .bind(user_id)
        .bind(author_id)
        .execute(conn)
        .await?;
    Ok(res.rows_affected() > 0)
}

pub async fn is_subscribed(
    conn: &mut PgConnection,
    user_id: Uuid,
    author_id: Uuid,
) -> Result<bool, StoreError> {
    let exists: bool = sqlx::query_scalar(
        r#"SELECT EXISTS (SELECT 1 FROM subscriptions WHERE user_id = $1 AND author_id = $2)"#,
    )
    .bind(user_id)
    .bind(author_id)
    .fetch_one(conn)
    .await?;
    Ok(exists)
}

pub async fn list_users(
    conn: &mut PgConnection,
    limit: i64,
    offset: i64,
) -> Result<(Vec<User>, i64), StoreError> {
    let total: i64 = sqlx::query_scalar(r#"SELECT COUNT(*) FROM users"#)
        .fetch_one(&mut *conn)
        .await?;

    let users = sqlx::query_as::<_, User>(
        r#"
        SELECT id, email, username, first_name, last_name, created_at
          FROM users
         ORDER BY lower(username), username
         LIMIT $1 OFFSET $2
        "#,
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(conn)
    .await?;

    Ok((users, total))
}

pub async fn list_subscriptions(
    conn: &mut PgConnection,
    user_id: Uuid,
    limit: i64,
    offset: i64,
) -> Result<(Vec<User>, i64), StoreError> {
    let total: i64 =
        sqlx::query_scalar(r#"SELECT COUNT(*) FROM subscriptions WHERE user_id = $1"#)
            .bind(user_id)
            .fetch_one(&mut *conn)
            .await?;

    let authors = sqlx::query_as::<_, User>(
        r#"
        SELECT u.id, u.email, u.username, u.first_name, u.last_name, u.created_at
          FROM subscriptions s
          JOIN users u ON u.id = s.author_id
         WHERE s.user_id = $1
         ORDER BY s.id DESC
         LIMIT $2 OFFSET $3
        "#,
    )
    .bind(user_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(conn)
    .await?;

    Ok((authors, total))
}
