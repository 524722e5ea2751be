use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::recipes::dto::{Page, Pagination, RecipeShort};
use crate::recipes::repo_types::RecipeFilter;
use crate::store::{constraints, Store, StoreError, StoreTx};
use crate::users::dto::{AuthorView, SubscriptionView, SubscriptionsQuery, UsersQuery};
use crate::users::repo_types::User;

pub async fn me(store: &dyn Store, user_id: Uuid) -> AppResult<AuthorView> {
    let mut tx = store.begin().await?;
    let user = tx
        .user(user_id)
        .await?
        .ok_or_else(|| AppError::not_found("user not found"))?;
    Ok(AuthorView::new(user, false))
}

async fn viewed_by(
    tx: &mut dyn StoreTx,
    user: User,
    viewer: Option<Uuid>,
) -> AppResult<AuthorView> {
    let is_subscribed = match viewer {
        Some(v) => tx.is_subscribed(v, user.id).await?,
        None => false,
    };
    Ok(AuthorView::new(user, is_subscribed))
}

/// Public profile of any user, with `is_subscribed` for the viewer.
pub async fn get_user(
    store: &dyn Store,
    user_id: Uuid,
    viewer: Option<Uuid>,
) -> AppResult<AuthorView> {
    let mut tx = store.begin().await?;
    let user = tx
        .user(user_id)
        .await?
        .ok_or_else(|| AppError::not_found("user not found"))?;
    viewed_by(tx.as_mut(), user, viewer).await
}

#[instrument(skip(store))]
pub async fn list_users(
    store: &dyn Store,
    query: &UsersQuery,
    viewer: Option<Uuid>,
) -> AppResult<Page<AuthorView>> {
    let (limit, offset) = Pagination {
        limit: query.limit,
        offset: query.offset,
    }
    .clamped();

    let mut tx = store.begin().await?;
    let (users, count) = tx.list_users(limit, offset).await?;
    let mut results = Vec::with_capacity(users.len());
    for user in users {
        results.push(viewed_by(tx.as_mut(), user, viewer).await?);
    }
    Ok(Page { count, results })
}

/// Author view plus recipe count and the newest `recipes_limit` recipes.
async fn subscription_view(
    tx: &mut dyn StoreTx,
    author: User,
    recipes_limit: Option<i64>,
) -> AppResult<SubscriptionView> {
    let filter = RecipeFilter {
        author: Some(author.id),
        limit: recipes_limit.unwrap_or(Pagination::MAX_LIMIT).clamp(0, Pagination::MAX_LIMIT),
        ..Default::default()
    };
    let (recipes, recipes_count) = tx.list_recipes(&filter).await?;
    let recipes = recipes
        .into_iter()
        .map(|r| RecipeShort {
            id: r.id,
            name: r.name,
            image: r.image,
            cooking_time: r.cooking_time,
        })
        .collect();

    Ok(SubscriptionView {
        author: AuthorView::new(author, true),
        recipes,
        recipes_count,
    })
}

#[instrument(skip(store))]
pub async fn subscribe(
    store: &dyn Store,
    user_id: Uuid,
    author_id: Uuid,
    recipes_limit: Option<i64>,
) -> AppResult<SubscriptionView> {
    let mut tx = store.begin().await?;
    if tx.user(user_id).await?.is_none() {
        return Err(AppError::not_found("user not found"));
    }
    let author = tx
        .user(author_id)
        .await?
        .ok_or_else(|| AppError::not_found("author not found"))?;
    if user_id == author_id {
        return Err(AppError::conflict("cannot subscribe to yourself"));
    }

    tx.insert_subscription(user_id, author_id)
        .await
        .map_err(|e| match e {
            StoreError::UniqueViolation(c) if c.starts_with(constraints::SUBSCRIPTION_UNIQUE) => {
                AppError::conflict("already subscribed")
            }
            StoreError::CheckViolation(c) if c.starts_with(constraints::SUBSCRIPTION_SELF) => {
                AppError::conflict("cannot subscribe to yourself")
            }
            StoreError::ForeignKeyViolation(c) if c.starts_with(constraints::SUBSCRIPTION_AUTHOR) => {
                AppError::not_found("author not found")
            }
            StoreError::ForeignKeyViolation(c) if c.starts_with(constraints::SUBSCRIPTION_USER) => {
                AppError::not_found("user not found")
            }
            other => AppError::Store(other),
        })?;

    let view = subscription_view(tx.as_mut(), author, recipes_limit).await?;
    tx.commit().await?;
    info!(%user_id, %author_id, "subscribed");
    Ok(view)
}

#[instrument(skip(store))]
pub async fn unsubscribe(store: &dyn Store, user_id: Uuid, author_id: Uuid) -> AppResult<()> {
    let mut tx = store.begin().await?;
    if !tx.delete_subscription(user_id, author_id).await? {
        return Err(AppError::not_found("not subscribed to this author"));
    }
    tx.commit().await?;
    info!(%user_id, %author_id, "unsubscribed");
    Ok(())
}

#[instrument(skip(store))]
pub async fn list_subscriptions(
    store: &dyn Store,
    user_id: Uuid,
    query: &SubscriptionsQuery,
) -> AppResult<Page<SubscriptionView>> {
    let (limit, offset) = Pagination {
        limit: query.limit,
        offset: query.offset,
    }
    .clamped();

    let mut tx = store.begin().await?;
    let (authors, count) = tx.list_subscriptions(user_id, limit, offset).await?;
    let mut results = Vec::with_capacity(authors.len());
    for author in authors {
        results.push(subscription_view(tx.as_mut(), author, query.recipes_limit).await?);
    }
    Ok(Page { count, results })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipes::services::create_recipe;
    use crate::testing::{by_id, Fixture};

    #[tokio::test]
    async fn subscribe_reports_count_and_bounded_preview() {
        let fx = Fixture::new().await;
        for name in ["one", "two", "three"] {
            create_recipe(fx.store(), fx.author, fx.recipe_request(name, vec![by_id(&fx.egg, 1)]))
                .await
                .unwrap();
        }

        let view = subscribe(fx.store(), fx.reader, fx.author, Some(2)).await.unwrap();
        assert!(view.author.is_subscribed);
        assert_eq!(view.recipes_count, 3);
        let names: Vec<_> = view.recipes.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["three", "two"]);

        let page = list_subscriptions(
            fx.store(),
            fx.reader,
            &SubscriptionsQuery {
                limit: 10,
                offset: 0,
                recipes_limit: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(page.count, 1);
        assert_eq!(page.results[0].recipes.len(), 3);
    }

    #[tokio::test]
    async fn self_and_duplicate_subscriptions_conflict() {
        let fx = Fixture::new().await;
        let err = subscribe(fx.store(), fx.author, fx.author, None).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        subscribe(fx.store(), fx.reader, fx.author, None).await.unwrap();
        let err = subscribe(fx.store(), fx.reader, fx.author, None).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn unknown_author_and_missing_subscription_are_not_found() {
        let fx = Fixture::new().await;
        let err = subscribe(fx.store(), fx.reader, Uuid::new_v4(), None).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let err = unsubscribe(fx.store(), fx.reader, fx.author).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let err = subscribe(fx.store(), Uuid::new_v4(), fx.author, None).await.unwrap_err();
        assert!(matches!(&err, AppError::NotFound(msg) if msg == "user not found"));
    }

    #[tokio::test]
    async fn unsubscribe_removes_the_pair() {
        let fx = Fixture::new().await;
        subscribe(fx.store(), fx.reader, fx.author, None).await.unwrap();
        unsubscribe(fx.store(), fx.reader, fx.author).await.unwrap();

        let mut tx = fx.store().begin().await.unwrap();
        assert!(!tx.is_subscribed(fx.reader, fx.author).await.unwrap());
    }

    #[tokio::test]
    async fn user_list_and_detail_carry_viewer_subscription() {
        let fx = Fixture::new().await;
        subscribe(fx.store(), fx.reader, fx.author, None).await.unwrap();

        let q = UsersQuery { limit: 1, offset: 0 };
        let page = list_users(fx.store(), &q, Some(fx.reader)).await.unwrap();
        assert_eq!(page.count, 2);
        assert_eq!(page.results.len(), 1);
        assert_eq!(page.results[0].username, "author");
        assert!(page.results[0].is_subscribed);

        let q = UsersQuery { limit: 10, offset: 1 };
        let page = list_users(fx.store(), &q, None).await.unwrap();
        assert_eq!(page.results[0].username, "reader");

        let seen = get_user(fx.store(), fx.author, Some(fx.reader)).await.unwrap();
        assert!(seen.is_subscribed);
        let anonymous = get_user(fx.store(), fx.author, None).await.unwrap();
        assert!(!anonymous.is_subscribed);

        let err = get_user(fx.store(), Uuid::new_v4(), None).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn me_returns_own_profile() {
        let fx = Fixture::new().await;
        let view = me(fx.store(), fx.reader).await.unwrap();
        assert_eq!(view.username, "reader");
        assert!(!view.is_subscribed);
    }
}
