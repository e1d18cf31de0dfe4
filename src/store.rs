use sea_orm::{
    ActiveValue::Set, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, SqlErr, TransactionTrait, sea_query::Expr,
};
use tracing::debug;

use crate::{
    entities::{movie, review, user},
    error::{AppError, AppResult},
    models::{ReviewIn, ReviewOut, UserWithReviews},
};

/// Data access for movies, users and reviews.
///
/// Every operation runs inside its own transaction. Early returns drop the
/// transaction, which rolls it back.
#[derive(Clone, Debug)]
pub struct Store {
    db: DatabaseConnection,
}

impl Store {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn get_movie(&self, id: i32) -> AppResult<movie::Model> {
        let txn = self.db.begin().await?;
        let movie = movie::Entity::find_by_id(id).one(&txn).await?;
        txn.commit().await?;

        movie.ok_or(AppError::MovieNotFound)
    }

    pub async fn list_movies(&self) -> AppResult<Vec<movie::Model>> {
        let txn = self.db.begin().await?;
        let movies = movie::Entity::find().all(&txn).await?;
        txn.commit().await?;
        Ok(movies)
    }

    pub async fn list_users(&self) -> AppResult<Vec<user::Model>> {
        let txn = self.db.begin().await?;
        let users = user::Entity::find().all(&txn).await?;
        txn.commit().await?;
        Ok(users)
    }

    pub async fn create_user(&self, username: &str) -> AppResult<i32> {
        let txn = self.db.begin().await?;

        let model = user::ActiveModel {
            id: Default::default(),
            username: Set(username.to_string()),
        };
        let id = match user::Entity::insert(model).exec(&txn).await {
            Ok(res) => res.last_insert_id,
            Err(DbErr::RecordNotInserted) => return Err(AppError::UserNotCreated),
            Err(err) => return Err(on_unique_violation(err, AppError::DuplicateUsername)),
        };

        txn.commit().await?;

        debug!(user_id = id, "created user");
        Ok(id)
    }

    pub async fn delete_user(&self, id: i32) -> AppResult<i32> {
        let txn = self.db.begin().await?;

        let res = user::Entity::delete_by_id(id)
            .exec(&txn)
            .await
            .map_err(|err| on_foreign_key_violation(err, AppError::UserInUse))?;
        if res.rows_affected == 0 {
            return Err(AppError::UserNotFound);
        }

        txn.commit().await?;

        debug!(user_id = id, "deleted user");
        Ok(id)
    }

    pub async fn update_user(&self, id: i32, username: &str) -> AppResult<i32> {
        let txn = self.db.begin().await?;

        let res = user::Entity::update_many()
            .col_expr(user::Column::Username, Expr::value(username))
            .filter(user::Column::Id.eq(id))
            .exec(&txn)
            .await
            .map_err(|err| on_unique_violation(err, AppError::DuplicateUsername))?;
        if res.rows_affected == 0 {
            return Err(AppError::UserNotFound);
        }

        txn.commit().await?;

        debug!(user_id = id, "updated user");
        Ok(id)
    }

    /// Fetches a user and every review they wrote, newest id last.
    ///
    /// Reviews whose movie no longer exists are skipped by the inner join.
    pub async fn get_user_with_reviews(&self, user_id: i32) -> AppResult<UserWithReviews> {
        let txn = self.db.begin().await?;

        let Some(user) = user::Entity::find_by_id(user_id).one(&txn).await? else {
            return Err(AppError::UserNotFound);
        };

        let reviews = review::Entity::find()
            .select_only()
            .column(review::Column::Rating)
            .column(review::Column::ReviewText)
            .column(review::Column::ReviewDate)
            .column_as(movie::Column::Title, "movie_title")
            .column_as(movie::Column::ReleaseDate, "movie_release_date")
            .inner_join(movie::Entity)
            .filter(review::Column::UserId.eq(user_id))
            .order_by_asc(review::Column::Id)
            .into_model::<ReviewOut>()
            .all(&txn)
            .await?;

        txn.commit().await?;

        debug!(user_id, reviews = reviews.len(), "loaded user with reviews");
        Ok(UserWithReviews { id: user.id, username: user.username, reviews })
    }

    /// Inserts a review. User and movie existence is left to the foreign keys.
    pub async fn create_review(&self, review: &ReviewIn) -> AppResult<i32> {
        let txn = self.db.begin().await?;

        let model = review::ActiveModel {
            user_id: Set(review.user_id),
            movie_id: Set(review.movie_id),
            rating: Set(review.rating),
            review_text: Set(review.review_text.clone()),
            ..Default::default()
        };
        let id = match review::Entity::insert(model).exec(&txn).await {
            Ok(res) => res.last_insert_id,
            Err(DbErr::RecordNotInserted) => return Err(AppError::ReviewNotCreated),
            Err(err) => return Err(on_foreign_key_violation(err, AppError::InvalidReference)),
        };

        txn.commit().await?;

        debug!(review_id = id, user_id = review.user_id, movie_id = review.movie_id, "created review");
        Ok(id)
    }
}

fn on_unique_violation(err: DbErr, kind: AppError) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => kind,
        _ => err.into(),
    }
}

fn on_foreign_key_violation(err: DbErr, kind: AppError) -> AppError {
    match err.sql_err() {
        Some(SqlErr::ForeignKeyConstraintViolation(_)) => kind,
        _ => err.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::seeded_memory_db;

    async fn store() -> Store {
        Store::new(seeded_memory_db().await)
    }

    async fn user_id(store: &Store, username: &str) -> i32 {
        store
            .list_users()
            .await
            .unwrap()
            .into_iter()
            .find(|u| u.username == username)
            .map(|u| u.id)
            .unwrap()
    }

    #[tokio::test]
    async fn get_movie_returns_the_requested_row() {
        let store = store().await;
        let first = store.list_movies().await.unwrap().remove(0);

        let movie = store.get_movie(first.id).await.unwrap();
        assert_eq!(movie, first);
    }

    #[tokio::test]
    async fn get_movie_missing_is_movie_not_found() {
        let store = store().await;
        let err = store.get_movie(4_242).await.unwrap_err();
        assert!(matches!(err, AppError::MovieNotFound));
    }

    #[tokio::test]
    async fn create_user_returns_fresh_id() {
        let store = store().await;
        let id = store.create_user("dave").await.unwrap();

        let users = store.list_users().await.unwrap();
        assert!(users.iter().any(|u| u.id == id && u.username == "dave"));
    }

    #[tokio::test]
    async fn create_user_duplicate_username_fails() {
        let store = store().await;
        let err = store.create_user("alice").await.unwrap_err();
        assert!(matches!(err, AppError::DuplicateUsername), "got {err:?}");
        assert_eq!(store.list_users().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn delete_user_missing_is_user_not_found() {
        let store = store().await;
        let err = store.delete_user(4_242).await.unwrap_err();
        assert!(matches!(err, AppError::UserNotFound));
    }

    #[tokio::test]
    async fn delete_user_removes_row() {
        let store = store().await;
        let id = store.create_user("erin").await.unwrap();

        assert_eq!(store.delete_user(id).await.unwrap(), id);
        assert!(store.list_users().await.unwrap().iter().all(|u| u.id != id));
    }

    #[tokio::test]
    async fn delete_user_with_reviews_is_refused() {
        let store = store().await;
        let alice = user_id(&store, "alice").await;

        let err = store.delete_user(alice).await.unwrap_err();
        assert!(matches!(err, AppError::UserInUse), "got {err:?}");
        assert_eq!(store.get_user_with_reviews(alice).await.unwrap().reviews.len(), 2);
    }

    #[tokio::test]
    async fn update_user_renames() {
        let store = store().await;
        let bob = user_id(&store, "bob").await;

        assert_eq!(store.update_user(bob, "robert").await.unwrap(), bob);
        assert_eq!(store.get_user_with_reviews(bob).await.unwrap().username, "robert");
    }

    #[tokio::test]
    async fn update_user_missing_is_user_not_found() {
        let store = store().await;
        let err = store.update_user(4_242, "nobody").await.unwrap_err();
        assert!(matches!(err, AppError::UserNotFound));
    }

    #[tokio::test]
    async fn update_user_to_taken_name_fails() {
        let store = store().await;
        let bob = user_id(&store, "bob").await;

        let err = store.update_user(bob, "alice").await.unwrap_err();
        assert!(matches!(err, AppError::DuplicateUsername), "got {err:?}");
    }

    #[tokio::test]
    async fn user_with_reviews_joins_movie_details() {
        let store = store().await;
        let alice = user_id(&store, "alice").await;

        let user = store.get_user_with_reviews(alice).await.unwrap();
        assert_eq!(user.username, "alice");

        let titles: Vec<&str> = user.reviews.iter().map(|r| r.movie_title.as_str()).collect();
        assert_eq!(titles, ["The Matrix", "The Shawshank Redemption"]);
        assert_eq!(user.reviews[0].movie_release_date.to_string(), "1999-03-31");
        assert_eq!(user.reviews[0].review_text, "Mind-blowing movie!");
    }

    #[tokio::test]
    async fn user_without_reviews_has_empty_list() {
        let store = store().await;
        let id = store.create_user("frank").await.unwrap();

        let user = store.get_user_with_reviews(id).await.unwrap();
        assert!(user.reviews.is_empty());
    }

    #[tokio::test]
    async fn user_with_reviews_missing_user() {
        let store = store().await;
        let err = store.get_user_with_reviews(4_242).await.unwrap_err();
        assert!(matches!(err, AppError::UserNotFound));
    }

    #[tokio::test]
    async fn create_review_sets_review_date() {
        let store = store().await;
        let charlie = user_id(&store, "charlie").await;
        let movie = store.list_movies().await.unwrap().remove(0);

        let review = ReviewIn {
            user_id: charlie,
            movie_id: movie.id,
            rating: 2,
            review_text: "Not for me.".into(),
        };
        store.create_review(&review).await.unwrap();

        let user = store.get_user_with_reviews(charlie).await.unwrap();
        let created = user.reviews.last().unwrap();
        assert_eq!(created.review_text, "Not for me.");
        assert_eq!(created.movie_title, movie.title);
        assert!(created.review_date > movie.release_date);
    }

    #[tokio::test]
    async fn create_review_for_unknown_movie_fails_at_storage() {
        let store = store().await;
        let charlie = user_id(&store, "charlie").await;

        let review = ReviewIn {
            user_id: charlie,
            movie_id: 4_242,
            rating: 1,
            review_text: "Ghost movie".into(),
        };
        let err = store.create_review(&review).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidReference), "got {err:?}");
    }
}
