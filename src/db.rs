use std::collections::HashMap;

use anyhow::Context;
use migration::{Migrator, MigratorTrait};
use sea_orm::{
    ActiveValue::Set, ColumnTrait, ConnectOptions, Database, DatabaseConnection, EntityTrait,
    QueryFilter, TransactionTrait,
    sea_query::OnConflict,
    sqlx::sqlite::{SqliteJournalMode, SqliteSynchronous},
};
use tracing::{debug, info};

use crate::{
    entities::{genre, movie, review, user},
    error::AppResult,
};

const GENRES: [&str; 6] = ["Action", "Comedy", "Drama", "Science Fiction", "Horror", "Romance"];

const MOVIES: [(&str, &str, &str); 8] = [
    ("The Matrix", "1999-03-31", "Science Fiction"),
    ("Die Hard", "1988-07-15", "Action"),
    ("The Shawshank Redemption", "1994-09-23", "Drama"),
    ("Superbad", "2007-08-17", "Comedy"),
    ("The Conjuring", "2013-07-19", "Horror"),
    ("Titanic", "1997-12-19", "Romance"),
    ("Inception", "2010-07-16", "Science Fiction"),
    ("Gladiator", "2000-05-05", "Action"),
];

const USERS: [&str; 3] = ["alice", "bob", "charlie"];

const REVIEWS: [(&str, &str, i32, &str); 5] = [
    ("alice", "The Matrix", 5, "Mind-blowing movie!"),
    ("alice", "The Shawshank Redemption", 5, "A masterpiece."),
    ("bob", "The Matrix", 4, "Great action scenes."),
    ("bob", "Superbad", 3, "Pretty funny."),
    ("charlie", "Inception", 5, "Nolan is a genius."),
];

pub async fn connect(database_url: &str) -> AppResult<DatabaseConnection> {
    // Applied by sqlx to every pooled SQLite connection; ignored by other backends.
    let mut options = ConnectOptions::new(database_url);
    options.map_sqlx_sqlite_opts(|opts| {
        opts.journal_mode(SqliteJournalMode::Wal).synchronous(SqliteSynchronous::Normal)
    });

    Ok(Database::connect(options).await?)
}

/// Applies pending schema migrations. Safe to call on every startup.
pub async fn create_tables(db: &DatabaseConnection) -> AppResult<()> {
    Migrator::up(db, None).await?;
    info!("schema up to date");
    Ok(())
}

/// Inserts the sample genres, movies, users and reviews.
///
/// Rows that already exist are left alone, so running this repeatedly never
/// duplicates anything.
pub async fn seed_data(db: &DatabaseConnection) -> AppResult<()> {
    let txn = db.begin().await?;

    genre::Entity::insert_many(GENRES.iter().map(|name| genre::ActiveModel {
        id: Default::default(),
        name: Set(name.to_string()),
    }))
    .on_conflict(OnConflict::column(genre::Column::Name).do_nothing().to_owned())
    .exec_without_returning(&txn)
    .await?;

    let genre_ids: HashMap<String, i32> =
        genre::Entity::find().all(&txn).await?.into_iter().map(|g| (g.name, g.id)).collect();

    let mut movies = Vec::with_capacity(MOVIES.len());
    for (title, released, genre_name) in MOVIES {
        let release_date = released
            .parse::<chrono::NaiveDate>()
            .with_context(|| format!("release date of {title}"))?;
        movies.push(movie::ActiveModel {
            id: Default::default(),
            title: Set(title.to_string()),
            release_date: Set(release_date),
            genre_id: Set(genre_ids.get(genre_name).copied()),
        });
    }
    movie::Entity::insert_many(movies)
        .on_conflict(OnConflict::column(movie::Column::Title).do_nothing().to_owned())
        .exec_without_returning(&txn)
        .await?;

    user::Entity::insert_many(USERS.iter().map(|username| user::ActiveModel {
        id: Default::default(),
        username: Set(username.to_string()),
    }))
    .on_conflict(OnConflict::column(user::Column::Username).do_nothing().to_owned())
    .exec_without_returning(&txn)
    .await?;

    let user_ids: HashMap<String, i32> =
        user::Entity::find().all(&txn).await?.into_iter().map(|u| (u.username, u.id)).collect();
    let movie_ids: HashMap<String, i32> =
        movie::Entity::find().all(&txn).await?.into_iter().map(|m| (m.title, m.id)).collect();

    // Reviews carry no unique key, so match on content instead of ON CONFLICT.
    let mut inserted = 0;
    for (username, title, rating, text) in REVIEWS {
        let (Some(&user_id), Some(&movie_id)) = (user_ids.get(username), movie_ids.get(title))
        else {
            continue;
        };

        let existing = review::Entity::find()
            .filter(review::Column::UserId.eq(user_id))
            .filter(review::Column::MovieId.eq(movie_id))
            .filter(review::Column::ReviewText.eq(text))
            .one(&txn)
            .await?;
        if existing.is_some() {
            continue;
        }

        review::Entity::insert(review::ActiveModel {
            user_id: Set(user_id),
            movie_id: Set(movie_id),
            rating: Set(rating),
            review_text: Set(text.to_string()),
            ..Default::default()
        })
        .exec_without_returning(&txn)
        .await?;
        inserted += 1;
    }

    txn.commit().await?;

    debug!(reviews_inserted = inserted, "sample data seeded");
    Ok(())
}

#[cfg(test)]
pub(crate) async fn seeded_memory_db() -> DatabaseConnection {
    let db = connect("sqlite::memory:").await.unwrap();
    create_tables(&db).await.unwrap();
    seed_data(&db).await.unwrap();
    db
}

#[cfg(test)]
mod tests {
    use sea_orm::{ConnectionTrait, DatabaseBackend, PaginatorTrait, Statement};

    use super::*;
    use crate::entities::watchlist;

    async fn synchronous_level(db: &DatabaseConnection) -> i32 {
        db.query_one(Statement::from_string(DatabaseBackend::Sqlite, "PRAGMA synchronous".to_string()))
            .await
            .unwrap()
            .unwrap()
            .try_get_by_index(0)
            .unwrap()
    }

    #[tokio::test]
    async fn connections_use_normal_sync() {
        let db = seeded_memory_db().await;

        // NORMAL is 1; SQLite's own default is FULL (2).
        assert_eq!(synchronous_level(&db).await, 1);
    }

    #[tokio::test]
    async fn seeds_expected_rows() {
        let db = seeded_memory_db().await;

        let titles: Vec<String> =
            movie::Entity::find().all(&db).await.unwrap().into_iter().map(|m| m.title).collect();
        assert_eq!(titles.len(), 8);
        assert!(titles.iter().any(|t| t == "The Matrix"));
        assert!(titles.iter().any(|t| t == "Inception"));

        let mut usernames: Vec<String> =
            user::Entity::find().all(&db).await.unwrap().into_iter().map(|u| u.username).collect();
        usernames.sort();
        assert_eq!(usernames, ["alice", "bob", "charlie"]);

        assert_eq!(genre::Entity::find().count(&db).await.unwrap(), 6);
        assert_eq!(review::Entity::find().count(&db).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn seeding_twice_is_a_no_op() {
        let db = seeded_memory_db().await;
        create_tables(&db).await.unwrap();
        seed_data(&db).await.unwrap();

        assert_eq!(genre::Entity::find().count(&db).await.unwrap(), 6);
        assert_eq!(movie::Entity::find().count(&db).await.unwrap(), 8);
        assert_eq!(user::Entity::find().count(&db).await.unwrap(), 3);
        assert_eq!(review::Entity::find().count(&db).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn movies_are_linked_to_their_genre() {
        let db = seeded_memory_db().await;

        let matrix = movie::Entity::find()
            .filter(movie::Column::Title.eq("The Matrix"))
            .one(&db)
            .await
            .unwrap()
            .unwrap();
        let genre = genre::Entity::find_by_id(matrix.genre_id.unwrap())
            .one(&db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(genre.name, "Science Fiction");
        assert_eq!(matrix.release_date.to_string(), "1999-03-31");
    }

    #[tokio::test]
    async fn watchlist_defaults_added_date_and_enforces_references() {
        let db = seeded_memory_db().await;
        let bob = user::Entity::find()
            .filter(user::Column::Username.eq("bob"))
            .one(&db)
            .await
            .unwrap()
            .unwrap();

        watchlist::Entity::insert(watchlist::ActiveModel {
            user_id: Set(bob.id),
            movie_id: Set(1),
            ..Default::default()
        })
        .exec_without_returning(&db)
        .await
        .unwrap();

        let entry = watchlist::Entity::find_by_id((bob.id, 1)).one(&db).await.unwrap().unwrap();
        assert!(entry.added_date > chrono::NaiveDate::MIN);

        let dangling = watchlist::Entity::insert(watchlist::ActiveModel {
            user_id: Set(bob.id),
            movie_id: Set(9_999),
            ..Default::default()
        })
        .exec_without_returning(&db)
        .await;
        assert!(dangling.is_err());
    }
}
