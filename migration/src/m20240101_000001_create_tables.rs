use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(pk_auto(Users::Id))
                    .col(ColumnDef::new(Users::Username).string_len(50).not_null().unique_key())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Genres::Table)
                    .if_not_exists()
                    .col(pk_auto(Genres::Id))
                    .col(ColumnDef::new(Genres::Name).string_len(100).not_null().unique_key())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Movies::Table)
                    .if_not_exists()
                    .col(pk_auto(Movies::Id))
                    .col(ColumnDef::new(Movies::Title).string_len(200).not_null().unique_key())
                    .col(date(Movies::ReleaseDate))
                    .col(integer_null(Movies::GenreId))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_movies_genre")
                            .from(Movies::Table, Movies::GenreId)
                            .to(Genres::Table, Genres::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Reviews::Table)
                    .if_not_exists()
                    .col(pk_auto(Reviews::Id))
                    .col(integer(Reviews::UserId))
                    .col(integer(Reviews::MovieId))
                    .col(integer(Reviews::Rating))
                    .col(text(Reviews::ReviewText))
                    .col(date(Reviews::ReviewDate).default(Expr::current_date()))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_reviews_user")
                            .from(Reviews::Table, Reviews::UserId)
                            .to(Users::Table, Users::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_reviews_movie")
                            .from(Reviews::Table, Reviews::MovieId)
                            .to(Movies::Table, Movies::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_reviews_user_id")
                    .table(Reviews::Table)
                    .col(Reviews::UserId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Watchlist::Table)
                    .if_not_exists()
                    .col(integer(Watchlist::UserId))
                    .col(integer(Watchlist::MovieId))
                    .col(date(Watchlist::AddedDate).default(Expr::current_date()))
                    .primary_key(Index::create().col(Watchlist::UserId).col(Watchlist::MovieId))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_watchlist_user")
                            .from(Watchlist::Table, Watchlist::UserId)
                            .to(Users::Table, Users::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_watchlist_movie")
                            .from(Watchlist::Table, Watchlist::MovieId)
                            .to(Movies::Table, Movies::Id),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Watchlist::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Reviews::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Movies::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Genres::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Users::Table).to_owned()).await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Username,
}

#[derive(DeriveIden)]
enum Genres {
    Table,
    Id,
    Name,
}

#[derive(DeriveIden)]
enum Movies {
    Table,
    Id,
    Title,
    ReleaseDate,
    GenreId,
}

#[derive(DeriveIden)]
enum Reviews {
    Table,
    Id,
    UserId,
    MovieId,
    Rating,
    ReviewText,
    ReviewDate,
}

#[derive(DeriveIden)]
enum Watchlist {
    Table,
    UserId,
    MovieId,
    AddedDate,
}
