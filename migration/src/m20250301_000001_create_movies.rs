use sea_orm_migration::{prelude::*, schema::*};

// `json_type` yields NULL for an absent key, and a NULL CHECK passes, so every
// term is null-safe.
const BOX_OFFICE_SHAPE: &str = "box_office IS NULL OR (\
    json_valid(box_office) \
    AND json_type(box_office, '$.revenue') IS 'object' \
    AND COALESCE(json_type(box_office, '$.revenue.worldwide'), '') IN ('integer', 'real') \
    AND COALESCE(json_extract(box_office, '$.revenue.worldwide') >= 0, 0) \
    AND json_type(box_office, '$.currency') IS 'text' \
    AND COALESCE(length(json_extract(box_office, '$.currency')) > 0, 0) \
    AND json_type(box_office, '$.source') IS 'text' \
    AND COALESCE(length(json_extract(box_office, '$.source')) > 0, 0) \
    AND json_type(box_office, '$.lastUpdated') IS 'text')";

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Movies::Table)
                    .if_not_exists()
                    .col(string(Movies::Id).primary_key())
                    .col(string(Movies::Title).check(Expr::cust("length(trim(title)) > 0")))
                    .col(string(Movies::ReleaseDate))
                    .col(
                        ColumnDef::new(Movies::ReleaseYear)
                            .integer()
                            .not_null()
                            .extra("GENERATED ALWAYS AS (CAST(substr(release_date, 1, 4) AS INTEGER)) STORED"),
                    )
                    .col(string(Movies::Genre).check(Expr::cust("length(trim(genre)) > 0")))
                    .col(string_null(Movies::Distributor))
                    .col(big_integer_null(Movies::Budget).check(Expr::cust("budget IS NULL OR budget >= 0")))
                    .col(string_null(Movies::MpaRating))
                    .col(json_null(Movies::BoxOffice).check(Expr::cust(BOX_OFFICE_SHAPE)))
                    .col(string(Movies::TitleFolded))
                    .col(string(Movies::GenreFolded))
                    .col(string_null(Movies::DistributorFolded))
                    .col(string_null(Movies::MpaRatingFolded))
                    .col(big_integer(Movies::CreatedAt))
                    .col(big_integer(Movies::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_movies_identity_unique")
                    .table(Movies::Table)
                    .col(Movies::Title)
                    .col(Movies::ReleaseDate)
                    .col(Movies::Genre)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_movies_created_at_id")
                    .table(Movies::Table)
                    .col(Movies::CreatedAt)
                    .col(Movies::Id)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_movies_release_year")
                    .table(Movies::Table)
                    .col(Movies::ReleaseYear)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Movies::Table).to_owned()).await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
pub(crate) enum Movies {
    Table,
    Id,
    Title,
    ReleaseDate,
    ReleaseYear,
    Genre,
    Distributor,
    Budget,
    MpaRating,
    BoxOffice,
    TitleFolded,
    GenreFolded,
    DistributorFolded,
    MpaRatingFolded,
    CreatedAt,
    UpdatedAt,
}
