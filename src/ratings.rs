use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QuerySelect,
    ActiveValue::Set,
    sea_query::{Expr, OnConflict},
};
use tracing::debug;

use crate::{
    db::now_micros,
    entities::rating,
    error::{AppError, AppResult},
    models::{Rating, RatingAggregate, RatingValue},
};

#[derive(Clone)]
pub struct RatingStore {
    db: DatabaseConnection,
}

impl RatingStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Inserts or overwrites the rater's rating in one statement. The flag is
    /// true when the row was freshly inserted.
    pub async fn upsert(
        &self,
        movie_id: &str,
        rater_id: &str,
        value: RatingValue,
    ) -> AppResult<(Rating, bool)> {
        let now = now_micros();
        let model = rating::ActiveModel {
            movie_id: Set(movie_id.to_string()),
            rater_id: Set(rater_id.to_string()),
            half_steps: Set(i32::from(value.half_steps())),
            revision: Set(1),
            created_at: Set(now),
            updated_at: Set(now),
        };

        // On conflict the stored row keeps `created_at` and bumps `revision`,
        // so `revision == 1` identifies a fresh insert within the same statement.
        let row = rating::Entity::insert(model)
            .on_conflict(
                OnConflict::columns([rating::Column::MovieId, rating::Column::RaterId])
                    .update_columns([rating::Column::HalfSteps, rating::Column::UpdatedAt])
                    .value(
                        rating::Column::Revision,
                        Expr::col((rating::Entity, rating::Column::Revision)).add(1),
                    )
                    .to_owned(),
            )
            .exec_with_returning(&self.db)
            .await?;

        let inserted = row.revision == 1;
        debug!(
            movie_id = %movie_id,
            rater_id = %rater_id,
            rating = value.as_f64(),
            revision = row.revision,
            "rating stored"
        );
        Ok((Rating::try_from(row)?, inserted))
    }

    pub async fn get(&self, movie_id: &str, rater_id: &str) -> AppResult<Rating> {
        let row = rating::Entity::find_by_id((movie_id.to_string(), rater_id.to_string()))
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)?;
        Ok(Rating::try_from(row)?)
    }

    /// Count and rounded mean over a single consistent read.
    pub async fn aggregate(&self, movie_id: &str) -> AppResult<RatingAggregate> {
        let (count, sum) = rating::Entity::find()
            .select_only()
            .column_as(Expr::col(rating::Column::MovieId).count(), "count")
            .column_as(Expr::col(rating::Column::HalfSteps).sum(), "sum")
            .filter(rating::Column::MovieId.eq(movie_id))
            .into_tuple::<(i64, Option<i64>)>()
            .one(&self.db)
            .await?
            .unwrap_or((0, None));

        Ok(RatingAggregate::from_totals(count, sum.unwrap_or(0)))
    }
}
