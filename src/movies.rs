use anyhow::Context;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect,
    ActiveValue::{NotSet, Set, Unchanged},
    sea_query::{Expr, LikeExpr, SimpleExpr},
};
use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;

use crate::{
    cursor::MovieCursor,
    db::now_micros,
    entities::movie,
    error::{AppError, AppResult},
    models::{MetadataUpdate, Movie, NewMovie},
};

pub const DEFAULT_PAGE_SIZE: u64 = 20;
pub const MAX_PAGE_SIZE: u64 = 100;

#[derive(Clone, Debug, Default)]
pub struct MovieFilters {
    pub query: Option<String>,
    pub year: Option<i32>,
    pub genre: Option<String>,
    pub distributor: Option<String>,
    pub max_budget: Option<i64>,
    pub mpa_rating: Option<String>,
    pub limit: Option<i64>,
    pub cursor: Option<MovieCursor>,
}

impl MovieFilters {
    /// Requested limit clamped to `1..=100`, or 20 when unset or non-positive.
    pub fn page_size(&self) -> u64 {
        match self.limit {
            Some(limit) if limit > 0 => (limit as u64).min(MAX_PAGE_SIZE),
            _ => DEFAULT_PAGE_SIZE,
        }
    }

    fn condition(&self) -> Condition {
        let mut cond = Condition::all();

        if let Some(q) = non_blank(&self.query) {
            cond = cond.add(
                Condition::any()
                    .add(contains(movie::Column::TitleFolded, q))
                    .add(contains(movie::Column::DistributorFolded, q)),
            );
        }
        if let Some(year) = self.year {
            cond = cond.add(movie::Column::ReleaseYear.eq(year));
        }
        if let Some(genre) = non_blank(&self.genre) {
            cond = cond.add(contains(movie::Column::GenreFolded, genre));
        }
        if let Some(distributor) = non_blank(&self.distributor) {
            cond = cond.add(contains(movie::Column::DistributorFolded, distributor));
        }
        if let Some(max_budget) = self.max_budget {
            cond = cond.add(movie::Column::Budget.lte(max_budget));
        }
        if let Some(mpa) = non_blank(&self.mpa_rating) {
            cond = cond.add(contains(movie::Column::MpaRatingFolded, mpa));
        }
        if let Some(cursor) = &self.cursor {
            // (created_at, id) < (cursor.created_at, cursor.id)
            let created_at = cursor.created_at.as_microsecond();
            cond = cond.add(
                Condition::any().add(movie::Column::CreatedAt.lt(created_at)).add(
                    Condition::all()
                        .add(movie::Column::CreatedAt.eq(created_at))
                        .add(movie::Column::Id.lt(cursor.id.as_str())),
                ),
            );
        }

        cond
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Case-insensitive substring match against one of the folded shadow
/// columns, with the pattern metacharacters in `needle` escaped.
fn contains(column: movie::Column, needle: &str) -> SimpleExpr {
    let needle = movie::fold(needle);
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    Expr::col(column).like(LikeExpr::new(pattern).escape('\\'))
}

/// Raw query-string form of the listing filters.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListMoviesQuery {
    pub q: Option<String>,
    pub year: Option<String>,
    pub genre: Option<String>,
    pub distributor: Option<String>,
    pub budget: Option<String>,
    pub mpa_rating: Option<String>,
    pub limit: Option<String>,
    pub cursor: Option<String>,
}

impl TryFrom<ListMoviesQuery> for MovieFilters {
    type Error = AppError;

    fn try_from(raw: ListMoviesQuery) -> AppResult<Self> {
        let text = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());

        let year = text(raw.year)
            .map(|v| v.parse::<i32>().map_err(|_| AppError::bad_request("invalid year value")))
            .transpose()?;
        let max_budget = text(raw.budget)
            .map(|v| match v.parse::<i64>() {
                Ok(b) if b >= 0 => Ok(b),
                _ => Err(AppError::bad_request("invalid budget value")),
            })
            .transpose()?;
        let limit = text(raw.limit)
            .map(|v| v.parse::<i64>().map_err(|_| AppError::bad_request("invalid limit value")))
            .transpose()?;
        let cursor = text(raw.cursor).map(|t| MovieCursor::decode(&t)).transpose()?;

        Ok(Self {
            query: text(raw.q),
            year,
            genre: text(raw.genre),
            distributor: text(raw.distributor),
            max_budget,
            mpa_rating: text(raw.mpa_rating),
            limit,
            cursor,
        })
    }
}

#[derive(Clone, Debug)]
pub struct MoviePage {
    pub items: Vec<Movie>,
    /// Set when the page came back full. A full last page still yields a
    /// cursor, whose follow-up page is empty.
    pub next_cursor: Option<MovieCursor>,
}

#[derive(Clone)]
pub struct MovieStore {
    db: DatabaseConnection,
}

impl MovieStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn create(&self, new: NewMovie) -> AppResult<Movie> {
        let now = now_micros();
        let model = movie::ActiveModel {
            id: Set(Uuid::now_v7().to_string()),
            title: Set(new.title),
            release_date: Set(new.release_date.to_string()),
            release_year: NotSet,
            genre: Set(new.genre),
            distributor: Set(new.distributor),
            budget: Set(new.budget),
            mpa_rating: Set(new.mpa_rating),
            box_office: Set(None),
            // filled in by `before_save`
            title_folded: NotSet,
            genre_folded: NotSet,
            distributor_folded: NotSet,
            mpa_rating_folded: NotSet,
            created_at: Set(now),
            updated_at: Set(now),
        };

        let row = model.insert(&self.db).await?;
        debug!(id = %row.id, title = %row.title, "movie created");
        Ok(Movie::try_from(row)?)
    }

    pub async fn get_by_id(&self, id: &str) -> AppResult<Movie> {
        let row = movie::Entity::find_by_id(id.to_string())
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)?;
        Ok(Movie::try_from(row)?)
    }

    /// Resolves a title to exactly one movie. Zero or several matches are
    /// both reported as not found.
    pub async fn get_by_title(&self, title: &str) -> AppResult<Movie> {
        let mut rows = movie::Entity::find()
            .filter(movie::Column::Title.eq(title))
            .order_by_desc(movie::Column::CreatedAt)
            .limit(2)
            .all(&self.db)
            .await?;

        if rows.len() != 1 {
            if rows.len() > 1 {
                debug!(title = %title, "ambiguous title lookup");
            }
            return Err(AppError::NotFound);
        }
        let row = rows.remove(0);
        Ok(Movie::try_from(row)?)
    }

    pub async fn update_metadata(&self, id: &str, update: MetadataUpdate) -> AppResult<Movie> {
        let box_office = update
            .box_office
            .as_ref()
            .map(serde_json::to_value)
            .transpose()
            .context("encode box office")?;

        let mut model = movie::ActiveModel { id: Unchanged(id.to_string()), ..Default::default() };
        if let Some(distributor) = update.distributor {
            model.distributor = Set(Some(distributor));
        }
        if let Some(budget) = update.budget {
            model.budget = Set(Some(budget));
        }
        if let Some(mpa_rating) = update.mpa_rating {
            model.mpa_rating = Set(Some(mpa_rating));
        }
        model.box_office = Set(box_office);
        model.updated_at = Set(now_micros());

        let row = model.update(&self.db).await?;
        Ok(Movie::try_from(row)?)
    }

    pub async fn list(&self, filters: &MovieFilters) -> AppResult<MoviePage> {
        let limit = filters.page_size();

        let rows = movie::Entity::find()
            .filter(filters.condition())
            .order_by_desc(movie::Column::CreatedAt)
            .order_by_desc(movie::Column::Id)
            .limit(limit)
            .all(&self.db)
            .await?;

        let items = rows.into_iter().map(Movie::try_from).collect::<anyhow::Result<Vec<_>>>()?;
        let next_cursor = if items.len() as u64 == limit {
            items.last().map(Movie::cursor)
        } else {
            None
        };

        debug!(count = items.len(), limit = limit, has_next = next_cursor.is_some(), "listed movies");
        Ok(MoviePage { items, next_cursor })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(pairs: &[(&str, &str)]) -> ListMoviesQuery {
        let mut q = ListMoviesQuery::default();
        for (key, value) in pairs {
            let value = Some(value.to_string());
            match *key {
                "q" => q.q = value,
                "year" => q.year = value,
                "genre" => q.genre = value,
                "distributor" => q.distributor = value,
                "budget" => q.budget = value,
                "mpaRating" => q.mpa_rating = value,
                "limit" => q.limit = value,
                "cursor" => q.cursor = value,
                other => panic!("unknown key {other}"),
            }
        }
        q
    }

    #[test]
    fn parses_and_trims_filters() {
        let filters = MovieFilters::try_from(query(&[
            ("q", " Nolan "),
            ("year", "2010"),
            ("genre", "Action"),
            ("distributor", " Warner "),
            ("budget", "100000000"),
            ("mpaRating", "PG-13"),
            ("limit", "150"),
        ]))
        .unwrap();

        assert_eq!(filters.query.as_deref(), Some("Nolan"));
        assert_eq!(filters.year, Some(2010));
        assert_eq!(filters.genre.as_deref(), Some("Action"));
        assert_eq!(filters.distributor.as_deref(), Some("Warner"));
        assert_eq!(filters.max_budget, Some(100_000_000));
        assert_eq!(filters.mpa_rating.as_deref(), Some("PG-13"));
        assert_eq!(filters.page_size(), 100);
    }

    #[test]
    fn rejects_malformed_numbers() {
        for (key, value) in [("year", "abc"), ("budget", "-5"), ("budget", "1e9"), ("limit", "ten")] {
            let err = MovieFilters::try_from(query(&[(key, value)])).unwrap_err();
            assert!(matches!(err, AppError::BadRequest(_)), "{key}={value}");
        }
    }

    #[test]
    fn bad_cursor_is_its_own_error() {
        let err = MovieFilters::try_from(query(&[("cursor", "@@@")])).unwrap_err();
        assert!(matches!(err, AppError::InvalidCursor(_)));
    }

    #[test]
    fn blank_cursor_means_first_page() {
        let filters = MovieFilters::try_from(query(&[("cursor", "  ")])).unwrap();
        assert!(filters.cursor.is_none());
    }

    #[test]
    fn page_size_is_clamped() {
        let size = |limit| MovieFilters { limit, ..Default::default() }.page_size();
        assert_eq!(size(None), 20);
        assert_eq!(size(Some(0)), 20);
        assert_eq!(size(Some(-3)), 20);
        assert_eq!(size(Some(1)), 1);
        assert_eq!(size(Some(100)), 100);
        assert_eq!(size(Some(101)), 100);
    }
}
