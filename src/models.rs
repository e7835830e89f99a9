use anyhow::Context;
use jiff::{Timestamp, civil::Date};
use serde::{Deserialize, Serialize};

use crate::{
    cursor::MovieCursor,
    entities::{movie, rating},
    error::{AppError, AppResult},
};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Revenue {
    pub worldwide: i64,
    #[serde(rename = "openingWeekendUSA", default, skip_serializing_if = "Option::is_none")]
    pub opening_weekend_usa: Option<i64>,
}

/// Box-office sub-document. Stored as JSON on the movie row; the table's
/// CHECK constraint requires every key below except `openingWeekendUSA`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoxOffice {
    pub revenue: Revenue,
    pub currency: String,
    pub source: String,
    pub last_updated: Timestamp,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Movie {
    pub id: String,
    pub title: String,
    pub release_date: Date,
    pub release_year: i16,
    pub genre: String,
    pub distributor: Option<String>,
    pub budget: Option<i64>,
    pub mpa_rating: Option<String>,
    pub box_office: Option<BoxOffice>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Movie {
    pub fn cursor(&self) -> MovieCursor {
        MovieCursor::new(self.created_at, self.id.clone())
    }
}

impl TryFrom<movie::Model> for Movie {
    type Error = anyhow::Error;

    fn try_from(row: movie::Model) -> anyhow::Result<Self> {
        let release_date: Date =
            row.release_date.parse().with_context(|| format!("movie {} release_date", row.id))?;
        let box_office = row
            .box_office
            .map(serde_json::from_value::<BoxOffice>)
            .transpose()
            .with_context(|| format!("movie {} box_office", row.id))?;

        Ok(Self {
            release_year: i16::try_from(row.release_year).context("release_year out of range")?,
            release_date,
            title: row.title,
            genre: row.genre,
            distributor: row.distributor,
            budget: row.budget,
            mpa_rating: row.mpa_rating,
            box_office,
            created_at: Timestamp::from_microsecond(row.created_at)?,
            updated_at: Timestamp::from_microsecond(row.updated_at)?,
            id: row.id,
        })
    }
}

/// Validated input for creating a movie.
#[derive(Clone, Debug)]
pub struct NewMovie {
    pub title: String,
    pub release_date: Date,
    pub genre: String,
    pub distributor: Option<String>,
    pub budget: Option<i64>,
    pub mpa_rating: Option<String>,
}

/// Partial update applied by enrichment. `None` leaves distributor, budget
/// and MPA rating untouched; `box_office` is always written as given.
#[derive(Clone, Debug, Default)]
pub struct MetadataUpdate {
    pub distributor: Option<String>,
    pub budget: Option<i64>,
    pub mpa_rating: Option<String>,
    pub box_office: Option<BoxOffice>,
}

/// One of the ten steps 0.5, 1.0, ..., 5.0, held as a count of half points.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RatingValue(u8);

impl RatingValue {
    pub const MIN_HALF_STEPS: u8 = 1;
    pub const MAX_HALF_STEPS: u8 = 10;

    pub fn from_half_steps(half_steps: i64) -> Option<Self> {
        u8::try_from(half_steps)
            .ok()
            .filter(|h| (Self::MIN_HALF_STEPS..=Self::MAX_HALF_STEPS).contains(h))
            .map(Self)
    }

    pub fn half_steps(self) -> u8 {
        self.0
    }

    pub fn as_f64(self) -> f64 {
        f64::from(self.0) / 2.0
    }

    #[cfg(test)]
    pub fn all() -> impl Iterator<Item = Self> {
        (Self::MIN_HALF_STEPS..=Self::MAX_HALF_STEPS).map(Self)
    }
}

impl TryFrom<f64> for RatingValue {
    type Error = AppError;

    fn try_from(value: f64) -> AppResult<Self> {
        let doubled = value * 2.0;
        if doubled.fract() != 0.0 {
            return Err(invalid_rating());
        }
        // NaN and infinities fall outside the range check.
        if !(1.0..=10.0).contains(&doubled) {
            return Err(invalid_rating());
        }
        Self::from_half_steps(doubled as i64).ok_or_else(invalid_rating)
    }
}

fn invalid_rating() -> AppError {
    AppError::validation("rating must be one of {0.5, 1.0, ..., 5.0}")
}

#[derive(Clone, Debug, PartialEq)]
pub struct Rating {
    pub movie_id: String,
    pub rater_id: String,
    pub value: RatingValue,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl TryFrom<rating::Model> for Rating {
    type Error = anyhow::Error;

    fn try_from(row: rating::Model) -> anyhow::Result<Self> {
        let value = RatingValue::from_half_steps(i64::from(row.half_steps))
            .with_context(|| format!("stored rating {} out of range", row.half_steps))?;
        Ok(Self {
            movie_id: row.movie_id,
            rater_id: row.rater_id,
            value,
            created_at: Timestamp::from_microsecond(row.created_at)?,
            updated_at: Timestamp::from_microsecond(row.updated_at)?,
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RatingAggregate {
    /// Mean in tenths, rounded half-up.
    pub average_tenths: i64,
    pub count: i64,
}

impl RatingAggregate {
    pub fn from_totals(count: i64, sum_half_steps: i64) -> Self {
        if count <= 0 {
            return Self { average_tenths: 0, count: 0 };
        }
        // mean = sum / (2 * count); tenths = floor(mean * 10 + 0.5)
        let average_tenths = (10 * sum_half_steps + count) / (2 * count);
        Self { average_tenths, count }
    }

    pub fn average(&self) -> f64 {
        self.average_tenths as f64 / 10.0
    }
}

pub fn parse_release_date(raw: &str) -> AppResult<Date> {
    let raw = raw.trim();
    let invalid = || AppError::validation("releaseDate must follow YYYY-MM-DD format");
    if raw.len() != 10 {
        return Err(invalid());
    }
    Date::strptime("%Y-%m-%d", raw).map_err(|_| invalid())
}

/// Trims and drops blank strings, so `Some("  ")` is treated as unset.
pub fn normalize_opt(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateMovieRequest {
    pub title: String,
    pub genre: String,
    pub release_date: String,
    pub distributor: Option<String>,
    pub budget: Option<i64>,
    pub mpa_rating: Option<String>,
}

impl CreateMovieRequest {
    pub fn validate(self) -> AppResult<NewMovie> {
        let release_date = parse_release_date(&self.release_date)?;
        let title = self.title.trim().to_string();
        let genre = self.genre.trim().to_string();
        if title.is_empty() || genre.is_empty() {
            return Err(AppError::validation("title and genre are required"));
        }
        if self.budget.is_some_and(|b| b < 0) {
            return Err(AppError::validation("budget must be non-negative"));
        }
        Ok(NewMovie {
            title,
            release_date,
            genre,
            distributor: normalize_opt(self.distributor),
            budget: self.budget,
            mpa_rating: normalize_opt(self.mpa_rating),
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RatingRequest {
    pub rating: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieResponse {
    pub id: String,
    pub title: String,
    pub release_date: String,
    pub genre: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distributor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mpa_rating: Option<String>,
    pub box_office: Option<BoxOffice>,
}

impl From<Movie> for MovieResponse {
    fn from(movie: Movie) -> Self {
        Self {
            id: movie.id,
            title: movie.title,
            release_date: movie.release_date.to_string(),
            genre: movie.genre,
            distributor: movie.distributor,
            budget: movie.budget,
            mpa_rating: movie.mpa_rating,
            box_office: movie.box_office,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieListResponse {
    pub items: Vec<MovieResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingResponse {
    pub movie_title: String,
    pub rater_id: String,
    pub rating: f64,
}

#[derive(Debug, Serialize)]
pub struct RatingAggregateResponse {
    pub average: f64,
    pub count: i64,
}

impl From<RatingAggregate> for RatingAggregateResponse {
    fn from(agg: RatingAggregate) -> Self {
        Self { average: agg.average(), count: agg.count }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aggregate_of(values: &[f64]) -> RatingAggregate {
        let sum: i64 = values
            .iter()
            .map(|v| i64::from(RatingValue::try_from(*v).unwrap().half_steps()))
            .sum();
        RatingAggregate::from_totals(values.len() as i64, sum)
    }

    #[test]
    fn accepts_exactly_the_ten_steps() {
        let accepted: Vec<f64> = RatingValue::all().map(RatingValue::as_f64).collect();
        assert_eq!(accepted, vec![0.5, 1.0, 1.5, 2.0, 2.5, 3.0, 3.5, 4.0, 4.5, 5.0]);
        for v in accepted {
            assert!(RatingValue::try_from(v).is_ok(), "{v} should be accepted");
        }
        for v in [0.0, 3.3, 5.5, -0.5, 6.0, 0.25, f64::NAN, f64::INFINITY] {
            assert!(RatingValue::try_from(v).is_err(), "{v} should be rejected");
        }
    }

    #[test]
    fn average_rounds_half_up_at_tenths() {
        assert_eq!(aggregate_of(&[4.5, 3.5]).average(), 4.0);
        // 4.25 -> 4.3
        assert_eq!(aggregate_of(&[4.5, 4.0]).average(), 4.3);
        // 3.8333.. -> 3.8
        assert_eq!(aggregate_of(&[4.5, 3.5, 3.5]).average(), 3.8);
        // 1.75 -> 1.8
        assert_eq!(aggregate_of(&[1.5, 2.0]).average(), 1.8);
        assert_eq!(aggregate_of(&[5.0]).average(), 5.0);
    }

    #[test]
    fn empty_aggregate_is_zero() {
        let agg = RatingAggregate::from_totals(0, 0);
        assert_eq!(agg.count, 0);
        assert_eq!(agg.average(), 0.0);
    }

    #[test]
    fn release_date_requires_fixed_format() {
        assert_eq!(parse_release_date("2010-07-16").unwrap().year(), 2010);
        for bad in ["2010-7-16", "16/07/2010", "2010-02-30", "", "2010-07-16T00:00"] {
            assert!(parse_release_date(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn create_request_normalizes_optional_fields() {
        let req = CreateMovieRequest {
            title: "  Inception ".into(),
            genre: "Sci-Fi".into(),
            release_date: "2010-07-16".into(),
            distributor: Some("   ".into()),
            budget: Some(160_000_000),
            mpa_rating: Some(" PG-13 ".into()),
        };
        let movie = req.validate().unwrap();
        assert_eq!(movie.title, "Inception");
        assert_eq!(movie.distributor, None);
        assert_eq!(movie.mpa_rating.as_deref(), Some("PG-13"));
    }

    #[test]
    fn create_request_rejects_negative_budget_and_blank_title() {
        let base = || CreateMovieRequest {
            title: "X".into(),
            genre: "Drama".into(),
            release_date: "2020-01-01".into(),
            distributor: None,
            budget: None,
            mpa_rating: None,
        };
        let negative = CreateMovieRequest { budget: Some(-1), ..base() };
        assert!(matches!(negative.validate(), Err(AppError::Validation(_))));
        let blank = CreateMovieRequest { title: " ".into(), ..base() };
        assert!(matches!(blank.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn box_office_json_uses_wire_keys() {
        let box_office = BoxOffice {
            revenue: Revenue { worldwide: 10, opening_weekend_usa: Some(3) },
            currency: "USD".into(),
            source: "test".into(),
            last_updated: Timestamp::from_second(0).unwrap(),
        };
        let json = serde_json::to_value(&box_office).unwrap();
        assert_eq!(json["revenue"]["openingWeekendUSA"], 3);
        assert_eq!(json["lastUpdated"], "1970-01-01T00:00:00Z");
    }
}
