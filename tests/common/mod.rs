#![allow(dead_code)]

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use jiff::Timestamp;
use movies_api::{
    AppState,
    auth::BearerToken,
    boxoffice::{BoxOfficeError, BoxOfficeProvider, BoxOfficeReport},
    build_router,
    db::{self, PoolOptions},
    enrichment::Enricher,
    models::{BoxOffice, NewMovie, Revenue},
    movies::MovieStore,
};
use reqwest::StatusCode;
use sea_orm::DatabaseConnection;
use tempfile::TempDir;

pub const TOKEN: &str = "test-token";

pub async fn memory_db() -> DatabaseConnection {
    db::connect_and_migrate("sqlite::memory:", &PoolOptions::default())
        .await
        .expect("in-memory database should open")
}

/// File-backed database with a real multi-connection pool.
pub async fn file_db(dir: &TempDir) -> DatabaseConnection {
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("movies.db").display());
    let pool = PoolOptions { max_connections: 4, min_connections: 1, ..PoolOptions::default() };
    db::connect_and_migrate(&url, &pool).await.expect("file database should open")
}

pub enum Stub {
    Found(BoxOfficeReport),
    NotFound,
    Fail,
    Hang,
}

pub struct StubProvider(pub Stub);

#[async_trait]
impl BoxOfficeProvider for StubProvider {
    async fn lookup(&self, _title: &str) -> Result<Option<BoxOfficeReport>, BoxOfficeError> {
        match &self.0 {
            Stub::Found(report) => Ok(Some(report.clone())),
            Stub::NotFound => Ok(None),
            Stub::Fail => Err(BoxOfficeError::Status(StatusCode::BAD_GATEWAY)),
            Stub::Hang => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(None)
            },
        }
    }
}

pub fn report() -> BoxOfficeReport {
    BoxOfficeReport {
        distributor: Some("Warner Bros.".into()),
        budget: Some(160_000_000),
        mpa_rating: Some("PG-13".into()),
        box_office: BoxOffice {
            revenue: Revenue { worldwide: 836_836_967, opening_weekend_usa: Some(62_785_337) },
            currency: "USD".into(),
            source: "StubProvider".into(),
            last_updated: Timestamp::from_second(1_700_000_000).unwrap(),
        },
    }
}

pub fn enricher(stub: Stub) -> Enricher {
    Enricher::new(Arc::new(StubProvider(stub)), Duration::from_millis(200))
}

pub fn app_with(db: DatabaseConnection, stub: Stub) -> axum::Router {
    let state = AppState::new(db, enricher(stub), BearerToken::new(TOKEN), Duration::from_secs(2));
    build_router(Arc::new(state))
}

pub fn new_movie(title: &str, release_date: &str, genre: &str) -> NewMovie {
    NewMovie {
        title: title.into(),
        release_date: release_date.parse().unwrap(),
        genre: genre.into(),
        distributor: None,
        budget: None,
        mpa_rating: None,
    }
}

pub async fn seed(store: &MovieStore, movie: NewMovie) -> movies_api::models::Movie {
    store.create(movie).await.expect("seed movie")
}

/// Row built directly against the entity, bypassing `MovieStore::create`, so
/// tests can pin ids, timestamps and raw box-office JSON.
pub fn raw_movie(
    id: &str,
    title: &str,
    created_at: i64,
    box_office: Option<serde_json::Value>,
) -> movies_api::entities::movie::ActiveModel {
    use sea_orm::ActiveValue::{NotSet, Set};

    movies_api::entities::movie::ActiveModel {
        id: Set(id.to_string()),
        title: Set(title.to_string()),
        release_date: Set("2020-01-01".to_string()),
        release_year: NotSet,
        genre: Set("Drama".to_string()),
        distributor: Set(None),
        budget: Set(None),
        mpa_rating: Set(None),
        box_office: Set(box_office),
        title_folded: NotSet,
        genre_folded: NotSet,
        distributor_folded: NotSet,
        mpa_rating_folded: NotSet,
        created_at: Set(created_at),
        updated_at: Set(created_at),
    }
}
