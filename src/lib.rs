pub mod auth;
pub mod boxoffice;
pub mod config;
pub mod cursor;
pub mod db;
pub mod enrichment;
pub mod entities;
pub mod error;
pub mod models;
pub mod movies;
pub mod ratings;
pub mod routes;

use std::{sync::Arc, time::Duration};

use axum::{
    Router,
    extract::{DefaultBodyLimit, FromRef},
    routing::get,
};
use sea_orm::DatabaseConnection;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{auth::BearerToken, enrichment::Enricher, movies::MovieStore, ratings::RatingStore};

pub const MAX_BODY_BYTES: usize = 1 << 20;

pub struct AppState {
    pub db: DatabaseConnection,
    pub movies: MovieStore,
    pub ratings: RatingStore,
    pub enricher: Enricher,
    pub auth: BearerToken,
    pub health_timeout: Duration,
}

impl AppState {
    pub fn new(
        db: DatabaseConnection,
        enricher: Enricher,
        auth: BearerToken,
        health_timeout: Duration,
    ) -> Self {
        Self {
            movies: MovieStore::new(db.clone()),
            ratings: RatingStore::new(db.clone()),
            db,
            enricher,
            auth,
            health_timeout,
        }
    }
}

impl FromRef<Arc<AppState>> for BearerToken {
    fn from_ref(state: &Arc<AppState>) -> Self {
        state.auth.clone()
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(routes::healthz))
        .route("/movies", get(routes::list_movies).post(routes::create_movie))
        .route("/movies/{title}", get(routes::get_movie))
        .route("/movies/{title}/ratings", axum::routing::post(routes::submit_rating))
        .route("/movies/{title}/ratings/me", get(routes::my_rating))
        .route("/movies/{title}/rating", get(routes::rating_aggregate))
        .with_state(state)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(CorsLayer::new().allow_origin(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
}
