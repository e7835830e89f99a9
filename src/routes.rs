use std::sync::Arc;

use axum::{
    Json,
    extract::{FromRequest, Path, Query, State, rejection::PathRejection, rejection::QueryRejection},
    http::{StatusCode, header::LOCATION},
    response::IntoResponse,
};
use serde_json::{Value, json};

use crate::{
    AppState,
    auth::{RaterId, RequireBearer},
    db,
    error::{AppError, AppResult},
    models::{
        CreateMovieRequest, Movie, MovieListResponse, MovieResponse, RatingAggregateResponse,
        RatingRequest, RatingResponse, RatingValue,
    },
    movies::{ListMoviesQuery, MovieFilters},
};

/// `axum::Json` with rejections rendered through [`AppError`].
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

pub async fn healthz(State(state): State<Arc<AppState>>) -> AppResult<Json<Value>> {
    db::ping(&state.db, state.health_timeout).await?;
    Ok(Json(json!({ "status": "ok" })))
}

pub async fn list_movies(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ListMoviesQuery>, QueryRejection>,
) -> AppResult<Json<MovieListResponse>> {
    let Query(raw) = query.map_err(|rejection| AppError::bad_request(rejection.body_text()))?;
    let filters = MovieFilters::try_from(raw)?;

    let page = state.movies.list(&filters).await?;
    Ok(Json(MovieListResponse {
        items: page.items.into_iter().map(MovieResponse::from).collect(),
        next_cursor: page.next_cursor.map(|c| c.encode()),
    }))
}

pub async fn create_movie(
    State(state): State<Arc<AppState>>,
    _auth: RequireBearer,
    ApiJson(req): ApiJson<CreateMovieRequest>,
) -> AppResult<impl IntoResponse> {
    let new = req.validate()?;
    let movie = state.movies.create(new.clone()).await?;
    let movie = state.enricher.enrich(&state.movies, movie, &new).await;

    let location = format!("/movies/{}", urlencoding::encode(&movie.title));
    Ok((StatusCode::CREATED, [(LOCATION, location)], Json(MovieResponse::from(movie))))
}

pub async fn get_movie(
    State(state): State<Arc<AppState>>,
    title: Result<Path<String>, PathRejection>,
) -> AppResult<Json<MovieResponse>> {
    let movie = resolve_title(&state, title).await?;
    Ok(Json(MovieResponse::from(movie)))
}

pub async fn submit_rating(
    State(state): State<Arc<AppState>>,
    title: Result<Path<String>, PathRejection>,
    RaterId(rater_id): RaterId,
    ApiJson(req): ApiJson<RatingRequest>,
) -> AppResult<impl IntoResponse> {
    let movie = resolve_title(&state, title).await?;
    let value = RatingValue::try_from(req.rating)?;

    let (rating, inserted) = state.ratings.upsert(&movie.id, &rater_id, value).await?;
    let status = if inserted { StatusCode::CREATED } else { StatusCode::OK };
    Ok((
        status,
        Json(RatingResponse {
            movie_title: movie.title,
            rater_id: rating.rater_id,
            rating: rating.value.as_f64(),
        }),
    ))
}

pub async fn my_rating(
    State(state): State<Arc<AppState>>,
    title: Result<Path<String>, PathRejection>,
    RaterId(rater_id): RaterId,
) -> AppResult<Json<RatingResponse>> {
    let movie = resolve_title(&state, title).await?;
    let rating = state.ratings.get(&movie.id, &rater_id).await?;
    Ok(Json(RatingResponse {
        movie_title: movie.title,
        rater_id: rating.rater_id,
        rating: rating.value.as_f64(),
    }))
}

pub async fn rating_aggregate(
    State(state): State<Arc<AppState>>,
    title: Result<Path<String>, PathRejection>,
) -> AppResult<Json<RatingAggregateResponse>> {
    let movie = resolve_title(&state, title).await?;
    let aggregate = state.ratings.aggregate(&movie.id).await?;
    Ok(Json(aggregate.into()))
}

async fn resolve_title(
    state: &AppState,
    title: Result<Path<String>, PathRejection>,
) -> AppResult<Movie> {
    let Path(title) = title.map_err(|rejection| AppError::bad_request(rejection.body_text()))?;
    let title = title.trim();
    if title.is_empty() {
        return Err(AppError::bad_request("title must not be empty"));
    }
    state.movies.get_by_title(title).await
}
