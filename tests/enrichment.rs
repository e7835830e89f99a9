mod common;

use std::time::{Duration, Instant};

use movies_api::{models::NewMovie, movies::MovieStore};

use common::{Stub, enricher, memory_db, new_movie, report};

async fn create_and_enrich(stub: Stub, requested: NewMovie) -> (MovieStore, movies_api::models::Movie) {
    let store = MovieStore::new(memory_db().await);
    let created = store.create(requested.clone()).await.unwrap();
    let enriched = enricher(stub).enrich(&store, created, &requested).await;
    (store, enriched)
}

#[tokio::test]
async fn not_found_leaves_movie_untouched() {
    let requested = new_movie("Obscure", "2001-01-01", "Drama");
    let (store, movie) = create_and_enrich(Stub::NotFound, requested).await;

    assert!(movie.box_office.is_none());
    assert!(movie.distributor.is_none());
    assert_eq!(store.get_by_id(&movie.id).await.unwrap(), movie);
}

#[tokio::test]
async fn caller_fields_survive_enrichment() {
    let requested = NewMovie {
        distributor: Some("Legendary".into()),
        ..new_movie("Inception", "2010-07-16", "Sci-Fi")
    };
    let (store, movie) = create_and_enrich(Stub::Found(report()), requested).await;

    assert_eq!(movie.distributor.as_deref(), Some("Legendary"));
    assert_eq!(movie.budget, Some(160_000_000));
    assert_eq!(movie.mpa_rating.as_deref(), Some("PG-13"));
    assert_eq!(movie.box_office, Some(report().box_office));
    assert!(movie.updated_at >= movie.created_at);

    let stored = store.get_by_id(&movie.id).await.unwrap();
    assert_eq!(stored, movie);
}

#[tokio::test]
async fn provider_failure_keeps_created_movie() {
    let requested = new_movie("Flaky", "2015-05-05", "Drama");
    let (store, movie) = create_and_enrich(Stub::Fail, requested).await;

    assert!(movie.box_office.is_none());
    assert_eq!(store.get_by_id(&movie.id).await.unwrap(), movie);
}

#[tokio::test]
async fn slow_provider_is_cut_off() {
    let started = Instant::now();
    let requested = new_movie("Slow", "2015-05-05", "Drama");
    let (_, movie) = create_and_enrich(Stub::Hang, requested).await;

    assert!(movie.box_office.is_none());
    assert!(started.elapsed() < Duration::from_secs(5));
}
