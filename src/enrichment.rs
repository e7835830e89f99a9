use std::{sync::Arc, time::Duration};

use tracing::{debug, warn};

use crate::{
    boxoffice::{BoxOfficeProvider, BoxOfficeReport},
    models::{MetadataUpdate, Movie, NewMovie, normalize_opt},
    movies::MovieStore,
};

/// Augments freshly created movies with provider data. Never fails: any
/// provider or storage problem leaves the movie as it was created.
#[derive(Clone)]
pub struct Enricher {
    provider: Arc<dyn BoxOfficeProvider>,
    timeout: Duration,
}

impl Enricher {
    pub fn new(provider: Arc<dyn BoxOfficeProvider>, timeout: Duration) -> Self {
        Self { provider, timeout }
    }

    pub async fn enrich(&self, store: &MovieStore, movie: Movie, requested: &NewMovie) -> Movie {
        let report =
            match tokio::time::timeout(self.timeout, self.provider.lookup(&movie.title)).await {
                Ok(Ok(Some(report))) => report,
                Ok(Ok(None)) => {
                    debug!(title = %movie.title, "no box office data for title");
                    return movie;
                },
                Ok(Err(err)) => {
                    warn!(title = %movie.title, error = %err, "box office lookup failed");
                    return movie;
                },
                Err(_) => {
                    warn!(title = %movie.title, timeout = ?self.timeout, "box office lookup timed out");
                    return movie;
                },
            };

        let update = merge_report(requested, report);
        match store.update_metadata(&movie.id, update).await {
            Ok(enriched) => {
                debug!(id = %enriched.id, title = %enriched.title, "movie enriched");
                enriched
            },
            Err(err) => {
                warn!(id = %movie.id, error = %err, "failed to store enrichment");
                movie
            },
        }
    }
}

/// Provider values only fill fields the caller left unset; the box office
/// document is always taken from the report.
fn merge_report(requested: &NewMovie, report: BoxOfficeReport) -> MetadataUpdate {
    MetadataUpdate {
        distributor: requested
            .distributor
            .is_none()
            .then(|| normalize_opt(report.distributor))
            .flatten(),
        budget: requested.budget.is_none().then_some(report.budget).flatten().filter(|b| *b >= 0),
        mpa_rating: requested
            .mpa_rating
            .is_none()
            .then(|| normalize_opt(report.mpa_rating))
            .flatten(),
        box_office: Some(report.box_office),
    }
}
