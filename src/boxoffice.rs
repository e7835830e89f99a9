use std::{num::NonZeroU32, sync::Arc};

use async_trait::async_trait;
use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
};
use jiff::Timestamp;
use reqwest::{StatusCode, header::ACCEPT};
use serde::Deserialize;

use crate::models::{BoxOffice, Revenue};

pub const DEFAULT_CURRENCY: &str = "USD";
pub const DEFAULT_SOURCE: &str = "BoxOfficeAPI";

/// What the provider knows about a title.
#[derive(Clone, Debug, PartialEq)]
pub struct BoxOfficeReport {
    pub distributor: Option<String>,
    pub budget: Option<i64>,
    pub mpa_rating: Option<String>,
    pub box_office: BoxOffice,
}

#[derive(Debug, thiserror::Error)]
pub enum BoxOfficeError {
    #[error("box office request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("box office upstream returned {0}")]
    Status(StatusCode),
    #[error("decode box office response: {0}")]
    Decode(#[from] serde_json::Error),
}

#[async_trait]
pub trait BoxOfficeProvider: Send + Sync {
    /// `Ok(None)` means the provider has no record for `title`.
    async fn lookup(&self, title: &str) -> Result<Option<BoxOfficeReport>, BoxOfficeError>;
}

pub struct HttpBoxOfficeClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    limiter: Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

impl HttpBoxOfficeClient {
    pub fn new(
        client: reqwest::Client,
        base_url: String,
        api_key: String,
        rps: NonZeroU32,
    ) -> Self {
        let quota = Quota::per_second(rps);
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }
}

#[async_trait]
impl BoxOfficeProvider for HttpBoxOfficeClient {
    async fn lookup(&self, title: &str) -> Result<Option<BoxOfficeReport>, BoxOfficeError> {
        self.limiter.until_ready().await;

        let resp = self
            .client
            .get(format!("{}/boxoffice", self.base_url))
            .query(&[("title", title)])
            .header("X-API-Key", &self.api_key)
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        match resp.status() {
            StatusCode::OK => {
                let body = resp.bytes().await?;
                let payload: ApiResponse = serde_json::from_slice(&body)?;
                Ok(Some(payload.into_report(Timestamp::now())))
            },
            StatusCode::NOT_FOUND => Ok(None),
            status => {
                tracing::warn!(status = %status, title = %title, "unexpected box office status");
                Err(BoxOfficeError::Status(status))
            },
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiResponse {
    distributor: Option<String>,
    budget: Option<i64>,
    #[serde(default)]
    revenue: RevenuePayload,
    mpa_rating: Option<String>,
    currency: Option<String>,
    source: Option<String>,
    last_updated: Option<Timestamp>,
}

#[derive(Debug, Default, Deserialize)]
struct RevenuePayload {
    worldwide: Option<i64>,
    #[serde(rename = "openingWeekendUSA")]
    opening_weekend_usa: Option<i64>,
}

impl ApiResponse {
    fn into_report(self, now: Timestamp) -> BoxOfficeReport {
        let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());

        BoxOfficeReport {
            distributor: self.distributor,
            budget: self.budget,
            mpa_rating: self.mpa_rating,
            box_office: BoxOffice {
                revenue: Revenue {
                    worldwide: self.revenue.worldwide.unwrap_or(0).max(0),
                    opening_weekend_usa: self.revenue.opening_weekend_usa,
                },
                currency: non_empty(self.currency).unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
                source: non_empty(self.source).unwrap_or_else(|| DEFAULT_SOURCE.to_string()),
                last_updated: self.last_updated.unwrap_or(now),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_defaults_for_sparse_payload() {
        let now = Timestamp::from_second(1_700_000_000).unwrap();
        let payload: ApiResponse = serde_json::from_str(r#"{"title":"Inception"}"#).unwrap();
        let report = payload.into_report(now);

        assert_eq!(report.distributor, None);
        assert_eq!(report.box_office.revenue.worldwide, 0);
        assert_eq!(report.box_office.revenue.opening_weekend_usa, None);
        assert_eq!(report.box_office.currency, "USD");
        assert_eq!(report.box_office.source, "BoxOfficeAPI");
        assert_eq!(report.box_office.last_updated, now);
    }

    #[test]
    fn keeps_provided_values() {
        let payload: ApiResponse = serde_json::from_str(
            r#"{
                "title": "Inception",
                "distributor": "Warner Bros.",
                "budget": 160000000,
                "mpaRating": "PG-13",
                "revenue": {"worldwide": 829895144, "openingWeekendUSA": 62785337},
                "currency": "EUR",
                "source": "Mock",
                "lastUpdated": "2024-05-01T12:00:00Z"
            }"#,
        )
        .unwrap();
        let report = payload.into_report(Timestamp::now());

        assert_eq!(report.distributor.as_deref(), Some("Warner Bros."));
        assert_eq!(report.budget, Some(160_000_000));
        assert_eq!(report.mpa_rating.as_deref(), Some("PG-13"));
        assert_eq!(report.box_office.revenue.worldwide, 829_895_144);
        assert_eq!(report.box_office.revenue.opening_weekend_usa, Some(62_785_337));
        assert_eq!(report.box_office.currency, "EUR");
        assert_eq!(report.box_office.last_updated.to_string(), "2024-05-01T12:00:00Z");
    }

    #[test]
    fn blank_currency_falls_back() {
        let payload: ApiResponse =
            serde_json::from_str(r#"{"currency":"","source":" "}"#).unwrap();
        let report = payload.into_report(Timestamp::now());
        assert_eq!(report.box_office.currency, DEFAULT_CURRENCY);
        assert_eq!(report.box_office.source, DEFAULT_SOURCE);
    }
}
