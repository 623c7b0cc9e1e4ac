use crate::{
    cached,
    db::{cache::RATINGS_TTL, Cache, CacheKey},
    error::{AppError, AppResult},
    models::{ExternalRatings, OmdbResponse},
    services::catalog::{client::ResilientClient, RatingsApi},
};

/// Query parameter carrying the OMDb key
pub const OMDB_KEY_PARAM: &str = "apikey";

/// OMDb ratings lookup (IMDb and Rotten Tomatoes scores)
#[derive(Clone)]
pub struct OmdbRatings {
    client: ResilientClient,
    cache: Cache,
}

impl OmdbRatings {
    pub fn new(client: ResilientClient, cache: Cache) -> Self {
        Self { client, cache }
    }

    async fn fetch_ratings(&self, imdb_id: &str) -> AppResult<ExternalRatings> {
        let response: OmdbResponse = self
            .client
            .fetch_json("/", &[("i", imdb_id.to_string())])
            .await?;

        // OMDb reports lookup failures with HTTP 200 and Response=False
        if response.response.as_deref() == Some("False") {
            let message = response
                .error
                .unwrap_or_else(|| "Movie not found".to_string());
            tracing::debug!(imdb_id = %imdb_id, error = %message, "Ratings lookup rejected");
            return Err(AppError::NotFound(format!("Ratings for {}: {}", imdb_id, message)));
        }

        Ok(response.into())
    }
}

#[async_trait::async_trait]
impl RatingsApi for OmdbRatings {
    async fn ratings(&self, imdb_id: &str) -> AppResult<ExternalRatings> {
        let imdb_id = imdb_id.trim();
        if !imdb_id.starts_with("tt") || imdb_id.len() < 3 {
            return Err(AppError::InvalidInput(format!(
                "Invalid IMDb id: {}",
                imdb_id
            )));
        }

        cached!(
            self.cache,
            CacheKey::Ratings(imdb_id.to_string()),
            RATINGS_TTL,
            self.fetch_ratings(imdb_id)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::catalog::client::{MockTransport, RawResponse, RetryPolicy};
    use std::sync::Arc;

    fn ratings(transport: MockTransport) -> OmdbRatings {
        let client = ResilientClient::new(
            Arc::new(transport),
            "http://ratings.test",
            OMDB_KEY_PARAM,
            "omdb-secret",
            RetryPolicy::with_max_attempts(1),
        );
        OmdbRatings::new(client, Cache::new())
    }

    #[tokio::test]
    async fn test_ratings_extracts_sources_once() {
        let mut transport = MockTransport::new();
        transport
            .expect_get()
            .withf(|url, params| {
                url == "http://ratings.test/"
                    && params.contains(&("apikey".to_string(), "omdb-secret".to_string()))
                    && params.contains(&("i".to_string(), "tt0133093".to_string()))
            })
            .times(1)
            .returning(|_, _| {
                Ok(RawResponse {
                    status: 200,
                    body: r#"{"Response": "True", "Ratings": [
                        {"Source": "Internet Movie Database", "Value": "8.7/10"},
                        {"Source": "Rotten Tomatoes", "Value": "83%"},
                        {"Source": "Metacritic", "Value": "73/100"}
                    ]}"#
                    .to_string(),
                })
            });

        let ratings = ratings(transport);
        let first = ratings.ratings("tt0133093").await.unwrap();
        assert_eq!(first.imdb.as_deref(), Some("8.7/10"));
        assert_eq!(first.rotten_tomatoes.as_deref(), Some("83%"));

        let cached = ratings.ratings("tt0133093").await.unwrap();
        assert_eq!(first, cached);
    }

    #[tokio::test]
    async fn test_response_false_is_not_found() {
        let mut transport = MockTransport::new();
        transport.expect_get().times(1).returning(|_, _| {
            Ok(RawResponse {
                status: 200,
                body: r#"{"Response": "False", "Error": "Incorrect IMDb ID."}"#.to_string(),
            })
        });

        let err = ratings(transport).ratings("tt0000000").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_rejects_malformed_id() {
        let err = ratings(MockTransport::new()).ratings("603").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }
}
