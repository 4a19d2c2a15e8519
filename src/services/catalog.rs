//! catalog.rs
//!
//! Шлюз к внешним каталогам фильмов:
//! - Trakt отдаёт список трендовых фильмов (только идентификаторы);
//! - OMDb отдаёт детали фильма по IMDb id.
//!
//! Каждый вызов ограничен таймаутом, повторяется с экспоненциальной задержкой
//! при временных сбоях и проходит через `CircuitBreaker` своего апстрима.

use futures::{stream, StreamExt};
use reqwest::{RequestBuilder, StatusCode};
use serde::{de::DeserializeOwned, Deserialize};
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::{CatalogConfig, CircuitBreakerConfig};
use crate::error::{AppError, Result};
use crate::models::Movie;
use crate::services::circuit_breaker::CircuitBreaker;

// --- Модели ответов апстримов ---

#[derive(Debug, Deserialize)]
pub struct TrendingItem {
    #[serde(default)]
    pub watchers: u64,
    pub movie: TraktMovie,
}

#[derive(Debug, Deserialize)]
pub struct TraktMovie {
    pub title: Option<String>,
    pub year: Option<i32>,
    pub ids: TraktIds,
}

#[derive(Debug, Deserialize)]
pub struct TraktIds {
    pub trakt: Option<u64>,
    pub imdb: Option<String>,
}

/// OMDb отвечает строками, отсутствующие значения приходят как `"N/A"`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OmdbMovie {
    #[serde(rename = "imdbID")]
    pub imdb_id: Option<String>,
    pub title: Option<String>,
    pub plot: Option<String>,
    pub poster: Option<String>,
    pub released: Option<String>,
    pub language: Option<String>,
    pub genre: Option<String>,
    pub actors: Option<String>,
    pub runtime: Option<String>,
    #[serde(rename = "imdbRating")]
    pub imdb_rating: Option<String>,
    pub response: Option<String>,
    pub error: Option<String>,
}

impl OmdbMovie {
    pub fn is_error(&self) -> bool {
        self.response
            .as_deref()
            .is_some_and(|r| r.eq_ignore_ascii_case("false"))
    }

    /// Приводит ответ к [`Movie`]; `fallback_id` берётся, если в ответе нет `imdbID`.
    pub fn into_movie(self, fallback_id: &str) -> Movie {
        let id = text(self.imdb_id);
        Movie {
            id: if id.is_empty() { fallback_id.to_string() } else { id },
            title: text(self.title),
            overview: text(self.plot),
            poster_path: text(self.poster),
            backdrop_path: String::new(),
            release_date: text(self.released),
            original_language: text(self.language),
            tagline: String::new(),
            genres: list(self.genre),
            casts: list(self.actors),
            vote_average: text(self.imdb_rating).parse().unwrap_or(0.0),
            runtime: leading_int(&text(self.runtime)),
        }
    }
}

fn text(value: Option<String>) -> String {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| v != "N/A")
        .unwrap_or_default()
}

fn list(value: Option<String>) -> Vec<String> {
    text(value)
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

// "148 min" -> 148
fn leading_int(value: &str) -> i32 {
    let digits: String = value.chars().take_while(char::is_ascii_digit).collect();
    digits.parse().unwrap_or(0)
}

// --- Клиент ---

#[derive(Clone)]
pub struct CatalogGateway {
    http: reqwest::Client,
    config: CatalogConfig,
    trakt_breaker: Arc<CircuitBreaker>,
    omdb_breaker: Arc<CircuitBreaker>,
}

impl CatalogGateway {
    pub fn new(config: CatalogConfig, breaker: &CircuitBreakerConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            http,
            config,
            trakt_breaker: Arc::new(CircuitBreaker::from_config(breaker)),
            omdb_breaker: Arc::new(CircuitBreaker::from_config(breaker)),
        })
    }

    /// Список трендовых фильмов из Trakt.
    pub async fn trending(&self) -> Result<Vec<TrendingItem>> {
        let url = format!("{}/movies/trending", self.config.trakt_base_url.trim_end_matches('/'));
        self.execute(&self.trakt_breaker, "trakt trending", || {
            let request = self
                .http
                .get(&url)
                .header("Content-Type", "application/json")
                .header("trakt-api-version", "2")
                .header("trakt-api-key", &self.config.trakt_client_id)
                .query(&[("limit", self.config.trending_limit)]);
            fetch_json(request, "trakt trending".to_string())
        })
        .await
    }

    /// Детали фильма из OMDb. `Response: "False"` -> `UpstreamNotFound`.
    pub async fn movie_details(&self, imdb_id: &str) -> Result<Movie> {
        let url = format!("{}/", self.config.omdb_base_url.trim_end_matches('/'));
        let what = format!("omdb {imdb_id}");

        let payload: OmdbMovie = self
            .execute(&self.omdb_breaker, &what, || {
                let request = self.http.get(&url).query(&[
                    ("i", imdb_id),
                    ("apikey", self.config.omdb_api_key.as_str()),
                ]);
                fetch_json(request, what.clone())
            })
            .await?;

        if payload.is_error() {
            let reason = payload.error.unwrap_or_else(|| "Movie not found!".to_string());
            return Err(AppError::UpstreamNotFound(format!("{imdb_id}: {reason}")));
        }
        Ok(payload.into_movie(imdb_id))
    }

    /// Трендовые фильмы с деталями. Запросы деталей идут параллельно (не более
    /// `fanout_concurrency` одновременно), порядок Trakt сохраняется.
    pub async fn now_playing(&self) -> Result<Vec<Movie>> {
        let trending = self.trending().await?;

        let mut seen = HashSet::new();
        let ids: Vec<String> = trending
            .into_iter()
            .filter_map(|item| item.movie.ids.imdb)
            .filter(|id| !id.trim().is_empty() && seen.insert(id.clone()))
            .collect();

        let total = ids.len();
        if total == 0 {
            return Ok(Vec::new());
        }
        debug!("Resolving {} trending movies via OMDb", total);

        let results: Vec<(String, Result<Movie>)> = stream::iter(ids)
            .map(|id| async move {
                let result = self.movie_details(&id).await;
                (id, result)
            })
            .buffered(self.config.fanout_concurrency.max(1))
            .collect()
            .await;

        let mut movies = Vec::with_capacity(total);
        let mut failures = 0;
        for (id, result) in results {
            match result {
                Ok(movie) => movies.push(movie),
                Err(AppError::UpstreamNotFound(reason)) => {
                    warn!(imdb_id = %id, "OMDb error, skipping: {}", reason);
                }
                Err(e) => {
                    failures += 1;
                    warn!(imdb_id = %id, "OMDb lookup failed, skipping: {}", e);
                }
            }
        }

        if failures == total {
            return Err(AppError::UpstreamUnavailable(format!(
                "all {total} OMDb lookups failed"
            )));
        }

        info!("Now playing: {} of {} trending movies resolved", movies.len(), total);
        Ok(movies)
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u64 << attempt.min(10);
        Duration::from_millis(self.config.retry_base_delay_ms.saturating_mul(factor))
    }

    /// Повторяет `operation` при временных сбоях, учитывая состояние выключателя.
    async fn execute<T, F, Fut>(&self, breaker: &CircuitBreaker, what: &str, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            if !breaker.can_execute() {
                warn!("Circuit breaker is OPEN - blocking {} request", what);
                return Err(AppError::UpstreamUnavailable(format!("{what}: circuit open")));
            }

            match operation().await {
                Ok(value) => {
                    breaker.record_success();
                    return Ok(value);
                }
                Err(e) if e.is_retryable() => {
                    breaker.record_failure();
                    if attempt >= self.config.max_retries {
                        return Err(e);
                    }
                    let delay = self.backoff(attempt);
                    warn!("{} failed (attempt {}), retrying in {:?}: {}", what, attempt + 1, delay, e);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                // Апстрим ответил осмысленно (нет такого фильма) - он жив
                Err(e @ AppError::UpstreamNotFound(_)) => {
                    breaker.record_success();
                    return Err(e);
                }
                // Отказ в доступе или битый ответ: выключатель не трогаем
                Err(e) => return Err(e),
            }
        }
    }
}

async fn fetch_json<T: DeserializeOwned>(request: RequestBuilder, what: String) -> Result<T> {
    let response = request
        .send()
        .await
        .map_err(|e| AppError::UpstreamUnavailable(format!("{what}: {e}")))?;

    let status = response.status();
    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        return Err(AppError::UpstreamUnavailable(format!("{what} returned {status}")));
    }
    if status == StatusCode::NOT_FOUND {
        return Err(AppError::UpstreamNotFound(what));
    }
    if !status.is_success() {
        return Err(AppError::Internal(format!("{what} rejected request: {status}")));
    }

    response
        .json::<T>()
        .await
        .map_err(|e| AppError::Internal(format!("{what}: malformed response: {e}")))
}
