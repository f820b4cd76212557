//! Single-post probe against the forum.
//!
//! The fetcher performs exactly one HTTP request per call and reports a
//! tri-state-plus-errors outcome. It never retries: retry policy (and the
//! pacing that goes with it) belongs to the discovery walker.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};

use crate::config::ForumConfig;
use crate::error::{Result, WatchError};

/// Outcome of probing a single post id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The post exists; raw page payload attached.
    Found(String),
    /// The post does not (yet) exist. Normal discovery-negative signal.
    NotFound,
    /// The forum answered 429. Pacing must slow down; never a hard error.
    RateLimited,
    /// Timeout or connection failure. Retryable within the cycle deadline.
    Transient(String),
    /// Any other HTTP status.
    Unexpected(u16),
}

/// Probes a post id and classifies the response.
#[async_trait]
pub trait PostFetcher: Send + Sync {
    async fn fetch(&self, id: i64) -> Result<FetchOutcome>;
}

/// HTTP fetcher over reqwest.
pub struct HttpFetcher {
    client: Client,
    base_url: String,
    path_template: String,
    missing_marker: String,
}

impl HttpFetcher {
    pub fn new(config: &ForumConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.fetch_timeout_ms))
            .build()
            .map_err(|e| WatchError::Fetch(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            path_template: config.post_path_template.clone(),
            missing_marker: config.missing_marker.clone(),
        })
    }

    fn post_url(&self, id: i64) -> String {
        format!("{}{}", self.base_url, self.path_template.replace("{id}", &id.to_string()))
    }
}

#[async_trait]
impl PostFetcher for HttpFetcher {
    async fn fetch(&self, id: i64) -> Result<FetchOutcome> {
        let url = self.post_url(id);

        let response = match self.client.get(&url).send().await {
            Ok(r) => r,
            Err(e) if e.is_timeout() || e.is_connect() || e.is_request() => {
                return Ok(FetchOutcome::Transient(e.to_string()));
            }
            Err(e) => return Err(WatchError::Fetch(e.to_string())),
        };

        let status = response.status();
        if status == StatusCode::OK {
            let body = match response.text().await {
                Ok(b) => b,
                Err(e) => return Ok(FetchOutcome::Transient(e.to_string())),
            };
            // Some forums render a 200 page with a missing-post marker
            // instead of answering 404.
            if body.contains(&self.missing_marker) {
                Ok(FetchOutcome::NotFound)
            } else {
                Ok(FetchOutcome::Found(body))
            }
        } else if status == StatusCode::NOT_FOUND {
            Ok(FetchOutcome::NotFound)
        } else if status == StatusCode::TOO_MANY_REQUESTS {
            Ok(FetchOutcome::RateLimited)
        } else {
            Ok(FetchOutcome::Unexpected(status.as_u16()))
        }
    }
}

/// Fetcher driven by a scripted queue of outcomes, for tests.
///
/// Pops the next scripted outcome per call; once the script runs dry, every
/// further call returns the configured fallback.
pub struct ScriptedFetcher {
    script: std::sync::Mutex<std::collections::VecDeque<FetchOutcome>>,
    fallback: FetchOutcome,
}

impl ScriptedFetcher {
    pub fn new(outcomes: Vec<FetchOutcome>) -> Self {
        Self {
            script: std::sync::Mutex::new(outcomes.into()),
            fallback: FetchOutcome::NotFound,
        }
    }

    pub fn always(outcome: FetchOutcome) -> Self {
        Self {
            script: std::sync::Mutex::new(std::collections::VecDeque::new()),
            fallback: outcome,
        }
    }
}

#[async_trait]
impl PostFetcher for ScriptedFetcher {
    async fn fetch(&self, _id: i64) -> Result<FetchOutcome> {
        let mut script = self.script.lock().expect("script lock");
        Ok(script.pop_front().unwrap_or_else(|| self.fallback.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fetcher() -> HttpFetcher {
        HttpFetcher::new(&ForumConfig::default()).unwrap()
    }

    #[test]
    fn test_post_url_substitution() {
        let f = fetcher();
        assert_eq!(
            f.post_url(9_000_001),
            "https://osu.ppy.sh/community/forums/posts/9000001"
        );
    }

    #[tokio::test]
    async fn test_scripted_fetcher_pops_then_falls_back() {
        let scripted = ScriptedFetcher::new(vec![FetchOutcome::RateLimited]);
        assert_eq!(scripted.fetch(1).await.unwrap(), FetchOutcome::RateLimited);
        assert_eq!(scripted.fetch(1).await.unwrap(), FetchOutcome::NotFound);

        let always = ScriptedFetcher::always(FetchOutcome::Unexpected(500));
        assert_eq!(always.fetch(1).await.unwrap(), FetchOutcome::Unexpected(500));
        assert_eq!(always.fetch(2).await.unwrap(), FetchOutcome::Unexpected(500));
    }

    #[test]
    fn test_outcome_equality() {
        assert_eq!(FetchOutcome::NotFound, FetchOutcome::NotFound);
        assert_eq!(FetchOutcome::RateLimited, FetchOutcome::RateLimited);
        assert_ne!(
            FetchOutcome::Found("a".to_string()),
            FetchOutcome::Found("b".to_string())
        );
        assert_eq!(FetchOutcome::Unexpected(503), FetchOutcome::Unexpected(503));
    }
}
