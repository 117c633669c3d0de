use crate::carsensor_scraper;
use crate::error::ScrapeError;
use reqwest::blocking::Client;
use reqwest::header::ACCEPT_LANGUAGE;
use std::time::Duration;
use tracing::{debug, info};

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36";
const ACCEPT_LANGUAGES: &str = "ja,en-US;q=0.9,en;q=0.8";

/// How the results page is requested.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub url: String,
    pub user_agent: String,
    pub accept_language: String,
    pub timeout: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            url: carsensor_scraper::search_url(),
            user_agent: USER_AGENT.to_string(),
            accept_language: ACCEPT_LANGUAGES.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Fetches the page once. Undecodable bytes are replaced, never rejected.
pub fn fetch_page(config: &FetchConfig) -> Result<String, ScrapeError> {
    info!("Fetching search results: {}", config.url);

    let fetch_error = |source| ScrapeError::Fetch {
        url: config.url.clone(),
        source,
    };

    let client = Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(config.timeout)
        .build()
        .map_err(fetch_error)?;

    let response = client
        .get(&config.url)
        .header(ACCEPT_LANGUAGE, config.accept_language.as_str())
        .send()
        .map_err(fetch_error)?;

    let status = response.status();
    if !status.is_success() {
        return Err(ScrapeError::Status {
            url: config.url.clone(),
            status,
        });
    }

    let body = response.text().map_err(fetch_error)?;
    debug!("Received {} bytes from {}", body.len(), config.url);
    Ok(body)
}
