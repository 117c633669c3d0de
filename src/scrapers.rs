use crate::common_scraper::PageSource;
use crate::error::ScrapeError;
use crate::scraper::{self, FetchConfig};
use std::fs;
use std::path::PathBuf;

/// Live search results fetched over HTTP.
#[derive(Debug, Clone, Default)]
pub struct HttpPageSource {
    pub config: FetchConfig,
}

impl PageSource for HttpPageSource {
    fn name(&self) -> &str {
        "Carsensor.net"
    }

    fn source_url(&self) -> &str {
        &self.config.url
    }

    fn fetch(&self) -> Result<String, ScrapeError> {
        scraper::fetch_page(&self.config)
    }
}

/// A results page saved to disk earlier, parsed instead of fetching.
#[derive(Debug, Clone)]
pub struct FilePageSource {
    pub path: PathBuf,
    pub source_url: String,
}

impl PageSource for FilePageSource {
    fn name(&self) -> &str {
        "Saved page"
    }

    fn source_url(&self) -> &str {
        &self.source_url
    }

    fn fetch(&self) -> Result<String, ScrapeError> {
        let bytes = fs::read(&self.path).map_err(|source| ScrapeError::Read {
            path: self.path.display().to_string(),
            source,
        })?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}
