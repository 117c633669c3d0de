use crate::carsensor_scraper;
use crate::error::ScrapeError;
use crate::models::{Listing, ListingsReport, SearchQuery};
use std::collections::HashMap;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Default)]
pub struct ScrapingOptions {
    pub max_price: Option<i64>,
    pub region: Option<String>,
}

/// Something that can produce the markup of the search results page.
pub trait PageSource {
    fn name(&self) -> &str;
    /// URL recorded as the report's `source`.
    fn source_url(&self) -> &str;
    fn fetch(&self) -> Result<String, ScrapeError>;
}

/// Fetches and parses the page, then collapses duplicate listings.
pub fn scrape_listings<S: PageSource + ?Sized>(source: &S) -> Result<Vec<Listing>, ScrapeError> {
    let html = source.fetch()?;
    let listings = carsensor_scraper::parse_listings_page(&html);
    Ok(dedupe_listings(listings))
}

/// Keeps one listing per natural key. A later listing replaces an earlier
/// one but stays at the position where the key was first seen.
pub fn dedupe_listings(listings: Vec<Listing>) -> Vec<Listing> {
    let total = listings.len();
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut unique: Vec<Listing> = Vec::with_capacity(total);

    for listing in listings {
        let key = listing.natural_key();
        match positions.get(&key).copied() {
            Some(index) => unique[index] = listing,
            None => {
                positions.insert(key, unique.len());
                unique.push(listing);
            }
        }
    }

    if unique.len() < total {
        debug!("Collapsed {} duplicate listings", total - unique.len());
    }
    unique
}

pub fn apply_filters(listings: Vec<Listing>, options: &ScrapingOptions) -> Vec<Listing> {
    let mut filtered = listings;

    if let Some(max_price) = options.max_price {
        // A negative threshold excludes every known price.
        let max_price = u64::try_from(max_price).ok();
        filtered.retain(|listing| match (listing.price_yen, max_price) {
            (None, _) => true,
            (Some(price), Some(max_price)) => price <= max_price,
            (Some(_), None) => false,
        });
    }

    if let Some(region) = options.region.as_deref().filter(|r| !r.is_empty()) {
        let region = region.to_lowercase();
        filtered.retain(|listing| listing.location.to_lowercase().contains(&region));
    }

    filtered
}

/// Runs one scrape and always produces a report; a failed fetch or parse
/// is recorded in the report's `error` field with no listings.
pub fn run_scraper<S: PageSource + ?Sized>(source: &S, options: &ScrapingOptions) -> ListingsReport {
    info!("{} listings scraper", source.name());

    let (listings, error) = match scrape_listings(source) {
        Ok(listings) => (listings, None),
        Err(e) => {
            let message = e.report_message();
            warn!("Scrape failed: {}", message);
            (Vec::new(), Some(message))
        }
    };

    let found = listings.len();
    let listings = apply_filters(listings, options);
    info!("Kept {} of {} listings after filters", listings.len(), found);

    ListingsReport::new(
        source.source_url(),
        SearchQuery::new(options.max_price, options.region.clone()),
        listings,
        error,
    )
}
