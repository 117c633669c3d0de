use crate::json_ld;
use crate::models::Listing;
use crate::utils::{build_search_url, resolve_url};
use regex::Regex;
use std::sync::OnceLock;
use tracing::{debug, info};

pub const BASE_URL: &str = "https://www.carsensor.net";
pub const SEARCH_TERMS: [&str; 4] = ["Honda", "N-VAN", "ターボ", "ホワイト"];
pub const MAX_FALLBACK_LISTINGS: usize = 60;

pub fn search_url() -> String {
    build_search_url(BASE_URL, &SEARCH_TERMS)
}

fn detail_link_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"(?i)<a[^>]+href="(?P<url>/usedcar/detail/[^"]+)"[^>]*>(?P<title>[^<]{2,200})</a>"#,
        )
        .unwrap()
    })
}

fn whitespace_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").unwrap())
}

/// Recovers title and detail link from detail-page anchors in raw markup.
pub fn parse_fallback_html(html: &str) -> Vec<Listing> {
    let mut listings = Vec::new();

    for captures in detail_link_regex().captures_iter(html) {
        let title = whitespace_regex()
            .replace_all(&captures["title"], " ")
            .trim()
            .to_string();
        if title.is_empty() {
            continue;
        }

        let detail_url = resolve_url(BASE_URL, &captures["url"]);
        listings.push(Listing::from_link(title, detail_url));

        if listings.len() >= MAX_FALLBACK_LISTINGS {
            debug!("Reached fallback limit of {} listings", MAX_FALLBACK_LISTINGS);
            break;
        }
    }

    listings
}

/// Structured data first; raw anchors only when that yields nothing.
pub fn parse_listings_page(html: &str) -> Vec<Listing> {
    let listings = json_ld::parse_json_ld(html, BASE_URL);
    if !listings.is_empty() {
        debug!("Extracted {} listings from structured data", listings.len());
        return listings;
    }

    info!("No structured listings found, falling back to markup links");
    let listings = parse_fallback_html(html);
    debug!("Extracted {} listings from markup links", listings.len());
    listings
}
