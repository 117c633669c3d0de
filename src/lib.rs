pub mod carsensor_scraper;
pub mod common_scraper;
pub mod debug;
pub mod error;
pub mod json_ld;
pub mod models;
pub mod parser;
pub mod scraper;
pub mod scrapers;
pub mod utils;
