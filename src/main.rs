use anyhow::Result;
use carfinder::common_scraper::{run_scraper, PageSource, ScrapingOptions};
use carfinder::scrapers::{FilePageSource, HttpPageSource};
use carfinder::{carsensor_scraper, debug, utils};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(author, version, about = "Carfinder - Honda N-VAN turbo (white) listings from carsensor.net")]
struct Args {
    /// Maximum price in JPY; listings without a known price are kept
    #[clap(long, allow_negative_numbers = true)]
    max_price: Option<i64>,

    /// Keep only listings whose location contains this keyword (case-insensitive)
    #[clap(long)]
    region: Option<String>,

    /// Path to output JSON file
    #[clap(long, default_value = "data/listings.json")]
    out: PathBuf,

    /// Parse a saved search results page instead of fetching it
    #[clap(long)]
    html: Option<PathBuf>,

    /// Enable debug output
    #[clap(short, long)]
    debug: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    debug::init_logging(args.debug);

    let options = ScrapingOptions {
        max_price: args.max_price,
        region: args.region,
    };

    let source: Box<dyn PageSource> = match args.html {
        Some(path) => Box::new(FilePageSource {
            path,
            source_url: carsensor_scraper::search_url(),
        }),
        None => Box::new(HttpPageSource::default()),
    };

    let report = run_scraper(source.as_ref(), &options);
    utils::save_report_to_json(&report, &args.out)?;

    if let Some(error) = &report.error {
        println!("Scrape failed: {}", error);
    }
    println!("Saved {} listings to {}", report.count, args.out.display());

    Ok(())
}
