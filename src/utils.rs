use crate::models::ListingsReport;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use url::Url;

/// Resolves `href` against `base`. Unresolvable input yields an empty string,
/// so a non-empty result is always absolute.
pub fn resolve_url(base: &str, href: &str) -> String {
    match Url::parse(base).and_then(|base| base.join(href)) {
        Ok(url) => url.to_string(),
        Err(_) => String::new(),
    }
}

/// Builds a freeword search URL: terms are percent-encoded and joined with `+`.
pub fn build_search_url(base: &str, terms: &[&str]) -> String {
    let freeword = terms
        .iter()
        .map(|term| urlencoding::encode(term).into_owned())
        .collect::<Vec<_>>()
        .join("+");
    format!("{}/usedcar/freeword/{}/index.html", base.trim_end_matches('/'), freeword)
}

pub fn save_report_to_json(report: &ListingsReport, output_path: &Path) -> Result<()> {
    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .context(format!("Failed to create output directory: {}", parent.display()))?;
        }
    }

    let json = serde_json::to_string_pretty(report).context("Failed to serialize report")?;
    fs::write(output_path, json)
        .context(format!("Failed to write output file: {}", output_path.display()))?;

    Ok(())
}
