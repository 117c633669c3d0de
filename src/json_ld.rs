//! Extraction of listings from embedded `application/ld+json` blocks.

use crate::error::BlockError;
use crate::models::{Listing, SOURCE_TAG};
use crate::parser::{format_price_label, normalize_price, parse_numeric_price};
use crate::utils::resolve_url;
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::OnceLock;
use tracing::debug;

const JSON_LD_TYPE: &str = "application/ld+json";

fn tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"^<(/?)([A-Za-z][A-Za-z0-9:-]*)((?:[^>"']|"[^"]*"|'[^']*')*)>"#).unwrap()
    })
}

fn type_attr_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)(?:^|\s)type\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#).unwrap()
    })
}

fn script_end_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)</script[\s/>]").unwrap())
}

/// Where the block scanner currently is in the markup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Markup,
    /// Inside a `<script>` element whose body starts at `body_start`.
    Script { structured: bool, body_start: usize },
}

/// Returns the trimmed text of every `<script type="application/ld+json">`
/// element in document order.
///
/// Script bodies are raw text, so tags inside them never open a block.
/// Unmatched end tags are ignored and an unterminated block is dropped.
pub fn extract_json_ld_blocks(html: &str) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut state = ScanState::Markup;
    let mut pos = 0;

    while pos < html.len() {
        match state {
            ScanState::Markup => {
                let Some(offset) = html[pos..].find('<') else {
                    break;
                };
                let lt = pos + offset;
                let rest = &html[lt..];

                if rest.starts_with("<!--") {
                    pos = match rest[4..].find("-->") {
                        Some(end) => lt + 4 + end + 3,
                        None => html.len(),
                    };
                    continue;
                }

                let Some(captures) = tag_regex().captures(rest) else {
                    pos = lt + 1;
                    continue;
                };
                let tag_end = lt + captures[0].len();
                pos = tag_end;

                let is_end_tag = !captures[1].is_empty();
                let attrs = &captures[3];
                if is_end_tag
                    || !captures[2].eq_ignore_ascii_case("script")
                    || attrs.trim_end().ends_with('/')
                {
                    continue;
                }

                state = ScanState::Script {
                    structured: is_json_ld_type(attrs),
                    body_start: tag_end,
                };
            }
            ScanState::Script {
                structured,
                body_start,
            } => {
                let Some(end_tag) = script_end_regex().find_at(html, body_start) else {
                    debug!("Unterminated <script> element, dropping its contents");
                    break;
                };
                if structured {
                    let raw = html[body_start..end_tag.start()].trim();
                    if !raw.is_empty() {
                        blocks.push(raw.to_string());
                    }
                }
                pos = match html[end_tag.start()..].find('>') {
                    Some(gt) => end_tag.start() + gt + 1,
                    None => html.len(),
                };
                state = ScanState::Markup;
            }
        }
    }

    blocks
}

fn is_json_ld_type(attrs: &str) -> bool {
    type_attr_regex()
        .captures(attrs)
        .and_then(|c| c.get(1).or_else(|| c.get(2)).or_else(|| c.get(3)))
        .map(|m| m.as_str().trim().eq_ignore_ascii_case(JSON_LD_TYPE))
        .unwrap_or(false)
}

/// The shapes a structured-data block comes in.
#[derive(Debug)]
enum JsonLdDocument {
    /// An object wrapping an `itemListElement` array.
    ItemList(Vec<Value>),
    Object(Map<String, Value>),
    List(Vec<Value>),
    Scalar,
}

impl From<Value> for JsonLdDocument {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(mut map) => match map.remove("itemListElement") {
                Some(Value::Array(elements)) => JsonLdDocument::ItemList(elements),
                Some(other) => {
                    map.insert("itemListElement".to_string(), other);
                    JsonLdDocument::Object(map)
                }
                None => JsonLdDocument::Object(map),
            },
            Value::Array(items) => JsonLdDocument::List(items),
            _ => JsonLdDocument::Scalar,
        }
    }
}

impl JsonLdDocument {
    /// Flattens the document into the objects that may describe a listing.
    fn into_candidates(self) -> Vec<Map<String, Value>> {
        match self {
            JsonLdDocument::ItemList(elements) => elements
                .into_iter()
                .filter_map(|element| match element {
                    Value::Object(mut map) => match map.remove("item") {
                        Some(Value::Object(item)) => Some(item),
                        Some(_) => None,
                        None => Some(map),
                    },
                    _ => None,
                })
                .collect(),
            JsonLdDocument::Object(map) => vec![map],
            JsonLdDocument::List(items) => items
                .into_iter()
                .filter_map(|item| match item {
                    Value::Object(map) => Some(map),
                    _ => None,
                })
                .collect(),
            JsonLdDocument::Scalar => Vec::new(),
        }
    }
}

/// Parses one block into listings. Fails only when the block is not JSON.
pub fn parse_json_ld_block(raw: &str, base_url: &str) -> Result<Vec<Listing>, BlockError> {
    let value: Value = serde_json::from_str(raw)?;
    Ok(JsonLdDocument::from(value)
        .into_candidates()
        .iter()
        .filter_map(|candidate| listing_from_candidate(candidate, base_url))
        .collect())
}

/// Parses every block, skipping the ones that are not valid JSON.
pub fn parse_json_ld_blocks(blocks: &[String], base_url: &str) -> Vec<Listing> {
    let mut listings = Vec::new();
    for (index, raw) in blocks.iter().enumerate() {
        match parse_json_ld_block(raw, base_url) {
            Ok(parsed) => listings.extend(parsed),
            Err(e) => debug!("Skipping structured-data block {}: {}", index, e),
        }
    }
    listings
}

pub fn parse_json_ld(html: &str, base_url: &str) -> Vec<Listing> {
    let blocks = extract_json_ld_blocks(html);
    debug!("Found {} structured-data blocks", blocks.len());
    parse_json_ld_blocks(&blocks, base_url)
}

fn listing_from_candidate(item: &Map<String, Value>, base_url: &str) -> Option<Listing> {
    let title = item.get("name").map(value_text).unwrap_or_default();
    let title = title.trim();
    if title.is_empty() {
        return None;
    }

    let offers = item.get("offers").and_then(Value::as_object);
    let price = offers
        .and_then(|o| o.get("price"))
        .filter(|p| !p.is_null());
    let currency = offers
        .and_then(|o| o.get("priceCurrency"))
        .filter(|c| is_truthy(c))
        .map(value_text)
        .unwrap_or_default();

    let (price_yen, price_label) = match price {
        Some(price) => {
            let text = value_text(price);
            let yen = parse_numeric_price(price).or_else(|| normalize_price(&text));
            let label = match yen {
                Some(yen) => format_price_label(yen),
                None => format!("{} {}", text, currency).trim().to_string(),
            };
            (yen, label)
        }
        None => (None, String::new()),
    };

    let location = ["areaServed", "address"]
        .iter()
        .filter_map(|key| item.get(*key))
        .find(|value| is_truthy(value))
        .map(location_text)
        .unwrap_or_default();

    let image_url = match item.get("image") {
        Some(Value::Array(images)) => images
            .first()
            .map(|first| resolve_url(base_url, &image_text(first)))
            .unwrap_or_default(),
        Some(image) if is_truthy(image) => resolve_url(base_url, &image_text(image)),
        _ => resolve_url(base_url, ""),
    };

    let detail_href = item
        .get("url")
        .filter(|u| is_truthy(u))
        .map(value_text)
        .unwrap_or_default();
    let detail_url = resolve_url(base_url, &detail_href);

    Some(Listing {
        title: title.to_string(),
        price_yen,
        price_label,
        location,
        image_url,
        detail_url,
        source: SOURCE_TAG.to_string(),
    })
}

/// Flattens an area or address value; mappings join their non-empty parts.
fn location_text(value: &Value) -> String {
    match value {
        Value::Object(parts) => parts
            .values()
            .filter(|part| is_truthy(part))
            .map(value_text)
            .collect::<Vec<_>>()
            .join(" "),
        other => value_text(other),
    }
}

/// Image entries may be plain URLs or `ImageObject`s.
fn image_text(value: &Value) -> String {
    match value {
        Value::Object(image) => image
            .get("url")
            .or_else(|| image.get("contentUrl"))
            .map(value_text)
            .unwrap_or_default(),
        other => value_text(other),
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://www.carsensor.net";

    #[test]
    fn test_extract_blocks_case_insensitive_type() {
        let html = r#"<html><head>
            <SCRIPT TYPE="Application/LD+JSON"> {"name": "a"} </SCRIPT>
            <script type='application/ld+json'>[1]</script>
            <script>var x = 1;</script>
            </head></html>"#;
        assert_eq!(extract_json_ld_blocks(html), vec![r#"{"name": "a"}"#, "[1]"]);
    }

    #[test]
    fn test_extract_blocks_ignores_tags_inside_scripts_and_comments() {
        let html = r#"
            <!-- <script type="application/ld+json">{"name": "commented"}</script> -->
            <script>document.write('<script type="application/ld+json">');</script>
            <script type="application/ld+json">{"description": "<b>bold</b>"}</script>"#;
        assert_eq!(
            extract_json_ld_blocks(html),
            vec![r#"{"description": "<b>bold</b>"}"#]
        );
    }

    #[test]
    fn test_extract_blocks_tolerates_malformed_markup() {
        assert!(extract_json_ld_blocks("</div></script><p <<").is_empty());
        assert!(extract_json_ld_blocks(r#"<script type="application/ld+json">{"name": "x"}"#).is_empty());
        assert!(extract_json_ld_blocks(r#"<script type="application/ld+json">   </script>"#).is_empty());
        assert!(extract_json_ld_blocks(r#"<script type="application/ld+json" />"#).is_empty());
    }

    #[test]
    fn test_extract_blocks_with_quoted_angle_bracket_in_attribute() {
        let html = r#"<script data-note="a>b" type="application/ld+json">{"name":"x"}</script>
            <script data-note='c>d' type='application/ld+json'>{"name":"y"}</script>"#;
        assert_eq!(
            extract_json_ld_blocks(html),
            vec![r#"{"name":"x"}"#, r#"{"name":"y"}"#]
        );
    }

    #[test]
    fn test_extract_blocks_ignores_other_type_attributes() {
        let html = r#"<script data-type="application/ld+json">{}</script>"#;
        assert!(extract_json_ld_blocks(html).is_empty());
    }

    #[test]
    fn test_valid_and_malformed_blocks() {
        let html = r#"
            <script type="application/ld+json">
            {"@type": "ItemList", "itemListElement": [
                {"@type": "ListItem", "item": {"name": "Honda N-VAN +STYLE FUN ターボ", "url": "/usedcar/detail/AU001/index.html"}},
                {"@type": "ListItem", "item": {"name": "Honda N-VAN L", "url": "/usedcar/detail/AU002/index.html"}}
            ]}
            </script>
            <script type="application/ld+json">{"name": "broken",</script>"#;

        let blocks = extract_json_ld_blocks(html);
        assert_eq!(blocks.len(), 2);
        assert!(matches!(parse_json_ld_block(&blocks[1], BASE), Err(BlockError::Json(_))));

        let listings = parse_json_ld(html, BASE);
        let titles: Vec<&str> = listings.iter().map(|l| l.title.as_str()).collect();
        assert_eq!(titles, vec!["Honda N-VAN +STYLE FUN ターボ", "Honda N-VAN L"]);
        assert_eq!(
            listings[0].detail_url,
            "https://www.carsensor.net/usedcar/detail/AU001/index.html"
        );
    }

    #[test]
    fn test_candidate_shapes() {
        let single = r#"{"name": "single"}"#;
        assert_eq!(parse_json_ld_block(single, BASE).unwrap().len(), 1);

        let list = r#"[{"name": "one"}, 42, "text", {"name": "two"}]"#;
        let titles: Vec<String> = parse_json_ld_block(list, BASE)
            .unwrap()
            .into_iter()
            .map(|l| l.title)
            .collect();
        assert_eq!(titles, vec!["one", "two"]);

        let wrapped = r#"{"itemListElement": [{"name": "bare"}, {"item": "https://x"}, 7]}"#;
        let titles: Vec<String> = parse_json_ld_block(wrapped, BASE)
            .unwrap()
            .into_iter()
            .map(|l| l.title)
            .collect();
        assert_eq!(titles, vec!["bare"]);

        let not_a_list = r#"{"name": "self", "itemListElement": "none"}"#;
        assert_eq!(parse_json_ld_block(not_a_list, BASE).unwrap()[0].title, "self");

        assert!(parse_json_ld_block("42", BASE).unwrap().is_empty());
    }

    #[test]
    fn test_whitespace_name_is_dropped() {
        assert!(parse_json_ld_block(r#"{"name": "  "}"#, BASE).unwrap().is_empty());
        assert!(parse_json_ld_block(r#"{"name": null}"#, BASE).unwrap().is_empty());
        assert!(parse_json_ld_block(r#"{"url": "/x"}"#, BASE).unwrap().is_empty());
    }

    #[test]
    fn test_missing_offers() {
        let listings = parse_json_ld_block(r#"{"name": "Honda N-VAN"}"#, BASE).unwrap();
        assert_eq!(listings[0].title, "Honda N-VAN");
        assert_eq!(listings[0].price_yen, None);
        assert_eq!(listings[0].price_label, "");
        assert_eq!(listings[0].source, "carsensor.net");
    }

    #[test]
    fn test_price_handling() {
        let numeric = r#"{"name": "a", "offers": {"price": 1480000, "priceCurrency": "JPY"}}"#;
        let listing = &parse_json_ld_block(numeric, BASE).unwrap()[0];
        assert_eq!(listing.price_yen, Some(1_480_000));
        assert_eq!(listing.price_label, "1,480,000 円");

        let man_yen = r#"{"name": "b", "offers": {"price": "98.5万円"}}"#;
        let listing = &parse_json_ld_block(man_yen, BASE).unwrap()[0];
        assert_eq!(listing.price_yen, Some(985_000));
        assert_eq!(listing.price_label, "985,000 円");

        let unparsed = r#"{"name": "c", "offers": {"price": "応談", "priceCurrency": "JPY"}}"#;
        let listing = &parse_json_ld_block(unparsed, BASE).unwrap()[0];
        assert_eq!(listing.price_yen, None);
        assert_eq!(listing.price_label, "応談 JPY");

        let no_currency = r#"{"name": "d", "offers": {"price": "ASK"}}"#;
        let listing = &parse_json_ld_block(no_currency, BASE).unwrap()[0];
        assert_eq!(listing.price_label, "ASK");

        let offers_not_object = r#"{"name": "e", "offers": [{"price": 1}]}"#;
        let listing = &parse_json_ld_block(offers_not_object, BASE).unwrap()[0];
        assert_eq!(listing.price_yen, None);
        assert_eq!(listing.price_label, "");
    }

    #[test]
    fn test_location_sources() {
        let area = r#"{"name": "a", "areaServed": "東京都 渋谷区"}"#;
        assert_eq!(parse_json_ld_block(area, BASE).unwrap()[0].location, "東京都 渋谷区");

        let address = r#"{"name": "b", "areaServed": "", "address": {
            "@type": "PostalAddress", "addressRegion": "Tokyo-to", "addressLocality": "Shibuya-ku", "postalCode": ""}}"#;
        assert_eq!(
            parse_json_ld_block(address, BASE).unwrap()[0].location,
            "PostalAddress Tokyo-to Shibuya-ku"
        );

        let none = r#"{"name": "c"}"#;
        assert_eq!(parse_json_ld_block(none, BASE).unwrap()[0].location, "");
    }

    #[test]
    fn test_image_and_detail_urls() {
        let item = r#"{"name": "a",
            "image": ["/img/1.jpg", "/img/2.jpg"],
            "url": "https://www.carsensor.net/usedcar/detail/AU9/index.html"}"#;
        let listing = &parse_json_ld_block(item, BASE).unwrap()[0];
        assert_eq!(listing.image_url, "https://www.carsensor.net/img/1.jpg");
        assert_eq!(
            listing.detail_url,
            "https://www.carsensor.net/usedcar/detail/AU9/index.html"
        );

        let empty_list = r#"{"name": "b", "image": []}"#;
        assert_eq!(parse_json_ld_block(empty_list, BASE).unwrap()[0].image_url, "");

        let image_object = r#"{"name": "c", "image": {"@type": "ImageObject", "url": "//ccsrpcma.carsensor.net/a.jpg"}}"#;
        assert_eq!(
            parse_json_ld_block(image_object, BASE).unwrap()[0].image_url,
            "https://ccsrpcma.carsensor.net/a.jpg"
        );
    }

    #[test]
    fn test_unresolvable_url_is_empty() {
        let listing = &parse_json_ld_block(r#"{"name": "a", "url": "http://[bad"}"#, BASE).unwrap()[0];
        assert_eq!(listing.detail_url, "");
    }

    #[test]
    fn test_missing_url_resolves_to_base() {
        let listing = &parse_json_ld_block(r#"{"name": "a"}"#, BASE).unwrap()[0];
        assert_eq!(listing.detail_url, "https://www.carsensor.net/");
        assert_eq!(listing.image_url, "https://www.carsensor.net/");
    }
}
