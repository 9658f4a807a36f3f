//! Source adapter contract + board adapter implementations.
//!
//! An adapter turns `(query, location, radius)` into raw listing records for
//! one board, or fails on its own without taking the rest of the search down.
//! "No results" is an empty list, never an error. Live boards pace their own
//! requests through a private [`HttpFetcher`]; the fixture-backed adapters
//! stand in for boards whose scraping lives outside this workspace.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use async_trait::async_trait;
use jobsweep_core::RawRecord;
use jobsweep_fetch::{FetchError, HttpClientConfig, HttpFetcher};
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;

pub const CRATE_NAME: &str = "jobsweep-adapters";

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("{0}")]
    Message(String),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

/// One board's search surface. Implementations are stateless with respect to
/// the pipeline; whatever rate-limit or session state they hold is private.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn source_id(&self) -> &str;

    /// Fetch raw listings matching the query. Returns an empty list when the
    /// board has nothing; errors only on irrecoverable failures (network,
    /// unreadable payload), which the orchestrator absorbs per source.
    async fn search(
        &self,
        query: &str,
        location: &str,
        radius: Option<u32>,
    ) -> Result<Vec<RawRecord>, AdapterError>;
}

/// Where a board's listings come from for this run.
#[derive(Debug, Clone)]
pub enum BoardEndpoint {
    /// Local captured listing document (HTML or JSON depending on the board).
    Fixture(PathBuf),
    /// Live JSON endpoint, fetched with the board's own politeness settings.
    Http {
        listing_url: String,
        http: HttpClientConfig,
    },
}

/// Case-insensitive query match over title and description. A blank query
/// matches everything, mirroring a board search with no terms.
pub fn record_matches_query(record: &RawRecord, query: &str) -> bool {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return true;
    }
    if record.title.to_lowercase().contains(&query) {
        return true;
    }
    record
        .description
        .as_deref()
        .is_some_and(|d| d.to_lowercase().contains(&query))
}

fn parse_selector(selector: &str) -> Result<Selector, AdapterError> {
    Selector::parse(selector).map_err(|e| AdapterError::Message(e.to_string()))
}

fn text_or_none(value: String) -> Option<String> {
    let trimmed = value.trim().to_string();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

fn first_text(row: ElementRef<'_>, selector: &Selector) -> Option<String> {
    row.select(selector)
        .next()
        .and_then(|n| text_or_none(n.text().collect::<String>()))
}

fn first_attr(row: ElementRef<'_>, selector: &Selector, attr: &str) -> Option<String> {
    row.select(selector)
        .next()
        .and_then(|n| n.value().attr(attr))
        .and_then(|s| text_or_none(s.to_string()))
}

/// Parse a board listing page into raw records. One `.listing` element per
/// record; missing fields come back empty and are the normalizer's problem.
pub fn parse_listing_html(html: &str) -> Result<Vec<RawRecord>, AdapterError> {
    let document = Html::parse_document(html);
    let row_sel = parse_selector(".listing")?;
    let title_sel = parse_selector(".title")?;
    let company_sel = parse_selector(".company")?;
    let location_sel = parse_selector(".location")?;
    let salary_sel = parse_selector(".salary")?;
    let date_sel = parse_selector(".posted-date")?;
    let link_sel = parse_selector("a[href]")?;
    let description_sel = parse_selector(".description")?;

    let records = document
        .select(&row_sel)
        .map(|row| RawRecord {
            title: first_text(row, &title_sel).unwrap_or_default(),
            company: first_text(row, &company_sel).unwrap_or_default(),
            location: first_text(row, &location_sel).unwrap_or_default(),
            description: first_text(row, &description_sel),
            url: first_attr(row, &link_sel, "href"),
            kind: row
                .value()
                .attr("data-kind")
                .map(str::to_string)
                .unwrap_or_default(),
            salary: first_text(row, &salary_sel),
            posted_date: first_text(row, &date_sel),
        })
        .collect();

    Ok(records)
}

/// Parse a JSON listing payload: a top-level array of raw records.
pub fn parse_listing_json(payload: &[u8]) -> Result<Vec<RawRecord>, AdapterError> {
    serde_json::from_slice(payload)
        .map_err(|e| AdapterError::Message(format!("invalid listing JSON: {e}")))
}

fn read_fixture(path: &Path) -> Result<Vec<u8>, AdapterError> {
    Ok(fs::read(path).with_context(|| format!("reading fixture {}", path.display()))?)
}

/// Board whose captured listing page is an HTML document.
pub struct HtmlBoardAdapter {
    source_id: String,
    fixture_path: PathBuf,
}

#[async_trait]
impl SourceAdapter for HtmlBoardAdapter {
    fn source_id(&self) -> &str {
        &self.source_id
    }

    async fn search(
        &self,
        query: &str,
        _location: &str,
        _radius: Option<u32>,
    ) -> Result<Vec<RawRecord>, AdapterError> {
        let bytes = read_fixture(&self.fixture_path)?;
        let html = String::from_utf8_lossy(&bytes);
        let records = parse_listing_html(&html)?;
        Ok(records
            .into_iter()
            .filter(|r| record_matches_query(r, query))
            .collect())
    }
}

/// Board whose captured listing payload is a JSON array.
pub struct JsonBoardAdapter {
    source_id: String,
    fixture_path: PathBuf,
}

#[async_trait]
impl SourceAdapter for JsonBoardAdapter {
    fn source_id(&self) -> &str {
        &self.source_id
    }

    async fn search(
        &self,
        query: &str,
        _location: &str,
        _radius: Option<u32>,
    ) -> Result<Vec<RawRecord>, AdapterError> {
        let bytes = read_fixture(&self.fixture_path)?;
        let records = parse_listing_json(&bytes)?;
        Ok(records
            .into_iter()
            .filter(|r| record_matches_query(r, query))
            .collect())
    }
}

/// Board exposing a live JSON listing endpoint. The fetcher carries this
/// board's timeout, retry, and throttle settings; siblings never share it.
pub struct HttpJsonBoardAdapter {
    source_id: String,
    listing_url: String,
    fetcher: HttpFetcher,
}

impl HttpJsonBoardAdapter {
    pub fn new(
        source_id: impl Into<String>,
        listing_url: impl Into<String>,
        http: HttpClientConfig,
    ) -> anyhow::Result<Self> {
        let source_id = source_id.into();
        let fetcher = HttpFetcher::new(source_id.clone(), http)?;
        Ok(Self {
            source_id,
            listing_url: listing_url.into(),
            fetcher,
        })
    }
}

#[async_trait]
impl SourceAdapter for HttpJsonBoardAdapter {
    fn source_id(&self) -> &str {
        &self.source_id
    }

    async fn search(
        &self,
        query: &str,
        location: &str,
        radius: Option<u32>,
    ) -> Result<Vec<RawRecord>, AdapterError> {
        let mut url = format!(
            "{}?q={}&l={}",
            self.listing_url,
            urlencode(query),
            urlencode(location)
        );
        if let Some(radius) = radius {
            url.push_str(&format!("&radius={radius}"));
        }
        let response = self.fetcher.fetch_bytes(&url).await?;
        let records = parse_listing_json(&response.body)?;
        Ok(records
            .into_iter()
            .filter(|r| record_matches_query(r, query))
            .collect())
    }
}

// Minimal percent-encoding for query/location values; boards here only need
// the reserved characters that actually occur in search terms.
fn urlencode(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            ' ' => out.push('+'),
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' | '.' | '~' => out.push(ch),
            _ => {
                let mut buf = [0u8; 4];
                for byte in ch.encode_utf8(&mut buf).as_bytes() {
                    out.push_str(&format!("%{byte:02X}"));
                }
            }
        }
    }
    out
}

/// Build the adapter registered for a board id, bound to the given endpoint.
/// HTML boards only support fixtures here; their live scraping lives outside
/// this workspace.
pub fn adapter_for_source(
    source_id: &str,
    endpoint: BoardEndpoint,
) -> anyhow::Result<Box<dyn SourceAdapter>> {
    match source_id {
        "jobbank" | "kijiji" => match endpoint {
            BoardEndpoint::Fixture(fixture_path) => Ok(Box::new(HtmlBoardAdapter {
                source_id: source_id.to_string(),
                fixture_path,
            })),
            BoardEndpoint::Http { .. } => {
                anyhow::bail!("board {source_id} has no live endpoint in this workspace")
            }
        },
        "craigslist" | "indeed" => match endpoint {
            BoardEndpoint::Fixture(fixture_path) => Ok(Box::new(JsonBoardAdapter {
                source_id: source_id.to_string(),
                fixture_path,
            })),
            BoardEndpoint::Http { listing_url, http } => Ok(Box::new(
                HttpJsonBoardAdapter::new(source_id, listing_url, http)?,
            )),
        },
        other => anyhow::bail!("no adapter registered for {other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING_HTML: &str = r#"
        <ul class="listings">
          <li class="listing" data-kind="job">
            <h3 class="title">Graphic Designer</h3>
            <span class="company">Maple Print Co</span>
            <span class="location">Brampton, ON</span>
            <span class="salary">$22 - $26 per hour</span>
            <time class="posted-date">2026-08-05</time>
            <a href="https://example.org/jobs/101">View</a>
            <p class="description">Print and digital design for retail clients.</p>
          </li>
          <li class="listing" data-kind="gig">
            <h3 class="title">Weekend Mover</h3>
            <span class="company">TwoGuys Moving</span>
            <span class="location">Mississauga, ON</span>
            <a href="https://example.org/gigs/7">View</a>
          </li>
        </ul>
    "#;

    #[test]
    fn html_listing_parses_rows_and_optional_fields() {
        let records = parse_listing_html(LISTING_HTML).unwrap();
        assert_eq!(records.len(), 2);

        let first = &records[0];
        assert_eq!(first.title, "Graphic Designer");
        assert_eq!(first.company, "Maple Print Co");
        assert_eq!(first.location, "Brampton, ON");
        assert_eq!(first.kind, "job");
        assert_eq!(first.salary.as_deref(), Some("$22 - $26 per hour"));
        assert_eq!(first.posted_date.as_deref(), Some("2026-08-05"));
        assert_eq!(first.url.as_deref(), Some("https://example.org/jobs/101"));

        let second = &records[1];
        assert_eq!(second.kind, "gig");
        assert_eq!(second.salary, None);
        assert_eq!(second.description, None);
    }

    #[test]
    fn json_listing_tolerates_missing_optional_fields() {
        let payload = br#"[
            {"title": "Flyer Distributor", "company": "AdWalk", "location": "Toronto, ON",
             "url": "https://example.org/gigs/9", "kind": "gig"},
            {"title": "Junior Accountant", "company": "Ledger & Sons", "location": "Vaughan, ON",
             "url": "https://example.org/jobs/55", "kind": "job",
             "salary": "$50,000 - $60,000 per year", "posted_date": "2026-08-01"}
        ]"#;
        let records = parse_listing_json(payload).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].salary, None);
        assert_eq!(records[1].posted_date.as_deref(), Some("2026-08-01"));
    }

    #[test]
    fn query_match_is_case_insensitive_over_title_and_description() {
        let records = parse_listing_html(LISTING_HTML).unwrap();
        assert!(record_matches_query(&records[0], "graphic designer"));
        assert!(record_matches_query(&records[0], "RETAIL"));
        assert!(!record_matches_query(&records[0], "plumber"));
        assert!(record_matches_query(&records[1], ""));
    }

    #[test]
    fn registry_rejects_unknown_boards_and_live_html() {
        assert!(adapter_for_source("monster", BoardEndpoint::Fixture(PathBuf::new())).is_err());
        assert!(adapter_for_source(
            "jobbank",
            BoardEndpoint::Http {
                listing_url: "https://example.org/api".into(),
                http: HttpClientConfig::default(),
            },
        )
        .is_err());
        assert!(adapter_for_source("kijiji", BoardEndpoint::Fixture(PathBuf::from("x.html"))).is_ok());
        assert!(adapter_for_source("craigslist", BoardEndpoint::Fixture(PathBuf::from("x.json"))).is_ok());
    }

    #[tokio::test]
    async fn missing_fixture_is_an_adapter_error_not_a_panic() {
        let adapter = adapter_for_source(
            "jobbank",
            BoardEndpoint::Fixture(PathBuf::from("/nonexistent/listing.html")),
        )
        .unwrap();
        let result = adapter.search("designer", "Brampton", None).await;
        assert!(result.is_err());
    }

    #[test]
    fn urlencode_covers_spaces_and_reserved_chars() {
        assert_eq!(urlencode("graphic designer"), "graphic+designer");
        assert_eq!(urlencode("c++ dev"), "c%2B%2B+dev");
        assert_eq!(urlencode("Brampton"), "Brampton");
    }
}
