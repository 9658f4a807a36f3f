//! Search pipeline: fan-out to board adapters, normalize, dedupe, filter.

use std::collections::{BTreeMap, HashSet};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use anyhow::{Context, Result};
use arrow_array::{RecordBatch, StringArray, UInt32Array};
use arrow_schema::{DataType, Field as ArrowField, Schema};
use chrono::{DateTime, NaiveDate, Utc};
use jobsweep_adapters::{adapter_for_source, BoardEndpoint, SourceAdapter};
use jobsweep_core::{JobRecord, JobType, RawRecord, SalaryPeriod, SalaryRange};
use jobsweep_fetch::HttpClientConfig;
use parquet::arrow::ArrowWriter;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub const CRATE_NAME: &str = "jobsweep-search";

#[derive(Debug, Clone, Deserialize)]
pub struct SourceRegistry {
    pub sources: Vec<SourceConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub source_id: String,
    pub display_name: String,
    pub enabled: bool,
    /// "fixture" reads a captured listing document; "http" hits a live JSON
    /// endpoint with the board's own politeness settings.
    pub mode: String,
    #[serde(default)]
    pub fixture: Option<String>,
    #[serde(default)]
    pub listing_url: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub workspace_root: PathBuf,
    pub fixtures_dir: PathBuf,
    pub user_agent: String,
    pub http_timeout_secs: u64,
}

impl SearchConfig {
    pub fn from_env() -> Self {
        Self {
            workspace_root: PathBuf::from("."),
            fixtures_dir: std::env::var("JOBSWEEP_FIXTURES_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./fixtures")),
            user_agent: std::env::var("JOBSWEEP_USER_AGENT")
                .unwrap_or_else(|_| "jobsweep-bot/0.1".to_string()),
            http_timeout_secs: std::env::var("JOBSWEEP_HTTP_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(20),
        }
    }

    pub fn sources_path(&self) -> PathBuf {
        self.workspace_root.join("sources.yaml")
    }
}

pub fn load_source_registry(path: &Path) -> Result<SourceRegistry> {
    let text =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_yaml::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

/// Per-search filter switches. Everything defaults to off; each filter only
/// runs when its option was requested.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    /// Passed through to the boards, not used for filtering.
    pub radius: Option<u32>,
    pub gigs_only: bool,
    pub jobs_only: bool,
    pub new_only: bool,
    pub remote_only: bool,
    pub on_site_only: bool,
    pub source: Option<String>,
    pub min_radius: Option<u32>,
    pub max_radius: Option<u32>,
    pub min_salary: Option<f64>,
    pub max_salary: Option<f64>,
    /// Period the salary bounds are expressed in.
    pub salary_period: SalaryPeriod,
    /// Secondary query terms (e.g. resume-derived synonyms) swept in the
    /// same aggregation before deduplication.
    pub expanded_terms: Vec<String>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            radius: None,
            gigs_only: false,
            jobs_only: false,
            new_only: false,
            remote_only: false,
            on_site_only: false,
            source: None,
            min_radius: None,
            max_radius: None,
            min_salary: None,
            max_salary: None,
            salary_period: SalaryPeriod::Annual,
            expanded_terms: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchRunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub enabled_sources: usize,
    pub query_terms: usize,
    pub raw_records: usize,
    pub dropped_records: usize,
    pub duplicates_removed: usize,
    pub returned: usize,
}

/// Drives one search end-to-end across every enabled board.
pub struct JobSearch {
    adapters: Vec<Arc<dyn SourceAdapter>>,
    distance_table: DistanceTable,
}

impl JobSearch {
    pub fn new(adapters: Vec<Arc<dyn SourceAdapter>>, distance_table: DistanceTable) -> Self {
        Self {
            adapters,
            distance_table,
        }
    }

    /// Build the search from the YAML source registry, skipping disabled
    /// boards. An unknown or misconfigured source is a configuration error,
    /// not an operational one, so it fails construction.
    pub fn from_registry(config: &SearchConfig, registry: &SourceRegistry) -> Result<Self> {
        let mut adapters: Vec<Arc<dyn SourceAdapter>> = Vec::new();
        for source in registry.sources.iter().filter(|s| s.enabled) {
            let endpoint = match source.mode.as_str() {
                "http" => BoardEndpoint::Http {
                    listing_url: source.listing_url.clone().with_context(|| {
                        format!("source {} is http mode but has no listing_url", source.source_id)
                    })?,
                    http: HttpClientConfig {
                        timeout: Duration::from_secs(config.http_timeout_secs),
                        user_agent: Some(config.user_agent.clone()),
                        ..Default::default()
                    },
                },
                _ => {
                    let fixture = source.fixture.clone().with_context(|| {
                        format!("source {} is fixture mode but has no fixture path", source.source_id)
                    })?;
                    BoardEndpoint::Fixture(config.fixtures_dir.join(fixture))
                }
            };
            let adapter = adapter_for_source(&source.source_id, endpoint)
                .with_context(|| format!("building adapter for {}", source.source_id))?;
            adapters.push(Arc::from(adapter));
        }
        Ok(Self::new(adapters, DistanceTable::curated()))
    }

    pub fn enabled_sources(&self) -> Vec<String> {
        self.adapters
            .iter()
            .map(|a| a.source_id().to_string())
            .collect()
    }

    /// Primary entry point. Always returns a list; every operational failure
    /// (a board erroring, all boards down, zero boards enabled) degrades the
    /// result set instead of surfacing.
    pub async fn search(
        &self,
        query: &str,
        location: &str,
        options: &SearchOptions,
    ) -> Vec<JobRecord> {
        self.search_with_summary(query, location, options).await.0
    }

    pub async fn search_with_summary(
        &self,
        query: &str,
        location: &str,
        options: &SearchOptions,
    ) -> (Vec<JobRecord>, SearchRunSummary) {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        info!(%run_id, query, location, "starting board search");

        let mut terms: Vec<&str> = vec![query];
        terms.extend(options.expanded_terms.iter().map(String::as_str));

        // One aggregation across all terms; dedup runs once over the union.
        let mut tagged: Vec<(String, RawRecord)> = Vec::new();
        for term in &terms {
            self.fan_out(term, location, options.radius, &mut tagged)
                .await;
        }

        let raw_records = tagged.len();
        let normalized = normalize_records(tagged);
        let dropped_records = raw_records - normalized.len();

        let before_dedup = normalized.len();
        let unique = dedupe(normalized);
        let duplicates_removed = before_dedup - unique.len();

        let results = apply_filters(unique, location, options, &self.distance_table);

        let mut source_counts: BTreeMap<&str, usize> = BTreeMap::new();
        for record in &results {
            *source_counts.entry(record.source.as_str()).or_default() += 1;
        }
        for (source, count) in &source_counts {
            info!(%run_id, source = *source, count = *count, "unique results from source");
        }

        let summary = SearchRunSummary {
            run_id,
            started_at,
            finished_at: Utc::now(),
            enabled_sources: self.adapters.len(),
            query_terms: terms.len(),
            raw_records,
            dropped_records,
            duplicates_removed,
            returned: results.len(),
        };
        info!(
            %run_id,
            raw = summary.raw_records,
            dropped = summary.dropped_records,
            duplicates = summary.duplicates_removed,
            returned = summary.returned,
            "search complete"
        );
        (results, summary)
    }

    /// Dispatch one task per enabled board and join them all. A board that
    /// errors or panics contributes nothing and never aborts its siblings;
    /// cross-board ordering is completion order and deliberately unspecified.
    async fn fan_out(
        &self,
        term: &str,
        location: &str,
        radius: Option<u32>,
        out: &mut Vec<(String, RawRecord)>,
    ) {
        let mut join_set = JoinSet::new();
        for adapter in &self.adapters {
            let adapter = Arc::clone(adapter);
            let term = term.to_string();
            let location = location.to_string();
            join_set.spawn(async move {
                let outcome = adapter.search(&term, &location, radius).await;
                (adapter.source_id().to_string(), outcome)
            });
        }

        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((source, Ok(records))) => {
                    debug!(%source, count = records.len(), "board returned listings");
                    // The source tag comes from the adapter, never from the record.
                    out.extend(records.into_iter().map(|r| (source.clone(), r)));
                }
                Ok((source, Err(err))) => {
                    warn!(%source, error = %err, "board search failed; continuing without it");
                }
                Err(join_err) => {
                    warn!(error = %join_err, "board task aborted; continuing without it");
                }
            }
        }
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Canonicalize tagged raw records into `JobRecord`s. A record missing any
/// required field, or with an unrecognized kind, is dropped and logged; a
/// dropped record is not an error.
pub fn normalize_records(tagged: Vec<(String, RawRecord)>) -> Vec<JobRecord> {
    let mut records = Vec::with_capacity(tagged.len());
    for (source, raw) in tagged {
        if let Some(record) = normalize_record(source, raw) {
            records.push(record);
        }
    }
    records
}

fn normalize_record(source: String, raw: RawRecord) -> Option<JobRecord> {
    let title = collapse_whitespace(&raw.title);
    let company = collapse_whitespace(&raw.company);
    let location = collapse_whitespace(&raw.location);
    let url = raw
        .url
        .as_deref()
        .map(collapse_whitespace)
        .filter(|u| !u.is_empty());
    let job_type = JobType::parse(&raw.kind);

    let (Some(url), Some(job_type)) = (url, job_type) else {
        debug!(%source, title = %title, "dropping raw record without url or recognized kind");
        return None;
    };
    if title.is_empty() || company.is_empty() || location.is_empty() {
        debug!(%source, url = %url, "dropping raw record with missing required fields");
        return None;
    }

    // Unparseable dates survive as None; only the freshness filter cares.
    let posted_date = raw
        .posted_date
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok());

    Some(JobRecord {
        title,
        company,
        location,
        description: raw
            .description
            .as_deref()
            .map(collapse_whitespace)
            .filter(|d| !d.is_empty()),
        url,
        job_type,
        salary: raw
            .salary
            .as_deref()
            .map(collapse_whitespace)
            .filter(|s| !s.is_empty()),
        posted_date,
        source,
        match_score: None,
    })
}

/// Collapse records describing the same listing. Order-preserving and
/// first-seen-wins: the earliest record for a given identity survives.
/// Pairwise against all previously accepted records, O(n²) over a few
/// hundred records per search.
pub fn dedupe(records: Vec<JobRecord>) -> Vec<JobRecord> {
    let mut seen_urls: HashSet<String> = HashSet::new();
    let mut unique: Vec<JobRecord> = Vec::with_capacity(records.len());
    for record in records {
        if seen_urls.contains(&record.url) {
            continue;
        }
        if unique.iter().any(|kept| is_duplicate(&record, kept)) {
            continue;
        }
        seen_urls.insert(record.url.clone());
        unique.push(record);
    }
    unique
}

// Identical URL, or similar title at a similar company. The metric is
// exact/substring containment only; it knowingly over-merges short generic
// titles and under-merges synonymous ones.
fn is_duplicate(a: &JobRecord, b: &JobRecord) -> bool {
    if a.url == b.url {
        return true;
    }
    let title_a = a.title.to_lowercase();
    let title_b = b.title.to_lowercase();
    let titles_similar =
        title_a == title_b || title_a.contains(&title_b) || title_b.contains(&title_a);
    if !titles_similar {
        return false;
    }
    let company_a = a.company.to_lowercase();
    let company_b = b.company.to_lowercase();
    company_a == company_b || company_a.contains(&company_b) || company_b.contains(&company_a)
}

pub const REMOTE_KEYWORDS: [&str; 11] = [
    "remote",
    "work from home",
    "wfh",
    "telecommute",
    "telework",
    "work remotely",
    "home office",
    "virtual",
    "anywhere",
    "distributed",
    "location independent",
];

static REMOTE_LOCATION_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)\bremote\b",
        r"(?i)\banywhere\b",
        // A location of just "Canada" usually means remote.
        r"(?i)\bcanada\b$",
        r"(?i)\bhome\b",
        r"(?i)\bvirtual\b",
    ]
    .into_iter()
    .map(|p| Regex::new(p).expect("static location pattern compiles"))
    .collect()
});

/// Heuristic remote-work test over title, then location, then description.
/// First field match wins.
pub fn is_remote(record: &JobRecord) -> bool {
    let title = record.title.to_lowercase();
    if REMOTE_KEYWORDS.iter().any(|k| title.contains(k)) {
        return true;
    }

    let location = record.location.to_lowercase();
    if REMOTE_KEYWORDS.iter().any(|k| location.contains(k)) {
        return true;
    }
    if REMOTE_LOCATION_PATTERNS
        .iter()
        .any(|p| p.is_match(&location))
    {
        return true;
    }

    if let Some(description) = &record.description {
        let description = description.to_lowercase();
        if REMOTE_KEYWORDS.iter().any(|k| description.contains(k)) {
            return true;
        }
    }
    false
}

/// Apply every requested filter in order; each acts as a set intersection
/// over the input.
pub fn apply_filters(
    records: Vec<JobRecord>,
    base_location: &str,
    options: &SearchOptions,
    table: &DistanceTable,
) -> Vec<JobRecord> {
    let mut filtered = filter_by_type(records, options.gigs_only, options.jobs_only);
    filtered = filter_remote(filtered, options.remote_only, options.on_site_only);
    if let Some(source) = &options.source {
        filtered = filter_by_source(filtered, source);
    }
    if options.new_only {
        filtered = filter_new_only(filtered, Utc::now().date_naive());
    }
    if !base_location.trim().is_empty()
        && (options.min_radius.is_some() || options.max_radius.is_some())
    {
        filtered = filter_by_radius(
            filtered,
            base_location,
            options.min_radius,
            options.max_radius,
            table,
        );
    }
    if options.min_salary.is_some() || options.max_salary.is_some() {
        filtered = filter_by_salary(
            filtered,
            options.min_salary,
            options.max_salary,
            options.salary_period,
        );
    }
    filtered
}

/// `gigs_only` wins when both type flags are set.
pub fn filter_by_type(records: Vec<JobRecord>, gigs_only: bool, jobs_only: bool) -> Vec<JobRecord> {
    if gigs_only {
        records
            .into_iter()
            .filter(|r| r.job_type == JobType::Gig)
            .collect()
    } else if jobs_only {
        records
            .into_iter()
            .filter(|r| r.job_type == JobType::Job)
            .collect()
    } else {
        records
    }
}

/// `remote_only` wins when both work-arrangement flags are set.
pub fn filter_remote(
    records: Vec<JobRecord>,
    remote_only: bool,
    on_site_only: bool,
) -> Vec<JobRecord> {
    if remote_only {
        records.into_iter().filter(|r| is_remote(r)).collect()
    } else if on_site_only {
        records.into_iter().filter(|r| !is_remote(r)).collect()
    } else {
        records
    }
}

pub fn filter_by_source(records: Vec<JobRecord>, source: &str) -> Vec<JobRecord> {
    records
        .into_iter()
        .filter(|r| r.source.eq_ignore_ascii_case(source))
        .collect()
}

/// Keep records posted within the last day of `today`. Records without a
/// parseable posted date are excluded while this filter is active.
pub fn filter_new_only(records: Vec<JobRecord>, today: NaiveDate) -> Vec<JobRecord> {
    let cutoff = today - chrono::Duration::days(1);
    records
        .into_iter()
        .filter(|r| r.posted_date.is_some_and(|d| d >= cutoff))
        .collect()
}

/// Static, hand-curated city distance data. Asymmetric and incomplete on
/// purpose: entries exist exactly as curated, never mirrored or inferred,
/// and missing pairs fall through to the radius filter's inclusive
/// fallbacks.
#[derive(Debug, Clone, Default)]
pub struct DistanceTable {
    entries: BTreeMap<String, BTreeMap<String, u32>>,
}

impl DistanceTable {
    pub fn curated() -> Self {
        let brampton: BTreeMap<String, u32> = [
            // Core GTA
            ("mississauga", 15),
            ("toronto", 30),
            ("vaughan", 25),
            ("woodbridge", 20),
            ("etobicoke", 20),
            ("markham", 35),
            ("richmond hill", 35),
            ("oakville", 35),
            ("milton", 30),
            ("scarborough", 45),
            ("north york", 30),
            ("york", 25),
            ("malton", 10),
            ("caledon", 20),
            ("georgetown", 35),
            ("bolton", 15),
            ("concord", 30),
            ("thornhill", 35),
            // Extended GTA
            ("ajax", 55),
            ("pickering", 50),
            ("oshawa", 65),
            ("whitby", 60),
            ("burlington", 40),
            ("hamilton", 55),
            ("newmarket", 45),
            ("aurora", 40),
            ("king city", 35),
            ("stouffville", 50),
        ]
        .into_iter()
        .map(|(city, km)| (city.to_string(), km))
        .collect();

        let mut entries = BTreeMap::new();
        entries.insert("brampton".to_string(), brampton);
        Self { entries }
    }

    pub fn with_entry(
        mut self,
        base_city: &str,
        nearby: impl IntoIterator<Item = (&'static str, u32)>,
    ) -> Self {
        let map = self.entries.entry(base_city.to_lowercase()).or_default();
        for (city, km) in nearby {
            map.insert(city.to_lowercase(), km);
        }
        self
    }

    pub fn distances_from(&self, base_city: &str) -> Option<&BTreeMap<String, u32>> {
        self.entries.get(base_city)
    }
}

// Fallback vocabularies for locations the distance table cannot place.
const RADIUS_REMOTE_HINTS: [&str; 4] = ["remote", "work from home", "wfh", "virtual"];
const RADIUS_REGIONAL_HINTS: [&str; 4] = ["ontario", "canada", "gta", "greater toronto"];

/// Approximate proximity filter. Normalizes the base location to its primary
/// city token, checks the curated distance table, then applies inclusive
/// fallback heuristics. Biases toward over-inclusion: an ambiguous listing
/// stays in the result set.
pub fn filter_by_radius(
    records: Vec<JobRecord>,
    base_location: &str,
    min_radius: Option<u32>,
    max_radius: Option<u32>,
    table: &DistanceTable,
) -> Vec<JobRecord> {
    let base_city = base_location
        .split(',')
        .next()
        .unwrap_or("")
        .trim()
        .to_lowercase();
    let distances = table.distances_from(&base_city);

    let total = records.len();
    let filtered: Vec<JobRecord> = records
        .into_iter()
        .filter(|record| {
            let location = record.location.to_lowercase();

            if location.contains(&base_city) {
                return true;
            }

            if let Some(distances) = distances {
                for (city, km) in distances {
                    if !location.contains(city.as_str()) {
                        continue;
                    }
                    if min_radius.is_some_and(|min| *km < min) {
                        continue;
                    }
                    if max_radius.is_some_and(|max| *km > max) {
                        continue;
                    }
                    return true;
                }
            }

            if RADIUS_REMOTE_HINTS.iter().any(|k| location.contains(k)) {
                return true;
            }
            if RADIUS_REGIONAL_HINTS.iter().any(|k| location.contains(k)) {
                return true;
            }
            // A bare "Toronto" listing is within reach of most GTA searches.
            if location.contains("toronto") && max_radius.map_or(true, |max| max >= 25) {
                return true;
            }
            // Many boards leave the city vague; keep short or empty locations.
            location.split_whitespace().count() <= 2
        })
        .collect();

    debug!(
        base = %base_city,
        max_radius,
        before = total,
        after = filtered.len(),
        "radius filter applied"
    );
    filtered
}

const NEGOTIABLE_KEYWORDS: [&str; 9] = [
    "negotiable",
    "competitive",
    "commensurate",
    "dependent on experience",
    "doe",
    "tbd",
    "to be determined",
    "flexible",
    "open",
];

struct SalaryPattern {
    regex: Regex,
    period: Option<SalaryPeriod>,
    thousands: bool,
}

// Tried in priority order; first match wins. Range patterns require an
// explicit separator so "$30/hr" never splits into two bogus amounts.
static SALARY_PATTERNS: LazyLock<Vec<SalaryPattern>> = LazyLock::new(|| {
    let pattern = |re: &str, period: Option<SalaryPeriod>, thousands: bool| SalaryPattern {
        regex: Regex::new(re).expect("static salary pattern compiles"),
        period,
        thousands,
    };
    vec![
        // Hourly range, hourly single
        pattern(
            r"(?i)\$(\d+(?:\.\d{1,2})?)\s*(?:to|-|–)\s*\$?(\d+(?:\.\d{1,2})?)\s*(?:per\s*|/)?\s*(?:hourly|hour|hr)\b",
            Some(SalaryPeriod::Hourly),
            false,
        ),
        pattern(
            r"(?i)\$(\d+(?:\.\d{1,2})?)\s*(?:per\s*|/)?\s*(?:hourly|hour|hr)\b",
            Some(SalaryPeriod::Hourly),
            false,
        ),
        // Annual range, annual single (thousands separators allowed)
        pattern(
            r"(?i)\$(\d{1,3}(?:,\d{3})*(?:\.\d{1,2})?)\s*(?:to|-|–)\s*\$?(\d{1,3}(?:,\d{3})*(?:\.\d{1,2})?)\s*(?:per\s*|/)?\s*(?:annually|annual|year)\b",
            Some(SalaryPeriod::Annual),
            false,
        ),
        pattern(
            r"(?i)\$(\d{1,3}(?:,\d{3})*(?:\.\d{1,2})?)\s*(?:per\s*|/)?\s*(?:annually|annual|year)\b",
            Some(SalaryPeriod::Annual),
            false,
        ),
        // $NNk shorthand range, $NNk single
        pattern(r"(?i)\$(\d+)k?\s*(?:to|-|–)\s*\$?(\d+)k\b", None, true),
        pattern(r"(?i)\$(\d+)k\b", None, true),
        // Unlabeled numeric range; period comes from surrounding text
        pattern(
            r"(?i)\$(\d{1,3}(?:,\d{3})*(?:\.\d{1,2})?)\s*(?:to|-|–)\s*\$?(\d{1,3}(?:,\d{3})*(?:\.\d{1,2})?)",
            None,
            false,
        ),
        // Monthly range, monthly single
        pattern(
            r"(?i)\$(\d{1,3}(?:,\d{3})*(?:\.\d{1,2})?)\s*(?:to|-|–)\s*\$?(\d{1,3}(?:,\d{3})*(?:\.\d{1,2})?)\s*(?:per\s*|/)?\s*(?:monthly|month)\b",
            Some(SalaryPeriod::Monthly),
            false,
        ),
        pattern(
            r"(?i)\$(\d{1,3}(?:,\d{3})*(?:\.\d{1,2})?)\s*(?:per\s*|/)?\s*(?:monthly|month)\b",
            Some(SalaryPeriod::Monthly),
            false,
        ),
    ]
});

fn parse_amount(text: &str) -> Option<f64> {
    text.replace([',', '$'], "").trim().parse().ok()
}

fn infer_period(text: &str, min_amount: f64) -> SalaryPeriod {
    if text.contains("hour") || text.contains("hr") {
        SalaryPeriod::Hourly
    } else if text.contains("year") || text.contains("annual") {
        SalaryPeriod::Annual
    } else if text.contains("month") {
        SalaryPeriod::Monthly
    } else if min_amount < 100.0 {
        SalaryPeriod::Hourly
    } else if min_amount > 1000.0 {
        SalaryPeriod::Annual
    } else {
        SalaryPeriod::Hourly
    }
}

/// Parse free-text compensation into a structured range. Returns `None`
/// when the text yields neither a numeric amount nor a negotiable marker.
pub fn parse_salary(text: &str) -> Option<SalaryRange> {
    let text = text.trim().to_lowercase();
    if text.is_empty() {
        return None;
    }

    let is_negotiable = NEGOTIABLE_KEYWORDS.iter().any(|k| text.contains(k));

    for pattern in SALARY_PATTERNS.iter() {
        let Some(captures) = pattern.regex.captures(&text) else {
            continue;
        };
        let Some(mut min_amount) = captures.get(1).and_then(|m| parse_amount(m.as_str())) else {
            continue;
        };
        let mut max_amount = captures.get(2).and_then(|m| parse_amount(m.as_str()));
        let is_range = max_amount.is_some();

        if pattern.thousands {
            min_amount *= 1000.0;
            max_amount = max_amount.map(|v| v * 1000.0);
        }

        let period = pattern
            .period
            .unwrap_or_else(|| infer_period(&text, min_amount));

        return Some(SalaryRange {
            min_amount: Some(min_amount),
            max_amount: Some(max_amount.unwrap_or(min_amount)),
            period: Some(period),
            is_range,
            is_negotiable,
        });
    }

    if is_negotiable {
        return Some(SalaryRange {
            is_negotiable: true,
            ..SalaryRange::default()
        });
    }
    None
}

fn annualize_amount(amount: f64, period: SalaryPeriod) -> f64 {
    match period {
        SalaryPeriod::Hourly => amount * 40.0 * 52.0,
        SalaryPeriod::Monthly => amount * 12.0,
        SalaryPeriod::Annual => amount,
    }
}

/// Keep records whose annualized salary range overlaps the user's bounds.
/// While this filter is active, a record with missing or unparseable salary
/// text is excluded.
pub fn filter_by_salary(
    records: Vec<JobRecord>,
    min_salary: Option<f64>,
    max_salary: Option<f64>,
    period: SalaryPeriod,
) -> Vec<JobRecord> {
    let user_min = min_salary.map(|v| annualize_amount(v, period));
    let user_max = max_salary.map(|v| annualize_amount(v, period));

    records
        .into_iter()
        .filter(|record| {
            let Some(text) = record.salary.as_deref() else {
                return false;
            };
            let Some(parsed) = parse_salary(text) else {
                return false;
            };
            let Some((job_min, job_max)) = parsed.annualized() else {
                return false;
            };
            if user_min.is_some_and(|min| job_max < min) {
                return false;
            }
            if user_max.is_some_and(|max| job_min > max) {
                return false;
            }
            true
        })
        .collect()
}

/// Tabular export column order, fixed for downstream consumers.
pub const EXPORT_COLUMNS: [&str; 10] = [
    "title",
    "company",
    "location",
    "type",
    "salary",
    "posted_date",
    "source",
    "url",
    "match_score",
    "description",
];

#[derive(Debug, Clone, Serialize)]
pub struct ExportManifest {
    pub schema_version: u32,
    pub files: Vec<ExportManifestFile>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportManifestFile {
    pub name: String,
    pub path: String,
    pub sha256: String,
    pub bytes: u64,
}

/// Write the result set as a Parquet snapshot plus a manifest recording the
/// file hash. Returns the manifest path.
pub fn export_results_parquet(snapshot_dir: &Path, records: &[JobRecord]) -> Result<PathBuf> {
    std::fs::create_dir_all(snapshot_dir)
        .with_context(|| format!("creating {}", snapshot_dir.display()))?;

    let results_path = snapshot_dir.join("results.parquet");
    let batch = results_record_batch(records)?;
    write_parquet(&results_path, batch)?;

    let manifest = ExportManifest {
        schema_version: 1,
        files: vec![manifest_entry("results", snapshot_dir, &results_path)?],
    };
    let manifest_path = snapshot_dir.join("manifest.json");
    let bytes = serde_json::to_vec_pretty(&manifest).context("serializing export manifest")?;
    std::fs::write(&manifest_path, bytes)
        .with_context(|| format!("writing {}", manifest_path.display()))?;

    Ok(manifest_path)
}

pub fn export_results_json(path: &Path, records: &[JobRecord]) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(records).context("serializing results")?;
    std::fs::write(path, bytes).with_context(|| format!("writing {}", path.display()))
}

fn results_record_batch(records: &[JobRecord]) -> Result<RecordBatch> {
    let schema = Arc::new(Schema::new(vec![
        ArrowField::new("title", DataType::Utf8, false),
        ArrowField::new("company", DataType::Utf8, false),
        ArrowField::new("location", DataType::Utf8, false),
        ArrowField::new("type", DataType::Utf8, false),
        ArrowField::new("salary", DataType::Utf8, true),
        ArrowField::new("posted_date", DataType::Utf8, true),
        ArrowField::new("source", DataType::Utf8, false),
        ArrowField::new("url", DataType::Utf8, false),
        ArrowField::new("match_score", DataType::UInt32, true),
        ArrowField::new("description", DataType::Utf8, true),
    ]));

    let titles = StringArray::from(records.iter().map(|r| Some(r.title.as_str())).collect::<Vec<_>>());
    let companies =
        StringArray::from(records.iter().map(|r| Some(r.company.as_str())).collect::<Vec<_>>());
    let locations =
        StringArray::from(records.iter().map(|r| Some(r.location.as_str())).collect::<Vec<_>>());
    let types = StringArray::from(
        records
            .iter()
            .map(|r| Some(r.job_type.as_str()))
            .collect::<Vec<_>>(),
    );
    let salaries =
        StringArray::from(records.iter().map(|r| r.salary.as_deref()).collect::<Vec<_>>());
    let posted_dates = StringArray::from(
        records
            .iter()
            .map(|r| r.posted_date.map(|d| d.to_string()))
            .collect::<Vec<_>>(),
    );
    let sources =
        StringArray::from(records.iter().map(|r| Some(r.source.as_str())).collect::<Vec<_>>());
    let urls = StringArray::from(records.iter().map(|r| Some(r.url.as_str())).collect::<Vec<_>>());
    let match_scores = UInt32Array::from(
        records
            .iter()
            .map(|r| r.match_score.map(u32::from))
            .collect::<Vec<_>>(),
    );
    let descriptions =
        StringArray::from(records.iter().map(|r| r.description.as_deref()).collect::<Vec<_>>());

    RecordBatch::try_new(
        schema,
        vec![
            Arc::new(titles),
            Arc::new(companies),
            Arc::new(locations),
            Arc::new(types),
            Arc::new(salaries),
            Arc::new(posted_dates),
            Arc::new(sources),
            Arc::new(urls),
            Arc::new(match_scores),
            Arc::new(descriptions),
        ],
    )
    .context("building results record batch")
}

fn write_parquet(path: &Path, batch: RecordBatch) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), None)
        .with_context(|| format!("opening parquet writer {}", path.display()))?;
    writer
        .write(&batch)
        .with_context(|| format!("writing record batch {}", path.display()))?;
    writer
        .close()
        .with_context(|| format!("closing parquet writer {}", path.display()))?;
    Ok(())
}

fn manifest_entry(name: &str, base_dir: &Path, path: &Path) -> Result<ExportManifestFile> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    let sha256 = hex::encode(hasher.finalize());
    let rel = path.strip_prefix(base_dir).unwrap_or(path).display().to_string();
    Ok(ExportManifestFile {
        name: name.to_string(),
        path: rel,
        sha256,
        bytes: bytes.len() as u64,
    })
}
