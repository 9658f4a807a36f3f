//! Fixture-backed board adapters exercised against the captured listings
//! under `fixtures/` at the workspace root.

use std::path::{Path, PathBuf};

use jobsweep_adapters::{adapter_for_source, BoardEndpoint};

fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../..")
        .canonicalize()
        .expect("workspace root")
}

fn fixture(rel: &str) -> BoardEndpoint {
    BoardEndpoint::Fixture(workspace_root().join("fixtures").join(rel))
}

#[tokio::test]
async fn jobbank_fixture_returns_raw_rows_untouched() {
    let adapter = adapter_for_source("jobbank", fixture("jobbank/sample/listing.html")).unwrap();
    let records = adapter.search("", "Brampton", None).await.unwrap();
    assert_eq!(records.len(), 4);

    let first = &records[0];
    assert_eq!(first.title, "Graphic Designer");
    assert_eq!(first.company, "Maple Print Co");
    assert_eq!(first.location, "Brampton, ON");
    assert_eq!(first.kind, "job");
    assert_eq!(first.salary.as_deref(), Some("$22 - $26 per hour"));
    assert_eq!(first.posted_date.as_deref(), Some("2026-08-05"));
    assert_eq!(first.url.as_deref(), Some("https://example.org/jobbank/jobs/101"));

    // Raw records keep whatever the board emitted; whitespace cleanup and
    // required-field checks happen downstream.
    assert_eq!(records[2].title, "Junior   Accountant");
    assert_eq!(records[3].company, "");
}

#[tokio::test]
async fn jobbank_fixture_filters_by_query() {
    let adapter = adapter_for_source("jobbank", fixture("jobbank/sample/listing.html")).unwrap();
    let records = adapter.search("designer", "Brampton", None).await.unwrap();
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r.title.to_lowercase().contains("designer")));

    let none = adapter.search("plumber", "Brampton", None).await.unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn kijiji_fixture_mixes_gigs_and_jobs() {
    let adapter = adapter_for_source("kijiji", fixture("kijiji/sample/listing.html")).unwrap();
    let records = adapter.search("", "Brampton", Some(25)).await.unwrap();
    assert_eq!(records.len(), 3);

    let kinds: Vec<&str> = records.iter().map(|r| r.kind.as_str()).collect();
    assert_eq!(kinds, vec!["gig", "gig", "job"]);
    assert_eq!(records[1].salary.as_deref(), Some("Negotiable"));
    assert_eq!(records[1].posted_date, None);
}

#[tokio::test]
async fn craigslist_fixture_parses_json_listing() {
    let adapter =
        adapter_for_source("craigslist", fixture("craigslist/sample/listing.json")).unwrap();
    let records = adapter.search("", "Toronto", None).await.unwrap();
    assert_eq!(records.len(), 3);

    assert_eq!(records[0].title, "Virtual Assistant");
    assert_eq!(records[0].kind, "gig");
    assert_eq!(records[1].description, None);
    assert_eq!(
        records[2].salary.as_deref(),
        Some("$40,000 - $48,000 per year")
    );
}
