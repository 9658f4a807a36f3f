//! Core domain model for JobSweep.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const CRATE_NAME: &str = "jobsweep-core";

/// Listing classification. Anything a source reports outside these two
/// values is rejected during normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobType {
    Job,
    Gig,
}

impl JobType {
    /// Case-insensitive parse of the raw `kind` string sources emit.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "job" => Some(Self::Job),
            "gig" => Some(Self::Gig),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Job => "job",
            Self::Gig => "gig",
        }
    }
}

/// Unvalidated record as produced by a source adapter. Field presence and
/// formats are whatever the board happened to emit; the normalizer decides
/// what survives.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    /// Raw listing kind, expected to be "job" or "gig" in any casing.
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub salary: Option<String>,
    /// Raw `YYYY-MM-DD` date string, if the board exposes one.
    #[serde(default)]
    pub posted_date: Option<String>,
}

/// Canonical listing flowing through the pipeline. Every instance has passed
/// normalization, so `title`, `company`, `location`, and `url` are non-empty
/// and `job_type` is recognized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub title: String,
    pub company: String,
    pub location: String,
    pub description: Option<String>,
    pub url: String,
    pub job_type: JobType,
    /// Raw compensation text; parsed on demand by the salary normalizer.
    pub salary: Option<String>,
    pub posted_date: Option<NaiveDate>,
    /// Originating adapter tag, stamped by the orchestrator.
    pub source: String,
    /// Downstream relevance score (0-100); never set by this pipeline.
    pub match_score: Option<u8>,
}

/// Time unit a compensation figure is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SalaryPeriod {
    Hourly,
    Monthly,
    Annual,
}

/// Structured compensation parsed from free text. `period` is absent when
/// the text carried no numeric amount (negotiable-only strings).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SalaryRange {
    pub min_amount: Option<f64>,
    pub max_amount: Option<f64>,
    pub period: Option<SalaryPeriod>,
    pub is_range: bool,
    pub is_negotiable: bool,
}

impl SalaryRange {
    /// Annualized `[min, max]` for cross-period comparison: hourly assumes
    /// a 40-hour week over 52 weeks, monthly multiplies by 12.
    pub fn annualized(&self) -> Option<(f64, f64)> {
        let min = self.min_amount?;
        let max = self.max_amount.unwrap_or(min);
        let factor = match self.period? {
            SalaryPeriod::Hourly => 40.0 * 52.0,
            SalaryPeriod::Monthly => 12.0,
            SalaryPeriod::Annual => 1.0,
        };
        Some((min * factor, max * factor))
    }
}
