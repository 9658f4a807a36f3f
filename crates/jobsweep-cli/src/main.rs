use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use jobsweep_core::{JobRecord, SalaryPeriod};
use jobsweep_search::{
    export_results_json, export_results_parquet, load_source_registry, JobSearch, SearchConfig,
    SearchOptions,
};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "jobsweep")]
#[command(about = "JobSweep command-line interface")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Search every enabled board and print the aggregated results.
    Search {
        query: String,
        #[arg(long, default_value = "")]
        location: String,
        /// Search radius in km, passed through to the boards.
        #[arg(long)]
        radius: Option<u32>,
        #[arg(long)]
        gigs_only: bool,
        #[arg(long)]
        jobs_only: bool,
        #[arg(long)]
        new_only: bool,
        #[arg(long)]
        remote_only: bool,
        #[arg(long)]
        on_site_only: bool,
        /// Keep only one source, e.g. "jobbank".
        #[arg(long)]
        source: Option<String>,
        #[arg(long)]
        min_radius: Option<u32>,
        #[arg(long)]
        max_radius: Option<u32>,
        #[arg(long)]
        min_salary: Option<f64>,
        #[arg(long)]
        max_salary: Option<f64>,
        /// Period the salary bounds are expressed in: hourly, monthly, annual.
        #[arg(long, default_value = "annual")]
        salary_period: String,
        /// Extra query terms swept in the same aggregation.
        #[arg(long = "term")]
        terms: Vec<String>,
        /// Write a Parquet snapshot + manifest into this directory.
        #[arg(long)]
        export_dir: Option<PathBuf>,
        /// Write the results as JSON to this path.
        #[arg(long)]
        json_out: Option<PathBuf>,
    },
    /// List configured boards and whether they are enabled.
    Sources,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = SearchConfig::from_env();
    let registry = load_source_registry(&config.sources_path())?;

    match cli.command {
        Commands::Search {
            query,
            location,
            radius,
            gigs_only,
            jobs_only,
            new_only,
            remote_only,
            on_site_only,
            source,
            min_radius,
            max_radius,
            min_salary,
            max_salary,
            salary_period,
            terms,
            export_dir,
            json_out,
        } => {
            let options = SearchOptions {
                radius,
                gigs_only,
                jobs_only,
                new_only,
                remote_only,
                on_site_only,
                source,
                min_radius,
                max_radius,
                min_salary,
                max_salary,
                salary_period: parse_salary_period(&salary_period)?,
                expanded_terms: terms,
            };

            let search = JobSearch::from_registry(&config, &registry)?;
            let (results, summary) = search.search_with_summary(&query, &location, &options).await;

            display_results(&results);

            if let Some(dir) = export_dir {
                let manifest = export_results_parquet(&dir, &results)?;
                println!("exported parquet snapshot, manifest at {}", manifest.display());
            }
            if let Some(path) = json_out {
                export_results_json(&path, &results)?;
                println!("exported JSON results to {}", path.display());
            }

            println!(
                "search complete: run_id={} sources={} raw={} dropped={} duplicates={} returned={}",
                summary.run_id,
                summary.enabled_sources,
                summary.raw_records,
                summary.dropped_records,
                summary.duplicates_removed,
                summary.returned
            );
        }
        Commands::Sources => {
            for source in &registry.sources {
                let marker = if source.enabled { "enabled " } else { "disabled" };
                println!(
                    "{} {:<12} {} ({})",
                    marker, source.source_id, source.display_name, source.mode
                );
            }
        }
    }

    Ok(())
}

fn parse_salary_period(value: &str) -> Result<SalaryPeriod> {
    match value.to_ascii_lowercase().as_str() {
        "hourly" => Ok(SalaryPeriod::Hourly),
        "monthly" => Ok(SalaryPeriod::Monthly),
        "annual" | "annually" | "yearly" => Ok(SalaryPeriod::Annual),
        other => bail!("unsupported salary period {other}; use hourly, monthly, or annual"),
    }
}

fn display_results(records: &[JobRecord]) {
    if records.is_empty() {
        println!("\nNo listings found matching your criteria.");
        return;
    }

    println!("\nFound {} listings:", records.len());
    println!("{}", "-".repeat(80));
    for (i, record) in records.iter().enumerate() {
        println!("{}. {}", i + 1, record.title);
        println!("   Company: {}", record.company);
        println!("   Location: {}", record.location);
        println!("   Type: {}", record.job_type.as_str());
        println!("   Source: {}", record.source);
        println!("   URL: {}", record.url);
        if let Some(salary) = &record.salary {
            println!("   Salary: {salary}");
        }
        println!("{}", "-".repeat(80));
    }
}
