use clap::{Parser, Subcommand};
use std::fs;
use std::sync::Arc;
use tracing::{error, info};

use openreview_scraper::apis::{build_clients, OpenReviewApi};
use openreview_scraper::config::Config;
use openreview_scraper::constants::{DEFAULT_CONFERENCES, DEFAULT_KEYWORDS, DEFAULT_YEARS};
use openreview_scraper::filters::default_pipeline;
use openreview_scraper::logging;
use openreview_scraper::scraper::{ConferenceStatus, ScrapeSummary, Scraper};
use openreview_scraper::storage::{CsvStorage, Storage};
use openreview_scraper::transforms::default_transforms;
use openreview_scraper::venues::{analyze_catalog, categorize_venue, merge_catalogs};

#[derive(Parser)]
#[command(name = "openreview_scraper")]
#[command(about = "OpenReview paper metadata scraper")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Harvest papers for the requested conferences and years
    Scrape {
        /// Conferences to scrape (comma-separated, e.g. ICLR,ICML)
        #[arg(long)]
        conferences: Option<String>,
        /// Years to scrape (comma-separated, e.g. 2024,2025)
        #[arg(long)]
        years: Option<String>,
        /// Keywords to filter papers on (comma-separated)
        #[arg(long)]
        keywords: Option<String>,
        /// Include submissions, not just accepted papers
        #[arg(long)]
        include_submissions: bool,
        /// Re-harvest conference/years that already have output
        #[arg(long)]
        force: bool,
    },
    /// Discover and report the venue catalog
    Venues {
        /// Only report venues matching these conferences (comma-separated)
        #[arg(long)]
        conferences: Option<String>,
        /// Only report venues matching these years (comma-separated)
        #[arg(long)]
        years: Option<String>,
        /// Include workshop venues in the report
        #[arg(long)]
        include_workshops: bool,
        /// Write the full categorized catalog to a JSON file
        #[arg(long)]
        output_file: Option<String>,
    },
}

fn parse_list(arg: Option<String>, defaults: &[&str]) -> Vec<String> {
    match arg {
        Some(list) => list.split(',').map(|s| s.trim().to_string()).collect(),
        None => defaults.iter().map(|s| s.to_string()).collect(),
    }
}

fn print_summary(summary: &ScrapeSummary) {
    println!("\n📊 Scrape Results (run {}):", summary.run_id);
    for report in &summary.conferences {
        let status = match report.status {
            ConferenceStatus::Completed => "completed",
            ConferenceStatus::SkippedExisting => "skipped (output exists)",
            ConferenceStatus::NoVenues => "no venues found",
            ConferenceStatus::NoPapers => "no papers found",
            ConferenceStatus::NoMatches => "no papers passed filters",
            ConferenceStatus::Error => "error",
        };
        println!("   {}: {}", report.conference, status);
        if report.status == ConferenceStatus::Completed {
            println!(
                "      fetched: {}, matched: {}, saved: {} (years: {:?})",
                report.papers_fetched, report.papers_matched, report.papers_saved, report.years_written
            );
        }
        if report.malformed_venues > 0 {
            println!("      ⚠️  malformed venue ids skipped: {}", report.malformed_venues);
        }
        if let Some(error) = &report.error {
            println!("      ❌ {}", error);
        }
    }
    println!("   Total papers saved: {}", summary.total_saved());
}

async fn run_venues_report(
    client_v1: &dyn OpenReviewApi,
    client_v2: &dyn OpenReviewApi,
    conferences: Option<String>,
    years: Option<String>,
    include_workshops: bool,
    output_file: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = merge_catalogs(client_v1, client_v2).await;
    if catalog.is_empty() {
        println!("❌ No venues found or failed to connect to OpenReview");
        return Ok(());
    }

    let conference_filter: Option<Vec<String>> =
        conferences.map(|list| list.split(',').map(|s| s.trim().to_uppercase()).collect());
    let year_filter: Option<Vec<String>> =
        years.map(|list| list.split(',').map(|s| s.trim().to_string()).collect());

    let mut venues: Vec<_> = catalog.iter().map(|id| categorize_venue(id)).collect();
    venues.retain(|venue| {
        if let Some(confs) = &conference_filter {
            if !confs.contains(&venue.conference) {
                return false;
            }
        }
        if let Some(years) = &year_filter {
            if !years.contains(&venue.year) {
                return false;
            }
        }
        include_workshops || venue.track != openreview_scraper::types::Track::Workshop
    });

    let stats = analyze_catalog(&venues);

    println!("🔍 OpenReview Venues Discovery Report");
    println!("{}", "=".repeat(60));
    println!("\n📊 Summary Statistics:");
    println!("   Total venues: {}", stats.total);
    println!("   Unique conferences: {}", stats.by_conference.len());
    println!("   Years covered: {}", stats.by_year.len());

    println!("\n🏛️  By Conference:");
    let mut by_conference: Vec<_> = stats.by_conference.iter().collect();
    by_conference.sort_by(|a, b| b.1.cmp(a.1));
    for (conference, count) in by_conference.into_iter().take(10) {
        println!("   {}: {} venues", conference, count);
    }

    println!("\n📅 By Year:");
    for (year, count) in &stats.by_year {
        if year != "unknown" {
            println!("   {}: {} venues", year, count);
        }
    }

    println!("\n📝 By Track:");
    for (track, count) in &stats.by_track {
        println!("   {}: {} venues", track, count);
    }

    if let Some(path) = output_file {
        let report = serde_json::json!({
            "statistics": stats,
            "venues": venues,
        });
        fs::write(&path, serde_json::to_string_pretty(&report)?)?;
        println!("\n✅ Results saved to {}", path);
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    logging::init_logging();

    let cli = Cli::parse();
    let config = Config::load()?;
    let (client_v1, client_v2) = build_clients(&config);

    match cli.command {
        Commands::Scrape {
            conferences,
            years,
            keywords,
            include_submissions,
            force,
        } => {
            println!("🔄 Running OpenReview scrape...");

            let conferences = parse_list(conferences, DEFAULT_CONFERENCES);
            let years = parse_list(years, DEFAULT_YEARS);
            let keywords = parse_list(keywords, DEFAULT_KEYWORDS);

            let storage: Arc<dyn Storage> = Arc::new(CsvStorage::new(&config.output.data_dir));
            let scraper = Scraper::new(conferences, years, keywords)
                .with_pipeline(default_pipeline())
                .with_transforms(default_transforms())
                .only_accepted(!include_submissions)
                .skip_existing(!force);

            match scraper.run(&client_v1, &client_v2, storage).await {
                Ok((summary, _accumulator)) => {
                    print_summary(&summary);
                    println!(
                        "\n✅ Scrape completed, data saved under {}/",
                        config.output.data_dir
                    );
                }
                Err(e) => {
                    error!("Scrape run failed: {}", e);
                    println!("❌ Scrape run failed: {}", e);
                }
            }
        }
        Commands::Venues {
            conferences,
            years,
            include_workshops,
            output_file,
        } => {
            println!("🔍 Discovering OpenReview venues...");
            info!("Starting venue discovery");
            run_venues_report(
                &client_v1,
                &client_v2,
                conferences,
                years,
                include_workshops,
                output_file,
            )
            .await?;
        }
    }

    Ok(())
}
