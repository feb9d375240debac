use crate::apis::{fetch_grouped_papers, OpenReviewApi};
use crate::error::Result;
use crate::extract::Extractor;
use crate::filters::FilterPipeline;
use crate::storage::Storage;
use crate::transforms::{apply_transforms, PaperTransform};
use crate::types::{split_venue_id, FlatPaper, Paper};
use crate::venues::{group_venues, resolve_venues};
use chrono::{DateTime, Utc};
use metrics::counter;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// How a conference's harvest ended. Every variant except `Completed` and
/// `Error` is a short-circuit exit, logged and non-fatal to the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ConferenceStatus {
    Completed,
    SkippedExisting,
    NoVenues,
    NoPapers,
    NoMatches,
    Error,
}

/// Per-conference outcome, reported at the end of a run.
#[derive(Debug, Clone, Serialize)]
pub struct ConferenceReport {
    pub conference: String,
    pub status: ConferenceStatus,
    pub papers_fetched: usize,
    pub papers_matched: usize,
    pub papers_saved: usize,
    pub malformed_venues: usize,
    pub years_written: Vec<String>,
    pub error: Option<String>,
}

impl ConferenceReport {
    fn short_circuit(conference: &str, status: ConferenceStatus) -> Self {
        Self {
            conference: conference.to_string(),
            status,
            papers_fetched: 0,
            papers_matched: 0,
            papers_saved: 0,
            malformed_venues: 0,
            years_written: Vec::new(),
            error: None,
        }
    }
}

/// Result of a complete scrape run.
#[derive(Debug, Serialize)]
pub struct ScrapeSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub conferences: Vec<ConferenceReport>,
}

impl ScrapeSummary {
    pub fn total_saved(&self) -> usize {
        self.conferences.iter().map(|report| report.papers_saved).sum()
    }
}

/// Harvested output accumulated over one run, keyed by conference then year.
/// Owned by a single `Scraper::run` invocation; never shared across runs.
#[derive(Debug, Default, Serialize)]
pub struct HarvestAccumulator {
    pub by_conference: BTreeMap<String, BTreeMap<String, Vec<FlatPaper>>>,
}

impl HarvestAccumulator {
    fn insert(&mut self, conference: &str, year: &str, papers: Vec<FlatPaper>) {
        self.by_conference
            .entry(conference.to_string())
            .or_default()
            .insert(year.to_string(), papers);
    }
}

/// Drives the end-to-end harvest: venue resolution, retrieval, filtering,
/// extraction and persistence, one conference at a time.
pub struct Scraper {
    conferences: Vec<String>,
    years: Vec<String>,
    keywords: Vec<String>,
    groups: Vec<String>,
    extractor: Extractor,
    transforms: Vec<PaperTransform>,
    pipeline: FilterPipeline,
    only_accepted: bool,
    skip_existing: bool,
}

impl Scraper {
    pub fn new(conferences: Vec<String>, years: Vec<String>, keywords: Vec<String>) -> Self {
        Self {
            conferences,
            years,
            keywords,
            groups: crate::constants::DEFAULT_GROUPS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            extractor: Extractor::default_paper_extractor(),
            transforms: Vec::new(),
            pipeline: FilterPipeline::new(),
            only_accepted: true,
            skip_existing: true,
        }
    }

    pub fn with_groups(mut self, groups: Vec<String>) -> Self {
        self.groups = groups;
        self
    }

    pub fn with_extractor(mut self, extractor: Extractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_pipeline(mut self, pipeline: FilterPipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    pub fn with_transforms(mut self, transforms: Vec<PaperTransform>) -> Self {
        self.transforms = transforms;
        self
    }

    pub fn only_accepted(mut self, only_accepted: bool) -> Self {
        self.only_accepted = only_accepted;
        self
    }

    pub fn skip_existing(mut self, skip_existing: bool) -> Self {
        self.skip_existing = skip_existing;
        self
    }

    /// Runs the harvest for every requested conference, strictly
    /// sequentially. Per-conference failures are caught and reported; the
    /// loop always continues, and a run where nothing was written is a
    /// normal outcome.
    pub async fn run(
        &self,
        client_v1: &dyn OpenReviewApi,
        client_v2: &dyn OpenReviewApi,
        storage: Arc<dyn Storage>,
    ) -> Result<(ScrapeSummary, HarvestAccumulator)> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        info!("Starting scrape run {}", run_id);
        info!("Conferences: {:?}", self.conferences);
        info!("Years: {:?}", self.years);
        info!("Keywords: {:?}", self.keywords);

        let mut accumulator = HarvestAccumulator::default();
        let mut reports = Vec::new();

        for (i, conference) in self.conferences.iter().enumerate() {
            info!(
                "Processing {} ({}/{})",
                conference,
                i + 1,
                self.conferences.len()
            );

            let report = match self
                .scrape_conference(conference, client_v1, client_v2, storage.clone(), &mut accumulator)
                .await
            {
                Ok(report) => report,
                Err(e) => {
                    error!("❌ Error processing {}: {}", conference, e);
                    counter!("openreview_conference_errors_total").increment(1);
                    ConferenceReport {
                        error: Some(e.to_string()),
                        ..ConferenceReport::short_circuit(conference, ConferenceStatus::Error)
                    }
                }
            };
            reports.push(report);
        }

        let summary = ScrapeSummary {
            run_id,
            started_at,
            finished_at: Utc::now(),
            conferences: reports,
        };
        info!(
            "Scrape run {} finished: {} papers saved",
            run_id,
            summary.total_saved()
        );
        Ok((summary, accumulator))
    }

    #[instrument(skip(self, client_v1, client_v2, storage, accumulator))]
    async fn scrape_conference(
        &self,
        conference: &str,
        client_v1: &dyn OpenReviewApi,
        client_v2: &dyn OpenReviewApi,
        storage: Arc<dyn Storage>,
        accumulator: &mut HarvestAccumulator,
    ) -> Result<ConferenceReport> {
        // Skip check: only persist years that lack output. Venue resolution
        // below still uses the full year list; discovery is cheap and stays
        // authoritative even when some years are skipped.
        let years_to_process = if self.skip_existing {
            let mut pending = Vec::new();
            for year in &self.years {
                if !storage.probe_existing(conference, year).await {
                    pending.push(year.clone());
                }
            }
            if pending.is_empty() {
                info!("⏭️  All data already exists for {}, skipping", conference);
                return Ok(ConferenceReport::short_circuit(
                    conference,
                    ConferenceStatus::SkippedExisting,
                ));
            }
            info!("📋 Will process years {:?} for {}", pending, conference);
            pending
        } else {
            self.years.clone()
        };

        let conference_list = vec![conference.to_string()];
        let venues = resolve_venues(client_v1, client_v2, &conference_list, &self.years).await;
        if venues.is_empty() {
            warn!("❌ No venues found for {}", conference);
            return Ok(ConferenceReport::short_circuit(
                conference,
                ConferenceStatus::NoVenues,
            ));
        }
        info!("✅ Found {} venues for {}: {:?}", venues.len(), conference, venues);

        let grouped = group_venues(&venues, &self.groups);
        let papers_by_group =
            fetch_grouped_papers(&[client_v2, client_v1], &grouped, self.only_accepted).await?;

        let papers_fetched: usize = papers_by_group
            .values()
            .flat_map(|venues| venues.values())
            .map(|papers| papers.len())
            .sum();
        if papers_fetched == 0 {
            warn!("❌ No papers found for {}", conference);
            return Ok(ConferenceReport::short_circuit(
                conference,
                ConferenceStatus::NoPapers,
            ));
        }
        info!("Found {} total papers for {}", papers_fetched, conference);

        let (matched_papers, malformed_venues) = self.filter_and_extract(&papers_by_group);
        counter!("openreview_papers_matched_total", "conference" => conference.to_string())
            .increment(matched_papers.len() as u64);

        if matched_papers.is_empty() {
            warn!("❌ No papers passed filters for {}", conference);
            return Ok(ConferenceReport {
                papers_fetched,
                malformed_venues,
                ..ConferenceReport::short_circuit(conference, ConferenceStatus::NoMatches)
            });
        }
        info!(
            "✅ {} papers passed filters for {}",
            matched_papers.len(),
            conference
        );

        // Partition by the derived year field and persist one batch per
        // (conference, year) that has records; empty pairs write nothing.
        let mut papers_saved = 0usize;
        let mut years_written = Vec::new();
        for year in &years_to_process {
            let year_papers: Vec<FlatPaper> = matched_papers
                .iter()
                .filter(|paper| {
                    paper
                        .get("year")
                        .and_then(|value| value.as_str())
                        .map(|paper_year| paper_year == year)
                        .unwrap_or(false)
                })
                .cloned()
                .collect();

            if year_papers.is_empty() {
                info!("📄 No papers found for {} {}", conference, year);
                continue;
            }

            info!(
                "📄 Saving {} papers for {} {}",
                year_papers.len(),
                conference,
                year
            );
            let destination = storage.append_papers(&year_papers, conference, year).await?;
            info!("Saved batch to {}", destination);
            counter!("openreview_papers_saved_total", "conference" => conference.to_string())
                .increment(year_papers.len() as u64);

            papers_saved += year_papers.len();
            years_written.push(year.clone());
            accumulator.insert(conference, year, year_papers);
        }

        Ok(ConferenceReport {
            conference: conference.to_string(),
            status: ConferenceStatus::Completed,
            papers_fetched,
            papers_matched: matched_papers.len(),
            papers_saved,
            malformed_venues,
            years_written,
            error: None,
        })
    }

    /// Applies the filter pipeline, transform chain and field extraction to
    /// every fetched paper, tagging provenance and the derived venue fields.
    ///
    /// Returns the surviving flat papers plus the count of venues whose id
    /// violated the three-segment contract (their papers are skipped as a
    /// data-integrity error, without aborting the conference).
    fn filter_and_extract(
        &self,
        papers_by_group: &BTreeMap<String, BTreeMap<String, Vec<Paper>>>,
    ) -> (Vec<FlatPaper>, usize) {
        let mut matched = Vec::new();
        let mut malformed_venues = 0usize;

        for (group, venue_papers) in papers_by_group {
            for (venue_id, papers) in venue_papers {
                let parts = match split_venue_id(venue_id) {
                    Ok(parts) => parts,
                    Err(e) => {
                        error!("Skipping {} papers: {}", papers.len(), e);
                        counter!("openreview_malformed_venue_ids_total").increment(1);
                        malformed_venues += 1;
                        continue;
                    }
                };

                for paper in papers {
                    let Some(provenance) = self.pipeline.evaluate(paper, &self.keywords) else {
                        continue;
                    };

                    let mut paper = paper.clone();
                    paper
                        .content
                        .insert("match".to_string(), provenance.to_value());
                    paper
                        .content
                        .insert("group".to_string(), Value::String(group.clone()));

                    let paper = apply_transforms(&self.transforms, paper);

                    let mut flat = self.extractor.extract(&paper);
                    flat.insert("venue".to_string(), Value::String(parts.name.clone()));
                    flat.insert("year".to_string(), Value::String(parts.year.clone()));
                    flat.insert("type".to_string(), Value::String(parts.track.clone()));
                    matched.push(flat);
                }
            }
        }

        (matched, malformed_venues)
    }
}
