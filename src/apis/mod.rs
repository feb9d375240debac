pub mod api_v1;
pub mod api_v2;

use crate::config::Config;
use crate::error::{Result, ScraperError};
use crate::types::Paper;
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::{info, warn};

pub use api_v1::ApiV1Client;
pub use api_v2::ApiV2Client;

/// Core trait for one generation of the OpenReview API.
///
/// Both generations expose the same two capabilities the scraper needs:
/// enumerate the venue catalog and list the notes published under a venue.
#[async_trait::async_trait]
pub trait OpenReviewApi: Send + Sync {
    /// Unique identifier for this API generation
    fn api_name(&self) -> &'static str;

    /// Fetch the members of the `venues` group: every venue id the platform knows
    async fn list_venues(&self) -> Result<Vec<String>>;

    /// Fetch all notes published under a venue id, optionally accepted-only
    async fn get_papers(&self, venue_id: &str, only_accepted: bool) -> Result<Vec<Paper>>;
}

/// Wire shape of a `/groups` response (shared by both generations).
#[derive(Debug, Deserialize)]
pub(crate) struct GroupsResponse {
    #[serde(default)]
    pub groups: Vec<Group>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Group {
    #[serde(default)]
    pub members: Vec<String>,
}

/// Wire shape of a `/notes` response page (shared by both generations).
#[derive(Debug, Deserialize)]
pub(crate) struct NotesResponse {
    #[serde(default)]
    pub notes: Vec<Paper>,
}

/// Reads the optional bearer token from the environment (populated by dotenv).
pub(crate) fn auth_token() -> Option<String> {
    std::env::var("OPENREVIEW_TOKEN")
        .ok()
        .filter(|token| !token.trim().is_empty())
}

/// Builds one client per API generation from the loaded configuration.
pub fn build_clients(config: &Config) -> (ApiV1Client, ApiV2Client) {
    let token = auth_token();
    if token.is_some() {
        info!("Using OPENREVIEW_TOKEN for authenticated access");
    } else {
        info!("No OPENREVIEW_TOKEN set, using anonymous access");
    }
    (
        ApiV1Client::new(&config.api.base_url_v1, config.api.timeout_seconds, token.clone()),
        ApiV2Client::new(&config.api.base_url_v2, config.api.timeout_seconds, token),
    )
}

/// Fetches papers for every venue in every bin.
///
/// Clients are tried in the order given (v2 first in practice); the first
/// client that returns a non-empty page set wins for a venue. A client error
/// is logged and the next client is tried; if every client errors for a
/// venue the whole fetch fails, which aborts only the current conference.
pub async fn fetch_grouped_papers(
    clients: &[&dyn OpenReviewApi],
    grouped_venues: &BTreeMap<String, Vec<String>>,
    only_accepted: bool,
) -> Result<BTreeMap<String, BTreeMap<String, Vec<Paper>>>> {
    let mut papers_by_group: BTreeMap<String, BTreeMap<String, Vec<Paper>>> = BTreeMap::new();

    for (group, venues) in grouped_venues {
        let group_papers = papers_by_group.entry(group.clone()).or_default();
        for venue_id in venues {
            let mut venue_papers: Option<Vec<Paper>> = None;
            let mut last_error: Option<ScraperError> = None;

            for client in clients {
                match client.get_papers(venue_id, only_accepted).await {
                    Ok(papers) if !papers.is_empty() => {
                        info!(
                            "Fetched {} papers for {} via {}",
                            papers.len(),
                            venue_id,
                            client.api_name()
                        );
                        venue_papers = Some(papers);
                        break;
                    }
                    Ok(_) => {
                        // Empty page set; the venue may live on the other generation
                        venue_papers.get_or_insert_with(Vec::new);
                    }
                    Err(e) => {
                        warn!(
                            "Error fetching papers for {} via {}: {}",
                            venue_id,
                            client.api_name(),
                            e
                        );
                        last_error = Some(e);
                    }
                }
            }

            match venue_papers {
                Some(papers) => {
                    metrics::counter!("openreview_papers_fetched_total").increment(papers.len() as u64);
                    group_papers.insert(venue_id.clone(), papers);
                }
                None => {
                    return Err(last_error.unwrap_or(ScraperError::Api {
                        message: format!("no API client could serve venue {}", venue_id),
                    }));
                }
            }
        }
    }

    Ok(papers_by_group)
}
