use crate::apis::{GroupsResponse, NotesResponse, OpenReviewApi};
use crate::constants::{NOTES_PAGE_LIMIT, VENUES_GROUP_ID};
use crate::error::Result;
use crate::types::Paper;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Client for the second-generation OpenReview API (api2.openreview.net).
///
/// Notes here wrap every content field as `{"value": ...}`; accepted papers
/// are addressed by `content.venueid`, submissions by a `<venue>/-/Submission`
/// invitation.
pub struct ApiV2Client {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ApiV2Client {
    pub fn new(base_url: &str, timeout_seconds: u64, token: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        let mut request = self.client.get(url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        request
    }
}

#[async_trait::async_trait]
impl OpenReviewApi for ApiV2Client {
    fn api_name(&self) -> &'static str {
        "api_v2"
    }

    #[instrument(skip(self))]
    async fn list_venues(&self) -> Result<Vec<String>> {
        let url = format!("{}/groups?id={}", self.base_url, VENUES_GROUP_ID);
        let response: GroupsResponse = self.get(&url).send().await?.error_for_status()?.json().await?;

        let venues = response
            .groups
            .into_iter()
            .next()
            .map(|group| group.members)
            .unwrap_or_default();
        info!("Found {} venues from API v2", venues.len());
        Ok(venues)
    }

    #[instrument(skip(self))]
    async fn get_papers(&self, venue_id: &str, only_accepted: bool) -> Result<Vec<Paper>> {
        let mut papers = Vec::new();
        let mut offset = 0usize;

        loop {
            let url = if only_accepted {
                format!(
                    "{}/notes?content.venueid={}&limit={}&offset={}",
                    self.base_url, venue_id, NOTES_PAGE_LIMIT, offset
                )
            } else {
                format!(
                    "{}/notes?invitation={}/-/Submission&limit={}&offset={}",
                    self.base_url, venue_id, NOTES_PAGE_LIMIT, offset
                )
            };

            let page: NotesResponse = self.get(&url).send().await?.error_for_status()?.json().await?;
            let fetched = page.notes.len();
            debug!("API v2 page for {}: {} notes at offset {}", venue_id, fetched, offset);
            papers.extend(page.notes);

            if fetched < NOTES_PAGE_LIMIT {
                break;
            }
            offset += NOTES_PAGE_LIMIT;
        }

        Ok(papers)
    }
}
