use crate::apis::OpenReviewApi;
use crate::constants::WORKSHOP_VENUE_CAP;
use crate::types::{ClassifiedVenue, ConferenceVenueSet, Track};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, HashSet};
use tracing::{info, warn};

static YEAR_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"20\d{2}").unwrap());

// Ordered patterns for inferring the conference from a free-text venue id.
// Used by the catalog report, where no requested conference list exists.
static CONF_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?i)(iclr|icml|neurips|nips|aaai|cvpr|iccv|eccv|acl|emnlp|naacl|eacl|coling)")
            .unwrap(),
        Regex::new(r"/([A-Z]{3,6})/").unwrap(),
        Regex::new(r"([A-Z]{3,6})\.(?:cc|org)").unwrap(),
    ]
});

/// Fetches the venue catalog from both API generations and merges them into
/// one deduplicated set.
///
/// Each backend gets a single best-effort call; a transport error downgrades
/// that backend to an empty list so the merge proceeds with whatever
/// succeeded. Both failing yields the empty set, which is not an error here.
pub async fn merge_catalogs(
    client_v1: &dyn OpenReviewApi,
    client_v2: &dyn OpenReviewApi,
) -> HashSet<String> {
    let mut merged = HashSet::new();

    for client in [client_v1, client_v2] {
        match client.list_venues().await {
            Ok(venues) => {
                info!("Found {} venues from {}", venues.len(), client.api_name());
                merged.extend(venues);
            }
            Err(e) => {
                warn!("Error fetching venues from {}: {}", client.api_name(), e);
            }
        }
    }

    info!("Total unique venues: {}", merged.len());
    merged
}

/// Infers the track of a venue id from substring presence, returning the
/// literal that drove the decision.
///
/// "workshop" is checked before "conference": workshop ids are frequently
/// superstrings of conference-bearing paths, so the reverse order would
/// misfile them. "track" alone carries no category and maps to Other.
pub fn classify_track(venue_id: &str) -> (Track, Option<String>) {
    let lower = venue_id.to_lowercase();
    if lower.contains("workshop") {
        (Track::Workshop, Some("workshop".to_string()))
    } else if lower.contains("conference") {
        (Track::Conference, Some("conference".to_string()))
    } else if lower.contains("track") {
        (Track::Other, Some("track".to_string()))
    } else {
        (Track::Other, None)
    }
}

fn matches_any_year(venue_id: &str, years: &[String]) -> bool {
    years.iter().any(|year| venue_id.contains(year.as_str()))
}

fn infer_year(venue_id: &str, years: &[String]) -> String {
    // Prefer the requested year that actually matched; fall back to any
    // four-digit 20xx token in the id.
    years
        .iter()
        .find(|year| venue_id.contains(year.as_str()))
        .cloned()
        .or_else(|| YEAR_PATTERN.find(venue_id).map(|m| m.as_str().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}

/// Filters the merged catalog down to ids relevant to the requested years and
/// conferences and classifies each survivor.
///
/// An id must contain at least one requested year as a literal substring and
/// at least one requested conference token (case-insensitive,
/// first-listed-conference wins). The year condition is re-checked after
/// conference matching; a no-op today, kept so a chained transform that
/// rewrites ids cannot smuggle year-less entries through.
pub fn match_venues(
    venues: &HashSet<String>,
    years: &[String],
    conferences: &[String],
) -> Vec<ClassifiedVenue> {
    let mut classified = Vec::new();

    for venue_id in venues {
        if !matches_any_year(venue_id, years) {
            continue;
        }

        let venue_lower = venue_id.to_lowercase();
        let Some(conference) = conferences
            .iter()
            .find(|conf| venue_lower.contains(&conf.to_lowercase()))
        else {
            continue;
        };

        if !matches_any_year(venue_id, years) {
            continue;
        }

        let (track, matched_on) = classify_track(venue_id);
        info!("✅ Matched {} venue for {}: {}", track, conference, venue_id);
        classified.push(ClassifiedVenue {
            id: venue_id.clone(),
            conference: conference.clone(),
            year: infer_year(venue_id, years),
            track,
            matched_on,
        });
    }

    classified
}

/// Groups classified venues into per-conference candidate sets, one entry per
/// requested conference (present even when empty).
pub fn build_venue_sets(
    classified: Vec<ClassifiedVenue>,
    conferences: &[String],
) -> BTreeMap<String, ConferenceVenueSet> {
    let mut sets: BTreeMap<String, ConferenceVenueSet> = conferences
        .iter()
        .map(|conf| (conf.clone(), ConferenceVenueSet::default()))
        .collect();

    for venue in classified {
        if let Some(set) = sets.get_mut(&venue.conference) {
            set.push(venue);
        }
    }

    sets
}

/// Picks the venues to actually harvest for each conference.
///
/// Strict priority per conference: all Conference-track ids; failing that,
/// all Other-track ids; failing that, Workshop-track ids capped at
/// `WORKSHOP_VENUE_CAP`. Conference proceedings are authoritative, workshops
/// a noisy bounded fallback.
pub fn select_venues(sets: &BTreeMap<String, ConferenceVenueSet>) -> Vec<String> {
    let mut selected = Vec::new();

    for (conference, set) in sets {
        let (n_conf, n_workshop, n_other) = set.counts();
        info!(
            "Venue candidates for {}: {} conference, {} workshop, {} other",
            conference, n_conf, n_workshop, n_other
        );

        let chosen: Vec<&ClassifiedVenue> = if !set.conference.is_empty() {
            set.conference.iter().collect()
        } else if !set.other.is_empty() {
            set.other.iter().collect()
        } else {
            set.workshop.iter().take(WORKSHOP_VENUE_CAP).collect()
        };

        if chosen.is_empty() {
            warn!("No venues selected for {}", conference);
            continue;
        }

        metrics::counter!("openreview_venues_selected_total", "conference" => conference.clone())
            .increment(chosen.len() as u64);
        selected.extend(chosen.into_iter().map(|venue| venue.id.clone()));
    }

    selected
}

/// End-to-end venue resolution: merge both catalogs, match against the
/// requested conferences and years, then apply the priority policy.
pub async fn resolve_venues(
    client_v1: &dyn OpenReviewApi,
    client_v2: &dyn OpenReviewApi,
    conferences: &[String],
    years: &[String],
) -> Vec<String> {
    let catalog = merge_catalogs(client_v1, client_v2).await;
    let classified = match_venues(&catalog, years, conferences);
    info!(
        "Venues matching years {:?} for {:?}: {}",
        years,
        conferences,
        classified.len()
    );
    let sets = build_venue_sets(classified, conferences);
    select_venues(&sets)
}

/// Partitions resolved venue ids into named bins for grouped retrieval.
///
/// Every bin key appears in the result, possibly empty. A venue goes to the
/// first bin key that is a case-insensitive substring of its id; ids matching
/// no bin are dropped.
pub fn group_venues(venues: &[String], bins: &[String]) -> BTreeMap<String, Vec<String>> {
    let mut grouped: BTreeMap<String, Vec<String>> =
        bins.iter().map(|bin| (bin.clone(), Vec::new())).collect();

    for venue_id in venues {
        let venue_lower = venue_id.to_lowercase();
        for bin in bins {
            if venue_lower.contains(&bin.to_lowercase()) {
                if let Some(entries) = grouped.get_mut(bin) {
                    entries.push(venue_id.clone());
                }
                break;
            }
        }
    }

    grouped
}

/// Categorizes an arbitrary catalog entry with no requested-conference
/// context, for the discovery report. Conference inference falls back
/// through the id-shape patterns in order.
pub fn categorize_venue(venue_id: &str) -> ClassifiedVenue {
    let year = YEAR_PATTERN
        .find(venue_id)
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    let conference = CONF_PATTERNS
        .iter()
        .find_map(|pattern| pattern.captures(venue_id))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_uppercase())
        .unwrap_or_else(|| "unknown".to_string());

    let (track, matched_on) = classify_track(venue_id);

    ClassifiedVenue {
        id: venue_id.to_string(),
        conference,
        year,
        track,
        matched_on,
    }
}

/// Aggregate counts over a categorized catalog, for the discovery report.
#[derive(Debug, Default, serde::Serialize)]
pub struct CatalogStats {
    pub total: usize,
    pub by_conference: BTreeMap<String, usize>,
    pub by_year: BTreeMap<String, usize>,
    pub by_track: BTreeMap<String, usize>,
}

pub fn analyze_catalog(venues: &[ClassifiedVenue]) -> CatalogStats {
    let mut stats = CatalogStats {
        total: venues.len(),
        ..Default::default()
    };

    for venue in venues {
        *stats.by_conference.entry(venue.conference.clone()).or_default() += 1;
        *stats.by_year.entry(venue.year.clone()).or_default() += 1;
        *stats.by_track.entry(venue.track.to_string()).or_default() += 1;
    }

    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Result, ScraperError};
    use crate::types::Paper;

    struct StubApi {
        name: &'static str,
        venues: Option<Vec<String>>,
    }

    #[async_trait::async_trait]
    impl OpenReviewApi for StubApi {
        fn api_name(&self) -> &'static str {
            self.name
        }

        async fn list_venues(&self) -> Result<Vec<String>> {
            self.venues.clone().ok_or(ScraperError::Api {
                message: "backend unreachable".to_string(),
            })
        }

        async fn get_papers(&self, _venue_id: &str, _only_accepted: bool) -> Result<Vec<Paper>> {
            Ok(Vec::new())
        }
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_merge_dedup_across_backends() {
        let a = StubApi { name: "api_v1", venues: Some(strings(&["v1", "v2"])) };
        let b = StubApi { name: "api_v2", venues: Some(strings(&["v2", "v3"])) };

        let merged = merge_catalogs(&a, &b).await;
        assert_eq!(merged.len(), 3);
        assert!(merged.contains("v1") && merged.contains("v2") && merged.contains("v3"));
    }

    #[tokio::test]
    async fn test_merge_survives_one_backend_failure() {
        let a = StubApi { name: "api_v1", venues: None };
        let b = StubApi { name: "api_v2", venues: Some(strings(&["v2", "v3"])) };

        let merged = merge_catalogs(&a, &b).await;
        assert_eq!(merged.len(), 2);
    }

    #[tokio::test]
    async fn test_merge_both_backends_failing_is_empty_not_fatal() {
        let a = StubApi { name: "api_v1", venues: None };
        let b = StubApi { name: "api_v2", venues: None };

        let merged = merge_catalogs(&a, &b).await;
        assert!(merged.is_empty());

        let classified = match_venues(&merged, &strings(&["2024"]), &strings(&["ACL"]));
        assert!(classified.is_empty());
    }

    #[test]
    fn test_match_venues_year_and_conference_substrings() {
        let catalog: HashSet<String> = strings(&[
            "acl.org/ACL/2024/Conference",
            "x.org/ICML/2023/Workshop/Foo",
        ])
        .into_iter()
        .collect();

        let classified = match_venues(&catalog, &strings(&["2024"]), &strings(&["ACL", "ICML"]));
        assert_eq!(classified.len(), 1);
        let venue = &classified[0];
        assert_eq!(venue.conference, "ACL");
        assert_eq!(venue.year, "2024");
        assert_eq!(venue.track, Track::Conference);
    }

    #[test]
    fn test_match_venues_first_listed_conference_wins() {
        let catalog: HashSet<String> =
            strings(&["aclweb.org/NAACL/2024/Conference"]).into_iter().collect();

        // "acl" is a substring of the id too; the first listed conference wins
        let classified = match_venues(&catalog, &strings(&["2024"]), &strings(&["ACL", "NAACL"]));
        assert_eq!(classified.len(), 1);
        assert_eq!(classified[0].conference, "ACL");
    }

    #[test]
    fn test_classification_workshop_takes_precedence_over_conference() {
        let (track, matched_on) = classify_track("x.org/X/2024/Workshop-Conference-Track");
        assert_eq!(track, Track::Workshop);
        assert_eq!(matched_on.as_deref(), Some("workshop"));
    }

    #[test]
    fn test_classification_track_literal_maps_to_other() {
        let (track, matched_on) = classify_track("ICLR.cc/2024/Datasets_Track");
        assert_eq!(track, Track::Other);
        assert_eq!(matched_on.as_deref(), Some("track"));
    }

    #[test]
    fn test_selector_priority_conference_excludes_everything_else() {
        let catalog: HashSet<String> = strings(&[
            "ICLR.cc/2024/Conference",
            "ICLR.cc/2024/Workshop_AgentLearning",
            "ICLR.cc/2024/Datasets_Track",
        ])
        .into_iter()
        .collect();

        let classified = match_venues(&catalog, &strings(&["2024"]), &strings(&["ICLR"]));
        let sets = build_venue_sets(classified, &strings(&["ICLR"]));
        let selected = select_venues(&sets);

        assert_eq!(selected, vec!["ICLR.cc/2024/Conference".to_string()]);
    }

    #[test]
    fn test_selector_other_beats_workshops() {
        let classified = vec![
            categorize("AAAI.org/2024/Bridge", "AAAI"),
            categorize("AAAI.org/2024/Workshop_A", "AAAI"),
        ];
        let sets = build_venue_sets(classified, &strings(&["AAAI"]));
        let selected = select_venues(&sets);
        assert_eq!(selected, vec!["AAAI.org/2024/Bridge".to_string()]);
    }

    #[test]
    fn test_selector_workshop_cap() {
        let classified: Vec<ClassifiedVenue> = (1..=5)
            .map(|i| categorize(&format!("ICML.cc/2024/Workshop_{}", i), "ICML"))
            .collect();
        let sets = build_venue_sets(classified, &strings(&["ICML"]));
        let selected = select_venues(&sets);
        assert_eq!(selected.len(), 3);
        assert!(selected.iter().all(|id| id.contains("Workshop")));
    }

    fn categorize(id: &str, conference: &str) -> ClassifiedVenue {
        let (track, matched_on) = classify_track(id);
        ClassifiedVenue {
            id: id.to_string(),
            conference: conference.to_string(),
            year: "2024".to_string(),
            track,
            matched_on,
        }
    }

    #[test]
    fn test_group_venues_every_bin_present_and_unmatched_dropped() {
        let venues = strings(&[
            "ICLR.cc/2024/Conference",
            "ICLR.cc/2024/Workshop_A",
            "ICLR.cc/2024/Datasets",
        ]);
        let grouped = group_venues(&venues, &strings(&["conference", "workshop"]));

        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped["conference"], vec!["ICLR.cc/2024/Conference".to_string()]);
        assert_eq!(grouped["workshop"], vec!["ICLR.cc/2024/Workshop_A".to_string()]);
        // "Datasets" matches no bin and is silently dropped
    }

    #[test]
    fn test_group_venues_first_bin_wins() {
        let venues = strings(&["ICLR.cc/2024/Conference"]);
        let grouped = group_venues(&venues, &strings(&["iclr", "conference"]));
        assert_eq!(grouped["iclr"].len(), 1);
        assert!(grouped["conference"].is_empty());
    }

    #[test]
    fn test_categorize_venue_for_report() {
        let venue = categorize_venue("ICLR.cc/2025/Conference");
        assert_eq!(venue.conference, "ICLR");
        assert_eq!(venue.year, "2025");
        assert_eq!(venue.track, Track::Conference);

        let unknown = categorize_venue("somewhere.net/Misc");
        assert_eq!(unknown.conference, "unknown");
        assert_eq!(unknown.year, "unknown");
        assert_eq!(unknown.track, Track::Other);
    }

    #[test]
    fn test_analyze_catalog_counts() {
        let venues = vec![
            categorize_venue("ICLR.cc/2025/Conference"),
            categorize_venue("ICLR.cc/2024/Workshop_X"),
            categorize_venue("ICML.cc/2024/Conference"),
        ];
        let stats = analyze_catalog(&venues);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.by_conference["ICLR"], 2);
        assert_eq!(stats.by_year["2024"], 2);
        assert_eq!(stats.by_track["Conference"], 2);
    }
}
