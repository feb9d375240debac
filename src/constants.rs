/// Shared constants for the scraper.
///
/// Venue ids follow the `<venue>/<year>/<track>` convention on OpenReview
/// (e.g. "ICLR.cc/2025/Conference"); everything derived from them here is
/// best-effort string inference, not an authoritative catalog.

// OpenReview API endpoints (v1 and v2 generations)
pub const API_V1_BASE_URL: &str = "https://api.openreview.net";
pub const API_V2_BASE_URL: &str = "https://api2.openreview.net";

// The group whose members enumerate every venue id known to the platform
pub const VENUES_GROUP_ID: &str = "venues";

// Page size for paginated notes queries
pub const NOTES_PAGE_LIMIT: usize = 1000;

/// When a conference only has workshop venues, harvest at most this many.
/// Workshops are a noisy fallback; the cap bounds harvesting cost.
pub const WORKSHOP_VENUE_CAP: usize = 3;

// Default request sets used by the CLI when none are given
pub const DEFAULT_CONFERENCES: &[&str] = &[
    "ICLR", "ICML", "NeurIPS", "AAAI", "CVPR", "ECCV", "ICCV", "ACL", "EMNLP",
];
pub const DEFAULT_YEARS: &[&str] = &["2025", "2024", "2023"];
pub const DEFAULT_KEYWORDS: &[&str] = &["Agent", "Data Synthesis", "Synthetic", "Trajectory"];

// Default bin key for grouped retrieval: one bin holding conference venues
pub const DEFAULT_GROUPS: &[&str] = &["conference"];
